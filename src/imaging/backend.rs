//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait covers the two codec operations generation
//! needs: decoding uploaded image bytes, and encoding a finished page as PNG.
//! Everything between those two (darkening, compositing) works on in-memory
//! buffers and lives in [`operations`](super::operations) and
//! [`compositor`](super::compositor).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use image::{DynamicImage, RgbaImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode image: {0}")]
    Encode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Trait for image codec backends.
///
/// `Send + Sync` so a backend can be moved into the generation thread.
pub trait ImageBackend: Send + Sync {
    /// Decode image bytes of any supported format.
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError>;

    /// Encode an RGBA buffer as PNG.
    fn encode_png(&self, image: &RgbaImage) -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use image::Rgba;
    use std::sync::Mutex;

    /// Mock backend that records operations and fabricates images.
    ///
    /// Decoding ignores the input bytes and returns a solid image of
    /// `cell_size`. Encoding returns a tiny placeholder instead of a real PNG.
    pub struct MockBackend {
        pub cell_size: (u32, u32),
        pub fail_decode: bool,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode { bytes: usize },
        EncodePng { width: u32, height: u32 },
    }

    impl Default for MockBackend {
        fn default() -> Self {
            Self {
                cell_size: (4, 6),
                fail_decode: false,
                operations: Mutex::new(Vec::new()),
            }
        }
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            Self {
                fail_decode: true,
                ..Self::default()
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn encoded_sizes(&self) -> Vec<(u32, u32)> {
            self.get_operations()
                .into_iter()
                .filter_map(|op| match op {
                    RecordedOp::EncodePng { width, height } => Some((width, height)),
                    _ => None,
                })
                .collect()
        }
    }

    impl ImageBackend for MockBackend {
        fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Decode { bytes: bytes.len() });
            if self.fail_decode {
                return Err(BackendError::Decode("mock decode failure".to_string()));
            }
            let (w, h) = self.cell_size;
            Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                w,
                h,
                Rgba([200, 100, 50, 255]),
            )))
        }

        fn encode_png(&self, image: &RgbaImage) -> Result<Vec<u8>, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::EncodePng {
                width: image.width(),
                height: image.height(),
            });
            Ok(b"mock-png".to_vec())
        }
    }

    #[test]
    fn mock_records_decode() {
        let backend = MockBackend::new();
        let img = backend.decode(b"abc").unwrap();
        assert_eq!((img.width(), img.height()), (4, 6));
        assert_eq!(backend.get_operations(), vec![RecordedOp::Decode { bytes: 3 }]);
    }

    #[test]
    fn mock_records_encode() {
        let backend = MockBackend::new();
        backend.encode_png(&RgbaImage::new(8, 12)).unwrap();
        assert_eq!(backend.encoded_sizes(), vec![(8, 12)]);
    }

    #[test]
    fn failing_mock_still_records() {
        let backend = MockBackend::failing();
        assert!(matches!(backend.decode(b"x"), Err(BackendError::Decode(_))));
        assert_eq!(backend.get_operations().len(), 1);
    }
}
