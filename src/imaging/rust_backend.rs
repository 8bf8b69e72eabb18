//! Pure Rust codec backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::load_from_memory` (format sniffed from bytes) |
//! | Encode → PNG | `image::codecs::png::PngEncoder` via `write_to` |

use super::backend::{BackendError, ImageBackend};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;

/// Formats with decoders compiled in.
const DECODERS: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Tiff,
    ImageFormat::WebP,
];

/// Pure Rust backend using the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
        let format = image::guess_format(bytes)
            .map_err(|e| BackendError::Decode(format!("unrecognized image data: {e}")))?;
        if !DECODERS.contains(&format) {
            return Err(BackendError::Decode(format!(
                "unsupported image format: {format:?}"
            )));
        }
        image::load_from_memory_with_format(bytes, format)
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    fn encode_png(&self, image: &RgbaImage) -> Result<Vec<u8>, BackendError> {
        let mut buf = Cursor::new(Vec::new());
        image
            .write_to(&mut buf, ImageFormat::Png)
            .map_err(|e| BackendError::Encode(e.to_string()))?;
        Ok(buf.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbImage};

    fn jpeg_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(w, h, |x, y| image::Rgb([(x * 10) as u8, (y * 10) as u8, 128]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Jpeg).unwrap();
        buf.into_inner()
    }

    #[test]
    fn png_encode_then_decode_keeps_pixels() {
        let backend = RustBackend::new();
        let src = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255]));
        let bytes = backend.encode_png(&src).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);

        let decoded = backend.decode(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded, src);
    }

    #[test]
    fn decodes_jpeg_dimensions() {
        let backend = RustBackend::new();
        let img = backend.decode(&jpeg_bytes(20, 30)).unwrap();
        assert_eq!((img.width(), img.height()), (20, 30));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let backend = RustBackend::new();
        let err = backend.decode(b"not an image").unwrap_err();
        assert!(matches!(err, BackendError::Decode(_)));
    }

    #[test]
    fn truncated_png_fails_to_decode() {
        let backend = RustBackend::new();
        let bytes = backend
            .encode_png(&RgbaImage::from_pixel(16, 16, Rgba([1, 2, 3, 255])))
            .unwrap();
        let err = backend.decode(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, BackendError::Decode(_)));
    }
}
