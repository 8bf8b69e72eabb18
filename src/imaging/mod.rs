//! Image processing in pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory_with_format` |
//! | **Darken backside** | `imageops::brighten` |
//! | **Compose page** | `imageops::replace` onto an RGBA canvas |
//! | **Encode page** | PNG via `image` |
//!
//! The module is split into:
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`] (codecs)
//! - **Operations**: pixel transforms on decoded images
//! - **Compositor**: pure page layout onto a canvas

pub mod backend;
pub mod compositor;
pub mod operations;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use compositor::composite;
pub use operations::adjust_brightness;
pub use rust_backend::RustBackend;
