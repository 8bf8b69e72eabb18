//! Pixel operations applied between decode and compositing.

use image::imageops;
use image::{DynamicImage, RgbaImage};

/// Per-channel shift for a brightness change of `percent` (-100..=100).
///
/// `-30` maps to `-77`: 30% of the 0..=255 range, rounded.
pub fn brightness_shift(percent: i32) -> i32 {
    (255.0 * percent as f64 / 100.0).round() as i32
}

/// Shift every color channel by `percent` of full range, leaving alpha.
///
/// Used to render the deck backside darker than the card faces.
pub fn adjust_brightness(image: &DynamicImage, percent: i32) -> RgbaImage {
    let rgba = image.to_rgba8();
    if percent == 0 {
        return rgba;
    }
    imageops::brighten(&rgba, brightness_shift(percent))
}
