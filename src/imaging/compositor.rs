//! Page compositing: card faces plus the backside on one canvas.
//!
//! ```text
//! 3x2 grid, 4 cards
//! ┌────┬────┬────┐
//! │ c0 │ c1 │ c2 │
//! ├────┼────┼────┤
//! │ c3 │    │ BK │   BK = backside, always bottom-right
//! └────┴────┴────┘
//! ```
//!
//! The cell size is taken from the first card. Other cards are placed at
//! their cell origin as-is; a card larger than a cell overflows into its
//! neighbours and the canvas edge clips it.

use super::backend::BackendError;
use crate::grid::GridSize;
use image::{RgbaImage, imageops};

/// Cell size for a page: the first card's size, or the backside's when
/// the page has no cards.
pub fn cell_size(cards: &[RgbaImage], backside: &RgbaImage) -> (u32, u32) {
    let first = cards.first().unwrap_or(backside);
    first.dimensions()
}

/// Draw `cards` row-major onto a transparent `grid` canvas, then the
/// backside into the last cell.
pub fn composite(
    cards: &[RgbaImage],
    grid: GridSize,
    backside: &RgbaImage,
) -> Result<RgbaImage, BackendError> {
    let slots = grid.cells().saturating_sub(1) as usize;
    if cards.len() > slots {
        return Err(BackendError::ProcessingFailed(format!(
            "{} cards do not fit a {}x{} page",
            cards.len(),
            grid.columns,
            grid.rows
        )));
    }

    let (cell_w, cell_h) = cell_size(cards, backside);
    let mut canvas = RgbaImage::new(cell_w * grid.columns, cell_h * grid.rows);

    for (slot, card) in cards.iter().enumerate() {
        let (col, row) = grid.position(slot as u32);
        imageops::replace(
            &mut canvas,
            card,
            i64::from(col * cell_w),
            i64::from(row * cell_h),
        );
    }

    let (col, row) = grid.last_cell();
    imageops::replace(
        &mut canvas,
        backside,
        i64::from(col * cell_w),
        i64::from(row * cell_h),
    );

    Ok(canvas)
}
