//! Grid shape selection for card pages.
//!
//! A page image is a `columns × rows` grid of equally sized cells. Every page
//! reserves its last cell for the deck backside, so a page holding `k` cards
//! needs at least `k + 1` cells. [`calculate_grid_size`] picks the shape.
//!
//! ## Selection policy
//!
//! Among all shapes inside the configured bounds that fit `n` cells:
//!
//! 1. fewest wasted cells (`columns * rows - n`)
//! 2. closest to square (`|columns - rows|`)
//! 3. fewer columns
//!
//! ```text
//! n = 70, bounds 2..=10 × 2..=7  →  10x7  (0 wasted)
//! n = 12                         →  3x4   (0 wasted, |3-4| = 1)
//! n = 2                          →  2x2   (smallest legal shape)
//! ```
//!
//! All functions here are pure.

use crate::config::GridConfig;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("{required} cells do not fit in a {max_width}x{max_height} grid")]
    Unsatisfiable {
        required: u32,
        max_width: u32,
        max_height: u32,
    },
}

/// Chosen grid shape for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSize {
    pub columns: u32,
    pub rows: u32,
}

impl GridSize {
    pub fn cells(self) -> u32 {
        self.columns * self.rows
    }

    /// `(column, row)` of a 0-based slot, filled row-major.
    pub fn position(self, slot: u32) -> (u32, u32) {
        (slot % self.columns, slot / self.columns)
    }

    /// The bottom-right cell, where the backside is drawn.
    pub fn last_cell(self) -> (u32, u32) {
        (self.columns - 1, self.rows - 1)
    }
}

/// Pick the grid shape for `required` cells (cards plus the backside slot).
pub fn calculate_grid_size(required: u32, bounds: &GridConfig) -> Result<GridSize, GridError> {
    let mut best: Option<(u32, u32, GridSize)> = None;

    for columns in bounds.min_width..=bounds.max_width {
        for rows in bounds.min_height..=bounds.max_height {
            let cells = columns * rows;
            if cells < required {
                continue;
            }
            let waste = cells - required;
            let skew = columns.abs_diff(rows);
            let better = match best {
                None => true,
                // Columns ascend in the outer loop, so equal (waste, skew)
                // keeps the earlier, narrower shape.
                Some((best_waste, best_skew, _)) => (waste, skew) < (best_waste, best_skew),
            };
            if better {
                best = Some((waste, skew, GridSize { columns, rows }));
            }
        }
    }

    best.map(|(_, _, size)| size)
        .ok_or(GridError::Unsatisfiable {
            required,
            max_width: bounds.max_width,
            max_height: bounds.max_height,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(min_w: u32, min_h: u32, max_w: u32, max_h: u32) -> GridConfig {
        GridConfig {
            min_width: min_w,
            min_height: min_h,
            max_width: max_w,
            max_height: max_h,
        }
    }

    fn size(columns: u32, rows: u32) -> GridSize {
        GridSize { columns, rows }
    }

    #[test]
    fn full_page_uses_maximum_grid() {
        assert_eq!(calculate_grid_size(70, &GridConfig::default()), Ok(size(10, 7)));
    }

    #[test]
    fn single_card_plus_backside_uses_minimum_grid() {
        assert_eq!(calculate_grid_size(2, &GridConfig::default()), Ok(size(2, 2)));
    }

    #[test]
    fn one_cell_still_respects_minimum_bounds() {
        assert_eq!(calculate_grid_size(1, &GridConfig::default()), Ok(size(2, 2)));
    }

    #[test]
    fn exact_fit_prefers_squarer_shape() {
        // 12 = 4x3 = 6x2 = 3x4; 4x3 and 3x4 tie on skew, fewer columns wins
        assert_eq!(calculate_grid_size(12, &GridConfig::default()), Ok(size(3, 4)));
    }

    #[test]
    fn waste_beats_squareness() {
        // 10 cells: 2x5 wastes nothing, 4x3 wastes 2 despite being squarer
        assert_eq!(calculate_grid_size(10, &GridConfig::default()), Ok(size(2, 5)));
    }

    #[test]
    fn prime_count_takes_least_waste() {
        // 7 cells: 4x2 and 2x4 both waste 1; equal skew, fewer columns
        assert_eq!(calculate_grid_size(7, &GridConfig::default()), Ok(size(2, 4)));
    }

    #[test]
    fn too_many_cells_is_an_error() {
        let err = calculate_grid_size(71, &GridConfig::default()).unwrap_err();
        assert_eq!(
            err,
            GridError::Unsatisfiable {
                required: 71,
                max_width: 10,
                max_height: 7
            }
        );
    }

    #[test]
    fn custom_bounds_are_honoured() {
        let b = bounds(3, 1, 4, 2);
        assert_eq!(calculate_grid_size(2, &b), Ok(size(3, 1)));
        assert_eq!(calculate_grid_size(5, &b), Ok(size(3, 2)));
        assert_eq!(calculate_grid_size(8, &b), Ok(size(4, 2)));
        assert!(calculate_grid_size(9, &b).is_err());
    }

    #[test]
    fn every_count_gets_a_valid_minimal_waste_shape() {
        let b = GridConfig::default();
        for n in 1..=b.max_width * b.max_height {
            let chosen = calculate_grid_size(n, &b).unwrap();
            assert!(chosen.cells() >= n, "n={n}: {chosen:?} too small");
            assert!((b.min_width..=b.max_width).contains(&chosen.columns));
            assert!((b.min_height..=b.max_height).contains(&chosen.rows));

            let chosen_waste = chosen.cells() - n;
            for c in b.min_width..=b.max_width {
                for r in b.min_height..=b.max_height {
                    if c * r >= n {
                        assert!(
                            c * r - n >= chosen_waste,
                            "n={n}: {c}x{r} wastes less than {chosen:?}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn positions_are_row_major() {
        let g = size(3, 2);
        assert_eq!(g.position(0), (0, 0));
        assert_eq!(g.position(2), (2, 0));
        assert_eq!(g.position(3), (0, 1));
        assert_eq!(g.last_cell(), (2, 1));
    }
}
