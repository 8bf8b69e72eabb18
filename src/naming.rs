//! File names for everything written into a bundle.
//!
//! Names are a function of content identity only, so regenerating the same
//! game yields the same file set.
//!
//! ```text
//! loot_1_69_10x7.png        page 1 of deck "loot", 69 cards, 10x7 grid
//! loot_2_1_2x2.png          page 2, 1 card
//! backside_loot_6794e7.png  backside of deck "loot" named "Loot"
//! base.json                 object document for game "base"
//! ```

use md5::{Digest, Md5};
use std::path::Path;

use crate::grid::GridSize;

/// `{deck}_{page}_{count}_{cols}x{rows}.png`
pub fn page_file_name(deck_id: &str, page: usize, card_count: usize, grid: GridSize) -> String {
    format!(
        "{deck_id}_{page}_{card_count}_{}x{}.png",
        grid.columns, grid.rows
    )
}

/// `backside_{deck}_{hash}.png`, where `hash` is the first 6 hex digits of
/// the md5 of the deck's display name.
pub fn backside_file_name(deck_id: &str, deck_name: &str) -> String {
    format!("backside_{deck_id}_{}.png", name_hash(deck_name))
}

/// `{game}.json`
pub fn document_file_name(game_id: &str) -> String {
    format!("{game_id}.json")
}

/// `file://` URL for an absolute path.
pub fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}

fn name_hash(name: &str) -> String {
    let digest = Md5::digest(name.as_bytes());
    digest[..3].iter().map(|b| format!("{b:02x}")).collect()
}
