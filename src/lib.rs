//! # Deck Builder
//!
//! Turns a card-game content tree into a Tabletop Simulator bundle: page
//! images that pack many card faces into a grid, and one saved-object JSON
//! document describing the bag, decks and cards that reference those pages.
//!
//! # Architecture
//!
//! ```text
//! ContentProvider ──▶ DeckLayout ──▶ for each deck group, for each page:
//!  (games tree)       (group +        grid size → composite → write PNG
//!                      paginate)      card objects → deck accumulator
//!                                   ──▶ {game}.json
//! ```
//!
//! Setup (game lookup, flattening, output reset) runs on the caller's thread
//! and fails fast. The page walk runs on a background thread and reports
//! through a shared [`progress::ProgressReporter`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`content`] | Game/collection/deck/card model, `ContentProvider` trait, filesystem store |
//! | [`deck`] | Groups cards by deck and back image, splits groups into pages |
//! | [`grid`] | Picks the page grid shape for a card count |
//! | [`imaging`] | Decode/encode backend, backside darkening, page compositing |
//! | [`bundle`] | Simulator object document and the deck accumulator |
//! | [`pipeline`] | The page walk that writes pages and builds the document |
//! | [`generator`] | Run orchestration, cancellation, error taxonomy |
//! | [`progress`] | Shared status of the most recent run |
//! | [`naming`] | Bundle file names and URLs |
//! | [`bundle_dir`] | Output directory handling |
//! | [`config`] | `config.toml` loading, merging, and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Backside In The Last Cell
//!
//! Every page reserves its bottom-right cell for the deck's back image, so a
//! page of `k` cards is sized for `k + 1` cells. The simulator reads the
//! backside from there when a card is hidden.
//!
//! ## Card Codes
//!
//! A card is addressed as `page * 100 + slot`. Pages are therefore capped at
//! 100 cells, which config validation enforces.
//!
//! ## One Run At A Time
//!
//! The output directory is wiped at the start of every run, so two
//! concurrent runs would destroy each other's files. A second `start` while a
//! run is active is rejected with [`generator::GenerateError::Busy`].

pub mod bundle;
pub mod bundle_dir;
pub mod config;
pub mod content;
pub mod deck;
pub mod generator;
pub mod grid;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod progress;

#[cfg(test)]
pub(crate) mod test_helpers;
