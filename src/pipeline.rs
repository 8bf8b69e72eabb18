//! The page walk: deck groups in, page images and the object document out.
//!
//! For each deck group, for each filled page:
//!
//! ```text
//! grid      = calculate_grid_size(cards + 1)
//! backside  = darken(deck back image)              once per group
//! page      = composite(card faces, grid, backside) → {deck}_{n}_{count}_{c}x{r}.png
//! objects   = one Card per copy, code = n * 100 + slot
//! ```
//!
//! Each group's cards accumulate into one deck object that is flushed into
//! the bag after the group's last page, collapsing to a bare card when only
//! one entry was collected. Every output name is claimed once per run; a
//! second claim fails the run instead of overwriting. The document is
//! written last, so its presence means every page was written.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use chrono::Utc;
use image::RgbaImage;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bundle::{
    Bag, BagObject, Card, DeckAccumulator, DeckDescription, Document, card_code, variable_script,
};
use crate::bundle_dir::BundleDir;
use crate::config::GeneratorConfig;
use crate::content::{CardInfo, ContentError, ContentProvider, DeckInfo, GameInfo, SortOrder};
use crate::deck::{CardPlacement, DeckGroup};
use crate::generator::GenerateError;
use crate::grid::{GridSize, calculate_grid_size};
use crate::imaging::{ImageBackend, adjust_brightness, composite};
use crate::naming;
use crate::progress::ProgressReporter;

/// Layout of one written page image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSummary {
    pub deck_id: String,
    pub page: u32,
    pub file: String,
    pub cards: usize,
    pub columns: u32,
    pub rows: u32,
    /// Canvas size in pixels.
    pub width: u32,
    pub height: u32,
}

/// Everything a finished run wrote.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleSummary {
    pub game_id: String,
    pub document: String,
    pub pages: Vec<PageSummary>,
    pub backsides: Vec<String>,
    /// Top-level entries in the bag (decks and lone cards).
    pub objects: usize,
    /// Card entries across the whole bag, copies included.
    pub card_entries: usize,
}

/// The darkened back image of one deck group, written once.
struct Backside {
    image: RgbaImage,
    file: String,
    url: String,
}

pub(crate) struct Pipeline<'a> {
    pub provider: &'a dyn ContentProvider,
    pub backend: &'a dyn ImageBackend,
    pub out: &'a BundleDir,
    pub config: &'a GeneratorConfig,
    pub progress: &'a ProgressReporter,
    pub cancel: &'a CancellationToken,
}

impl Pipeline<'_> {
    fn check_cancelled(&self) -> Result<(), GenerateError> {
        if self.cancel.is_cancelled() {
            return Err(GenerateError::Cancelled);
        }
        Ok(())
    }

    pub fn run(
        &self,
        game: &GameInfo,
        groups: &[DeckGroup],
        total_cards: usize,
    ) -> Result<BundleSummary, GenerateError> {
        let mut bag = Bag::new(&game.name, self.bag_description(game));
        let mut pages = Vec::new();
        let mut backsides = Vec::new();
        let mut processed = 0usize;
        let mut written = HashSet::new();

        self.progress.set_message("Generating page images...");
        self.progress.set_percent(0.0);

        for group in groups {
            let Some(first) = group.filled_pages().next().and_then(|p| p.slots.first()) else {
                debug!(deck = %group.key.deck_id, "skipping empty deck group");
                continue;
            };
            self.check_cancelled()?;

            let deck = self
                .provider
                .deck(&game.id, &first.collection_id, &group.key.deck_id)?;
            let backside =
                self.prepare_backside(&game.id, &first.collection_id, &deck, &mut written)?;
            backsides.push(backside.file.clone());

            let mut acc = DeckAccumulator::new(&deck.name);
            let mut catalog = CardCatalog::default();

            for (page_idx, page) in group.filled_pages().enumerate() {
                self.check_cancelled()?;
                let page_no = page_idx as u32 + 1;
                let grid = calculate_grid_size(page.len() as u32 + 1, &self.config.grid)?;
                let file = naming::page_file_name(&deck.id, page_no as usize, page.len(), grid);
                claim_name(&mut written, &file)?;
                let description = DeckDescription {
                    face_url: self.out.file_url(&file),
                    back_url: backside.url.clone(),
                    num_width: grid.columns,
                    num_height: grid.rows,
                };
                acc.register_page(page_no, description.clone());

                self.progress.set_message("Drawing cards on the page...");
                let mut faces = Vec::with_capacity(page.len());
                for (slot, placement) in page.slots.iter().enumerate() {
                    self.check_cancelled()?;

                    let bytes = self.provider.card_image(
                        &placement.game_id,
                        &placement.collection_id,
                        &deck.id,
                        placement.card_id,
                    )?;
                    let face = self
                        .backend
                        .decode(&bytes)
                        .map_err(GenerateError::DecodeFailure)?;
                    faces.push(face.to_rgba8());

                    let info = catalog.card(self.provider, placement, &deck.id)?;
                    if info.count != placement.replication_count {
                        warn!(
                            deck = %deck.id,
                            card = info.id,
                            metadata = info.count,
                            placement = placement.replication_count,
                            "card count changed since layout; using card metadata"
                        );
                    }

                    let code = card_code(page_no, slot as u32);
                    let card = Card::new(
                        &info.title,
                        &info.description,
                        code,
                        variable_script(&info.variables),
                        page_no,
                        description.clone(),
                    );
                    acc.push_card(card, info.count);

                    processed += 1;
                    self.progress
                        .set_percent(processed as f32 / total_cards.max(1) as f32 * 100.0);
                }

                self.check_cancelled()?;
                let (width, height) = self.write_page(&file, &faces, grid, &backside)?;
                debug!(deck = %deck.id, page = page_no, file = %file, "page written");
                pages.push(PageSummary {
                    deck_id: deck.id.clone(),
                    page: page_no,
                    file,
                    cards: page.len(),
                    columns: grid.columns,
                    rows: grid.rows,
                    width,
                    height,
                });
            }

            bag.push(acc.flush());
        }

        self.check_cancelled()?;
        let objects = bag.contained_objects.len();
        let card_entries = count_entries(&bag);
        let document = naming::document_file_name(&game.id);
        let json = serde_json::to_string_pretty(&Document::new(bag))?;
        self.out.write(&document, json.as_bytes())?;
        info!(game = %game.id, pages = pages.len(), objects, "bundle document written");

        Ok(BundleSummary {
            game_id: game.id.clone(),
            document,
            pages,
            backsides,
            objects,
            card_entries,
        })
    }

    fn bag_description(&self, game: &GameInfo) -> String {
        if !self.config.bundle.stamp_created_at {
            return game.description.clone();
        }
        let stamp = format!("Created at: {}", Utc::now().format("%Y-%m-%d %H:%M:%S"));
        if game.description.is_empty() {
            stamp
        } else {
            format!("{}\n{stamp}", game.description)
        }
    }

    fn prepare_backside(
        &self,
        game_id: &str,
        collection_id: &str,
        deck: &DeckInfo,
        written: &mut HashSet<String>,
    ) -> Result<Backside, GenerateError> {
        let file = naming::backside_file_name(&deck.id, &deck.name);
        claim_name(written, &file)?;

        self.progress.set_message("Preparing deck backside...");
        let bytes = self.provider.deck_image(game_id, collection_id, &deck.id)?;
        let decoded = self
            .backend
            .decode(&bytes)
            .map_err(GenerateError::DecodeFailure)?;
        let image = adjust_brightness(&decoded, self.config.backside.brightness);
        let png = self
            .backend
            .encode_png(&image)
            .map_err(GenerateError::EncodeFailure)?;
        self.out.write(&file, &png)?;
        debug!(deck = %deck.id, file = %file, "backside written");

        Ok(Backside {
            image,
            url: self.out.file_url(&file),
            file,
        })
    }

    fn write_page(
        &self,
        file: &str,
        faces: &[RgbaImage],
        grid: GridSize,
        backside: &Backside,
    ) -> Result<(u32, u32), GenerateError> {
        self.progress.set_message("Saving the page image...");
        let canvas = composite(faces, grid, &backside.image)
            .map_err(|e| GenerateError::ConfigurationViolation(e.to_string()))?;
        let png = self
            .backend
            .encode_png(&canvas)
            .map_err(GenerateError::EncodeFailure)?;
        self.out.write(file, &png)?;
        Ok(canvas.dimensions())
    }
}

/// Record `file` as written in this run. A second claim means two deck groups
/// map to the same file name and the later one would overwrite the earlier.
fn claim_name(written: &mut HashSet<String>, file: &str) -> Result<(), GenerateError> {
    if written.insert(file.to_string()) {
        Ok(())
    } else {
        Err(GenerateError::ConfigurationViolation(format!(
            "output file {file} would be written twice; decks sharing an id need the same back image"
        )))
    }
}

/// Card metadata of one deck group, read once per collection.
#[derive(Default)]
struct CardCatalog {
    by_collection: HashMap<String, HashMap<i64, CardInfo>>,
}

impl CardCatalog {
    fn card(
        &mut self,
        provider: &dyn ContentProvider,
        placement: &CardPlacement,
        deck_id: &str,
    ) -> Result<&CardInfo, ContentError> {
        let cards = match self.by_collection.entry(placement.collection_id.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let cards = provider.cards(
                    &placement.game_id,
                    &placement.collection_id,
                    deck_id,
                    SortOrder::Name,
                )?;
                entry.insert(cards.into_iter().map(|c| (c.id, c)).collect())
            }
        };
        cards
            .get(&placement.card_id)
            .ok_or_else(|| ContentError::CardNotFound {
                game: placement.game_id.clone(),
                collection: placement.collection_id.clone(),
                deck: deck_id.to_string(),
                card: placement.card_id,
            })
    }
}

fn count_entries(bag: &Bag) -> usize {
    bag.contained_objects
        .iter()
        .map(|o| match o {
            BagObject::Deck(d) => d.contained_objects.len(),
            BagObject::Card(_) => 1,
        })
        .sum()
}

