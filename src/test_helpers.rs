//! Shared test utilities for the deck-builder test suite.
//!
//! Provides a fixture builder that writes a content tree in the layout
//! [`FsContentStore`](crate::content::FsContentStore) reads, card
//! constructors, and a backend that blocks until released.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let games = ContentBuilder::new()
//!     .game("base", "Base")
//!     .collection("core", "Core")
//!     .deck("loot", "Loot", cards(1..=70))
//!     .build();
//! let store = FsContentStore::new(games.path());
//! ```

use chrono::{DateTime, Utc};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::collections::BTreeMap;
use std::fs;
use std::io::Cursor;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::{Condvar, Mutex};
use tempfile::TempDir;

use crate::content::{CardInfo, CollectionInfo, DeckFile, DeckHeader, DeckInfo, GameInfo};
use crate::imaging::backend::tests::MockBackend;
use crate::imaging::{BackendError, ImageBackend};

// =========================================================================
// Cards
// =========================================================================

pub fn card(id: i64, title: &str) -> CardInfo {
    CardInfo {
        id,
        title: title.to_string(),
        description: String::new(),
        image: format!("{id}.png"),
        variables: BTreeMap::new(),
        count: 1,
        created_at: None,
    }
}

pub fn card_with_count(id: i64, title: &str, count: u32) -> CardInfo {
    CardInfo {
        count,
        ..card(id, title)
    }
}

pub fn dated_card(id: i64, title: &str, created_at: &str) -> CardInfo {
    let created_at: DateTime<Utc> = created_at.parse().unwrap();
    CardInfo {
        created_at: Some(created_at),
        ..card(id, title)
    }
}

/// Cards titled `Card 001`, `Card 002`, ... so name order is id order.
pub fn cards(ids: RangeInclusive<i64>) -> Vec<CardInfo> {
    ids.map(|id| card(id, &format!("Card {id:03}"))).collect()
}

/// A small solid PNG.
pub fn png_bytes(width: u32, height: u32, shade: u8) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([shade, shade, shade, 255]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

// =========================================================================
// Content tree fixture
// =========================================================================

/// Writes a content tree into a temp directory as it is described.
///
/// `collection` applies to the most recent `game`, `deck` to the most
/// recent `collection`. Card images are 4x6 PNGs, backsides a darker 4x6.
pub struct ContentBuilder {
    root: TempDir,
    game: Option<String>,
    collection: Option<PathBuf>,
}

impl ContentBuilder {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
            game: None,
            collection: None,
        }
    }

    pub fn game(mut self, id: &str, name: &str) -> Self {
        let dir = self.root.path().join(id);
        fs::create_dir_all(&dir).unwrap();
        let info = GameInfo {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            image: String::new(),
            created_at: None,
        };
        write_json(&dir.join(".info.json"), &info);
        self.game = Some(id.to_string());
        self.collection = None;
        self
    }

    pub fn collection(mut self, id: &str, name: &str) -> Self {
        let game = self.game.as_ref().expect("collection() needs a game()");
        let dir = self.root.path().join(game).join(id);
        fs::create_dir_all(&dir).unwrap();
        let info = CollectionInfo {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            image: String::new(),
            created_at: None,
        };
        write_json(&dir.join(".info.json"), &info);
        self.collection = Some(dir);
        self
    }

    pub fn deck(self, id: &str, name: &str, cards: Vec<CardInfo>) -> Self {
        let image = format!("{id}.png");
        self.deck_with_image(id, name, &image, cards)
    }

    /// Like [`deck`](Self::deck) with an explicit backside reference.
    pub fn deck_with_image(
        self,
        id: &str,
        name: &str,
        image: &str,
        cards: Vec<CardInfo>,
    ) -> Self {
        let dir = self
            .collection
            .clone()
            .expect("deck() needs a collection()");
        let file = DeckFile {
            deck: DeckHeader::Embedded(DeckInfo {
                id: id.to_string(),
                name: name.to_string(),
                description: String::new(),
                image: image.to_string(),
                created_at: None,
            }),
            cards: cards.iter().map(|c| (c.id, c.clone())).collect(),
        };
        write_json(&dir.join(format!("{id}.json")), &file);
        fs::write(dir.join(format!("{id}.bin")), png_bytes(4, 6, 40)).unwrap();

        let images = dir.join(id);
        fs::create_dir_all(&images).unwrap();
        for card in &cards {
            fs::write(
                images.join(format!("{}.bin", card.id)),
                png_bytes(4, 6, 200),
            )
            .unwrap();
        }
        self
    }

    pub fn build(self) -> TempDir {
        self.root
    }
}

fn write_json<T: serde::Serialize>(path: &std::path::Path, value: &T) {
    fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

// =========================================================================
// Backends
// =========================================================================

/// A [`MockBackend`] whose decodes block until permitted. Lets tests
/// observe a run while it is active.
pub struct GatedBackend {
    inner: MockBackend,
    permits: Mutex<Option<usize>>,
    signal: Condvar,
}

impl GatedBackend {
    pub fn new() -> Self {
        Self {
            inner: MockBackend::new(),
            permits: Mutex::new(Some(0)),
            signal: Condvar::new(),
        }
    }

    /// Let every decode through from now on.
    pub fn open(&self) {
        *self.permits.lock().unwrap() = None;
        self.signal.notify_all();
    }

    /// Let `n` more decodes through.
    pub fn release(&self, n: usize) {
        if let Some(permits) = self.permits.lock().unwrap().as_mut() {
            *permits += n;
        }
        self.signal.notify_all();
    }
}

impl ImageBackend for GatedBackend {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
        let mut permits = self.permits.lock().unwrap();
        while *permits == Some(0) {
            permits = self.signal.wait(permits).unwrap();
        }
        if let Some(n) = permits.as_mut() {
            *n -= 1;
        }
        drop(permits);
        self.inner.decode(bytes)
    }

    fn encode_png(&self, image: &RgbaImage) -> Result<Vec<u8>, BackendError> {
        self.inner.encode_png(image)
    }
}
