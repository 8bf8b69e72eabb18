//! Card-game content: the game → collection → deck → card tree.
//!
//! The generator only reads content, through the [`ContentProvider`] trait.
//! [`FsContentStore`] is the on-disk implementation used by the CLI.
//!
//! ## Directory Layout
//!
//! ```text
//! games/
//! └── base/                          # Game (directory name is the id)
//!     ├── .info.json                 # GameInfo
//!     └── core/                      # Collection
//!         ├── .info.json             # CollectionInfo
//!         ├── loot.json              # Deck file: deck header + cards
//!         ├── loot.bin               # Deck backside image
//!         └── loot/
//!             ├── 1.bin              # Card face images, by card id
//!             └── 2.bin
//! ```
//!
//! ## Deck Files
//!
//! ```json
//! {
//!   "deck": { "id": "loot", "name": "Loot", "image": "loot.png" },
//!   "cards": {
//!     "1": { "id": 1, "title": "Penny", "variables": { "value": "1" }, "count": 3 }
//!   }
//! }
//! ```
//!
//! The `deck` header comes in two shapes, decoded into [`DeckHeader`]:
//! an embedded [`DeckInfo`] object, or (older files) a bare deck id string.
//! A bare id must match the file name; anything else is rejected at load time.
//!
//! Image files keep the `.bin` extension because they hold whatever format
//! was uploaded; decoders sniff the bytes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const INFO_FILENAME: &str = ".info.json";

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("game not found: {0}")]
    GameNotFound(String),
    #[error("collection not found: {game}/{collection}")]
    CollectionNotFound { game: String, collection: String },
    #[error("deck not found: {game}/{collection}/{deck}")]
    DeckNotFound {
        game: String,
        collection: String,
        deck: String,
    },
    #[error("card not found: {game}/{collection}/{deck}/{card}")]
    CardNotFound {
        game: String,
        collection: String,
        deck: String,
        card: i64,
    },
    #[error("image not found: {}", .0.display())]
    ImageNotFound(PathBuf),
    #[error("invalid content file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid deck file {}: {reason}", .path.display())]
    Format { path: PathBuf, reason: String },
}

impl ContentError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ContentError::GameNotFound(_)
                | ContentError::CollectionNotFound { .. }
                | ContentError::DeckNotFound { .. }
                | ContentError::CardNotFound { .. }
                | ContentError::ImageNotFound(_)
        )
    }
}

/// Ordering applied to every listing.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    #[default]
    Name,
    NameDesc,
    Created,
    CreatedDesc,
}

impl SortOrder {
    /// Sort in place. Ties fall back to the id so the order is total.
    fn apply<T: Listed>(self, items: &mut [T]) {
        items.sort_by(|a, b| {
            let primary = match self {
                SortOrder::Name | SortOrder::NameDesc => a.name().cmp(b.name()),
                SortOrder::Created | SortOrder::CreatedDesc => a.created_at().cmp(&b.created_at()),
            };
            let primary = match self {
                SortOrder::NameDesc | SortOrder::CreatedDesc => primary.reverse(),
                _ => primary,
            };
            primary.then_with(|| a.sort_id().cmp(&b.sort_id()))
        });
    }
}

/// Fields every listed entity exposes for sorting.
trait Listed {
    fn name(&self) -> &str;
    fn created_at(&self) -> Option<DateTime<Utc>>;
    fn sort_id(&self) -> SortId<'_>;
}

/// Tie-breaker. One entity type always yields the same variant.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SortId<'a> {
    Text(&'a str),
    Number(i64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Reference to the backside image. Decks sharing an id and this
    /// reference are laid out together.
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardInfo {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    /// Emitted into the card's script as `key=value` lines.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    /// Physical copies of this card in the game. Values below 1 read as 1.
    #[serde(default = "default_count", deserialize_with = "deserialize_count")]
    pub count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_count() -> u32 {
    1
}

fn deserialize_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = i64::deserialize(deserializer)?;
    Ok(raw.clamp(1, u32::MAX as i64) as u32)
}

macro_rules! impl_listed {
    ($($ty:ty),*) => {$(
        impl Listed for $ty {
            fn name(&self) -> &str {
                &self.name
            }
            fn created_at(&self) -> Option<DateTime<Utc>> {
                self.created_at
            }
            fn sort_id(&self) -> SortId<'_> {
                SortId::Text(&self.id)
            }
        }
    )*};
}

impl_listed!(GameInfo, CollectionInfo, DeckInfo);

impl Listed for CardInfo {
    fn name(&self) -> &str {
        &self.title
    }
    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
    fn sort_id(&self) -> SortId<'_> {
        SortId::Number(self.id)
    }
}

/// Read access to the content tree.
///
/// Implementations must be shareable with the background generation thread.
pub trait ContentProvider: Send + Sync {
    fn games(&self, sort: SortOrder) -> Result<Vec<GameInfo>, ContentError>;

    fn game(&self, game: &str) -> Result<GameInfo, ContentError>;

    fn collections(&self, game: &str, sort: SortOrder)
    -> Result<Vec<CollectionInfo>, ContentError>;

    fn decks(
        &self,
        game: &str,
        collection: &str,
        sort: SortOrder,
    ) -> Result<Vec<DeckInfo>, ContentError>;

    fn deck(&self, game: &str, collection: &str, deck: &str) -> Result<DeckInfo, ContentError>;

    fn cards(
        &self,
        game: &str,
        collection: &str,
        deck: &str,
        sort: SortOrder,
    ) -> Result<Vec<CardInfo>, ContentError>;

    fn card(
        &self,
        game: &str,
        collection: &str,
        deck: &str,
        card: i64,
    ) -> Result<CardInfo, ContentError>;

    /// Raw bytes of the deck's backside image.
    fn deck_image(&self, game: &str, collection: &str, deck: &str)
    -> Result<Vec<u8>, ContentError>;

    /// Raw bytes of a card face image. Only the deck's existence is
    /// checked; use [`card`](Self::card) for the metadata.
    fn card_image(
        &self,
        game: &str,
        collection: &str,
        deck: &str,
        card: i64,
    ) -> Result<Vec<u8>, ContentError>;
}

/// A game with everything under it, for listings.
#[derive(Debug, Clone, PartialEq)]
pub struct GameTree {
    pub game: GameInfo,
    pub collections: Vec<CollectionTree>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionTree {
    pub collection: CollectionInfo,
    pub decks: Vec<DeckTree>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeckTree {
    pub deck: DeckInfo,
    pub cards: Vec<CardInfo>,
}

impl DeckTree {
    /// Physical copies across all cards.
    pub fn copies(&self) -> u64 {
        self.cards.iter().map(|c| u64::from(c.count)).sum()
    }
}

/// Load the full tree of one game in `sort` order.
pub fn game_tree(
    provider: &dyn ContentProvider,
    game: &str,
    sort: SortOrder,
) -> Result<GameTree, ContentError> {
    let info = provider.game(game)?;
    let mut collections = Vec::new();
    for collection in provider.collections(game, sort)? {
        let mut decks = Vec::new();
        for deck in provider.decks(game, &collection.id, sort)? {
            let cards = provider.cards(game, &collection.id, &deck.id, sort)?;
            decks.push(DeckTree { deck, cards });
        }
        collections.push(CollectionTree { collection, decks });
    }
    Ok(GameTree {
        game: info,
        collections,
    })
}

// =============================================================================
// Filesystem store
// =============================================================================

/// Deck header as stored on disk.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum DeckHeader {
    /// Current format: full deck metadata.
    Embedded(DeckInfo),
    /// Older format: only the deck id.
    Legacy(String),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeckFile {
    pub deck: DeckHeader,
    #[serde(default)]
    pub cards: BTreeMap<i64, CardInfo>,
}

impl DeckFile {
    /// Resolve the header into a [`DeckInfo`], checking it against the id
    /// implied by the file name.
    fn into_parts(self, deck_id: &str, path: &Path) -> Result<(DeckInfo, Vec<CardInfo>), ContentError> {
        let info = match self.deck {
            DeckHeader::Embedded(info) => {
                if info.id != deck_id {
                    return Err(ContentError::Format {
                        path: path.to_path_buf(),
                        reason: format!("deck id '{}' does not match file name", info.id),
                    });
                }
                info
            }
            DeckHeader::Legacy(id) => {
                if id != deck_id {
                    return Err(ContentError::Format {
                        path: path.to_path_buf(),
                        reason: format!("deck id '{id}' does not match file name"),
                    });
                }
                DeckInfo {
                    name: id.clone(),
                    id,
                    description: String::new(),
                    image: String::new(),
                    created_at: None,
                }
            }
        };

        let mut cards = Vec::with_capacity(self.cards.len());
        for (key, card) in self.cards {
            if key != card.id {
                return Err(ContentError::Format {
                    path: path.to_path_buf(),
                    reason: format!("card key {key} does not match card id {}", card.id),
                });
            }
            cards.push(card);
        }
        Ok((info, cards))
    }
}

/// [`ContentProvider`] over the on-disk layout described in the module docs.
#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn game_dir(&self, game: &str) -> PathBuf {
        self.root.join(game)
    }

    fn collection_dir(&self, game: &str, collection: &str) -> PathBuf {
        self.game_dir(game).join(collection)
    }

    fn deck_file(&self, game: &str, collection: &str, deck: &str) -> PathBuf {
        self.collection_dir(game, collection)
            .join(format!("{deck}.json"))
    }

    /// Path of an existing deck file, without parsing it.
    fn existing_deck_file(
        &self,
        game: &str,
        collection: &str,
        deck: &str,
    ) -> Result<PathBuf, ContentError> {
        self.collection(game, collection)?;
        let path = self.deck_file(game, collection, deck);
        if !path.is_file() {
            return Err(ContentError::DeckNotFound {
                game: game.to_string(),
                collection: collection.to_string(),
                deck: deck.to_string(),
            });
        }
        Ok(path)
    }

    fn load_deck(
        &self,
        game: &str,
        collection: &str,
        deck: &str,
    ) -> Result<(DeckInfo, Vec<CardInfo>), ContentError> {
        let path = self.existing_deck_file(game, collection, deck)?;
        let file: DeckFile = read_json(&path)?;
        file.into_parts(deck, &path)
    }

    fn collection(&self, game: &str, collection: &str) -> Result<CollectionInfo, ContentError> {
        self.game(game)?;
        let path = self.collection_dir(game, collection).join(INFO_FILENAME);
        if !path.is_file() {
            return Err(ContentError::CollectionNotFound {
                game: game.to_string(),
                collection: collection.to_string(),
            });
        }
        read_json(&path)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ContentError> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|source| ContentError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn read_image(path: PathBuf) -> Result<Vec<u8>, ContentError> {
    if !path.is_file() {
        return Err(ContentError::ImageNotFound(path));
    }
    Ok(fs::read(path)?)
}

/// Subdirectories of `dir` that carry an `.info.json`, sorted by name.
fn info_dirs(dir: &Path) -> Result<Vec<PathBuf>, ContentError> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir() && p.join(INFO_FILENAME).is_file())
        .collect();
    dirs.sort();
    Ok(dirs)
}

impl ContentProvider for FsContentStore {
    fn games(&self, sort: SortOrder) -> Result<Vec<GameInfo>, ContentError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut games = info_dirs(&self.root)?
            .iter()
            .map(|dir| read_json(&dir.join(INFO_FILENAME)))
            .collect::<Result<Vec<GameInfo>, _>>()?;
        sort.apply(&mut games);
        Ok(games)
    }

    fn game(&self, game: &str) -> Result<GameInfo, ContentError> {
        let path = self.game_dir(game).join(INFO_FILENAME);
        if game.is_empty() || !path.is_file() {
            return Err(ContentError::GameNotFound(game.to_string()));
        }
        read_json(&path)
    }

    fn collections(
        &self,
        game: &str,
        sort: SortOrder,
    ) -> Result<Vec<CollectionInfo>, ContentError> {
        self.game(game)?;
        let mut collections = info_dirs(&self.game_dir(game))?
            .iter()
            .map(|dir| read_json(&dir.join(INFO_FILENAME)))
            .collect::<Result<Vec<CollectionInfo>, _>>()?;
        sort.apply(&mut collections);
        Ok(collections)
    }

    fn decks(
        &self,
        game: &str,
        collection: &str,
        sort: SortOrder,
    ) -> Result<Vec<DeckInfo>, ContentError> {
        self.collection(game, collection)?;
        let dir = self.collection_dir(game, collection);
        let mut deck_ids: Vec<String> = fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.is_file()
                    && p.extension()
                        .map(|e| e.eq_ignore_ascii_case("json"))
                        .unwrap_or(false)
            })
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .filter(|stem| !stem.starts_with('.'))
            .collect();
        deck_ids.sort();

        let mut decks = deck_ids
            .iter()
            .map(|id| self.load_deck(game, collection, id).map(|(info, _)| info))
            .collect::<Result<Vec<_>, _>>()?;
        sort.apply(&mut decks);
        Ok(decks)
    }

    fn deck(&self, game: &str, collection: &str, deck: &str) -> Result<DeckInfo, ContentError> {
        self.load_deck(game, collection, deck).map(|(info, _)| info)
    }

    fn cards(
        &self,
        game: &str,
        collection: &str,
        deck: &str,
        sort: SortOrder,
    ) -> Result<Vec<CardInfo>, ContentError> {
        let (_, mut cards) = self.load_deck(game, collection, deck)?;
        sort.apply(&mut cards);
        Ok(cards)
    }

    fn card(
        &self,
        game: &str,
        collection: &str,
        deck: &str,
        card: i64,
    ) -> Result<CardInfo, ContentError> {
        let (_, cards) = self.load_deck(game, collection, deck)?;
        cards
            .into_iter()
            .find(|c| c.id == card)
            .ok_or_else(|| ContentError::CardNotFound {
                game: game.to_string(),
                collection: collection.to_string(),
                deck: deck.to_string(),
                card,
            })
    }

    fn deck_image(
        &self,
        game: &str,
        collection: &str,
        deck: &str,
    ) -> Result<Vec<u8>, ContentError> {
        self.deck(game, collection, deck)?;
        read_image(self.collection_dir(game, collection).join(format!("{deck}.bin")))
    }

    fn card_image(
        &self,
        game: &str,
        collection: &str,
        deck: &str,
        card: i64,
    ) -> Result<Vec<u8>, ContentError> {
        self.existing_deck_file(game, collection, deck)?;
        read_image(
            self.collection_dir(game, collection)
                .join(deck)
                .join(format!("{card}.bin")),
        )
    }
}
