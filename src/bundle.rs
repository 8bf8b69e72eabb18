//! The saved-object document Tabletop Simulator loads.
//!
//! ```text
//! {"ObjectStates": [Bag]}
//! Bag
//! └── ContainedObjects
//!     ├── Deck               (2+ cards)
//!     │   ├── CustomDeck     {page: {FaceURL, BackURL, NumWidth, NumHeight}}
//!     │   ├── DeckIDs        [card code per copy]
//!     │   └── ContainedObjects [Card per copy]
//!     └── Card               (a deck that ended up with a single card)
//! ```
//!
//! Card codes are `page * 100 + slot`: the simulator splits the code back
//! into a `CustomDeck` key and a cell index.
//!
//! Decks are built with a [`DeckAccumulator`]. Flushing it consumes the
//! accumulator and decides the emitted shape, see [`Flushed`].

use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Card code for slot `slot` (0-based) of page `page` (1-based).
pub fn card_code(page: u32, slot: u32) -> u32 {
    page * 100 + slot
}

/// Card variables as a script body: `key=value` lines in key order.
pub fn variable_script(variables: &BTreeMap<String, String>) -> String {
    variables
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    pub pos_x: f64,
    pub pos_y: f64,
    pub pos_z: f64,
    pub rot_x: f64,
    pub rot_y: f64,
    pub rot_z: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub scale_z: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            pos_x: 0.0,
            pos_y: 0.0,
            pos_z: 0.0,
            rot_x: 0.0,
            rot_y: 0.0,
            rot_z: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            scale_z: 1.0,
        }
    }
}

/// One page image as the simulator sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckDescription {
    #[serde(rename = "FaceURL")]
    pub face_url: String,
    #[serde(rename = "BackURL")]
    pub back_url: String,
    #[serde(rename = "NumWidth")]
    pub num_width: u32,
    #[serde(rename = "NumHeight")]
    pub num_height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Card {
    pub name: String,
    pub nickname: String,
    pub description: String,
    #[serde(rename = "CardID")]
    pub card_id: u32,
    pub lua_script: String,
    #[serde(deserialize_with = "page_map")]
    pub custom_deck: BTreeMap<u32, DeckDescription>,
    pub transform: Transform,
}

impl Card {
    pub fn new(
        nickname: &str,
        description: &str,
        code: u32,
        script: String,
        page: u32,
        deck: DeckDescription,
    ) -> Self {
        Self {
            name: "Card".to_string(),
            nickname: nickname.to_string(),
            description: description.to_string(),
            card_id: code,
            lua_script: script,
            custom_deck: BTreeMap::from([(page, deck)]),
            transform: Transform::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeckObject {
    pub name: String,
    pub nickname: String,
    #[serde(deserialize_with = "page_map")]
    pub custom_deck: BTreeMap<u32, DeckDescription>,
    #[serde(rename = "DeckIDs")]
    pub deck_ids: Vec<u32>,
    pub contained_objects: Vec<Card>,
    pub transform: Transform,
}

/// `CustomDeck` keys are page numbers written as JSON object keys, so they
/// come back as strings.
fn page_map<'de, D>(deserializer: D) -> Result<BTreeMap<u32, DeckDescription>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<PageKey, DeckDescription>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|(key, deck)| (key.0, deck)).collect())
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct PageKey(u32);

impl<'de> Deserialize<'de> for PageKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PageKeyVisitor;

        impl<'de> Visitor<'de> for PageKeyVisitor {
            type Value = PageKey;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a page number")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<PageKey, E> {
                u32::try_from(v)
                    .map(PageKey)
                    .map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<PageKey, E> {
                v.parse()
                    .map(PageKey)
                    .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_any(PageKeyVisitor)
    }
}

/// Anything a bag can hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BagObject {
    Deck(DeckObject),
    Card(Card),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Bag {
    pub name: String,
    pub nickname: String,
    pub description: String,
    pub contained_objects: Vec<BagObject>,
    pub transform: Transform,
}

impl Bag {
    pub fn new(nickname: &str, description: String) -> Self {
        Self {
            name: "Bag".to_string(),
            nickname: nickname.to_string(),
            description,
            contained_objects: Vec::new(),
            transform: Transform::default(),
        }
    }

    /// Add whatever a flushed deck produced. Empty decks add nothing.
    pub fn push(&mut self, flushed: Flushed) {
        if let Some(object) = flushed.into_bag_object() {
            self.contained_objects.push(object);
        }
    }
}

/// Document root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "ObjectStates")]
    pub object_states: Vec<Bag>,
}

impl Document {
    pub fn new(bag: Bag) -> Self {
        Self {
            object_states: vec![bag],
        }
    }
}

/// A deck being filled with cards.
#[derive(Debug)]
pub struct DeckAccumulator {
    nickname: String,
    custom_deck: BTreeMap<u32, DeckDescription>,
    deck_ids: Vec<u32>,
    cards: Vec<Card>,
}

/// Result of flushing a [`DeckAccumulator`].
#[derive(Debug, Clone, PartialEq)]
pub enum Flushed {
    /// No cards were added; nothing is emitted.
    Empty,
    /// Exactly one card. The simulator rejects one-card decks, so it is
    /// emitted as a bare card.
    Single(Card),
    Deck(DeckObject),
}

impl Flushed {
    pub fn into_bag_object(self) -> Option<BagObject> {
        match self {
            Flushed::Empty => None,
            Flushed::Single(card) => Some(BagObject::Card(card)),
            Flushed::Deck(deck) => Some(BagObject::Deck(deck)),
        }
    }
}

impl DeckAccumulator {
    pub fn new(nickname: &str) -> Self {
        Self {
            nickname: nickname.to_string(),
            custom_deck: BTreeMap::new(),
            deck_ids: Vec::new(),
            cards: Vec::new(),
        }
    }

    /// Register a page image under its 1-based page number.
    pub fn register_page(&mut self, page: u32, description: DeckDescription) {
        self.custom_deck.insert(page, description);
    }

    /// Append `copies` entries for `card`, each with the same code.
    pub fn push_card(&mut self, card: Card, copies: u32) {
        for _ in 0..copies {
            self.deck_ids.push(card.card_id);
            self.cards.push(card.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn flush(mut self) -> Flushed {
        match self.cards.len() {
            0 => Flushed::Empty,
            1 => match self.cards.pop() {
                Some(card) => Flushed::Single(card),
                None => Flushed::Empty,
            },
            _ => Flushed::Deck(DeckObject {
                name: "Deck".to_string(),
                nickname: self.nickname,
                custom_deck: self.custom_deck,
                deck_ids: self.deck_ids,
                contained_objects: self.cards,
                transform: Transform::default(),
            }),
        }
    }
}
