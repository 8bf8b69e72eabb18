//! Deck aggregation: flat card placements → per-deck, per-page groups.
//!
//! Cards are grouped by `(deck id, back image)`. Two decks that share an id
//! but have different backs never share a page, since a page carries exactly
//! one backside cell. Each group is split into pages holding at most
//! `page_capacity` cards, opened in encounter order.
//!
//! ```text
//! select_group(loot, loot.png)   → group 0, page 0
//! add_card(.., 1, 1) × 69        → page 0 full
//! add_card(.., 70, 1)            → page 1 opened, card placed
//! select_group(monsters, m.png)  → group 1, page 0
//! ```
//!
//! Iteration order is group-seen order, then page order, then slot order.

use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeckError {
    #[error("no deck group selected before adding card {card}")]
    NoGroupSelected { card: i64 },
    #[error("page capacity must be at least 1")]
    ZeroCapacity,
}

/// One card's place in the layout. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardPlacement {
    pub game_id: String,
    pub collection_id: String,
    pub deck_id: String,
    pub card_id: i64,
    /// Copies requested by the caller. Informational: the card's own
    /// metadata decides how many object entries get emitted.
    pub replication_count: u32,
}

/// Identity of a deck group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeckGroupKey {
    pub deck_id: String,
    pub back_image: String,
}

/// Ordered card slots of one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub slots: Vec<CardPlacement>,
}

impl Page {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckGroup {
    pub key: DeckGroupKey,
    pub pages: Vec<Page>,
}

impl DeckGroup {
    fn new(key: DeckGroupKey) -> Self {
        Self {
            key,
            pages: vec![Page::default()],
        }
    }

    pub fn card_count(&self) -> usize {
        self.pages.iter().map(Page::len).sum()
    }

    /// Pages that hold at least one card.
    pub fn filled_pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.iter().filter(|p| !p.is_empty())
    }
}

/// Builds the group/page structure one placement at a time.
#[derive(Debug)]
pub struct DeckLayout {
    page_capacity: usize,
    groups: Vec<DeckGroup>,
    index: HashMap<DeckGroupKey, usize>,
    current: Option<usize>,
}

impl DeckLayout {
    pub fn new(page_capacity: usize) -> Result<Self, DeckError> {
        if page_capacity == 0 {
            return Err(DeckError::ZeroCapacity);
        }
        Ok(Self {
            page_capacity,
            groups: Vec::new(),
            index: HashMap::new(),
            current: None,
        })
    }

    pub fn page_capacity(&self) -> usize {
        self.page_capacity
    }

    /// Make `(deck_id, back_image)` the current group, creating it with one
    /// empty page if it has not been seen yet.
    pub fn select_group(&mut self, deck_id: &str, back_image: &str) {
        let key = DeckGroupKey {
            deck_id: deck_id.to_string(),
            back_image: back_image.to_string(),
        };
        let idx = match self.index.get(&key) {
            Some(&idx) => idx,
            None => {
                let idx = self.groups.len();
                self.groups.push(DeckGroup::new(key.clone()));
                self.index.insert(key, idx);
                idx
            }
        };
        self.current = Some(idx);
    }

    /// Append a card to the current group's last page, opening a new page
    /// first if that one is full.
    pub fn add_card(
        &mut self,
        game_id: &str,
        collection_id: &str,
        card_id: i64,
        replication_count: u32,
    ) -> Result<(), DeckError> {
        let idx = self
            .current
            .ok_or(DeckError::NoGroupSelected { card: card_id })?;
        let capacity = self.page_capacity;
        let group = &mut self.groups[idx];

        let needs_page = group.pages.last().is_none_or(|p| p.len() >= capacity);
        if needs_page {
            group.pages.push(Page::default());
        }

        let placement = CardPlacement {
            game_id: game_id.to_string(),
            collection_id: collection_id.to_string(),
            deck_id: group.key.deck_id.clone(),
            card_id,
            replication_count: replication_count.max(1),
        };
        if let Some(page) = group.pages.last_mut() {
            page.slots.push(placement);
        }
        Ok(())
    }

    pub fn groups(&self) -> &[DeckGroup] {
        &self.groups
    }

    pub fn into_groups(self) -> Vec<DeckGroup> {
        self.groups
    }

    pub fn card_count(&self) -> usize {
        self.groups.iter().map(DeckGroup::card_count).sum()
    }

    pub fn page_count(&self) -> usize {
        self.groups.iter().map(|g| g.filled_pages().count()).sum()
    }
}
