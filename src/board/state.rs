use std::collections::HashMap;

use crate::domain::position;
use crate::domain::{BoardList, Card};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub list_index: usize,
    pub card_index: usize,
}

/// What the pointer is over, resolved from a raw target id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    /// The list container itself: append at the end.
    List(String),
    /// Another card: insert immediately before it.
    Card(String),
}

#[derive(Debug, Clone)]
struct Entry {
    card: Card,
    rank: usize,
}

/// Client-held board snapshot. Cards live in one flat arena keyed by id; a
/// list's contents are derived by filtering on the list reference and sorting
/// by rank, so lists never own a card-id array that could drift.
#[derive(Debug, Clone, Default)]
pub struct BoardState {
    lists: Vec<BoardList>,
    cards: HashMap<String, Entry>,
}

impl BoardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole snapshot. Lists are ordered by position, cards by
    /// position within their list (ties broken by id so the order is stable).
    pub fn load(&mut self, mut lists: Vec<BoardList>, cards_by_list: HashMap<String, Vec<Card>>) {
        lists.sort_by(|a, b| a.position.total_cmp(&b.position).then_with(|| a.id.cmp(&b.id)));
        self.lists = lists;
        self.cards.clear();

        for (list_id, mut cards) in cards_by_list {
            if self.list_index(&list_id).is_none() {
                tracing::debug!(list_id = list_id.as_str(), "Skipping cards for list not on board");
                continue;
            }
            cards.sort_by(|a, b| a.position.total_cmp(&b.position).then_with(|| a.id.cmp(&b.id)));
            for (rank, mut card) in cards.into_iter().enumerate() {
                card.board_list_id = list_id.clone();
                self.cards.insert(card.id.clone(), Entry { card, rank });
            }
        }
    }

    pub fn lists(&self) -> &[BoardList] {
        &self.lists
    }

    pub fn list_index(&self, list_id: &str) -> Option<usize> {
        self.lists.iter().position(|l| l.id == list_id)
    }

    pub fn card(&self, card_id: &str) -> Option<&Card> {
        self.cards.get(card_id).map(|e| &e.card)
    }

    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    /// Cards of one list in display order.
    pub fn cards_in(&self, list_id: &str) -> Vec<&Card> {
        let mut entries: Vec<&Entry> = self
            .cards
            .values()
            .filter(|e| e.card.board_list_id == list_id)
            .collect();
        entries.sort_by_key(|e| e.rank);
        entries.into_iter().map(|e| &e.card).collect()
    }

    pub fn card_ids(&self, list_id: &str) -> Vec<String> {
        self.cards_in(list_id).into_iter().map(|c| c.id.clone()).collect()
    }

    pub fn locate(&self, card_id: &str) -> Option<Location> {
        let entry = self.cards.get(card_id)?;
        let list_index = self.list_index(&entry.card.board_list_id)?;
        let card_index = self
            .cards
            .values()
            .filter(|e| e.card.board_list_id == entry.card.board_list_id && e.rank < entry.rank)
            .count();

        Some(Location {
            list_index,
            card_index,
        })
    }

    pub fn resolve_target(&self, target_id: &str) -> Option<DropTarget> {
        if self.list_index(target_id).is_some() {
            Some(DropTarget::List(target_id.to_string()))
        } else if self.cards.contains_key(target_id) {
            Some(DropTarget::Card(target_id.to_string()))
        } else {
            None
        }
    }

    /// Moves a card to `dest_index` of `dest_list_id` (clamped to the list
    /// length) and updates its list reference. Positions are left untouched.
    /// Returns false when the card or the destination list is unknown.
    pub fn apply_move(&mut self, card_id: &str, dest_list_id: &str, dest_index: usize) -> bool {
        if self.list_index(dest_list_id).is_none() {
            return false;
        }
        let Some(entry) = self.cards.get_mut(card_id) else {
            return false;
        };

        let source_list_id = std::mem::replace(&mut entry.card.board_list_id, dest_list_id.to_string());

        let mut dest_ids: Vec<String> = self
            .card_ids(dest_list_id)
            .into_iter()
            .filter(|id| id != card_id)
            .collect();
        let index = dest_index.min(dest_ids.len());
        dest_ids.insert(index, card_id.to_string());
        self.rerank(&dest_ids);

        if source_list_id != dest_list_id {
            let source_ids = self.card_ids(&source_list_id);
            self.rerank(&source_ids);
        }

        true
    }

    /// Positions of a list in display order, leaving out one card.
    pub fn positions_excluding(&self, list_id: &str, card_id: &str) -> Vec<f64> {
        self.cards_in(list_id)
            .into_iter()
            .filter(|c| c.id != card_id)
            .map(|c| c.position)
            .collect()
    }

    pub fn set_position(&mut self, card_id: &str, position: f64) -> bool {
        match self.cards.get_mut(card_id) {
            Some(entry) => {
                entry.card.position = position;
                true
            }
            None => false,
        }
    }

    /// Reassigns evenly spaced positions to every card of the list in its
    /// current display order and returns the new values.
    pub fn renumber(&mut self, list_id: &str) -> Vec<(String, f64)> {
        let ids = self.card_ids(list_id);
        let fresh = position::renumbered(ids.len());

        ids.into_iter()
            .zip(fresh)
            .map(|(id, pos)| {
                self.set_position(&id, pos);
                (id, pos)
            })
            .collect()
    }

    /// Adds a card to its list, slotted by position.
    pub fn insert_card(&mut self, card: Card) -> bool {
        if self.list_index(&card.board_list_id).is_none() {
            return false;
        }

        let mut ids: Vec<String> = self
            .cards_in(&card.board_list_id)
            .into_iter()
            .filter(|c| c.id != card.id)
            .map(|c| c.id.clone())
            .collect();
        let index = self
            .cards_in(&card.board_list_id)
            .into_iter()
            .filter(|c| c.id != card.id && c.position <= card.position)
            .count();
        ids.insert(index, card.id.clone());

        self.cards.insert(card.id.clone(), Entry { card, rank: index });
        self.rerank(&ids);
        true
    }

    pub fn remove_card(&mut self, card_id: &str) -> Option<Card> {
        let entry = self.cards.remove(card_id)?;
        let remaining = self.card_ids(&entry.card.board_list_id);
        self.rerank(&remaining);
        Some(entry.card)
    }

    fn rerank(&mut self, ordered_ids: &[String]) {
        for (rank, id) in ordered_ids.iter().enumerate() {
            if let Some(entry) = self.cards.get_mut(id) {
                entry.rank = rank;
            }
        }
    }
}
