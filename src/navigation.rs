//! Cursor and filter state over one fetched deck.
//!
//! A `DeckView` is built once per page session from the deck returned by the
//! list endpoint. Filtering and cursor moves never touch the store.

use serde::Serialize;

use crate::deck::{Cover, Deck};

#[derive(Debug, Clone, Default)]
pub struct DeckView {
    all_covers: Deck,
    // positions into `all_covers`, ascending
    visible: Vec<usize>,
    active_index: usize,
    term: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot<'a> {
    pub covers: Vec<&'a Cover>,
    pub active_index: usize,
    pub term: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverCard<'a> {
    pub cover: &'a Cover,
    // display fields, blank when the record leaves them out
    pub title: &'a str,
    pub label: &'a str,
    pub category: &'a str,
    pub image: &'a str,
    pub position: usize,
    pub active: bool,
}

impl DeckView {
    pub fn new(deck: Deck) -> Self {
        let visible = (0..deck.len()).collect();
        Self {
            all_covers: deck,
            visible,
            active_index: 0,
            term: String::new(),
        }
    }

    pub fn all_covers(&self) -> &[Cover] {
        &self.all_covers
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    pub fn active(&self) -> Option<&Cover> {
        self.visible
            .get(self.active_index)
            .map(|&i| &self.all_covers[i])
    }

    /// Case-insensitive substring match on the display title (`title`, else
    /// `albumTitle`). Always moves the cursor back to the first match.
    pub fn filter(&mut self, term: &str) {
        self.term = term.to_string();
        self.visible = matching(&self.all_covers, &self.term);
        self.active_index = 0;
    }

    /// Move the cursor by `delta`, stopping at either end.
    pub fn advance(&mut self, delta: isize) {
        let last = self.visible.len().saturating_sub(1);
        let target = (self.active_index as isize).saturating_add(delta);
        self.active_index = target.clamp(0, last as isize) as usize;
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            covers: self.visible_covers().collect(),
            active_index: self.active_index,
            term: &self.term,
        }
    }

    /// Every visible cover, in order, with the active one flagged.
    pub fn render(&self) -> Vec<CoverCard<'_>> {
        self.visible_covers()
            .enumerate()
            .map(|(position, cover)| CoverCard {
                cover,
                title: cover.display_title(),
                label: cover.cover_label(),
                category: cover.category(),
                image: cover.front_image(),
                position,
                active: position == self.active_index,
            })
            .collect()
    }

    /// Swap in a freshly fetched deck in one step: the current term is
    /// re-applied and the cursor is clamped into the new view.
    pub fn replace_snapshot(&mut self, deck: Deck) {
        self.all_covers = deck;
        self.visible = matching(&self.all_covers, &self.term);
        self.active_index = self.active_index.min(self.visible.len().saturating_sub(1));
    }

    /// Drop the first cover with `id` from the local copy after a delete.
    pub fn remove_local(&mut self, id: u64) -> Option<Cover> {
        let index = self.all_covers.iter().position(|c| c.id == id)?;
        let removed_view_position = self.visible.iter().position(|&i| i == index);

        let removed = self.all_covers.remove(index);
        self.visible = matching(&self.all_covers, &self.term);

        if let Some(position) = removed_view_position {
            self.active_index = repair_cursor(self.active_index, position);
        }
        self.active_index = self.active_index.min(self.visible.len().saturating_sub(1));
        Some(removed)
    }

    fn visible_covers(&self) -> impl Iterator<Item = &Cover> + '_ {
        self.visible.iter().map(|&i| &self.all_covers[i])
    }
}

/// Cursor after the entry at `removed_position` is deleted: it steps back
/// one when the removal was at or before it.
pub fn repair_cursor(active_index: usize, removed_position: usize) -> usize {
    if removed_position <= active_index {
        active_index.saturating_sub(1)
    } else {
        active_index
    }
}

fn matching(covers: &[Cover], term: &str) -> Vec<usize> {
    let needle = term.to_lowercase();
    covers
        .iter()
        .enumerate()
        .filter(|(_, c)| c.display_title().to_lowercase().contains(&needle))
        .map(|(i, _)| i)
        .collect()
}
