// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::{Card, CardId, CardRow, EditorError, EditorResult, TreeSnapshot};

/// Text being edited for one card. Nothing reaches the card until the buffer
/// is committed through [`CardStore::commit_edit_buffer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditBuffer {
    card_id: CardId,
    text: String,
    seed: String,
}

impl EditBuffer {
    fn seeded(card_id: CardId, content: &str) -> Self {
        Self {
            card_id,
            text: content.to_owned(),
            seed: content.to_owned(),
        }
    }

    pub const fn card_id(&self) -> CardId {
        self.card_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn selector(&self) -> String {
        self.card_id.edit_selector()
    }

    pub fn push_str(&mut self, input: &str) {
        self.text.push_str(input);
    }

    pub fn delete_backward(&mut self) -> bool {
        self.text.pop().is_some()
    }

    pub fn is_changed(&self) -> bool {
        self.text != self.seed
    }

    fn reseed(&mut self) {
        self.seed.clone_from(&self.text);
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// Arena of cards keyed by id. The hidden root owns the top-level cards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardStore {
    cards: BTreeMap<CardId, Card>,
    focused: CardId,
    next_id: CardId,
    revision: u64,
}

impl Default for CardStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CardStore {
    pub fn new() -> Self {
        let mut root = Card::new(CardId::ROOT, None);
        root.children.push(CardId::FIRST);

        let mut cards = BTreeMap::new();
        cards.insert(CardId::ROOT, root);
        cards.insert(CardId::FIRST, Card::new(CardId::FIRST, Some(CardId::ROOT)));

        Self {
            cards,
            focused: CardId::FIRST,
            next_id: CardId::new(2),
            revision: 0,
        }
    }

    /// Rebuilds a store from persisted rows. Orphaned, cyclic, or duplicate
    /// rows are rejected.
    pub fn from_rows(rows: &[CardRow]) -> EditorResult<Self> {
        if rows.is_empty() {
            return Err(EditorError::InvalidSnapshot("tree has no cards".to_owned()));
        }

        let mut cards = BTreeMap::new();
        cards.insert(CardId::ROOT, Card::new(CardId::ROOT, None));
        for row in rows {
            if row.id.get() <= CardId::ROOT.get() {
                return Err(EditorError::InvalidSnapshot(format!(
                    "card id {} is reserved",
                    row.id
                )));
            }
            let mut card = Card::new(row.id, Some(row.parent));
            card.content = row.content.clone();
            if cards.insert(row.id, card).is_some() {
                return Err(EditorError::InvalidSnapshot(format!(
                    "duplicate card id {}",
                    row.id
                )));
            }
        }

        let mut ordered: Vec<&CardRow> = rows.iter().collect();
        ordered.sort_by_key(|row| (row.parent, row.position, row.id));
        for row in ordered {
            let Some(parent) = cards.get_mut(&row.parent) else {
                return Err(EditorError::InvalidSnapshot(format!(
                    "card {} references missing parent {}",
                    row.id, row.parent
                )));
            };
            parent.children.push(row.id);
        }

        let max_id = rows
            .iter()
            .map(|row| row.id)
            .max()
            .unwrap_or(CardId::FIRST);
        let next_id = max_id.next().ok_or_else(|| {
            EditorError::InvalidSnapshot(EditorError::IdSpaceExhausted.to_string())
        })?;
        let first = cards[&CardId::ROOT].children.first().copied();
        let store = Self {
            cards,
            focused: first.unwrap_or(CardId::FIRST),
            next_id,
            revision: 0,
        };

        let reachable = store.walk().len();
        if first.is_none() || reachable != rows.len() {
            return Err(EditorError::InvalidSnapshot(format!(
                "{} of {} cards are unreachable from the root",
                rows.len() - reachable,
                rows.len()
            )));
        }
        Ok(store)
    }

    /// Increments on every successful content or structure mutation.
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    pub const fn focused_id(&self) -> CardId {
        self.focused
    }

    pub fn focused_card(&self) -> &Card {
        // the focused id always names a live card
        &self.cards[&self.focused]
    }

    pub fn card(&self, id: CardId) -> Option<&Card> {
        if id.is_root() {
            return None;
        }
        self.cards.get(&id)
    }

    pub fn contains(&self, id: CardId) -> bool {
        self.card(id).is_some()
    }

    pub fn content(&self, id: CardId) -> EditorResult<&str> {
        self.card(id)
            .map(|card| card.content.as_str())
            .ok_or(EditorError::NotFound(id))
    }

    pub fn card_count(&self) -> usize {
        self.cards.len() - 1
    }

    pub fn top_level(&self) -> &[CardId] {
        &self.cards[&CardId::ROOT].children
    }

    fn card_mut(&mut self, id: CardId) -> EditorResult<&mut Card> {
        if id.is_root() {
            return Err(EditorError::NotFound(id));
        }
        self.cards.get_mut(&id).ok_or(EditorError::NotFound(id))
    }

    /// Replaces the content of a card. Returns whether the text changed; an
    /// identical write leaves the revision alone.
    pub fn set_content(&mut self, id: CardId, text: impl Into<String>) -> EditorResult<bool> {
        let text = text.into();
        let card = self.card_mut(id)?;
        if card.content == text {
            return Ok(false);
        }
        card.content = text;
        self.bump();
        debug!(card = %id, revision = self.revision, "card content replaced");
        Ok(true)
    }

    pub fn enter_edit_buffer(&self, id: CardId) -> EditorResult<EditBuffer> {
        let content = self.content(id)?;
        Ok(EditBuffer::seeded(id, content))
    }

    pub fn commit_edit_buffer(
        &mut self,
        id: CardId,
        text: impl Into<String>,
    ) -> EditorResult<bool> {
        self.set_content(id, text)
    }

    /// Writes a buffer that stays open into its card. The buffer's text
    /// becomes its new baseline.
    pub fn write_through(&mut self, buffer: &mut EditBuffer) -> EditorResult<bool> {
        if !buffer.is_changed() {
            return Ok(false);
        }
        let changed = self.set_content(buffer.card_id(), buffer.text())?;
        buffer.reseed();
        Ok(changed)
    }

    pub fn focus(&mut self, id: CardId) -> EditorResult<()> {
        if !self.contains(id) {
            return Err(EditorError::NotFound(id));
        }
        self.focused = id;
        Ok(())
    }

    /// Parent card, `None` for top-level cards.
    pub fn parent_of(&self, id: CardId) -> Option<CardId> {
        self.card(id)
            .and_then(|card| card.parent)
            .filter(|parent| !parent.is_root())
    }

    pub fn first_child(&self, id: CardId) -> Option<CardId> {
        self.card(id)
            .and_then(|card| card.children.first().copied())
    }

    pub fn next_sibling(&self, id: CardId) -> Option<CardId> {
        let (siblings, index) = self.siblings(id)?;
        siblings.get(index + 1).copied()
    }

    pub fn prev_sibling(&self, id: CardId) -> Option<CardId> {
        let (siblings, index) = self.siblings(id)?;
        index.checked_sub(1).map(|prev| siblings[prev])
    }

    fn siblings(&self, id: CardId) -> Option<(&[CardId], usize)> {
        let parent = self.card(id)?.parent?;
        let siblings = self.cards.get(&parent)?.children.as_slice();
        let index = siblings.iter().position(|sibling| *sibling == id)?;
        Some((siblings, index))
    }

    pub fn insert_child(&mut self, id: CardId) -> EditorResult<CardId> {
        let index = self.card_mut(id)?.children.len();
        self.insert_at(id, index)
    }

    pub fn insert_below(&mut self, id: CardId) -> EditorResult<CardId> {
        let (parent, index) = self.anchor(id)?;
        self.insert_at(parent, index + 1)
    }

    pub fn insert_above(&mut self, id: CardId) -> EditorResult<CardId> {
        let (parent, index) = self.anchor(id)?;
        self.insert_at(parent, index)
    }

    fn anchor(&self, id: CardId) -> EditorResult<(CardId, usize)> {
        let parent = self
            .card(id)
            .and_then(|card| card.parent)
            .ok_or(EditorError::NotFound(id))?;
        let (_, index) = self.siblings(id).ok_or(EditorError::NotFound(id))?;
        Ok((parent, index))
    }

    fn insert_at(&mut self, parent: CardId, index: usize) -> EditorResult<CardId> {
        let id = self.next_id;
        self.next_id = id.next().ok_or(EditorError::IdSpaceExhausted)?;
        self.cards.insert(id, Card::new(id, Some(parent)));
        if let Some(parent_card) = self.cards.get_mut(&parent) {
            let index = index.min(parent_card.children.len());
            parent_card.children.insert(index, id);
        }
        self.focused = id;
        self.bump();
        debug!(card = %id, parent = %parent, "card inserted");
        Ok(id)
    }

    /// Removes a card with its subtree and returns the card focused afterwards.
    pub fn delete_card(&mut self, id: CardId) -> EditorResult<CardId> {
        let (parent, index) = self.anchor(id)?;
        let replaces_last = parent.is_root() && self.top_level().len() == 1;
        if replaces_last && self.next_id.next().is_none() {
            return Err(EditorError::IdSpaceExhausted);
        }

        let mut removed = BTreeSet::new();
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(card) = self.cards.remove(&next) {
                pending.extend(card.children);
                removed.insert(next);
            }
        }

        let siblings = match self.cards.get_mut(&parent) {
            Some(parent_card) => {
                parent_card.children.retain(|child| *child != id);
                parent_card.children.clone()
            }
            None => Vec::new(),
        };
        self.bump();
        debug!(card = %id, removed = removed.len(), "card subtree deleted");

        if removed.contains(&self.focused) {
            self.focused = if let Some(next) = siblings.get(index) {
                *next
            } else if let Some(prev) = index.checked_sub(1).and_then(|i| siblings.get(i)) {
                *prev
            } else if !parent.is_root() {
                parent
            } else {
                let index = siblings.len();
                self.insert_at(CardId::ROOT, index)?
            };
        }
        Ok(self.focused)
    }

    pub fn depth(&self, id: CardId) -> usize {
        let mut depth = 0;
        let mut current = self.parent_of(id);
        while let Some(parent) = current {
            depth += 1;
            current = self.parent_of(parent);
        }
        depth
    }

    /// Depth-first order of every card with its depth below the root.
    pub fn walk(&self) -> Vec<(CardId, usize)> {
        let mut order = Vec::with_capacity(self.cards.len());
        let mut stack: Vec<(CardId, usize)> = self
            .top_level()
            .iter()
            .rev()
            .map(|id| (*id, 0))
            .collect();
        let mut seen = BTreeSet::new();
        while let Some((id, depth)) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            order.push((id, depth));
            if let Some(card) = self.cards.get(&id) {
                stack.extend(card.children.iter().rev().map(|child| (*child, depth + 1)));
            }
        }
        order
    }

    pub fn snapshot(&self, tree_name: &str) -> TreeSnapshot {
        let rows = self
            .walk()
            .into_iter()
            .filter_map(|(id, _)| self.row(id))
            .collect();
        TreeSnapshot {
            tree_name: tree_name.to_owned(),
            rows,
        }
    }

    fn row(&self, id: CardId) -> Option<CardRow> {
        let card = self.card(id)?;
        let parent = card.parent?;
        let (_, index) = self.siblings(id)?;
        Some(CardRow {
            id,
            parent,
            position: i64::try_from(index).unwrap_or(i64::MAX),
            content: card.content.clone(),
        })
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}
