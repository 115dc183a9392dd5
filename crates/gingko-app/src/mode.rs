// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing::debug;

use crate::{CardId, CardStore, EditBuffer, EditorResult, Mode};

/// Result of writing an edit buffer back into its card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commit {
    pub card: CardId,
    pub changed: bool,
}

/// Navigation/Edit state of the focused card. Edit mode is exactly "an edit
/// buffer is open".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModeController {
    buffer: Option<EditBuffer>,
}

impl ModeController {
    pub fn mode(&self) -> Mode {
        if self.buffer.is_some() {
            Mode::Edit
        } else {
            Mode::Navigation
        }
    }

    pub fn buffer(&self) -> Option<&EditBuffer> {
        self.buffer.as_ref()
    }

    pub fn editing(&self) -> Option<CardId> {
        self.buffer.as_ref().map(EditBuffer::card_id)
    }

    /// Opens a buffer for `card`. A buffer still open for another card is
    /// committed first and reported back.
    pub fn begin_edit(
        &mut self,
        store: &mut CardStore,
        card: CardId,
    ) -> EditorResult<Option<Commit>> {
        debug_assert!(store.contains(card), "edit requested for missing card {card}");
        if self.editing() == Some(card) {
            return Ok(None);
        }

        let previous = match self.editing() {
            Some(_) => self.commit(store)?,
            None => None,
        };
        self.buffer = Some(store.enter_edit_buffer(card)?);
        debug!(card = %card, "entered edit mode");
        Ok(previous)
    }

    /// Writes the open buffer into its card and returns to Navigation. A
    /// failed write keeps the buffer open.
    pub fn commit(&mut self, store: &mut CardStore) -> EditorResult<Option<Commit>> {
        let Some(buffer) = self.buffer.take() else {
            return Ok(None);
        };
        let card = buffer.card_id();
        match store.commit_edit_buffer(card, buffer.text()) {
            Ok(changed) => {
                debug!(card = %card, changed, "committed edit buffer");
                Ok(Some(Commit { card, changed }))
            }
            Err(error) => {
                self.buffer = Some(buffer);
                Err(error)
            }
        }
    }

    /// Writes the open buffer into its card without leaving Edit.
    pub fn write_through(&mut self, store: &mut CardStore) -> EditorResult<bool> {
        match self.buffer.as_mut() {
            Some(buffer) => store.write_through(buffer),
            None => Ok(false),
        }
    }

    /// Appends raw input to the open buffer. Returns false in Navigation.
    pub fn type_text(&mut self, input: &str) -> bool {
        match self.buffer.as_mut() {
            Some(buffer) if !input.is_empty() => {
                buffer.push_str(input);
                true
            }
            _ => false,
        }
    }

    pub fn delete_backward(&mut self) -> bool {
        self.buffer
            .as_mut()
            .is_some_and(EditBuffer::delete_backward)
    }

    /// Drops any open buffer without writing it.
    pub fn reset(&mut self) {
        self.buffer = None;
    }
}
