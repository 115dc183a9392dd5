// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::ids::CardId;

pub const APP_NAME: &str = "Gingko";
pub const DEFAULT_TREE_NAME: &str = "Untitled Tree";
pub const DIRTY_MARKER: char = '*';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Navigation,
    Edit,
}

impl Mode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Navigation => "navigation",
            Self::Edit => "edit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseDecision {
    Save,
    Discard,
    Cancel,
}

impl CloseDecision {
    pub const ALL: [Self; 3] = [Self::Save, Self::Discard, Self::Cancel];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Save => "save",
            Self::Discard => "discard",
            Self::Cancel => "cancel",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Save => "Save",
            Self::Discard => "Close without saving",
            Self::Cancel => "Cancel",
        }
    }

    /// Maps the index convention of native dialogs: 0 discards, 1 cancels,
    /// 2 saves.
    pub const fn from_dialog_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(Self::Discard),
            1 => Some(Self::Cancel),
            2 => Some(Self::Save),
            _ => None,
        }
    }

    pub const fn dialog_index(self) -> i64 {
        match self {
            Self::Discard => 0,
            Self::Cancel => 1,
            Self::Save => 2,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "save" => Some(Self::Save),
            "discard" => Some(Self::Discard),
            "cancel" => Some(Self::Cancel),
            _ => None,
        }
    }
}

/// Window title for a tree: `*` prefix iff the document is dirty.
pub fn window_title(tree_name: &str, dirty: bool) -> String {
    if dirty {
        format!("{DIRTY_MARKER}{tree_name} - {APP_NAME}")
    } else {
        format!("{tree_name} - {APP_NAME}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub id: CardId,
    pub content: String,
    pub parent: Option<CardId>,
    pub children: Vec<CardId>,
}

impl Card {
    pub fn new(id: CardId, parent: Option<CardId>) -> Self {
        Self {
            id,
            content: String::new(),
            parent,
            children: Vec::new(),
        }
    }
}

/// One persisted card. `position` orders siblings under `parent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRow {
    pub id: CardId,
    pub parent: CardId,
    pub position: i64,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub tree_name: String,
    pub rows: Vec<CardRow>,
}

impl TreeSnapshot {
    pub fn content_of(&self, id: CardId) -> Option<&str> {
        self.rows
            .iter()
            .find(|row| row.id == id)
            .map(|row| row.content.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosePrompt {
    pub tree_name: String,
    pub message: String,
    pub choices: [CloseDecision; 3],
}

impl ClosePrompt {
    pub fn for_tree(tree_name: &str) -> Self {
        Self {
            tree_name: tree_name.to_owned(),
            message: format!("Save changes to \"{tree_name}\" before closing?"),
            choices: CloseDecision::ALL,
        }
    }
}
