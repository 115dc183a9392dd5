// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(i64);

        impl $name {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(CardId);

impl CardId {
    /// Hidden tree root. Owns the top-level cards; never focusable.
    pub const ROOT: Self = Self(0);
    pub const FIRST: Self = Self(1);

    pub const fn is_root(self) -> bool {
        self.0 == Self::ROOT.0
    }

    /// `None` once the id space is used up.
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// Selector of the card's read view, e.g. `#card-1`.
    pub fn view_selector(self) -> String {
        format!("#card-{}", self.0)
    }

    /// Selector of the card's edit buffer, e.g. `#card-edit-1`.
    pub fn edit_selector(self) -> String {
        format!("#card-edit-{}", self.0)
    }

    /// Selector of the committed content inside the read view.
    pub fn content_selector(self) -> String {
        format!("#card-{} .view", self.0)
    }
}
