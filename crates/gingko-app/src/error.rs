// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;

use crate::{CardId, ClosePhase};

pub type EditorResult<T> = Result<T, EditorError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error("card {0} not found")]
    NotFound(CardId),
    #[error("save failed: {reason}")]
    PersistenceFailure { reason: String },
    #[error("{action} ignored while close is {phase}")]
    InvalidTransition {
        phase: ClosePhase,
        action: &'static str,
    },
    #[error("card id space exhausted")]
    IdSpaceExhausted,
    #[error("invalid tree snapshot: {0}")]
    InvalidSnapshot(String),
}

impl EditorError {
    /// Ignorable errors leave every piece of document state untouched.
    pub const fn is_ignorable(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. })
    }
}
