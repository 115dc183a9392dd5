// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;

use crate::{CloseDecision, ClosePrompt, TreeSnapshot};

/// Receives the window title every time it is recomputed.
pub trait TitleSink {
    fn set_title(&mut self, title: &str);
}

/// Modal save/discard/cancel prompt.
pub trait DecisionSurface {
    /// Shows the prompt. Returns the choice when it is known right away, or
    /// `None` when the answer will arrive later as a
    /// [`crate::EditorCommand::Decide`].
    fn present(&mut self, prompt: &ClosePrompt) -> Option<CloseDecision>;
}

pub trait Persistence {
    fn save(&mut self, snapshot: &TreeSnapshot) -> Result<()>;
}
