// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use gingko_app::{
    CardId, CardRow, CloseDecision, ClosePrompt, Collaborators, DecisionSurface, Editor,
    EditorCommand, EditorEvent, EventQueue, Mode, Persistence, TitleSink, TreeSnapshot,
};
use std::collections::VecDeque;
use std::path::PathBuf;

#[derive(Debug, Default)]
pub struct RecordingTitleSink {
    pub titles: Vec<String>,
}

impl RecordingTitleSink {
    pub fn last(&self) -> Option<&str> {
        self.titles.last().map(String::as_str)
    }
}

impl TitleSink for RecordingTitleSink {
    fn set_title(&mut self, title: &str) {
        self.titles.push(title.to_owned());
    }
}

/// Decision surface driven by a script. Each presentation consumes one
/// scripted answer; `None` (or an exhausted script) leaves the prompt open.
#[derive(Debug, Default)]
pub struct ScriptedDecisionSurface {
    answers: VecDeque<Option<CloseDecision>>,
    pub presented: Vec<ClosePrompt>,
}

impl ScriptedDecisionSurface {
    pub fn answering(answers: impl IntoIterator<Item = CloseDecision>) -> Self {
        Self {
            answers: answers.into_iter().map(Some).collect(),
            presented: Vec::new(),
        }
    }

    /// Never answers synchronously; the test pushes `Decide` itself.
    pub fn deferred() -> Self {
        Self::default()
    }

    /// Same numeric convention as a native dialog: 0 discard, 1 cancel,
    /// 2 save.
    pub fn from_dialog_index(index: i64) -> Result<Self> {
        let Some(decision) = CloseDecision::from_dialog_index(index) else {
            bail!("dialog choice {index} is not one of 0, 1, 2");
        };
        Ok(Self::answering([decision]))
    }

    pub fn presentations(&self) -> usize {
        self.presented.len()
    }
}

impl DecisionSurface for ScriptedDecisionSurface {
    fn present(&mut self, prompt: &ClosePrompt) -> Option<CloseDecision> {
        self.presented.push(prompt.clone());
        self.answers.pop_front().flatten()
    }
}

#[derive(Debug, Default)]
pub struct MemoryPersistence {
    pub saves: Vec<TreeSnapshot>,
    failure: Option<String>,
}

impl MemoryPersistence {
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            saves: Vec::new(),
            failure: Some(reason.into()),
        }
    }

    pub fn recover(&mut self) {
        self.failure = None;
    }

    pub fn save_count(&self) -> usize {
        self.saves.len()
    }

    pub fn last(&self) -> Option<&TreeSnapshot> {
        self.saves.last()
    }
}

impl Persistence for MemoryPersistence {
    fn save(&mut self, snapshot: &TreeSnapshot) -> Result<()> {
        if let Some(reason) = &self.failure {
            bail!("{reason}");
        }
        self.saves.push(snapshot.clone());
        Ok(())
    }
}

/// Everything the cancel path must leave untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFingerprint {
    pub mode: Mode,
    pub focused: CardId,
    pub dirty: bool,
    pub title: String,
    pub buffer: Option<String>,
    pub cards: Vec<CardRow>,
}

impl DocumentFingerprint {
    pub fn of(editor: &Editor) -> Self {
        Self {
            mode: editor.mode(),
            focused: editor.focused_id(),
            dirty: editor.is_dirty(),
            title: editor.title(),
            buffer: editor.buffer().map(|buffer| buffer.text().to_owned()),
            cards: editor.store().snapshot(editor.tree_name()).rows,
        }
    }
}

/// An editor wired to recording collaborators through an [`EventQueue`].
pub struct Harness {
    pub editor: Editor,
    pub queue: EventQueue,
    pub titles: RecordingTitleSink,
    pub surface: ScriptedDecisionSurface,
    pub persistence: MemoryPersistence,
}

impl Default for Harness {
    fn default() -> Self {
        Self::with_surface(ScriptedDecisionSurface::deferred())
    }
}

impl Harness {
    pub fn with_surface(surface: ScriptedDecisionSurface) -> Self {
        Self {
            editor: Editor::default(),
            queue: EventQueue::default(),
            titles: RecordingTitleSink::default(),
            surface,
            persistence: MemoryPersistence::default(),
        }
    }

    pub fn with_editor(mut self, editor: Editor) -> Self {
        self.editor = editor;
        self
    }

    pub fn with_persistence(mut self, persistence: MemoryPersistence) -> Self {
        self.persistence = persistence;
        self
    }

    pub fn send(&mut self, command: EditorCommand) -> Vec<EditorEvent> {
        self.send_all([command])
    }

    pub fn send_all(
        &mut self,
        commands: impl IntoIterator<Item = EditorCommand>,
    ) -> Vec<EditorEvent> {
        for command in commands {
            self.queue.push(command);
        }
        let mut collaborators = Collaborators {
            persistence: &mut self.persistence,
            title: &mut self.titles,
            decisions: &mut self.surface,
        };
        self.queue.drain(&mut self.editor, &mut collaborators)
    }

    /// Enter, type, and leave the buffer open.
    pub fn type_into_focused(&mut self, text: &str) -> Vec<EditorEvent> {
        self.send_all([
            EditorCommand::EnterEdit,
            EditorCommand::InsertText(text.to_owned()),
        ])
    }

    pub fn fingerprint(&self) -> DocumentFingerprint {
        DocumentFingerprint::of(&self.editor)
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("gingko.db");
    Ok((dir, path))
}

pub fn sample_tree(tree_name: &str) -> TreeSnapshot {
    let row = |id: i64, parent: i64, position: i64, content: &str| CardRow {
        id: CardId::new(id),
        parent: CardId::new(parent),
        position,
        content: content.to_owned(),
    };
    TreeSnapshot {
        tree_name: tree_name.to_owned(),
        rows: vec![
            row(1, 0, 0, "Chapter one"),
            row(2, 1, 0, "Opening scene"),
            row(3, 1, 1, "Conflict"),
            row(4, 0, 1, "Chapter two"),
        ],
    }
}
