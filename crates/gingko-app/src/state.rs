// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing::{debug, info, warn};

use crate::{
    CardId, CardStore, CloseCoordinator, CloseDecision, ClosePhase, ClosePrompt, CloseRequest,
    Commit, DEFAULT_TREE_NAME, DirtyTracker, EditBuffer, EditorError, EditorResult, Mode,
    ModeController, Persistence, Resolution, TreeSnapshot,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorCommand {
    EnterEdit,
    CommitEdit,
    InsertText(String),
    DeleteBackward,
    FocusUp,
    FocusDown,
    FocusLeft,
    FocusRight,
    Focus(CardId),
    InsertChild,
    InsertBelow,
    InsertAbove,
    DeleteCard,
    Save,
    RequestClose,
    Decide(CloseDecision),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    ModeChanged(Mode),
    FocusChanged(CardId),
    BufferChanged { card: CardId, text: String },
    ContentCommitted { card: CardId, content: String },
    CardInserted(CardId),
    CardDeleted(CardId),
    TitleChanged(String),
    Saved,
    DecisionRequested(ClosePrompt),
    CloseAborted,
    Closing,
    StatusUpdated(String),
    StatusCleared,
}

/// One open document: the card tree plus the mode, dirty and close state
/// machines that guard it. Commands run to completion one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Editor {
    store: CardStore,
    mode: ModeController,
    dirty: DirtyTracker,
    close: CloseCoordinator,
    status_line: Option<String>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(DEFAULT_TREE_NAME)
    }
}

impl Editor {
    pub fn new(tree_name: impl Into<String>) -> Self {
        Self::with_store(CardStore::new(), tree_name)
    }

    /// Opens a previously saved tree. The result is clean and in Navigation.
    pub fn from_snapshot(snapshot: &TreeSnapshot) -> EditorResult<Self> {
        let store = CardStore::from_rows(&snapshot.rows)?;
        Ok(Self::with_store(store, snapshot.tree_name.clone()))
    }

    fn with_store(store: CardStore, tree_name: impl Into<String>) -> Self {
        let dirty = DirtyTracker::new(tree_name, store.revision());
        Self {
            store,
            mode: ModeController::default(),
            dirty,
            close: CloseCoordinator::default(),
            status_line: None,
        }
    }

    pub fn store(&self) -> &CardStore {
        &self.store
    }

    pub fn mode(&self) -> Mode {
        self.mode.mode()
    }

    pub fn buffer(&self) -> Option<&EditBuffer> {
        self.mode.buffer()
    }

    pub fn focused_id(&self) -> CardId {
        self.store.focused_id()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_dirty()
    }

    pub fn title(&self) -> String {
        self.dirty.title()
    }

    pub fn tree_name(&self) -> &str {
        self.dirty.tree_name()
    }

    pub fn close_phase(&self) -> ClosePhase {
        self.close.phase()
    }

    pub fn is_closing(&self) -> bool {
        self.close.is_closing()
    }

    pub fn status_line(&self) -> Option<&str> {
        self.status_line.as_deref()
    }

    /// The tree as the user currently sees it: an open buffer's text stands
    /// in for its card's committed content.
    pub fn persistable_snapshot(&self) -> TreeSnapshot {
        let mut snapshot = self.store.snapshot(self.dirty.tree_name());
        if let Some(buffer) = self.mode.buffer()
            && let Some(row) = snapshot
                .rows
                .iter_mut()
                .find(|row| row.id == buffer.card_id())
        {
            row.content = buffer.text().to_owned();
        }
        snapshot
    }

    pub fn dispatch(
        &mut self,
        command: EditorCommand,
        persistence: &mut dyn Persistence,
    ) -> Vec<EditorEvent> {
        if self.close.is_closing() {
            debug!(?command, "document closing; command dropped");
            return Vec::new();
        }
        if self.close.is_awaiting_decision() && !matches!(command, EditorCommand::Decide(_)) {
            debug!(?command, "close decision pending; command dropped");
            return Vec::new();
        }
        self.close.settle();

        let mut events = match self.apply(command, persistence) {
            Ok(events) => events,
            Err(error) if error.is_ignorable() => {
                warn!(%error, "ignored command");
                Vec::new()
            }
            Err(error) => {
                warn!(%error, "command failed");
                vec![self.set_status(error.to_string())]
            }
        };

        if let Some(title) = self.dirty.observe(self.store.revision()) {
            events.push(EditorEvent::TitleChanged(title));
        }
        events
    }

    fn apply(
        &mut self,
        command: EditorCommand,
        persistence: &mut dyn Persistence,
    ) -> EditorResult<Vec<EditorEvent>> {
        match command {
            EditorCommand::EnterEdit => {
                let focused = self.store.focused_id();
                self.enter_edit(focused)
            }
            EditorCommand::CommitEdit => self.leave_edit(),
            EditorCommand::InsertText(text) => {
                Ok(self.edit_buffer(|mode| mode.type_text(&text)))
            }
            EditorCommand::DeleteBackward => {
                Ok(self.edit_buffer(ModeController::delete_backward))
            }
            EditorCommand::FocusUp => {
                let target = self.store.prev_sibling(self.focused_id());
                self.move_focus(target)
            }
            EditorCommand::FocusDown => {
                let target = self.store.next_sibling(self.focused_id());
                self.move_focus(target)
            }
            EditorCommand::FocusLeft => {
                let target = self.store.parent_of(self.focused_id());
                self.move_focus(target)
            }
            EditorCommand::FocusRight => {
                let target = self.store.first_child(self.focused_id());
                self.move_focus(target)
            }
            EditorCommand::Focus(card) => {
                if !self.store.contains(card) {
                    return Err(EditorError::NotFound(card));
                }
                self.move_focus(Some(card))
            }
            EditorCommand::InsertChild => self.insert(CardStore::insert_child),
            EditorCommand::InsertBelow => self.insert(CardStore::insert_below),
            EditorCommand::InsertAbove => self.insert(CardStore::insert_above),
            EditorCommand::DeleteCard => self.delete_focused(),
            EditorCommand::Save => self.save(persistence),
            EditorCommand::RequestClose => Ok(self.request_close()),
            EditorCommand::Decide(decision) => self.decide(decision, persistence),
            EditorCommand::ClearStatus => {
                self.status_line = None;
                Ok(vec![EditorEvent::StatusCleared])
            }
        }
    }

    fn enter_edit(&mut self, card: CardId) -> EditorResult<Vec<EditorEvent>> {
        if self.mode.editing() == Some(card) {
            return Ok(Vec::new());
        }
        let previous = self.mode.begin_edit(&mut self.store, card)?;
        let mut events = Vec::new();
        if let Some(commit) = previous {
            events.push(self.committed(commit));
        }
        events.push(EditorEvent::ModeChanged(Mode::Edit));
        events.push(self.buffer_changed());
        Ok(events)
    }

    fn leave_edit(&mut self) -> EditorResult<Vec<EditorEvent>> {
        match self.mode.commit(&mut self.store)? {
            Some(commit) => Ok(vec![
                self.committed(commit),
                EditorEvent::ModeChanged(Mode::Navigation),
            ]),
            None => Ok(Vec::new()),
        }
    }

    fn edit_buffer(
        &mut self,
        edit: impl FnOnce(&mut ModeController) -> bool,
    ) -> Vec<EditorEvent> {
        if !edit(&mut self.mode) {
            return Vec::new();
        }
        let mut events = vec![self.buffer_changed()];
        if let Some(title) = self.dirty.note_buffer_edit() {
            events.push(EditorEvent::TitleChanged(title));
        }
        events
    }

    fn move_focus(&mut self, target: Option<CardId>) -> EditorResult<Vec<EditorEvent>> {
        let Some(target) = target else {
            return Ok(Vec::new());
        };
        if target == self.store.focused_id() {
            return Ok(Vec::new());
        }
        let mut events = self.leave_edit()?;
        self.store.focus(target)?;
        events.push(EditorEvent::FocusChanged(target));
        Ok(events)
    }

    fn insert(
        &mut self,
        insert: impl FnOnce(&mut CardStore, CardId) -> EditorResult<CardId>,
    ) -> EditorResult<Vec<EditorEvent>> {
        let mut events = self.leave_edit()?;
        let anchor = self.store.focused_id();
        let card = insert(&mut self.store, anchor)?;
        events.push(EditorEvent::CardInserted(card));
        events.push(EditorEvent::FocusChanged(card));
        events.extend(self.enter_edit(card)?);
        Ok(events)
    }

    fn delete_focused(&mut self) -> EditorResult<Vec<EditorEvent>> {
        let card = self.store.focused_id();
        let mut events = Vec::new();
        if self.mode.mode() == Mode::Edit {
            if self.mode.editing() == Some(card) {
                self.mode.reset();
                events.push(EditorEvent::ModeChanged(Mode::Navigation));
            } else {
                events.extend(self.leave_edit()?);
            }
        }
        let focus = self.store.delete_card(card)?;
        events.push(EditorEvent::CardDeleted(card));
        events.push(EditorEvent::FocusChanged(focus));
        Ok(events)
    }

    fn save(&mut self, persistence: &mut dyn Persistence) -> EditorResult<Vec<EditorEvent>> {
        let snapshot = self.persistable_snapshot();
        persistence
            .save(&snapshot)
            .map_err(|error| EditorError::PersistenceFailure {
                reason: format!("{error:#}"),
            })?;
        info!(tree = %snapshot.tree_name, cards = snapshot.rows.len(), "tree saved");
        self.mode.write_through(&mut self.store)?;
        Ok(self.saved())
    }

    fn saved(&mut self) -> Vec<EditorEvent> {
        let mut events = vec![EditorEvent::Saved, self.set_status("saved".to_owned())];
        if let Some(title) = self.dirty.mark_saved(self.store.revision()) {
            events.push(EditorEvent::TitleChanged(title));
        }
        events
    }

    fn request_close(&mut self) -> Vec<EditorEvent> {
        match self.close.request_close(self.dirty.is_dirty()) {
            CloseRequest::Closing => vec![EditorEvent::Closing],
            CloseRequest::AwaitingDecision => vec![EditorEvent::DecisionRequested(
                ClosePrompt::for_tree(self.dirty.tree_name()),
            )],
            CloseRequest::Ignored => Vec::new(),
        }
    }

    fn decide(
        &mut self,
        decision: CloseDecision,
        persistence: &mut dyn Persistence,
    ) -> EditorResult<Vec<EditorEvent>> {
        let snapshot = self.persistable_snapshot();
        let resolution = self.close.resolve(decision, || {
            persistence
                .save(&snapshot)
                .map_err(|error| format!("{error:#}"))
        })?;

        match resolution {
            Resolution::Closing { saved } => {
                let mut events = if saved { self.saved() } else { Vec::new() };
                events.push(EditorEvent::Closing);
                Ok(events)
            }
            Resolution::Aborted => Ok(vec![EditorEvent::CloseAborted]),
        }
    }

    fn committed(&self, commit: Commit) -> EditorEvent {
        EditorEvent::ContentCommitted {
            card: commit.card,
            content: self
                .store
                .content(commit.card)
                .map(str::to_owned)
                .unwrap_or_default(),
        }
    }

    fn buffer_changed(&self) -> EditorEvent {
        match self.mode.buffer() {
            Some(buffer) => EditorEvent::BufferChanged {
                card: buffer.card_id(),
                text: buffer.text().to_owned(),
            },
            None => EditorEvent::ModeChanged(Mode::Navigation),
        }
    }

    fn set_status(&mut self, message: String) -> EditorEvent {
        self.status_line = Some(message.clone());
        EditorEvent::StatusUpdated(message)
    }
}

#[cfg(test)]
mod tests {
    use super::{Editor, EditorCommand, EditorEvent};
    use crate::{CardId, CloseDecision, ClosePhase, Mode, Persistence, TreeSnapshot};
    use anyhow::{Result, bail};

    #[derive(Default)]
    struct StubPersistence {
        saves: Vec<TreeSnapshot>,
        fail: bool,
    }

    impl Persistence for StubPersistence {
        fn save(&mut self, snapshot: &TreeSnapshot) -> Result<()> {
            if self.fail {
                bail!("disk full");
            }
            self.saves.push(snapshot.clone());
            Ok(())
        }
    }

    fn run(
        editor: &mut Editor,
        db: &mut StubPersistence,
        commands: Vec<EditorCommand>,
    ) -> Vec<EditorEvent> {
        commands
            .into_iter()
            .flat_map(|command| editor.dispatch(command, &mut *db))
            .collect()
    }

    #[test]
    fn new_editor_matches_startup_state() {
        let editor = Editor::default();
        assert_eq!(editor.title(), "Untitled Tree - Gingko");
        assert_eq!(editor.mode(), Mode::Navigation);
        assert_eq!(editor.focused_id(), CardId::FIRST);
        assert!(!editor.is_dirty());
        assert_eq!(editor.close_phase(), ClosePhase::Idle);
    }

    #[test]
    fn typing_marks_dirty_before_commit() {
        let mut editor = Editor::default();
        let mut db = StubPersistence::default();

        let events = run(
            &mut editor,
            &mut db,
            vec![
                EditorCommand::EnterEdit,
                EditorCommand::InsertText("Hello World".to_owned()),
            ],
        );

        assert_eq!(
            events,
            vec![
                EditorEvent::ModeChanged(Mode::Edit),
                EditorEvent::BufferChanged {
                    card: CardId::FIRST,
                    text: String::new(),
                },
                EditorEvent::BufferChanged {
                    card: CardId::FIRST,
                    text: "Hello World".to_owned(),
                },
                EditorEvent::TitleChanged("*Untitled Tree - Gingko".to_owned()),
            ]
        );
        assert_eq!(editor.store().content(CardId::FIRST), Ok(""));
    }

    #[test]
    fn commit_exposes_content_and_keeps_title_dirty() {
        let mut editor = Editor::default();
        let mut db = StubPersistence::default();
        run(
            &mut editor,
            &mut db,
            vec![
                EditorCommand::EnterEdit,
                EditorCommand::InsertText("Hello World".to_owned()),
            ],
        );

        let events = editor.dispatch(EditorCommand::CommitEdit, &mut db);
        assert_eq!(
            events,
            vec![
                EditorEvent::ContentCommitted {
                    card: CardId::FIRST,
                    content: "Hello World".to_owned(),
                },
                EditorEvent::ModeChanged(Mode::Navigation),
            ]
        );
        assert_eq!(editor.title(), "*Untitled Tree - Gingko");
    }

    #[test]
    fn focus_change_commits_open_buffer() {
        let mut editor = Editor::default();
        let mut db = StubPersistence::default();
        run(
            &mut editor,
            &mut db,
            vec![
                EditorCommand::InsertBelow,
                EditorCommand::InsertText("second".to_owned()),
                EditorCommand::FocusUp,
            ],
        );
        assert_eq!(editor.mode(), Mode::Navigation);
        assert_eq!(editor.focused_id(), CardId::FIRST);
        assert_eq!(editor.store().content(CardId::new(2)), Ok("second"));
    }

    #[test]
    fn focus_on_missing_card_reports_not_found() {
        let mut editor = Editor::default();
        let mut db = StubPersistence::default();
        let events = editor.dispatch(EditorCommand::Focus(CardId::new(99)), &mut db);
        assert_eq!(
            events,
            vec![EditorEvent::StatusUpdated("card 99 not found".to_owned())]
        );
        assert_eq!(editor.focused_id(), CardId::FIRST);
    }

    #[test]
    fn save_clears_dirty_and_failure_keeps_it() {
        let mut editor = Editor::default();
        let mut db = StubPersistence {
            fail: true,
            ..StubPersistence::default()
        };
        run(
            &mut editor,
            &mut db,
            vec![
                EditorCommand::EnterEdit,
                EditorCommand::InsertText("x".to_owned()),
            ],
        );

        editor.dispatch(EditorCommand::Save, &mut db);
        assert!(editor.is_dirty());
        assert_eq!(editor.status_line(), Some("save failed: disk full"));

        db.fail = false;
        let events = editor.dispatch(EditorCommand::Save, &mut db);
        assert!(events.contains(&EditorEvent::TitleChanged(
            "Untitled Tree - Gingko".to_owned()
        )));
        assert!(!editor.is_dirty());
        assert_eq!(db.saves[0].content_of(CardId::FIRST), Some("x"));
        assert_eq!(editor.mode(), Mode::Edit);
    }

    #[test]
    fn commands_are_dropped_while_a_decision_is_pending() {
        let mut editor = Editor::default();
        let mut db = StubPersistence::default();
        run(
            &mut editor,
            &mut db,
            vec![
                EditorCommand::EnterEdit,
                EditorCommand::InsertText("x".to_owned()),
                EditorCommand::RequestClose,
            ],
        );
        assert_eq!(editor.close_phase(), ClosePhase::AwaitingDecision);

        assert!(
            editor
                .dispatch(EditorCommand::InsertText("y".to_owned()), &mut db)
                .is_empty()
        );
        assert!(editor.dispatch(EditorCommand::RequestClose, &mut db).is_empty());
        assert_eq!(editor.buffer().map(|buffer| buffer.text()), Some("x"));
    }

    #[test]
    fn save_decision_persists_open_buffer_then_closes() {
        let mut editor = Editor::default();
        let mut db = StubPersistence::default();
        let events = run(
            &mut editor,
            &mut db,
            vec![
                EditorCommand::EnterEdit,
                EditorCommand::InsertText("draft".to_owned()),
                EditorCommand::RequestClose,
                EditorCommand::Decide(CloseDecision::Save),
            ],
        );
        assert_eq!(events.last(), Some(&EditorEvent::Closing));
        assert!(editor.is_closing());
        assert_eq!(db.saves.len(), 1);
        assert_eq!(db.saves[0].content_of(CardId::FIRST), Some("draft"));
        assert!(editor.dispatch(EditorCommand::EnterEdit, &mut db).is_empty());
    }

    #[test]
    fn delete_while_editing_drops_the_buffer() {
        let mut editor = Editor::default();
        let mut db = StubPersistence::default();
        run(
            &mut editor,
            &mut db,
            vec![
                EditorCommand::InsertChild,
                EditorCommand::InsertText("gone".to_owned()),
                EditorCommand::DeleteCard,
            ],
        );
        assert_eq!(editor.mode(), Mode::Navigation);
        assert_eq!(editor.focused_id(), CardId::FIRST);
        assert_eq!(editor.store().card_count(), 1);
    }

    #[test]
    fn loaded_tree_starts_clean() -> Result<()> {
        let mut source = Editor::new("plan");
        let mut db = StubPersistence::default();
        run(
            &mut source,
            &mut db,
            vec![
                EditorCommand::EnterEdit,
                EditorCommand::InsertText("root".to_owned()),
                EditorCommand::InsertChild,
                EditorCommand::InsertText("leaf".to_owned()),
                EditorCommand::CommitEdit,
            ],
        );

        let loaded = Editor::from_snapshot(&source.persistable_snapshot())?;
        assert_eq!(loaded.title(), "plan - Gingko");
        assert!(!loaded.is_dirty());
        assert_eq!(loaded.mode(), Mode::Navigation);
        assert_eq!(loaded.focused_id(), CardId::FIRST);
        assert_eq!(loaded.store().content(CardId::new(2)), Ok("leaf"));
        Ok(())
    }
}
