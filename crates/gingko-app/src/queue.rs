// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::VecDeque;

use tracing::debug;

use crate::{DecisionSurface, Editor, EditorCommand, EditorEvent, Persistence, TitleSink};

/// The collaborators an [`EventQueue`] feeds while draining.
pub struct Collaborators<'a> {
    pub persistence: &'a mut dyn Persistence,
    pub title: &'a mut dyn TitleSink,
    pub decisions: &'a mut dyn DecisionSurface,
}

/// Serializes keyboard, menu and shutdown input into one command stream so
/// no two transitions interleave.
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: VecDeque<EditorCommand>,
}

impl EventQueue {
    pub fn push(&mut self, command: EditorCommand) {
        self.pending.push_back(command);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Runs every queued command to completion in arrival order, routing
    /// titles to the title sink and close prompts to the decision surface.
    /// An immediate answer from the surface is processed before anything
    /// queued behind the close request. Once the editor is closing the rest
    /// of the queue is discarded.
    pub fn drain(
        &mut self,
        editor: &mut Editor,
        collaborators: &mut Collaborators<'_>,
    ) -> Vec<EditorEvent> {
        let mut emitted = Vec::new();
        while let Some(command) = self.pending.pop_front() {
            if editor.is_closing() {
                debug!(dropped = self.pending.len() + 1, "editor closing; queue discarded");
                self.pending.clear();
                break;
            }

            let events = editor.dispatch(command, &mut *collaborators.persistence);
            for event in &events {
                match event {
                    EditorEvent::TitleChanged(title) => collaborators.title.set_title(title),
                    EditorEvent::DecisionRequested(prompt) => {
                        if let Some(decision) = collaborators.decisions.present(prompt) {
                            self.pending.push_front(EditorCommand::Decide(decision));
                        }
                    }
                    _ => {}
                }
            }
            emitted.extend(events);
        }
        emitted
    }
}
