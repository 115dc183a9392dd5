// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use gingko_app::{CardId, Editor, EditorCommand, EditorEvent, Mode};
use gingko_testkit::{Harness, sample_tree};

#[test]
fn new_document_has_untitled_title_and_one_card() {
    let harness = Harness::default();
    assert_eq!(harness.editor.title(), "Untitled Tree - Gingko");
    assert_eq!(harness.editor.store().card_count(), 1);
    assert!(harness.editor.store().contains(CardId::FIRST));
    assert_eq!(CardId::FIRST.view_selector(), "#card-1");
}

#[test]
fn enter_opens_the_edit_buffer_for_card_one() {
    let mut harness = Harness::default();
    harness.send(EditorCommand::EnterEdit);

    let buffer = harness.editor.buffer().expect("edit buffer should be open");
    assert_eq!(buffer.selector(), "#card-edit-1");
    assert_eq!(buffer.text(), "");
    assert_eq!(harness.editor.mode(), Mode::Edit);
}

#[test]
fn typed_text_is_visible_in_buffer_and_marks_title() {
    let mut harness = Harness::default();
    harness.type_into_focused("Hello World");

    assert_eq!(
        harness.editor.buffer().map(|buffer| buffer.text()),
        Some("Hello World")
    );
    assert_eq!(harness.editor.title(), "*Untitled Tree - Gingko");
    assert_eq!(harness.titles.last(), Some("*Untitled Tree - Gingko"));
}

#[test]
fn ctrl_enter_commits_to_the_card_view() {
    let mut harness = Harness::default();
    harness.type_into_focused("Hello World");
    harness.send(EditorCommand::CommitEdit);

    assert_eq!(harness.editor.mode(), Mode::Navigation);
    assert_eq!(CardId::FIRST.content_selector(), "#card-1 .view");
    assert_eq!(
        harness.editor.store().content(CardId::FIRST),
        Ok("Hello World")
    );
    assert_eq!(harness.editor.title(), "*Untitled Tree - Gingko");
}

#[test]
fn opening_a_buffer_without_typing_stays_clean() {
    let mut harness = Harness::default();
    harness.send_all([EditorCommand::EnterEdit, EditorCommand::CommitEdit]);
    assert!(!harness.editor.is_dirty());
    assert!(harness.titles.titles.is_empty());
}

#[test]
fn arrow_navigation_walks_the_tree() {
    let editor = Editor::from_snapshot(&sample_tree("novel")).expect("sample tree is valid");
    let mut harness = Harness::default().with_editor(editor);

    harness.send(EditorCommand::FocusRight);
    assert_eq!(harness.editor.focused_id(), CardId::new(2));
    harness.send(EditorCommand::FocusDown);
    assert_eq!(harness.editor.focused_id(), CardId::new(3));
    harness.send(EditorCommand::FocusDown);
    assert_eq!(harness.editor.focused_id(), CardId::new(3));
    harness.send(EditorCommand::FocusLeft);
    assert_eq!(harness.editor.focused_id(), CardId::FIRST);
    harness.send(EditorCommand::FocusDown);
    assert_eq!(harness.editor.focused_id(), CardId::new(4));
    assert!(!harness.editor.is_dirty());
}

#[test]
fn inserted_cards_open_in_edit_mode() {
    let mut harness = Harness::default();
    let events = harness.send(EditorCommand::InsertBelow);
    let new_card = CardId::new(2);

    assert!(events.contains(&EditorEvent::CardInserted(new_card)));
    assert_eq!(harness.editor.focused_id(), new_card);
    assert_eq!(
        harness.editor.buffer().map(|buffer| buffer.card_id()),
        Some(new_card)
    );
    assert!(harness.editor.is_dirty());
}

#[test]
fn moving_focus_while_editing_loses_nothing() {
    let mut harness = Harness::default();
    harness.send_all([
        EditorCommand::EnterEdit,
        EditorCommand::InsertText("parent".to_owned()),
        EditorCommand::InsertChild,
        EditorCommand::InsertText("child".to_owned()),
        EditorCommand::Focus(CardId::FIRST),
    ]);

    assert_eq!(harness.editor.mode(), Mode::Navigation);
    assert_eq!(harness.editor.store().content(CardId::FIRST), Ok("parent"));
    assert_eq!(harness.editor.store().content(CardId::new(2)), Ok("child"));
}

#[test]
fn backspace_edits_the_buffer() {
    let mut harness = Harness::default();
    harness.type_into_focused("Helloo");
    harness.send_all([EditorCommand::DeleteBackward, EditorCommand::CommitEdit]);
    assert_eq!(harness.editor.store().content(CardId::FIRST), Ok("Hello"));
}
