// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use gingko_app::{CardId, Editor, EditorCommand, Persistence};
use gingko_db::{Store, validate_db_path};
use gingko_testkit::{sample_tree, temp_db_path};

#[test]
fn validate_db_path_rejects_uri_forms() {
    assert!(validate_db_path("").is_err());
    assert!(validate_db_path("file:tree.db").is_err());
    assert!(validate_db_path("https://example.com/tree.sqlite").is_err());
    assert!(validate_db_path("tree.sqlite?mode=ro").is_err());
    assert!(validate_db_path(":memory:").is_ok());
    assert!(validate_db_path("/tmp/gingko.db").is_ok());
}

#[test]
fn fresh_database_has_no_tree() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    assert_eq!(store.load_tree()?, None);
    assert_eq!(store.last_saved_at()?, None);
    Ok(())
}

#[test]
fn bootstrap_is_idempotent() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    store.bootstrap()?;
    Ok(())
}

#[test]
fn bootstrap_rejects_foreign_schema() -> Result<()> {
    let store = Store::open_memory()?;
    store
        .raw_connection()
        .execute_batch("CREATE TABLE projects (id INTEGER PRIMARY KEY);")?;

    let error = store.bootstrap().expect_err("foreign schema should be rejected");
    assert!(
        error.to_string().contains("missing required table `cards`"),
        "unexpected error: {error:#}"
    );
    Ok(())
}

#[test]
fn bootstrap_rejects_cards_table_missing_column() -> Result<()> {
    let store = Store::open_memory()?;
    store.raw_connection().execute_batch(
        "
        CREATE TABLE cards (id INTEGER PRIMARY KEY, parent_id INTEGER NOT NULL);
        CREATE TABLE tree_meta (key TEXT PRIMARY KEY, value TEXT NOT NULL);
        ",
    )?;

    let error = store.bootstrap().expect_err("incomplete schema should be rejected");
    let message = error.to_string();
    assert!(message.contains("position"), "unexpected error: {message}");
    assert!(message.contains("content"), "unexpected error: {message}");
    Ok(())
}

#[test]
fn saved_tree_loads_back_in_sibling_order() -> Result<()> {
    let mut store = Store::open_memory()?;
    store.bootstrap()?;
    let tree = sample_tree("novel");

    store.save_tree(&tree)?;
    let loaded = store.load_tree()?.expect("tree was saved");

    assert_eq!(loaded.tree_name, "novel");
    assert_eq!(loaded.rows.len(), 4);
    assert_eq!(loaded.content_of(CardId::new(3)), Some("Conflict"));
    let top_level: Vec<i64> = loaded
        .rows
        .iter()
        .filter(|row| row.parent.is_root())
        .map(|row| row.id.get())
        .collect();
    assert_eq!(top_level, vec![1, 4]);
    assert!(store.last_saved_at()?.is_some());
    Ok(())
}

#[test]
fn saving_replaces_the_previous_tree() -> Result<()> {
    let mut store = Store::open_memory()?;
    store.bootstrap()?;
    store.save_tree(&sample_tree("novel"))?;

    let mut editor = Editor::new("short story");
    editor.dispatch(EditorCommand::EnterEdit, &mut store);
    editor.dispatch(EditorCommand::InsertText("Only card".to_owned()), &mut store);
    editor.dispatch(EditorCommand::Save, &mut store);

    assert_eq!(store.card_count()?, 1);
    let loaded = store.load_tree()?.expect("tree was saved");
    assert_eq!(loaded.tree_name, "short story");
    assert_eq!(loaded.content_of(CardId::FIRST), Some("Only card"));
    assert!(!editor.is_dirty());
    Ok(())
}

#[test]
fn failed_save_leaves_previous_tree_intact() -> Result<()> {
    let mut store = Store::open_memory()?;
    store.bootstrap()?;
    store.save_tree(&sample_tree("novel"))?;

    let mut broken = sample_tree("novel");
    broken.rows.push(broken.rows[0].clone());
    assert!(store.save(&broken).is_err());

    let loaded = store.load_tree()?.expect("previous tree survives");
    assert_eq!(loaded.rows.len(), 4);
    Ok(())
}

#[test]
fn round_trip_through_a_file_rebuilds_the_editor() -> Result<()> {
    let (_dir, path) = temp_db_path()?;
    {
        let mut store = Store::open(&path)?;
        store.bootstrap()?;
        store.save_tree(&sample_tree("novel"))?;
    }

    let store = Store::open(&path)?;
    store.bootstrap()?;
    let snapshot = store.load_tree()?.expect("tree was saved");
    let editor = Editor::from_snapshot(&snapshot)?;

    assert_eq!(editor.title(), "novel - Gingko");
    assert_eq!(editor.store().card_count(), 4);
    assert_eq!(editor.store().content(CardId::new(2))?, "Opening scene");
    Ok(())
}
