// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use gingko_app::Editor;
use gingko_db::Store;
use tracing::info;

/// Picks the document to edit: the stored tree when there is one, otherwise
/// a fresh tree named `tree_name`.
pub fn open_document(store: &Store, tree_name: &str, fresh: bool) -> Result<Editor> {
    if fresh {
        info!(tree = tree_name, "starting a new tree");
        return Ok(Editor::new(tree_name));
    }

    match store.load_tree()? {
        Some(snapshot) => {
            let editor = Editor::from_snapshot(&snapshot).with_context(|| {
                format!(
                    "stored tree {:?} is inconsistent; start over with --new",
                    snapshot.tree_name
                )
            })?;
            info!(
                tree = %snapshot.tree_name,
                cards = snapshot.rows.len(),
                saved_at = ?store.last_saved_at()?,
                "loaded stored tree"
            );
            Ok(editor)
        }
        None => {
            info!(tree = tree_name, "no stored tree; starting a new one");
            Ok(Editor::new(tree_name))
        }
    }
}
