// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use gingko_app::{CardId, CardRow, Persistence, TreeSnapshot};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info};

pub const APP_NAME: &str = "gingko";

const META_TREE_NAME: &str = "tree_name";
const META_SAVED_AT: &str = "saved_at";

const SCHEMA: &str = "
CREATE TABLE cards (
  id INTEGER PRIMARY KEY,
  parent_id INTEGER NOT NULL,
  position INTEGER NOT NULL,
  content TEXT NOT NULL DEFAULT ''
);
CREATE INDEX idx_cards_parent_position ON cards (parent_id, position);
CREATE TABLE tree_meta (
  key TEXT PRIMARY KEY,
  value TEXT NOT NULL
);
";

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    ("cards", &["id", "parent_id", "position", "content"]),
    ("tree_meta", &["key", "value"]),
];

/// SQLite home of a single card tree.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
        } else {
            self.conn.execute_batch(SCHEMA).context("create schema")?;
            debug!("created card schema");
        }
        Ok(())
    }

    /// Replaces whatever tree was stored before. Either every row lands or
    /// none do.
    pub fn save_tree(&mut self, snapshot: &TreeSnapshot) -> Result<()> {
        if snapshot.tree_name.trim().is_empty() {
            bail!("tree name must not be blank");
        }
        let saved_at = now_rfc3339()?;

        let tx = self.conn.transaction().context("begin save transaction")?;
        tx.execute("DELETE FROM cards", [])
            .context("clear previous cards")?;
        {
            let mut insert = tx
                .prepare(
                    "
                    INSERT INTO cards (id, parent_id, position, content)
                    VALUES (?, ?, ?, ?)
                    ",
                )
                .context("prepare card insert")?;
            for row in &snapshot.rows {
                insert
                    .execute(params![
                        row.id.get(),
                        row.parent.get(),
                        row.position,
                        row.content
                    ])
                    .with_context(|| format!("insert card {}", row.id))?;
            }
        }
        put_meta(&tx, META_TREE_NAME, &snapshot.tree_name)?;
        put_meta(&tx, META_SAVED_AT, &saved_at)?;
        tx.commit().context("commit save transaction")?;

        info!(
            tree = %snapshot.tree_name,
            cards = snapshot.rows.len(),
            %saved_at,
            "tree written"
        );
        Ok(())
    }

    /// `None` until the first save.
    pub fn load_tree(&self) -> Result<Option<TreeSnapshot>> {
        let Some(tree_name) = get_meta(&self.conn, META_TREE_NAME)? else {
            return Ok(None);
        };

        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT id, parent_id, position, content
                FROM cards
                ORDER BY parent_id ASC, position ASC, id ASC
                ",
            )
            .context("prepare cards query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(CardRow {
                    id: CardId::new(row.get(0)?),
                    parent: CardId::new(row.get(1)?),
                    position: row.get(2)?,
                    content: row.get(3)?,
                })
            })
            .context("query cards")?;
        let rows = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("collect cards")?;

        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(TreeSnapshot { tree_name, rows }))
    }

    pub fn last_saved_at(&self) -> Result<Option<OffsetDateTime>> {
        get_meta(&self.conn, META_SAVED_AT)?
            .map(|raw| {
                OffsetDateTime::parse(&raw, &Rfc3339)
                    .with_context(|| format!("parse saved_at timestamp {raw:?}"))
            })
            .transpose()
    }

    pub fn card_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))
            .context("count cards")?;
        usize::try_from(count).context("card count out of range")
    }
}

impl Persistence for Store {
    fn save(&mut self, snapshot: &TreeSnapshot) -> Result<()> {
        self.save_tree(snapshot)
    }
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("GINGKO_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set GINGKO_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("gingko.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn put_meta(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "
        INSERT INTO tree_meta (key, value)
        VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        ",
        params![key, value],
    )
    .with_context(|| format!("write tree metadata {key}"))?;
    Ok(())
}

fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM tree_meta WHERE key = ?",
        params![key],
        |row| row.get::<_, String>(0),
    )
    .optional()
    .with_context(|| format!("read tree metadata {key}"))
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            bail!(
                "database is missing required table `{table}`; point storage.db_path at a gingko database"
            );
        }

        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();

        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}",
                missing.join(", ")
            );
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "
            SELECT EXISTS(
              SELECT 1
              FROM sqlite_master
              WHERE type = 'table' AND name = ?
            )
            ",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    let names = rows
        .collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))?;
    Ok(names)
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}
