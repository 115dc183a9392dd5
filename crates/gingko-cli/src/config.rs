// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use gingko_app::{CloseDecision, DEFAULT_TREE_NAME};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_LOG_LEVEL: &str = "info";
const LOG_FILE_NAME: &str = "gingko.log";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub document: Document,
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub dialog: Dialog,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            storage: Storage::default(),
            document: Document::default(),
            log: Log::default(),
            dialog: Dialog::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub tree_name: Option<String>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            tree_name: Some(DEFAULT_TREE_NAME.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
            file: None,
        }
    }
}

/// Pre-answers the close prompt using the native dialog numbering.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dialog {
    pub choice: Option<i64>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("GINGKO_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set GINGKO_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(gingko_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` above the [storage], [document], [log], and [dialog] tables",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(db_path) = &self.storage.db_path {
            gingko_db::validate_db_path(db_path)?;
        }

        if let Some(tree_name) = &self.document.tree_name
            && tree_name.trim().is_empty()
        {
            bail!("document.tree_name in {} must not be blank", path.display());
        }

        if let Some(level) = &self.log.level {
            EnvFilter::try_new(level).with_context(|| {
                format!("log.level in {} is not a valid filter: {level:?}", path.display())
            })?;
        }

        if let Some(file) = &self.log.file
            && file.trim().is_empty()
        {
            bail!("log.file in {} must not be blank", path.display());
        }

        if let Some(choice) = self.dialog.choice {
            decision_for_choice(choice)
                .with_context(|| format!("dialog.choice in {}", path.display()))?;
        }

        Ok(())
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => gingko_db::default_db_path(),
        }
    }

    pub fn tree_name(&self) -> &str {
        self.document
            .tree_name
            .as_deref()
            .unwrap_or(DEFAULT_TREE_NAME)
    }

    /// `GINGKO_LOG` wins over `[log] level`.
    pub fn log_level(&self) -> String {
        match env::var("GINGKO_LOG") {
            Ok(level) if !level.trim().is_empty() => level,
            _ => self
                .log
                .level
                .clone()
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_owned()),
        }
    }

    pub fn log_file(&self) -> Result<PathBuf> {
        if let Some(file) = &self.log.file {
            return Ok(PathBuf::from(file));
        }
        let data_root = dirs::data_local_dir().ok_or_else(|| {
            anyhow!("cannot resolve data directory; set [log] file to a writable path")
        })?;
        Ok(data_root.join(gingko_db::APP_NAME).join(LOG_FILE_NAME))
    }

    /// `DIALOG_CHOICE` wins over `[dialog] choice`.
    pub fn dialog_choice(&self) -> Result<Option<CloseDecision>> {
        if let Ok(raw) = env::var("DIALOG_CHOICE")
            && !raw.trim().is_empty()
        {
            let choice: i64 = raw
                .trim()
                .parse()
                .with_context(|| format!("DIALOG_CHOICE must be 0, 1, or 2, got {raw:?}"))?;
            return decision_for_choice(choice)
                .map(Some)
                .context("DIALOG_CHOICE");
        }
        self.dialog.choice.map(decision_for_choice).transpose()
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# gingko config\n# Place this file at: {}\n\nversion = 1\n\n[storage]\n# Optional. Default is platform data dir (for example ~/.local/share/gingko/gingko.db)\n# db_path = \"/absolute/path/to/gingko.db\"\n\n[document]\ntree_name = \"{}\"\n\n[log]\nlevel = \"{}\"\n# file = \"/absolute/path/to/gingko.log\"\n\n[dialog]\n# Answer the unsaved-changes prompt automatically: 0 discard, 1 cancel, 2 save\n# choice = 2\n",
            path.display(),
            DEFAULT_TREE_NAME,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn decision_for_choice(choice: i64) -> Result<CloseDecision> {
    CloseDecision::from_dialog_index(choice).ok_or_else(|| {
        anyhow!("dialog choice must be 0 (discard), 1 (cancel), or 2 (save), got {choice}")
    })
}
