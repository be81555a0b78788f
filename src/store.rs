use crate::util::ensure_dir;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// Values persisted between invocations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub last_submission_at: Option<OffsetDateTime>,
}

/// JSON file holding [`Preferences`]. A missing file reads as empty preferences.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Preferences> {
        if !self.path.exists() {
            return Ok(Preferences::default());
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading preferences: {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(Preferences::default());
        }
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing preferences: {}", self.path.display()))
    }

    pub fn save(&self, prefs: &Preferences) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(prefs)?)
            .with_context(|| format!("writing preferences: {}", self.path.display()))
    }

    pub fn update<F: FnOnce(&mut Preferences)>(&self, f: F) -> Result<Preferences> {
        let mut prefs = self.load()?;
        f(&mut prefs);
        self.save(&prefs)?;
        Ok(prefs)
    }
}
