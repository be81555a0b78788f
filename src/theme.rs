use crate::store::PreferenceStore;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Only the literal `"dark"` selects dark; any other stored text is light.
    fn from_stored(s: &str) -> Theme {
        if s == "dark" { Theme::Dark } else { Theme::Light }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The configured override, else the operating system's colour scheme.
pub fn system_prefers_dark(override_value: Option<bool>) -> bool {
    if let Some(v) = override_value {
        return v;
    }
    match dark_light::detect() {
        Ok(mode) => matches!(mode, dark_light::Mode::Dark),
        Err(err) => {
            debug!("colour scheme detection failed: {err}");
            false
        }
    }
}

/// Stored preference when one exists, otherwise the environment's preference.
pub fn effective_theme(store: &PreferenceStore, system_prefers_dark: bool) -> Result<Theme> {
    let prefs = store.load()?;
    Ok(match prefs.theme.as_deref() {
        Some(s) if !s.is_empty() => Theme::from_stored(s),
        _ if system_prefers_dark => Theme::Dark,
        _ => Theme::Light,
    })
}

/// Flips the effective theme and persists the result.
pub fn toggle_theme(store: &PreferenceStore, system_prefers_dark: bool) -> Result<Theme> {
    let next = effective_theme(store, system_prefers_dark)?.toggled();
    store.update(|p| p.theme = Some(next.as_str().to_string()))?;
    info!("theme set to {next} ({})", store.path().display());
    Ok(next)
}
