use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{FinError, Result};
use crate::settings::config_dir;

/// Per-user notification toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub notifications: bool,
    pub email_alerts: bool,
    pub weekly_summary: bool,
    pub uncategorized_alerts: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            notifications: true,
            email_alerts: false,
            weekly_summary: true,
            uncategorized_alerts: true,
        }
    }
}

pub const KEYS: &[&str] = &["notifications", "email_alerts", "weekly_summary", "uncategorized_alerts"];

impl Preferences {
    pub fn entries(&self) -> [(&'static str, bool); 4] {
        [
            ("notifications", self.notifications),
            ("email_alerts", self.email_alerts),
            ("weekly_summary", self.weekly_summary),
            ("uncategorized_alerts", self.uncategorized_alerts),
        ]
    }

    pub fn set(&mut self, key: &str, value: bool) -> Result<()> {
        let slot = match key {
            "notifications" => &mut self.notifications,
            "email_alerts" => &mut self.email_alerts,
            "weekly_summary" => &mut self.weekly_summary,
            "uncategorized_alerts" => &mut self.uncategorized_alerts,
            other => {
                return Err(FinError::Validation(format!(
                    "Unknown preference '{other}' (expected one of: {})",
                    KEYS.join(", ")
                )))
            }
        };
        *slot = value;
        Ok(())
    }
}

pub fn preferences_path() -> PathBuf {
    config_dir().join("preferences.json")
}

pub fn load_preferences() -> Preferences {
    load_preferences_from(&preferences_path())
}

pub fn load_preferences_from(path: &Path) -> Preferences {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => return Preferences::default(),
    };
    serde_json::from_str(&content).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "ignoring corrupt preferences file");
        Preferences::default()
    })
}

pub fn save_preferences(prefs: &Preferences) -> Result<()> {
    save_preferences_to(prefs, &preferences_path())
}

/// Writes a sibling temp file and renames it over the target.
pub fn save_preferences_to(prefs: &Preferences, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(prefs).map_err(|e| FinError::Settings(e.to_string()))?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, format!("{json}\n"))?;
    std::fs::rename(&tmp, path)?;
    debug!(path = %path.display(), "saved preferences");
    Ok(())
}

/// Parse a CLI boolean (`true/false`, `on/off`, `yes/no`, `1/0`).
pub fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        other => Err(FinError::Validation(format!("Expected true or false, got '{other}'"))),
    }
}
