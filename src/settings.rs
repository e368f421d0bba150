use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpendError};
use crate::reports::DEFAULT_RECENT_LIMIT;

pub const DATA_DIR_ENV: &str = "SPENDWISE_DATA_DIR";
pub const DB_FILENAME: &str = "spendwise.db";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_data_dir_string")]
    pub data_dir: String,
    /// Rows shown in the dashboard's recent transactions list.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

fn default_recent_limit() -> usize {
    DEFAULT_RECENT_LIMIT
}

fn default_data_dir_string() -> String {
    default_data_dir().to_string_lossy().to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir_string(),
            recent_limit: default_recent_limit(),
        }
    }
}

impl Settings {
    /// Database location, honoring the `SPENDWISE_DATA_DIR` override.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir_with(std::env::var(DATA_DIR_ENV).ok()).join(DB_FILENAME)
    }

    fn data_dir_with(&self, env_override: Option<String>) -> PathBuf {
        match env_override.filter(|d| !d.trim().is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => PathBuf::from(&self.data_dir),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("spendwise")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("spendwise")
}

/// Missing or malformed files fall back to defaults.
pub fn load_settings_from(path: &Path) -> Settings {
    match std::fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Ignoring malformed settings file");
            Settings::default()
        }),
        Err(_) => Settings::default(),
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(|e| SpendError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(&settings_path(), settings)
}

pub fn shellexpand_path(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.to_string_lossy());
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings { data_dir: "/tmp/spend".to_string(), recent_limit: 25 };
        save_settings_to(&path, &settings).unwrap();
        let loaded = load_settings_from(&path);
        assert_eq!(loaded.data_dir, "/tmp/spend");
        assert_eq!(loaded.recent_limit, 25);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings_from(&dir.path().join("absent.json"));
        assert_eq!(s.recent_limit, DEFAULT_RECENT_LIMIT);
        assert!(s.data_dir.ends_with("spendwise"));
    }

    #[test]
    fn test_malformed_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(load_settings_from(&path).recent_limit, DEFAULT_RECENT_LIMIT);
    }

    #[test]
    fn test_partial_file_merges_with_defaults() {
        let s: Settings = serde_json::from_str(r#"{"data_dir": "/tmp/x"}"#).unwrap();
        assert_eq!(s.data_dir, "/tmp/x");
        assert_eq!(s.recent_limit, DEFAULT_RECENT_LIMIT);
    }

    #[test]
    fn test_env_override_wins() {
        let s = Settings { data_dir: "/tmp/configured".to_string(), recent_limit: 10 };
        assert_eq!(s.data_dir_with(Some("/tmp/env".into())), PathBuf::from("/tmp/env"));
        assert_eq!(s.data_dir_with(Some("  ".into())), PathBuf::from("/tmp/configured"));
        assert_eq!(s.data_dir_with(None), PathBuf::from("/tmp/configured"));
    }
}
