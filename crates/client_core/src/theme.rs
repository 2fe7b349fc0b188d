//! Persisted light/dark flag.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shared::domain::Theme;
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct PersistedTheme {
    mode: Theme,
}

#[derive(Debug, Clone)]
pub struct ThemeStore {
    path: PathBuf,
}

impl ThemeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable files fall back to the light theme.
    pub fn load(&self) -> Theme {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Theme::default(),
            Err(err) => {
                warn!("failed to read theme file '{}': {err}", self.path.display());
                return Theme::default();
            }
        };

        match serde_json::from_str::<PersistedTheme>(&raw) {
            Ok(persisted) => persisted.mode,
            Err(err) => {
                warn!("ignoring malformed theme file '{}': {err}", self.path.display());
                Theme::default()
            }
        }
    }

    pub fn save(&self, theme: Theme) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create theme directory '{}'", parent.display())
            })?;
        }
        let serialized = serde_json::to_string(&PersistedTheme { mode: theme })?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("failed to write theme file '{}'", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_defaults_to_light() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ThemeStore::new(dir.path().join("theme.json"));
        assert_eq!(store.load(), Theme::Light);
    }

    #[test]
    fn saved_theme_is_read_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ThemeStore::new(dir.path().join("nested").join("theme.json"));
        store.save(Theme::Dark).expect("save");
        assert_eq!(store.load(), Theme::Dark);

        let raw = fs::read_to_string(store.path()).expect("read");
        assert_eq!(raw, r#"{"mode":"dark"}"#);
    }

    #[test]
    fn malformed_file_defaults_to_light() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("theme.json");
        fs::write(&path, "not json").expect("write");
        assert_eq!(ThemeStore::new(path).load(), Theme::Light);
    }
}
