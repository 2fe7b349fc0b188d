use std::{
    collections::HashMap,
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

use anyhow::{anyhow, Context};
use storage::{RemoteStore, SqliteStore, DEFAULT_COLLECTION};
use tracing::{info, warn};

use crate::firebase::FirebaseStore;

pub const SETTINGS_FILE: &str = "todo.toml";
const DEFAULT_SQLITE_URL: &str = "sqlite://./data/todo.db";
const DEFAULT_LOG_FILTER: &str = "info";
const APP_DIR_NAME: &str = "todo_rtc";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Firebase,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "firebase" => Ok(Self::Firebase),
            other => Err(anyhow!("unknown backend '{other}', expected sqlite or firebase")),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite => f.write_str("sqlite"),
            Self::Firebase => f.write_str("firebase"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub backend: StoreBackend,
    /// Falls back to the local sqlite file when unset. Required for firebase.
    pub database_url: Option<String>,
    pub collection: String,
    pub theme_path: Option<PathBuf>,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            database_url: None,
            collection: DEFAULT_COLLECTION.into(),
            theme_path: None,
            log_filter: DEFAULT_LOG_FILTER.into(),
        }
    }
}

impl Settings {
    pub fn theme_path(&self) -> PathBuf {
        self.theme_path.clone().unwrap_or_else(default_theme_path)
    }
}

pub fn load_settings() -> Settings {
    load_settings_with(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Layers defaults, then the toml file at `path`, then whatever `env` returns.
pub fn load_settings_with(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<HashMap<String, String>>(&raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.get("backend") {
                    apply_backend(&mut settings, v);
                }
                if let Some(v) = file_cfg.get("database_url") {
                    settings.database_url = Some(v.clone());
                }
                if let Some(v) = file_cfg.get("collection") {
                    settings.collection = v.clone();
                }
                if let Some(v) = file_cfg.get("theme_path") {
                    settings.theme_path = Some(PathBuf::from(v));
                }
                if let Some(v) = file_cfg.get("log_filter") {
                    settings.log_filter = v.clone();
                }
            }
            Err(err) => warn!("ignoring unreadable settings file '{}': {err}", path.display()),
        }
    }

    if let Some(v) = env("TODO_BACKEND") {
        apply_backend(&mut settings, &v);
    }
    if let Some(v) = env("APP__BACKEND") {
        apply_backend(&mut settings, &v);
    }

    if let Some(v) = env("TODO_DATABASE_URL") {
        settings.database_url = Some(v);
    }
    if let Some(v) = env("APP__DATABASE_URL") {
        settings.database_url = Some(v);
    }

    if let Some(v) = env("APP__COLLECTION") {
        settings.collection = v;
    }
    if let Some(v) = env("APP__THEME_PATH") {
        settings.theme_path = Some(PathBuf::from(v));
    }
    if let Some(v) = env("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    settings
}

fn apply_backend(settings: &mut Settings, raw: &str) {
    match raw.parse() {
        Ok(backend) => settings.backend = backend,
        Err(err) => warn!("keeping backend {}: {err}", settings.backend),
    }
}

pub fn default_theme_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join("theme.json")
}

/// Opens the backend named in `settings`.
pub async fn open_store(settings: &Settings) -> anyhow::Result<Arc<dyn RemoteStore>> {
    match settings.backend {
        StoreBackend::Sqlite => {
            let url = normalize_database_url(settings.database_url.as_deref().unwrap_or_default());
            let store = SqliteStore::open(&url, settings.collection.clone()).await?;
            store.health_check().await?;
            info!(database_url = %url, collection = %settings.collection, "opened sqlite store");
            Ok(Arc::new(store))
        }
        StoreBackend::Firebase => {
            let url = settings
                .database_url
                .as_deref()
                .filter(|url| !url.trim().is_empty())
                .context("the firebase backend needs a database_url")?;
            let store = FirebaseStore::new(url, settings.collection.clone())?;
            info!(database_url = %url, collection = %settings.collection, "using firebase store");
            Ok(Arc::new(store))
        }
    }
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return DEFAULT_SQLITE_URL.to_string();
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
