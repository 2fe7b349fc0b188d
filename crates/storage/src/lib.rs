use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tracing::{debug, info, warn};

use shared::{
    domain::{ItemId, ItemPatch, ItemRecord, Snapshot},
    error::RemoteError,
};

pub mod keys;

pub use keys::PushKeyGenerator;

pub const DEFAULT_COLLECTION: &str = "users";
const SUBSCRIPTION_BUFFER: usize = 64;
const CHANGE_SIGNAL_CAPACITY: usize = 256;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// One delivery of a subscription: the full collection, or the error that
/// interrupted the feed.
pub type SnapshotDelivery = std::result::Result<Snapshot, RemoteError>;

/// Key-value collection with push-based reads.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn append(&self, record: ItemRecord) -> std::result::Result<ItemId, RemoteError>;

    /// Delivers the current snapshot immediately and again after every change.
    async fn subscribe(&self) -> std::result::Result<Subscription, RemoteError>;

    async fn patch(&self, id: &ItemId, fields: ItemPatch) -> std::result::Result<(), RemoteError>;

    async fn delete(&self, id: &ItemId) -> std::result::Result<(), RemoteError>;
}

/// Live registration with a store. Dropping it stops delivery.
pub struct Subscription {
    rx: mpsc::Receiver<SnapshotDelivery>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn channel() -> (mpsc::Sender<SnapshotDelivery>, mpsc::Receiver<SnapshotDelivery>) {
        mpsc::channel(SUBSCRIPTION_BUFFER)
    }

    pub fn new(rx: mpsc::Receiver<SnapshotDelivery>, task: JoinHandle<()>) -> Self {
        Self {
            rx,
            task: Some(task),
        }
    }

    /// `None` once the feed has ended.
    pub async fn next(&mut self) -> Option<SnapshotDelivery> {
        self.rx.recv().await
    }

    pub fn unsubscribe(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("subscription released");
        }
        self.rx.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    collection: String,
    changes: broadcast::Sender<()>,
    keys: Arc<PushKeyGenerator>,
    /// How often subscriptions re-read the file to pick up writes made by
    /// other processes.
    poll_interval: Duration,
}

impl SqliteStore {
    pub async fn open(database_url: &str, collection: impl Into<String>) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid sqlite url '{database_url}'"))?
            .create_if_missing(true);
        // Every connection to an in-memory database opens a fresh database, so
        // it gets exactly one connection that is never recycled.
        let pool_options = if is_memory_url(database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open sqlite database '{database_url}'"))?;

        let store = Self {
            pool,
            collection: collection.into(),
            changes: broadcast::channel(CHANGE_SIGNAL_CAPACITY).0,
            keys: Arc::new(PushKeyGenerator::new()),
            poll_interval: DEFAULT_POLL_INTERVAL,
        };
        store.ensure_records_table().await?;
        info!(collection = %store.collection, "sqlite store ready");
        Ok(store)
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn ensure_records_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                collection TEXT NOT NULL,
                key        TEXT NOT NULL,
                name       TEXT NOT NULL,
                is_done    INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (collection, key)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure records table exists")?;
        Ok(())
    }

    pub async fn load_snapshot(&self) -> Result<Snapshot> {
        load_snapshot(&self.pool, &self.collection).await
    }

    async fn insert_record(&self, record: &ItemRecord) -> Result<ItemId> {
        let key = self.keys.next_key();
        sqlx::query("INSERT INTO records (collection, key, name, is_done) VALUES (?, ?, ?, ?)")
            .bind(&self.collection)
            .bind(&key)
            .bind(&record.name)
            .bind(record.is_done)
            .execute(&self.pool)
            .await
            .context("failed to insert record")?;
        Ok(ItemId(key))
    }

    async fn fetch_record(&self, id: &ItemId) -> Result<Option<ItemRecord>> {
        let row = sqlx::query("SELECT name, is_done FROM records WHERE collection = ? AND key = ?")
            .bind(&self.collection)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .context("failed to read record")?;
        row.map(|row| -> Result<ItemRecord> {
            Ok(ItemRecord {
                name: row.try_get("name")?,
                is_done: row.try_get("is_done")?,
            })
        })
        .transpose()
    }

    async fn update_record(&self, id: &ItemId, record: &ItemRecord) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE records SET name = ?, is_done = ?, updated_at = CURRENT_TIMESTAMP \
             WHERE collection = ? AND key = ?",
        )
        .bind(&record.name)
        .bind(record.is_done)
        .bind(&self.collection)
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .context("failed to update record")?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_record(&self, id: &ItemId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM records WHERE collection = ? AND key = ?")
            .bind(&self.collection)
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .context("failed to delete record")?;
        Ok(result.rows_affected() > 0)
    }

    fn notify_changed(&self) {
        // No receivers simply means nobody is subscribed.
        let _ = self.changes.send(());
    }
}

#[async_trait]
impl RemoteStore for SqliteStore {
    async fn append(&self, record: ItemRecord) -> std::result::Result<ItemId, RemoteError> {
        let id = self.insert_record(&record).await.map_err(store_failure)?;
        info!(key = %id, collection = %self.collection, "record appended");
        self.notify_changed();
        Ok(id)
    }

    async fn subscribe(&self) -> std::result::Result<Subscription, RemoteError> {
        // Register for change signals before the initial read so no mutation
        // between the two is missed.
        let mut changes = self.changes.subscribe();
        let (tx, rx) = Subscription::channel();
        let pool = self.pool.clone();
        let collection = self.collection.clone();
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let task = tokio::spawn(async move {
            // The first tick completes immediately.
            ticker.tick().await;
            let mut last_delivered: Option<SnapshotDelivery> = None;
            loop {
                let delivery = load_snapshot(&pool, &collection)
                    .await
                    .map_err(store_failure);
                // Only changes are delivered, whichever wake-up found them.
                if last_delivered.as_ref() != Some(&delivery) {
                    last_delivered = Some(delivery.clone());
                    if tx.send(delivery).await.is_err() {
                        return;
                    }
                }

                tokio::select! {
                    signal = changes.recv() => match signal {
                        Ok(()) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!(skipped, "change signals coalesced");
                        }
                        Err(broadcast::error::RecvError::Closed) => return,
                    },
                    _ = ticker.tick() => {}
                }
                if tx.is_closed() {
                    return;
                }
            }
        });

        info!(collection = %self.collection, "subscribed to collection");
        Ok(Subscription::new(rx, task))
    }

    async fn patch(&self, id: &ItemId, fields: ItemPatch) -> std::result::Result<(), RemoteError> {
        let mut record = self
            .fetch_record(id)
            .await
            .map_err(store_failure)?
            .ok_or_else(|| RemoteError::NotFound(id.clone()))?;
        if fields.is_empty() {
            return Ok(());
        }
        fields.apply_to(&mut record);

        if !self.update_record(id, &record).await.map_err(store_failure)? {
            return Err(RemoteError::NotFound(id.clone()));
        }
        info!(key = %id, "record patched");
        self.notify_changed();
        Ok(())
    }

    async fn delete(&self, id: &ItemId) -> std::result::Result<(), RemoteError> {
        if self.delete_record(id).await.map_err(store_failure)? {
            info!(key = %id, "record deleted");
            self.notify_changed();
        } else {
            warn!(key = %id, "delete of missing record ignored");
        }
        Ok(())
    }
}

async fn load_snapshot(pool: &Pool<Sqlite>, collection: &str) -> Result<Snapshot> {
    let rows = sqlx::query("SELECT key, name, is_done FROM records WHERE collection = ? ORDER BY key")
        .bind(collection)
        .fetch_all(pool)
        .await
        .context("failed to load collection snapshot")?;

    rows.into_iter()
        .map(|row| -> Result<(ItemId, ItemRecord)> {
            let key: String = row.try_get("key")?;
            let record = ItemRecord {
                name: row.try_get("name")?,
                is_done: row.try_get("is_done")?,
            };
            Ok((ItemId(key), record))
        })
        .collect()
}

fn store_failure(err: anyhow::Error) -> RemoteError {
    RemoteError::Transport(format!("{err:#}"))
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if is_memory_url(database_url) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
