use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

use crate::models::User;

use super::store::{Snapshot, Table, UserStore, UserSubscription};

/// Table file name in the cache directory
const USERS_FILE: &str = "users.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_display(&self) -> String {
        age_display(self.cached_at)
    }
}

fn age_minutes(at: DateTime<Utc>) -> i64 {
    (Utc::now() - at).num_minutes()
}

/// Human readable age of a timestamp, e.g. "just now", "5m ago", "2h ago".
pub fn age_display(at: DateTime<Utc>) -> String {
    let minutes = age_minutes(at);
    if minutes < 1 {
        // Also covers clock skew
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        let hours = minutes / 60;
        let remaining_mins = minutes % 60;
        if remaining_mins >= 30 {
            // Round up: 1h 30m+ becomes 2h
            format!("{}h ago", hours + 1)
        } else {
            format!("{}h ago", hours)
        }
    } else {
        let days = minutes / 1440;
        let remaining_hours = (minutes % 1440) / 60;
        if remaining_hours >= 12 {
            format!("{}d ago", days + 1)
        } else {
            format!("{}d ago", days)
        }
    }
}

/// JSON-file backed user table.
///
/// The whole table lives in memory as a copy-on-write snapshot published
/// through a watch channel; readers clone the current `Arc` and never wait on
/// writers. Writers take `write_lock`, persist the next snapshot to disk
/// (temp file + rename), and only then publish it, so a failed write leaves
/// both disk and memory on the previous version.
pub struct CacheManager {
    path: Option<PathBuf>,
    write_lock: Mutex<()>,
    table: watch::Sender<Snapshot>,
}

impl CacheManager {
    /// Open (or create) the table in `cache_dir`.
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)?;
        let path = cache_dir.join(USERS_FILE);

        let table = match load::<Vec<User>>(&path) {
            Ok(Some(cached)) => {
                debug!(count = cached.data.len(), age = %cached.age_display(), "User cache loaded");
                Table::from_users(cached.data, Some(cached.cached_at))
            }
            Ok(None) => Table::default(),
            Err(e) => {
                warn!(error = %e, "Failed to load user cache, starting empty");
                Table::default()
            }
        };

        let (table, _) = watch::channel(Arc::new(table));
        Ok(Self {
            path: Some(path),
            write_lock: Mutex::new(()),
            table,
        })
    }

    /// Table that is never written to disk.
    pub fn in_memory() -> Self {
        let (table, _) = watch::channel(Arc::new(Table::default()));
        Self {
            path: None,
            write_lock: Mutex::new(()),
            table,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.table.borrow().clone()
    }

    /// "5m ago" style age of the last write, or None if never written.
    pub fn age_display(&self) -> Option<String> {
        self.snapshot().updated_at().map(age_display)
    }

    async fn persist(&self, table: &Table) -> Result<()> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };

        let cached = CachedData {
            data: table.users(),
            cached_at: table.updated_at().unwrap_or_else(Utc::now),
        };
        let contents = serde_json::to_string_pretty(&cached)?;

        tokio::task::spawn_blocking(move || write_atomic(&path, &contents))
            .await
            .context("Cache write task failed")?
    }
}

fn load<T: DeserializeOwned>(path: &Path) -> Result<Option<CachedData<T>>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read cache file: {}", path.display()))?;

    let cached: CachedData<T> = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse cache file: {}", path.display()))?;

    Ok(Some(cached))
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, contents)
        .with_context(|| format!("Failed to write cache file: {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to replace cache file: {}", path.display()))?;
    Ok(())
}

#[async_trait]
impl UserStore for CacheManager {
    async fn upsert_batch(&self, users: &[User]) -> Result<()> {
        if users.is_empty() {
            return Ok(());
        }

        let _guard = self.write_lock.lock().await;
        let next = self.snapshot().with_upserted(users);
        self.persist(&next).await?;
        self.table.send_replace(Arc::new(next));

        debug!(count = users.len(), "Users upserted");
        Ok(())
    }

    fn subscribe(&self, uid: &str) -> Result<UserSubscription> {
        Ok(UserSubscription::new(uid, self.table.subscribe()))
    }

    async fn list_all(&self) -> Result<Vec<User>> {
        Ok(self.snapshot().users())
    }

    async fn delete(&self, uid: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let Some(next) = self.snapshot().with_removed(uid) else {
            debug!(uid, "Delete of absent user ignored");
            return Ok(());
        };
        self.persist(&next).await?;
        self.table.send_replace(Arc::new(next));

        debug!(uid, "User deleted");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
