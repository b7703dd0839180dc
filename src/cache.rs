//! Content-addressed on-disk cache, namespaced per topic.
//!
//! Every pipeline stage persists its output here so an interrupted run
//! resumes where it stopped. The layout is
//! `{root}/{topic_id}/{namespace}/{blake3(item_key)[..16]}.json`, with
//! values wrapped in an envelope carrying the original key and a UTC
//! timestamp. Expiry is lazy: an entry older than the configured maximum
//! age is a miss on read; `clear` performs the eager variant.
//!
//! Terminal artifacts (`answer.md`, `request.md`, `answer.html`) are
//! written unenveloped at the topic root via [`CacheManager::write_artifact`].

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::error::{Result, ScryError};

/// Stage namespaces under each topic directory.
pub const NAMESPACE_SEARCH_QUERIES: &str = "search_queries";
pub const NAMESPACE_SEARCH_RESULTS: &str = "search_results";
pub const NAMESPACE_RANKED_RESULTS: &str = "ranked_results";
pub const NAMESPACE_DOCS: &str = "docs";
pub const NAMESPACE_SUMMARIES: &str = "summaries";
pub const NAMESPACE_RANKED_SUMMARIES: &str = "ranked_summaries";

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// On-disk JSON wrapper for one cached value.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    stored_at: DateTime<Utc>,
    key: String,
    value: T,
}

/// Cache handle for one root directory.
///
/// Cheap to clone and share; concurrent readers are safe, and same-key
/// writers are serialized by the stage-level [`SingleFlight`] locks.
#[derive(Debug, Clone)]
pub struct CacheManager {
    root: PathBuf,
    max_age_days: u64,
}

impl CacheManager {
    pub fn new(root: impl Into<PathBuf>, max_age_days: u64) -> Self {
        Self {
            root: root.into(),
            max_age_days,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory-safe topic identifier: the sanitized topic text truncated
    /// to 50 characters, plus a short content hash so distinct topics with
    /// the same sanitized form stay separate.
    pub fn topic_id(topic: &str) -> String {
        let sanitized: String = topic
            .trim()
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .take(50)
            .collect();
        let digest = blake3::hash(topic.as_bytes()).to_hex();
        format!("{sanitized}_{}", &digest.as_str()[..8])
    }

    /// Read a cached value, treating expired or undecodable entries as
    /// misses.
    pub fn get<T: DeserializeOwned>(
        &self,
        topic_id: &str,
        namespace: &str,
        item_key: &str,
    ) -> Option<T> {
        let path = self.entry_path(topic_id, namespace, item_key);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable cache entry");
                return None;
            }
        };

        let envelope: Envelope<T> = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "corrupt cache entry; treating as miss"
                );
                return None;
            }
        };

        let age = Utc::now().signed_duration_since(envelope.stored_at);
        if age.num_seconds() > (self.max_age_days * SECONDS_PER_DAY) as i64 {
            tracing::debug!(
                namespace,
                key = %item_key,
                age_days = age.num_days(),
                "cache entry expired"
            );
            return None;
        }

        tracing::debug!(namespace, key = %item_key, "cache hit");
        Some(envelope.value)
    }

    /// Store a value, atomically replacing any previous entry for the key.
    ///
    /// # Errors
    ///
    /// Returns [`ScryError::Cache`] when serialization or the filesystem
    /// write fails.
    pub fn put<T: Serialize>(
        &self,
        topic_id: &str,
        namespace: &str,
        item_key: &str,
        value: &T,
    ) -> Result<()> {
        let envelope = Envelope {
            stored_at: Utc::now(),
            key: item_key.to_owned(),
            value,
        };
        let json = serde_json::to_string_pretty(&envelope)
            .map_err(|e| ScryError::Cache(format!("serializing entry '{item_key}': {e}")))?;
        let path = self.entry_path(topic_id, namespace, item_key);
        atomic_write(&path, json.as_bytes())?;
        tracing::debug!(namespace, key = %item_key, "cache store");
        Ok(())
    }

    /// Write a terminal artifact such as `answer.md` at the topic root.
    ///
    /// # Errors
    ///
    /// Returns [`ScryError::Cache`] when the write fails.
    pub fn write_artifact(
        &self,
        topic_id: &str,
        file_name: &str,
        contents: &str,
    ) -> Result<PathBuf> {
        let path = self.root.join(topic_id).join(file_name);
        atomic_write(&path, contents.as_bytes())?;
        tracing::info!(path = %path.display(), "artifact written");
        Ok(path)
    }

    /// Per-topic usage overview for `cache-info`.
    ///
    /// # Errors
    ///
    /// Returns [`ScryError::Cache`] when the cache root cannot be listed.
    pub fn info(&self) -> Result<CacheInfo> {
        let mut info = CacheInfo {
            root: self.root.clone(),
            total_files: 0,
            total_size_bytes: 0,
            topics: Vec::new(),
        };
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(info),
            Err(e) => {
                return Err(ScryError::Cache(format!(
                    "listing cache root {}: {e}",
                    self.root.display()
                )));
            }
        };

        for entry in entries {
            let entry =
                entry.map_err(|e| ScryError::Cache(format!("listing cache root: {e}")))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let mut topic = TopicInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                files: 0,
                size_bytes: 0,
                last_modified: None,
                has_answer: path.join("answer.md").is_file(),
            };
            measure_dir(&path, &mut topic)?;
            info.total_files += topic.files;
            info.total_size_bytes += topic.size_bytes;
            info.topics.push(topic);
        }
        info.topics.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(info)
    }

    /// Delete cache entries, either everything or only files older than the
    /// configured maximum age, pruning directories that end up empty.
    /// Returns the number of files removed.
    ///
    /// # Errors
    ///
    /// Returns [`ScryError::Cache`] when a deletion fails.
    pub fn clear(&self, expired_only: bool) -> Result<usize> {
        if !self.root.exists() {
            return Ok(0);
        }
        let cutoff = expired_only.then(|| {
            SystemTime::now() - Duration::from_secs(self.max_age_days * SECONDS_PER_DAY)
        });
        let removed = clear_dir(&self.root, cutoff)?;
        tracing::info!(removed, expired_only, "cache cleared");
        Ok(removed)
    }

    fn entry_path(&self, topic_id: &str, namespace: &str, item_key: &str) -> PathBuf {
        let digest = blake3::hash(item_key.as_bytes()).to_hex();
        self.root
            .join(topic_id)
            .join(namespace)
            .join(format!("{}.json", &digest.as_str()[..16]))
    }
}

/// Aggregate cache usage, one entry per topic directory.
#[derive(Debug)]
pub struct CacheInfo {
    pub root: PathBuf,
    pub total_files: usize,
    pub total_size_bytes: u64,
    pub topics: Vec<TopicInfo>,
}

#[derive(Debug)]
pub struct TopicInfo {
    pub name: String,
    pub files: usize,
    pub size_bytes: u64,
    pub last_modified: Option<SystemTime>,
    pub has_answer: bool,
}

/// Render a byte count with a binary unit, e.g. `3.20 MB`.
pub fn human_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{size:.2} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.2} TB")
}

/// Per-key async locks giving at-most-one in-flight fetch or summarize
/// per cache key. The guard is a plain RAII mutex guard, so it is
/// released exactly once whether the protected work succeeds or fails.
/// The map holds one entry per distinct key seen in a run and is never
/// pruned; runs touch at most a few dozen keys.
#[derive(Debug, Default)]
pub struct SingleFlight {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(
                locks
                    .entry(key.to_owned())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }
}

fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| ScryError::Cache(format!("path has no parent: {}", path.display())))?;
    fs::create_dir_all(parent)
        .map_err(|e| ScryError::Cache(format!("creating {}: {e}", parent.display())))?;

    let tmp = parent.join(format!(".{}.tmp", Uuid::new_v4()));
    let write = |tmp: &Path| -> std::io::Result<()> {
        let mut file = fs::File::create(tmp)?;
        file.write_all(contents)?;
        file.sync_all()
    };
    if let Err(e) = write(&tmp) {
        let _ = fs::remove_file(&tmp);
        return Err(ScryError::Cache(format!(
            "writing {}: {e}",
            path.display()
        )));
    }
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        ScryError::Cache(format!("replacing {}: {e}", path.display()))
    })
}

fn measure_dir(dir: &Path, topic: &mut TopicInfo) -> Result<()> {
    let entries = fs::read_dir(dir)
        .map_err(|e| ScryError::Cache(format!("listing {}: {e}", dir.display())))?;
    for entry in entries {
        let entry = entry.map_err(|e| ScryError::Cache(format!("listing {}: {e}", dir.display())))?;
        let path = entry.path();
        if path.is_dir() {
            measure_dir(&path, topic)?;
            continue;
        }
        if let Ok(metadata) = entry.metadata() {
            topic.files += 1;
            topic.size_bytes += metadata.len();
            if let Ok(modified) = metadata.modified() {
                if topic.last_modified.is_none_or(|seen| modified > seen) {
                    topic.last_modified = Some(modified);
                }
            }
        }
    }
    Ok(())
}

/// Remove files under `dir` (all of them, or only those modified before
/// `cutoff`), then prune emptied subdirectories. Returns files removed.
fn clear_dir(dir: &Path, cutoff: Option<SystemTime>) -> Result<usize> {
    let mut removed = 0;
    let entries = fs::read_dir(dir)
        .map_err(|e| ScryError::Cache(format!("listing {}: {e}", dir.display())))?;
    for entry in entries {
        let entry = entry.map_err(|e| ScryError::Cache(format!("listing {}: {e}", dir.display())))?;
        let path = entry.path();
        if path.is_dir() {
            removed += clear_dir(&path, cutoff)?;
            // Drop the directory once nothing is left in it.
            if fs::read_dir(&path).map(|mut d| d.next().is_none()).unwrap_or(false) {
                let _ = fs::remove_dir(&path);
            }
            continue;
        }
        let stale = match cutoff {
            None => true,
            Some(cutoff) => entry
                .metadata()
                .and_then(|m| m.modified())
                .map(|modified| modified < cutoff)
                .unwrap_or(false),
        };
        if stale {
            fs::remove_file(&path)
                .map_err(|e| ScryError::Cache(format!("removing {}: {e}", path.display())))?;
            removed += 1;
        }
    }
    Ok(removed)
}
