//! Durable order store backed by a JSON state file plus a trained-order log
//!
//! Active and pending-training orders live in the state file. Every mutation
//! is applied to a copy of the state, written to disk atomically (temp file,
//! fsync, rename) and only then published, so a failed write leaves both the
//! file and the visible state unchanged.
//!
//! Trained orders are append-only and go to a JSON-lines log beside the state
//! file, so the per-request rewrite does not grow with order history. The log
//! is appended before the state file drops those orders; if the process stops
//! in between, the log wins on the next open.

use super::{OrderStore, QueueEntry, QueueState, StoreSnapshot};
use crate::error::{QueueError, Result};
use crate::models::{Order, OrderId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Order store persisted to a JSON state file and a trained-order log
#[derive(Debug)]
pub struct FileOrderStore {
    path: PathBuf,
    trained_log: PathBuf,
    state: Mutex<QueueState>,
}

impl FileOrderStore {
    /// Open the store at `path`, loading existing state if the file exists
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    QueueError::Storage(format!("Failed to create directory {:?}: {}", parent, e))
                })?;
            }
        }

        let trained_log = trained_log_path(&path);
        let mut state = if path.exists() {
            load_state(&path)?
        } else {
            QueueState::default()
        };
        if trained_log.exists() {
            state.restore_trained(load_trained_log(&trained_log)?);
        }
        if path.exists() || trained_log.exists() {
            info!(
                path = %path.display(),
                active = state.active_len(),
                trained = state.trained_len(),
                "Loaded order store from disk"
            );
        }

        Ok(Self {
            path,
            trained_log,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn trained_log_path(&self) -> &Path {
        &self.trained_log
    }

    /// Apply `op` to a copy of the state, persist it, then publish it
    async fn commit<T>(&self, op: impl FnOnce(&mut QueueState) -> Result<T>) -> Result<T> {
        let mut guard = self.state.lock().await;
        let mut next = guard.clone();
        let out = op(&mut next)?;
        save_state(&self.path, &next)?;
        *guard = next;
        Ok(out)
    }
}

#[async_trait]
impl OrderStore for FileOrderStore {
    async fn add(&self, order: Order) -> Result<()> {
        let id = order.id;
        self.commit(|state| state.add(order)).await?;
        debug!(order_id = %id, path = %self.path.display(), "Order persisted");
        Ok(())
    }

    async fn remove(&self, id: OrderId) -> Result<Order> {
        self.commit(|state| state.remove(id)).await
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.lock().await.find(id))
    }

    async fn active_orders(&self) -> Result<Vec<Order>> {
        Ok(self.state.lock().await.active_orders())
    }

    async fn current_length(&self) -> Result<usize> {
        Ok(self.state.lock().await.active_len())
    }

    async fn position(&self, id: OrderId) -> Result<usize> {
        self.state.lock().await.position(id)
    }

    async fn complete(&self, id: OrderId, completed_at: DateTime<Utc>) -> Result<Order> {
        self.commit(|state| state.complete(id, completed_at)).await
    }

    async fn pending_training(&self) -> Result<Vec<Order>> {
        Ok(self.state.lock().await.pending_training())
    }

    async fn mark_trained(&self, ids: &[OrderId]) -> Result<usize> {
        let mut guard = self.state.lock().await;
        let mut next = guard.clone();
        let before = next.trained_len();
        let moved = next.mark_trained(ids);
        if moved == 0 {
            return Ok(0);
        }

        append_trained(&self.trained_log, next.trained_since(before))?;
        save_state(&self.path, &next)?;
        *guard = next;
        debug!(moved, log = %self.trained_log.display(), "Trained orders logged");
        Ok(moved)
    }

    async fn trained_ids(&self) -> Result<Vec<OrderId>> {
        Ok(self.state.lock().await.trained_ids())
    }

    async fn snapshot(&self) -> Result<StoreSnapshot> {
        Ok(self.state.lock().await.snapshot())
    }
}

fn save_state(path: &Path, state: &QueueState) -> Result<()> {
    let json = serde_json::to_vec_pretty(state)?;

    let temp_path = path.with_extension("tmp");
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| QueueError::Storage(format!("Failed to create temp file {:?}: {}", temp_path, e)))?;

    file.write_all(&json)?;
    file.sync_all()?;

    fs::rename(&temp_path, path).map_err(|e| {
        QueueError::Storage(format!("Failed to rename {:?} to {:?}: {}", temp_path, path, e))
    })?;

    Ok(())
}

fn load_state(path: &Path) -> Result<QueueState> {
    let data = fs::read(path)
        .map_err(|e| QueueError::Storage(format!("Failed to read store file {:?}: {}", path, e)))?;
    serde_json::from_slice(&data)
        .map_err(|e| QueueError::Storage(format!("Corrupt store file {:?}: {}", path, e)))
}

fn trained_log_path(state_path: &Path) -> PathBuf {
    state_path.with_extension("trained.jsonl")
}

fn append_trained(path: &Path, entries: &[QueueEntry]) -> Result<()> {
    let mut lines = Vec::new();
    for entry in entries {
        serde_json::to_writer(&mut lines, entry)?;
        lines.push(b'\n');
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| QueueError::Storage(format!("Failed to open trained log {:?}: {}", path, e)))?;
    file.write_all(&lines)?;
    file.sync_all()?;
    Ok(())
}

/// A torn final line from an interrupted append is dropped; damage anywhere
/// else is a storage error.
fn load_trained_log(path: &Path) -> Result<Vec<QueueEntry>> {
    let data = fs::read_to_string(path)
        .map_err(|e| QueueError::Storage(format!("Failed to read trained log {:?}: {}", path, e)))?;
    let lines: Vec<&str> = data.lines().filter(|l| !l.trim().is_empty()).collect();

    let mut entries = Vec::with_capacity(lines.len());
    for (idx, line) in lines.iter().enumerate() {
        match serde_json::from_str::<QueueEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) if idx + 1 == lines.len() => {
                warn!(path = %path.display(), error = %e, "Dropping torn trained log entry");
            }
            Err(e) => {
                return Err(QueueError::Storage(format!(
                    "Corrupt trained log {:?} at line {}: {}",
                    path,
                    idx + 1,
                    e
                )))
            }
        }
    }
    Ok(entries)
}
