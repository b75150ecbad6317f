//! Order storage
//!
//! This module provides:
//! - The `OrderStore` contract shared by every backing
//! - An in-memory backing for interactive demos
//! - A durable file backing that survives restarts
//!
//! Orders live in one of three partitions: Active (pending), pending
//! training (completed, not yet consumed by a retrain) and trained.

mod file;
mod memory;

pub use file::FileOrderStore;
pub use memory::InMemoryOrderStore;

use crate::error::{QueueError, Result};
use crate::models::{Order, OrderId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Storage contract for orders.
///
/// Queue position ties on `placed_at` are broken by insertion sequence:
/// the order added first ranks ahead.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert a new active order. Fails if the id exists in any partition.
    async fn add(&self, order: Order) -> Result<()>;

    /// Remove an active order and return it
    async fn remove(&self, id: OrderId) -> Result<Order>;

    /// Look an order up in any partition
    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>>;

    /// Snapshot of active orders in queue order: the order at index `i`
    /// has position `i + 1`
    async fn active_orders(&self) -> Result<Vec<Order>>;

    /// Number of active orders
    async fn current_length(&self) -> Result<usize>;

    /// 1-based position of an active order
    async fn position(&self, id: OrderId) -> Result<usize>;

    /// Move an active order to pending-training, applying its completion
    async fn complete(&self, id: OrderId, completed_at: DateTime<Utc>) -> Result<Order>;

    /// Completed orders not yet consumed by a retraining cycle
    async fn pending_training(&self) -> Result<Vec<Order>>;

    /// Move the given pending-training orders to trained. Returns the count moved.
    async fn mark_trained(&self, ids: &[OrderId]) -> Result<usize>;

    /// Ids of orders already consumed by a retraining cycle
    async fn trained_ids(&self) -> Result<Vec<OrderId>>;

    /// Copy of all three partitions
    async fn snapshot(&self) -> Result<StoreSnapshot>;
}

/// Which backing to construct at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    File,
}

/// All three partitions at one instant
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub active: Vec<Order>,
    pub pending_training: Vec<Order>,
    pub trained: Vec<Order>,
}

/// An order tagged with its insertion sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct QueueEntry {
    pub sequence: u64,
    pub order: Order,
}

/// Partitioned order state shared by both backings.
///
/// `trained` only grows, so it sits behind an `Arc`: cloning the state for a
/// commit leaves it shared, and it is never part of the serialized state.
/// The file backing keeps it in a separate append-only log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct QueueState {
    next_sequence: u64,
    active: Vec<QueueEntry>,
    pending_training: Vec<QueueEntry>,
    #[serde(skip)]
    trained: Arc<Vec<QueueEntry>>,
}

/// Queue order: earlier `placed_at` first, insertion sequence on ties
fn queue_key(entry: &QueueEntry) -> (DateTime<Utc>, u64) {
    (entry.order.placed_at, entry.sequence)
}

impl QueueState {
    fn partitions(&self) -> impl Iterator<Item = &QueueEntry> {
        self.active
            .iter()
            .chain(self.pending_training.iter())
            .chain(self.trained.iter())
    }

    pub fn contains(&self, id: OrderId) -> bool {
        self.partitions().any(|e| e.order.id == id)
    }

    pub fn add(&mut self, order: Order) -> Result<()> {
        if self.contains(order.id) {
            return Err(QueueError::DuplicateOrder(order.id));
        }
        if !order.is_active() {
            return Err(QueueError::InvalidOrder(format!(
                "order {} is not pending",
                order.id
            )));
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.active.push(QueueEntry { sequence, order });
        Ok(())
    }

    pub fn remove(&mut self, id: OrderId) -> Result<Order> {
        let idx = self
            .active
            .iter()
            .position(|e| e.order.id == id)
            .ok_or(QueueError::NotFound(id))?;
        Ok(self.active.remove(idx).order)
    }

    pub fn find(&self, id: OrderId) -> Option<Order> {
        self.partitions()
            .find(|e| e.order.id == id)
            .map(|e| e.order.clone())
    }

    pub fn active_orders(&self) -> Vec<Order> {
        let mut entries: Vec<&QueueEntry> = self.active.iter().collect();
        entries.sort_by_key(|e| queue_key(e));
        entries.into_iter().map(|e| e.order.clone()).collect()
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn position(&self, id: OrderId) -> Result<usize> {
        let target = self
            .active
            .iter()
            .find(|e| e.order.id == id)
            .ok_or(QueueError::NotFound(id))?;

        let key = queue_key(target);
        Ok(self.active.iter().filter(|e| queue_key(e) <= key).count())
    }

    pub fn complete(&mut self, id: OrderId, completed_at: DateTime<Utc>) -> Result<Order> {
        let idx = match self.active.iter().position(|e| e.order.id == id) {
            Some(idx) => idx,
            None if self.contains(id) => return Err(QueueError::AlreadyCompleted(id)),
            None => return Err(QueueError::NotFound(id)),
        };

        // Validate on a copy so a rejected completion leaves the entry untouched
        let mut order = self.active[idx].order.clone();
        order.complete(completed_at)?;

        let mut entry = self.active.remove(idx);
        entry.order = order.clone();
        self.pending_training.push(entry);
        Ok(order)
    }

    pub fn pending_training(&self) -> Vec<Order> {
        self.pending_training
            .iter()
            .map(|e| e.order.clone())
            .collect()
    }

    pub fn mark_trained(&mut self, ids: &[OrderId]) -> usize {
        let wanted: HashSet<OrderId> = ids.iter().copied().collect();
        let (moved, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending_training)
            .into_iter()
            .partition(|e| wanted.contains(&e.order.id));
        self.pending_training = kept;
        let count = moved.len();
        if count > 0 {
            Arc::make_mut(&mut self.trained).extend(moved);
        }
        count
    }

    pub fn trained_len(&self) -> usize {
        self.trained.len()
    }

    /// Trained entries appended at or after index `from`
    pub fn trained_since(&self, from: usize) -> &[QueueEntry] {
        self.trained.get(from..).unwrap_or(&[])
    }

    /// Install the trained partition read back from durable storage.
    ///
    /// An id listed as trained wins over a pending-training copy of the
    /// same order, and duplicate log entries keep their first occurrence.
    pub fn restore_trained(&mut self, entries: Vec<QueueEntry>) {
        let mut seen = HashSet::new();
        let trained: Vec<QueueEntry> = entries
            .into_iter()
            .filter(|e| seen.insert(e.order.id))
            .collect();

        self.pending_training
            .retain(|e| !seen.contains(&e.order.id));
        if let Some(max) = trained.iter().map(|e| e.sequence).max() {
            self.next_sequence = self.next_sequence.max(max + 1);
        }
        self.trained = Arc::new(trained);
    }

    pub fn trained_ids(&self) -> Vec<OrderId> {
        self.trained.iter().map(|e| e.order.id).collect()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            active: self.active_orders(),
            pending_training: self.pending_training(),
            trained: self.trained.iter().map(|e| e.order.clone()).collect(),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::models::{
        NotificationPref, Order, OrderDetails, OrderId, PlacementContext, CATALOG_SIZE,
    };
    use chrono::{DateTime, Utc};

    pub fn pending_order(items: &[u32], placed_at: DateTime<Utc>) -> Order {
        let mut order = Order::new_pending(
            OrderId::new(),
            OrderDetails {
                item_ids: items.to_vec(),
                notification_pref: NotificationPref::NONE,
                phone_number: None,
                email: None,
            },
            placed_at,
        );
        order.apply_placement(PlacementContext {
            place_in_queue: 1,
            estimated_wait_minutes: 10.0,
            items_ahead: [0; CATALOG_SIZE],
            total_items_ahead: 0,
        });
        order
    }
}
