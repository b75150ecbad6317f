//! Process-lifetime order store

use super::{OrderStore, QueueState, StoreSnapshot};
use crate::error::Result;
use crate::models::{Order, OrderId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

/// Order store held entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    state: RwLock<QueueState>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn add(&self, order: Order) -> Result<()> {
        let id = order.id;
        self.state.write().await.add(order)?;
        debug!(order_id = %id, "Order added");
        Ok(())
    }

    async fn remove(&self, id: OrderId) -> Result<Order> {
        self.state.write().await.remove(id)
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.find(id))
    }

    async fn active_orders(&self) -> Result<Vec<Order>> {
        Ok(self.state.read().await.active_orders())
    }

    async fn current_length(&self) -> Result<usize> {
        Ok(self.state.read().await.active_len())
    }

    async fn position(&self, id: OrderId) -> Result<usize> {
        self.state.read().await.position(id)
    }

    async fn complete(&self, id: OrderId, completed_at: DateTime<Utc>) -> Result<Order> {
        self.state.write().await.complete(id, completed_at)
    }

    async fn pending_training(&self) -> Result<Vec<Order>> {
        Ok(self.state.read().await.pending_training())
    }

    async fn mark_trained(&self, ids: &[OrderId]) -> Result<usize> {
        Ok(self.state.write().await.mark_trained(ids))
    }

    async fn trained_ids(&self) -> Result<Vec<OrderId>> {
        Ok(self.state.read().await.trained_ids())
    }

    async fn snapshot(&self) -> Result<StoreSnapshot> {
        Ok(self.state.read().await.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueueError;
    use crate::store::test_support::pending_order;
    use chrono::Duration;

    #[tokio::test]
    async fn test_length_tracks_adds_and_removes() {
        let store = InMemoryOrderStore::new();
        let base = Utc::now();
        let mut ids = Vec::new();
        for i in 0..3 {
            let order = pending_order(&[1], base + Duration::seconds(i));
            ids.push(order.id);
            store.add(order).await.unwrap();
        }
        assert_eq!(store.current_length().await.unwrap(), 3);

        let removed = store.remove(ids[0]).await.unwrap();
        assert_eq!(removed.id, ids[0]);
        assert_eq!(store.current_length().await.unwrap(), 2);
        assert_eq!(store.position(ids[1]).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_id_is_none_not_error() {
        let store = InMemoryOrderStore::new();
        assert!(store.find_by_id(OrderId::new()).await.unwrap().is_none());
        assert!(matches!(
            store.position(OrderId::new()).await,
            Err(QueueError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_snapshot_is_detached() {
        let store = InMemoryOrderStore::new();
        let order = pending_order(&[3], Utc::now());
        let id = order.id;
        store.add(order).await.unwrap();

        let snapshot = store.active_orders().await.unwrap();
        store.remove(id).await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.current_length().await.unwrap(), 0);
    }
}
