//! Order lifecycle orchestration
//!
//! `QueueService` drives placement and completion across the order store,
//! feature extractor, predictor and notification dispatcher, and exposes the
//! read-only views used for operational debugging.
//!
//! Placements are admitted one at a time: the active snapshot, the position
//! and features derived from it, and the insert of the finished order happen
//! under a single admission lock, so two concurrent placements never share a
//! position. Completions rely on the store's atomic `complete` instead.

use crate::error::{QueueError, Result};
use crate::health::{Component, ComponentStatus, HealthRegistry};
use crate::models::{
    NotificationPref, Order, OrderId, PlaceOrderRequest, PlacementContext,
};
use crate::notify::{DispatchReport, NotificationDispatcher, NotificationEvent};
use crate::observability::{EventLogger, QueueMetrics};
use crate::predictor::{
    FeatureExtractor, FeatureVector, ModelSource, PredictorStats, RetrainReport,
    WaitTimePredictor,
};
use crate::store::{OrderStore, StoreSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Returned to the customer after a placement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementReceipt {
    pub order_id: OrderId,
    pub place_in_queue: u32,
    pub estimated_wait_minutes: f64,
    pub placed_at: DateTime<Utc>,
    pub model_version: String,
    pub notifications: DispatchReport,
}

/// Returned to staff after a completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionReceipt {
    pub order_id: OrderId,
    pub placed_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub estimated_wait_minutes: f64,
    pub actual_wait_minutes: f64,
    pub prediction_error_minutes: f64,
    /// Version of the model this completion triggered, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrained_version: Option<String>,
    pub notifications: DispatchReport,
}

/// An active order with its live position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveOrderView {
    pub order_id: OrderId,
    pub position: u32,
    pub place_in_queue: u32,
    pub item_ids: Vec<u32>,
    pub placed_at: DateTime<Utc>,
    pub estimated_wait_minutes: f64,
    pub notification_pref: NotificationPref,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A completed order not yet consumed by a retrain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingTrainingView {
    pub order_id: OrderId,
    pub item_ids: Vec<u32>,
    pub placed_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub estimated_wait_minutes: f64,
    pub actual_wait_minutes: Option<f64>,
    pub prediction_error_minutes: Option<f64>,
}

impl From<&Order> for PendingTrainingView {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            item_ids: order.item_ids.clone(),
            placed_at: order.placed_at,
            completed_at: order.completed_at,
            estimated_wait_minutes: order.estimated_wait_minutes,
            actual_wait_minutes: order.actual_wait_minutes,
            prediction_error_minutes: order.prediction_error_minutes,
        }
    }
}

/// All partitions plus predictor state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugDump {
    pub generated_at: DateTime<Utc>,
    pub store: StoreSnapshot,
    pub predictor: PredictorStats,
}

/// What `start` found and restored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartupSummary {
    /// `None` when no model could be loaded or fitted
    pub model_source: Option<ModelSource>,
    pub model_version: String,
    pub active_orders: usize,
    pub restored_samples: usize,
}

/// Order queue service
pub struct QueueService {
    store: Arc<dyn OrderStore>,
    predictor: Arc<WaitTimePredictor>,
    dispatcher: NotificationDispatcher,
    extractor: FeatureExtractor,
    health: HealthRegistry,
    metrics: QueueMetrics,
    logger: EventLogger,
    admission: Mutex<()>,
}

impl QueueService {
    pub fn new(
        store: Arc<dyn OrderStore>,
        predictor: Arc<WaitTimePredictor>,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        Self {
            store,
            predictor,
            dispatcher,
            extractor: FeatureExtractor::new(),
            health: HealthRegistry::new(),
            metrics: QueueMetrics::new(),
            logger: EventLogger::new("local"),
            admission: Mutex::new(()),
        }
    }

    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = health;
        self
    }

    pub fn with_logger(mut self, logger: EventLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    pub fn logger(&self) -> &EventLogger {
        &self.logger
    }

    pub fn predictor(&self) -> &WaitTimePredictor {
        &self.predictor
    }

    /// Load or bootstrap the model, refill the training buffer from
    /// completed orders not yet trained on, and mark the service ready.
    pub async fn start(&self) -> Result<StartupSummary> {
        self.health.register_all().await;

        let model_source = match self.predictor.load_or_bootstrap() {
            Ok(source) => {
                self.metrics
                    .set_model_version(&self.predictor.model_version(), source_label(source));
                Some(source)
            }
            Err(e) => {
                warn!(error = %e, "No wait-time model available, estimates use the fallback");
                self.health
                    .set_degraded(Component::Predictor, format!("No model: {}", e))
                    .await;
                None
            }
        };

        let pending = self.observe_store(self.store.pending_training().await).await?;
        let mut restored_samples = 0;
        for order in &pending {
            let features = FeatureVector::from_placed_order(order);
            if self.predictor.record_outcome(order, &features).await {
                restored_samples += 1;
            }
        }
        if restored_samples > 0 {
            info!(restored_samples, "Training buffer restored from pending orders");
            self.check_retrain().await;
        }

        let active_orders = self.observe_store(self.store.current_length().await).await?;
        self.metrics.set_active_orders(active_orders);
        self.metrics
            .set_training_buffer(self.predictor.buffered_samples().await);
        self.health.set_ready(true).await;

        Ok(StartupSummary {
            model_source,
            model_version: self.predictor.model_version(),
            active_orders,
            restored_samples,
        })
    }

    /// Admit a new order, estimate its wait and notify the customer
    pub async fn place_order(&self, request: &PlaceOrderRequest) -> Result<PlacementReceipt> {
        let details = request.validate()?;

        let (order, estimate, queue_depth) = {
            let _admission = self.admission.lock().await;

            let active = self.observe_store(self.store.active_orders().await).await?;
            let mut order = Order::new_pending(OrderId::new(), details, Utc::now());

            let start = Instant::now();
            let features = self.extractor.extract(&order, &active);
            let estimate = self.predictor.predict(&features);
            self.metrics
                .observe_prediction_latency(start.elapsed().as_secs_f64());

            order.apply_placement(PlacementContext {
                place_in_queue: features.queue_length,
                estimated_wait_minutes: estimate.minutes,
                items_ahead: features.items_ahead,
                total_items_ahead: features.total_items_ahead,
            });
            self.observe_store(self.store.add(order.clone()).await)
                .await?;

            (order, estimate, active.len() + 1)
        };

        self.metrics.inc_orders_placed();
        self.metrics.set_active_orders(queue_depth);
        if estimate.is_fallback() {
            self.metrics.inc_fallback_predictions();
            self.health
                .set_degraded(Component::Predictor, "Using fallback wait estimate")
                .await;
        } else {
            self.restore(Component::Predictor).await;
        }
        self.logger.log_order_placed(&order, &estimate);

        let notifications = self.notify(&order, NotificationEvent::Placement).await;

        Ok(PlacementReceipt {
            order_id: order.id,
            place_in_queue: order.place_in_queue,
            estimated_wait_minutes: order.estimated_wait_minutes,
            placed_at: order.placed_at,
            model_version: estimate.model_version,
            notifications,
        })
    }

    /// Complete an active order, feed its outcome to the predictor and
    /// notify the customer. `completed_at` defaults to now.
    pub async fn complete_order(
        &self,
        id: OrderId,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<CompletionReceipt> {
        let completed_at = completed_at.unwrap_or_else(Utc::now);
        let order = self
            .observe_store(self.store.complete(id, completed_at).await)
            .await?;

        self.metrics.inc_orders_completed();
        if let Ok(len) = self.store.current_length().await {
            self.metrics.set_active_orders(len);
        }
        self.logger.log_order_completed(&order);

        let features = FeatureVector::from_placed_order(&order);
        self.predictor.record_outcome(&order, &features).await;

        let notifications = self.notify(&order, NotificationEvent::Completion).await;
        let retrained_version = self.check_retrain().await.map(|r| r.version);
        self.metrics
            .set_training_buffer(self.predictor.buffered_samples().await);

        Ok(CompletionReceipt {
            order_id: order.id,
            placed_at: order.placed_at,
            completed_at,
            estimated_wait_minutes: order.estimated_wait_minutes,
            actual_wait_minutes: order.actual_wait_minutes.unwrap_or_default(),
            prediction_error_minutes: order.prediction_error_minutes.unwrap_or_default(),
            retrained_version,
            notifications,
        })
    }

    /// Retrain now on whatever is buffered. `Ok(None)` when nothing is buffered.
    pub async fn retrain(&self) -> Result<Option<RetrainReport>> {
        let previous = self.predictor.model_version();
        let start = Instant::now();

        let report = match self.predictor.force_retrain().await {
            Ok(report) => report,
            Err(e) => {
                self.logger.log_retrain_failed(&previous, &e.to_string());
                return Err(e);
            }
        };

        if let Some(report) = &report {
            self.on_retrained(&previous, report, start.elapsed()).await;
        }
        self.metrics
            .set_training_buffer(self.predictor.buffered_samples().await);
        Ok(report)
    }

    /// Look up an order in any partition
    pub async fn order(&self, id: OrderId) -> Result<Order> {
        self.observe_store(self.store.find_by_id(id).await)
            .await?
            .ok_or(QueueError::NotFound(id))
    }

    /// Active orders with their live position, in the store's queue order
    pub async fn active_queue(&self) -> Result<Vec<ActiveOrderView>> {
        let active = self.observe_store(self.store.active_orders().await).await?;

        Ok(active
            .into_iter()
            .enumerate()
            .map(|(idx, order)| ActiveOrderView {
                order_id: order.id,
                position: idx as u32 + 1,
                place_in_queue: order.place_in_queue,
                item_ids: order.item_ids,
                placed_at: order.placed_at,
                estimated_wait_minutes: order.estimated_wait_minutes,
                notification_pref: order.notification_pref,
                phone_number: order.phone_number,
                email: order.email,
            })
            .collect())
    }

    pub async fn pending_training(&self) -> Result<Vec<PendingTrainingView>> {
        let pending = self.observe_store(self.store.pending_training().await).await?;
        Ok(pending.iter().map(PendingTrainingView::from).collect())
    }

    pub async fn trained_ids(&self) -> Result<Vec<OrderId>> {
        self.observe_store(self.store.trained_ids().await).await
    }

    pub async fn debug_dump(&self) -> Result<DebugDump> {
        Ok(DebugDump {
            generated_at: Utc::now(),
            store: self.observe_store(self.store.snapshot().await).await?,
            predictor: self.predictor.stats().await,
        })
    }

    async fn check_retrain(&self) -> Option<RetrainReport> {
        let previous = self.predictor.model_version();
        let start = Instant::now();

        match self.predictor.maybe_retrain().await {
            Ok(Some(report)) => {
                self.on_retrained(&previous, &report, start.elapsed()).await;
                Some(report)
            }
            Ok(None) => None,
            Err(e) => {
                self.logger.log_retrain_failed(&previous, &e.to_string());
                None
            }
        }
    }

    async fn on_retrained(&self, previous: &str, report: &RetrainReport, elapsed: Duration) {
        self.metrics.observe_retrain(elapsed.as_secs_f64());
        self.metrics
            .set_model_version(&report.version, source_label(ModelSource::Retrained));
        self.logger.log_model_retrained(previous, report);
        self.restore(Component::Predictor).await;

        // The new model is already live
        match self
            .observe_store(self.store.mark_trained(&report.trained_order_ids).await)
            .await
        {
            Ok(moved) => debug!(moved, version = %report.version, "Orders marked trained"),
            Err(e) => warn!(error = %e, version = %report.version, "Failed to mark orders trained"),
        }
    }

    async fn notify(&self, order: &Order, event: NotificationEvent) -> DispatchReport {
        let report = self.dispatcher.send(order, event).await;

        if report.is_clean() {
            self.restore(Component::Notifier).await;
        } else {
            for failure in &report.failed {
                self.metrics.inc_notification_failures(&failure.channel);
            }
            let channels: Vec<&str> = report.failed.iter().map(|f| f.channel.as_str()).collect();
            self.health
                .set_degraded(
                    Component::Notifier,
                    format!("Failed channels: {}", channels.join(", ")),
                )
                .await;
        }
        report
    }

    /// Mark storage unhealthy on a storage fault, healthy again on success
    async fn observe_store<T>(&self, result: Result<T>) -> Result<T> {
        match &result {
            Err(QueueError::Storage(reason)) => {
                self.health
                    .set_unhealthy(Component::OrderStore, reason.clone())
                    .await;
            }
            Ok(_) => self.restore(Component::OrderStore).await,
            Err(_) => {}
        }
        result
    }

    async fn restore(&self, component: Component) {
        if self.health.status(component).await != Some(ComponentStatus::Healthy) {
            self.health.set_healthy(component).await;
        }
    }
}

fn source_label(source: ModelSource) -> &'static str {
    match source {
        ModelSource::Bootstrap => "bootstrap",
        ModelSource::Retrained => "retrained",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderStatus, CATALOG_SIZE};
    use crate::notify::{async_trait, NotificationSender, SendOutcome};
    use crate::predictor::{OutputConfig, PredictorConfig};
    use crate::store::test_support::pending_order;
    use crate::store::{FileOrderStore, InMemoryOrderStore};
    use chrono::Duration as ChronoDuration;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn request(items: &str) -> PlaceOrderRequest {
        PlaceOrderRequest {
            item_ids: items.to_string(),
            ..Default::default()
        }
    }

    fn predictor(threshold: usize) -> Arc<WaitTimePredictor> {
        Arc::new(WaitTimePredictor::new(PredictorConfig {
            retrain_threshold: threshold,
            bootstrap_samples: 100,
            output: OutputConfig {
                fallback_wait_minutes: 10.0,
                ..Default::default()
            },
            ..Default::default()
        }))
    }

    fn service(threshold: usize) -> QueueService {
        QueueService::new(
            Arc::new(InMemoryOrderStore::new()),
            predictor(threshold),
            NotificationDispatcher::with_gateways(None, None).unwrap(),
        )
    }

    async fn started(threshold: usize) -> QueueService {
        let service = service(threshold);
        service.start().await.unwrap();
        service
    }

    #[tokio::test]
    async fn test_sequential_positions() {
        let service = started(100).await;

        for k in 1..=5u32 {
            let receipt = service.place_order(&request("1")).await.unwrap();
            assert_eq!(receipt.place_in_queue, k);
            assert!(receipt.estimated_wait_minutes >= 1.0);
        }

        let queue = service.active_queue().await.unwrap();
        assert_eq!(queue.len(), 5);
        let positions: Vec<u32> = queue.iter().map(|v| v.position).collect();
        assert_eq!(positions, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_concurrent_placements_get_distinct_positions() {
        let service = Arc::new(started(100).await);

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.place_order(&request("2,3")).await })
            })
            .collect();

        let mut positions = HashSet::new();
        for handle in handles {
            let receipt = handle.await.unwrap().unwrap();
            positions.insert(receipt.place_in_queue);
        }
        assert_eq!(positions, (1..=20).collect::<HashSet<u32>>());
    }

    #[tokio::test]
    async fn test_first_order_sees_empty_queue() {
        let service = started(100).await;
        let receipt = service.place_order(&request("1,2,3")).await.unwrap();

        let order = service.order(receipt.order_id).await.unwrap();
        assert_eq!(order.place_in_queue, 1);
        assert_eq!(order.items_ahead_at_placement, [0; CATALOG_SIZE]);
        assert_eq!(order.total_items_ahead_at_placement, 0);
    }

    #[tokio::test]
    async fn test_items_ahead_counts_units() {
        let service = started(100).await;
        service.place_order(&request("1,2")).await.unwrap();
        service.place_order(&request("2,3")).await.unwrap();
        let third = service.place_order(&request("1")).await.unwrap();

        let order = service.order(third.order_id).await.unwrap();
        assert_eq!(order.items_ahead_at_placement[0], 1);
        assert_eq!(order.items_ahead_at_placement[1], 2);
        assert_eq!(order.items_ahead_at_placement[2], 1);
        assert_eq!(order.total_items_ahead_at_placement, 4);
        assert_eq!(order.place_in_queue, 3);
    }

    #[tokio::test]
    async fn test_invalid_request_rejected() {
        let service = started(100).await;
        let err = service.place_order(&request("0,11")).await.unwrap_err();
        assert!(matches!(err, QueueError::InvalidOrder(_)));
        assert!(service.active_queue().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_completion_outcome() {
        // Without a model every estimate is the 10-minute fallback
        let service = service(100);
        let receipt = service.place_order(&request("4")).await.unwrap();
        assert_eq!(receipt.estimated_wait_minutes, 10.0);

        let done = service
            .complete_order(
                receipt.order_id,
                Some(receipt.placed_at + ChronoDuration::minutes(14)),
            )
            .await
            .unwrap();
        assert!((done.actual_wait_minutes - 14.0).abs() < 1e-9);
        assert!((done.prediction_error_minutes - 4.0).abs() < 1e-9);

        let order = service.order(receipt.order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Complete);
        assert!(service.active_queue().await.unwrap().is_empty());
        assert_eq!(service.pending_training().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_double_completion_rejected() {
        let service = started(100).await;
        let receipt = service.place_order(&request("1")).await.unwrap();

        service.complete_order(receipt.order_id, None).await.unwrap();
        let err = service
            .complete_order(receipt.order_id, None)
            .await
            .unwrap_err();

        assert!(matches!(err, QueueError::AlreadyCompleted(_)));
        assert_eq!(service.predictor().buffered_samples().await, 1);
        assert_eq!(service.pending_training().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let service = started(100).await;
        let id = OrderId::new();
        assert!(matches!(
            service.complete_order(id, None).await,
            Err(QueueError::NotFound(_))
        ));
        assert!(matches!(service.order(id).await, Err(QueueError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_removal_keeps_relative_positions() {
        let service = started(100).await;
        let mut ids = Vec::new();
        for _ in 0..4 {
            ids.push(service.place_order(&request("5")).await.unwrap().order_id);
        }

        service.complete_order(ids[1], None).await.unwrap();

        let queue = service.active_queue().await.unwrap();
        let order: Vec<OrderId> = queue.iter().map(|v| v.order_id).collect();
        assert_eq!(order, vec![ids[0], ids[2], ids[3]]);
        assert_eq!(queue[2].position, 3);
        assert_eq!(queue[2].place_in_queue, 4);
    }

    #[tokio::test]
    async fn test_active_queue_matches_store_positions() {
        let store = Arc::new(InMemoryOrderStore::new());
        let at = Utc::now();
        let later = pending_order(&[1], at + ChronoDuration::seconds(10));
        let first_tie = pending_order(&[2], at);
        let second_tie = pending_order(&[3], at);
        for order in [later.clone(), first_tie.clone(), second_tie.clone()] {
            store.add(order).await.unwrap();
        }

        let service = QueueService::new(
            store.clone(),
            predictor(100),
            NotificationDispatcher::new(),
        );
        let queue = service.active_queue().await.unwrap();

        let ids: Vec<OrderId> = queue.iter().map(|v| v.order_id).collect();
        assert_eq!(ids, vec![first_tie.id, second_tie.id, later.id]);
        for view in &queue {
            assert_eq!(
                store.position(view.order_id).await.unwrap(),
                view.position as usize
            );
        }
    }

    #[tokio::test]
    async fn test_threshold_triggers_single_retrain() {
        let service = started(3).await;
        let mut receipts = Vec::new();
        for items in ["1", "2,3", "4,5,6"] {
            receipts.push(service.place_order(&request(items)).await.unwrap());
        }

        let mut retrained = Vec::new();
        for (i, receipt) in receipts.iter().enumerate() {
            let done = service
                .complete_order(
                    receipt.order_id,
                    Some(receipt.placed_at + ChronoDuration::minutes(5 + i as i64)),
                )
                .await
                .unwrap();
            retrained.push(done.retrained_version);
        }

        assert_eq!(retrained, vec![None, None, Some("v1".to_string())]);
        assert_eq!(service.predictor().buffered_samples().await, 0);
        assert!(service.pending_training().await.unwrap().is_empty());
        assert_eq!(service.trained_ids().await.unwrap().len(), 3);
        assert_eq!(service.predictor().model_version(), "v1");
    }

    #[tokio::test]
    async fn test_forced_retrain() {
        let service = started(100).await;
        assert!(service.retrain().await.unwrap().is_none());

        let receipt = service.place_order(&request("7")).await.unwrap();
        service.complete_order(receipt.order_id, None).await.unwrap();

        let report = service.retrain().await.unwrap().unwrap();
        assert_eq!(report.samples, 1);
        assert_eq!(service.trained_ids().await.unwrap(), vec![receipt.order_id]);
    }

    #[tokio::test]
    async fn test_fallback_degrades_predictor_health() {
        let service = service(100);
        service.health().register_all().await;
        let receipt = service.place_order(&request("1")).await.unwrap();

        assert_eq!(receipt.model_version, "fallback");
        assert_eq!(
            service.health().status(Component::Predictor).await,
            Some(ComponentStatus::Degraded)
        );
    }

    struct DownSender;

    #[async_trait]
    impl NotificationSender for DownSender {
        fn channel(&self) -> &'static str {
            "sms"
        }

        async fn send(&self, _order: &Order, _event: NotificationEvent) -> Result<SendOutcome> {
            Err(QueueError::NotificationFailed {
                channel: "sms".to_string(),
                reason: "gateway down".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_request() {
        let service = QueueService::new(
            Arc::new(InMemoryOrderStore::new()),
            predictor(100),
            NotificationDispatcher::new().with_sender(Arc::new(DownSender)),
        );
        service.start().await.unwrap();

        let receipt = service.place_order(&request("1")).await.unwrap();
        assert_eq!(receipt.notifications.failed.len(), 1);
        assert_eq!(
            service.health().status(Component::Notifier).await,
            Some(ComponentStatus::Degraded)
        );

        let done = service.complete_order(receipt.order_id, None).await.unwrap();
        assert_eq!(done.order_id, receipt.order_id);
    }

    #[tokio::test]
    async fn test_restart_restores_queue_and_training_buffer() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("orders.json");

        let (kept, done) = {
            let service = QueueService::new(
                Arc::new(FileOrderStore::open(&path).unwrap()),
                predictor(100),
                NotificationDispatcher::new(),
            );
            service.start().await.unwrap();
            let done = service.place_order(&request("1")).await.unwrap();
            let kept = service.place_order(&request("2")).await.unwrap();
            service.complete_order(done.order_id, None).await.unwrap();
            (kept, done)
        };

        let service = QueueService::new(
            Arc::new(FileOrderStore::open(&path).unwrap()),
            predictor(100),
            NotificationDispatcher::new(),
        );
        let summary = service.start().await.unwrap();

        assert_eq!(summary.active_orders, 1);
        assert_eq!(summary.restored_samples, 1);
        let queue = service.active_queue().await.unwrap();
        assert_eq!(queue[0].order_id, kept.order_id);
        assert_eq!(queue[0].position, 1);
        assert_eq!(
            service.pending_training().await.unwrap()[0].order_id,
            done.order_id
        );
    }

    #[tokio::test]
    async fn test_debug_dump() {
        let service = started(100).await;
        let a = service.place_order(&request("1")).await.unwrap();
        service.place_order(&request("2")).await.unwrap();
        service.complete_order(a.order_id, None).await.unwrap();

        let dump = service.debug_dump().await.unwrap();
        assert_eq!(dump.store.active.len(), 1);
        assert_eq!(dump.store.pending_training.len(), 1);
        assert!(dump.store.trained.is_empty());
        assert_eq!(dump.predictor.buffered_samples, 1);
        assert_eq!(dump.predictor.model.unwrap().version, "bootstrap");
    }
}
