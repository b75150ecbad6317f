//! Observability infrastructure for the order queue
//!
//! Provides:
//! - Prometheus metrics (placements, completions, queue depth, prediction latency, retrains)
//! - Structured JSON event logging with tracing

use crate::models::Order;
use crate::predictor::{RetrainReport, WaitEstimate};
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, Encoder, GaugeVec, Histogram, IntCounter, IntCounterVec, IntGauge,
    TextEncoder,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for prediction latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1,
];

/// Histogram buckets for retraining duration (in seconds)
const RETRAIN_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0];

/// Absolute prediction error above which a completion is logged as a warning
const LARGE_ERROR_MINUTES: f64 = 30.0;

static GLOBAL_METRICS: OnceLock<QueueMetricsInner> = OnceLock::new();

struct QueueMetricsInner {
    orders_placed: IntCounter,
    orders_completed: IntCounter,
    active_orders: IntGauge,
    training_buffer_samples: IntGauge,
    prediction_latency_seconds: Histogram,
    fallback_predictions: IntCounter,
    retrain_duration_seconds: Histogram,
    model_retrains: IntCounter,
    notification_failures: IntCounterVec,
    model_version_info: GaugeVec,
}

impl QueueMetricsInner {
    fn new() -> Self {
        Self {
            orders_placed: register_int_counter!(
                "order_queue_orders_placed_total",
                "Total number of orders placed"
            )
            .expect("Failed to register orders_placed"),

            orders_completed: register_int_counter!(
                "order_queue_orders_completed_total",
                "Total number of orders completed"
            )
            .expect("Failed to register orders_completed"),

            active_orders: register_int_gauge!(
                "order_queue_active_orders",
                "Number of orders currently waiting in the queue"
            )
            .expect("Failed to register active_orders"),

            training_buffer_samples: register_int_gauge!(
                "order_queue_training_buffer_samples",
                "Completed-order samples waiting for the next retrain"
            )
            .expect("Failed to register training_buffer_samples"),

            prediction_latency_seconds: register_histogram!(
                "order_queue_prediction_latency_seconds",
                "Time spent extracting features and predicting a wait",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            fallback_predictions: register_int_counter!(
                "order_queue_fallback_predictions_total",
                "Estimates answered with the fixed fallback wait"
            )
            .expect("Failed to register fallback_predictions"),

            retrain_duration_seconds: register_histogram!(
                "order_queue_retrain_duration_seconds",
                "Time spent fitting and installing a new model",
                RETRAIN_BUCKETS.to_vec()
            )
            .expect("Failed to register retrain_duration_seconds"),

            model_retrains: register_int_counter!(
                "order_queue_model_retrains_total",
                "Total number of completed retraining cycles"
            )
            .expect("Failed to register model_retrains"),

            notification_failures: register_int_counter_vec!(
                "order_queue_notification_failures_total",
                "Failed notification sends by channel",
                &["channel"]
            )
            .expect("Failed to register notification_failures"),

            model_version_info: register_gauge_vec!(
                "order_queue_model_version_info",
                "Information about the active wait-time model",
                &["version", "source"]
            )
            .expect("Failed to register model_version_info"),
        }
    }
}

/// Queue metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance; clones share it.
#[derive(Clone)]
pub struct QueueMetrics {
    _private: (),
}

impl Default for QueueMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(QueueMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &QueueMetricsInner {
        GLOBAL_METRICS.get_or_init(QueueMetricsInner::new)
    }

    pub fn inc_orders_placed(&self) {
        self.inner().orders_placed.inc();
    }

    pub fn inc_orders_completed(&self) {
        self.inner().orders_completed.inc();
    }

    pub fn set_active_orders(&self, count: usize) {
        self.inner().active_orders.set(count as i64);
    }

    pub fn set_training_buffer(&self, samples: usize) {
        self.inner().training_buffer_samples.set(samples as i64);
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_fallback_predictions(&self) {
        self.inner().fallback_predictions.inc();
    }

    pub fn observe_retrain(&self, duration_secs: f64) {
        self.inner().retrain_duration_seconds.observe(duration_secs);
        self.inner().model_retrains.inc();
    }

    pub fn inc_notification_failures(&self, channel: &str) {
        self.inner()
            .notification_failures
            .with_label_values(&[channel])
            .inc();
    }

    pub fn set_model_version(&self, version: &str, source: &str) {
        self.inner().model_version_info.reset();
        self.inner()
            .model_version_info
            .with_label_values(&[version, source])
            .set(1.0);
    }

    /// Every registered metric in the Prometheus text exposition format
    pub fn encode_text(&self) -> prometheus::Result<Vec<u8>> {
        self.inner();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
        Ok(buffer)
    }
}

/// Structured logger for queue lifecycle events
#[derive(Clone)]
pub struct EventLogger {
    node_name: String,
}

impl EventLogger {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
        }
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    pub fn log_order_placed(&self, order: &Order, estimate: &WaitEstimate) {
        info!(
            event = "order_placed",
            node = %self.node_name,
            order_id = %order.id,
            item_count = order.item_count(),
            place_in_queue = order.place_in_queue,
            total_items_ahead = order.total_items_ahead_at_placement,
            estimated_wait_minutes = estimate.minutes,
            model_version = %estimate.model_version,
            fallback = estimate.is_fallback(),
            "Order placed"
        );
    }

    pub fn log_order_completed(&self, order: &Order) {
        let actual = order.actual_wait_minutes.unwrap_or_default();
        let error = order.prediction_error_minutes.unwrap_or_default();

        if error > LARGE_ERROR_MINUTES {
            warn!(
                event = "order_completed",
                node = %self.node_name,
                order_id = %order.id,
                estimated_wait_minutes = order.estimated_wait_minutes,
                actual_wait_minutes = actual,
                prediction_error_minutes = error,
                "Order completed with a large prediction error"
            );
        } else {
            info!(
                event = "order_completed",
                node = %self.node_name,
                order_id = %order.id,
                estimated_wait_minutes = order.estimated_wait_minutes,
                actual_wait_minutes = actual,
                prediction_error_minutes = error,
                "Order completed"
            );
        }
    }

    pub fn log_model_retrained(&self, previous_version: &str, report: &RetrainReport) {
        info!(
            event = "model_retrained",
            node = %self.node_name,
            old_version = %previous_version,
            new_version = %report.version,
            samples = report.samples,
            mae = report.metrics.mae,
            rmse = report.metrics.rmse,
            persisted = report.persisted,
            "Wait-time model retrained"
        );
    }

    pub fn log_retrain_failed(&self, version: &str, error: &str) {
        warn!(
            event = "model_retrain_failed",
            node = %self.node_name,
            version = %version,
            error = %error,
            "Retraining failed, keeping previous model"
        );
    }

    pub fn log_startup(&self, version: &str, model_version: &str, store_backend: &str) {
        info!(
            event = "service_started",
            node = %self.node_name,
            service_version = %version,
            model_version = %model_version,
            store_backend = %store_backend,
            "Order queue service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            node = %self.node_name,
            reason = %reason,
            "Order queue service shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_metrics_creation() {
        let metrics = QueueMetrics::new();
        let other = metrics.clone();

        metrics.inc_orders_placed();
        metrics.set_active_orders(3);
        metrics.set_training_buffer(7);
        metrics.observe_prediction_latency(0.0002);
        other.observe_retrain(0.01);
        other.inc_notification_failures("sms");
        other.set_model_version("v2", "retrained");
    }

    #[test]
    fn test_encode_text_exposes_queue_metrics() {
        let metrics = QueueMetrics::new();
        metrics.inc_orders_completed();

        let text = String::from_utf8(metrics.encode_text().unwrap()).unwrap();
        assert!(text.contains("# TYPE order_queue_orders_completed_total counter"));
    }

    #[test]
    fn test_event_logger_creation() {
        let logger = EventLogger::new("counter-1");
        assert_eq!(logger.node_name(), "counter-1");
    }
}
