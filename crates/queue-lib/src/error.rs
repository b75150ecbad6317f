//! Error types for the order queue.

use crate::models::OrderId;
use thiserror::Error;

/// Result type alias for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;

/// Errors raised by the order store, predictor and orchestrator.
///
/// Only `NotFound`, `DuplicateOrder`, `AlreadyCompleted` and `InvalidOrder`
/// reject a customer request. The rest are logged and degraded around.
#[derive(Error, Debug)]
pub enum QueueError {
    /// No order with this id exists (or it is no longer active)
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// An order with this id was already added
    #[error("Duplicate order: {0}")]
    DuplicateOrder(OrderId),

    /// The order already transitioned to Complete
    #[error("Order already completed: {0}")]
    AlreadyCompleted(OrderId),

    /// Malformed placement or completion request
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    /// The order lacks the fields needed to derive a training sample
    #[error("Incomplete training sample for order {0}")]
    IncompleteTrainingSample(OrderId),

    /// A single notification channel failed
    #[error("Notification via {channel} failed: {reason}")]
    NotificationFailed { channel: String, reason: String },

    /// No regression model is loaded
    #[error("Wait-time model unavailable")]
    ModelUnavailable,

    /// Model fitting, validation or (de)serialization failed
    #[error("Model error: {0}")]
    Model(String),

    /// Durable storage failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl QueueError {
    /// True for errors that reject the caller's request rather than
    /// signalling an internal fault.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            QueueError::NotFound(_)
                | QueueError::DuplicateOrder(_)
                | QueueError::AlreadyCompleted(_)
                | QueueError::InvalidOrder(_)
        )
    }
}

impl From<std::io::Error> for QueueError {
    fn from(err: std::io::Error) -> Self {
        QueueError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        QueueError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_classification() {
        let id = OrderId::new();
        assert!(QueueError::NotFound(id).is_rejection());
        assert!(QueueError::DuplicateOrder(id).is_rejection());
        assert!(QueueError::InvalidOrder("empty".to_string()).is_rejection());
        assert!(!QueueError::ModelUnavailable.is_rejection());
        assert!(!QueueError::Storage("disk full".to_string()).is_rejection());
    }

    #[test]
    fn test_io_error_maps_to_storage() {
        let err: QueueError = std::io::Error::new(std::io::ErrorKind::Other, "boom").into();
        assert!(matches!(err, QueueError::Storage(msg) if msg.contains("boom")));
    }
}
