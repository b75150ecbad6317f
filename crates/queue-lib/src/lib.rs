//! Order queue library
//!
//! This crate provides the core functionality for:
//! - Tracking active orders and their queue positions
//! - Extracting queue-pressure features and estimating wait times
//! - Retraining the wait-time model from completed orders
//! - Placement and completion notifications
//! - Health checks and observability

pub mod error;
pub mod health;
pub mod models;
pub mod notify;
pub mod observability;
pub mod orchestrator;
pub mod predictor;
pub mod store;

pub use error::{QueueError, Result};
pub use health::{
    Component, ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{EventLogger, QueueMetrics};
pub use orchestrator::{
    ActiveOrderView, CompletionReceipt, DebugDump, PendingTrainingView, PlacementReceipt,
    QueueService, StartupSummary,
};
