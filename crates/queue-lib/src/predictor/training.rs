//! Training samples and the buffer that accumulates them between retrains

use super::features::FeatureVector;
use crate::error::{QueueError, Result};
use crate::models::{Order, OrderId};
use serde::{Deserialize, Serialize};

/// Default number of buffered samples that triggers a retrain
pub const DEFAULT_RETRAIN_THRESHOLD: usize = 100;

/// A completed order's placement features paired with its real wait
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSample {
    pub order_id: OrderId,
    pub features: FeatureVector,
    pub actual_wait_minutes: f64,
}

impl TrainingSample {
    /// Derive a sample from a completed order.
    ///
    /// Orders without a completion time or derived actual wait carry no
    /// signal and yield `IncompleteTrainingSample`.
    pub fn from_order(order: &Order, features: FeatureVector) -> Result<Self> {
        match (order.completed_at, order.actual_wait_minutes) {
            (Some(_), Some(actual)) if actual.is_finite() && actual >= 0.0 => Ok(Self {
                order_id: order.id,
                features,
                actual_wait_minutes: actual,
            }),
            _ => Err(QueueError::IncompleteTrainingSample(order.id)),
        }
    }
}

/// Samples awaiting the next retraining cycle
#[derive(Debug, Default)]
pub struct TrainingBuffer {
    samples: Vec<TrainingSample>,
}

impl TrainingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample. Returns false if this order is already buffered.
    pub fn push(&mut self, sample: TrainingSample) -> bool {
        if self.samples.iter().any(|s| s.order_id == sample.order_id) {
            return false;
        }
        self.samples.push(sample);
        true
    }

    pub fn samples(&self) -> &[TrainingSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_ready(&self, threshold: usize) -> bool {
        !self.samples.is_empty() && self.samples.len() >= threshold
    }

    /// Remove every sample, returning their order ids
    pub fn clear(&mut self) -> Vec<OrderId> {
        self.samples.drain(..).map(|s| s.order_id).collect()
    }
}
