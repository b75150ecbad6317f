//! Wait-time predictor
//!
//! Wraps the active regression model, answers point estimates, buffers
//! completed-order outcomes and retrains once enough have accumulated.
//! The active model is swapped by `Arc` replacement so concurrent
//! predictions always see one complete model.

use super::bootstrap::{synthetic_samples, BOOTSTRAP_SAMPLES, DEFAULT_BOOTSTRAP_SEED};
use super::features::FeatureVector;
use super::output::{OutputConfig, OutputFormatter, WaitEstimate};
use super::persistence::{ModelMetadata, ModelSource, ModelStore};
use super::regression::{FitMetrics, LinearWaitModel};
use super::training::{TrainingBuffer, TrainingSample, DEFAULT_RETRAIN_THRESHOLD};
use crate::error::{QueueError, Result};
use crate::models::{Order, OrderId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Version label of the synthetic startup model
pub const BOOTSTRAP_VERSION: &str = "bootstrap";

/// Configuration for the wait-time predictor
#[derive(Debug, Clone)]
pub struct PredictorConfig {
    /// Buffered samples required before `maybe_retrain` fits a new model
    pub retrain_threshold: usize,
    /// Model artifact location. `None` keeps models in memory only.
    pub model_path: Option<PathBuf>,
    pub bootstrap_samples: usize,
    pub bootstrap_seed: u64,
    /// L2 penalty on standardized weights
    pub ridge: f64,
    pub output: OutputConfig,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            retrain_threshold: DEFAULT_RETRAIN_THRESHOLD,
            model_path: None,
            bootstrap_samples: BOOTSTRAP_SAMPLES,
            bootstrap_seed: DEFAULT_BOOTSTRAP_SEED,
            ridge: 1.0,
            output: OutputConfig::default(),
        }
    }
}

/// Predictor lifecycle. Never returns to `Uninitialized` once `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictorState {
    Uninitialized,
    Ready,
}

/// Outcome of one retraining cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrainReport {
    pub version: String,
    pub samples: usize,
    pub metrics: FitMetrics,
    pub persisted: bool,
    pub trained_order_ids: Vec<OrderId>,
}

/// Predictor statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictorStats {
    pub state: PredictorState,
    pub model: Option<ModelMetadata>,
    pub buffered_samples: usize,
    pub retrain_threshold: usize,
    pub total_predictions: u64,
    pub fallback_predictions: u64,
    pub retrain_count: u64,
}

#[derive(Debug)]
struct ActiveModel {
    model: LinearWaitModel,
    metadata: ModelMetadata,
}

/// Regression-backed wait-time predictor
pub struct WaitTimePredictor {
    config: PredictorConfig,
    model: RwLock<Option<Arc<ActiveModel>>>,
    buffer: Mutex<TrainingBuffer>,
    store: Option<ModelStore>,
    formatter: OutputFormatter,
    generation: AtomicU64,
    prediction_count: AtomicU64,
    fallback_count: AtomicU64,
    retrain_count: AtomicU64,
}

impl WaitTimePredictor {
    /// Create a predictor without a model (estimates use the fallback)
    pub fn new(config: PredictorConfig) -> Self {
        let store = config.model_path.clone().map(ModelStore::new);
        let formatter = OutputFormatter::with_config(config.output.clone());
        Self {
            config,
            model: RwLock::new(None),
            buffer: Mutex::new(TrainingBuffer::new()),
            store,
            formatter,
            generation: AtomicU64::new(0),
            prediction_count: AtomicU64::new(0),
            fallback_count: AtomicU64::new(0),
            retrain_count: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    pub fn state(&self) -> PredictorState {
        if self.active().is_some() {
            PredictorState::Ready
        } else {
            PredictorState::Uninitialized
        }
    }

    /// Load the persisted model, or fit a bootstrap model if none loads
    pub fn load_or_bootstrap(&self) -> Result<ModelSource> {
        if let Some(store) = &self.store {
            match store.load() {
                Ok(Some((model, metadata))) => {
                    info!(
                        version = %metadata.version,
                        samples = metadata.samples,
                        path = %store.path().display(),
                        "Loaded persisted model"
                    );
                    self.generation
                        .store(parse_generation(&metadata.version), Ordering::SeqCst);
                    let source = metadata.source;
                    self.install(model, metadata);
                    return Ok(source);
                }
                Ok(None) => info!(path = %store.path().display(), "No persisted model, bootstrapping"),
                Err(e) => warn!(error = %e, "Failed to load persisted model, bootstrapping"),
            }
        }

        self.bootstrap()?;
        Ok(ModelSource::Bootstrap)
    }

    fn bootstrap(&self) -> Result<()> {
        let samples = synthetic_samples(self.config.bootstrap_samples, self.config.bootstrap_seed);
        let model = LinearWaitModel::fit(&samples, self.config.ridge)?;
        let metadata = ModelMetadata {
            version: BOOTSTRAP_VERSION.to_string(),
            source: ModelSource::Bootstrap,
            trained_at: chrono::Utc::now().timestamp(),
            samples: samples.len(),
            metrics: model.evaluate(&samples),
        };

        info!(
            samples = metadata.samples,
            seed = self.config.bootstrap_seed,
            mae = metadata.metrics.mae,
            "Bootstrap model fitted"
        );
        self.persist(&model, &metadata);
        self.install(model, metadata);
        Ok(())
    }

    /// Point estimate for `features`. Never fails and never blocks on training.
    pub fn predict(&self, features: &FeatureVector) -> WaitEstimate {
        let start = Instant::now();
        self.prediction_count.fetch_add(1, Ordering::Relaxed);

        let estimate = match self.active_model() {
            Ok(active) => self.formatter.format(
                active.model.predict_raw(&features.to_array()),
                &active.metadata.version,
            ),
            Err(e) => {
                debug!(error = %e, "Using fallback estimate");
                self.formatter.fallback()
            }
        };

        if estimate.is_fallback() {
            self.fallback_count.fetch_add(1, Ordering::Relaxed);
        }
        debug!(
            elapsed_us = start.elapsed().as_micros() as u64,
            minutes = estimate.minutes,
            "Wait estimate computed"
        );
        estimate
    }

    /// Buffer a completed order's outcome. Returns whether a sample was added.
    pub async fn record_outcome(&self, order: &Order, features: &FeatureVector) -> bool {
        let sample = match TrainingSample::from_order(order, features.clone()) {
            Ok(sample) => sample,
            Err(e) => {
                warn!(order_id = %order.id, error = %e, "Skipping training sample");
                return false;
            }
        };

        let mut buffer = self.buffer.lock().await;
        let added = buffer.push(sample);
        if !added {
            warn!(order_id = %order.id, "Order already buffered for training");
        }
        added
    }

    /// Retrain if the buffer has reached the threshold
    pub async fn maybe_retrain(&self) -> Result<Option<RetrainReport>> {
        let mut buffer = self.buffer.lock().await;
        if !buffer.is_ready(self.config.retrain_threshold) {
            return Ok(None);
        }
        self.retrain_locked(&mut buffer).map(Some)
    }

    /// Retrain on whatever is buffered, ignoring the threshold
    pub async fn force_retrain(&self) -> Result<Option<RetrainReport>> {
        let mut buffer = self.buffer.lock().await;
        if buffer.is_empty() {
            debug!("Forced retrain requested with an empty buffer");
            return Ok(None);
        }
        self.retrain_locked(&mut buffer).map(Some)
    }

    fn retrain_locked(&self, buffer: &mut TrainingBuffer) -> Result<RetrainReport> {
        let start = Instant::now();
        let samples = buffer.samples();
        let model = LinearWaitModel::fit(samples, self.config.ridge)?;
        let metrics = model.evaluate(samples);

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let metadata = ModelMetadata {
            version: format!("v{}", generation),
            source: ModelSource::Retrained,
            trained_at: chrono::Utc::now().timestamp(),
            samples: samples.len(),
            metrics,
        };

        let persisted = self.persist(&model, &metadata);
        self.install(model, metadata.clone());
        let trained_order_ids = buffer.clear();
        self.retrain_count.fetch_add(1, Ordering::Relaxed);

        info!(
            version = %metadata.version,
            samples = metadata.samples,
            mae = metrics.mae,
            rmse = metrics.rmse,
            persisted,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Model retrained"
        );

        Ok(RetrainReport {
            version: metadata.version,
            samples: metadata.samples,
            metrics,
            persisted,
            trained_order_ids,
        })
    }

    fn persist(&self, model: &LinearWaitModel, metadata: &ModelMetadata) -> bool {
        let Some(store) = &self.store else {
            return false;
        };
        match store.save(model, metadata) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, version = %metadata.version, "Failed to persist model");
                false
            }
        }
    }

    fn install(&self, model: LinearWaitModel, metadata: ModelMetadata) {
        let next = Arc::new(ActiveModel { model, metadata });
        let mut slot = self.model.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(next);
    }

    fn active_model(&self) -> Result<Arc<ActiveModel>> {
        self.active().ok_or(QueueError::ModelUnavailable)
    }

    fn active(&self) -> Option<Arc<ActiveModel>> {
        self.model
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Version label of the active model, or the fallback label
    pub fn model_version(&self) -> String {
        self.active()
            .map(|a| a.metadata.version.clone())
            .unwrap_or_else(|| super::output::FALLBACK_VERSION.to_string())
    }

    pub async fn buffered_samples(&self) -> usize {
        self.buffer.lock().await.len()
    }

    pub async fn stats(&self) -> PredictorStats {
        PredictorStats {
            state: self.state(),
            model: self.active().map(|a| a.metadata.clone()),
            buffered_samples: self.buffered_samples().await,
            retrain_threshold: self.config.retrain_threshold,
            total_predictions: self.prediction_count.load(Ordering::Relaxed),
            fallback_predictions: self.fallback_count.load(Ordering::Relaxed),
            retrain_count: self.retrain_count.load(Ordering::Relaxed),
        }
    }
}

/// `"v7"` -> 7, anything else -> 0
fn parse_generation(version: &str) -> u64 {
    version
        .strip_prefix('v')
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}
