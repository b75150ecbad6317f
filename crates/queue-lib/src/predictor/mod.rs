//! Wait-time prediction engine

mod bootstrap;
mod features;
mod inference;
mod output;
mod persistence;
mod regression;
mod training;

pub use bootstrap::{synthetic_samples, BOOTSTRAP_SAMPLES, DEFAULT_BOOTSTRAP_SEED};
pub use features::{FeatureExtractor, FeatureVector, NUM_FEATURES};
pub use inference::{
    PredictorConfig, PredictorState, PredictorStats, RetrainReport, WaitTimePredictor,
    BOOTSTRAP_VERSION,
};
pub use output::{
    EstimateSource, OutputConfig, OutputFormatter, WaitEstimate, FALLBACK_VERSION,
    FALLBACK_WAIT_MINUTES, MAX_WAIT_MINUTES, MIN_WAIT_MINUTES,
};
pub use persistence::{ModelMetadata, ModelSource, ModelStore};
pub use regression::{FitMetrics, LinearWaitModel};
pub use training::{TrainingBuffer, TrainingSample, DEFAULT_RETRAIN_THRESHOLD};
