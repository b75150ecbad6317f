//! Server configuration

use anyhow::{Context, Result};
use queue_lib::predictor::{PredictorConfig, BOOTSTRAP_SAMPLES, DEFAULT_BOOTSTRAP_SEED};
use queue_lib::store::StoreBackend;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

/// Optional config file, looked up relative to the working directory
const CONFIG_FILE: &str = "queue-server";

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Instance name attached to every event log record
    #[serde(default = "default_node_name")]
    pub node_name: String,

    /// HTTP port for the order API, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    #[serde(default)]
    pub store_backend: StoreBackend,

    /// Order state file, used by the `file` backend
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Model artifact location
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Keep models in memory only when false
    #[serde(default = "default_persist_model")]
    pub persist_model: bool,

    #[serde(default = "default_retrain_threshold")]
    pub retrain_threshold: usize,

    #[serde(default = "default_bootstrap_seed")]
    pub bootstrap_seed: u64,

    #[serde(default = "default_bootstrap_samples")]
    pub bootstrap_samples: usize,

    /// SMS provider endpoint. Unset means log-only.
    #[serde(default)]
    pub sms_gateway_url: Option<String>,

    /// Email provider endpoint. Unset means log-only.
    #[serde(default)]
    pub email_gateway_url: Option<String>,
}

fn default_node_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data/orders.json")
}

fn default_model_path() -> PathBuf {
    PathBuf::from("data/wait_model.json")
}

fn default_persist_model() -> bool {
    true
}

fn default_retrain_threshold() -> usize {
    queue_lib::predictor::DEFAULT_RETRAIN_THRESHOLD
}

fn default_bootstrap_seed() -> u64 {
    DEFAULT_BOOTSTRAP_SEED
}

fn default_bootstrap_samples() -> usize {
    BOOTSTRAP_SAMPLES
}

impl ServerConfig {
    /// Load configuration from `queue-server.toml` (optional) and `QUEUE_*`
    /// environment variables, the latter taking precedence
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    pub fn load_from(file: Option<&Path>) -> Result<Self> {
        let file_source = match file {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(CONFIG_FILE).required(false),
        };

        let config = config::Config::builder()
            .add_source(file_source)
            .add_source(config::Environment::with_prefix("QUEUE").try_parsing(true))
            .build()
            .context("Failed to read configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.retrain_threshold == 0 {
            anyhow::bail!("retrain_threshold must be at least 1");
        }
        if self.bootstrap_samples == 0 {
            anyhow::bail!("bootstrap_samples must be at least 1");
        }
        self.sms_gateway()?;
        self.email_gateway()?;
        Ok(())
    }

    pub fn predictor_config(&self) -> PredictorConfig {
        PredictorConfig {
            retrain_threshold: self.retrain_threshold,
            model_path: self.persist_model.then(|| self.model_path.clone()),
            bootstrap_samples: self.bootstrap_samples,
            bootstrap_seed: self.bootstrap_seed,
            ..Default::default()
        }
    }

    pub fn sms_gateway(&self) -> Result<Option<Url>> {
        parse_gateway("sms_gateway_url", self.sms_gateway_url.as_deref())
    }

    pub fn email_gateway(&self) -> Result<Option<Url>> {
        parse_gateway("email_gateway_url", self.email_gateway_url.as_deref())
    }
}

fn parse_gateway(field: &str, raw: Option<&str>) -> Result<Option<Url>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Url::parse(raw)
            .map(Some)
            .with_context(|| format!("Invalid {}: {}", field, raw)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(contents: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queue-server.toml");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_defaults_from_empty_file() {
        let (_dir, path) = write_config("");
        let config = ServerConfig::load_from(Some(&path)).unwrap();

        assert_eq!(config.api_port, 8080);
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.retrain_threshold, 100);
        assert_eq!(config.bootstrap_seed, 42);
        assert!(config.sms_gateway().unwrap().is_none());

        let predictor = config.predictor_config();
        assert_eq!(predictor.model_path, Some(PathBuf::from("data/wait_model.json")));
    }

    #[test]
    fn test_file_values() {
        let (_dir, path) = write_config(
            r#"
            api_port = 9000
            store_backend = "file"
            store_path = "/var/lib/queue/orders.json"
            persist_model = false
            retrain_threshold = 25
            email_gateway_url = "https://mail.example.com/send"
            "#,
        );
        let config = ServerConfig::load_from(Some(&path)).unwrap();

        assert_eq!(config.api_port, 9000);
        assert_eq!(config.store_backend, StoreBackend::File);
        assert_eq!(config.store_path, PathBuf::from("/var/lib/queue/orders.json"));
        assert_eq!(config.predictor_config().model_path, None);
        assert_eq!(config.predictor_config().retrain_threshold, 25);
        assert_eq!(
            config.email_gateway().unwrap().unwrap().as_str(),
            "https://mail.example.com/send"
        );
    }

    #[test]
    fn test_invalid_gateway_rejected() {
        let (_dir, path) = write_config(r#"sms_gateway_url = "not a url""#);
        assert!(ServerConfig::load_from(Some(&path)).is_err());
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let (_dir, path) = write_config("retrain_threshold = 0");
        assert!(ServerConfig::load_from(Some(&path)).is_err());
    }
}
