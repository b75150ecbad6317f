//! API client for the order queue service

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the order queue service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).context("Invalid path")
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(self.endpoint(path)?)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let response = self
            .client
            .post(self.endpoint(path)?)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }
}

// API request and response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    pub item_ids: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub notification_pref: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelFailure {
    pub channel: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchReport {
    #[serde(default)]
    pub sent: Vec<String>,
    #[serde(default)]
    pub skipped: Vec<String>,
    #[serde(default)]
    pub failed: Vec<ChannelFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementReceipt {
    pub order_id: String,
    pub place_in_queue: u32,
    pub estimated_wait_minutes: f64,
    pub placed_at: String,
    #[serde(default)]
    pub model_version: String,
    #[serde(default)]
    pub notifications: DispatchReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteOrderRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionReceipt {
    pub order_id: String,
    pub placed_at: String,
    pub completed_at: String,
    pub estimated_wait_minutes: f64,
    pub actual_wait_minutes: f64,
    pub prediction_error_minutes: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrained_version: Option<String>,
    #[serde(default)]
    pub notifications: DispatchReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub item_ids: Vec<u32>,
    pub placed_at: String,
    pub completed_at: Option<String>,
    pub status: String,
    pub place_in_queue: u32,
    pub estimated_wait_minutes: f64,
    #[serde(default)]
    pub total_items_ahead_at_placement: u32,
    pub actual_wait_minutes: Option<f64>,
    pub prediction_error_minutes: Option<f64>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveOrder {
    pub order_id: String,
    pub position: u32,
    pub place_in_queue: u32,
    pub item_ids: Vec<u32>,
    pub placed_at: String,
    pub estimated_wait_minutes: f64,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingOrder {
    pub order_id: String,
    pub item_ids: Vec<u32>,
    pub placed_at: String,
    pub completed_at: Option<String>,
    pub estimated_wait_minutes: f64,
    pub actual_wait_minutes: Option<f64>,
    pub prediction_error_minutes: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedList {
    pub order_ids: Vec<String>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitMetrics {
    pub mae: f64,
    pub rmse: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrainReport {
    pub version: String,
    pub samples: usize,
    pub metrics: FitMetrics,
    pub persisted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrainResponse {
    pub retrained: bool,
    pub report: Option<RetrainReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub version: String,
    pub source: String,
    pub trained_at: i64,
    pub samples: usize,
    pub metrics: FitMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictorStats {
    pub state: String,
    pub model: Option<ModelInfo>,
    pub buffered_samples: usize,
    pub retrain_threshold: usize,
    pub total_predictions: u64,
    pub fallback_predictions: u64,
    pub retrain_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub active: Vec<Order>,
    pub pending_training: Vec<Order>,
    pub trained: Vec<Order>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugDump {
    pub generated_at: String,
    pub store: StoreSnapshot,
    pub predictor: PredictorStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::new("not a url").is_err());
    }

    #[test]
    fn test_endpoint_join() {
        let client = ApiClient::new("http://localhost:8080/").unwrap();
        assert_eq!(
            client.endpoint("api/v1/debug/queue").unwrap().as_str(),
            "http://localhost:8080/api/v1/debug/queue"
        );
    }

    #[test]
    fn test_placement_receipt_tolerates_missing_extras() {
        let receipt: PlacementReceipt = serde_json::from_str(
            r#"{"order_id":"a","place_in_queue":2,"estimated_wait_minutes":7.5,"placed_at":"2024-05-01T12:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(receipt.place_in_queue, 2);
        assert!(receipt.notifications.sent.is_empty());
    }
}
