//! HTTP delivery to a notification provider gateway

use super::{render_message, NotificationEvent, SendOutcome};
use crate::error::{QueueError, Result};
use crate::models::{Order, OrderId};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const GATEWAY_TIMEOUT: Duration = Duration::from_secs(5);

/// JSON body posted to a provider gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub channel: String,
    pub recipient: String,
    pub order_id: OrderId,
    pub event: NotificationEvent,
    pub message: String,
    pub sent_at: DateTime<Utc>,
}

/// Posts payloads to a gateway, or logs them when none is configured
#[derive(Debug, Clone)]
pub(crate) struct GatewayClient {
    channel: &'static str,
    target: Option<(Client, Url)>,
}

impl GatewayClient {
    pub fn new(channel: &'static str, endpoint: Option<Url>) -> Result<Self> {
        let target = match endpoint {
            Some(url) => {
                let client = Client::builder()
                    .timeout(GATEWAY_TIMEOUT)
                    .build()
                    .map_err(|e| QueueError::NotificationFailed {
                        channel: channel.to_string(),
                        reason: format!("failed to build HTTP client: {}", e),
                    })?;
                Some((client, url))
            }
            None => None,
        };
        Ok(Self { channel, target })
    }

    pub fn log_only(channel: &'static str) -> Self {
        Self {
            channel,
            target: None,
        }
    }

    pub fn endpoint(&self) -> Option<&Url> {
        self.target.as_ref().map(|(_, url)| url)
    }

    pub async fn deliver(
        &self,
        order: &Order,
        event: NotificationEvent,
        recipient: &str,
    ) -> Result<SendOutcome> {
        let payload = NotificationPayload {
            channel: self.channel.to_string(),
            recipient: recipient.to_string(),
            order_id: order.id,
            event,
            message: render_message(order, event),
            sent_at: Utc::now(),
        };

        let Some((client, url)) = &self.target else {
            info!(
                channel = self.channel,
                order_id = %order.id,
                event = %event,
                recipient = %recipient,
                message = %payload.message,
                "Notification (log-only)"
            );
            return Ok(SendOutcome::Sent);
        };

        let response = client
            .post(url.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.failure(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(self.failure(format!("gateway returned {}: {}", status, body)));
        }

        debug!(channel = self.channel, order_id = %order.id, event = %event, "Notification delivered");
        Ok(SendOutcome::Sent)
    }

    fn failure(&self, reason: String) -> QueueError {
        QueueError::NotificationFailed {
            channel: self.channel.to_string(),
            reason,
        }
    }
}
