//! Fan-out of one notification event to every registered channel

use super::{EmailSender, NotificationEvent, NotificationSender, SendOutcome, SmsSender};
use crate::error::Result;
use crate::models::Order;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// A channel that failed during one dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelFailure {
    pub channel: String,
    pub reason: String,
}

/// Per-channel results of one dispatch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub sent: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<ChannelFailure>,
}

impl DispatchReport {
    /// No channel failed
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Invokes every sender for an event. Never fails.
#[derive(Clone, Default)]
pub struct NotificationDispatcher {
    senders: Vec<Arc<dyn NotificationSender>>,
}

impl NotificationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// SMS and email channels, each posting to its gateway or logging only
    pub fn with_gateways(sms: Option<Url>, email: Option<Url>) -> Result<Self> {
        Ok(Self::new()
            .with_sender(Arc::new(SmsSender::new(sms)?))
            .with_sender(Arc::new(EmailSender::new(email)?)))
    }

    pub fn with_sender(mut self, sender: Arc<dyn NotificationSender>) -> Self {
        self.senders.push(sender);
        self
    }

    pub fn channels(&self) -> Vec<&'static str> {
        self.senders.iter().map(|s| s.channel()).collect()
    }

    pub async fn send(&self, order: &Order, event: NotificationEvent) -> DispatchReport {
        let mut report = DispatchReport::default();

        for sender in &self.senders {
            let channel = sender.channel();
            match sender.send(order, event).await {
                Ok(SendOutcome::Sent) => report.sent.push(channel.to_string()),
                Ok(SendOutcome::Skipped) => {
                    debug!(channel, order_id = %order.id, event = %event, "Channel skipped");
                    report.skipped.push(channel.to_string());
                }
                Err(e) => {
                    warn!(
                        channel,
                        order_id = %order.id,
                        event = %event,
                        error = %e,
                        "Notification channel failed"
                    );
                    report.failed.push(ChannelFailure {
                        channel: channel.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        report
    }
}
