//! Customer notifications
//!
//! This module provides:
//! - The `NotificationSender` capability implemented by every channel
//! - SMS and email senders gated on preference flags and contact fields
//! - A dispatcher that fans one event out to all channels, isolating failures

mod dispatcher;
mod email;
mod gateway;
mod sms;

pub use dispatcher::{ChannelFailure, DispatchReport, NotificationDispatcher};
pub use email::EmailSender;
pub use gateway::NotificationPayload;
pub use sms::SmsSender;

use crate::error::Result;
use crate::models::Order;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use async_trait::async_trait;

/// Which lifecycle transition a notification announces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationEvent {
    Placement,
    Completion,
}

impl fmt::Display for NotificationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationEvent::Placement => write!(f, "placement"),
            NotificationEvent::Completion => write!(f, "completion"),
        }
    }
}

/// Result of a single channel send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendOutcome {
    Sent,
    /// The order did not opt in or lacks the contact field
    Skipped,
}

/// A notification channel
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Stable channel name used in logs, metrics and reports
    fn channel(&self) -> &'static str;

    /// Deliver `event` for `order`. Returns `Skipped` when this channel has
    /// nothing to do for the order.
    async fn send(&self, order: &Order, event: NotificationEvent) -> Result<SendOutcome>;
}

/// Customer-facing message text for an event
pub fn render_message(order: &Order, event: NotificationEvent) -> String {
    match event {
        NotificationEvent::Placement => format!(
            "Order {} received. You are number {} in the queue, estimated wait {:.0} minutes.",
            order.id.short(),
            order.place_in_queue,
            order.estimated_wait_minutes
        ),
        NotificationEvent::Completion => {
            format!("Order {} is ready for pickup.", order.id.short())
        }
    }
}
