//! SMS channel

use super::gateway::GatewayClient;
use super::{async_trait, NotificationEvent, NotificationSender, SendOutcome};
use crate::error::Result;
use crate::models::{NotificationPref, Order};
use url::Url;

pub struct SmsSender {
    gateway: GatewayClient,
}

impl SmsSender {
    pub const CHANNEL: &'static str = "sms";

    /// Sender posting to `gateway`, or logging only when `None`
    pub fn new(gateway: Option<Url>) -> Result<Self> {
        Ok(Self {
            gateway: GatewayClient::new(Self::CHANNEL, gateway)?,
        })
    }

    pub fn log_only() -> Self {
        Self {
            gateway: GatewayClient::log_only(Self::CHANNEL),
        }
    }

    pub fn gateway(&self) -> Option<&Url> {
        self.gateway.endpoint()
    }
}

#[async_trait]
impl NotificationSender for SmsSender {
    fn channel(&self) -> &'static str {
        Self::CHANNEL
    }

    async fn send(&self, order: &Order, event: NotificationEvent) -> Result<SendOutcome> {
        if !order.notification_pref.contains(NotificationPref::SMS) {
            return Ok(SendOutcome::Skipped);
        }
        match order.phone_number.as_deref() {
            Some(phone) => self.gateway.deliver(order, event, phone).await,
            None => Ok(SendOutcome::Skipped),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueueError;
    use crate::store::test_support::pending_order;
    use chrono::Utc;

    fn order_with(pref: NotificationPref, phone: Option<&str>) -> Order {
        let mut order = pending_order(&[1], Utc::now());
        order.notification_pref = pref;
        order.phone_number = phone.map(str::to_string);
        order
    }

    #[tokio::test]
    async fn test_sends_when_opted_in() {
        let sender = SmsSender::log_only();
        let order = order_with(NotificationPref::SMS, Some("+15550100"));
        let outcome = sender.send(&order, NotificationEvent::Placement).await.unwrap();
        assert_eq!(outcome, SendOutcome::Sent);
    }

    #[tokio::test]
    async fn test_missing_phone_is_noop() {
        let sender = SmsSender::log_only();
        let order = order_with(NotificationPref::ALL, None);
        let outcome = sender.send(&order, NotificationEvent::Completion).await.unwrap();
        assert_eq!(outcome, SendOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_not_opted_in_is_noop() {
        let sender = SmsSender::log_only();
        let order = order_with(NotificationPref::EMAIL, Some("+15550100"));
        let outcome = sender.send(&order, NotificationEvent::Placement).await.unwrap();
        assert_eq!(outcome, SendOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_unreachable_gateway_fails() {
        let sender = SmsSender::new(Some(Url::parse("http://127.0.0.1:9/sms").unwrap())).unwrap();
        let order = order_with(NotificationPref::SMS, Some("+15550100"));
        let err = sender
            .send(&order, NotificationEvent::Placement)
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::NotificationFailed { ref channel, .. } if channel == "sms"));
    }
}
