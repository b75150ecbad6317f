//! Email channel

use super::gateway::GatewayClient;
use super::{async_trait, NotificationEvent, NotificationSender, SendOutcome};
use crate::error::Result;
use crate::models::{NotificationPref, Order};
use url::Url;

pub struct EmailSender {
    gateway: GatewayClient,
}

impl EmailSender {
    pub const CHANNEL: &'static str = "email";

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
impl NotificationSender for EmailSender {
    fn channel(&self) -> &'static str {
        Self::CHANNEL
    }

    async fn send(&self, order: &Order, event: NotificationEvent) -> Result<SendOutcome> {
        if !order.notification_pref.contains(NotificationPref::EMAIL) {
            return Ok(SendOutcome::Skipped);
        }
        let Some(address) = order.email.as_deref() else {
            return Ok(SendOutcome::Skipped);
        };
        self.gateway.deliver(order, event, address).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::pending_order;
    use chrono::Utc;

    #[tokio::test]
    async fn test_email_channel_gating() {
        let sender = EmailSender::log_only();
        let mut order = pending_order(&[2, 3], Utc::now());

        order.notification_pref = NotificationPref::EMAIL;
        assert_eq!(
            sender.send(&order, NotificationEvent::Placement).await.unwrap(),
            SendOutcome::Skipped
        );

        order.email = Some("diner@example.com".to_string());
        assert_eq!(
            sender.send(&order, NotificationEvent::Placement).await.unwrap(),
            SendOutcome::Sent
        );

        order.notification_pref = NotificationPref::NONE;
        assert_eq!(
            sender.send(&order, NotificationEvent::Completion).await.unwrap(),
            SendOutcome::Skipped
        );
    }

    #[test]
    fn test_configured_gateway() {
        let url = Url::parse("https://mail.example.com/send").unwrap();
        let sender = EmailSender::new(Some(url.clone())).unwrap();
        assert_eq!(sender.gateway(), Some(&url));
        assert!(EmailSender::log_only().gateway().is_none());
    }
}
