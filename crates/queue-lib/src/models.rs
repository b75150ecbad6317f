//! Core data models for the order queue

use crate::error::{QueueError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Number of catalog items. Item ids run `1..=CATALOG_SIZE`.
pub const CATALOG_SIZE: usize = 10;

/// Maximum number of items in a single order
pub const MAX_ITEMS_PER_ORDER: usize = 10;

/// Globally unique order identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub Uuid);

impl OrderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, used in customer-facing messages
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OrderId {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(OrderId)
            .map_err(|e| QueueError::InvalidOrder(format!("malformed order id {:?}: {}", s, e)))
    }
}

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Complete,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Complete => write!(f, "complete"),
        }
    }
}

/// Notification channel preference as bit flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationPref(u8);

impl NotificationPref {
    pub const NONE: NotificationPref = NotificationPref(0);
    pub const SMS: NotificationPref = NotificationPref(1);
    pub const EMAIL: NotificationPref = NotificationPref(2);
    pub const ALL: NotificationPref = NotificationPref(3);

    /// Parse a preference code, rejecting unknown bits
    pub fn from_code(code: u8) -> Result<Self> {
        if code & !Self::ALL.0 != 0 {
            return Err(QueueError::InvalidOrder(format!(
                "unknown notification preference code {}",
                code
            )));
        }
        Ok(Self(code))
    }

    pub fn code(&self) -> u8 {
        self.0
    }

    pub fn contains(&self, other: NotificationPref) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for NotificationPref {
    type Output = NotificationPref;

    fn bitor(self, rhs: Self) -> Self::Output {
        NotificationPref(self.0 | rhs.0)
    }
}

/// Queue context captured at the instant an order is placed
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementContext {
    pub place_in_queue: u32,
    pub estimated_wait_minutes: f64,
    pub items_ahead: [u32; CATALOG_SIZE],
    pub total_items_ahead: u32,
}

/// A customer order and its queueing history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub item_ids: Vec<u32>,
    pub placed_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: OrderStatus,
    pub place_in_queue: u32,
    pub estimated_wait_minutes: f64,
    pub items_ahead_at_placement: [u32; CATALOG_SIZE],
    pub total_items_ahead_at_placement: u32,
    pub actual_wait_minutes: Option<f64>,
    pub prediction_error_minutes: Option<f64>,
    pub notification_pref: NotificationPref,
    pub phone_number: Option<String>,
    pub email: Option<String>,
}

impl Order {
    /// Build a pending order with an empty placement context.
    ///
    /// The orchestrator applies the real context through
    /// [`Order::apply_placement`] before the order reaches a store.
    pub fn new_pending(id: OrderId, details: OrderDetails, placed_at: DateTime<Utc>) -> Self {
        Self {
            id,
            item_ids: details.item_ids,
            placed_at,
            completed_at: None,
            status: OrderStatus::Pending,
            place_in_queue: 0,
            estimated_wait_minutes: 0.0,
            items_ahead_at_placement: [0; CATALOG_SIZE],
            total_items_ahead_at_placement: 0,
            actual_wait_minutes: None,
            prediction_error_minutes: None,
            notification_pref: details.notification_pref,
            phone_number: details.phone_number,
            email: details.email,
        }
    }

    pub fn apply_placement(&mut self, ctx: PlacementContext) {
        self.place_in_queue = ctx.place_in_queue.max(1);
        self.estimated_wait_minutes = ctx.estimated_wait_minutes;
        self.items_ahead_at_placement = ctx.items_ahead;
        self.total_items_ahead_at_placement = ctx.total_items_ahead;
    }

    pub fn is_active(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    pub fn item_count(&self) -> usize {
        self.item_ids.len()
    }

    /// Transition Pending -> Complete and derive the outcome fields
    pub fn complete(&mut self, completed_at: DateTime<Utc>) -> Result<()> {
        if self.status == OrderStatus::Complete {
            return Err(QueueError::AlreadyCompleted(self.id));
        }
        if completed_at < self.placed_at {
            return Err(QueueError::InvalidOrder(format!(
                "completion time {} precedes placement time {}",
                completed_at, self.placed_at
            )));
        }

        let actual = (completed_at - self.placed_at).num_milliseconds() as f64 / 60_000.0;
        self.completed_at = Some(completed_at);
        self.status = OrderStatus::Complete;
        self.actual_wait_minutes = Some(actual);
        self.prediction_error_minutes = Some((actual - self.estimated_wait_minutes).abs());
        Ok(())
    }
}

/// Validated customer-supplied order details
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDetails {
    pub item_ids: Vec<u32>,
    pub notification_pref: NotificationPref,
    pub phone_number: Option<String>,
    pub email: Option<String>,
}

/// Inbound place-order payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    /// Delimited list of catalog item ids, e.g. `"1,2,3"`
    pub item_ids: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub notification_pref: u8,
}

impl PlaceOrderRequest {
    pub fn validate(&self) -> Result<OrderDetails> {
        Ok(OrderDetails {
            item_ids: parse_item_ids(&self.item_ids)?,
            notification_pref: NotificationPref::from_code(self.notification_pref)?,
            phone_number: non_blank(self.phone_number.as_deref()),
            email: non_blank(self.email.as_deref()),
        })
    }
}

/// Inbound complete-order payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompleteOrderRequest {
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Parse a delimited list of catalog item ids.
///
/// Accepts commas, semicolons and whitespace as separators.
pub fn parse_item_ids(raw: &str) -> Result<Vec<u32>> {
    let ids = raw
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>()
                .map_err(|_| QueueError::InvalidOrder(format!("item id {:?} is not an integer", s)))
        })
        .collect::<Result<Vec<u32>>>()?;

    if ids.is_empty() {
        return Err(QueueError::InvalidOrder("order has no items".to_string()));
    }
    if ids.len() > MAX_ITEMS_PER_ORDER {
        return Err(QueueError::InvalidOrder(format!(
            "order has {} items, maximum is {}",
            ids.len(),
            MAX_ITEMS_PER_ORDER
        )));
    }
    if let Some(bad) = ids.iter().find(|&&id| id == 0 || id as usize > CATALOG_SIZE) {
        return Err(QueueError::InvalidOrder(format!(
            "item id {} outside catalog range 1..={}",
            bad, CATALOG_SIZE
        )));
    }
    Ok(ids)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
