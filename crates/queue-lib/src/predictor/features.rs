//! Feature extraction for wait-time prediction
//!
//! Characterizes the queue pressure an order faces at placement: how many
//! orders and items sit ahead of it, broken down per catalog item, plus its
//! own size and temporal context.

use crate::models::{Order, CATALOG_SIZE};
use chrono::{Datelike, Timelike};
use serde::{Deserialize, Serialize};

/// Number of scalar features ahead of the per-item counts
const NUM_SCALAR_FEATURES: usize = 5;

/// Width of the model input
pub const NUM_FEATURES: usize = NUM_SCALAR_FEATURES + CATALOG_SIZE;

/// Queueing context of a single order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub item_count: u32,
    /// Orders ahead plus the order itself
    pub queue_length: u32,
    pub hour_of_day: u32,
    /// 0 = Monday
    pub day_of_week: u32,
    pub total_items_ahead: u32,
    /// Units of catalog item `k + 1` across the orders ahead
    pub items_ahead: [u32; CATALOG_SIZE],
}

impl FeatureVector {
    /// Rebuild the placement-time features from the fields stored on an order.
    ///
    /// Produces the same vector [`FeatureExtractor::extract`] returned when the
    /// order was placed, so training samples line up with live estimates.
    pub fn from_placed_order(order: &Order) -> Self {
        Self {
            item_count: order.item_count() as u32,
            queue_length: order.place_in_queue.max(1),
            hour_of_day: order.placed_at.hour(),
            day_of_week: order.placed_at.weekday().num_days_from_monday(),
            total_items_ahead: order.total_items_ahead_at_placement,
            items_ahead: order.items_ahead_at_placement,
        }
    }

    /// Model input with fixed width and ordering
    pub fn to_array(&self) -> [f64; NUM_FEATURES] {
        let mut out = [0.0; NUM_FEATURES];
        out[0] = self.item_count as f64;
        out[1] = self.queue_length as f64;
        out[2] = self.hour_of_day as f64;
        out[3] = self.day_of_week as f64;
        out[4] = self.total_items_ahead as f64;
        for (slot, count) in out[NUM_SCALAR_FEATURES..]
            .iter_mut()
            .zip(self.items_ahead.iter())
        {
            *slot = *count as f64;
        }
        out
    }

    /// Orders strictly ahead at placement
    pub fn orders_ahead(&self) -> u32 {
        self.queue_length.saturating_sub(1)
    }
}

/// Computes queue-pressure features from an active-order snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract features for `order` against `active`.
    ///
    /// An order is ahead if it was placed strictly earlier, or at the same
    /// instant and earlier in the snapshot. When `order` itself is absent
    /// from the snapshot, every same-instant order counts as ahead.
    pub fn extract(&self, order: &Order, active: &[Order]) -> FeatureVector {
        let self_idx = active.iter().position(|o| o.id == order.id);

        let mut orders_ahead = 0u32;
        let mut total_items_ahead = 0u32;
        let mut items_ahead = [0u32; CATALOG_SIZE];

        for (idx, other) in active.iter().enumerate() {
            if other.id == order.id {
                continue;
            }
            let ahead = other.placed_at < order.placed_at
                || (other.placed_at == order.placed_at && self_idx.map_or(true, |s| idx < s));
            if !ahead {
                continue;
            }

            orders_ahead += 1;
            total_items_ahead += other.item_count() as u32;
            for &item in &other.item_ids {
                if let Some(slot) = (item as usize)
                    .checked_sub(1)
                    .and_then(|k| items_ahead.get_mut(k))
                {
                    *slot += 1;
                }
            }
        }

        FeatureVector {
            item_count: order.item_count() as u32,
            queue_length: orders_ahead + 1,
            hour_of_day: order.placed_at.hour(),
            day_of_week: order.placed_at.weekday().num_days_from_monday(),
            total_items_ahead,
            items_ahead,
        }
    }
}
