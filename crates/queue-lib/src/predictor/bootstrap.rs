//! Synthetic training data for the first model
//!
//! Lets the service answer estimates from its first request, before any
//! real completions exist. Generation is seeded so runs are reproducible.

use super::features::FeatureVector;
use super::training::TrainingSample;
use crate::models::{OrderId, CATALOG_SIZE};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

/// Default number of synthetic samples
pub const BOOTSTRAP_SAMPLES: usize = 500;

/// Default RNG seed
pub const DEFAULT_BOOTSTRAP_SEED: u64 = 42;

/// Generate `count` synthetic (features, wait) pairs from `seed`
pub fn synthetic_samples(count: usize, seed: u64) -> Vec<TrainingSample> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count).map(|_| synthetic_sample(&mut rng)).collect()
}

fn synthetic_sample(rng: &mut StdRng) -> TrainingSample {
    let orders_ahead: u32 = rng.random_range(0..15);
    let item_count: u32 = rng.random_range(1..=5);
    let hour_of_day: u32 = rng.random_range(0..24);
    let day_of_week: u32 = rng.random_range(0..7);

    let mut items_ahead = [0u32; CATALOG_SIZE];
    let mut total_items_ahead = 0u32;
    for _ in 0..orders_ahead {
        let items: u32 = rng.random_range(1..=4);
        for _ in 0..items {
            items_ahead[rng.random_range(0..CATALOG_SIZE)] += 1;
        }
        total_items_ahead += items;
    }

    let rush = matches!(hour_of_day, 11..=13 | 17..=19);
    let weekend = day_of_week >= 5;
    let noise: f64 = rng.random_range(-2.0..2.0);
    let wait = 3.0
        + 1.2 * item_count as f64
        + 0.9 * total_items_ahead as f64
        + 0.4 * orders_ahead as f64
        + if rush { 4.0 } else { 0.0 }
        + if weekend { 2.0 } else { 0.0 }
        + noise;

    // Ids only need to be unique within the batch
    let order_id = OrderId(Uuid::from_u128(rng.random::<u128>()));

    TrainingSample {
        order_id,
        features: FeatureVector {
            item_count,
            queue_length: orders_ahead + 1,
            hour_of_day,
            day_of_week,
            total_items_ahead,
            items_ahead,
        },
        actual_wait_minutes: wait.max(1.0),
    }
}
