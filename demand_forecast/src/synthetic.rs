//! Synthetic retail sales for demos and tests
//!
//! Every store-item pair gets a baseline demand; each day adds weekend,
//! holiday and promotion uplifts plus Gaussian noise. Sales are whole units
//! and never negative.

use crate::data::Observation;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use demand_math::calendar::date_range;
use demand_math::CalendarFeatures;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Shape of a synthetic sales table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticConfig {
    /// Number of stores, numbered from 1
    pub stores: u32,
    /// Number of items per store, numbered from 1
    pub items: u32,
    /// Consecutive days per series
    pub days: usize,
    /// First day
    pub start: NaiveDate,
    /// Random seed
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            stores: 5,
            items: 20,
            days: 730,
            start: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap_or_default(),
            seed: 42,
        }
    }
}

const HOLIDAY_PROBABILITY: f64 = 0.05;
const PROMOTION_PROBABILITY: f64 = 0.1;
const NOISE_STD: f64 = 10.0;

/// Generate a sales table, ordered by store, item and date
pub fn generate_sales(config: &SyntheticConfig) -> Result<Vec<Observation>> {
    if config.stores == 0 || config.items == 0 || config.days == 0 {
        return Err(ForecastError::InvalidInput(
            "Stores, items and days must all be positive".to_string(),
        ));
    }

    let dates = date_range(config.start, config.days)?;
    let noise = Normal::new(0.0, NOISE_STD).map_err(|e| ForecastError::DataError(e.to_string()))?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut observations =
        Vec::with_capacity(config.stores as usize * config.items as usize * config.days);

    for store in 1..=config.stores {
        for item in 1..=config.items {
            let base = rng.gen_range(20..200) as f64;

            for &date in &dates {
                let mut sales = base + noise.sample(&mut rng);

                if CalendarFeatures::from_date(date).is_weekend() {
                    sales += rng.gen_range(5..20) as f64;
                }
                if rng.gen_bool(HOLIDAY_PROBABILITY) {
                    sales += rng.gen_range(20..80) as f64;
                }
                if rng.gen_bool(PROMOTION_PROBABILITY) {
                    sales += rng.gen_range(10..50) as f64;
                }

                observations.push(Observation::new(date, store, item, sales.trunc().max(0.0)));
            }
        }
    }

    info!(
        stores = config.stores,
        items = config.items,
        days = config.days,
        rows = observations.len(),
        "generated synthetic sales"
    );
    Ok(observations)
}
