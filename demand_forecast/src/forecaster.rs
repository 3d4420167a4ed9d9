//! Recursive multi-step forecasting for one store-item series
//!
//! Each step appends a placeholder row for the next day to a bounded copy of
//! the recent history, rebuilds that row's features with the same code used
//! for training, asks the predictor for a value and commits the clamped value
//! as if it had been observed. Later steps therefore build on earlier
//! predictions, so the steps run strictly one after another.

use crate::config::ForecastConfig;
use crate::data::{Observation, Series, SeriesKey};
use crate::error::{ForecastError, Result};
use crate::features::build_sorted_features;
use crate::manifest::ModelManifest;
use crate::predictor::Predictor;
use chrono::NaiveDate;
use demand_math::calendar::next_day;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// One forecasted day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Forecasted day
    pub date: NaiveDate,
    /// Forecast value, never negative
    pub forecast: f64,
}

/// Forecast for one series, one point per consecutive future day
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    key: SeriesKey,
    points: Vec<ForecastPoint>,
}

impl Forecast {
    /// Get the series the forecast belongs to
    pub fn key(&self) -> SeriesKey {
        self.key
    }

    /// Get the forecast points in date order
    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    /// Get the forecast values in date order
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.forecast).collect()
    }

    /// Get the forecast dates
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// Number of forecast points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the forecast is empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Forecast point for a given day, if the forecast covers it
    pub fn point_on(&self, date: NaiveDate) -> Option<&ForecastPoint> {
        let first = self.points.first()?.date;
        let offset = usize::try_from((date - first).num_days()).ok()?;
        self.points.get(offset).filter(|p| p.date == date)
    }

    /// Prediction intervals that widen with the horizon
    ///
    /// Step `h` (1-based) gets `forecast ± z·σ·√h`, where `σ` is the one-step
    /// residual standard deviation and `z` the two-sided normal quantile for
    /// `level`. Lower bounds are clamped at zero.
    pub fn prediction_intervals(&self, residual_std: f64, level: f64) -> Result<Vec<(f64, f64)>> {
        if level <= 0.0 || level >= 1.0 {
            return Err(ForecastError::InvalidInput(
                "Confidence level must be between 0 and 1".to_string(),
            ));
        }
        if !residual_std.is_finite() || residual_std < 0.0 {
            return Err(ForecastError::InvalidInput(
                "Residual standard deviation must be finite and non-negative".to_string(),
            ));
        }

        let normal =
            Normal::new(0.0, 1.0).map_err(|e| ForecastError::DataError(e.to_string()))?;
        let z = normal.inverse_cdf(0.5 + level / 2.0);

        Ok(self
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let margin = z * residual_std * ((i + 1) as f64).sqrt();
                ((p.forecast - margin).max(0.0), p.forecast + margin)
            })
            .collect())
    }
}

/// Most recent observations of one series, bounded to a fixed capacity
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    key: SeriesKey,
    capacity: usize,
    rows: VecDeque<Observation>,
}

impl HistoryBuffer {
    /// Copy the last `capacity` observations of a series
    pub fn from_series(series: &Series, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(ForecastError::ConfigError(
                "History capacity must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            key: series.key(),
            capacity,
            rows: series.tail(capacity).iter().cloned().collect(),
        })
    }

    /// Append an observation for the day after the current last one,
    /// evicting the oldest once full
    pub fn push(&mut self, observation: Observation) -> Result<()> {
        if observation.key() != self.key {
            return Err(ForecastError::InvalidInput(format!(
                "Cannot append {} to history of {}",
                observation.key(),
                self.key
            )));
        }
        if let Some(last) = self.last_date() {
            if observation.date <= last {
                return Err(ForecastError::InvalidInput(format!(
                    "Appended date {} is not after {}",
                    observation.date, last
                )));
            }
        }
        observation.validate()?;

        self.rows.push_back(observation);
        if self.rows.len() > self.capacity {
            self.rows.pop_front();
        }
        Ok(())
    }

    /// Date of the newest observation
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.back().map(|o| o.date)
    }

    /// Get the series key
    pub fn key(&self) -> SeriesKey {
        self.key
    }

    /// Get the capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of observations held
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Observations held, oldest first, followed by `extra`
    fn with_next(&self, extra: Observation) -> Vec<Observation> {
        let mut rows = Vec::with_capacity(self.rows.len() + 1);
        rows.extend(self.rows.iter().cloned());
        rows.push(extra);
        rows
    }
}

/// Recursive forecaster bound to one predictor and manifest
#[derive(Debug)]
pub struct RecursiveForecaster<'a, P: Predictor + ?Sized> {
    predictor: &'a P,
    manifest: &'a ModelManifest,
    config: ForecastConfig,
}

impl<'a, P: Predictor + ?Sized> RecursiveForecaster<'a, P> {
    /// Create a forecaster, checking the manifest against the feature configuration
    pub fn new(predictor: &'a P, manifest: &'a ModelManifest, config: ForecastConfig) -> Result<Self> {
        config.validate()?;
        manifest.check_against(&config.features)?;

        Ok(Self {
            predictor,
            manifest,
            config,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Forecast `horizon` consecutive days after the end of `history`
    ///
    /// Fails with [`ForecastError::InsufficientHistory`] before calling the
    /// predictor when the first step cannot have every feature defined.
    /// No partial forecast is returned on error.
    pub fn forecast(&self, history: &Series, horizon: usize) -> Result<Forecast> {
        let key = history.key();
        if horizon == 0 {
            return Ok(Forecast {
                key,
                points: Vec::new(),
            });
        }

        let required = self.config.features.min_history();
        let insufficient = |undefined: Vec<String>| ForecastError::InsufficientHistory {
            required,
            available: history.len(),
            undefined,
        };
        if history.len() < required {
            return Err(insufficient(Vec::new()));
        }

        let mut buffer = HistoryBuffer::from_series(history, self.config.lookback)?;
        // The horizon is caller-controlled; only preallocate what the lookback suggests
        let mut points = Vec::with_capacity(horizon.min(self.config.lookback));

        for step in 1..=horizon {
            let last = buffer
                .last_date()
                .ok_or_else(|| insufficient(Vec::new()))?;
            let date = next_day(last)?;

            let rows = build_sorted_features(
                &buffer.with_next(Observation::unknown(date, key)),
                &self.config.features,
            )?;
            let row = rows.last().ok_or_else(|| insufficient(Vec::new()))?;

            if step == 1 && !row.is_complete() {
                let undefined = row.undefined_columns();
                debug!(%key, ?undefined, "first forecast row has undefined features");
                return Err(insufficient(undefined));
            }

            let features = self.manifest.extract(row)?;
            let raw = self.predictor.predict(&features)?;
            if !raw.is_finite() {
                return Err(ForecastError::DataError(format!(
                    "Predictor returned {} for {} on {}",
                    raw, key, date
                )));
            }

            let forecast = raw.max(0.0);
            if raw < 0.0 {
                warn!(%key, %date, raw, "clamped negative prediction to zero");
            }
            debug!(%key, step, %date, raw, forecast, "forecast step");

            buffer.push(Observation::new(date, key.store, key.item, forecast))?;
            points.push(ForecastPoint { date, forecast });
        }

        info!(%key, horizon, "completed recursive forecast");
        Ok(Forecast { key, points })
    }
}

/// Forecast `horizon` days for one series in a single call
pub fn recursive_forecast<P: Predictor + ?Sized>(
    predictor: &P,
    manifest: &ModelManifest,
    history: &Series,
    horizon: usize,
    config: &ForecastConfig,
) -> Result<Forecast> {
    RecursiveForecaster::new(predictor, manifest, config.clone())?.forecast(history, horizon)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(days: usize) -> Series {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        Series::new(
            (0..days)
                .map(|i| Observation::new(start + chrono::Days::new(i as u64), 1, 1, i as f64))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_buffer_is_bounded() {
        let history = series(10);
        let mut buffer = HistoryBuffer::from_series(&history, 4).unwrap();
        assert_eq!(buffer.len(), 4);

        let next = NaiveDate::from_ymd_opt(2023, 1, 11).unwrap();
        buffer.push(Observation::new(next, 1, 1, 5.0)).unwrap();
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.last_date(), Some(next));
    }

    #[test]
    fn test_buffer_rejects_stale_or_foreign_rows() {
        let history = series(3);
        let mut buffer = HistoryBuffer::from_series(&history, 5).unwrap();
        let old = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let new = NaiveDate::from_ymd_opt(2023, 1, 4).unwrap();

        assert!(buffer.push(Observation::new(old, 1, 1, 1.0)).is_err());
        assert!(buffer.push(Observation::new(new, 2, 1, 1.0)).is_err());
        assert!(buffer.push(Observation::new(new, 1, 1, -1.0)).is_err());
        assert!(HistoryBuffer::from_series(&history, 0).is_err());
    }

    #[test]
    fn test_intervals_widen() {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let forecast = Forecast {
            key: SeriesKey::new(1, 1),
            points: (0..4)
                .map(|i| ForecastPoint {
                    date: start + chrono::Days::new(i),
                    forecast: 10.0,
                })
                .collect(),
        };

        let intervals = forecast.prediction_intervals(2.0, 0.95).unwrap();
        let widths: Vec<f64> = intervals.iter().map(|(lo, hi)| hi - lo).collect();
        assert!((widths[0] - 2.0 * 1.959964 * 2.0).abs() < 1e-3);
        assert!(widths.windows(2).all(|w| w[1] > w[0]));

        let wide = forecast.prediction_intervals(50.0, 0.95).unwrap();
        assert!(wide.iter().all(|(lo, _)| *lo == 0.0));

        assert!(forecast.prediction_intervals(1.0, 1.0).is_err());
        assert!(forecast.prediction_intervals(-1.0, 0.9).is_err());
    }
}
