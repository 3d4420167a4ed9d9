//! Forecasting entry point for request-handling layers
//!
//! Holds the historical table, a loaded predictor and its manifest, and
//! answers `forecast(store, item, horizon)` requests. Everything it holds is
//! read-only; each request works on its own copy of the series history.

use crate::config::ForecastConfig;
use crate::data::{Observation, Series, SeriesIndex, SeriesKey};
use crate::error::{ForecastError, Result};
use crate::forecaster::{Forecast, RecursiveForecaster};
use crate::manifest::ModelManifest;
use crate::metrics::{backtest, Backtest};
use crate::predictor::Predictor;

/// Longest horizon a request may ask for, in days
pub const MAX_HORIZON: usize = 3660;

/// Per store-item demand forecaster over a fixed historical table
#[derive(Debug)]
pub struct DemandForecaster<P: Predictor> {
    index: SeriesIndex,
    predictor: P,
    manifest: ModelManifest,
    config: ForecastConfig,
}

impl<P: Predictor> DemandForecaster<P> {
    /// Index a historical table and bind it to a predictor
    pub fn new(
        observations: Vec<Observation>,
        predictor: P,
        manifest: ModelManifest,
        config: ForecastConfig,
    ) -> Result<Self> {
        Self::from_index(
            SeriesIndex::from_observations(observations)?,
            predictor,
            manifest,
            config,
        )
    }

    /// Bind an existing series index to a predictor
    pub fn from_index(
        index: SeriesIndex,
        predictor: P,
        manifest: ModelManifest,
        config: ForecastConfig,
    ) -> Result<Self> {
        config.validate()?;
        manifest.check_against(&config.features)?;

        Ok(Self {
            index,
            predictor,
            manifest,
            config,
        })
    }

    /// Forecast `horizon` days after the last observation of a store and item
    pub fn forecast(&self, store: u32, item: u32, horizon: usize) -> Result<Forecast> {
        check_horizon(horizon)?;

        let history = self.history(SeriesKey::new(store, item))?;
        RecursiveForecaster::new(&self.predictor, &self.manifest, self.config.clone())?
            .forecast(history, horizon)
    }

    /// Like [`forecast`](Self::forecast), parsing identifiers and horizon from text
    pub fn forecast_str(&self, store: &str, item: &str, horizon: &str) -> Result<Forecast> {
        let key = SeriesKey::parse(store, item)?;
        let horizon = parse_horizon(horizon)?;
        self.forecast(key.store, key.item, horizon)
    }

    /// Forecast the last `holdout` observations of a series and score the result
    pub fn backtest(&self, store: u32, item: u32, holdout: usize) -> Result<Backtest> {
        let history = self.history(SeriesKey::new(store, item))?;
        backtest(
            &self.predictor,
            &self.manifest,
            history,
            holdout,
            &self.config,
        )
    }

    /// History of one series
    pub fn history(&self, key: SeriesKey) -> Result<&Series> {
        self.index
            .get(&key)
            .ok_or_else(|| ForecastError::InvalidInput(format!("No history for {}", key)))
    }

    /// Keys of every series with history
    pub fn series_keys(&self) -> Vec<SeriesKey> {
        self.index.keys().copied().collect()
    }

    /// Get the manifest
    pub fn manifest(&self) -> &ModelManifest {
        &self.manifest
    }

    /// Get the configuration
    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }
}

fn check_horizon(horizon: usize) -> Result<usize> {
    if horizon == 0 || horizon > MAX_HORIZON {
        return Err(ForecastError::InvalidInput(format!(
            "Horizon must be between 1 and {} days, got {}",
            MAX_HORIZON, horizon
        )));
    }
    Ok(horizon)
}

/// Parse a horizon, rejecting anything but a whole number of days in
/// `1..=MAX_HORIZON`
pub fn parse_horizon(raw: &str) -> Result<usize> {
    match raw.trim().parse::<i64>() {
        Ok(days) if days > 0 => usize::try_from(days)
            .map_err(|e| ForecastError::InvalidInput(format!("Invalid horizon '{}': {}", raw, e)))
            .and_then(check_horizon),
        Ok(days) => Err(ForecastError::InvalidInput(format!(
            "Horizon must be positive, got {}",
            days
        ))),
        Err(e) => Err(ForecastError::InvalidInput(format!(
            "Invalid horizon '{}': {}",
            raw, e
        ))),
    }
}
