//! Feature and forecast configuration

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Default lag offsets, in rows
pub const DEFAULT_LAGS: [usize; 2] = [7, 28];
/// Default trailing-mean window sizes, in rows
pub const DEFAULT_WINDOWS: [usize; 2] = [7, 28];
/// Default number of recent observations kept while forecasting
pub const DEFAULT_LOOKBACK: usize = 60;

/// Which lag and rolling-mean columns to derive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Lag offsets, producing `lag_L` columns
    pub lags: Vec<usize>,
    /// Trailing window sizes, producing `rmean_W` columns
    pub windows: Vec<usize>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            lags: DEFAULT_LAGS.to_vec(),
            windows: DEFAULT_WINDOWS.to_vec(),
        }
    }
}

impl FeatureConfig {
    /// Create a new feature configuration
    pub fn new(lags: Vec<usize>, windows: Vec<usize>) -> Result<Self> {
        let config = Self { lags, windows };
        config.validate()?;
        Ok(config)
    }

    /// Check offsets and windows are usable
    pub fn validate(&self) -> Result<()> {
        if self.lags.is_empty() {
            return Err(ForecastError::ConfigError(
                "At least one lag offset is required".to_string(),
            ));
        }

        if self.lags.contains(&0) {
            return Err(ForecastError::ConfigError(
                "Lag offsets must be positive".to_string(),
            ));
        }

        if self.windows.contains(&0) {
            return Err(ForecastError::ConfigError(
                "Rolling window sizes must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Prior observations needed before a row has every lag and rolling mean defined
    pub fn min_history(&self) -> usize {
        self.lags.iter().copied().max().unwrap_or(0).max(1)
    }

    /// Largest lag offset or window size
    pub fn max_span(&self) -> usize {
        self.lags
            .iter()
            .chain(self.windows.iter())
            .copied()
            .max()
            .unwrap_or(0)
    }

    /// Lag and rolling-mean column names, lags first, in configured order
    pub fn column_names(&self) -> Vec<String> {
        self.lags
            .iter()
            .map(|lag| lag_column(*lag))
            .chain(self.windows.iter().map(|w| rmean_column(*w)))
            .collect()
    }
}

/// Name of the lag column for `offset`
pub fn lag_column(offset: usize) -> String {
    format!("lag_{}", offset)
}

/// Name of the rolling-mean column for `window`
pub fn rmean_column(window: usize) -> String {
    format!("rmean_{}", window)
}

/// Settings for the recursive forecaster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Feature columns shared with training
    pub features: FeatureConfig,
    /// Recent observations kept in the working history
    pub lookback: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            features: FeatureConfig::default(),
            lookback: DEFAULT_LOOKBACK,
        }
    }
}

impl ForecastConfig {
    /// Create a new forecast configuration
    pub fn new(features: FeatureConfig, lookback: usize) -> Result<Self> {
        let config = Self { features, lookback };
        config.validate()?;
        Ok(config)
    }

    /// Check the lookback covers every configured lag and window
    pub fn validate(&self) -> Result<()> {
        self.features.validate()?;

        let span = self.features.max_span();
        if self.lookback < span {
            return Err(ForecastError::ConfigError(format!(
                "Lookback ({}) must cover the largest lag or window ({})",
                self.lookback, span
            )));
        }

        Ok(())
    }

    /// Load and validate a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }
}
