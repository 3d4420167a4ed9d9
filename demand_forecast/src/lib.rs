//! # Demand Forecast
//!
//! Feature engineering and recursive multi-step forecasting of daily sales
//! per store and item.
//!
//! ## Features
//!
//! - Sales tables from CSV, grouped once into per store-item series
//! - Calendar, lag and rolling-mean features built without label leakage
//! - Training frames with every lag and rolling feature defined
//! - Recursive forecasting with any scalar predictor and a fixed manifest of
//!   feature columns, feeding each prediction back into the history
//! - Hold-out backtests and horizon-widening prediction intervals
//!
//! ## Quick Start
//!
//! ```rust
//! use demand_forecast::{
//!     DemandForecaster, ForecastConfig, LagMeanPredictor, ModelManifest, SyntheticConfig,
//! };
//! use demand_forecast::synthetic::generate_sales;
//!
//! let sales = generate_sales(&SyntheticConfig { stores: 1, items: 2, days: 90, ..Default::default() })?;
//! let config = ForecastConfig::default();
//! let predictor = LagMeanPredictor::from_config(&config.features)?;
//! let manifest = ModelManifest::new(["lag_7", "lag_28"])?;
//!
//! let forecaster = DemandForecaster::new(sales, predictor, manifest, config)?;
//! let forecast = forecaster.forecast(1, 2, 14)?;
//! assert_eq!(forecast.len(), 14);
//! # Ok::<(), demand_forecast::ForecastError>(())
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod forecaster;
pub mod manifest;
pub mod metrics;
pub mod predictor;
pub mod service;
pub mod synthetic;

// Re-export commonly used types
pub use crate::config::{FeatureConfig, ForecastConfig};
pub use crate::data::{DataLoader, Observation, Series, SeriesIndex, SeriesKey};
pub use crate::error::{ForecastError, Result};
pub use crate::features::{prepare_training_frame, FeatureRow, TrainingFrame};
pub use crate::forecaster::{recursive_forecast, Forecast, ForecastPoint, RecursiveForecaster};
pub use crate::manifest::{FeatureVector, ModelManifest};
pub use crate::predictor::{LagMeanPredictor, LinearPredictor, ModelArtifact, Predictor};
pub use crate::service::DemandForecaster;
pub use crate::synthetic::SyntheticConfig;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
