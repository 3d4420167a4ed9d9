//! # Demand Forecast Workspace
//!
//! Umbrella crate re-exporting the workspace members:
//!
//! - [`demand_math`]: calendar features and strictly-past lag and trailing-window math
//! - [`demand_forecast`]: sales ingestion, training frames, recursive forecasting
//!   and the forecasting service
//!
//! ## Example
//!
//! ```
//! use demand_forecast_workspace::forecast::{recursive_forecast, FeatureVector, ForecastConfig, ModelManifest, Observation, Series};
//! use demand_forecast_workspace::math::CalendarFeatures;
//! use chrono::NaiveDate;
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let history = Series::new(
//!     (0..30)
//!         .map(|d| Observation::new(start + chrono::Days::new(d), 1, 1, 12.0))
//!         .collect(),
//! )
//! .unwrap();
//!
//! let manifest = ModelManifest::new(["lag_7"]).unwrap();
//! let predictor = |f: &FeatureVector| f.get("lag_7").unwrap_or(0.0);
//! let forecast =
//!     recursive_forecast(&predictor, &manifest, &history, 2, &ForecastConfig::default()).unwrap();
//!
//! assert_eq!(forecast.values(), vec![12.0, 12.0]);
//! // 2024-01-31 is a Wednesday
//! assert_eq!(CalendarFeatures::from_date(forecast.dates()[0]).day_of_week, 2);
//! ```

pub use demand_forecast as forecast;
pub use demand_math as math;

/// Name and version of every workspace member
pub fn members() -> [(&'static str, &'static str); 2] {
    [
        (demand_math::NAME, demand_math::VERSION),
        (demand_forecast::NAME, demand_forecast::VERSION),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_members() {
        let names: Vec<&str> = members().iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["demand_math", "demand_forecast"]);
    }

    #[test]
    fn test_reexports_share_types() {
        let key = forecast::SeriesKey::new(2, 3);
        assert_eq!(key.to_string(), "store 2 item 3");
        assert!(math::TrailingWindow::new(0).is_err());
    }
}
