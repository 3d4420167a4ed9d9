//! Metrics for evaluating forecast performance

use crate::config::ForecastConfig;
use crate::data::Series;
use crate::error::{ForecastError, Result};
use crate::forecaster::{recursive_forecast, Forecast};
use crate::manifest::ModelManifest;
use crate::predictor::Predictor;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

/// Forecast accuracy metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastAccuracy {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error over non-zero actuals
    pub mape: f64,
    /// Symmetric Mean Absolute Percentage Error
    pub smape: f64,
}

impl std::fmt::Display for ForecastAccuracy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Forecast Accuracy Metrics:")?;
        writeln!(f, "  MAE:   {:.4}", self.mae)?;
        writeln!(f, "  MSE:   {:.4}", self.mse)?;
        writeln!(f, "  RMSE:  {:.4}", self.rmse)?;
        writeln!(f, "  MAPE:  {:.4}%", self.mape)?;
        writeln!(f, "  SMAPE: {:.4}%", self.smape)?;
        Ok(())
    }
}

/// Calculate accuracy metrics for a forecast vs actual values
pub fn forecast_accuracy(forecast: &[f64], actual: &[f64]) -> Result<ForecastAccuracy> {
    if forecast.len() != actual.len() || forecast.is_empty() {
        return Err(ForecastError::InvalidInput(
            "Forecast and actual values must have the same non-zero length".to_string(),
        ));
    }

    let n = forecast.len() as f64;

    let errors: Vec<f64> = forecast
        .iter()
        .zip(actual.iter())
        .map(|(&f, &a)| a - f)
        .collect();

    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let mse = errors.iter().map(|e| e.powi(2)).sum::<f64>() / n;
    let rmse = mse.sqrt();

    // Days without sales have no defined percentage error
    let (ape_sum, ape_count) = actual
        .iter()
        .zip(errors.iter())
        .filter(|(a, _)| **a != 0.0)
        .fold((0.0, 0usize), |(sum, count), (&a, &e)| {
            (sum + e.abs() / a.abs() * 100.0, count + 1)
        });
    let mape = if ape_count > 0 {
        ape_sum / ape_count as f64
    } else {
        0.0
    };

    let smape = actual
        .iter()
        .zip(forecast.iter())
        .map(|(&a, &f)| {
            let denominator = a.abs() + f.abs();
            if denominator == 0.0 {
                0.0
            } else {
                200.0 * (a - f).abs() / denominator
            }
        })
        .sum::<f64>()
        / n;

    Ok(ForecastAccuracy {
        mae,
        mse,
        rmse,
        mape,
        smape,
    })
}

/// Hold-out evaluation of the recursive forecaster on one series
#[derive(Debug, Clone)]
pub struct Backtest {
    /// Forecast for every day from the end of the history to the last held-out day
    pub forecast: Forecast,
    /// Dates of the held-out observations
    pub dates: Vec<NaiveDate>,
    /// Forecast on each held-out date
    pub predicted: Vec<f64>,
    /// Actual sales on each held-out date, `None` where unknown
    pub actual: Vec<Option<f64>>,
    /// Accuracy over the days with known sales
    pub accuracy: ForecastAccuracy,
}

/// Forecast the last `holdout` observations from the ones before them
///
/// The forecast runs day by day up to the last held-out date, so gaps in the
/// held-out tail are forecast through and each actual is scored against the
/// forecast for its own date.
pub fn backtest<P: Predictor + ?Sized>(
    predictor: &P,
    manifest: &ModelManifest,
    series: &Series,
    holdout: usize,
    config: &ForecastConfig,
) -> Result<Backtest> {
    let (history, held_out) = series.split_last(holdout)?;
    let last_held_out = held_out
        .last()
        .map(|o| o.date)
        .ok_or_else(|| ForecastError::InvalidInput("Nothing held out".to_string()))?;
    let horizon = usize::try_from((last_held_out - history.last_date()).num_days())
        .map_err(|e| ForecastError::DataError(e.to_string()))?;

    let forecast = recursive_forecast(predictor, manifest, &history, horizon, config)?;

    let mut dates = Vec::with_capacity(held_out.len());
    let mut predicted = Vec::with_capacity(held_out.len());
    let mut actual = Vec::with_capacity(held_out.len());
    for observation in &held_out {
        let point = forecast.point_on(observation.date).ok_or_else(|| {
            ForecastError::DataError(format!(
                "Forecast for {} does not cover {}",
                series.key(),
                observation.date
            ))
        })?;
        dates.push(observation.date);
        predicted.push(point.forecast);
        actual.push(observation.sales);
    }

    let (scored, observed): (Vec<f64>, Vec<f64>) = predicted
        .iter()
        .zip(actual.iter())
        .filter_map(|(&f, a)| a.map(|a| (f, a)))
        .unzip();

    if observed.is_empty() {
        return Err(ForecastError::DataError(format!(
            "No known sales in the last {} observations of {}",
            holdout,
            series.key()
        )));
    }

    let accuracy = forecast_accuracy(&scored, &observed)?;
    info!(key = %series.key(), holdout, horizon, rmse = accuracy.rmse, "backtest finished");

    Ok(Backtest {
        forecast,
        dates,
        predicted,
        actual,
        accuracy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_forecast_accuracy() {
        let forecast = [10.0, 12.0, 8.0, 0.0];
        let actual = [12.0, 12.0, 4.0, 0.0];
        let accuracy = forecast_accuracy(&forecast, &actual).unwrap();

        assert_relative_eq!(accuracy.mae, 1.5);
        assert_relative_eq!(accuracy.mse, 5.0);
        assert_relative_eq!(accuracy.rmse, 5.0_f64.sqrt());
        // (2/12 + 0 + 4/4) / 3 non-zero actuals
        assert_relative_eq!(accuracy.mape, (100.0 / 6.0 + 100.0) / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_forecast_accuracy_length_mismatch() {
        assert!(forecast_accuracy(&[1.0], &[1.0, 2.0]).is_err());
        assert!(forecast_accuracy(&[], &[]).is_err());
    }

    #[test]
    fn test_display() {
        let accuracy = forecast_accuracy(&[1.0, 2.0], &[1.0, 2.0]).unwrap();
        let text = accuracy.to_string();
        assert!(text.contains("RMSE:  0.0000"));
    }
}
