//! Predictors: anything that turns a feature vector into a scalar demand estimate

use crate::config::FeatureConfig;
use crate::error::{ForecastError, Result};
use crate::manifest::{FeatureVector, ModelManifest};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// A trained regression model, opaque to the forecaster
pub trait Predictor {
    /// Predict one value from manifest-ordered features
    fn predict(&self, features: &FeatureVector) -> Result<f64>;
}

impl<F> Predictor for F
where
    F: Fn(&FeatureVector) -> f64,
{
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        Ok(self(features))
    }
}

/// Linear model `intercept + Σ coefficient · feature`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearPredictor {
    intercept: f64,
    coefficients: Vec<f64>,
}

impl LinearPredictor {
    /// Create a new linear predictor
    pub fn new(intercept: f64, coefficients: Vec<f64>) -> Result<Self> {
        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ForecastError::InvalidInput(
                "Linear model parameters must be finite".to_string(),
            ));
        }

        Ok(Self {
            intercept,
            coefficients,
        })
    }

    /// Get the intercept
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Get the coefficients
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }
}

impl Predictor for LinearPredictor {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        if features.len() != self.coefficients.len() {
            return Err(ForecastError::FeatureMismatch(format!(
                "Linear model has {} coefficients but received {} features",
                self.coefficients.len(),
                features.len()
            )));
        }

        features
            .iter()
            .zip(&self.coefficients)
            .try_fold(self.intercept, |acc, ((column, value), coefficient)| {
                value
                    .map(|v| acc + coefficient * v)
                    .ok_or_else(|| ForecastError::UndefinedFeature(column.to_string()))
            })
    }
}

/// Mean of a fixed set of feature columns
///
/// A naive baseline: with lag columns it predicts the average of what sold
/// one week and four weeks earlier.
#[derive(Debug, Clone, PartialEq)]
pub struct LagMeanPredictor {
    columns: Vec<String>,
}

impl LagMeanPredictor {
    /// Create a predictor averaging the given columns
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Result<Self> {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            return Err(ForecastError::InvalidInput(
                "Lag mean predictor needs at least one column".to_string(),
            ));
        }
        Ok(Self { columns })
    }

    /// Average every lag column of a feature configuration
    pub fn from_config(config: &FeatureConfig) -> Result<Self> {
        Self::new(config.lags.iter().map(|l| crate::config::lag_column(*l)))
    }

    /// Get the averaged columns
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl Predictor for LagMeanPredictor {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        let mut sum = 0.0;
        for column in &self.columns {
            let value = features
                .iter()
                .find(|(name, _)| name == column)
                .ok_or_else(|| {
                    ForecastError::FeatureMismatch(format!(
                        "Column '{}' is not in the feature vector",
                        column
                    ))
                })?
                .1
                .ok_or_else(|| ForecastError::UndefinedFeature(column.clone()))?;
            sum += value;
        }
        Ok(sum / self.columns.len() as f64)
    }
}

/// Persisted linear model together with the manifest it was trained on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Feature columns, in coefficient order
    pub feature_cols: Vec<String>,
    /// Model intercept
    pub intercept: f64,
    /// One coefficient per feature column
    pub coefficients: Vec<f64>,
}

impl ModelArtifact {
    /// Load an artifact from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Write the artifact as JSON
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Split into a predictor and its manifest
    pub fn into_parts(self) -> Result<(LinearPredictor, ModelManifest)> {
        if self.coefficients.len() != self.feature_cols.len() {
            return Err(ForecastError::FeatureMismatch(format!(
                "Artifact has {} coefficients for {} feature columns",
                self.coefficients.len(),
                self.feature_cols.len()
            )));
        }

        let manifest = ModelManifest::new(self.feature_cols)?;
        let predictor = LinearPredictor::new(self.intercept, self.coefficients)?;
        Ok((predictor, manifest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Observation;
    use crate::features::FeatureRow;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use demand_math::CalendarFeatures;

    fn row(lag_7: Option<f64>, lag_28: Option<f64>) -> FeatureRow {
        let date = NaiveDate::from_ymd_opt(2023, 3, 1).unwrap();
        FeatureRow {
            observation: Observation::new(date, 2, 5, 10.0),
            calendar: CalendarFeatures::from_date(date),
            lags: vec![(7, lag_7), (28, lag_28)],
            rolling_means: vec![(7, Some(12.0))],
        }
    }

    #[test]
    fn test_linear_predictor() {
        let manifest = ModelManifest::new(["store", "lag_7", "rmean_7"]).unwrap();
        let predictor = LinearPredictor::new(1.0, vec![0.5, 2.0, 0.25]).unwrap();
        let features = manifest.extract(&row(Some(3.0), None)).unwrap();

        assert_relative_eq!(predictor.predict(&features).unwrap(), 1.0 + 1.0 + 6.0 + 3.0);
    }

    #[test]
    fn test_linear_predictor_refuses_absent_values() {
        let manifest = ModelManifest::new(["lag_28"]).unwrap();
        let predictor = LinearPredictor::new(0.0, vec![1.0]).unwrap();
        let features = manifest.extract(&row(Some(3.0), None)).unwrap();

        assert!(matches!(
            predictor.predict(&features),
            Err(ForecastError::UndefinedFeature(c)) if c == "lag_28"
        ));
    }

    #[test]
    fn test_lag_mean_predictor() {
        let manifest = ModelManifest::new(["lag_7", "lag_28"]).unwrap();
        let predictor = LagMeanPredictor::from_config(&FeatureConfig::default()).unwrap();

        let features = manifest.extract(&row(Some(4.0), Some(8.0))).unwrap();
        assert_relative_eq!(predictor.predict(&features).unwrap(), 6.0);

        let narrow = ModelManifest::new(["lag_7"]).unwrap();
        let features = narrow.extract(&row(Some(4.0), Some(8.0))).unwrap();
        assert!(matches!(
            predictor.predict(&features),
            Err(ForecastError::FeatureMismatch(_))
        ));
    }

    #[test]
    fn test_closure_predictor() {
        let manifest = ModelManifest::new(["lag_7"]).unwrap();
        let double = |features: &FeatureVector| features.get("lag_7").unwrap_or(0.0) * 2.0;
        let features = manifest.extract(&row(Some(4.0), None)).unwrap();

        assert_relative_eq!(double.predict(&features).unwrap(), 8.0);
    }

    #[test]
    fn test_artifact_length_mismatch() {
        let artifact = ModelArtifact {
            feature_cols: vec!["lag_7".to_string(), "lag_28".to_string()],
            intercept: 0.0,
            coefficients: vec![1.0],
        };
        assert!(matches!(
            artifact.into_parts(),
            Err(ForecastError::FeatureMismatch(_))
        ));
    }
}
