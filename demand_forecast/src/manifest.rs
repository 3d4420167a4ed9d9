//! Model manifest: the ordered feature columns a trained predictor expects

use crate::config::FeatureConfig;
use crate::error::{ForecastError, Result};
use crate::features::{FeatureRow, BASE_COLUMNS, TARGET_COLUMN};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Ordered feature-column names, fixed at training time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ManifestFile", into = "ManifestFile")]
pub struct ModelManifest {
    columns: Vec<String>,
}

/// On-disk form, `{"feature_cols": [...]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ManifestFile {
    feature_cols: Vec<String>,
}

impl TryFrom<ManifestFile> for ModelManifest {
    type Error = ForecastError;

    fn try_from(file: ManifestFile) -> Result<Self> {
        ModelManifest::new(file.feature_cols)
    }
}

impl From<ModelManifest> for ManifestFile {
    fn from(manifest: ModelManifest) -> Self {
        ManifestFile {
            feature_cols: manifest.columns,
        }
    }
}

impl ModelManifest {
    /// Create a manifest from column names
    ///
    /// The list must be non-empty, free of duplicates and must not contain
    /// the target column.
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Result<Self> {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();

        if columns.is_empty() {
            return Err(ForecastError::FeatureMismatch(
                "Manifest lists no feature columns".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for column in &columns {
            if column == TARGET_COLUMN {
                return Err(ForecastError::FeatureMismatch(format!(
                    "Manifest must not use the target column '{}' as a feature",
                    TARGET_COLUMN
                )));
            }
            if !seen.insert(column.as_str()) {
                return Err(ForecastError::FeatureMismatch(format!(
                    "Column '{}' appears more than once in the manifest",
                    column
                )));
            }
        }

        Ok(Self { columns })
    }

    /// Manifest covering every column a feature configuration produces
    pub fn from_config(config: &FeatureConfig) -> Result<Self> {
        Self::new(
            BASE_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .chain(config.column_names()),
        )
    }

    /// Load a manifest from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Get the column names in order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Always false; a manifest holds at least one column
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Check every column can be built under `config`
    pub fn check_against(&self, config: &FeatureConfig) -> Result<()> {
        let produced = config.column_names();
        let missing: Vec<&str> = self
            .columns
            .iter()
            .filter(|c| !BASE_COLUMNS.contains(&c.as_str()) && !produced.contains(c))
            .map(String::as_str)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ForecastError::FeatureMismatch(format!(
                "Columns [{}] are not produced by lags {:?} and windows {:?}",
                missing.join(", "),
                config.lags,
                config.windows
            )))
        }
    }

    /// Pull the manifest columns out of a feature row, in manifest order
    pub fn extract(&self, row: &FeatureRow) -> Result<FeatureVector> {
        let values = self
            .columns
            .iter()
            .map(|column| {
                row.value(column).ok_or_else(|| {
                    ForecastError::FeatureMismatch(format!(
                        "Feature row has no column '{}'",
                        column
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(FeatureVector {
            columns: self.columns.clone(),
            values,
        })
    }
}

/// Manifest-ordered feature values handed to a predictor
///
/// A value is `None` when its feature is undefined for the row.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    columns: Vec<String>,
    values: Vec<Option<f64>>,
}

impl FeatureVector {
    /// Create a feature vector from named values
    pub fn new(columns: Vec<String>, values: Vec<Option<f64>>) -> Result<Self> {
        if columns.len() != values.len() {
            return Err(ForecastError::FeatureMismatch(format!(
                "{} columns but {} values",
                columns.len(),
                values.len()
            )));
        }
        Ok(Self { columns, values })
    }

    /// Get the column names in order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Get the values in manifest order
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Value of a named column, `None` when absent or undefined
    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values[i])
    }

    /// `(column, value)` pairs in manifest order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    /// All values, or `None` if any is undefined
    pub fn dense(&self) -> Option<Vec<f64>> {
        self.values.iter().copied().collect()
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the vector is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_validation() {
        assert!(ModelManifest::new(Vec::<String>::new()).is_err());
        assert!(ModelManifest::new(["lag_7", "lag_7"]).is_err());
        assert!(ModelManifest::new(["lag_7", "sales"]).is_err());
        assert!(ModelManifest::new(["store", "lag_7"]).is_ok());
    }

    #[test]
    fn test_check_against_config() {
        let config = FeatureConfig::default();
        let manifest = ModelManifest::new(["store", "month", "lag_28", "rmean_7"]).unwrap();
        assert!(manifest.check_against(&config).is_ok());

        let drifted = ModelManifest::new(["lag_14", "price"]).unwrap();
        match drifted.check_against(&config) {
            Err(ForecastError::FeatureMismatch(msg)) => {
                assert!(msg.contains("lag_14"));
                assert!(msg.contains("price"));
            }
            other => panic!("Expected FeatureMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_json_shape() {
        let manifest: ModelManifest =
            serde_json::from_str(r#"{"feature_cols": ["store", "lag_7"]}"#).unwrap();
        assert_eq!(manifest.columns(), ["store", "lag_7"]);

        let json = serde_json::to_string(&manifest).unwrap();
        assert_eq!(json, r#"{"feature_cols":["store","lag_7"]}"#);

        assert!(serde_json::from_str::<ModelManifest>(r#"{"feature_cols": []}"#).is_err());
    }

    #[test]
    fn test_feature_vector_lookup() {
        let vector = FeatureVector::new(
            vec!["lag_7".to_string(), "rmean_7".to_string()],
            vec![Some(3.0), None],
        )
        .unwrap();

        assert_eq!(vector.get("lag_7"), Some(3.0));
        assert_eq!(vector.get("rmean_7"), None);
        assert_eq!(vector.dense(), None);
        assert!(FeatureVector::new(vec!["lag_7".to_string()], vec![]).is_err());
    }

    #[test]
    fn test_from_config() {
        let manifest = ModelManifest::from_config(&FeatureConfig::default()).unwrap();
        assert_eq!(manifest.len(), 10);
        assert_eq!(manifest.columns()[6], "lag_7");
    }
}
