//! Feature rows: calendar, lag and rolling-mean features per series
//!
//! Lag and rolling features are positional within one series. A row only
//! ever sees rows before it, so the sales value of a row never leaks into
//! its own features. Rows of different series never mix, because features
//! are always built from one [`Series`] at a time.

use crate::config::{lag_column, rmean_column, FeatureConfig};
use crate::data::{Observation, Series, SeriesIndex};
use crate::error::{ForecastError, Result};
use crate::manifest::ModelManifest;
use demand_math::windows::{lag_series, trailing_mean_series};
use demand_math::CalendarFeatures;
use polars::prelude::{DataFrame, NamedFrom, Series as Column};
use std::fs::File;
use std::path::Path;
use tracing::info;

/// Identifier and calendar columns every row provides
pub const BASE_COLUMNS: [&str; 6] = ["store", "item", "dayofweek", "week", "month", "year"];

/// Name of the target column
pub const TARGET_COLUMN: &str = "sales";

/// An observation with its derived features
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    /// The underlying observation
    pub observation: Observation,
    /// Calendar features of the observation date
    pub calendar: CalendarFeatures,
    /// `(offset, value)` for every configured lag
    pub lags: Vec<(usize, Option<f64>)>,
    /// `(window, value)` for every configured rolling mean
    pub rolling_means: Vec<(usize, Option<f64>)>,
}

impl FeatureRow {
    /// Value of a named column
    ///
    /// Returns `None` when the row has no such column, and `Some(None)` when
    /// the column exists but its value is undefined.
    pub fn value(&self, column: &str) -> Option<Option<f64>> {
        let calendar = &self.calendar;
        match column {
            "store" => Some(Some(self.observation.store as f64)),
            "item" => Some(Some(self.observation.item as f64)),
            "dayofweek" => Some(Some(calendar.day_of_week as f64)),
            "week" => Some(Some(calendar.week as f64)),
            "month" => Some(Some(calendar.month as f64)),
            "year" => Some(Some(calendar.year as f64)),
            TARGET_COLUMN => Some(self.observation.sales),
            _ => {
                if let Some(offset) = parse_suffix(column, "lag_") {
                    lookup(&self.lags, offset)
                } else if let Some(window) = parse_suffix(column, "rmean_") {
                    lookup(&self.rolling_means, window)
                } else {
                    None
                }
            }
        }
    }

    /// Whether every lag and rolling mean is defined
    pub fn is_complete(&self) -> bool {
        self.lags
            .iter()
            .chain(self.rolling_means.iter())
            .all(|(_, value)| value.is_some())
    }

    /// Names of the lag and rolling-mean columns that are undefined
    pub fn undefined_columns(&self) -> Vec<String> {
        let lags = self
            .lags
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(offset, _)| lag_column(*offset));
        let means = self
            .rolling_means
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(window, _)| rmean_column(*window));
        lags.chain(means).collect()
    }
}

fn parse_suffix(column: &str, prefix: &str) -> Option<usize> {
    column.strip_prefix(prefix)?.parse().ok()
}

fn lookup(values: &[(usize, Option<f64>)], key: usize) -> Option<Option<f64>> {
    values.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// Calendar features for each observation
pub fn add_time_features(observations: &[Observation]) -> Vec<CalendarFeatures> {
    observations
        .iter()
        .map(|o| CalendarFeatures::from_date(o.date))
        .collect()
}

/// Build feature rows over observations already in date order for one series
pub(crate) fn build_sorted_features(
    observations: &[Observation],
    config: &FeatureConfig,
) -> Result<Vec<FeatureRow>> {
    let sales: Vec<Option<f64>> = observations.iter().map(|o| o.sales).collect();

    let lag_columns = config
        .lags
        .iter()
        .map(|&offset| lag_series(&sales, offset).map(|column| (offset, column)))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let mean_columns = config
        .windows
        .iter()
        .map(|&window| trailing_mean_series(&sales, window).map(|column| (window, column)))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let calendar = add_time_features(observations);

    Ok(observations
        .iter()
        .zip(calendar)
        .enumerate()
        .map(|(t, (observation, calendar))| FeatureRow {
            observation: observation.clone(),
            calendar,
            lags: lag_columns.iter().map(|(l, col)| (*l, col[t])).collect(),
            rolling_means: mean_columns.iter().map(|(w, col)| (*w, col[t])).collect(),
        })
        .collect())
}

/// Feature rows for every observation of one series, in date order
pub fn build_series_features(series: &Series, config: &FeatureConfig) -> Result<Vec<FeatureRow>> {
    config.validate()?;
    build_sorted_features(series.observations(), config)
}

/// Feature rows for a combined table of many series
///
/// Rows come out grouped by store and item, each group in date order.
pub fn build_feature_rows(
    observations: Vec<Observation>,
    config: &FeatureConfig,
) -> Result<Vec<FeatureRow>> {
    let index = SeriesIndex::from_observations(observations)?;
    let mut rows = Vec::new();
    for series in index.iter() {
        rows.extend(build_series_features(series, config)?);
    }
    Ok(rows)
}

/// Training rows: every feature row with all lags and rolling means defined
pub fn prepare_training_frame(
    observations: Vec<Observation>,
    config: &FeatureConfig,
) -> Result<TrainingFrame> {
    let total = observations.len();
    let rows: Vec<FeatureRow> = build_feature_rows(observations, config)?
        .into_iter()
        .filter(FeatureRow::is_complete)
        .collect();

    info!(
        observations = total,
        training_rows = rows.len(),
        "prepared training frame"
    );

    Ok(TrainingFrame {
        config: config.clone(),
        rows,
    })
}

/// Feature rows ready for model training
#[derive(Debug, Clone)]
pub struct TrainingFrame {
    config: FeatureConfig,
    rows: Vec<FeatureRow>,
}

impl TrainingFrame {
    /// Get the rows
    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    /// Get the feature configuration the rows were built with
    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the frame is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All columns, in output order: identifiers, calendar, lags, means, target
    pub fn column_names(&self) -> Vec<String> {
        BASE_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(self.config.column_names())
            .chain(std::iter::once(TARGET_COLUMN.to_string()))
            .collect()
    }

    /// Manifest-ordered feature matrix and target vector
    ///
    /// Rows with unknown sales are left out since they carry no target.
    pub fn design_matrix(&self, manifest: &ModelManifest) -> Result<(Vec<Vec<f64>>, Vec<f64>)> {
        manifest.check_against(&self.config)?;

        let mut features = Vec::with_capacity(self.rows.len());
        let mut targets = Vec::with_capacity(self.rows.len());

        for row in &self.rows {
            let Some(target) = row.observation.sales else {
                continue;
            };
            let vector = manifest.extract(row)?;
            let dense = vector.dense().ok_or_else(|| {
                ForecastError::DataError(format!(
                    "Training row on {} has undefined features",
                    row.observation.date
                ))
            })?;
            features.push(dense);
            targets.push(target);
        }

        Ok((features, targets))
    }

    /// Convert the frame to a polars DataFrame
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let dates: Vec<String> = self
            .rows
            .iter()
            .map(|r| r.observation.date.to_string())
            .collect();

        let mut columns = vec![Column::new("date", dates)];
        for name in self.column_names() {
            let values: Vec<Option<f64>> = self
                .rows
                .iter()
                .map(|r| r.value(&name).flatten())
                .collect();
            columns.push(Column::new(name.as_str(), values));
        }

        Ok(DataFrame::new(columns)?)
    }

    /// Write the frame as CSV, leaving unknown values empty
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_writer(File::create(path)?);
        let names = self.column_names();

        let mut header = vec!["date".to_string()];
        header.extend(names.iter().cloned());
        writer.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![row.observation.date.to_string()];
            record.extend(names.iter().map(|name| {
                row.value(name)
                    .flatten()
                    .map(|v| v.to_string())
                    .unwrap_or_default()
            }));
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn daily(values: &[f64]) -> Series {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        Series::new(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| Observation::new(start + chrono::Days::new(i as u64), 1, 1, *v))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_row_values() {
        let config = FeatureConfig::new(vec![1], vec![2]).unwrap();
        let rows = build_series_features(&daily(&[4.0, 6.0, 8.0]), &config).unwrap();
        let last = &rows[2];

        assert_eq!(last.value("lag_1"), Some(Some(6.0)));
        assert_eq!(last.value("rmean_2"), Some(Some(5.0)));
        assert_eq!(last.value("sales"), Some(Some(8.0)));
        assert_eq!(last.value("dayofweek"), Some(Some(1.0))); // 2023-01-03 is a Tuesday
        assert_eq!(last.value("lag_2"), None);
        assert_eq!(last.value("price"), None);
        assert!(last.is_complete());
    }

    #[test]
    fn test_first_row_is_undefined() {
        let config = FeatureConfig::new(vec![1], vec![2]).unwrap();
        let rows = build_series_features(&daily(&[4.0, 6.0]), &config).unwrap();

        assert!(!rows[0].is_complete());
        assert_eq!(rows[0].undefined_columns(), vec!["lag_1", "rmean_2"]);
    }
}
