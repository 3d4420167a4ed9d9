//! Sales observations, per store-item series and CSV ingestion

use crate::error::{ForecastError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info};

/// Identifies one store-item series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesKey {
    /// Store identifier
    pub store: u32,
    /// Item identifier
    pub item: u32,
}

impl SeriesKey {
    /// Create a new series key
    pub fn new(store: u32, item: u32) -> Self {
        Self { store, item }
    }

    /// Parse a key from textual identifiers
    pub fn parse(store: &str, item: &str) -> Result<Self> {
        Ok(Self {
            store: parse_identifier("store", store)?,
            item: parse_identifier("item", item)?,
        })
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store {} item {}", self.store, self.item)
    }
}

fn parse_identifier(kind: &str, raw: &str) -> Result<u32> {
    raw.trim().parse::<u32>().map_err(|e| {
        ForecastError::InvalidInput(format!("Invalid {} identifier '{}': {}", kind, raw, e))
    })
}

/// Parse a `YYYY-MM-DD` date, also accepting a midnight timestamp suffix
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .map_err(|e| ForecastError::InvalidInput(format!("Invalid date '{}': {}", raw, e)))
}

/// One day of sales for one store and item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Calendar day
    pub date: NaiveDate,
    /// Store identifier
    pub store: u32,
    /// Item identifier
    pub item: u32,
    /// Units sold, `None` when unknown
    pub sales: Option<f64>,
}

impl Observation {
    /// Create an observation with known sales
    pub fn new(date: NaiveDate, store: u32, item: u32, sales: f64) -> Self {
        Self {
            date,
            store,
            item,
            sales: Some(sales),
        }
    }

    /// Create an observation whose sales are not known yet
    pub fn unknown(date: NaiveDate, key: SeriesKey) -> Self {
        Self {
            date,
            store: key.store,
            item: key.item,
            sales: None,
        }
    }

    /// The series this observation belongs to
    pub fn key(&self) -> SeriesKey {
        SeriesKey::new(self.store, self.item)
    }

    /// Reject negative or non-finite sales
    pub fn validate(&self) -> Result<()> {
        match self.sales {
            Some(sales) if !sales.is_finite() => Err(ForecastError::InvalidInput(format!(
                "Non-finite sales on {} for {}",
                self.date,
                self.key()
            ))),
            Some(sales) if sales < 0.0 => Err(ForecastError::InvalidInput(format!(
                "Negative sales ({}) on {} for {}",
                sales,
                self.date,
                self.key()
            ))),
            _ => Ok(()),
        }
    }
}

/// Observations of one store-item pair, strictly increasing by date
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    key: SeriesKey,
    observations: Vec<Observation>,
}

impl Series {
    /// Build a series, sorting by date
    ///
    /// The sort is stable. All observations must share one key, and no two
    /// may fall on the same date.
    pub fn new(mut observations: Vec<Observation>) -> Result<Self> {
        let key = observations
            .first()
            .map(Observation::key)
            .ok_or_else(|| ForecastError::DataError("Empty series".to_string()))?;

        for observation in &observations {
            if observation.key() != key {
                return Err(ForecastError::InvalidInput(format!(
                    "Series for {} contains an observation for {}",
                    key,
                    observation.key()
                )));
            }
            observation.validate()?;
        }

        observations.sort_by_key(|o| o.date);

        if let Some(pair) = observations.windows(2).find(|pair| pair[0].date == pair[1].date) {
            return Err(ForecastError::DataError(format!(
                "Duplicate date {} in series for {}",
                pair[1].date, key
            )));
        }

        Ok(Self { key, observations })
    }

    /// Get the series key
    pub fn key(&self) -> SeriesKey {
        self.key
    }

    /// Get the observations in date order
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Get the sales column, `None` where unknown
    pub fn sales(&self) -> Vec<Option<f64>> {
        self.observations.iter().map(|o| o.sales).collect()
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Check if the series is empty
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Date of the most recent observation
    pub fn last_date(&self) -> NaiveDate {
        // Construction guarantees at least one observation
        self.observations[self.observations.len() - 1].date
    }

    /// The last `n` observations (all of them when `n` exceeds the length)
    pub fn tail(&self, n: usize) -> &[Observation] {
        &self.observations[self.observations.len().saturating_sub(n)..]
    }

    /// Split into the first `len - n` observations and the last `n`
    pub fn split_last(&self, n: usize) -> Result<(Series, Vec<Observation>)> {
        if n == 0 || n >= self.len() {
            return Err(ForecastError::InvalidInput(format!(
                "Cannot hold out {} of {} observations",
                n,
                self.len()
            )));
        }

        let cut = self.len() - n;
        let head = Series {
            key: self.key,
            observations: self.observations[..cut].to_vec(),
        };
        Ok((head, self.observations[cut..].to_vec()))
    }

    /// Consume the series, returning its observations
    pub fn into_observations(self) -> Vec<Observation> {
        self.observations
    }
}

/// Every series of a table, keyed by store and item
///
/// Built once from a combined table and then queried per series.
#[derive(Debug, Clone, Default)]
pub struct SeriesIndex {
    series: BTreeMap<SeriesKey, Series>,
}

impl SeriesIndex {
    /// Group a combined table into sorted series
    pub fn from_observations(observations: Vec<Observation>) -> Result<Self> {
        let mut grouped: BTreeMap<SeriesKey, Vec<Observation>> = BTreeMap::new();
        for observation in observations {
            grouped.entry(observation.key()).or_default().push(observation);
        }

        let series = grouped
            .into_iter()
            .map(|(key, rows)| Series::new(rows).map(|s| (key, s)))
            .collect::<Result<BTreeMap<_, _>>>()?;

        debug!(series = series.len(), "built series index");
        Ok(Self { series })
    }

    /// Look up the series for a key
    pub fn get(&self, key: &SeriesKey) -> Option<&Series> {
        self.series.get(key)
    }

    /// All keys in ascending order
    pub fn keys(&self) -> impl Iterator<Item = &SeriesKey> {
        self.series.keys()
    }

    /// All series in key order
    pub fn iter(&self) -> impl Iterator<Item = &Series> {
        self.series.values()
    }

    /// Number of series
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Check if the index holds no series
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// One CSV record before validation
#[derive(Debug, Deserialize)]
struct RawRecord {
    date: String,
    #[serde(alias = "store_id")]
    store: String,
    #[serde(alias = "item_id")]
    item: String,
    #[serde(default)]
    sales: Option<String>,
}

/// Loader for sales tables
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load observations from a CSV file with `date,store,item,sales` columns
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Observation>> {
        let file = File::open(path.as_ref())?;
        let observations = Self::from_reader(file)?;
        info!(
            path = %path.as_ref().display(),
            rows = observations.len(),
            "loaded sales observations"
        );
        Ok(observations)
    }

    /// Load observations from any CSV source
    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<Observation>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = reader.headers()?.clone();
        let mut observations = Vec::new();

        for record in reader.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let raw: RawRecord = record.deserialize(Some(&headers))?;
            observations.push(Self::parse_record(raw, line)?);
        }

        if observations.is_empty() {
            return Err(ForecastError::DataError("No data found".to_string()));
        }

        Ok(observations)
    }

    fn parse_record(raw: RawRecord, line: u64) -> Result<Observation> {
        let at_line = |e: ForecastError| match e {
            ForecastError::InvalidInput(msg) => {
                ForecastError::InvalidInput(format!("line {}: {}", line, msg))
            }
            other => other,
        };

        let date = parse_date(&raw.date).map_err(at_line)?;
        let key = SeriesKey::parse(&raw.store, &raw.item).map_err(at_line)?;
        let sales = match raw.sales.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(value.parse::<f64>().map_err(|e| {
                ForecastError::InvalidInput(format!(
                    "line {}: Invalid sales '{}': {}",
                    line, value, e
                ))
            })?),
        };

        let observation = Observation {
            date,
            store: key.store,
            item: key.item,
            sales,
        };
        observation.validate().map_err(at_line)?;
        Ok(observation)
    }

    /// Write observations as a `date,store,item,sales` CSV file
    pub fn to_csv<P: AsRef<Path>>(path: P, observations: &[Observation]) -> Result<()> {
        let file = File::create(path)?;
        Self::to_writer(file, observations)
    }

    /// Write observations to any CSV sink
    pub fn to_writer<W: Write>(writer: W, observations: &[Observation]) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        for observation in observations {
            writer.serialize(observation)?;
        }
        writer.flush()?;
        Ok(())
    }
}
