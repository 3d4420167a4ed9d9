use approx::assert_relative_eq;
use chrono::{Days, NaiveDate};
use demand_forecast::features::{build_feature_rows, build_series_features};
use demand_forecast::{prepare_training_frame, FeatureConfig, Observation, Series, SeriesKey};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::io::Read;
use tempfile::NamedTempFile;

fn day(offset: u64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap() + Days::new(offset)
}

fn observations(store: u32, item: u32, sales: impl IntoIterator<Item = f64>) -> Vec<Observation> {
    sales
        .into_iter()
        .enumerate()
        .map(|(i, s)| Observation::new(day(i as u64), store, item, s))
        .collect()
}

fn ramp(days: usize) -> Series {
    Series::new(observations(1, 1, (0..days).map(|i| i as f64))).unwrap()
}

#[test]
fn test_lags_and_means_look_only_backwards() {
    let rows = build_series_features(&ramp(40), &FeatureConfig::default()).unwrap();
    let row = &rows[30];

    assert_eq!(row.value("lag_7"), Some(Some(23.0)));
    assert_eq!(row.value("lag_28"), Some(Some(2.0)));
    // Mean of 23..=29 and of 2..=29
    assert_relative_eq!(row.value("rmean_7").unwrap().unwrap(), 26.0);
    assert_relative_eq!(row.value("rmean_28").unwrap().unwrap(), 15.5);
    assert_eq!(row.value("sales"), Some(Some(30.0)));
}

#[test]
fn test_no_label_leakage() {
    let config = FeatureConfig::default();
    let original = build_series_features(&ramp(40), &config).unwrap();

    let mut changed = ramp(40).into_observations();
    changed[30].sales = Some(1_000.0);
    let changed = build_series_features(&Series::new(changed).unwrap(), &config).unwrap();

    for t in 0..=30 {
        assert_eq!(original[t].lags, changed[t].lags);
        assert_eq!(original[t].rolling_means, changed[t].rolling_means);
    }
    assert_ne!(original[31].rolling_means, changed[31].rolling_means);
}

// Lags are positional: row t needs t >= 28, so an in-series row is complete
// only from the 29th row on, while 28 rows are enough for the row after them
#[rstest]
#[case(28, false)]
#[case(29, true)]
fn test_last_row_complete_once_longest_lag_is_covered(
    #[case] days: usize,
    #[case] complete: bool,
) {
    let rows = build_series_features(&ramp(days), &FeatureConfig::default()).unwrap();
    assert_eq!(rows.last().unwrap().is_complete(), complete);
}

#[rstest]
#[case(27, false)]
#[case(28, true)]
fn test_next_day_row_complete_with_longest_lag_of_history(
    #[case] days: usize,
    #[case] complete: bool,
) {
    let mut rows = observations(1, 1, (0..days).map(|i| i as f64));
    rows.push(Observation::unknown(day(days as u64), SeriesKey::new(1, 1)));

    let features =
        build_series_features(&Series::new(rows).unwrap(), &FeatureConfig::default()).unwrap();
    let next = features.last().unwrap();
    assert_eq!(next.is_complete(), complete);
    if complete {
        assert_eq!(next.value("lag_28"), Some(Some(0.0)));
    }
}

#[test]
fn test_first_row_has_no_lag_or_mean() {
    let rows = build_series_features(&ramp(10), &FeatureConfig::default()).unwrap();
    let first = &rows[0];

    assert!(!first.is_complete());
    assert_eq!(
        first.undefined_columns(),
        vec!["lag_7", "lag_28", "rmean_7", "rmean_28"]
    );
    // A single prior row is enough for a rolling mean
    assert_eq!(rows[1].value("rmean_28"), Some(Some(0.0)));
}

#[test]
fn test_unknown_sales_propagate_as_undefined() {
    let key = SeriesKey::new(1, 1);
    let mut rows = observations(1, 1, (0..12).map(|i| i as f64));
    rows[2] = Observation::unknown(day(2), key);

    let config = FeatureConfig::new(vec![7], vec![3]).unwrap();
    let features = build_series_features(&Series::new(rows).unwrap(), &config).unwrap();

    assert_eq!(features[9].value("lag_7"), Some(None));
    // Window over rows 1..=3 skips the unknown row 2
    assert_relative_eq!(features[4].value("rmean_3").unwrap().unwrap(), 2.0);
    assert_eq!(features[10].value("lag_7"), Some(Some(3.0)));
}

#[test]
fn test_series_never_mix() {
    let config = FeatureConfig::new(vec![1], vec![2]).unwrap();
    let mut table = observations(1, 1, vec![1.0, 2.0, 3.0]);
    table.extend(observations(2, 1, vec![100.0, 200.0, 300.0]));
    table.reverse();

    let rows = build_feature_rows(table, &config).unwrap();
    assert_eq!(rows.len(), 6);

    let second_series: Vec<_> = rows
        .iter()
        .filter(|r| r.observation.store == 2)
        .map(|r| r.value("lag_1").unwrap())
        .collect();
    assert_eq!(second_series, vec![None, Some(100.0), Some(200.0)]);
}

#[test]
fn test_calendar_columns() {
    // 2023-01-02 is a Monday in ISO week 1
    let rows = build_series_features(&ramp(7), &FeatureConfig::default()).unwrap();

    assert_eq!(rows[0].value("dayofweek"), Some(Some(0.0)));
    assert_eq!(rows[6].value("dayofweek"), Some(Some(6.0)));
    assert_eq!(rows[0].value("week"), Some(Some(1.0)));
    assert_eq!(rows[0].value("month"), Some(Some(1.0)));
    assert_eq!(rows[0].value("year"), Some(Some(2023.0)));
    assert_eq!(rows[0].value("store"), Some(Some(1.0)));
    assert_eq!(rows[0].value("lag_14"), None);
}

#[test]
fn test_training_frame_keeps_complete_rows_only() {
    let mut table = observations(1, 1, (0..40).map(|i| i as f64));
    table.extend(observations(1, 2, (0..30).map(|i| i as f64)));

    let frame = prepare_training_frame(table, &FeatureConfig::default()).unwrap();

    // 40 - 28 rows for the first series, 30 - 28 for the second
    assert_eq!(frame.len(), 14);
    assert!(frame.rows().iter().all(|r| r.is_complete()));
    assert_eq!(
        frame.column_names(),
        vec![
            "store", "item", "dayofweek", "week", "month", "year", "lag_7", "lag_28", "rmean_7",
            "rmean_28", "sales"
        ]
    );

    let df = frame.to_dataframe().unwrap();
    assert_eq!(df.height(), 14);
    // Date column plus every named column
    assert_eq!(df.width(), 12);
}

#[test]
fn test_training_frame_too_short_is_empty() {
    let frame =
        prepare_training_frame(observations(3, 3, vec![5.0; 20]), &FeatureConfig::default())
            .unwrap();
    assert!(frame.is_empty());
}

#[test]
fn test_training_frame_to_csv() {
    let frame = prepare_training_frame(
        observations(1, 1, (0..30).map(|i| i as f64)),
        &FeatureConfig::default(),
    )
    .unwrap();

    let mut file = NamedTempFile::new().unwrap();
    frame.write_csv(file.path()).unwrap();

    let mut contents = String::new();
    file.read_to_string(&mut contents).unwrap();
    let mut lines = contents.lines();

    assert!(lines.next().unwrap().starts_with("date,store,item,dayofweek"));
    assert_eq!(lines.count(), 2);
}
