//! Demand Forecast command line
//!
//! Generates synthetic sales, exports training frames and runs recursive
//! forecasts or backtests for one store and item.

use clap::{Parser, Subcommand};
use demand_forecast::synthetic::generate_sales;
use demand_forecast::{
    prepare_training_frame, DataLoader, DemandForecaster, ForecastConfig, LagMeanPredictor,
    ModelArtifact, ModelManifest, Predictor, SeriesKey, SyntheticConfig,
};
use std::error::Error;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "demand_forecast", version, about = "Per store-item demand forecasting")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write a synthetic sales table
    Generate {
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value_t = 5)]
        stores: u32,
        #[arg(long, default_value_t = 20)]
        items: u32,
        #[arg(long, default_value_t = 730)]
        days: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Build the training frame of a sales table
    Features {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Forecast future daily sales for one store and item
    Forecast {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        store: String,
        #[arg(long)]
        item: String,
        #[arg(long)]
        horizon: String,
        /// Linear model artifact; the lag mean baseline is used without one
        #[arg(long)]
        model: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Also print prediction intervals for this residual standard deviation
        #[arg(long)]
        residual_std: Option<f64>,
    },
    /// Forecast the last days of a series from the days before and score it
    Backtest {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        store: String,
        #[arg(long)]
        item: String,
        #[arg(long, default_value_t = 28)]
        holdout: usize,
        #[arg(long)]
        model: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "demand_forecast=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            output,
            stores,
            items,
            days,
            seed,
        } => {
            let config = SyntheticConfig {
                stores,
                items,
                days,
                seed,
                ..SyntheticConfig::default()
            };
            let observations = generate_sales(&config)?;
            DataLoader::to_csv(&output, &observations)?;
            info!(path = %output.display(), rows = observations.len(), "wrote sales table");
        }
        Commands::Features {
            input,
            output,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let frame = prepare_training_frame(DataLoader::from_csv(&input)?, &config.features)?;
            frame.write_csv(&output)?;
            info!(path = %output.display(), rows = frame.len(), "wrote training frame");
        }
        Commands::Forecast {
            input,
            store,
            item,
            horizon,
            model,
            config,
            residual_std,
        } => {
            let config = load_config(config.as_deref())?;
            let (predictor, manifest) = load_predictor(model.as_deref(), &config)?;
            let forecaster =
                DemandForecaster::new(DataLoader::from_csv(&input)?, predictor, manifest, config)?;
            let forecast = forecaster.forecast_str(&store, &item, &horizon)?;

            let intervals = residual_std
                .map(|std| forecast.prediction_intervals(std, 0.95))
                .transpose()?;

            let mut out = io::stdout().lock();
            match intervals {
                Some(intervals) => {
                    writeln!(out, "date,forecast,lower_95,upper_95")?;
                    for (point, (lower, upper)) in forecast.points().iter().zip(intervals) {
                        writeln!(
                            out,
                            "{},{:.2},{:.2},{:.2}",
                            point.date, point.forecast, lower, upper
                        )?;
                    }
                }
                None => {
                    writeln!(out, "date,forecast")?;
                    for point in forecast.points() {
                        writeln!(out, "{},{:.2}", point.date, point.forecast)?;
                    }
                }
            }
        }
        Commands::Backtest {
            input,
            store,
            item,
            holdout,
            model,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let (predictor, manifest) = load_predictor(model.as_deref(), &config)?;
            let key = SeriesKey::parse(&store, &item)?;
            let forecaster =
                DemandForecaster::new(DataLoader::from_csv(&input)?, predictor, manifest, config)?;
            let result = forecaster.backtest(key.store, key.item, holdout)?;
            print!("{}", result.accuracy);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ForecastConfig, Box<dyn Error>> {
    Ok(match path {
        Some(path) => ForecastConfig::from_json_file(path)?,
        None => ForecastConfig::default(),
    })
}

/// Boxed so the linear artifact and the baseline share one forecaster type
struct BoxedPredictor(Box<dyn Predictor>);

impl Predictor for BoxedPredictor {
    fn predict(&self, features: &demand_forecast::FeatureVector) -> demand_forecast::Result<f64> {
        self.0.predict(features)
    }
}

fn load_predictor(
    model: Option<&Path>,
    config: &ForecastConfig,
) -> Result<(BoxedPredictor, ModelManifest), Box<dyn Error>> {
    match model {
        Some(path) => {
            let (predictor, manifest) = ModelArtifact::from_json_file(path)?.into_parts()?;
            Ok((BoxedPredictor(Box::new(predictor)), manifest))
        }
        None => {
            let baseline = LagMeanPredictor::from_config(&config.features)?;
            let manifest = ModelManifest::new(baseline.columns().to_vec())?;
            Ok((BoxedPredictor(Box::new(baseline)), manifest))
        }
    }
}
