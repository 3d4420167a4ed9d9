use demand_forecast::metrics::backtest;
use demand_forecast::synthetic::generate_sales;
use demand_forecast::{
    prepare_training_frame, DemandForecaster, ForecastConfig, LinearPredictor, ModelManifest,
    SyntheticConfig,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Demand Forecast: Basic Forecasting Example");
    println!("==========================================\n");

    // Two stores with five items each, one year of daily sales
    let sales = generate_sales(&SyntheticConfig {
        stores: 2,
        items: 5,
        days: 365,
        ..SyntheticConfig::default()
    })?;
    println!("Generated {} observations", sales.len());

    let config = ForecastConfig::default();
    let frame = prepare_training_frame(sales.clone(), &config.features)?;
    println!("Training frame: {} rows, columns {:?}\n", frame.len(), frame.column_names());

    // A hand-weighted linear model standing in for a trained regressor
    let manifest = ModelManifest::new(["lag_7", "lag_28", "rmean_7", "rmean_28"])?;
    let predictor = LinearPredictor::new(0.0, vec![0.2, 0.1, 0.4, 0.3])?;

    let (features, targets) = frame.design_matrix(&manifest)?;
    println!(
        "Design matrix: {} rows x {} features, {} targets\n",
        features.len(),
        manifest.len(),
        targets.len()
    );

    let forecaster = DemandForecaster::new(sales, predictor, manifest, config)?;

    let forecast = forecaster.forecast(1, 3, 14)?;
    println!("Forecast for store 1 item 3:");
    for point in forecast.points() {
        println!("  {}: {:.1}", point.date, point.forecast);
    }

    let history = forecaster.history(forecast.key())?;
    let result = backtest(
        &LinearPredictor::new(0.0, vec![0.2, 0.1, 0.4, 0.3])?,
        forecaster.manifest(),
        history,
        28,
        forecaster.config(),
    )?;
    println!("\nBacktest over the last 28 days:\n{}", result.accuracy);

    println!("95% prediction intervals from the backtest RMSE:");
    let intervals = forecast.prediction_intervals(result.accuracy.rmse, 0.95)?;
    for (point, (lower, upper)) in forecast.points().iter().zip(intervals) {
        println!("  {}: ({:.1}, {:.1})", point.date, lower, upper);
    }

    Ok(())
}
