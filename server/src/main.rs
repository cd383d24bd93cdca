use std::process::ExitCode;

use clap::Parser;

use crate::coinbase::Coinbase;
use crate::config::Args;
use crate::data::PriceStore;
use crate::logging::init_logging;
use crate::predictions::PredictionStore;
use crate::rest::{serve_rest_endpoint, AppState};

mod business;
mod coinbase;
mod config;
mod data;
mod error;
mod forecast;
mod logging;
mod predictions;
mod rest;

#[tokio::main(worker_threads = 2)]
async fn main() -> ExitCode {
    let args = Args::parse();
    let config = match args.get_config_file().await {
        Ok(config) => config,
        Err(error) => {
            eprintln!("{error}");
            return ExitCode::FAILURE;
        }
    };
    let _log_guard = init_logging(config.service_log_location.as_deref());

    let prices = PriceStore::try_from_file(config.price_log_location.clone()).await;
    let predictions = PredictionStore::try_from_file(config.prediction_log_location.clone()).await;
    let exchange = match Coinbase::new(&config.coinbase_url) {
        Ok(exchange) => exchange,
        Err(error) => {
            tracing::error!(%error, "cannot create coinbase client");
            return ExitCode::FAILURE;
        }
    };

    let app_state = AppState::new(prices, predictions, exchange, &config);
    if let Err(error) = serve_rest_endpoint(app_state, &config).await {
        tracing::error!(%error, "server stopped");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
