use std::{
    net::SocketAddr,
    path::PathBuf,
    time::Duration,
};

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{
    fs::File,
    io::{AsyncReadExt, BufReader},
};

pub(crate) const DEFAULT_COINBASE_URL: &str = "https://api.pro.coinbase.com";

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct Configuration {
    pub(crate) listen_address: SocketAddr,
    pub(crate) frontend_location: PathBuf,
    pub(crate) price_log_location: PathBuf,
    #[serde(default = "default_prediction_log_location")]
    pub(crate) prediction_log_location: PathBuf,
    #[serde(default)]
    pub(crate) service_log_location: Option<PathBuf>,
    #[serde(default = "default_coinbase_url")]
    pub(crate) coinbase_url: String,
    #[serde(default = "default_rate_limits")]
    pub(crate) rate_limits: Vec<RateLimit>,
}

/// At most `requests` per client within `period_secs`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RateLimit {
    pub(crate) requests: usize,
    pub(crate) period_secs: u64,
}

impl RateLimit {
    pub(crate) fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }
}

fn default_coinbase_url() -> String {
    DEFAULT_COINBASE_URL.to_string()
}

fn default_prediction_log_location() -> PathBuf {
    PathBuf::from("crypto-predictions-arima.log")
}

fn default_rate_limits() -> Vec<RateLimit> {
    vec![
        RateLimit {
            requests: 30,
            period_secs: 60,
        },
        RateLimit {
            requests: 300,
            period_secs: 3600,
        },
    ]
}

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("cannot read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub(crate) struct Args {
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,
}

impl Args {
    pub(crate) async fn get_config_file(&self) -> Result<Configuration, ConfigError> {
        let read_error = |source| ConfigError::Read {
            path: self.config.clone(),
            source,
        };
        let config = File::open(&self.config).await.map_err(read_error)?;
        let mut config_file = String::new();
        BufReader::new(config)
            .read_to_string(&mut config_file)
            .await
            .map_err(read_error)?;
        Ok(serde_yaml::from_str::<Configuration>(&config_file)?)
    }
}
