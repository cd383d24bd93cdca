use chrono::{TimeZone, Utc};

use crate::{data::Candle, error::ServiceError};

const DAILY_GRANULARITY_SECS: u32 = 86400;

/// `[unix, low, high, open, close, volume]` as returned by the candles endpoint.
type RawCandle = (i64, f64, f64, f64, f64, f64);

#[derive(Clone)]
pub(crate) struct Coinbase {
    client: reqwest::Client,
    base_url: String,
}

impl Coinbase {
    pub(crate) fn new(base_url: &str) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("crypto-opportunity/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Coinbase {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub(crate) async fn fetch_daily_candles(&self, coin: &str) -> Result<Vec<Candle>, ServiceError> {
        tracing::info!(coin, "fetching daily candles from coinbase");
        let url = format!("{}/products/{}-USD/candles", self.base_url, coin);
        let response = self
            .client
            .get(url)
            .query(&[("granularity", DAILY_GRANULARITY_SECS)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Upstream(status.as_u16()));
        }

        let rows = response.json::<Vec<RawCandle>>().await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| to_candle(coin, row))
            .collect())
    }
}

fn to_candle(coin: &str, (unix, low, high, open, close, volume): RawCandle) -> Option<Candle> {
    let date = Utc.timestamp_opt(unix, 0).single()?;
    Some(Candle {
        coin: coin.to_string(),
        date,
        open,
        high,
        low,
        close,
        volume,
        vol_fiat: volume * close,
    })
}
