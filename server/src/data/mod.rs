use std::{collections::HashMap, path::PathBuf, sync::Arc};

use chrono::serde::ts_milliseconds;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    sync::Mutex,
};

/// One day of exchange data for a coin.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub(crate) struct Candle {
    pub(crate) coin: String,
    #[serde(with = "ts_milliseconds")]
    pub(crate) date: DateTime<Utc>,
    pub(crate) open: f64,
    pub(crate) high: f64,
    pub(crate) low: f64,
    pub(crate) close: f64,
    pub(crate) volume: f64,
    pub(crate) vol_fiat: f64,
}

impl Candle {
    fn to_log_line(&self) -> String {
        format!(
            "{};{};{};{};{};{};{};{}\n",
            self.coin,
            self.date.format(constants::PERSIST_DATE_FORMAT),
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
            self.vol_fiat
        )
    }

    fn from_log_line(line: &str) -> Option<Self> {
        match line.split(';').collect::<Vec<_>>()[..] {
            [coin, date, open, high, low, close, volume, vol_fiat] => {
                let date =
                    NaiveDateTime::parse_from_str(date, constants::PERSIST_DATE_FORMAT).ok()?;
                Some(Candle {
                    coin: coin.to_string(),
                    date: Utc.from_utc_datetime(&date),
                    open: open.parse().ok()?,
                    high: high.parse().ok()?,
                    low: low.parse().ok()?,
                    close: close.parse().ok()?,
                    volume: volume.parse().ok()?,
                    vol_fiat: vol_fiat.parse().ok()?,
                })
            }
            _ => None,
        }
    }
}

/// Per-coin price history, kept sorted by date and mirrored to an append-only log.
#[derive(Clone)]
pub(crate) struct PriceStore {
    store: Arc<Mutex<HashMap<String, Vec<Candle>>>>,
    log_location: PathBuf,
}

pub(crate) mod constants {
    pub(crate) const PERSIST_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
}

impl PriceStore {
    pub(crate) async fn get(&self, coin: &str) -> Vec<Candle> {
        let store = self.store.lock().await;
        store.get(coin).cloned().unwrap_or_default()
    }

    pub(crate) async fn latest(&self, coin: &str) -> Option<DateTime<Utc>> {
        let store = self.store.lock().await;
        store
            .get(coin)
            .and_then(|candles| candles.last())
            .map(|candle| candle.date)
    }

    /// Adds the candles newer than what is stored for their coin and returns how many were added.
    /// Nothing is kept in memory unless it was written to the log first.
    pub(crate) async fn put(&self, mut candles: Vec<Candle>) -> Result<usize, std::io::Error> {
        candles.sort_by(|a, b| a.date.cmp(&b.date));

        let mut store = self.store.lock().await;
        let mut latest = HashMap::<String, DateTime<Utc>>::new();
        let mut added = Vec::new();
        for candle in candles {
            let newest = latest.get(&candle.coin).copied().or_else(|| {
                store
                    .get(&candle.coin)
                    .and_then(|history| history.last())
                    .map(|last| last.date)
            });
            if newest.map_or(true, |newest| candle.date > newest) {
                latest.insert(candle.coin.clone(), candle.date);
                added.push(candle);
            }
        }

        if added.is_empty() {
            return Ok(0);
        }

        let mut log = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.log_location)
            .await?;
        let lines = added.iter().map(Candle::to_log_line).collect::<String>();
        log.write_all(lines.as_bytes()).await?;
        log.flush().await?;

        let count = added.len();
        for candle in added {
            store.entry(candle.coin.clone()).or_default().push(candle);
        }
        Ok(count)
    }

    pub(crate) async fn try_from_file(log_location: PathBuf) -> Self {
        let price_store = PriceStore {
            store: Default::default(),
            log_location,
        };

        let mut candles = Vec::new();
        if let Ok(data) = File::open(&price_store.log_location).await {
            let mut rdr = BufReader::new(data).lines();
            while let Ok(Some(line)) = rdr.next_line().await {
                match Candle::from_log_line(&line) {
                    Some(candle) => candles.push(candle),
                    None => tracing::warn!(line = %line, "skipping unreadable price log line"),
                }
            }
        }
        candles.sort_by(|a, b| a.date.cmp(&b.date));

        {
            let mut store = price_store.store.lock().await;
            for candle in candles {
                let history = store.entry(candle.coin.clone()).or_default();
                if history.last().map_or(true, |latest| candle.date > latest.date) {
                    history.push(candle);
                }
            }
        }
        price_store
    }
}
