use std::{path::PathBuf, sync::Arc};

use chrono::serde::ts_milliseconds;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    sync::Mutex,
};

use crate::data::constants::PERSIST_DATE_FORMAT;
use crate::forecast::{ForecastSummary, Order};

/// A forecast as it was made on `last_timestamp_reported`.
#[derive(Serialize, Clone, PartialEq, Debug)]
pub(crate) struct Prediction {
    pub(crate) coin: String,
    #[serde(with = "ts_milliseconds")]
    pub(crate) last_timestamp_reported: DateTime<Utc>,
    pub(crate) last_close: f64,
    pub(crate) next_day_price: f64,
    pub(crate) seven_day_price: f64,
    pub(crate) p: usize,
    pub(crate) d: usize,
    pub(crate) q: usize,
}

#[derive(Serialize, Clone, PartialEq, Debug)]
pub(crate) struct PredictionWithActual {
    #[serde(flatten)]
    pub(crate) prediction: Prediction,
    /// Close reported by the following prediction.
    pub(crate) next_day_actual: f64,
}

impl Prediction {
    pub(crate) fn new(summary: &ForecastSummary, order: Order) -> Self {
        Prediction {
            coin: summary.coin.clone(),
            last_timestamp_reported: summary.last_close_day,
            last_close: summary.last_close,
            next_day_price: summary.next_day_price,
            seven_day_price: summary.seven_day_price,
            p: order.p,
            d: order.d,
            q: order.q,
        }
    }

    fn order(&self) -> Order {
        Order {
            p: self.p,
            d: self.d,
            q: self.q,
        }
    }

    fn is_same_forecast(&self, other: &Prediction) -> bool {
        self.coin == other.coin
            && self.last_timestamp_reported == other.last_timestamp_reported
            && self.order() == other.order()
    }

    fn to_log_line(&self) -> String {
        format!(
            "{};{};{};{};{};{};{};{}\n",
            self.coin,
            self.last_timestamp_reported.format(PERSIST_DATE_FORMAT),
            self.last_close,
            self.next_day_price,
            self.seven_day_price,
            self.p,
            self.d,
            self.q
        )
    }

    fn from_log_line(line: &str) -> Option<Self> {
        match line.split(';').collect::<Vec<_>>()[..] {
            [coin, reported, last_close, next_day_price, seven_day_price, p, d, q] => {
                let reported = NaiveDateTime::parse_from_str(reported, PERSIST_DATE_FORMAT).ok()?;
                Some(Prediction {
                    coin: coin.to_string(),
                    last_timestamp_reported: Utc.from_utc_datetime(&reported),
                    last_close: last_close.parse().ok()?,
                    next_day_price: next_day_price.parse().ok()?,
                    seven_day_price: seven_day_price.parse().ok()?,
                    p: p.parse().ok()?,
                    d: d.parse().ok()?,
                    q: q.parse().ok()?,
                })
            }
            _ => None,
        }
    }
}

/// Forecasts made so far, mirrored to an append-only log.
#[derive(Clone)]
pub(crate) struct PredictionStore {
    store: Arc<Mutex<Vec<Prediction>>>,
    log_location: PathBuf,
}

impl PredictionStore {
    /// Records the prediction unless one exists for the same coin, day and order.
    pub(crate) async fn save(&self, prediction: Prediction) -> Result<bool, std::io::Error> {
        let mut store = self.store.lock().await;
        if store.iter().any(|known| known.is_same_forecast(&prediction)) {
            return Ok(false);
        }

        let mut log = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.log_location)
            .await?;
        log.write_all(prediction.to_log_line().as_bytes()).await?;
        log.flush().await?;

        store.push(prediction);
        Ok(true)
    }

    /// Predictions of `coin` by `order` in reporting order, each paired with the close the next one reported.
    pub(crate) async fn forecasts_with_actual(
        &self,
        coin: &str,
        order: Order,
    ) -> Vec<PredictionWithActual> {
        let store = self.store.lock().await;
        let mut forecasts = store
            .iter()
            .filter(|prediction| prediction.coin == coin && prediction.order() == order)
            .cloned()
            .collect::<Vec<_>>();
        forecasts.sort_by(|a, b| a.last_timestamp_reported.cmp(&b.last_timestamp_reported));

        forecasts
            .windows(2)
            .map(|pair| PredictionWithActual {
                prediction: pair[0].clone(),
                next_day_actual: pair[1].last_close,
            })
            .collect()
    }

    /// All predictions made on the most recent reporting day.
    pub(crate) async fn latest_day(&self) -> Vec<Prediction> {
        let store = self.store.lock().await;
        let latest = store
            .iter()
            .map(|prediction| prediction.last_timestamp_reported)
            .max();
        store
            .iter()
            .filter(|prediction| Some(prediction.last_timestamp_reported) == latest)
            .cloned()
            .collect()
    }

    pub(crate) async fn try_from_file(log_location: PathBuf) -> Self {
        let mut predictions = Vec::new();
        if let Ok(data) = File::open(&log_location).await {
            let mut rdr = BufReader::new(data).lines();
            while let Ok(Some(line)) = rdr.next_line().await {
                match Prediction::from_log_line(&line) {
                    Some(prediction) => predictions.push(prediction),
                    None => tracing::warn!(line = %line, "skipping unreadable prediction log line"),
                }
            }
        }

        PredictionStore {
            store: Arc::new(Mutex::new(predictions)),
            log_location,
        }
    }
}
