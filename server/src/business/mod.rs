use chrono::{DateTime, Duration, Utc};

use crate::{
    coinbase::Coinbase,
    data::{Candle, PriceStore},
    error::ServiceError,
    forecast::{
        forecast_timeseries, summarize, ForecastError, ForecastSummary, PricePoint, DEFAULT_ORDER,
        FORECAST_DAYS,
    },
    predictions::{Prediction, PredictionStore},
};

pub(crate) fn is_up_to_date(latest: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match latest {
        Some(latest) => latest > now - Duration::days(1),
        None => false,
    }
}

/// History of `coin`, refreshed from the exchange when the store is more than a day behind.
pub(crate) async fn daily_price_history(
    prices: &PriceStore,
    exchange: &Coinbase,
    coin: &str,
    now: DateTime<Utc>,
) -> Result<Vec<Candle>, ServiceError> {
    if is_up_to_date(prices.latest(coin).await, now) {
        tracing::debug!(coin, "price store up to date");
    } else {
        tracing::info!(coin, "price store not up to date");
        match exchange.fetch_daily_candles(coin).await {
            Ok(candles) => {
                let added = prices.put(candles).await?;
                if added == 0 {
                    tracing::warn!(coin, "no new data to add despite calling coinbase for it");
                } else {
                    tracing::info!(coin, added, "added new rows to price store");
                }
            }
            Err(error) => {
                tracing::warn!(coin, %error, "serving stored prices, coinbase unavailable");
            }
        }
    }
    Ok(prices.get(coin).await)
}

/// Price history followed by a week of ARIMA forecasts.
pub(crate) async fn forecast_history(
    prices: &PriceStore,
    exchange: &Coinbase,
    coin: &str,
    now: DateTime<Utc>,
) -> Result<Vec<PricePoint>, ServiceError> {
    let history = daily_price_history(prices, exchange, coin, now).await?;
    let series = tokio::task::spawn_blocking(move || {
        forecast_timeseries(&history, DEFAULT_ORDER, FORECAST_DAYS)
    })
    .await??;
    Ok(series)
}

/// Forecast headline numbers for `coin`; each distinct forecast is recorded.
pub(crate) async fn forecast_results(
    prices: &PriceStore,
    exchange: &Coinbase,
    predictions: &PredictionStore,
    coin: &str,
    now: DateTime<Utc>,
) -> Result<ForecastSummary, ServiceError> {
    let series = forecast_history(prices, exchange, coin, now).await?;
    let summary =
        summarize(coin, &series, FORECAST_DAYS).ok_or(ForecastError::NotEnoughData {
            needed: FORECAST_DAYS + 1,
            got: series.len(),
        })?;

    if predictions
        .save(Prediction::new(&summary, DEFAULT_ORDER))
        .await?
    {
        tracing::info!(coin, day = %summary.last_close_day, "recorded forecast");
    }
    Ok(summary)
}
