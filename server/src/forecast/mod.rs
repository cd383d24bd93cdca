use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::Candle;

use self::optimize::nelder_mead;

mod optimize;

pub(crate) const FORECAST_DAYS: usize = 7;

/// Observations required on top of `p + d + q` before a model is fitted.
const MIN_EXTRA_OBSERVATIONS: usize = 10;

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct Order {
    pub(crate) p: usize,
    pub(crate) d: usize,
    pub(crate) q: usize,
}

pub(crate) const DEFAULT_ORDER: Order = Order { p: 2, d: 1, q: 2 };

#[derive(Debug, Error, PartialEq)]
pub(crate) enum ForecastError {
    #[error("need at least {needed} daily closes, got {got}")]
    NotEnoughData { needed: usize, got: usize },
    #[error("closing prices must be positive")]
    NonPositivePrice,
}

/// ARIMA(p, d, q) without constant, fitted by conditional sum of squares.
#[derive(Debug)]
pub(crate) struct Arima {
    order: Order,
    phi: Vec<f64>,
    theta: Vec<f64>,
    /// `levels[k]` is the series differenced `k` times.
    levels: Vec<Vec<f64>>,
    residuals: Vec<f64>,
}

impl Arima {
    pub(crate) fn fit(series: &[f64], order: Order) -> Result<Self, ForecastError> {
        let needed = order.p + order.d + order.q + MIN_EXTRA_OBSERVATIONS;
        if series.len() < needed {
            return Err(ForecastError::NotEnoughData {
                needed,
                got: series.len(),
            });
        }

        let mut levels = vec![series.to_vec()];
        for _ in 0..order.d {
            let next = difference(levels.last().map(Vec::as_slice).unwrap_or_default());
            levels.push(next);
        }
        let w = levels[order.d].clone();

        let objective = |params: &[f64]| {
            let (phi, theta) = params.split_at(order.p);
            if !is_admissible(phi) || !is_admissible(theta) {
                return f64::INFINITY;
            }
            residuals(&w, phi, theta)
                .iter()
                .skip(order.p)
                .map(|e| e * e)
                .sum::<f64>()
        };
        let params = nelder_mead(objective, &vec![0.0; order.p + order.q], 0.1);
        let (phi, theta) = params.split_at(order.p);

        Ok(Arima {
            order,
            residuals: residuals(&w, phi, theta),
            phi: phi.to_vec(),
            theta: theta.to_vec(),
            levels,
        })
    }

    pub(crate) fn forecast(&self, steps: usize) -> Vec<f64> {
        let observed = self.levels[self.order.d].len();
        let mut values = self.levels[self.order.d].clone();
        let mut errors = self.residuals.clone();
        for _ in 0..steps {
            let t = values.len();
            let ar = self
                .phi
                .iter()
                .enumerate()
                .map(|(i, phi)| phi * lagged(&values, t, i + 1))
                .sum::<f64>();
            let ma = self
                .theta
                .iter()
                .enumerate()
                .map(|(j, theta)| theta * lagged(&errors, t, j + 1))
                .sum::<f64>();
            values.push(ar + ma);
            errors.push(0.0);
        }

        let mut forecast = values.split_off(observed);
        for level in self.levels[..self.order.d].iter().rev() {
            let mut last = level.last().copied().unwrap_or_default();
            forecast = forecast
                .iter()
                .map(|step| {
                    last += step;
                    last
                })
                .collect();
        }
        forecast
    }
}

fn difference(series: &[f64]) -> Vec<f64> {
    series.windows(2).map(|pair| pair[1] - pair[0]).collect()
}

fn lagged(series: &[f64], t: usize, lag: usize) -> f64 {
    t.checked_sub(lag)
        .and_then(|i| series.get(i))
        .copied()
        .unwrap_or_default()
}

/// Sufficient for stationarity (AR side) and invertibility (MA side).
fn is_admissible(coefficients: &[f64]) -> bool {
    coefficients.iter().map(|c| c.abs()).sum::<f64>() < 1.0
}

fn residuals(w: &[f64], phi: &[f64], theta: &[f64]) -> Vec<f64> {
    let mut errors = vec![0.0; w.len()];
    for t in phi.len()..w.len() {
        let ar = phi
            .iter()
            .enumerate()
            .map(|(i, phi)| phi * w[t - i - 1])
            .sum::<f64>();
        let ma = theta
            .iter()
            .enumerate()
            .map(|(j, theta)| theta * lagged(&errors, t, j + 1))
            .sum::<f64>();
        errors[t] = w[t] - ar - ma;
    }
    errors
}

#[derive(Serialize, Clone, PartialEq, Debug)]
pub(crate) struct PricePoint {
    #[serde(with = "ts_milliseconds")]
    pub(crate) date: DateTime<Utc>,
    pub(crate) close: f64,
}

#[derive(Serialize, Clone, PartialEq, Debug)]
pub(crate) struct ForecastSummary {
    pub(crate) coin: String,
    pub(crate) last_close: f64,
    #[serde(with = "ts_milliseconds")]
    pub(crate) last_close_day: DateTime<Utc>,
    pub(crate) next_day_price: f64,
    pub(crate) seven_day_price: f64,
}

/// Closing history followed by `days` daily forecasts, modelled on log prices.
pub(crate) fn forecast_timeseries(
    history: &[Candle],
    order: Order,
    days: usize,
) -> Result<Vec<PricePoint>, ForecastError> {
    if history.iter().any(|candle| candle.close <= 0.0) {
        return Err(ForecastError::NonPositivePrice);
    }
    let log_close = history
        .iter()
        .map(|candle| candle.close.ln())
        .collect::<Vec<_>>();
    let model = Arima::fit(&log_close, order)?;

    let last_day = history
        .last()
        .map(|candle| candle.date)
        .unwrap_or_else(Utc::now);
    let actual = history.iter().map(|candle| PricePoint {
        date: candle.date,
        close: candle.close,
    });
    let predicted = model
        .forecast(days)
        .into_iter()
        .enumerate()
        .map(|(i, log_close)| PricePoint {
            date: last_day + Duration::days(i as i64 + 1),
            close: log_close.exp(),
        });
    Ok(actual.chain(predicted).collect())
}

/// Reads the last actual close and the first and last forecast off a `forecast_timeseries` result.
pub(crate) fn summarize(coin: &str, series: &[PricePoint], days: usize) -> Option<ForecastSummary> {
    let last_actual = series.len().checked_sub(days + 1)?;
    if days == 0 {
        return None;
    }
    Some(ForecastSummary {
        coin: coin.to_string(),
        last_close: series[last_actual].close,
        last_close_day: series[last_actual].date,
        next_day_price: series[last_actual + 1].close,
        seven_day_price: series[series.len() - 1].close,
    })
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;
    use crate::data::test::candle;

    /// Uniform noise in [-0.5, 0.5) from a fixed LCG.
    fn noise(count: usize) -> Vec<f64> {
        let mut state: u64 = 42;
        (0..count)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5
            })
            .collect()
    }

    #[test]
    pub fn differences_series() {
        assert_eq!(difference(&[1.0, 3.0, 6.0]), vec![2.0, 3.0]);
        assert!(difference(&[1.0]).is_empty());
    }

    #[test]
    pub fn estimates_autoregressive_coefficient() {
        let mut level = 0.0;
        let mut change = 0.0;
        let series = noise(400)
            .into_iter()
            .map(|e| {
                change = 0.6 * change + e;
                level += change;
                level
            })
            .collect::<Vec<_>>();

        let model = Arima::fit(&series, Order { p: 1, d: 1, q: 0 }).unwrap();

        assert!((model.phi[0] - 0.6).abs() < 0.15, "{:?}", model.phi);
    }

    #[test]
    pub fn forecast_stays_near_oscillating_level() {
        let series = (0..60)
            .map(|t| 5.0 + if t % 2 == 0 { 0.01 } else { 0.0 })
            .collect::<Vec<_>>();

        let model = Arima::fit(&series, DEFAULT_ORDER).unwrap();
        let forecast = model.forecast(FORECAST_DAYS);

        assert_eq!(forecast.len(), FORECAST_DAYS);
        for value in forecast {
            assert!((value - 5.005).abs() < 0.02, "{value}");
        }
    }

    #[test]
    pub fn undifferences_constant_step() {
        let model = Arima {
            order: Order { p: 0, d: 1, q: 0 },
            phi: vec![],
            theta: vec![],
            levels: vec![vec![1.0, 2.0, 3.0], vec![1.0, 1.0]],
            residuals: vec![0.0, 0.0],
        };
        assert_eq!(model.forecast(2), vec![3.0, 3.0]);
    }

    #[test]
    pub fn rejects_short_history() {
        let result = Arima::fit(&[1.0; 5], DEFAULT_ORDER);
        assert_eq!(
            result.err(),
            Some(ForecastError::NotEnoughData { needed: 15, got: 5 })
        );
    }

    #[test]
    pub fn rejects_non_positive_prices() {
        let t_1 = Utc.with_ymd_and_hms(2023, 01, 01, 0, 0, 0).unwrap();
        let result = forecast_timeseries(&[candle("BTC", t_1, 0.0)], DEFAULT_ORDER, 7);
        assert_eq!(result.err(), Some(ForecastError::NonPositivePrice));
    }

    #[test]
    pub fn appends_daily_forecasts_to_history() {
        let t_0 = Utc.with_ymd_and_hms(2023, 01, 01, 0, 0, 0).unwrap();
        let history = noise(40)
            .into_iter()
            .enumerate()
            .map(|(day, e)| candle("BTC", t_0 + Duration::days(day as i64), 100.0 + e))
            .collect::<Vec<_>>();

        let series = forecast_timeseries(&history, DEFAULT_ORDER, FORECAST_DAYS).unwrap();

        assert_eq!(series.len(), 47);
        for (point, candle) in series.iter().zip(&history) {
            assert_eq!(point.date, candle.date);
            assert_eq!(point.close, candle.close);
        }
        let last_day = history[39].date;
        for (i, point) in series[40..].iter().enumerate() {
            assert_eq!(point.date, last_day + Duration::days(i as i64 + 1));
            assert!(point.close > 90.0 && point.close < 110.0, "{}", point.close);
        }
    }

    #[test]
    pub fn summarizes_forecast() {
        let t_0 = Utc.with_ymd_and_hms(2023, 01, 01, 0, 0, 0).unwrap();
        let series = (0..10)
            .map(|day| PricePoint {
                date: t_0 + Duration::days(day),
                close: day as f64,
            })
            .collect::<Vec<_>>();

        let summary = summarize("BTC", &series, 7).unwrap();

        assert_eq!(
            summary,
            ForecastSummary {
                coin: "BTC".to_string(),
                last_close: 2.0,
                last_close_day: t_0 + Duration::days(2),
                next_day_price: 3.0,
                seven_day_price: 9.0,
            }
        );
        assert_eq!(summarize("BTC", &series[..7], 7), None);
    }
}
