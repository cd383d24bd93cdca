use std::net::SocketAddr;

use axum::{
    extract::{FromRef, Query, State},
    middleware,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    business::{daily_price_history, forecast_history, forecast_results},
    coinbase::Coinbase,
    config::Configuration,
    data::{Candle, PriceStore},
    error::ServiceError,
    forecast::{ForecastSummary, PricePoint, DEFAULT_ORDER},
    predictions::{Prediction, PredictionStore, PredictionWithActual},
};

use self::rate_limit::{limit_requests, RateLimiter};

mod rate_limit;

#[derive(Clone)]
pub(crate) struct AppState {
    prices: PriceStore,
    predictions: PredictionStore,
    exchange: Coinbase,
    limiter: RateLimiter,
}

impl AppState {
    pub(crate) fn new(
        prices: PriceStore,
        predictions: PredictionStore,
        exchange: Coinbase,
        config: &Configuration,
    ) -> Self {
        AppState {
            prices,
            predictions,
            exchange,
            limiter: RateLimiter::new(config.rate_limits.clone()),
        }
    }
}

impl FromRef<AppState> for PriceStore {
    fn from_ref(input: &AppState) -> Self {
        input.prices.clone()
    }
}

impl FromRef<AppState> for PredictionStore {
    fn from_ref(input: &AppState) -> Self {
        input.predictions.clone()
    }
}

impl FromRef<AppState> for Coinbase {
    fn from_ref(input: &AppState) -> Self {
        input.exchange.clone()
    }
}

impl FromRef<AppState> for RateLimiter {
    fn from_ref(input: &AppState) -> Self {
        input.limiter.clone()
    }
}

pub(crate) fn router(app_state: AppState, config: &Configuration) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/daily-price-hist", get(daily_price_hist))
        .route("/forecast-timeseries", get(forecast_timeseries))
        .route("/forecast-results", get(forecast_result))
        .route("/forecast-performance", get(forecast_performance))
        .route("/latest-forecasts", get(latest_forecasts))
        .route_layer(middleware::from_fn_with_state(
            app_state.limiter.clone(),
            limit_requests,
        ))
        .fallback_service(ServeDir::new(&config.frontend_location))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

pub(crate) async fn serve_rest_endpoint(
    app_state: AppState,
    config: &Configuration,
) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(config.listen_address).await?;
    tracing::info!(address = %config.listen_address, "listening");

    let app = router(app_state, config);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}

async fn status() -> &'static str {
    "ok"
}

#[derive(Deserialize)]
struct CoinQuery {
    coin: Option<String>,
}

fn validate_coin(coin: Option<String>) -> Result<String, ServiceError> {
    let coin = coin.ok_or(ServiceError::MissingCoin)?;
    let valid = (2..=10).contains(&coin.len()) && coin.chars().all(|c| c.is_ascii_alphanumeric());
    if valid {
        Ok(coin.to_ascii_uppercase())
    } else {
        Err(ServiceError::InvalidCoin(coin))
    }
}

async fn daily_price_hist(
    State(prices): State<PriceStore>,
    State(exchange): State<Coinbase>,
    Query(query): Query<CoinQuery>,
) -> Result<Json<Vec<Candle>>, ServiceError> {
    let coin = validate_coin(query.coin)?;
    tracing::info!(coin = %coin, "price-hist request");
    let history = daily_price_history(&prices, &exchange, &coin, Utc::now()).await?;
    Ok(Json(history))
}

async fn forecast_timeseries(
    State(prices): State<PriceStore>,
    State(exchange): State<Coinbase>,
    Query(query): Query<CoinQuery>,
) -> Result<Json<Vec<PricePoint>>, ServiceError> {
    let coin = validate_coin(query.coin)?;
    tracing::info!(coin = %coin, "forecast request");
    let series = forecast_history(&prices, &exchange, &coin, Utc::now()).await?;
    Ok(Json(series))
}

async fn forecast_result(
    State(prices): State<PriceStore>,
    State(exchange): State<Coinbase>,
    State(predictions): State<PredictionStore>,
    Query(query): Query<CoinQuery>,
) -> Result<Json<Vec<ForecastSummary>>, ServiceError> {
    let coin = validate_coin(query.coin)?;
    tracing::info!(coin = %coin, "forecast results request");
    let summary = forecast_results(&prices, &exchange, &predictions, &coin, Utc::now()).await?;
    Ok(Json(vec![summary]))
}

async fn forecast_performance(
    State(predictions): State<PredictionStore>,
    Query(query): Query<CoinQuery>,
) -> Result<Json<Vec<PredictionWithActual>>, ServiceError> {
    let coin = validate_coin(query.coin)?;
    Ok(Json(
        predictions.forecasts_with_actual(&coin, DEFAULT_ORDER).await,
    ))
}

async fn latest_forecasts(State(predictions): State<PredictionStore>) -> Json<Vec<Prediction>> {
    Json(predictions.latest_day().await)
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use axum::{
        body::{to_bytes, Body},
        extract::ConnectInfo,
        http::{Request, StatusCode},
    };
    use httpmock::prelude::*;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::config::RateLimit;

    fn configuration(dir: &Path, coinbase_url: String, rate_limits: Vec<RateLimit>) -> Configuration {
        Configuration {
            listen_address: "127.0.0.1:0".parse().unwrap(),
            frontend_location: dir.join("dist"),
            price_log_location: dir.join("prices.log"),
            prediction_log_location: dir.join("predictions.log"),
            service_log_location: None,
            coinbase_url,
            rate_limits,
        }
    }

    async fn app(dir: &Path, coinbase_url: String, rate_limits: Vec<RateLimit>) -> Router {
        let config = configuration(dir, coinbase_url, rate_limits);
        tokio::fs::create_dir_all(&config.frontend_location).await.unwrap();
        tokio::fs::write(
            config.frontend_location.join("index.html"),
            "<div id=\"app\"></div>",
        )
        .await
        .unwrap();

        let prices = PriceStore::try_from_file(config.price_log_location.clone()).await;
        let predictions =
            PredictionStore::try_from_file(config.prediction_log_location.clone()).await;
        let exchange = Coinbase::new(&config.coinbase_url).unwrap();
        router(AppState::new(prices, predictions, exchange, &config), &config)
    }

    fn get_request(uri: &str) -> Request<Body> {
        let mut request = Request::get(uri).body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));
        request
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn relaxed_limits() -> Vec<RateLimit> {
        vec![RateLimit {
            requests: 100,
            period_secs: 60,
        }]
    }

    #[tokio::test]
    pub async fn reports_status() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), "http://127.0.0.1:1".to_string(), relaxed_limits()).await;

        let response = app.oneshot(get_request("/status")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "ok");
    }

    #[tokio::test]
    pub async fn serves_frontend() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), "http://127.0.0.1:1".to_string(), relaxed_limits()).await;

        let response = app.oneshot(get_request("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("id=\"app\""));
    }

    #[tokio::test]
    pub async fn rejects_missing_and_invalid_coins() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), "http://127.0.0.1:1".to_string(), relaxed_limits()).await;

        for uri in [
            "/daily-price-hist",
            "/daily-price-hist?coin=B",
            "/daily-price-hist?coin=BTC%27%3B",
        ] {
            let response = app.clone().oneshot(get_request(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        }
    }

    #[tokio::test]
    pub async fn returns_price_history_records() {
        let dir = tempfile::tempdir().unwrap();
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/products/BTC-USD/candles");
                then.status(200)
                    .json_body(json!([[1672531200, 1.0, 3.0, 1.5, 2.0, 4.0]]));
            })
            .await;
        let app = app(dir.path(), server.base_url(), relaxed_limits()).await;

        let response = app
            .oneshot(get_request("/daily-price-hist?coin=btc"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let records: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(
            records,
            json!([{
                "coin": "BTC",
                "date": 1672531200000i64,
                "open": 1.5,
                "high": 3.0,
                "low": 1.0,
                "close": 2.0,
                "volume": 4.0,
                "vol_fiat": 8.0
            }])
        );
    }

    #[tokio::test]
    pub async fn limits_request_rate() {
        let dir = tempfile::tempdir().unwrap();
        let limits = vec![RateLimit {
            requests: 1,
            period_secs: 60,
        }];
        let app = app(dir.path(), "http://127.0.0.1:1".to_string(), limits).await;

        let first = app.clone().oneshot(get_request("/status")).await.unwrap();
        let second = app.clone().oneshot(get_request("/status")).await.unwrap();
        let frontend = app.oneshot(get_request("/")).await.unwrap();

        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(frontend.status(), StatusCode::OK);
    }

    async fn json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app.clone().oneshot(get_request(uri)).await.unwrap();
        let status = response.status();
        let body = body_text(response).await;
        (status, serde_json::from_str(&body).unwrap_or(serde_json::Value::Null))
    }

    #[tokio::test]
    pub async fn serves_forecasts_and_records_them() {
        let dir = tempfile::tempdir().unwrap();
        let server = MockServer::start_async().await;
        let rows = (0..30)
            .map(|day: i64| {
                let close = 20.0 + (day as f64 * 0.3).cos();
                json!([1672531200 + day * 86400, close, close, close, close, 5.0])
            })
            .collect::<Vec<_>>();
        server
            .mock_async(|when, then| {
                when.method(GET).path("/products/SOL-USD/candles");
                then.status(200).json_body(serde_json::Value::Array(rows));
            })
            .await;
        let app = app(dir.path(), server.base_url(), relaxed_limits()).await;

        let (status, series) = json(&app, "/forecast-timeseries?coin=sol").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(series.as_array().map(Vec::len), Some(37));

        let (status, results) = json(&app, "/forecast-results?coin=SOL").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(results[0]["coin"], "SOL");
        assert_eq!(results[0]["last_close_day"], (1672531200i64 + 29 * 86400) * 1000);

        let (status, latest) = json(&app, "/latest-forecasts").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(latest[0]["coin"], "SOL");
        assert_eq!(latest[0]["p"], 2);
        assert_eq!(latest[0]["next_day_price"], results[0]["next_day_price"]);

        let (status, performance) = json(&app, "/forecast-performance?coin=SOL").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(performance, json!([]));
    }

    #[tokio::test]
    pub async fn reports_unforecastable_history() {
        let dir = tempfile::tempdir().unwrap();
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/products/SOL-USD/candles");
                then.status(200)
                    .json_body(json!([[1672531200, 1.0, 1.0, 1.0, 1.0, 1.0]]));
            })
            .await;
        let app = app(dir.path(), server.base_url(), relaxed_limits()).await;

        let (status, _) = json(&app, "/forecast-results?coin=SOL").await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
