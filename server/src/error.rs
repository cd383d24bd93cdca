use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::forecast::ForecastError;

#[derive(Debug, Error)]
pub(crate) enum ServiceError {
    #[error("missing query parameter `coin`")]
    MissingCoin,
    #[error("invalid coin symbol `{0}`")]
    InvalidCoin(String),
    #[error("too many requests")]
    RateLimited,
    #[error("coinbase responded with status {0}")]
    Upstream(u16),
    #[error("coinbase request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("cannot write store: {0}")]
    Store(#[from] std::io::Error),
    #[error("cannot forecast: {0}")]
    Forecast(#[from] ForecastError),
    #[error("forecast task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ServiceError {
    fn status(&self) -> StatusCode {
        match self {
            ServiceError::MissingCoin | ServiceError::InvalidCoin(_) => StatusCode::BAD_REQUEST,
            ServiceError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ServiceError::Upstream(_) | ServiceError::Request(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Forecast(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Store(_) | ServiceError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, self.to_string()).into_response()
    }
}
