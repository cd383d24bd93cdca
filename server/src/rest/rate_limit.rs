use std::{
    collections::{HashMap, VecDeque},
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;

use crate::{config::RateLimit, error::ServiceError};

/// Sliding window limiter keyed by client address.
#[derive(Clone)]
pub(crate) struct RateLimiter {
    limits: Arc<Vec<RateLimit>>,
    requests: Arc<Mutex<Requests>>,
}

#[derive(Default)]
struct Requests {
    clients: HashMap<IpAddr, VecDeque<Instant>>,
    last_sweep: Option<Instant>,
}

impl Requests {
    /// Forgets clients whose newest request is older than `retention`, at most once per `retention`.
    fn sweep(&mut self, now: Instant, retention: Duration) {
        let due = self
            .last_sweep
            .map_or(true, |last| now.duration_since(last) >= retention);
        if due {
            self.clients.retain(|_, history| {
                history
                    .back()
                    .is_some_and(|newest| now.duration_since(*newest) < retention)
            });
            self.last_sweep = Some(now);
        }
    }
}

impl RateLimiter {
    pub(crate) fn new(limits: Vec<RateLimit>) -> Self {
        RateLimiter {
            limits: Arc::new(limits),
            requests: Default::default(),
        }
    }

    fn retention(&self) -> Duration {
        self.limits
            .iter()
            .map(RateLimit::period)
            .max()
            .unwrap_or_default()
    }

    /// Records and admits the request unless one of the windows is full.
    pub(crate) async fn check(&self, client: IpAddr, now: Instant) -> bool {
        let retention = self.retention();
        let mut requests = self.requests.lock().await;
        requests.sweep(now, retention);
        let history = requests.clients.entry(client).or_default();

        while let Some(oldest) = history.front() {
            if now.duration_since(*oldest) >= retention {
                history.pop_front();
            } else {
                break;
            }
        }

        let admitted = self.limits.iter().all(|limit| {
            let in_window = history
                .iter()
                .rev()
                .take_while(|at| now.duration_since(**at) < limit.period())
                .count();
            in_window < limit.requests
        });
        if admitted {
            history.push_back(now);
        }
        admitted
    }

    #[cfg(test)]
    async fn tracked_clients(&self) -> usize {
        self.requests.lock().await.clients.len()
    }
}

pub(crate) async fn limit_requests(
    State(limiter): State<RateLimiter>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let client = connect_info
        .map(|ConnectInfo(address)| address.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if limiter.check(client, Instant::now()).await {
        next.run(request).await
    } else {
        tracing::warn!(%client, "rate limit exceeded");
        ServiceError::RateLimited.into_response()
    }
}
