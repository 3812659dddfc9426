use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

use crate::state::AppState;

/// Sliding-window request counter per client IP
#[derive(Clone)]
pub struct RateLimiter {
    /// Map of IP -> request timestamps inside the current window
    requests: Arc<Mutex<HashMap<IpAddr, Vec<Instant>>>>,
    last_cleanup: Arc<Mutex<Instant>>,
    cleanup_interval: Duration,
    /// Requests allowed per second on API routes
    per_second: usize,
}

impl RateLimiter {
    pub fn new(per_second: usize) -> Self {
        Self {
            requests: Arc::new(Mutex::new(HashMap::new())),
            last_cleanup: Arc::new(Mutex::new(Instant::now())),
            cleanup_interval: Duration::from_secs(60),
            per_second: per_second.max(1),
        }
    }

    /// Record a request from `ip` if it fits in `limit` per `window`
    ///
    /// # Returns
    ///
    /// False if the limit is exceeded
    pub async fn is_allowed(&self, ip: IpAddr, limit: usize, window: Duration) -> bool {
        let now = Instant::now();
        let cutoff = now.checked_sub(window).unwrap_or(now);

        let mut requests = self.requests.lock().await;
        let timestamps = requests.entry(ip).or_default();

        timestamps.retain(|&ts| ts > cutoff);

        if timestamps.len() >= limit {
            return false;
        }

        timestamps.push(now);
        true
    }

    /// Forget IPs that have gone quiet
    async fn cleanup_old_entries(&self) {
        let now = Instant::now();

        let mut last_cleanup = self.last_cleanup.lock().await;
        if now.duration_since(*last_cleanup) < self.cleanup_interval {
            return;
        }

        let cutoff = now.checked_sub(self.cleanup_interval).unwrap_or(now);
        let mut requests = self.requests.lock().await;
        requests.retain(|_, timestamps| timestamps.iter().any(|&ts| ts >= cutoff));

        *last_cleanup = now;
    }

    /// Per-second limit for `path`, or `None` to skip limiting
    fn limit_for(&self, path: &str) -> Option<usize> {
        // Long-lived sockets are limited by their own message handling
        if path.starts_with("/ws") {
            return None;
        }

        if path == "/health" || path == "/ping" {
            return Some(10);
        }

        Some(self.per_second)
    }
}

/// Reject requests over the per-IP limit with 429
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    let limiter = &state.rate_limiter;
    let Some(limit) = limiter.limit_for(req.uri().path()) else {
        return next.run(req).await;
    };

    if !limiter.is_allowed(ip, limit, Duration::from_secs(1)).await {
        tracing::debug!(%ip, path = %req.uri().path(), "rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": "RATE_LIMITED",
                "message": "Rate limit exceeded. Please try again later."
            })),
        )
            .into_response();
    }

    limiter.cleanup_old_entries().await;

    next.run(req).await
}
