//! Per-client throttling of score submissions.
//!
//! Every client gets a fixed window of one period (a minute in production)
//! holding `limit` submissions. The window opens on the client's first
//! request and resets once the period has elapsed. Clients are keyed by the
//! TCP peer address; forwarding headers are only consulted when the server
//! is configured to trust the proxy in front of it.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, State},
    http::{header::RETRY_AFTER, HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::ServerError;

const MINUTE: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
struct Window {
    opened: Instant,
    used: u32,
}

#[derive(Clone)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<IpAddr, Window>>>,
    limit: u32,
    period: Duration,
    trust_proxy_headers: bool,
}

impl RateLimiter {
    pub fn new(limit: u32, period: Duration) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            limit: limit.max(1),
            period,
            trust_proxy_headers: false,
        }
    }

    pub fn per_minute(limit: u32) -> Self {
        Self::new(limit, MINUTE)
    }

    /// Key clients by `X-Forwarded-For` / `X-Real-IP` when present.
    pub fn trust_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }

    /// Count one submission for `client`. On rejection, returns how long
    /// until its window resets.
    pub async fn acquire(&self, client: IpAddr) -> Result<(), Duration> {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let window = windows.entry(client).or_insert(Window {
            opened: now,
            used: 0,
        });

        let elapsed = now.duration_since(window.opened);
        if elapsed >= self.period {
            *window = Window {
                opened: now,
                used: 0,
            };
        }

        if window.used < self.limit {
            window.used += 1;
            Ok(())
        } else {
            Err(self.period.saturating_sub(now.duration_since(window.opened)))
        }
    }

    /// Drop windows that have already expired.
    pub async fn purge_expired(&self) {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let before = windows.len();
        windows.retain(|_, w| now.duration_since(w.opened) < self.period);
        debug!(removed = before - windows.len(), "purged expired rate limit windows");
    }

    fn client_of<B>(&self, req: &Request<B>) -> Option<IpAddr> {
        if self.trust_proxy_headers {
            if let Some(ip) = forwarded_client(req.headers()) {
                return Some(ip);
            }
        }
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::per_minute(arcade_shared::constants::DEFAULT_RATE_LIMIT_PER_MINUTE)
    }
}

/// First hop of `X-Forwarded-For`, else `X-Real-IP`.
fn forwarded_client(headers: &HeaderMap) -> Option<IpAddr> {
    let first_hop = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse().ok());

    first_hop.or_else(|| {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|ip| ip.trim().parse().ok())
    })
}

pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(client) = limiter.client_of(&req) else {
        debug!("no client address, skipping rate limit");
        return next.run(req).await;
    };

    if let Err(retry_after) = limiter.acquire(client).await {
        let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
        warn!(client = %client, retry_after_secs = secs, "submission rate limit exceeded");

        let mut response = ServerError::RateLimited.into_response();
        response
            .headers_mut()
            .insert(RETRY_AFTER, HeaderValue::from(secs.max(1)));
        return response;
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_peer(peer: [u8; 4]) -> Request<()> {
        let mut req = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((peer, 40_000))));
        req
    }

    #[tokio::test]
    async fn test_window_allows_limit_then_rejects() {
        let limiter = RateLimiter::per_minute(3);
        let ip: IpAddr = "127.0.0.1".parse().unwrap();

        for _ in 0..3 {
            assert!(limiter.acquire(ip).await.is_ok());
        }

        let retry = limiter.acquire(ip).await.unwrap_err();
        assert!(retry <= MINUTE);
        assert!(retry > Duration::from_secs(55));
    }

    #[tokio::test]
    async fn test_window_resets_after_period() {
        let limiter = RateLimiter::new(1, Duration::from_millis(50));
        let ip: IpAddr = "10.0.0.1".parse().unwrap();

        assert!(limiter.acquire(ip).await.is_ok());
        assert!(limiter.acquire(ip).await.is_err());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(limiter.acquire(ip).await.is_ok());
    }

    #[tokio::test]
    async fn test_clients_counted_separately() {
        let limiter = RateLimiter::per_minute(1);
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(limiter.acquire(a).await.is_ok());
        assert!(limiter.acquire(a).await.is_err());
        assert!(limiter.acquire(b).await.is_ok());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let limiter = RateLimiter::new(5, Duration::from_millis(10));
        let ip: IpAddr = "192.168.1.1".parse().unwrap();
        assert!(limiter.acquire(ip).await.is_ok());

        tokio::time::sleep(Duration::from_millis(20)).await;
        limiter.purge_expired().await;

        assert!(limiter.windows.lock().await.is_empty());
    }

    #[test]
    fn test_forwarded_headers_ignored_unless_trusted() {
        let req = from_peer([192, 0, 2, 1]);

        let direct = RateLimiter::default();
        assert_eq!(direct.client_of(&req), Some("192.0.2.1".parse().unwrap()));

        let proxied = RateLimiter::default().trust_proxy_headers(true);
        assert_eq!(proxied.client_of(&req), Some("203.0.113.7".parse().unwrap()));
    }

    #[test]
    fn test_trusted_proxy_fallbacks() {
        let proxied = RateLimiter::default().trust_proxy_headers(true);

        let req = Request::builder()
            .header("x-real-ip", "198.51.100.2")
            .body(())
            .unwrap();
        assert_eq!(proxied.client_of(&req), Some("198.51.100.2".parse().unwrap()));

        let mut req = Request::builder()
            .header("x-forwarded-for", "garbage")
            .body(())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 9], 1))));
        assert_eq!(proxied.client_of(&req), Some("192.0.2.9".parse().unwrap()));

        let req = Request::builder().body(()).unwrap();
        assert_eq!(proxied.client_of(&req), None);
    }
}
