use crate::core::error::ErrorResponse;
use axum::{
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::collections::hash_map::RandomState;
use std::collections::{HashMap, VecDeque};
use std::hash::BuildHasher;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Number of independently locked shards in the limiter state
const SHARD_COUNT: usize = 16;

/// Header carrying the client chain when running behind a proxy
pub const FORWARDED_FOR_HEADER: &str = "X-Forwarded-For";
/// Single-address alternative set by some proxies
pub const REAL_IP_HEADER: &str = "X-Real-IP";

type Shard = Mutex<HashMap<IpAddr, VecDeque<Instant>>>;

/// Rate limiter using sliding window algorithm
///
/// This implementation tracks request timestamps per client address within a
/// time window. When a request comes in:
/// 1. Remove timestamps older than the window
/// 2. Count requests from this client in the current window
/// 3. If the count has reached the limit, reject with 429 Too Many Requests
/// 4. Otherwise, record the request and allow it through
///
/// Clients are spread over a fixed set of shards, each behind its own mutex,
/// so the check-and-record step is atomic per client without one global lock.
#[derive(Clone)]
pub struct RateLimiter {
    shards: Arc<Vec<Shard>>,
    hasher: RandomState,
    /// Maximum number of requests allowed per window
    max_requests: usize,
    /// Time window duration
    window_duration: Duration,
    /// Whether proxy headers may override the peer address
    trust_proxy_headers: bool,
}

impl RateLimiter {
    /// Create a new rate limiter
    ///
    /// # Arguments
    /// * `max_requests` - Maximum number of requests allowed per window
    /// * `window_seconds` - Time window duration in seconds
    pub fn new(max_requests: usize, window_seconds: u64) -> Self {
        Self::with_window(max_requests, Duration::from_secs(window_seconds))
    }

    fn with_window(max_requests: usize, window_duration: Duration) -> Self {
        let shards = (0..SHARD_COUNT).map(|_| Mutex::new(HashMap::new())).collect();
        Self {
            shards: Arc::new(shards),
            hasher: RandomState::new(),
            max_requests,
            window_duration,
            trust_proxy_headers: false,
        }
    }

    /// Create a rate limiter from security configuration
    pub fn from_config(max_requests: usize, window_seconds: u64, trust_proxy_headers: bool) -> Self {
        Self::new(max_requests, window_seconds).with_proxy_headers(trust_proxy_headers)
    }

    /// Key clients on proxy headers when `trusted`
    pub fn with_proxy_headers(mut self, trusted: bool) -> Self {
        self.trust_proxy_headers = trusted;
        self
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window_seconds(&self) -> u64 {
        self.window_duration.as_secs()
    }

    fn shard(&self, ip: &IpAddr) -> &Shard {
        let index = self.hasher.hash_one(ip) as usize % self.shards.len();
        &self.shards[index]
    }

    /// Check if a request from the given IP should be allowed
    ///
    /// Returns Ok(()) and records the request if it is allowed,
    /// Err(RateLimitError) if the client is at its quota
    pub async fn check_rate_limit(&self, ip: IpAddr) -> Result<(), RateLimitError> {
        let mut shard = self.shard(&ip).lock().await;
        let now = Instant::now();

        let requests = shard.entry(ip).or_default();
        self.drop_expired(requests, now);

        if requests.len() >= self.max_requests {
            return Err(RateLimitError::LimitExceeded {
                limit: self.max_requests,
                window_seconds: self.window_duration.as_secs(),
                retry_after: self.calculate_retry_after(requests, now),
            });
        }

        requests.push_back(now);
        Ok(())
    }

    /// Timestamps are pushed in order, so expired ones sit at the front
    fn drop_expired(&self, requests: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&oldest) = requests.front() {
            if now.duration_since(oldest) >= self.window_duration {
                requests.pop_front();
            } else {
                break;
            }
        }
    }

    /// Seconds until the oldest request leaves the window, rounded up
    fn calculate_retry_after(&self, requests: &VecDeque<Instant>, now: Instant) -> u64 {
        let Some(&oldest) = requests.front() else {
            return 1;
        };
        let remaining = self
            .window_duration
            .saturating_sub(now.duration_since(oldest));
        let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
        secs.max(1)
    }

    /// Clean up idle clients to prevent memory growth
    ///
    /// Called periodically by the server so clients that stopped sending
    /// requests do not keep an entry forever.
    pub async fn cleanup_expired(&self) {
        let now = Instant::now();
        for shard in self.shards.iter() {
            let mut shard = shard.lock().await;
            shard.retain(|_, requests| {
                self.drop_expired(requests, now);
                !requests.is_empty()
            });
        }
    }

    /// Number of clients currently tracked
    pub async fn tracked_clients(&self) -> usize {
        let mut total = 0;
        for shard in self.shards.iter() {
            total += shard.lock().await.len();
        }
        total
    }

    /// Resolve the rate limit key for a request
    ///
    /// Proxy headers are only consulted when trusted; otherwise any client
    /// could pick its own key. Without a peer address the loopback address
    /// is used.
    pub fn client_ip(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> IpAddr {
        if self.trust_proxy_headers {
            if let Some(ip) = forwarded_ip(headers) {
                return ip;
            }
        }

        peer.map(|addr| addr.ip())
            .unwrap_or(IpAddr::from([127, 0, 0, 1]))
    }
}

/// Client address announced by a proxy: first `X-Forwarded-For` entry, then `X-Real-IP`
fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let from_forwarded = headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok());

    from_forwarded.or_else(|| {
        headers
            .get(REAL_IP_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<IpAddr>().ok())
    })
}

/// Rate limiting errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    /// Rate limit exceeded
    #[error("Rate limit exceeded. Maximum {limit} requests per {window_seconds} seconds allowed.")]
    LimitExceeded {
        limit: usize,
        window_seconds: u64,
        retry_after: u64,
    },
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        match self {
            RateLimitError::LimitExceeded {
                limit,
                window_seconds,
                retry_after,
            } => {
                let mut body = ErrorResponse::new("RateLimitExceeded".to_string(), message);
                body.details = Some(json!({
                    "limit": limit,
                    "window_seconds": window_seconds,
                    "retry_after": retry_after,
                }));

                // Build response with Retry-After header
                let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
                response.headers_mut().insert(
                    "Retry-After",
                    HeaderValue::from_str(&retry_after.to_string())
                        .unwrap_or_else(|_| HeaderValue::from_static("60")),
                );
                response
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter_allows_requests_within_limit() {
        let limiter = RateLimiter::new(5, 60);
        let ip = IpAddr::from([127, 0, 0, 1]);

        for _ in 0..5 {
            assert!(limiter.check_rate_limit(ip).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_rate_limiter_blocks_requests_exceeding_limit() {
        let limiter = RateLimiter::new(3, 60);
        let ip = IpAddr::from([127, 0, 0, 1]);

        for _ in 0..3 {
            assert!(limiter.check_rate_limit(ip).await.is_ok());
        }

        let result = limiter.check_rate_limit(ip).await;
        match result {
            Err(RateLimitError::LimitExceeded { limit, window_seconds, retry_after }) => {
                assert_eq!(limit, 3);
                assert_eq!(window_seconds, 60);
                assert!(retry_after > 0 && retry_after <= 60);
            }
            other => panic!("Expected LimitExceeded error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rejected_requests_do_not_extend_the_window() {
        let limiter = RateLimiter::with_window(1, Duration::from_millis(300));
        let ip = IpAddr::from([10, 0, 0, 1]);

        assert!(limiter.check_rate_limit(ip).await.is_ok());
        for _ in 0..5 {
            assert!(limiter.check_rate_limit(ip).await.is_err());
        }

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert!(limiter.check_rate_limit(ip).await.is_ok());
    }

    #[tokio::test]
    async fn test_rate_limiter_different_ips_independent() {
        let limiter = RateLimiter::new(2, 60);
        let ip1 = IpAddr::from([127, 0, 0, 1]);
        let ip2 = IpAddr::from([127, 0, 0, 2]);

        assert!(limiter.check_rate_limit(ip1).await.is_ok());
        assert!(limiter.check_rate_limit(ip1).await.is_ok());
        assert!(limiter.check_rate_limit(ip1).await.is_err());

        assert!(limiter.check_rate_limit(ip2).await.is_ok());
        assert!(limiter.check_rate_limit(ip2).await.is_ok());
        assert!(limiter.check_rate_limit(ip2).await.is_err());
    }

    #[tokio::test]
    async fn test_rate_limiter_sliding_window() {
        let limiter = RateLimiter::new(2, 1);
        let ip = IpAddr::from([127, 0, 0, 1]);

        assert!(limiter.check_rate_limit(ip).await.is_ok());
        assert!(limiter.check_rate_limit(ip).await.is_ok());
        assert!(limiter.check_rate_limit(ip).await.is_err());

        // Wait for window to expire
        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert!(limiter.check_rate_limit(ip).await.is_ok());
    }

    #[tokio::test]
    async fn test_rate_limiter_cleanup_expired() {
        let limiter = RateLimiter::new(5, 1);
        let ip = IpAddr::from([127, 0, 0, 1]);

        for _ in 0..3 {
            limiter.check_rate_limit(ip).await.unwrap();
        }
        assert_eq!(limiter.tracked_clients().await, 1);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        limiter.cleanup_expired().await;

        assert_eq!(limiter.tracked_clients().await, 0);
    }

    #[tokio::test]
    async fn test_rate_limiter_concurrent_requests() {
        let limiter = Arc::new(RateLimiter::new(10, 60));
        let ip = IpAddr::from([127, 0, 0, 1]);

        let mut handles = vec![];
        for _ in 0..25 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move { limiter.check_rate_limit(ip).await }));
        }

        let mut success_count = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                success_count += 1;
            }
        }

        assert_eq!(success_count, 10);
        assert!(limiter.check_rate_limit(ip).await.is_err());
    }

    #[tokio::test]
    async fn test_rate_limit_error_response_format() {
        let error = RateLimitError::LimitExceeded {
            limit: 1,
            window_seconds: 60,
            retry_after: 42,
        };

        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get("Retry-After").unwrap(), "42");

        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

        assert_eq!(body["error"], "RateLimitExceeded");
        assert!(body["message"].as_str().unwrap().contains("Rate limit exceeded"));
        assert_eq!(body["details"]["limit"], 1);
        assert_eq!(body["details"]["window_seconds"], 60);
        assert_eq!(body["details"]["retry_after"], 42);
        assert!(body["trace_id"].is_string());
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_client_ip_ignores_proxy_headers_by_default() {
        let limiter = RateLimiter::new(1, 60);
        let peer: SocketAddr = "203.0.113.9:51000".parse().unwrap();
        let spoofed = headers(&[(FORWARDED_FOR_HEADER, "192.168.1.100")]);

        assert_eq!(limiter.client_ip(&spoofed, Some(peer)), peer.ip());
    }

    #[test]
    fn test_client_ip_from_x_forwarded_for_when_trusted() {
        let limiter = RateLimiter::from_config(1, 60, true);
        let peer: SocketAddr = "10.0.0.1:51000".parse().unwrap();
        let forwarded = headers(&[(FORWARDED_FOR_HEADER, "192.168.1.100, 10.0.0.1")]);

        assert_eq!(
            limiter.client_ip(&forwarded, Some(peer)),
            IpAddr::from([192, 168, 1, 100])
        );
    }

    #[test]
    fn test_client_ip_from_x_real_ip_when_trusted() {
        let limiter = RateLimiter::from_config(1, 60, true);
        let real_ip = headers(&[(REAL_IP_HEADER, "192.168.1.200")]);

        assert_eq!(limiter.client_ip(&real_ip, None), IpAddr::from([192, 168, 1, 200]));
    }

    #[test]
    fn test_client_ip_default() {
        let limiter = RateLimiter::from_config(1, 60, true);
        let garbage = headers(&[(FORWARDED_FOR_HEADER, "not-an-ip")]);

        assert_eq!(limiter.client_ip(&garbage, None), IpAddr::from([127, 0, 0, 1]));
    }
}
