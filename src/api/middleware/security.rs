use crate::core::config::SecurityConfig;
use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};

/// Security headers middleware
///
/// This middleware adds security-related HTTP headers to all responses:
/// - X-Content-Type-Options: nosniff (prevents MIME type sniffing)
/// - X-Frame-Options: DENY (prevents clickjacking)
/// - Content-Security-Policy: nothing may be loaded from a JSON API response
/// - Cache-Control: no-store (match results must not sit in shared caches)
/// - Strict-Transport-Security: enforces HTTPS (only when enabled)
pub async fn security_headers_middleware(
    State(config): State<SecurityHeadersConfig>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    let (mut parts, body) = response.into_parts();

    parts.headers.insert(
        "X-Content-Type-Options",
        HeaderValue::from_static("nosniff"),
    );

    parts.headers.insert(
        "X-Frame-Options",
        HeaderValue::from_static("DENY"),
    );

    parts.headers.insert(
        "Content-Security-Policy",
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );

    parts.headers.insert(
        "Cache-Control",
        HeaderValue::from_static("no-store"),
    );

    if config.enable_hsts {
        let hsts_value = format!("max-age={}; includeSubDomains", config.hsts_max_age);
        parts.headers.insert(
            "Strict-Transport-Security",
            HeaderValue::from_str(&hsts_value)
                .unwrap_or_else(|_| HeaderValue::from_static("max-age=31536000; includeSubDomains")),
        );
    }

    Response::from_parts(parts, body)
}

/// Configuration for security headers
#[derive(Clone, Debug)]
pub struct SecurityHeadersConfig {
    /// Enable HSTS (HTTP Strict Transport Security) header
    pub enable_hsts: bool,
    /// HSTS max-age in seconds
    pub hsts_max_age: u64,
}

impl SecurityHeadersConfig {
    pub fn new(enable_hsts: bool, hsts_max_age: u64) -> Self {
        Self {
            enable_hsts,
            hsts_max_age,
        }
    }
}

impl From<&SecurityConfig> for SecurityHeadersConfig {
    fn from(config: &SecurityConfig) -> Self {
        Self::new(config.enable_hsts, config.hsts_max_age)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, middleware, routing::get, Router};
    use tower::util::ServiceExt; // For oneshot method

    async fn response_with(config: SecurityHeadersConfig) -> Response {
        let app = Router::new()
            .route("/test", get(|| async { "OK" }))
            .layer(middleware::from_fn_with_state(config, security_headers_middleware));

        let request = Request::builder()
            .uri("/test")
            .body(Body::empty())
            .unwrap();

        app.oneshot(request).await.unwrap()
    }

    #[tokio::test]
    async fn test_security_headers_basic() {
        let response = response_with(SecurityHeadersConfig::new(false, 0)).await;

        assert_eq!(response.headers().get("X-Content-Type-Options").unwrap(), "nosniff");
        assert_eq!(response.headers().get("X-Frame-Options").unwrap(), "DENY");
        assert_eq!(response.headers().get("Cache-Control").unwrap(), "no-store");
        assert!(response.headers().contains_key("Content-Security-Policy"));
        assert!(!response.headers().contains_key("Strict-Transport-Security"));
    }

    #[tokio::test]
    async fn test_security_headers_with_hsts_enabled() {
        let response = response_with(SecurityHeadersConfig::new(true, 86400)).await;

        let hsts_value = response
            .headers()
            .get("Strict-Transport-Security")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(hsts_value.contains("max-age=86400"));
        assert!(hsts_value.contains("includeSubDomains"));
    }
}
