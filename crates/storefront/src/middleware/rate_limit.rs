//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Only the admin login form is limited: ~10 attempts per minute per client IP.
//!
//! The client IP is the peer address from `ConnectInfo`. Request headers are
//! client-controlled, so `X-Forwarded-For` is only consulted when the
//! storefront is configured to sit behind a reverse proxy, and then only the
//! rightmost hop (the one our proxy appended) is used.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

// =============================================================================
// Client IP Key Extractor
// =============================================================================

/// Key extractor for the client IP.
///
/// Uses the peer address unless `trust_proxy_headers` is set.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClientIpKeyExtractor {
    trust_proxy_headers: bool,
}

impl ClientIpKeyExtractor {
    #[must_use]
    pub const fn new(trust_proxy_headers: bool) -> Self {
        Self {
            trust_proxy_headers,
        }
    }
}

/// Client IP as seen by the reverse proxy directly in front of us.
///
/// Every proxy appends the address it received the request from, so the
/// last `X-Forwarded-For` entry is the only one a client cannot forge.
fn proxy_appended_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(','))
        .filter(|s| !s.trim().is_empty())
        .next_back()
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let forwarded = if self.trust_proxy_headers {
            proxy_appended_ip(req.headers())
        } else {
            None
        };

        forwarded
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

// =============================================================================
// Rate Limiter Configuration
// =============================================================================

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create rate limiter for the admin login: ~10 requests per minute per IP.
///
/// Configuration: 1 request every 6 seconds (replenish), burst of 5.
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid positive
/// integers (`per_second(6)` and `burst_size(5)`), which are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn admin_login_rate_limiter(trust_proxy_headers: bool) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor::new(trust_proxy_headers))
        .per_second(6) // Replenish 1 token every 6 seconds (~10/minute)
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(6) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tower_governor::key_extractor::KeyExtractor;

    fn request_from_peer(forwarded_for: Option<&str>) -> Request<()> {
        let mut builder = Request::builder();
        if let Some(value) = forwarded_for {
            builder = builder.header("x-forwarded-for", value);
        }
        let mut req = builder.body(()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 10], 4000))));
        req
    }

    #[test]
    fn test_forwarded_header_ignored_by_default() {
        let req = request_from_peer(Some("203.0.113.7"));
        let ip = ClientIpKeyExtractor::default().extract(&req).ok();
        assert_eq!(ip, "192.0.2.10".parse().ok());
    }

    #[test]
    fn test_trusted_proxy_uses_rightmost_hop() {
        let req = request_from_peer(Some("198.51.100.1, 203.0.113.7"));
        let ip = ClientIpKeyExtractor::new(true).extract(&req).ok();
        assert_eq!(ip, "203.0.113.7".parse().ok());
    }

    #[test]
    fn test_trusted_proxy_spoofed_prefix_does_not_change_key() {
        let first = request_from_peer(Some("1.1.1.1, 203.0.113.7"));
        let second = request_from_peer(Some("8.8.8.8, 203.0.113.7"));
        let extractor = ClientIpKeyExtractor::new(true);
        assert_eq!(
            extractor.extract(&first).ok(),
            extractor.extract(&second).ok()
        );
    }

    #[test]
    fn test_trusted_proxy_without_header_falls_back_to_peer() {
        let req = request_from_peer(None);
        let ip = ClientIpKeyExtractor::new(true).extract(&req).ok();
        assert_eq!(ip, "192.0.2.10".parse().ok());
    }

    #[test]
    fn test_no_source_is_an_error() {
        let req = Request::new(());
        assert!(ClientIpKeyExtractor::default().extract(&req).is_err());
    }
}
