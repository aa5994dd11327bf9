//! Security headers middleware for XSS, clickjacking, and isolation protection.
//!
//! Adds restrictive security headers to all responses. The CSP is locked down
//! except for what the checkout payment widget and HTMX need.

use axum::{
    extract::{Request, State},
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, STRICT_TRANSPORT_SECURITY,
            X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

use super::CspNonce;
use crate::state::AppState;

/// Origins the payment widget loads scripts and frames from.
const PAYMENT_SCRIPT_ORIGIN: &str = "https://js.stripe.com";
const PAYMENT_FRAME_ORIGINS: &str = "https://js.stripe.com https://hooks.stripe.com";
const PAYMENT_API_ORIGIN: &str = "https://api.stripe.com";

/// HTMX is served from this CDN.
const HTMX_ORIGIN: &str = "https://unpkg.com";

/// Build the `Content-Security-Policy` value for one response.
///
/// ```text
/// default-src 'none';
/// script-src 'self' 'nonce-…' https://unpkg.com https://js.stripe.com;
/// style-src 'self';
/// img-src 'self' https: data:;
/// connect-src 'self' https://api.stripe.com;
/// frame-src https://js.stripe.com https://hooks.stripe.com;
/// object-src 'none';
/// base-uri 'self';
/// form-action 'self';
/// frame-ancestors 'none'
/// ```
///
/// `upgrade-insecure-requests` is appended when served over HTTPS.
#[must_use]
pub fn content_security_policy(nonce: Option<&CspNonce>, secure: bool) -> String {
    let nonce = nonce
        .filter(|n| !n.value().is_empty())
        .map(|n| format!(" 'nonce-{n}'"))
        .unwrap_or_default();

    let mut policy = format!(
        "default-src 'none'; \
         script-src 'self'{nonce} {HTMX_ORIGIN} {PAYMENT_SCRIPT_ORIGIN}; \
         style-src 'self'; \
         img-src 'self' https: data:; \
         font-src 'self'; \
         connect-src 'self' {PAYMENT_API_ORIGIN}; \
         frame-src {PAYMENT_FRAME_ORIGINS}; \
         object-src 'none'; \
         base-uri 'self'; \
         form-action 'self'; \
         frame-ancestors 'none'"
    );
    if secure {
        policy.push_str("; upgrade-insecure-requests");
    }
    policy
}

/// Add security headers to all responses.
///
/// Headers applied:
/// - `X-Frame-Options: DENY` - Prevent clickjacking
/// - `X-Content-Type-Options: nosniff` - Prevent MIME sniffing
/// - `Referrer-Policy: strict-origin-when-cross-origin` - The payment widget needs the origin
/// - `Content-Security-Policy` - Nonce-based, see [`content_security_policy`]
/// - `Permissions-Policy` - Deny sensitive features except `payment` for the widget
/// - `Cache-Control: no-store` - Carts and admin pages are per-visitor
/// - `Cross-Origin-Opener-Policy: same-origin` - Process isolation
/// - `Strict-Transport-Security` - Only when the base URL is HTTPS
pub async fn security_headers_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let secure = state.config().is_secure();
    let mut response = next.run(request).await;

    let csp = content_security_policy(response.extensions().get::<CspNonce>(), secure);
    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(
        REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    if let Ok(value) = HeaderValue::from_str(&csp) {
        headers.insert(CONTENT_SECURITY_POLICY, value);
    }

    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(
            "accelerometer=(), \
             camera=(), \
             display-capture=(), \
             geolocation=(), \
             gyroscope=(), \
             microphone=(), \
             usb=(), \
             payment=(self \"https://js.stripe.com\")",
        ),
    );

    // Static assets set their own caching
    if !headers.contains_key(CACHE_CONTROL) {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store, max-age=0"));
    }

    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );

    if secure {
        headers.insert(
            STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=63072000; includeSubDomains"),
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_includes_nonce_and_payment_origins() {
        let nonce = CspNonce("abc123==".to_string());
        let policy = content_security_policy(Some(&nonce), false);

        assert!(policy.contains(
            "script-src 'self' 'nonce-abc123==' https://unpkg.com https://js.stripe.com"
        ));
        assert!(policy.contains("frame-src https://js.stripe.com https://hooks.stripe.com"));
        assert!(policy.contains("frame-ancestors 'none'"));
        assert!(!policy.contains("upgrade-insecure-requests"));
    }

    #[test]
    fn test_policy_without_nonce_and_secure() {
        let policy = content_security_policy(None, true);
        assert!(!policy.contains("nonce-"));
        assert!(policy.ends_with("upgrade-insecure-requests"));
    }
}
