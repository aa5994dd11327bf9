//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span carrying `request_id`)
//! 3. Request ID (reuse or generate `x-request-id`)
//! 4. Security headers (CSP with the response's nonce, HSTS, ...)
//! 5. CSP nonce (per-request nonce for `<script>` tags)
//! 6. Session layer (tower-sessions, `PostgreSQL` or memory store)
//! 7. Rate limiting on `POST /admin/login` (governor)

pub mod auth;
pub mod csp;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{OptionalAdmin, RequireAdmin, clear_current_admin, set_current_admin};
pub use csp::{CspNonce, csp_nonce_middleware};
pub use rate_limit::admin_login_rate_limiter;
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
pub use security_headers::security_headers_middleware;
pub use session::{SessionBackend, create_session_layer};
