//! Session-related types.
//!
//! Everything here lives in the visitor's server-side session, never in the
//! commerce backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use digistore_core::Email;

/// Session-stored admin login marker.
///
/// Records who signed in and when; the password itself is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentAdmin {
    /// Email the admin signed in with.
    pub email: Email,
    /// When the login happened.
    pub logged_in_at: DateTime<Utc>,
}

impl CurrentAdmin {
    #[must_use]
    pub fn new(email: Email) -> Self {
        Self {
            email,
            logged_in_at: Utc::now(),
        }
    }
}

/// Severity of a flash message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

impl FlashKind {
    /// CSS modifier class for the message banner.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Success => "flash--success",
            Self::Error => "flash--error",
        }
    }
}

/// One-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }
}

/// Session keys.
pub mod keys {
    /// Serialized cart contents.
    pub const CART: &str = "cart";

    /// Id of the order awaiting payment confirmation.
    pub const CHECKOUT_ORDER_ID: &str = "checkout_order_id";

    /// Admin login marker.
    pub const CURRENT_ADMIN: &str = "current_admin";

    /// Pending flash message.
    pub const FLASH: &str = "flash";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_flash_constructors() {
        let flash = Flash::success("Product created");
        assert_eq!(flash.kind, FlashKind::Success);
        assert_eq!(flash.kind.css_class(), "flash--success");

        let flash = Flash::error("Failed");
        assert_eq!(flash.kind.css_class(), "flash--error");
    }

    #[test]
    fn test_current_admin_serializes_without_password() {
        let admin = CurrentAdmin::new(Email::parse("admin@example.com").unwrap());
        let json = serde_json::to_value(&admin).unwrap();
        assert_eq!(json["email"], "admin@example.com");
        assert!(json.get("password").is_none());
    }
}
