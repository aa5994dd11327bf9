//! Response envelope handling.
//!
//! The commerce API may return payloads bare (`[...]`, `{...}`) or wrapped as
//! `{"data": ..., "message": "..."}`. Failures carry `{"message": ...}` or
//! `{"error": ...}`.

use serde::Deserialize;
use serde::de::DeserializeOwned;

/// A successful response body, wrapped or bare.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Wrapped {
        data: T,
        #[serde(default)]
        message: Option<String>,
    },
    Bare(T),
}

impl<T> Envelope<T> {
    /// Split into the payload and the optional server message.
    pub fn into_parts(self) -> (T, Option<String>) {
        match self {
            Self::Wrapped { data, message } => (data, message),
            Self::Bare(data) => (data, None),
        }
    }
}

/// Parse a success body into its payload and optional message.
///
/// # Errors
///
/// Returns the `serde_json` error if the body matches neither shape.
pub fn parse<T: DeserializeOwned>(body: &str) -> Result<(T, Option<String>), serde_json::Error> {
    serde_json::from_str::<Envelope<T>>(body).map(Envelope::into_parts)
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Extract a human-readable message from an error body.
///
/// Prefers `message`, then `error`. Returns `None` for empty or non-JSON bodies.
#[must_use]
pub fn error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let non_blank = |m: &String| !m.trim().is_empty();
    parsed
        .message
        .filter(non_blank)
        .or_else(|| parsed.error.filter(non_blank))
}
