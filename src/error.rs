//! Unified error handling for the activity atlas.
//!
//! Only configuration problems are fatal for a run. Transport and decode
//! failures are reported through this type so callers can log them and
//! fall back to a degraded result.

use thiserror::Error;

/// Unified error type for atlas operations.
#[derive(Debug, Error)]
pub enum AtlasError {
    /// HTTP/API error (activity fetch, token exchange, reverse geocoding)
    #[error("{}", format_http(.message, .status_code))]
    Http {
        message: String,
        status_code: Option<u16>,
    },
    /// OAuth failure for one account
    #[error("Authorization failed for '{account}': {message}")]
    Auth { account: String, message: String },
    /// Missing or invalid configuration
    #[error("Configuration error: {message}")]
    Config { message: String },
    /// Malformed encoded polyline
    #[error("Path decode failed: {message}")]
    Decode { message: String },
    /// No activity in the filtered set carries a start coordinate
    #[error("No activities with GPS data found")]
    NoCoordinates,
    /// No account produced any activity
    #[error("No activities were loaded from any account")]
    NoActivities,
    /// Filesystem error while writing artifacts or token files
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_http(message: &str, status_code: &Option<u16>) -> String {
    match status_code {
        Some(code) => format!("HTTP error ({}): {}", code, message),
        None => format!("HTTP error: {}", message),
    }
}

impl AtlasError {
    /// True for errors that abort the whole run rather than one item.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AtlasError::Config { .. } | AtlasError::NoActivities | AtlasError::Io(_)
        )
    }

    pub(crate) fn http(message: impl Into<String>, status_code: Option<u16>) -> Self {
        AtlasError::Http {
            message: message.into(),
            status_code,
        }
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for AtlasError {
    fn from(e: reqwest::Error) -> Self {
        AtlasError::Http {
            message: e.to_string(),
            status_code: e.status().map(|s| s.as_u16()),
        }
    }
}

/// Result type alias for atlas operations.
pub type Result<T> = std::result::Result<T, AtlasError>;

/// Extension trait for converting Option to AtlasError.
pub trait OptionExt<T> {
    /// Convert Option to Result with a configuration error.
    fn ok_or_config(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_config(self, message: &str) -> Result<T> {
        self.ok_or_else(|| AtlasError::Config {
            message: message.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AtlasError::Http {
            message: "Rate Limit Exceeded".to_string(),
            status_code: Some(429),
        };
        assert_eq!(err.to_string(), "HTTP error (429): Rate Limit Exceeded");

        let err = AtlasError::http("connection reset", None);
        assert_eq!(err.to_string(), "HTTP error: connection reset");
    }

    #[test]
    fn test_option_ext() {
        let none: Option<i32> = None;
        let result = none.ok_or_config("STRAVA_CLIENT_ID missing");
        assert!(matches!(result, Err(AtlasError::Config { .. })));
        assert!(result.unwrap_err().is_fatal());
    }

    #[test]
    fn test_transport_errors_are_not_fatal() {
        assert!(!AtlasError::http("timeout", None).is_fatal());
        assert!(!AtlasError::NoCoordinates.is_fatal());
        assert!(!AtlasError::Decode {
            message: "bad".into()
        }
        .is_fatal());
    }
}
