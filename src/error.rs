//! Hub error types with HTTP status code mapping.
//!
//! [`HubError`] covers the failures that escape a component boundary:
//! startup problems (configuration, broker connection, subscription) and
//! calls into a hub whose control loop has stopped. Per-session transport
//! faults never become a `HubError`; they end that session and are logged.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured JSON error response body.
///
/// ```json
/// {
///   "error": {
///     "code": 3002,
///     "message": "hub control loop is not running"
///   }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
}

/// Errors raised by the hub, the bridge and their startup wiring.
///
/// # Error Code Ranges
///
/// | Range     | Category      | HTTP Status                 |
/// |-----------|---------------|-----------------------------|
/// | 1000–1999 | Configuration | 500 Internal Server Error   |
/// | 2000–2999 | Broker        | 502 Bad Gateway             |
/// | 3000–3999 | Hub           | 503 / 500                   |
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// A configuration value could not be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Connecting to the message broker failed.
    #[error("broker connection failed: {0}")]
    BrokerConnect(String),

    /// Opening the event subscription failed.
    #[error("subscription to {subject} failed: {reason}")]
    Subscribe {
        /// Subject pattern that was requested.
        subject: String,
        /// Broker-reported reason.
        reason: String,
    },

    /// The hub control loop has stopped and accepts no more requests.
    #[error("hub control loop is not running")]
    HubUnavailable,

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HubError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidConfig(_) => 1001,
            Self::BrokerConnect(_) => 2001,
            Self::Subscribe { .. } => 2002,
            Self::Internal(_) => 3000,
            Self::HubUnavailable => 3002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidConfig(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BrokerConnect(_) | Self::Subscribe { .. } => StatusCode::BAD_GATEWAY,
            Self::HubUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
