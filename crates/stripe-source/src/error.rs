use thiserror::Error;

use crate::position::PositionError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Stripe API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode Stripe response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid position: {0}")]
    Position(#[from] PositionError),

    #[error("Malformed {kind} object: {reason}")]
    MalformedObject { kind: &'static str, reason: String },

    #[error("Event type '{event_type}' is not mapped for resource '{resource}'")]
    UnmappedEventType {
        resource: String,
        event_type: String,
    },

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Whether a request that failed with this error may succeed if repeated.
    ///
    /// Rate limiting (429) and server-side failures (5xx) are transient,
    /// as are connection-level transport failures.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Error::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
