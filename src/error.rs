//! Error types surfaced by the Vinted client.

use thiserror::Error;

/// Convenience alias used across the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Every way a client call or construction can fail.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed base URL or transport setting. Raised at construction only.
    #[error("{0}")]
    InvalidConfiguration(String),

    /// The session bootstrap ran out of attempts without finding a cookie.
    #[error(
        "Cannot fetch session cookie from {origin}, because of status code: {} different from 200",
        status_label(.status)
    )]
    CredentialAcquisition { origin: String, status: Option<u16> },

    /// The API answered with something other than 200 (or a 401 we gave up on).
    #[error("Cannot perform API call to endpoint {endpoint}, error code: {status}")]
    ApiCall { endpoint: String, status: u16 },

    /// A 200 response whose body is not the JSON we expected.
    #[error("Invalid JSON response from {endpoint}: {detail}")]
    InvalidResponse { endpoint: String, detail: String },

    /// DNS, TLS, connect or timeout failure below HTTP.
    #[error("Transport error: {0}")]
    Transport(#[from] wreq::Error),

    /// The blocking client could not start its runtime.
    #[error("Failed to start blocking runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

impl Error {
    /// Returns the HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::CredentialAcquisition { status, .. } => *status,
            Error::ApiCall { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn invalid_url(url: &str) -> Self {
        Error::InvalidConfiguration(format!("'{}' is not a valid url, please check it!", url))
    }
}

fn status_label(status: &Option<u16>) -> String {
    status.map_or_else(|| "none".to_string(), |s| s.to_string())
}
