//! Trenord client error types.

use std::time::Duration;

/// Transport-level errors from fetching a train.
///
/// Every variant is transient from the tracker's point of view: the previous
/// snapshot is kept and the next tick may try again.
#[derive(Debug, thiserror::Error)]
pub enum TrenordError {
    /// HTTP request failed (network error, TLS, client-side timeout)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The end-to-end fetch budget expired
    #[error("timed out after {budget:?}")]
    Timeout { budget: Duration },

    /// Client could not be set up
    #[error("not configured: {0}")]
    NotConfigured(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = TrenordError::Api {
            status: 503,
            message: "Service Unavailable".into(),
        };
        assert_eq!(err.to_string(), "API error 503: Service Unavailable");

        let err = TrenordError::Timeout {
            budget: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "timed out after 30s");

        let err = TrenordError::NotConfigured("no data directory".into());
        assert_eq!(err.to_string(), "not configured: no data directory");
    }
}
