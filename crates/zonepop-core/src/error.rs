//! Error types for the ZonePop system
//!
//! This module defines all error types used throughout the crate.

use crate::endpoint::Endpoint;
use thiserror::Error;

/// Result type alias for ZonePop operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the ZonePop system
#[derive(Error, Debug)]
pub enum Error {
    /// A source failed to produce endpoints
    #[error("Source error ({name}): {message}")]
    Source {
        /// Configured source name
        name: String,
        /// Error message
        message: String,
    },

    /// A provider failed to converge its remote state
    #[error("Provider error ({name}): {message}")]
    Provider {
        /// Configured provider name
        name: String,
        /// Error message
        message: String,
    },

    /// A string that does not parse as an IP literal
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// A zone name that is not usable for the requested operation
    #[error("Invalid zone: {0}")]
    InvalidZone(String),

    /// Failure reported by (or while talking to) a remote zone API
    #[error("Remote API error: {0}")]
    RemoteApi(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A source failed but still produced some endpoints
    #[error("{cause} ({} endpoint(s) still returned)", .endpoints.len())]
    Partial {
        /// Endpoints produced before the failure
        endpoints: Vec<Endpoint>,
        /// The underlying failure
        cause: Box<Error>,
    },

    /// Several independent failures collected during one reconciliation pass
    #[error("{}", join_messages(.0))]
    Multiple(Vec<Error>),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

fn join_messages(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Create a source error for the named source
    pub fn source_failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Source {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a provider error for the named provider
    pub fn provider(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid address error
    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::InvalidAddress(msg.into())
    }

    /// Create an invalid zone error
    pub fn invalid_zone(msg: impl Into<String>) -> Self {
        Self::InvalidZone(msg.into())
    }

    /// Create a remote API error
    pub fn remote_api(msg: impl Into<String>) -> Self {
        Self::RemoteApi(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Wrap a failure together with the endpoints a source managed to collect
    pub fn partial(endpoints: Vec<Endpoint>, cause: Error) -> Self {
        Self::Partial {
            endpoints,
            cause: Box::new(cause),
        }
    }

    /// Collapse a list of errors into one
    ///
    /// Returns `None` for an empty list, the error itself for a single entry,
    /// and [`Error::Multiple`] otherwise.
    pub fn from_many(mut errors: Vec<Error>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multiple(errors)),
        }
    }

    /// Split off the endpoints carried by a partial failure
    ///
    /// Any other error is returned unchanged with an empty endpoint list.
    pub fn into_partial_parts(self) -> (Vec<Endpoint>, Error) {
        match self {
            Self::Partial { endpoints, cause } => (endpoints, *cause),
            other => (Vec::new(), other),
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_many() {
        assert!(Error::from_many(Vec::new()).is_none());

        let single = Error::from_many(vec![Error::config("bad")]).unwrap();
        assert!(matches!(single, Error::Config(_)));

        let many = Error::from_many(vec![
            Error::provider("route53", "boom"),
            Error::provider("file", "disk full"),
        ])
        .unwrap();
        let msg = many.to_string();
        assert!(msg.contains("route53"));
        assert!(msg.contains("disk full"));
        assert!(msg.contains("; "));
    }

    #[test]
    fn test_partial_parts() {
        let err = Error::partial(
            vec![Endpoint::new("router")],
            Error::source_failed("vyos", "neighbor table unavailable"),
        );
        assert!(err.to_string().contains("1 endpoint(s) still returned"));

        let (endpoints, cause) = err.into_partial_parts();
        assert_eq!(endpoints.len(), 1);
        assert!(matches!(cause, Error::Source { .. }));

        let (endpoints, cause) = Error::config("x").into_partial_parts();
        assert!(endpoints.is_empty());
        assert!(matches!(cause, Error::Config(_)));
    }
}
