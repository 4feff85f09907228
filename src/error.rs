use thiserror::Error;

/// Unified error type for the request pipeline.
///
/// Transport failures keep the original [`reqwest::Error`] so callers can
/// still distinguish failure causes (`is_timeout()`, `is_connect()`,
/// `status()`) after retry exhaustion.
#[derive(Debug, Error)]
pub enum Error {
    /// Builder misuse, raised synchronously at the offending call site.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Connectivity or protocol failure from the underlying transport.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// JSON encode/decode failure for request or response bodies.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Produced by [`error_for_status`](crate::response::HttpResponse::error_for_status)
    /// when the caller explicitly converts an error status into a failure.
    #[error("HTTP status {status} for {url}")]
    Status { status: u16, url: String },
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// True for the connectivity failures the retry loop treats as transient:
    /// connection refused, connect timeout, read timeout, generic timeout.
    pub fn is_connectivity(&self) -> bool {
        match self {
            Error::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
