//! Common error types for AgriVision

use thiserror::Error;

/// Common result type for AgriVision operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fallback shown when a failed response carries no body text
pub const EMPTY_BODY_HINT: &str = "check the backend logs or proxy/CORS configuration";

/// Error taxonomy shared by the dispatcher, the controller and the CLI
///
/// Every variant is terminal for the current user action. Nothing is retried;
/// the message is displayed verbatim.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad or missing input, surfaced before any request is made
    #[error("{0}")]
    Validation(String),

    /// Backend answered with a non-2xx status
    #[error("API error ({status}): {}", body_or_hint(.body))]
    Network { status: u16, body: String },

    /// Request never produced a response (connection refused, timeout, ...)
    #[error("Request failed: {0}")]
    Transport(String),

    /// Response did not have the expected fields
    #[error("Unexpected response from the {service}: {detail}")]
    Parse { service: &'static str, detail: String },

    /// Dispatch was superseded before it completed
    #[error("Request cancelled")]
    Cancelled,

    /// Credential check failed
    #[error("Invalid credentials")]
    Unauthorized,

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a parse failure attributed to `service`
    pub fn parse(service: &'static str, detail: impl Into<String>) -> Self {
        Error::Parse {
            service,
            detail: detail.into(),
        }
    }

    /// True for failures caused by the network or the remote service
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network { .. } | Error::Transport(_))
    }
}

fn body_or_hint(body: &str) -> &str {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        EMPTY_BODY_HINT
    } else {
        trimmed
    }
}
