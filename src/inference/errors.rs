//! Inference error types.
//!
//! All errors implement `std::error::Error` via `thiserror`. Structured logging
//! is the caller's responsibility. These types carry the context needed to build
//! meaningful log entries.

use thiserror::Error;

/// Errors that can occur while talking to a model backend or routing to one.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// TCP/HTTP connection to the provider endpoint failed.
    #[error("connection failed to {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    /// The provider did not respond within the configured timeout.
    #[error("inference timeout after {duration_secs}s")]
    Timeout { duration_secs: u64 },

    /// Non-2xx HTTP response from the provider.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body could not be understood.
    #[error("response parse error: {reason}")]
    ResponseParse { reason: String },

    /// No registered backend matched the preferred names and no default exists.
    #[error("no provider available (requested: {})", format_requested(requested))]
    NoProviderAvailable { requested: Vec<String> },

    /// A provider config names a kind this build cannot instantiate.
    #[error("unsupported provider kind: {kind}")]
    UnsupportedProvider { kind: String },

    /// Provider configuration loading or validation error.
    #[error("config error: {reason}")]
    ConfigError { reason: String },

    /// Reading or writing persisted provider configs failed.
    #[error("provider config storage error: {reason}")]
    Storage { reason: String },
}

fn format_requested(requested: &[String]) -> String {
    if requested.is_empty() {
        "default".to_string()
    } else {
        requested.join(", ")
    }
}
