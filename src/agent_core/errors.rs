//! Agent core error types.

use thiserror::Error;

use crate::inference::InferenceError;

/// Errors that can occur during agent core operations.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Database operation failed.
    #[error("database error: {reason}")]
    DatabaseError { reason: String },

    /// A referenced record does not exist.
    #[error("{entity} not found: '{id}'")]
    NotFound { entity: &'static str, id: String },

    /// No usable model backend. The turn cannot produce an answer.
    #[error("{source}")]
    NoProviderAvailable { source: InferenceError },

    /// The model backend was reached but the completion failed.
    #[error("completion failed: {source}")]
    CompletionFailed { source: InferenceError },

    /// Tool arguments did not match the tool's declared parameters.
    #[error("invalid arguments for '{tool}': {reason}")]
    InvalidToolArguments { tool: String, reason: String },

    /// A tool that writes goal data was called with no current goal.
    #[error("'{tool}' requires a current goal, but none is set")]
    MissingGoal { tool: String },

    /// Serialization error.
    #[error("serialization error: {reason}")]
    SerializationError { reason: String },
}

impl AgentError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        AgentError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl From<rusqlite::Error> for AgentError {
    fn from(e: rusqlite::Error) -> Self {
        AgentError::DatabaseError {
            reason: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(e: serde_json::Error) -> Self {
        AgentError::SerializationError {
            reason: e.to_string(),
        }
    }
}

impl From<InferenceError> for AgentError {
    fn from(e: InferenceError) -> Self {
        match e {
            InferenceError::NoProviderAvailable { .. } => {
                AgentError::NoProviderAvailable { source: e }
            }
            other => AgentError::CompletionFailed { source: other },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_provider_maps_to_dedicated_variant() {
        let err: AgentError = InferenceError::NoProviderAvailable { requested: vec![] }.into();
        assert!(matches!(err, AgentError::NoProviderAvailable { .. }));
        assert!(err.to_string().starts_with("no provider available"));
    }

    #[test]
    fn test_other_inference_errors_map_to_completion_failed() {
        let err: AgentError = InferenceError::HttpError {
            status: 429,
            body: "rate limited".into(),
        }
        .into();
        assert!(matches!(err, AgentError::CompletionFailed { .. }));
        assert_eq!(err.to_string(), "completion failed: HTTP 429: rate limited");
    }

    #[test]
    fn test_not_found_message() {
        let err = AgentError::not_found("task", "abc");
        assert_eq!(err.to_string(), "task not found: 'abc'");
    }
}
