//! The model backend abstraction the router dispatches to.

use async_trait::async_trait;

use super::config::ProviderKind;
use super::errors::InferenceError;
use super::types::{CompletionRequest, CompletionResponse};

/// One configured model provider.
///
/// Implementations translate the provider-agnostic request into their own
/// wire shape and issue a single call per `complete`.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// The config name this backend was built from.
    fn name(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    /// Reflects the stored active flag. This is not a live health check.
    fn is_available(&self) -> bool;

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, InferenceError>;
}
