//! Inference layer: model backends and the provider router.
//!
//! - `types`: provider-agnostic messages, tool declarations, completion
//!   request/response, plus the OpenAI wire shapes
//! - `backend`: the `ModelBackend` trait
//! - `client`: OpenAI-compatible HTTP backend used for OpenRouter and Ollama
//! - `config`: provider kinds, stored provider configs, seed-file loading
//! - `router`: registry of live backends, resolution, reload, config CRUD
//! - `errors`: inference error types

pub mod backend;
pub mod client;
pub mod config;
pub mod errors;
pub mod router;
pub mod types;

pub use backend::ModelBackend;
pub use client::OpenAiCompatibleBackend;
pub use config::{NewProviderConfig, ProviderConfig, ProviderKind};
pub use errors::InferenceError;
pub use router::{BackendFactory, ProviderConfigStore, ProviderRouter, RegistrySnapshot};
pub use types::{
    CompletionRequest, CompletionResponse, Message, Role, TokenUsage, ToolArguments, ToolCall,
    ToolDeclaration,
};
