//! Scripted model backend shared by the agent and orchestrator tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::database::CoachDatabase;
use crate::inference::{
    BackendFactory, CompletionRequest, CompletionResponse, InferenceError, ModelBackend,
    NewProviderConfig, ProviderConfig, ProviderConfigStore, ProviderKind, ProviderRouter,
    ToolArguments, ToolCall,
};

/// Replays queued replies in order and records every request it receives.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<CompletionResponse, InferenceError>>>,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<Result<CompletionResponse, InferenceError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, index: usize) -> CompletionRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, InferenceError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(text("(script exhausted)")))
    }
}

pub fn text(content: &str) -> CompletionResponse {
    CompletionResponse {
        content: content.to_string(),
        model: "scripted".into(),
        ..Default::default()
    }
}

/// A response requesting tool calls given as `(id, name, arguments)`.
pub fn with_tools(content: &str, calls: &[(&str, &str, serde_json::Value)]) -> CompletionResponse {
    let tool_calls = calls
        .iter()
        .map(|(id, name, args)| ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            arguments: match args {
                serde_json::Value::Object(map) => map.clone(),
                _ => ToolArguments::new(),
            },
        })
        .collect();
    CompletionResponse {
        tool_calls,
        ..text(content)
    }
}

/// A router whose only (default) provider is `backend`, configured in `db`.
pub fn router_for(db: Arc<CoachDatabase>, backend: Arc<ScriptedBackend>) -> Arc<ProviderRouter> {
    db.insert_provider_config(&NewProviderConfig {
        name: "scripted".into(),
        provider: "ollama".into(),
        base_url: String::new(),
        api_key: String::new(),
        default_model: "llama3".into(),
        is_default: true,
        is_active: true,
    })
    .unwrap();

    let factory: BackendFactory =
        Arc::new(move |_: &ProviderConfig| Ok(backend.clone() as Arc<dyn ModelBackend>));
    Arc::new(ProviderRouter::with_factory(db, factory).unwrap())
}
