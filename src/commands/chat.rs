//! Chat commands: the entry point into the coaching pipeline.

use serde::{Deserialize, Serialize};

use crate::agent_core::{AgentOutput, AgentType, Conversation, ConversationStore};
use crate::AppState;

/// Turns returned by `get_conversation_history` when no positive limit is given.
const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Goal id, also used as the session key.
    pub goal_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResponse {
    pub content: String,
    pub agent_type: AgentType,
    /// False when the exchange could not be saved to history.
    pub persisted: bool,
}

impl From<AgentOutput> for ChatResponse {
    fn from(output: AgentOutput) -> Self {
        Self {
            content: output.response,
            agent_type: output.agent_type,
            persisted: output.persisted,
        }
    }
}

pub async fn send_message(state: &AppState, request: ChatRequest) -> Result<ChatResponse, String> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err("message must not be empty".into());
    }
    if request.goal_id.trim().is_empty() {
        return Err("goal_id must not be empty".into());
    }

    let orchestrator = state.orchestrator();
    let output = orchestrator
        .process_message(message, &request.goal_id)
        .await
        .map_err(|e| {
            tracing::error!(goal_id = %request.goal_id, error = %e, "send_message failed");
            e.to_string()
        })?;
    Ok(output.into())
}

pub async fn start_onboarding(
    state: &AppState,
    goal_id: &str,
    goal_title: &str,
) -> Result<ChatResponse, String> {
    let orchestrator = state.orchestrator();
    let output = orchestrator
        .start_onboarding(goal_id, goal_title)
        .await
        .map_err(|e| {
            tracing::error!(goal_id, error = %e, "start_onboarding failed");
            e.to_string()
        })?;
    Ok(output.into())
}

/// Most recent turns for a goal, oldest first. `limit <= 0` means the default.
pub fn get_conversation_history(
    state: &AppState,
    goal_id: &str,
    limit: i64,
) -> Result<Vec<Conversation>, String> {
    let limit = usize::try_from(limit)
        .ok()
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_HISTORY_LIMIT);
    state
        .db
        .recent_for_goal(goal_id, limit)
        .map_err(|e| e.to_string())
}
