//! Behavior agents.
//!
//! There is one tool-calling loop, [`BehaviorAgent`]. Planner and executor
//! are [`AgentProfile`] values that only differ in prompt text and tool
//! catalog.

use std::sync::Arc;

use super::actions::ActionExecutor;
use super::context::render_context_block;
use super::errors::AgentError;
use super::prompts::{EXECUTOR_OPERATING, EXECUTOR_ROLE, PLANNER_OPERATING, PLANNER_ROLE};
use super::tools::{EXECUTOR_TOOLS, PLANNER_TOOLS};
use super::types::{AgentInput, AgentOutput, AgentType, ConversationRole, SessionContext};
use crate::inference::{
    CompletionRequest, CompletionResponse, Message, ProviderRouter, ToolDeclaration,
};

/// Default bound on model round trips per `execute`.
pub const DEFAULT_MAX_ITERATIONS: usize = 3;

// ─── AgentProfile ───────────────────────────────────────────────────────────

/// Everything that distinguishes one agent from another.
#[derive(Debug, Clone, Copy)]
pub struct AgentProfile {
    pub agent_type: AgentType,
    /// Static role and capability description, placed before the context block.
    pub role_prompt: &'static str,
    /// Static operating instructions, placed after the context block.
    pub operating_prompt: &'static str,
    pub tools: &'static [ToolDeclaration],
}

impl AgentProfile {
    pub const fn planner() -> Self {
        Self {
            agent_type: AgentType::Planner,
            role_prompt: PLANNER_ROLE,
            operating_prompt: PLANNER_OPERATING,
            tools: PLANNER_TOOLS,
        }
    }

    pub const fn executor() -> Self {
        Self {
            agent_type: AgentType::Executor,
            role_prompt: EXECUTOR_ROLE,
            operating_prompt: EXECUTOR_OPERATING,
            tools: EXECUTOR_TOOLS,
        }
    }

    pub fn system_prompt(&self, ctx: &SessionContext) -> String {
        let mut prompt = String::from(self.role_prompt);
        prompt.push_str(&render_context_block(ctx));
        prompt.push_str(self.operating_prompt);
        prompt
    }
}

// ─── BehaviorAgent ──────────────────────────────────────────────────────────

pub struct BehaviorAgent {
    profile: AgentProfile,
    router: Arc<ProviderRouter>,
    actions: Arc<ActionExecutor>,
    max_iterations: usize,
}

impl BehaviorAgent {
    pub fn new(
        profile: AgentProfile,
        router: Arc<ProviderRouter>,
        actions: Arc<ActionExecutor>,
        max_iterations: usize,
    ) -> Self {
        Self {
            profile,
            router,
            actions,
            max_iterations: max_iterations.max(1),
        }
    }

    pub fn agent_type(&self) -> AgentType {
        self.profile.agent_type
    }

    pub fn system_prompt(&self, ctx: &SessionContext) -> String {
        self.profile.system_prompt(ctx)
    }

    pub fn available_tools(&self) -> &'static [ToolDeclaration] {
        self.profile.tools
    }

    /// Run the tool-calling loop for one user message.
    ///
    /// Stops at the first response without tool calls, or after
    /// `max_iterations` round trips, in which case the last response's text is
    /// the answer. A failing tool call becomes an `{"error": ...}` tool result;
    /// only a failed completion aborts the loop.
    pub async fn execute(&self, input: AgentInput<'_>) -> Result<AgentOutput, AgentError> {
        let system_prompt = self.system_prompt(input.context);
        let mut messages = history_messages(input.context);
        messages.push(Message::user(input.message));

        let mut last: Option<CompletionResponse> = None;

        for iteration in 0..self.max_iterations {
            let request = CompletionRequest {
                system_prompt: system_prompt.clone(),
                messages: messages.clone(),
                tools: self.profile.tools.to_vec(),
                model: None,
            };
            let response = self.router.complete(&request, &[]).await?;

            tracing::debug!(
                agent = %self.agent_type(),
                iteration,
                tool_calls = response.tool_calls.len(),
                "agent completion"
            );

            if response.tool_calls.is_empty() {
                last = Some(response);
                break;
            }

            messages.push(Message::assistant_with_tool_calls(
                response.content.clone(),
                response.tool_calls.clone(),
            ));
            for call in &response.tool_calls {
                let result = match self.actions.execute(&call.name, &call.arguments, input.context)
                {
                    Ok(value) => value.to_string(),
                    Err(e) => {
                        tracing::warn!(
                            agent = %self.agent_type(),
                            tool = %call.name,
                            error = %e,
                            "tool call failed"
                        );
                        serde_json::json!({ "error": e.to_string() }).to_string()
                    }
                };
                messages.push(Message::tool_result(call.id.clone(), result));
            }
            last = Some(response);
        }

        Ok(AgentOutput {
            response: last.map(|r| r.content).unwrap_or_default(),
            agent_type: self.agent_type(),
            next_state: None,
            persisted: false,
        })
    }
}

/// Prior turns as model messages, oldest first.
fn history_messages(ctx: &SessionContext) -> Vec<Message> {
    ctx.conversations
        .iter()
        .map(|turn| match turn.role {
            ConversationRole::User => Message::user(turn.content.clone()),
            ConversationRole::Assistant => Message::assistant(turn.content.clone()),
            ConversationRole::System => Message::system(turn.content.clone()),
        })
        .collect()
}
