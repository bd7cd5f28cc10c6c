//! Orchestrator: one user message in, one coached answer out.
//!
//! Builds the session context, classifies the message, hands it to the
//! planner or executor, then records the exchange as two conversation turns.

use std::sync::Arc;

use serde_json::json;

use super::actions::ActionExecutor;
use super::agent::{AgentProfile, BehaviorAgent, DEFAULT_MAX_ITERATIONS};
use super::classifier::IntentClassifier;
use super::context::build_session_context;
use super::errors::AgentError;
use super::stores::Stores;
use super::types::{
    AgentInput, AgentOutput, ClassifiedIntent, ConversationRole, Fallback, Intent,
    NewConversation, SessionContext,
};
use crate::inference::ProviderRouter;

/// Tunables read from app settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorLimits {
    /// Conversation turns loaded into the session context.
    pub history_window: usize,
    /// Model round trips per agent turn.
    pub max_tool_iterations: usize,
    /// Recent turns summarized for the classifier.
    pub classifier_history: usize,
}

impl Default for OrchestratorLimits {
    fn default() -> Self {
        Self {
            history_window: 10,
            max_tool_iterations: DEFAULT_MAX_ITERATIONS,
            classifier_history: 5,
        }
    }
}

pub struct Orchestrator {
    stores: Stores,
    classifier: IntentClassifier,
    planner: BehaviorAgent,
    executor: BehaviorAgent,
    history_window: usize,
}

impl Orchestrator {
    pub fn new(stores: Stores, router: Arc<ProviderRouter>, limits: OrchestratorLimits) -> Self {
        let actions = Arc::new(ActionExecutor::new(stores.tasks.clone()));
        Self {
            classifier: IntentClassifier::new(router.clone(), limits.classifier_history),
            planner: BehaviorAgent::new(
                AgentProfile::planner(),
                router.clone(),
                actions.clone(),
                limits.max_tool_iterations,
            ),
            executor: BehaviorAgent::new(
                AgentProfile::executor(),
                router,
                actions,
                limits.max_tool_iterations,
            ),
            stores,
            history_window: limits.history_window,
        }
    }

    pub fn build_context(&self, goal_id: &str) -> Result<SessionContext, AgentError> {
        build_session_context(&self.stores, goal_id, self.history_window)
    }

    /// PLANNING goes to the planner; every other intent to the executor.
    pub fn agent_for(&self, intent: Intent) -> &BehaviorAgent {
        match intent {
            Intent::Planning => &self.planner,
            Intent::Execution | Intent::Evaluation | Intent::Accountability | Intent::General => {
                &self.executor
            }
        }
    }

    /// Handle one user message for the goal session `goal_id`.
    ///
    /// Fails only when no answer could be produced (context or completion
    /// failure). A failure to store the turn is logged and reported through
    /// [`AgentOutput::persisted`].
    pub async fn process_message(
        &self,
        message: &str,
        goal_id: &str,
    ) -> Result<AgentOutput, AgentError> {
        tracing::info!(goal_id, message_len = message.len(), "processing message");

        let ctx = self.build_context(goal_id)?;
        tracing::debug!(
            goal_id,
            state = ctx.state.as_str(),
            has_goal = ctx.goal.is_some(),
            tasks = ctx.tasks.len(),
            "context built"
        );

        let classification = self.classifier.classify(message, &ctx).await;
        if let Some(cause) = classification.cause() {
            tracing::warn!(goal_id, cause, "intent classification fell back to default");
        }
        let classified = classification.value();
        tracing::info!(
            goal_id,
            intent = %classified.intent,
            confidence = classified.confidence,
            reason = %classified.reason,
            "intent classified"
        );

        let agent = self.agent_for(classified.intent);
        tracing::info!(goal_id, agent = %agent.agent_type(), "routing to agent");

        let mut output = agent
            .execute(AgentInput {
                message,
                context: &ctx,
            })
            .await?;

        output.persisted = match self.persist_turn(goal_id, message, &output, &classification) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(goal_id, error = %e, "failed to save conversation turn");
                false
            }
        };

        Ok(output)
    }

    /// Open a goal session with a synthesized first message.
    pub async fn start_onboarding(
        &self,
        goal_id: &str,
        goal_title: &str,
    ) -> Result<AgentOutput, AgentError> {
        let message = format!("I want to set a new goal: {goal_title}. Help me get started.");
        self.process_message(&message, goal_id).await
    }

    /// Store the user message and the agent answer together. The goal id
    /// doubles as the session key.
    fn persist_turn(
        &self,
        goal_id: &str,
        message: &str,
        output: &AgentOutput,
        classification: &Fallback<ClassifiedIntent>,
    ) -> Result<(), AgentError> {
        let classified = classification.value();
        let user = NewConversation {
            goal_id: Some(goal_id.to_string()),
            session_id: goal_id.to_string(),
            role: ConversationRole::User,
            content: message.to_string(),
            agent_type: None,
            metadata: None,
        };
        let assistant = NewConversation {
            goal_id: Some(goal_id.to_string()),
            session_id: goal_id.to_string(),
            role: ConversationRole::Assistant,
            content: output.response.clone(),
            agent_type: Some(output.agent_type),
            metadata: Some(json!({
                "intent": classified.intent,
                "confidence": classified.confidence,
                "fallback": classification.is_defaulted(),
            })),
        };
        self.stores.conversations.append_exchange(&user, &assistant)
    }
}
