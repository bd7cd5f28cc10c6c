//! Intent classification.
//!
//! One single-shot completion per message, no tools. Any router or parse
//! failure yields the deterministic fallback for the current context, so
//! classification never fails.

use std::fmt::Write;
use std::sync::Arc;

use serde::Deserialize;

use super::prompts::CLASSIFIER_PROMPT;
use super::types::{ClassifiedIntent, ConversationRole, Fallback, Intent, SessionContext};
use crate::inference::{CompletionRequest, Message, ProviderRouter};

/// Confidence attached to every fallback classification.
pub const FALLBACK_CONFIDENCE: f64 = 0.6;

/// Characters kept from each history turn in the classifier summary.
const TURN_PREVIEW_CHARS: usize = 200;

pub struct IntentClassifier {
    router: Arc<ProviderRouter>,
    history_turns: usize,
}

impl IntentClassifier {
    pub fn new(router: Arc<ProviderRouter>, history_turns: usize) -> Self {
        Self {
            router,
            history_turns,
        }
    }

    pub async fn classify(
        &self,
        message: &str,
        ctx: &SessionContext,
    ) -> Fallback<ClassifiedIntent> {
        let request = CompletionRequest {
            system_prompt: CLASSIFIER_PROMPT.to_string(),
            messages: vec![Message::user(self.build_user_message(message, ctx))],
            ..Default::default()
        };

        let response = match self.router.complete(&request, &[]).await {
            Ok(r) => r,
            Err(e) => {
                return Fallback::Defaulted {
                    value: fallback_for(ctx),
                    cause: format!("classifier completion failed: {e}"),
                }
            }
        };

        match parse_classification(&response.content) {
            Ok(classified) => Fallback::Primary(classified),
            Err(reason) => Fallback::Defaulted {
                value: fallback_for(ctx),
                cause: reason,
            },
        }
    }

    fn build_user_message(&self, message: &str, ctx: &SessionContext) -> String {
        let mut out = String::from("## Current Context\n\n");
        let goal_title = ctx.goal.as_ref().map_or("None set yet", |g| g.title.as_str());
        let _ = writeln!(out, "**Current Goal**: {goal_title}");
        let _ = writeln!(
            out,
            "**Tasks**: {} total, {} completed",
            ctx.tasks.len(),
            ctx.tasks_completed
        );
        let _ = writeln!(out, "**Session State**: {}", ctx.state.as_str());

        if !ctx.conversations.is_empty() {
            out.push_str("\n## Recent Conversation\n\n");
            let start = ctx.conversations.len().saturating_sub(self.history_turns);
            for turn in &ctx.conversations[start..] {
                let speaker = match turn.role {
                    ConversationRole::Assistant => "Coach",
                    _ => "User",
                };
                let _ = write!(out, "**{speaker}**: {}\n\n", preview(&turn.content));
            }
        }

        let _ = write!(out, "## Current User Message\n\n\"{message}\"");
        out
    }
}

/// Truncate on a char boundary.
fn preview(content: &str) -> String {
    match content.char_indices().nth(TURN_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

#[derive(Deserialize)]
struct RawClassification {
    intent: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    reason: String,
}

/// Parse the model's reply, tolerating prose or fences around the JSON.
pub fn parse_classification(content: &str) -> Result<ClassifiedIntent, String> {
    let trimmed = content.trim();
    let json = match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if end > start => &trimmed[start..=end],
        _ => trimmed,
    };

    let raw: RawClassification =
        serde_json::from_str(json).map_err(|e| format!("unparseable classification: {e}"))?;
    let intent = Intent::parse(&raw.intent)
        .ok_or_else(|| format!("unknown intent '{}'", raw.intent))?;

    Ok(ClassifiedIntent::new(intent, raw.confidence, raw.reason))
}

/// The deterministic classification used when the model's answer is unusable.
pub fn fallback_for(ctx: &SessionContext) -> ClassifiedIntent {
    if ctx.goal.is_none() {
        ClassifiedIntent::new(
            Intent::Planning,
            FALLBACK_CONFIDENCE,
            "Fallback: No goal set, defaulting to planning",
        )
    } else if ctx.tasks.is_empty() {
        ClassifiedIntent::new(
            Intent::Planning,
            FALLBACK_CONFIDENCE,
            "Fallback: No tasks created yet, continuing planning",
        )
    } else {
        ClassifiedIntent::new(
            Intent::Execution,
            FALLBACK_CONFIDENCE,
            "Fallback: Goal and tasks exist, defaulting to execution",
        )
    }
}
