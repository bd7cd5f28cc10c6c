//! Shared types for the agent core.
//!
//! Goal, task and conversation records as stored; the per-request session
//! context; intents; and agent input/output.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Onboarding answers and other free-form goal context.
pub type GoalContext = serde_json::Map<String, serde_json::Value>;

// ─── Goals ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    #[default]
    Active,
    Paused,
    Completed,
    Abandoned,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::Active => "active",
            GoalStatus::Paused => "paused",
            GoalStatus::Completed => "completed",
            GoalStatus::Abandoned => "abandoned",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "active" => Some(GoalStatus::Active),
            "paused" => Some(GoalStatus::Paused),
            "completed" => Some(GoalStatus::Completed),
            "abandoned" => Some(GoalStatus::Abandoned),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub title: String,
    pub description: String,
    pub target_date: Option<NaiveDate>,
    pub status: GoalStatus,
    /// Onboarding answers, rendered into agent prompts.
    pub context: Option<GoalContext>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a goal (no DB fields).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewGoal {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub context: Option<GoalContext>,
}

// ─── Tasks ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Skipped,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Skipped => "skipped",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            "skipped" => Some(TaskStatus::Skipped),
            _ => None,
        }
    }

    /// Pending or in progress.
    pub fn is_open(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::InProgress)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub goal_id: String,
    pub parent_id: Option<String>,
    pub title: String,
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub status: TaskStatus,
    pub priority: i64,
    pub difficulty_rating: Option<i64>,
    pub estimated_minutes: Option<i64>,
    pub actual_minutes: Option<i64>,
    /// Empty when no struggle has been logged.
    pub struggle_notes: String,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn has_struggle(&self) -> bool {
        !self.struggle_notes.trim().is_empty()
    }
}

/// Input for creating a task (no DB fields).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub goal_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub difficulty_rating: Option<i64>,
    #[serde(default)]
    pub estimated_minutes: Option<i64>,
}

// ─── Conversations ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationRole {
    User,
    Assistant,
    System,
}

impl ConversationRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationRole::User => "user",
            ConversationRole::Assistant => "assistant",
            ConversationRole::System => "system",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "user" => Some(ConversationRole::User),
            "assistant" => Some(ConversationRole::Assistant),
            "system" => Some(ConversationRole::System),
            _ => None,
        }
    }
}

/// Which behavior agent produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    Planner,
    Executor,
}

impl AgentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::Planner => "planner",
            AgentType::Executor => "executor",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "planner" => Some(AgentType::Planner),
            "executor" => Some(AgentType::Executor),
            _ => None,
        }
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored dialogue turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub goal_id: Option<String>,
    pub session_id: String,
    pub role: ConversationRole,
    pub content: String,
    pub agent_type: Option<AgentType>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewConversation {
    pub goal_id: Option<String>,
    pub session_id: String,
    pub role: ConversationRole,
    pub content: String,
    pub agent_type: Option<AgentType>,
    pub metadata: Option<serde_json::Value>,
}

// ─── Session Context ────────────────────────────────────────────────────────

/// Coarse workflow state derived per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    /// No goal exists for the session key.
    GoalSetting,
    /// A goal exists but has no tasks.
    Planning,
    /// A goal with at least one task.
    Active,
}

impl WorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::GoalSetting => "goal_setting",
            WorkflowState::Planning => "planning",
            WorkflowState::Active => "active",
        }
    }
}

/// Read projection over stored records, rebuilt for every message.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub goal: Option<Goal>,
    pub tasks: Vec<Task>,
    /// Open tasks of this goal due today.
    pub todays_tasks: Vec<Task>,
    /// Recent turns, oldest first.
    pub conversations: Vec<Conversation>,
    pub tasks_completed: usize,
    pub recent_struggles: usize,
    pub streak_days: u32,
    pub state: WorkflowState,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self {
            goal: None,
            tasks: Vec::new(),
            todays_tasks: Vec::new(),
            conversations: Vec::new(),
            tasks_completed: 0,
            recent_struggles: 0,
            streak_days: 0,
            state: WorkflowState::GoalSetting,
        }
    }
}

// ─── Intents ────────────────────────────────────────────────────────────────

/// What the user wants from the current message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Intent {
    Planning,
    Execution,
    Evaluation,
    /// Accepted from parsers but never requested by the classifier prompt.
    Accountability,
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Planning => "PLANNING",
            Intent::Execution => "EXECUTION",
            Intent::Evaluation => "EVALUATION",
            Intent::Accountability => "ACCOUNTABILITY",
            Intent::General => "GENERAL",
        }
    }

    /// Case-insensitive parse of a category label.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PLANNING" => Some(Intent::Planning),
            "EXECUTION" => Some(Intent::Execution),
            "EVALUATION" => Some(Intent::Evaluation),
            "ACCOUNTABILITY" => Some(Intent::Accountability),
            "GENERAL" => Some(Intent::General),
            _ => None,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedIntent {
    pub intent: Intent,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub reason: String,
}

impl ClassifiedIntent {
    pub fn new(intent: Intent, confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            intent,
            confidence: confidence.clamp(0.0, 1.0),
            reason: reason.into(),
        }
    }
}

/// A value that is either the primary result or a designated default.
///
/// Used where a failure has a well-defined substitute, so the absorption is
/// visible in the type instead of hidden behind a log line.
#[derive(Debug, Clone, PartialEq)]
pub enum Fallback<T> {
    Primary(T),
    Defaulted { value: T, cause: String },
}

impl<T> Fallback<T> {
    pub fn value(&self) -> &T {
        match self {
            Fallback::Primary(value) | Fallback::Defaulted { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Fallback::Primary(value) | Fallback::Defaulted { value, .. } => value,
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, Fallback::Defaulted { .. })
    }

    /// Why the default was used, if it was.
    pub fn cause(&self) -> Option<&str> {
        match self {
            Fallback::Primary(_) => None,
            Fallback::Defaulted { cause, .. } => Some(cause),
        }
    }
}

// ─── Agent I/O ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct AgentInput<'a> {
    pub message: &'a str,
    pub context: &'a SessionContext,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    pub response: String,
    pub agent_type: AgentType,
    /// Suggested next workflow state. Nothing consumes it yet.
    pub next_state: Option<WorkflowState>,
    /// Whether both turn records were stored.
    pub persisted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_parse_accepts_any_case() {
        assert_eq!(Intent::parse("execution"), Some(Intent::Execution));
        assert_eq!(Intent::parse(" Planning "), Some(Intent::Planning));
        assert_eq!(Intent::parse("ACCOUNTABILITY"), Some(Intent::Accountability));
        assert_eq!(Intent::parse("CHITCHAT"), None);
    }

    #[test]
    fn test_intent_serializes_uppercase() {
        let json = serde_json::to_string(&Intent::General).unwrap();
        assert_eq!(json, "\"GENERAL\"");
    }

    #[test]
    fn test_classified_intent_clamps_confidence() {
        assert_eq!(ClassifiedIntent::new(Intent::General, 1.7, "").confidence, 1.0);
        assert_eq!(ClassifiedIntent::new(Intent::General, -0.2, "").confidence, 0.0);
    }

    #[test]
    fn test_fallback_accessors() {
        let primary = Fallback::Primary(3);
        assert!(!primary.is_defaulted());
        assert_eq!(primary.cause(), None);
        assert_eq!(*primary.value(), 3);

        let defaulted = Fallback::Defaulted {
            value: 7,
            cause: "backend down".to_string(),
        };
        assert!(defaulted.is_defaulted());
        assert_eq!(defaulted.cause(), Some("backend down"));
        assert_eq!(defaulted.into_value(), 7);
    }

    #[test]
    fn test_status_round_trip_strings() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Skipped,
        ] {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(GoalStatus::parse("paused"), Some(GoalStatus::Paused));
        assert_eq!(AgentType::parse("planner"), Some(AgentType::Planner));
        assert_eq!(AgentType::parse("evaluator"), None);
    }

    #[test]
    fn test_task_status_open() {
        assert!(TaskStatus::Pending.is_open());
        assert!(TaskStatus::InProgress.is_open());
        assert!(!TaskStatus::Completed.is_open());
        assert!(!TaskStatus::Skipped.is_open());
    }
}
