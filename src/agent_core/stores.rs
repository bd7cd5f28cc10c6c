//! Narrow record-store interfaces the agent core reads and writes through.
//!
//! [`super::database::CoachDatabase`] implements all of them; tests swap in
//! doubles for single stores.

use std::sync::Arc;

use chrono::NaiveDate;

use super::database::CoachDatabase;
use super::errors::AgentError;
use super::types::{Conversation, Goal, NewConversation, NewGoal, NewTask, Task};

/// Provider config persistence lives with the router it feeds.
pub use crate::inference::ProviderConfigStore;

pub trait GoalStore: Send + Sync {
    fn create_goal(&self, goal: &NewGoal) -> Result<Goal, AgentError>;

    /// `Ok(None)` when no goal has this id.
    fn get_goal(&self, id: &str) -> Result<Option<Goal>, AgentError>;

    fn update_goal(&self, goal: &Goal) -> Result<Goal, AgentError>;

    fn delete_goal(&self, id: &str) -> Result<(), AgentError>;

    /// Newest first.
    fn list_goals(&self) -> Result<Vec<Goal>, AgentError>;
}

pub trait TaskStore: Send + Sync {
    fn create_task(&self, task: &NewTask) -> Result<Task, AgentError>;

    fn get_task(&self, id: &str) -> Result<Option<Task>, AgentError>;

    fn update_task(&self, task: &Task) -> Result<Task, AgentError>;

    fn delete_task(&self, id: &str) -> Result<(), AgentError>;

    /// Highest priority first, then earliest due date; undated tasks last.
    fn list_tasks_for_goal(&self, goal_id: &str) -> Result<Vec<Task>, AgentError>;

    /// Open tasks across all goals due on `date`.
    fn list_due_on(&self, date: NaiveDate) -> Result<Vec<Task>, AgentError>;

    fn list_due_today(&self) -> Result<Vec<Task>, AgentError> {
        self.list_due_on(chrono::Local::now().date_naive())
    }

    /// Fails with `NotFound` if no task has this id.
    fn mark_complete(&self, id: &str, actual_minutes: i64) -> Result<(), AgentError>;

    /// Overwrites the task's struggle notes. Fails with `NotFound`.
    fn log_struggle(&self, id: &str, notes: &str) -> Result<(), AgentError>;
}

pub trait ConversationStore: Send + Sync {
    fn append_conversation(&self, turn: &NewConversation) -> Result<Conversation, AgentError>;

    /// Store a user turn and the answer to it. Either both rows are written
    /// or neither is.
    fn append_exchange(
        &self,
        user: &NewConversation,
        assistant: &NewConversation,
    ) -> Result<(), AgentError>;

    /// The newest `limit` turns for a goal, returned oldest first.
    fn recent_for_goal(&self, goal_id: &str, limit: usize)
        -> Result<Vec<Conversation>, AgentError>;
}

/// The stores the orchestrator and action executor depend on.
#[derive(Clone)]
pub struct Stores {
    pub goals: Arc<dyn GoalStore>,
    pub tasks: Arc<dyn TaskStore>,
    pub conversations: Arc<dyn ConversationStore>,
}

impl Stores {
    /// All three stores backed by the same database.
    pub fn from_database(db: Arc<CoachDatabase>) -> Self {
        Self {
            goals: db.clone(),
            tasks: db.clone(),
            conversations: db,
        }
    }
}
