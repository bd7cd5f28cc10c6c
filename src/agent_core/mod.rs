//! Agent Core — coaching pipeline on top of the inference layer.
//!
//! Submodules:
//! - `types`: goal, task and conversation records; intents; agent I/O
//! - `errors`: agent-level error types
//! - `stores`: narrow record-store traits
//! - `database`: SQLite implementation of every store
//! - `context`: per-message session context and its prompt rendering
//! - `classifier`: intent classification with deterministic fallback
//! - `tools` / `prompts`: static tool catalogs and prompt texts
//! - `actions`: tool-call side effects
//! - `agent`: agent profiles and the shared tool-calling loop
//! - `orchestrator`: classify, route, run, persist

pub mod actions;
pub mod agent;
pub mod classifier;
pub mod context;
pub mod database;
pub mod errors;
pub mod orchestrator;
pub mod prompts;
pub mod stores;
pub mod tools;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use actions::ActionExecutor;
pub use agent::{AgentProfile, BehaviorAgent};
pub use classifier::IntentClassifier;
pub use database::CoachDatabase;
pub use errors::AgentError;
pub use orchestrator::{Orchestrator, OrchestratorLimits};
pub use stores::{ConversationStore, GoalStore, Stores, TaskStore};
pub use types::{
    AgentOutput, AgentType, ClassifiedIntent, Conversation, Fallback, Goal, GoalStatus, Intent,
    NewGoal, NewTask, SessionContext, Task, TaskStatus, WorkflowState,
};
