//! Goal and task commands.
//!
//! Plain CRUD over the record stores. The coaching pipeline never calls
//! these; they back the CLI and any other front end.

use crate::agent_core::{AgentError, Goal, GoalStore, NewGoal, NewTask, Task, TaskStore};
use crate::AppState;

fn err_string(e: AgentError) -> String {
    e.to_string()
}

// ─── Goals ──────────────────────────────────────────────────────────────────

pub fn create_goal(state: &AppState, goal: NewGoal) -> Result<Goal, String> {
    if goal.title.trim().is_empty() {
        return Err("goal title must not be empty".into());
    }
    let created = state.db.create_goal(&goal).map_err(err_string)?;
    tracing::info!(goal_id = %created.id, title = %created.title, "goal created");
    Ok(created)
}

pub fn get_goal(state: &AppState, goal_id: &str) -> Result<Goal, String> {
    state
        .db
        .get_goal(goal_id)
        .map_err(err_string)?
        .ok_or_else(|| AgentError::not_found("goal", goal_id).to_string())
}

pub fn list_goals(state: &AppState) -> Result<Vec<Goal>, String> {
    state.db.list_goals().map_err(err_string)
}

pub fn update_goal(state: &AppState, goal: Goal) -> Result<Goal, String> {
    if goal.title.trim().is_empty() {
        return Err("goal title must not be empty".into());
    }
    state.db.update_goal(&goal).map_err(err_string)
}

/// Delete a goal with its tasks and conversation history.
pub fn delete_goal(state: &AppState, goal_id: &str) -> Result<(), String> {
    state.db.delete_goal(goal_id).map_err(err_string)?;
    tracing::info!(goal_id, "goal deleted");
    Ok(())
}

// ─── Tasks ──────────────────────────────────────────────────────────────────

pub fn create_task(state: &AppState, task: NewTask) -> Result<Task, String> {
    if task.title.trim().is_empty() {
        return Err("task title must not be empty".into());
    }
    get_goal(state, &task.goal_id)?;
    state.db.create_task(&task).map_err(err_string)
}

pub fn get_task(state: &AppState, task_id: &str) -> Result<Task, String> {
    state
        .db
        .get_task(task_id)
        .map_err(err_string)?
        .ok_or_else(|| AgentError::not_found("task", task_id).to_string())
}

pub fn update_task(state: &AppState, task: Task) -> Result<Task, String> {
    state.db.update_task(&task).map_err(err_string)
}

pub fn delete_task(state: &AppState, task_id: &str) -> Result<(), String> {
    state.db.delete_task(task_id).map_err(err_string)
}

pub fn list_tasks_for_goal(state: &AppState, goal_id: &str) -> Result<Vec<Task>, String> {
    state.db.list_tasks_for_goal(goal_id).map_err(err_string)
}

/// Open tasks due today across all goals.
pub fn list_todays_tasks(state: &AppState) -> Result<Vec<Task>, String> {
    state.db.list_due_today().map_err(err_string)
}

pub fn complete_task(
    state: &AppState,
    task_id: &str,
    actual_minutes: Option<i64>,
) -> Result<Task, String> {
    state
        .db
        .mark_complete(task_id, actual_minutes.unwrap_or(0))
        .map_err(err_string)?;
    get_task(state, task_id)
}

pub fn log_struggle(state: &AppState, task_id: &str, notes: &str) -> Result<Task, String> {
    if notes.trim().is_empty() {
        return Err("struggle notes must not be empty".into());
    }
    state.db.log_struggle(task_id, notes).map_err(err_string)?;
    get_task(state, task_id)
}
