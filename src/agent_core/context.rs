//! Session context assembly.
//!
//! The context is a read projection rebuilt for every message: the goal, its
//! tasks, today's open tasks, recent turns and a few counters. Agents render
//! it into their system prompt through [`render_context_block`].

use std::collections::BTreeSet;
use std::fmt::Write;

use chrono::{Local, NaiveDate};

use super::errors::AgentError;
use super::stores::Stores;
use super::types::{SessionContext, Task, TaskStatus, WorkflowState};

/// Pending-task titles shown when nothing is due today.
const PENDING_PREVIEW: usize = 5;

/// Build the session context for `goal_id`.
///
/// Only the goal lookup propagates its error. Task and conversation fetch
/// failures are logged and leave the corresponding lists empty.
pub fn build_session_context(
    stores: &Stores,
    goal_id: &str,
    history_window: usize,
) -> Result<SessionContext, AgentError> {
    let mut ctx = SessionContext {
        goal: stores.goals.get_goal(goal_id)?,
        ..Default::default()
    };

    if let Some(goal) = &ctx.goal {
        ctx.tasks = stores
            .tasks
            .list_tasks_for_goal(&goal.id)
            .unwrap_or_else(|e| {
                tracing::warn!(goal_id = %goal.id, error = %e, "failed to load tasks for context");
                Vec::new()
            });

        ctx.todays_tasks = match stores.tasks.list_due_today() {
            Ok(due) => due.into_iter().filter(|t| t.goal_id == goal.id).collect(),
            Err(e) => {
                tracing::warn!(goal_id = %goal.id, error = %e, "failed to load today's tasks");
                Vec::new()
            }
        };

        ctx.tasks_completed = ctx
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count();
        ctx.recent_struggles = ctx.tasks.iter().filter(|t| t.has_struggle()).count();
        ctx.streak_days = streak_days(&ctx.tasks, Local::now().date_naive());
        ctx.state = if ctx.tasks.is_empty() {
            WorkflowState::Planning
        } else {
            WorkflowState::Active
        };
    }

    ctx.conversations = stores
        .conversations
        .recent_for_goal(goal_id, history_window)
        .unwrap_or_else(|e| {
            tracing::warn!(goal_id, error = %e, "failed to load conversation history");
            Vec::new()
        });

    Ok(ctx)
}

/// Consecutive days, ending today or yesterday, with at least one completion.
///
/// Days are taken in local time so the count matches what the user sees.
pub fn streak_days(tasks: &[Task], today: NaiveDate) -> u32 {
    let days: BTreeSet<NaiveDate> = tasks
        .iter()
        .filter_map(|t| t.completed_at)
        .map(|ts| ts.with_timezone(&Local).date_naive())
        .collect();

    let mut cursor = if days.contains(&today) {
        today
    } else {
        match today.pred_opt() {
            Some(yesterday) if days.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };

    let mut streak = 0;
    while days.contains(&cursor) {
        streak += 1;
        match cursor.pred_opt() {
            Some(prev) => cursor = prev,
            None => break,
        }
    }
    streak
}

// ─── Rendering ──────────────────────────────────────────────────────────────

fn status_marker(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Completed => "[x]",
        TaskStatus::InProgress => "[>]",
        _ => "[ ]",
    }
}

/// Render the "Current Context" section inserted into agent system prompts.
pub fn render_context_block(ctx: &SessionContext) -> String {
    let mut out = String::from("\n\n## Current Context\n\n");

    // Writing into a String cannot fail.
    if let Some(goal) = &ctx.goal {
        let _ = writeln!(out, "**Current Goal**: {}", goal.title);
        if !goal.description.is_empty() {
            let _ = writeln!(out, "Description: {}", goal.description);
        }
        let _ = writeln!(out, "Status: {}", goal.status.as_str());
        if let Some(answers) = &goal.context {
            out.push_str("\nUser's onboarding answers:\n");
            for (key, value) in answers {
                match value.as_str() {
                    Some(text) => {
                        let _ = writeln!(out, "- {key}: {text}");
                    }
                    None => {
                        let _ = writeln!(out, "- {key}: {value}");
                    }
                }
            }
        }
        out.push('\n');
    }

    if !ctx.todays_tasks.is_empty() {
        out.push_str("**Today's Tasks**:\n");
        for task in &ctx.todays_tasks {
            let _ = write!(out, "- {} {}", status_marker(task.status), task.title);
            if let Some(minutes) = task.estimated_minutes {
                let _ = write!(out, " (~{minutes} min)");
            }
            out.push('\n');
        }
        out.push('\n');
    } else if !ctx.tasks.is_empty() {
        out.push_str("**Pending Tasks**:\n");
        let open: Vec<&Task> = ctx.tasks.iter().filter(|t| t.status.is_open()).collect();
        for task in open.iter().take(PENDING_PREVIEW) {
            let _ = writeln!(out, "- {}", task.title);
        }
        if open.len() > PENDING_PREVIEW {
            let _ = writeln!(out, "... and {} more", open.len() - PENDING_PREVIEW);
        }
        out.push('\n');
    }

    out.push_str("**Stats**:\n");
    let _ = writeln!(out, "- Tasks completed: {}", ctx.tasks_completed);
    let _ = writeln!(out, "- Current streak: {} days", ctx.streak_days);
    if ctx.recent_struggles > 0 {
        let _ = writeln!(out, "- Recent struggles: {}", ctx.recent_struggles);
    }

    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::agent_core::database::CoachDatabase;
    use crate::agent_core::stores::{ConversationStore, GoalStore, TaskStore};
    use crate::agent_core::types::{
        ConversationRole, Goal, GoalContext, GoalStatus, NewConversation, NewGoal, NewTask,
    };

    fn test_stores() -> (Arc<CoachDatabase>, Stores) {
        let db = Arc::new(CoachDatabase::open(":memory:").unwrap());
        let stores = Stores::from_database(db.clone());
        (db, stores)
    }

    fn sample_task(title: &str, status: TaskStatus) -> Task {
        let now = Utc::now();
        Task {
            id: title.to_string(),
            goal_id: "g".into(),
            parent_id: None,
            title: title.to_string(),
            description: String::new(),
            due_date: None,
            status,
            priority: 0,
            difficulty_rating: None,
            estimated_minutes: None,
            actual_minutes: None,
            struggle_notes: String::new(),
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn completed_on(day: NaiveDate) -> Task {
        let noon = Local
            .from_local_datetime(&day.and_hms_opt(12, 0, 0).unwrap())
            .single()
            .unwrap();
        let mut task = sample_task("done", TaskStatus::Completed);
        task.completed_at = Some(noon.with_timezone(&Utc));
        task
    }

    #[test]
    fn test_context_without_goal_is_goal_setting() {
        let (_db, stores) = test_stores();
        let ctx = build_session_context(&stores, "unknown", 10).unwrap();
        assert!(ctx.goal.is_none());
        assert_eq!(ctx.state, WorkflowState::GoalSetting);
        assert!(ctx.tasks.is_empty());
    }

    #[test]
    fn test_context_goal_without_tasks_is_planning() {
        let (db, stores) = test_stores();
        let goal = db
            .create_goal(&NewGoal {
                title: "Learn Go".into(),
                ..Default::default()
            })
            .unwrap();
        let ctx = build_session_context(&stores, &goal.id, 10).unwrap();
        assert_eq!(ctx.state, WorkflowState::Planning);
    }

    #[test]
    fn test_context_counters_and_todays_tasks() {
        let (db, stores) = test_stores();
        let goal = db
            .create_goal(&NewGoal {
                title: "Learn Go".into(),
                ..Default::default()
            })
            .unwrap();
        let other = db
            .create_goal(&NewGoal {
                title: "Other".into(),
                ..Default::default()
            })
            .unwrap();
        let today = Local::now().date_naive();

        let due = db
            .create_task(&NewTask {
                goal_id: goal.id.clone(),
                title: "Tour of Go".into(),
                due_date: Some(today),
                ..Default::default()
            })
            .unwrap();
        db.log_struggle(&due.id, "pointers").unwrap();
        let done = db
            .create_task(&NewTask {
                goal_id: goal.id.clone(),
                title: "Install toolchain".into(),
                ..Default::default()
            })
            .unwrap();
        db.mark_complete(&done.id, 10).unwrap();
        db.create_task(&NewTask {
            goal_id: other.id.clone(),
            title: "Not mine".into(),
            due_date: Some(today),
            ..Default::default()
        })
        .unwrap();

        let ctx = build_session_context(&stores, &goal.id, 10).unwrap();
        assert_eq!(ctx.state, WorkflowState::Active);
        assert_eq!(ctx.tasks.len(), 2);
        assert_eq!(ctx.tasks_completed, 1);
        assert_eq!(ctx.recent_struggles, 1);
        assert_eq!(ctx.streak_days, 1);
        assert_eq!(ctx.todays_tasks.len(), 1);
        assert_eq!(ctx.todays_tasks[0].title, "Tour of Go");
    }

    #[test]
    fn test_context_history_window() {
        let (db, stores) = test_stores();
        for i in 0..12 {
            db.append_conversation(&NewConversation {
                goal_id: Some("g1".into()),
                session_id: "g1".into(),
                role: ConversationRole::User,
                content: format!("m{i}"),
                agent_type: None,
                metadata: None,
            })
            .unwrap();
        }
        let ctx = build_session_context(&stores, "g1", 10).unwrap();
        assert_eq!(ctx.conversations.len(), 10);
        assert_eq!(ctx.conversations[0].content, "m2");
        assert_eq!(ctx.conversations[9].content, "m11");
    }

    #[test]
    fn test_streak_counts_back_from_today() {
        let today = NaiveDate::from_ymd_opt(2026, 4, 10).unwrap();
        let tasks = vec![
            completed_on(today),
            completed_on(today - Duration::days(1)),
            completed_on(today - Duration::days(2)),
            completed_on(today - Duration::days(4)),
        ];
        assert_eq!(streak_days(&tasks, today), 3);
    }

    #[test]
    fn test_streak_may_end_yesterday() {
        let today = NaiveDate::from_ymd_opt(2026, 4, 10).unwrap();
        let tasks = vec![
            completed_on(today - Duration::days(1)),
            completed_on(today - Duration::days(2)),
        ];
        assert_eq!(streak_days(&tasks, today), 2);
    }

    #[test]
    fn test_streak_broken() {
        let today = NaiveDate::from_ymd_opt(2026, 4, 10).unwrap();
        let tasks = vec![
            completed_on(today - Duration::days(2)),
            sample_task("open", TaskStatus::Pending),
        ];
        assert_eq!(streak_days(&tasks, today), 0);
    }

    fn goal_with_context() -> Goal {
        let mut answers = GoalContext::new();
        answers.insert("hours_per_week".into(), serde_json::json!(5));
        answers.insert("level".into(), serde_json::json!("beginner"));
        let now = Utc::now();
        Goal {
            id: "g".into(),
            title: "Learn Go".into(),
            description: "Build a web server".into(),
            target_date: None,
            status: GoalStatus::Active,
            context: Some(answers),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_render_goal_and_todays_tasks() {
        let mut in_progress = sample_task("Read chapter 2", TaskStatus::InProgress);
        in_progress.estimated_minutes = Some(30);
        let ctx = SessionContext {
            goal: Some(goal_with_context()),
            tasks: vec![in_progress.clone()],
            todays_tasks: vec![in_progress, sample_task("Exercises", TaskStatus::Pending)],
            tasks_completed: 4,
            streak_days: 2,
            recent_struggles: 1,
            state: WorkflowState::Active,
            ..Default::default()
        };

        let block = render_context_block(&ctx);
        assert!(block.starts_with("\n\n## Current Context\n\n**Current Goal**: Learn Go\n"));
        assert!(block.contains("Description: Build a web server\nStatus: active\n"));
        assert!(block.contains(
            "\nUser's onboarding answers:\n- hours_per_week: 5\n- level: beginner\n"
        ));
        assert!(block.contains(
            "**Today's Tasks**:\n- [>] Read chapter 2 (~30 min)\n- [ ] Exercises\n\n"
        ));
        assert!(!block.contains("**Pending Tasks**"));
        assert!(block.ends_with(
            "**Stats**:\n- Tasks completed: 4\n- Current streak: 2 days\n- Recent struggles: 1\n"
        ));
    }

    #[test]
    fn test_render_pending_preview_is_capped() {
        let mut tasks: Vec<Task> = (1..=7)
            .map(|i| sample_task(&format!("task {i}"), TaskStatus::Pending))
            .collect();
        tasks.push(sample_task("finished", TaskStatus::Completed));
        let ctx = SessionContext {
            goal: Some(goal_with_context()),
            tasks,
            state: WorkflowState::Active,
            ..Default::default()
        };

        let block = render_context_block(&ctx);
        assert!(block.contains("**Pending Tasks**:\n- task 1\n"));
        assert!(block.contains("- task 5\n... and 2 more\n"));
        assert!(!block.contains("- task 6"));
        assert!(!block.contains("finished"));
        assert!(!block.contains("Recent struggles"));
    }

    #[test]
    fn test_render_without_goal_has_only_stats() {
        let block = render_context_block(&SessionContext::default());
        assert_eq!(
            block,
            "\n\n## Current Context\n\n**Stats**:\n- Tasks completed: 0\n- Current streak: 0 days\n"
        );
    }
}
