//! Action executor: turns model tool calls into task mutations.
//!
//! Only `create_task`, `mark_complete` and `log_struggle` have side effects.
//! Every other tool name echoes its arguments back as the result.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use super::errors::AgentError;
use super::stores::TaskStore;
use super::tools::{CREATE_TASK, LOG_STRUGGLE, MARK_COMPLETE};
use super::types::{NewTask, SessionContext, TaskStatus};
use crate::inference::ToolArguments;

// ─── Typed Arguments ────────────────────────────────────────────────────────

/// Accept any JSON number as an integer (`45.0` -> 45); anything else is absent.
fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(|v| match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    }))
}

/// Accept a JSON string; anything else is absent.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

#[derive(Debug, Deserialize)]
struct CreateTaskArgs {
    title: String,
    #[serde(default, deserialize_with = "lenient_text")]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    due_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    estimated_minutes: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    difficulty: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    priority: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct MarkCompleteArgs {
    task_id: String,
    #[serde(default, deserialize_with = "lenient_int")]
    actual_minutes: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct LogStruggleArgs {
    task_id: String,
    notes: String,
}

/// Decode the argument map into a tool's typed argument struct.
fn decode_args<T: DeserializeOwned>(tool: &str, args: &ToolArguments) -> Result<T, AgentError> {
    serde_json::from_value(Value::Object(args.clone())).map_err(|e| {
        AgentError::InvalidToolArguments {
            tool: tool.to_string(),
            reason: e.to_string(),
        }
    })
}

fn require_non_blank(tool: &str, field: &str, value: &str) -> Result<(), AgentError> {
    if value.trim().is_empty() {
        return Err(AgentError::InvalidToolArguments {
            tool: tool.to_string(),
            reason: format!("'{field}' must not be empty"),
        });
    }
    Ok(())
}

// ─── ActionExecutor ─────────────────────────────────────────────────────────

/// Dispatches tool calls to their side effects.
pub struct ActionExecutor {
    tasks: Arc<dyn TaskStore>,
}

impl ActionExecutor {
    pub fn new(tasks: Arc<dyn TaskStore>) -> Self {
        Self { tasks }
    }

    /// Run one tool call and return its result payload.
    pub fn execute(
        &self,
        tool: &str,
        args: &ToolArguments,
        ctx: &SessionContext,
    ) -> Result<Value, AgentError> {
        match tool {
            CREATE_TASK => self.create_task(decode_args(tool, args)?, ctx),
            MARK_COMPLETE => self.mark_complete(decode_args(tool, args)?),
            LOG_STRUGGLE => self.log_struggle(decode_args(tool, args)?),
            _ => {
                tracing::debug!(tool, "tool has no side effect, echoing arguments");
                Ok(Value::Object(args.clone()))
            }
        }
    }

    fn create_task(&self, args: CreateTaskArgs, ctx: &SessionContext) -> Result<Value, AgentError> {
        require_non_blank(CREATE_TASK, "title", &args.title)?;
        let goal = ctx.goal.as_ref().ok_or_else(|| AgentError::MissingGoal {
            tool: CREATE_TASK.to_string(),
        })?;

        let due_date = args.due_date.as_deref().and_then(|raw| {
            match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(_) => {
                    tracing::debug!(due_date = raw, "ignoring unparseable due date");
                    None
                }
            }
        });

        let task = self.tasks.create_task(&NewTask {
            goal_id: goal.id.clone(),
            parent_id: None,
            title: args.title,
            description: args.description.unwrap_or_default(),
            due_date,
            status: TaskStatus::Pending,
            priority: args.priority.unwrap_or(0),
            difficulty_rating: args.difficulty,
            estimated_minutes: args.estimated_minutes,
        })?;

        tracing::info!(goal_id = %goal.id, task_id = %task.id, "task created by agent");
        Ok(json!({
            "task_id": task.id,
            "message": "Task created successfully",
        }))
    }

    fn mark_complete(&self, args: MarkCompleteArgs) -> Result<Value, AgentError> {
        let minutes = args.actual_minutes.unwrap_or(0);
        self.tasks.mark_complete(&args.task_id, minutes)?;
        tracing::info!(task_id = %args.task_id, actual_minutes = minutes, "task marked complete");
        Ok(json!({ "message": "Task marked as complete" }))
    }

    fn log_struggle(&self, args: LogStruggleArgs) -> Result<Value, AgentError> {
        self.tasks.log_struggle(&args.task_id, &args.notes)?;
        tracing::info!(task_id = %args.task_id, "struggle logged");
        Ok(json!({ "message": "Struggle logged" }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_core::database::CoachDatabase;
    use crate::agent_core::stores::GoalStore;
    use crate::agent_core::types::{Goal, NewGoal};
    use crate::agent_core::tools::{PRESENT_TASK, SUGGEST_RESOURCES};

    fn args(value: Value) -> ToolArguments {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn setup() -> (Arc<CoachDatabase>, ActionExecutor, SessionContext) {
        let db = Arc::new(CoachDatabase::open(":memory:").unwrap());
        let goal: Goal = db
            .create_goal(&NewGoal {
                title: "Learn to cook".into(),
                ..Default::default()
            })
            .unwrap();
        let ctx = SessionContext {
            goal: Some(goal),
            ..Default::default()
        };
        (db.clone(), ActionExecutor::new(db), ctx)
    }

    fn created_task_id(result: &Value) -> String {
        result["task_id"].as_str().unwrap().to_string()
    }

    #[test]
    fn test_create_task_with_all_fields() {
        let (db, actions, ctx) = setup();
        let result = actions
            .execute(
                CREATE_TASK,
                &args(json!({
                    "title": "Make an omelette",
                    "description": "Three eggs",
                    "due_date": "2026-06-01",
                    "estimated_minutes": 45.0,
                    "difficulty": 2,
                    "priority": 3
                })),
                &ctx,
            )
            .unwrap();
        assert_eq!(result["message"], "Task created successfully");

        let task = db.get_task(&created_task_id(&result)).unwrap().unwrap();
        assert_eq!(task.title, "Make an omelette");
        assert_eq!(task.description, "Three eggs");
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2026, 6, 1));
        assert_eq!(task.estimated_minutes, Some(45));
        assert_eq!(task.difficulty_rating, Some(2));
        assert_eq!(task.priority, 3);
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.goal_id, ctx.goal.as_ref().unwrap().id);
    }

    #[test]
    fn test_create_task_ignores_bad_optional_fields() {
        let (db, actions, ctx) = setup();
        let result = actions
            .execute(
                CREATE_TASK,
                &args(json!({
                    "title": "Boil pasta",
                    "due_date": "next tuesday",
                    "estimated_minutes": "a while",
                    "priority": null
                })),
                &ctx,
            )
            .unwrap();

        let task = db.get_task(&created_task_id(&result)).unwrap().unwrap();
        assert_eq!(task.due_date, None);
        assert_eq!(task.estimated_minutes, None);
        assert_eq!(task.priority, 0);
    }

    #[test]
    fn test_create_task_requires_title() {
        let (_db, actions, ctx) = setup();
        let err = actions
            .execute(CREATE_TASK, &args(json!({"description": "no title"})), &ctx)
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidToolArguments { .. }));

        let err = actions
            .execute(CREATE_TASK, &args(json!({"title": "   "})), &ctx)
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidToolArguments { .. }));
    }

    #[test]
    fn test_create_task_without_goal_fails() {
        let (_db, actions, _ctx) = setup();
        let err = actions
            .execute(
                CREATE_TASK,
                &args(json!({"title": "Orphan"})),
                &SessionContext::default(),
            )
            .unwrap_err();
        assert!(matches!(err, AgentError::MissingGoal { .. }));
    }

    #[test]
    fn test_mark_complete_defaults_minutes() {
        let (db, actions, ctx) = setup();
        let created = actions
            .execute(CREATE_TASK, &args(json!({"title": "Chop onions"})), &ctx)
            .unwrap();
        let id = created_task_id(&created);

        let result = actions
            .execute(
                MARK_COMPLETE,
                &args(json!({"task_id": id, "actual_minutes": "ten"})),
                &ctx,
            )
            .unwrap();
        assert_eq!(result["message"], "Task marked as complete");

        let task = db.get_task(&id).unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.actual_minutes, Some(0));
    }

    #[test]
    fn test_mark_complete_unknown_task_is_not_found() {
        let (_db, actions, ctx) = setup();
        let err = actions
            .execute(MARK_COMPLETE, &args(json!({"task_id": "missing"})), &ctx)
            .unwrap_err();
        assert!(matches!(err, AgentError::NotFound { entity: "task", .. }));
    }

    #[test]
    fn test_log_struggle() {
        let (db, actions, ctx) = setup();
        let created = actions
            .execute(CREATE_TASK, &args(json!({"title": "Fold dumplings"})), &ctx)
            .unwrap();
        let id = created_task_id(&created);

        let result = actions
            .execute(
                LOG_STRUGGLE,
                &args(json!({"task_id": id, "notes": "dough keeps tearing"})),
                &ctx,
            )
            .unwrap();
        assert_eq!(result["message"], "Struggle logged");
        assert_eq!(db.get_task(&id).unwrap().unwrap().struggle_notes, "dough keeps tearing");

        let err = actions
            .execute(LOG_STRUGGLE, &args(json!({"task_id": "missing", "notes": "x"})), &ctx)
            .unwrap_err();
        assert!(matches!(err, AgentError::NotFound { .. }));

        let err = actions
            .execute(LOG_STRUGGLE, &args(json!({"task_id": id})), &ctx)
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidToolArguments { .. }));
    }

    #[test]
    fn test_other_tools_echo_arguments() {
        let (_db, actions, ctx) = setup();
        let input = args(json!({"resources": ["The Food Lab"]}));
        let result = actions.execute(SUGGEST_RESOURCES, &input, &ctx).unwrap();
        assert_eq!(result, Value::Object(input));

        let input = args(json!({"task_id": "t1", "tips": ["mise en place"]}));
        assert_eq!(
            actions.execute(PRESENT_TASK, &input, &ctx).unwrap(),
            Value::Object(input.clone())
        );
        assert_eq!(
            actions.execute("not_a_tool", &input, &ctx).unwrap(),
            Value::Object(input)
        );
    }
}
