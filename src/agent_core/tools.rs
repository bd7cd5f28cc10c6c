//! Static tool catalogs for the behavior agents.
//!
//! Declarations are plain data; [`super::actions::ActionExecutor`] decides
//! which of them have side effects.

use crate::inference::types::{ParamType, ToolDeclaration, ToolParam};

const fn param(
    name: &'static str,
    param_type: ParamType,
    description: &'static str,
    required: bool,
) -> ToolParam {
    ToolParam {
        name,
        param_type,
        description,
        required,
        enum_values: &[],
    }
}

// ─── Tool Names ─────────────────────────────────────────────────────────────

pub const CREATE_MILESTONE: &str = "create_milestone";
pub const CREATE_TASK: &str = "create_task";
pub const SUGGEST_RESOURCES: &str = "suggest_resources";
pub const ASK_CLARIFYING_QUESTION: &str = "ask_clarifying_question";
pub const PRESENT_TASK: &str = "present_task";
pub const PROVIDE_HINT: &str = "provide_hint";
pub const MARK_COMPLETE: &str = "mark_complete";
pub const LOG_STRUGGLE: &str = "log_struggle";

// ─── Planner ────────────────────────────────────────────────────────────────

pub const PLANNER_TOOLS: &[ToolDeclaration] = &[
    ToolDeclaration {
        name: CREATE_MILESTONE,
        description: "Create a milestone: a major checkpoint toward the goal, spanning a range of weeks",
        params: &[
            param("title", ParamType::String, "Milestone title", true),
            param("description", ParamType::String, "What the milestone covers", true),
            param("week_start", ParamType::Integer, "First week of the milestone", true),
            param("week_end", ParamType::Integer, "Last week of the milestone", true),
        ],
    },
    ToolDeclaration {
        name: CREATE_TASK,
        description: "Create a concrete task for the user to complete",
        params: &[
            param("title", ParamType::String, "Task title", true),
            param("description", ParamType::String, "Task details", false),
            param("due_date", ParamType::String, "Due date as YYYY-MM-DD", false),
            param("estimated_minutes", ParamType::Integer, "Estimated effort in minutes", false),
            param("difficulty", ParamType::Integer, "Difficulty from 1 (easy) to 5 (hard)", false),
            param("priority", ParamType::Integer, "Priority, higher is more important", false),
        ],
    },
    ToolDeclaration {
        name: SUGGEST_RESOURCES,
        description: "Suggest learning resources that support the plan",
        params: &[param(
            "resources",
            ParamType::Array,
            "Resources, each described by title, type and url",
            true,
        )],
    },
    ToolDeclaration {
        name: ASK_CLARIFYING_QUESTION,
        description: "Ask the user a question when key planning information is missing",
        params: &[param("question", ParamType::String, "The question to ask", true)],
    },
];

// ─── Executor ───────────────────────────────────────────────────────────────

pub const EXECUTOR_TOOLS: &[ToolDeclaration] = &[
    ToolDeclaration {
        name: PRESENT_TASK,
        description: "Present a task to the user with context and guidance",
        params: &[
            param("task_id", ParamType::String, "Id of the task to present", true),
            param("approach", ParamType::String, "Suggested way to tackle the task", false),
            param("tips", ParamType::Array, "Short tips for completing the task", false),
        ],
    },
    ToolDeclaration {
        name: PROVIDE_HINT,
        description: "Give the user a hint for the task they are working on",
        params: &[
            param("hint_level", ParamType::Integer, "1 = subtle, 2 = moderate, 3 = explicit", true),
            param("hint", ParamType::String, "The hint text", true),
        ],
    },
    ToolDeclaration {
        name: MARK_COMPLETE,
        description: "Record that a task is finished",
        params: &[
            param("task_id", ParamType::String, "Id of the task", true),
            param("actual_minutes", ParamType::Integer, "Time actually spent, in minutes", false),
        ],
    },
    ToolDeclaration {
        name: LOG_STRUGGLE,
        description: "Record that the user is stuck on or struggled with a task",
        params: &[
            param("task_id", ParamType::String, "Id of the task", true),
            param("notes", ParamType::String, "What the user struggled with", true),
        ],
    },
];
