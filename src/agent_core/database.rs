//! SQLite database for goals, tasks, conversations and provider configs.
//!
//! Uses `rusqlite` in synchronous mode behind a mutex; every call is short.
//! WAL mode is enabled so the CLI and a second reader can share the file.
//! Timestamps are stored as RFC 3339 text with microseconds, dates as
//! `YYYY-MM-DD`.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::errors::AgentError;
use super::stores::{ConversationStore, GoalStore, TaskStore};
use super::types::{
    AgentType, Conversation, ConversationRole, Goal, GoalContext, GoalStatus, NewConversation,
    NewGoal, NewTask, Task, TaskStatus,
};
use crate::inference::{InferenceError, NewProviderConfig, ProviderConfig, ProviderConfigStore};

const DATE_FORMAT: &str = "%Y-%m-%d";

const GOAL_COLUMNS: &str =
    "id, title, description, target_date, status, context, created_at, updated_at";

const TASK_COLUMNS: &str = "id, goal_id, parent_id, title, description, due_date, status, \
     priority, difficulty_rating, estimated_minutes, actual_minutes, struggle_notes, \
     completed_at, created_at, updated_at";

const CONVERSATION_COLUMNS: &str =
    "id, goal_id, session_id, role, content, agent_type, metadata, created_at";

const PROVIDER_COLUMNS: &str = "id, name, provider, base_url, api_key, default_model, \
     is_default, is_active, created_at, updated_at";

// ─── Database ───────────────────────────────────────────────────────────────

/// SQLite database handle for the coach.
pub struct CoachDatabase {
    conn: Mutex<Connection>,
}

impl CoachDatabase {
    /// Open (or create) the database at the given path.
    ///
    /// Pass `":memory:"` for an in-memory database (tests).
    pub fn open(path: &str) -> Result<Self, AgentError> {
        let conn = Connection::open(path)?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.create_tables()?;
        Ok(db)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, AgentError> {
        self.conn.lock().map_err(|e| AgentError::DatabaseError {
            reason: format!("connection lock poisoned: {e}"),
        })
    }

    /// Create all required tables if they don't exist.
    fn create_tables(&self) -> Result<(), AgentError> {
        self.conn()?.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS goals (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                target_date TEXT,
                status TEXT NOT NULL DEFAULT 'active',
                context TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                goal_id TEXT NOT NULL,
                parent_id TEXT,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                due_date TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                priority INTEGER NOT NULL DEFAULT 0,
                difficulty_rating INTEGER,
                estimated_minutes INTEGER,
                actual_minutes INTEGER,
                struggle_notes TEXT NOT NULL DEFAULT '',
                completed_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (goal_id) REFERENCES goals(id) ON DELETE CASCADE,
                FOREIGN KEY (parent_id) REFERENCES tasks(id) ON DELETE SET NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_goal ON tasks(goal_id);
            CREATE INDEX IF NOT EXISTS idx_tasks_due ON tasks(due_date, status);

            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                goal_id TEXT,
                session_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                agent_type TEXT,
                metadata TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_conversations_goal
                ON conversations(goal_id, created_at);

            CREATE TABLE IF NOT EXISTS llm_providers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                provider TEXT NOT NULL,
                base_url TEXT NOT NULL DEFAULT '',
                api_key TEXT NOT NULL DEFAULT '',
                default_model TEXT NOT NULL,
                is_default INTEGER NOT NULL DEFAULT 0,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    // ─── Provider Configs ───────────────────────────────────────────────

    fn get_provider_config(
        conn: &Connection,
        id: i64,
    ) -> Result<Option<ProviderConfig>, AgentError> {
        let config = conn
            .query_row(
                &format!("SELECT {PROVIDER_COLUMNS} FROM llm_providers WHERE id = ?1"),
                params![id],
                provider_from_row,
            )
            .optional()?;
        Ok(config)
    }

    fn insert_provider(&self, config: &NewProviderConfig) -> Result<ProviderConfig, AgentError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = format_timestamp(&Utc::now());

        if config.is_default {
            tx.execute("UPDATE llm_providers SET is_default = 0", [])?;
        }
        tx.execute(
            "INSERT INTO llm_providers
             (name, provider, base_url, api_key, default_model, is_default, is_active,
              created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                config.name,
                config.provider,
                config.base_url,
                config.api_key,
                config.default_model,
                config.is_default,
                config.is_active,
                now,
            ],
        )?;
        let id = tx.last_insert_rowid();
        let saved = Self::get_provider_config(&tx, id)?
            .ok_or_else(|| AgentError::not_found("provider config", id.to_string()))?;
        tx.commit()?;
        Ok(saved)
    }

    fn update_provider(&self, config: &ProviderConfig) -> Result<(), AgentError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        if config.is_default {
            tx.execute(
                "UPDATE llm_providers SET is_default = 0 WHERE id != ?1",
                params![config.id],
            )?;
        }
        let changed = tx.execute(
            "UPDATE llm_providers
             SET name = ?2, provider = ?3, base_url = ?4, api_key = ?5, default_model = ?6,
                 is_default = ?7, is_active = ?8, updated_at = ?9
             WHERE id = ?1",
            params![
                config.id,
                config.name,
                config.provider,
                config.base_url,
                config.api_key,
                config.default_model,
                config.is_default,
                config.is_active,
                format_timestamp(&Utc::now()),
            ],
        )?;
        if changed == 0 {
            return Err(AgentError::not_found("provider config", config.id.to_string()));
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_provider(&self, id: i64) -> Result<(), AgentError> {
        let changed = self
            .conn()?
            .execute("DELETE FROM llm_providers WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(AgentError::not_found("provider config", id.to_string()));
        }
        Ok(())
    }

    fn list_providers(&self) -> Result<Vec<ProviderConfig>, AgentError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROVIDER_COLUMNS} FROM llm_providers ORDER BY is_default DESC, id ASC"
        ))?;
        let rows = stmt.query_map([], provider_from_row)?;

        let mut configs = Vec::new();
        for row in rows {
            configs.push(row?);
        }
        Ok(configs)
    }
}

// ─── Goals ──────────────────────────────────────────────────────────────────

impl GoalStore for CoachDatabase {
    fn create_goal(&self, goal: &NewGoal) -> Result<Goal, AgentError> {
        let now = Utc::now();
        let created = Goal {
            id: Uuid::new_v4().to_string(),
            title: goal.title.clone(),
            description: goal.description.clone(),
            target_date: goal.target_date,
            status: GoalStatus::Active,
            context: goal.context.clone(),
            created_at: now,
            updated_at: now,
        };
        let context_json = created
            .context
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn()?.execute(
            "INSERT INTO goals
             (id, title, description, target_date, status, context, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                created.id,
                created.title,
                created.description,
                created.target_date.map(format_date),
                created.status.as_str(),
                context_json,
                format_timestamp(&now),
            ],
        )?;
        Ok(created)
    }

    fn get_goal(&self, id: &str) -> Result<Option<Goal>, AgentError> {
        let goal = self
            .conn()?
            .query_row(
                &format!("SELECT {GOAL_COLUMNS} FROM goals WHERE id = ?1"),
                params![id],
                goal_from_row,
            )
            .optional()?;
        Ok(goal)
    }

    fn update_goal(&self, goal: &Goal) -> Result<Goal, AgentError> {
        let mut updated = goal.clone();
        updated.updated_at = Utc::now();
        let context_json = updated
            .context
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let changed = self.conn()?.execute(
            "UPDATE goals
             SET title = ?2, description = ?3, target_date = ?4, status = ?5, context = ?6,
                 updated_at = ?7
             WHERE id = ?1",
            params![
                updated.id,
                updated.title,
                updated.description,
                updated.target_date.map(format_date),
                updated.status.as_str(),
                context_json,
                format_timestamp(&updated.updated_at),
            ],
        )?;
        if changed == 0 {
            return Err(AgentError::not_found("goal", &goal.id));
        }
        Ok(updated)
    }

    /// Removes the goal, its tasks (cascade) and its conversation turns.
    fn delete_goal(&self, id: &str) -> Result<(), AgentError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM conversations WHERE goal_id = ?1", params![id])?;
        let changed = tx.execute("DELETE FROM goals WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(AgentError::not_found("goal", id));
        }
        tx.commit()?;
        Ok(())
    }

    fn list_goals(&self) -> Result<Vec<Goal>, AgentError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {GOAL_COLUMNS} FROM goals ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map([], goal_from_row)?;

        let mut goals = Vec::new();
        for row in rows {
            goals.push(row?);
        }
        Ok(goals)
    }
}

// ─── Tasks ──────────────────────────────────────────────────────────────────

impl CoachDatabase {
    fn query_tasks(
        &self,
        filter_and_order: &str,
        args: impl rusqlite::Params,
    ) -> Result<Vec<Task>, AgentError> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks {filter_and_order}"))?;
        let rows = stmt.query_map(args, task_from_row)?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }
}

impl TaskStore for CoachDatabase {
    fn create_task(&self, task: &NewTask) -> Result<Task, AgentError> {
        let now = Utc::now();
        let created = Task {
            id: Uuid::new_v4().to_string(),
            goal_id: task.goal_id.clone(),
            parent_id: task.parent_id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            due_date: task.due_date,
            status: task.status,
            priority: task.priority,
            difficulty_rating: task.difficulty_rating,
            estimated_minutes: task.estimated_minutes,
            actual_minutes: None,
            struggle_notes: String::new(),
            completed_at: None,
            created_at: now,
            updated_at: now,
        };

        self.conn()?.execute(
            "INSERT INTO tasks
             (id, goal_id, parent_id, title, description, due_date, status, priority,
              difficulty_rating, estimated_minutes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
            params![
                created.id,
                created.goal_id,
                created.parent_id,
                created.title,
                created.description,
                created.due_date.map(format_date),
                created.status.as_str(),
                created.priority,
                created.difficulty_rating,
                created.estimated_minutes,
                format_timestamp(&now),
            ],
        )?;
        Ok(created)
    }

    fn get_task(&self, id: &str) -> Result<Option<Task>, AgentError> {
        let task = self
            .conn()?
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    fn update_task(&self, task: &Task) -> Result<Task, AgentError> {
        let mut updated = task.clone();
        updated.updated_at = Utc::now();

        let changed = self.conn()?.execute(
            "UPDATE tasks
             SET parent_id = ?2, title = ?3, description = ?4, due_date = ?5, status = ?6,
                 priority = ?7, difficulty_rating = ?8, estimated_minutes = ?9,
                 actual_minutes = ?10, struggle_notes = ?11, completed_at = ?12,
                 updated_at = ?13
             WHERE id = ?1",
            params![
                updated.id,
                updated.parent_id,
                updated.title,
                updated.description,
                updated.due_date.map(format_date),
                updated.status.as_str(),
                updated.priority,
                updated.difficulty_rating,
                updated.estimated_minutes,
                updated.actual_minutes,
                updated.struggle_notes,
                updated.completed_at.as_ref().map(format_timestamp),
                format_timestamp(&updated.updated_at),
            ],
        )?;
        if changed == 0 {
            return Err(AgentError::not_found("task", &task.id));
        }
        Ok(updated)
    }

    fn delete_task(&self, id: &str) -> Result<(), AgentError> {
        let changed = self
            .conn()?
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(AgentError::not_found("task", id));
        }
        Ok(())
    }

    fn list_tasks_for_goal(&self, goal_id: &str) -> Result<Vec<Task>, AgentError> {
        self.query_tasks(
            "WHERE goal_id = ?1
             ORDER BY priority DESC, due_date IS NULL, due_date ASC, created_at ASC",
            params![goal_id],
        )
    }

    fn list_due_on(&self, date: NaiveDate) -> Result<Vec<Task>, AgentError> {
        self.query_tasks(
            "WHERE due_date = ?1 AND status IN ('pending', 'in_progress')
             ORDER BY priority DESC, created_at ASC",
            params![format_date(date)],
        )
    }

    fn mark_complete(&self, id: &str, actual_minutes: i64) -> Result<(), AgentError> {
        let now = format_timestamp(&Utc::now());
        let changed = self.conn()?.execute(
            "UPDATE tasks
             SET status = 'completed', completed_at = ?2, actual_minutes = ?3, updated_at = ?2
             WHERE id = ?1",
            params![id, now, actual_minutes],
        )?;
        if changed == 0 {
            return Err(AgentError::not_found("task", id));
        }
        Ok(())
    }

    fn log_struggle(&self, id: &str, notes: &str) -> Result<(), AgentError> {
        let changed = self.conn()?.execute(
            "UPDATE tasks SET struggle_notes = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, notes, format_timestamp(&Utc::now())],
        )?;
        if changed == 0 {
            return Err(AgentError::not_found("task", id));
        }
        Ok(())
    }
}

// ─── Conversations ──────────────────────────────────────────────────────────

fn insert_conversation(
    conn: &Connection,
    turn: &NewConversation,
) -> Result<Conversation, AgentError> {
    let stored = Conversation {
        id: Uuid::new_v4().to_string(),
        goal_id: turn.goal_id.clone(),
        session_id: turn.session_id.clone(),
        role: turn.role,
        content: turn.content.clone(),
        agent_type: turn.agent_type,
        metadata: turn.metadata.clone(),
        created_at: Utc::now(),
    };
    let metadata_json = stored
        .metadata
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    conn.execute(
        "INSERT INTO conversations
         (id, goal_id, session_id, role, content, agent_type, metadata, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            stored.id,
            stored.goal_id,
            stored.session_id,
            stored.role.as_str(),
            stored.content,
            stored.agent_type.map(|a| a.as_str()),
            metadata_json,
            format_timestamp(&stored.created_at),
        ],
    )?;
    Ok(stored)
}

impl ConversationStore for CoachDatabase {
    fn append_conversation(&self, turn: &NewConversation) -> Result<Conversation, AgentError> {
        insert_conversation(&*self.conn()?, turn)
    }

    fn append_exchange(
        &self,
        user: &NewConversation,
        assistant: &NewConversation,
    ) -> Result<(), AgentError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        insert_conversation(&tx, user)?;
        insert_conversation(&tx, assistant)?;
        tx.commit()?;
        Ok(())
    }

    fn recent_for_goal(
        &self,
        goal_id: &str,
        limit: usize,
    ) -> Result<Vec<Conversation>, AgentError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations
             WHERE goal_id = ?1
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![goal_id, limit as i64], conversation_from_row)?;

        let mut turns = Vec::new();
        for row in rows {
            turns.push(row?);
        }
        // Reverse so oldest is first
        turns.reverse();
        Ok(turns)
    }
}

// ─── Provider Config Store ──────────────────────────────────────────────────

fn storage_error(e: AgentError) -> InferenceError {
    InferenceError::Storage {
        reason: e.to_string(),
    }
}

impl ProviderConfigStore for CoachDatabase {
    fn list_provider_configs(&self) -> Result<Vec<ProviderConfig>, InferenceError> {
        self.list_providers().map_err(storage_error)
    }

    fn insert_provider_config(
        &self,
        config: &NewProviderConfig,
    ) -> Result<ProviderConfig, InferenceError> {
        self.insert_provider(config).map_err(storage_error)
    }

    fn update_provider_config(&self, config: &ProviderConfig) -> Result<(), InferenceError> {
        self.update_provider(config).map_err(storage_error)
    }

    fn delete_provider_config(&self, id: i64) -> Result<(), InferenceError> {
        self.delete_provider(id).map_err(storage_error)
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn conversion_error(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

fn unknown_value(idx: usize, what: &str, raw: &str) -> rusqlite::Error {
    conversion_error(
        idx,
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("unknown {what}: '{raw}'"),
        ),
    )
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn opt_timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(_) => timestamp_at(row, idx).map(Some),
        None => Ok(None),
    }
}

fn opt_date_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => NaiveDate::parse_from_str(&raw, DATE_FORMAT)
            .map(Some)
            .map_err(|e| conversion_error(idx, e)),
        None => Ok(None),
    }
}

fn opt_json_at<T: serde::de::DeserializeOwned>(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<T>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) if !raw.is_empty() => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| conversion_error(idx, e)),
        _ => Ok(None),
    }
}

fn goal_from_row(row: &Row<'_>) -> rusqlite::Result<Goal> {
    let status: String = row.get(4)?;
    Ok(Goal {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        target_date: opt_date_at(row, 3)?,
        status: GoalStatus::parse(&status).ok_or_else(|| unknown_value(4, "goal status", &status))?,
        context: opt_json_at::<GoalContext>(row, 5)?,
        created_at: timestamp_at(row, 6)?,
        updated_at: timestamp_at(row, 7)?,
    })
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let status: String = row.get(6)?;
    Ok(Task {
        id: row.get(0)?,
        goal_id: row.get(1)?,
        parent_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        due_date: opt_date_at(row, 5)?,
        status: TaskStatus::parse(&status).ok_or_else(|| unknown_value(6, "task status", &status))?,
        priority: row.get(7)?,
        difficulty_rating: row.get(8)?,
        estimated_minutes: row.get(9)?,
        actual_minutes: row.get(10)?,
        struggle_notes: row.get(11)?,
        completed_at: opt_timestamp_at(row, 12)?,
        created_at: timestamp_at(row, 13)?,
        updated_at: timestamp_at(row, 14)?,
    })
}

fn conversation_from_row(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    let role: String = row.get(3)?;
    let agent_type: Option<String> = row.get(5)?;
    let agent_type = match agent_type.as_deref() {
        Some(raw) => {
            Some(AgentType::parse(raw).ok_or_else(|| unknown_value(5, "agent type", raw))?)
        }
        None => None,
    };
    Ok(Conversation {
        id: row.get(0)?,
        goal_id: row.get(1)?,
        session_id: row.get(2)?,
        role: ConversationRole::parse(&role)
            .ok_or_else(|| unknown_value(3, "conversation role", &role))?,
        content: row.get(4)?,
        agent_type,
        metadata: opt_json_at(row, 6)?,
        created_at: timestamp_at(row, 7)?,
    })
}

fn provider_from_row(row: &Row<'_>) -> rusqlite::Result<ProviderConfig> {
    Ok(ProviderConfig {
        id: row.get(0)?,
        name: row.get(1)?,
        provider: row.get(2)?,
        base_url: row.get(3)?,
        api_key: row.get(4)?,
        default_model: row.get(5)?,
        is_default: row.get(6)?,
        is_active: row.get(7)?,
        created_at: timestamp_at(row, 8)?,
        updated_at: timestamp_at(row, 9)?,
    })
}

// ─── Tests ──────────────────────────────────────────────────────────────────
