/// Task model and database operations
///
/// Tasks belong to exactly one team, fixed at creation. A task's assignee,
/// when set, must be a member of that team.
///
/// # Status
///
/// ```text
/// todo ⇄ in-progress ⇄ done      (any state may move to any other)
/// ```
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('todo', 'in-progress', 'done');
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(200) NOT NULL,
///     description TEXT,
///     status task_status NOT NULL DEFAULT 'todo',
///     priority task_priority NOT NULL DEFAULT 'medium',
///     deadline TIMESTAMPTZ,
///     assigned_to UUID REFERENCES users(id),
///     created_by UUID NOT NULL REFERENCES users(id),
///     team_id UUID NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     FOREIGN KEY (team_id, assigned_to) REFERENCES team_members (team_id, user_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Task progress status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Todo,

    InProgress,

    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(TaskStatus::Todo),
            "in-progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            other => Err(format!(
                "Invalid status '{}': expected one of todo, in-progress, done",
                other
            )),
        }
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,

    #[default]
    Medium,

    High,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 3] = [TaskPriority::Low, TaskPriority::Medium, TaskPriority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            other => Err(format!(
                "Invalid priority '{}': expected one of low, medium, high",
                other
            )),
        }
    }
}

/// Task record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,

    pub title: String,

    pub description: Option<String>,

    pub status: TaskStatus,

    pub priority: TaskPriority,

    pub deadline: Option<DateTime<Utc>>,

    /// Assignee; always a member of `team_id` when set
    pub assigned_to: Option<Uuid>,

    pub created_by: Uuid,

    /// Owning team, immutable after creation
    pub team_id: Uuid,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// True when the deadline has passed and the task is not done
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != TaskStatus::Done && self.deadline.is_some_and(|deadline| deadline < now)
    }
}

/// Input for creating a task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub deadline: Option<DateTime<Utc>>,
    pub assigned_to: Option<Uuid>,
    pub created_by: Uuid,
    pub team_id: Uuid,
}

/// Partial task update
///
/// `None` keeps the stored value. For the nullable fields, `Some(None)`
/// clears the value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub deadline: Option<Option<DateTime<Utc>>>,
    pub assigned_to: Option<Option<Uuid>>,
}

impl UpdateTask {
    /// Applies this update to a task in place
    pub fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(deadline) = self.deadline {
            task.deadline = deadline;
        }
        if let Some(assigned_to) = self.assigned_to {
            task.assigned_to = assigned_to;
        }
        task.updated_at = Utc::now();
    }
}

/// Orders tasks newest-created first
pub fn sort_newest_first(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

/// Orders tasks by deadline ascending, tasks without a deadline last, ties
/// broken newest-created first
pub fn sort_by_deadline(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        let by_deadline = match (a.deadline, b.deadline) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        };
        by_deadline
            .then(b.created_at.cmp(&a.created_at))
            .then(b.id.cmp(&a.id))
    });
}

/// Aggregate counts over a set of tasks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub todo: usize,
    pub in_progress: usize,
    pub done: usize,
    pub low_priority: usize,
    pub medium_priority: usize,
    pub high_priority: usize,
    pub assigned_to_me: usize,
    pub overdue: usize,
}

impl TaskStats {
    pub fn from_tasks(tasks: &[Task], user_id: Uuid, now: DateTime<Utc>) -> Self {
        let mut stats = TaskStats {
            total: tasks.len(),
            ..Default::default()
        };

        for task in tasks {
            match task.status {
                TaskStatus::Todo => stats.todo += 1,
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Done => stats.done += 1,
            }
            match task.priority {
                TaskPriority::Low => stats.low_priority += 1,
                TaskPriority::Medium => stats.medium_priority += 1,
                TaskPriority::High => stats.high_priority += 1,
            }
            if task.assigned_to == Some(user_id) {
                stats.assigned_to_me += 1;
            }
            if task.is_overdue(now) {
                stats.overdue += 1;
            }
        }

        stats
    }
}

const TASK_COLUMNS: &str = "id, title, description, status, priority, deadline, assigned_to, \
                            created_by, team_id, created_at, updated_at";

impl Task {
    /// Inserts a new task
    pub async fn create<'e, E>(executor: E, data: CreateTask) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (title, description, status, priority, deadline,
                               assigned_to, created_by, team_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(data.title)
        .bind(data.description)
        .bind(data.status)
        .bind(data.priority)
        .bind(data.deadline)
        .bind(data.assigned_to)
        .bind(data.created_by)
        .bind(data.team_id)
        .fetch_one(executor)
        .await?;

        Ok(task)
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(task)
    }

    /// Finds a task and locks its row until the surrounding transaction ends
    pub async fn find_by_id_for_update<'e, E>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(task)
    }

    /// Lists a team's tasks, newest first
    pub async fn list_by_team<'e, E>(executor: E, team_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE team_id = $1
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(team_id)
        .fetch_all(executor)
        .await?;

        Ok(tasks)
    }

    /// Lists tasks assigned to a user, earliest deadline first, undated last
    pub async fn list_assigned<'e, E>(executor: E, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE assigned_to = $1
            ORDER BY deadline ASC NULLS LAST, created_at DESC, id DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(executor)
        .await?;

        Ok(tasks)
    }

    /// Lists tasks of every team the user belongs to, newest first
    pub async fn list_for_member<'e, E>(executor: E, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE team_id IN (SELECT team_id FROM team_members WHERE user_id = $1)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(executor)
        .await?;

        Ok(tasks)
    }

    /// Writes every mutable column back to the row
    pub async fn save<'e, E>(&self, executor: E) -> Result<(), sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            UPDATE tasks
            SET title = $2, description = $3, status = $4, priority = $5,
                deadline = $6, assigned_to = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(self.id)
        .bind(&self.title)
        .bind(&self.description)
        .bind(self.status)
        .bind(self.priority)
        .bind(self.deadline)
        .bind(self.assigned_to)
        .bind(self.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Clears the assignee of every task in `team_id` assigned to `user_id`
    pub async fn unassign_member<'e, E>(
        executor: E,
        team_id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET assigned_to = NULL, updated_at = NOW()
            WHERE team_id = $1 AND assigned_to = $2
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}
