/// Task model and database operations
///
/// Tasks are the core entity of TaskForge: per-user to-do items with a
/// priority, a workflow status, and an optional due date. Every query in
/// this module is scoped by `user_id`; a task is invisible to anyone but
/// its owner.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high');
/// CREATE TYPE task_status AS ENUM ('pending', 'in_progress', 'completed');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     priority task_priority NOT NULL DEFAULT 'medium',
///     status task_status NOT NULL DEFAULT 'pending',
///     due_date DATE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskforge_shared::models::task::{CreateTask, Task, TaskPriority};
/// use taskforge_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let task = Task::create(&pool, CreateTask {
///     user_id: Uuid::new_v4(),
///     title: "Write launch notes".to_string(),
///     description: String::new(),
///     priority: Some(TaskPriority::High),
///     status: None,
///     due_date: None,
/// }).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::pagination::{Cursor, CursorIdentify};

/// Task priority level
///
/// Enum variants are declared in ascending urgency so Postgres sorts the
/// column semantically (low before medium before high).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

/// Task workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }
}

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Owner of the task
    pub user_id: Uuid,

    /// Short summary line
    pub title: String,

    /// Free-form details (empty string when absent)
    pub description: String,

    /// Priority level
    pub priority: TaskPriority,

    /// Workflow status
    pub status: TaskStatus,

    /// Calendar date the task is due (no time component)
    pub due_date: Option<NaiveDate>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

impl CursorIdentify for Task {
    fn cursor_position(&self) -> (DateTime<Utc>, Uuid) {
        (self.created_at, self.id)
    }
}

const TASK_COLUMNS: &str =
    "id, user_id, title, description, priority, status, due_date, created_at, updated_at";

/// Input for creating a new task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub user_id: Uuid,
    pub title: String,
    pub description: String,

    /// Defaults to medium when absent
    pub priority: Option<TaskPriority>,

    /// Defaults to pending when absent
    pub status: Option<TaskStatus>,

    pub due_date: Option<NaiveDate>,
}

/// Input for partially updating a task
///
/// `None` means "leave unchanged". `due_date` uses a nested Option so
/// callers can distinguish leaving the date alone from clearing it.
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<Option<NaiveDate>>,
}

impl UpdateTask {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.status.is_none()
            && self.due_date.is_none()
    }
}

/// Filter criteria for task listings
///
/// All criteria are conjunctive. `search` matches title or description,
/// case-insensitively, as a substring.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub search: Option<String>,
}

/// Orderable task columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    CreatedAt,
    DueDate,
    Priority,
    Status,
}

impl OrderField {
    fn column(&self) -> &'static str {
        match self {
            OrderField::CreatedAt => "created_at",
            OrderField::DueDate => "due_date",
            OrderField::Priority => "priority",
            OrderField::Status => "status",
        }
    }
}

/// A parsed ordering parameter such as `-created_at` or `due_date`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskOrdering {
    pub field: OrderField,
    pub descending: bool,
}

impl TaskOrdering {
    /// Newest first, the listing default
    pub const DEFAULT: TaskOrdering = TaskOrdering {
        field: OrderField::CreatedAt,
        descending: true,
    };

    /// Parses an ordering parameter
    ///
    /// A leading `-` requests descending order. Returns `None` for fields
    /// that are not orderable.
    pub fn parse(raw: &str) -> Option<Self> {
        let (descending, name) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        let field = match name {
            "created_at" => OrderField::CreatedAt,
            "due_date" => OrderField::DueDate,
            "priority" => OrderField::Priority,
            "status" => OrderField::Status,
            _ => return None,
        };

        Some(Self { field, descending })
    }

    fn order_clause(&self) -> String {
        let direction = if self.descending { "DESC" } else { "ASC" };
        let tie_break = if self.descending { "id DESC" } else { "id ASC" };

        match self.field {
            // Undated tasks sort after dated ones regardless of direction
            OrderField::DueDate => {
                format!("due_date {} NULLS LAST, {}", direction, tie_break)
            }
            _ => format!("{} {}, {}", self.field.column(), direction, tie_break),
        }
    }
}

/// Escapes LIKE wildcards so a search term matches literally
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Appends filter predicates to a WHERE clause under construction
///
/// Returns the SQL fragment; the caller binds values in the same order
/// the placeholders were numbered.
fn filter_sql(filter: &TaskFilter, bind_count: &mut usize) -> String {
    let mut sql = String::new();

    if filter.status.is_some() {
        *bind_count += 1;
        sql.push_str(&format!(" AND status = ${}", bind_count));
    }
    if filter.priority.is_some() {
        *bind_count += 1;
        sql.push_str(&format!(" AND priority = ${}", bind_count));
    }
    if filter.search.is_some() {
        *bind_count += 1;
        sql.push_str(&format!(
            " AND (title ILIKE ${n} OR description ILIKE ${n})",
            n = bind_count
        ));
    }

    sql
}

impl Task {
    /// Creates a new task
    ///
    /// Priority defaults to medium and status to pending when the input
    /// leaves them unset.
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (user_id, title, description, priority, status, due_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            TASK_COLUMNS
        ))
        .bind(data.user_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.priority.unwrap_or_default())
        .bind(data.status.unwrap_or_default())
        .bind(data.due_date)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task by ID, scoped to its owner
    ///
    /// Returns `None` both for IDs that do not exist and for tasks owned
    /// by another user, so callers cannot distinguish the two.
    pub async fn find_by_id_and_user(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE id = $1 AND user_id = $2",
            TASK_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Partially updates a task, scoped to its owner
    ///
    /// Only the fields set in `data` are written. Returns `None` when the
    /// task does not exist or belongs to another user.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        if data.is_empty() {
            return Self::find_by_id_and_user(pool, id, user_id).await;
        }

        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.priority.is_some() {
            bind_count += 1;
            query.push_str(&format!(", priority = ${}", bind_count));
        }
        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if data.due_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", due_date = ${}", bind_count));
        }

        query.push_str(&format!(
            " WHERE id = $1 AND user_id = $2 RETURNING {}",
            TASK_COLUMNS
        ));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id).bind(user_id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(priority) = data.priority {
            q = q.bind(priority);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(due_date) = data.due_date {
            q = q.bind(due_date);
        }

        let task = q.fetch_optional(pool).await?;

        Ok(task)
    }

    /// Deletes a task, scoped to its owner
    ///
    /// Returns `true` when a row was removed.
    pub async fn delete_by_user(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Fetches a window of tasks for cursor pagination
    ///
    /// Walks the `(created_at, id)` keyset in the requested direction.
    /// `descending` is the presentation order; when the cursor marks a
    /// backward walk the scan direction flips and the caller restores
    /// presentation order. Fetch `limit` rows plus one to detect whether
    /// more pages exist.
    pub async fn list_cursor_window(
        pool: &PgPool,
        user_id: Uuid,
        filter: &TaskFilter,
        descending: bool,
        cursor: Option<&Cursor>,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let scan_descending = match cursor {
            Some(c) if c.reverse => !descending,
            _ => descending,
        };

        let mut query = format!("SELECT {} FROM tasks WHERE user_id = $1", TASK_COLUMNS);
        let mut bind_count = 1;

        query.push_str(&filter_sql(filter, &mut bind_count));

        if cursor.is_some() {
            let op = if scan_descending { "<" } else { ">" };
            query.push_str(&format!(
                " AND (created_at, id) {} (${}, ${})",
                op,
                bind_count + 1,
                bind_count + 2
            ));
            bind_count += 2;
        }

        let direction = if scan_descending { "DESC" } else { "ASC" };
        query.push_str(&format!(
            " ORDER BY created_at {dir}, id {dir} LIMIT ${}",
            bind_count + 1,
            dir = direction
        ));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(user_id);

        if let Some(status) = filter.status {
            q = q.bind(status);
        }
        if let Some(priority) = filter.priority {
            q = q.bind(priority);
        }
        if let Some(ref search) = filter.search {
            q = q.bind(format!("%{}%", escape_like(search)));
        }
        if let Some(c) = cursor {
            q = q.bind(c.created_at).bind(c.id);
        }
        q = q.bind(limit);

        q.fetch_all(pool).await
    }

    /// Lists a page of tasks by page number
    pub async fn list_page(
        pool: &PgPool,
        user_id: Uuid,
        filter: &TaskFilter,
        ordering: TaskOrdering,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = format!("SELECT {} FROM tasks WHERE user_id = $1", TASK_COLUMNS);
        let mut bind_count = 1;

        query.push_str(&filter_sql(filter, &mut bind_count));
        query.push_str(&format!(
            " ORDER BY {} LIMIT ${} OFFSET ${}",
            ordering.order_clause(),
            bind_count + 1,
            bind_count + 2
        ));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(user_id);

        if let Some(status) = filter.status {
            q = q.bind(status);
        }
        if let Some(priority) = filter.priority {
            q = q.bind(priority);
        }
        if let Some(ref search) = filter.search {
            q = q.bind(format!("%{}%", escape_like(search)));
        }
        q = q.bind(limit).bind(offset);

        q.fetch_all(pool).await
    }

    /// Counts tasks matching a filter
    pub async fn count_filtered(
        pool: &PgPool,
        user_id: Uuid,
        filter: &TaskFilter,
    ) -> Result<i64, sqlx::Error> {
        let mut query = String::from("SELECT COUNT(*) FROM tasks WHERE user_id = $1");
        let mut bind_count = 1;

        query.push_str(&filter_sql(filter, &mut bind_count));

        let mut q = sqlx::query_as::<_, (i64,)>(&query).bind(user_id);

        if let Some(status) = filter.status {
            q = q.bind(status);
        }
        if let Some(priority) = filter.priority {
            q = q.bind(priority);
        }
        if let Some(ref search) = filter.search {
            q = q.bind(format!("%{}%", escape_like(search)));
        }

        let (count,) = q.fetch_one(pool).await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_as_str() {
        assert_eq!(TaskPriority::Low.as_str(), "low");
        assert_eq!(TaskPriority::Medium.as_str(), "medium");
        assert_eq!(TaskPriority::High.as_str(), "high");
    }

    #[test]
    fn test_status_as_str() {
        assert_eq!(TaskStatus::Pending.as_str(), "pending");
        assert_eq!(TaskStatus::InProgress.as_str(), "in_progress");
        assert_eq!(TaskStatus::Completed.as_str(), "completed");
    }

    #[test]
    fn test_defaults() {
        assert_eq!(TaskPriority::default(), TaskPriority::Medium);
        assert_eq!(TaskStatus::default(), TaskStatus::Pending);
    }

    #[test]
    fn test_ordering_parse() {
        assert_eq!(
            TaskOrdering::parse("created_at"),
            Some(TaskOrdering {
                field: OrderField::CreatedAt,
                descending: false,
            })
        );
        assert_eq!(
            TaskOrdering::parse("-due_date"),
            Some(TaskOrdering {
                field: OrderField::DueDate,
                descending: true,
            })
        );
        assert_eq!(
            TaskOrdering::parse("priority"),
            Some(TaskOrdering {
                field: OrderField::Priority,
                descending: false,
            })
        );
        assert_eq!(
            TaskOrdering::parse("-status"),
            Some(TaskOrdering {
                field: OrderField::Status,
                descending: true,
            })
        );
    }

    #[test]
    fn test_ordering_parse_rejects_unknown_fields() {
        assert!(TaskOrdering::parse("title").is_none());
        assert!(TaskOrdering::parse("-updated_at").is_none());
        assert!(TaskOrdering::parse("").is_none());
        assert!(TaskOrdering::parse("--created_at").is_none());
    }

    #[test]
    fn test_order_clause() {
        assert_eq!(TaskOrdering::DEFAULT.order_clause(), "created_at DESC, id DESC");
        assert_eq!(
            TaskOrdering::parse("due_date").unwrap().order_clause(),
            "due_date ASC NULLS LAST, id ASC"
        );
        assert_eq!(
            TaskOrdering::parse("-priority").unwrap().order_clause(),
            "priority DESC, id DESC"
        );
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("plain"), "plain");
        assert_eq!(escape_like("50%_done"), "50\\%\\_done");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn test_filter_sql_numbering() {
        let filter = TaskFilter {
            status: Some(TaskStatus::Pending),
            priority: Some(TaskPriority::High),
            search: Some("report".to_string()),
        };
        let mut bind_count = 1;
        let sql = filter_sql(&filter, &mut bind_count);

        assert_eq!(
            sql,
            " AND status = $2 AND priority = $3 AND (title ILIKE $4 OR description ILIKE $4)"
        );
        assert_eq!(bind_count, 4);
    }

    #[test]
    fn test_filter_sql_empty() {
        let mut bind_count = 1;
        assert_eq!(filter_sql(&TaskFilter::default(), &mut bind_count), "");
        assert_eq!(bind_count, 1);
    }

    #[test]
    fn test_update_is_empty() {
        assert!(UpdateTask::default().is_empty());
        assert!(!UpdateTask {
            due_date: Some(None),
            ..Default::default()
        }
        .is_empty());
    }
}
