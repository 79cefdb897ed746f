/// Task management endpoints
///
/// All endpoints require authentication and operate only on the caller's
/// own tasks. A task belonging to another user is indistinguishable from
/// one that does not exist (404).
///
/// # Endpoints
///
/// - `GET /api/tasks` - List with filtering, search, ordering, pagination
/// - `POST /api/tasks` - Create
/// - `GET /api/tasks/:id` - Retrieve
/// - `PUT /api/tasks/:id` - Full update
/// - `PATCH /api/tasks/:id` - Partial update
/// - `DELETE /api/tasks/:id` - Delete
///
/// # Listing
///
/// `GET /api/tasks` supports two pagination strategies:
///
/// - **Cursor** (default): opaque `cursor=` tokens over `created_at`
///   ordering. Responds with `{"next", "previous", "results"}` and never
///   runs a COUNT.
/// - **Page number**: activated by `page=`. Supports all orderings and
///   responds with `{"count", "next", "previous", "results", "page",
///   "pages"}`.
///
/// Filters (`status=`, `priority=`), search (`search=`, case-insensitive
/// substring over title and description), and `ordering=` (for example
/// `-created_at`, `due_date`) combine with either strategy, except that
/// cursor pagination only serves `created_at` orderings.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, AppJson, ValidationErrorDetail},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use taskforge_shared::{
    auth::middleware::AuthContext,
    models::task::{
        CreateTask, OrderField, Task, TaskFilter, TaskOrdering, TaskPriority, TaskStatus,
        UpdateTask,
    },
    pagination::{clamp_page_size, Cursor, CursorPage, NumberedPage},
};
use uuid::Uuid;

/// Task as returned by the API
///
/// `user` carries the owner's username rather than a raw ID.
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: String,
    pub user: String,
    pub title: String,
    pub description: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskResponse {
    fn from_task(task: Task, username: &str) -> Self {
        Self {
            id: task.id.to_string(),
            user: username.to_string(),
            title: task.title,
            description: task.description,
            priority: task.priority,
            status: task.status,
            due_date: task.due_date,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// Create request
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<NaiveDate>,
}

/// Full update request (PUT)
///
/// Replaces the task: fields left out revert to their defaults.
#[derive(Debug, Deserialize)]
pub struct ReplaceTaskRequest {
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<NaiveDate>,
}

/// Partial update request (PATCH)
///
/// Fields left out stay unchanged; an explicit `"due_date": null` clears
/// the due date.
#[derive(Debug, Default, Deserialize)]
pub struct PatchTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,

    #[serde(default, deserialize_with = "deserialize_explicit")]
    pub due_date: Option<Option<NaiveDate>>,
}

/// Distinguishes an absent field from an explicit null
fn deserialize_explicit<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// List query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub cursor: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// Cursor-mode list response
#[derive(Debug, Serialize)]
pub struct CursorListResponse {
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<TaskResponse>,
}

/// Page-number-mode list response
#[derive(Debug, Serialize)]
pub struct NumberedListResponse {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<TaskResponse>,
    pub page: i64,
    pub pages: i64,
}

/// The two response shapes `GET /api/tasks` can produce
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ListResponse {
    Cursor(CursorListResponse),
    Numbered(NumberedListResponse),
}

fn parse_status(raw: &str) -> Result<TaskStatus, ApiError> {
    match raw {
        "pending" => Ok(TaskStatus::Pending),
        "in_progress" => Ok(TaskStatus::InProgress),
        "completed" => Ok(TaskStatus::Completed),
        _ => Err(ApiError::ValidationError(vec![ValidationErrorDetail::new(
            "status",
            format!("'{}' is not a valid status", raw),
        )])),
    }
}

fn parse_priority(raw: &str) -> Result<TaskPriority, ApiError> {
    match raw {
        "low" => Ok(TaskPriority::Low),
        "medium" => Ok(TaskPriority::Medium),
        "high" => Ok(TaskPriority::High),
        _ => Err(ApiError::ValidationError(vec![ValidationErrorDetail::new(
            "priority",
            format!("'{}' is not a valid priority", raw),
        )])),
    }
}

fn build_filter(params: &ListParams) -> Result<TaskFilter, ApiError> {
    Ok(TaskFilter {
        status: params.status.as_deref().map(parse_status).transpose()?,
        priority: params.priority.as_deref().map(parse_priority).transpose()?,
        search: params
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from),
    })
}

fn validate_title(title: &str) -> Result<String, ApiError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ApiError::ValidationError(vec![ValidationErrorDetail::new(
            "title",
            "Title must not be blank",
        )]));
    }
    if trimmed.len() > 255 {
        return Err(ApiError::ValidationError(vec![ValidationErrorDetail::new(
            "title",
            "Title must be at most 255 characters",
        )]));
    }
    Ok(trimmed.to_string())
}

/// List tasks
///
/// # Errors
///
/// - `400 Bad Request`: Unknown filter value or ordering field, malformed
///   cursor, `page` below 1, or a cursor combined with an ordering other
///   than `created_at`
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ListResponse>> {
    let filter = build_filter(&params)?;

    let ordering = match params.ordering.as_deref() {
        Some(raw) => TaskOrdering::parse(raw).ok_or_else(|| {
            ApiError::ValidationError(vec![ValidationErrorDetail::new(
                "ordering",
                format!("'{}' is not an orderable field", raw),
            )])
        })?,
        None => TaskOrdering::DEFAULT,
    };

    let page_size = clamp_page_size(params.page_size);

    if params.page.is_some() && params.cursor.is_some() {
        return Err(ApiError::BadRequest(
            "page and cursor cannot be combined".to_string(),
        ));
    }

    if let Some(page) = params.page {
        let response =
            list_numbered(&state, &auth, &filter, ordering, page, page_size).await?;
        return Ok(Json(ListResponse::Numbered(response)));
    }

    // Cursor strategy walks the (created_at, id) keyset, so other
    // orderings are only available through page-number pagination
    if ordering.field != OrderField::CreatedAt {
        return Err(ApiError::BadRequest(format!(
            "ordering by '{}' requires page-number pagination (pass page=)",
            params.ordering.as_deref().unwrap_or_default()
        )));
    }

    let cursor = params
        .cursor
        .as_deref()
        .map(Cursor::decode)
        .transpose()?;

    let window = Task::list_cursor_window(
        &state.db,
        auth.user_id,
        &filter,
        ordering.descending,
        cursor.as_ref(),
        page_size + 1,
    )
    .await?;

    let page = CursorPage::build(window, page_size as usize, cursor.as_ref());

    Ok(Json(ListResponse::Cursor(CursorListResponse {
        next: page.next,
        previous: page.previous,
        results: page
            .results
            .into_iter()
            .map(|t| TaskResponse::from_task(t, &auth.username))
            .collect(),
    })))
}

async fn list_numbered(
    state: &AppState,
    auth: &AuthContext,
    filter: &TaskFilter,
    ordering: TaskOrdering,
    page: i64,
    page_size: i64,
) -> ApiResult<NumberedListResponse> {
    if page < 1 {
        return Err(ApiError::BadRequest("page must be at least 1".to_string()));
    }

    let count = Task::count_filtered(&state.db, auth.user_id, filter).await?;
    let offset = (page - 1) * page_size;
    let results = Task::list_page(&state.db, auth.user_id, filter, ordering, page_size, offset)
        .await?;

    let numbered = NumberedPage::build(results, count, page, page_size);

    Ok(NumberedListResponse {
        count: numbered.count,
        next: numbered.next,
        previous: numbered.previous,
        results: numbered
            .results
            .into_iter()
            .map(|t| TaskResponse::from_task(t, &auth.username))
            .collect(),
        page: numbered.page,
        pages: numbered.pages,
    })
}

/// Create a task
///
/// # Errors
///
/// - `400 Bad Request`: Blank or overlong title
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(req): AppJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    let title = validate_title(&req.title)?;

    let task = Task::create(
        &state.db,
        CreateTask {
            user_id: auth.user_id,
            title,
            description: req.description,
            priority: req.priority,
            status: req.status,
            due_date: req.due_date,
        },
    )
    .await?;

    tracing::debug!("User {} created task {}", auth.user_id, task.id);

    Ok((
        StatusCode::CREATED,
        Json(TaskResponse::from_task(task, &auth.username)),
    ))
}

/// Retrieve a task
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TaskResponse>> {
    let task = Task::find_by_id_and_user(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(TaskResponse::from_task(task, &auth.username)))
}

/// Fully update a task (PUT)
///
/// Fields left out of the body revert to their defaults.
pub async fn replace_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<ReplaceTaskRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let title = validate_title(&req.title)?;

    let update = UpdateTask {
        title: Some(title),
        description: Some(req.description),
        priority: Some(req.priority.unwrap_or_default()),
        status: Some(req.status.unwrap_or_default()),
        due_date: Some(req.due_date),
    };

    let task = Task::update(&state.db, id, auth.user_id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(TaskResponse::from_task(task, &auth.username)))
}

/// Partially update a task (PATCH)
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<PatchTaskRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let title = req.title.as_deref().map(validate_title).transpose()?;

    let update = UpdateTask {
        title,
        description: req.description,
        priority: req.priority,
        status: req.status,
        due_date: req.due_date,
    };

    let task = Task::update(&state.db, id, auth.user_id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(TaskResponse::from_task(task, &auth.username)))
}

/// Delete a task
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let deleted = Task::delete_by_user(&state.db, id, auth.user_id).await?;

    if !deleted {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }

    tracing::debug!("User {} deleted task {}", auth.user_id, id);

    Ok(Json(serde_json::json!({
        "message": "Task deleted successfully"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_title_trims() {
        assert_eq!(validate_title("  Ship it  ").unwrap(), "Ship it");
    }

    #[test]
    fn test_validate_title_rejects_blank() {
        assert!(validate_title("").is_err());
        assert!(validate_title("   ").is_err());
    }

    #[test]
    fn test_validate_title_rejects_overlong() {
        assert!(validate_title(&"x".repeat(256)).is_err());
        assert!(validate_title(&"x".repeat(255)).is_ok());
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("in_progress").unwrap(), TaskStatus::InProgress);
        assert!(parse_status("done").is_err());
    }

    #[test]
    fn test_parse_priority() {
        assert_eq!(parse_priority("high").unwrap(), TaskPriority::High);
        assert!(parse_priority("urgent").is_err());
    }

    #[test]
    fn test_build_filter_drops_blank_search() {
        let params = ListParams {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(build_filter(&params).unwrap().search.is_none());
    }

    #[test]
    fn test_patch_due_date_absent_vs_null() {
        let absent: PatchTaskRequest = serde_json::from_str(r#"{"title": "x"}"#).unwrap();
        assert!(absent.due_date.is_none());

        let cleared: PatchTaskRequest = serde_json::from_str(r#"{"due_date": null}"#).unwrap();
        assert_eq!(cleared.due_date, Some(None));

        let set: PatchTaskRequest =
            serde_json::from_str(r#"{"due_date": "2026-09-15"}"#).unwrap();
        assert_eq!(
            set.due_date,
            Some(Some(NaiveDate::from_ymd_opt(2026, 9, 15).unwrap()))
        );
    }
}
