/// Task endpoints
///
/// Every task belongs to one team. Members of that team may read and update
/// it; only the task's creator or the team's creator may delete it.
///
/// - `POST /api/tasks` - Create a task in a team
/// - `GET /api/tasks` - Tasks of every team the caller belongs to
/// - `GET /api/tasks/my-tasks` - Tasks assigned to the caller, by deadline
/// - `GET /api/tasks/stats` - Counts over the caller's visible tasks
/// - `GET /api/tasks/team/:team_id` - A team's tasks
/// - `GET /api/tasks/:task_id` - Single task
/// - `PUT /api/tasks/:task_id` - Partial update
/// - `DELETE /api/tasks/:task_id` - Delete

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{double_option, ApiJson, ApiPath},
    routes::teams::load_team,
    views::{single_task_view, task_views, team_task_views, TaskView},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;
use taskly_shared::{
    auth::{
        authorization::{authorize, Action},
        middleware::AuthContext,
    },
    models::{
        task::{CreateTask, Task, TaskPriority, TaskStats, TaskStatus, UpdateTask},
        team::Team,
    },
};
use tracing::{debug, info};
use uuid::Uuid;

const MAX_TITLE_LENGTH: usize = 200;

/// Create request
///
/// Enumerations, IDs and dates arrive as strings and are parsed here so that
/// bad values become field-level validation errors.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub team_id: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub priority: Option<String>,

    #[serde(default)]
    pub deadline: Option<String>,

    #[serde(default)]
    pub assigned_to: Option<String>,
}

/// Partial update request
///
/// Absent keeps, `null` clears. `title`, `status` and `priority` cannot be
/// cleared, so `null` keeps them too.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub title: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub status: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub priority: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub deadline: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<String>>,
}

fn validate_title(title: &str) -> ApiResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ApiError::invalid("title", "Task title is required"));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ApiError::invalid(
            "title",
            format!("Task title must be at most {} characters", MAX_TITLE_LENGTH),
        ));
    }
    Ok(title.to_string())
}

fn parse_enum<T: FromStr<Err = String>>(field: &str, value: &str) -> ApiResult<T> {
    value.trim().parse().map_err(|e: String| ApiError::invalid(field, e))
}

fn parse_id(field: &str, value: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(value.trim())
        .map_err(|_| ApiError::invalid(field, format!("Invalid {} format", field)))
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC)
fn parse_deadline(value: &str) -> ApiResult<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(deadline) = DateTime::parse_from_rfc3339(value) {
        return Ok(deadline.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ApiError::invalid("deadline", "Deadline must be a valid date"))
}

/// `None` and blank strings mean "not set"
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl CreateTaskRequest {
    /// Target team, parsed ahead of the other fields so that a missing team
    /// or a non-member is reported before body validation
    fn team_id(&self) -> ApiResult<Uuid> {
        if self.team_id.trim().is_empty() {
            return Err(ApiError::invalid("teamId", "Team ID is required"));
        }
        parse_id("teamId", &self.team_id)
    }

    fn into_create(self, team_id: Uuid, created_by: Uuid) -> ApiResult<CreateTask> {
        let title = validate_title(&self.title)?;

        let status = match non_blank(self.status) {
            Some(s) => parse_enum::<TaskStatus>("status", &s)?,
            None => TaskStatus::default(),
        };
        let priority = match non_blank(self.priority) {
            Some(p) => parse_enum::<TaskPriority>("priority", &p)?,
            None => TaskPriority::default(),
        };
        let deadline = non_blank(self.deadline)
            .map(|d| parse_deadline(&d))
            .transpose()?;
        let assigned_to = non_blank(self.assigned_to)
            .map(|id| parse_id("assignedTo", &id))
            .transpose()?;

        Ok(CreateTask {
            title,
            description: non_blank(self.description),
            status,
            priority,
            deadline,
            assigned_to,
            created_by,
            team_id,
        })
    }
}

impl UpdateTaskRequest {
    fn into_update(self) -> ApiResult<UpdateTask> {
        let title = match self.title {
            Some(Some(title)) => Some(validate_title(&title)?),
            _ => None,
        };
        let status = match self.status {
            Some(Some(s)) => Some(parse_enum::<TaskStatus>("status", &s)?),
            _ => None,
        };
        let priority = match self.priority {
            Some(Some(p)) => Some(parse_enum::<TaskPriority>("priority", &p)?),
            _ => None,
        };
        let deadline = match self.deadline {
            Some(value) => Some(non_blank(value).map(|d| parse_deadline(&d)).transpose()?),
            None => None,
        };
        let assigned_to = match self.assigned_to {
            Some(value) => Some(
                non_blank(value)
                    .map(|id| parse_id("assignedTo", &id))
                    .transpose()?,
            ),
            None => None,
        };

        Ok(UpdateTask {
            title,
            description: self.description.map(non_blank),
            status,
            priority,
            deadline,
            assigned_to,
        })
    }
}

/// 400 unless `assignee` is a member of `team`
fn check_assignee(team: &Team, assignee: Option<Uuid>) -> ApiResult<()> {
    match assignee {
        Some(user_id) if !team.is_member(user_id) => Err(ApiError::BadRequest(
            "Assigned user must be a team member".to_string(),
        )),
        _ => Ok(()),
    }
}

fn check(auth: &AuthContext, action: Action, team: &Team, task: Option<&Task>) -> ApiResult<()> {
    authorize(auth.user_id, action, team, task).map_err(|e| {
        debug!(team_id = %team.id, user_id = %auth.user_id, ?action, "Task access denied");
        e.into()
    })
}

/// Loads a task and its owning team
async fn load_task(state: &AppState, task_id: Uuid) -> ApiResult<(Task, Team)> {
    let task = state
        .store
        .find_task(task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let team = load_team(state, task.team_id).await?;
    Ok((task, team))
}

/// Create a task
///
/// # Errors
///
/// - `400 Bad Request`: Invalid fields or assignee not a member
/// - `403 Forbidden`: Caller is not a member of the team
/// - `404 Not Found`: No such team
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskView>)> {
    let team_id = req.team_id()?;

    let team = load_team(&state, team_id).await?;
    check(&auth, Action::CreateTask, &team, None)?;

    let data = req.into_create(team.id, auth.user_id)?;
    check_assignee(&team, data.assigned_to)?;

    let task = state.store.create_task(data).await?;
    info!(task_id = %task.id, team_id = %team.id, user_id = %auth.user_id, "Task created");

    let view = single_task_view(state.store.as_ref(), &team, task).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Tasks of every team the caller belongs to, newest first
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<TaskView>>> {
    let tasks = state.store.list_member_tasks(auth.user_id).await?;
    Ok(Json(task_views(state.store.as_ref(), tasks).await?))
}

/// Tasks assigned to the caller, soonest deadline first
pub async fn my_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<TaskView>>> {
    let tasks = state.store.list_assigned_tasks(auth.user_id).await?;
    Ok(Json(task_views(state.store.as_ref(), tasks).await?))
}

pub async fn task_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<TaskStats>> {
    let tasks = state.store.list_member_tasks(auth.user_id).await?;
    Ok(Json(TaskStats::from_tasks(&tasks, auth.user_id, Utc::now())))
}

/// A team's tasks, newest first
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a member
/// - `404 Not Found`: No such team
pub async fn team_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(team_id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<TaskView>>> {
    let team = load_team(&state, team_id).await?;
    check(&auth, Action::ViewTeam, &team, None)?;

    let tasks = state.store.list_team_tasks(team_id).await?;
    Ok(Json(team_task_views(state.store.as_ref(), &team, tasks).await?))
}

/// Single task
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a member of the task's team
/// - `404 Not Found`: No such task
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(task_id): ApiPath<Uuid>,
) -> ApiResult<Json<TaskView>> {
    let (task, team) = load_task(&state, task_id).await?;
    check(&auth, Action::ViewTask, &team, Some(&task))?;

    Ok(Json(single_task_view(state.store.as_ref(), &team, task).await?))
}

/// Partially update a task; any team member may do this
///
/// # Errors
///
/// - `400 Bad Request`: Invalid fields or assignee not a member
/// - `403 Forbidden`: Caller is not a member of the task's team
/// - `404 Not Found`: No such task
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(task_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> ApiResult<Json<TaskView>> {
    let (task, team) = load_task(&state, task_id).await?;
    check(&auth, Action::UpdateTask, &team, Some(&task))?;

    let update = req.into_update()?;
    if let Some(assignee) = update.assigned_to {
        check_assignee(&team, assignee)?;
    }

    let task = state
        .store
        .update_task(task_id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    info!(%task_id, team_id = %team.id, user_id = %auth.user_id, "Task updated");
    Ok(Json(single_task_view(state.store.as_ref(), &team, task).await?))
}

/// Delete a task
///
/// # Errors
///
/// - `403 Forbidden`: Caller is neither the task's creator nor the team's creator
/// - `404 Not Found`: No such task
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(task_id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    let (task, team) = load_task(&state, task_id).await?;
    check(&auth, Action::DeleteTask, &team, Some(&task))?;

    if !state.store.delete_task(task_id).await? {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }

    info!(%task_id, team_id = %team.id, user_id = %auth.user_id, "Task deleted");
    Ok(Json(json!({ "message": "Task deleted successfully" })))
}
