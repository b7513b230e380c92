/// Team endpoints
///
/// # Endpoints
///
/// - `POST /api/teams` - Create a team (caller becomes creator and member)
/// - `GET /api/teams` - Teams the caller belongs to
/// - `GET /api/teams/members` - Everyone sharing a team with the caller
/// - `GET /api/teams/:team_id` - Team with members and tasks (members only)
/// - `PUT /api/teams/:team_id` - Rename or re-describe (creator only)
/// - `POST /api/teams/:team_id/members` - Add a member by email (creator only)
/// - `DELETE /api/teams/:team_id/members/:user_id` - Remove a member (creator only)
/// - `DELETE /api/teams/:team_id` - Delete the team and its tasks (creator only)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{double_option, ApiJson, ApiPath},
    views::{team_view, team_views, TeamView},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use taskly_shared::{
    auth::{
        authorization::{authorize, Action},
        middleware::AuthContext,
    },
    models::{
        team::{CreateTeam, Team, UpdateTeam},
        user::UserSummary,
    },
};
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

const MAX_NAME_LENGTH: usize = 100;

#[derive(Debug, Deserialize)]
pub struct CreateTeamRequest {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,
}

/// Partial update; `null` or `""` clears the description
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTeamRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub name: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddMemberRequest {
    #[serde(default)]
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
}

/// Trims a team name and checks it is non-empty and within bounds
fn validate_name(name: &str) -> ApiResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::invalid("name", "Team name is required"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ApiError::invalid(
            "name",
            format!("Team name must be at most {} characters", MAX_NAME_LENGTH),
        ));
    }
    Ok(name.to_string())
}

/// Empty descriptions are stored as absent
fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

impl UpdateTeamRequest {
    fn into_update(self) -> ApiResult<UpdateTeam> {
        let name = match self.name {
            Some(Some(name)) => Some(validate_name(&name)?),
            // Required field: omitted and null both keep the current name
            Some(None) | None => None,
        };

        Ok(UpdateTeam {
            name,
            description: self.description.map(normalize_description),
        })
    }
}

/// Loads a team or fails with 404
pub(crate) async fn load_team(state: &AppState, team_id: Uuid) -> ApiResult<Team> {
    state
        .store
        .find_team(team_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Team not found".to_string()))
}

/// Loads a team and checks the caller may perform `action` on it
async fn guarded_team(
    state: &AppState,
    auth: &AuthContext,
    team_id: Uuid,
    action: Action,
) -> ApiResult<Team> {
    let team = load_team(state, team_id).await?;

    authorize(auth.user_id, action, &team, None).map_err(|e| {
        debug!(%team_id, user_id = %auth.user_id, ?action, "Team access denied");
        e
    })?;

    Ok(team)
}

/// Create a team
///
/// # Errors
///
/// - `400 Bad Request`: Missing or blank name
pub async fn create_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<CreateTeamRequest>,
) -> ApiResult<(StatusCode, Json<TeamView>)> {
    let name = validate_name(&req.name)?;

    let team = state
        .store
        .create_team(CreateTeam {
            name,
            description: normalize_description(req.description),
            created_by: auth.user_id,
        })
        .await?;

    info!(team_id = %team.id, user_id = %auth.user_id, "Team created");

    let view = team_view(state.store.as_ref(), team, false).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Teams the caller is a member of
pub async fn list_teams(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<TeamView>>> {
    let teams = state.store.list_teams_for_user(auth.user_id).await?;
    Ok(Json(team_views(state.store.as_ref(), teams).await?))
}

/// Everyone who shares at least one team with the caller
pub async fn list_teammates(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<UserSummary>>> {
    Ok(Json(state.store.list_teammates(auth.user_id).await?))
}

/// Team with creator, members and tasks expanded
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a member
/// - `404 Not Found`: No such team
pub async fn get_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(team_id): ApiPath<Uuid>,
) -> ApiResult<Json<TeamView>> {
    let team = guarded_team(&state, &auth, team_id, Action::ViewTeam).await?;
    Ok(Json(team_view(state.store.as_ref(), team, true).await?))
}

/// Partially update a team
///
/// # Errors
///
/// - `400 Bad Request`: Blank name
/// - `403 Forbidden`: Caller is not the creator
/// - `404 Not Found`: No such team
pub async fn update_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(team_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateTeamRequest>,
) -> ApiResult<Json<TeamView>> {
    guarded_team(&state, &auth, team_id, Action::UpdateTeam).await?;

    let update = req.into_update()?;
    let team = state
        .store
        .update_team(team_id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Team not found".to_string()))?;

    info!(%team_id, user_id = %auth.user_id, "Team updated");
    Ok(Json(team_view(state.store.as_ref(), team, false).await?))
}

/// Add a member by email
///
/// # Errors
///
/// - `400 Bad Request`: Invalid email or user already a member
/// - `403 Forbidden`: Caller is not the creator
/// - `404 Not Found`: No such team, or no user with that email
pub async fn add_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(team_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<AddMemberRequest>,
) -> ApiResult<Json<TeamView>> {
    let team = guarded_team(&state, &auth, team_id, Action::ManageMembers).await?;

    req.validate()?;

    let user = state
        .store
        .find_user_by_email(&req.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if team.is_member(user.id) {
        return Err(ApiError::BadRequest(
            "User is already a member of this team".to_string(),
        ));
    }

    state.store.add_team_member(team_id, user.id).await?;
    info!(%team_id, member_id = %user.id, user_id = %auth.user_id, "Team member added");

    let team = load_team(&state, team_id).await?;
    Ok(Json(team_view(state.store.as_ref(), team, false).await?))
}

/// Remove a member; their tasks in this team become unassigned
///
/// # Errors
///
/// - `400 Bad Request`: Target is the creator or not a member
/// - `403 Forbidden`: Caller is not the creator
/// - `404 Not Found`: No such team
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath((team_id, user_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<TeamView>> {
    let team = guarded_team(&state, &auth, team_id, Action::ManageMembers).await?;

    if team.is_creator(user_id) {
        return Err(ApiError::BadRequest("Cannot remove team creator".to_string()));
    }
    if !team.is_member(user_id) {
        return Err(ApiError::BadRequest(
            "User is not a member of this team".to_string(),
        ));
    }

    if !state.store.remove_team_member(team_id, user_id).await? {
        // Removed by a concurrent request after the check above
        return Err(ApiError::BadRequest(
            "User is not a member of this team".to_string(),
        ));
    }
    info!(%team_id, member_id = %user_id, user_id = %auth.user_id, "Team member removed");

    let team = load_team(&state, team_id).await?;
    Ok(Json(team_view(state.store.as_ref(), team, false).await?))
}

/// Delete a team together with its tasks
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not the creator
/// - `404 Not Found`: No such team
pub async fn delete_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(team_id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    guarded_team(&state, &auth, team_id, Action::DeleteTeam).await?;

    if !state.store.delete_team(team_id).await? {
        return Err(ApiError::NotFound("Team not found".to_string()));
    }

    info!(%team_id, user_id = %auth.user_id, "Team deleted");
    Ok(Json(json!({ "message": "Team deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Eng ").unwrap(), "Eng");
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_update_request_tristate() {
        let req: UpdateTeamRequest = serde_json::from_str(r#"{"name": null}"#).unwrap();
        let update = req.into_update().unwrap();
        assert!(update.name.is_none());
        assert!(update.description.is_none());

        let req: UpdateTeamRequest = serde_json::from_str(r#"{"description": ""}"#).unwrap();
        let update = req.into_update().unwrap();
        assert_eq!(update.description, Some(None));

        let req: UpdateTeamRequest = serde_json::from_str(r#"{"name": ""}"#).unwrap();
        assert!(matches!(req.into_update(), Err(ApiError::ValidationError(_))));
    }
}
