/// Authentication endpoints
///
/// - `POST /api/auth/register` - Create an account and get a token
/// - `POST /api/auth/login` - Exchange credentials for a token
/// - `GET /api/auth/me` - Current user with their teams

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
    views::UserView,
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use taskly_shared::{
    auth::{
        jwt::{self, Claims},
        middleware::AuthContext,
        password,
    },
    models::user::{CreateUser, User},
};
use tracing::{debug, info};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Display name
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    /// Email address
    #[serde(default)]
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,

    /// Password (strength checked separately)
    #[serde(default)]
    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Register and login response
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserView,
    pub token: String,
}

fn issue_token(state: &AppState, user: &User) -> ApiResult<String> {
    let claims = Claims::with_expiration(user.id, state.config.jwt.expiration());
    Ok(jwt::create_token(&claims, state.jwt_secret())?)
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/register
/// Content-Type: application/json
///
/// { "name": "Ada", "email": "ada@example.com", "password": "hunter22" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed or the email is already registered
/// - `409 Conflict`: A concurrent registration claimed the email first
pub async fn register(
    State(state): State<AppState>,
    ApiJson(mut req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    req.name = req.name.trim().to_string();
    req.email = req.email.trim().to_string();
    req.validate()?;

    password::validate_password_strength(&req.password)
        .map_err(|e| ApiError::invalid("password", e))?;

    if state.store.find_user_by_email(&req.email).await?.is_some() {
        return Err(ApiError::BadRequest(
            "User already exists with that email".to_string(),
        ));
    }

    let password_hash = password::hash_password(&req.password, state.hash_params())?;

    let user = state
        .store
        .create_user(CreateUser {
            name: req.name,
            email: req.email,
            password_hash,
        })
        .await?;

    info!(user_id = %user.id, "User registered");

    let token = issue_token(&state, &user)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: UserView::new(&user, &[]),
            token,
        }),
    ))
}

/// Login with email and password
///
/// Unknown emails and wrong passwords get the same 401 response.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate()?;

    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());

    let Some(user) = state.store.find_user_by_email(&req.email).await? else {
        debug!("Login attempt for unknown email");
        return Err(invalid());
    };

    if !password::verify_password(&req.password, &user.password_hash)? {
        debug!(user_id = %user.id, "Login attempt with wrong password");
        return Err(invalid());
    }

    let teams = state.store.list_teams_for_user(user.id).await?;
    let token = issue_token(&state, &user)?;

    info!(user_id = %user.id, "User logged in");
    Ok(Json(AuthResponse {
        user: UserView::new(&user, &teams),
        token,
    }))
}

/// Current user with their teams
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UserView>> {
    let user = state
        .store
        .find_user_by_id(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let teams = state.store.list_teams_for_user(user.id).await?;

    Ok(Json(UserView::new(&user, &teams)))
}
