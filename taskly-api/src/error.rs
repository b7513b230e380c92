/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers return `Result<T, ApiError>`; library errors convert into
/// `ApiError` through the `From` impls below so handlers can use `?`.
///
/// # Response body
///
/// ```json
/// {
///   "error": "validation_error",
///   "message": "Request validation failed",
///   "errors": [{ "field": "title", "message": "Title is required" }]
/// }
/// ```
///
/// Internal errors attach their underlying message as an
/// [`InternalErrorDetail`] response extension. The router's detail layer
/// copies it into a `detail` field unless the server runs in production mode.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use taskly_shared::{
    auth::{
        authorization::AuthzError, jwt::JwtError, middleware::AuthError, password::PasswordError,
    },
    store::StoreError,
};

const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";

/// Underlying message of a 500 response, never serialized by itself
#[derive(Debug, Clone)]
pub struct InternalErrorDetail(pub String);

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409), concurrent writes racing on a unique constraint
    Conflict(String),

    /// Validation errors (400)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),
}

impl ApiError {
    /// Single-field validation error
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail::new(field, message)])
    }
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

impl ValidationErrorDetail {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Per-field validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ValidationErrorDetail>>,

    /// Underlying internal error, outside production only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, errors, internal) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None, None),
            ApiError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", msg, None, None)
            }
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None, None),
            ApiError::ValidationError(errors) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
                None,
            ),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    INTERNAL_ERROR_MESSAGE.to_string(),
                    None,
                    Some(msg),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            errors,
            detail: None,
        });

        let mut response = (status, body).into_response();
        if let Some(msg) = internal {
            response.extensions_mut().insert(InternalErrorDetail(msg));
        }
        response
    }
}

/// Re-renders a 500 body with its `detail` field filled in
///
/// Responses without an [`InternalErrorDetail`] pass through untouched.
pub fn expose_internal_detail(response: Response) -> Response {
    let Some(InternalErrorDetail(detail)) =
        response.extensions().get::<InternalErrorDetail>().cloned()
    else {
        return response;
    };

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);

    let body = Json(ErrorResponse {
        error: "internal_error".to_string(),
        message: INTERNAL_ERROR_MESSAGE.to_string(),
        errors: None,
        detail: Some(detail),
    });

    (parts, body).into_response()
}

/// Convert store errors to API errors
///
/// Handlers check for duplicates before writing, so a unique violation that
/// still reaches here lost a race with a concurrent request.
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail(_) => {
                ApiError::Conflict("User already exists".to_string())
            }
            StoreError::AlreadyMember { .. } => {
                ApiError::Conflict("User is already a member of this team".to_string())
            }
            StoreError::MissingReference(what) => {
                ApiError::Conflict(format!("Referenced record changed concurrently: {}", what))
            }
            StoreError::Database(e) => ApiError::InternalError(format!("Database error: {}", e)),
            StoreError::Migration(e) => ApiError::InternalError(format!("Migration error: {}", e)),
        }
    }
}

/// Convert authentication gate errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Store(msg) => ApiError::InternalError(msg),
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}

/// Convert authorization errors to API errors
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::MissingTask(_) => ApiError::InternalError(err.to_string()),
            other => ApiError::Forbidden(other.to_string()),
        }
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

/// Convert JWT errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => ApiError::InternalError(msg),
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::InvalidIssuer { .. } => {
                ApiError::Unauthorized("Invalid token issuer".to_string())
            }
            other => ApiError::Unauthorized(format!("Invalid token: {}", other)),
        }
    }
}

/// Convert `validator` failures to per-field details
impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut errors: Vec<ValidationErrorDetail> = err
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();
        errors.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(errors)
    }
}

/// Malformed or mistyped JSON bodies are client errors
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Unparseable path parameters, such as a malformed UUID
impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
