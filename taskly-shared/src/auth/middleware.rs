/// Authentication gate
///
/// Turns an `Authorization: Bearer <token>` header into an [`AuthContext`].
/// The token's subject must still resolve to a user in the store, so tokens
/// of deleted accounts stop working immediately.
///
/// The Axum middleware wrapper lives in the API crate; this module holds the
/// framework-independent part so it can be tested without a router.
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use taskly_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("Hello, {}", auth.email)
/// }
/// ```

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::jwt::{validate_token, JwtError};
use crate::store::Store;

/// Identity attached to every authenticated request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
}

/// Error type for the authentication gate
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No Authorization header
    #[error("No token, authorization denied")]
    MissingCredentials,

    /// Header present but not a Bearer token
    #[error("Invalid authorization header: {0}")]
    InvalidFormat(String),

    /// Signature, issuer or timing checks failed
    #[error("Token is not valid: {0}")]
    InvalidToken(String),

    /// Token subject no longer exists
    #[error("User not found for token")]
    UnknownUser,

    /// Store lookup failed
    #[error("Authentication lookup failed: {0}")]
    Store(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        };
        let (code, message) = match &self {
            AuthError::Store(_) => ("internal_error", "Internal server error".to_string()),
            other => ("unauthorized", other.to_string()),
        };

        let body = Json(serde_json::json!({
            "error": code,
            "message": message,
        }));
        (status, body).into_response()
    }
}

/// Extracts the bearer token from request headers
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat("Header is not valid ASCII".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}

/// Validates the request's bearer token and resolves its subject
///
/// # Errors
///
/// `AuthError::Store` only when the user lookup itself fails; every other
/// variant maps to 401.
pub async fn authenticate(
    store: &dyn Store,
    secret: &str,
    headers: &HeaderMap,
) -> Result<AuthContext, AuthError> {
    let token = bearer_token(headers)?;

    let claims = validate_token(token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer { .. } => AuthError::InvalidToken("Invalid issuer".to_string()),
        other => AuthError::InvalidToken(other.to_string()),
    })?;

    let user = store
        .find_user_by_id(claims.sub)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?
        .ok_or_else(|| {
            debug!(user_id = %claims.sub, "Token subject no longer exists");
            AuthError::UnknownUser
        })?;

    Ok(AuthContext {
        user_id: user.id,
        email: user.email,
    })
}
