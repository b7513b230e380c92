/// User model and database operations
///
/// Users are the accounts that authenticate against the API. A user's team
/// list is not stored on the user row; it is derived from `team_members`
/// so membership has exactly one source of truth.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('user', 'admin');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email TEXT NOT NULL UNIQUE,
///     name VARCHAR(100) NOT NULL,
///     password_hash VARCHAR(255) NOT NULL,
///     role user_role NOT NULL DEFAULT 'user',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskly_shared::models::user::{User, CreateUser};
/// use taskly_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     name: "Ada".to_string(),
///     email: "ada@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
/// }).await?;
///
/// let found = User::find_by_email(&pool, "ada@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Account role tag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular account
    #[default]
    User,

    /// Administrative account
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }
}

/// User account
///
/// Passwords are stored as Argon2id hashes, never in plaintext.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Email address, stored normalized (trimmed, lowercase)
    pub email: String,

    /// Display name
    pub name: String,

    /// Argon2id password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Role tag
    pub role: UserRole,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Public projection of a user, used wherever a user reference is expanded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Display name
    pub name: String,

    /// Email address (normalized on insert)
    pub email: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,
}

/// Normalizes an email address for storage and lookup
///
/// Email lookups are case-insensitive, so both the stored value and every
/// lookup key go through this function.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Returns a database error on unique violation of `users_email_key`
    /// when the email is already registered.
    pub async fn create<'e, E>(executor: E, data: CreateUser) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, name, password_hash, role, created_at, updated_at
            "#,
        )
        .bind(normalize_email(&data.email))
        .bind(data.name.trim())
        .bind(data.password_hash)
        .fetch_one(executor)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, password_hash, role, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    /// Finds a user by email (case-insensitive)
    pub async fn find_by_email<'e, E>(executor: E, email: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, password_hash, role, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    /// Loads public summaries for a set of user IDs
    ///
    /// Unknown IDs are silently skipped. Results are ordered by name.
    pub async fn find_summaries<'e, E>(
        executor: E,
        ids: &[Uuid],
    ) -> Result<Vec<UserSummary>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let users = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, name, email
            FROM users
            WHERE id = ANY($1)
            ORDER BY name ASC, id ASC
            "#,
        )
        .bind(ids)
        .fetch_all(executor)
        .await?;

        Ok(users)
    }

    /// Lists every user sharing at least one team with `user_id`
    ///
    /// The user themself is included when they belong to any team.
    pub async fn list_teammates<'e, E>(
        executor: E,
        user_id: Uuid,
    ) -> Result<Vec<UserSummary>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let users = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT DISTINCT u.id, u.name, u.email
            FROM users u
            JOIN team_members tm ON tm.user_id = u.id
            WHERE tm.team_id IN (
                SELECT team_id FROM team_members WHERE user_id = $1
            )
            ORDER BY u.name ASC, u.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;

        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
        assert_eq!(normalize_email("bob@example.com"), "bob@example.com");
    }

    #[test]
    fn test_user_role_default_and_str() {
        assert_eq!(UserRole::default(), UserRole::User);
        assert_eq!(UserRole::User.as_str(), "user");
        assert_eq!(UserRole::Admin.as_str(), "admin");
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: "ada@example.com".to_string(),
            name: "Ada".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: UserRole::User,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "ada@example.com");

        let summary = UserSummary::from(&user);
        assert_eq!(summary.id, user.id);
        assert_eq!(summary.name, "Ada");
    }
}
