/// Storage abstraction for users, teams and tasks
///
/// Handlers talk to a [`Store`] trait object so the same access-control code
/// runs against PostgreSQL in production and an in-memory map in tests and
/// local development.
///
/// # Atomicity
///
/// Every method is a single atomic unit against its backend:
///
/// - [`PgStore`] wraps multi-statement operations (team creation, member
///   removal) in one transaction
/// - [`MemoryStore`] performs each operation under a single write lock
///
/// Membership lives only on the team side. A user's teams and a team's tasks
/// are queries, so no operation needs to update two copies of the same
/// relationship.
///
/// # Example
///
/// ```
/// use taskly_shared::store::{MemoryStore, Store};
/// use taskly_shared::models::user::CreateUser;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let user = store.create_user(CreateUser {
///     name: "Ada".to_string(),
///     email: "ada@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
/// }).await?;
///
/// assert!(store.list_teams_for_user(user.id).await?.is_empty());
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{
    task::{CreateTask, Task, UpdateTask},
    team::{CreateTeam, Team, UpdateTeam},
    user::{CreateUser, User, UserSummary},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Shared handle to a store
pub type SharedStore = Arc<dyn Store>;

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A user with this email already exists
    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    /// The user is already a member of the team
    #[error("User {user_id} is already a member of team {team_id}")]
    AlreadyMember { team_id: Uuid, user_id: Uuid },

    /// A referenced record disappeared mid-operation
    #[error("Referenced record not found: {0}")]
    MissingReference(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Persistence operations required by the API
///
/// Read methods return `Ok(None)` (or an empty list) for missing records;
/// callers decide whether that is a 404.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Backend name for logs and health output
    fn backend(&self) -> &'static str;

    /// Checks connectivity
    async fn health_check(&self) -> StoreResult<()>;

    // Users

    async fn create_user(&self, data: CreateUser) -> StoreResult<User>;

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Case-insensitive lookup
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Summaries for the given IDs, ordered by name; unknown IDs are skipped
    async fn find_user_summaries(&self, ids: &[Uuid]) -> StoreResult<Vec<UserSummary>>;

    /// Users sharing at least one team with `user_id`, ordered by name
    async fn list_teammates(&self, user_id: Uuid) -> StoreResult<Vec<UserSummary>>;

    // Teams

    /// Creates a team with its creator as the sole member
    async fn create_team(&self, data: CreateTeam) -> StoreResult<Team>;

    /// Loads a team with its member set
    async fn find_team(&self, id: Uuid) -> StoreResult<Option<Team>>;

    /// Teams the user is a member of, in join order
    async fn list_teams_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Team>>;

    /// Member summaries of a team, in join order
    async fn list_team_members(&self, team_id: Uuid) -> StoreResult<Vec<UserSummary>>;

    /// Applies a partial update; `None` if the team does not exist
    async fn update_team(&self, id: Uuid, update: UpdateTeam) -> StoreResult<Option<Team>>;

    /// Adds a member
    ///
    /// # Errors
    ///
    /// `StoreError::AlreadyMember` if the user is already in the team.
    async fn add_team_member(&self, team_id: Uuid, user_id: Uuid) -> StoreResult<()>;

    /// Removes a member and unassigns their tasks in the team
    ///
    /// Returns false when the user was not a member.
    async fn remove_team_member(&self, team_id: Uuid, user_id: Uuid) -> StoreResult<bool>;

    /// Deletes a team together with its memberships and tasks
    async fn delete_team(&self, id: Uuid) -> StoreResult<bool>;

    // Tasks

    async fn create_task(&self, data: CreateTask) -> StoreResult<Task>;

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>>;

    /// Tasks of a team, newest first
    async fn list_team_tasks(&self, team_id: Uuid) -> StoreResult<Vec<Task>>;

    /// Tasks assigned to a user, earliest deadline first, undated last,
    /// ties newest first
    async fn list_assigned_tasks(&self, user_id: Uuid) -> StoreResult<Vec<Task>>;

    /// Tasks of every team the user belongs to, newest first
    async fn list_member_tasks(&self, user_id: Uuid) -> StoreResult<Vec<Task>>;

    /// Applies a partial update; `None` if the task does not exist
    async fn update_task(&self, id: Uuid, update: UpdateTask) -> StoreResult<Option<Task>>;

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool>;
}
