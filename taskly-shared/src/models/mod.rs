/// Domain models for Taskly
///
/// Each model carries its own PostgreSQL operations as associated functions
/// generic over `sqlx::PgExecutor`, so the same call works against a pool or
/// inside a transaction.
///
/// # Models
///
/// - `user`: Accounts and public user summaries
/// - `team`: Teams and their member sets
/// - `task`: Tasks, status/priority enums, ordering helpers and stats
///
/// # Example
///
/// ```no_run
/// use taskly_shared::models::team::{CreateTeam, Team};
/// use taskly_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let mut tx = pool.begin().await?;
/// let creator = Uuid::new_v4();
/// let team = Team::insert(&mut *tx, &CreateTeam {
///     name: "Eng".to_string(),
///     description: None,
///     created_by: creator,
/// }).await?;
/// Team::add_member(&mut *tx, team.id, creator).await?;
/// tx.commit().await?;
/// # Ok(())
/// # }
/// ```

pub mod task;
pub mod team;
pub mod user;
