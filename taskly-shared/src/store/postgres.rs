/// PostgreSQL store
///
/// Thin adapter from the [`Store`] trait onto the model queries. Operations
/// touching more than one row run inside a single transaction, and the
/// schema's constraints (unique email, membership primary key, assignee
/// membership foreign key) back up every invariant the handlers check.

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::db::{
    migrations::run_migrations,
    pool::{create_pool, health_check, DatabaseConfig},
};
use crate::models::{
    task::{CreateTask, Task, UpdateTask},
    team::{CreateTeam, Team, UpdateTeam},
    user::{normalize_email, CreateUser, User, UserSummary},
};

/// PostgreSQL error code for foreign key violations
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// PostgreSQL implementation of [`Store`]
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a pool from `config` and wraps it
    pub async fn connect(config: DatabaseConfig) -> StoreResult<Self> {
        let pool = create_pool(config).await?;
        Ok(Self::new(pool))
    }

    /// Applies pending migrations
    pub async fn migrate(&self) -> StoreResult<()> {
        run_migrations(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn attach_members(&self, mut teams: Vec<Team>) -> StoreResult<Vec<Team>> {
        if teams.is_empty() {
            return Ok(teams);
        }

        let ids: Vec<Uuid> = teams.iter().map(|t| t.id).collect();
        let rows: Vec<(Uuid, Uuid)> = sqlx::query_as(
            "SELECT team_id, user_id FROM team_members WHERE team_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut members: HashMap<Uuid, HashSet<Uuid>> = HashMap::new();
        for (team_id, user_id) in rows {
            members.entry(team_id).or_default().insert(user_id);
        }
        for team in &mut teams {
            team.members = members.remove(&team.id).unwrap_or_default();
        }

        Ok(teams)
    }
}

/// Maps constraint violations onto domain errors
fn map_constraint(err: sqlx::Error, context: impl FnOnce() -> StoreError) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        let is_fk = db_err.code().as_deref() == Some(FOREIGN_KEY_VIOLATION);
        match db_err.constraint() {
            Some("users_email_key") | Some("team_members_pkey") => return context(),
            _ if is_fk => return StoreError::MissingReference(db_err.message().to_string()),
            _ => {}
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn health_check(&self) -> StoreResult<()> {
        health_check(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        let email = normalize_email(&data.email);
        User::create(&self.pool, data)
            .await
            .map_err(|e| map_constraint(e, || StoreError::DuplicateEmail(email)))
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn find_user_summaries(&self, ids: &[Uuid]) -> StoreResult<Vec<UserSummary>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(User::find_summaries(&self.pool, ids).await?)
    }

    async fn list_teammates(&self, user_id: Uuid) -> StoreResult<Vec<UserSummary>> {
        Ok(User::list_teammates(&self.pool, user_id).await?)
    }

    async fn create_team(&self, data: CreateTeam) -> StoreResult<Team> {
        let mut tx = self.pool.begin().await?;

        let mut team = Team::insert(&mut *tx, &data)
            .await
            .map_err(|e| map_constraint(e, || StoreError::MissingReference("team".into())))?;
        Team::add_member(&mut *tx, team.id, data.created_by).await?;

        tx.commit().await?;

        team.members.insert(data.created_by);
        info!(team_id = %team.id, created_by = %team.created_by, "Team created");
        Ok(team)
    }

    async fn find_team(&self, id: Uuid) -> StoreResult<Option<Team>> {
        let Some(team) = Team::find_row(&self.pool, id).await? else {
            return Ok(None);
        };
        Ok(self.attach_members(vec![team]).await?.pop())
    }

    async fn list_teams_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Team>> {
        let teams = Team::list_rows_for_user(&self.pool, user_id).await?;
        self.attach_members(teams).await
    }

    async fn list_team_members(&self, team_id: Uuid) -> StoreResult<Vec<UserSummary>> {
        Ok(Team::member_summaries(&self.pool, team_id).await?)
    }

    async fn update_team(&self, id: Uuid, update: UpdateTeam) -> StoreResult<Option<Team>> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent partial updates
        let Some(mut team) = Team::find_row_for_update(&mut *tx, id).await? else {
            return Ok(None);
        };
        update.apply(&mut team);
        team.save(&mut *tx).await?;
        team.members = Team::member_ids(&mut *tx, id).await?;

        tx.commit().await?;
        Ok(Some(team))
    }

    async fn add_team_member(&self, team_id: Uuid, user_id: Uuid) -> StoreResult<()> {
        Team::add_member(&self.pool, team_id, user_id)
            .await
            .map_err(|e| map_constraint(e, || StoreError::AlreadyMember { team_id, user_id }))?;

        debug!(%team_id, %user_id, "Member added");
        Ok(())
    }

    async fn remove_team_member(&self, team_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        // Assignments reference the membership row, so clear them first
        let unassigned = Task::unassign_member(&mut *tx, team_id, user_id).await?;
        let removed = Team::remove_member(&mut *tx, team_id, user_id).await?;

        if !removed {
            tx.rollback().await?;
            return Ok(false);
        }
        tx.commit().await?;

        debug!(%team_id, %user_id, unassigned, "Member removed");
        Ok(true)
    }

    async fn delete_team(&self, id: Uuid) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        // Tasks first so their assignee references never outlive the memberships
        sqlx::query("DELETE FROM tasks WHERE team_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = Team::delete(&mut *tx, id).await?;

        tx.commit().await?;
        Ok(deleted)
    }

    async fn create_task(&self, data: CreateTask) -> StoreResult<Task> {
        Task::create(&self.pool, data)
            .await
            .map_err(|e| map_constraint(e, || StoreError::MissingReference("task".into())))
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(Task::find_by_id(&self.pool, id).await?)
    }

    async fn list_team_tasks(&self, team_id: Uuid) -> StoreResult<Vec<Task>> {
        Ok(Task::list_by_team(&self.pool, team_id).await?)
    }

    async fn list_assigned_tasks(&self, user_id: Uuid) -> StoreResult<Vec<Task>> {
        Ok(Task::list_assigned(&self.pool, user_id).await?)
    }

    async fn list_member_tasks(&self, user_id: Uuid) -> StoreResult<Vec<Task>> {
        Ok(Task::list_for_member(&self.pool, user_id).await?)
    }

    async fn update_task(&self, id: Uuid, update: UpdateTask) -> StoreResult<Option<Task>> {
        let mut tx = self.pool.begin().await?;

        let Some(mut task) = Task::find_by_id_for_update(&mut *tx, id).await? else {
            return Ok(None);
        };
        update.apply(&mut task);
        task.save(&mut *tx)
            .await
            .map_err(|e| map_constraint(e, || StoreError::MissingReference("task".into())))?;

        tx.commit().await?;
        Ok(Some(task))
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Task::delete(&self.pool, id).await?)
    }
}
