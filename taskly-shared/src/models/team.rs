/// Team model and database operations
///
/// A team owns its member set. The `team_members` table is the single source
/// of truth for membership: a user's team list and a team's task list are
/// both computed by query, so there is no second copy to keep in sync.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE teams (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL,
///     description TEXT,
///     created_by UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE team_members (
///     team_id UUID NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (team_id, user_id)
/// );
/// ```
///
/// # Invariants
///
/// - `created_by` is always in `members`
/// - membership is a set; adding an existing member is rejected by the primary key

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use std::collections::HashSet;
use uuid::Uuid;

/// Team with its member set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Team {
    pub id: Uuid,

    pub name: String,

    pub description: Option<String>,

    /// Creator; always a member
    pub created_by: Uuid,

    /// Member IDs, loaded from `team_members`
    #[sqlx(skip)]
    pub members: HashSet<Uuid>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Team {
    /// O(1) membership test
    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.members.contains(&user_id)
    }

    pub fn is_creator(&self, user_id: Uuid) -> bool {
        self.created_by == user_id
    }
}

/// Input for creating a team
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTeam {
    pub name: String,
    pub description: Option<String>,
    pub created_by: Uuid,
}

/// Partial team update
///
/// `None` keeps the stored value. For `description`, `Some(None)` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTeam {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

impl UpdateTeam {
    /// Applies this update to a team in place
    pub fn apply(self, team: &mut Team) {
        if let Some(name) = self.name {
            team.name = name;
        }
        if let Some(description) = self.description {
            team.description = description;
        }
        team.updated_at = Utc::now();
    }
}

const TEAM_COLUMNS: &str = "id, name, description, created_by, created_at, updated_at";

impl Team {
    /// Inserts the team row only; the creator membership is added separately
    /// inside the same transaction by the store
    pub async fn insert<'e, E>(executor: E, data: &CreateTeam) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let team = sqlx::query_as::<_, Team>(&format!(
            r#"
            INSERT INTO teams (name, description, created_by)
            VALUES ($1, $2, $3)
            RETURNING {TEAM_COLUMNS}
            "#
        ))
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.created_by)
        .fetch_one(executor)
        .await?;

        Ok(team)
    }

    /// Finds a team row by ID without members
    pub async fn find_row<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let team = sqlx::query_as::<_, Team>(&format!(
            "SELECT {TEAM_COLUMNS} FROM teams WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(team)
    }

    /// Loads a team row locked against concurrent writers
    pub async fn find_row_for_update<'e, E>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let team = sqlx::query_as::<_, Team>(&format!(
            "SELECT {TEAM_COLUMNS} FROM teams WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(team)
    }

    /// Lists team rows the user belongs to, oldest membership first
    pub async fn list_rows_for_user<'e, E>(
        executor: E,
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let teams = sqlx::query_as::<_, Team>(
            r#"
            SELECT t.id, t.name, t.description, t.created_by, t.created_at, t.updated_at
            FROM teams t
            JOIN team_members tm ON tm.team_id = t.id
            WHERE tm.user_id = $1
            ORDER BY tm.joined_at ASC, t.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;

        Ok(teams)
    }

    /// Writes name and description back to the row
    pub async fn save<'e, E>(&self, executor: E) -> Result<(), sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            UPDATE teams
            SET name = $2, description = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(self.id)
        .bind(&self.name)
        .bind(&self.description)
        .bind(self.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Deletes a team; memberships and tasks cascade
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM teams WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Loads the member IDs of a team
    pub async fn member_ids<'e, E>(executor: E, team_id: Uuid) -> Result<HashSet<Uuid>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM team_members WHERE team_id = $1",
        )
        .bind(team_id)
        .fetch_all(executor)
        .await?;

        Ok(ids.into_iter().collect())
    }

    /// Loads member summaries in join order
    pub async fn member_summaries<'e, E>(
        executor: E,
        team_id: Uuid,
    ) -> Result<Vec<super::user::UserSummary>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let members = sqlx::query_as::<_, super::user::UserSummary>(
            r#"
            SELECT u.id, u.name, u.email
            FROM team_members tm
            JOIN users u ON u.id = tm.user_id
            WHERE tm.team_id = $1
            ORDER BY tm.joined_at ASC, u.id ASC
            "#,
        )
        .bind(team_id)
        .fetch_all(executor)
        .await?;

        Ok(members)
    }

    /// Adds a user to a team
    ///
    /// # Errors
    ///
    /// Returns a unique violation on `team_members_pkey` when the user is
    /// already a member.
    pub async fn add_member<'e, E>(executor: E, team_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query("INSERT INTO team_members (team_id, user_id) VALUES ($1, $2)")
            .bind(team_id)
            .bind(user_id)
            .execute(executor)
            .await?;

        Ok(())
    }

    /// Removes a user from a team
    ///
    /// Returns false when the user was not a member.
    pub async fn remove_member<'e, E>(
        executor: E,
        team_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM team_members WHERE team_id = $1 AND user_id = $2")
            .bind(team_id)
            .bind(user_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team_with(created_by: Uuid, members: &[Uuid]) -> Team {
        let now = Utc::now();
        Team {
            id: Uuid::new_v4(),
            name: "Eng".to_string(),
            description: Some("Engineering".to_string()),
            created_by,
            members: members.iter().copied().collect(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_membership_checks() {
        let creator = Uuid::new_v4();
        let member = Uuid::new_v4();
        let team = team_with(creator, &[creator, member]);

        assert!(team.is_member(creator));
        assert!(team.is_member(member));
        assert!(!team.is_member(Uuid::new_v4()));

        assert!(team.is_creator(creator));
        assert!(!team.is_creator(member));
    }

    #[test]
    fn test_update_keeps_omitted_fields() {
        let creator = Uuid::new_v4();
        let mut team = team_with(creator, &[creator]);

        UpdateTeam {
            name: Some("Platform".to_string()),
            description: None,
        }
        .apply(&mut team);

        assert_eq!(team.name, "Platform");
        assert_eq!(team.description.as_deref(), Some("Engineering"));
    }

    #[test]
    fn test_update_can_clear_description() {
        let creator = Uuid::new_v4();
        let mut team = team_with(creator, &[creator]);

        UpdateTeam {
            name: None,
            description: Some(None),
        }
        .apply(&mut team);

        assert_eq!(team.name, "Eng");
        assert!(team.description.is_none());
    }
}
