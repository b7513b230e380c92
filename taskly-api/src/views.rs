/// Response bodies with user and team references expanded
///
/// Stored records hold IDs only. Handlers load the records they need and
/// turn them into views here, resolving every referenced user with a single
/// summaries query.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use taskly_shared::{
    models::{
        task::{Task, TaskPriority, TaskStatus},
        team::Team,
        user::{User, UserRole, UserSummary},
    },
    store::Store,
};
use uuid::Uuid;

use crate::error::ApiResult;

/// `{id, name}` reference to a team
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamRef {
    pub id: Uuid,
    pub name: String,
}

impl From<&Team> for TeamRef {
    fn from(team: &Team) -> Self {
        Self {
            id: team.id,
            name: team.name.clone(),
        }
    }
}

/// Account as returned by the auth endpoints
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub teams: Vec<TeamRef>,
    pub created_at: DateTime<Utc>,
}

impl UserView {
    pub fn new(user: &User, teams: &[Team]) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            teams: teams.iter().map(TeamRef::from).collect(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub deadline: Option<DateTime<Utc>>,
    pub assigned_to: Option<UserSummary>,
    pub created_by: Option<UserSummary>,
    pub team: TeamRef,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamView {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_by: Option<UserSummary>,
    pub members: Vec<UserSummary>,

    /// Present on the single-team view only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<TaskView>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Loads summaries for `ids` keyed by user ID
async fn summaries_by_id(
    store: &dyn Store,
    ids: impl IntoIterator<Item = Uuid>,
) -> ApiResult<HashMap<Uuid, UserSummary>> {
    let mut ids: Vec<Uuid> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();

    let summaries = store.find_user_summaries(&ids).await?;
    Ok(summaries.into_iter().map(|s| (s.id, s)).collect())
}

fn task_view(task: Task, team: TeamRef, users: &HashMap<Uuid, UserSummary>) -> TaskView {
    TaskView {
        id: task.id,
        title: task.title,
        description: task.description,
        status: task.status,
        priority: task.priority,
        deadline: task.deadline,
        assigned_to: task.assigned_to.and_then(|id| users.get(&id).cloned()),
        created_by: users.get(&task.created_by).cloned(),
        team,
        created_at: task.created_at,
        updated_at: task.updated_at,
    }
}

/// Expands tasks that may belong to different teams
///
/// Team names are resolved once per distinct team.
pub async fn task_views(store: &dyn Store, tasks: Vec<Task>) -> ApiResult<Vec<TaskView>> {
    let users = summaries_by_id(
        store,
        tasks
            .iter()
            .flat_map(|t| std::iter::once(t.created_by).chain(t.assigned_to)),
    )
    .await?;

    let mut teams: HashMap<Uuid, TeamRef> = HashMap::new();
    for team_id in tasks.iter().map(|t| t.team_id) {
        if teams.contains_key(&team_id) {
            continue;
        }
        let team_ref = match store.find_team(team_id).await? {
            Some(team) => TeamRef::from(&team),
            None => TeamRef {
                id: team_id,
                name: String::new(),
            },
        };
        teams.insert(team_id, team_ref);
    }

    Ok(tasks
        .into_iter()
        .map(|task| {
            let team = teams
                .get(&task.team_id)
                .cloned()
                .unwrap_or_else(|| TeamRef {
                    id: task.team_id,
                    name: String::new(),
                });
            task_view(task, team, &users)
        })
        .collect())
}

/// Expands tasks known to belong to `team`
pub async fn team_task_views(
    store: &dyn Store,
    team: &Team,
    tasks: Vec<Task>,
) -> ApiResult<Vec<TaskView>> {
    let users = summaries_by_id(
        store,
        tasks
            .iter()
            .flat_map(|t| std::iter::once(t.created_by).chain(t.assigned_to)),
    )
    .await?;

    let team_ref = TeamRef::from(team);
    Ok(tasks
        .into_iter()
        .map(|task| task_view(task, team_ref.clone(), &users))
        .collect())
}

/// Expands a single task
pub async fn single_task_view(store: &dyn Store, team: &Team, task: Task) -> ApiResult<TaskView> {
    let mut views = team_task_views(store, team, vec![task]).await?;
    views
        .pop()
        .ok_or_else(|| crate::error::ApiError::InternalError("Task view missing".to_string()))
}

/// Expands a team's creator and members, optionally with its tasks
pub async fn team_view(store: &dyn Store, team: Team, with_tasks: bool) -> ApiResult<TeamView> {
    let members = store.list_team_members(team.id).await?;
    let created_by = members.iter().find(|m| m.id == team.created_by).cloned();

    let tasks = if with_tasks {
        let tasks = store.list_team_tasks(team.id).await?;
        Some(team_task_views(store, &team, tasks).await?)
    } else {
        None
    };

    Ok(TeamView {
        id: team.id,
        name: team.name,
        description: team.description,
        created_by,
        members,
        tasks,
        created_at: team.created_at,
        updated_at: team.updated_at,
    })
}

/// Expands a list of teams without their tasks
pub async fn team_views(store: &dyn Store, teams: Vec<Team>) -> ApiResult<Vec<TeamView>> {
    let mut views = Vec::with_capacity(teams.len());
    for team in teams {
        views.push(team_view(store, team, false).await?);
    }
    Ok(views)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_task_view_serializes_camel_case() {
        let now = Utc::now();
        let creator = UserSummary {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
        };
        let team = Team {
            id: Uuid::new_v4(),
            name: "Eng".to_string(),
            description: None,
            created_by: creator.id,
            members: HashSet::from([creator.id]),
            created_at: now,
            updated_at: now,
        };
        let task = Task {
            id: Uuid::new_v4(),
            title: "Ship".to_string(),
            description: None,
            status: TaskStatus::InProgress,
            priority: TaskPriority::High,
            deadline: None,
            assigned_to: Some(creator.id),
            created_by: creator.id,
            team_id: team.id,
            created_at: now,
            updated_at: now,
        };
        let users = HashMap::from([(creator.id, creator.clone())]);

        let json = serde_json::to_value(task_view(task, TeamRef::from(&team), &users)).unwrap();

        assert_eq!(json["status"], "in-progress");
        assert_eq!(json["priority"], "high");
        assert_eq!(json["assignedTo"]["email"], "ada@example.com");
        assert_eq!(json["createdBy"]["name"], "Ada");
        assert_eq!(json["team"]["name"], "Eng");
        assert!(json.get("createdAt").is_some());
        assert!(json["deadline"].is_null());
    }
}
