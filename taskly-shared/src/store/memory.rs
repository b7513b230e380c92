/// In-memory store
///
/// Keeps every record in hash maps behind one `tokio::sync::RwLock`. Each
/// trait method takes the lock once, so every operation is atomic with
/// respect to every other. Used by the test suites and selected at runtime
/// with `DATABASE_URL=memory://`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    task::{sort_by_deadline, sort_newest_first, CreateTask, Task, UpdateTask},
    team::{CreateTeam, Team, UpdateTeam},
    user::{normalize_email, CreateUser, User, UserRole, UserSummary},
};

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, User>,
    teams: HashMap<Uuid, Team>,
    /// Join time per (team, user), used for member and team ordering
    joined_at: HashMap<(Uuid, Uuid), DateTime<Utc>>,
    tasks: HashMap<Uuid, Task>,
}

impl State {
    fn summaries<'a>(&self, ids: impl IntoIterator<Item = &'a Uuid>) -> Vec<UserSummary> {
        let mut summaries: Vec<UserSummary> = ids
            .into_iter()
            .filter_map(|id| self.users.get(id))
            .map(UserSummary::from)
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        summaries
    }

    fn join(&mut self, team_id: Uuid, user_id: Uuid) {
        // Strictly increasing join times keep ordering stable within a test
        let now = Utc::now();
        let latest = self
            .joined_at
            .values()
            .max()
            .copied()
            .filter(|latest| *latest >= now)
            .map(|latest| latest + Duration::microseconds(1));
        self.joined_at
            .insert((team_id, user_id), latest.unwrap_or(now));
    }

    fn joined(&self, team_id: Uuid, user_id: Uuid) -> DateTime<Utc> {
        self.joined_at
            .get(&(team_id, user_id))
            .copied()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Creation timestamp that is strictly later than every existing task
    fn next_task_time(&self) -> DateTime<Utc> {
        let now = Utc::now();
        match self.tasks.values().map(|t| t.created_at).max() {
            Some(latest) if latest >= now => latest + Duration::microseconds(1),
            _ => now,
        }
    }
}

/// In-memory implementation of [`Store`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        let mut state = self.state.write().await;
        let email = normalize_email(&data.email);

        if state.users.values().any(|u| u.email == email) {
            return Err(StoreError::DuplicateEmail(email));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email,
            name: data.name.trim().to_string(),
            password_hash: data.password_hash,
            role: UserRole::User,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = normalize_email(email);
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_summaries(&self, ids: &[Uuid]) -> StoreResult<Vec<UserSummary>> {
        let unique: HashSet<&Uuid> = ids.iter().collect();
        Ok(self.state.read().await.summaries(unique))
    }

    async fn list_teammates(&self, user_id: Uuid) -> StoreResult<Vec<UserSummary>> {
        let state = self.state.read().await;
        let teammates: HashSet<&Uuid> = state
            .teams
            .values()
            .filter(|team| team.is_member(user_id))
            .flat_map(|team| team.members.iter())
            .collect();
        Ok(state.summaries(teammates))
    }

    async fn create_team(&self, data: CreateTeam) -> StoreResult<Team> {
        let mut state = self.state.write().await;

        if !state.users.contains_key(&data.created_by) {
            return Err(StoreError::MissingReference(format!(
                "user {}",
                data.created_by
            )));
        }

        let now = Utc::now();
        let team = Team {
            id: Uuid::new_v4(),
            name: data.name,
            description: data.description,
            created_by: data.created_by,
            members: HashSet::from([data.created_by]),
            created_at: now,
            updated_at: now,
        };
        state.join(team.id, team.created_by);
        state.teams.insert(team.id, team.clone());

        Ok(team)
    }

    async fn find_team(&self, id: Uuid) -> StoreResult<Option<Team>> {
        Ok(self.state.read().await.teams.get(&id).cloned())
    }

    async fn list_teams_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Team>> {
        let state = self.state.read().await;
        let mut teams: Vec<Team> = state
            .teams
            .values()
            .filter(|team| team.is_member(user_id))
            .cloned()
            .collect();
        teams.sort_by(|a, b| {
            state
                .joined(a.id, user_id)
                .cmp(&state.joined(b.id, user_id))
                .then(a.id.cmp(&b.id))
        });
        Ok(teams)
    }

    async fn list_team_members(&self, team_id: Uuid) -> StoreResult<Vec<UserSummary>> {
        let state = self.state.read().await;
        let Some(team) = state.teams.get(&team_id) else {
            return Ok(Vec::new());
        };

        let mut members: Vec<(DateTime<Utc>, UserSummary)> = team
            .members
            .iter()
            .filter_map(|id| state.users.get(id))
            .map(|user| (state.joined(team_id, user.id), UserSummary::from(user)))
            .collect();
        members.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.id.cmp(&b.1.id)));

        Ok(members.into_iter().map(|(_, summary)| summary).collect())
    }

    async fn update_team(&self, id: Uuid, update: UpdateTeam) -> StoreResult<Option<Team>> {
        let mut state = self.state.write().await;
        let Some(team) = state.teams.get_mut(&id) else {
            return Ok(None);
        };
        update.apply(team);
        Ok(Some(team.clone()))
    }

    async fn add_team_member(&self, team_id: Uuid, user_id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;

        if !state.users.contains_key(&user_id) {
            return Err(StoreError::MissingReference(format!("user {}", user_id)));
        }
        let team = state
            .teams
            .get_mut(&team_id)
            .ok_or_else(|| StoreError::MissingReference(format!("team {}", team_id)))?;

        if !team.members.insert(user_id) {
            return Err(StoreError::AlreadyMember { team_id, user_id });
        }
        state.join(team_id, user_id);

        Ok(())
    }

    async fn remove_team_member(&self, team_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;

        let removed = match state.teams.get_mut(&team_id) {
            Some(team) => team.members.remove(&user_id),
            None => false,
        };
        if !removed {
            return Ok(false);
        }

        state.joined_at.remove(&(team_id, user_id));
        let now = Utc::now();
        for task in state
            .tasks
            .values_mut()
            .filter(|t| t.team_id == team_id && t.assigned_to == Some(user_id))
        {
            task.assigned_to = None;
            task.updated_at = now;
        }

        Ok(true)
    }

    async fn delete_team(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;

        if state.teams.remove(&id).is_none() {
            return Ok(false);
        }
        state.joined_at.retain(|(team_id, _), _| *team_id != id);
        state.tasks.retain(|_, task| task.team_id != id);

        Ok(true)
    }

    async fn create_task(&self, data: CreateTask) -> StoreResult<Task> {
        let mut state = self.state.write().await;

        let team = state
            .teams
            .get(&data.team_id)
            .ok_or_else(|| StoreError::MissingReference(format!("team {}", data.team_id)))?;
        if let Some(assignee) = data.assigned_to {
            if !team.is_member(assignee) {
                return Err(StoreError::MissingReference(format!(
                    "membership of {} in team {}",
                    assignee, data.team_id
                )));
            }
        }

        let now = state.next_task_time();
        let task = Task {
            id: Uuid::new_v4(),
            title: data.title,
            description: data.description,
            status: data.status,
            priority: data.priority,
            deadline: data.deadline,
            assigned_to: data.assigned_to,
            created_by: data.created_by,
            team_id: data.team_id,
            created_at: now,
            updated_at: now,
        };
        state.tasks.insert(task.id, task.clone());

        Ok(task)
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(self.state.read().await.tasks.get(&id).cloned())
    }

    async fn list_team_tasks(&self, team_id: Uuid) -> StoreResult<Vec<Task>> {
        let state = self.state.read().await;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|t| t.team_id == team_id)
            .cloned()
            .collect();
        sort_newest_first(&mut tasks);
        Ok(tasks)
    }

    async fn list_assigned_tasks(&self, user_id: Uuid) -> StoreResult<Vec<Task>> {
        let state = self.state.read().await;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|t| t.assigned_to == Some(user_id))
            .cloned()
            .collect();
        sort_by_deadline(&mut tasks);
        Ok(tasks)
    }

    async fn list_member_tasks(&self, user_id: Uuid) -> StoreResult<Vec<Task>> {
        let state = self.state.read().await;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|t| {
                state
                    .teams
                    .get(&t.team_id)
                    .is_some_and(|team| team.is_member(user_id))
            })
            .cloned()
            .collect();
        sort_newest_first(&mut tasks);
        Ok(tasks)
    }

    async fn update_task(&self, id: Uuid, update: UpdateTask) -> StoreResult<Option<Task>> {
        let mut state = self.state.write().await;

        let Some(existing) = state.tasks.get(&id) else {
            return Ok(None);
        };
        if let Some(Some(assignee)) = update.assigned_to {
            let is_member = state
                .teams
                .get(&existing.team_id)
                .is_some_and(|team| team.is_member(assignee));
            if !is_member {
                return Err(StoreError::MissingReference(format!(
                    "membership of {} in team {}",
                    assignee, existing.team_id
                )));
            }
        }

        let Some(task) = state.tasks.get_mut(&id) else {
            return Ok(None);
        };
        update.apply(task);
        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.state.write().await.tasks.remove(&id).is_some())
    }
}
