/// Team and task permission checks
///
/// Every guarded operation names an [`Action`]. Each action maps to exactly
/// one [`Authority`], and [`authorize`] evaluates that authority against a
/// loaded team (and task, for task-scoped actions).
///
/// | Action          | Authority                       |
/// |-----------------|---------------------------------|
/// | `ViewTeam`      | team member                     |
/// | `UpdateTeam`    | team creator                    |
/// | `ManageMembers` | team creator                    |
/// | `DeleteTeam`    | team creator                    |
/// | `CreateTask`    | team member                     |
/// | `ViewTask`      | team member                     |
/// | `UpdateTask`    | team member                     |
/// | `DeleteTask`    | task creator or team creator    |
///
/// Whether an assignee belongs to the team is input validation, not an
/// authority, and is checked by the handlers.
///
/// # Example
///
/// ```
/// use taskly_shared::auth::authorization::{authorize, Action};
/// use taskly_shared::models::team::Team;
/// use std::collections::HashSet;
/// use uuid::Uuid;
///
/// let creator = Uuid::new_v4();
/// let team = Team {
///     id: Uuid::new_v4(),
///     name: "Eng".to_string(),
///     description: None,
///     created_by: creator,
///     members: HashSet::from([creator]),
///     created_at: chrono::Utc::now(),
///     updated_at: chrono::Utc::now(),
/// };
///
/// assert!(authorize(creator, Action::DeleteTeam, &team, None).is_ok());
/// assert!(authorize(Uuid::new_v4(), Action::ViewTeam, &team, None).is_err());
/// ```

use std::fmt;
use uuid::Uuid;

use crate::models::{task::Task, team::Team};

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Caller is not a member of the team
    #[error("Not authorized to {action}")]
    NotMember { team_id: Uuid, action: Action },

    /// Only the team creator may do this
    #[error("Not authorized to {0}")]
    NotTeamCreator(Action),

    /// Only the task creator or the team creator may do this
    #[error("Not authorized to delete this task")]
    NotTaskOwner,

    /// A task-scoped action was checked without its task
    #[error("Task required to authorize {0:?}")]
    MissingTask(Action),
}

/// Guarded operations on teams and tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ViewTeam,
    UpdateTeam,
    ManageMembers,
    DeleteTeam,
    CreateTask,
    ViewTask,
    UpdateTask,
    DeleteTask,
}

/// Who may perform an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    TeamMember,
    TeamCreator,
    TaskCreatorOrTeamCreator,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::ViewTeam,
        Action::UpdateTeam,
        Action::ManageMembers,
        Action::DeleteTeam,
        Action::CreateTask,
        Action::ViewTask,
        Action::UpdateTask,
        Action::DeleteTask,
    ];

    pub fn authority(self) -> Authority {
        match self {
            Action::ViewTeam | Action::CreateTask | Action::ViewTask | Action::UpdateTask => {
                Authority::TeamMember
            }
            Action::UpdateTeam | Action::ManageMembers | Action::DeleteTeam => {
                Authority::TeamCreator
            }
            Action::DeleteTask => Authority::TaskCreatorOrTeamCreator,
        }
    }

    /// Verb phrase used in denial messages
    pub fn describe(self) -> &'static str {
        match self {
            Action::ViewTeam => "access this team",
            Action::UpdateTeam => "update this team",
            Action::ManageMembers => "manage members of this team",
            Action::DeleteTeam => "delete this team",
            Action::CreateTask => "create tasks for this team",
            Action::ViewTask => "view this task",
            Action::UpdateTask => "update this task",
            Action::DeleteTask => "delete this task",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Checks whether `actor` may perform `action`
///
/// `task` must be the task being acted on for task-scoped actions and must
/// belong to `team`.
pub fn authorize(
    actor: Uuid,
    action: Action,
    team: &Team,
    task: Option<&Task>,
) -> Result<(), AuthzError> {
    match action.authority() {
        Authority::TeamMember => {
            if team.is_member(actor) {
                Ok(())
            } else {
                Err(AuthzError::NotMember {
                    team_id: team.id,
                    action,
                })
            }
        }
        Authority::TeamCreator => {
            if team.is_creator(actor) {
                Ok(())
            } else {
                Err(AuthzError::NotTeamCreator(action))
            }
        }
        Authority::TaskCreatorOrTeamCreator => {
            let task = task.ok_or(AuthzError::MissingTask(action))?;
            if task.created_by == actor || team.is_creator(actor) {
                Ok(())
            } else {
                Err(AuthzError::NotTaskOwner)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{TaskPriority, TaskStatus};
    use chrono::Utc;

    struct Fixture {
        creator: Uuid,
        member: Uuid,
        outsider: Uuid,
        team: Team,
    }

    fn fixture() -> Fixture {
        let creator = Uuid::new_v4();
        let member = Uuid::new_v4();
        let now = Utc::now();
        Fixture {
            creator,
            member,
            outsider: Uuid::new_v4(),
            team: Team {
                id: Uuid::new_v4(),
                name: "Eng".to_string(),
                description: None,
                created_by: creator,
                members: [creator, member].into_iter().collect(),
                created_at: now,
                updated_at: now,
            },
        }
    }

    fn task_by(created_by: Uuid, team: &Team) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            title: "Review".to_string(),
            description: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            deadline: None,
            assigned_to: None,
            created_by,
            team_id: team.id,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_capability_table() {
        use Authority::*;
        let expected = [
            (Action::ViewTeam, TeamMember),
            (Action::UpdateTeam, TeamCreator),
            (Action::ManageMembers, TeamCreator),
            (Action::DeleteTeam, TeamCreator),
            (Action::CreateTask, TeamMember),
            (Action::ViewTask, TeamMember),
            (Action::UpdateTask, TeamMember),
            (Action::DeleteTask, TaskCreatorOrTeamCreator),
        ];
        for (action, authority) in expected {
            assert_eq!(action.authority(), authority, "{:?}", action);
        }
        assert_eq!(Action::ALL.len(), expected.len());
    }

    #[test]
    fn test_outsider_denied_everything() {
        let f = fixture();
        let task = task_by(f.creator, &f.team);

        for action in Action::ALL {
            assert!(
                authorize(f.outsider, action, &f.team, Some(&task)).is_err(),
                "{:?} should be denied",
                action
            );
        }
    }

    #[test]
    fn test_member_vs_creator() {
        let f = fixture();

        assert!(authorize(f.member, Action::ViewTeam, &f.team, None).is_ok());
        assert!(authorize(f.member, Action::CreateTask, &f.team, None).is_ok());
        assert_eq!(
            authorize(f.member, Action::UpdateTeam, &f.team, None),
            Err(AuthzError::NotTeamCreator(Action::UpdateTeam))
        );
        assert_eq!(
            authorize(f.member, Action::UpdateTeam, &f.team, None)
                .unwrap_err()
                .to_string(),
            "Not authorized to update this team"
        );
        assert!(authorize(f.member, Action::ManageMembers, &f.team, None).is_err());
        assert!(authorize(f.member, Action::DeleteTeam, &f.team, None).is_err());

        assert!(authorize(f.creator, Action::DeleteTeam, &f.team, None).is_ok());
    }

    #[test]
    fn test_delete_task_asymmetry() {
        let f = fixture();
        let by_member = task_by(f.member, &f.team);
        let by_creator = task_by(f.creator, &f.team);

        // Task creator and team creator may delete
        assert!(authorize(f.member, Action::DeleteTask, &f.team, Some(&by_member)).is_ok());
        assert!(authorize(f.creator, Action::DeleteTask, &f.team, Some(&by_member)).is_ok());

        // A plain member may update but not delete someone else's task
        assert!(authorize(f.member, Action::UpdateTask, &f.team, Some(&by_creator)).is_ok());
        assert_eq!(
            authorize(f.member, Action::DeleteTask, &f.team, Some(&by_creator)),
            Err(AuthzError::NotTaskOwner)
        );
    }

    #[test]
    fn test_delete_task_requires_task() {
        let f = fixture();
        assert_eq!(
            authorize(f.creator, Action::DeleteTask, &f.team, None),
            Err(AuthzError::MissingTask(Action::DeleteTask))
        );
    }
}
