//! Role-scoped access rules.
//!
//! Every decision is a pure function of the actor's role, the actor's id and,
//! for recruiter-owned jobs, the owner recorded on the job. Reads of postings
//! are public and never pass through here.

use thiserror::Error;
use uuid::Uuid;

use crate::enums::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateJob,
    UpdateJob,
    DeleteJob,
    ListApplicants,
    ApplyToJob,
    ListOwnApplications,
    ViewDashboard,
    ManageUsers,
    ManageJobs,
    ManageApplications,
    ViewStats,
}

impl Action {
    /// Whether the action targets a single job that only its poster may touch.
    pub fn requires_ownership(self) -> bool {
        match self {
            Action::UpdateJob | Action::DeleteJob | Action::ListApplicants => true,
            Action::CreateJob
            | Action::ApplyToJob
            | Action::ListOwnApplications
            | Action::ViewDashboard
            | Action::ManageUsers
            | Action::ManageJobs
            | Action::ManageApplications
            | Action::ViewStats => false,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Action::CreateJob => "post jobs",
            Action::UpdateJob => "update this job",
            Action::DeleteJob => "delete this job",
            Action::ListApplicants => "view applicants of this job",
            Action::ApplyToJob => "apply to jobs",
            Action::ListOwnApplications => "list applications",
            Action::ViewDashboard => "view the dashboard",
            Action::ManageUsers => "manage users",
            Action::ManageJobs => "manage all jobs",
            Action::ManageApplications => "manage all applications",
            Action::ViewStats => "view platform statistics",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("{} accounts are not allowed to {}", .role, .action.describe())]
    RoleNotPermitted { role: Role, action: Action },
    #[error("not authorized to {}", .action.describe())]
    NotOwner { action: Action },
}

pub fn permits(role: Role, action: Action) -> bool {
    match role {
        Role::Seeker => matches!(
            action,
            Action::ApplyToJob | Action::ListOwnApplications | Action::ViewDashboard
        ),
        Role::Recruiter => matches!(
            action,
            Action::CreateJob
                | Action::UpdateJob
                | Action::DeleteJob
                | Action::ListApplicants
                | Action::ViewDashboard
        ),
        Role::Admin => matches!(
            action,
            Action::ManageUsers
                | Action::ManageJobs
                | Action::ManageApplications
                | Action::ViewStats
                | Action::ViewDashboard
        ),
    }
}

pub fn authorize(role: Role, action: Action) -> Result<(), AccessError> {
    if permits(role, action) {
        Ok(())
    } else {
        Err(AccessError::RoleNotPermitted { role, action })
    }
}

/// Role check followed by the ownership check for job-scoped actions.
pub fn authorize_owned(
    role: Role,
    actor_id: Uuid,
    action: Action,
    owner_id: Uuid,
) -> Result<(), AccessError> {
    authorize(role, action)?;
    if action.requires_ownership() && actor_id != owner_id {
        return Err(AccessError::NotOwner { action });
    }
    Ok(())
}
