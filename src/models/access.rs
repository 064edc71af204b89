//! Access Control Models
//!
//! Roles, the actions they guard, and the per-organization principal that
//! handlers authorize against.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::utils::error::{AppError, AppResult};

/// Role stored in `organization_members.role`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrgRole {
    Admin,
    Member,
}

#[derive(Error, Debug)]
#[error("Unknown organization role: {0}")]
pub struct UnknownRole(pub String);

impl OrgRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgRole::Admin => "admin",
            OrgRole::Member => "member",
        }
    }
}

impl FromStr for OrgRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(OrgRole::Admin),
            "member" => Ok(OrgRole::Member),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl TryFrom<String> for OrgRole {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for OrgRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Effective role of a user within one organization, highest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    PlatformAdmin,
    OrganizationAdmin,
    TeamAdmin,
    Member,
}

/// Operations guarded by the permission matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ViewOrganization,
    UpdateOrganization,
    DeleteOrganization,
    ManageMembers,
    CreateTeam,
    DeleteTeam,
    ManageTeamAdmins,
    UpdateTeam(Uuid),
    ManageRoster(Uuid),
    WriteAthlete,
    DeleteAthlete,
    /// Locations, seasons, competitions and events
    ManageSchedule,
    RunImport,
}

/// A user's standing in one organization, loaded per request
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub platform_admin: bool,
    pub org_role: Option<OrgRole>,
    pub admin_team_ids: Vec<Uuid>,
}

impl Principal {
    /// Highest role held in the organization, if any
    pub fn role(&self) -> Option<Role> {
        if self.platform_admin {
            Some(Role::PlatformAdmin)
        } else if self.org_role == Some(OrgRole::Admin) {
            Some(Role::OrganizationAdmin)
        } else if !self.admin_team_ids.is_empty() {
            Some(Role::TeamAdmin)
        } else if self.org_role.is_some() {
            Some(Role::Member)
        } else {
            None
        }
    }

    pub fn can_view(&self) -> bool {
        self.role().is_some()
    }

    /// Platform admin or organization admin
    pub fn is_org_admin(&self) -> bool {
        matches!(
            self.role(),
            Some(Role::PlatformAdmin | Role::OrganizationAdmin)
        )
    }

    pub fn administers_team(&self, team_id: Uuid) -> bool {
        self.is_org_admin() || self.admin_team_ids.contains(&team_id)
    }

    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::ViewOrganization => self.can_view(),
            Action::DeleteOrganization => self.platform_admin,
            Action::UpdateOrganization
            | Action::ManageMembers
            | Action::CreateTeam
            | Action::DeleteTeam
            | Action::ManageTeamAdmins
            | Action::DeleteAthlete
            | Action::ManageSchedule
            | Action::RunImport => self.is_org_admin(),
            Action::UpdateTeam(team_id) | Action::ManageRoster(team_id) => {
                self.administers_team(team_id)
            }
            Action::WriteAthlete => matches!(
                self.role(),
                Some(Role::PlatformAdmin | Role::OrganizationAdmin | Role::TeamAdmin)
            ),
        }
    }

    /// Outsiders get `NotFound` so organization resources are not disclosed;
    /// members lacking the permission get `Forbidden`.
    pub fn authorize(&self, action: Action) -> AppResult<()> {
        if !self.can_view() {
            return Err(AppError::NotFound("Organization not found".to_string()));
        }

        if self.allows(action) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Insufficient permissions for {:?}",
                action
            )))
        }
    }
}
