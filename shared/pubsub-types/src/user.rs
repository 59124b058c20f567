//! User: a per-project identity with roles, authenticated by an opaque bearer token.

use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's roles within a single project.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRoles {
    /// The project the roles apply to.
    pub project_uuid: Uuid,
    /// Roles held within that project (e.g. "publisher", "consumer").
    pub roles: HashSet<String>,
}

/// A user. `token` is the bearer credential presented as `?key=` on every request;
/// a token collision across users is an invariant violation the store must reject.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier.
    pub uuid: Uuid,
    /// Unique display name.
    pub name: String,
    /// Opaque bearer credential, unique across all users.
    pub token: String,
    /// Contact email.
    pub email: String,
    /// Per-project role assignments.
    pub projects: Vec<ProjectRoles>,
    /// Roles that apply across every project (service accounts, operators).
    pub service_roles: HashSet<String>,
}

impl User {
    /// Roles this user holds within `project_uuid`, including any service-wide roles.
    #[must_use]
    pub fn roles_for_project(&self, project_uuid: Uuid) -> HashSet<String> {
        let mut roles = self.service_roles.clone();
        if let Some(entry) = self.projects.iter().find(|p| p.project_uuid == project_uuid) {
            roles.extend(entry.roles.iter().cloned());
        }
        roles
    }
}
