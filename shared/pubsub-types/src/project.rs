//! Project: the tenant boundary. Namespaces topics, subscriptions, users and ACLs.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tenant. Every other resource is scoped under a project's `uuid`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Unique identifier, stable for the lifetime of the project.
    pub uuid: Uuid,
    /// Unique display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Username of the creator.
    pub created_by: String,
    /// Creation timestamp.
    pub created_on: DateTime<Utc>,
    /// Last modification timestamp.
    pub modified_on: DateTime<Utc>,
}
