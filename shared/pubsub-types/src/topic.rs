//! Topic: a named append-only stream inside a project.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A topic. `(project_uuid, name)` is unique. The offset sequence is owned by the
/// broker; the topic record itself carries no payload metadata.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    /// Owning project.
    pub project_uuid: Uuid,
    /// Unique (within the project) topic name.
    pub name: String,
}

impl Topic {
    /// The `projects/P/topics/T`-style resource name used on the wire.
    #[must_use]
    pub fn resource_name(project_name: &str, topic_name: &str) -> String {
        format!("projects/{project_name}/topics/{topic_name}")
    }
}
