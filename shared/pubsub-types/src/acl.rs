//! Per-resource ACLs: which usernames may perform a resource's dominant action.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The kind of resource an ACL applies to: a topic (publish) or a subscription (consume).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResourceKind {
    /// The ACL gates publishing to a topic.
    Topic,
    /// The ACL gates consuming from a subscription.
    Subscription,
}
