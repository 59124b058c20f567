//! Static mapping from route name to the set of roles allowed to invoke it.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::roles;

/// One row of the role-policy table: a route name and the roles allowed to call it.
/// A role is authorized for a route iff one of the caller's roles for the target
/// project is listed here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RolePolicyEntry {
    /// The route's canonical name (see `RoutePolicy::default_table` for the full list).
    pub route_name: String,
    /// Roles allowed to invoke this route.
    pub allowed_roles: HashSet<String>,
}

/// Canonical route names used across the role-policy table and the `Authorize` check.
pub mod route_names {
    pub const TOPICS_CREATE: &str = "topics.create";
    pub const TOPICS_GET: &str = "topics.get";
    pub const TOPICS_LIST: &str = "topics.list";
    pub const TOPICS_DELETE: &str = "topics.delete";
    pub const TOPICS_PUBLISH: &str = "topics.publish";
    pub const TOPICS_GET_ACL: &str = "topics.getAcl";
    pub const TOPICS_MODIFY_ACL: &str = "topics.modifyAcl";
    pub const SUBS_CREATE: &str = "subscriptions.create";
    pub const SUBS_GET: &str = "subscriptions.get";
    pub const SUBS_LIST: &str = "subscriptions.list";
    pub const SUBS_DELETE: &str = "subscriptions.delete";
    pub const SUBS_PULL: &str = "subscriptions.pull";
    pub const SUBS_ACK: &str = "subscriptions.acknowledge";
    pub const SUBS_MODIFY_PUSH_CONFIG: &str = "subscriptions.modifyPushConfig";
    pub const SUBS_GET_ACL: &str = "subscriptions.getAcl";
    pub const SUBS_MODIFY_ACL: &str = "subscriptions.modifyAcl";
}

/// The route-policy table: route name -> allowed roles.
#[derive(Debug, Clone, Default)]
pub struct RoutePolicy {
    entries: HashMap<String, HashSet<String>>,
}

impl RoutePolicy {
    /// Builds the table from a list of entries, last write for a given route name wins.
    #[must_use]
    pub fn new(entries: Vec<RolePolicyEntry>) -> Self {
        let mut table = HashMap::new();
        for entry in entries {
            table.insert(entry.route_name, entry.allowed_roles);
        }
        Self { entries: table }
    }

    /// True iff the intersection of `roles` and the policy for `route_name` is non-empty.
    #[must_use]
    pub fn authorize(&self, route_name: &str, roles: &HashSet<String>) -> bool {
        self.entries
            .get(route_name)
            .is_some_and(|allowed| allowed.intersection(roles).next().is_some())
    }

    /// The default table: admins can do everything, publishers manage topics and
    /// publish, consumers manage subscriptions and pull/ack.
    #[must_use]
    pub fn default_table() -> Self {
        use route_names::*;

        let admin_and = |extra: &[&str]| -> HashSet<String> {
            let mut set: HashSet<String> = extra.iter().map(|s| (*s).to_string()).collect();
            set.insert(roles::ADMIN.to_string());
            set
        };

        let entries = vec![
            RolePolicyEntry { route_name: TOPICS_CREATE.into(), allowed_roles: admin_and(&[roles::PUBLISHER]) },
            RolePolicyEntry { route_name: TOPICS_GET.into(), allowed_roles: admin_and(&[roles::PUBLISHER, roles::CONSUMER]) },
            RolePolicyEntry { route_name: TOPICS_LIST.into(), allowed_roles: admin_and(&[roles::PUBLISHER, roles::CONSUMER]) },
            RolePolicyEntry { route_name: TOPICS_DELETE.into(), allowed_roles: admin_and(&[roles::PUBLISHER]) },
            RolePolicyEntry { route_name: TOPICS_PUBLISH.into(), allowed_roles: admin_and(&[roles::PUBLISHER]) },
            RolePolicyEntry { route_name: TOPICS_GET_ACL.into(), allowed_roles: admin_and(&[roles::PUBLISHER]) },
            RolePolicyEntry { route_name: TOPICS_MODIFY_ACL.into(), allowed_roles: admin_and(&[]) },
            RolePolicyEntry { route_name: SUBS_CREATE.into(), allowed_roles: admin_and(&[roles::CONSUMER]) },
            RolePolicyEntry { route_name: SUBS_GET.into(), allowed_roles: admin_and(&[roles::PUBLISHER, roles::CONSUMER]) },
            RolePolicyEntry { route_name: SUBS_LIST.into(), allowed_roles: admin_and(&[roles::PUBLISHER, roles::CONSUMER]) },
            RolePolicyEntry { route_name: SUBS_DELETE.into(), allowed_roles: admin_and(&[roles::CONSUMER]) },
            RolePolicyEntry { route_name: SUBS_PULL.into(), allowed_roles: admin_and(&[roles::CONSUMER]) },
            RolePolicyEntry { route_name: SUBS_ACK.into(), allowed_roles: admin_and(&[roles::CONSUMER]) },
            RolePolicyEntry { route_name: SUBS_MODIFY_PUSH_CONFIG.into(), allowed_roles: admin_and(&[roles::CONSUMER]) },
            RolePolicyEntry { route_name: SUBS_GET_ACL.into(), allowed_roles: admin_and(&[roles::CONSUMER]) },
            RolePolicyEntry { route_name: SUBS_MODIFY_ACL.into(), allowed_roles: admin_and(&[]) },
        ];

        Self::new(entries)
    }
}
