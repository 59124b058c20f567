//! Auth Gate (C3): authenticate-by-token, role-based route authorization, and
//! per-resource ACL checks (spec §4.5).

use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use pubsub_store::{MetadataStore, StoreError, StoreResult};
use pubsub_types::{roles as role_names, ResourceKind, RoutePolicy};

/// The three-stage authorization pipeline every protected route runs through:
/// authenticate (token -> roles), authorize (roles -> route), and, for routes that
/// need it, a per-resource ACL check.
pub struct AuthGate {
    store: Arc<dyn MetadataStore>,
    policy: RoutePolicy,
}

impl AuthGate {
    #[must_use]
    pub fn new(store: Arc<dyn MetadataStore>, policy: RoutePolicy) -> Self {
        Self { store, policy }
    }

    /// Maps a bearer token to the caller's roles within `project_uuid` and their
    /// username. Empty roles means the token is unknown (401).
    pub async fn authenticate(&self, project_uuid: Uuid, token: &str) -> (HashSet<String>, String) {
        self.store.get_user_roles(project_uuid, token).await
    }

    /// True iff the intersection of `roles` and the policy for `route_name` is
    /// non-empty.
    #[must_use]
    pub fn authorize(&self, route_name: &str, roles: &HashSet<String>) -> bool {
        self.policy.authorize(route_name, roles)
    }

    /// True iff `user` is listed in the ACL for `resource`/`name`.
    pub async fn per_resource(
        &self,
        project_uuid: Uuid,
        resource: ResourceKind,
        name: &str,
        user: &str,
    ) -> StoreResult<bool> {
        let acl = self.store.query_acl(project_uuid, resource, name).await?;
        Ok(acl.contains(user))
    }

    /// Validates that every name in `names` resolves to an existing user. Used before
    /// writing an ACL. Fails with `NotFound` listing the missing usernames.
    pub async fn are_valid_users(&self, project_uuid: Uuid, names: &[String]) -> StoreResult<()> {
        let (ok, missing) = self.store.has_users(project_uuid, names).await?;
        if ok {
            Ok(())
        } else {
            Err(StoreError::NotFound(missing.join(", ")))
        }
    }

    /// True iff `roles` is exactly the singleton publisher role (no admin, no other
    /// role) — the set of callers for whom the topic ACL gates publishing.
    #[must_use]
    pub fn is_publisher_only(roles: &HashSet<String>) -> bool {
        roles.len() == 1 && roles.contains(role_names::PUBLISHER)
    }

    /// True iff `roles` is exactly the singleton consumer role — the set of callers
    /// for whom the subscription ACL gates pulling.
    #[must_use]
    pub fn is_consumer_only(roles: &HashSet<String>) -> bool {
        roles.len() == 1 && roles.contains(role_names::CONSUMER)
    }
}
