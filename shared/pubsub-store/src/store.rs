//! The metadata store contract (C1): durable catalog of projects, users, roles,
//! topics, subscriptions and ACLs, plus per-subscription offset / pending-ack state.
//!
//! Exposed as a single object-safe trait so the gateway can hold it as
//! `Arc<dyn MetadataStore>` and tests can substitute [`crate::InMemoryMetadataStore`]
//! for a real backing store without the rest of the service noticing (spec §9,
//! "Store polymorphism").

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use pubsub_types::{Project, ResourceKind, Subscription, Topic, User};

use crate::StoreResult;

/// The metadata store capability set.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Looks up projects. An empty query (`uuid` and `name` both `None`) returns all
    /// projects. When either is specified and no match exists, fails with `NotFound`.
    async fn query_projects(&self, uuid: Option<Uuid>, name: Option<&str>) -> StoreResult<Vec<Project>>;

    /// Inserts a new project. Fails with `Exists` if `name` is already taken.
    async fn insert_project(&self, project: Project) -> StoreResult<()>;

    /// Field-wise update: an empty `name`/`description` leaves that field unchanged.
    async fn update_project(&self, uuid: Uuid, name: &str, description: &str) -> StoreResult<()>;

    /// Removes a project. Cascades to remove all of its topics and subscriptions
    /// (spec §3: "Deleting a project implies cascading removal of all its topics and
    /// subscriptions").
    async fn remove_project(&self, uuid: Uuid) -> StoreResult<()>;

    /// Whether a project named `name` already exists.
    async fn has_project(&self, name: &str) -> bool;

    /// Looks up users. Priority when multiple selectors are given: `uuid` > `name` >
    /// `project_uuid`-scoped > global (spec §4.1).
    async fn query_users(
        &self,
        project_uuid: Option<Uuid>,
        uuid: Option<Uuid>,
        name: Option<&str>,
    ) -> StoreResult<Vec<User>>;

    /// Inserts a new user. Fails with `Exists` if `name` or `token` is already taken
    /// (a token collision is an invariant violation per spec §3).
    async fn insert_user(&self, user: User) -> StoreResult<()>;

    /// Field-wise update: an empty `name`/`email`/`token` leaves that field unchanged.
    async fn update_user(&self, uuid: Uuid, name: &str, email: &str, token: &str) -> StoreResult<()>;

    /// Checks which of `names` exist as users (existence is checked globally by
    /// username; `project_uuid` is accepted for parity with spec §4.1 and reserved for
    /// a future project-scoped membership check, see DESIGN.md). Returns `(true, [])`
    /// if all are present, otherwise `(false, missing_names)`.
    async fn has_users(&self, project_uuid: Uuid, names: &[String]) -> StoreResult<(bool, Vec<String>)>;

    /// Maps a bearer token to the caller's roles within `project_uuid` and their
    /// username. Non-failing: returns `(empty roles, empty name)` if the token is
    /// unknown (the caller maps that to 401).
    async fn get_user_roles(&self, project_uuid: Uuid, token: &str) -> (HashSet<String>, String);

    /// Inserts a new topic. Fails with `Exists` if `(project_uuid, name)` is taken.
    async fn insert_topic(&self, topic: Topic) -> StoreResult<()>;

    /// Removes a topic. Does not cascade to subscriptions (spec §3, §9).
    async fn remove_topic(&self, project_uuid: Uuid, name: &str) -> StoreResult<()>;

    /// Looks up topics in `project_uuid`; `name` narrows to one topic.
    async fn query_topics(&self, project_uuid: Uuid, name: Option<&str>) -> StoreResult<Vec<Topic>>;

    /// Removes every topic belonging to `project_uuid` (used by project deletion).
    async fn remove_project_topics(&self, project_uuid: Uuid) -> StoreResult<()>;

    /// Inserts a new subscription. Fails with `Exists` if `(project_uuid, name)` is
    /// taken.
    async fn insert_sub(&self, sub: Subscription) -> StoreResult<()>;

    /// Removes a subscription.
    async fn remove_sub(&self, project_uuid: Uuid, name: &str) -> StoreResult<()>;

    /// Looks up subscriptions in `project_uuid`; `name` narrows to one subscription.
    async fn query_subs(&self, project_uuid: Uuid, name: Option<&str>) -> StoreResult<Vec<Subscription>>;

    /// Looks up exactly one subscription. Fails with `NotFound` if it doesn't exist.
    async fn query_one_sub(&self, project_uuid: Uuid, name: &str) -> StoreResult<Subscription>;

    /// Removes every subscription belonging to `project_uuid` (used by project
    /// deletion).
    async fn remove_project_subs(&self, project_uuid: Uuid) -> StoreResult<()>;

    /// Records that a pull of up to `new_offset` occurred at `ts`: sets `next_offset`
    /// and `pending_ack`. Non-failing under races — concurrent pulls on the same
    /// subscription race for this write and the last writer wins (spec §5); the ack
    /// state machine reconciles using the committed `offset`.
    async fn update_sub_pull(&self, project_uuid: Uuid, name: &str, new_offset: i64, ts: DateTime<Utc>) -> StoreResult<()>;

    /// Replaces a subscription's push configuration (endpoint, retry policy, retry
    /// period). Not part of the ack state machine; used by `ModSubPush` (spec §4.3).
    async fn update_sub_push_config(
        &self,
        project_uuid: Uuid,
        name: &str,
        push_endpoint: &str,
        retry_policy: pubsub_types::RetryPolicy,
        retry_period_ms: i64,
    ) -> StoreResult<()>;

    /// The ack state machine (spec §4.3). `offset` is the already-incremented
    /// "next offset to read" value (ack-ID offset `+1`); `now` is used to check the
    /// ack deadline. See [`crate::in_memory::InMemoryMetadataStore`] for the exact
    /// transition table.
    async fn update_sub_offset_ack(&self, project_uuid: Uuid, name: &str, offset: i64, now: DateTime<Utc>) -> StoreResult<()>;

    /// The set of usernames permitted to perform `resource`'s dominant action on
    /// `name` (publish for topics, consume for subscriptions).
    async fn query_acl(&self, project_uuid: Uuid, resource: ResourceKind, name: &str) -> StoreResult<HashSet<String>>;

    /// Replaces the ACL for `resource`/`name` with exactly `users`.
    async fn mod_acl(&self, project_uuid: Uuid, resource: ResourceKind, name: &str, users: HashSet<String>) -> StoreResult<()>;

    /// Every subscription across every project with a non-empty push endpoint. Used
    /// at boot to rehydrate the push manager (spec §4.6).
    async fn query_push_subs(&self) -> StoreResult<Vec<Subscription>>;
}
