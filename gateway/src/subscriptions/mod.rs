//! Subscription Service (C5): CRUD + ACL for subscriptions, pull, ack, and
//! push-config mutation, including the ack state machine glue (spec §4.3).

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use chrono::Utc;
use regex::Regex;
use uuid::Uuid;

use pubsub_broker::BrokerClient;
use pubsub_store::MetadataStore;
use pubsub_types::{
    ResourceKind, RetryPolicy, Subscription, DEFAULT_ACK_DEADLINE_SEC, DEFAULT_RETRY_PERIOD_MS,
};

use crate::auth::AuthGate;
use crate::push_manager::PushManager;
use crate::types::AppError;

fn ack_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^projects/([A-Za-z0-9_-]+)/subscriptions/([A-Za-z0-9_-]+):(-?\d+)$").expect("valid regex"))
}

/// One delivered-but-not-yet-acked message, as handed back to the HTTP layer.
pub struct PulledMessage {
    pub ack_id: String,
    pub payload: Vec<u8>,
}

pub struct SubscriptionService {
    store: Arc<dyn MetadataStore>,
    broker: Arc<dyn BrokerClient>,
    auth_gate: Arc<AuthGate>,
    push_manager: Arc<PushManager>,
    enable_resource_acl: bool,
}

impl SubscriptionService {
    #[must_use]
    pub fn new(
        store: Arc<dyn MetadataStore>,
        broker: Arc<dyn BrokerClient>,
        auth_gate: Arc<AuthGate>,
        push_manager: Arc<PushManager>,
        enable_resource_acl: bool,
    ) -> Self {
        Self { store, broker, auth_gate, push_manager, enable_resource_acl }
    }

    /// Creates a subscription. Requires `topic_name` to exist in the project.
    /// Defaults `ackDeadlineSec=10`, `retryPolicy=linear`, `retryPeriodMs=3000` when
    /// absent or `<= 0`. Starts consumption at the topic's current end-offset. When
    /// `push_endpoint` is non-empty, launches a push worker on success.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        project_uuid: Uuid,
        project_name: &str,
        name: &str,
        topic_name: &str,
        push_endpoint: String,
        ack_deadline_sec: Option<i64>,
        retry_policy: Option<RetryPolicy>,
        retry_period_ms: Option<i64>,
    ) -> Result<Subscription, AppError> {
        let topics = self.store.query_topics(project_uuid, Some(topic_name)).await?;
        if topics.is_empty() {
            return Err(AppError::not_found(topic_name.to_string()));
        }

        let full_topic = pubsub_types::Topic::resource_name(project_name, topic_name);
        let start_offset = self.broker.get_offset(&full_topic).await?;

        let sub = Subscription {
            project_uuid,
            name: name.to_string(),
            topic_name: topic_name.to_string(),
            offset: start_offset,
            next_offset: 0,
            pending_ack: None,
            push_endpoint,
            ack_deadline_sec: ack_deadline_sec.filter(|s| *s > 0).unwrap_or(DEFAULT_ACK_DEADLINE_SEC),
            retry_policy: retry_policy.unwrap_or_default(),
            retry_period_ms: retry_period_ms.filter(|p| *p > 0).unwrap_or(DEFAULT_RETRY_PERIOD_MS),
        };

        self.store.insert_sub(sub.clone()).await?;

        if sub.is_push_enabled() {
            self.push_manager.add(project_uuid, name).await;
            self.push_manager.launch(project_uuid, name).await;
        }

        Ok(sub)
    }

    /// Removes a subscription. Always stops its push worker (idempotent for
    /// pull-only subscriptions).
    pub async fn remove(&self, project_uuid: Uuid, name: &str) -> Result<(), AppError> {
        self.store.remove_sub(project_uuid, name).await?;
        self.push_manager.stop(project_uuid, name).await;
        Ok(())
    }

    pub async fn get(&self, project_uuid: Uuid, name: &str) -> Result<Subscription, AppError> {
        Ok(self.store.query_one_sub(project_uuid, name).await?)
    }

    pub async fn list(&self, project_uuid: Uuid) -> Result<Vec<Subscription>, AppError> {
        Ok(self.store.query_subs(project_uuid, None).await?)
    }

    pub async fn get_acl(&self, project_uuid: Uuid, name: &str) -> Result<HashSet<String>, AppError> {
        Ok(self.store.query_acl(project_uuid, ResourceKind::Subscription, name).await?)
    }

    pub async fn mod_acl(&self, project_uuid: Uuid, name: &str, users: HashSet<String>) -> Result<(), AppError> {
        self.auth_gate.are_valid_users(project_uuid, &users.iter().cloned().collect::<Vec<_>>()).await?;
        self.store.mod_acl(project_uuid, ResourceKind::Subscription, name, users).await?;
        Ok(())
    }

    /// Pulls up to `max_messages` from `name`. When per-resource ACL enforcement is
    /// on and the caller holds only the consumer role, the caller's username must be
    /// in the subscription's ACL. Advances `nextOffset` via `UpdateSubPull`
    /// regardless of whether the consumer eventually acks (spec §4.3).
    #[allow(clippy::too_many_arguments)]
    pub async fn pull(
        &self,
        project_uuid: Uuid,
        project_name: &str,
        name: &str,
        caller_roles: &HashSet<String>,
        caller_username: &str,
        max_messages: i64,
        return_immediately: bool,
    ) -> Result<Vec<PulledMessage>, AppError> {
        if self.enable_resource_acl && AuthGate::is_consumer_only(caller_roles) {
            let allowed = self
                .auth_gate
                .per_resource(project_uuid, ResourceKind::Subscription, name, caller_username)
                .await?;
            if !allowed {
                return Err(AppError::forbidden());
            }
        }

        let sub = self.store.query_one_sub(project_uuid, name).await?;
        let full_topic = pubsub_types::Topic::resource_name(project_name, &sub.topic_name);

        let batch = self.broker.consume(&full_topic, sub.offset, return_immediately).await?;
        let batch: Vec<_> = batch.into_iter().take(usize::try_from(max_messages.max(0)).unwrap_or(0)).collect();

        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let new_next_offset = sub.offset + i64::try_from(batch.len()).expect("batch length fits in i64");
        self.store.update_sub_pull(project_uuid, name, new_next_offset, Utc::now()).await?;

        let resource_name = Subscription::resource_name(project_name, name);
        Ok(batch
            .into_iter()
            .map(|m| PulledMessage { ack_id: format!("{resource_name}:{}", m.offset), payload: m.payload })
            .collect())
    }

    /// Acknowledges every ack id in `ack_ids`, in order, against `name`'s ack state
    /// machine. Fails fast on the first rejected id (spec §4.3/§8).
    pub async fn ack(&self, project_uuid: Uuid, project_name: &str, name: &str, ack_ids: &[String]) -> Result<(), AppError> {
        for ack_id in ack_ids {
            let offset = parse_ack_id(ack_id, project_name, name)?;
            self.store.update_sub_offset_ack(project_uuid, name, offset + 1, Utc::now()).await?;
        }
        Ok(())
    }

    /// Applies the push-config transition table from spec §4.3.
    pub async fn modify_push_config(
        &self,
        project_uuid: Uuid,
        name: &str,
        new_endpoint: String,
        retry_policy: Option<RetryPolicy>,
        retry_period_ms: Option<i64>,
    ) -> Result<Subscription, AppError> {
        let mut sub = self.store.query_one_sub(project_uuid, name).await?;

        let retry_policy = retry_policy.unwrap_or(sub.retry_policy);
        let retry_period_ms = retry_period_ms.filter(|p| *p > 0).unwrap_or(sub.retry_period_ms);

        let was_push_enabled = sub.is_push_enabled();
        let config_changed = sub.push_endpoint != new_endpoint
            || sub.retry_policy != retry_policy
            || sub.retry_period_ms != retry_period_ms;

        sub.push_endpoint = new_endpoint;
        sub.retry_policy = retry_policy;
        sub.retry_period_ms = retry_period_ms;
        self.store
            .update_sub_push_config(project_uuid, name, &sub.push_endpoint, sub.retry_policy, sub.retry_period_ms)
            .await?;

        match (was_push_enabled, sub.is_push_enabled()) {
            (false, false) => {}
            (false, true) => {
                self.push_manager.add(project_uuid, name).await;
                self.push_manager.launch(project_uuid, name).await;
            }
            (true, false) => self.push_manager.stop(project_uuid, name).await,
            (true, true) if config_changed => self.push_manager.restart(project_uuid, name).await,
            (true, true) => {}
        }

        Ok(sub)
    }
}

/// Parses `projects/<p>/subscriptions/<s>:<offset>`, checking that `<p>`/`<s>` match
/// the subscription the ack was sent to (spec §9: "parsing must reject any deviation
/// with 400 `INVALID_ARGUMENT`").
fn parse_ack_id(ack_id: &str, project_name: &str, sub_name: &str) -> Result<i64, AppError> {
    let captures = ack_id_regex()
        .captures(ack_id)
        .ok_or_else(|| AppError::invalid_argument("malformed ack id"))?;

    if &captures[1] != project_name || &captures[2] != sub_name {
        return Err(AppError::invalid_argument("ack id does not match this subscription"));
    }

    captures[3].parse().map_err(|_| AppError::invalid_argument("malformed ack id offset"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_ack_id() {
        let offset = parse_ack_id("projects/P/subscriptions/S:41", "P", "S").unwrap();
        assert_eq!(offset, 41);
    }

    #[test]
    fn rejects_ack_id_for_a_different_subscription() {
        assert!(parse_ack_id("projects/P/subscriptions/other:1", "P", "S").is_err());
    }

    #[test]
    fn rejects_malformed_ack_id() {
        assert!(parse_ack_id("not-an-ack-id", "P", "S").is_err());
    }
}
