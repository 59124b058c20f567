//! Topic Service (C4): CRUD + ACL for topics, and the publish dispatch path
//! (spec §4.4).

use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use pubsub_broker::BrokerClient;
use pubsub_store::MetadataStore;
use pubsub_types::{ResourceKind, Topic};

use crate::auth::AuthGate;
use crate::types::AppError;

pub struct TopicService {
    store: Arc<dyn MetadataStore>,
    broker: Arc<dyn BrokerClient>,
    auth_gate: Arc<AuthGate>,
    enable_resource_acl: bool,
}

impl TopicService {
    #[must_use]
    pub fn new(
        store: Arc<dyn MetadataStore>,
        broker: Arc<dyn BrokerClient>,
        auth_gate: Arc<AuthGate>,
        enable_resource_acl: bool,
    ) -> Self {
        Self { store, broker, auth_gate, enable_resource_acl }
    }

    pub async fn create(&self, project_uuid: Uuid, name: &str) -> Result<Topic, AppError> {
        let topic = Topic { project_uuid, name: name.to_string() };
        self.store.insert_topic(topic.clone()).await?;
        Ok(topic)
    }

    pub async fn remove(&self, project_uuid: Uuid, name: &str) -> Result<(), AppError> {
        self.store.remove_topic(project_uuid, name).await?;
        Ok(())
    }

    pub async fn get(&self, project_uuid: Uuid, name: &str) -> Result<Topic, AppError> {
        let topics = self.store.query_topics(project_uuid, Some(name)).await?;
        topics.into_iter().next().ok_or_else(|| AppError::not_found(name.to_string()))
    }

    pub async fn list(&self, project_uuid: Uuid) -> Result<Vec<Topic>, AppError> {
        Ok(self.store.query_topics(project_uuid, None).await?)
    }

    pub async fn get_acl(&self, project_uuid: Uuid, name: &str) -> Result<HashSet<String>, AppError> {
        Ok(self.store.query_acl(project_uuid, ResourceKind::Topic, name).await?)
    }

    pub async fn mod_acl(&self, project_uuid: Uuid, name: &str, users: HashSet<String>) -> Result<(), AppError> {
        self.auth_gate.are_valid_users(project_uuid, &users.iter().cloned().collect::<Vec<_>>()).await?;
        self.store.mod_acl(project_uuid, ResourceKind::Topic, name, users).await?;
        Ok(())
    }

    /// Publishes `messages` (raw bytes, already base64-decoded by the caller) to
    /// `name` in order. Topic must exist; when per-resource ACL enforcement is on and
    /// the caller holds only the publisher role, the caller's username must be in the
    /// topic's ACL. Aborts on the first failed publish; no rollback, so messages
    /// published before the failure keep their broker-assigned ids.
    pub async fn publish(
        &self,
        project_uuid: Uuid,
        project_name: &str,
        name: &str,
        caller_roles: &HashSet<String>,
        caller_username: &str,
        messages: &[Vec<u8>],
    ) -> Result<Vec<String>, AppError> {
        self.get(project_uuid, name).await?;

        if self.enable_resource_acl && AuthGate::is_publisher_only(caller_roles) {
            let allowed = self.auth_gate.per_resource(project_uuid, ResourceKind::Topic, name, caller_username).await?;
            if !allowed {
                return Err(AppError::forbidden());
            }
        }

        let full_topic = Topic::resource_name(project_name, name);
        let mut message_ids = Vec::with_capacity(messages.len());
        for message in messages {
            let ack = self.broker.publish(&full_topic, message).await?;
            if ack.topic != full_topic {
                return Err(AppError::internal("broker echoed a different topic than requested"));
            }
            message_ids.push(ack.message_id);
        }
        Ok(message_ids)
    }
}
