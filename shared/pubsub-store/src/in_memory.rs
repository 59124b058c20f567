//! An in-memory [`MetadataStore`] that serializes every access under a single
//! `tokio::sync::Mutex`, as spec §9 suggests is acceptable for a test/reference
//! implementation: "the in-memory test implementation may serialize all access
//! under a single mutex."

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use pubsub_types::{Project, ResourceKind, Subscription, Topic, User};

use crate::{MetadataStore, StoreError, StoreResult};

#[derive(Default)]
struct Inner {
    projects: HashMap<Uuid, Project>,
    users: HashMap<Uuid, User>,
    topics: HashMap<(Uuid, String), Topic>,
    subs: HashMap<(Uuid, String), Subscription>,
    topic_acl: HashMap<(Uuid, String), HashSet<String>>,
    sub_acl: HashMap<(Uuid, String), HashSet<String>>,
}

/// In-memory reference implementation of [`MetadataStore`].
#[derive(Default)]
pub struct InMemoryMetadataStore {
    inner: Mutex<Inner>,
}

impl InMemoryMetadataStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    #[tracing::instrument(skip(self))]
    async fn query_projects(&self, uuid: Option<Uuid>, name: Option<&str>) -> StoreResult<Vec<Project>> {
        let inner = self.inner.lock().await;

        if uuid.is_none() && name.is_none() {
            return Ok(inner.projects.values().cloned().collect());
        }

        let matches: Vec<Project> = inner
            .projects
            .values()
            .filter(|p| uuid.is_none_or(|u| p.uuid == u))
            .filter(|p| name.is_none_or(|n| p.name == n))
            .cloned()
            .collect();

        if matches.is_empty() {
            return Err(StoreError::NotFound("project".to_string()));
        }
        Ok(matches)
    }

    async fn insert_project(&self, project: Project) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.projects.values().any(|p| p.name == project.name) {
            return Err(StoreError::Exists(project.name));
        }
        inner.projects.insert(project.uuid, project);
        Ok(())
    }

    async fn update_project(&self, uuid: Uuid, name: &str, description: &str) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        let project = inner
            .projects
            .get_mut(&uuid)
            .ok_or_else(|| StoreError::NotFound(uuid.to_string()))?;
        if !name.is_empty() {
            project.name = name.to_string();
        }
        if !description.is_empty() {
            project.description = description.to_string();
        }
        project.modified_on = Utc::now();
        Ok(())
    }

    async fn remove_project(&self, uuid: Uuid) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner
            .projects
            .remove(&uuid)
            .ok_or_else(|| StoreError::NotFound(uuid.to_string()))?;
        inner.topics.retain(|(p, _), _| *p != uuid);
        inner.subs.retain(|(p, _), _| *p != uuid);
        inner.topic_acl.retain(|(p, _), _| *p != uuid);
        inner.sub_acl.retain(|(p, _), _| *p != uuid);
        Ok(())
    }

    async fn has_project(&self, name: &str) -> bool {
        let inner = self.inner.lock().await;
        inner.projects.values().any(|p| p.name == name)
    }

    async fn query_users(
        &self,
        project_uuid: Option<Uuid>,
        uuid: Option<Uuid>,
        name: Option<&str>,
    ) -> StoreResult<Vec<User>> {
        let inner = self.inner.lock().await;

        if let Some(uuid) = uuid {
            return inner
                .users
                .get(&uuid)
                .cloned()
                .map(|u| vec![u])
                .ok_or_else(|| StoreError::NotFound(uuid.to_string()));
        }

        if let Some(name) = name {
            return inner
                .users
                .values()
                .find(|u| u.name == name)
                .cloned()
                .map(|u| vec![u])
                .ok_or_else(|| StoreError::NotFound(name.to_string()));
        }

        if let Some(project_uuid) = project_uuid {
            return Ok(inner
                .users
                .values()
                .filter(|u| u.projects.iter().any(|p| p.project_uuid == project_uuid))
                .cloned()
                .collect());
        }

        Ok(inner.users.values().cloned().collect())
    }

    async fn insert_user(&self, user: User) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.users.values().any(|u| u.name == user.name) {
            return Err(StoreError::Exists(user.name));
        }
        if inner.users.values().any(|u| u.token == user.token) {
            return Err(StoreError::Exists("token".to_string()));
        }
        inner.users.insert(user.uuid, user);
        Ok(())
    }

    async fn update_user(&self, uuid: Uuid, name: &str, email: &str, token: &str) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        if !token.is_empty() && inner.users.values().any(|u| u.uuid != uuid && u.token == token) {
            return Err(StoreError::Exists("token".to_string()));
        }
        let user = inner
            .users
            .get_mut(&uuid)
            .ok_or_else(|| StoreError::NotFound(uuid.to_string()))?;
        if !name.is_empty() {
            user.name = name.to_string();
        }
        if !email.is_empty() {
            user.email = email.to_string();
        }
        if !token.is_empty() {
            user.token = token.to_string();
        }
        Ok(())
    }

    async fn has_users(&self, _project_uuid: Uuid, names: &[String]) -> StoreResult<(bool, Vec<String>)> {
        let inner = self.inner.lock().await;
        let missing: Vec<String> = names
            .iter()
            .filter(|name| !inner.users.values().any(|u| &&u.name == name))
            .cloned()
            .collect();
        Ok((missing.is_empty(), missing))
    }

    async fn get_user_roles(&self, project_uuid: Uuid, token: &str) -> (HashSet<String>, String) {
        let inner = self.inner.lock().await;
        let Some(user) = inner.users.values().find(|u| u.token == token) else {
            return (HashSet::new(), String::new());
        };
        (user.roles_for_project(project_uuid), user.name.clone())
    }

    async fn insert_topic(&self, topic: Topic) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        let key = (topic.project_uuid, topic.name.clone());
        if inner.topics.contains_key(&key) {
            return Err(StoreError::Exists(topic.name));
        }
        inner.topics.insert(key, topic);
        Ok(())
    }

    async fn remove_topic(&self, project_uuid: Uuid, name: &str) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        let key = (project_uuid, name.to_string());
        inner
            .topics
            .remove(&key)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        inner.topic_acl.remove(&key);
        Ok(())
    }

    async fn query_topics(&self, project_uuid: Uuid, name: Option<&str>) -> StoreResult<Vec<Topic>> {
        let inner = self.inner.lock().await;

        if let Some(name) = name {
            return inner
                .topics
                .get(&(project_uuid, name.to_string()))
                .cloned()
                .map(|t| vec![t])
                .ok_or_else(|| StoreError::NotFound(name.to_string()));
        }

        Ok(inner
            .topics
            .values()
            .filter(|t| t.project_uuid == project_uuid)
            .cloned()
            .collect())
    }

    async fn remove_project_topics(&self, project_uuid: Uuid) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner.topics.retain(|(p, _), _| *p != project_uuid);
        inner.topic_acl.retain(|(p, _), _| *p != project_uuid);
        Ok(())
    }

    async fn insert_sub(&self, sub: Subscription) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        let key = (sub.project_uuid, sub.name.clone());
        if inner.subs.contains_key(&key) {
            return Err(StoreError::Exists(sub.name));
        }
        inner.subs.insert(key, sub);
        Ok(())
    }

    async fn remove_sub(&self, project_uuid: Uuid, name: &str) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        let key = (project_uuid, name.to_string());
        inner
            .subs
            .remove(&key)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        inner.sub_acl.remove(&key);
        Ok(())
    }

    async fn query_subs(&self, project_uuid: Uuid, name: Option<&str>) -> StoreResult<Vec<Subscription>> {
        let inner = self.inner.lock().await;

        if let Some(name) = name {
            return inner
                .subs
                .get(&(project_uuid, name.to_string()))
                .cloned()
                .map(|s| vec![s])
                .ok_or_else(|| StoreError::NotFound(name.to_string()));
        }

        Ok(inner
            .subs
            .values()
            .filter(|s| s.project_uuid == project_uuid)
            .cloned()
            .collect())
    }

    async fn query_one_sub(&self, project_uuid: Uuid, name: &str) -> StoreResult<Subscription> {
        let inner = self.inner.lock().await;
        inner
            .subs
            .get(&(project_uuid, name.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn remove_project_subs(&self, project_uuid: Uuid) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner.subs.retain(|(p, _), _| *p != project_uuid);
        inner.sub_acl.retain(|(p, _), _| *p != project_uuid);
        Ok(())
    }

    async fn update_sub_pull(&self, project_uuid: Uuid, name: &str, new_offset: i64, ts: DateTime<Utc>) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        let Some(sub) = inner.subs.get_mut(&(project_uuid, name.to_string())) else {
            // Non-failing: a pull racing a concurrent delete simply has nothing to update.
            return Ok(());
        };
        sub.next_offset = new_offset;
        sub.pending_ack = Some(ts);
        Ok(())
    }

    async fn update_sub_push_config(
        &self,
        project_uuid: Uuid,
        name: &str,
        push_endpoint: &str,
        retry_policy: pubsub_types::RetryPolicy,
        retry_period_ms: i64,
    ) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        let sub = inner
            .subs
            .get_mut(&(project_uuid, name.to_string()))
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        sub.push_endpoint = push_endpoint.to_string();
        sub.retry_policy = retry_policy;
        sub.retry_period_ms = retry_period_ms;
        Ok(())
    }

    async fn update_sub_offset_ack(&self, project_uuid: Uuid, name: &str, offset: i64, now: DateTime<Utc>) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        let sub = inner
            .subs
            .get_mut(&(project_uuid, name.to_string()))
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;

        if !sub.awaiting_ack() {
            return Err(StoreError::NoAckPending);
        }

        if offset < sub.offset || offset > sub.next_offset {
            return Err(StoreError::WrongAck);
        }

        let pending_ack = sub.pending_ack.expect("awaiting_ack implies pending_ack is set");
        let elapsed = (now - pending_ack).num_seconds();
        if elapsed > sub.ack_deadline_sec {
            return Err(StoreError::AckTimeout);
        }

        sub.offset = offset;
        sub.next_offset = 0;
        sub.pending_ack = None;
        Ok(())
    }

    async fn query_acl(&self, project_uuid: Uuid, resource: ResourceKind, name: &str) -> StoreResult<HashSet<String>> {
        let inner = self.inner.lock().await;
        let table = match resource {
            ResourceKind::Topic => &inner.topic_acl,
            ResourceKind::Subscription => &inner.sub_acl,
        };
        Ok(table
            .get(&(project_uuid, name.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn mod_acl(&self, project_uuid: Uuid, resource: ResourceKind, name: &str, users: HashSet<String>) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        let table = match resource {
            ResourceKind::Topic => &mut inner.topic_acl,
            ResourceKind::Subscription => &mut inner.sub_acl,
        };
        table.insert((project_uuid, name.to_string()), users);
        Ok(())
    }

    async fn query_push_subs(&self) -> StoreResult<Vec<Subscription>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .subs
            .values()
            .filter(|s| s.is_push_enabled())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubsub_types::{RetryPolicy, DEFAULT_ACK_DEADLINE_SEC, DEFAULT_RETRY_PERIOD_MS};

    fn make_sub(project_uuid: Uuid, name: &str) -> Subscription {
        Subscription {
            project_uuid,
            name: name.to_string(),
            topic_name: "t".to_string(),
            offset: 0,
            next_offset: 0,
            pending_ack: None,
            push_endpoint: String::new(),
            ack_deadline_sec: DEFAULT_ACK_DEADLINE_SEC,
            retry_policy: RetryPolicy::Linear,
            retry_period_ms: DEFAULT_RETRY_PERIOD_MS,
        }
    }

    #[tokio::test]
    async fn ack_out_of_range_is_rejected_and_state_unchanged() {
        let store = InMemoryMetadataStore::new();
        let project = Uuid::new_v4();
        store.insert_sub(make_sub(project, "s")).await.unwrap();

        let now = Utc::now();
        store.update_sub_pull(project, "s", 2, now).await.unwrap();

        let err = store.update_sub_offset_ack(project, "s", 6, now).await.unwrap_err();
        assert_eq!(err, StoreError::WrongAck);

        let sub = store.query_one_sub(project, "s").await.unwrap();
        assert_eq!(sub.offset, 0);
        assert_eq!(sub.next_offset, 2);
    }

    #[tokio::test]
    async fn ack_without_pending_pull_is_rejected() {
        let store = InMemoryMetadataStore::new();
        let project = Uuid::new_v4();
        store.insert_sub(make_sub(project, "s")).await.unwrap();

        let err = store
            .update_sub_offset_ack(project, "s", 1, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::NoAckPending);
    }

    #[tokio::test]
    async fn ack_after_deadline_is_rejected() {
        let store = InMemoryMetadataStore::new();
        let project = Uuid::new_v4();
        let mut sub = make_sub(project, "s");
        sub.ack_deadline_sec = 10;
        store.insert_sub(sub).await.unwrap();

        let pulled_at = Utc::now();
        store.update_sub_pull(project, "s", 2, pulled_at).await.unwrap();

        let too_late = pulled_at + chrono::Duration::seconds(11);
        let err = store
            .update_sub_offset_ack(project, "s", 2, too_late)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::AckTimeout);

        let sub = store.query_one_sub(project, "s").await.unwrap();
        assert_eq!(sub.offset, 0);
        assert!(sub.awaiting_ack());
    }

    #[tokio::test]
    async fn accepted_ack_advances_offset_and_clears_pending() {
        let store = InMemoryMetadataStore::new();
        let project = Uuid::new_v4();
        store.insert_sub(make_sub(project, "s")).await.unwrap();

        let now = Utc::now();
        store.update_sub_pull(project, "s", 2, now).await.unwrap();
        store.update_sub_offset_ack(project, "s", 2, now).await.unwrap();

        let sub = store.query_one_sub(project, "s").await.unwrap();
        assert_eq!(sub.offset, 2);
        assert!(!sub.awaiting_ack());

        let err = store
            .update_sub_offset_ack(project, "s", 2, now)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::NoAckPending);
    }

    #[tokio::test]
    async fn duplicate_project_name_is_rejected() {
        let store = InMemoryMetadataStore::new();
        let now = Utc::now();
        let project = Project {
            uuid: Uuid::new_v4(),
            name: "p".to_string(),
            description: String::new(),
            created_by: "alice".to_string(),
            created_on: now,
            modified_on: now,
        };
        store.insert_project(project.clone()).await.unwrap();

        let dup = Project { uuid: Uuid::new_v4(), ..project };
        let err = store.insert_project(dup).await.unwrap_err();
        assert_eq!(err, StoreError::Exists("p".to_string()));
    }

    #[tokio::test]
    async fn remove_project_cascades_topics_and_subs() {
        let store = InMemoryMetadataStore::new();
        let project = Uuid::new_v4();
        let now = Utc::now();
        store
            .insert_project(Project {
                uuid: project,
                name: "p".to_string(),
                description: String::new(),
                created_by: "alice".to_string(),
                created_on: now,
                modified_on: now,
            })
            .await
            .unwrap();
        store
            .insert_topic(Topic { project_uuid: project, name: "t".to_string() })
            .await
            .unwrap();
        store.insert_sub(make_sub(project, "s")).await.unwrap();

        store.remove_project(project).await.unwrap();

        assert!(store.query_topics(project, None).await.unwrap().is_empty());
        assert!(store.query_subs(project, None).await.unwrap().is_empty());
    }
}
