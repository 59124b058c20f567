#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use axum::Extension;
use chrono::Utc;
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

use pubsub_broker::{BrokerClient, InMemoryBroker};
use pubsub_store::{InMemoryMetadataStore, MetadataStore};
use pubsub_types::{roles, Project, ProjectRoles, RoutePolicy, User};

use pubsub_gateway::auth::AuthGate;
use pubsub_gateway::push_manager::PushManager;
use pubsub_gateway::routes;
use pubsub_gateway::state::AppState;
use pubsub_gateway::subscriptions::SubscriptionService;
use pubsub_gateway::topics::TopicService;
use pubsub_gateway::types::Environment;

/// A project and three pre-provisioned users (admin, publisher-only, consumer-only),
/// wired to an in-memory store/broker and the real route tree.
pub struct TestContext {
    pub router: axum::Router,
    pub project_uuid: Uuid,
    pub project_name: String,
    pub admin_token: String,
    pub publisher_token: String,
    pub consumer_token: String,
    pub push_manager: Arc<PushManager>,
}

impl TestContext {
    /// Builds a fresh project with one user per role, on a clean in-memory backend.
    pub async fn setup() -> Self {
        let store: Arc<dyn MetadataStore> = Arc::new(InMemoryMetadataStore::new());
        let broker: Arc<dyn BrokerClient> = Arc::new(InMemoryBroker::new());

        let auth_gate = Arc::new(AuthGate::new(store.clone(), RoutePolicy::default_table()));
        let push_manager = Arc::new(PushManager::new(store.clone(), broker.clone()));
        let topics = Arc::new(TopicService::new(store.clone(), broker.clone(), auth_gate.clone(), true));
        let subscriptions = Arc::new(SubscriptionService::new(
            store.clone(),
            broker.clone(),
            auth_gate.clone(),
            push_manager.clone(),
            true,
        ));

        let project_uuid = Uuid::new_v4();
        let project_name = format!("proj-{}", Uuid::new_v4().simple());
        let now = Utc::now();
        store
            .insert_project(Project {
                uuid: project_uuid,
                name: project_name.clone(),
                description: String::new(),
                created_by: "test-harness".to_string(),
                created_on: now,
                modified_on: now,
            })
            .await
            .expect("project insert succeeds");

        let admin_token = format!("admin-{}", Uuid::new_v4());
        let publisher_token = format!("publisher-{}", Uuid::new_v4());
        let consumer_token = format!("consumer-{}", Uuid::new_v4());

        insert_user(&store, project_uuid, "admin", &admin_token, [roles::ADMIN]).await;
        insert_user(&store, project_uuid, "publisher", &publisher_token, [roles::PUBLISHER]).await;
        insert_user(&store, project_uuid, "consumer", &consumer_token, [roles::CONSUMER]).await;

        let state = AppState { store, broker, auth_gate, push_manager: push_manager.clone(), topics, subscriptions };
        let environment = Environment::from_env();

        let router: axum::Router =
            routes::handler().finish_api(&mut aide::openapi::OpenApi::default()).layer(Extension(state)).layer(Extension(environment));

        Self { router, project_uuid, project_name, admin_token, publisher_token, consumer_token, push_manager }
    }

    /// Sends a request with `token` as the `?key=` query parameter and an optional
    /// JSON body, returning the raw response.
    pub async fn send(&self, method: &str, path: &str, token: &str, body: Option<serde_json::Value>) -> Response {
        let separator = if path.contains('?') { '&' } else { '?' };
        let uri = format!("{path}{separator}key={token}");

        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        self.router.clone().oneshot(builder.body(body).expect("request builds")).await.expect("router never fails the request")
    }
}

/// Parses a response body as JSON. Returns `Value::Null` for an empty body.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.expect("body collects").to_bytes();
    if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body is valid JSON")
    }
}

async fn insert_user(
    store: &Arc<dyn MetadataStore>,
    project_uuid: Uuid,
    name: &str,
    token: &str,
    user_roles: impl IntoIterator<Item = &'static str>,
) {
    store
        .insert_user(User {
            uuid: Uuid::new_v4(),
            name: name.to_string(),
            token: token.to_string(),
            email: format!("{name}@example.com"),
            projects: vec![ProjectRoles {
                project_uuid,
                roles: user_roles.into_iter().map(str::to_string).collect::<HashSet<_>>(),
            }],
            service_roles: HashSet::new(),
        })
        .await
        .expect("user insert succeeds");
}
