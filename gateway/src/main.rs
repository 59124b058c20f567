use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use pubsub_broker::{BrokerClient, InMemoryBroker};
use pubsub_store::{InMemoryMetadataStore, MetadataStore};
use pubsub_types::RoutePolicy;

use pubsub_gateway::auth::AuthGate;
use pubsub_gateway::push_manager::PushManager;
use pubsub_gateway::server;
use pubsub_gateway::state::AppState;
use pubsub_gateway::subscriptions::SubscriptionService;
use pubsub_gateway::topics::TopicService;
use pubsub_gateway::types::Environment;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let environment = Environment::from_env();

    let store: Arc<dyn MetadataStore> = Arc::new(InMemoryMetadataStore::new());
    let broker: Arc<dyn BrokerClient> = Arc::new(InMemoryBroker::new());

    let auth_gate = Arc::new(AuthGate::new(store.clone(), RoutePolicy::default_table()));

    let push_manager = Arc::new(PushManager::new(store.clone(), broker.clone()));
    push_manager.rehydrate().await;

    let topics =
        Arc::new(TopicService::new(store.clone(), broker.clone(), auth_gate.clone(), environment.enable_resource_acl()));
    let subscriptions = Arc::new(SubscriptionService::new(
        store.clone(),
        broker.clone(),
        auth_gate.clone(),
        push_manager.clone(),
        environment.enable_resource_acl(),
    ));

    let state = AppState { store, broker, auth_gate, push_manager, topics, subscriptions };

    server::start(environment, state).await
}
