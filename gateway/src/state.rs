//! Application state: the shared dependencies every handler reaches through one
//! `Extension<AppState>` layer.

use std::sync::Arc;

use pubsub_broker::BrokerClient;
use pubsub_store::MetadataStore;

use crate::auth::AuthGate;
use crate::push_manager::PushManager;
use crate::subscriptions::SubscriptionService;
use crate::topics::TopicService;

/// Dependencies shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MetadataStore>,
    pub broker: Arc<dyn BrokerClient>,
    pub auth_gate: Arc<AuthGate>,
    pub push_manager: Arc<PushManager>,
    pub topics: Arc<TopicService>,
    pub subscriptions: Arc<SubscriptionService>,
}
