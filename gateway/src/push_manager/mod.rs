//! Push Manager (C6): one cancellable delivery worker per push-enabled subscription
//! (spec §4.6). Worker lifecycle mirrors the cancellation-token pattern used for
//! background workers elsewhere in this stack.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use pubsub_broker::BrokerClient;
use pubsub_store::MetadataStore;
use pubsub_types::Subscription;

/// How long a worker sleeps between empty polls of its subscription.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(250);
/// Timeout for a single push POST.
const PUSH_TIMEOUT: Duration = Duration::from_secs(10);

struct Worker {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// A registered but not-yet-running worker slot, or a running one.
enum Slot {
    Added,
    Running(Worker),
}

/// Envelope POSTed to a subscription's push endpoint for each delivered message
/// (spec §4.6).
#[derive(Debug, Serialize)]
struct PushEnvelope<'a> {
    subscription: &'a str,
    message: PushMessage,
    delivery_attempt: u32,
}

#[derive(Debug, Serialize)]
struct PushMessage {
    data: String,
}

/// Owns the `(project, subscription) -> worker` map and drives each push-enabled
/// subscription's delivery loop.
pub struct PushManager {
    store: Arc<dyn MetadataStore>,
    broker: Arc<dyn BrokerClient>,
    http: reqwest::Client,
    workers: Mutex<HashMap<(Uuid, String), Slot>>,
}

impl PushManager {
    #[must_use]
    pub fn new(store: Arc<dyn MetadataStore>, broker: Arc<dyn BrokerClient>) -> Self {
        Self {
            store,
            broker,
            http: reqwest::Client::builder()
                .timeout(PUSH_TIMEOUT)
                .build()
                .expect("push HTTP client builds"),
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// Enumerates every push-enabled subscription and launches a worker for each.
    /// Called once at startup (spec §4.6).
    pub async fn rehydrate(self: &Arc<Self>) {
        let Ok(subs) = self.store.query_push_subs().await else {
            tracing::error!("failed to enumerate push subscriptions at startup");
            return;
        };
        for sub in subs {
            self.add(sub.project_uuid, &sub.name).await;
            self.launch(sub.project_uuid, &sub.name).await;
        }
    }

    /// Registers a slot for `(project, sub)` if one doesn't already exist. Idempotent;
    /// does not start the delivery loop.
    pub async fn add(&self, project_uuid: Uuid, sub_name: &str) {
        let key = (project_uuid, sub_name.to_string());
        let mut workers = self.workers.lock().await;
        workers.entry(key).or_insert(Slot::Added);
    }

    /// Starts the delivery loop for `(project, sub)` if it isn't already running.
    /// Idempotent if already running; implicitly adds the slot if missing.
    pub async fn launch(self: &Arc<Self>, project_uuid: Uuid, sub_name: &str) {
        let key = (project_uuid, sub_name.to_string());
        let mut workers = self.workers.lock().await;

        if matches!(workers.get(&key), Some(Slot::Running(_))) {
            return;
        }

        let cancel = CancellationToken::new();
        let manager = Arc::clone(self);
        let name = sub_name.to_string();
        let task = tokio::spawn({
            let cancel = cancel.clone();
            async move { manager.run_loop(project_uuid, name, cancel).await }
        });

        workers.insert(key, Slot::Running(Worker { cancel, task }));
    }

    /// Cooperatively cancels and drops the worker for `(project, sub)`. Idempotent if
    /// no worker is registered.
    pub async fn stop(&self, project_uuid: Uuid, sub_name: &str) {
        let key = (project_uuid, sub_name.to_string());
        let mut workers = self.workers.lock().await;
        if let Some(Slot::Running(worker)) = workers.remove(&key) {
            worker.cancel.cancel();
            worker.task.abort();
        }
    }

    /// Whether a worker is currently running for `(project, sub)`. Used by tests.
    pub async fn is_running(&self, project_uuid: Uuid, sub_name: &str) -> bool {
        let workers = self.workers.lock().await;
        matches!(workers.get(&(project_uuid, sub_name.to_string())), Some(Slot::Running(_)))
    }

    /// Stops then re-adds and re-launches the worker, reloading its configuration
    /// from the store on the next loop iteration.
    pub async fn restart(self: &Arc<Self>, project_uuid: Uuid, sub_name: &str) {
        self.stop(project_uuid, sub_name).await;
        self.add(project_uuid, sub_name).await;
        self.launch(project_uuid, sub_name).await;
    }

    async fn run_loop(self: Arc<Self>, project_uuid: Uuid, sub_name: String, cancel: CancellationToken) {
        loop {
            tokio::select! {
                () = cancel.cancelled() => return,
                () = self.deliver_once(project_uuid, &sub_name) => {}
            }

            tokio::select! {
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(IDLE_POLL_INTERVAL) => {}
            }
        }
    }

    async fn deliver_once(&self, project_uuid: Uuid, sub_name: &str) {
        let Ok(sub) = self.store.query_one_sub(project_uuid, sub_name).await else {
            return;
        };
        if !sub.is_push_enabled() {
            return;
        }

        let Ok(projects) = self.store.query_projects(Some(project_uuid), None).await else {
            return;
        };
        let Some(project) = projects.into_iter().next() else {
            return;
        };

        let full_topic = pubsub_types::Topic::resource_name(&project.name, &sub.topic_name);
        let Ok(batch) = self.broker.consume(&full_topic, sub.offset, true).await else {
            return;
        };
        if batch.is_empty() {
            return;
        }

        let resource_name = Subscription::resource_name(&project.name, sub_name);

        for message in batch {
            let mut delivery_attempt: u32 = 1;

            loop {
                let envelope = PushEnvelope {
                    subscription: &resource_name,
                    message: PushMessage { data: base64_encode(&message.payload) },
                    delivery_attempt,
                };

                match self.http.post(&sub.push_endpoint).json(&envelope).send().await {
                    Ok(resp) if resp.status().is_success() => break,
                    _ => {
                        tracing::warn!(
                            subscription = %resource_name,
                            delivery_attempt,
                            "push delivery failed, retrying"
                        );
                        delivery_attempt += 1;
                        tokio::time::sleep(Duration::from_millis(
                            u64::try_from(sub.retry_period_ms).unwrap_or(3000),
                        ))
                        .await;
                        continue;
                    }
                }
            }

            // Advance the committed offset the same way an explicit ack would: a
            // synthetic pull+ack pair over the single delivered message.
            let new_offset = message.offset + 1;
            let now = chrono::Utc::now();
            if self.store.update_sub_pull(project_uuid, sub_name, new_offset, now).await.is_err() {
                return;
            }
            if self.store.update_sub_offset_ack(project_uuid, sub_name, new_offset, now).await.is_err() {
                return;
            }
        }
    }
}

fn base64_encode(bytes: &[u8]) -> String {
    use base64::Engine as _;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}
