//! Subscription: a named consumer position over one topic.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Applied when `ackDeadlineSec` is absent or `<= 0` on create / push-config change.
pub const DEFAULT_ACK_DEADLINE_SEC: i64 = 10;
/// Applied when `retryPeriodMs` is absent or `<= 0` on create / push-config change.
pub const DEFAULT_RETRY_PERIOD_MS: i64 = 3000;

/// Retry policy for the push delivery loop. Only `linear` exists today: on a
/// non-2xx response or network error, sleep `retry_period_ms` and retry the batch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Display, EnumString, Default)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RetryPolicy {
    /// Sleep a fixed period between delivery attempts.
    #[default]
    Linear,
}

/// A subscription. `(project_uuid, name)` is unique; `topic_name` must resolve to an
/// existing topic in the same project.
///
/// `offset` is the committed low-water mark (next broker offset to be consumed).
/// `next_offset` is the end of the currently outstanding pull; `0` means no ack is
/// pending. `pending_ack` is the UTC timestamp (second precision) the outstanding
/// pull was issued at. Invariant: `offset <= next_offset` whenever `next_offset != 0`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Owning project.
    pub project_uuid: Uuid,
    /// Unique (within the project) subscription name.
    pub name: String,
    /// Topic this subscription reads from.
    pub topic_name: String,
    /// Committed low-water mark: the next broker offset to be consumed.
    pub offset: i64,
    /// End of the outstanding pull, or `0` if no ack is pending.
    pub next_offset: i64,
    /// UTC timestamp the outstanding pull was issued, if any.
    pub pending_ack: Option<DateTime<Utc>>,
    /// Absolute push URL, or empty for a pull-only subscription.
    pub push_endpoint: String,
    /// Ack window, in seconds. Must be `> 0`.
    pub ack_deadline_sec: i64,
    /// Push delivery retry policy.
    pub retry_policy: RetryPolicy,
    /// Push delivery retry period, in milliseconds. Must be `> 0`.
    pub retry_period_ms: i64,
}

impl Subscription {
    /// Whether this subscription currently has an ack pending (`next_offset != 0`).
    #[must_use]
    pub const fn awaiting_ack(&self) -> bool {
        self.next_offset != 0
    }

    /// Whether a push worker should be running for this subscription.
    #[must_use]
    pub fn is_push_enabled(&self) -> bool {
        !self.push_endpoint.is_empty()
    }

    /// The `projects/P/subscriptions/S`-style resource name used on the wire.
    #[must_use]
    pub fn resource_name(project_name: &str, sub_name: &str) -> String {
        format!("projects/{project_name}/subscriptions/{sub_name}")
    }
}
