//! Wire-format request/response bodies (spec §6). Field names use `camelCase` to
//! match the documented JSON shapes exactly.

use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// One message in a publish request.
#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    /// Free-form key/value attributes carried alongside the payload.
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    /// Base64-encoded message payload.
    #[validate(length(min = 1))]
    pub data: String,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    #[validate(length(min = 1), nested)]
    pub messages: Vec<WireMessage>,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub message_ids: Vec<String>,
}

/// Pull request. `maxMessages` and `returnImmediately` are carried as strings on the
/// wire (spec §6), matching a Google-Pub/Sub-style REST envelope.
#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub max_messages: String,
    #[serde(default)]
    pub return_immediately: String,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PulledMessage {
    pub data: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, String>,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedMessage {
    pub ack_id: String,
    pub message: PulledMessage,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PullResponse {
    pub received_messages: Vec<ReceivedMessage>,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AckRequest {
    #[validate(length(min = 1))]
    pub ack_ids: Vec<String>,
}

/// An empty JSON object, returned by ack, delete, and other no-content-but-200
/// operations (spec §6: ack response is `{}`).
#[derive(Debug, Serialize, JsonSchema)]
pub struct Empty {}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WireRetryPolicy {
    #[serde(rename = "type")]
    pub kind: String,
    pub period: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WirePushConfig {
    #[serde(default)]
    pub push_endpoint: String,
    #[serde(default)]
    pub retry_policy: Option<WireRetryPolicy>,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionObject {
    pub name: String,
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_config: Option<WirePushConfig>,
    pub ack_deadline_seconds: i64,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    #[validate(length(min = 1))]
    pub topic: String,
    #[serde(default)]
    pub push_config: Option<WirePushConfig>,
    #[serde(default)]
    pub ack_deadline_seconds: Option<i64>,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ModifyPushConfigRequest {
    #[serde(default)]
    pub push_config: Option<WirePushConfig>,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ModifyAclRequest {
    #[validate(length(min = 1))]
    pub users: Vec<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AclResponse {
    pub users: Vec<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopicObject {
    pub name: String,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListTopicsResponse {
    pub topics: Vec<TopicObject>,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListSubscriptionsResponse {
    pub subscriptions: Vec<SubscriptionObject>,
}
