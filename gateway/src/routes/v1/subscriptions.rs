//! Subscription routes. Same colon-verb wildcard-splitting approach as topic routes.

use std::collections::HashSet;
use std::str::FromStr;

use aide::axum::{routing::get, ApiRouter};
use axum::extract::Path;
use axum::{Extension, Json};
use base64::Engine as _;

use pubsub_types::role_policy::route_names;
use pubsub_types::{RetryPolicy, Subscription, Topic};

use crate::middleware::AuthContext;
use crate::state::AppState;
use crate::types::{require_valid_segment, AppError};
use crate::wire::{
    AckRequest, AclResponse, CreateSubscriptionRequest, Empty, ListSubscriptionsResponse, ModifyAclRequest,
    ModifyPushConfigRequest, PullRequest, PullResponse, PulledMessage, ReceivedMessage, SubscriptionObject,
    WirePushConfig, WireRetryPolicy,
};

pub fn handler() -> ApiRouter {
    ApiRouter::new()
        .api_route("/projects/{project}/subscriptions", get(list))
        .api_route(
            "/projects/{project}/subscriptions/{sub_verb}",
            get(get_or_acl).put(create_or_modify).delete(remove).post(pull_or_ack),
        )
}

fn split_verb(sub_verb: &str) -> (&str, Option<&str>) {
    sub_verb.split_once(':').map_or((sub_verb, None), |(name, verb)| (name, Some(verb)))
}

fn to_wire(project_name: &str, sub: &Subscription) -> SubscriptionObject {
    SubscriptionObject {
        name: Subscription::resource_name(project_name, &sub.name),
        topic: Topic::resource_name(project_name, &sub.topic_name),
        push_config: sub.is_push_enabled().then(|| WirePushConfig {
            push_endpoint: sub.push_endpoint.clone(),
            retry_policy: Some(WireRetryPolicy { kind: sub.retry_policy.to_string(), period: sub.retry_period_ms }),
        }),
        ack_deadline_seconds: sub.ack_deadline_sec,
    }
}

fn parse_retry_policy(wire: &WireRetryPolicy) -> Result<RetryPolicy, AppError> {
    RetryPolicy::from_str(&wire.kind).map_err(|_| AppError::invalid_argument(format!("unknown retry policy: {}", wire.kind)))
}

/// Lists every subscription in a project.
async fn list(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<ListSubscriptionsResponse>, AppError> {
    if !state.auth_gate.authorize(route_names::SUBS_LIST, &auth.roles) {
        return Err(AppError::forbidden());
    }
    let subs = state.subscriptions.list(auth.project_uuid).await?;
    Ok(Json(ListSubscriptionsResponse {
        subscriptions: subs.iter().map(|s| to_wire(&auth.project_name, s)).collect(),
    }))
}

/// Gets a subscription, or with `:acl` its ACL.
async fn get_or_acl(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((_project, sub_verb)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (name, verb) = split_verb(&sub_verb);
    require_valid_segment(name, "subscription")?;
    match verb {
        None => {
            if !state.auth_gate.authorize(route_names::SUBS_GET, &auth.roles) {
                return Err(AppError::forbidden());
            }
            let sub = state.subscriptions.get(auth.project_uuid, name).await?;
            Ok(Json(serde_json::to_value(to_wire(&auth.project_name, &sub)).expect("SubscriptionObject serializes")))
        }
        Some("acl") => {
            if !state.auth_gate.authorize(route_names::SUBS_GET_ACL, &auth.roles) {
                return Err(AppError::forbidden());
            }
            let users = state.subscriptions.get_acl(auth.project_uuid, name).await?;
            let response = AclResponse { users: users.into_iter().collect() };
            Ok(Json(serde_json::to_value(response).expect("AclResponse serializes")))
        }
        Some(other) => Err(AppError::invalid_argument(format!("unknown verb: {other}"))),
    }
}

/// Creates a subscription, or with `:modifyPushConfig`/`:modifyAcl` updates its push
/// config or ACL.
async fn create_or_modify(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((_project, sub_verb)): Path<(String, String)>,
    body: axum::body::Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let (name, verb) = split_verb(&sub_verb);
    require_valid_segment(name, "subscription")?;
    match verb {
        None => {
            if !state.auth_gate.authorize(route_names::SUBS_CREATE, &auth.roles) {
                return Err(AppError::forbidden());
            }
            let request: CreateSubscriptionRequest =
                serde_json::from_slice(&body).map_err(|_| AppError::invalid_argument("invalid JSON payload"))?;
            use validator::Validate;
            request.validate().map_err(|_| AppError::invalid_argument("validation error"))?;

            let (push_endpoint, retry_policy, retry_period_ms) = match &request.push_config {
                Some(cfg) => {
                    let retry = cfg.retry_policy.as_ref().map(parse_retry_policy).transpose()?;
                    (cfg.push_endpoint.clone(), retry, cfg.retry_policy.as_ref().map(|r| r.period))
                }
                None => (String::new(), None, None),
            };

            let sub = state
                .subscriptions
                .create(
                    auth.project_uuid,
                    &auth.project_name,
                    name,
                    &request.topic,
                    push_endpoint,
                    request.ack_deadline_seconds,
                    retry_policy,
                    retry_period_ms,
                )
                .await?;
            Ok(Json(serde_json::to_value(to_wire(&auth.project_name, &sub)).expect("SubscriptionObject serializes")))
        }
        Some("modifyPushConfig") => {
            if !state.auth_gate.authorize(route_names::SUBS_MODIFY_PUSH_CONFIG, &auth.roles) {
                return Err(AppError::forbidden());
            }
            let request: ModifyPushConfigRequest =
                serde_json::from_slice(&body).map_err(|_| AppError::invalid_argument("invalid JSON payload"))?;

            let (push_endpoint, retry_policy, retry_period_ms) = match &request.push_config {
                Some(cfg) => {
                    let retry = cfg.retry_policy.as_ref().map(parse_retry_policy).transpose()?;
                    (cfg.push_endpoint.clone(), retry, cfg.retry_policy.as_ref().map(|r| r.period))
                }
                None => (String::new(), None, None),
            };

            let sub = state
                .subscriptions
                .modify_push_config(auth.project_uuid, name, push_endpoint, retry_policy, retry_period_ms)
                .await?;
            Ok(Json(serde_json::to_value(to_wire(&auth.project_name, &sub)).expect("SubscriptionObject serializes")))
        }
        Some("modifyAcl") => {
            if !state.auth_gate.authorize(route_names::SUBS_MODIFY_ACL, &auth.roles) {
                return Err(AppError::forbidden());
            }
            let request: ModifyAclRequest =
                serde_json::from_slice(&body).map_err(|_| AppError::invalid_argument("invalid JSON payload"))?;
            let users: HashSet<String> = request.users.into_iter().collect();
            state.subscriptions.mod_acl(auth.project_uuid, name, users.clone()).await?;
            let response = AclResponse { users: users.into_iter().collect() };
            Ok(Json(serde_json::to_value(response).expect("AclResponse serializes")))
        }
        Some(other) => Err(AppError::invalid_argument(format!("unknown verb: {other}"))),
    }
}

/// Deletes a subscription.
async fn remove(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((_project, sub_verb)): Path<(String, String)>,
) -> Result<Json<Empty>, AppError> {
    let (name, verb) = split_verb(&sub_verb);
    require_valid_segment(name, "subscription")?;
    if verb.is_some() {
        return Err(AppError::invalid_argument("DELETE does not take a verb"));
    }
    if !state.auth_gate.authorize(route_names::SUBS_DELETE, &auth.roles) {
        return Err(AppError::forbidden());
    }
    state.subscriptions.remove(auth.project_uuid, name).await?;
    Ok(Json(Empty {}))
}

/// Pulls (`:pull`) or acknowledges (`:acknowledge`) messages on a subscription.
async fn pull_or_ack(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((_project, sub_verb)): Path<(String, String)>,
    body: axum::body::Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let (name, verb) = split_verb(&sub_verb);
    require_valid_segment(name, "subscription")?;
    match verb {
        Some("pull") => {
            if !state.auth_gate.authorize(route_names::SUBS_PULL, &auth.roles) {
                return Err(AppError::forbidden());
            }
            let request: PullRequest =
                serde_json::from_slice(&body).map_err(|_| AppError::invalid_argument("invalid JSON payload"))?;
            let max_messages: i64 = request
                .max_messages
                .parse()
                .map_err(|_| AppError::invalid_argument("maxMessages must be an integer"))?;
            let return_immediately = matches!(request.return_immediately.as_str(), "true" | "1");

            let pulled = state
                .subscriptions
                .pull(auth.project_uuid, &auth.project_name, name, &auth.roles, &auth.username, max_messages, return_immediately)
                .await?;

            let response = PullResponse {
                received_messages: pulled
                    .into_iter()
                    .map(|m| ReceivedMessage {
                        ack_id: m.ack_id,
                        message: PulledMessage {
                            data: base64::engine::general_purpose::STANDARD.encode(&m.payload),
                            attributes: std::collections::HashMap::new(),
                        },
                    })
                    .collect(),
            };
            Ok(Json(serde_json::to_value(response).expect("PullResponse serializes")))
        }
        Some("acknowledge") => {
            if !state.auth_gate.authorize(route_names::SUBS_ACK, &auth.roles) {
                return Err(AppError::forbidden());
            }
            let request: AckRequest =
                serde_json::from_slice(&body).map_err(|_| AppError::invalid_argument("invalid JSON payload"))?;
            use validator::Validate;
            request.validate().map_err(|_| AppError::invalid_argument("ackIds must not be empty"))?;
            state.subscriptions.ack(auth.project_uuid, &auth.project_name, name, &request.ack_ids).await?;
            Ok(Json(serde_json::to_value(Empty {}).expect("Empty serializes")))
        }
        _ => Err(AppError::invalid_argument("POST requires :pull or :acknowledge")),
    }
}
