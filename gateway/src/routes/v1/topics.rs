//! Topic routes. Google-Pub/Sub-style colon-verb paths (`/topics/{name}:publish`)
//! don't fit axum's per-segment path matching, so each verb-bearing route captures
//! the whole `name[:verb]` string in one path param and splits on `:` by hand.

use std::collections::HashSet;

use aide::axum::{routing::get, ApiRouter};
use axum::extract::Path;
use axum::{Extension, Json};
use base64::Engine as _;

use pubsub_types::role_policy::route_names;

use crate::middleware::AuthContext;
use crate::state::AppState;
use crate::types::{require_valid_segment, AppError, ValidatedJson};
use crate::wire::{AclResponse, ListTopicsResponse, ModifyAclRequest, PublishRequest, PublishResponse, TopicObject};

pub fn handler() -> ApiRouter {
    ApiRouter::new()
        .api_route("/projects/{project}/topics", get(list))
        .api_route(
            "/projects/{project}/topics/{topic_verb}",
            get(get_or_acl).put(create_or_modify_acl).delete(remove).post(publish),
        )
}

fn split_verb(topic_verb: &str) -> (&str, Option<&str>) {
    topic_verb.split_once(':').map_or((topic_verb, None), |(name, verb)| (name, Some(verb)))
}

/// Lists every topic in a project.
async fn list(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<ListTopicsResponse>, AppError> {
    if !state.auth_gate.authorize(route_names::TOPICS_LIST, &auth.roles) {
        return Err(AppError::forbidden());
    }
    let topics = state.topics.list(auth.project_uuid).await?;
    Ok(Json(ListTopicsResponse {
        topics: topics
            .into_iter()
            .map(|t| TopicObject { name: pubsub_types::Topic::resource_name(&auth.project_name, &t.name) })
            .collect(),
    }))
}

/// Gets a topic, or with `:acl` its ACL.
async fn get_or_acl(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((_project, topic_verb)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (name, verb) = split_verb(&topic_verb);
    require_valid_segment(name, "topic")?;
    match verb {
        None => {
            if !state.auth_gate.authorize(route_names::TOPICS_GET, &auth.roles) {
                return Err(AppError::forbidden());
            }
            let topic = state.topics.get(auth.project_uuid, name).await?;
            let object = TopicObject { name: pubsub_types::Topic::resource_name(&auth.project_name, &topic.name) };
            Ok(Json(serde_json::to_value(object).expect("TopicObject serializes")))
        }
        Some("acl") => {
            if !state.auth_gate.authorize(route_names::TOPICS_GET_ACL, &auth.roles) {
                return Err(AppError::forbidden());
            }
            let users = state.topics.get_acl(auth.project_uuid, name).await?;
            let response = AclResponse { users: users.into_iter().collect() };
            Ok(Json(serde_json::to_value(response).expect("AclResponse serializes")))
        }
        Some(other) => Err(AppError::invalid_argument(format!("unknown verb: {other}"))),
    }
}

/// Creates a topic, or with `:modifyAcl` replaces its ACL.
async fn create_or_modify_acl(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((_project, topic_verb)): Path<(String, String)>,
    body: axum::body::Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let (name, verb) = split_verb(&topic_verb);
    require_valid_segment(name, "topic")?;
    match verb {
        None => {
            if !state.auth_gate.authorize(route_names::TOPICS_CREATE, &auth.roles) {
                return Err(AppError::forbidden());
            }
            let topic = state.topics.create(auth.project_uuid, name).await?;
            let object = TopicObject { name: pubsub_types::Topic::resource_name(&auth.project_name, &topic.name) };
            Ok(Json(serde_json::to_value(object).expect("TopicObject serializes")))
        }
        Some("modifyAcl") => {
            if !state.auth_gate.authorize(route_names::TOPICS_MODIFY_ACL, &auth.roles) {
                return Err(AppError::forbidden());
            }
            let request: ModifyAclRequest =
                serde_json::from_slice(&body).map_err(|_| AppError::invalid_argument("invalid JSON payload"))?;
            let users: HashSet<String> = request.users.into_iter().collect();
            state.topics.mod_acl(auth.project_uuid, name, users.clone()).await?;
            let response = AclResponse { users: users.into_iter().collect() };
            Ok(Json(serde_json::to_value(response).expect("AclResponse serializes")))
        }
        Some(other) => Err(AppError::invalid_argument(format!("unknown verb: {other}"))),
    }
}

/// Deletes a topic.
async fn remove(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((_project, topic_verb)): Path<(String, String)>,
) -> Result<Json<crate::wire::Empty>, AppError> {
    let (name, verb) = split_verb(&topic_verb);
    require_valid_segment(name, "topic")?;
    if verb.is_some() {
        return Err(AppError::invalid_argument("DELETE does not take a verb"));
    }
    if !state.auth_gate.authorize(route_names::TOPICS_DELETE, &auth.roles) {
        return Err(AppError::forbidden());
    }
    state.topics.remove(auth.project_uuid, name).await?;
    Ok(Json(crate::wire::Empty {}))
}

/// Publishes a batch of messages to a topic (`:publish`).
async fn publish(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((_project, topic_verb)): Path<(String, String)>,
    ValidatedJson(request): ValidatedJson<PublishRequest>,
) -> Result<Json<PublishResponse>, AppError> {
    let (name, verb) = split_verb(&topic_verb);
    require_valid_segment(name, "topic")?;
    if verb != Some("publish") {
        return Err(AppError::invalid_argument("POST requires the :publish verb"));
    }
    if !state.auth_gate.authorize(route_names::TOPICS_PUBLISH, &auth.roles) {
        return Err(AppError::forbidden());
    }

    let messages = request
        .messages
        .iter()
        .map(|m| {
            base64::engine::general_purpose::STANDARD
                .decode(&m.data)
                .map_err(|_| AppError::invalid_argument("message data is not valid base64"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let message_ids = state
        .topics
        .publish(auth.project_uuid, &auth.project_name, name, &auth.roles, &auth.username, &messages)
        .await?;

    Ok(Json(PublishResponse { message_ids }))
}
