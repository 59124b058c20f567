//! End-to-end scenarios against the real route tree, wired to in-memory backends.

mod common;

use axum::http::StatusCode;
use base64::Engine as _;
use serde_json::json;

use common::{body_json, TestContext};

fn b64(s: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(s)
}

async fn create_topic(ctx: &TestContext, token: &str, name: &str) {
    let path = format!("/v1/projects/{}/topics/{name}", ctx.project_name);
    let response = ctx.send("PUT", &path, token, Some(json!({}))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

async fn create_subscription(ctx: &TestContext, token: &str, name: &str, topic: &str, push_endpoint: Option<&str>) {
    let path = format!("/v1/projects/{}/subscriptions/{name}", ctx.project_name);
    let mut body = json!({ "topic": topic });
    if let Some(endpoint) = push_endpoint {
        body["pushConfig"] = json!({ "pushEndpoint": endpoint });
    }
    let response = ctx.send("PUT", &path, token, Some(body)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

async fn publish(ctx: &TestContext, token: &str, topic: &str, messages: &[&str]) {
    let path = format!("/v1/projects/{}/topics/{topic}:publish", ctx.project_name);
    let body = json!({ "messages": messages.iter().map(|m| json!({ "data": b64(m) })).collect::<Vec<_>>() });
    let response = ctx.send("POST", &path, token, Some(body)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn pull_then_ack_then_duplicate_ack_fails() {
    let ctx = TestContext::setup().await;
    create_topic(&ctx, &ctx.admin_token.clone(), "t").await;
    create_subscription(&ctx, &ctx.admin_token.clone(), "s", "t", None).await;
    publish(&ctx, &ctx.admin_token.clone(), "t", &["m1", "m2"]).await;

    let pull_path = format!("/v1/projects/{}/subscriptions/s:pull", ctx.project_name);
    let pull_body = json!({ "maxMessages": "10", "returnImmediately": "true" });
    let response = ctx.send("POST", &pull_path, &ctx.consumer_token.clone(), Some(pull_body)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let received = body["receivedMessages"].as_array().expect("receivedMessages is an array");
    assert_eq!(received.len(), 2);
    let project = &ctx.project_name;
    assert_eq!(received[0]["ackId"], format!("projects/{project}/subscriptions/s:0"));
    assert_eq!(received[1]["ackId"], format!("projects/{project}/subscriptions/s:1"));

    let ack_path = format!("/v1/projects/{}/subscriptions/s:acknowledge", ctx.project_name);
    let ack_body = json!({ "ackIds": [format!("projects/{project}/subscriptions/s:1")] });
    let response = ctx.send("POST", &ack_path, &ctx.consumer_token.clone(), Some(ack_body.clone())).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({}));

    let response = ctx.send("POST", &ack_path, &ctx.consumer_token.clone(), Some(ack_body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["message"], "no ack pending");
}

#[tokio::test]
async fn ack_out_of_range_is_rejected() {
    let ctx = TestContext::setup().await;
    create_topic(&ctx, &ctx.admin_token.clone(), "t").await;
    create_subscription(&ctx, &ctx.admin_token.clone(), "s", "t", None).await;
    publish(&ctx, &ctx.admin_token.clone(), "t", &["m1", "m2"]).await;

    let pull_path = format!("/v1/projects/{}/subscriptions/s:pull", ctx.project_name);
    let pull_body = json!({ "maxMessages": "10", "returnImmediately": "true" });
    ctx.send("POST", &pull_path, &ctx.consumer_token.clone(), Some(pull_body)).await;

    let ack_path = format!("/v1/projects/{}/subscriptions/s:acknowledge", ctx.project_name);
    let ack_body = json!({ "ackIds": [format!("projects/{}/subscriptions/s:5", ctx.project_name)] });
    let response = ctx.send("POST", &ack_path, &ctx.consumer_token.clone(), Some(ack_body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["message"], "wrong ack");
}

#[tokio::test]
async fn ack_after_deadline_times_out() {
    let ctx = TestContext::setup().await;
    create_topic(&ctx, &ctx.admin_token.clone(), "t").await;

    let path = format!("/v1/projects/{}/subscriptions/s", ctx.project_name);
    let body = json!({ "topic": "t", "ackDeadlineSeconds": 1 });
    let response = ctx.send("PUT", &path, &ctx.admin_token.clone(), Some(body)).await;
    assert_eq!(response.status(), StatusCode::OK);

    publish(&ctx, &ctx.admin_token.clone(), "t", &["m1"]).await;

    let pull_path = format!("/v1/projects/{}/subscriptions/s:pull", ctx.project_name);
    let pull_body = json!({ "maxMessages": "10", "returnImmediately": "true" });
    ctx.send("POST", &pull_path, &ctx.consumer_token.clone(), Some(pull_body)).await;

    tokio::time::sleep(std::time::Duration::from_millis(1_200)).await;

    let ack_path = format!("/v1/projects/{}/subscriptions/s:acknowledge", ctx.project_name);
    let ack_body = json!({ "ackIds": [format!("projects/{}/subscriptions/s:0", ctx.project_name)] });
    let response = ctx.send("POST", &ack_path, &ctx.consumer_token.clone(), Some(ack_body)).await;
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body_json(response).await["error"]["message"], "ack timeout");
}

#[tokio::test]
async fn duplicate_subscription_name_conflicts() {
    let ctx = TestContext::setup().await;
    create_topic(&ctx, &ctx.admin_token.clone(), "t").await;
    create_subscription(&ctx, &ctx.admin_token.clone(), "s", "t", None).await;

    let path = format!("/v1/projects/{}/subscriptions/s", ctx.project_name);
    let response = ctx.send("PUT", &path, &ctx.admin_token.clone(), Some(json!({ "topic": "t" }))).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["error"]["status"], "ALREADY_EXISTS");
}

#[tokio::test]
async fn push_lifecycle_tracks_config_changes() {
    let ctx = TestContext::setup().await;
    create_topic(&ctx, &ctx.admin_token.clone(), "t").await;
    create_subscription(&ctx, &ctx.admin_token.clone(), "s2", "t", Some("http://127.0.0.1:1/x")).await;

    let path = format!("/v1/projects/{}/subscriptions/s2", ctx.project_name);
    let response = ctx.send("GET", &path, &ctx.admin_token.clone(), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["pushConfig"]["pushEndpoint"].as_str().unwrap().contains("127.0.0.1"));
    assert!(ctx.push_manager.is_running(ctx.project_uuid, "s2").await);

    // Stop: modifyPushConfig with an empty endpoint.
    let modify_path = format!("/v1/projects/{}/subscriptions/s2:modifyPushConfig", ctx.project_name);
    let response = ctx.send("PUT", &modify_path, &ctx.admin_token.clone(), Some(json!({}))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["pushConfig"].is_null());
    assert!(!ctx.push_manager.is_running(ctx.project_uuid, "s2").await);

    // Restart: modifyPushConfig with a new endpoint.
    let response = ctx
        .send(
            "PUT",
            &modify_path,
            &ctx.admin_token.clone(),
            Some(json!({ "pushConfig": { "pushEndpoint": "http://127.0.0.1:1/y" } })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["pushConfig"]["pushEndpoint"], "http://127.0.0.1:1/y");
    assert!(ctx.push_manager.is_running(ctx.project_uuid, "s2").await);
}

#[tokio::test]
async fn unauthorized_token_is_rejected() {
    let ctx = TestContext::setup().await;
    let path = format!("/v1/projects/{}/topics", ctx.project_name);
    let response = ctx.send("GET", &path, "not-a-real-token", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"]["status"], "UNAUTHORIZED");
}

#[tokio::test]
async fn publisher_only_role_cannot_pull() {
    let ctx = TestContext::setup().await;
    create_topic(&ctx, &ctx.admin_token.clone(), "t").await;
    create_subscription(&ctx, &ctx.admin_token.clone(), "s", "t", None).await;

    let pull_path = format!("/v1/projects/{}/subscriptions/s:pull", ctx.project_name);
    let pull_body = json!({ "maxMessages": "1", "returnImmediately": "true" });
    let response = ctx.send("POST", &pull_path, &ctx.publisher_token.clone(), Some(pull_body)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn consumer_only_role_cannot_publish() {
    let ctx = TestContext::setup().await;
    create_topic(&ctx, &ctx.admin_token.clone(), "t").await;

    let publish_path = format!("/v1/projects/{}/topics/t:publish", ctx.project_name);
    let body = json!({ "messages": [{ "data": b64("m1") }] });
    let response = ctx.send("POST", &publish_path, &ctx.consumer_token.clone(), Some(body)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn publish_then_pull_preserves_order_and_ack_id_offsets() {
    let ctx = TestContext::setup().await;
    create_topic(&ctx, &ctx.admin_token.clone(), "t").await;
    create_subscription(&ctx, &ctx.admin_token.clone(), "s", "t", None).await;
    publish(&ctx, &ctx.admin_token.clone(), "t", &["first", "second", "third"]).await;

    let pull_path = format!("/v1/projects/{}/subscriptions/s:pull", ctx.project_name);
    let pull_body = json!({ "maxMessages": "10", "returnImmediately": "true" });
    let response = ctx.send("POST", &pull_path, &ctx.consumer_token.clone(), Some(pull_body)).await;
    let body = body_json(response).await;
    let received = body["receivedMessages"].as_array().unwrap();
    assert_eq!(received.len(), 3);

    let decode = |m: &serde_json::Value| -> String {
        let data = m["message"]["data"].as_str().unwrap();
        String::from_utf8(base64::engine::general_purpose::STANDARD.decode(data).unwrap()).unwrap()
    };
    assert_eq!(decode(&received[0]), "first");
    assert_eq!(decode(&received[1]), "second");
    assert_eq!(decode(&received[2]), "third");

    let project = &ctx.project_name;
    for (index, message) in received.iter().enumerate() {
        assert_eq!(message["ackId"], format!("projects/{project}/subscriptions/s:{index}"));
    }
}

#[tokio::test]
async fn publisher_only_caller_is_gated_by_the_topic_acl() {
    let ctx = TestContext::setup().await;
    create_topic(&ctx, &ctx.admin_token.clone(), "t").await;

    let acl_path = format!("/v1/projects/{}/topics/t:modifyAcl", ctx.project_name);
    ctx.send("PUT", &acl_path, &ctx.admin_token.clone(), Some(json!({ "users": ["admin"] }))).await;

    // "publisher" holds only the publisher role and isn't on the topic's ACL yet.
    let publish_path = format!("/v1/projects/{}/topics/t:publish", ctx.project_name);
    let body = json!({ "messages": [{ "data": b64("m1") }] });
    let response = ctx.send("POST", &publish_path, &ctx.publisher_token.clone(), Some(body.clone())).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    ctx.send("PUT", &acl_path, &ctx.admin_token.clone(), Some(json!({ "users": ["admin", "publisher"] }))).await;

    let response = ctx.send("POST", &publish_path, &ctx.publisher_token.clone(), Some(body)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn mod_acl_then_get_acl_round_trips() {
    let ctx = TestContext::setup().await;
    create_topic(&ctx, &ctx.admin_token.clone(), "t").await;

    let path = format!("/v1/projects/{}/topics/t:modifyAcl", ctx.project_name);
    let body = json!({ "users": ["publisher", "admin"] });
    let response = ctx.send("PUT", &path, &ctx.admin_token.clone(), Some(body)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let acl_path = format!("/v1/projects/{}/topics/t:acl", ctx.project_name);
    let response = ctx.send("GET", &acl_path, &ctx.admin_token.clone(), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let mut users: Vec<String> = body["users"].as_array().unwrap().iter().map(|v| v.as_str().unwrap().to_string()).collect();
    users.sort();
    assert_eq!(users, vec!["admin".to_string(), "publisher".to_string()]);
}
