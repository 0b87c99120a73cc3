mod common;

use axum::http::{header, StatusCode};
use chrono::{Duration, Utc};
use common::{bearer, error_code, TestApp};
use inkpost_api::services::moderation::REMOVED_PLACEHOLDER;
use inkpost_api::ApiConfig;
use inkpost_orm::{AnalyticsRepository, EventFilter};
use serde_json::{json, Value};

fn id(value: &Value) -> i64 {
    value["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_comment_tree_nests_replies() {
    let app = TestApp::new();
    let token = app.admin_token().await;
    let post = app.published_post(&token, "Threads").await;
    let post_id = id(&post);

    let root = app.create_comment(post_id, None, "root").await;
    let reply = app.create_comment(post_id, Some(id(&root)), "reply").await;
    app.create_comment(post_id, Some(id(&reply)), "nested").await;
    app.create_comment(post_id, None, "second root").await;

    let path = format!("/posts/{}/comments", post["slug"].as_str().unwrap());
    let body: Value = app.server.get(&path).await.json();
    assert_eq!(body["post_id"], post_id);
    assert_eq!(body["total"], 4);

    let roots = body["comments"].as_array().unwrap();
    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0]["content"], "root");
    assert_eq!(roots[0]["replies"][0]["content"], "reply");
    assert_eq!(roots[0]["replies"][0]["replies"][0]["content"], "nested");
    assert_eq!(roots[1]["content"], "second root");
    assert!(roots[1]["replies"].as_array().unwrap().is_empty());
    // readers never see commenter e-mail addresses
    assert!(roots[0].get("author_email").is_none());
}

#[tokio::test]
async fn test_parent_must_belong_to_same_post() {
    let app = TestApp::new();
    let token = app.admin_token().await;
    let first = app.published_post(&token, "First").await;
    let second = app.published_post(&token, "Second").await;
    let foreign = app.create_comment(id(&first), None, "elsewhere").await;

    let response = app
        .server
        .post("/comments")
        .json(&json!({
            "post_id": id(&second),
            "parent_id": id(&foreign),
            "author_name": "Reader",
            "author_email": "reader@example.com",
            "content": "reply",
        }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert!(body["error"]["fields"]["parent_id"].is_array());
}

#[tokio::test]
async fn test_comment_validation_and_hidden_posts() {
    let app = TestApp::new();
    let token = app.admin_token().await;
    let draft = app.create_post(&token, json!({ "title": "Draft", "content": "C" })).await;

    let invalid = app
        .server
        .post("/comments")
        .json(&json!({
            "post_id": id(&draft),
            "author_name": "",
            "author_email": "not-an-email",
            "content": "x".repeat(5001),
        }))
        .await;
    invalid.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = invalid.json();
    for field in ["author_name", "author_email", "content"] {
        assert!(body["error"]["fields"][field].is_array(), "{field}");
    }

    let hidden = app
        .server
        .post("/comments")
        .json(&json!({
            "post_id": id(&draft),
            "author_name": "Reader",
            "author_email": "reader@example.com",
            "content": "hello",
        }))
        .await;
    hidden.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(error_code(&hidden), "RESOURCE_NOT_FOUND");
}

#[tokio::test]
async fn test_pending_comments_are_hidden_until_approved() {
    let app = TestApp::with_config(ApiConfig {
        comments_require_approval: true,
        ..Default::default()
    });
    let token = app.admin_token().await;
    let post = app.published_post(&token, "Moderated").await;
    let comment = app.create_comment(id(&post), None, "awaiting review").await;
    assert_eq!(comment["status"], "pending");

    let public: Value = app
        .server
        .get("/comments")
        .add_query_param("post_id", id(&post))
        .await
        .json();
    assert_eq!(public["pagination"]["total"], 0);

    let pending: Value = app
        .server
        .get("/comments")
        .add_query_param("status", "pending")
        .await
        .json();
    assert!(pending["data"].as_array().unwrap().is_empty());

    let approved = app
        .server
        .put(&format!("/comments/{}", id(&comment)))
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "status": "approved" }))
        .await;
    approved.assert_status_ok();
    assert_eq!(approved.json::<Value>()["author_email"], "reader@example.com");

    let listed: Value = app
        .server
        .get("/comments")
        .add_query_param("post_id", id(&post))
        .await
        .json();
    assert_eq!(listed["pagination"]["total"], 1);
    assert_eq!(listed["data"][0]["post"]["slug"], post["slug"]);
}

#[tokio::test]
async fn test_update_requires_changes() {
    let app = TestApp::new();
    let token = app.admin_token().await;
    let post = app.published_post(&token, "Edits").await;
    let comment = app.create_comment(id(&post), None, "original").await;
    let path = format!("/comments/{}", id(&comment));

    let empty = app
        .server
        .put(&path)
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({}))
        .await;
    empty.assert_status(StatusCode::BAD_REQUEST);

    let reader = app.reader_token().await;
    app.server
        .put(&path)
        .add_header(header::AUTHORIZATION, bearer(&reader))
        .json(&json!({ "content": "edited" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    app.server
        .put("/comments/9999")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "content": "edited" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_soft_delete_keeps_thread_shape() {
    let app = TestApp::new();
    let token = app.admin_token().await;
    let post = app.published_post(&token, "Soft").await;
    let root = app.create_comment(id(&post), None, "rude words").await;
    app.create_comment(id(&post), Some(id(&root)), "reply").await;

    let response = app
        .server
        .delete(&format!("/comments/{}", id(&root)))
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();
    let moderated: Value = response.json();
    assert_eq!(moderated["status"], "deleted");
    assert_eq!(moderated["content"], REMOVED_PLACEHOLDER);
    assert_eq!(moderated["moderated_content"], "rude words");

    let path = format!("/posts/{}/comments", post["slug"].as_str().unwrap());
    let tree: Value = app.server.get(&path).await.json();
    assert_eq!(tree["total"], 2);
    assert_eq!(tree["comments"][0]["content"], REMOVED_PLACEHOLDER);
    assert!(tree["comments"][0].get("moderated_content").is_none());
    assert_eq!(tree["comments"][0]["replies"][0]["content"], "reply");
}

#[tokio::test]
async fn test_permanent_delete_promotes_replies() {
    let app = TestApp::new();
    let token = app.admin_token().await;
    let post = app.published_post(&token, "Hard").await;
    let root = app.create_comment(id(&post), None, "root").await;
    let middle = app.create_comment(id(&post), Some(id(&root)), "middle").await;
    let leaf = app.create_comment(id(&post), Some(id(&middle)), "leaf").await;

    app.server
        .delete(&format!("/comments/{}", id(&middle)))
        .add_query_param("mode", "permanent")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let path = format!("/posts/{}/comments", post["slug"].as_str().unwrap());
    let tree: Value = app.server.get(&path).await.json();
    assert_eq!(tree["total"], 2);
    assert_eq!(tree["comments"][0]["replies"][0]["id"], id(&leaf));

    app.server
        .delete(&format!("/comments/{}", id(&middle)))
        .add_query_param("mode", "permanent")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_comment_count() {
    let app = TestApp::new();
    let token = app.admin_token().await;
    let post = app.published_post(&token, "Counted").await;
    let other = app.published_post(&token, "Other").await;
    app.create_comment(id(&post), None, "one").await;
    app.create_comment(id(&post), None, "two").await;
    app.create_comment(id(&other), None, "three").await;

    let body: Value = app
        .server
        .get("/comments/count")
        .add_query_param("post_id", id(&post))
        .await
        .json();
    assert_eq!(body["count"], 2);

    let listed: Value = app.server.get(&format!("/posts/{}", post["slug"].as_str().unwrap())).await.json();
    assert_eq!(listed["comment_count"], 2);
}

#[tokio::test]
async fn test_comment_records_analytics_event() {
    let app = TestApp::new();
    let token = app.admin_token().await;
    let post = app.published_post(&token, "Tracked").await;
    app.create_comment(id(&post), None, "hi").await;

    let filter = EventFilter {
        event: Some("comment".into()),
        post_id: Some(id(&post)),
    };
    let events = app
        .store
        .events_since(Utc::now() - Duration::hours(1), &filter)
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].metadata_str("path"),
        Some(format!("/blog/{}", post["slug"].as_str().unwrap()).as_str())
    );
}

#[tokio::test]
async fn test_status_edit_to_deleted_uses_placeholder() {
    let app = TestApp::new();
    let token = app.admin_token().await;
    let post = app.published_post(&token, "Status edits").await;
    let comment = app.create_comment(id(&post), None, "rude words").await;
    let path = format!("/comments/{}", id(&comment));

    let response = app
        .server
        .put(&path)
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "status": "deleted" }))
        .await;
    response.assert_status_ok();
    let moderated: Value = response.json();
    assert_eq!(moderated["content"], REMOVED_PLACEHOLDER);
    assert_eq!(moderated["moderated_content"], "rude words");

    let tree: Value = app
        .server
        .get(&format!("/posts/{}/comments", post["slug"].as_str().unwrap()))
        .await
        .json();
    assert_eq!(tree["comments"][0]["status"], "deleted");
    assert_eq!(tree["comments"][0]["content"], REMOVED_PLACEHOLDER);

    let rewrite = app
        .server
        .put(&path)
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "content": "rude words again" }))
        .await;
    rewrite.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = rewrite.json();
    assert!(body["error"]["fields"]["content"].is_array());
}
