mod common;

use axum::http::{header, StatusCode};
use common::{bearer, TestApp};
use inkpost_api::services::notifications::WELCOME;
use serde_json::{json, Value};

#[tokio::test]
async fn test_subscribe_queues_welcome_email() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/subscribers")
        .json(&json!({ "email": "  New.Reader@Example.com " }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["status"], "created");
    assert_eq!(body["subscriber"]["email"], "new.reader@example.com");
    assert_eq!(body["subscriber"]["is_active"], true);
    assert_eq!(app.outbox.entries_of_kind(WELCOME).len(), 1);

    app.dispatch().await;
    let sent = app.mailer.sent_to("new.reader@example.com");
    assert_eq!(sent.len(), 1);
    assert!(sent[0].subject.starts_with("Welcome to"));
}

#[tokio::test]
async fn test_repeat_subscription_is_idempotent() {
    let app = TestApp::new();
    let body = json!({ "email": "reader@example.com" });

    app.server
        .post("/subscribers")
        .json(&body)
        .await
        .assert_status(StatusCode::CREATED);

    let again = app.server.post("/subscribers").json(&body).await;
    again.assert_status_ok();
    assert_eq!(again.json::<Value>()["status"], "already_subscribed");
    assert_eq!(app.outbox.entries_of_kind(WELCOME).len(), 1);
}

#[tokio::test]
async fn test_unsubscribe_and_reactivate() {
    let app = TestApp::new();
    let body = json!({ "email": "reader@example.com" });
    app.server.post("/subscribers").json(&body).await;

    let response = app.server.post("/subscribers/unsubscribe").json(&body).await;
    response.assert_status_ok();
    let count: Value = app.server.get("/subscribers/count").await.json();
    assert_eq!(count["count"], 0);

    let back = app.server.post("/subscribers").json(&body).await;
    back.assert_status_ok();
    let back: Value = back.json();
    assert_eq!(back["status"], "reactivated");
    assert_eq!(back["subscriber"]["is_active"], true);
    // no second welcome for a returning reader
    assert_eq!(app.outbox.entries_of_kind(WELCOME).len(), 1);

    app.server
        .post("/subscribers/unsubscribe")
        .json(&json!({ "email": "stranger@example.com" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_email_is_rejected() {
    let app = TestApp::new();
    for email in ["", "not-an-email"] {
        let response = app.server.post("/subscribers").json(&json!({ "email": email })).await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = response.json();
        assert!(body["error"]["fields"]["email"].is_array());
    }
    assert!(app.outbox.entries_of_kind(WELCOME).is_empty());
}

#[tokio::test]
async fn test_admin_lists_and_deletes_subscribers() {
    let app = TestApp::new();
    for email in ["one@example.com", "two@example.com"] {
        app.server.post("/subscribers").json(&json!({ "email": email })).await;
    }

    app.server.get("/subscribers").await.assert_status(StatusCode::UNAUTHORIZED);

    let token = app.admin_token().await;
    let listed: Value = app
        .server
        .get("/subscribers")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .json();
    let subscribers = listed.as_array().unwrap();
    assert_eq!(subscribers.len(), 2);

    let id = subscribers[0]["id"].as_i64().unwrap();
    let path = format!("/subscribers/{}", id);
    app.server
        .delete(&path)
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    app.server
        .delete(&path)
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let count: Value = app.server.get("/subscribers/count").await.json();
    assert_eq!(count["count"], 1);
}
