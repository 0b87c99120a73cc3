mod common;

use axum::http::{header, HeaderValue, StatusCode};
use common::{bearer, forwarded_for, TestApp};
use serde_json::{json, Value};

impl TestApp {
    async fn page_view(&self, ip: &'static str, path: &str, referrer: Option<&str>) -> Value {
        let (name, value) = forwarded_for(ip);
        let response = self
            .server
            .post("/analytics")
            .add_header(name, value)
            .json(&json!({
                "event": "page_view",
                "metadata": { "path": path, "referrer": referrer },
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json()
    }
}

#[tokio::test]
async fn test_event_captures_client_details() {
    let app = TestApp::new();
    let (name, value) = forwarded_for("203.0.113.7, 10.0.0.1");

    let response = app
        .server
        .post("/analytics")
        .add_header(name, value)
        .add_header(header::USER_AGENT, HeaderValue::from_static("test-agent/1.0"))
        .json(&json!({ "event": "page_view", "metadata": { "path": "/" } }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let event: Value = response.json();
    assert_eq!(event["event"], "page_view");
    assert_eq!(event["ip_address"], "203.0.113.7");
    assert_eq!(event["user_agent"], "test-agent/1.0");
    assert_eq!(event["metadata"]["path"], "/");
}

#[tokio::test]
async fn test_unknown_post_is_unlinked() {
    let app = TestApp::new();
    let token = app.admin_token().await;
    let post = app.published_post(&token, "Tracked").await;

    let linked: Value = app
        .server
        .post("/analytics")
        .json(&json!({ "event": "page_view", "post_id": post["id"] }))
        .await
        .json();
    assert_eq!(linked["post_id"], post["id"]);

    let response = app
        .server
        .post("/analytics")
        .json(&json!({ "event": "page_view", "post_id": 424242 }))
        .await;
    response.assert_status(StatusCode::CREATED);
    assert!(response.json::<Value>()["post_id"].is_null());
}

#[tokio::test]
async fn test_event_validation() {
    let app = TestApp::new();

    let missing = app.server.post("/analytics").json(&json!({ "event": " " })).await;
    missing.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let scalar = app
        .server
        .post("/analytics")
        .json(&json!({ "event": "page_view", "metadata": [1, 2] }))
        .await;
    scalar.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = scalar.json();
    assert!(body["error"]["fields"]["metadata"].is_array());
}

#[tokio::test]
async fn test_summary_is_admin_only() {
    let app = TestApp::new();
    app.server.get("/analytics").await.assert_status(StatusCode::UNAUTHORIZED);
    app.server
        .get("/analytics/visitors")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let reader = app.reader_token().await;
    app.server
        .get("/analytics")
        .add_header(header::AUTHORIZATION, bearer(&reader))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_summary_counts_todays_visitors() {
    let app = TestApp::new();
    app.page_view("198.51.100.1", "/blog/a", Some("https://www.google.com/search")).await;
    app.page_view("198.51.100.1", "/blog/a", None).await;
    app.page_view("198.51.100.2", "/blog/b", Some("https://t.co/xyz")).await;

    let token = app.admin_token().await;
    let summary: Value = app
        .server
        .get("/analytics")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .json();

    assert_eq!(summary["current_period"]["total_visitors"], 2);
    assert_eq!(summary["current_period"]["page_visitors"], 2);
    assert_eq!(summary["current_period"]["comment_visitors"], 0);
    assert_eq!(summary["previous_period"]["total_visitors"], 0);

    let top = summary["top_pages"].as_array().unwrap();
    assert_eq!(top[0]["page"], "/blog/a");
    assert_eq!(top[0]["views"], 2);
    assert_eq!(top[0]["percentage"], 67);
    assert_eq!(top[1]["page"], "/blog/b");

    let sources: Vec<&str> = summary["traffic_sources"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|s| s["source"].as_str())
        .collect();
    assert!(sources.contains(&"Search Engines"));
    assert!(sources.contains(&"Social Media"));
    assert!(sources.contains(&"Direct"));
}

#[tokio::test]
async fn test_visitor_series_covers_thirty_days() {
    let app = TestApp::new();
    app.page_view("198.51.100.1", "/", None).await;
    app.page_view("198.51.100.2", "/", None).await;

    let token = app.admin_token().await;
    let series: Value = app
        .server
        .get("/analytics/visitors")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .json();

    let current = series["current_period"].as_array().unwrap();
    let previous = series["previous_period"].as_array().unwrap();
    assert_eq!(current.len(), 30);
    assert_eq!(previous.len(), 30);
    // the login above is not an analytics event
    assert_eq!(current.last().unwrap()["count"], 2);
    assert!(previous.iter().all(|day| day["count"] == 0));
}
