mod common;

use common::TestApp;

#[tokio::test]
async fn health_check_works() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "subscription-service");
}

#[tokio::test]
async fn readiness_check_works() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/ready", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
}

#[tokio::test]
async fn metrics_are_exposed() {
    let app = TestApp::spawn().await;

    app.client
        .get(format!("{}/subscriptions", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    let response = app
        .client
        .get(format!("{}/metrics", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    let body = response.text().await.expect("Failed to read body");
    assert!(body.contains("subscription_operations_total"));
}

#[tokio::test]
async fn create_and_fetch_over_http() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(format!("{}/subscriptions", app.address))
        .json(&serde_json::json!({
            "service_name": "Yandex Plus",
            "price": 400,
            "user_id": common::OWNER,
            "start_date": "07-2025"
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);

    let created: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    let id = created["id"].as_str().expect("id missing").to_string();

    let fetched: serde_json::Value = app
        .client
        .get(format!("{}/subscription/{}", app.address, id))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");
    assert_eq!(fetched, created);
}
