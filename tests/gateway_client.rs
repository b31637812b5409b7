// Gateway client contract tests against a local mock server: transport and
// decoding failures must collapse to None, JSON bodies (even error ones)
// stay Some, and every call carries the bearer secret.

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use setem_rust_ws::services::chip::ChipClient;

fn client_for(base_url: String) -> ChipClient {
    ChipClient::new(
        reqwest::Client::new(),
        base_url,
        "test-brand",
        "test-secret",
        vec!["fpx".to_string(), "card".to_string()],
    )
}

#[tokio::test]
async fn create_purchase_returns_body_and_sends_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/purchases/"))
        .and(header("Authorization", "Bearer test-secret"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "purchase-123",
            "status": "created",
            "checkout_url": "https://gate.chip-in.asia/p/purchase-123/",
        })))
        .mount(&server)
        .await;

    let chip = client_for(format!("{}/", server.uri()));
    let payload = json!({ "brand_id": "test-brand" });

    let purchase = chip.create_purchase(&payload).await.expect("Some body");
    assert_eq!(purchase["id"], "purchase-123");
    assert_eq!(
        purchase["checkout_url"],
        "https://gate.chip-in.asia/p/purchase-123/"
    );
}

#[tokio::test]
async fn create_purchase_forwards_the_payload() {
    let server = MockServer::start().await;

    let payload = json!({
        "brand_id": "test-brand",
        "purchase": {
            "currency": "MYR",
            "products": [{ "name": "Basic Package", "price": 2999, "quantity": 1 }],
        },
    });

    Mock::given(method("POST"))
        .and(path("/purchases/"))
        .and(body_json(&payload))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "p-1" })))
        .expect(1)
        .mount(&server)
        .await;

    let chip = client_for(format!("{}/", server.uri()));
    assert!(chip.create_purchase(&payload).await.is_some());
}

#[tokio::test]
async fn create_purchase_transport_error_is_none() {
    // Nothing listens on port 1; the connection itself fails.
    let chip = client_for("http://127.0.0.1:1/".to_string());
    let payload = json!({ "brand_id": "test-brand" });

    assert!(chip.create_purchase(&payload).await.is_none());
}

#[tokio::test]
async fn create_purchase_undecodable_body_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/purchases/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway down</html>"))
        .mount(&server)
        .await;

    let chip = client_for(format!("{}/", server.uri()));
    let payload = json!({ "brand_id": "test-brand" });

    assert!(chip.create_purchase(&payload).await.is_none());
}

#[tokio::test]
async fn create_purchase_json_error_body_is_still_some() {
    // The client does not police required fields; the caller does. A JSON
    // error body therefore comes back as Some and fails the id/checkout_url
    // extraction upstream.
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/purchases/"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid brand" })),
        )
        .mount(&server)
        .await;

    let chip = client_for(format!("{}/", server.uri()));
    let payload = json!({ "brand_id": "wrong" });

    let body = chip.create_purchase(&payload).await.expect("Some body");
    assert_eq!(body["error"], "invalid brand");
    assert!(body.get("id").is_none());
}

#[tokio::test]
async fn get_purchase_reports_gateway_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/purchases/purchase-123/"))
        .and(header("Authorization", "Bearer test-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "purchase-123",
            "status": "paid",
        })))
        .mount(&server)
        .await;

    let chip = client_for(format!("{}/", server.uri()));

    let purchase = chip.get_purchase("purchase-123").await.expect("Some body");
    assert_eq!(purchase["status"], "paid");
}

#[tokio::test]
async fn get_purchase_transport_error_is_none() {
    let chip = client_for("http://127.0.0.1:1/".to_string());
    assert!(chip.get_purchase("purchase-123").await.is_none());
}
