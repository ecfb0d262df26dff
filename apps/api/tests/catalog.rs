mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_product_crud_and_filters() {
    let app = TestApp::new().await;
    let token = app.register_owner("owner@cafe.test").await;
    let latte = app.create_product(&token, "LATTE", 10).await;
    app.create_product(&token, "MOCHA", 1).await;

    let (status, body) = app.get("/api/products?search=latte", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["code"], "LATTE");

    let (_, body) = app.get("/api/products/low-stock", &token).await;
    let low: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["code"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(low, vec!["MOCHA"]);

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/api/products/{}", latte),
            Some(&token),
            Some(json!({"price_cents": 500})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["price_cents"], 500);

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/products/{}", latte),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get("/api/products?active=true", &token).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_duplicate_code_conflicts() {
    let app = TestApp::new().await;
    let token = app.register_owner("owner@cafe.test").await;
    app.create_product(&token, "LATTE", 10).await;

    let (status, body) = app
        .post(
            "/api/products",
            &token,
            json!({"code": "LATTE", "name": "Second latte", "price_cents": 100}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DUPLICATE_KEY");
}

#[tokio::test]
async fn test_stock_adjustment_never_goes_negative() {
    let app = TestApp::new().await;
    let token = app.register_owner("owner@cafe.test").await;
    let beans = app.create_product(&token, "BEANS", 5).await;

    let (status, body) = app
        .post(
            &format!("/api/products/{}/stock", beans),
            &token,
            json!({"delta": 2.5, "reason": "delivery"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(app.stock_of(&token, &beans).await, 7.5);

    let (status, body) = app
        .post(
            &format!("/api/products/{}/stock", beans),
            &token,
            json!({"delta": -8}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");
    assert_eq!(app.stock_of(&token, &beans).await, 7.5);
}

#[tokio::test]
async fn test_owners_do_not_see_each_other() {
    let app = TestApp::new().await;
    let first = app.register_owner("first@cafe.test").await;
    let second = app.register_owner("second@cafe.test").await;
    let latte = app.create_product(&first, "LATTE", 10).await;

    let (status, body) = app.get(&format!("/api/products/{}", latte), &second).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (_, body) = app.get("/api/products", &second).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    // Codes are unique per owner only.
    app.create_product(&second, "LATTE", 3).await;
}

#[tokio::test]
async fn test_malformed_body_uses_envelope() {
    let app = TestApp::new().await;
    let token = app.register_owner("owner@cafe.test").await;

    let (status, body) = app
        .post("/api/products", &token, json!({"code": "X"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "VALIDATION_FAILED");
}
