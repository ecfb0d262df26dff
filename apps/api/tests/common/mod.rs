//! Shared harness: an in-memory database behind the full router.

#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use cafe_api::{build_app, ApiConfig, AppState};
use cafe_db::{Database, DbConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

pub struct TestApp {
    router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let state = AppState::new(db, ApiConfig::default());
        TestApp {
            router: build_app(state),
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    /// Registers a cafe owner and returns the bearer token.
    pub async fn register_owner(&self, email: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "name": "Owner",
                    "email": email,
                    "password": "correct-horse"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["token"].as_str().unwrap().to_string()
    }

    /// Creates a product and returns its id.
    pub async fn create_product(&self, token: &str, code: &str, stock: i64) -> String {
        let (status, body) = self
            .post(
                "/api/products",
                token,
                json!({
                    "code": code,
                    "name": format!("Product {}", code),
                    "category": "drinks",
                    "price_cents": 450,
                    "cost_cents": 150,
                    "stock_quantity": stock,
                    "minimum_stock": 2
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    pub async fn stock_of(&self, token: &str, product_id: &str) -> f64 {
        let (status, body) = self
            .get(&format!("/api/products/{}", product_id), token)
            .await;
        assert_eq!(status, StatusCode::OK);
        body["data"]["stock_quantity"].as_f64().unwrap()
    }

    pub async fn balance(&self, token: &str) -> i64 {
        let (status, body) = self.get("/api/cash-register/balance", token).await;
        assert_eq!(status, StatusCode::OK);
        body["data"]["balance_cents"].as_i64().unwrap()
    }
}
