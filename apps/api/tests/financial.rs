mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_sale_moves_stock_and_cancel_restores_it() {
    let app = TestApp::new().await;
    let token = app.register_owner("owner@cafe.test").await;
    let latte = app.create_product(&token, "LATTE", 10).await;

    let (status, body) = app
        .post(
            "/api/sales",
            &token,
            json!({
                "items": [{"product_id": latte, "quantity": 3}],
                "paid_cents": 1000,
                "payment_method": "card"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let sale = &body["data"];
    assert_eq!(sale["total_cents"], 1350);
    assert_eq!(sale["remaining_cents"], 350);
    assert_eq!(sale["payment_status"], "partial");
    assert_eq!(sale["items"][0]["unit_price_cents"], 450);
    assert_eq!(app.stock_of(&token, &latte).await, 7.0);

    // Sales never touch the register.
    assert_eq!(app.balance(&token).await, 0);

    let sale_id = sale["id"].as_str().unwrap();
    let (status, body) = app
        .post(&format!("/api/sales/{}/cancel", sale_id), &token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], "cancelled");
    assert_eq!(body["data"]["paid_cents"], 1000);
    assert_eq!(app.stock_of(&token, &latte).await, 10.0);

    let (status, body) = app
        .post(&format!("/api/sales/{}/cancel", sale_id), &token, json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_STATE");
}

#[tokio::test]
async fn test_failed_sale_leaves_no_partial_stock_movement() {
    let app = TestApp::new().await;
    let token = app.register_owner("owner@cafe.test").await;
    let latte = app.create_product(&token, "LATTE", 10).await;
    let mocha = app.create_product(&token, "MOCHA", 1).await;

    let (status, body) = app
        .post(
            "/api/sales",
            &token,
            json!({
                "items": [
                    {"product_id": latte, "quantity": 4},
                    {"product_id": mocha, "quantity": 2}
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");
    assert_eq!(app.stock_of(&token, &latte).await, 10.0);
    assert_eq!(app.stock_of(&token, &mocha).await, 1.0);
}

#[tokio::test]
async fn test_sale_quantity_must_be_whole_units() {
    let app = TestApp::new().await;
    let token = app.register_owner("owner@cafe.test").await;
    let latte = app.create_product(&token, "LATTE", 10).await;

    let (status, body) = app
        .post(
            "/api/sales",
            &token,
            json!({"items": [{"product_id": latte, "quantity": 0.5}]}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "items[0].quantity");
}

#[tokio::test]
async fn test_out_of_range_amounts_are_rejected_not_wrapped() {
    let app = TestApp::new().await;
    let token = app.register_owner("owner@cafe.test").await;
    let latte = app.create_product(&token, "LATTE", 10).await;

    let (status, body) = app
        .post(
            "/api/sales",
            &token,
            json!({
                "items": [{"product_id": latte, "quantity": 1}],
                "tax_cents": i64::MAX
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert_eq!(app.stock_of(&token, &latte).await, 10.0);

    // 2^62 cents used to multiply out to a zero total
    let (status, body) = app
        .post(
            "/api/products",
            &token,
            json!({
                "code": "GOLD",
                "name": "Gold leaf",
                "price_cents": 4_611_686_018_427_387_904_i64,
                "cost_cents": 0,
                "stock_quantity": 10
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert_eq!(body["code"], "VALIDATION_FAILED");

    // A price at the cap is fine on its own but not times four
    let (status, body) = app
        .post(
            "/api/products",
            &token,
            json!({
                "code": "GOLD",
                "name": "Gold leaf",
                "price_cents": cafe_core::MAX_MONEY_CENTS,
                "cost_cents": 0,
                "stock_quantity": 10
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let gold = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .post(
            "/api/invoices",
            &token,
            json!({
                "invoice_type": "sale",
                "party": {"name": "Vault Ltd"},
                "items": [{"product_id": gold, "quantity": 4}]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert_eq!(body["code"], "INVALID_AMOUNT");
    assert_eq!(app.stock_of(&token, &gold).await, 10.0);
}

#[tokio::test]
async fn test_invoice_payments_mirror_to_cash_register() {
    let app = TestApp::new().await;
    let token = app.register_owner("owner@cafe.test").await;
    let latte = app.create_product(&token, "LATTE", 10).await;

    let (status, body) = app
        .post(
            "/api/invoices",
            &token,
            json!({
                "invoice_type": "sale",
                "party": {"name": "Office Ltd", "email": "billing@office.test"},
                "items": [{"product_id": latte, "quantity": 2}],
                "paid_cents": 400
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let invoice_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["status"], "confirmed");
    assert_eq!(body["data"]["total_cents"], 900);
    assert_eq!(app.stock_of(&token, &latte).await, 8.0);
    assert_eq!(app.balance(&token).await, 400);

    let (status, body) = app
        .post(
            &format!("/api/invoices/{}/payments", invoice_id),
            &token,
            json!({"paid_cents": 900}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["payment_status"], "paid");
    assert_eq!(app.balance(&token).await, 900);

    // The new paid amount must grow.
    let (status, body) = app
        .post(
            &format!("/api/invoices/{}/payments", invoice_id),
            &token,
            json!({"paid_cents": 500}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_AMOUNT");

    let (status, _) = app
        .post(&format!("/api/invoices/{}/cancel", invoice_id), &token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.stock_of(&token, &latte).await, 10.0);
    assert_eq!(app.balance(&token).await, 900);

    let (_, body) = app.get("/api/cash-register", &token).await;
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries
        .iter()
        .all(|e| e["reference"]["type"] == "invoice" && e["reference"]["id"] == invoice_id.as_str()));
}

#[tokio::test]
async fn test_draft_invoice_moves_nothing_until_confirmed() {
    let app = TestApp::new().await;
    let token = app.register_owner("owner@cafe.test").await;
    let beans = app.create_product(&token, "BEANS", 1).await;

    let (status, body) = app
        .post(
            "/api/invoices",
            &token,
            json!({
                "invoice_type": "purchase",
                "party": {"name": "Roastery"},
                "items": [{"product_id": beans, "quantity": 2.5}],
                "status": "draft"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let invoice_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(app.stock_of(&token, &beans).await, 1.0);

    let (status, body) = app
        .post(&format!("/api/invoices/{}/confirm", invoice_id), &token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], "confirmed");
    assert_eq!(app.stock_of(&token, &beans).await, 3.5);

    let (status, _) = app
        .post(&format!("/api/invoices/{}/void", invoice_id), &token, json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_expenses_keep_balance_in_step() {
    let app = TestApp::new().await;
    let token = app.register_owner("owner@cafe.test").await;

    let (status, _) = app
        .post(
            "/api/cash-register/transactions",
            &token,
            json!({"transaction_type": "deposit", "amount_cents": 10000, "category": "float"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .post(
            "/api/expenses",
            &token,
            json!({"description": "Milk", "amount_cents": 2500, "category": "supplies"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let expense_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(app.balance(&token).await, 7500);

    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/api/expenses/{}", expense_id),
            Some(&token),
            Some(json!({"amount_cents": 3000})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.balance(&token).await, 7000);

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/expenses/{}", expense_id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.balance(&token).await, 10000);
}

#[tokio::test]
async fn test_manual_withdrawal_cannot_overdraw() {
    let app = TestApp::new().await;
    let token = app.register_owner("owner@cafe.test").await;

    let (status, body) = app
        .post(
            "/api/cash-register/transactions",
            &token,
            json!({"transaction_type": "withdrawal", "amount_cents": 100, "category": "petty"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INSUFFICIENT_FUNDS");
    assert_eq!(app.balance(&token).await, 0);

    let (_, body) = app.get("/api/cash-register/summary", &token).await;
    assert_eq!(body["data"]["entry_count"], 0);
}

#[tokio::test]
async fn test_reports_cover_sales_and_expenses() {
    let app = TestApp::new().await;
    let token = app.register_owner("owner@cafe.test").await;
    let latte = app.create_product(&token, "LATTE", 10).await;

    app.post(
        "/api/sales",
        &token,
        json!({"items": [{"product_id": latte, "quantity": 2}], "paid_cents": 900}),
    )
    .await;
    app.post(
        "/api/expenses",
        &token,
        json!({"description": "Cups", "amount_cents": 200, "category": "supplies"}),
    )
    .await;

    let (status, body) = app.get("/api/reports/sales-summary", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["sale_count"], 1);
    assert_eq!(body["data"]["revenue_cents"], 900);

    let (_, body) = app.get("/api/reports/profit", &token).await;
    assert_eq!(body["data"]["revenue_cents"], 900);
    assert_eq!(body["data"]["cost_of_goods_cents"], 300);
    assert_eq!(body["data"]["expenses_cents"], 200);
    assert_eq!(body["data"]["net_profit_cents"], 400);

    let (_, body) = app.get("/api/reports/top-products?limit=5", &token).await;
    assert_eq!(body["data"][0]["product_id"], latte.as_str());

    let (status, body) = app.get("/api/reports/top-products?limit=0", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");

    let (status, _) = app
        .get("/api/reports/sales-summary?from=2026-05-02&to=2026-05-01", &token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
