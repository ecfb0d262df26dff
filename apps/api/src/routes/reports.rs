//! Report handlers (`reports:view`, read-only).

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use cafe_core::{Permission, ValidationError};
use cafe_db::repository::report::DEFAULT_TOP_PRODUCTS;
use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::response::{ok, ApiQuery};
use crate::routes::date_range;
use crate::AppState;

const MAX_TOP_PRODUCTS: i64 = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/reports/sales-summary", get(sales_summary))
        .route(
            "/api/reports/sales-by-payment-method",
            get(sales_by_payment_method),
        )
        .route("/api/reports/monthly-revenue", get(monthly_revenue))
        .route("/api/reports/expenses-by-category", get(expenses_by_category))
        .route("/api/reports/top-products", get(top_products))
        .route("/api/reports/profit", get(profit))
}

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct YearQuery {
    pub year: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

/// GET /api/reports/sales-summary
async fn sales_summary(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<RangeQuery>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::ReportsView)?;
    let range = date_range(query.from, query.to)?;
    let summary = state
        .db
        .reports()
        .sales_summary(user.owner_id(), range)
        .await?;
    Ok(ok(summary))
}

/// GET /api/reports/sales-by-payment-method
async fn sales_by_payment_method(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<RangeQuery>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::ReportsView)?;
    let range = date_range(query.from, query.to)?;
    let totals = state
        .db
        .reports()
        .sales_by_payment_method(user.owner_id(), range)
        .await?;
    Ok(ok(totals))
}

/// GET /api/reports/monthly-revenue?year=
async fn monthly_revenue(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<YearQuery>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::ReportsView)?;
    let year = query.year.unwrap_or_else(|| Utc::now().year());
    if !(2000..=2100).contains(&year) {
        return Err(ValidationError::OutOfRange {
            field: "year".to_string(),
            min: 2000,
            max: 2100,
        }
        .into());
    }

    let months = state
        .db
        .reports()
        .monthly_revenue(user.owner_id(), year)
        .await?;
    Ok(ok(months))
}

/// GET /api/reports/expenses-by-category
async fn expenses_by_category(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<RangeQuery>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::ReportsView)?;
    date_range(query.from, query.to)?;
    let totals = state
        .db
        .reports()
        .expenses_by_category(user.owner_id(), query.from, query.to)
        .await?;
    Ok(ok(totals))
}

/// GET /api/reports/top-products?limit=
async fn top_products(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::ReportsView)?;
    let limit = query.limit.unwrap_or(DEFAULT_TOP_PRODUCTS);
    if !(1..=MAX_TOP_PRODUCTS).contains(&limit) {
        return Err(ValidationError::OutOfRange {
            field: "limit".to_string(),
            min: 1,
            max: MAX_TOP_PRODUCTS,
        }
        .into());
    }

    let products = state
        .db
        .reports()
        .top_products(user.owner_id(), limit)
        .await?;
    Ok(ok(products))
}

/// GET /api/reports/profit
async fn profit(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<RangeQuery>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::ReportsView)?;
    let range = date_range(query.from, query.to)?;
    let report = state.db.reports().profit(user.owner_id(), range).await?;
    Ok(ok(report))
}
