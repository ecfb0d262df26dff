//! Sales API handlers (`sales:manage`).
//!
//! ## Lifecycle
//! ```text
//! POST /api/sales ──► confirmed ──(PATCH paid/notes)──► confirmed
//!                         │
//!                         └──(POST /cancel)──► cancelled   stock restored
//! ```
//!
//! Sales never write cash-register entries.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use cafe_core::financial::LineRequest;
use cafe_core::validation::{
    validate_line_requests, validate_non_negative_cents, validate_notes, validate_percent_bps,
    validate_text, LineKind,
};
use cafe_core::{PaymentMethod, PaymentStatus, Permission, SaleStatus, ValidationErrors};
use cafe_db::{NewSale, SaleFilter, SaleUpdate};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::response::{created, ok, with_message, ApiJson, ApiQuery};
use crate::routes::{date_range, non_blank};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/sales", get(list).post(create))
        .route("/api/sales/{id}", get(get_by_id).patch(update))
        .route("/api/sales/{id}/cancel", post(cancel))
}

#[derive(Debug, Deserialize)]
pub struct CreateSaleRequest {
    pub items: Vec<LineRequest>,
    #[serde(default)]
    pub discount_bps: u32,
    #[serde(default)]
    pub tax_cents: i64,
    #[serde(default)]
    pub paid_cents: i64,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub customer_name: Option<String>,
    pub notes: Option<String>,
}

impl CreateSaleRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = validate_line_requests(LineKind::Sale, &self.items);
        errors.check(validate_percent_bps("discount_bps", self.discount_bps));
        errors.check(validate_non_negative_cents("tax_cents", self.tax_cents));
        errors.check(validate_non_negative_cents("paid_cents", self.paid_cents));
        if let Some(name) = &self.customer_name {
            errors.check(validate_text("customer_name", name, 0, 200));
        }
        errors.check(validate_notes("notes", self.notes.as_deref()));
        errors.into_result()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSaleRequest {
    pub paid_cents: Option<i64>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
}

impl UpdateSaleRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(paid) = self.paid_cents {
            errors.check(validate_non_negative_cents("paid_cents", paid));
        }
        errors.check(validate_notes("notes", self.notes.as_deref()));
        errors.into_result()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SaleQuery {
    pub status: Option<SaleStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// POST /api/sales
async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<CreateSaleRequest>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::SalesManage)?;
    req.validate()?;

    let sale = state
        .db
        .recorder()
        .record_sale(
            user.owner_id(),
            &user.id,
            NewSale {
                items: req.items,
                discount_bps: req.discount_bps,
                tax_cents: req.tax_cents,
                paid_cents: req.paid_cents,
                payment_method: req.payment_method,
                customer_name: non_blank(req.customer_name),
                notes: non_blank(req.notes),
            },
        )
        .await?;

    info!(
        sale_id = %sale.id,
        number = %sale.sale_number,
        total = sale.total_cents,
        "Sale recorded"
    );
    Ok(created("Sale recorded", sale))
}

/// GET /api/sales
async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<SaleQuery>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::SalesManage)?;

    let filter = SaleFilter {
        status: query.status,
        payment_status: query.payment_status,
        range: date_range(query.from, query.to)?,
    };
    let sales = state.db.sales().list(user.owner_id(), &filter).await?;
    Ok(ok(sales))
}

/// GET /api/sales/{id}
async fn get_by_id(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::SalesManage)?;
    let sale = state.db.sales().find(user.owner_id(), &id).await?;
    Ok(ok(sale))
}

/// PATCH /api/sales/{id}
async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateSaleRequest>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::SalesManage)?;
    req.validate()?;

    let sale = state
        .db
        .recorder()
        .update_sale(
            user.owner_id(),
            &id,
            SaleUpdate {
                paid_cents: req.paid_cents,
                payment_method: req.payment_method,
                notes: req.notes,
            },
        )
        .await?;

    Ok(with_message("Sale updated", sale))
}

/// POST /api/sales/{id}/cancel
async fn cancel(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::SalesManage)?;
    let sale = state.db.recorder().cancel_sale(user.owner_id(), &id).await?;

    info!(sale_id = %sale.id, "Sale cancelled");
    Ok(with_message("Sale cancelled", sale))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cafe_core::Quantity;

    const PRODUCT_ID: &str = "550e8400-e29b-41d4-a716-446655440000";

    #[test]
    fn test_sale_lines_must_be_whole() {
        let req = CreateSaleRequest {
            items: vec![LineRequest {
                product_id: PRODUCT_ID.to_string(),
                quantity: Quantity::from_hundredths(150),
                discount_bps: 0,
            }],
            discount_bps: 0,
            tax_cents: 0,
            paid_cents: 0,
            payment_method: PaymentMethod::Cash,
            customer_name: None,
            notes: None,
        };
        let errors = req.validate().unwrap_err();
        assert_eq!(errors.iter().next().unwrap().field(), "items[0].quantity");
    }

    #[test]
    fn test_empty_sale_rejected() {
        let req: CreateSaleRequest = serde_json::from_str(r#"{"items": []}"#).unwrap();
        let errors = req.validate().unwrap_err();
        assert_eq!(errors.iter().next().unwrap().field(), "items");
    }
}
