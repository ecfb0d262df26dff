//! Cash register API handlers (`cash_register:manage`).
//!
//! The ledger is append-only from here: entries come from invoices,
//! expenses, and the manual transaction endpoint. Manual withdrawals may not
//! take the balance below zero.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use cafe_core::validation::{validate_notes, validate_positive_cents, validate_text};
use cafe_core::{CashTransactionType, Permission, ValidationError, ValidationErrors};
use cafe_db::{CashFilter, NewCashTransaction};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::response::{created, ok, ApiJson, ApiQuery};
use crate::routes::{date_range, non_blank};
use crate::AppState;

/// Largest page the ledger listing returns.
const MAX_LIST_LIMIT: i64 = 1_000;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/cash-register", get(list))
        .route("/api/cash-register/balance", get(balance))
        .route("/api/cash-register/summary", get(summary))
        .route("/api/cash-register/transactions", post(create_transaction))
}

#[derive(Debug, Default, Deserialize)]
pub struct CashQuery {
    pub transaction_type: Option<CashTransactionType>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    /// UTC day; today when absent.
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct CashTransactionRequest {
    pub transaction_type: CashTransactionType,
    pub amount_cents: i64,
    pub category: String,
    pub description: Option<String>,
}

impl CashTransactionRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_positive_cents("amount_cents", self.amount_cents));
        errors.check(validate_text("category", &self.category, 1, 100));
        errors.check(validate_notes("description", self.description.as_deref()));
        errors.into_result()
    }
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub balance_cents: i64,
}

/// GET /api/cash-register
async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<CashQuery>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::CashRegisterManage)?;

    if let Some(limit) = query.limit {
        if !(1..=MAX_LIST_LIMIT).contains(&limit) {
            return Err(ValidationError::OutOfRange {
                field: "limit".to_string(),
                min: 1,
                max: MAX_LIST_LIMIT,
            }
            .into());
        }
    }

    let filter = CashFilter {
        transaction_type: query.transaction_type,
        range: date_range(query.from, query.to)?,
        limit: query.limit,
    };
    let entries = state
        .db
        .cash_register()
        .list(user.owner_id(), &filter)
        .await?;
    Ok(ok(entries))
}

/// GET /api/cash-register/balance
async fn balance(State(state): State<AppState>, user: CurrentUser) -> ApiResult<impl IntoResponse> {
    user.require(Permission::CashRegisterManage)?;
    let balance = state.db.cash_register().balance(user.owner_id()).await?;
    Ok(ok(BalanceResponse {
        balance_cents: balance.cents(),
    }))
}

/// GET /api/cash-register/summary?date=YYYY-MM-DD
async fn summary(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<SummaryQuery>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::CashRegisterManage)?;
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let summary = state
        .db
        .cash_register()
        .daily_summary(user.owner_id(), date)
        .await?;
    Ok(ok(summary))
}

/// POST /api/cash-register/transactions
async fn create_transaction(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<CashTransactionRequest>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::CashRegisterManage)?;
    req.validate()?;

    let entry = state
        .db
        .recorder()
        .record_cash_transaction(
            user.owner_id(),
            &user.id,
            NewCashTransaction {
                transaction_type: req.transaction_type,
                amount_cents: req.amount_cents,
                category: req.category.trim().to_string(),
                description: non_blank(req.description),
            },
        )
        .await?;

    info!(
        entry_id = %entry.id,
        transaction_type = entry.transaction_type.as_str(),
        amount = entry.amount_cents,
        balance = entry.balance_cents,
        "Cash transaction recorded"
    );
    Ok(created("Transaction recorded", entry))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_request_validation() {
        let req: CashTransactionRequest = serde_json::from_str(
            r#"{"transaction_type": "withdrawal", "amount_cents": -5, "category": " "}"#,
        )
        .unwrap();
        let errors = req.validate().unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field().to_string()).collect();
        assert_eq!(fields, vec!["amount_cents", "category"]);
    }
}
