//! Expense API handlers (`expenses:manage`).
//!
//! Each expense owns exactly one withdrawal entry in the cash register.
//! Updating the amount rewrites that entry; deleting the expense removes
//! it and credits the amount back.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use cafe_core::validation::{validate_notes, validate_positive_cents, validate_text};
use cafe_core::{ExpenseCategory, PaymentMethod, Permission, Recurrence, ValidationErrors};
use cafe_db::{ExpenseFilter, ExpenseUpdate, NewExpense};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::response::{created, done, ok, with_message, ApiJson, ApiQuery};
use crate::routes::{date_range, non_blank};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/expenses", get(list).post(create))
        .route(
            "/api/expenses/{id}",
            get(get_by_id).put(update).delete(delete),
        )
}

#[derive(Debug, Deserialize)]
pub struct CreateExpenseRequest {
    pub description: String,
    pub amount_cents: i64,
    pub category: ExpenseCategory,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub expense_date: Option<NaiveDate>,
    pub recurrence: Option<Recurrence>,
    pub notes: Option<String>,
}

impl CreateExpenseRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_text("description", &self.description, 1, 500));
        errors.check(validate_positive_cents("amount_cents", self.amount_cents));
        errors.check(validate_notes("notes", self.notes.as_deref()));
        errors.into_result()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateExpenseRequest {
    pub description: Option<String>,
    pub amount_cents: Option<i64>,
    pub category: Option<ExpenseCategory>,
    pub payment_method: Option<PaymentMethod>,
    pub expense_date: Option<NaiveDate>,
    pub recurrence: Option<Recurrence>,
    pub notes: Option<String>,
}

impl UpdateExpenseRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(description) = &self.description {
            errors.check(validate_text("description", description, 1, 500));
        }
        if let Some(amount) = self.amount_cents {
            errors.check(validate_positive_cents("amount_cents", amount));
        }
        errors.check(validate_notes("notes", self.notes.as_deref()));
        errors.into_result()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ExpenseQuery {
    pub category: Option<ExpenseCategory>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// POST /api/expenses
async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<CreateExpenseRequest>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::ExpensesManage)?;
    req.validate()?;

    let expense = state
        .db
        .recorder()
        .record_expense(
            user.owner_id(),
            &user.id,
            NewExpense {
                description: req.description.trim().to_string(),
                amount_cents: req.amount_cents,
                category: req.category,
                payment_method: req.payment_method,
                expense_date: req.expense_date,
                recurrence: req.recurrence,
                notes: non_blank(req.notes),
            },
        )
        .await?;

    info!(
        expense_id = %expense.id,
        amount = expense.amount_cents,
        category = expense.category.as_str(),
        "Expense recorded"
    );
    Ok(created("Expense recorded", expense))
}

/// GET /api/expenses
async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<ExpenseQuery>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::ExpensesManage)?;
    date_range(query.from, query.to)?;

    let filter = ExpenseFilter {
        category: query.category,
        from: query.from,
        to: query.to,
    };
    let expenses = state.db.expenses().list(user.owner_id(), &filter).await?;
    Ok(ok(expenses))
}

/// GET /api/expenses/{id}
async fn get_by_id(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::ExpensesManage)?;
    let expense = state.db.expenses().find(user.owner_id(), &id).await?;
    Ok(ok(expense))
}

/// PUT /api/expenses/{id}
async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateExpenseRequest>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::ExpensesManage)?;
    req.validate()?;

    let expense = state
        .db
        .recorder()
        .update_expense(
            user.owner_id(),
            &id,
            ExpenseUpdate {
                description: req.description.map(|d| d.trim().to_string()),
                amount_cents: req.amount_cents,
                category: req.category,
                payment_method: req.payment_method,
                expense_date: req.expense_date,
                recurrence: req.recurrence,
                notes: req.notes,
            },
        )
        .await?;

    Ok(with_message("Expense updated", expense))
}

/// DELETE /api/expenses/{id}
async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::ExpensesManage)?;
    state
        .db
        .recorder()
        .delete_expense(user.owner_id(), &id)
        .await?;

    info!(expense_id = %id, "Expense deleted");
    Ok(done("Expense deleted"))
}
