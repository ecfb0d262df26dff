//! Invoice API handlers (`invoices:manage`).
//!
//! ## Lifecycle
//! ```text
//!            POST /confirm
//!   draft ─────────────────► confirmed ──(POST /payments)──► confirmed
//!     │                         │
//!     │ POST /void              │ POST /cancel
//!     ▼                         ▼
//!   void                    cancelled   stock reversed, cash kept
//! ```
//!
//! Confirmation moves stock (sale: out, purchase: in) and mirrors any paid
//! amount to the cash register in the same transaction.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use cafe_core::financial::LineRequest;
use cafe_core::validation::{
    validate_email, validate_line_requests, validate_non_negative_cents, validate_notes,
    validate_percent_bps, validate_text, LineKind,
};
use cafe_core::{
    InvoiceStatus, InvoiceType, Party, PaymentMethod, PaymentStatus, Permission, ValidationError,
    ValidationErrors,
};
use cafe_db::{InvoiceDetails, InvoiceFilter, InvoicePayment, NewInvoice};
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
        .route("/api/invoices", get(list).post(create))
        .route("/api/invoices/{id}", get(get_by_id).patch(update))
        .route("/api/invoices/{id}/confirm", post(confirm))
        .route("/api/invoices/{id}/payments", post(add_payment))
        .route("/api/invoices/{id}/cancel", post(cancel))
        .route("/api/invoices/{id}/void", post(void))
}

#[derive(Debug, Deserialize)]
pub struct CreateInvoiceRequest {
    pub invoice_type: InvoiceType,
    pub party: Party,
    pub items: Vec<LineRequest>,
    #[serde(default)]
    pub discount_bps: u32,
    #[serde(default)]
    pub tax_cents: i64,
    #[serde(default)]
    pub paid_cents: i64,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    /// `draft` or `confirmed` (default).
    pub status: Option<InvoiceStatus>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl CreateInvoiceRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = validate_line_requests(LineKind::Invoice, &self.items);
        validate_party(&self.party, &mut errors);
        errors.check(validate_percent_bps("discount_bps", self.discount_bps));
        errors.check(validate_non_negative_cents("tax_cents", self.tax_cents));
        errors.check(validate_non_negative_cents("paid_cents", self.paid_cents));
        errors.check(validate_notes("notes", self.notes.as_deref()));

        if let Some(status) = self.status {
            if !matches!(status, InvoiceStatus::Draft | InvoiceStatus::Confirmed) {
                errors.push(ValidationError::NotAllowed {
                    field: "status".to_string(),
                    allowed: vec!["draft".to_string(), "confirmed".to_string()],
                });
            }
        }
        errors.into_result()
    }
}

fn validate_party(party: &Party, errors: &mut ValidationErrors) {
    if let Err(err) = validate_text("name", &party.name, 1, 200) {
        errors.push(err.within("party"));
    }
    if let Some(email) = party.email.as_deref().filter(|e| !e.trim().is_empty()) {
        if let Err(err) = validate_email(email) {
            errors.push(err.within("party"));
        }
    }
    if let Some(phone) = &party.phone {
        if let Err(err) = validate_text("phone", phone, 0, 50) {
            errors.push(err.within("party"));
        }
    }
    if let Some(address) = &party.address {
        if let Err(err) = validate_text("address", address, 0, 500) {
            errors.push(err.within("party"));
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateInvoiceRequest {
    pub notes: Option<String>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    /// New cumulative paid amount; must exceed the current one.
    pub paid_cents: i64,
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InvoiceQuery {
    pub invoice_type: Option<InvoiceType>,
    pub status: Option<InvoiceStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// POST /api/invoices
async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<CreateInvoiceRequest>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::InvoicesManage)?;
    req.validate()?;

    let party = Party {
        name: req.party.name.trim().to_string(),
        phone: non_blank(req.party.phone),
        email: non_blank(req.party.email),
        address: non_blank(req.party.address),
    };
    let invoice = state
        .db
        .recorder()
        .record_invoice(
            user.owner_id(),
            &user.id,
            NewInvoice {
                invoice_type: req.invoice_type,
                party,
                items: req.items,
                discount_bps: req.discount_bps,
                tax_cents: req.tax_cents,
                paid_cents: req.paid_cents,
                payment_method: req.payment_method,
                status: req.status.unwrap_or(InvoiceStatus::Confirmed),
                due_date: req.due_date,
                notes: non_blank(req.notes),
            },
        )
        .await?;

    info!(
        invoice_id = %invoice.id,
        number = %invoice.invoice_number,
        invoice_type = invoice.invoice_type.as_str(),
        status = %invoice.status,
        "Invoice recorded"
    );
    Ok(created("Invoice recorded", invoice))
}

/// GET /api/invoices
async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<InvoiceQuery>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::InvoicesManage)?;

    let filter = InvoiceFilter {
        invoice_type: query.invoice_type,
        status: query.status,
        payment_status: query.payment_status,
        range: date_range(query.from, query.to)?,
    };
    let invoices = state.db.invoices().list(user.owner_id(), &filter).await?;
    Ok(ok(invoices))
}

/// GET /api/invoices/{id}
async fn get_by_id(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::InvoicesManage)?;
    let invoice = state.db.invoices().find(user.owner_id(), &id).await?;
    Ok(ok(invoice))
}

/// PATCH /api/invoices/{id}
async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateInvoiceRequest>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::InvoicesManage)?;
    validate_notes("notes", req.notes.as_deref())?;

    let invoice = state
        .db
        .invoices()
        .update_details(
            user.owner_id(),
            &id,
            InvoiceDetails {
                notes: req.notes,
                due_date: req.due_date,
            },
        )
        .await?;

    Ok(with_message("Invoice updated", invoice))
}

/// POST /api/invoices/{id}/confirm
async fn confirm(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::InvoicesManage)?;
    let invoice = state
        .db
        .recorder()
        .confirm_invoice(user.owner_id(), &user.id, &id)
        .await?;

    info!(invoice_id = %invoice.id, "Invoice confirmed");
    Ok(with_message("Invoice confirmed", invoice))
}

/// POST /api/invoices/{id}/payments
async fn add_payment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<PaymentRequest>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::InvoicesManage)?;
    validate_non_negative_cents("paid_cents", req.paid_cents)?;

    let invoice = state
        .db
        .recorder()
        .add_invoice_payment(
            user.owner_id(),
            &user.id,
            &id,
            InvoicePayment {
                paid_cents: req.paid_cents,
                payment_method: req.payment_method,
            },
        )
        .await?;

    info!(
        invoice_id = %invoice.id,
        paid = invoice.paid_cents,
        remaining = invoice.remaining_cents,
        "Invoice payment recorded"
    );
    Ok(with_message("Payment recorded", invoice))
}

/// POST /api/invoices/{id}/cancel
async fn cancel(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::InvoicesManage)?;
    let invoice = state
        .db
        .recorder()
        .cancel_invoice(user.owner_id(), &id)
        .await?;

    info!(invoice_id = %invoice.id, "Invoice cancelled");
    Ok(with_message("Invoice cancelled", invoice))
}

/// POST /api/invoices/{id}/void
async fn void(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::InvoicesManage)?;
    let invoice = state.db.recorder().void_invoice(user.owner_id(), &id).await?;

    info!(invoice_id = %invoice.id, "Invoice voided");
    Ok(with_message("Invoice voided", invoice))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_accepts_fractional_lines() {
        let req: CreateInvoiceRequest = serde_json::from_str(
            r#"{
                "invoice_type": "purchase",
                "party": {"name": "Roastery"},
                "items": [{"product_id": "550e8400-e29b-41d4-a716-446655440000", "quantity": 0.25}]
            }"#,
        )
        .unwrap();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_party_and_status_checked() {
        let req: CreateInvoiceRequest = serde_json::from_str(
            r#"{
                "invoice_type": "sale",
                "party": {"name": "", "email": "bad"},
                "items": [{"product_id": "550e8400-e29b-41d4-a716-446655440000", "quantity": 1}],
                "status": "void"
            }"#,
        )
        .unwrap();
        let errors = req.validate().unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field().to_string()).collect();
        assert_eq!(fields, vec!["party.name", "party.email", "status"]);
    }
}
