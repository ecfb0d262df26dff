//! # Invoice Repository
//!
//! Invoice reads and the one non-financial write: editing notes and the due
//! date. Everything that moves stock or cash goes through the
//! [`FinancialRecorder`](crate::recorder::FinancialRecorder).

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{begin_write, from_json, to_json, DateRange};
use cafe_core::{Invoice, InvoiceStatus, InvoiceType, PaymentMethod, PaymentStatus};

const INVOICE_COLUMNS: &str = "id, owner_id, invoice_number, invoice_type, party, items, \
     subtotal_cents, discount_bps, tax_cents, total_cents, paid_cents, remaining_cents, \
     payment_status, payment_method, status, due_date, notes, created_by, created_at, \
     updated_at, confirmed_at, cancelled_at";

#[derive(Debug, FromRow)]
struct InvoiceRow {
    id: String,
    owner_id: String,
    invoice_number: String,
    invoice_type: InvoiceType,
    party: String,
    items: String,
    subtotal_cents: i64,
    discount_bps: i64,
    tax_cents: i64,
    total_cents: i64,
    paid_cents: i64,
    remaining_cents: i64,
    payment_status: PaymentStatus,
    payment_method: PaymentMethod,
    status: InvoiceStatus,
    due_date: Option<NaiveDate>,
    notes: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    confirmed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = DbError;

    fn try_from(row: InvoiceRow) -> DbResult<Self> {
        Ok(Invoice {
            id: row.id,
            owner_id: row.owner_id,
            invoice_number: row.invoice_number,
            invoice_type: row.invoice_type,
            party: from_json(&row.party)?,
            items: from_json(&row.items)?,
            subtotal_cents: row.subtotal_cents,
            discount_bps: row.discount_bps as u32,
            tax_cents: row.tax_cents,
            total_cents: row.total_cents,
            paid_cents: row.paid_cents,
            remaining_cents: row.remaining_cents,
            payment_status: row.payment_status,
            payment_method: row.payment_method,
            status: row.status,
            due_date: row.due_date,
            notes: row.notes,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            confirmed_at: row.confirmed_at,
            cancelled_at: row.cancelled_at,
        })
    }
}

/// List filters.
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    pub invoice_type: Option<InvoiceType>,
    pub status: Option<InvoiceStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub range: DateRange,
}

/// Editable invoice details. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct InvoiceDetails {
    pub notes: Option<String>,
    pub due_date: Option<NaiveDate>,
}

/// Repository for invoice reads.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    pub async fn get(&self, owner_id: &str, id: &str) -> DbResult<Option<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        fetch_invoice_opt(&mut conn, owner_id, id).await
    }

    pub async fn find(&self, owner_id: &str, id: &str) -> DbResult<Invoice> {
        self.get(owner_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", id))
    }

    /// Lists invoices, newest first.
    pub async fn list(&self, owner_id: &str, filter: &InvoiceFilter) -> DbResult<Vec<Invoice>> {
        let (start, end) = filter.range.bounds();
        let sql = format!(
            r#"
            SELECT {}
            FROM invoices
            WHERE owner_id = ?1
              AND (?2 IS NULL OR invoice_type = ?2)
              AND (?3 IS NULL OR status = ?3)
              AND (?4 IS NULL OR payment_status = ?4)
              AND (?5 IS NULL OR created_at >= ?5)
              AND (?6 IS NULL OR created_at < ?6)
            ORDER BY created_at DESC
            "#,
            INVOICE_COLUMNS
        );

        let rows = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(owner_id)
            .bind(filter.invoice_type)
            .bind(filter.status)
            .bind(filter.payment_status)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;

        debug!(owner_id, count = rows.len(), "Listed invoices");
        rows.into_iter().map(Invoice::try_from).collect()
    }

    /// Updates notes and due date on a draft or confirmed invoice.
    ///
    /// ## Errors
    /// `InvalidState` once the invoice is cancelled or void.
    pub async fn update_details(
        &self,
        owner_id: &str,
        id: &str,
        details: InvoiceDetails,
    ) -> DbResult<Invoice> {
        let mut tx = begin_write(&self.pool).await?;
        let mut invoice = fetch_invoice(&mut tx, owner_id, id).await?;
        invoice.ensure_editable()?;

        if let Some(notes) = details.notes {
            invoice.notes = Some(notes);
        }
        if let Some(due_date) = details.due_date {
            invoice.due_date = Some(due_date);
        }
        invoice.updated_at = Utc::now();

        update_invoice(&mut tx, &invoice).await?;
        tx.commit().await?;
        debug!(id, owner_id, "Updated invoice details");
        Ok(invoice)
    }
}

// =============================================================================
// Connection-level helpers (shared with the recorder)
// =============================================================================

pub(crate) async fn fetch_invoice_opt(
    conn: &mut SqliteConnection,
    owner_id: &str,
    id: &str,
) -> DbResult<Option<Invoice>> {
    let sql = format!(
        "SELECT {} FROM invoices WHERE id = ?1 AND owner_id = ?2",
        INVOICE_COLUMNS
    );
    let row = sqlx::query_as::<_, InvoiceRow>(&sql)
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(Invoice::try_from).transpose()
}

pub(crate) async fn fetch_invoice(
    conn: &mut SqliteConnection,
    owner_id: &str,
    id: &str,
) -> DbResult<Invoice> {
    fetch_invoice_opt(conn, owner_id, id)
        .await?
        .ok_or_else(|| DbError::not_found("Invoice", id))
}

pub(crate) async fn insert_invoice(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO invoices (
            id, owner_id, invoice_number, invoice_type, party, items,
            subtotal_cents, discount_bps, tax_cents, total_cents, paid_cents,
            remaining_cents, payment_status, payment_method, status, due_date,
            notes, created_by, created_at, updated_at, confirmed_at, cancelled_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
            ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22
        )
        "#,
    )
    .bind(&invoice.id)
    .bind(&invoice.owner_id)
    .bind(&invoice.invoice_number)
    .bind(invoice.invoice_type)
    .bind(to_json(&invoice.party)?)
    .bind(to_json(&invoice.items)?)
    .bind(invoice.subtotal_cents)
    .bind(invoice.discount_bps as i64)
    .bind(invoice.tax_cents)
    .bind(invoice.total_cents)
    .bind(invoice.paid_cents)
    .bind(invoice.remaining_cents)
    .bind(invoice.payment_status)
    .bind(invoice.payment_method)
    .bind(invoice.status)
    .bind(invoice.due_date)
    .bind(&invoice.notes)
    .bind(&invoice.created_by)
    .bind(invoice.created_at)
    .bind(invoice.updated_at)
    .bind(invoice.confirmed_at)
    .bind(invoice.cancelled_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| DbError::from(e).with_duplicate_value(&invoice.invoice_number))?;

    Ok(())
}

/// Writes back every mutable field. Items, party and totals other than the
/// payment fields are fixed at creation.
pub(crate) async fn update_invoice(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE invoices SET
            paid_cents = ?3,
            remaining_cents = ?4,
            payment_status = ?5,
            payment_method = ?6,
            status = ?7,
            due_date = ?8,
            notes = ?9,
            updated_at = ?10,
            confirmed_at = ?11,
            cancelled_at = ?12
        WHERE id = ?1 AND owner_id = ?2
        "#,
    )
    .bind(&invoice.id)
    .bind(&invoice.owner_id)
    .bind(invoice.paid_cents)
    .bind(invoice.remaining_cents)
    .bind(invoice.payment_status)
    .bind(invoice.payment_method)
    .bind(invoice.status)
    .bind(invoice.due_date)
    .bind(&invoice.notes)
    .bind(invoice.updated_at)
    .bind(invoice.confirmed_at)
    .bind(invoice.cancelled_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
