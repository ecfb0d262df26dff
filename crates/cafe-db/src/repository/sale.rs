//! # Sale Repository
//!
//! Read access to sales. Sales are written only by the
//! [`FinancialRecorder`](crate::recorder::FinancialRecorder), which uses the
//! connection-level helpers at the bottom of this module.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{from_json, to_json, DateRange};
use cafe_core::{PaymentMethod, PaymentStatus, Sale, SaleStatus};

const SALE_COLUMNS: &str = "id, owner_id, sale_number, items, subtotal_cents, discount_bps, \
     tax_cents, total_cents, paid_cents, remaining_cents, payment_status, payment_method, \
     status, customer_name, notes, created_by, created_at, updated_at, cancelled_at";

#[derive(Debug, FromRow)]
struct SaleRow {
    id: String,
    owner_id: String,
    sale_number: String,
    items: String,
    subtotal_cents: i64,
    discount_bps: i64,
    tax_cents: i64,
    total_cents: i64,
    paid_cents: i64,
    remaining_cents: i64,
    payment_status: PaymentStatus,
    payment_method: PaymentMethod,
    status: SaleStatus,
    customer_name: Option<String>,
    notes: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    cancelled_at: Option<DateTime<Utc>>,
}

impl TryFrom<SaleRow> for Sale {
    type Error = DbError;

    fn try_from(row: SaleRow) -> DbResult<Self> {
        Ok(Sale {
            id: row.id,
            owner_id: row.owner_id,
            sale_number: row.sale_number,
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
            customer_name: row.customer_name,
            notes: row.notes,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            cancelled_at: row.cancelled_at,
        })
    }
}

/// List filters.
#[derive(Debug, Clone, Default)]
pub struct SaleFilter {
    pub status: Option<SaleStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub range: DateRange,
}

/// Repository for sale reads.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    pub async fn get(&self, owner_id: &str, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        fetch_sale_opt(&mut conn, owner_id, id).await
    }

    pub async fn find(&self, owner_id: &str, id: &str) -> DbResult<Sale> {
        self.get(owner_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", id))
    }

    /// Lists sales, newest first.
    pub async fn list(&self, owner_id: &str, filter: &SaleFilter) -> DbResult<Vec<Sale>> {
        let (start, end) = filter.range.bounds();
        let sql = format!(
            r#"
            SELECT {}
            FROM sales
            WHERE owner_id = ?1
              AND (?2 IS NULL OR status = ?2)
              AND (?3 IS NULL OR payment_status = ?3)
              AND (?4 IS NULL OR created_at >= ?4)
              AND (?5 IS NULL OR created_at < ?5)
            ORDER BY created_at DESC
            "#,
            SALE_COLUMNS
        );

        let rows = sqlx::query_as::<_, SaleRow>(&sql)
            .bind(owner_id)
            .bind(filter.status)
            .bind(filter.payment_status)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;

        debug!(owner_id, count = rows.len(), "Listed sales");
        rows.into_iter().map(Sale::try_from).collect()
    }
}

// =============================================================================
// Connection-level helpers (shared with the recorder)
// =============================================================================

pub(crate) async fn fetch_sale_opt(
    conn: &mut SqliteConnection,
    owner_id: &str,
    id: &str,
) -> DbResult<Option<Sale>> {
    let sql = format!(
        "SELECT {} FROM sales WHERE id = ?1 AND owner_id = ?2",
        SALE_COLUMNS
    );
    let row = sqlx::query_as::<_, SaleRow>(&sql)
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(Sale::try_from).transpose()
}

pub(crate) async fn fetch_sale(
    conn: &mut SqliteConnection,
    owner_id: &str,
    id: &str,
) -> DbResult<Sale> {
    fetch_sale_opt(conn, owner_id, id)
        .await?
        .ok_or_else(|| DbError::not_found("Sale", id))
}

pub(crate) async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sales (
            id, owner_id, sale_number, items, subtotal_cents, discount_bps,
            tax_cents, total_cents, paid_cents, remaining_cents, payment_status,
            payment_method, status, customer_name, notes, created_by,
            created_at, updated_at, cancelled_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.owner_id)
    .bind(&sale.sale_number)
    .bind(to_json(&sale.items)?)
    .bind(sale.subtotal_cents)
    .bind(sale.discount_bps as i64)
    .bind(sale.tax_cents)
    .bind(sale.total_cents)
    .bind(sale.paid_cents)
    .bind(sale.remaining_cents)
    .bind(sale.payment_status)
    .bind(sale.payment_method)
    .bind(sale.status)
    .bind(&sale.customer_name)
    .bind(&sale.notes)
    .bind(&sale.created_by)
    .bind(sale.created_at)
    .bind(sale.updated_at)
    .bind(sale.cancelled_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| DbError::from(e).with_duplicate_value(&sale.sale_number))?;

    Ok(())
}

/// Writes back every mutable field: payment, status, notes, timestamps.
pub(crate) async fn update_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE sales SET
            paid_cents = ?3,
            remaining_cents = ?4,
            payment_status = ?5,
            payment_method = ?6,
            status = ?7,
            notes = ?8,
            updated_at = ?9,
            cancelled_at = ?10
        WHERE id = ?1 AND owner_id = ?2
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.owner_id)
    .bind(sale.paid_cents)
    .bind(sale.remaining_cents)
    .bind(sale.payment_status)
    .bind(sale.payment_method)
    .bind(sale.status)
    .bind(&sale.notes)
    .bind(sale.updated_at)
    .bind(sale.cancelled_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
