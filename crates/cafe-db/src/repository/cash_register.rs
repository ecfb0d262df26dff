//! # Cash Register Repository
//!
//! The append-only cash ledger and the per-owner running balance.
//!
//! ## Running Balance
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  append_entry(movement)           (inside the caller's transaction)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT cash_balances row for owner if missing (balance 0)              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE cash_balances SET balance = balance ± amount                    │
//! │    [guarded: AND balance ± amount >= 0]  RETURNING balance              │
//! │       │                                                                 │
//! │       ├── no row (guarded) → InsufficientFunds                          │
//! │       ▼                                                                 │
//! │  INSERT cash_register_entries (..., balance_cents = new balance)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The counter and the entry commit together, so an entry's balance is
//! always the counter value right after it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{generate_id, DateRange};
use cafe_core::financial::CashMovement;
use cafe_core::{CashReference, CashRegisterEntry, CashTransactionType, Money};

const ENTRY_COLUMNS: &str = "id, owner_id, transaction_type, amount_cents, balance_cents, \
     category, description, reference_type, reference_id, created_by, created_at";

/// Default page size for ledger listings.
pub const DEFAULT_LIST_LIMIT: i64 = 100;

#[derive(Debug, FromRow)]
struct EntryRow {
    id: String,
    owner_id: String,
    transaction_type: CashTransactionType,
    amount_cents: i64,
    balance_cents: i64,
    category: String,
    description: Option<String>,
    reference_type: Option<String>,
    reference_id: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
}

impl From<EntryRow> for CashRegisterEntry {
    fn from(row: EntryRow) -> Self {
        let reference = match (row.reference_type, row.reference_id) {
            (Some(kind), Some(id)) => CashReference::from_parts(&kind, id),
            _ => None,
        };
        CashRegisterEntry {
            id: row.id,
            owner_id: row.owner_id,
            transaction_type: row.transaction_type,
            amount_cents: row.amount_cents,
            balance_cents: row.balance_cents,
            category: row.category,
            description: row.description,
            reference,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

/// List filters.
#[derive(Debug, Clone, Default)]
pub struct CashFilter {
    pub transaction_type: Option<CashTransactionType>,
    pub range: DateRange,
    /// Defaults to [`DEFAULT_LIST_LIMIT`].
    pub limit: Option<i64>,
}

/// Totals for one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub deposits_cents: i64,
    pub withdrawals_cents: i64,
    pub net_cents: i64,
    pub entry_count: i64,
}

#[derive(Debug, FromRow)]
struct SummaryRow {
    deposits: i64,
    withdrawals: i64,
    entry_count: i64,
}

/// Repository for ledger reads.
#[derive(Debug, Clone)]
pub struct CashRegisterRepository {
    pool: SqlitePool,
}

impl CashRegisterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CashRegisterRepository { pool }
    }

    /// Lists entries, newest first.
    pub async fn list(&self, owner_id: &str, filter: &CashFilter) -> DbResult<Vec<CashRegisterEntry>> {
        let (start, end) = filter.range.bounds();
        let limit = filter.limit.unwrap_or(DEFAULT_LIST_LIMIT);
        let sql = format!(
            r#"
            SELECT {}
            FROM cash_register_entries
            WHERE owner_id = ?1
              AND (?2 IS NULL OR transaction_type = ?2)
              AND (?3 IS NULL OR created_at >= ?3)
              AND (?4 IS NULL OR created_at < ?4)
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?5
            "#,
            ENTRY_COLUMNS
        );

        let rows = sqlx::query_as::<_, EntryRow>(&sql)
            .bind(owner_id)
            .bind(filter.transaction_type)
            .bind(start)
            .bind(end)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(CashRegisterEntry::from).collect())
    }

    /// Current running balance; zero before the first entry.
    pub async fn balance(&self, owner_id: &str) -> DbResult<Money> {
        let balance: Option<i64> =
            sqlx::query_scalar("SELECT balance_cents FROM cash_balances WHERE owner_id = ?1")
                .bind(owner_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(Money::from_cents(balance.unwrap_or(0)))
    }

    /// Deposits, withdrawals and net movement for one UTC day.
    pub async fn daily_summary(&self, owner_id: &str, date: NaiveDate) -> DbResult<DailySummary> {
        let (start, end) = DateRange::new(Some(date), Some(date)).bounds();

        let row = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN transaction_type = 'deposit' THEN amount_cents END), 0) AS deposits,
                COALESCE(SUM(CASE WHEN transaction_type = 'withdrawal' THEN amount_cents END), 0) AS withdrawals,
                COUNT(*) AS entry_count
            FROM cash_register_entries
            WHERE owner_id = ?1 AND created_at >= ?2 AND created_at < ?3
            "#,
        )
        .bind(owner_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(DailySummary {
            date,
            deposits_cents: row.deposits,
            withdrawals_cents: row.withdrawals,
            net_cents: row.deposits - row.withdrawals,
            entry_count: row.entry_count,
        })
    }
}

// =============================================================================
// Connection-level helpers (shared with the recorder)
// =============================================================================

/// Moves the owner's counter by `delta` and returns the new balance.
///
/// With `guarded`, refuses to go below zero and fails with
/// `InsufficientFunds` instead.
async fn move_balance(
    conn: &mut SqliteConnection,
    owner_id: &str,
    movement: &CashMovement,
) -> DbResult<Money> {
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO cash_balances (owner_id, balance_cents, updated_at)
        VALUES (?1, 0, ?2)
        ON CONFLICT(owner_id) DO NOTHING
        "#,
    )
    .bind(owner_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    let delta = movement.signed_amount().cents();
    let sql = if movement.guarded {
        r#"
        UPDATE cash_balances
           SET balance_cents = balance_cents + ?2, updated_at = ?3
         WHERE owner_id = ?1 AND balance_cents + ?2 >= 0
        RETURNING balance_cents
        "#
    } else {
        r#"
        UPDATE cash_balances
           SET balance_cents = balance_cents + ?2, updated_at = ?3
         WHERE owner_id = ?1
        RETURNING balance_cents
        "#
    };

    let updated: Option<i64> = sqlx::query_scalar(sql)
        .bind(owner_id)
        .bind(delta)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?;

    match updated {
        Some(balance) => Ok(Money::from_cents(balance)),
        None => {
            let current: i64 =
                sqlx::query_scalar("SELECT balance_cents FROM cash_balances WHERE owner_id = ?1")
                    .bind(owner_id)
                    .fetch_one(&mut *conn)
                    .await?;
            movement.apply_to(Money::from_cents(current))?;
            Err(DbError::Internal(format!(
                "cash balance update for owner {} matched no rows",
                owner_id
            )))
        }
    }
}

/// Appends one ledger entry and moves the running balance with it.
pub(crate) async fn append_entry(
    conn: &mut SqliteConnection,
    owner_id: &str,
    created_by: &str,
    movement: &CashMovement,
) -> DbResult<CashRegisterEntry> {
    let balance = move_balance(conn, owner_id, movement).await?;

    let entry = CashRegisterEntry {
        id: generate_id(),
        owner_id: owner_id.to_string(),
        transaction_type: movement.transaction_type,
        amount_cents: movement.amount.cents(),
        balance_cents: balance.cents(),
        category: movement.category.clone(),
        description: movement.description.clone(),
        reference: movement.reference.clone(),
        created_by: created_by.to_string(),
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO cash_register_entries (
            id, owner_id, transaction_type, amount_cents, balance_cents,
            category, description, reference_type, reference_id,
            created_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.owner_id)
    .bind(entry.transaction_type)
    .bind(entry.amount_cents)
    .bind(entry.balance_cents)
    .bind(&entry.category)
    .bind(&entry.description)
    .bind(entry.reference.as_ref().map(CashReference::kind))
    .bind(entry.reference.as_ref().map(|r| r.id().to_string()))
    .bind(&entry.created_by)
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await?;

    debug!(
        id = %entry.id,
        owner_id,
        kind = entry.transaction_type.as_str(),
        amount = entry.amount_cents,
        balance = entry.balance_cents,
        "Appended cash entry"
    );
    Ok(entry)
}

/// Shifts the running balance without writing an entry.
///
/// Used when an expense's paired withdrawal is edited or removed.
pub(crate) async fn adjust_balance(
    conn: &mut SqliteConnection,
    owner_id: &str,
    delta: Money,
) -> DbResult<Money> {
    let transaction_type = if delta.is_negative() {
        CashTransactionType::Withdrawal
    } else {
        CashTransactionType::Deposit
    };
    let correction = CashMovement {
        transaction_type,
        amount: delta.abs(),
        category: String::new(),
        description: None,
        reference: None,
        guarded: false,
    };
    move_balance(conn, owner_id, &correction).await
}

/// The entry paired with a reference, if any.
pub(crate) async fn find_entry_by_reference(
    conn: &mut SqliteConnection,
    owner_id: &str,
    reference: &CashReference,
) -> DbResult<Option<CashRegisterEntry>> {
    let sql = format!(
        r#"
        SELECT {}
        FROM cash_register_entries
        WHERE owner_id = ?1 AND reference_type = ?2 AND reference_id = ?3
        ORDER BY created_at, rowid
        LIMIT 1
        "#,
        ENTRY_COLUMNS
    );

    let row = sqlx::query_as::<_, EntryRow>(&sql)
        .bind(owner_id)
        .bind(reference.kind())
        .bind(reference.id())
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(CashRegisterEntry::from))
}

/// Rewrites the amount, category and description of an existing entry.
pub(crate) async fn update_entry(
    conn: &mut SqliteConnection,
    entry: &CashRegisterEntry,
) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE cash_register_entries
           SET amount_cents = ?3, category = ?4, description = ?5
         WHERE id = ?1 AND owner_id = ?2
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.owner_id)
    .bind(entry.amount_cents)
    .bind(&entry.category)
    .bind(&entry.description)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn delete_entry(
    conn: &mut SqliteConnection,
    owner_id: &str,
    id: &str,
) -> DbResult<()> {
    sqlx::query("DELETE FROM cash_register_entries WHERE id = ?1 AND owner_id = ?2")
        .bind(id)
        .bind(owner_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}
