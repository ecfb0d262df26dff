//! # Expense Repository
//!
//! Expense reads plus the row-level helpers the recorder uses to keep each
//! expense and its paired cash-register withdrawal in step.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{from_json, to_json};
use cafe_core::{Expense, ExpenseCategory, PaymentMethod};

const EXPENSE_COLUMNS: &str = "id, owner_id, description, amount_cents, category, \
     payment_method, expense_date, recurrence, notes, created_by, created_at, updated_at";

#[derive(Debug, FromRow)]
struct ExpenseRow {
    id: String,
    owner_id: String,
    description: String,
    amount_cents: i64,
    category: ExpenseCategory,
    payment_method: PaymentMethod,
    expense_date: NaiveDate,
    recurrence: Option<String>,
    notes: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ExpenseRow> for Expense {
    type Error = DbError;

    fn try_from(row: ExpenseRow) -> DbResult<Self> {
        let recurrence = match row.recurrence.as_deref() {
            Some(raw) => Some(from_json(raw)?),
            None => None,
        };
        Ok(Expense {
            id: row.id,
            owner_id: row.owner_id,
            description: row.description,
            amount_cents: row.amount_cents,
            category: row.category,
            payment_method: row.payment_method,
            expense_date: row.expense_date,
            recurrence,
            notes: row.notes,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// List filters. Dates compare against `expense_date`, inclusive.
#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    pub category: Option<ExpenseCategory>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Repository for expense reads.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    pub async fn get(&self, owner_id: &str, id: &str) -> DbResult<Option<Expense>> {
        let mut conn = self.pool.acquire().await?;
        fetch_expense_opt(&mut conn, owner_id, id).await
    }

    pub async fn find(&self, owner_id: &str, id: &str) -> DbResult<Expense> {
        self.get(owner_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Expense", id))
    }

    /// Lists expenses, most recent expense date first.
    pub async fn list(&self, owner_id: &str, filter: &ExpenseFilter) -> DbResult<Vec<Expense>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM expenses
            WHERE owner_id = ?1
              AND (?2 IS NULL OR category = ?2)
              AND (?3 IS NULL OR expense_date >= ?3)
              AND (?4 IS NULL OR expense_date <= ?4)
            ORDER BY expense_date DESC, created_at DESC
            "#,
            EXPENSE_COLUMNS
        );

        let rows = sqlx::query_as::<_, ExpenseRow>(&sql)
            .bind(owner_id)
            .bind(filter.category)
            .bind(filter.from)
            .bind(filter.to)
            .fetch_all(&self.pool)
            .await?;

        debug!(owner_id, count = rows.len(), "Listed expenses");
        rows.into_iter().map(Expense::try_from).collect()
    }
}

// =============================================================================
// Connection-level helpers (shared with the recorder)
// =============================================================================

pub(crate) async fn fetch_expense_opt(
    conn: &mut SqliteConnection,
    owner_id: &str,
    id: &str,
) -> DbResult<Option<Expense>> {
    let sql = format!(
        "SELECT {} FROM expenses WHERE id = ?1 AND owner_id = ?2",
        EXPENSE_COLUMNS
    );
    let row = sqlx::query_as::<_, ExpenseRow>(&sql)
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(Expense::try_from).transpose()
}

pub(crate) async fn fetch_expense(
    conn: &mut SqliteConnection,
    owner_id: &str,
    id: &str,
) -> DbResult<Expense> {
    fetch_expense_opt(conn, owner_id, id)
        .await?
        .ok_or_else(|| DbError::not_found("Expense", id))
}

fn recurrence_json(expense: &Expense) -> DbResult<Option<String>> {
    expense.recurrence.as_ref().map(to_json).transpose()
}

pub(crate) async fn insert_expense(conn: &mut SqliteConnection, expense: &Expense) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO expenses (
            id, owner_id, description, amount_cents, category, payment_method,
            expense_date, recurrence, notes, created_by, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&expense.id)
    .bind(&expense.owner_id)
    .bind(&expense.description)
    .bind(expense.amount_cents)
    .bind(expense.category)
    .bind(expense.payment_method)
    .bind(expense.expense_date)
    .bind(recurrence_json(expense)?)
    .bind(&expense.notes)
    .bind(&expense.created_by)
    .bind(expense.created_at)
    .bind(expense.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn update_expense(conn: &mut SqliteConnection, expense: &Expense) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE expenses SET
            description = ?3,
            amount_cents = ?4,
            category = ?5,
            payment_method = ?6,
            expense_date = ?7,
            recurrence = ?8,
            notes = ?9,
            updated_at = ?10
        WHERE id = ?1 AND owner_id = ?2
        "#,
    )
    .bind(&expense.id)
    .bind(&expense.owner_id)
    .bind(&expense.description)
    .bind(expense.amount_cents)
    .bind(expense.category)
    .bind(expense.payment_method)
    .bind(expense.expense_date)
    .bind(recurrence_json(expense)?)
    .bind(&expense.notes)
    .bind(expense.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn delete_expense(
    conn: &mut SqliteConnection,
    owner_id: &str,
    id: &str,
) -> DbResult<()> {
    sqlx::query("DELETE FROM expenses WHERE id = ?1 AND owner_id = ?2")
        .bind(id)
        .bind(owner_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}
