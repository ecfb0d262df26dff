//! # Repository Module
//!
//! Database repository implementations for the cafe back end.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  REST handler                                                          │
//! │       │                                                                 │
//! │       │  db.products().list(owner_id, &filter)                         │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── list(&self, owner_id, filter)                                     │
//! │  ├── find(&self, owner_id, id)                                         │
//! │  ├── insert(&self, owner_id, product)                                  │
//! │  └── update(&self, owner_id, id, changes)                              │
//! │       │                                                                 │
//! │       │  SQL Query (always filtered by owner_id)                       │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Writes that fan out across tables (stock + record + cash entry)       │
//! │  go through the FinancialRecorder instead, which reuses the            │
//! │  connection-level helpers defined next to each repository.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`UserRepository`](user::UserRepository) - Accounts and credentials
//! - [`ProductRepository`](product::ProductRepository) - Catalog and stock
//! - [`SaleRepository`](sale::SaleRepository) - Sale reads
//! - [`InvoiceRepository`](invoice::InvoiceRepository) - Invoice reads and detail edits
//! - [`ExpenseRepository`](expense::ExpenseRepository) - Expense reads
//! - [`CashRegisterRepository`](cash_register::CashRegisterRepository) - Ledger reads
//! - [`BlogRepository`](blog::BlogRepository) - Blog posts
//! - [`ReportRepository`](report::ReportRepository) - Read-only aggregations

pub mod blog;
pub mod cash_register;
pub mod expense;
pub mod invoice;
pub mod product;
pub mod report;
pub mod sale;
pub mod user;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::error::DbResult;

/// Opens a write transaction.
///
/// `BEGIN IMMEDIATE` takes the write lock up front. A plain deferred
/// transaction that reads first cannot upgrade to a writer once another
/// connection has written, and SQLite fails it with `SQLITE_BUSY` rather
/// than waiting on the busy timeout.
pub(crate) async fn begin_write(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

/// Generates a new entity ID.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a document number in format: PREFIX-YYYYMMDD-XXXXXX
///
/// ## Format
/// - PREFIX: `SAL`, `INV` or `PUR`
/// - YYYYMMDD: Date
/// - XXXXXX: First six hex digits of a v4 UUID, uppercased
///
/// ## Example
/// `SAL-20260131-3FA2C1`
pub fn document_number(prefix: &str, now: DateTime<Utc>) -> String {
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(6)
        .collect::<String>()
        .to_uppercase();
    format!("{}-{}-{}", prefix, now.format("%Y%m%d"), suffix)
}

/// An inclusive calendar-day range, open on either side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        DateRange { from, to }
    }

    /// Timestamp bounds: `[from 00:00, to + 1 day 00:00)` in UTC.
    pub fn bounds(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        let start = self
            .from
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc());
        let end = self
            .to
            .and_then(|d| d.checked_add_days(Days::new(1)))
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc());
        (start, end)
    }
}

/// Encodes an embedded document column.
pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> DbResult<String> {
    Ok(serde_json::to_string(value)?)
}

/// Decodes an embedded document column.
pub(crate) fn from_json<T: DeserializeOwned>(raw: &str) -> DbResult<T> {
    Ok(serde_json::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_number_format() {
        let now = NaiveDate::from_ymd_opt(2026, 1, 31)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
            .and_utc();
        let number = document_number("SAL", now);
        assert!(number.starts_with("SAL-20260131-"));
        assert_eq!(number.len(), "SAL-20260131-".len() + 6);
    }

    #[test]
    fn test_date_range_bounds() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2026, 3, 1),
            NaiveDate::from_ymd_opt(2026, 3, 31),
        );
        let (start, end) = range.bounds();
        assert_eq!(start.unwrap().to_rfc3339(), "2026-03-01T00:00:00+00:00");
        assert_eq!(end.unwrap().to_rfc3339(), "2026-04-01T00:00:00+00:00");

        assert_eq!(DateRange::default().bounds(), (None, None));
    }
}
