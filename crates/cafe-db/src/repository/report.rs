//! # Report Repository
//!
//! Read-only aggregations over sales, invoices and expenses.
//!
//! ## What Counts
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Revenue       confirmed sales (+ confirmed sale invoices where noted)  │
//! │  Collected     paid amount of confirmed sales                           │
//! │  Outstanding   positive remaining amount of confirmed sales             │
//! │  Cost of goods Σ snapshotted unit cost × quantity over the same lines   │
//! │  Expenses      expense amounts, by expense date                         │
//! │                                                                         │
//! │  Cancelled and void records never contribute.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sale and invoice ranges compare `created_at` against UTC day bounds;
//! expense ranges compare the calendar `expense_date`.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::error::DbResult;
use crate::repository::{from_json, DateRange};
use cafe_core::{CoreError, ExpenseCategory, LineItem, Money, PaymentMethod, Quantity};

/// Default number of rows for the top-products report.
pub const DEFAULT_TOP_PRODUCTS: i64 = 10;

// =============================================================================
// Report Shapes
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesSummary {
    pub sale_count: i64,
    pub revenue_cents: i64,
    pub collected_cents: i64,
    pub outstanding_cents: i64,
    pub average_ticket_cents: i64,
    pub cancelled_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct PaymentMethodTotal {
    pub payment_method: PaymentMethod,
    pub sale_count: i64,
    pub revenue_cents: i64,
    pub collected_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyRevenue {
    /// `YYYY-MM`
    pub month: String,
    pub sales_revenue_cents: i64,
    pub invoice_revenue_cents: i64,
    pub expenses_cents: i64,
    pub net_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct CategoryTotal {
    pub category: ExpenseCategory,
    pub expense_count: i64,
    pub total_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopProduct {
    pub product_id: String,
    pub code: String,
    pub name: String,
    pub quantity: Quantity,
    pub revenue_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfitReport {
    pub revenue_cents: i64,
    pub cost_of_goods_cents: i64,
    pub gross_profit_cents: i64,
    pub expenses_cents: i64,
    pub net_profit_cents: i64,
}

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, FromRow)]
struct SummaryRow {
    sale_count: i64,
    revenue: i64,
    collected: i64,
    outstanding: i64,
    cancelled_count: i64,
}

#[derive(Debug, FromRow)]
struct MonthRow {
    month: String,
    amount: i64,
}

#[derive(Debug, FromRow)]
struct TopProductRow {
    product_id: String,
    code: String,
    name: String,
    quantity_hundredths: i64,
    revenue_cents: i64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for reporting queries.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Count, revenue, collected and outstanding amounts for confirmed sales.
    pub async fn sales_summary(&self, owner_id: &str, range: DateRange) -> DbResult<SalesSummary> {
        let (start, end) = range.bounds();
        let row = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN status = 'confirmed' THEN 1 ELSE 0 END), 0) AS sale_count,
                COALESCE(SUM(CASE WHEN status = 'confirmed' THEN total_cents ELSE 0 END), 0) AS revenue,
                COALESCE(SUM(CASE WHEN status = 'confirmed' THEN paid_cents ELSE 0 END), 0) AS collected,
                COALESCE(SUM(CASE WHEN status = 'confirmed' AND remaining_cents > 0
                                  THEN remaining_cents ELSE 0 END), 0) AS outstanding,
                COALESCE(SUM(CASE WHEN status = 'cancelled' THEN 1 ELSE 0 END), 0) AS cancelled_count
            FROM sales
            WHERE owner_id = ?1
              AND (?2 IS NULL OR created_at >= ?2)
              AND (?3 IS NULL OR created_at < ?3)
            "#,
        )
        .bind(owner_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(SalesSummary {
            sale_count: row.sale_count,
            revenue_cents: row.revenue,
            collected_cents: row.collected,
            outstanding_cents: row.outstanding,
            average_ticket_cents: average(row.revenue, row.sale_count),
            cancelled_count: row.cancelled_count,
        })
    }

    /// Confirmed sales grouped by payment method, largest revenue first.
    pub async fn sales_by_payment_method(
        &self,
        owner_id: &str,
        range: DateRange,
    ) -> DbResult<Vec<PaymentMethodTotal>> {
        let (start, end) = range.bounds();
        let rows = sqlx::query_as::<_, PaymentMethodTotal>(
            r#"
            SELECT
                payment_method,
                COUNT(*) AS sale_count,
                COALESCE(SUM(total_cents), 0) AS revenue_cents,
                COALESCE(SUM(paid_cents), 0) AS collected_cents
            FROM sales
            WHERE owner_id = ?1
              AND status = 'confirmed'
              AND (?2 IS NULL OR created_at >= ?2)
              AND (?3 IS NULL OR created_at < ?3)
            GROUP BY payment_method
            ORDER BY revenue_cents DESC
            "#,
        )
        .bind(owner_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Twelve rows for `year`, one per month, zero-filled.
    pub async fn monthly_revenue(&self, owner_id: &str, year: i32) -> DbResult<Vec<MonthlyRevenue>> {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(year, 1, 1),
            NaiveDate::from_ymd_opt(year, 12, 31),
        );
        let (start, end) = range.bounds();

        let sales = sqlx::query_as::<_, MonthRow>(
            r#"
            SELECT substr(created_at, 1, 7) AS month, COALESCE(SUM(total_cents), 0) AS amount
            FROM sales
            WHERE owner_id = ?1 AND status = 'confirmed'
              AND created_at >= ?2 AND created_at < ?3
            GROUP BY month
            "#,
        )
        .bind(owner_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let invoices = sqlx::query_as::<_, MonthRow>(
            r#"
            SELECT substr(created_at, 1, 7) AS month, COALESCE(SUM(total_cents), 0) AS amount
            FROM invoices
            WHERE owner_id = ?1 AND status = 'confirmed' AND invoice_type = 'sale'
              AND created_at >= ?2 AND created_at < ?3
            GROUP BY month
            "#,
        )
        .bind(owner_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let expenses = sqlx::query_as::<_, MonthRow>(
            r#"
            SELECT substr(expense_date, 1, 7) AS month, COALESCE(SUM(amount_cents), 0) AS amount
            FROM expenses
            WHERE owner_id = ?1 AND expense_date >= ?2 AND expense_date <= ?3
            GROUP BY month
            "#,
        )
        .bind(owner_id)
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&self.pool)
        .await?;

        let mut months: BTreeMap<String, MonthlyRevenue> = (1..=12)
            .map(|m| {
                let month = format!("{:04}-{:02}", year, m);
                (
                    month.clone(),
                    MonthlyRevenue {
                        month,
                        sales_revenue_cents: 0,
                        invoice_revenue_cents: 0,
                        expenses_cents: 0,
                        net_cents: 0,
                    },
                )
            })
            .collect();

        for row in sales {
            if let Some(m) = months.get_mut(&row.month) {
                m.sales_revenue_cents = row.amount;
            }
        }
        for row in invoices {
            if let Some(m) = months.get_mut(&row.month) {
                m.invoice_revenue_cents = row.amount;
            }
        }
        for row in expenses {
            if let Some(m) = months.get_mut(&row.month) {
                m.expenses_cents = row.amount;
            }
        }

        Ok(months
            .into_values()
            .map(|mut m| {
                m.net_cents = m.sales_revenue_cents + m.invoice_revenue_cents - m.expenses_cents;
                m
            })
            .collect())
    }

    /// Expenses grouped by category, largest first.
    pub async fn expenses_by_category(
        &self,
        owner_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> DbResult<Vec<CategoryTotal>> {
        let rows = sqlx::query_as::<_, CategoryTotal>(
            r#"
            SELECT
                category,
                COUNT(*) AS expense_count,
                COALESCE(SUM(amount_cents), 0) AS total_cents
            FROM expenses
            WHERE owner_id = ?1
              AND (?2 IS NULL OR expense_date >= ?2)
              AND (?3 IS NULL OR expense_date <= ?3)
            GROUP BY category
            ORDER BY total_cents DESC
            "#,
        )
        .bind(owner_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Best-selling products across confirmed sales, by line revenue.
    ///
    /// Reads the embedded line items, so renamed or deactivated products
    /// still report under the code and name they were sold with.
    pub async fn top_products(&self, owner_id: &str, limit: i64) -> DbResult<Vec<TopProduct>> {
        let rows = sqlx::query_as::<_, TopProductRow>(
            r#"
            SELECT
                json_extract(j.value, '$.product_id') AS product_id,
                MAX(json_extract(j.value, '$.code')) AS code,
                MAX(json_extract(j.value, '$.name')) AS name,
                CAST(ROUND(SUM(json_extract(j.value, '$.quantity')) * 100) AS INTEGER)
                    AS quantity_hundredths,
                CAST(SUM(json_extract(j.value, '$.line_total_cents')) AS INTEGER) AS revenue_cents
            FROM sales s, json_each(s.items) j
            WHERE s.owner_id = ?1 AND s.status = 'confirmed'
            GROUP BY product_id
            ORDER BY revenue_cents DESC, quantity_hundredths DESC
            LIMIT ?2
            "#,
        )
        .bind(owner_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| TopProduct {
                product_id: r.product_id,
                code: r.code,
                name: r.name,
                quantity: Quantity::from_hundredths(r.quantity_hundredths),
                revenue_cents: r.revenue_cents,
            })
            .collect())
    }

    /// Revenue minus cost of goods minus expenses.
    ///
    /// Revenue and cost of goods cover confirmed sales and confirmed sale
    /// invoices; cost uses each line's snapshotted unit cost.
    pub async fn profit(&self, owner_id: &str, range: DateRange) -> DbResult<ProfitReport> {
        let (start, end) = range.bounds();

        let documents: Vec<(i64, String)> = sqlx::query_as(
            r#"
            SELECT total_cents, items FROM sales
            WHERE owner_id = ?1 AND status = 'confirmed'
              AND (?2 IS NULL OR created_at >= ?2)
              AND (?3 IS NULL OR created_at < ?3)
            UNION ALL
            SELECT total_cents, items FROM invoices
            WHERE owner_id = ?1 AND status = 'confirmed' AND invoice_type = 'sale'
              AND (?2 IS NULL OR created_at >= ?2)
              AND (?3 IS NULL OR created_at < ?3)
            "#,
        )
        .bind(owner_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let overflow = || CoreError::InvalidAmount {
            reason: "profit figures exceed the money range".to_string(),
        };
        let mut revenue = Money::zero();
        let mut cost_of_goods = Money::zero();
        for (total, raw_items) in &documents {
            revenue = revenue
                .checked_add(Money::from_cents(*total))
                .ok_or_else(overflow)?;
            let items: Vec<LineItem> = from_json(raw_items)?;
            for item in &items {
                cost_of_goods = item
                    .line_cost()
                    .and_then(|cost| cost_of_goods.checked_add(cost))
                    .ok_or_else(overflow)?;
            }
        }

        let expenses: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0) FROM expenses
            WHERE owner_id = ?1
              AND (?2 IS NULL OR expense_date >= ?2)
              AND (?3 IS NULL OR expense_date <= ?3)
            "#,
        )
        .bind(owner_id)
        .bind(range.from)
        .bind(range.to)
        .fetch_one(&self.pool)
        .await?;

        let gross = revenue - cost_of_goods;
        Ok(ProfitReport {
            revenue_cents: revenue.cents(),
            cost_of_goods_cents: cost_of_goods.cents(),
            gross_profit_cents: gross.cents(),
            expenses_cents: expenses,
            net_profit_cents: gross.cents() - expenses,
        })
    }
}

/// Rounded integer mean; zero for an empty set.
fn average(total: i64, count: i64) -> i64 {
    if count == 0 {
        return 0;
    }
    let half = count / 2;
    if total >= 0 {
        (total + half) / count
    } else {
        (total - half) / count
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
