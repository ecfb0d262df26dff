//! # Financial Recorder
//!
//! One method per financial event. Each method runs as a single SQLite
//! transaction spanning every row the event touches.
//!
//! ## Unit of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  record_sale(owner, actor, NewSale)                                     │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    for each line:                                                       │
//! │      ├── load product (owner-scoped, active)      → NotFound            │
//! │      ├── conditional stock decrement              → InsufficientStock   │
//! │      └── snapshot price/cost into LineItem                              │
//! │    compute totals + payment status                                      │
//! │    INSERT sale                                                          │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any error drops the transaction: no stock movement from earlier        │
//! │  lines survives a failure on a later one.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Events and Their Writes
//! ```text
//! Event                   Stock              Record           Cash entry
//! ─────────────────────   ────────────────   ──────────────   ───────────────────────
//! record_sale             out, per line      insert           none
//! update_sale             -                  paid/notes       none
//! cancel_sale             in, per line       status           none (kept as history)
//! record_invoice (conf.)  out/in per type    insert           paid > 0: dep./withdr.
//! record_invoice (draft)  -                  insert           none
//! confirm_invoice         out/in per type    status           paid > 0: dep./withdr.
//! add_invoice_payment     -                  paid             delta
//! cancel_invoice          reversed           status           none (kept as history)
//! void_invoice            -                  status           none
//! record_expense          -                  insert           withdrawal (unguarded)
//! update_expense          -                  update           amount/category synced
//! delete_expense          -                  delete           entry deleted, credited
//! record_cash_transaction -                  -                manual (withdr. guarded)
//! ```
//!
//! Every event opens with `BEGIN IMMEDIATE`, so concurrent writers on a file
//! database queue for the write lock instead of failing with `SQLITE_BUSY`.
//!
//! Inside a transaction only the transaction's own connection is used. The
//! in-memory pool holds a single connection, so touching the pool here would
//! wait on ourselves.

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::DbResult;
use crate::repository::cash_register::{
    adjust_balance, append_entry, delete_entry, find_entry_by_reference, update_entry,
};
use crate::repository::expense::{delete_expense, fetch_expense, insert_expense, update_expense};
use crate::repository::invoice::{fetch_invoice, insert_invoice, update_invoice};
use crate::repository::product::{fetch_active_product, fetch_product, move_stock};
use crate::repository::sale::{fetch_sale, insert_sale, update_sale};
use crate::repository::{begin_write, document_number, generate_id};
use cafe_core::financial::{
    payment_delta, price_line, subtotal, CashMovement, LineRequest, StockDirection, Totals,
};
use cafe_core::{
    CashReference, CashRegisterEntry, CashTransactionType, Expense, ExpenseCategory, Invoice,
    InvoiceStatus, InvoiceType, LineItem, Money, Party, PaymentMethod, Percent, Recurrence, Sale,
    SaleStatus,
};

// =============================================================================
// Inputs
// =============================================================================

/// A sale as submitted at the till.
#[derive(Debug, Clone, Default)]
pub struct NewSale {
    pub items: Vec<LineRequest>,
    pub discount_bps: u32,
    pub tax_cents: i64,
    pub paid_cents: i64,
    pub payment_method: PaymentMethod,
    pub customer_name: Option<String>,
    pub notes: Option<String>,
}

/// Post-creation edits to a sale. Items are fixed.
#[derive(Debug, Clone, Default)]
pub struct SaleUpdate {
    pub paid_cents: Option<i64>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub invoice_type: InvoiceType,
    pub party: Party,
    pub items: Vec<LineRequest>,
    pub discount_bps: u32,
    pub tax_cents: i64,
    pub paid_cents: i64,
    pub payment_method: PaymentMethod,
    /// `Draft` or `Confirmed`.
    pub status: InvoiceStatus,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// The new cumulative paid amount for an invoice.
#[derive(Debug, Clone)]
pub struct InvoicePayment {
    pub paid_cents: i64,
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Clone)]
pub struct NewExpense {
    pub description: String,
    pub amount_cents: i64,
    pub category: ExpenseCategory,
    pub payment_method: PaymentMethod,
    /// Defaults to today (UTC).
    pub expense_date: Option<NaiveDate>,
    pub recurrence: Option<Recurrence>,
    pub notes: Option<String>,
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ExpenseUpdate {
    pub description: Option<String>,
    pub amount_cents: Option<i64>,
    pub category: Option<ExpenseCategory>,
    pub payment_method: Option<PaymentMethod>,
    pub expense_date: Option<NaiveDate>,
    pub recurrence: Option<Recurrence>,
    pub notes: Option<String>,
}

/// A deposit or withdrawal entered by hand.
#[derive(Debug, Clone)]
pub struct NewCashTransaction {
    pub transaction_type: CashTransactionType,
    pub amount_cents: i64,
    pub category: String,
    pub description: Option<String>,
}

// =============================================================================
// Recorder
// =============================================================================

/// Transactional writer for sales, invoices, expenses and the cash ledger.
///
/// ## Usage
/// ```rust,ignore
/// let recorder = db.recorder();
///
/// let sale = recorder.record_sale(owner_id, actor_id, new_sale).await?;
/// let invoice = recorder
///     .add_invoice_payment(owner_id, actor_id, &invoice.id, payment)
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct FinancialRecorder {
    pool: SqlitePool,
}

impl FinancialRecorder {
    pub fn new(pool: SqlitePool) -> Self {
        FinancialRecorder { pool }
    }

    // -------------------------------------------------------------------------
    // Sales
    // -------------------------------------------------------------------------

    /// Records a confirmed sale and takes its stock.
    ///
    /// ## Errors
    /// - `NotFound` if a line names a product the owner doesn't have (or has
    ///   deactivated)
    /// - `InsufficientStock` if any line can't be covered
    pub async fn record_sale(&self, owner_id: &str, actor_id: &str, new: NewSale) -> DbResult<Sale> {
        let mut tx = begin_write(&self.pool).await?;

        let items = take_lines(&mut tx, owner_id, &new.items, Some(StockDirection::Outbound)).await?;
        let totals = Totals::compute(
            subtotal(&items)?,
            Percent::from_bps(new.discount_bps),
            Money::from_cents(new.tax_cents),
            Money::from_cents(new.paid_cents),
        )?;

        let now = Utc::now();
        let mut sale = Sale {
            id: generate_id(),
            owner_id: owner_id.to_string(),
            sale_number: document_number("SAL", now),
            items,
            subtotal_cents: 0,
            discount_bps: 0,
            tax_cents: 0,
            total_cents: 0,
            paid_cents: 0,
            remaining_cents: 0,
            payment_status: totals.payment_status,
            payment_method: new.payment_method,
            status: SaleStatus::Confirmed,
            customer_name: new.customer_name,
            notes: new.notes,
            created_by: actor_id.to_string(),
            created_at: now,
            updated_at: now,
            cancelled_at: None,
        };
        sale.apply_totals(&totals);

        insert_sale(&mut tx, &sale).await?;
        tx.commit().await?;

        info!(
            id = %sale.id,
            number = %sale.sale_number,
            owner_id,
            total = sale.total_cents,
            status = sale.payment_status.as_str(),
            "Recorded sale"
        );
        Ok(sale)
    }

    /// Updates the paid amount, payment method or notes of a confirmed sale.
    ///
    /// Sales are not mirrored to the cash register, so no entry is written.
    pub async fn update_sale(
        &self,
        owner_id: &str,
        id: &str,
        changes: SaleUpdate,
    ) -> DbResult<Sale> {
        let mut tx = begin_write(&self.pool).await?;

        let mut sale = fetch_sale(&mut tx, owner_id, id).await?;
        sale.ensure_editable()?;

        if let Some(paid) = changes.paid_cents {
            let totals = sale.totals()?.with_paid(Money::from_cents(paid))?;
            sale.apply_totals(&totals);
        }
        if let Some(method) = changes.payment_method {
            sale.payment_method = method;
        }
        if let Some(notes) = changes.notes {
            sale.notes = Some(notes);
        }
        sale.updated_at = Utc::now();

        update_sale(&mut tx, &sale).await?;
        tx.commit().await?;

        info!(id, owner_id, paid = sale.paid_cents, "Updated sale");
        Ok(sale)
    }

    /// Cancels a confirmed sale and puts its stock back.
    ///
    /// Paid amount and payment status are left as they were.
    pub async fn cancel_sale(&self, owner_id: &str, id: &str) -> DbResult<Sale> {
        let mut tx = begin_write(&self.pool).await?;

        let mut sale = fetch_sale(&mut tx, owner_id, id).await?;
        sale.ensure_cancellable()?;

        move_lines(&mut tx, owner_id, &sale.items, StockDirection::Inbound).await?;

        let now = Utc::now();
        sale.status = SaleStatus::Cancelled;
        sale.cancelled_at = Some(now);
        sale.updated_at = now;

        update_sale(&mut tx, &sale).await?;
        tx.commit().await?;

        info!(id, owner_id, "Cancelled sale");
        Ok(sale)
    }

    // -------------------------------------------------------------------------
    // Invoices
    // -------------------------------------------------------------------------

    /// Records an invoice.
    ///
    /// A confirmed invoice moves stock (out for sale invoices, in for
    /// purchase invoices) and mirrors any paid amount to the cash register.
    /// A draft only snapshots prices and totals.
    pub async fn record_invoice(
        &self,
        owner_id: &str,
        actor_id: &str,
        new: NewInvoice,
    ) -> DbResult<Invoice> {
        let mut tx = begin_write(&self.pool).await?;

        let confirmed = new.status == InvoiceStatus::Confirmed;
        let direction = StockDirection::for_invoice(new.invoice_type);
        let items = take_lines(&mut tx, owner_id, &new.items, confirmed.then_some(direction)).await?;

        let totals = Totals::compute(
            subtotal(&items)?,
            Percent::from_bps(new.discount_bps),
            Money::from_cents(new.tax_cents),
            Money::from_cents(new.paid_cents),
        )?;

        let now = Utc::now();
        let prefix = match new.invoice_type {
            InvoiceType::Sale => "INV",
            InvoiceType::Purchase => "PUR",
        };
        let mut invoice = Invoice {
            id: generate_id(),
            owner_id: owner_id.to_string(),
            invoice_number: document_number(prefix, now),
            invoice_type: new.invoice_type,
            party: new.party,
            items,
            subtotal_cents: 0,
            discount_bps: 0,
            tax_cents: 0,
            total_cents: 0,
            paid_cents: 0,
            remaining_cents: 0,
            payment_status: totals.payment_status,
            payment_method: new.payment_method,
            status: if confirmed {
                InvoiceStatus::Confirmed
            } else {
                InvoiceStatus::Draft
            },
            due_date: new.due_date,
            notes: new.notes,
            created_by: actor_id.to_string(),
            created_at: now,
            updated_at: now,
            confirmed_at: confirmed.then_some(now),
            cancelled_at: None,
        };
        invoice.apply_totals(&totals);

        insert_invoice(&mut tx, &invoice).await?;
        if confirmed {
            mirror_payment(&mut tx, &invoice, actor_id, totals.paid).await?;
        }
        tx.commit().await?;

        info!(
            id = %invoice.id,
            number = %invoice.invoice_number,
            owner_id,
            status = %invoice.status,
            total = invoice.total_cents,
            "Recorded invoice"
        );
        Ok(invoice)
    }

    /// Confirms a draft: moves its stock and mirrors its paid amount.
    pub async fn confirm_invoice(
        &self,
        owner_id: &str,
        actor_id: &str,
        id: &str,
    ) -> DbResult<Invoice> {
        let mut tx = begin_write(&self.pool).await?;

        let mut invoice = fetch_invoice(&mut tx, owner_id, id).await?;
        invoice.ensure_confirmable()?;

        move_lines(&mut tx, owner_id, &invoice.items, invoice.stock_direction()).await?;

        let now = Utc::now();
        invoice.status = InvoiceStatus::Confirmed;
        invoice.confirmed_at = Some(now);
        invoice.updated_at = now;

        update_invoice(&mut tx, &invoice).await?;
        let paid = Money::from_cents(invoice.paid_cents);
        mirror_payment(&mut tx, &invoice, actor_id, paid).await?;
        tx.commit().await?;

        info!(id, owner_id, "Confirmed invoice");
        Ok(invoice)
    }

    /// Raises the paid amount of a confirmed invoice and records the
    /// difference in the cash register.
    ///
    /// ## Errors
    /// - `InvalidState` unless the invoice is confirmed
    /// - `InvalidAmount` unless the new paid amount exceeds the current one
    pub async fn add_invoice_payment(
        &self,
        owner_id: &str,
        actor_id: &str,
        id: &str,
        payment: InvoicePayment,
    ) -> DbResult<Invoice> {
        let mut tx = begin_write(&self.pool).await?;

        let mut invoice = fetch_invoice(&mut tx, owner_id, id).await?;
        invoice.ensure_payable()?;

        let current = invoice.totals()?;
        let new_paid = Money::from_cents(payment.paid_cents);
        let delta = payment_delta(current.paid, new_paid)?;

        invoice.apply_totals(&current.with_paid(new_paid)?);
        if let Some(method) = payment.payment_method {
            invoice.payment_method = method;
        }
        invoice.updated_at = Utc::now();

        update_invoice(&mut tx, &invoice).await?;
        mirror_payment(&mut tx, &invoice, actor_id, delta).await?;
        tx.commit().await?;

        info!(
            id,
            owner_id,
            delta = delta.cents(),
            status = invoice.payment_status.as_str(),
            "Recorded invoice payment"
        );
        Ok(invoice)
    }

    /// Cancels a confirmed invoice and reverses its stock movement.
    ///
    /// Cancelling a purchase invoice takes the received stock back out, so
    /// it fails with `InsufficientStock` if that stock has since been sold.
    pub async fn cancel_invoice(&self, owner_id: &str, id: &str) -> DbResult<Invoice> {
        let mut tx = begin_write(&self.pool).await?;

        let mut invoice = fetch_invoice(&mut tx, owner_id, id).await?;
        invoice.ensure_cancellable()?;

        let reverse = invoice.stock_direction().reverse();
        move_lines(&mut tx, owner_id, &invoice.items, reverse).await?;

        let now = Utc::now();
        invoice.status = InvoiceStatus::Cancelled;
        invoice.cancelled_at = Some(now);
        invoice.updated_at = now;

        update_invoice(&mut tx, &invoice).await?;
        tx.commit().await?;

        info!(id, owner_id, "Cancelled invoice");
        Ok(invoice)
    }

    /// Voids a draft. Nothing else changes.
    pub async fn void_invoice(&self, owner_id: &str, id: &str) -> DbResult<Invoice> {
        let mut tx = begin_write(&self.pool).await?;

        let mut invoice = fetch_invoice(&mut tx, owner_id, id).await?;
        invoice.ensure_voidable()?;

        invoice.status = InvoiceStatus::Void;
        invoice.updated_at = Utc::now();

        update_invoice(&mut tx, &invoice).await?;
        tx.commit().await?;

        info!(id, owner_id, "Voided invoice");
        Ok(invoice)
    }

    // -------------------------------------------------------------------------
    // Expenses
    // -------------------------------------------------------------------------

    /// Records an expense and its paired cash withdrawal.
    ///
    /// The withdrawal is unguarded: it may take the balance below zero.
    pub async fn record_expense(
        &self,
        owner_id: &str,
        actor_id: &str,
        new: NewExpense,
    ) -> DbResult<Expense> {
        let mut tx = begin_write(&self.pool).await?;

        let now = Utc::now();
        let expense = Expense {
            id: generate_id(),
            owner_id: owner_id.to_string(),
            description: new.description.trim().to_string(),
            amount_cents: new.amount_cents,
            category: new.category,
            payment_method: new.payment_method,
            expense_date: new.expense_date.unwrap_or_else(|| now.date_naive()),
            recurrence: new.recurrence,
            notes: new.notes,
            created_by: actor_id.to_string(),
            created_at: now,
            updated_at: now,
        };

        insert_expense(&mut tx, &expense).await?;
        append_entry(&mut tx, owner_id, actor_id, &CashMovement::for_expense(&expense)).await?;
        tx.commit().await?;

        info!(
            id = %expense.id,
            owner_id,
            amount = expense.amount_cents,
            category = expense.category.as_str(),
            "Recorded expense"
        );
        Ok(expense)
    }

    /// Updates an expense and keeps its paired withdrawal in step.
    ///
    /// An amount change rewrites the entry's amount and moves the running
    /// balance by the difference.
    pub async fn update_expense(
        &self,
        owner_id: &str,
        id: &str,
        changes: ExpenseUpdate,
    ) -> DbResult<Expense> {
        let mut tx = begin_write(&self.pool).await?;

        let mut expense = fetch_expense(&mut tx, owner_id, id).await?;
        let previous = expense.amount();

        if let Some(description) = changes.description {
            expense.description = description.trim().to_string();
        }
        if let Some(amount) = changes.amount_cents {
            expense.amount_cents = amount;
        }
        if let Some(category) = changes.category {
            expense.category = category;
        }
        if let Some(method) = changes.payment_method {
            expense.payment_method = method;
        }
        if let Some(date) = changes.expense_date {
            expense.expense_date = date;
        }
        if let Some(recurrence) = changes.recurrence {
            expense.recurrence = Some(recurrence);
        }
        if let Some(notes) = changes.notes {
            expense.notes = Some(notes);
        }
        expense.updated_at = Utc::now();

        update_expense(&mut tx, &expense).await?;

        let reference = CashReference::Expense(expense.id.clone());
        if let Some(mut entry) = find_entry_by_reference(&mut tx, owner_id, &reference).await? {
            let mirrored = CashMovement::for_expense(&expense);
            entry.amount_cents = mirrored.amount.cents();
            entry.category = mirrored.category;
            entry.description = mirrored.description;
            update_entry(&mut tx, &entry).await?;

            let difference = expense.amount() - previous;
            if !difference.is_zero() {
                adjust_balance(&mut tx, owner_id, -difference).await?;
            }
        }
        tx.commit().await?;

        info!(id, owner_id, amount = expense.amount_cents, "Updated expense");
        Ok(expense)
    }

    /// Deletes an expense with its paired withdrawal, crediting the amount
    /// back to the running balance.
    pub async fn delete_expense(&self, owner_id: &str, id: &str) -> DbResult<()> {
        let mut tx = begin_write(&self.pool).await?;

        let expense = fetch_expense(&mut tx, owner_id, id).await?;
        let reference = CashReference::Expense(expense.id.clone());
        if let Some(entry) = find_entry_by_reference(&mut tx, owner_id, &reference).await? {
            delete_entry(&mut tx, owner_id, &entry.id).await?;
            adjust_balance(&mut tx, owner_id, Money::from_cents(entry.amount_cents)).await?;
        }
        delete_expense(&mut tx, owner_id, id).await?;
        tx.commit().await?;

        info!(id, owner_id, amount = expense.amount_cents, "Deleted expense");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Cash register
    // -------------------------------------------------------------------------

    /// Records a manual deposit or withdrawal.
    ///
    /// ## Errors
    /// `InsufficientFunds` if a withdrawal would take the balance below zero.
    pub async fn record_cash_transaction(
        &self,
        owner_id: &str,
        actor_id: &str,
        new: NewCashTransaction,
    ) -> DbResult<CashRegisterEntry> {
        let mut tx = begin_write(&self.pool).await?;

        let movement = CashMovement::manual(
            new.transaction_type,
            Money::from_cents(new.amount_cents),
            new.category.trim().to_string(),
            new.description,
        );
        let entry = append_entry(&mut tx, owner_id, actor_id, &movement).await?;
        tx.commit().await?;

        info!(
            id = %entry.id,
            owner_id,
            kind = entry.transaction_type.as_str(),
            amount = entry.amount_cents,
            balance = entry.balance_cents,
            "Recorded cash transaction"
        );
        Ok(entry)
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Resolves and prices every requested line, moving stock when a direction
/// is given.
async fn take_lines(
    conn: &mut SqliteConnection,
    owner_id: &str,
    requests: &[LineRequest],
    direction: Option<StockDirection>,
) -> DbResult<Vec<LineItem>> {
    let mut items = Vec::with_capacity(requests.len());
    for request in requests {
        let product = fetch_active_product(conn, owner_id, &request.product_id).await?;
        let item = price_line(&product, request)?;
        if let Some(direction) = direction {
            move_stock(conn, &product, request.quantity, direction).await?;
        }
        items.push(item);
    }
    Ok(items)
}

/// Moves stock for already-priced lines.
///
/// Products deactivated since the record was written still take part.
async fn move_lines(
    conn: &mut SqliteConnection,
    owner_id: &str,
    items: &[LineItem],
    direction: StockDirection,
) -> DbResult<()> {
    for item in items {
        let product = fetch_product(conn, owner_id, &item.product_id).await?;
        move_stock(conn, &product, item.quantity, direction).await?;
    }
    Ok(())
}

/// Writes the cash entry for money paid against an invoice, if any.
async fn mirror_payment(
    conn: &mut SqliteConnection,
    invoice: &Invoice,
    actor_id: &str,
    amount: Money,
) -> DbResult<()> {
    if let Some(movement) = CashMovement::for_invoice(invoice, amount) {
        append_entry(conn, &invoice.owner_id, actor_id, &movement).await?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::cash_register::CashFilter;
    use crate::repository::product::NewProduct;
    use crate::{Database, DbConfig, DbError};
    use cafe_core::{CoreError, PaymentStatus, Product, Quantity};

    const OWNER: &str = "owner-1";
    const ACTOR: &str = "user-1";

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn product(db: &Database, code: &str, price: i64, stock: i64) -> Product {
        db.products()
            .insert(
                OWNER,
                NewProduct {
                    code: code.to_string(),
                    name: format!("Product {}", code),
                    description: None,
                    category: None,
                    price_cents: price,
                    cost_cents: price / 2,
                    stock_quantity: Quantity::from_units(stock),
                    minimum_stock: Quantity::zero(),
                },
            )
            .await
            .unwrap()
    }

    async fn stock_of(db: &Database, id: &str) -> Quantity {
        db.products().find(OWNER, id).await.unwrap().stock_quantity
    }

    fn line(product: &Product, units: i64) -> LineRequest {
        LineRequest {
            product_id: product.id.clone(),
            quantity: Quantity::from_units(units),
            discount_bps: 0,
        }
    }

    fn sale(items: Vec<LineRequest>, paid: i64) -> NewSale {
        NewSale {
            items,
            paid_cents: paid,
            ..Default::default()
        }
    }

    fn invoice(invoice_type: InvoiceType, items: Vec<LineRequest>, paid: i64) -> NewInvoice {
        NewInvoice {
            invoice_type,
            party: Party {
                name: "Acme Supplies".to_string(),
                phone: None,
                email: None,
                address: None,
            },
            items,
            discount_bps: 0,
            tax_cents: 0,
            paid_cents: paid,
            payment_method: PaymentMethod::Cash,
            status: InvoiceStatus::Confirmed,
            due_date: None,
            notes: None,
        }
    }

    async fn entries(db: &Database) -> Vec<CashRegisterEntry> {
        db.cash_register()
            .list(OWNER, &CashFilter::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_sale_computes_totals_and_takes_stock() {
        let db = setup().await;
        let p1 = product(&db, "P1", 1000, 5).await;

        let recorded = db
            .recorder()
            .record_sale(OWNER, ACTOR, sale(vec![line(&p1, 2)], 2000))
            .await
            .unwrap();

        assert_eq!(recorded.subtotal_cents, 2000);
        assert_eq!(recorded.total_cents, 2000);
        assert_eq!(recorded.remaining_cents, 0);
        assert_eq!(recorded.payment_status, PaymentStatus::Paid);
        assert_eq!(recorded.items[0].unit_price_cents, 1000);
        assert_eq!(recorded.items[0].unit_cost_cents, 500);
        assert!(recorded.sale_number.starts_with("SAL-"));
        assert_eq!(stock_of(&db, &p1.id).await, Quantity::from_units(3));

        // Sales are not mirrored to the cash register
        assert!(entries(&db).await.is_empty());
    }

    #[tokio::test]
    async fn test_sale_rejected_on_insufficient_stock() {
        let db = setup().await;
        let p1 = product(&db, "P1", 1000, 3).await;

        let err = db
            .recorder()
            .record_sale(OWNER, ACTOR, sale(vec![line(&p1, 5)], 0))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { .. })
        ));
        assert_eq!(stock_of(&db, &p1.id).await, Quantity::from_units(3));
        assert!(db.sales().list(OWNER, &Default::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_line_rolls_back_earlier_lines() {
        let db = setup().await;
        let plenty = product(&db, "A", 100, 10).await;
        let scarce = product(&db, "B", 100, 1).await;

        let result = db
            .recorder()
            .record_sale(
                OWNER,
                ACTOR,
                sale(vec![line(&plenty, 2), line(&plenty, 3), line(&scarce, 5)], 0),
            )
            .await;

        assert!(result.is_err());
        assert_eq!(stock_of(&db, &plenty.id).await, Quantity::from_units(10));
        assert_eq!(stock_of(&db, &scarce.id).await, Quantity::from_units(1));
    }

    #[tokio::test]
    async fn test_sale_scoped_to_owner() {
        let db = setup().await;
        let p1 = product(&db, "P1", 1000, 5).await;

        let err = db
            .recorder()
            .record_sale("owner-2", ACTOR, sale(vec![line(&p1, 1)], 0))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        assert_eq!(stock_of(&db, &p1.id).await, Quantity::from_units(5));
    }

    #[tokio::test]
    async fn test_cancel_sale_restores_stock_once() {
        let db = setup().await;
        let p1 = product(&db, "P1", 1000, 5).await;
        let recorder = db.recorder();

        let recorded = recorder
            .record_sale(OWNER, ACTOR, sale(vec![line(&p1, 2)], 500))
            .await
            .unwrap();
        let cancelled = recorder.cancel_sale(OWNER, &recorded.id).await.unwrap();

        assert_eq!(cancelled.status, SaleStatus::Cancelled);
        assert!(cancelled.cancelled_at.is_some());
        // Payment fields stay as collected
        assert_eq!(cancelled.paid_cents, 500);
        assert_eq!(cancelled.payment_status, PaymentStatus::Partial);
        assert_eq!(stock_of(&db, &p1.id).await, Quantity::from_units(5));

        let err = recorder.cancel_sale(OWNER, &recorded.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidState { .. })));
        assert_eq!(stock_of(&db, &p1.id).await, Quantity::from_units(5));
    }

    #[tokio::test]
    async fn test_update_sale_payment() {
        let db = setup().await;
        let p1 = product(&db, "P1", 1000, 5).await;
        let recorder = db.recorder();

        let recorded = recorder
            .record_sale(OWNER, ACTOR, sale(vec![line(&p1, 3)], 0))
            .await
            .unwrap();
        assert_eq!(recorded.payment_status, PaymentStatus::Unpaid);

        let updated = recorder
            .update_sale(
                OWNER,
                &recorded.id,
                SaleUpdate {
                    paid_cents: Some(1000),
                    notes: Some("table 4".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.remaining_cents, 2000);
        assert_eq!(updated.payment_status, PaymentStatus::Partial);
        assert_eq!(updated.notes.as_deref(), Some("table 4"));

        recorder.cancel_sale(OWNER, &recorded.id).await.unwrap();
        let err = recorder
            .update_sale(OWNER, &recorded.id, SaleUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn test_invoice_additional_payment() {
        let db = setup().await;
        let p1 = product(&db, "P1", 1000, 10).await;
        let recorder = db.recorder();

        let recorded = recorder
            .record_invoice(OWNER, ACTOR, invoice(InvoiceType::Sale, vec![line(&p1, 3)], 1000))
            .await
            .unwrap();
        assert_eq!(recorded.total_cents, 3000);
        assert!(recorded.invoice_number.starts_with("INV-"));
        assert_eq!(entries(&db).await.len(), 1);

        let paid = recorder
            .add_invoice_payment(
                OWNER,
                ACTOR,
                &recorded.id,
                InvoicePayment {
                    paid_cents: 2500,
                    payment_method: Some(PaymentMethod::Card),
                },
            )
            .await
            .unwrap();
        assert_eq!(paid.remaining_cents, 500);
        assert_eq!(paid.payment_status, PaymentStatus::Partial);
        assert_eq!(paid.payment_method, PaymentMethod::Card);

        let ledger = entries(&db).await;
        assert_eq!(ledger.len(), 2);
        let newest = &ledger[0];
        assert_eq!(newest.amount_cents, 1500);
        assert_eq!(newest.transaction_type, CashTransactionType::Deposit);
        assert_eq!(newest.balance_cents, 2500);
        assert_eq!(
            newest.reference,
            Some(CashReference::Invoice(recorded.id.clone()))
        );
    }

    #[tokio::test]
    async fn test_invoice_payment_must_increase() {
        let db = setup().await;
        let p1 = product(&db, "P1", 1000, 10).await;
        let recorder = db.recorder();

        let recorded = recorder
            .record_invoice(OWNER, ACTOR, invoice(InvoiceType::Sale, vec![line(&p1, 3)], 1000))
            .await
            .unwrap();

        for paid_cents in [1000, 400] {
            let err = recorder
                .add_invoice_payment(
                    OWNER,
                    ACTOR,
                    &recorded.id,
                    InvoicePayment {
                        paid_cents,
                        payment_method: None,
                    },
                )
                .await
                .unwrap_err();
            assert!(matches!(err, DbError::Domain(CoreError::InvalidAmount { .. })));
        }
        assert_eq!(entries(&db).await.len(), 1);
    }

    #[tokio::test]
    async fn test_purchase_invoice_receives_stock_and_withdraws_unguarded() {
        let db = setup().await;
        let beans = product(&db, "BEANS", 2000, 1).await;
        let recorder = db.recorder();

        let purchase = recorder
            .record_invoice(
                OWNER,
                ACTOR,
                invoice(InvoiceType::Purchase, vec![line(&beans, 4)], 3000),
            )
            .await
            .unwrap();
        assert!(purchase.invoice_number.starts_with("PUR-"));
        assert_eq!(stock_of(&db, &beans.id).await, Quantity::from_units(5));

        let ledger = entries(&db).await;
        assert_eq!(ledger[0].transaction_type, CashTransactionType::Withdrawal);
        assert_eq!(ledger[0].category, "purchases");
        assert_eq!(ledger[0].balance_cents, -3000);

        // Sell most of it, then cancelling the purchase can't take it back
        recorder
            .record_sale(OWNER, ACTOR, sale(vec![line(&beans, 4)], 0))
            .await
            .unwrap();
        let err = recorder.cancel_invoice(OWNER, &purchase.id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { .. })
        ));
        assert_eq!(stock_of(&db, &beans.id).await, Quantity::from_units(1));
    }

    #[tokio::test]
    async fn test_cancel_sale_invoice_keeps_cash_trail() {
        let db = setup().await;
        let p1 = product(&db, "P1", 1000, 10).await;
        let recorder = db.recorder();

        let recorded = recorder
            .record_invoice(OWNER, ACTOR, invoice(InvoiceType::Sale, vec![line(&p1, 4)], 4000))
            .await
            .unwrap();
        assert_eq!(stock_of(&db, &p1.id).await, Quantity::from_units(6));

        let cancelled = recorder.cancel_invoice(OWNER, &recorded.id).await.unwrap();
        assert_eq!(cancelled.status, InvoiceStatus::Cancelled);
        assert_eq!(cancelled.paid_cents, 4000);
        assert_eq!(stock_of(&db, &p1.id).await, Quantity::from_units(10));
        assert_eq!(entries(&db).await.len(), 1);
        assert_eq!(db.cash_register().balance(OWNER).await.unwrap().cents(), 4000);

        let err = recorder.cancel_invoice(OWNER, &recorded.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn test_draft_invoice_lifecycle() {
        let db = setup().await;
        let p1 = product(&db, "P1", 1000, 10).await;
        let recorder = db.recorder();

        let mut draft = invoice(InvoiceType::Sale, vec![line(&p1, 2)], 500);
        draft.status = InvoiceStatus::Draft;
        let recorded = recorder.record_invoice(OWNER, ACTOR, draft).await.unwrap();

        assert_eq!(recorded.status, InvoiceStatus::Draft);
        assert_eq!(recorded.total_cents, 2000);
        assert!(recorded.confirmed_at.is_none());
        assert_eq!(stock_of(&db, &p1.id).await, Quantity::from_units(10));
        assert!(entries(&db).await.is_empty());

        // Drafts can't take payments or be cancelled
        let err = recorder.cancel_invoice(OWNER, &recorded.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidState { .. })));

        let confirmed = recorder
            .confirm_invoice(OWNER, ACTOR, &recorded.id)
            .await
            .unwrap();
        assert_eq!(confirmed.status, InvoiceStatus::Confirmed);
        assert!(confirmed.confirmed_at.is_some());
        assert_eq!(stock_of(&db, &p1.id).await, Quantity::from_units(8));
        assert_eq!(entries(&db).await[0].amount_cents, 500);

        let err = recorder.void_invoice(OWNER, &recorded.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn test_void_draft_has_no_side_effects() {
        let db = setup().await;
        let p1 = product(&db, "P1", 1000, 10).await;
        let recorder = db.recorder();

        let mut draft = invoice(InvoiceType::Purchase, vec![line(&p1, 2)], 2000);
        draft.status = InvoiceStatus::Draft;
        let recorded = recorder.record_invoice(OWNER, ACTOR, draft).await.unwrap();

        let voided = recorder.void_invoice(OWNER, &recorded.id).await.unwrap();
        assert_eq!(voided.status, InvoiceStatus::Void);
        assert_eq!(stock_of(&db, &p1.id).await, Quantity::from_units(10));
        assert!(entries(&db).await.is_empty());
    }

    #[tokio::test]
    async fn test_manual_withdrawal_guard_vs_expense() {
        let db = setup().await;
        let recorder = db.recorder();

        recorder
            .record_cash_transaction(
                OWNER,
                ACTOR,
                NewCashTransaction {
                    transaction_type: CashTransactionType::Deposit,
                    amount_cents: 10000,
                    category: "float".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap();

        let err = recorder
            .record_cash_transaction(
                OWNER,
                ACTOR,
                NewCashTransaction {
                    transaction_type: CashTransactionType::Withdrawal,
                    amount_cents: 15000,
                    category: "petty cash".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientFunds { .. })
        ));
        assert_eq!(db.cash_register().balance(OWNER).await.unwrap().cents(), 10000);
        assert_eq!(entries(&db).await.len(), 1);

        let expense = recorder
            .record_expense(
                OWNER,
                ACTOR,
                NewExpense {
                    description: "Espresso machine repair".to_string(),
                    amount_cents: 15000,
                    category: ExpenseCategory::Maintenance,
                    payment_method: PaymentMethod::Cash,
                    expense_date: None,
                    recurrence: None,
                    notes: None,
                },
            )
            .await
            .unwrap();

        let ledger = entries(&db).await;
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger[0].balance_cents, -5000);
        assert_eq!(ledger[0].category, "maintenance");
        assert_eq!(ledger[0].reference, Some(CashReference::Expense(expense.id)));
    }

    #[tokio::test]
    async fn test_expense_update_and_delete_track_cash_entry() {
        let db = setup().await;
        let recorder = db.recorder();

        let expense = recorder
            .record_expense(
                OWNER,
                ACTOR,
                NewExpense {
                    description: "Milk".to_string(),
                    amount_cents: 500,
                    category: ExpenseCategory::Supplies,
                    payment_method: PaymentMethod::Cash,
                    expense_date: NaiveDate::from_ymd_opt(2026, 5, 2),
                    recurrence: None,
                    notes: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(db.cash_register().balance(OWNER).await.unwrap().cents(), -500);

        let updated = recorder
            .update_expense(
                OWNER,
                &expense.id,
                ExpenseUpdate {
                    amount_cents: Some(800),
                    category: Some(ExpenseCategory::Other),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.amount_cents, 800);

        let ledger = entries(&db).await;
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].amount_cents, 800);
        assert_eq!(ledger[0].category, "other");
        assert_eq!(db.cash_register().balance(OWNER).await.unwrap().cents(), -800);

        recorder.delete_expense(OWNER, &expense.id).await.unwrap();
        assert!(entries(&db).await.is_empty());
        assert_eq!(db.cash_register().balance(OWNER).await.unwrap().cents(), 0);
        assert!(db.expenses().get(OWNER, &expense.id).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_events_on_file_database() {
        let path = std::env::temp_dir().join(format!("cafe-concurrency-{}.db", generate_id()));
        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        let p1 = product(&db, "P1", 450, 40).await;

        let mut handles = Vec::new();
        for _ in 0..40 {
            let db = db.clone();
            let item = line(&p1, 1);
            handles.push(tokio::spawn(async move {
                db.recorder()
                    .record_sale(OWNER, ACTOR, sale(vec![item], 450))
                    .await
                    .map(|_| ())
            }));
        }
        for i in 0..10 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                db.recorder()
                    .record_expense(
                        OWNER,
                        ACTOR,
                        NewExpense {
                            description: format!("Milk run {}", i),
                            amount_cents: 100,
                            category: ExpenseCategory::Supplies,
                            payment_method: PaymentMethod::Cash,
                            expense_date: None,
                            recurrence: None,
                            notes: None,
                        },
                    )
                    .await
                    .map(|_| ())
            }));
        }

        let mut failures = Vec::new();
        for handle in handles {
            if let Err(err) = handle.await.unwrap() {
                failures.push(err.to_string());
            }
        }
        assert!(failures.is_empty(), "{:?}", failures);

        assert_eq!(stock_of(&db, &p1.id).await, Quantity::zero());
        assert_eq!(entries(&db).await.len(), 10);
        assert_eq!(db.cash_register().balance(OWNER).await.unwrap().cents(), -1000);

        // One more sale finds no stock left
        let err = db
            .recorder()
            .record_sale(OWNER, ACTOR, sale(vec![line(&p1, 1)], 0))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InsufficientStock { .. })));

        db.pool().close().await;
        for suffix in ["", "-wal", "-shm"] {
            let mut file = path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}
