//! # Financial Module
//!
//! The rules that turn one sale, invoice, or expense into its derived state:
//! totals, payment status, stock movement, and the mirrored cash entry.
//!
//! ## Recording Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  LineRequest[] ──► price_line (snapshot price/cost) ──► LineItem[]      │
//! │                                                            │            │
//! │                                                            ▼            │
//! │  subtotal = Σ line_total                                                │
//! │  total    = subtotal - round(subtotal × order discount) + tax           │
//! │  remaining = total - paid                                               │
//! │  payment_status = paid | partial | unpaid                               │
//! │                                                            │            │
//! │          ┌─────────────────────────────────────────────────┤            │
//! │          ▼                                                 ▼            │
//! │  StockDirection (out for sales, in for purchases)   CashMovement        │
//! │  applied per line                                   (invoice paid,      │
//! │                                                      expense amount)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every derived amount is bounded by [`MAX_MONEY_CENTS`]; pricing or totals
//! beyond it fail with `InvalidAmount` rather than wrapping.
//!
//! Nothing here touches storage. `cafe-db` runs these rules inside one
//! transaction per financial event.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{Money, Percent};
use crate::quantity::Quantity;
use crate::types::{
    CashReference, CashTransactionType, Expense, Invoice, InvoiceStatus, InvoiceType, LineItem,
    Product, Sale, SaleStatus,
};
use crate::MAX_MONEY_CENTS;

/// Unwraps a checked amount, rejecting overflow and anything past the cap.
fn bounded(amount: Option<Money>, what: &str) -> CoreResult<Money> {
    match amount {
        Some(m) if m.cents().abs() <= MAX_MONEY_CENTS => Ok(m),
        _ => Err(CoreError::InvalidAmount {
            reason: format!(
                "{} exceeds the maximum of {}",
                what,
                Money::from_cents(MAX_MONEY_CENTS)
            ),
        }),
    }
}

// =============================================================================
// Payment Status
// =============================================================================

/// Derived classification of how much of a total has been paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

impl PaymentStatus {
    /// `paid` once nothing remains, `partial` if anything was paid,
    /// otherwise `unpaid`.
    pub fn derive(paid: Money, remaining: Money) -> Self {
        if remaining.cents() <= 0 {
            PaymentStatus::Paid
        } else if paid.is_positive() {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Unpaid
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
        }
    }
}

// =============================================================================
// Line Pricing
// =============================================================================

/// One requested line before pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineRequest {
    pub product_id: String,
    pub quantity: Quantity,
    #[serde(default)]
    pub discount_bps: u32,
}

/// Prices a line against the current product, snapshotting its fields.
///
/// ## Example
/// ```rust,ignore
/// let item = price_line(&product, &request)?;
/// assert_eq!(item.unit_price_cents, product.price_cents);
/// ```
pub fn price_line(product: &Product, request: &LineRequest) -> CoreResult<LineItem> {
    let discount = Percent::from_bps(request.discount_bps);
    let gross = bounded(
        product.price().multiply_quantity(request.quantity),
        &format!("line total for {}", product.code),
    )?;
    let line_total = bounded(
        gross.apply_discount(discount),
        &format!("line total for {}", product.code),
    )?;

    Ok(LineItem {
        product_id: product.id.clone(),
        code: product.code.clone(),
        name: product.name.clone(),
        quantity: request.quantity,
        unit_price_cents: product.price_cents,
        unit_cost_cents: product.cost_cents,
        discount_bps: request.discount_bps,
        line_total_cents: line_total.cents(),
    })
}

/// Exact sum of the line totals.
pub fn subtotal(items: &[LineItem]) -> CoreResult<Money> {
    bounded(
        Money::checked_sum(items.iter().map(LineItem::line_total)),
        "subtotal",
    )
}

// =============================================================================
// Totals
// =============================================================================

/// The derived money fields of a sale or invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub subtotal: Money,
    pub discount: Percent,
    pub tax: Money,
    pub total: Money,
    pub paid: Money,
    pub remaining: Money,
    pub payment_status: PaymentStatus,
}

impl Totals {
    /// Computes total, remaining and payment status.
    ///
    /// Fails with `InvalidAmount` when the total or the remaining balance
    /// exceeds [`MAX_MONEY_CENTS`].
    pub fn compute(
        subtotal: Money,
        discount: Percent,
        tax: Money,
        paid: Money,
    ) -> CoreResult<Self> {
        let discounted = subtotal.apply_discount(discount);
        let total = bounded(discounted.and_then(|d| d.checked_add(tax)), "total")?;
        let remaining = bounded(total.checked_sub(paid), "remaining balance")?;
        Ok(Totals {
            subtotal,
            discount,
            tax,
            total,
            paid,
            remaining,
            payment_status: PaymentStatus::derive(paid, remaining),
        })
    }

    /// Same totals with a different paid amount.
    pub fn with_paid(self, paid: Money) -> CoreResult<Self> {
        Totals::compute(self.subtotal, self.discount, self.tax, paid)
    }
}

impl Sale {
    pub fn totals(&self) -> CoreResult<Totals> {
        Totals::compute(
            Money::from_cents(self.subtotal_cents),
            Percent::from_bps(self.discount_bps),
            Money::from_cents(self.tax_cents),
            Money::from_cents(self.paid_cents),
        )
    }

    /// Writes the paid-dependent fields back onto the sale.
    pub fn apply_totals(&mut self, totals: &Totals) {
        self.subtotal_cents = totals.subtotal.cents();
        self.discount_bps = totals.discount.bps();
        self.tax_cents = totals.tax.cents();
        self.total_cents = totals.total.cents();
        self.paid_cents = totals.paid.cents();
        self.remaining_cents = totals.remaining.cents();
        self.payment_status = totals.payment_status;
    }

    /// Only confirmed sales can be cancelled.
    pub fn ensure_cancellable(&self) -> CoreResult<()> {
        self.ensure_confirmed("cancel")
    }

    /// Payment fields of a cancelled sale are frozen.
    pub fn ensure_editable(&self) -> CoreResult<()> {
        self.ensure_confirmed("update")
    }

    fn ensure_confirmed(&self, operation: &'static str) -> CoreResult<()> {
        if self.status != SaleStatus::Confirmed {
            return Err(CoreError::InvalidState {
                entity: "Sale",
                id: self.id.clone(),
                status: self.status.to_string(),
                operation,
            });
        }
        Ok(())
    }
}

impl Invoice {
    pub fn totals(&self) -> CoreResult<Totals> {
        Totals::compute(
            Money::from_cents(self.subtotal_cents),
            Percent::from_bps(self.discount_bps),
            Money::from_cents(self.tax_cents),
            Money::from_cents(self.paid_cents),
        )
    }

    pub fn apply_totals(&mut self, totals: &Totals) {
        self.subtotal_cents = totals.subtotal.cents();
        self.discount_bps = totals.discount.bps();
        self.tax_cents = totals.tax.cents();
        self.total_cents = totals.total.cents();
        self.paid_cents = totals.paid.cents();
        self.remaining_cents = totals.remaining.cents();
        self.payment_status = totals.payment_status;
    }

    /// Draft → confirmed.
    pub fn ensure_confirmable(&self) -> CoreResult<()> {
        self.ensure_status(InvoiceStatus::Draft, "confirm")
    }

    /// Additional payments need a confirmed invoice.
    pub fn ensure_payable(&self) -> CoreResult<()> {
        self.ensure_status(InvoiceStatus::Confirmed, "accept payment")
    }

    /// Confirmed → cancelled.
    pub fn ensure_cancellable(&self) -> CoreResult<()> {
        self.ensure_status(InvoiceStatus::Confirmed, "cancel")
    }

    /// Draft → void.
    pub fn ensure_voidable(&self) -> CoreResult<()> {
        self.ensure_status(InvoiceStatus::Draft, "void")
    }

    /// Notes and due date stay editable until the invoice is closed.
    pub fn ensure_editable(&self) -> CoreResult<()> {
        match self.status {
            InvoiceStatus::Draft | InvoiceStatus::Confirmed => Ok(()),
            _ => Err(self.invalid_state("update")),
        }
    }

    /// Stock direction while this invoice is confirmed.
    pub fn stock_direction(&self) -> StockDirection {
        StockDirection::for_invoice(self.invoice_type)
    }

    fn ensure_status(&self, required: InvoiceStatus, operation: &'static str) -> CoreResult<()> {
        if self.status != required {
            return Err(self.invalid_state(operation));
        }
        Ok(())
    }

    fn invalid_state(&self, operation: &'static str) -> CoreError {
        CoreError::InvalidState {
            entity: "Invoice",
            id: self.id.clone(),
            status: self.status.to_string(),
            operation,
        }
    }
}

// =============================================================================
// Payment Delta
// =============================================================================

/// The increase from the current paid amount to the new one.
///
/// Payments only ever grow through this path; a zero or negative delta is
/// rejected with `InvalidAmount`.
pub fn payment_delta(current_paid: Money, new_paid: Money) -> CoreResult<Money> {
    let delta = bounded(new_paid.checked_sub(current_paid), "payment")?;
    if !delta.is_positive() {
        return Err(CoreError::InvalidAmount {
            reason: format!(
                "new paid amount {} must exceed current paid amount {}",
                new_paid, current_paid
            ),
        });
    }
    Ok(delta)
}

// =============================================================================
// Stock Direction
// =============================================================================

/// Which way a confirmed record moves stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDirection {
    /// Stock decreases (sales, sale invoices). Checked for sufficiency.
    Outbound,
    /// Stock increases (purchase invoices).
    Inbound,
}

impl StockDirection {
    pub fn for_invoice(invoice_type: InvoiceType) -> Self {
        match invoice_type {
            InvoiceType::Sale => StockDirection::Outbound,
            InvoiceType::Purchase => StockDirection::Inbound,
        }
    }

    /// The opposite movement, used when cancelling.
    pub fn reverse(self) -> Self {
        match self {
            StockDirection::Outbound => StockDirection::Inbound,
            StockDirection::Inbound => StockDirection::Outbound,
        }
    }

    /// Signed stock delta for a line quantity.
    pub fn delta(self, quantity: Quantity) -> Quantity {
        match self {
            StockDirection::Outbound => -quantity,
            StockDirection::Inbound => quantity,
        }
    }
}

/// Rejects an outbound movement the product cannot cover.
pub fn ensure_stock(product: &Product, requested: Quantity) -> CoreResult<()> {
    if !product.can_supply(requested) {
        return Err(CoreError::InsufficientStock {
            code: product.code.clone(),
            available: product.stock_quantity,
            requested,
        });
    }
    Ok(())
}

// =============================================================================
// Cash Mirroring
// =============================================================================

/// Cash-register category for sale-invoice receipts.
pub const SALES_CATEGORY: &str = "sales";
/// Cash-register category for purchase-invoice payments.
pub const PURCHASES_CATEGORY: &str = "purchases";

/// A cash-register entry about to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CashMovement {
    pub transaction_type: CashTransactionType,
    pub amount: Money,
    pub category: String,
    pub description: Option<String>,
    pub reference: Option<CashReference>,
    /// Only manual withdrawals refuse to overdraw the balance.
    pub guarded: bool,
}

impl CashMovement {
    /// Movement for money paid against an invoice; `None` when nothing was paid.
    pub fn for_invoice(invoice: &Invoice, amount: Money) -> Option<Self> {
        if !amount.is_positive() {
            return None;
        }
        let (transaction_type, category) = match invoice.invoice_type {
            InvoiceType::Sale => (CashTransactionType::Deposit, SALES_CATEGORY),
            InvoiceType::Purchase => (CashTransactionType::Withdrawal, PURCHASES_CATEGORY),
        };
        Some(CashMovement {
            transaction_type,
            amount,
            category: category.to_string(),
            description: Some(format!("Invoice {}", invoice.invoice_number)),
            reference: Some(CashReference::Invoice(invoice.id.clone())),
            guarded: false,
        })
    }

    /// The single withdrawal paired with an expense.
    pub fn for_expense(expense: &Expense) -> Self {
        CashMovement {
            transaction_type: CashTransactionType::Withdrawal,
            amount: expense.amount(),
            category: expense.category.as_str().to_string(),
            description: Some(expense.description.clone()),
            reference: Some(CashReference::Expense(expense.id.clone())),
            guarded: false,
        }
    }

    /// A direct deposit or withdrawal entered by hand.
    pub fn manual(
        transaction_type: CashTransactionType,
        amount: Money,
        category: String,
        description: Option<String>,
    ) -> Self {
        CashMovement {
            transaction_type,
            amount,
            category,
            description,
            reference: None,
            guarded: transaction_type == CashTransactionType::Withdrawal,
        }
    }

    /// Signed effect on the running balance.
    pub fn signed_amount(&self) -> Money {
        self.transaction_type.signed(self.amount)
    }

    /// Balance after applying this movement, enforcing the manual guard.
    pub fn apply_to(&self, balance: Money) -> CoreResult<Money> {
        let next = balance
            .checked_add(self.signed_amount())
            .ok_or_else(|| CoreError::InvalidAmount {
                reason: format!("cash balance {} cannot absorb {}", balance, self.amount),
            })?;
        if self.guarded && next.is_negative() {
            return Err(CoreError::InsufficientFunds {
                balance,
                requested: self.amount,
            });
        }
        Ok(next)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Party, PaymentMethod};
    use chrono::Utc;

    fn product(price: i64, stock: i64) -> Product {
        Product {
            id: "p1".to_string(),
            owner_id: "o1".to_string(),
            code: "P1".to_string(),
            name: "Espresso".to_string(),
            description: None,
            category: None,
            price_cents: price,
            cost_cents: price / 2,
            stock_quantity: Quantity::from_units(stock),
            minimum_stock: Quantity::zero(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn invoice(invoice_type: InvoiceType, status: InvoiceStatus, total: i64, paid: i64) -> Invoice {
        let totals = Totals::compute(
            Money::from_cents(total),
            Percent::zero(),
            Money::zero(),
            Money::from_cents(paid),
        )
        .unwrap();
        Invoice {
            id: "i1".to_string(),
            owner_id: "o1".to_string(),
            invoice_number: "INV-1".to_string(),
            invoice_type,
            party: Party {
                name: "Acme".to_string(),
                phone: None,
                email: None,
                address: None,
            },
            items: vec![],
            subtotal_cents: total,
            discount_bps: 0,
            tax_cents: 0,
            total_cents: totals.total.cents(),
            paid_cents: paid,
            remaining_cents: totals.remaining.cents(),
            payment_status: totals.payment_status,
            payment_method: PaymentMethod::Cash,
            status,
            due_date: None,
            notes: None,
            created_by: "u1".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            confirmed_at: None,
            cancelled_at: None,
        }
    }

    fn request(quantity: Quantity, discount_bps: u32) -> LineRequest {
        LineRequest {
            product_id: "p1".to_string(),
            quantity,
            discount_bps,
        }
    }

    #[test]
    fn test_price_line_snapshots_product() {
        let p = product(1000, 5);
        let item = price_line(&p, &request(Quantity::from_units(2), 0)).unwrap();

        assert_eq!(item.unit_price_cents, 1000);
        assert_eq!(item.unit_cost_cents, 500);
        assert_eq!(item.code, "P1");
        assert_eq!(item.line_total_cents, 2000);
    }

    #[test]
    fn test_line_discount() {
        let p = product(999, 10);
        // 3 × 9.99 = 29.97, 15% off = 29.97 - 4.50 = 25.47
        let item = price_line(&p, &request(Quantity::from_units(3), 1500)).unwrap();
        assert_eq!(item.line_total_cents, 2547);
    }

    #[test]
    fn test_subtotal_is_exact_sum() {
        let p = product(333, 10);
        let items: Vec<LineItem> = [100, 250, 1]
            .iter()
            .map(|h| price_line(&p, &request(Quantity::from_hundredths(*h), 700)).unwrap())
            .collect();
        let expected: i64 = items.iter().map(|i| i.line_total_cents).sum();
        assert_eq!(subtotal(&items).unwrap().cents(), expected);
    }

    #[test]
    fn test_oversized_line_is_rejected() {
        // 2^62 cents × 4 used to wrap to a zero line total
        let p = product(4_611_686_018_427_387_904, 10);
        let err = price_line(&p, &request(Quantity::from_units(4), 0)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidAmount { .. }));

        // Under the i64 limit but past the money cap
        let p = product(MAX_MONEY_CENTS, 10);
        assert!(price_line(&p, &request(Quantity::from_units(1), 0)).is_ok());
        assert!(matches!(
            price_line(&p, &request(Quantity::from_units(2), 0)),
            Err(CoreError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_subtotal_past_cap_is_rejected() {
        let p = product(MAX_MONEY_CENTS, 10);
        let line = price_line(&p, &request(Quantity::from_units(1), 0)).unwrap();
        assert!(matches!(
            subtotal(&[line.clone(), line]),
            Err(CoreError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_totals_reject_unbounded_tax() {
        let err = Totals::compute(
            Money::from_cents(1000),
            Percent::zero(),
            Money::from_cents(i64::MAX),
            Money::zero(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidAmount { .. }));

        assert!(Totals::compute(
            Money::from_cents(1000),
            Percent::zero(),
            Money::zero(),
            Money::from_cents(i64::MIN),
        )
        .is_err());
    }

    #[test]
    fn test_totals_with_order_discount_and_tax() {
        let totals = Totals::compute(
            Money::from_cents(10000),
            Percent::from_bps(1000),
            Money::from_cents(500),
            Money::from_cents(4000),
        )
        .unwrap();
        assert_eq!(totals.total.cents(), 9500);
        assert_eq!(totals.remaining.cents(), 5500);
        assert_eq!(totals.payment_status, PaymentStatus::Partial);
    }

    #[test]
    fn test_payment_status_rules() {
        let total = Money::from_cents(3000);
        let status = |paid: i64| {
            Totals::compute(total, Percent::zero(), Money::zero(), Money::from_cents(paid))
                .unwrap()
                .payment_status
        };
        assert_eq!(status(0), PaymentStatus::Unpaid);
        assert_eq!(status(1), PaymentStatus::Partial);
        assert_eq!(status(3000), PaymentStatus::Paid);
        assert_eq!(status(5000), PaymentStatus::Paid);

        // A zero total is paid even with nothing paid
        let free =
            Totals::compute(Money::zero(), Percent::zero(), Money::zero(), Money::zero()).unwrap();
        assert_eq!(free.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn test_payment_delta() {
        let delta = payment_delta(Money::from_cents(1000), Money::from_cents(2500)).unwrap();
        assert_eq!(delta.cents(), 1500);

        assert!(matches!(
            payment_delta(Money::from_cents(1000), Money::from_cents(1000)),
            Err(CoreError::InvalidAmount { .. })
        ));
        assert!(matches!(
            payment_delta(Money::from_cents(1000), Money::from_cents(500)),
            Err(CoreError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_additional_payment_scenario() {
        let mut inv = invoice(InvoiceType::Sale, InvoiceStatus::Confirmed, 3000, 1000);
        inv.ensure_payable().unwrap();

        let new_paid = Money::from_cents(2500);
        let delta = payment_delta(inv.totals().unwrap().paid, new_paid).unwrap();
        let totals = inv.totals().unwrap().with_paid(new_paid).unwrap();
        inv.apply_totals(&totals);

        assert_eq!(delta.cents(), 1500);
        assert_eq!(inv.remaining_cents, 500);
        assert_eq!(inv.payment_status, PaymentStatus::Partial);

        let movement = CashMovement::for_invoice(&inv, delta).unwrap();
        assert_eq!(movement.amount.cents(), 1500);
        assert_eq!(movement.transaction_type, CashTransactionType::Deposit);
    }

    #[test]
    fn test_invoice_state_guards() {
        let draft = invoice(InvoiceType::Sale, InvoiceStatus::Draft, 100, 0);
        assert!(draft.ensure_confirmable().is_ok());
        assert!(draft.ensure_voidable().is_ok());
        assert!(draft.ensure_payable().is_err());
        assert!(draft.ensure_cancellable().is_err());

        let cancelled = invoice(InvoiceType::Sale, InvoiceStatus::Cancelled, 100, 0);
        let err = cancelled.ensure_cancellable().unwrap_err();
        assert!(matches!(err, CoreError::InvalidState { .. }));
        assert!(cancelled.ensure_editable().is_err());
    }

    #[test]
    fn test_stock_direction() {
        let qty = Quantity::from_units(2);
        assert_eq!(StockDirection::Outbound.delta(qty), -qty);
        assert_eq!(StockDirection::Outbound.reverse(), StockDirection::Inbound);
        assert_eq!(
            StockDirection::for_invoice(InvoiceType::Purchase),
            StockDirection::Inbound
        );
    }

    #[test]
    fn test_ensure_stock() {
        let p = product(1000, 3);
        assert!(ensure_stock(&p, Quantity::from_units(3)).is_ok());
        let err = ensure_stock(&p, Quantity::from_units(5)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Insufficient stock for P1: available 3, requested 5"
        );
    }

    #[test]
    fn test_invoice_cash_direction() {
        let purchase = invoice(InvoiceType::Purchase, InvoiceStatus::Confirmed, 100, 100);
        let movement = CashMovement::for_invoice(&purchase, Money::from_cents(100)).unwrap();
        assert_eq!(movement.transaction_type, CashTransactionType::Withdrawal);
        assert_eq!(movement.category, PURCHASES_CATEGORY);
        assert_eq!(movement.reference, Some(CashReference::Invoice("i1".to_string())));

        assert!(CashMovement::for_invoice(&purchase, Money::zero()).is_none());
    }

    #[test]
    fn test_withdrawal_guard_asymmetry() {
        let balance = Money::from_cents(100);

        let manual = CashMovement::manual(
            CashTransactionType::Withdrawal,
            Money::from_cents(500),
            "petty cash".to_string(),
            None,
        );
        assert!(matches!(
            manual.apply_to(balance),
            Err(CoreError::InsufficientFunds { .. })
        ));

        let expense_like = CashMovement {
            guarded: false,
            ..manual
        };
        assert_eq!(expense_like.apply_to(balance).unwrap().cents(), -400);
    }

    #[test]
    fn test_balance_overflow_is_an_error() {
        let deposit = CashMovement::manual(
            CashTransactionType::Deposit,
            Money::from_cents(1),
            "float".to_string(),
            None,
        );
        assert!(matches!(
            deposit.apply_to(Money::from_cents(i64::MAX)),
            Err(CoreError::InvalidAmount { .. })
        ));
    }
}
