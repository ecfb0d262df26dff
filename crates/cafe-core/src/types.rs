//! # Domain Types
//!
//! Core domain types used throughout the cafe back end.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │  Sale / Invoice │   │    Expense      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  code (business)│   │  number         │   │  amount_cents   │       │
//! │  │  price_cents    │   │  items[] ───────┼─► │  category       │       │
//! │  │  stock_quantity │   │  totals, status │   │  recurrence?    │       │
//! │  └─────────────────┘   └────────┬────────┘   └────────┬────────┘       │
//! │                                 │ paid amount         │ amount         │
//! │                                 ▼                     ▼                │
//! │                        ┌───────────────────────────────────┐           │
//! │                        │        CashRegisterEntry          │           │
//! │                        │  deposit | withdrawal, balance,   │           │
//! │                        │  reference: Invoice(id)|Expense(id)│          │
//! │                        └───────────────────────────────────┘           │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │      User       │   │    BlogPost     │   (outside the money flow)  │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for lookups and references
//! - Business ID: (code, sale_number, invoice_number, slug) - human-readable
//!
//! ## Owner Scoping
//! Every financial entity carries `owner_id`; all reads and writes filter by it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::access::{Permission, Principal, Role};
use crate::financial::PaymentStatus;
use crate::money::{Money, Percent};
use crate::quantity::Quantity;

// =============================================================================
// User
// =============================================================================

/// An account. The password hash never leaves the database layer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct User {
    pub id: String,
    /// The cafe owner this account works for, if it isn't an owner itself.
    pub owner_id: Option<String>,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub permissions: Vec<Permission>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// The acting principal for this account.
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id.clone(),
            owner_id: self.owner_id.clone(),
            role: self.role,
            permissions: self.permissions.clone(),
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product the cafe sells or buys.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Owner this product belongs to.
    pub owner_id: String,

    /// Business identifier, unique per owner.
    pub code: String,

    /// Display name.
    pub name: String,

    pub description: Option<String>,

    /// Free-form grouping (e.g. "beverages").
    pub category: Option<String>,

    /// Selling price in cents.
    pub price_cents: i64,

    /// Purchase cost in cents (for profit reports).
    pub cost_cents: i64,

    /// Current stock, never negative.
    pub stock_quantity: Quantity,

    /// Low-stock threshold.
    pub minimum_stock: Quantity,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the cost as a Money type.
    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }

    /// Checks if the product can cover an outbound quantity.
    pub fn can_supply(&self, quantity: Quantity) -> bool {
        self.stock_quantity >= quantity
    }

    /// Stock at or below the configured minimum.
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.minimum_stock
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Other => "other",
        }
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// A product line embedded in a sale or invoice.
///
/// Uses the snapshot pattern: code, name, price and cost are copied from the
/// product when the line is priced and never follow later product edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    pub product_id: String,
    /// Product code at time of pricing (frozen).
    pub code: String,
    /// Product name at time of pricing (frozen).
    pub name: String,
    pub quantity: Quantity,
    /// Unit price in cents at time of pricing (frozen).
    pub unit_price_cents: i64,
    /// Unit cost in cents at time of pricing (frozen).
    pub unit_cost_cents: i64,
    /// Line discount in basis points.
    pub discount_bps: u32,
    /// quantity × unit price, less the line discount.
    pub line_total_cents: i64,
}

impl LineItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn discount(&self) -> Percent {
        Percent::from_bps(self.discount_bps)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }

    /// Cost of goods for this line, `None` if it leaves the i64 range.
    pub fn line_cost(&self) -> Option<Money> {
        Money::from_cents(self.unit_cost_cents).multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Sale
// =============================================================================

/// The status of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Stock has been taken out.
    Confirmed,
    /// Stock has been put back; payment fields are frozen.
    Cancelled,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Confirmed => "confirmed",
            SaleStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point-of-sale transaction.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub owner_id: String,
    /// Human-readable number, e.g. `SAL-20260101-1A2B3C`.
    pub sale_number: String,
    pub items: Vec<LineItem>,
    pub subtotal_cents: i64,
    /// Order-level discount in basis points.
    pub discount_bps: u32,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub remaining_cents: i64,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub customer_name: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Invoice
// =============================================================================

/// Which way goods and money flow for an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceType {
    /// Goods out, money in.
    Sale,
    /// Goods in, money out.
    Purchase,
}

impl InvoiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceType::Sale => "sale",
            InvoiceType::Purchase => "purchase",
        }
    }
}

/// Invoice lifecycle.
///
/// ```text
///   draft ──confirm──► confirmed ──cancel──► cancelled
///     │
///     └────void──────► void
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Confirmed,
    Cancelled,
    Void,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Confirmed => "confirmed",
            InvoiceStatus::Cancelled => "cancelled",
            InvoiceStatus::Void => "void",
        }
    }
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Confirmed
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The counterparty of an invoice (customer or supplier).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Party {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// A sale or purchase invoice.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    pub owner_id: String,
    /// `INV-…` for sale invoices, `PUR-…` for purchase invoices.
    pub invoice_number: String,
    pub invoice_type: InvoiceType,
    pub party: Party,
    pub items: Vec<LineItem>,
    pub subtotal_cents: i64,
    pub discount_bps: u32,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub remaining_cents: i64,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub status: InvoiceStatus,
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub confirmed_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Expense
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Rent,
    Utilities,
    Salaries,
    Supplies,
    Maintenance,
    Marketing,
    Taxes,
    Other,
}

impl ExpenseCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Rent => "rent",
            ExpenseCategory::Utilities => "utilities",
            ExpenseCategory::Salaries => "salaries",
            ExpenseCategory::Supplies => "supplies",
            ExpenseCategory::Maintenance => "maintenance",
            ExpenseCategory::Marketing => "marketing",
            ExpenseCategory::Taxes => "taxes",
            ExpenseCategory::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceFrequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// Recurrence metadata. Informational only; nothing is scheduled from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Recurrence {
    pub frequency: RecurrenceFrequency,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub next_due: Option<NaiveDate>,
}

/// A standalone outgoing payment.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Expense {
    pub id: String,
    pub owner_id: String,
    pub description: String,
    pub amount_cents: i64,
    pub category: ExpenseCategory,
    pub payment_method: PaymentMethod,
    #[ts(as = "String")]
    pub expense_date: NaiveDate,
    pub recurrence: Option<Recurrence>,
    pub notes: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Cash Register
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CashTransactionType {
    Deposit,
    Withdrawal,
}

impl CashTransactionType {
    /// The signed effect of `amount` on the running balance.
    pub fn signed(&self, amount: Money) -> Money {
        match self {
            CashTransactionType::Deposit => amount,
            CashTransactionType::Withdrawal => -amount,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CashTransactionType::Deposit => "deposit",
            CashTransactionType::Withdrawal => "withdrawal",
        }
    }
}

/// The record that caused a cash-register entry.
///
/// Serialises as `{"type": "invoice", "id": "…"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum CashReference {
    Invoice(String),
    Expense(String),
}

impl CashReference {
    /// Stored discriminator.
    pub fn kind(&self) -> &'static str {
        match self {
            CashReference::Invoice(_) => "invoice",
            CashReference::Expense(_) => "expense",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            CashReference::Invoice(id) | CashReference::Expense(id) => id,
        }
    }

    /// Rebuilds the reference from its stored columns.
    pub fn from_parts(kind: &str, id: String) -> Option<Self> {
        match kind {
            "invoice" => Some(CashReference::Invoice(id)),
            "expense" => Some(CashReference::Expense(id)),
            _ => None,
        }
    }
}

/// One append-only ledger row.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashRegisterEntry {
    pub id: String,
    pub owner_id: String,
    pub transaction_type: CashTransactionType,
    pub amount_cents: i64,
    /// Owner's running balance right after this entry.
    pub balance_cents: i64,
    /// "sales", "purchases", an expense category, or free text.
    pub category: String,
    pub description: Option<String>,
    pub reference: Option<CashReference>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Blog
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Draft,
    Published,
}

impl Default for PostStatus {
    fn default() -> Self {
        PostStatus::Draft
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BlogPost {
    pub id: String,
    pub author_id: String,
    pub title: String,
    /// URL key, unique across all posts.
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub tags: Vec<String>,
    pub status: PostStatus,
    #[ts(as = "Option<String>")]
    pub published_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Derives a URL slug from a title.
///
/// Lowercases, collapses every run of non-alphanumerics to a single `-`,
/// and trims dashes from both ends.
///
/// ## Example
/// ```rust
/// use cafe_core::types::slugify;
///
/// assert_eq!(slugify("  Hello, World! 2026 "), "hello-world-2026");
/// ```
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cash_reference_wire_shape() {
        let reference = CashReference::Invoice("inv-1".to_string());
        let json = serde_json::to_value(&reference).unwrap();
        assert_eq!(json, serde_json::json!({"type": "invoice", "id": "inv-1"}));

        let back: CashReference =
            serde_json::from_value(serde_json::json!({"type": "expense", "id": "e-9"})).unwrap();
        assert_eq!(back, CashReference::Expense("e-9".to_string()));
    }

    #[test]
    fn test_cash_reference_from_parts() {
        let r = CashReference::from_parts("expense", "e1".to_string()).unwrap();
        assert_eq!(r.kind(), "expense");
        assert_eq!(r.id(), "e1");
        assert!(CashReference::from_parts("sale", "s1".to_string()).is_none());
    }

    #[test]
    fn test_signed_amounts() {
        let amount = Money::from_cents(500);
        assert_eq!(CashTransactionType::Deposit.signed(amount).cents(), 500);
        assert_eq!(CashTransactionType::Withdrawal.signed(amount).cents(), -500);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Our New Espresso Blend"), "our-new-espresso-blend");
        assert_eq!(slugify("--Café & Crème--"), "caf-cr-me");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_invoice_status_default_is_confirmed() {
        assert_eq!(InvoiceStatus::default(), InvoiceStatus::Confirmed);
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::BankTransfer).unwrap(),
            "\"bank_transfer\""
        );
        assert_eq!(
            serde_json::to_string(&ExpenseCategory::Utilities).unwrap(),
            "\"utilities\""
        );
    }
}
