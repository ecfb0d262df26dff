//! # cafe-core: Pure Business Logic for the Cafe Back End
//!
//! This crate holds every business rule of the cafe back end as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cafe Back End Architecture                       │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    REST API (apps/api)                          │   │
//! │  │    auth ──► validation ──► routes ──► JSON envelopes            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               cafe-db (repositories + recorder)                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ cafe-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ financial │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │  Totals   │  │   rules   │  │   │
//! │  │   │  Invoice  │  │  Percent  │  │  Status   │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, Invoice, Expense, CashRegisterEntry, BlogPost)
//! - [`money`] - Money and Percent types with integer arithmetic
//! - [`quantity`] - Quantities in hundredths of a unit
//! - [`financial`] - Totals, payment status, stock direction, cash mirroring
//! - [`access`] - Roles, permissions and the acting principal
//! - [`error`] - Domain error types
//! - [`validation`] - Field-level validation
//!
//! ## Example Usage
//!
//! ```rust
//! use cafe_core::financial::{PaymentStatus, Totals};
//! use cafe_core::money::{Money, Percent};
//!
//! let totals = Totals::compute(
//!     Money::from_cents(2000),
//!     Percent::zero(),
//!     Money::zero(),
//!     Money::from_cents(2000),
//! )?;
//!
//! assert_eq!(totals.remaining.cents(), 0);
//! assert_eq!(totals.payment_status, PaymentStatus::Paid);
//! # Ok::<(), cafe_core::CoreError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod error;
pub mod financial;
pub mod money;
pub mod quantity;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use access::{Permission, Principal, Role};
pub use error::{CoreError, CoreResult, FieldError, ValidationError, ValidationErrors};
pub use financial::{PaymentStatus, StockDirection, Totals};
pub use money::{Money, Percent};
pub use quantity::Quantity;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of lines in a single sale or invoice.
pub const MAX_LINE_ITEMS: usize = 100;

/// Maximum quantity of a single line, in whole units.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 10000 instead of 10).
pub const MAX_LINE_QUANTITY_UNITS: i64 = 9_999;

/// Largest amount, in cents, any price, payment, expense or derived total
/// may hold (100 billion in major units).
///
/// Keeps every intermediate of line pricing and totals well inside i64.
pub const MAX_MONEY_CENTS: i64 = 10_000_000_000_000;

/// Maximum length of free-text notes on financial records.
pub const MAX_NOTES_LEN: usize = 1_000;
