//! # cafe-db: Database Layer for the Cafe Back End
//!
//! This crate provides database access for the cafe back end.
//! It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cafe Back End Data Flow                          │
//! │                                                                         │
//! │  REST handler (POST /api/sales)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     cafe-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  (reads and   │    │  (embedded)  │  │   │
//! │  │   │               │    │   plain CRUD) │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ ProductRepo   │    │ 001_init.sql │  │   │
//! │  │   │ Connection    │    │ ReportRepo... │    │              │  │   │
//! │  │   │ Management    │    ├───────────────┤    │              │  │   │
//! │  │   │               │◄───│ Financial     │    │              │  │   │
//! │  │   │               │    │ Recorder (tx) │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ./data/cafe.db  (or :memory: in tests)                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (product, sale, etc.)
//! - [`recorder`] - Transactional writes for sales, invoices, expenses and cash
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cafe_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./data/cafe.db")).await?;
//!
//! // Plain reads go through repositories
//! let low = db.products().low_stock(owner_id).await?;
//!
//! // Financial events go through the recorder
//! let sale = db.recorder().record_sale(owner_id, actor_id, new_sale).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod recorder;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use recorder::{
    ExpenseUpdate, FinancialRecorder, InvoicePayment, NewCashTransaction, NewExpense, NewInvoice,
    NewSale, SaleUpdate,
};
pub use repository::DateRange;

// Repository re-exports for convenience
pub use repository::blog::{BlogRepository, NewPost, PostUpdate};
pub use repository::cash_register::{CashFilter, CashRegisterRepository, DailySummary};
pub use repository::expense::{ExpenseFilter, ExpenseRepository};
pub use repository::invoice::{InvoiceDetails, InvoiceFilter, InvoiceRepository};
pub use repository::product::{NewProduct, ProductFilter, ProductRepository, ProductUpdate};
pub use repository::report::ReportRepository;
pub use repository::sale::{SaleFilter, SaleRepository};
pub use repository::user::{NewUser, UserRepository};
