//! # keystone-db: Database Layer for Keystone ERP
//!
//! SQLite storage for every ERP module, built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Keystone ERP Data Flow                            │
//! │                                                                         │
//! │  HTTP handler (POST /api/finance/invoices)                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   keystone-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (finance.rs)  │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ FinanceRepo   │    │ 001_initial  │  │   │
//! │  │   │ WAL, FKs on   │    │ HrRepo, ...   │    │ _schema.sql  │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │                              │   │
//! │  │                  codes.rs ─────┴───── documents.rs            │   │
//! │  │              (counter rows)      (line items + totals)        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (keystone.db)                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - One repository per ERP module
//!
//! ## Usage
//!
//! ```rust,ignore
//! use keystone_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("keystone.db")).await?;
//! let invoice = db.finance().create_invoice(new_invoice).await?;
//! assert_eq!(invoice.invoice_number, "INV-000001");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::finance::FinanceRepository;
pub use repository::hr::HrRepository;
pub use repository::inventory::InventoryRepository;
pub use repository::procurement::ProcurementRepository;
pub use repository::projects::ProjectRepository;
pub use repository::records::{RecordRepository, RecordTable};
pub use repository::sales::SalesRepository;
pub use repository::users::UserRepository;
