//! # keystone-core: Pure Business Logic for Keystone ERP
//!
//! Identifier generation and derived-total calculation for every ERP module,
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Keystone ERP Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                keystone-server (axum JSON API)                  │   │
//! │  │   auth ─ finance ─ hr ─ inventory ─ procurement ─ sales ─ ...   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ keystone-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌───────────┐ ┌───────┐  │   │
//! │  │   │  codes  │ │  calc   │ │  money  │ │ validation│ │ types │  │   │
//! │  │   │ INV-... │ │ totals  │ │  units  │ │   rules   │ │       │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └───────────┘ └───────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 keystone-db (Database Layer)                    │   │
//! │  │       SQLite, migrations, code counters, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`codes`] - Sequential code series and name-derived acronyms
//! - [`calc`] - Line, document, payroll, budget and project totals
//! - [`attendance`] - Hours worked from clock times
//! - [`money`] / [`units`] - Integer money, basis points, hundredths of an hour
//! - [`types`] - Domain entities and input payloads
//! - [`validation`] - Field validation
//! - [`search`] - Global navigation search
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use keystone_core::calc::{DocumentCharges, DocumentTotals};
//! use keystone_core::codes::CodeSeries;
//! use keystone_core::money::Money;
//! use keystone_core::units::Percentage;
//!
//! assert_eq!(CodeSeries::Invoice.format(1), "INV-000001");
//!
//! let charges = DocumentCharges {
//!     tax_rate: Percentage::from_bps(850),
//!     ..Default::default()
//! };
//! let totals = DocumentTotals::from_subtotal(Money::from_cents(10_000), &charges);
//! assert_eq!(totals.total.cents(), 10_850);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod attendance;
pub mod calc;
pub mod codes;
pub mod error;
pub mod money;
pub mod search;
pub mod types;
pub mod units;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use codes::{AcronymKind, CodeSeries};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;
pub use units::{Hours, Percentage};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Rows per page when a list request does not say.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Largest page a client may request.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Tax rate applied to new sales orders unless one is given (8.5%).
pub const DEFAULT_SALES_TAX_BPS: i64 = 850;

/// Largest quantity accepted on a single line.
pub const MAX_LINE_QUANTITY: i64 = 1_000_000;

/// Largest amount accepted on any money field ($10,000,000,000.00).
///
/// A line at this price and `MAX_LINE_QUANTITY` still fits in i64 cents.
pub const MAX_MONEY_CENTS: i64 = 1_000_000_000_000;

/// Longest accepted global search query, in characters.
pub const MAX_SEARCH_QUERY_LEN: usize = 100;
