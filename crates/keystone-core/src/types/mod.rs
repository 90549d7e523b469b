//! # Domain Types
//!
//! Entities and input payloads for every ERP module.
//!
//! ## Module Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  auth         finance        hr              inventory                  │
//! │  ─────────    ───────────    ─────────────   ──────────────             │
//! │  User         Invoice        Department      ProductCategory            │
//! │  Role         Payment        JobPosition     Product                    │
//! │               Expense        LeaveType       Warehouse                  │
//! │               JournalEntry   Employee        StockAdjustment            │
//! │               Budget         Attendance                                 │
//! │               Account        LeaveRequest                               │
//! │                              Payroll                                    │
//! │                                                                         │
//! │  procurement          sales          projects        system             │
//! │  ─────────────────    ───────────    ────────────    ──────────         │
//! │  Supplier             Customer       Project         AuditLog           │
//! │  PurchaseRequisition  SalesOrder     Task            Notification       │
//! │  PurchaseOrder        Quote          TimeEntry                          │
//! │  GoodsReceipt                        ProjectExpense                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: surrogate i64 - immutable, used for relations
//! - Business code (invoice_number, employee_number, code, ...) - assigned
//!   once at creation, unique per table, never reassigned
//!
//! ## Soft Delete
//! `is_deleted` rows are hidden from list and detail reads but keep their
//! codes reserved.

use serde::{Deserialize, Serialize};

pub mod auth;
pub mod finance;
pub mod hr;
pub mod inventory;
pub mod procurement;
pub mod sales;
pub mod projects;
pub mod system;

pub use auth::*;
pub use finance::*;
pub use hr::*;
pub use inventory::*;
pub use procurement::*;
pub use projects::*;
pub use sales::*;
pub use system::*;

use crate::calc::{line_total, Discount};
use crate::error::ValidationError;
use crate::money::Money;
use crate::units::Percentage;

// =============================================================================
// Line Items
// =============================================================================

/// One item row of an invoice, sales order, quote or purchase order.
///
/// `document_id` is the owning header's id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LineItem {
    pub id: i64,
    pub document_id: i64,
    pub product_id: Option<i64>,
    pub description: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub discount_bps: Percentage,
    pub discount_amount: Money,
    pub line_total: Money,
}

impl LineItem {
    pub fn discount(&self) -> Result<Discount, ValidationError> {
        Discount::from_parts(self.discount_bps.bps(), self.discount_amount)
    }
}

/// Input for a new line item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLineItem {
    #[serde(default)]
    pub product_id: Option<i64>,
    pub description: String,
    pub quantity: i64,
    pub unit_price: Money,
    #[serde(default)]
    pub discount_bps: Percentage,
    #[serde(default)]
    pub discount_amount: Money,
}

impl NewLineItem {
    /// Validates the item and returns its discount mode.
    pub fn validate(&self) -> Result<Discount, ValidationError> {
        crate::validation::validate_description(&self.description)?;
        crate::validation::validate_quantity(self.quantity)?;
        crate::validation::validate_non_negative_money("unit_price", self.unit_price)?;
        Discount::from_parts(self.discount_bps.bps(), self.discount_amount)
    }

    /// Validates the item and computes its line total.
    pub fn priced(&self) -> Result<(Discount, Money), ValidationError> {
        let discount = self.validate()?;
        Ok((discount, line_total(self.quantity, self.unit_price, discount)))
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// One page of a list query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

/// Page request, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    pub fn new(page: i64, per_page: i64) -> Self {
        PageRequest {
            page: page.max(1),
            per_page: per_page.clamp(1, crate::MAX_PAGE_SIZE),
        }
    }

    /// Rows to skip. Saturates for absurd page numbers, which then read
    /// as an empty page.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest::new(1, crate::DEFAULT_PAGE_SIZE)
    }
}
