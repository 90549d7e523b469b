//! # Human-Readable Codes
//!
//! Business-facing identifiers assigned once at record creation.
//!
//! ## Two Strategies
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SEQUENTIAL (CodeSeries)             ACRONYM (AcronymKind)              │
//! │  ─────────────────────────────────   ─────────────────────────────────  │
//! │  prefix + zero-padded counter        first letters of the first two    │
//! │                                      words of the name, uppercased     │
//! │  INV-000123   EMP000042   WH007                                         │
//! │                                      "Human Resources" → HUMRES        │
//! │  Counter lives in the database       "Sick Leave"      → SILE          │
//! │  (keystone-db CodeAllocator);        No uniqueness check here; the     │
//! │  this module only formats/parses.    table's UNIQUE constraint rules.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Round-Trip
//! `series.parse(code)` returns a number only for codes in canonical form,
//! so `series.format(series.parse(code)?) == code` always holds.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

// =============================================================================
// Sequential Code Series
// =============================================================================

/// A sequential code series: fixed prefix plus zero-padded counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeSeries {
    Invoice,
    Payment,
    Expense,
    JournalEntry,
    Employee,
    Warehouse,
    StockAdjustment,
    Supplier,
    PurchaseRequisition,
    PurchaseOrder,
    GoodsReceipt,
    Customer,
    SalesOrder,
    Quote,
    Project,
}

impl CodeSeries {
    /// Every series, in module order.
    pub const ALL: [CodeSeries; 15] = [
        CodeSeries::Invoice,
        CodeSeries::Payment,
        CodeSeries::Expense,
        CodeSeries::JournalEntry,
        CodeSeries::Employee,
        CodeSeries::Warehouse,
        CodeSeries::StockAdjustment,
        CodeSeries::Supplier,
        CodeSeries::PurchaseRequisition,
        CodeSeries::PurchaseOrder,
        CodeSeries::GoodsReceipt,
        CodeSeries::Customer,
        CodeSeries::SalesOrder,
        CodeSeries::Quote,
        CodeSeries::Project,
    ];

    /// The literal prefix of every code in the series.
    pub const fn prefix(&self) -> &'static str {
        match self {
            CodeSeries::Invoice => "INV-",
            CodeSeries::Payment => "PAY-",
            CodeSeries::Expense => "EXP-",
            CodeSeries::JournalEntry => "JE",
            CodeSeries::Employee => "EMP",
            CodeSeries::Warehouse => "WH",
            CodeSeries::StockAdjustment => "ADJ",
            CodeSeries::Supplier => "SUPP",
            CodeSeries::PurchaseRequisition => "PR",
            CodeSeries::PurchaseOrder => "PO",
            CodeSeries::GoodsReceipt => "GR",
            CodeSeries::Customer => "CUST",
            CodeSeries::SalesOrder => "ORD",
            CodeSeries::Quote => "QUO",
            CodeSeries::Project => "PROJ",
        }
    }

    /// Minimum number of digits after the prefix.
    pub const fn width(&self) -> usize {
        match self {
            CodeSeries::Warehouse => 3,
            _ => 6,
        }
    }

    /// Stable key for the series' counter row.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CodeSeries::Invoice => "invoice",
            CodeSeries::Payment => "payment",
            CodeSeries::Expense => "expense",
            CodeSeries::JournalEntry => "journal_entry",
            CodeSeries::Employee => "employee",
            CodeSeries::Warehouse => "warehouse",
            CodeSeries::StockAdjustment => "stock_adjustment",
            CodeSeries::Supplier => "supplier",
            CodeSeries::PurchaseRequisition => "purchase_requisition",
            CodeSeries::PurchaseOrder => "purchase_order",
            CodeSeries::GoodsReceipt => "goods_receipt",
            CodeSeries::Customer => "customer",
            CodeSeries::SalesOrder => "sales_order",
            CodeSeries::Quote => "quote",
            CodeSeries::Project => "project",
        }
    }

    /// Formats a sequence number as a code.
    ///
    /// ## Example
    /// ```rust
    /// use keystone_core::codes::CodeSeries;
    ///
    /// assert_eq!(CodeSeries::Invoice.format(123), "INV-000123");
    /// assert_eq!(CodeSeries::Warehouse.format(7), "WH007");
    /// ```
    pub fn format(&self, number: i64) -> String {
        format!("{}{:0width$}", self.prefix(), number, width = self.width())
    }

    /// Extracts the sequence number from a canonical code.
    ///
    /// Returns `None` for codes with a different prefix, non-digit suffix,
    /// or non-canonical padding (e.g. `WH07`, `WH0007`).
    ///
    /// ## Example
    /// ```rust
    /// use keystone_core::codes::CodeSeries;
    ///
    /// assert_eq!(CodeSeries::Employee.parse("EMP000042"), Some(42));
    /// assert_eq!(CodeSeries::Employee.parse("EMP42"), None);
    /// assert_eq!(CodeSeries::Employee.parse("INV-000042"), None);
    /// ```
    pub fn parse(&self, code: &str) -> Option<i64> {
        let digits = code.strip_prefix(self.prefix())?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let number: i64 = digits.parse().ok()?;
        if self.format(number) == code {
            Some(number)
        } else {
            None
        }
    }
}

impl fmt::Display for CodeSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Acronym Codes
// =============================================================================

/// Entities whose code is derived from their name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcronymKind {
    Department,
    JobPosition,
    ProductCategory,
    LeaveType,
}

impl AcronymKind {
    /// Letters taken from each word of the name.
    pub const fn letters_per_word(&self) -> usize {
        match self {
            AcronymKind::LeaveType => 2,
            _ => 3,
        }
    }

    /// Derives the code for `name`.
    pub fn code_for(&self, name: &str) -> Result<String, ValidationError> {
        acronym_code(name, self.letters_per_word())
    }
}

/// Number of leading words that contribute to an acronym.
const ACRONYM_WORDS: usize = 2;

/// Builds an acronym from the first letters of the first two words.
///
/// ## Example
/// ```rust
/// use keystone_core::codes::acronym_code;
///
/// assert_eq!(acronym_code("Human Resources", 3).unwrap(), "HUMRES");
/// assert_eq!(acronym_code("sick leave days", 2).unwrap(), "SILE");
/// assert_eq!(acronym_code("IT", 3).unwrap(), "IT");
/// assert!(acronym_code("   ", 3).is_err());
/// ```
pub fn acronym_code(name: &str, letters_per_word: usize) -> Result<String, ValidationError> {
    let code: String = name
        .split_whitespace()
        .take(ACRONYM_WORDS)
        .flat_map(|word| word.chars().take(letters_per_word))
        .flat_map(char::to_uppercase)
        .collect();

    if code.is_empty() {
        return Err(ValidationError::required("name"));
    }

    Ok(code)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixes_and_widths() {
        assert_eq!(CodeSeries::Payment.format(1), "PAY-000001");
        assert_eq!(CodeSeries::Expense.format(1), "EXP-000001");
        assert_eq!(CodeSeries::JournalEntry.format(1), "JE000001");
        assert_eq!(CodeSeries::StockAdjustment.format(1), "ADJ000001");
        assert_eq!(CodeSeries::Supplier.format(1), "SUPP000001");
        assert_eq!(CodeSeries::PurchaseRequisition.format(1), "PR000001");
        assert_eq!(CodeSeries::PurchaseOrder.format(1), "PO000001");
        assert_eq!(CodeSeries::GoodsReceipt.format(1), "GR000001");
        assert_eq!(CodeSeries::Customer.format(1), "CUST000001");
        assert_eq!(CodeSeries::SalesOrder.format(1), "ORD000001");
        assert_eq!(CodeSeries::Quote.format(1), "QUO000001");
        assert_eq!(CodeSeries::Project.format(1), "PROJ000001");
        assert_eq!(CodeSeries::Warehouse.format(1), "WH001");
    }

    #[test]
    fn test_round_trip_every_series() {
        for series in CodeSeries::ALL {
            for n in [1, 9, 10, 999, 1000, 123_456, 1_000_000] {
                let code = series.format(n);
                assert_eq!(series.parse(&code), Some(n), "{}", code);
                assert_eq!(series.format(n), code);
            }
        }
    }

    #[test]
    fn test_parse_rejects_foreign_codes() {
        assert_eq!(CodeSeries::Invoice.parse("INV000001"), None);
        assert_eq!(CodeSeries::Invoice.parse("INV-"), None);
        assert_eq!(CodeSeries::Invoice.parse("INV-00001A"), None);
        assert_eq!(CodeSeries::Warehouse.parse("WH0007"), None);
        // Overflowing the width is canonical once the number needs the digits
        assert_eq!(CodeSeries::Warehouse.parse("WH1000"), Some(1000));
    }

    #[test]
    fn test_prefix_overlap_is_disambiguated_by_format() {
        // "PR" is a prefix of "PROJ"; project codes never parse as requisitions
        assert_eq!(CodeSeries::PurchaseRequisition.parse("PROJ000001"), None);
        assert_eq!(CodeSeries::Project.parse("PROJ000001"), Some(1));
    }

    #[test]
    fn test_acronym_kinds() {
        assert_eq!(AcronymKind::Department.code_for("Research and Development").unwrap(), "RESAND");
        assert_eq!(AcronymKind::JobPosition.code_for("Senior Engineer").unwrap(), "SENENG");
        assert_eq!(AcronymKind::ProductCategory.code_for("Home & Garden").unwrap(), "HOM&");
        assert_eq!(AcronymKind::LeaveType.code_for("Annual Leave").unwrap(), "ANLE");
    }

    #[test]
    fn test_acronym_collapses_whitespace() {
        assert_eq!(acronym_code("  sales \t  team ", 3).unwrap(), "SALTEA");
    }

    #[test]
    fn test_acronym_empty_name() {
        assert!(matches!(acronym_code("", 3), Err(ValidationError::Required { .. })));
    }
}
