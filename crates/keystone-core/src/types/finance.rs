//! # Finance Types
//!
//! Invoices, payments, expenses, journal entries, budgets and the chart of
//! accounts.
//!
//! ## Invoice Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create ──► Draft ──► Sent ──┬──► PartiallyPaid ──► Paid               │
//! │                              │         ▲                                │
//! │                              └─────────┘  (payments reduce balance)    │
//! │                                                                         │
//! │  Any unpaid invoice past its due date reports as Overdue.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::calc::{days_overdue, DocumentCharges, JournalTotals, Variance};
use crate::error::ValidationError;
use crate::money::Money;
use crate::units::Percentage;

use super::NewLineItem;

// =============================================================================
// Chart of Accounts
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

/// A ledger account. Its code is chosen by the accountant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Account {
    pub id: i64,
    pub account_code: String,
    pub name: String,
    pub account_type: AccountType,
    pub parent_id: Option<i64>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub account_code: String,
    pub name: String,
    pub account_type: AccountType,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

// =============================================================================
// Invoice
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    PartiallyPaid,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    /// Status that agrees with the stored money columns.
    ///
    /// Called after every payment and every re-derivation of totals.
    /// Cancelled invoices stay cancelled. An invoice with no payments is
    /// never `paid` or `partially_paid`; it falls back to `sent`.
    pub fn reconciled(self, balance_due: Money, paid: Money) -> InvoiceStatus {
        match self {
            InvoiceStatus::Cancelled => InvoiceStatus::Cancelled,
            _ if paid.is_positive() && !balance_due.is_positive() => InvoiceStatus::Paid,
            _ if paid.is_positive() => InvoiceStatus::PartiallyPaid,
            InvoiceStatus::Paid | InvoiceStatus::PartiallyPaid => InvoiceStatus::Sent,
            other => other,
        }
    }

    /// Whether a client may set this status directly.
    ///
    /// `paid` and `partially_paid` only follow from recorded payments.
    pub fn is_settable(self) -> bool {
        !matches!(self, InvoiceStatus::Paid | InvoiceStatus::PartiallyPaid)
    }
}

/// An invoice header with its derived totals.
///
/// `subtotal`, `tax_amount`, `total` and `balance_due` are written by the
/// repository whenever items or payments change; they are never accepted
/// from clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Invoice {
    pub id: i64,
    pub invoice_number: String,
    pub customer_id: i64,
    pub sales_order_id: Option<i64>,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub subtotal: Money,
    pub tax_rate: Percentage,
    pub tax_amount: Money,
    pub shipping: Money,
    pub discount: Money,
    pub total: Money,
    pub paid_amount: Money,
    pub balance_due: Money,
    pub notes: Option<String>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    pub fn charges(&self) -> DocumentCharges {
        DocumentCharges {
            tax_rate: self.tax_rate,
            shipping: self.shipping,
            discount: self.discount,
        }
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.days_overdue(today) > 0
    }

    pub fn days_overdue(&self, today: NaiveDate) -> i64 {
        if self.status == InvoiceStatus::Cancelled {
            return 0;
        }
        days_overdue(self.due_date, self.balance_due, today)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewInvoice {
    /// Explicit number; generated when absent.
    #[serde(default)]
    pub invoice_number: Option<String>,
    pub customer_id: i64,
    #[serde(default)]
    pub sales_order_id: Option<i64>,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub tax_rate: Percentage,
    #[serde(default)]
    pub shipping: Money,
    #[serde(default)]
    pub discount: Money,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<NewLineItem>,
}

impl NewInvoice {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.due_date < self.invoice_date {
            return Err(ValidationError::InvalidRange {
                field: "invoice period".to_string(),
            });
        }
        crate::validation::validate_charges(self.tax_rate, self.shipping, self.discount)
    }
}

/// Editable invoice header fields. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateInvoice {
    pub due_date: Option<NaiveDate>,
    pub status: Option<InvoiceStatus>,
    pub tax_rate: Option<Percentage>,
    pub shipping: Option<Money>,
    pub discount: Option<Money>,
    pub notes: Option<String>,
}

impl UpdateInvoice {
    pub fn validate_status(&self) -> Result<(), ValidationError> {
        match self.status {
            Some(status) if !status.is_settable() => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: ["draft", "sent", "overdue", "cancelled"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }),
            _ => Ok(()),
        }
    }
}

// =============================================================================
// Payment
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    CreditCard,
    BankTransfer,
    Check,
}

/// A customer payment applied to one invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: i64,
    pub payment_number: String,
    pub invoice_id: i64,
    pub customer_id: i64,
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPayment {
    #[serde(default)]
    pub payment_number: Option<String>,
    pub invoice_id: i64,
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub method: PaymentMethod,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

// =============================================================================
// Expense
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    Pending,
    Approved,
    Rejected,
    Paid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Expense {
    pub id: i64,
    pub expense_number: String,
    pub category: String,
    pub description: String,
    pub amount: Money,
    pub tax_amount: Money,
    pub total_amount: Money,
    pub expense_date: NaiveDate,
    pub employee_id: Option<i64>,
    pub vendor: Option<String>,
    pub status: ExpenseStatus,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewExpense {
    #[serde(default)]
    pub expense_number: Option<String>,
    pub category: String,
    pub description: String,
    pub amount: Money,
    #[serde(default)]
    pub tax_amount: Money,
    pub expense_date: NaiveDate,
    #[serde(default)]
    pub employee_id: Option<i64>,
    #[serde(default)]
    pub vendor: Option<String>,
}

impl NewExpense {
    /// Amount including tax.
    pub fn total_amount(&self) -> Money {
        self.amount + self.tax_amount
    }
}

// =============================================================================
// Journal Entry
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum JournalStatus {
    Draft,
    Posted,
    Reversed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct JournalEntry {
    pub id: i64,
    pub entry_number: String,
    pub entry_date: NaiveDate,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub total_debit: Money,
    pub total_credit: Money,
    pub status: JournalStatus,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JournalEntry {
    pub fn totals(&self) -> JournalTotals {
        JournalTotals {
            total_debit: self.total_debit,
            total_credit: self.total_credit,
        }
    }

    pub fn is_balanced(&self) -> bool {
        self.totals().is_balanced()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct JournalEntryLine {
    pub id: i64,
    pub journal_entry_id: i64,
    pub account_id: i64,
    pub description: Option<String>,
    pub debit: Money,
    pub credit: Money,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewJournalEntry {
    #[serde(default)]
    pub entry_number: Option<String>,
    pub entry_date: NaiveDate,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub lines: Vec<NewJournalLine>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewJournalLine {
    pub account_id: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub debit: Money,
    #[serde(default)]
    pub credit: Money,
}

impl NewJournalLine {
    /// A line carries exactly one non-negative side.
    pub fn validate(&self) -> Result<(), ValidationError> {
        crate::validation::validate_non_negative_money("debit", self.debit)?;
        crate::validation::validate_non_negative_money("credit", self.credit)?;
        match (self.debit.is_zero(), self.credit.is_zero()) {
            (false, false) => Err(ValidationError::MutuallyExclusive {
                first: "debit".to_string(),
                second: "credit".to_string(),
            }),
            (true, true) => Err(ValidationError::required("debit or credit")),
            _ => Ok(()),
        }
    }
}

// =============================================================================
// Budget
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    Draft,
    Approved,
    Active,
    Closed,
}

/// A budget with its aggregate variance over all lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Budget {
    pub id: i64,
    pub name: String,
    pub fiscal_year: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_budget: Money,
    pub total_actual: Money,
    pub variance: Money,
    pub variance_percentage: Percentage,
    pub status: BudgetStatus,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BudgetLine {
    pub id: i64,
    pub budget_id: i64,
    pub account_id: Option<i64>,
    pub description: String,
    pub budgeted_amount: Money,
    pub actual_amount: Money,
    pub variance: Money,
    pub variance_percentage: Percentage,
}

impl BudgetLine {
    pub fn computed_variance(&self) -> Variance {
        Variance::budget(self.budgeted_amount, self.actual_amount)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBudget {
    pub name: String,
    pub fiscal_year: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub lines: Vec<NewBudgetLine>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBudgetLine {
    #[serde(default)]
    pub account_id: Option<i64>,
    pub description: String,
    pub budgeted_amount: Money,
    #[serde(default)]
    pub actual_amount: Money,
}

/// Records actual spending against a budget line.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateBudgetActual {
    pub actual_amount: Money,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reconciled_with_money() {
        let zero = Money::zero();
        let some = Money::from_cents(500);
        assert_eq!(InvoiceStatus::Sent.reconciled(zero, some), InvoiceStatus::Paid);
        assert_eq!(InvoiceStatus::Sent.reconciled(some, some), InvoiceStatus::PartiallyPaid);
        assert_eq!(InvoiceStatus::Draft.reconciled(some, zero), InvoiceStatus::Draft);
        assert_eq!(InvoiceStatus::Cancelled.reconciled(zero, some), InvoiceStatus::Cancelled);
    }

    #[test]
    fn test_paid_invoice_with_new_balance_reopens() {
        let zero = Money::zero();
        let owed = Money::from_cents(850);
        let paid = Money::from_cents(10_000);
        assert_eq!(InvoiceStatus::Paid.reconciled(owed, paid), InvoiceStatus::PartiallyPaid);
        assert_eq!(InvoiceStatus::Paid.reconciled(owed, zero), InvoiceStatus::Sent);
        assert_eq!(InvoiceStatus::PartiallyPaid.reconciled(zero, zero), InvoiceStatus::Sent);
    }

    #[test]
    fn test_update_cannot_set_payment_statuses() {
        let update = |status| UpdateInvoice {
            status: Some(status),
            ..Default::default()
        };
        assert!(matches!(
            update(InvoiceStatus::Paid).validate_status(),
            Err(ValidationError::NotAllowed { .. })
        ));
        assert!(update(InvoiceStatus::PartiallyPaid).validate_status().is_err());
        assert!(update(InvoiceStatus::Cancelled).validate_status().is_ok());
        assert!(UpdateInvoice::default().validate_status().is_ok());
    }

    #[test]
    fn test_journal_line_sides() {
        let line = |debit, credit| NewJournalLine {
            account_id: 1,
            description: None,
            debit: Money::from_cents(debit),
            credit: Money::from_cents(credit),
        };
        assert!(line(100, 0).validate().is_ok());
        assert!(line(0, 100).validate().is_ok());
        assert!(line(100, 100).validate().is_err());
        assert!(line(0, 0).validate().is_err());
        assert!(line(-100, 0).validate().is_err());
    }

    #[test]
    fn test_new_invoice_rejects_due_before_issue() {
        let invoice = NewInvoice {
            invoice_number: None,
            customer_id: 1,
            sales_order_id: None,
            invoice_date: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            tax_rate: Percentage::zero(),
            shipping: Money::zero(),
            discount: Money::zero(),
            notes: None,
            items: vec![],
        };
        assert!(matches!(invoice.validate(), Err(ValidationError::InvalidRange { .. })));
    }

    #[test]
    fn test_expense_total() {
        let expense: NewExpense = serde_json::from_str(
            r#"{"category":"Travel","description":"Taxi","amount":4500,"tax_amount":450,"expense_date":"2024-02-01"}"#,
        )
        .unwrap();
        assert_eq!(expense.total_amount().cents(), 4950);
    }
}
