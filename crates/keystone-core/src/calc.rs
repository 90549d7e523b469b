//! # Derived-Total Calculator
//!
//! Pure functions that compute the dependent numeric fields of composite
//! records. Repositories call these inside the same transaction that changes
//! the inputs, so stored totals never drift from their line items.
//!
//! ## Formulas
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  LINE        qty × price × (1 − pct)      or   qty × price − amount     │
//! │  DOCUMENT    subtotal = Σ line_total                                    │
//! │              tax      = subtotal × rate                                 │
//! │              total    = subtotal + tax + shipping − discount            │
//! │              balance  = total − paid                (invoices)          │
//! │  PAYROLL     gross    = base + overtime + bonus + commission + allow.   │
//! │              deduct.  = tax + social sec. + health + retirement + other │
//! │              net      = gross − deductions                              │
//! │  BUDGET      variance = actual − budgeted                               │
//! │              pct      = variance / budgeted      (0 when budgeted = 0)  │
//! │  PROJECT     progress = completed / total        (0 when no tasks)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All arithmetic is integer: cents, basis points, hundredths of an hour.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;
use crate::units::{Hours, Percentage};

// =============================================================================
// Line Totals
// =============================================================================

/// Discount applied to a single line.
///
/// The two modes are mutually exclusive: a line carries either a percentage
/// or an absolute amount, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Discount {
    #[default]
    None,
    Percentage(Percentage),
    Amount(Money),
}

impl Discount {
    /// Builds a discount from the two storage columns.
    ///
    /// ## Errors
    /// - both columns non-zero → `MutuallyExclusive`
    /// - negative value → `MustNotBeNegative`
    /// - percentage above 100% → `OutOfRange`
    pub fn from_parts(bps: i64, amount: Money) -> Result<Discount, ValidationError> {
        if bps != 0 && !amount.is_zero() {
            return Err(ValidationError::MutuallyExclusive {
                first: "discount_bps".to_string(),
                second: "discount_amount".to_string(),
            });
        }
        if bps < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "discount_bps".to_string(),
            });
        }
        if bps > Percentage::FULL.bps() {
            return Err(ValidationError::OutOfRange {
                field: "discount_bps".to_string(),
                min: 0,
                max: Percentage::FULL.bps(),
            });
        }
        if amount.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: "discount_amount".to_string(),
            });
        }

        Ok(if bps != 0 {
            Discount::Percentage(Percentage::from_bps(bps))
        } else if !amount.is_zero() {
            Discount::Amount(amount)
        } else {
            Discount::None
        })
    }

    /// The percentage column value (zero unless in percentage mode).
    pub fn bps(&self) -> Percentage {
        match self {
            Discount::Percentage(p) => *p,
            _ => Percentage::zero(),
        }
    }

    /// The amount column value (zero unless in amount mode).
    pub fn amount(&self) -> Money {
        match self {
            Discount::Amount(m) => *m,
            _ => Money::zero(),
        }
    }
}

/// Computes the total of one line.
///
/// ## Example
/// ```rust
/// use keystone_core::calc::{line_total, Discount};
/// use keystone_core::money::Money;
/// use keystone_core::units::Percentage;
///
/// let total = line_total(3, Money::from_cents(1000), Discount::Percentage(Percentage::from_whole(10)));
/// assert_eq!(total.cents(), 2700); // $27.00
/// ```
pub fn line_total(quantity: i64, unit_price: Money, discount: Discount) -> Money {
    let gross = unit_price.multiply_quantity(quantity);
    match discount {
        Discount::None => gross,
        Discount::Percentage(p) => gross.apply_percentage_discount(p),
        Discount::Amount(amount) => gross - amount,
    }
}

// =============================================================================
// Document Totals
// =============================================================================

/// Header-level charges applied on top of a document's subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentCharges {
    pub tax_rate: Percentage,
    pub shipping: Money,
    pub discount: Money,
}

/// Computed totals of an invoice, order, purchase order or quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentTotals {
    pub subtotal: Money,
    pub tax_amount: Money,
    pub total: Money,
}

impl DocumentTotals {
    /// Sums the line totals and applies the header charges.
    pub fn compute<I>(line_totals: I, charges: &DocumentCharges) -> DocumentTotals
    where
        I: IntoIterator<Item = Money>,
    {
        DocumentTotals::from_subtotal(line_totals.into_iter().sum(), charges)
    }

    /// Applies the header charges to an already summed subtotal.
    ///
    /// ## Example
    /// ```rust
    /// use keystone_core::calc::{DocumentCharges, DocumentTotals};
    /// use keystone_core::money::Money;
    /// use keystone_core::units::Percentage;
    ///
    /// let charges = DocumentCharges {
    ///     tax_rate: Percentage::from_bps(850),
    ///     shipping: Money::from_cents(500),
    ///     discount: Money::from_cents(1000),
    /// };
    /// let totals = DocumentTotals::from_subtotal(Money::from_cents(10_000), &charges);
    /// assert_eq!(totals.tax_amount.cents(), 850);
    /// assert_eq!(totals.total.cents(), 10_350);
    /// ```
    pub fn from_subtotal(subtotal: Money, charges: &DocumentCharges) -> DocumentTotals {
        let tax_amount = subtotal.calculate_tax(charges.tax_rate);
        DocumentTotals {
            subtotal,
            tax_amount,
            total: subtotal + tax_amount + charges.shipping - charges.discount,
        }
    }

    /// Amount still owed after `paid`.
    pub fn balance_due(&self, paid: Money) -> Money {
        self.total - paid
    }
}

// =============================================================================
// Payroll
// =============================================================================

/// Earnings and deductions entered for one pay period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PayrollComponents {
    pub base_salary: Money,
    pub overtime_pay: Money,
    pub bonus: Money,
    pub commission: Money,
    pub allowances: Money,
    pub tax_deduction: Money,
    pub social_security: Money,
    pub health_insurance: Money,
    pub retirement_contribution: Money,
    pub other_deductions: Money,
}

/// Payroll totals derived from [`PayrollComponents`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollTotals {
    pub gross_pay: Money,
    pub total_deductions: Money,
    pub net_pay: Money,
}

impl PayrollTotals {
    pub fn compute(c: &PayrollComponents) -> PayrollTotals {
        let gross_pay = c.base_salary + c.overtime_pay + c.bonus + c.commission + c.allowances;
        let total_deductions = c.tax_deduction
            + c.social_security
            + c.health_insurance
            + c.retirement_contribution
            + c.other_deductions;
        PayrollTotals {
            gross_pay,
            total_deductions,
            net_pay: gross_pay - total_deductions,
        }
    }
}

// =============================================================================
// Variance
// =============================================================================

/// Difference between an actual and a planned amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variance {
    pub variance: Money,
    pub variance_percentage: Percentage,
}

impl Variance {
    /// Budget variance: `actual − budgeted`, relative to `budgeted`.
    ///
    /// ## Example
    /// ```rust
    /// use keystone_core::calc::Variance;
    /// use keystone_core::money::Money;
    ///
    /// let v = Variance::budget(Money::from_major_minor(1000, 0), Money::from_major_minor(1200, 0));
    /// assert_eq!(v.variance, Money::from_major_minor(200, 0));
    /// assert_eq!(v.variance_percentage.bps(), 2000); // 20.0%
    /// ```
    pub fn budget(budgeted: Money, actual: Money) -> Variance {
        let variance = actual - budgeted;
        Variance {
            variance,
            variance_percentage: Percentage::of_money(variance, budgeted),
        }
    }

    /// Project budget headroom: `budget − actual_cost`, relative to `budget`.
    pub fn headroom(budget: Money, actual_cost: Money) -> Variance {
        let variance = budget - actual_cost;
        Variance {
            variance,
            variance_percentage: Percentage::of_money(variance, budget),
        }
    }
}

// =============================================================================
// Journal Entries
// =============================================================================

/// Debit and credit totals of a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JournalTotals {
    pub total_debit: Money,
    pub total_credit: Money,
}

impl JournalTotals {
    /// Sums `(debit, credit)` pairs.
    pub fn compute<I>(lines: I) -> JournalTotals
    where
        I: IntoIterator<Item = (Money, Money)>,
    {
        lines
            .into_iter()
            .fold(JournalTotals::default(), |acc, (debit, credit)| JournalTotals {
                total_debit: acc.total_debit + debit,
                total_credit: acc.total_credit + credit,
            })
    }

    pub fn is_balanced(&self) -> bool {
        self.total_debit == self.total_credit
    }
}

// =============================================================================
// Smaller Derivations
// =============================================================================

/// Project completion as completed / total tasks; zero when there are none.
pub fn project_progress(completed_tasks: i64, total_tasks: i64) -> Percentage {
    Percentage::ratio(completed_tasks, total_tasks)
}

/// Days covered by a leave request, both ends inclusive.
pub fn leave_days(start: NaiveDate, end: NaiveDate) -> Result<i64, ValidationError> {
    if end < start {
        return Err(ValidationError::InvalidRange {
            field: "leave period".to_string(),
        });
    }
    Ok((end - start).num_days() + 1)
}

/// Billable value of a time entry; zero for non-billable time.
pub fn time_entry_amount(hours: Hours, hourly_rate: Money, billable: bool) -> Money {
    if billable {
        hourly_rate.multiply_hours(hours)
    } else {
        Money::zero()
    }
}

/// Days past due for an unpaid invoice as of `today`; zero otherwise.
pub fn days_overdue(due_date: NaiveDate, balance_due: Money, today: NaiveDate) -> i64 {
    if balance_due.is_positive() && today > due_date {
        (today - due_date).num_days()
    } else {
        0
    }
}

/// Credit still available to a customer.
pub fn available_credit(credit_limit: Money, current_balance: Money) -> Money {
    credit_limit - current_balance
}

/// Estimated value of a requisition line.
pub fn estimated_line_total(quantity: i64, estimated_unit_price: Money) -> Money {
    estimated_unit_price.multiply_quantity(quantity)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn dollars(d: i64) -> Money {
        Money::from_major_minor(d, 0)
    }

    #[test]
    fn test_line_total_percentage() {
        let total = line_total(3, dollars(10), Discount::Percentage(Percentage::from_whole(10)));
        assert_eq!(total, Money::from_cents(2700));
    }

    #[test]
    fn test_line_total_amount() {
        let total = line_total(3, dollars(10), Discount::Amount(dollars(5)));
        assert_eq!(total, dollars(25));
    }

    #[test]
    fn test_line_total_no_discount() {
        assert_eq!(line_total(4, Money::from_cents(299), Discount::None).cents(), 1196);
    }

    #[test]
    fn test_discount_modes_are_exclusive() {
        let err = Discount::from_parts(1000, Money::from_cents(500)).unwrap_err();
        assert!(matches!(err, ValidationError::MutuallyExclusive { .. }));

        assert_eq!(
            Discount::from_parts(1000, Money::zero()).unwrap(),
            Discount::Percentage(Percentage::from_bps(1000))
        );
        assert_eq!(
            Discount::from_parts(0, Money::from_cents(500)).unwrap(),
            Discount::Amount(Money::from_cents(500))
        );
        assert_eq!(Discount::from_parts(0, Money::zero()).unwrap(), Discount::None);
    }

    #[test]
    fn test_discount_bounds() {
        assert!(Discount::from_parts(10_001, Money::zero()).is_err());
        assert!(Discount::from_parts(-1, Money::zero()).is_err());
        assert!(Discount::from_parts(0, Money::from_cents(-1)).is_err());
    }

    #[test]
    fn test_invoice_totals() {
        let charges = DocumentCharges {
            tax_rate: Percentage::from_bps(850),
            shipping: dollars(5),
            discount: dollars(10),
        };
        let totals = DocumentTotals::compute([dollars(60), dollars(40)], &charges);
        assert_eq!(totals.subtotal, dollars(100));
        assert_eq!(totals.tax_amount, Money::from_cents(850));
        assert_eq!(totals.total, Money::from_cents(10_350));
        assert_eq!(totals.balance_due(dollars(50)), Money::from_cents(5350));
    }

    #[test]
    fn test_document_totals_empty() {
        let totals = DocumentTotals::compute(std::iter::empty(), &DocumentCharges::default());
        assert_eq!(totals, DocumentTotals::default());
    }

    #[test]
    fn test_payroll_totals() {
        let components = PayrollComponents {
            base_salary: dollars(3000),
            overtime_pay: dollars(200),
            bonus: dollars(100),
            tax_deduction: dollars(500),
            social_security: dollars(150),
            ..Default::default()
        };
        let totals = PayrollTotals::compute(&components);
        assert_eq!(totals.gross_pay, dollars(3300));
        assert_eq!(totals.total_deductions, dollars(650));
        assert_eq!(totals.net_pay, dollars(2650));
    }

    #[test]
    fn test_budget_variance() {
        let v = Variance::budget(dollars(1000), dollars(1200));
        assert_eq!(v.variance, dollars(200));
        assert_eq!(v.variance_percentage, Percentage::from_bps(2000));
    }

    #[test]
    fn test_budget_variance_zero_budget() {
        let v = Variance::budget(Money::zero(), dollars(300));
        assert_eq!(v.variance, dollars(300));
        assert_eq!(v.variance_percentage, Percentage::zero());
    }

    #[test]
    fn test_project_headroom() {
        let v = Variance::headroom(dollars(5000), dollars(6000));
        assert_eq!(v.variance, dollars(-1000));
        assert_eq!(v.variance_percentage, Percentage::from_bps(-2000));
    }

    #[test]
    fn test_project_progress() {
        assert_eq!(project_progress(3, 4), Percentage::from_bps(7500));
        assert_eq!(project_progress(0, 0), Percentage::zero());
        assert_eq!(project_progress(4, 4), Percentage::FULL);
    }

    #[test]
    fn test_journal_totals() {
        let totals = JournalTotals::compute([
            (dollars(100), Money::zero()),
            (Money::zero(), dollars(60)),
            (Money::zero(), dollars(40)),
        ]);
        assert_eq!(totals.total_debit, dollars(100));
        assert_eq!(totals.total_credit, dollars(100));
        assert!(totals.is_balanced());
    }

    #[test]
    fn test_leave_days_inclusive() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 8).unwrap();
        assert_eq!(leave_days(start, end).unwrap(), 5);
        assert_eq!(leave_days(start, start).unwrap(), 1);
        assert!(leave_days(end, start).is_err());
    }

    #[test]
    fn test_time_entry_amount() {
        let hours = Hours::from_hundredths(250);
        assert_eq!(time_entry_amount(hours, dollars(80), true), dollars(200));
        assert_eq!(time_entry_amount(hours, dollars(80), false), Money::zero());
    }

    #[test]
    fn test_days_overdue() {
        let due = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        assert_eq!(days_overdue(due, dollars(10), today), 10);
        assert_eq!(days_overdue(due, Money::zero(), today), 0);
        assert_eq!(days_overdue(due, dollars(10), due), 0);
    }

    #[test]
    fn test_available_credit() {
        assert_eq!(available_credit(dollars(5000), dollars(1200)), dollars(3800));
    }
}
