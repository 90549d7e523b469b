//! # HR Types
//!
//! Organisation structure, employees, attendance, leave and payroll.
//!
//! Departments, job positions and leave types carry acronym codes derived
//! from their names (see [`crate::codes::AcronymKind`]). Employees carry a
//! sequential `EMP` number.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attendance::AttendanceHours;
use crate::calc::{PayrollComponents, PayrollTotals};
use crate::money::Money;
use crate::units::Hours;

// =============================================================================
// Department
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Department {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub manager_id: Option<i64>,
    pub budget: Money,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDepartment {
    /// Explicit code; derived from the name when absent.
    #[serde(default)]
    pub code: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub manager_id: Option<i64>,
    #[serde(default)]
    pub budget: Money,
}

// =============================================================================
// Job Position
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct JobPosition {
    pub id: i64,
    pub code: String,
    pub title: String,
    pub department_id: Option<i64>,
    pub description: Option<String>,
    pub min_salary: Money,
    pub max_salary: Money,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobPosition {
    /// Renders the salary band, e.g. `$40000.00 - $60000.00`.
    pub fn salary_range(&self) -> String {
        format!("{} - {}", self.min_salary, self.max_salary)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewJobPosition {
    #[serde(default)]
    pub code: Option<String>,
    pub title: String,
    #[serde(default)]
    pub department_id: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub min_salary: Money,
    #[serde(default)]
    pub max_salary: Money,
}

// =============================================================================
// Leave Type
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LeaveType {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub is_paid: bool,
    pub max_days_per_year: i64,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewLeaveType {
    #[serde(default)]
    pub code: Option<String>,
    pub name: String,
    #[serde(default = "default_true")]
    pub is_paid: bool,
    #[serde(default)]
    pub max_days_per_year: i64,
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Employee
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum EmployeeStatus {
    Active,
    Inactive,
    OnLeave,
    Terminated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Employee {
    pub id: i64,
    pub employee_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub hire_date: NaiveDate,
    pub department_id: Option<i64>,
    pub position_id: Option<i64>,
    pub manager_id: Option<i64>,
    pub base_salary: Money,
    pub hourly_rate: Money,
    pub status: EmployeeStatus,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewEmployee {
    #[serde(default)]
    pub employee_number: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub hire_date: NaiveDate,
    #[serde(default)]
    pub department_id: Option<i64>,
    #[serde(default)]
    pub position_id: Option<i64>,
    #[serde(default)]
    pub manager_id: Option<i64>,
    #[serde(default)]
    pub base_salary: Money,
    #[serde(default)]
    pub hourly_rate: Money,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEmployee {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub department_id: Option<i64>,
    pub position_id: Option<i64>,
    pub manager_id: Option<i64>,
    pub base_salary: Option<Money>,
    pub hourly_rate: Option<Money>,
    pub status: Option<EmployeeStatus>,
}

// =============================================================================
// Attendance
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    HalfDay,
    Holiday,
}

/// One employee's attendance for one day.
///
/// `hours_worked` and `overtime_hours` are derived from the clock times.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Attendance {
    pub id: i64,
    pub employee_id: i64,
    pub date: NaiveDate,
    pub clock_in: Option<NaiveTime>,
    pub clock_out: Option<NaiveTime>,
    pub break_start: Option<NaiveTime>,
    pub break_end: Option<NaiveTime>,
    pub hours_worked: Hours,
    pub overtime_hours: Hours,
    pub status: AttendanceStatus,
    pub notes: Option<String>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAttendance {
    pub employee_id: i64,
    pub date: NaiveDate,
    #[serde(default)]
    pub clock_in: Option<NaiveTime>,
    #[serde(default)]
    pub clock_out: Option<NaiveTime>,
    #[serde(default)]
    pub break_start: Option<NaiveTime>,
    #[serde(default)]
    pub break_end: Option<NaiveTime>,
    #[serde(default = "default_attendance_status")]
    pub status: AttendanceStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_attendance_status() -> AttendanceStatus {
    AttendanceStatus::Present
}

impl NewAttendance {
    pub fn hours(&self) -> AttendanceHours {
        AttendanceHours::compute(self.clock_in, self.clock_out, self.break_start, self.break_end)
    }
}

// =============================================================================
// Leave Request
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "pending",
            LeaveStatus::Approved => "approved",
            LeaveStatus::Rejected => "rejected",
            LeaveStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LeaveRequest {
    pub id: i64,
    pub employee_id: i64,
    pub leave_type_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: i64,
    pub reason: Option<String>,
    pub status: LeaveStatus,
    pub approved_by: Option<i64>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewLeaveRequest {
    pub employee_id: i64,
    pub leave_type_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub reason: Option<String>,
}

// =============================================================================
// Payroll
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PayrollStatus {
    Draft,
    Approved,
    Paid,
}

/// One employee's pay for one period.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Payroll {
    pub id: i64,
    pub employee_id: i64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub pay_date: Option<NaiveDate>,

    // Earnings
    pub base_salary: Money,
    pub overtime_pay: Money,
    pub bonus: Money,
    pub commission: Money,
    pub allowances: Money,

    // Deductions
    pub tax_deduction: Money,
    pub social_security: Money,
    pub health_insurance: Money,
    pub retirement_contribution: Money,
    pub other_deductions: Money,

    // Derived
    pub gross_pay: Money,
    pub total_deductions: Money,
    pub net_pay: Money,

    pub status: PayrollStatus,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payroll {
    pub fn components(&self) -> PayrollComponents {
        PayrollComponents {
            base_salary: self.base_salary,
            overtime_pay: self.overtime_pay,
            bonus: self.bonus,
            commission: self.commission,
            allowances: self.allowances,
            tax_deduction: self.tax_deduction,
            social_security: self.social_security,
            health_insurance: self.health_insurance,
            retirement_contribution: self.retirement_contribution,
            other_deductions: self.other_deductions,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPayroll {
    pub employee_id: i64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    #[serde(default)]
    pub pay_date: Option<NaiveDate>,
    #[serde(flatten)]
    pub components: PayrollComponents,
}

impl NewPayroll {
    pub fn totals(&self) -> PayrollTotals {
        PayrollTotals::compute(&self.components)
    }
}
