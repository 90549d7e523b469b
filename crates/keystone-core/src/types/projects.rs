//! # Project Types
//!
//! A project's derived fields come from its children:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  tasks            ──► progress_percentage = completed / total           │
//! │  time_entries     ──┐                                                   │
//! │  project_expenses ──┴► actual_cost = Σ hours × rate + Σ expense amount  │
//! │  budget, actual_cost ──► budget_variance = budget − actual_cost         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::calc::time_entry_amount;
use crate::money::Money;
use crate::units::{Hours, Percentage};

// =============================================================================
// Project
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Planning,
    Active,
    OnHold,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Project {
    pub id: i64,
    pub project_code: String,
    pub name: String,
    pub description: Option<String>,
    pub customer_id: Option<i64>,
    pub manager_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: ProjectStatus,
    pub budget: Money,
    pub actual_cost: Money,
    pub progress_percentage: Percentage,
    pub budget_variance: Money,
    pub budget_variance_percentage: Percentage,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProject {
    #[serde(default)]
    pub project_code: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub customer_id: Option<i64>,
    #[serde(default)]
    pub manager_id: Option<i64>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub budget: Money,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub manager_id: Option<i64>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<ProjectStatus>,
    pub budget: Option<Money>,
}

// =============================================================================
// Task
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Review,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Task {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: Option<i64>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    pub estimated_hours: Hours,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<i64>,
    #[serde(default = "default_priority")]
    pub priority: TaskPriority,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub estimated_hours: Hours,
}

fn default_priority() -> TaskPriority {
    TaskPriority::Medium
}

/// Moves a task to a new status.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTaskStatus {
    pub status: TaskStatus,
}

// =============================================================================
// Time Entry
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TimeEntry {
    pub id: i64,
    pub project_id: i64,
    pub task_id: Option<i64>,
    pub employee_id: i64,
    pub entry_date: NaiveDate,
    pub hours: Hours,
    pub hourly_rate: Money,
    pub billable: bool,
    pub billable_amount: Money,
    pub description: Option<String>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TimeEntry {
    /// Cost of the time to the project, billable or not.
    pub fn cost(&self) -> Money {
        self.hourly_rate.multiply_hours(self.hours)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTimeEntry {
    #[serde(default)]
    pub task_id: Option<i64>,
    pub employee_id: i64,
    pub entry_date: NaiveDate,
    pub hours: Hours,
    pub hourly_rate: Money,
    #[serde(default = "default_billable")]
    pub billable: bool,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_billable() -> bool {
    true
}

impl NewTimeEntry {
    pub fn billable_amount(&self) -> Money {
        time_entry_amount(self.hours, self.hourly_rate, self.billable)
    }
}

// =============================================================================
// Project Expense
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProjectExpense {
    pub id: i64,
    pub project_id: i64,
    pub description: String,
    pub amount: Money,
    pub expense_date: NaiveDate,
    pub markup: Percentage,
    pub billable_amount: Money,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProjectExpense {
    pub description: String,
    pub amount: Money,
    pub expense_date: NaiveDate,
    #[serde(default)]
    pub markup: Percentage,
}

impl NewProjectExpense {
    pub fn billable_amount(&self) -> Money {
        self.amount.apply_markup(self.markup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_entry_billable_amount() {
        let entry: NewTimeEntry = serde_json::from_str(
            r#"{"employee_id":1,"entry_date":"2024-05-02","hours":250,"hourly_rate":8000}"#,
        )
        .unwrap();
        assert!(entry.billable);
        assert_eq!(entry.billable_amount().cents(), 20_000);
    }

    #[test]
    fn test_project_expense_markup() {
        let expense = NewProjectExpense {
            description: "Hosting".to_string(),
            amount: Money::from_cents(10_000),
            expense_date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            markup: Percentage::from_whole(15),
        };
        assert_eq!(expense.billable_amount().cents(), 11_500);
    }

    #[test]
    fn test_task_default_priority() {
        let task: NewTask = serde_json::from_str(r#"{"title":"Kickoff"}"#).unwrap();
        assert_eq!(task.priority, TaskPriority::Medium);
    }
}
