//! # HR Repository
//!
//! Departments, job positions, leave types, employees, attendance, leave
//! requests and payroll.
//!
//! ## Codes
//! ```text
//! ┌──────────────────┬──────────────────────────┬────────────────────────┐
//! │ Entity           │ Code                     │ Example                │
//! ├──────────────────┼──────────────────────────┼────────────────────────┤
//! │ Department       │ 3 letters × 2 words      │ Human Resources → HUMRES│
//! │ Job position     │ 3 letters × 2 words      │ Senior Engineer → SENENG│
//! │ Leave type       │ 2 letters × 2 words      │ Sick Leave → SILE      │
//! │ Employee         │ EMP + 6 digits           │ EMP000001              │
//! └──────────────────┴──────────────────────────┴────────────────────────┘
//! ```
//!
//! Acronym codes are not numbered: two names with the same acronym collide
//! on the UNIQUE constraint and the second insert is rejected as a
//! duplicate. Callers may pass an explicit code instead.

use chrono::{NaiveDate, Utc};
use keystone_core::calc::leave_days;
use keystone_core::validation::{
    validate_code, validate_description, validate_email, validate_name,
    validate_non_negative_money,
};
use keystone_core::{
    AcronymKind, Attendance, CodeSeries, Department, Employee, EmployeeStatus, JobPosition,
    LeaveRequest, LeaveStatus, LeaveType, NewAttendance, NewDepartment, NewEmployee,
    NewJobPosition, NewLeaveRequest, NewLeaveType, NewPayroll, Page, PageRequest, Payroll,
    PayrollStatus, UpdateEmployee, ValidationError,
};
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::{codes, ensure_status, fetch_live, fetch_live_from_pool, fetch_page};
use crate::error::{DbResult, DuplicateContext};

/// Explicit code when given, otherwise the acronym of `name`.
fn acronym_or_explicit(
    kind: AcronymKind,
    explicit: Option<&str>,
    name: &str,
) -> Result<String, ValidationError> {
    match explicit.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => {
            validate_code("code", code)?;
            Ok(code.to_uppercase())
        }
        None => kind.code_for(name),
    }
}

/// Repository for HR database operations.
#[derive(Debug, Clone)]
pub struct HrRepository {
    pool: SqlitePool,
}

impl HrRepository {
    /// Creates a new HrRepository.
    pub fn new(pool: SqlitePool) -> Self {
        HrRepository { pool }
    }

    // =========================================================================
    // Departments
    // =========================================================================

    pub async fn create_department(&self, new: NewDepartment) -> DbResult<Department> {
        validate_name("name", &new.name, 100)?;
        validate_non_negative_money("budget", new.budget)?;
        let code = acronym_or_explicit(AcronymKind::Department, new.code.as_deref(), &new.name)?;

        let department = sqlx::query_as::<_, Department>(
            r#"
            INSERT INTO departments (code, name, description, manager_id, budget, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            RETURNING *
            "#,
        )
        .bind(&code)
        .bind(new.name.trim())
        .bind(&new.description)
        .bind(new.manager_id)
        .bind(new.budget)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .duplicate_value(&code)?;

        info!(code = %department.code, "Department created");
        Ok(department)
    }

    pub async fn get_department(&self, id: i64) -> DbResult<Department> {
        fetch_live_from_pool(&self.pool, "departments", "Department", id).await
    }

    pub async fn list_departments(&self, page: PageRequest) -> DbResult<Page<Department>> {
        fetch_page(&self.pool, "departments", page).await
    }

    // =========================================================================
    // Job Positions
    // =========================================================================

    pub async fn create_position(&self, new: NewJobPosition) -> DbResult<JobPosition> {
        validate_name("title", &new.title, 100)?;
        validate_non_negative_money("min_salary", new.min_salary)?;
        validate_non_negative_money("max_salary", new.max_salary)?;
        if new.max_salary < new.min_salary {
            return Err(ValidationError::InvalidRange {
                field: "salary range".to_string(),
            }
            .into());
        }
        let code = acronym_or_explicit(AcronymKind::JobPosition, new.code.as_deref(), &new.title)?;

        let position = sqlx::query_as::<_, JobPosition>(
            r#"
            INSERT INTO job_positions (
                code, title, department_id, description, min_salary, max_salary,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            RETURNING *
            "#,
        )
        .bind(&code)
        .bind(new.title.trim())
        .bind(new.department_id)
        .bind(&new.description)
        .bind(new.min_salary)
        .bind(new.max_salary)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .duplicate_value(&code)?;

        info!(code = %position.code, "Job position created");
        Ok(position)
    }

    pub async fn get_position(&self, id: i64) -> DbResult<JobPosition> {
        fetch_live_from_pool(&self.pool, "job_positions", "Job position", id).await
    }

    pub async fn list_positions(&self, page: PageRequest) -> DbResult<Page<JobPosition>> {
        fetch_page(&self.pool, "job_positions", page).await
    }

    // =========================================================================
    // Leave Types
    // =========================================================================

    pub async fn create_leave_type(&self, new: NewLeaveType) -> DbResult<LeaveType> {
        validate_name("name", &new.name, 100)?;
        if new.max_days_per_year < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "max_days_per_year".to_string(),
            }
            .into());
        }
        let code = acronym_or_explicit(AcronymKind::LeaveType, new.code.as_deref(), &new.name)?;

        let leave_type = sqlx::query_as::<_, LeaveType>(
            r#"
            INSERT INTO leave_types (code, name, is_paid, max_days_per_year, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            RETURNING *
            "#,
        )
        .bind(&code)
        .bind(new.name.trim())
        .bind(new.is_paid)
        .bind(new.max_days_per_year)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .duplicate_value(&code)?;

        info!(code = %leave_type.code, "Leave type created");
        Ok(leave_type)
    }

    pub async fn get_leave_type(&self, id: i64) -> DbResult<LeaveType> {
        fetch_live_from_pool(&self.pool, "leave_types", "Leave type", id).await
    }

    pub async fn list_leave_types(&self, page: PageRequest) -> DbResult<Page<LeaveType>> {
        fetch_page(&self.pool, "leave_types", page).await
    }

    // =========================================================================
    // Employees
    // =========================================================================

    /// Creates an employee with the next `EMP` number unless one is given.
    pub async fn create_employee(&self, new: NewEmployee) -> DbResult<Employee> {
        validate_name("first_name", &new.first_name, 100)?;
        validate_name("last_name", &new.last_name, 100)?;
        validate_email(new.email.trim())?;
        validate_non_negative_money("base_salary", new.base_salary)?;
        validate_non_negative_money("hourly_rate", new.hourly_rate)?;

        let mut tx = self.pool.begin().await?;
        let number =
            codes::assign_code(&mut tx, CodeSeries::Employee, new.employee_number.as_deref())
                .await?;

        let employee = sqlx::query_as::<_, Employee>(
            r#"
            INSERT INTO employees (
                employee_number, first_name, last_name, email, phone, hire_date,
                department_id, position_id, manager_id, base_salary, hourly_rate,
                status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
            RETURNING *
            "#,
        )
        .bind(&number)
        .bind(new.first_name.trim())
        .bind(new.last_name.trim())
        .bind(new.email.trim().to_lowercase())
        .bind(&new.phone)
        .bind(new.hire_date)
        .bind(new.department_id)
        .bind(new.position_id)
        .bind(new.manager_id)
        .bind(new.base_salary)
        .bind(new.hourly_rate)
        .bind(EmployeeStatus::Active)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .duplicate_value(&number)?;

        tx.commit().await?;
        info!(employee_number = %employee.employee_number, "Employee created");
        Ok(employee)
    }

    pub async fn get_employee(&self, id: i64) -> DbResult<Employee> {
        fetch_live_from_pool(&self.pool, "employees", "Employee", id).await
    }

    pub async fn list_employees(&self, page: PageRequest) -> DbResult<Page<Employee>> {
        fetch_page(&self.pool, "employees", page).await
    }

    /// Updates employee details. The employee number never changes.
    pub async fn update_employee(&self, id: i64, update: UpdateEmployee) -> DbResult<Employee> {
        let mut tx = self.pool.begin().await?;
        let current: Employee = fetch_live(&mut tx, "employees", "Employee", id).await?;

        let first_name = update.first_name.unwrap_or(current.first_name);
        let last_name = update.last_name.unwrap_or(current.last_name);
        let email = update.email.unwrap_or(current.email);
        let base_salary = update.base_salary.unwrap_or(current.base_salary);
        let hourly_rate = update.hourly_rate.unwrap_or(current.hourly_rate);
        validate_name("first_name", &first_name, 100)?;
        validate_name("last_name", &last_name, 100)?;
        validate_email(email.trim())?;
        validate_non_negative_money("base_salary", base_salary)?;
        validate_non_negative_money("hourly_rate", hourly_rate)?;

        let email = email.trim().to_lowercase();
        let employee = sqlx::query_as::<_, Employee>(
            r#"
            UPDATE employees
            SET first_name = ?2, last_name = ?3, email = ?4, phone = ?5,
                department_id = ?6, position_id = ?7, manager_id = ?8,
                base_salary = ?9, hourly_rate = ?10, status = ?11, updated_at = ?12
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(first_name.trim())
        .bind(last_name.trim())
        .bind(&email)
        .bind(update.phone.or(current.phone))
        .bind(update.department_id.or(current.department_id))
        .bind(update.position_id.or(current.position_id))
        .bind(update.manager_id.or(current.manager_id))
        .bind(base_salary)
        .bind(hourly_rate)
        .bind(update.status.unwrap_or(current.status))
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .duplicate_value(&email)?;

        tx.commit().await?;
        Ok(employee)
    }

    // =========================================================================
    // Attendance
    // =========================================================================

    /// Records one day of attendance with derived worked and overtime hours.
    pub async fn record_attendance(&self, new: NewAttendance) -> DbResult<Attendance> {
        let hours = new.hours();
        debug!(
            employee_id = new.employee_id,
            worked = %hours.hours_worked,
            overtime = %hours.overtime_hours,
            "Computed attendance hours"
        );

        let attendance = sqlx::query_as::<_, Attendance>(
            r#"
            INSERT INTO attendance (
                employee_id, date, clock_in, clock_out, break_start, break_end,
                hours_worked, overtime_hours, status, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
            RETURNING *
            "#,
        )
        .bind(new.employee_id)
        .bind(new.date)
        .bind(new.clock_in)
        .bind(new.clock_out)
        .bind(new.break_start)
        .bind(new.break_end)
        .bind(hours.hours_worked)
        .bind(hours.overtime_hours)
        .bind(new.status)
        .bind(&new.notes)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .duplicate_value(&new.date.to_string())?;

        Ok(attendance)
    }

    pub async fn get_attendance(&self, id: i64) -> DbResult<Attendance> {
        fetch_live_from_pool(&self.pool, "attendance", "Attendance", id).await
    }

    pub async fn list_attendance(&self, page: PageRequest) -> DbResult<Page<Attendance>> {
        fetch_page(&self.pool, "attendance", page).await
    }

    // =========================================================================
    // Leave Requests
    // =========================================================================

    /// Files a pending leave request; `days` counts both ends of the range.
    pub async fn create_leave_request(&self, new: NewLeaveRequest) -> DbResult<LeaveRequest> {
        let days = leave_days(new.start_date, new.end_date)?;
        if let Some(reason) = new.reason.as_deref() {
            validate_description(reason)?;
        }

        let request = sqlx::query_as::<_, LeaveRequest>(
            r#"
            INSERT INTO leave_requests (
                employee_id, leave_type_id, start_date, end_date, days, reason,
                status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            RETURNING *
            "#,
        )
        .bind(new.employee_id)
        .bind(new.leave_type_id)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(days)
        .bind(&new.reason)
        .bind(LeaveStatus::Pending)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        info!(employee_id = request.employee_id, days, "Leave requested");
        Ok(request)
    }

    pub async fn get_leave_request(&self, id: i64) -> DbResult<LeaveRequest> {
        fetch_live_from_pool(&self.pool, "leave_requests", "Leave request", id).await
    }

    pub async fn list_leave_requests(&self, page: PageRequest) -> DbResult<Page<LeaveRequest>> {
        fetch_page(&self.pool, "leave_requests", page).await
    }

    /// Pending requests, oldest first.
    pub async fn pending_leave_requests(&self) -> DbResult<Vec<LeaveRequest>> {
        let requests = sqlx::query_as::<_, LeaveRequest>(
            "SELECT * FROM leave_requests WHERE status = ?1 AND is_deleted = 0 ORDER BY id",
        )
        .bind(LeaveStatus::Pending)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    pub async fn approve_leave_request(&self, id: i64, user_id: i64) -> DbResult<LeaveRequest> {
        self.decide_leave_request(id, LeaveStatus::Approved, user_id).await
    }

    pub async fn reject_leave_request(&self, id: i64, user_id: i64) -> DbResult<LeaveRequest> {
        self.decide_leave_request(id, LeaveStatus::Rejected, user_id).await
    }

    async fn decide_leave_request(
        &self,
        id: i64,
        status: LeaveStatus,
        user_id: i64,
    ) -> DbResult<LeaveRequest> {
        let mut tx = self.pool.begin().await?;
        let current: LeaveRequest =
            fetch_live(&mut tx, "leave_requests", "Leave request", id).await?;
        ensure_status(
            current.status == LeaveStatus::Pending,
            "Leave request",
            &id.to_string(),
            current.status,
        )?;

        let request = sqlx::query_as::<_, LeaveRequest>(
            r#"
            UPDATE leave_requests
            SET status = ?2, approved_by = ?3, updated_at = ?4
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(user_id)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(id, status = status.as_str(), "Leave request decided");
        Ok(request)
    }

    // =========================================================================
    // Payroll
    // =========================================================================

    /// Creates a draft payroll record with gross, deductions and net derived.
    pub async fn create_payroll(&self, new: NewPayroll) -> DbResult<Payroll> {
        if new.period_end < new.period_start {
            return Err(ValidationError::InvalidRange {
                field: "pay period".to_string(),
            }
            .into());
        }
        let c = &new.components;
        for (field, amount) in [
            ("base_salary", c.base_salary),
            ("overtime_pay", c.overtime_pay),
            ("bonus", c.bonus),
            ("commission", c.commission),
            ("allowances", c.allowances),
            ("tax_deduction", c.tax_deduction),
            ("social_security", c.social_security),
            ("health_insurance", c.health_insurance),
            ("retirement_contribution", c.retirement_contribution),
            ("other_deductions", c.other_deductions),
        ] {
            validate_non_negative_money(field, amount)?;
        }
        let totals = new.totals();

        let payroll = sqlx::query_as::<_, Payroll>(
            r#"
            INSERT INTO payroll (
                employee_id, period_start, period_end, pay_date,
                base_salary, overtime_pay, bonus, commission, allowances,
                tax_deduction, social_security, health_insurance,
                retirement_contribution, other_deductions,
                gross_pay, total_deductions, net_pay,
                status, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8, ?9,
                ?10, ?11, ?12,
                ?13, ?14,
                ?15, ?16, ?17,
                ?18, ?19, ?19
            )
            RETURNING *
            "#,
        )
        .bind(new.employee_id)
        .bind(new.period_start)
        .bind(new.period_end)
        .bind(new.pay_date)
        .bind(c.base_salary)
        .bind(c.overtime_pay)
        .bind(c.bonus)
        .bind(c.commission)
        .bind(c.allowances)
        .bind(c.tax_deduction)
        .bind(c.social_security)
        .bind(c.health_insurance)
        .bind(c.retirement_contribution)
        .bind(c.other_deductions)
        .bind(totals.gross_pay)
        .bind(totals.total_deductions)
        .bind(totals.net_pay)
        .bind(PayrollStatus::Draft)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        info!(
            employee_id = payroll.employee_id,
            gross = %payroll.gross_pay,
            net = %payroll.net_pay,
            "Payroll created"
        );
        Ok(payroll)
    }

    pub async fn get_payroll(&self, id: i64) -> DbResult<Payroll> {
        fetch_live_from_pool(&self.pool, "payroll", "Payroll", id).await
    }

    pub async fn list_payroll(&self, page: PageRequest) -> DbResult<Page<Payroll>> {
        fetch_page(&self.pool, "payroll", page).await
    }

    /// Payroll records of one employee overlapping `[from, to]`.
    pub async fn employee_payroll(
        &self,
        employee_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<Payroll>> {
        let rows = sqlx::query_as::<_, Payroll>(
            r#"
            SELECT * FROM payroll
            WHERE employee_id = ?1 AND is_deleted = 0
              AND period_end >= ?2 AND period_start <= ?3
            ORDER BY period_start
            "#,
        )
        .bind(employee_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

// =============================================================================
// Tests
// =============================================================================
