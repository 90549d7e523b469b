//! HR routes: reference data, employees, attendance, leave and payroll.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use keystone_core::{
    Attendance, Department, Employee, JobPosition, LeaveRequest, LeaveType, NewAttendance,
    NewDepartment, NewEmployee, NewJobPosition, NewLeaveRequest, NewLeaveType, NewPayroll, Page,
    Payroll, UpdateEmployee, ValidationError,
};
use serde::{Deserialize, Serialize};

use super::PageQuery;
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/departments", get(list_departments).post(create_department))
        .route("/departments/:id", get(get_department))
        .route("/positions", get(list_positions).post(create_position))
        .route("/positions/:id", get(get_position))
        .route("/leave-types", get(list_leave_types).post(create_leave_type))
        .route("/leave-types/:id", get(get_leave_type))
        .route("/employees", get(list_employees).post(create_employee))
        .route("/employees/:id", get(get_employee).put(update_employee))
        .route("/employees/:id/payroll", get(employee_payroll))
        .route("/attendance", get(list_attendance).post(record_attendance))
        .route("/attendance/:id", get(get_attendance))
        .route("/leave-requests", get(list_leave_requests).post(create_leave_request))
        .route("/leave-requests/:id", get(get_leave_request))
        .route("/leave-requests/:id/approve", post(approve_leave_request))
        .route("/leave-requests/:id/reject", post(reject_leave_request))
        .route("/payroll", get(list_payroll).post(create_payroll))
        .route("/payroll/:id", get(get_payroll))
}

// =============================================================================
// Reference Data
// =============================================================================

async fn list_departments(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<Page<Department>>> {
    let page = q.request(state.config.items_per_page);
    Ok(Json(state.db.hr().list_departments(page).await?))
}

async fn get_department(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Department>> {
    Ok(Json(state.db.hr().get_department(id).await?))
}

async fn create_department(
    State(state): State<AppState>,
    user: AuthUser,
    Json(new): Json<NewDepartment>,
) -> ApiResult<(StatusCode, Json<Department>)> {
    user.require_write()?;
    let department = state.db.hr().create_department(new).await?;
    Ok((StatusCode::CREATED, Json(department)))
}

async fn list_positions(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<Page<JobPosition>>> {
    let page = q.request(state.config.items_per_page);
    Ok(Json(state.db.hr().list_positions(page).await?))
}

/// Job position with its salary band rendered for display.
#[derive(Debug, Serialize)]
pub struct PositionView {
    #[serde(flatten)]
    pub position: JobPosition,
    pub salary_range: String,
}

async fn get_position(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<PositionView>> {
    let position = state.db.hr().get_position(id).await?;
    let salary_range = position.salary_range();
    Ok(Json(PositionView {
        position,
        salary_range,
    }))
}

async fn create_position(
    State(state): State<AppState>,
    user: AuthUser,
    Json(new): Json<NewJobPosition>,
) -> ApiResult<(StatusCode, Json<JobPosition>)> {
    user.require_write()?;
    let position = state.db.hr().create_position(new).await?;
    Ok((StatusCode::CREATED, Json(position)))
}

async fn list_leave_types(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<Page<LeaveType>>> {
    let page = q.request(state.config.items_per_page);
    Ok(Json(state.db.hr().list_leave_types(page).await?))
}

async fn get_leave_type(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<LeaveType>> {
    Ok(Json(state.db.hr().get_leave_type(id).await?))
}

async fn create_leave_type(
    State(state): State<AppState>,
    user: AuthUser,
    Json(new): Json<NewLeaveType>,
) -> ApiResult<(StatusCode, Json<LeaveType>)> {
    user.require_write()?;
    let leave_type = state.db.hr().create_leave_type(new).await?;
    Ok((StatusCode::CREATED, Json(leave_type)))
}

// =============================================================================
// Employees
// =============================================================================

async fn list_employees(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<Page<Employee>>> {
    let page = q.request(state.config.items_per_page);
    Ok(Json(state.db.hr().list_employees(page).await?))
}

async fn get_employee(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Employee>> {
    Ok(Json(state.db.hr().get_employee(id).await?))
}

async fn create_employee(
    State(state): State<AppState>,
    user: AuthUser,
    Json(new): Json<NewEmployee>,
) -> ApiResult<(StatusCode, Json<Employee>)> {
    user.require_write()?;
    let employee = state.db.hr().create_employee(new).await?;
    Ok((StatusCode::CREATED, Json(employee)))
}

async fn update_employee(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(update): Json<UpdateEmployee>,
) -> ApiResult<Json<Employee>> {
    user.require_write()?;
    Ok(Json(state.db.hr().update_employee(id, update).await?))
}

/// Pay period window for an employee's payroll history.
#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

async fn employee_payroll(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(period): Query<PeriodQuery>,
) -> ApiResult<Json<Vec<Payroll>>> {
    if period.to < period.from {
        return Err(ValidationError::InvalidRange {
            field: "to".to_string(),
        }
        .into());
    }
    let rows = state
        .db
        .hr()
        .employee_payroll(id, period.from, period.to)
        .await?;
    Ok(Json(rows))
}

// =============================================================================
// Attendance
// =============================================================================

async fn list_attendance(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<Page<Attendance>>> {
    let page = q.request(state.config.items_per_page);
    Ok(Json(state.db.hr().list_attendance(page).await?))
}

async fn get_attendance(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Attendance>> {
    Ok(Json(state.db.hr().get_attendance(id).await?))
}

async fn record_attendance(
    State(state): State<AppState>,
    user: AuthUser,
    Json(new): Json<NewAttendance>,
) -> ApiResult<(StatusCode, Json<Attendance>)> {
    user.require_write()?;
    let attendance = state.db.hr().record_attendance(new).await?;
    Ok((StatusCode::CREATED, Json(attendance)))
}

// =============================================================================
// Leave
// =============================================================================

async fn list_leave_requests(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<Page<LeaveRequest>>> {
    let page = q.request(state.config.items_per_page);
    Ok(Json(state.db.hr().list_leave_requests(page).await?))
}

async fn get_leave_request(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<LeaveRequest>> {
    Ok(Json(state.db.hr().get_leave_request(id).await?))
}

async fn create_leave_request(
    State(state): State<AppState>,
    user: AuthUser,
    Json(new): Json<NewLeaveRequest>,
) -> ApiResult<(StatusCode, Json<LeaveRequest>)> {
    user.require_write()?;
    let request = state.db.hr().create_leave_request(new).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

async fn approve_leave_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<LeaveRequest>> {
    user.require_write()?;
    Ok(Json(state.db.hr().approve_leave_request(id, user.id).await?))
}

async fn reject_leave_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<LeaveRequest>> {
    user.require_write()?;
    Ok(Json(state.db.hr().reject_leave_request(id, user.id).await?))
}

// =============================================================================
// Payroll
// =============================================================================

async fn list_payroll(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<Page<Payroll>>> {
    let page = q.request(state.config.items_per_page);
    Ok(Json(state.db.hr().list_payroll(page).await?))
}

async fn get_payroll(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Payroll>> {
    Ok(Json(state.db.hr().get_payroll(id).await?))
}

async fn create_payroll(
    State(state): State<AppState>,
    user: AuthUser,
    Json(new): Json<NewPayroll>,
) -> ApiResult<(StatusCode, Json<Payroll>)> {
    user.require_write()?;
    let payroll = state.db.hr().create_payroll(new).await?;
    Ok((StatusCode::CREATED, Json(payroll)))
}
