//! Project routes: projects, tasks, time entries and project expenses.
//!
//! Every child write returns through the repository's recompute, so the
//! project's progress, actual cost and variance are current in the response.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use keystone_core::{
    NewProject, NewProjectExpense, NewTask, NewTimeEntry, Page, Project, ProjectExpense, Task,
    TimeEntry, UpdateProject, UpdateTaskStatus,
};
use serde::Serialize;

use super::PageQuery;
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route("/:id", get(get_project).put(update_project))
        .route("/:id/tasks", get(list_tasks).post(add_task))
        .route("/:id/tasks/:task_id", delete(remove_task))
        .route("/:id/tasks/:task_id/status", put(update_task_status))
        .route("/:id/time-entries", get(list_time_entries).post(add_time_entry))
        .route("/:id/time-entries/:entry_id", delete(remove_time_entry))
        .route("/:id/expenses", get(list_expenses).post(add_expense))
        .route("/:id/expenses/:expense_id", delete(remove_expense))
}

/// A project with everything its derived figures are computed from.
#[derive(Debug, Serialize)]
pub struct ProjectView {
    #[serde(flatten)]
    pub project: Project,
    pub tasks: Vec<Task>,
    pub time_entries: Vec<TimeEntry>,
    pub expenses: Vec<ProjectExpense>,
}

async fn list_projects(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<Page<Project>>> {
    let page = q.request(state.config.items_per_page);
    Ok(Json(state.db.projects().list_projects(page).await?))
}

async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ProjectView>> {
    let projects = state.db.projects();
    Ok(Json(ProjectView {
        project: projects.get_project(id).await?,
        tasks: projects.list_tasks(id).await?,
        time_entries: projects.list_time_entries(id).await?,
        expenses: projects.list_expenses(id).await?,
    }))
}

async fn create_project(
    State(state): State<AppState>,
    user: AuthUser,
    Json(new): Json<NewProject>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    user.require_write()?;
    let project = state.db.projects().create_project(new).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

async fn update_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(update): Json<UpdateProject>,
) -> ApiResult<Json<Project>> {
    user.require_write()?;
    Ok(Json(state.db.projects().update_project(id, update).await?))
}

// =============================================================================
// Tasks
// =============================================================================

async fn list_tasks(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(state.db.projects().list_tasks(id).await?))
}

async fn add_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(new): Json<NewTask>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    user.require_write()?;
    let task = state.db.projects().add_task(id, new).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn update_task_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, task_id)): Path<(i64, i64)>,
    Json(body): Json<UpdateTaskStatus>,
) -> ApiResult<Json<Task>> {
    user.require_write()?;
    let task = state
        .db
        .projects()
        .update_task_status(id, task_id, body.status)
        .await?;
    Ok(Json(task))
}

async fn remove_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, task_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Project>> {
    user.require_write()?;
    Ok(Json(state.db.projects().remove_task(id, task_id).await?))
}

// =============================================================================
// Time Entries
// =============================================================================

async fn list_time_entries(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<TimeEntry>>> {
    Ok(Json(state.db.projects().list_time_entries(id).await?))
}

async fn add_time_entry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(new): Json<NewTimeEntry>,
) -> ApiResult<(StatusCode, Json<TimeEntry>)> {
    user.require_write()?;
    let entry = state.db.projects().add_time_entry(id, new).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn remove_time_entry(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, entry_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Project>> {
    user.require_write()?;
    Ok(Json(state.db.projects().remove_time_entry(id, entry_id).await?))
}

// =============================================================================
// Expenses
// =============================================================================

async fn list_expenses(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<ProjectExpense>>> {
    Ok(Json(state.db.projects().list_expenses(id).await?))
}

async fn add_expense(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(new): Json<NewProjectExpense>,
) -> ApiResult<(StatusCode, Json<ProjectExpense>)> {
    user.require_write()?;
    let expense = state.db.projects().add_expense(id, new).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

async fn remove_expense(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, expense_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Project>> {
    user.require_write()?;
    Ok(Json(state.db.projects().remove_expense(id, expense_id).await?))
}
