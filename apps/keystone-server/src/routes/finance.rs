//! Finance routes: accounts, invoices, payments, expenses, journals, budgets.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use keystone_core::{
    Account, Budget, BudgetLine, Expense, ExpenseStatus, Invoice, JournalEntry,
    JournalEntryLine, LineItem, NewAccount, NewBudget, NewBudgetLine, NewExpense, NewInvoice,
    NewJournalEntry, NewJournalLine, NewLineItem, NewPayment, Page, Payment, UpdateBudgetActual,
    UpdateInvoice,
};
use serde::{Deserialize, Serialize};

use super::{Detail, PageQuery};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts).post(create_account))
        .route("/accounts/:id", get(get_account))
        .route("/invoices", get(list_invoices).post(create_invoice))
        .route("/invoices/overdue", get(overdue_invoices))
        .route("/invoices/:id", get(get_invoice).put(update_invoice))
        .route("/invoices/:id/items", post(add_invoice_item))
        .route("/invoices/:id/items/:item_id", delete(remove_invoice_item))
        .route("/invoices/:id/payments", get(invoice_payments))
        .route("/payments", get(list_payments).post(record_payment))
        .route("/payments/:id", get(get_payment))
        .route("/expenses", get(list_expenses).post(create_expense))
        .route("/expenses/:id", get(get_expense))
        .route("/expenses/:id/status", put(set_expense_status))
        .route("/journal-entries", get(list_journal_entries).post(create_journal_entry))
        .route("/journal-entries/:id", get(get_journal_entry))
        .route("/journal-entries/:id/lines", post(add_journal_line))
        .route("/journal-entries/:id/lines/:line_id", delete(remove_journal_line))
        .route("/journal-entries/:id/post", post(post_journal_entry))
        .route("/budgets", get(list_budgets).post(create_budget))
        .route("/budgets/:id", get(get_budget))
        .route("/budgets/:id/lines", post(add_budget_line))
        .route("/budgets/:id/lines/:line_id", put(update_budget_actual))
}

// =============================================================================
// Accounts
// =============================================================================

async fn list_accounts(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<Page<Account>>> {
    let page = q.request(state.config.items_per_page);
    Ok(Json(state.db.finance().list_accounts(page).await?))
}

async fn get_account(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Account>> {
    Ok(Json(state.db.finance().get_account(id).await?))
}

async fn create_account(
    State(state): State<AppState>,
    user: AuthUser,
    Json(new): Json<NewAccount>,
) -> ApiResult<(StatusCode, Json<Account>)> {
    user.require_write()?;
    let account = state.db.finance().create_account(new).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

// =============================================================================
// Invoices
// =============================================================================

/// Invoice with its line items and the days it is past due today.
#[derive(Debug, Serialize)]
pub struct InvoiceView {
    #[serde(flatten)]
    pub detail: Detail<Invoice, LineItem>,
    pub days_overdue: i64,
}

async fn list_invoices(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<Page<Invoice>>> {
    let page = q.request(state.config.items_per_page);
    Ok(Json(state.db.finance().list_invoices(page).await?))
}

async fn overdue_invoices(State(state): State<AppState>) -> ApiResult<Json<Vec<Invoice>>> {
    let today = Utc::now().date_naive();
    Ok(Json(state.db.finance().overdue_invoices(today).await?))
}

async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<InvoiceView>> {
    let finance = state.db.finance();
    let invoice = finance.get_invoice(id).await?;
    let items = finance.invoice_items(id).await?;
    let days_overdue = invoice.days_overdue(Utc::now().date_naive());
    Ok(Json(InvoiceView {
        detail: Detail {
            header: invoice,
            items,
        },
        days_overdue,
    }))
}

async fn create_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Json(new): Json<NewInvoice>,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    user.require_write()?;
    let invoice = state.db.finance().create_invoice(new).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

async fn update_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(update): Json<UpdateInvoice>,
) -> ApiResult<Json<Invoice>> {
    user.require_write()?;
    Ok(Json(state.db.finance().update_invoice(id, update).await?))
}

async fn add_invoice_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(item): Json<NewLineItem>,
) -> ApiResult<Json<Invoice>> {
    user.require_write()?;
    Ok(Json(state.db.finance().add_invoice_item(id, item).await?))
}

async fn remove_invoice_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, item_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Invoice>> {
    user.require_write()?;
    Ok(Json(state.db.finance().remove_invoice_item(id, item_id).await?))
}

async fn invoice_payments(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<Payment>>> {
    Ok(Json(state.db.finance().invoice_payments(id).await?))
}

// =============================================================================
// Payments
// =============================================================================

async fn list_payments(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<Page<Payment>>> {
    let page = q.request(state.config.items_per_page);
    Ok(Json(state.db.finance().list_payments(page).await?))
}

async fn get_payment(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Payment>> {
    Ok(Json(state.db.finance().get_payment(id).await?))
}

async fn record_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(new): Json<NewPayment>,
) -> ApiResult<(StatusCode, Json<Payment>)> {
    user.require_write()?;
    let payment = state.db.finance().record_payment(new).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

// =============================================================================
// Expenses
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ExpenseStatusBody {
    pub status: ExpenseStatus,
}

async fn list_expenses(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<Page<Expense>>> {
    let page = q.request(state.config.items_per_page);
    Ok(Json(state.db.finance().list_expenses(page).await?))
}

async fn get_expense(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Expense>> {
    Ok(Json(state.db.finance().get_expense(id).await?))
}

async fn create_expense(
    State(state): State<AppState>,
    user: AuthUser,
    Json(new): Json<NewExpense>,
) -> ApiResult<(StatusCode, Json<Expense>)> {
    user.require_write()?;
    let expense = state.db.finance().create_expense(new).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

async fn set_expense_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(body): Json<ExpenseStatusBody>,
) -> ApiResult<Json<Expense>> {
    user.require_write()?;
    Ok(Json(state.db.finance().set_expense_status(id, body.status).await?))
}

// =============================================================================
// Journal Entries
// =============================================================================

async fn list_journal_entries(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<Page<JournalEntry>>> {
    let page = q.request(state.config.items_per_page);
    Ok(Json(state.db.finance().list_journal_entries(page).await?))
}

async fn get_journal_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Detail<JournalEntry, JournalEntryLine>>> {
    let finance = state.db.finance();
    Ok(Json(Detail {
        header: finance.get_journal_entry(id).await?,
        items: finance.journal_lines(id).await?,
    }))
}

async fn create_journal_entry(
    State(state): State<AppState>,
    user: AuthUser,
    Json(new): Json<NewJournalEntry>,
) -> ApiResult<(StatusCode, Json<JournalEntry>)> {
    user.require_write()?;
    let entry = state.db.finance().create_journal_entry(new).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn add_journal_line(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(line): Json<NewJournalLine>,
) -> ApiResult<Json<JournalEntry>> {
    user.require_write()?;
    Ok(Json(state.db.finance().add_journal_line(id, line).await?))
}

async fn remove_journal_line(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, line_id)): Path<(i64, i64)>,
) -> ApiResult<Json<JournalEntry>> {
    user.require_write()?;
    Ok(Json(state.db.finance().remove_journal_line(id, line_id).await?))
}

async fn post_journal_entry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<JournalEntry>> {
    user.require_write()?;
    Ok(Json(state.db.finance().post_journal_entry(id).await?))
}

// =============================================================================
// Budgets
// =============================================================================

async fn list_budgets(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<Page<Budget>>> {
    let page = q.request(state.config.items_per_page);
    Ok(Json(state.db.finance().list_budgets(page).await?))
}

async fn get_budget(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Detail<Budget, BudgetLine>>> {
    let finance = state.db.finance();
    Ok(Json(Detail {
        header: finance.get_budget(id).await?,
        items: finance.budget_lines(id).await?,
    }))
}

async fn create_budget(
    State(state): State<AppState>,
    user: AuthUser,
    Json(new): Json<NewBudget>,
) -> ApiResult<(StatusCode, Json<Budget>)> {
    user.require_write()?;
    let budget = state.db.finance().create_budget(new).await?;
    Ok((StatusCode::CREATED, Json(budget)))
}

async fn add_budget_line(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(line): Json<NewBudgetLine>,
) -> ApiResult<Json<Budget>> {
    user.require_write()?;
    Ok(Json(state.db.finance().add_budget_line(id, line).await?))
}

async fn update_budget_actual(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, line_id)): Path<(i64, i64)>,
    Json(body): Json<UpdateBudgetActual>,
) -> ApiResult<Json<Budget>> {
    user.require_write()?;
    let budget = state
        .db
        .finance()
        .update_budget_actual(id, line_id, body.actual_amount)
        .await?;
    Ok(Json(budget))
}
