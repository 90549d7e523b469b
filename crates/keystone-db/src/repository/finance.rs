//! # Finance Repository
//!
//! Accounts, invoices, payments, expenses, journal entries and budgets.
//!
//! ## Invoice Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_invoice()        INV-000001, status draft                      │
//! │     └── items inserted, totals + balance_due derived                    │
//! │                                                                         │
//! │  add / remove item, update header                                       │
//! │     └── totals re-derived in the same transaction                      │
//! │                                                                         │
//! │  record_payment()        PAY-000001                                    │
//! │     ├── paid_amount += amount                                           │
//! │     ├── balance_due = total - paid_amount                               │
//! │     └── status → partially_paid / paid                                 │
//! │                                                                         │
//! │  every step refreshes the customer's current_balance                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Journal Entries
//! Lines may be added while the entry is a draft. Posting requires total
//! debits to equal total credits and freezes the entry.

use chrono::{NaiveDate, Utc};
use keystone_core::calc::{JournalTotals, Variance};
use keystone_core::validation::{
    validate_code, validate_description, validate_name, validate_non_negative_money,
    validate_positive_money,
};
use keystone_core::{
    Account, Budget, BudgetLine, BudgetStatus, CodeSeries, CoreError, Expense, ExpenseStatus,
    Invoice, InvoiceStatus, JournalEntry, JournalEntryLine, JournalStatus, LineItem, Money,
    NewAccount, NewBudget, NewBudgetLine, NewExpense, NewInvoice, NewJournalEntry,
    NewJournalLine, NewLineItem, NewPayment, Page, PageRequest, Payment, UpdateInvoice,
    ValidationError,
};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use super::documents::{self, DocumentKind};
use super::sales::refresh_customer_balance;
use super::{codes, ensure_status, fetch_live, fetch_live_from_pool, fetch_page};
use crate::error::{DbError, DbResult, DuplicateContext};

/// Repository for finance database operations.
#[derive(Debug, Clone)]
pub struct FinanceRepository {
    pool: SqlitePool,
}

impl FinanceRepository {
    /// Creates a new FinanceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        FinanceRepository { pool }
    }

    // =========================================================================
    // Chart of Accounts
    // =========================================================================

    pub async fn create_account(&self, new: NewAccount) -> DbResult<Account> {
        let code = new.account_code.trim();
        validate_code("account_code", code)?;
        validate_name("name", &new.name, 200)?;

        let now = Utc::now();
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (account_code, name, account_type, parent_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            RETURNING *
            "#,
        )
        .bind(code)
        .bind(new.name.trim())
        .bind(new.account_type)
        .bind(new.parent_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .duplicate_value(code)?;

        info!(account_code = %account.account_code, "Account created");
        Ok(account)
    }

    pub async fn get_account(&self, id: i64) -> DbResult<Account> {
        fetch_live_from_pool(&self.pool, "accounts", "Account", id).await
    }

    pub async fn list_accounts(&self, page: PageRequest) -> DbResult<Page<Account>> {
        fetch_page(&self.pool, "accounts", page).await
    }

    // =========================================================================
    // Invoices
    // =========================================================================

    /// Creates an invoice with its items.
    ///
    /// ## Returns
    /// The invoice with `subtotal`, `tax_amount`, `total` and `balance_due`
    /// derived from the items and header charges.
    pub async fn create_invoice(&self, new: NewInvoice) -> DbResult<Invoice> {
        new.validate()?;
        for item in &new.items {
            item.validate()?;
        }

        let mut tx = self.pool.begin().await?;
        let number =
            codes::assign_code(&mut tx, CodeSeries::Invoice, new.invoice_number.as_deref())
                .await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO invoices (
                invoice_number, customer_id, sales_order_id, invoice_date, due_date,
                status, tax_rate, shipping, discount, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
            RETURNING id
            "#,
        )
        .bind(&number)
        .bind(new.customer_id)
        .bind(new.sales_order_id)
        .bind(new.invoice_date)
        .bind(new.due_date)
        .bind(InvoiceStatus::Draft)
        .bind(new.tax_rate)
        .bind(new.shipping)
        .bind(new.discount)
        .bind(&new.notes)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .duplicate_value(&number)?;

        documents::insert_items_and_recalculate(&mut tx, DocumentKind::Invoice, id, &new.items)
            .await?;
        refresh_customer_balance(&mut tx, new.customer_id).await?;

        let invoice: Invoice = fetch_live(&mut tx, "invoices", "Invoice", id).await?;
        tx.commit().await?;

        info!(
            invoice_number = %invoice.invoice_number,
            total = %invoice.total,
            "Invoice created"
        );
        Ok(invoice)
    }

    pub async fn get_invoice(&self, id: i64) -> DbResult<Invoice> {
        fetch_live_from_pool(&self.pool, "invoices", "Invoice", id).await
    }

    pub async fn list_invoices(&self, page: PageRequest) -> DbResult<Page<Invoice>> {
        fetch_page(&self.pool, "invoices", page).await
    }

    pub async fn invoice_items(&self, id: i64) -> DbResult<Vec<LineItem>> {
        let mut conn = self.pool.acquire().await?;
        documents::ensure_document(&mut conn, DocumentKind::Invoice, id).await?;
        documents::list_line_items(&mut conn, DocumentKind::Invoice, id).await
    }

    pub async fn add_invoice_item(&self, id: i64, item: NewLineItem) -> DbResult<Invoice> {
        let mut tx = self.pool.begin().await?;
        let invoice = editable_invoice(&mut tx, id).await?;
        documents::insert_line_item(&mut tx, DocumentKind::Invoice, id, &item).await?;
        let invoice = rederive_invoice(&mut tx, &invoice).await?;
        tx.commit().await?;
        Ok(invoice)
    }

    pub async fn remove_invoice_item(&self, id: i64, item_id: i64) -> DbResult<Invoice> {
        let mut tx = self.pool.begin().await?;
        let invoice = editable_invoice(&mut tx, id).await?;
        documents::remove_line_item(&mut tx, DocumentKind::Invoice, id, item_id).await?;
        let invoice = rederive_invoice(&mut tx, &invoice).await?;
        tx.commit().await?;
        Ok(invoice)
    }

    /// Edits header fields; totals and status are re-derived from the
    /// stored items and payments.
    pub async fn update_invoice(&self, id: i64, update: UpdateInvoice) -> DbResult<Invoice> {
        update.validate_status()?;
        let mut tx = self.pool.begin().await?;
        let current: Invoice = fetch_live(&mut tx, "invoices", "Invoice", id).await?;

        let due_date = update.due_date.unwrap_or(current.due_date);
        if due_date < current.invoice_date {
            return Err(ValidationError::InvalidRange {
                field: "invoice period".to_string(),
            }
            .into());
        }
        let tax_rate = update.tax_rate.unwrap_or(current.tax_rate);
        let shipping = update.shipping.unwrap_or(current.shipping);
        let discount = update.discount.unwrap_or(current.discount);
        keystone_core::validation::validate_charges(tax_rate, shipping, discount)?;

        sqlx::query(
            r#"
            UPDATE invoices
            SET due_date = ?2, status = ?3, tax_rate = ?4, shipping = ?5,
                discount = ?6, notes = ?7, updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(due_date)
        .bind(update.status.unwrap_or(current.status))
        .bind(tax_rate)
        .bind(shipping)
        .bind(discount)
        .bind(update.notes.or(current.notes.clone()))
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let invoice = rederive_invoice(&mut tx, &current).await?;
        tx.commit().await?;
        Ok(invoice)
    }

    /// Invoices with an outstanding balance past their due date.
    pub async fn overdue_invoices(&self, today: NaiveDate) -> DbResult<Vec<Invoice>> {
        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT * FROM invoices
            WHERE is_deleted = 0
              AND status NOT IN ('paid', 'cancelled')
              AND balance_due > 0
              AND due_date < ?1
            ORDER BY due_date
            "#,
        )
        .bind(today)
        .fetch_all(&self.pool)
        .await?;
        Ok(invoices)
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// Applies a payment to an invoice.
    ///
    /// ## What This Does
    /// 1. Allocates the `PAY-` number
    /// 2. Inserts the payment for the invoice's customer
    /// 3. Raises `paid_amount`, lowers `balance_due`, moves the status
    /// 4. Refreshes the customer balance
    pub async fn record_payment(&self, new: NewPayment) -> DbResult<Payment> {
        validate_positive_money("amount", new.amount)?;

        let mut tx = self.pool.begin().await?;
        let invoice: Invoice = fetch_live(&mut tx, "invoices", "Invoice", new.invoice_id).await?;
        ensure_status(
            invoice.status != InvoiceStatus::Cancelled,
            "Invoice",
            &invoice.invoice_number,
            invoice.status,
        )?;

        let number =
            codes::assign_code(&mut tx, CodeSeries::Payment, new.payment_number.as_deref())
                .await?;
        let now = Utc::now();

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (
                payment_number, invoice_id, customer_id, amount, payment_date,
                method, reference, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            RETURNING *
            "#,
        )
        .bind(&number)
        .bind(invoice.id)
        .bind(invoice.customer_id)
        .bind(new.amount)
        .bind(new.payment_date)
        .bind(new.method)
        .bind(&new.reference)
        .bind(&new.notes)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .duplicate_value(&number)?;

        let paid = invoice.paid_amount + new.amount;
        let balance_due = invoice.total - paid;
        let status = invoice.status.reconciled(balance_due, paid);

        sqlx::query(
            r#"
            UPDATE invoices
            SET paid_amount = ?2, balance_due = ?3, status = ?4, updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(invoice.id)
        .bind(paid)
        .bind(balance_due)
        .bind(status)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        refresh_customer_balance(&mut tx, invoice.customer_id).await?;
        tx.commit().await?;

        if balance_due.is_negative() {
            warn!(
                invoice_number = %invoice.invoice_number,
                overpaid = %balance_due.abs(),
                "Invoice overpaid"
            );
        }
        info!(
            payment_number = %payment.payment_number,
            invoice_number = %invoice.invoice_number,
            amount = %payment.amount,
            "Payment recorded"
        );
        Ok(payment)
    }

    pub async fn get_payment(&self, id: i64) -> DbResult<Payment> {
        fetch_live_from_pool(&self.pool, "payments", "Payment", id).await
    }

    pub async fn list_payments(&self, page: PageRequest) -> DbResult<Page<Payment>> {
        fetch_page(&self.pool, "payments", page).await
    }

    pub async fn invoice_payments(&self, invoice_id: i64) -> DbResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE invoice_id = ?1 AND is_deleted = 0 ORDER BY id",
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }

    // =========================================================================
    // Expenses
    // =========================================================================

    pub async fn create_expense(&self, new: NewExpense) -> DbResult<Expense> {
        validate_name("category", &new.category, 100)?;
        validate_description(&new.description)?;
        validate_positive_money("amount", new.amount)?;
        validate_non_negative_money("tax_amount", new.tax_amount)?;

        let mut tx = self.pool.begin().await?;
        let number =
            codes::assign_code(&mut tx, CodeSeries::Expense, new.expense_number.as_deref())
                .await?;

        let expense = sqlx::query_as::<_, Expense>(
            r#"
            INSERT INTO expenses (
                expense_number, category, description, amount, tax_amount, total_amount,
                expense_date, employee_id, vendor, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
            RETURNING *
            "#,
        )
        .bind(&number)
        .bind(new.category.trim())
        .bind(new.description.trim())
        .bind(new.amount)
        .bind(new.tax_amount)
        .bind(new.total_amount())
        .bind(new.expense_date)
        .bind(new.employee_id)
        .bind(&new.vendor)
        .bind(ExpenseStatus::Pending)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .duplicate_value(&number)?;

        tx.commit().await?;
        info!(expense_number = %expense.expense_number, total = %expense.total_amount, "Expense created");
        Ok(expense)
    }

    pub async fn get_expense(&self, id: i64) -> DbResult<Expense> {
        fetch_live_from_pool(&self.pool, "expenses", "Expense", id).await
    }

    pub async fn list_expenses(&self, page: PageRequest) -> DbResult<Page<Expense>> {
        fetch_page(&self.pool, "expenses", page).await
    }

    /// Moves a pending expense to approved or rejected, or an approved one to paid.
    pub async fn set_expense_status(&self, id: i64, status: ExpenseStatus) -> DbResult<Expense> {
        let mut tx = self.pool.begin().await?;
        let current: Expense = fetch_live(&mut tx, "expenses", "Expense", id).await?;

        let allowed = matches!(
            (current.status, status),
            (ExpenseStatus::Pending, ExpenseStatus::Approved)
                | (ExpenseStatus::Pending, ExpenseStatus::Rejected)
                | (ExpenseStatus::Approved, ExpenseStatus::Paid)
        );
        ensure_status(allowed, "Expense", &current.expense_number, current.status)?;

        let expense = sqlx::query_as::<_, Expense>(
            "UPDATE expenses SET status = ?2, updated_at = ?3 WHERE id = ?1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(expense)
    }

    // =========================================================================
    // Journal Entries
    // =========================================================================

    /// Creates a draft journal entry with its lines and totals.
    ///
    /// Unbalanced drafts are accepted; balance is enforced when posting.
    pub async fn create_journal_entry(&self, new: NewJournalEntry) -> DbResult<JournalEntry> {
        for line in &new.lines {
            line.validate()?;
        }

        let mut tx = self.pool.begin().await?;
        let number =
            codes::assign_code(&mut tx, CodeSeries::JournalEntry, new.entry_number.as_deref())
                .await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO journal_entries (
                entry_number, entry_date, reference, description, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            RETURNING id
            "#,
        )
        .bind(&number)
        .bind(new.entry_date)
        .bind(&new.reference)
        .bind(&new.description)
        .bind(JournalStatus::Draft)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .duplicate_value(&number)?;

        for line in &new.lines {
            insert_journal_line(&mut tx, id, line).await?;
        }
        recalculate_journal(&mut tx, id).await?;

        let entry: JournalEntry = fetch_live(&mut tx, "journal_entries", "Journal entry", id).await?;
        tx.commit().await?;

        info!(
            entry_number = %entry.entry_number,
            debit = %entry.total_debit,
            credit = %entry.total_credit,
            "Journal entry created"
        );
        Ok(entry)
    }

    pub async fn get_journal_entry(&self, id: i64) -> DbResult<JournalEntry> {
        fetch_live_from_pool(&self.pool, "journal_entries", "Journal entry", id).await
    }

    pub async fn list_journal_entries(&self, page: PageRequest) -> DbResult<Page<JournalEntry>> {
        fetch_page(&self.pool, "journal_entries", page).await
    }

    pub async fn journal_lines(&self, id: i64) -> DbResult<Vec<JournalEntryLine>> {
        self.get_journal_entry(id).await?;
        let lines = sqlx::query_as::<_, JournalEntryLine>(
            "SELECT * FROM journal_entry_lines WHERE journal_entry_id = ?1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(lines)
    }

    pub async fn add_journal_line(&self, id: i64, line: NewJournalLine) -> DbResult<JournalEntry> {
        line.validate()?;
        let mut tx = self.pool.begin().await?;
        draft_entry(&mut tx, id).await?;
        insert_journal_line(&mut tx, id, &line).await?;
        recalculate_journal(&mut tx, id).await?;
        let entry: JournalEntry = fetch_live(&mut tx, "journal_entries", "Journal entry", id).await?;
        tx.commit().await?;
        Ok(entry)
    }

    pub async fn remove_journal_line(&self, id: i64, line_id: i64) -> DbResult<JournalEntry> {
        let mut tx = self.pool.begin().await?;
        draft_entry(&mut tx, id).await?;
        let result =
            sqlx::query("DELETE FROM journal_entry_lines WHERE id = ?1 AND journal_entry_id = ?2")
                .bind(line_id)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Journal line", line_id));
        }
        recalculate_journal(&mut tx, id).await?;
        let entry: JournalEntry = fetch_live(&mut tx, "journal_entries", "Journal entry", id).await?;
        tx.commit().await?;
        Ok(entry)
    }

    /// Posts a balanced draft entry.
    ///
    /// ## Errors
    /// - `InvalidStatus` unless the entry is a draft
    /// - `UnbalancedEntry` when debits and credits differ
    pub async fn post_journal_entry(&self, id: i64) -> DbResult<JournalEntry> {
        let mut tx = self.pool.begin().await?;
        let entry = draft_entry(&mut tx, id).await?;

        if !entry.is_balanced() {
            return Err(CoreError::UnbalancedEntry {
                entry_number: entry.entry_number,
                debit_cents: entry.total_debit.cents(),
                credit_cents: entry.total_credit.cents(),
            }
            .into());
        }

        let posted = sqlx::query_as::<_, JournalEntry>(
            "UPDATE journal_entries SET status = ?2, updated_at = ?3 WHERE id = ?1 RETURNING *",
        )
        .bind(id)
        .bind(JournalStatus::Posted)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(entry_number = %posted.entry_number, "Journal entry posted");
        Ok(posted)
    }

    // =========================================================================
    // Budgets
    // =========================================================================

    /// Creates a budget with its lines; variances are derived per line and
    /// in aggregate.
    pub async fn create_budget(&self, new: NewBudget) -> DbResult<Budget> {
        validate_name("name", &new.name, 200)?;
        if new.end_date < new.start_date {
            return Err(ValidationError::InvalidRange {
                field: "budget period".to_string(),
            }
            .into());
        }
        for line in &new.lines {
            validate_budget_line(line)?;
        }

        let mut tx = self.pool.begin().await?;
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO budgets (name, fiscal_year, start_date, end_date, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            RETURNING id
            "#,
        )
        .bind(new.name.trim())
        .bind(new.fiscal_year)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(BudgetStatus::Draft)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        for line in &new.lines {
            insert_budget_line(&mut tx, id, line).await?;
        }
        let budget = recalculate_budget(&mut tx, id).await?;
        tx.commit().await?;

        info!(budget = %budget.name, total = %budget.total_budget, "Budget created");
        Ok(budget)
    }

    pub async fn get_budget(&self, id: i64) -> DbResult<Budget> {
        fetch_live_from_pool(&self.pool, "budgets", "Budget", id).await
    }

    pub async fn list_budgets(&self, page: PageRequest) -> DbResult<Page<Budget>> {
        fetch_page(&self.pool, "budgets", page).await
    }

    pub async fn budget_lines(&self, id: i64) -> DbResult<Vec<BudgetLine>> {
        self.get_budget(id).await?;
        let lines = sqlx::query_as::<_, BudgetLine>(
            "SELECT * FROM budget_lines WHERE budget_id = ?1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(lines)
    }

    pub async fn add_budget_line(&self, id: i64, line: NewBudgetLine) -> DbResult<Budget> {
        validate_budget_line(&line)?;
        let mut tx = self.pool.begin().await?;
        let _: Budget = fetch_live(&mut tx, "budgets", "Budget", id).await?;
        insert_budget_line(&mut tx, id, &line).await?;
        let budget = recalculate_budget(&mut tx, id).await?;
        tx.commit().await?;
        Ok(budget)
    }

    /// Records actual spending on one line and re-derives both variances.
    pub async fn update_budget_actual(
        &self,
        id: i64,
        line_id: i64,
        actual_amount: Money,
    ) -> DbResult<Budget> {
        validate_non_negative_money("actual_amount", actual_amount)?;

        let mut tx = self.pool.begin().await?;
        let _: Budget = fetch_live(&mut tx, "budgets", "Budget", id).await?;

        let budgeted: Money = sqlx::query_scalar(
            "SELECT budgeted_amount FROM budget_lines WHERE id = ?1 AND budget_id = ?2",
        )
        .bind(line_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Budget line", line_id))?;

        let variance = Variance::budget(budgeted, actual_amount);
        sqlx::query(
            r#"
            UPDATE budget_lines
            SET actual_amount = ?2, variance = ?3, variance_percentage = ?4
            WHERE id = ?1
            "#,
        )
        .bind(line_id)
        .bind(actual_amount)
        .bind(variance.variance)
        .bind(variance.variance_percentage)
        .execute(&mut *tx)
        .await?;

        let budget = recalculate_budget(&mut tx, id).await?;
        tx.commit().await?;
        Ok(budget)
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Loads an invoice that may still have its items changed.
async fn editable_invoice(conn: &mut SqliteConnection, id: i64) -> DbResult<Invoice> {
    let invoice: Invoice = fetch_live(conn, "invoices", "Invoice", id).await?;
    ensure_status(
        !matches!(invoice.status, InvoiceStatus::Paid | InvoiceStatus::Cancelled),
        "Invoice",
        &invoice.invoice_number,
        invoice.status,
    )?;
    Ok(invoice)
}

/// Re-derives totals, status and the customer balance after an invoice
/// change.
async fn rederive_invoice(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<Invoice> {
    documents::recalculate_totals(conn, DocumentKind::Invoice, invoice.id).await?;
    let mut current: Invoice = fetch_live(conn, "invoices", "Invoice", invoice.id).await?;

    let status = current.status.reconciled(current.balance_due, current.paid_amount);
    if status != current.status {
        sqlx::query("UPDATE invoices SET status = ?2 WHERE id = ?1")
            .bind(current.id)
            .bind(status)
            .execute(&mut *conn)
            .await?;
        debug!(
            invoice_number = %current.invoice_number,
            from = ?current.status,
            to = ?status,
            "Invoice status re-derived"
        );
        current.status = status;
    }

    refresh_customer_balance(conn, current.customer_id).await?;
    Ok(current)
}

async fn draft_entry(conn: &mut SqliteConnection, id: i64) -> DbResult<JournalEntry> {
    let entry: JournalEntry = fetch_live(conn, "journal_entries", "Journal entry", id).await?;
    ensure_status(
        entry.status == JournalStatus::Draft,
        "Journal entry",
        &entry.entry_number,
        entry.status,
    )?;
    Ok(entry)
}

async fn insert_journal_line(
    conn: &mut SqliteConnection,
    entry_id: i64,
    line: &NewJournalLine,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO journal_entry_lines (journal_entry_id, account_id, description, debit, credit)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(entry_id)
    .bind(line.account_id)
    .bind(&line.description)
    .bind(line.debit)
    .bind(line.credit)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn recalculate_journal(conn: &mut SqliteConnection, entry_id: i64) -> DbResult<JournalTotals> {
    let sides: Vec<(Money, Money)> = sqlx::query_as(
        "SELECT debit, credit FROM journal_entry_lines WHERE journal_entry_id = ?1",
    )
    .bind(entry_id)
    .fetch_all(&mut *conn)
    .await?;
    let totals = JournalTotals::compute(sides);

    sqlx::query(
        "UPDATE journal_entries SET total_debit = ?2, total_credit = ?3, updated_at = ?4 WHERE id = ?1",
    )
    .bind(entry_id)
    .bind(totals.total_debit)
    .bind(totals.total_credit)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    debug!(entry_id, balanced = totals.is_balanced(), "Recalculated journal totals");
    Ok(totals)
}

fn validate_budget_line(line: &NewBudgetLine) -> Result<(), ValidationError> {
    validate_description(&line.description)?;
    validate_non_negative_money("budgeted_amount", line.budgeted_amount)?;
    validate_non_negative_money("actual_amount", line.actual_amount)
}

async fn insert_budget_line(
    conn: &mut SqliteConnection,
    budget_id: i64,
    line: &NewBudgetLine,
) -> DbResult<()> {
    let variance = Variance::budget(line.budgeted_amount, line.actual_amount);
    sqlx::query(
        r#"
        INSERT INTO budget_lines (
            budget_id, account_id, description, budgeted_amount, actual_amount,
            variance, variance_percentage
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(budget_id)
    .bind(line.account_id)
    .bind(line.description.trim())
    .bind(line.budgeted_amount)
    .bind(line.actual_amount)
    .bind(variance.variance)
    .bind(variance.variance_percentage)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Re-derives the budget's totals and aggregate variance from its lines.
async fn recalculate_budget(conn: &mut SqliteConnection, budget_id: i64) -> DbResult<Budget> {
    let (total_budget, total_actual): (Money, Money) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(budgeted_amount), 0), COALESCE(SUM(actual_amount), 0)
        FROM budget_lines
        WHERE budget_id = ?1
        "#,
    )
    .bind(budget_id)
    .fetch_one(&mut *conn)
    .await?;
    let variance = Variance::budget(total_budget, total_actual);

    let budget = sqlx::query_as::<_, Budget>(
        r#"
        UPDATE budgets
        SET total_budget = ?2, total_actual = ?3, variance = ?4,
            variance_percentage = ?5, updated_at = ?6
        WHERE id = ?1
        RETURNING *
        "#,
    )
    .bind(budget_id)
    .bind(total_budget)
    .bind(total_actual)
    .bind(variance.variance)
    .bind(variance.variance_percentage)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;
    Ok(budget)
}

// =============================================================================
// Tests
// =============================================================================
