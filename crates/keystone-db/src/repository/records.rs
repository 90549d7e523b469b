//! # Record Repository
//!
//! Soft delete and restore for every top-level entity, with an audit row
//! written in the same transaction.
//!
//! ```text
//! DELETE /api/records/invoices/7
//!     │
//!     ▼
//! ┌──────────────────────── one transaction ────────────────────────┐
//! │ UPDATE invoices SET is_deleted = 1 WHERE id = 7 AND is_deleted=0│
//! │ INSERT INTO audit_logs (user, 'delete', 'invoices', 7)          │
//! │ refresh customer balance (invoices only)                        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Deleted rows keep their code. The code counter never moves back, so a
//! deleted `INV-000007` is never handed out again.

use chrono::Utc;
use keystone_core::AuditLog;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use super::sales::refresh_customer_balance;
use crate::error::{DbError, DbResult};

/// Entities that can be soft-deleted through the records API.
///
/// Child rows (line items, tasks, time entries) are removed through their
/// parent so the parent's totals are re-derived. Payments are not listed:
/// they are ledger history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordTable {
    Users,
    Departments,
    JobPositions,
    LeaveTypes,
    Employees,
    Attendance,
    LeaveRequests,
    Payroll,
    Customers,
    Quotes,
    SalesOrders,
    Accounts,
    Invoices,
    Expenses,
    JournalEntries,
    Budgets,
    ProductCategories,
    Products,
    Warehouses,
    StockAdjustments,
    Suppliers,
    PurchaseRequisitions,
    PurchaseOrders,
    GoodsReceipts,
    Projects,
}

impl RecordTable {
    pub const ALL: [RecordTable; 25] = [
        RecordTable::Users,
        RecordTable::Departments,
        RecordTable::JobPositions,
        RecordTable::LeaveTypes,
        RecordTable::Employees,
        RecordTable::Attendance,
        RecordTable::LeaveRequests,
        RecordTable::Payroll,
        RecordTable::Customers,
        RecordTable::Quotes,
        RecordTable::SalesOrders,
        RecordTable::Accounts,
        RecordTable::Invoices,
        RecordTable::Expenses,
        RecordTable::JournalEntries,
        RecordTable::Budgets,
        RecordTable::ProductCategories,
        RecordTable::Products,
        RecordTable::Warehouses,
        RecordTable::StockAdjustments,
        RecordTable::Suppliers,
        RecordTable::PurchaseRequisitions,
        RecordTable::PurchaseOrders,
        RecordTable::GoodsReceipts,
        RecordTable::Projects,
    ];

    /// SQL table name; also the key used in `/api/records/:entity/:id`.
    pub const fn table_name(&self) -> &'static str {
        match self {
            RecordTable::Users => "users",
            RecordTable::Departments => "departments",
            RecordTable::JobPositions => "job_positions",
            RecordTable::LeaveTypes => "leave_types",
            RecordTable::Employees => "employees",
            RecordTable::Attendance => "attendance",
            RecordTable::LeaveRequests => "leave_requests",
            RecordTable::Payroll => "payroll",
            RecordTable::Customers => "customers",
            RecordTable::Quotes => "quotes",
            RecordTable::SalesOrders => "sales_orders",
            RecordTable::Accounts => "accounts",
            RecordTable::Invoices => "invoices",
            RecordTable::Expenses => "expenses",
            RecordTable::JournalEntries => "journal_entries",
            RecordTable::Budgets => "budgets",
            RecordTable::ProductCategories => "product_categories",
            RecordTable::Products => "products",
            RecordTable::Warehouses => "warehouses",
            RecordTable::StockAdjustments => "stock_adjustments",
            RecordTable::Suppliers => "suppliers",
            RecordTable::PurchaseRequisitions => "purchase_requisitions",
            RecordTable::PurchaseOrders => "purchase_orders",
            RecordTable::GoodsReceipts => "goods_receipts",
            RecordTable::Projects => "projects",
        }
    }

    pub fn from_key(key: &str) -> Option<RecordTable> {
        RecordTable::ALL
            .into_iter()
            .find(|t| t.table_name() == key)
    }
}

/// Audit action names.
pub const ACTION_DELETE: &str = "delete";
pub const ACTION_RESTORE: &str = "restore";

/// Repository for cross-entity record operations.
#[derive(Debug, Clone)]
pub struct RecordRepository {
    pool: SqlitePool,
}

impl RecordRepository {
    /// Creates a new RecordRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RecordRepository { pool }
    }

    /// Marks a live row deleted.
    pub async fn soft_delete(
        &self,
        table: RecordTable,
        id: i64,
        user_id: Option<i64>,
    ) -> DbResult<()> {
        self.flip(table, id, user_id, true).await
    }

    /// Brings a deleted row back.
    pub async fn restore(&self, table: RecordTable, id: i64, user_id: Option<i64>) -> DbResult<()> {
        self.flip(table, id, user_id, false).await
    }

    /// Audit rows for one record, oldest first.
    pub async fn audit_trail(&self, table: RecordTable, id: i64) -> DbResult<Vec<AuditLog>> {
        let rows = sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT * FROM audit_logs
            WHERE table_name = ?1 AND record_id = ?2
            ORDER BY id
            "#,
        )
        .bind(table.table_name())
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn flip(
        &self,
        table: RecordTable,
        id: i64,
        user_id: Option<i64>,
        delete: bool,
    ) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE {} SET is_deleted = ?2, updated_at = ?3 WHERE id = ?1 AND is_deleted = ?4",
            table.table_name()
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(delete)
            .bind(Utc::now())
            .bind(!delete)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(table.table_name(), id));
        }

        let action = if delete { ACTION_DELETE } else { ACTION_RESTORE };
        write_audit(&mut tx, user_id, action, table.table_name(), id).await?;

        if table == RecordTable::Invoices {
            let customer_id: i64 =
                sqlx::query_scalar("SELECT customer_id FROM invoices WHERE id = ?1")
                    .bind(id)
                    .fetch_one(&mut *tx)
                    .await?;
            refresh_customer_balance(&mut tx, customer_id).await?;
        }

        tx.commit().await?;
        info!(table = table.table_name(), id, action, "Record updated");
        Ok(())
    }
}

pub(crate) async fn write_audit(
    conn: &mut SqliteConnection,
    user_id: Option<i64>,
    action: &str,
    table_name: &str,
    record_id: i64,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (user_id, action, table_name, record_id, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(user_id)
    .bind(action)
    .bind(table_name)
    .bind(record_id)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::NaiveDate;
    use keystone_core::{Money, NewCustomer, NewInvoice, NewLineItem, PageRequest, Percentage};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn customer(name: &str) -> NewCustomer {
        NewCustomer {
            customer_code: None,
            name: name.to_string(),
            email: None,
            phone: None,
            address: None,
            credit_limit: Money::zero(),
        }
    }

    #[test]
    fn test_table_keys() {
        assert_eq!(RecordTable::from_key("invoices"), Some(RecordTable::Invoices));
        assert_eq!(
            RecordTable::from_key("product_categories"),
            Some(RecordTable::ProductCategories)
        );
        assert_eq!(RecordTable::from_key("invoice_items"), None);
        assert_eq!(RecordTable::from_key("payments"), None);
        for table in RecordTable::ALL {
            assert_eq!(RecordTable::from_key(table.table_name()), Some(table));
        }
    }

    #[tokio::test]
    async fn test_sequential_codes_are_gap_free() {
        let db = db().await;
        let sales = db.sales();
        for n in 1..=12 {
            let c = sales.create_customer(customer(&format!("Customer {n}"))).await.unwrap();
            assert_eq!(c.customer_code, format!("CUST{n:06}"));
        }
    }

    #[tokio::test]
    async fn test_page_far_past_the_end_is_empty() {
        let db = db().await;
        let sales = db.sales();
        sales.create_customer(customer("Acme")).await.unwrap();

        let page = sales
            .list_customers(PageRequest::new(i64::MAX, 20))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn test_deleted_row_hidden_and_code_reserved() {
        let db = db().await;
        let sales = db.sales();
        let records = db.records();
        let first = sales.create_customer(customer("Acme")).await.unwrap();
        let second = sales.create_customer(customer("Globex")).await.unwrap();

        records
            .soft_delete(RecordTable::Customers, second.id, None)
            .await
            .unwrap();
        let page = sales.list_customers(PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, first.id);
        assert!(matches!(
            sales.get_customer(second.id).await.unwrap_err(),
            DbError::NotFound { .. }
        ));

        let third = sales.create_customer(customer("Initech")).await.unwrap();
        assert_eq!(third.customer_code, "CUST000003");

        let err = records
            .soft_delete(RecordTable::Customers, second.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        records
            .restore(RecordTable::Customers, second.id, None)
            .await
            .unwrap();
        assert_eq!(sales.get_customer(second.id).await.unwrap().customer_code, "CUST000002");

        let trail = records
            .audit_trail(RecordTable::Customers, second.id)
            .await
            .unwrap();
        let actions: Vec<_> = trail.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(actions, vec![ACTION_DELETE, ACTION_RESTORE]);
    }

    #[tokio::test]
    async fn test_deleting_invoice_refreshes_customer_balance() {
        let db = db().await;
        let c = db.sales().create_customer(customer("Acme")).await.unwrap();
        let invoice = db
            .finance()
            .create_invoice(NewInvoice {
                invoice_number: None,
                customer_id: c.id,
                sales_order_id: None,
                invoice_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                due_date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
                tax_rate: Percentage::zero(),
                shipping: Money::zero(),
                discount: Money::zero(),
                notes: None,
                items: vec![NewLineItem {
                    product_id: None,
                    description: "Consulting".to_string(),
                    quantity: 1,
                    unit_price: Money::from_cents(5000),
                    discount_bps: Percentage::zero(),
                    discount_amount: Money::zero(),
                }],
            })
            .await
            .unwrap();
        assert_eq!(db.sales().get_customer(c.id).await.unwrap().current_balance.cents(), 5000);

        db.records()
            .soft_delete(RecordTable::Invoices, invoice.id, None)
            .await
            .unwrap();
        assert!(db.sales().get_customer(c.id).await.unwrap().current_balance.is_zero());
    }
}
