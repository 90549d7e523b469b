//! # Repository Module
//!
//! Database repositories for Keystone ERP, one per business module.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  HTTP handler                                                           │
//! │       │  db.finance().create_invoice(new)                               │
//! │       ▼                                                                 │
//! │  FinanceRepository                                                      │
//! │  ├── validate input (keystone-core)                                    │
//! │  ├── BEGIN                                                              │
//! │  ├── codes::next_code(series)      ← counter row                       │
//! │  ├── INSERT header, INSERT items                                        │
//! │  ├── documents::recalculate_totals ← keystone-core formulas            │
//! │  └── COMMIT                         (drop without commit = rollback)   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`UserRepository`](users::UserRepository) - Accounts and logins
//! - [`FinanceRepository`](finance::FinanceRepository) - Invoices, payments, expenses, journals, budgets
//! - [`HrRepository`](hr::HrRepository) - Departments, employees, attendance, leave, payroll
//! - [`InventoryRepository`](inventory::InventoryRepository) - Categories, products, warehouses, adjustments
//! - [`ProcurementRepository`](procurement::ProcurementRepository) - Suppliers, requisitions, POs, receipts
//! - [`SalesRepository`](sales::SalesRepository) - Customers, orders, quotes
//! - [`ProjectRepository`](projects::ProjectRepository) - Projects, tasks, time, expenses
//! - [`RecordRepository`](records::RecordRepository) - Soft delete, restore, audit trail

pub mod codes;
pub mod documents;
pub mod finance;
pub mod hr;
pub mod inventory;
pub mod procurement;
pub mod projects;
pub mod records;
pub mod sales;
pub mod users;

use keystone_core::{CoreError, Page, PageRequest};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, SqliteConnection, SqlitePool};

use crate::error::{DbError, DbResult};

// =============================================================================
// Shared Query Helpers
// =============================================================================

/// Fetches one page of live rows from `table`, newest first.
pub(crate) async fn fetch_page<T>(
    pool: &SqlitePool,
    table: &str,
    request: PageRequest,
) -> DbResult<Page<T>>
where
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    let count_sql = format!("SELECT COUNT(*) FROM {} WHERE is_deleted = 0", table);
    let total: i64 = sqlx::query_scalar(&count_sql).fetch_one(pool).await?;

    let select_sql = format!(
        "SELECT * FROM {} WHERE is_deleted = 0 ORDER BY id DESC LIMIT ?1 OFFSET ?2",
        table
    );
    let items = sqlx::query_as::<_, T>(&select_sql)
        .bind(request.per_page)
        .bind(request.offset())
        .fetch_all(pool)
        .await?;

    Ok(Page {
        items,
        page: request.page,
        per_page: request.per_page,
        total,
    })
}

/// Fetches one live row by id, or `NotFound`.
pub(crate) async fn fetch_live<T>(
    conn: &mut SqliteConnection,
    table: &str,
    entity: &str,
    id: i64,
) -> DbResult<T>
where
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    let sql = format!("SELECT * FROM {} WHERE id = ?1 AND is_deleted = 0", table);
    sqlx::query_as::<_, T>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DbError::not_found(entity, id))
}

/// Same as [`fetch_live`] but borrows a pooled connection.
pub(crate) async fn fetch_live_from_pool<T>(
    pool: &SqlitePool,
    table: &str,
    entity: &str,
    id: i64,
) -> DbResult<T>
where
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    let mut conn = pool.acquire().await?;
    fetch_live(&mut conn, table, entity, id).await
}

/// Fails with `InvalidStatus` unless `allowed` holds.
pub(crate) fn ensure_status(
    allowed: bool,
    entity: &str,
    number: &str,
    status: impl std::fmt::Debug,
) -> DbResult<()> {
    if allowed {
        Ok(())
    } else {
        Err(DbError::Domain(CoreError::InvalidStatus {
            entity: entity.to_string(),
            number: number.to_string(),
            status: snake_case(&format!("{:?}", status)),
        }))
    }
}

/// `PartiallyReceived` → `partially_received`, matching the stored values.
fn snake_case(variant: &str) -> String {
    let mut out = String::with_capacity(variant.len() + 4);
    for (i, ch) in variant.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum Sample {
        PartiallyReceived,
    }

    #[test]
    fn test_ensure_status_names_stored_value() {
        let err = ensure_status(false, "Purchase order", "PO000001", Sample::PartiallyReceived)
            .unwrap_err();
        match err {
            DbError::Domain(CoreError::InvalidStatus { status, .. }) => {
                assert_eq!(status, "partially_received")
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(ensure_status(true, "Invoice", "INV-000001", Sample::PartiallyReceived).is_ok());
    }
}
