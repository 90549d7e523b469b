//! # Code Allocator
//!
//! Hands out sequential business codes from counter rows.
//!
//! ## Allocation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN (caller's transaction)                                           │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  code_sequences row for series?                                        │
//! │     ├── no  → seed last_value = max suffix in entity table             │
//! │     │         (soft-deleted rows included)                              │
//! │     ▼                                                                   │
//! │  UPDATE code_sequences SET last_value = last_value + 1                 │
//! │     RETURNING last_value                    ──► "INV-000042"            │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  INSERT entity row with the code                                        │
//! │     │                                                                   │
//! │  COMMIT  (rollback also rolls back the counter)                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The counter only moves forward, so a soft-deleted record's code is never
//! issued again. Explicit codes raise the counter past themselves.

use keystone_core::{CodeSeries, CoreError};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};

/// Table and column holding the codes of `series`.
pub(crate) const fn code_column(series: CodeSeries) -> (&'static str, &'static str) {
    match series {
        CodeSeries::Invoice => ("invoices", "invoice_number"),
        CodeSeries::Payment => ("payments", "payment_number"),
        CodeSeries::Expense => ("expenses", "expense_number"),
        CodeSeries::JournalEntry => ("journal_entries", "entry_number"),
        CodeSeries::Employee => ("employees", "employee_number"),
        CodeSeries::Warehouse => ("warehouses", "code"),
        CodeSeries::StockAdjustment => ("stock_adjustments", "adjustment_number"),
        CodeSeries::Supplier => ("suppliers", "supplier_code"),
        CodeSeries::PurchaseRequisition => ("purchase_requisitions", "requisition_number"),
        CodeSeries::PurchaseOrder => ("purchase_orders", "po_number"),
        CodeSeries::GoodsReceipt => ("goods_receipts", "receipt_number"),
        CodeSeries::Customer => ("customers", "customer_code"),
        CodeSeries::SalesOrder => ("sales_orders", "order_number"),
        CodeSeries::Quote => ("quotes", "quote_number"),
        CodeSeries::Project => ("projects", "project_code"),
    }
}

/// Allocates the next code of `series`.
pub async fn next_code(conn: &mut SqliteConnection, series: CodeSeries) -> DbResult<String> {
    ensure_counter(conn, series).await?;

    let value: i64 = sqlx::query_scalar(
        "UPDATE code_sequences SET last_value = last_value + 1 WHERE series = ?1 RETURNING last_value",
    )
    .bind(series.as_str())
    .fetch_one(&mut *conn)
    .await?;

    let code = series.format(value);
    debug!(series = series.as_str(), code = %code, "Allocated code");
    Ok(code)
}

/// Accepts a caller-supplied code for `series`.
///
/// The code must be in the series' canonical format. The counter is raised
/// to its number so generated codes never run into it. Uniqueness is left to
/// the table's UNIQUE constraint.
pub async fn reserve_explicit(
    conn: &mut SqliteConnection,
    series: CodeSeries,
    code: &str,
) -> DbResult<String> {
    let code = code.trim();
    let number = series.parse(code).ok_or_else(|| {
        DbError::Domain(CoreError::CodeMismatch {
            code: code.to_string(),
            series: series.prefix().to_string(),
        })
    })?;

    ensure_counter(conn, series).await?;

    sqlx::query("UPDATE code_sequences SET last_value = MAX(last_value, ?2) WHERE series = ?1")
        .bind(series.as_str())
        .bind(number)
        .execute(&mut *conn)
        .await?;

    debug!(series = series.as_str(), code = %code, "Reserved explicit code");
    Ok(code.to_string())
}

/// Uses `explicit` when given, otherwise allocates the next code.
pub async fn assign_code(
    conn: &mut SqliteConnection,
    series: CodeSeries,
    explicit: Option<&str>,
) -> DbResult<String> {
    match explicit.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => reserve_explicit(conn, series, code).await,
        None => next_code(conn, series).await,
    }
}

/// Last value issued for `series`, zero before first use.
pub async fn last_value(conn: &mut SqliteConnection, series: CodeSeries) -> DbResult<i64> {
    let value: Option<i64> =
        sqlx::query_scalar("SELECT last_value FROM code_sequences WHERE series = ?1")
            .bind(series.as_str())
            .fetch_optional(&mut *conn)
            .await?;
    Ok(value.unwrap_or(0))
}

/// Creates the counter row on first use, seeded from existing codes.
async fn ensure_counter(conn: &mut SqliteConnection, series: CodeSeries) -> DbResult<()> {
    let exists: Option<i64> =
        sqlx::query_scalar("SELECT last_value FROM code_sequences WHERE series = ?1")
            .bind(series.as_str())
            .fetch_optional(&mut *conn)
            .await?;
    if exists.is_some() {
        return Ok(());
    }

    let seed = max_existing(conn, series).await?;
    sqlx::query("INSERT OR IGNORE INTO code_sequences (series, last_value) VALUES (?1, ?2)")
        .bind(series.as_str())
        .bind(seed)
        .execute(&mut *conn)
        .await?;

    debug!(series = series.as_str(), seed, "Seeded code counter");
    Ok(())
}

/// Highest number among stored codes of `series`, deleted rows included.
async fn max_existing(conn: &mut SqliteConnection, series: CodeSeries) -> DbResult<i64> {
    let (table, column) = code_column(series);
    let sql = format!("SELECT {column} FROM {table} WHERE {column} LIKE ?1");
    let codes: Vec<String> = sqlx::query_scalar(&sql)
        .bind(format!("{}%", series.prefix()))
        .fetch_all(&mut *conn)
        .await?;

    Ok(codes
        .iter()
        .filter_map(|code| series.parse(code))
        .max()
        .unwrap_or(0))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::Utc;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_first_code_is_one() {
        let db = db().await;
        let mut tx = db.pool().begin().await.unwrap();
        assert_eq!(next_code(&mut tx, CodeSeries::Invoice).await.unwrap(), "INV-000001");
        assert_eq!(next_code(&mut tx, CodeSeries::Invoice).await.unwrap(), "INV-000002");
        assert_eq!(next_code(&mut tx, CodeSeries::Warehouse).await.unwrap(), "WH001");
    }

    #[tokio::test]
    async fn test_series_are_independent() {
        let db = db().await;
        let mut tx = db.pool().begin().await.unwrap();
        for series in CodeSeries::ALL {
            assert_eq!(next_code(&mut tx, series).await.unwrap(), series.format(1));
        }
    }

    #[tokio::test]
    async fn test_every_series_is_gap_free() {
        let db = db().await;
        let mut tx = db.pool().begin().await.unwrap();
        for series in CodeSeries::ALL {
            for n in 1..=25 {
                assert_eq!(next_code(&mut tx, series).await.unwrap(), series.format(n));
            }
            assert_eq!(last_value(&mut tx, series).await.unwrap(), 25);
        }
    }

    #[tokio::test]
    async fn test_counter_seeded_from_existing_rows() {
        let db = db().await;
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO customers (customer_code, name, created_at, updated_at, is_deleted) \
             VALUES ('CUST000041', 'Imported', ?1, ?1, 1), ('legacy-7', 'Other', ?1, ?1, 0)",
        )
        .bind(now)
        .execute(db.pool())
        .await
        .unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        assert_eq!(next_code(&mut tx, CodeSeries::Customer).await.unwrap(), "CUST000042");
    }

    #[tokio::test]
    async fn test_explicit_code_raises_counter() {
        let db = db().await;
        let mut tx = db.pool().begin().await.unwrap();
        next_code(&mut tx, CodeSeries::Quote).await.unwrap();
        reserve_explicit(&mut tx, CodeSeries::Quote, "QUO000010").await.unwrap();
        assert_eq!(last_value(&mut tx, CodeSeries::Quote).await.unwrap(), 10);
        assert_eq!(next_code(&mut tx, CodeSeries::Quote).await.unwrap(), "QUO000011");

        // A lower explicit code leaves the counter alone.
        reserve_explicit(&mut tx, CodeSeries::Quote, "QUO000005").await.unwrap();
        assert_eq!(last_value(&mut tx, CodeSeries::Quote).await.unwrap(), 11);
    }

    #[tokio::test]
    async fn test_explicit_code_must_match_series() {
        let db = db().await;
        let mut tx = db.pool().begin().await.unwrap();
        let err = reserve_explicit(&mut tx, CodeSeries::Invoice, "PO000001").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::CodeMismatch { .. })));
    }

    #[tokio::test]
    async fn test_rollback_releases_allocation() {
        let db = db().await;
        {
            let mut tx = db.pool().begin().await.unwrap();
            next_code(&mut tx, CodeSeries::Project).await.unwrap();
            tx.rollback().await.unwrap();
        }
        let mut tx = db.pool().begin().await.unwrap();
        assert_eq!(next_code(&mut tx, CodeSeries::Project).await.unwrap(), "PROJ000001");
    }
}
