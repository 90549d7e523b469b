//! # Priced Documents
//!
//! Shared line-item storage and total recomputation for invoices, sales
//! orders, quotes and purchase orders.
//!
//! ```text
//! ┌──────────────────┬───────────────────┬──────────────────────┬─────────────────────┐
//! │ DocumentKind     │ header table      │ item table           │ foreign key         │
//! ├──────────────────┼───────────────────┼──────────────────────┼─────────────────────┤
//! │ Invoice          │ invoices          │ invoice_items        │ invoice_id          │
//! │ SalesOrder       │ sales_orders      │ sales_order_items    │ sales_order_id      │
//! │ Quote            │ quotes            │ quote_items          │ quote_id            │
//! │ PurchaseOrder    │ purchase_orders   │ purchase_order_items │ purchase_order_id   │
//! └──────────────────┴───────────────────┴──────────────────────┴─────────────────────┘
//! ```
//!
//! Every function takes the caller's connection so the item change and the
//! header recomputation commit together.

use chrono::Utc;
use keystone_core::calc::{DocumentCharges, DocumentTotals};
use keystone_core::{LineItem, Money, NewLineItem, Percentage};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};

/// A header table whose totals are derived from line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Invoice,
    SalesOrder,
    Quote,
    PurchaseOrder,
}

impl DocumentKind {
    pub const fn header_table(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "invoices",
            DocumentKind::SalesOrder => "sales_orders",
            DocumentKind::Quote => "quotes",
            DocumentKind::PurchaseOrder => "purchase_orders",
        }
    }

    pub const fn item_table(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "invoice_items",
            DocumentKind::SalesOrder => "sales_order_items",
            DocumentKind::Quote => "quote_items",
            DocumentKind::PurchaseOrder => "purchase_order_items",
        }
    }

    pub const fn foreign_key(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "invoice_id",
            DocumentKind::SalesOrder => "sales_order_id",
            DocumentKind::Quote => "quote_id",
            DocumentKind::PurchaseOrder => "purchase_order_id",
        }
    }

    /// Entity name used in errors.
    pub const fn entity(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "Invoice",
            DocumentKind::SalesOrder => "Sales order",
            DocumentKind::Quote => "Quote",
            DocumentKind::PurchaseOrder => "Purchase order",
        }
    }

    /// Columns of a [`LineItem`] selected from the item table.
    fn item_columns(&self) -> String {
        format!(
            "id, {} AS document_id, product_id, description, quantity, unit_price, \
             discount_bps, discount_amount, line_total",
            self.foreign_key()
        )
    }
}

/// Fails with `NotFound` unless the document exists and is live.
pub async fn ensure_document(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    document_id: i64,
) -> DbResult<()> {
    let sql = format!(
        "SELECT id FROM {} WHERE id = ?1 AND is_deleted = 0",
        kind.header_table()
    );
    let found: Option<i64> = sqlx::query_scalar(&sql)
        .bind(document_id)
        .fetch_optional(&mut *conn)
        .await?;
    found
        .map(|_| ())
        .ok_or_else(|| DbError::not_found(kind.entity(), document_id))
}

/// Validates, prices and inserts one item. Does not recompute totals.
pub async fn insert_line_item(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    document_id: i64,
    item: &NewLineItem,
) -> DbResult<LineItem> {
    let (discount, line_total) = item.priced()?;

    let sql = format!(
        "INSERT INTO {} ({}, product_id, description, quantity, unit_price, \
         discount_bps, discount_amount, line_total) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) RETURNING {}",
        kind.item_table(),
        kind.foreign_key(),
        kind.item_columns()
    );

    let inserted = sqlx::query_as::<_, LineItem>(&sql)
        .bind(document_id)
        .bind(item.product_id)
        .bind(item.description.trim())
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(discount.bps())
        .bind(discount.amount())
        .bind(line_total)
        .fetch_one(&mut *conn)
        .await?;

    debug!(
        document = kind.header_table(),
        document_id,
        line_total = %line_total,
        "Inserted line item"
    );
    Ok(inserted)
}

/// Items of one document in insertion order.
pub async fn list_line_items(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    document_id: i64,
) -> DbResult<Vec<LineItem>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = ?1 ORDER BY id",
        kind.item_columns(),
        kind.item_table(),
        kind.foreign_key()
    );
    Ok(sqlx::query_as::<_, LineItem>(&sql)
        .bind(document_id)
        .fetch_all(&mut *conn)
        .await?)
}

/// Deletes one item of the document. Does not recompute totals.
pub async fn remove_line_item(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    document_id: i64,
    item_id: i64,
) -> DbResult<()> {
    let sql = format!(
        "DELETE FROM {} WHERE id = ?1 AND {} = ?2",
        kind.item_table(),
        kind.foreign_key()
    );
    let result = sqlx::query(&sql)
        .bind(item_id)
        .bind(document_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Line item", item_id));
    }
    Ok(())
}

/// Recomputes and stores the document's subtotal, tax and total from its
/// items and header charges. Invoices also get `balance_due`.
pub async fn recalculate_totals(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    document_id: i64,
) -> DbResult<DocumentTotals> {
    let sql = format!(
        "SELECT tax_rate, shipping, discount FROM {} WHERE id = ?1",
        kind.header_table()
    );
    let (tax_rate, shipping, discount): (Percentage, Money, Money) = sqlx::query_as(&sql)
        .bind(document_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found(kind.entity(), document_id))?;
    let charges = DocumentCharges {
        tax_rate,
        shipping,
        discount,
    };

    let sql = format!(
        "SELECT COALESCE(SUM(line_total), 0) FROM {} WHERE {} = ?1",
        kind.item_table(),
        kind.foreign_key()
    );
    let subtotal: Money = sqlx::query_scalar(&sql)
        .bind(document_id)
        .fetch_one(&mut *conn)
        .await?;

    let totals = DocumentTotals::from_subtotal(subtotal, &charges);

    let balance = match kind {
        DocumentKind::Invoice => ", balance_due = ?4 - paid_amount",
        _ => "",
    };
    let sql = format!(
        "UPDATE {} SET subtotal = ?2, tax_amount = ?3, total = ?4, updated_at = ?5{} WHERE id = ?1",
        kind.header_table(),
        balance
    );
    sqlx::query(&sql)
        .bind(document_id)
        .bind(totals.subtotal)
        .bind(totals.tax_amount)
        .bind(totals.total)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    debug!(
        document = kind.header_table(),
        document_id,
        subtotal = %totals.subtotal,
        total = %totals.total,
        "Recalculated totals"
    );
    Ok(totals)
}

/// Inserts every item, then recomputes once.
pub async fn insert_items_and_recalculate(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    document_id: i64,
    items: &[NewLineItem],
) -> DbResult<DocumentTotals> {
    for item in items {
        insert_line_item(conn, kind, document_id, item).await?;
    }
    recalculate_totals(conn, kind, document_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use keystone_core::NewCustomer;

    fn item(description: &str, quantity: i64, unit_price: i64) -> NewLineItem {
        NewLineItem {
            product_id: None,
            description: description.to_string(),
            quantity,
            unit_price: Money::from_cents(unit_price),
            discount_bps: Percentage::zero(),
            discount_amount: Money::zero(),
        }
    }

    async fn quote_fixture() -> (Database, i64) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customer = db
            .sales()
            .create_customer(NewCustomer {
                customer_code: None,
                name: "Acme".to_string(),
                email: None,
                phone: None,
                address: None,
                credit_limit: Money::zero(),
            })
            .await
            .unwrap();
        let now = Utc::now();
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO quotes (quote_number, customer_id, quote_date, tax_rate, shipping, \
             discount, created_at, updated_at) \
             VALUES ('QUO000001', ?1, '2024-01-01', 850, 500, 1000, ?2, ?2) RETURNING id",
        )
        .bind(customer.id)
        .bind(now)
        .fetch_one(db.pool())
        .await
        .unwrap();
        (db, id)
    }

    #[tokio::test]
    async fn test_recalculate_after_insert_and_remove() {
        let (db, quote_id) = quote_fixture().await;
        let mut tx = db.pool().begin().await.unwrap();

        let totals = insert_items_and_recalculate(
            &mut tx,
            DocumentKind::Quote,
            quote_id,
            &[item("Design", 1, 6000), item("Build", 2, 2000)],
        )
        .await
        .unwrap();
        assert_eq!(totals.subtotal.cents(), 10_000);
        assert_eq!(totals.tax_amount.cents(), 850);
        assert_eq!(totals.total.cents(), 10_350);

        let items = list_line_items(&mut tx, DocumentKind::Quote, quote_id).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].document_id, quote_id);

        remove_line_item(&mut tx, DocumentKind::Quote, quote_id, items[0].id)
            .await
            .unwrap();
        let totals = recalculate_totals(&mut tx, DocumentKind::Quote, quote_id).await.unwrap();
        assert_eq!(totals.subtotal.cents(), 4000);
        assert_eq!(totals.tax_amount.cents(), 340);
        assert_eq!(totals.total.cents(), 3840);
    }

    #[tokio::test]
    async fn test_remove_item_of_other_document_is_not_found() {
        let (db, quote_id) = quote_fixture().await;
        let mut tx = db.pool().begin().await.unwrap();
        let inserted = insert_line_item(&mut tx, DocumentKind::Quote, quote_id, &item("x", 1, 100))
            .await
            .unwrap();
        let err = remove_line_item(&mut tx, DocumentKind::Quote, quote_id + 1, inserted.id)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_both_discounts_rejected_before_insert() {
        let (db, quote_id) = quote_fixture().await;
        let mut tx = db.pool().begin().await.unwrap();
        let mut bad = item("x", 1, 100);
        bad.discount_bps = Percentage::from_whole(5);
        bad.discount_amount = Money::from_cents(10);
        assert!(matches!(
            insert_line_item(&mut tx, DocumentKind::Quote, quote_id, &bad).await,
            Err(DbError::Domain(_))
        ));
    }
}
