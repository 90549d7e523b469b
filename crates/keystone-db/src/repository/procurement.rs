//! # Procurement Repository
//!
//! Suppliers, purchase requisitions, purchase orders and goods receipts.
//!
//! ## Receiving Goods
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_goods_receipt(PO, items)                  one transaction       │
//! │     │                                                                   │
//! │     ├── GR000001 allocated                                              │
//! │     ├── per item:                                                       │
//! │     │     received_quantity + qty <= ordered quantity ?                 │
//! │     │     purchase_order_items.received_quantity += qty                 │
//! │     │     products.quantity_on_hand += qty   (when linked to a product) │
//! │     └── PO status from Σ received vs Σ ordered                          │
//! │            0 → sent,  partial → partially_received,  all → received     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use keystone_core::calc::estimated_line_total;
use keystone_core::validation::{
    validate_charges, validate_description, validate_email, validate_name,
    validate_non_negative_money, validate_quantity,
};
use keystone_core::{
    CodeSeries, GoodsReceipt, GoodsReceiptItem, LineItem, Money, NewGoodsReceipt, NewLineItem,
    NewPurchaseOrder, NewPurchaseRequisition, NewRequisitionItem, NewSupplier, Page,
    PageRequest, PurchaseOrder, PurchaseOrderLine, PurchaseOrderStatus, PurchaseRequisition,
    RequisitionItem, RequisitionStatus, Supplier, UpdateSupplier, ValidationError,
};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::documents::{self, DocumentKind};
use super::{codes, ensure_status, fetch_live, fetch_live_from_pool, fetch_page};
use crate::error::{DbError, DbResult, DuplicateContext};

fn validate_supplier_fields(
    name: &str,
    email: Option<&str>,
    payment_terms_days: i64,
) -> Result<(), ValidationError> {
    validate_name("name", name, 200)?;
    if let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) {
        validate_email(email)?;
    }
    if !(0..=365).contains(&payment_terms_days) {
        return Err(ValidationError::OutOfRange {
            field: "payment_terms_days".to_string(),
            min: 0,
            max: 365,
        });
    }
    Ok(())
}

fn validate_requisition_item(item: &NewRequisitionItem) -> Result<(), ValidationError> {
    validate_description(&item.description)?;
    validate_quantity(item.quantity)?;
    validate_non_negative_money("estimated_unit_price", item.estimated_unit_price)
}

/// Repository for procurement database operations.
#[derive(Debug, Clone)]
pub struct ProcurementRepository {
    pool: SqlitePool,
}

impl ProcurementRepository {
    /// Creates a new ProcurementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProcurementRepository { pool }
    }

    // =========================================================================
    // Suppliers
    // =========================================================================

    pub async fn create_supplier(&self, new: NewSupplier) -> DbResult<Supplier> {
        validate_supplier_fields(&new.name, new.email.as_deref(), new.payment_terms_days)?;

        let mut tx = self.pool.begin().await?;
        let code =
            codes::assign_code(&mut tx, CodeSeries::Supplier, new.supplier_code.as_deref()).await?;

        let supplier = sqlx::query_as::<_, Supplier>(
            r#"
            INSERT INTO suppliers (
                supplier_code, name, contact_name, email, phone, address,
                payment_terms_days, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            RETURNING *
            "#,
        )
        .bind(&code)
        .bind(new.name.trim())
        .bind(&new.contact_name)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(&new.address)
        .bind(new.payment_terms_days)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .duplicate_value(&code)?;

        tx.commit().await?;
        info!(supplier_code = %supplier.supplier_code, "Supplier created");
        Ok(supplier)
    }

    pub async fn get_supplier(&self, id: i64) -> DbResult<Supplier> {
        fetch_live_from_pool(&self.pool, "suppliers", "Supplier", id).await
    }

    pub async fn list_suppliers(&self, page: PageRequest) -> DbResult<Page<Supplier>> {
        fetch_page(&self.pool, "suppliers", page).await
    }

    pub async fn update_supplier(&self, id: i64, update: UpdateSupplier) -> DbResult<Supplier> {
        let mut tx = self.pool.begin().await?;
        let current: Supplier = fetch_live(&mut tx, "suppliers", "Supplier", id).await?;

        let name = update.name.unwrap_or(current.name);
        let email = update.email.or(current.email);
        let terms = update.payment_terms_days.unwrap_or(current.payment_terms_days);
        validate_supplier_fields(&name, email.as_deref(), terms)?;

        let supplier = sqlx::query_as::<_, Supplier>(
            r#"
            UPDATE suppliers
            SET name = ?2, contact_name = ?3, email = ?4, phone = ?5, address = ?6,
                payment_terms_days = ?7, is_active = ?8, updated_at = ?9
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name.trim())
        .bind(update.contact_name.or(current.contact_name))
        .bind(email)
        .bind(update.phone.or(current.phone))
        .bind(update.address.or(current.address))
        .bind(terms)
        .bind(update.is_active.unwrap_or(current.is_active))
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(supplier)
    }

    // =========================================================================
    // Purchase Requisitions
    // =========================================================================

    /// Creates a draft requisition with its items and estimated total.
    pub async fn create_requisition(
        &self,
        new: NewPurchaseRequisition,
    ) -> DbResult<PurchaseRequisition> {
        if let Some(required) = new.required_date {
            if required < new.request_date {
                return Err(ValidationError::InvalidRange {
                    field: "required_date".to_string(),
                }
                .into());
            }
        }
        for item in &new.items {
            validate_requisition_item(item)?;
        }

        let mut tx = self.pool.begin().await?;
        let number = codes::assign_code(
            &mut tx,
            CodeSeries::PurchaseRequisition,
            new.requisition_number.as_deref(),
        )
        .await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO purchase_requisitions (
                requisition_number, requested_by, department_id, request_date,
                required_date, status, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            RETURNING id
            "#,
        )
        .bind(&number)
        .bind(new.requested_by)
        .bind(new.department_id)
        .bind(new.request_date)
        .bind(new.required_date)
        .bind(RequisitionStatus::Draft)
        .bind(&new.notes)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .duplicate_value(&number)?;

        for item in &new.items {
            insert_requisition_item(&mut tx, id, item).await?;
        }
        let requisition = recalculate_requisition(&mut tx, id).await?;
        tx.commit().await?;

        info!(
            requisition_number = %requisition.requisition_number,
            total = %requisition.total_estimated,
            "Purchase requisition created"
        );
        Ok(requisition)
    }

    pub async fn get_requisition(&self, id: i64) -> DbResult<PurchaseRequisition> {
        fetch_live_from_pool(&self.pool, "purchase_requisitions", "Purchase requisition", id).await
    }

    pub async fn list_requisitions(
        &self,
        page: PageRequest,
    ) -> DbResult<Page<PurchaseRequisition>> {
        fetch_page(&self.pool, "purchase_requisitions", page).await
    }

    pub async fn requisition_items(&self, id: i64) -> DbResult<Vec<RequisitionItem>> {
        self.get_requisition(id).await?;
        let items = sqlx::query_as::<_, RequisitionItem>(
            "SELECT * FROM requisition_items WHERE requisition_id = ?1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    pub async fn add_requisition_item(
        &self,
        id: i64,
        item: NewRequisitionItem,
    ) -> DbResult<PurchaseRequisition> {
        validate_requisition_item(&item)?;
        let mut tx = self.pool.begin().await?;
        draft_requisition(&mut tx, id).await?;
        insert_requisition_item(&mut tx, id, &item).await?;
        let requisition = recalculate_requisition(&mut tx, id).await?;
        tx.commit().await?;
        Ok(requisition)
    }

    pub async fn remove_requisition_item(
        &self,
        id: i64,
        item_id: i64,
    ) -> DbResult<PurchaseRequisition> {
        let mut tx = self.pool.begin().await?;
        draft_requisition(&mut tx, id).await?;
        let result =
            sqlx::query("DELETE FROM requisition_items WHERE id = ?1 AND requisition_id = ?2")
                .bind(item_id)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Requisition item", item_id));
        }
        let requisition = recalculate_requisition(&mut tx, id).await?;
        tx.commit().await?;
        Ok(requisition)
    }

    /// Moves a requisition through draft → submitted → approved / rejected.
    pub async fn set_requisition_status(
        &self,
        id: i64,
        status: RequisitionStatus,
    ) -> DbResult<PurchaseRequisition> {
        let mut tx = self.pool.begin().await?;
        let current: PurchaseRequisition =
            fetch_live(&mut tx, "purchase_requisitions", "Purchase requisition", id).await?;
        let allowed = matches!(
            (current.status, status),
            (RequisitionStatus::Draft, RequisitionStatus::Submitted)
                | (RequisitionStatus::Submitted, RequisitionStatus::Approved)
                | (RequisitionStatus::Submitted, RequisitionStatus::Rejected)
        );
        ensure_status(
            allowed,
            "Purchase requisition",
            &current.requisition_number,
            current.status,
        )?;

        let requisition = sqlx::query_as::<_, PurchaseRequisition>(
            "UPDATE purchase_requisitions SET status = ?2, updated_at = ?3 WHERE id = ?1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(requisition)
    }

    // =========================================================================
    // Purchase Orders
    // =========================================================================

    /// Creates a draft purchase order. A linked requisition is marked ordered.
    pub async fn create_purchase_order(&self, new: NewPurchaseOrder) -> DbResult<PurchaseOrder> {
        validate_charges(new.tax_rate, new.shipping, new.discount)?;
        for item in &new.items {
            item.validate()?;
        }

        let mut tx = self.pool.begin().await?;
        let number =
            codes::assign_code(&mut tx, CodeSeries::PurchaseOrder, new.po_number.as_deref())
                .await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO purchase_orders (
                po_number, supplier_id, requisition_id, order_date, expected_date,
                status, tax_rate, shipping, discount, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
            RETURNING id
            "#,
        )
        .bind(&number)
        .bind(new.supplier_id)
        .bind(new.requisition_id)
        .bind(new.order_date)
        .bind(new.expected_date)
        .bind(PurchaseOrderStatus::Draft)
        .bind(new.tax_rate)
        .bind(new.shipping)
        .bind(new.discount)
        .bind(&new.notes)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .duplicate_value(&number)?;

        documents::insert_items_and_recalculate(&mut tx, DocumentKind::PurchaseOrder, id, &new.items)
            .await?;

        if let Some(requisition_id) = new.requisition_id {
            sqlx::query(
                "UPDATE purchase_requisitions SET status = ?2, updated_at = ?3 WHERE id = ?1",
            )
            .bind(requisition_id)
            .bind(RequisitionStatus::Ordered)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        }

        let order: PurchaseOrder =
            fetch_live(&mut tx, "purchase_orders", "Purchase order", id).await?;
        tx.commit().await?;

        info!(po_number = %order.po_number, total = %order.total, "Purchase order created");
        Ok(order)
    }

    pub async fn get_purchase_order(&self, id: i64) -> DbResult<PurchaseOrder> {
        fetch_live_from_pool(&self.pool, "purchase_orders", "Purchase order", id).await
    }

    pub async fn list_purchase_orders(&self, page: PageRequest) -> DbResult<Page<PurchaseOrder>> {
        fetch_page(&self.pool, "purchase_orders", page).await
    }

    /// Lines with their received quantities.
    pub async fn purchase_order_lines(&self, id: i64) -> DbResult<Vec<PurchaseOrderLine>> {
        let mut conn = self.pool.acquire().await?;
        documents::ensure_document(&mut conn, DocumentKind::PurchaseOrder, id).await?;
        list_order_lines(&mut conn, id).await
    }

    pub async fn add_purchase_order_item(
        &self,
        id: i64,
        item: NewLineItem,
    ) -> DbResult<PurchaseOrder> {
        let mut tx = self.pool.begin().await?;
        draft_order(&mut tx, id).await?;
        documents::insert_line_item(&mut tx, DocumentKind::PurchaseOrder, id, &item).await?;
        documents::recalculate_totals(&mut tx, DocumentKind::PurchaseOrder, id).await?;
        let order: PurchaseOrder =
            fetch_live(&mut tx, "purchase_orders", "Purchase order", id).await?;
        tx.commit().await?;
        Ok(order)
    }

    pub async fn remove_purchase_order_item(
        &self,
        id: i64,
        item_id: i64,
    ) -> DbResult<PurchaseOrder> {
        let mut tx = self.pool.begin().await?;
        draft_order(&mut tx, id).await?;
        documents::remove_line_item(&mut tx, DocumentKind::PurchaseOrder, id, item_id).await?;
        documents::recalculate_totals(&mut tx, DocumentKind::PurchaseOrder, id).await?;
        let order: PurchaseOrder =
            fetch_live(&mut tx, "purchase_orders", "Purchase order", id).await?;
        tx.commit().await?;
        Ok(order)
    }

    /// Marks a draft order as sent to the supplier.
    pub async fn send_purchase_order(&self, id: i64) -> DbResult<PurchaseOrder> {
        let mut tx = self.pool.begin().await?;
        draft_order(&mut tx, id).await?;
        let order = set_order_status(&mut tx, id, PurchaseOrderStatus::Sent).await?;
        tx.commit().await?;
        info!(po_number = %order.po_number, "Purchase order sent");
        Ok(order)
    }

    // =========================================================================
    // Goods Receipts
    // =========================================================================

    /// Receives goods against a purchase order.
    ///
    /// ## Errors
    /// - `InvalidStatus` for cancelled or fully received orders
    /// - `NotFound` for an item of a different order
    /// - Validation error when an item would be over-received
    pub async fn create_goods_receipt(&self, new: NewGoodsReceipt) -> DbResult<GoodsReceipt> {
        if new.items.is_empty() {
            return Err(ValidationError::required("items").into());
        }
        for item in &new.items {
            validate_quantity(item.quantity_received)?;
        }

        let mut tx = self.pool.begin().await?;
        let order: PurchaseOrder = fetch_live(
            &mut tx,
            "purchase_orders",
            "Purchase order",
            new.purchase_order_id,
        )
        .await?;
        ensure_status(
            !matches!(
                order.status,
                PurchaseOrderStatus::Cancelled | PurchaseOrderStatus::Received
            ),
            "Purchase order",
            &order.po_number,
            order.status,
        )?;

        let number =
            codes::assign_code(&mut tx, CodeSeries::GoodsReceipt, new.receipt_number.as_deref())
                .await?;
        let now = Utc::now();

        let receipt = sqlx::query_as::<_, GoodsReceipt>(
            r#"
            INSERT INTO goods_receipts (
                receipt_number, purchase_order_id, receipt_date, received_by, notes,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            RETURNING *
            "#,
        )
        .bind(&number)
        .bind(order.id)
        .bind(new.receipt_date)
        .bind(new.received_by)
        .bind(&new.notes)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .duplicate_value(&number)?;

        let lines = list_order_lines(&mut tx, order.id).await?;
        for item in &new.items {
            let line = lines
                .iter()
                .find(|l| l.item.id == item.purchase_order_item_id)
                .ok_or_else(|| {
                    DbError::not_found("Purchase order item", item.purchase_order_item_id)
                })?;

            // Earlier items of this same receipt may already have moved the line.
            let received: i64 = sqlx::query_scalar(
                "SELECT received_quantity FROM purchase_order_items WHERE id = ?1",
            )
            .bind(line.item.id)
            .fetch_one(&mut *tx)
            .await?;
            let outstanding = line.item.quantity - received;
            if item.quantity_received > outstanding {
                return Err(ValidationError::OutOfRange {
                    field: "quantity_received".to_string(),
                    min: 1,
                    max: outstanding.max(0),
                }
                .into());
            }

            sqlx::query(
                r#"
                INSERT INTO goods_receipt_items (receipt_id, purchase_order_item_id, quantity_received)
                VALUES (?1, ?2, ?3)
                "#,
            )
            .bind(receipt.id)
            .bind(line.item.id)
            .bind(item.quantity_received)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "UPDATE purchase_order_items SET received_quantity = received_quantity + ?2 WHERE id = ?1",
            )
            .bind(line.item.id)
            .bind(item.quantity_received)
            .execute(&mut *tx)
            .await?;

            if let Some(product_id) = line.item.product_id {
                sqlx::query(
                    r#"
                    UPDATE products
                    SET quantity_on_hand = quantity_on_hand + ?2, updated_at = ?3
                    WHERE id = ?1
                    "#,
                )
                .bind(product_id)
                .bind(item.quantity_received)
                .bind(now)
                .execute(&mut *tx)
                .await?;
                debug!(product_id, quantity = item.quantity_received, "Stock received");
            }
        }

        let (received, ordered): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(received_quantity), 0), COALESCE(SUM(quantity), 0)
            FROM purchase_order_items
            WHERE purchase_order_id = ?1
            "#,
        )
        .bind(order.id)
        .fetch_one(&mut *tx)
        .await?;
        let status = PurchaseOrderStatus::after_receipt(received, ordered);
        set_order_status(&mut tx, order.id, status).await?;

        tx.commit().await?;
        info!(
            receipt_number = %receipt.receipt_number,
            po_number = %order.po_number,
            status = status.as_str(),
            "Goods received"
        );
        Ok(receipt)
    }

    pub async fn get_goods_receipt(&self, id: i64) -> DbResult<GoodsReceipt> {
        fetch_live_from_pool(&self.pool, "goods_receipts", "Goods receipt", id).await
    }

    pub async fn list_goods_receipts(&self, page: PageRequest) -> DbResult<Page<GoodsReceipt>> {
        fetch_page(&self.pool, "goods_receipts", page).await
    }

    pub async fn goods_receipt_items(&self, id: i64) -> DbResult<Vec<GoodsReceiptItem>> {
        self.get_goods_receipt(id).await?;
        let items = sqlx::query_as::<_, GoodsReceiptItem>(
            "SELECT * FROM goods_receipt_items WHERE receipt_id = ?1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

async fn draft_requisition(conn: &mut SqliteConnection, id: i64) -> DbResult<PurchaseRequisition> {
    let requisition: PurchaseRequisition =
        fetch_live(conn, "purchase_requisitions", "Purchase requisition", id).await?;
    ensure_status(
        requisition.status == RequisitionStatus::Draft,
        "Purchase requisition",
        &requisition.requisition_number,
        requisition.status,
    )?;
    Ok(requisition)
}

async fn insert_requisition_item(
    conn: &mut SqliteConnection,
    requisition_id: i64,
    item: &NewRequisitionItem,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO requisition_items (
            requisition_id, product_id, description, quantity,
            estimated_unit_price, estimated_total
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(requisition_id)
    .bind(item.product_id)
    .bind(item.description.trim())
    .bind(item.quantity)
    .bind(item.estimated_unit_price)
    .bind(estimated_line_total(item.quantity, item.estimated_unit_price))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn recalculate_requisition(
    conn: &mut SqliteConnection,
    id: i64,
) -> DbResult<PurchaseRequisition> {
    let total: Money = sqlx::query_scalar(
        "SELECT COALESCE(SUM(estimated_total), 0) FROM requisition_items WHERE requisition_id = ?1",
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;

    let requisition = sqlx::query_as::<_, PurchaseRequisition>(
        r#"
        UPDATE purchase_requisitions
        SET total_estimated = ?2, updated_at = ?3
        WHERE id = ?1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(total)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;
    Ok(requisition)
}

async fn draft_order(conn: &mut SqliteConnection, id: i64) -> DbResult<PurchaseOrder> {
    let order: PurchaseOrder = fetch_live(conn, "purchase_orders", "Purchase order", id).await?;
    ensure_status(
        order.status == PurchaseOrderStatus::Draft,
        "Purchase order",
        &order.po_number,
        order.status,
    )?;
    Ok(order)
}

async fn set_order_status(
    conn: &mut SqliteConnection,
    id: i64,
    status: PurchaseOrderStatus,
) -> DbResult<PurchaseOrder> {
    let order = sqlx::query_as::<_, PurchaseOrder>(
        "UPDATE purchase_orders SET status = ?2, updated_at = ?3 WHERE id = ?1 RETURNING *",
    )
    .bind(id)
    .bind(status)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;
    Ok(order)
}

async fn list_order_lines(
    conn: &mut SqliteConnection,
    order_id: i64,
) -> DbResult<Vec<PurchaseOrderLine>> {
    let lines = sqlx::query_as::<_, PurchaseOrderLine>(
        r#"
        SELECT id, purchase_order_id AS document_id, product_id, description, quantity,
               unit_price, discount_bps, discount_amount, line_total, received_quantity
        FROM purchase_order_items
        WHERE purchase_order_id = ?1
        ORDER BY id
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(lines)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::NaiveDate;
    use keystone_core::{CoreError, NewGoodsReceiptItem, NewProduct, Percentage};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn supplier() -> NewSupplier {
        NewSupplier {
            supplier_code: None,
            name: "Parts Inc".to_string(),
            contact_name: None,
            email: Some("sales@parts.example".to_string()),
            phone: None,
            address: None,
            payment_terms_days: 30,
        }
    }

    async fn order_with_product(db: &Database, quantity: i64) -> (PurchaseOrder, i64) {
        let supplier = db.procurement().create_supplier(supplier()).await.unwrap();
        let product = db
            .inventory()
            .create_product(NewProduct {
                sku: "BOLT-10".to_string(),
                name: "Bolt".to_string(),
                description: None,
                category_id: None,
                unit_price: Money::from_cents(50),
                cost_price: Money::from_cents(20),
                quantity_on_hand: 5,
                reorder_level: 0,
            })
            .await
            .unwrap();
        let order = db
            .procurement()
            .create_purchase_order(NewPurchaseOrder {
                po_number: None,
                supplier_id: supplier.id,
                requisition_id: None,
                order_date: date("2024-04-01"),
                expected_date: None,
                tax_rate: Percentage::zero(),
                shipping: Money::zero(),
                discount: Money::zero(),
                notes: None,
                items: vec![NewLineItem {
                    product_id: Some(product.id),
                    description: "Bolt".to_string(),
                    quantity,
                    unit_price: Money::from_cents(20),
                    discount_bps: Percentage::zero(),
                    discount_amount: Money::zero(),
                }],
            })
            .await
            .unwrap();
        (order, product.id)
    }

    fn receipt(order_id: i64, item_id: i64, quantity: i64) -> NewGoodsReceipt {
        NewGoodsReceipt {
            receipt_number: None,
            purchase_order_id: order_id,
            receipt_date: date("2024-04-10"),
            received_by: None,
            notes: None,
            items: vec![NewGoodsReceiptItem {
                purchase_order_item_id: item_id,
                quantity_received: quantity,
            }],
        }
    }

    #[tokio::test]
    async fn test_requisition_estimated_total() {
        let db = db().await;
        let procurement = db.procurement();
        let requisition = procurement
            .create_requisition(NewPurchaseRequisition {
                requisition_number: None,
                requested_by: None,
                department_id: None,
                request_date: date("2024-04-01"),
                required_date: None,
                notes: None,
                items: vec![
                    NewRequisitionItem {
                        product_id: None,
                        description: "Paper".to_string(),
                        quantity: 10,
                        estimated_unit_price: Money::from_cents(450),
                    },
                    NewRequisitionItem {
                        product_id: None,
                        description: "Toner".to_string(),
                        quantity: 2,
                        estimated_unit_price: Money::from_cents(6000),
                    },
                ],
            })
            .await
            .unwrap();
        assert_eq!(requisition.requisition_number, "PR000001");
        assert_eq!(requisition.total_estimated.cents(), 16_500);

        let items = procurement.requisition_items(requisition.id).await.unwrap();
        assert_eq!(items[0].estimated_total.cents(), 4500);
        let requisition = procurement
            .remove_requisition_item(requisition.id, items[1].id)
            .await
            .unwrap();
        assert_eq!(requisition.total_estimated.cents(), 4500);

        let submitted = procurement
            .set_requisition_status(requisition.id, RequisitionStatus::Submitted)
            .await
            .unwrap();
        assert_eq!(submitted.status, RequisitionStatus::Submitted);
        let err = procurement
            .add_requisition_item(
                requisition.id,
                NewRequisitionItem {
                    product_id: None,
                    description: "Pens".to_string(),
                    quantity: 1,
                    estimated_unit_price: Money::from_cents(100),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidStatus { .. })));
    }

    #[tokio::test]
    async fn test_partial_then_full_receipt() {
        let db = db().await;
        let procurement = db.procurement();
        let (order, product_id) = order_with_product(&db, 10).await;
        assert_eq!(order.po_number, "PO000001");
        assert_eq!(order.total.cents(), 200);
        let order = procurement.send_purchase_order(order.id).await.unwrap();
        let line_id = procurement.purchase_order_lines(order.id).await.unwrap()[0].item.id;

        let first = procurement
            .create_goods_receipt(receipt(order.id, line_id, 4))
            .await
            .unwrap();
        assert_eq!(first.receipt_number, "GR000001");
        let order = procurement.get_purchase_order(order.id).await.unwrap();
        assert_eq!(order.status, PurchaseOrderStatus::PartiallyReceived);
        let lines = procurement.purchase_order_lines(order.id).await.unwrap();
        assert_eq!(lines[0].received_quantity, 4);
        assert_eq!(lines[0].outstanding(), 6);
        assert_eq!(db.inventory().get_product(product_id).await.unwrap().quantity_on_hand, 9);

        procurement
            .create_goods_receipt(receipt(order.id, line_id, 6))
            .await
            .unwrap();
        let order = procurement.get_purchase_order(order.id).await.unwrap();
        assert_eq!(order.status, PurchaseOrderStatus::Received);
        assert_eq!(db.inventory().get_product(product_id).await.unwrap().quantity_on_hand, 15);

        let err = procurement
            .create_goods_receipt(receipt(order.id, line_id, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidStatus { .. })));
    }

    #[tokio::test]
    async fn test_over_receipt_rejected_and_rolled_back() {
        let db = db().await;
        let procurement = db.procurement();
        let (order, product_id) = order_with_product(&db, 3).await;
        let line_id = procurement.purchase_order_lines(order.id).await.unwrap()[0].item.id;

        let err = procurement
            .create_goods_receipt(receipt(order.id, line_id, 4))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        let lines = procurement.purchase_order_lines(order.id).await.unwrap();
        assert_eq!(lines[0].received_quantity, 0);
        assert_eq!(db.inventory().get_product(product_id).await.unwrap().quantity_on_hand, 5);
        assert_eq!(procurement.list_goods_receipts(PageRequest::default()).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_sent_order_items_are_frozen() {
        let db = db().await;
        let procurement = db.procurement();
        let (order, _) = order_with_product(&db, 3).await;
        procurement.send_purchase_order(order.id).await.unwrap();
        let lines = procurement.purchase_order_lines(order.id).await.unwrap();
        let err = procurement
            .remove_purchase_order_item(order.id, lines[0].item.id)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidStatus { .. })));
    }
}
