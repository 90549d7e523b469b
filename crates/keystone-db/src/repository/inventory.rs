//! # Inventory Repository
//!
//! Product categories, products, warehouses and stock adjustments.
//!
//! ## Stock Adjustment Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_adjustment()   ADJ000001, status draft                         │
//! │     └── each item snapshots current_quantity from the product          │
//! │         variance = adjusted_quantity - current_quantity                │
//! │                                                                         │
//! │  add / remove item      (draft only)                                   │
//! │                                                                         │
//! │  apply_adjustment()                                                     │
//! │     ├── products.quantity_on_hand = adjusted_quantity                  │
//! │     └── status → applied  (cannot be applied twice)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use keystone_core::validation::{
    validate_code, validate_description, validate_name, validate_non_negative_money, validate_sku,
};
use keystone_core::{
    stock_variance, AcronymKind, AdjustmentStatus, CodeSeries, NewProduct, NewProductCategory,
    NewStockAdjustment, NewStockAdjustmentItem, NewWarehouse, Page, PageRequest, Product,
    ProductCategory, StockAdjustment, StockAdjustmentItem, UpdateProduct, ValidationError,
    Warehouse,
};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::{codes, ensure_status, fetch_live, fetch_live_from_pool, fetch_page};
use crate::error::{DbError, DbResult, DuplicateContext};

fn validate_stock_levels(quantity: i64, reorder_level: i64) -> Result<(), ValidationError> {
    if quantity < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "quantity_on_hand".to_string(),
        });
    }
    if reorder_level < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "reorder_level".to_string(),
        });
    }
    Ok(())
}

/// Repository for inventory database operations.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Creates a category coded by the acronym of its name unless a code is given.
    pub async fn create_category(&self, new: NewProductCategory) -> DbResult<ProductCategory> {
        validate_name("name", &new.name, 100)?;
        let code = match new.code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => {
                validate_code("code", code)?;
                code.to_uppercase()
            }
            None => AcronymKind::ProductCategory.code_for(&new.name)?,
        };

        let category = sqlx::query_as::<_, ProductCategory>(
            r#"
            INSERT INTO product_categories (code, name, description, parent_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            RETURNING *
            "#,
        )
        .bind(&code)
        .bind(new.name.trim())
        .bind(&new.description)
        .bind(new.parent_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .duplicate_value(&code)?;

        info!(code = %category.code, "Product category created");
        Ok(category)
    }

    pub async fn get_category(&self, id: i64) -> DbResult<ProductCategory> {
        fetch_live_from_pool(&self.pool, "product_categories", "Product category", id).await
    }

    pub async fn list_categories(&self, page: PageRequest) -> DbResult<Page<ProductCategory>> {
        fetch_page(&self.pool, "product_categories", page).await
    }

    // =========================================================================
    // Products
    // =========================================================================

    pub async fn create_product(&self, new: NewProduct) -> DbResult<Product> {
        let sku = new.sku.trim().to_uppercase();
        validate_sku(&sku)?;
        validate_name("name", &new.name, 200)?;
        validate_non_negative_money("unit_price", new.unit_price)?;
        validate_non_negative_money("cost_price", new.cost_price)?;
        validate_stock_levels(new.quantity_on_hand, new.reorder_level)?;

        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (
                sku, name, description, category_id, unit_price, cost_price,
                quantity_on_hand, reorder_level, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            RETURNING *
            "#,
        )
        .bind(&sku)
        .bind(new.name.trim())
        .bind(&new.description)
        .bind(new.category_id)
        .bind(new.unit_price)
        .bind(new.cost_price)
        .bind(new.quantity_on_hand)
        .bind(new.reorder_level)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .duplicate_value(&sku)?;

        info!(sku = %product.sku, "Product created");
        Ok(product)
    }

    pub async fn get_product(&self, id: i64) -> DbResult<Product> {
        fetch_live_from_pool(&self.pool, "products", "Product", id).await
    }

    pub async fn list_products(&self, page: PageRequest) -> DbResult<Page<Product>> {
        fetch_page(&self.pool, "products", page).await
    }

    /// Updates catalogue fields. Stock only moves through adjustments and receipts.
    pub async fn update_product(&self, id: i64, update: UpdateProduct) -> DbResult<Product> {
        let mut tx = self.pool.begin().await?;
        let current: Product = fetch_live(&mut tx, "products", "Product", id).await?;

        let name = update.name.unwrap_or(current.name);
        let unit_price = update.unit_price.unwrap_or(current.unit_price);
        let cost_price = update.cost_price.unwrap_or(current.cost_price);
        let reorder_level = update.reorder_level.unwrap_or(current.reorder_level);
        validate_name("name", &name, 200)?;
        validate_non_negative_money("unit_price", unit_price)?;
        validate_non_negative_money("cost_price", cost_price)?;
        validate_stock_levels(current.quantity_on_hand, reorder_level)?;

        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET name = ?2, description = ?3, category_id = ?4, unit_price = ?5,
                cost_price = ?6, reorder_level = ?7, is_active = ?8, updated_at = ?9
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name.trim())
        .bind(update.description.or(current.description))
        .bind(update.category_id.or(current.category_id))
        .bind(unit_price)
        .bind(cost_price)
        .bind(reorder_level)
        .bind(update.is_active.unwrap_or(current.is_active))
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(product)
    }

    /// Active products at or below their reorder level.
    pub async fn low_stock_products(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE is_deleted = 0 AND is_active = 1 AND quantity_on_hand <= reorder_level
            ORDER BY quantity_on_hand, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    // =========================================================================
    // Warehouses
    // =========================================================================

    pub async fn create_warehouse(&self, new: NewWarehouse) -> DbResult<Warehouse> {
        validate_name("name", &new.name, 100)?;

        let mut tx = self.pool.begin().await?;
        let code = codes::assign_code(&mut tx, CodeSeries::Warehouse, new.code.as_deref()).await?;

        let warehouse = sqlx::query_as::<_, Warehouse>(
            r#"
            INSERT INTO warehouses (code, name, address, manager_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            RETURNING *
            "#,
        )
        .bind(&code)
        .bind(new.name.trim())
        .bind(&new.address)
        .bind(new.manager_id)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .duplicate_value(&code)?;

        tx.commit().await?;
        info!(code = %warehouse.code, "Warehouse created");
        Ok(warehouse)
    }

    pub async fn get_warehouse(&self, id: i64) -> DbResult<Warehouse> {
        fetch_live_from_pool(&self.pool, "warehouses", "Warehouse", id).await
    }

    pub async fn list_warehouses(&self, page: PageRequest) -> DbResult<Page<Warehouse>> {
        fetch_page(&self.pool, "warehouses", page).await
    }

    // =========================================================================
    // Stock Adjustments
    // =========================================================================

    pub async fn create_adjustment(&self, new: NewStockAdjustment) -> DbResult<StockAdjustment> {
        if let Some(reason) = new.reason.as_deref() {
            validate_description(reason)?;
        }

        let mut tx = self.pool.begin().await?;
        let number = codes::assign_code(
            &mut tx,
            CodeSeries::StockAdjustment,
            new.adjustment_number.as_deref(),
        )
        .await?;

        let adjustment = sqlx::query_as::<_, StockAdjustment>(
            r#"
            INSERT INTO stock_adjustments (
                adjustment_number, warehouse_id, adjustment_date, reason, status,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            RETURNING *
            "#,
        )
        .bind(&number)
        .bind(new.warehouse_id)
        .bind(new.adjustment_date)
        .bind(&new.reason)
        .bind(AdjustmentStatus::Draft)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .duplicate_value(&number)?;

        for item in &new.items {
            insert_adjustment_item(&mut tx, adjustment.id, item).await?;
        }

        tx.commit().await?;
        info!(
            adjustment_number = %adjustment.adjustment_number,
            items = new.items.len(),
            "Stock adjustment created"
        );
        Ok(adjustment)
    }

    pub async fn get_adjustment(&self, id: i64) -> DbResult<StockAdjustment> {
        fetch_live_from_pool(&self.pool, "stock_adjustments", "Stock adjustment", id).await
    }

    pub async fn list_adjustments(&self, page: PageRequest) -> DbResult<Page<StockAdjustment>> {
        fetch_page(&self.pool, "stock_adjustments", page).await
    }

    pub async fn adjustment_items(&self, id: i64) -> DbResult<Vec<StockAdjustmentItem>> {
        let mut conn = self.pool.acquire().await?;
        let _: StockAdjustment =
            fetch_live(&mut conn, "stock_adjustments", "Stock adjustment", id).await?;
        list_adjustment_items(&mut conn, id).await
    }

    pub async fn add_adjustment_item(
        &self,
        id: i64,
        item: NewStockAdjustmentItem,
    ) -> DbResult<StockAdjustmentItem> {
        let mut tx = self.pool.begin().await?;
        draft_adjustment(&mut tx, id).await?;
        let inserted = insert_adjustment_item(&mut tx, id, &item).await?;
        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn remove_adjustment_item(&self, id: i64, item_id: i64) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        draft_adjustment(&mut tx, id).await?;
        let result =
            sqlx::query("DELETE FROM stock_adjustment_items WHERE id = ?1 AND adjustment_id = ?2")
                .bind(item_id)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Adjustment item", item_id));
        }
        tx.commit().await?;
        Ok(())
    }

    /// Sets each product's stock to its adjusted quantity and marks the
    /// adjustment applied.
    pub async fn apply_adjustment(&self, id: i64) -> DbResult<StockAdjustment> {
        let mut tx = self.pool.begin().await?;
        let adjustment = draft_adjustment(&mut tx, id).await?;
        let items = list_adjustment_items(&mut tx, id).await?;
        let now = Utc::now();

        for item in &items {
            sqlx::query("UPDATE products SET quantity_on_hand = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(item.product_id)
                .bind(item.adjusted_quantity)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            debug!(
                product_id = item.product_id,
                variance = item.variance,
                "Applied stock variance"
            );
        }

        let applied = sqlx::query_as::<_, StockAdjustment>(
            "UPDATE stock_adjustments SET status = ?2, updated_at = ?3 WHERE id = ?1 RETURNING *",
        )
        .bind(id)
        .bind(AdjustmentStatus::Applied)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(
            adjustment_number = %adjustment.adjustment_number,
            items = items.len(),
            "Stock adjustment applied"
        );
        Ok(applied)
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

async fn draft_adjustment(conn: &mut SqliteConnection, id: i64) -> DbResult<StockAdjustment> {
    let adjustment: StockAdjustment =
        fetch_live(conn, "stock_adjustments", "Stock adjustment", id).await?;
    ensure_status(
        adjustment.status == AdjustmentStatus::Draft,
        "Stock adjustment",
        &adjustment.adjustment_number,
        adjustment.status,
    )?;
    Ok(adjustment)
}

/// Inserts one item, snapshotting the product's stock as `current_quantity`.
async fn insert_adjustment_item(
    conn: &mut SqliteConnection,
    adjustment_id: i64,
    item: &NewStockAdjustmentItem,
) -> DbResult<StockAdjustmentItem> {
    if item.adjusted_quantity < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "adjusted_quantity".to_string(),
        }
        .into());
    }
    let product: Product = fetch_live(conn, "products", "Product", item.product_id).await?;
    let variance = stock_variance(product.quantity_on_hand, item.adjusted_quantity);

    let inserted = sqlx::query_as::<_, StockAdjustmentItem>(
        r#"
        INSERT INTO stock_adjustment_items (
            adjustment_id, product_id, current_quantity, adjusted_quantity, variance
        ) VALUES (?1, ?2, ?3, ?4, ?5)
        RETURNING *
        "#,
    )
    .bind(adjustment_id)
    .bind(product.id)
    .bind(product.quantity_on_hand)
    .bind(item.adjusted_quantity)
    .bind(variance)
    .fetch_one(&mut *conn)
    .await?;
    Ok(inserted)
}

async fn list_adjustment_items(
    conn: &mut SqliteConnection,
    adjustment_id: i64,
) -> DbResult<Vec<StockAdjustmentItem>> {
    let items = sqlx::query_as::<_, StockAdjustmentItem>(
        "SELECT * FROM stock_adjustment_items WHERE adjustment_id = ?1 ORDER BY id",
    )
    .bind(adjustment_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(items)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::NaiveDate;
    use keystone_core::{CoreError, Money};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn product(sku: &str, quantity: i64, reorder_level: i64) -> NewProduct {
        NewProduct {
            sku: sku.to_string(),
            name: format!("Product {sku}"),
            description: None,
            category_id: None,
            unit_price: Money::from_cents(1999),
            cost_price: Money::from_cents(1200),
            quantity_on_hand: quantity,
            reorder_level,
        }
    }

    #[tokio::test]
    async fn test_category_acronym() {
        let db = db().await;
        let category = db
            .inventory()
            .create_category(NewProductCategory {
                code: None,
                name: "Office Supplies".to_string(),
                description: None,
                parent_id: None,
            })
            .await
            .unwrap();
        assert_eq!(category.code, "OFFSUP");
    }

    #[tokio::test]
    async fn test_duplicate_sku() {
        let db = db().await;
        let inventory = db.inventory();
        inventory.create_product(product("wid-001", 5, 1)).await.unwrap();
        let err = inventory
            .create_product(product("WID-001", 5, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref value, .. } if value == "WID-001"));
    }

    #[tokio::test]
    async fn test_low_stock() {
        let db = db().await;
        let inventory = db.inventory();
        let low = inventory.create_product(product("LOW-1", 2, 5)).await.unwrap();
        inventory.create_product(product("OK-1", 50, 5)).await.unwrap();
        let inactive = inventory.create_product(product("OFF-1", 0, 5)).await.unwrap();
        inventory
            .update_product(
                inactive.id,
                UpdateProduct {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let flagged = inventory.low_stock_products().await.unwrap();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].id, low.id);
        assert!(flagged[0].needs_reorder());
    }

    #[tokio::test]
    async fn test_warehouse_codes_are_three_digits() {
        let db = db().await;
        let inventory = db.inventory();
        let new = |name: &str| NewWarehouse {
            code: None,
            name: name.to_string(),
            address: None,
            manager_id: None,
        };
        for n in 1..=12 {
            let warehouse = inventory
                .create_warehouse(new(&format!("Site {n}")))
                .await
                .unwrap();
            assert_eq!(warehouse.code, format!("WH{n:03}"));
        }
    }

    #[tokio::test]
    async fn test_adjustment_apply_sets_stock_once() {
        let db = db().await;
        let inventory = db.inventory();
        let p = inventory.create_product(product("WID-001", 10, 2)).await.unwrap();

        let adjustment = inventory
            .create_adjustment(NewStockAdjustment {
                adjustment_number: None,
                warehouse_id: None,
                adjustment_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                reason: Some("Cycle count".to_string()),
                items: vec![NewStockAdjustmentItem {
                    product_id: p.id,
                    adjusted_quantity: 7,
                }],
            })
            .await
            .unwrap();
        assert_eq!(adjustment.adjustment_number, "ADJ000001");

        let items = inventory.adjustment_items(adjustment.id).await.unwrap();
        assert_eq!(items[0].current_quantity, 10);
        assert_eq!(items[0].variance, -3);

        let applied = inventory.apply_adjustment(adjustment.id).await.unwrap();
        assert_eq!(applied.status, AdjustmentStatus::Applied);
        assert_eq!(inventory.get_product(p.id).await.unwrap().quantity_on_hand, 7);

        let err = inventory.apply_adjustment(adjustment.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidStatus { .. })));
        let err = inventory
            .add_adjustment_item(
                adjustment.id,
                NewStockAdjustmentItem {
                    product_id: p.id,
                    adjusted_quantity: 1,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidStatus { .. })));
    }

    #[tokio::test]
    async fn test_adjustment_for_missing_product_rolls_back() {
        let db = db().await;
        let inventory = db.inventory();
        let err = inventory
            .create_adjustment(NewStockAdjustment {
                adjustment_number: None,
                warehouse_id: None,
                adjustment_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                reason: None,
                items: vec![NewStockAdjustmentItem {
                    product_id: 999,
                    adjusted_quantity: 1,
                }],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        // The failed attempt released its number.
        let ok = inventory
            .create_adjustment(NewStockAdjustment {
                adjustment_number: None,
                warehouse_id: None,
                adjustment_date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
                reason: None,
                items: vec![],
            })
            .await
            .unwrap();
        assert_eq!(ok.adjustment_number, "ADJ000001");
    }
}
