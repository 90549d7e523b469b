//! Inventory types: categories, products, warehouses and stock adjustments.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Product Category
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProductCategory {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<i64>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProductCategory {
    #[serde(default)]
    pub code: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

// =============================================================================
// Product
// =============================================================================

/// A stocked product.
///
/// The SKU is supplied by the user and validated with
/// [`crate::validation::validate_sku`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub unit_price: Money,
    pub cost_price: Money,
    pub quantity_on_hand: i64,
    pub reorder_level: i64,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Stock is at or below the reorder level.
    pub fn needs_reorder(&self) -> bool {
        self.is_active && self.quantity_on_hand <= self.reorder_level
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    pub unit_price: Money,
    #[serde(default)]
    pub cost_price: Money,
    #[serde(default)]
    pub quantity_on_hand: i64,
    #[serde(default)]
    pub reorder_level: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub unit_price: Option<Money>,
    pub cost_price: Option<Money>,
    pub reorder_level: Option<i64>,
    pub is_active: Option<bool>,
}

// =============================================================================
// Warehouse
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Warehouse {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub address: Option<String>,
    pub manager_id: Option<i64>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewWarehouse {
    #[serde(default)]
    pub code: Option<String>,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub manager_id: Option<i64>,
}

// =============================================================================
// Stock Adjustment
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentStatus {
    Draft,
    Applied,
}

/// A stock count correction.
///
/// ```text
/// Draft ──add/remove items──► Draft ──apply──► Applied
///                                              (product stock := adjusted)
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockAdjustment {
    pub id: i64,
    pub adjustment_number: String,
    pub warehouse_id: Option<i64>,
    pub adjustment_date: NaiveDate,
    pub reason: Option<String>,
    pub status: AdjustmentStatus,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockAdjustmentItem {
    pub id: i64,
    pub adjustment_id: i64,
    pub product_id: i64,
    pub current_quantity: i64,
    pub adjusted_quantity: i64,
    pub variance: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewStockAdjustment {
    #[serde(default)]
    pub adjustment_number: Option<String>,
    #[serde(default)]
    pub warehouse_id: Option<i64>,
    pub adjustment_date: NaiveDate,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub items: Vec<NewStockAdjustmentItem>,
}

/// The current quantity is captured from the product when the item is added.
#[derive(Debug, Clone, Deserialize)]
pub struct NewStockAdjustmentItem {
    pub product_id: i64,
    pub adjusted_quantity: i64,
}

/// Counted minus recorded stock.
pub fn stock_variance(current_quantity: i64, adjusted_quantity: i64) -> i64 {
    adjusted_quantity - current_quantity
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_variance() {
        assert_eq!(stock_variance(10, 7), -3);
        assert_eq!(stock_variance(0, 5), 5);
    }

    #[test]
    fn test_needs_reorder() {
        let now = Utc::now();
        let mut product = Product {
            id: 1,
            sku: "WID-001".to_string(),
            name: "Widget".to_string(),
            description: None,
            category_id: None,
            unit_price: Money::from_cents(999),
            cost_price: Money::from_cents(500),
            quantity_on_hand: 5,
            reorder_level: 5,
            is_active: true,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        assert!(product.needs_reorder());
        product.quantity_on_hand = 6;
        assert!(!product.needs_reorder());
        product.quantity_on_hand = 0;
        product.is_active = false;
        assert!(!product.needs_reorder());
    }
}
