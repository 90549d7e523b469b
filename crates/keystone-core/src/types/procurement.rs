//! # Procurement Types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Supplier                                                               │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  PurchaseRequisition (PR) ──► PurchaseOrder (PO) ──► GoodsReceipt (GR)  │
//! │     estimated totals          priced line items      received qty       │
//! │                                                       ▲ stock +qty      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::calc::DocumentCharges;
use crate::money::Money;
use crate::units::Percentage;

use super::{LineItem, NewLineItem};

// =============================================================================
// Supplier
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Supplier {
    pub id: i64,
    pub supplier_code: String,
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub payment_terms_days: i64,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSupplier {
    #[serde(default)]
    pub supplier_code: Option<String>,
    pub name: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_payment_terms")]
    pub payment_terms_days: i64,
}

fn default_payment_terms() -> i64 {
    30
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSupplier {
    pub name: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub payment_terms_days: Option<i64>,
    pub is_active: Option<bool>,
}

// =============================================================================
// Purchase Requisition
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum RequisitionStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
    Ordered,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchaseRequisition {
    pub id: i64,
    pub requisition_number: String,
    pub requested_by: Option<i64>,
    pub department_id: Option<i64>,
    pub request_date: NaiveDate,
    pub required_date: Option<NaiveDate>,
    pub total_estimated: Money,
    pub status: RequisitionStatus,
    pub notes: Option<String>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct RequisitionItem {
    pub id: i64,
    pub requisition_id: i64,
    pub product_id: Option<i64>,
    pub description: String,
    pub quantity: i64,
    pub estimated_unit_price: Money,
    pub estimated_total: Money,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPurchaseRequisition {
    #[serde(default)]
    pub requisition_number: Option<String>,
    #[serde(default)]
    pub requested_by: Option<i64>,
    #[serde(default)]
    pub department_id: Option<i64>,
    pub request_date: NaiveDate,
    #[serde(default)]
    pub required_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<NewRequisitionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRequisitionItem {
    #[serde(default)]
    pub product_id: Option<i64>,
    pub description: String,
    pub quantity: i64,
    #[serde(default)]
    pub estimated_unit_price: Money,
}

// =============================================================================
// Purchase Order
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOrderStatus {
    Draft,
    Sent,
    PartiallyReceived,
    Received,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Draft => "draft",
            PurchaseOrderStatus::Sent => "sent",
            PurchaseOrderStatus::PartiallyReceived => "partially_received",
            PurchaseOrderStatus::Received => "received",
            PurchaseOrderStatus::Cancelled => "cancelled",
        }
    }

    /// Status once `received` of `ordered` units across all items have
    /// arrived.
    pub fn after_receipt(received: i64, ordered: i64) -> PurchaseOrderStatus {
        if received <= 0 {
            PurchaseOrderStatus::Sent
        } else if received >= ordered {
            PurchaseOrderStatus::Received
        } else {
            PurchaseOrderStatus::PartiallyReceived
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchaseOrder {
    pub id: i64,
    pub po_number: String,
    pub supplier_id: i64,
    pub requisition_id: Option<i64>,
    pub order_date: NaiveDate,
    pub expected_date: Option<NaiveDate>,
    pub status: PurchaseOrderStatus,
    pub subtotal: Money,
    pub tax_rate: Percentage,
    pub tax_amount: Money,
    pub shipping: Money,
    pub discount: Money,
    pub total: Money,
    pub notes: Option<String>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PurchaseOrder {
    pub fn charges(&self) -> DocumentCharges {
        DocumentCharges {
            tax_rate: self.tax_rate,
            shipping: self.shipping,
            discount: self.discount,
        }
    }
}

/// A purchase order line with what has arrived against it so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchaseOrderLine {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub item: LineItem,
    pub received_quantity: i64,
}

impl PurchaseOrderLine {
    pub fn outstanding(&self) -> i64 {
        (self.item.quantity - self.received_quantity).max(0)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPurchaseOrder {
    #[serde(default)]
    pub po_number: Option<String>,
    pub supplier_id: i64,
    #[serde(default)]
    pub requisition_id: Option<i64>,
    pub order_date: NaiveDate,
    #[serde(default)]
    pub expected_date: Option<NaiveDate>,
    #[serde(default)]
    pub tax_rate: Percentage,
    #[serde(default)]
    pub shipping: Money,
    #[serde(default)]
    pub discount: Money,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<NewLineItem>,
}

// =============================================================================
// Goods Receipt
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct GoodsReceipt {
    pub id: i64,
    pub receipt_number: String,
    pub purchase_order_id: i64,
    pub receipt_date: NaiveDate,
    pub received_by: Option<i64>,
    pub notes: Option<String>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct GoodsReceiptItem {
    pub id: i64,
    pub receipt_id: i64,
    pub purchase_order_item_id: i64,
    pub quantity_received: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewGoodsReceipt {
    #[serde(default)]
    pub receipt_number: Option<String>,
    pub purchase_order_id: i64,
    pub receipt_date: NaiveDate,
    #[serde(default)]
    pub received_by: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
    pub items: Vec<NewGoodsReceiptItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewGoodsReceiptItem {
    pub purchase_order_item_id: i64,
    pub quantity_received: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_po_status_after_receipt() {
        assert_eq!(PurchaseOrderStatus::after_receipt(0, 10), PurchaseOrderStatus::Sent);
        assert_eq!(
            PurchaseOrderStatus::after_receipt(4, 10),
            PurchaseOrderStatus::PartiallyReceived
        );
        assert_eq!(PurchaseOrderStatus::after_receipt(10, 10), PurchaseOrderStatus::Received);
    }

    #[test]
    fn test_supplier_default_terms() {
        let supplier: NewSupplier = serde_json::from_str(r#"{"name":"Acme"}"#).unwrap();
        assert_eq!(supplier.payment_terms_days, 30);
    }
}
