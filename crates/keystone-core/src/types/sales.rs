//! Sales types: customers, sales orders and quotes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::calc::{available_credit, DocumentCharges};
use crate::money::Money;
use crate::units::Percentage;

use super::NewLineItem;

// =============================================================================
// Customer
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: i64,
    pub customer_code: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub credit_limit: Money,
    pub current_balance: Money,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn available_credit(&self) -> Money {
        available_credit(self.credit_limit, self.current_balance)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCustomer {
    #[serde(default)]
    pub customer_code: Option<String>,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub credit_limit: Money,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCustomer {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub credit_limit: Option<Money>,
    pub is_active: Option<bool>,
}

// =============================================================================
// Sales Order
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum SalesOrderStatus {
    Draft,
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SalesOrder {
    pub id: i64,
    pub order_number: String,
    pub customer_id: i64,
    pub quote_id: Option<i64>,
    pub order_date: NaiveDate,
    pub delivery_date: Option<NaiveDate>,
    pub status: SalesOrderStatus,
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

impl SalesOrder {
    pub fn charges(&self) -> DocumentCharges {
        DocumentCharges {
            tax_rate: self.tax_rate,
            shipping: self.shipping,
            discount: self.discount,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSalesOrder {
    #[serde(default)]
    pub order_number: Option<String>,
    pub customer_id: i64,
    #[serde(default)]
    pub quote_id: Option<i64>,
    pub order_date: NaiveDate,
    #[serde(default)]
    pub delivery_date: Option<NaiveDate>,
    #[serde(default = "default_sales_tax")]
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

fn default_sales_tax() -> Percentage {
    Percentage::from_bps(crate::DEFAULT_SALES_TAX_BPS)
}

// =============================================================================
// Quote
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Draft,
    Sent,
    Accepted,
    Rejected,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Quote {
    pub id: i64,
    pub quote_number: String,
    pub customer_id: i64,
    pub quote_date: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    pub status: QuoteStatus,
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

impl Quote {
    pub fn charges(&self) -> DocumentCharges {
        DocumentCharges {
            tax_rate: self.tax_rate,
            shipping: self.shipping,
            discount: self.discount,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewQuote {
    #[serde(default)]
    pub quote_number: Option<String>,
    pub customer_id: i64,
    pub quote_date: NaiveDate,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sales_order_default_tax() {
        let order: NewSalesOrder =
            serde_json::from_str(r#"{"customer_id":1,"order_date":"2024-04-01"}"#).unwrap();
        assert_eq!(order.tax_rate, Percentage::from_bps(850));
        assert!(order.items.is_empty());
    }

    #[test]
    fn test_quote_has_no_default_tax() {
        let quote: NewQuote =
            serde_json::from_str(r#"{"customer_id":1,"quote_date":"2024-04-01"}"#).unwrap();
        assert!(quote.tax_rate.is_zero());
    }
}
