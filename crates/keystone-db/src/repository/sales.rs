//! # Sales Repository
//!
//! Customers, sales orders and quotes.
//!
//! ## Customer Balance
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  invoice created / edited / paid / deleted                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  refresh_customer_balance(customer_id)                                  │
//! │       current_balance = Σ balance_due of live, non-cancelled invoices  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Customer::available_credit() = credit_limit - current_balance         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use keystone_core::validation::{
    validate_charges, validate_email, validate_name, validate_non_negative_money,
};
use keystone_core::{
    CodeSeries, Customer, LineItem, NewCustomer, NewLineItem, NewQuote, NewSalesOrder, Page,
    PageRequest, Quote, QuoteStatus, SalesOrder, SalesOrderStatus, UpdateCustomer,
    ValidationError,
};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::documents::{self, DocumentKind};
use super::{codes, fetch_live, fetch_live_from_pool, fetch_page};
use crate::error::{DbResult, DuplicateContext};

/// Recomputes a customer's outstanding balance from their invoices.
pub(crate) async fn refresh_customer_balance(
    conn: &mut SqliteConnection,
    customer_id: i64,
) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE customers
        SET current_balance = (
                SELECT COALESCE(SUM(balance_due), 0)
                FROM invoices
                WHERE customer_id = ?1 AND is_deleted = 0 AND status != 'cancelled'
            ),
            updated_at = ?2
        WHERE id = ?1
        "#,
    )
    .bind(customer_id)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    debug!(customer_id, "Refreshed customer balance");
    Ok(())
}

fn validate_contact(email: Option<&str>) -> Result<(), ValidationError> {
    match email.map(str::trim).filter(|e| !e.is_empty()) {
        Some(email) => validate_email(email),
        None => Ok(()),
    }
}

/// Repository for sales database operations.
#[derive(Debug, Clone)]
pub struct SalesRepository {
    pool: SqlitePool,
}

impl SalesRepository {
    /// Creates a new SalesRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SalesRepository { pool }
    }

    // =========================================================================
    // Customers
    // =========================================================================

    /// Creates a customer with the next `CUST` code unless one is given.
    pub async fn create_customer(&self, new: NewCustomer) -> DbResult<Customer> {
        validate_name("name", &new.name, 200)?;
        validate_contact(new.email.as_deref())?;
        validate_non_negative_money("credit_limit", new.credit_limit)?;

        let mut tx = self.pool.begin().await?;
        let code =
            codes::assign_code(&mut tx, CodeSeries::Customer, new.customer_code.as_deref()).await?;
        let now = Utc::now();

        let customer = sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (
                customer_code, name, email, phone, address, credit_limit,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            RETURNING *
            "#,
        )
        .bind(&code)
        .bind(new.name.trim())
        .bind(&new.email)
        .bind(&new.phone)
        .bind(&new.address)
        .bind(new.credit_limit)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .duplicate_value(&code)?;

        tx.commit().await?;
        info!(customer_code = %customer.customer_code, "Customer created");
        Ok(customer)
    }

    pub async fn get_customer(&self, id: i64) -> DbResult<Customer> {
        fetch_live_from_pool(&self.pool, "customers", "Customer", id).await
    }

    pub async fn list_customers(&self, page: PageRequest) -> DbResult<Page<Customer>> {
        fetch_page(&self.pool, "customers", page).await
    }

    /// Updates contact details. The code and balance never change here.
    pub async fn update_customer(&self, id: i64, update: UpdateCustomer) -> DbResult<Customer> {
        let mut tx = self.pool.begin().await?;
        let current: Customer = fetch_live(&mut tx, "customers", "Customer", id).await?;

        let name = update.name.unwrap_or(current.name);
        validate_name("name", &name, 200)?;
        let email = update.email.or(current.email);
        validate_contact(email.as_deref())?;
        let credit_limit = update.credit_limit.unwrap_or(current.credit_limit);
        validate_non_negative_money("credit_limit", credit_limit)?;

        let customer = sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers
            SET name = ?2, email = ?3, phone = ?4, address = ?5,
                credit_limit = ?6, is_active = ?7, updated_at = ?8
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name.trim())
        .bind(email)
        .bind(update.phone.or(current.phone))
        .bind(update.address.or(current.address))
        .bind(credit_limit)
        .bind(update.is_active.unwrap_or(current.is_active))
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(customer)
    }

    // =========================================================================
    // Sales Orders
    // =========================================================================

    /// Creates a sales order with its items and computed totals.
    pub async fn create_sales_order(&self, new: NewSalesOrder) -> DbResult<SalesOrder> {
        validate_charges(new.tax_rate, new.shipping, new.discount)?;
        for item in &new.items {
            item.validate()?;
        }

        let mut tx = self.pool.begin().await?;
        let number =
            codes::assign_code(&mut tx, CodeSeries::SalesOrder, new.order_number.as_deref())
                .await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO sales_orders (
                order_number, customer_id, quote_id, order_date, delivery_date,
                status, tax_rate, shipping, discount, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
            RETURNING id
            "#,
        )
        .bind(&number)
        .bind(new.customer_id)
        .bind(new.quote_id)
        .bind(new.order_date)
        .bind(new.delivery_date)
        .bind(SalesOrderStatus::Draft)
        .bind(new.tax_rate)
        .bind(new.shipping)
        .bind(new.discount)
        .bind(&new.notes)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .duplicate_value(&number)?;

        documents::insert_items_and_recalculate(&mut tx, DocumentKind::SalesOrder, id, &new.items)
            .await?;
        let order: SalesOrder = fetch_live(&mut tx, "sales_orders", "Sales order", id).await?;
        tx.commit().await?;

        info!(order_number = %order.order_number, total = %order.total, "Sales order created");
        Ok(order)
    }

    pub async fn get_sales_order(&self, id: i64) -> DbResult<SalesOrder> {
        fetch_live_from_pool(&self.pool, "sales_orders", "Sales order", id).await
    }

    pub async fn list_sales_orders(&self, page: PageRequest) -> DbResult<Page<SalesOrder>> {
        fetch_page(&self.pool, "sales_orders", page).await
    }

    pub async fn sales_order_items(&self, id: i64) -> DbResult<Vec<LineItem>> {
        self.items(DocumentKind::SalesOrder, id).await
    }

    pub async fn add_sales_order_item(&self, id: i64, item: NewLineItem) -> DbResult<SalesOrder> {
        self.add_item(DocumentKind::SalesOrder, id, item).await?;
        self.get_sales_order(id).await
    }

    pub async fn remove_sales_order_item(&self, id: i64, item_id: i64) -> DbResult<SalesOrder> {
        self.remove_item(DocumentKind::SalesOrder, id, item_id).await?;
        self.get_sales_order(id).await
    }

    // =========================================================================
    // Quotes
    // =========================================================================

    /// Creates a quote with its items and computed totals.
    pub async fn create_quote(&self, new: NewQuote) -> DbResult<Quote> {
        validate_charges(new.tax_rate, new.shipping, new.discount)?;
        if let Some(valid_until) = new.valid_until {
            if valid_until < new.quote_date {
                return Err(ValidationError::InvalidRange {
                    field: "valid_until".to_string(),
                }
                .into());
            }
        }
        for item in &new.items {
            item.validate()?;
        }

        let mut tx = self.pool.begin().await?;
        let number =
            codes::assign_code(&mut tx, CodeSeries::Quote, new.quote_number.as_deref()).await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO quotes (
                quote_number, customer_id, quote_date, valid_until, status,
                tax_rate, shipping, discount, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
            RETURNING id
            "#,
        )
        .bind(&number)
        .bind(new.customer_id)
        .bind(new.quote_date)
        .bind(new.valid_until)
        .bind(QuoteStatus::Draft)
        .bind(new.tax_rate)
        .bind(new.shipping)
        .bind(new.discount)
        .bind(&new.notes)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .duplicate_value(&number)?;

        documents::insert_items_and_recalculate(&mut tx, DocumentKind::Quote, id, &new.items)
            .await?;
        let quote: Quote = fetch_live(&mut tx, "quotes", "Quote", id).await?;
        tx.commit().await?;

        info!(quote_number = %quote.quote_number, total = %quote.total, "Quote created");
        Ok(quote)
    }

    pub async fn get_quote(&self, id: i64) -> DbResult<Quote> {
        fetch_live_from_pool(&self.pool, "quotes", "Quote", id).await
    }

    pub async fn list_quotes(&self, page: PageRequest) -> DbResult<Page<Quote>> {
        fetch_page(&self.pool, "quotes", page).await
    }

    pub async fn quote_items(&self, id: i64) -> DbResult<Vec<LineItem>> {
        self.items(DocumentKind::Quote, id).await
    }

    pub async fn add_quote_item(&self, id: i64, item: NewLineItem) -> DbResult<Quote> {
        self.add_item(DocumentKind::Quote, id, item).await?;
        self.get_quote(id).await
    }

    pub async fn remove_quote_item(&self, id: i64, item_id: i64) -> DbResult<Quote> {
        self.remove_item(DocumentKind::Quote, id, item_id).await?;
        self.get_quote(id).await
    }

    // =========================================================================
    // Shared item plumbing
    // =========================================================================

    async fn items(&self, kind: DocumentKind, id: i64) -> DbResult<Vec<LineItem>> {
        let mut conn = self.pool.acquire().await?;
        documents::ensure_document(&mut conn, kind, id).await?;
        documents::list_line_items(&mut conn, kind, id).await
    }

    async fn add_item(&self, kind: DocumentKind, id: i64, item: NewLineItem) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        documents::ensure_document(&mut tx, kind, id).await?;
        documents::insert_line_item(&mut tx, kind, id, &item).await?;
        documents::recalculate_totals(&mut tx, kind, id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn remove_item(&self, kind: DocumentKind, id: i64, item_id: i64) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        documents::ensure_document(&mut tx, kind, id).await?;
        documents::remove_line_item(&mut tx, kind, id, item_id).await?;
        documents::recalculate_totals(&mut tx, kind, id).await?;
        tx.commit().await?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::{Database, DbConfig};
    use chrono::NaiveDate;
    use keystone_core::{CoreError, Money, Percentage};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn customer(name: &str, code: Option<&str>) -> NewCustomer {
        NewCustomer {
            customer_code: code.map(str::to_string),
            name: name.to_string(),
            email: Some("buyer@example.com".to_string()),
            phone: None,
            address: None,
            credit_limit: Money::from_cents(500_000),
        }
    }

    fn line(description: &str, quantity: i64, unit_price: i64) -> NewLineItem {
        NewLineItem {
            product_id: None,
            description: description.to_string(),
            quantity,
            unit_price: Money::from_cents(unit_price),
            discount_bps: Percentage::zero(),
            discount_amount: Money::zero(),
        }
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_customer_codes_are_sequential() {
        let db = db().await;
        let sales = db.sales();
        let a = sales.create_customer(customer("Acme", None)).await.unwrap();
        let b = sales.create_customer(customer("Globex", None)).await.unwrap();
        assert_eq!(a.customer_code, "CUST000001");
        assert_eq!(b.customer_code, "CUST000002");
        assert_eq!(a.available_credit().cents(), 500_000);
    }

    #[tokio::test]
    async fn test_explicit_customer_code_conflict() {
        let db = db().await;
        let sales = db.sales();
        sales
            .create_customer(customer("Acme", Some("CUST000007")))
            .await
            .unwrap();
        let err = sales
            .create_customer(customer("Other", Some("CUST000007")))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref value, .. } if value == "CUST000007"));

        // Generated codes continue past the explicit one.
        let next = sales.create_customer(customer("Next", None)).await.unwrap();
        assert_eq!(next.customer_code, "CUST000008");
    }

    #[tokio::test]
    async fn test_explicit_code_in_wrong_format() {
        let db = db().await;
        let err = db
            .sales()
            .create_customer(customer("Acme", Some("C-1")))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::CodeMismatch { .. })));
    }

    #[tokio::test]
    async fn test_update_customer_keeps_code() {
        let db = db().await;
        let sales = db.sales();
        let created = sales.create_customer(customer("Acme", None)).await.unwrap();
        let updated = sales
            .update_customer(
                created.id,
                UpdateCustomer {
                    name: Some("Acme Corp".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Acme Corp");
        assert_eq!(updated.customer_code, created.customer_code);
        assert_eq!(updated.email, created.email);
    }

    #[tokio::test]
    async fn test_sales_order_totals_follow_items() {
        let db = db().await;
        let sales = db.sales();
        let c = sales.create_customer(customer("Acme", None)).await.unwrap();

        let order = sales
            .create_sales_order(NewSalesOrder {
                order_number: None,
                customer_id: c.id,
                quote_id: None,
                order_date: date("2024-03-01"),
                delivery_date: None,
                tax_rate: Percentage::from_bps(850),
                shipping: Money::zero(),
                discount: Money::zero(),
                notes: None,
                items: vec![line("Widget", 4, 2500)],
            })
            .await
            .unwrap();
        assert_eq!(order.order_number, "ORD000001");
        assert_eq!(order.subtotal.cents(), 10_000);
        assert_eq!(order.total.cents(), 10_850);

        let order = sales
            .add_sales_order_item(order.id, line("Gadget", 1, 1000))
            .await
            .unwrap();
        assert_eq!(order.subtotal.cents(), 11_000);
        assert_eq!(order.tax_amount.cents(), 935);

        let items = sales.sales_order_items(order.id).await.unwrap();
        let order = sales
            .remove_sales_order_item(order.id, items[0].id)
            .await
            .unwrap();
        assert_eq!(order.subtotal.cents(), 1000);
        assert_eq!(order.total.cents(), 1085);
    }

    #[tokio::test]
    async fn test_quote_validity_range() {
        let db = db().await;
        let sales = db.sales();
        let c = sales.create_customer(customer("Acme", None)).await.unwrap();
        let err = sales
            .create_quote(NewQuote {
                quote_number: None,
                customer_id: c.id,
                quote_date: date("2024-03-10"),
                valid_until: Some(date("2024-03-01")),
                tax_rate: Percentage::zero(),
                shipping: Money::zero(),
                discount: Money::zero(),
                notes: None,
                items: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_empty_quote_has_zero_totals() {
        let db = db().await;
        let sales = db.sales();
        let c = sales.create_customer(customer("Acme", None)).await.unwrap();
        let quote = sales
            .create_quote(NewQuote {
                quote_number: None,
                customer_id: c.id,
                quote_date: date("2024-03-10"),
                valid_until: None,
                tax_rate: Percentage::from_bps(1000),
                shipping: Money::from_cents(500),
                discount: Money::zero(),
                notes: None,
                items: vec![],
            })
            .await
            .unwrap();
        assert_eq!(quote.quote_number, "QUO000001");
        assert!(quote.subtotal.is_zero());
        assert_eq!(quote.total.cents(), 500);
    }
}
