//! # Seed Data Generator
//!
//! Populates a database with a small, consistent data set for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./keystone_dev.db
//! cargo run -p keystone-db --bin seed
//!
//! # Specify database path
//! cargo run -p keystone-db --bin seed -- --db ./data/keystone.db
//! ```
//!
//! ## Generated Records
//! - Departments with acronym codes (HUMRES, FINACC, ...)
//! - Employees EMP000001.. across those departments
//! - Product categories, products and a warehouse
//! - Customers CUST000001.. and one invoice with a partial payment

use std::env;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use keystone_core::{
    Money, NewCustomer, NewDepartment, NewEmployee, NewInvoice, NewLineItem, NewPayment,
    NewProduct, NewProductCategory, NewWarehouse, PageRequest, PaymentMethod, Percentage,
    DEFAULT_SALES_TAX_BPS,
};
use keystone_db::{Database, DbConfig};
use tracing::{info, warn};

const DEPARTMENTS: &[&str] = &["Human Resources", "Finance Accounting", "Sales Marketing", "Operations"];

/// (first, last, salary in cents)
const EMPLOYEES: &[(&str, &str, i64)] = &[
    ("Amara", "Okafor", 620_000),
    ("Bruno", "Costa", 540_000),
    ("Chen", "Wei", 580_000),
    ("Dana", "Levi", 455_000),
    ("Emil", "Novak", 510_000),
    ("Farah", "Haddad", 600_000),
];

/// (category, [(sku, name, price cents, stock)])
const PRODUCTS: &[(&str, &[(&str, &str, i64, i64)])] = &[
    (
        "Office Supplies",
        &[
            ("PAPER-A4", "A4 Paper Ream", 650, 120),
            ("PEN-BLUE", "Ballpoint Pen Blue", 120, 400),
            ("STAPLER", "Desk Stapler", 1450, 8),
        ],
    ),
    (
        "Computer Hardware",
        &[
            ("MOUSE-USB", "USB Mouse", 1999, 35),
            ("KEYB-US", "Keyboard US Layout", 3499, 4),
            ("MON-24", "24in Monitor", 18_900, 12),
        ],
    ),
];

const CUSTOMERS: &[(&str, &str, i64)] = &[
    ("Northwind Traders", "accounts@northwind.example", 500_000),
    ("Contoso Ltd", "billing@contoso.example", 250_000),
    ("Fabrikam Inc", "ap@fabrikam.example", 1_000_000),
];

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seed=info,keystone_db=info".into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./keystone_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Keystone ERP Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./keystone_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(path = %db_path, "Connecting to database");
    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {}", db_path))?;

    let existing = db.sales().list_customers(PageRequest::default()).await?.total;
    if existing > 0 {
        warn!(customers = existing, "Database already seeded; delete the file to regenerate");
        return Ok(());
    }

    // Departments and employees
    let mut department_ids = Vec::new();
    for name in DEPARTMENTS {
        let department = db
            .hr()
            .create_department(NewDepartment {
                code: None,
                name: name.to_string(),
                description: None,
                manager_id: None,
                budget: Money::from_major_minor(250_000, 0),
            })
            .await
            .with_context(|| format!("department {}", name))?;
        info!(code = %department.code, "Department");
        department_ids.push(department.id);
    }

    let hire_date = Utc::now().date_naive() - Duration::days(400);
    for (idx, (first, last, salary)) in EMPLOYEES.iter().enumerate() {
        let employee = db
            .hr()
            .create_employee(NewEmployee {
                employee_number: None,
                first_name: first.to_string(),
                last_name: last.to_string(),
                email: format!("{}.{}@keystone.example", first, last).to_lowercase(),
                phone: None,
                hire_date,
                department_id: department_ids.get(idx % department_ids.len()).copied(),
                position_id: None,
                manager_id: None,
                base_salary: Money::from_cents(*salary),
                hourly_rate: Money::from_cents(salary / 160),
            })
            .await?;
        info!(number = %employee.employee_number, "Employee");
    }

    // Inventory
    let warehouse = db
        .inventory()
        .create_warehouse(NewWarehouse {
            code: None,
            name: "Main Warehouse".to_string(),
            address: None,
            manager_id: None,
        })
        .await?;
    info!(code = %warehouse.code, "Warehouse");

    let mut first_product = None;
    for (category_name, products) in PRODUCTS {
        let category = db
            .inventory()
            .create_category(NewProductCategory {
                code: None,
                name: category_name.to_string(),
                description: None,
                parent_id: None,
            })
            .await?;
        for (sku, name, price, stock) in products.iter() {
            let product = db
                .inventory()
                .create_product(NewProduct {
                    sku: sku.to_string(),
                    name: name.to_string(),
                    description: None,
                    category_id: Some(category.id),
                    unit_price: Money::from_cents(*price),
                    cost_price: Money::from_cents(price * 60 / 100),
                    quantity_on_hand: *stock,
                    reorder_level: 10,
                })
                .await?;
            first_product.get_or_insert(product);
        }
    }

    // Customers
    let mut customer_ids = Vec::new();
    for (name, email, limit) in CUSTOMERS {
        let customer = db
            .sales()
            .create_customer(NewCustomer {
                customer_code: None,
                name: name.to_string(),
                email: Some(email.to_string()),
                phone: None,
                address: None,
                credit_limit: Money::from_cents(*limit),
            })
            .await?;
        info!(code = %customer.customer_code, "Customer");
        customer_ids.push(customer.id);
    }

    // One invoice, half paid
    let today = Utc::now().date_naive();
    let product = first_product.context("no products seeded")?;
    let customer_id = *customer_ids.first().context("no customers seeded")?;
    let invoice = db
        .finance()
        .create_invoice(NewInvoice {
            invoice_number: None,
            customer_id,
            sales_order_id: None,
            invoice_date: today,
            due_date: today + Duration::days(30),
            tax_rate: Percentage::from_bps(DEFAULT_SALES_TAX_BPS),
            shipping: Money::from_major_minor(5, 0),
            discount: Money::zero(),
            notes: Some("Seeded sample invoice".to_string()),
            items: vec![NewLineItem {
                product_id: Some(product.id),
                description: product.name.clone(),
                quantity: 10,
                unit_price: product.unit_price,
                discount_bps: Percentage::zero(),
                discount_amount: Money::zero(),
            }],
        })
        .await?;

    let half = Money::from_cents(invoice.total.cents() / 2);
    db.finance()
        .record_payment(NewPayment {
            payment_number: None,
            invoice_id: invoice.id,
            payment_date: today,
            amount: half,
            method: PaymentMethod::BankTransfer,
            reference: None,
            notes: None,
        })
        .await?;
    info!(number = %invoice.invoice_number, total = %invoice.total, paid = %half, "Invoice");

    db.close().await;
    info!("Seed complete");
    Ok(())
}
