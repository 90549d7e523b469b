//! # Global Search
//!
//! Matches a query against the static navigation catalogue.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  query "inv" ──► lowercase ──► substring of title / description /       │
//! │                                category? ──► first 10 matches           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;

/// Most results returned for one query.
pub const MAX_SEARCH_RESULTS: usize = 10;

/// A navigation target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchEntry {
    pub title: &'static str,
    pub description: &'static str,
    pub url: &'static str,
    pub icon: &'static str,
    pub category: &'static str,
}

const fn entry(
    title: &'static str,
    description: &'static str,
    url: &'static str,
    icon: &'static str,
    category: &'static str,
) -> SearchEntry {
    SearchEntry {
        title,
        description,
        url,
        icon,
        category,
    }
}

/// Every searchable page, in display order.
pub const CATALOGUE: &[SearchEntry] = &[
    entry("Dashboard", "Main dashboard with statistics and overview", "/dashboard", "fas fa-tachometer-alt", "Navigation"),
    entry("Customers", "Manage customer information and contacts", "/sales/customers", "fas fa-users", "Sales"),
    entry("Products", "Product catalog and inventory management", "/inventory/products", "fas fa-box", "Inventory"),
    entry("Invoices", "Create and manage invoices", "/finance/invoices", "fas fa-file-invoice", "Finance"),
    entry("Employees", "Employee management and HR functions", "/hr/employees", "fas fa-user-tie", "HR"),
    entry("Payments", "Record customer payments against invoices", "/finance/payments", "fas fa-money-check", "Finance"),
    entry("Expenses", "Track and approve business expenses", "/finance/expenses", "fas fa-receipt", "Finance"),
    entry("Journal Entries", "General ledger journal entries", "/finance/journal-entries", "fas fa-book", "Finance"),
    entry("Budgets", "Budgets and variance against actuals", "/finance/budgets", "fas fa-chart-pie", "Finance"),
    entry("Attendance", "Daily clock-in and clock-out records", "/hr/attendance", "fas fa-clock", "HR"),
    entry("Leave Requests", "Request and approve time off", "/hr/leave-requests", "fas fa-calendar-minus", "HR"),
    entry("Payroll", "Pay periods, earnings and deductions", "/hr/payroll", "fas fa-money-bill-wave", "HR"),
    entry("Warehouses", "Storage locations", "/inventory/warehouses", "fas fa-warehouse", "Inventory"),
    entry("Stock Adjustments", "Correct recorded stock after a count", "/inventory/stock-adjustments", "fas fa-boxes", "Inventory"),
    entry("Suppliers", "Manage supplier information", "/procurement/suppliers", "fas fa-truck", "Procurement"),
    entry("Purchase Orders", "Order goods from suppliers", "/procurement/purchase-orders", "fas fa-shopping-cart", "Procurement"),
    entry("Goods Receipts", "Receive goods against purchase orders", "/procurement/goods-receipts", "fas fa-dolly", "Procurement"),
    entry("Sales Orders", "Customer orders and fulfilment", "/sales/orders", "fas fa-shopping-bag", "Sales"),
    entry("Quotes", "Price quotes for customers", "/sales/quotes", "fas fa-file-alt", "Sales"),
    entry("Projects", "Projects, tasks and time tracking", "/projects", "fas fa-project-diagram", "Projects"),
];

impl SearchEntry {
    fn matches(&self, needle: &str) -> bool {
        [self.title, self.description, self.category]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

/// Returns catalogue entries whose title, description or category contains
/// `query`, ignoring case.
///
/// An empty query matches everything. At most [`MAX_SEARCH_RESULTS`] are
/// returned.
///
/// ## Example
/// ```rust
/// use keystone_core::search::search;
///
/// let results = search("INVOICE");
/// assert_eq!(results[0].title, "Invoices");
/// ```
pub fn search(query: &str) -> Vec<SearchEntry> {
    let needle = query.trim().to_lowercase();
    CATALOGUE
        .iter()
        .filter(|entry| entry.matches(&needle))
        .take(MAX_SEARCH_RESULTS)
        .copied()
        .collect()
}
