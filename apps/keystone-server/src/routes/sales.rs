//! Sales routes: customers, sales orders and quotes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use keystone_core::{
    Customer, LineItem, Money, NewCustomer, NewLineItem, NewQuote, NewSalesOrder, Page, Quote,
    SalesOrder, UpdateCustomer,
};
use serde::Serialize;

use super::{Detail, PageQuery};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/customers", get(list_customers).post(create_customer))
        .route("/customers/:id", get(get_customer).put(update_customer))
        .route("/orders", get(list_sales_orders).post(create_sales_order))
        .route("/orders/:id", get(get_sales_order))
        .route("/orders/:id/items", post(add_sales_order_item))
        .route("/orders/:id/items/:item_id", delete(remove_sales_order_item))
        .route("/quotes", get(list_quotes).post(create_quote))
        .route("/quotes/:id", get(get_quote))
        .route("/quotes/:id/items", post(add_quote_item))
        .route("/quotes/:id/items/:item_id", delete(remove_quote_item))
}

// =============================================================================
// Customers
// =============================================================================

/// Customer with the credit still available against its limit.
#[derive(Debug, Serialize)]
pub struct CustomerView {
    #[serde(flatten)]
    pub customer: Customer,
    pub available_credit: Money,
}

impl From<Customer> for CustomerView {
    fn from(customer: Customer) -> Self {
        let available_credit = customer.available_credit();
        CustomerView {
            customer,
            available_credit,
        }
    }
}

async fn list_customers(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<Page<Customer>>> {
    let page = q.request(state.config.items_per_page);
    Ok(Json(state.db.sales().list_customers(page).await?))
}

async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<CustomerView>> {
    let customer = state.db.sales().get_customer(id).await?;
    Ok(Json(customer.into()))
}

async fn create_customer(
    State(state): State<AppState>,
    user: AuthUser,
    Json(new): Json<NewCustomer>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    user.require_write()?;
    let customer = state.db.sales().create_customer(new).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

async fn update_customer(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(update): Json<UpdateCustomer>,
) -> ApiResult<Json<Customer>> {
    user.require_write()?;
    Ok(Json(state.db.sales().update_customer(id, update).await?))
}

// =============================================================================
// Sales Orders
// =============================================================================

async fn list_sales_orders(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<Page<SalesOrder>>> {
    let page = q.request(state.config.items_per_page);
    Ok(Json(state.db.sales().list_sales_orders(page).await?))
}

async fn get_sales_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Detail<SalesOrder, LineItem>>> {
    let sales = state.db.sales();
    Ok(Json(Detail {
        header: sales.get_sales_order(id).await?,
        items: sales.sales_order_items(id).await?,
    }))
}

async fn create_sales_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(new): Json<NewSalesOrder>,
) -> ApiResult<(StatusCode, Json<SalesOrder>)> {
    user.require_write()?;
    let order = state.db.sales().create_sales_order(new).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn add_sales_order_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(item): Json<NewLineItem>,
) -> ApiResult<Json<SalesOrder>> {
    user.require_write()?;
    Ok(Json(state.db.sales().add_sales_order_item(id, item).await?))
}

async fn remove_sales_order_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, item_id)): Path<(i64, i64)>,
) -> ApiResult<Json<SalesOrder>> {
    user.require_write()?;
    Ok(Json(state.db.sales().remove_sales_order_item(id, item_id).await?))
}

// =============================================================================
// Quotes
// =============================================================================

async fn list_quotes(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<Page<Quote>>> {
    let page = q.request(state.config.items_per_page);
    Ok(Json(state.db.sales().list_quotes(page).await?))
}

async fn get_quote(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Detail<Quote, LineItem>>> {
    let sales = state.db.sales();
    Ok(Json(Detail {
        header: sales.get_quote(id).await?,
        items: sales.quote_items(id).await?,
    }))
}

async fn create_quote(
    State(state): State<AppState>,
    user: AuthUser,
    Json(new): Json<NewQuote>,
) -> ApiResult<(StatusCode, Json<Quote>)> {
    user.require_write()?;
    let quote = state.db.sales().create_quote(new).await?;
    Ok((StatusCode::CREATED, Json(quote)))
}

async fn add_quote_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(item): Json<NewLineItem>,
) -> ApiResult<Json<Quote>> {
    user.require_write()?;
    Ok(Json(state.db.sales().add_quote_item(id, item).await?))
}

async fn remove_quote_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, item_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Quote>> {
    user.require_write()?;
    Ok(Json(state.db.sales().remove_quote_item(id, item_id).await?))
}
