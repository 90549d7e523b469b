//! Inventory routes: categories, products, warehouses, stock adjustments.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use keystone_core::{
    NewProduct, NewProductCategory, NewStockAdjustment, NewStockAdjustmentItem, NewWarehouse,
    Page, Product, ProductCategory, StockAdjustment, StockAdjustmentItem, UpdateProduct,
    Warehouse,
};

use super::{Detail, PageQuery};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/:id", get(get_category))
        .route("/products", get(list_products).post(create_product))
        .route("/products/low-stock", get(low_stock_products))
        .route("/products/:id", get(get_product).put(update_product))
        .route("/warehouses", get(list_warehouses).post(create_warehouse))
        .route("/warehouses/:id", get(get_warehouse))
        .route("/adjustments", get(list_adjustments).post(create_adjustment))
        .route("/adjustments/:id", get(get_adjustment))
        .route("/adjustments/:id/items", post(add_adjustment_item))
        .route("/adjustments/:id/items/:item_id", delete(remove_adjustment_item))
        .route("/adjustments/:id/apply", post(apply_adjustment))
}

// =============================================================================
// Categories & Products
// =============================================================================

async fn list_categories(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<Page<ProductCategory>>> {
    let page = q.request(state.config.items_per_page);
    Ok(Json(state.db.inventory().list_categories(page).await?))
}

async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ProductCategory>> {
    Ok(Json(state.db.inventory().get_category(id).await?))
}

async fn create_category(
    State(state): State<AppState>,
    user: AuthUser,
    Json(new): Json<NewProductCategory>,
) -> ApiResult<(StatusCode, Json<ProductCategory>)> {
    user.require_write()?;
    let category = state.db.inventory().create_category(new).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn list_products(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<Page<Product>>> {
    let page = q.request(state.config.items_per_page);
    Ok(Json(state.db.inventory().list_products(page).await?))
}

async fn low_stock_products(State(state): State<AppState>) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.db.inventory().low_stock_products().await?))
}

async fn get_product(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Product>> {
    Ok(Json(state.db.inventory().get_product(id).await?))
}

async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(new): Json<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    user.require_write()?;
    let product = state.db.inventory().create_product(new).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(update): Json<UpdateProduct>,
) -> ApiResult<Json<Product>> {
    user.require_write()?;
    Ok(Json(state.db.inventory().update_product(id, update).await?))
}

// =============================================================================
// Warehouses
// =============================================================================

async fn list_warehouses(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<Page<Warehouse>>> {
    let page = q.request(state.config.items_per_page);
    Ok(Json(state.db.inventory().list_warehouses(page).await?))
}

async fn get_warehouse(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Warehouse>> {
    Ok(Json(state.db.inventory().get_warehouse(id).await?))
}

async fn create_warehouse(
    State(state): State<AppState>,
    user: AuthUser,
    Json(new): Json<NewWarehouse>,
) -> ApiResult<(StatusCode, Json<Warehouse>)> {
    user.require_write()?;
    let warehouse = state.db.inventory().create_warehouse(new).await?;
    Ok((StatusCode::CREATED, Json(warehouse)))
}

// =============================================================================
// Stock Adjustments
// =============================================================================

async fn list_adjustments(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<Page<StockAdjustment>>> {
    let page = q.request(state.config.items_per_page);
    Ok(Json(state.db.inventory().list_adjustments(page).await?))
}

async fn get_adjustment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Detail<StockAdjustment, StockAdjustmentItem>>> {
    let inventory = state.db.inventory();
    Ok(Json(Detail {
        header: inventory.get_adjustment(id).await?,
        items: inventory.adjustment_items(id).await?,
    }))
}

async fn create_adjustment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(new): Json<NewStockAdjustment>,
) -> ApiResult<(StatusCode, Json<StockAdjustment>)> {
    user.require_write()?;
    let adjustment = state.db.inventory().create_adjustment(new).await?;
    Ok((StatusCode::CREATED, Json(adjustment)))
}

async fn add_adjustment_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(item): Json<NewStockAdjustmentItem>,
) -> ApiResult<(StatusCode, Json<StockAdjustmentItem>)> {
    user.require_write()?;
    let item = state.db.inventory().add_adjustment_item(id, item).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn remove_adjustment_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, item_id)): Path<(i64, i64)>,
) -> ApiResult<StatusCode> {
    user.require_write()?;
    state.db.inventory().remove_adjustment_item(id, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn apply_adjustment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<StockAdjustment>> {
    user.require_write()?;
    Ok(Json(state.db.inventory().apply_adjustment(id).await?))
}
