//! Procurement routes: suppliers, requisitions, purchase orders, receipts.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use keystone_core::{
    GoodsReceipt, GoodsReceiptItem, NewGoodsReceipt, NewLineItem, NewPurchaseOrder,
    NewPurchaseRequisition, NewRequisitionItem, NewSupplier, Page, PurchaseOrder,
    PurchaseOrderLine, PurchaseRequisition, RequisitionItem, RequisitionStatus, Supplier,
    UpdateSupplier,
};
use serde::Deserialize;

use super::{Detail, PageQuery};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/suppliers", get(list_suppliers).post(create_supplier))
        .route("/suppliers/:id", get(get_supplier).put(update_supplier))
        .route("/requisitions", get(list_requisitions).post(create_requisition))
        .route("/requisitions/:id", get(get_requisition))
        .route("/requisitions/:id/items", post(add_requisition_item))
        .route("/requisitions/:id/items/:item_id", delete(remove_requisition_item))
        .route("/requisitions/:id/status", put(set_requisition_status))
        .route("/purchase-orders", get(list_purchase_orders).post(create_purchase_order))
        .route("/purchase-orders/:id", get(get_purchase_order))
        .route("/purchase-orders/:id/items", post(add_purchase_order_item))
        .route(
            "/purchase-orders/:id/items/:item_id",
            delete(remove_purchase_order_item),
        )
        .route("/purchase-orders/:id/send", post(send_purchase_order))
        .route("/goods-receipts", get(list_goods_receipts).post(create_goods_receipt))
        .route("/goods-receipts/:id", get(get_goods_receipt))
}

// =============================================================================
// Suppliers
// =============================================================================

async fn list_suppliers(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<Page<Supplier>>> {
    let page = q.request(state.config.items_per_page);
    Ok(Json(state.db.procurement().list_suppliers(page).await?))
}

async fn get_supplier(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Supplier>> {
    Ok(Json(state.db.procurement().get_supplier(id).await?))
}

async fn create_supplier(
    State(state): State<AppState>,
    user: AuthUser,
    Json(new): Json<NewSupplier>,
) -> ApiResult<(StatusCode, Json<Supplier>)> {
    user.require_write()?;
    let supplier = state.db.procurement().create_supplier(new).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

async fn update_supplier(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(update): Json<UpdateSupplier>,
) -> ApiResult<Json<Supplier>> {
    user.require_write()?;
    Ok(Json(state.db.procurement().update_supplier(id, update).await?))
}

// =============================================================================
// Requisitions
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RequisitionStatusBody {
    pub status: RequisitionStatus,
}

async fn list_requisitions(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<Page<PurchaseRequisition>>> {
    let page = q.request(state.config.items_per_page);
    Ok(Json(state.db.procurement().list_requisitions(page).await?))
}

async fn get_requisition(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Detail<PurchaseRequisition, RequisitionItem>>> {
    let procurement = state.db.procurement();
    Ok(Json(Detail {
        header: procurement.get_requisition(id).await?,
        items: procurement.requisition_items(id).await?,
    }))
}

async fn create_requisition(
    State(state): State<AppState>,
    user: AuthUser,
    Json(new): Json<NewPurchaseRequisition>,
) -> ApiResult<(StatusCode, Json<PurchaseRequisition>)> {
    user.require_write()?;
    let requisition = state.db.procurement().create_requisition(new).await?;
    Ok((StatusCode::CREATED, Json(requisition)))
}

async fn add_requisition_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(item): Json<NewRequisitionItem>,
) -> ApiResult<Json<PurchaseRequisition>> {
    user.require_write()?;
    Ok(Json(state.db.procurement().add_requisition_item(id, item).await?))
}

async fn remove_requisition_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, item_id)): Path<(i64, i64)>,
) -> ApiResult<Json<PurchaseRequisition>> {
    user.require_write()?;
    let requisition = state
        .db
        .procurement()
        .remove_requisition_item(id, item_id)
        .await?;
    Ok(Json(requisition))
}

async fn set_requisition_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(body): Json<RequisitionStatusBody>,
) -> ApiResult<Json<PurchaseRequisition>> {
    user.require_write()?;
    let requisition = state
        .db
        .procurement()
        .set_requisition_status(id, body.status)
        .await?;
    Ok(Json(requisition))
}

// =============================================================================
// Purchase Orders
// =============================================================================

async fn list_purchase_orders(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<Page<PurchaseOrder>>> {
    let page = q.request(state.config.items_per_page);
    Ok(Json(state.db.procurement().list_purchase_orders(page).await?))
}

async fn get_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Detail<PurchaseOrder, PurchaseOrderLine>>> {
    let procurement = state.db.procurement();
    Ok(Json(Detail {
        header: procurement.get_purchase_order(id).await?,
        items: procurement.purchase_order_lines(id).await?,
    }))
}

async fn create_purchase_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(new): Json<NewPurchaseOrder>,
) -> ApiResult<(StatusCode, Json<PurchaseOrder>)> {
    user.require_write()?;
    let order = state.db.procurement().create_purchase_order(new).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn add_purchase_order_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(item): Json<NewLineItem>,
) -> ApiResult<Json<PurchaseOrder>> {
    user.require_write()?;
    Ok(Json(state.db.procurement().add_purchase_order_item(id, item).await?))
}

async fn remove_purchase_order_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, item_id)): Path<(i64, i64)>,
) -> ApiResult<Json<PurchaseOrder>> {
    user.require_write()?;
    let order = state
        .db
        .procurement()
        .remove_purchase_order_item(id, item_id)
        .await?;
    Ok(Json(order))
}

async fn send_purchase_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<PurchaseOrder>> {
    user.require_write()?;
    Ok(Json(state.db.procurement().send_purchase_order(id).await?))
}

// =============================================================================
// Goods Receipts
// =============================================================================

async fn list_goods_receipts(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<Page<GoodsReceipt>>> {
    let page = q.request(state.config.items_per_page);
    Ok(Json(state.db.procurement().list_goods_receipts(page).await?))
}

async fn get_goods_receipt(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Detail<GoodsReceipt, GoodsReceiptItem>>> {
    let procurement = state.db.procurement();
    Ok(Json(Detail {
        header: procurement.get_goods_receipt(id).await?,
        items: procurement.goods_receipt_items(id).await?,
    }))
}

async fn create_goods_receipt(
    State(state): State<AppState>,
    user: AuthUser,
    Json(new): Json<NewGoodsReceipt>,
) -> ApiResult<(StatusCode, Json<GoodsReceipt>)> {
    user.require_write()?;
    let receipt = state.db.procurement().create_goods_receipt(new).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}
