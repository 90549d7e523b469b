//! Notifications derived on request from overdue invoices, low stock and
//! leave requests waiting for a decision.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use keystone_core::{Notification, NotificationFeed, NotificationKind};

use crate::error::ApiResult;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/notifications", get(notifications))
}

async fn notifications(State(state): State<AppState>) -> ApiResult<Json<NotificationFeed>> {
    let today = Utc::now().date_naive();
    let mut feed = Vec::new();

    for invoice in state.db.finance().overdue_invoices(today).await? {
        feed.push(Notification {
            kind: NotificationKind::OverdueInvoice,
            title: format!("Invoice {} is overdue", invoice.invoice_number),
            message: format!(
                "{} days past due, {} outstanding",
                invoice.days_overdue(today),
                invoice.balance_due
            ),
            url: format!("/finance/invoices/{}", invoice.id),
            record_id: invoice.id,
        });
    }

    for product in state.db.inventory().low_stock_products().await? {
        feed.push(Notification {
            kind: NotificationKind::LowStock,
            title: format!("{} is low on stock", product.name),
            message: format!(
                "{} on hand, reorder level {}",
                product.quantity_on_hand, product.reorder_level
            ),
            url: format!("/inventory/products/{}", product.id),
            record_id: product.id,
        });
    }

    for request in state.db.hr().pending_leave_requests().await? {
        feed.push(Notification {
            kind: NotificationKind::PendingLeave,
            title: "Leave request awaiting approval".to_string(),
            message: format!(
                "{} day(s) from {} to {}",
                request.days, request.start_date, request.end_date
            ),
            url: format!("/hr/leave-requests/{}", request.id),
            record_id: request.id,
        });
    }

    Ok(Json(NotificationFeed::new(feed)))
}
