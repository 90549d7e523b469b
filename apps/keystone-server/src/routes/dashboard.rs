//! User counts and the most recent registrations.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use keystone_core::{Activity, Dashboard};

use crate::error::ApiResult;
use crate::AppState;

/// Registrations listed under recent activity.
const RECENT_ACTIVITY_LIMIT: i64 = 5;

pub fn routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

async fn dashboard(State(state): State<AppState>) -> ApiResult<Json<Dashboard>> {
    let users = state.db.users();
    let stats = users.stats().await?;
    let recent_activities = users
        .recent(RECENT_ACTIVITY_LIMIT)
        .await?
        .iter()
        .map(Activity::registered)
        .collect();

    Ok(Json(Dashboard {
        stats,
        recent_activities,
    }))
}
