//! Global navigation search.

use axum::routing::post;
use axum::{Json, Router};
use keystone_core::search::{search, SearchEntry};
use keystone_core::validation::validate_search_query;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/search", post(global_search))
}

async fn global_search(Json(body): Json<SearchRequest>) -> ApiResult<Json<Vec<SearchEntry>>> {
    let query = validate_search_query(&body.query)?;
    Ok(Json(search(&query)))
}
