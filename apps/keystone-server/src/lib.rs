//! # Keystone Server
//!
//! JSON API over the Keystone ERP repositories.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Keystone Routes                                │
//! │                                                                         │
//! │  public                        behind require_auth                      │
//! │  ┌────────────────────┐       ┌───────────────────────────────────────┐│
//! │  │ GET  /health       │       │ /api/finance      /api/hr             ││
//! │  │ POST /api/auth/    │       │ /api/inventory    /api/procurement    ││
//! │  │      register      │       │ /api/sales        /api/projects       ││
//! │  │      login         │       │ /api/records      /api/search         ││
//! │  └────────────────────┘       │ /api/notifications /api/auth/me       ││
//! │                               │ /api/dashboard                        ││
//! │                               └───────────────────────────────────────┘│
//! │                                                                         │
//! │  AppState { db: Database, jwt: JwtManager, config: ServerConfig }       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables (prefix `KEYSTONE_`):
//! - `KEYSTONE_PORT` - HTTP port (default: 8080)
//! - `KEYSTONE_DATABASE_PATH` - SQLite file (default: ./keystone.db)
//! - `KEYSTONE_JWT_SECRET` - Secret for JWT signing
//! - `KEYSTONE_TOKEN_LIFETIME_SECS` - Access token lifetime (default: 3600)
//! - `KEYSTONE_ITEMS_PER_PAGE` - Default list page size (default: 20)

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::middleware;
use axum::Router;
use keystone_db::Database;
use tower_http::trace::TraceLayer;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};

use crate::auth::JwtManager;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtManager>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        let jwt = JwtManager::new(&config.jwt_secret, config.token_lifetime_secs);
        AppState {
            db,
            jwt: Arc::new(jwt),
            config: Arc::new(config),
        }
    }
}

/// Builds the full router with tracing and authentication layers.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .merge(routes::auth::protected_routes())
        .nest("/finance", routes::finance::routes())
        .nest("/hr", routes::hr::routes())
        .nest("/inventory", routes::inventory::routes())
        .nest("/procurement", routes::procurement::routes())
        .nest("/sales", routes::sales::routes())
        .nest("/projects", routes::projects::routes())
        .nest("/records", routes::records::routes())
        .merge(routes::search::routes())
        .merge(routes::notifications::routes())
        .merge(routes::dashboard::routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    let api = Router::new()
        .merge(routes::auth::public_routes())
        .merge(protected);

    Router::new()
        .merge(routes::health::routes())
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
