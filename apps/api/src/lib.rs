//! # Cafe API
//!
//! REST server for cafe management: catalog, sales, invoices, expenses,
//! the cash register, reports and the public blog.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Cafe API Server                               │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  Identity      │  │  Catalog       │  │  Financial events          ││
//! │  │                │  │                │  │                            ││
//! │  │ • register     │  │ • products     │  │ • sales                    ││
//! │  │ • login / me   │  │ • low stock    │  │ • invoices                 ││
//! │  │ • staff users  │  │ • stock adjust │  │ • expenses, cash register  ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐                                │
//! │  │  Reports       │  │  Blog          │                                │
//! │  │ (read-only)    │  │ manage/public  │                                │
//! │  └────────────────┘  └────────────────┘                                │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      Infrastructure                               │  │
//! │  │                                                                   │  │
//! │  │  ┌──────────────┐  ┌──────────────────┐  ┌──────────────────────┐│  │
//! │  │  │  SQLite      │  │  JWT + Argon2    │  │  TraceLayer / CORS   ││  │
//! │  │  │  (cafe-db)   │  │  (auth.rs)       │  │  (tower-http)        ││  │
//! │  │  └──────────────┘  └──────────────────┘  └──────────────────────┘│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config`]: `cafe.toml` (or `$CAFE_CONFIG`) overridden by `CAFE_*`
//! environment variables.

pub mod auth;
pub mod config;
pub mod error;
pub mod response;
pub mod routes;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use cafe_db::Database;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

// Re-exports
pub use auth::{CurrentUser, JwtManager};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtManager>,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ApiConfig) -> Self {
        let jwt = JwtManager::new(config.jwt_secret.clone(), config.jwt_lifetime_secs);
        AppState {
            db,
            jwt: Arc::new(jwt),
            config: Arc::new(config),
        }
    }
}

/// Builds the full application: routes, tracing and CORS.
///
/// Used by the server binary and by the integration tests.
pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    routes::build_router()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &ApiConfig) -> CorsLayer {
    if config.cors_origins.is_empty() {
        return if config.is_production() {
            CorsLayer::new()
        } else {
            CorsLayer::permissive()
        };
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
