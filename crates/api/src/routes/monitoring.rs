//! Route definitions for `/monitoring` and `/metrics`.

use axum::routing::get;
use axum::Router;

use crate::handlers::{metrics, monitoring};
use crate::state::AppState;

/// Routes mounted at `/monitoring`.
///
/// ```text
/// GET /uploads  -> monitoring::uploads (manager)
/// ```
pub fn monitoring_router() -> Router<AppState> {
    Router::new().route("/uploads", get(monitoring::uploads))
}

/// Routes mounted at `/metrics`.
///
/// ```text
/// GET /team  -> metrics::team (manager group)
/// ```
pub fn metrics_router() -> Router<AppState> {
    Router::new().route("/team", get(metrics::team))
}
