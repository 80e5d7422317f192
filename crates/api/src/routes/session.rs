//! Route definitions for the `/session` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::session;
use crate::state::AppState;

/// Routes mounted at `/session`.
///
/// ```text
/// GET    /active-engagement  -> get
/// PUT    /active-engagement  -> set
/// DELETE /active-engagement  -> clear
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/active-engagement",
        get(session::get).put(session::set).delete(session::clear),
    )
}
