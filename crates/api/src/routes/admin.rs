//! Route definitions for the `/admin` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::{admin, users};
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// All routes require a superuser (enforced by handler extractors).
///
/// ```text
/// POST /users     -> users::create
/// POST /steps     -> create_step
/// POST /substeps  -> create_substep
/// POST /actions   -> create_action
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", post(users::create))
        .route("/steps", post(admin::create_step))
        .route("/substeps", post(admin::create_substep))
        .route("/actions", post(admin::create_action))
}
