//! Route definitions for the `/audit` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{catalog, uploads};
use crate::state::AppState;

/// Routes mounted at `/audit`.
///
/// ```text
/// GET  /steps                              -> list_steps
/// GET  /steps/{order}                      -> step_detail
/// POST /steps/{order}/actions/{key}/run    -> run_action
/// POST /substeps/{id}/toggle               -> toggle_substep (manager)
/// POST /substeps/{id}/files                -> uploads::upload_procedure_file (multipart)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/steps", get(catalog::list_steps))
        .route("/steps/{order}", get(catalog::step_detail))
        .route(
            "/steps/{order}/actions/{key}/run",
            post(catalog::run_action),
        )
        .route("/substeps/{id}/toggle", post(catalog::toggle_substep))
        .route("/substeps/{id}/files", post(uploads::upload_procedure_file))
}

/// Routes mounted at `/procedure-files`.
///
/// ```text
/// DELETE /{id}  -> uploads::delete_procedure_file
/// ```
pub fn procedure_files_router() -> Router<AppState> {
    Router::new().route(
        "/{id}",
        axum::routing::delete(uploads::delete_procedure_file),
    )
}
