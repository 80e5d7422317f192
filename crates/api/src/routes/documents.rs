//! Route definitions for the `/documents` resource.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::{documents, generation};
use crate::state::AppState;

/// Routes mounted at `/documents`.
///
/// ```text
/// GET    /?engagement_id=   -> list
/// PATCH  /{id}              -> update
/// DELETE /{id}              -> delete
/// GET    /{id}/download     -> download
/// POST   /zip               -> zip
/// POST   /generate          -> generation::generate
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(documents::list))
        .route("/zip", post(documents::zip))
        .route("/generate", post(generation::generate))
        .route("/{id}", patch(documents::update).delete(documents::delete))
        .route("/{id}/download", get(documents::download))
}
