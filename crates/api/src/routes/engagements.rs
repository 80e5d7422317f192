//! Route definitions for the `/engagements` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{engagement, team};
use crate::state::AppState;

/// Routes mounted at `/engagements`.
///
/// ```text
/// GET    /                         -> list
/// POST   /                         -> create (superuser)
/// GET    /archive                  -> archive (manager)
/// GET    /{id}                     -> get_by_id
/// PUT    /{id}                     -> update
/// DELETE /{id}                     -> delete (manager)
/// POST   /{id}/complete            -> complete (manager)
/// GET    /{id}/team                -> team::get_team
/// PUT    /{id}/team                -> team::assign_team (step 1.5)
/// PUT    /{id}/audit-report-scan   -> upload_audit_report_scan (multipart)
/// POST   /{id}/contract-scan       -> upload_contract_scan (multipart)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(engagement::list).post(engagement::create))
        .route("/archive", get(engagement::archive))
        .route(
            "/{id}",
            get(engagement::get_by_id)
                .put(engagement::update)
                .delete(engagement::delete),
        )
        .route("/{id}/complete", post(engagement::complete))
        .route("/{id}/team", get(team::get_team).put(team::assign_team))
        .route(
            "/{id}/audit-report-scan",
            put(engagement::upload_audit_report_scan),
        )
        .route("/{id}/contract-scan", post(engagement::upload_contract_scan))
}
