pub mod admin;
pub mod audit;
pub mod auth;
pub mod documents;
pub mod engagements;
pub mod health;
pub mod monitoring;
pub mod session;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                                  login (public)
/// /auth/refresh                                refresh (public)
/// /auth/logout                                 logout
/// /auth/me                                     current user
///
/// /users                                       organization users
/// /session/active-engagement                   get, set, clear
///
/// /engagements                                 dashboard, create
/// /engagements/archive                         completed engagements
/// /engagements/{id}                            get, update, delete
/// /engagements/{id}/complete                   complete (POST)
/// /engagements/{id}/team                       team view, step 1.5 assignment
/// /engagements/{id}/audit-report-scan          attach report scan (PUT)
/// /engagements/{id}/contract-scan              attach contract scan (POST)
///
/// /audit/steps                                 catalog
/// /audit/steps/{order}                         step working view
/// /audit/steps/{order}/actions/{key}/run       run catalog action (POST)
/// /audit/substeps/{id}/toggle                  toggle completion (POST)
/// /audit/substeps/{id}/files                   upload file (POST)
/// /procedure-files/{id}                        delete file
///
/// /documents                                   list by engagement
/// /documents/{id}                              update, delete
/// /documents/{id}/download                     download
/// /documents/zip                               ZIP export (POST)
/// /documents/generate                          render template (POST)
///
/// /monitoring/uploads                          progress grid
/// /metrics/team                                team metrics
///
/// /admin/users                                 create user (superuser)
/// /admin/steps, /admin/substeps, /admin/actions  catalog admin (superuser)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Authentication routes (login, refresh, logout, me).
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/session", session::router())
        .nest("/engagements", engagements::router())
        // Audit catalog, progress and substep uploads.
        .nest("/audit", audit::router())
        .nest("/procedure-files", audit::procedure_files_router())
        .nest("/documents", documents::router())
        .nest("/monitoring", monitoring::monitoring_router())
        .nest("/metrics", monitoring::metrics_router())
        // Superuser-only administration.
        .nest("/admin", admin::router())
}
