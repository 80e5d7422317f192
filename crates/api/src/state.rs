use std::sync::Arc;

use crate::config::ServerConfig;
use crate::documents::renderer::DocumentRenderer;
use crate::storage::FileStorage;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: auditdesk_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Where uploaded and generated files live.
    pub storage: Arc<dyn FileStorage>,
    /// Turns a `.docx` template plus a field map into a document.
    pub renderer: Arc<dyn DocumentRenderer>,
}
