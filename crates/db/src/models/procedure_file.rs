//! Files uploaded into a substep (`procedure_files`).

use auditdesk_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProcedureFile {
    pub id: DbId,
    pub engagement_id: DbId,
    /// The substep id rendered as text.
    pub procedure_code: String,
    pub title: String,
    pub storage_key: String,
    pub uploaded_by: Option<DbId>,
    pub created_at: Timestamp,
}

pub struct CreateProcedureFile {
    pub engagement_id: DbId,
    pub procedure_code: String,
    pub title: String,
    pub storage_key: String,
    pub uploaded_by: Option<DbId>,
}

/// Number of files per (engagement, substep code), for progress derivation.
#[derive(Debug, Clone, FromRow)]
pub struct ProcedureFileCount {
    pub engagement_id: DbId,
    pub procedure_code: String,
    pub file_count: i64,
}
