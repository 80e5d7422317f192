//! Engagement documents (`engagement_documents`).

use auditdesk_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EngagementDocument {
    pub id: DbId,
    pub organization_id: DbId,
    pub engagement_id: DbId,
    /// May be shared with a procedure file or with sibling engagements.
    pub storage_key: String,
    pub original_name: String,
    pub doc_type: String,
    pub custom_label: String,
    pub uploaded_by: Option<DbId>,
    pub created_at: Timestamp,
}

pub struct CreateDocument {
    pub organization_id: DbId,
    pub engagement_id: DbId,
    pub storage_key: String,
    pub original_name: String,
    pub doc_type: String,
    pub custom_label: String,
    pub uploaded_by: Option<DbId>,
}

/// DTO for `PATCH /documents/{id}`. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDocument {
    pub doc_type: Option<String>,
    #[validate(length(max = 255))]
    pub custom_label: Option<String>,
}
