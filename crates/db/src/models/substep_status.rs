//! Manual completion rows (`engagement_substep_statuses`).

use auditdesk_core::progress::CompletionStatus;
use auditdesk_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use crate::models::status::StatusId;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EngagementSubstepStatus {
    pub id: DbId,
    pub engagement_id: DbId,
    pub substep_id: DbId,
    pub status_id: StatusId,
    pub completed_by: Option<DbId>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl EngagementSubstepStatus {
    pub fn completion(&self) -> CompletionStatus {
        CompletionStatus::from_id(self.status_id)
    }
}
