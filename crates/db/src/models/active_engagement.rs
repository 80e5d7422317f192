//! The engagement a user currently works in (`active_engagements`).

use auditdesk_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ActiveEngagement {
    pub user_id: DbId,
    pub organization_id: DbId,
    pub engagement_id: DbId,
    pub updated_at: Timestamp,
}
