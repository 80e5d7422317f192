//! Shared query parameter types for API handlers.

use auditdesk_core::types::{Date, DbId};
use serde::Deserialize;

/// `?engagement_id=` for endpoints scoped to one engagement.
#[derive(Debug, Deserialize)]
pub struct EngagementParam {
    pub engagement_id: DbId,
}

/// `?date_from=&date_to=` in ISO format.
#[derive(Debug, Default, Deserialize)]
pub struct DateRangeParams {
    pub date_from: Option<Date>,
    pub date_to: Option<Date>,
}
