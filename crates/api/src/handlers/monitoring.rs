//! Handler for `/monitoring/uploads`: the progress grid across engagements.

use std::collections::HashMap;

use auditdesk_core::choices::{label_for, EngagementSubject};
use auditdesk_core::engagement::{subject_options, ChoiceOption};
use auditdesk_core::metrics::validate_date_range;
use auditdesk_core::progress::ProgressStatus;
use auditdesk_core::types::{Date, DbId};
use auditdesk_db::models::audit_catalog::StepWithSubsteps;
use auditdesk_db::models::engagement::{MonitoringFilter, MonitoringSort};
use auditdesk_db::repositories::{AuditStepRepo, EngagementRepo, UserRepo};
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::context::visible_to;
use crate::error::AppResult;
use crate::handlers::catalog::load_progress;
use crate::handlers::users::{user_refs, UserRef};
use crate::middleware::rbac::RequireManager;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MonitoringParams {
    pub subject: Option<String>,
    pub manager_id: Option<DbId>,
    pub user_id: Option<DbId>,
    pub date_from: Option<Date>,
    pub date_to: Option<Date>,
    /// Defaults to `true`.
    pub active_only: Option<bool>,
    /// `deadline` or `manager`.
    pub sort: Option<String>,
    /// `asc` or `desc`.
    pub dir: Option<String>,
}

impl MonitoringParams {
    fn into_filter(self) -> MonitoringFilter {
        MonitoringFilter {
            sort: MonitoringSort::parse(self.sort.as_deref(), self.dir.as_deref()),
            subject: self.subject.filter(|s| !s.trim().is_empty()),
            manager_id: self.manager_id,
            user_id: self.user_id,
            date_from: self.date_from,
            date_to: self.date_to,
            active_only: self.active_only.unwrap_or(true),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MonitoringRow {
    pub engagement_id: DbId,
    pub name: String,
    pub display_label: String,
    pub subject_label: String,
    pub deadline: Option<Date>,
    pub manager: Option<UserRef>,
    pub team_count: usize,
    pub is_completed: bool,
    /// Status per substep id.
    pub statuses: HashMap<DbId, ProgressStatus>,
}

#[derive(Debug, Serialize)]
pub struct MonitoringChoices {
    pub subjects: Vec<ChoiceOption>,
    pub managers: Vec<UserRef>,
}

#[derive(Debug, Serialize)]
pub struct MonitoringView {
    pub steps: Vec<StepWithSubsteps>,
    pub rows: Vec<MonitoringRow>,
    pub choices: MonitoringChoices,
}

/// GET /api/v1/monitoring/uploads
pub async fn uploads(
    State(state): State<AppState>,
    RequireManager(user): RequireManager,
    Query(params): Query<MonitoringParams>,
) -> AppResult<Json<DataResponse<MonitoringView>>> {
    validate_date_range(params.date_from, params.date_to)?;
    let actor = &user.actor;
    let filter = params.into_filter();

    let engagements =
        EngagementRepo::list_for_monitoring(&state.pool, actor.organization_id, visible_to(actor), &filter)
            .await?;
    let steps = AuditStepRepo::list_active_with_substeps(&state.pool).await?;
    let substep_ids: Vec<DbId> = steps
        .iter()
        .flat_map(|s| s.substeps.iter().map(|ss| ss.id))
        .collect();

    let engagement_ids: Vec<DbId> = engagements.iter().map(|e| e.id).collect();
    let grid = load_progress(&state.pool, &engagement_ids).await?;

    let manager_ids: Vec<DbId> = engagements.iter().filter_map(|e| e.manager_id).collect();
    let managers = user_refs(&state.pool, &manager_ids).await?;

    let rows = engagements
        .iter()
        .map(|e| MonitoringRow {
            engagement_id: e.id,
            name: e.name.clone(),
            display_label: e.display_label(),
            subject_label: label_for::<EngagementSubject>(e.engagement_subject.as_deref()),
            deadline: e.effective_deadline(),
            manager: e.manager_id.and_then(|id| managers.get(&id).cloned()),
            team_count: e.team().distinct_members().len(),
            is_completed: e.is_completed,
            statuses: grid.row(e.id, &substep_ids),
        })
        .collect();

    let organization_users = UserRepo::list_by_organization(&state.pool, actor.organization_id).await?;
    Ok(Json(DataResponse {
        data: MonitoringView {
            steps,
            rows,
            choices: MonitoringChoices {
                subjects: subject_options(),
                managers: organization_users.iter().map(UserRef::from).collect(),
            },
        },
    }))
}
