//! Handler for `/metrics/team`: workload and budget shares per team member.

use auditdesk_core::engagement::STATUS_ACTIVE;
use auditdesk_core::metrics::{
    aggregate_team_metrics, validate_date_range, EngagementFigures, MetricsSort, UserMetrics,
};
use auditdesk_core::types::Date;
use auditdesk_db::repositories::EngagementRepo;
use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::handlers::users::{user_refs, UserRef};
use crate::middleware::rbac::RequireManagerGroup;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MetricsParams {
    pub date_from: Option<Date>,
    pub date_to: Option<Date>,
    /// `projects`, `poi`, `contract`, `hours` or `budget`.
    pub sort: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MetricsCards {
    pub total: usize,
    pub active: usize,
    pub overdue: usize,
}

#[derive(Debug, Serialize)]
pub struct MemberMetrics {
    pub user: Option<UserRef>,
    #[serde(flatten)]
    pub metrics: UserMetrics,
}

#[derive(Debug, Serialize)]
pub struct TeamMetrics {
    pub cards: MetricsCards,
    pub sort: &'static str,
    pub rows: Vec<MemberMetrics>,
}

/// GET /api/v1/metrics/team
///
/// Engagements are selected by contract deadline within the date range.
pub async fn team(
    State(state): State<AppState>,
    RequireManagerGroup(user): RequireManagerGroup,
    Query(params): Query<MetricsParams>,
) -> AppResult<Json<DataResponse<TeamMetrics>>> {
    validate_date_range(params.date_from, params.date_to)?;
    let sort = MetricsSort::parse(params.sort.as_deref());

    let engagements = EngagementRepo::list_for_metrics(
        &state.pool,
        user.organization_id(),
        params.date_from,
        params.date_to,
    )
    .await?;

    let today = Utc::now().date_naive();
    let cards = MetricsCards {
        total: engagements.len(),
        active: engagements.iter().filter(|e| e.status == STATUS_ACTIVE).count(),
        overdue: engagements
            .iter()
            .filter(|e| e.contract_deadline.is_some_and(|d| d < today))
            .count(),
    };

    let figures: Vec<EngagementFigures> = engagements
        .iter()
        .map(|e| EngagementFigures {
            engagement_id: e.id,
            team: e.team(),
            planned_hours: e.planned_hours,
            requisites_amount: e.requisites_amount,
            poi: e.poi,
        })
        .collect();
    let metrics = aggregate_team_metrics(&figures, sort);

    let ids: Vec<_> = metrics.iter().map(|m| m.user_id).collect();
    let refs = user_refs(&state.pool, &ids).await?;
    let rows = metrics
        .into_iter()
        .map(|m| MemberMetrics {
            user: refs.get(&m.user_id).cloned(),
            metrics: m,
        })
        .collect();

    Ok(Json(DataResponse {
        data: TeamMetrics {
            cards,
            sort: sort.as_str(),
            rows,
        },
    }))
}
