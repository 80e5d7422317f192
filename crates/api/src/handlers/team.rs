//! Handlers for `/engagements/{id}/team`: the team view with hour and budget
//! shares, and the team-assignment action of substep 1.5.

use auditdesk_core::access::{can_manage_step15, require_step15, require_view};
use auditdesk_core::documents::DocumentTemplate;
use auditdesk_core::error::{CoreError, FieldViolation};
use auditdesk_core::metrics::engagement_team_breakdown;
use auditdesk_core::team::{TeamAssignment, TeamRole};
use auditdesk_core::types::DbId;
use auditdesk_db::models::engagement::{Engagement, EngagementResponse};
use auditdesk_db::repositories::{AuditSubstepRepo, EngagementRepo};
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::context::engagement_in_org;
use crate::error::{AppError, AppResult};
use crate::handlers::engagement::ensure_team_in_org;
use crate::handlers::generation::generate_document;
use crate::handlers::users::{user_refs, UserRef};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct TeamRow {
    pub role: TeamRole,
    pub label: &'static str,
    pub user: Option<UserRef>,
    pub hours: Option<Decimal>,
    pub budget: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct TeamView {
    pub engagement_id: DbId,
    pub planned_hours: Option<Decimal>,
    pub requisites_amount: Option<Decimal>,
    pub rows: Vec<TeamRow>,
    pub can_manage_step15: bool,
}

async fn team_view(state: &AppState, engagement: &Engagement, can_manage: bool) -> AppResult<TeamView> {
    let team = engagement.team();
    let refs = user_refs(&state.pool, &team.distinct_members()).await?;
    let rows = engagement_team_breakdown(&team, engagement.planned_hours, engagement.requisites_amount)
        .into_iter()
        .map(|share| TeamRow {
            role: share.role,
            label: share.label,
            user: share.user_id.and_then(|id| refs.get(&id).cloned()),
            hours: share.hours,
            budget: share.budget,
        })
        .collect();

    Ok(TeamView {
        engagement_id: engagement.id,
        planned_hours: engagement.planned_hours,
        requisites_amount: engagement.requisites_amount,
        rows,
        can_manage_step15: can_manage,
    })
}

/// GET /api/v1/engagements/{id}/team
pub async fn get_team(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<TeamView>>> {
    let actor = &auth_user.actor;
    let engagement = engagement_in_org(&state, actor, id).await?;
    require_view(actor, &engagement.team())?;

    let view = team_view(&state, &engagement, can_manage_step15(actor)).await?;
    Ok(Json(DataResponse { data: view }))
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AssignTeamRequest {
    #[serde(flatten)]
    pub team: TeamAssignment,
    /// `order` or `reminder`: render that letter with the saved team.
    pub generate: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AssignTeamResponse {
    pub engagement: EngagementResponse,
    pub team: TeamView,
}

fn letter_template(value: Option<&str>) -> AppResult<Option<DocumentTemplate>> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    match DocumentTemplate::parse(value)? {
        t @ (DocumentTemplate::Order | DocumentTemplate::Reminder) => Ok(Some(t)),
        other => Err(AppError::BadRequest(format!(
            "The team action cannot generate '{}'",
            other.as_str()
        ))),
    }
}

/// PUT /api/v1/engagements/{id}/team
///
/// Replace all nine team slots and push the team to every engagement of the
/// same contract. With `generate`, the response is the rendered letter
/// instead of JSON. A failed render leaves the saved team in place.
pub async fn assign_team(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<AssignTeamRequest>,
) -> AppResult<Response> {
    let actor = &auth_user.actor;
    require_step15(actor)?;
    engagement_in_org(&state, actor, id).await?;

    let substep = AuditSubstepRepo::find_team_assignment(&state.pool)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Forbidden(
                "The team assignment step is not configured".into(),
            ))
        })?;

    let mut missing = Vec::new();
    if input.team.manager_id.is_none() {
        missing.push(FieldViolation::new("manager_id", "This field is required"));
    }
    if input.team.qa_manager_id.is_none() {
        missing.push(FieldViolation::new("qa_manager_id", "This field is required"));
    }
    CoreError::from_violations(missing)?;

    let template = letter_template(input.generate.as_deref())?;
    ensure_team_in_org(&state, actor.organization_id, &input.team).await?;

    let updated = EngagementRepo::assign_team(&state.pool, id, input.team)
        .await?
        .ok_or_else(|| AppError::not_found("Engagement", id))?;
    tracing::info!(engagement_id = id, user_id = actor.user_id, "Team assigned");

    if let Some(template) = template {
        let attachment = generate_document(&state, actor, &updated, template, Some(&substep)).await?;
        return Ok(attachment.into_response());
    }

    let team = team_view(&state, &updated, true).await?;
    Ok(Json(DataResponse {
        data: AssignTeamResponse {
            engagement: EngagementResponse::from(updated),
            team,
        },
    })
    .into_response())
}
