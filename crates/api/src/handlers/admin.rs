//! Catalog administration under `/admin` (superuser only).

use auditdesk_db::models::audit_catalog::{
    AuditStep, AuditSubstep, CreateAuditStep, CreateAuditSubstep, CreateStepAction, StepAction,
};
use auditdesk_db::repositories::{AuditStepRepo, AuditSubstepRepo, StepActionRepo};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::error::{validate, AppResult};
use crate::middleware::rbac::RequireSuperuser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/admin/steps
pub async fn create_step(
    State(state): State<AppState>,
    RequireSuperuser(admin): RequireSuperuser,
    Json(input): Json<CreateAuditStep>,
) -> AppResult<(StatusCode, Json<DataResponse<AuditStep>>)> {
    validate(&input)?;
    let step = AuditStepRepo::create(&state.pool, &input).await?;
    tracing::info!(step_id = step.id, sort_order = step.sort_order, user_id = admin.user_id(), "Audit step created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: step })))
}

/// POST /api/v1/admin/substeps
///
/// Substep orders are unique within a step (409 on collision).
pub async fn create_substep(
    State(state): State<AppState>,
    RequireSuperuser(admin): RequireSuperuser,
    Json(input): Json<CreateAuditSubstep>,
) -> AppResult<(StatusCode, Json<DataResponse<AuditSubstep>>)> {
    validate(&input)?;
    let substep = AuditSubstepRepo::create(&state.pool, &input).await?;
    tracing::info!(
        substep_id = substep.id,
        step_id = substep.step_id,
        user_id = admin.user_id(),
        "Audit substep created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: substep })))
}

/// POST /api/v1/admin/actions
///
/// The owner (`step_id` or `substep_id`) fixes the scope. Keys are unique per
/// owner.
pub async fn create_action(
    State(state): State<AppState>,
    RequireSuperuser(admin): RequireSuperuser,
    Json(input): Json<CreateStepAction>,
) -> AppResult<(StatusCode, Json<DataResponse<StepAction>>)> {
    validate(&input)?;
    let scope = input.scope()?;
    input.validate_key()?;
    input.validate_placement()?;

    let action = StepActionRepo::create(&state.pool, &input, scope).await?;
    tracing::info!(action_id = action.id, key = %action.key, scope, user_id = admin.user_id(), "Step action created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: action })))
}
