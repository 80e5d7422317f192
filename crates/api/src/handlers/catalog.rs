//! Handlers for the `/audit` resource: the step catalog, the per-step
//! working view, catalog actions and manual progress toggles.

use auditdesk_core::access::{
    action_allowed, can_manage_step15, can_modify_documents, can_toggle_progress, require, Actor,
};
use auditdesk_core::error::CoreError;
use auditdesk_core::progress::{
    procedure_code, step_redirect, substep_from_procedure_code, CompletionStatus, ProgressGrid,
    ProgressStatus,
};
use auditdesk_core::team::TeamAssignment;
use auditdesk_core::types::DbId;
use auditdesk_db::models::audit_catalog::{AuditStep, AuditSubstep, StepAction, StepWithSubsteps};
use auditdesk_db::models::procedure_file::ProcedureFile;
use auditdesk_db::repositories::{
    AuditStepRepo, AuditSubstepRepo, ProcedureFileRepo, StepActionRepo, SubstepStatusRepo,
};
use auditdesk_db::DbPool;
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::context::RequestContext;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Completion rows and file counts of the given engagements.
pub(crate) async fn load_progress(pool: &DbPool, engagement_ids: &[DbId]) -> AppResult<ProgressGrid> {
    let completed = SubstepStatusRepo::completed_pairs(pool, engagement_ids).await?;
    let counts = ProcedureFileRepo::counts(pool, engagement_ids).await?;
    Ok(ProgressGrid::build(
        completed,
        counts.into_iter().filter_map(|c| {
            substep_from_procedure_code(&c.procedure_code)
                .map(|substep_id| (c.engagement_id, substep_id, c.file_count))
        }),
    ))
}

fn step_not_found(order: i32) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "AuditStep",
        id: DbId::from(order),
    })
}

fn visible_actions(
    actions: Vec<StepAction>,
    actor: &Actor,
    team: Option<&TeamAssignment>,
) -> Vec<StepAction> {
    actions
        .into_iter()
        .filter(|a| a.enabled && action_allowed(actor, &a.allowed_groups, team))
        .collect()
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// GET /api/v1/audit/steps
pub async fn list_steps(
    State(state): State<AppState>,
    _auth_user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<StepWithSubsteps>>>> {
    let steps = AuditStepRepo::list_active_with_substeps(&state.pool).await?;
    Ok(Json(DataResponse { data: steps }))
}

#[derive(Debug, Serialize)]
pub struct SubstepView {
    #[serde(flatten)]
    pub substep: AuditSubstep,
    pub status: ProgressStatus,
    pub files: Vec<ProcedureFile>,
    pub actions: Vec<StepAction>,
}

#[derive(Debug, Serialize)]
pub struct StepDetail {
    pub step: AuditStep,
    /// `None` when no engagement is selected; statuses are then all idle.
    pub engagement_id: Option<DbId>,
    pub substeps: Vec<SubstepView>,
    pub actions: Vec<StepAction>,
    pub can_manage_step15: bool,
    pub can_toggle: bool,
    pub can_upload: bool,
}

/// GET /api/v1/audit/steps/{order}
///
/// One step as worked on for the active engagement: substeps with their
/// progress and files, plus the actions the caller may run.
pub async fn step_detail(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(order): Path<i32>,
) -> AppResult<Json<DataResponse<StepDetail>>> {
    let step = AuditStepRepo::find_active_by_order(&state.pool, order)
        .await?
        .ok_or_else(|| step_not_found(order))?;
    let substeps = AuditSubstepRepo::list_for_step(&state.pool, step.id).await?;
    let substep_ids: Vec<DbId> = substeps.iter().map(|s| s.id).collect();

    let engagement = ctx.active_engagement.as_ref();
    let team = engagement.map(|e| e.team());
    let grid = match engagement {
        Some(e) => load_progress(&state.pool, &[e.id]).await?,
        None => ProgressGrid::default(),
    };

    let mut substep_actions = visible_actions(
        StepActionRepo::list_for_substeps(&state.pool, &substep_ids).await?,
        &ctx.actor,
        team.as_ref(),
    );
    let step_actions = visible_actions(
        StepActionRepo::list_for_step(&state.pool, step.id).await?,
        &ctx.actor,
        team.as_ref(),
    );

    let mut views = Vec::with_capacity(substeps.len());
    for substep in substeps {
        let (status, files) = match engagement {
            Some(e) => (
                grid.status(e.id, substep.id),
                ProcedureFileRepo::list_for_substep(&state.pool, e.id, &procedure_code(substep.id))
                    .await?,
            ),
            None => (ProgressStatus::Idle, Vec::new()),
        };
        let (own, rest): (Vec<_>, Vec<_>) = substep_actions
            .into_iter()
            .partition(|a| a.substep_id == Some(substep.id));
        substep_actions = rest;
        views.push(SubstepView {
            substep,
            status,
            files,
            actions: own,
        });
    }

    let can_upload = team
        .as_ref()
        .is_some_and(|t| can_modify_documents(&ctx.actor, t));
    Ok(Json(DataResponse {
        data: StepDetail {
            step,
            engagement_id: engagement.map(|e| e.id),
            substeps: views,
            actions: step_actions,
            can_manage_step15: can_manage_step15(&ctx.actor),
            can_toggle: can_toggle_progress(&ctx.actor),
            can_upload,
        },
    }))
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ActionRun {
    pub action: String,
    pub step_order: i32,
    pub engagement_id: Option<DbId>,
    pub status: &'static str,
}

/// POST /api/v1/audit/steps/{order}/actions/{key}/run
///
/// Actions carry no server-side behavior of their own; a permitted run is
/// acknowledged and logged.
pub async fn run_action(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path((order, key)): Path<(i32, String)>,
) -> AppResult<Json<DataResponse<ActionRun>>> {
    let step = AuditStepRepo::find_active_by_order(&state.pool, order)
        .await?
        .ok_or_else(|| step_not_found(order))?;
    let action = StepActionRepo::find_enabled_for_step(&state.pool, step.id, &key)
        .await?
        .ok_or(AppError::Database(sqlx::Error::RowNotFound))?;

    let team = ctx.active_engagement.as_ref().map(|e| e.team());
    require(
        action_allowed(&ctx.actor, &action.allowed_groups, team.as_ref()),
        "You are not allowed to run this action",
    )?;

    let engagement_id = ctx.active_engagement.as_ref().map(|e| e.id);
    tracing::info!(
        action = %action.key,
        step_order = order,
        engagement_id,
        user_id = ctx.actor.user_id,
        "Step action run"
    );
    Ok(Json(DataResponse {
        data: ActionRun {
            action: action.key,
            step_order: order,
            engagement_id,
            status: "accepted",
        },
    }))
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub substep_id: DbId,
    pub step_order: i32,
    pub status: CompletionStatus,
    pub redirect_to: String,
}

/// POST /api/v1/audit/substeps/{id}/toggle
///
/// Flip the manual completion flag of a substep for the active engagement.
pub async fn toggle_substep(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(substep_id): Path<DbId>,
) -> AppResult<Json<DataResponse<ToggleResponse>>> {
    require(
        can_toggle_progress(&ctx.actor),
        "Only a manager or superuser can change progress",
    )?;
    let engagement = ctx.require_engagement()?;
    let substep = AuditSubstepRepo::find_active_with_step(&state.pool, substep_id)
        .await?
        .ok_or_else(|| AppError::not_found("AuditSubstep", substep_id))?;

    let row = SubstepStatusRepo::toggle(&state.pool, engagement.id, substep.id, ctx.actor.user_id)
        .await?;
    let status = row.completion();
    tracing::info!(
        engagement_id = engagement.id,
        substep_id = substep.id,
        user_id = ctx.actor.user_id,
        status = ?status,
        "Substep progress toggled"
    );

    Ok(Json(DataResponse {
        data: ToggleResponse {
            substep_id: substep.id,
            step_order: substep.step_order,
            status,
            redirect_to: step_redirect(substep.step_order, substep.id),
        },
    }))
}
