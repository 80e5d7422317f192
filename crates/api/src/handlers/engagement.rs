//! Handlers for the `/engagements` resource.

use auditdesk_core::access::{
    can_complete_engagement, can_create_engagement, can_delete_engagement, require,
    require_edit, require_view,
};
use auditdesk_core::documents::DOC_TYPE_AGREEMENT;
use auditdesk_core::engagement::{check_completion, validate_engagement};
use auditdesk_core::error::{CoreError, FieldViolation};
use auditdesk_core::team::TeamAssignment;
use auditdesk_core::types::DbId;
use auditdesk_core::uploads::{validate_contract_scan, validate_upload_size};
use auditdesk_db::models::document::{CreateDocument, EngagementDocument};
use auditdesk_db::models::engagement::{DashboardFilter, EngagementInput, EngagementResponse};
use auditdesk_db::repositories::{DocumentRepo, EngagementRepo, UserRepo};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::context::{engagement_in_org, visible_to};
use crate::error::{validate, AppError, AppResult};
use crate::handlers::uploads::{read_file_field, release_storage_key};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireManager;
use crate::response::DataResponse;
use crate::state::AppState;

/// Reject a team naming users outside the organization.
pub(crate) async fn ensure_team_in_org(
    state: &AppState,
    organization_id: DbId,
    team: &TeamAssignment,
) -> AppResult<()> {
    let members = team.distinct_members();
    if UserRepo::all_in_organization(&state.pool, organization_id, &members).await? {
        return Ok(());
    }
    Err(AppError::Core(CoreError::InvalidFields(vec![FieldViolation::new(
        "team",
        "Team members must belong to the organization",
    )])))
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// POST /api/v1/engagements
///
/// Only the two leads of the submitted team are kept. An engagement joining
/// an existing contract takes the contract's team and its agreement
/// documents.
pub async fn create(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<EngagementInput>,
) -> AppResult<(StatusCode, Json<DataResponse<EngagementResponse>>)> {
    let actor = &auth_user.actor;
    require(
        can_create_engagement(actor),
        "Only a superuser can create engagements",
    )?;

    let input = input.normalized();
    validate(&input)?;
    validate_engagement(&input.check(), None)?;

    let team = TeamAssignment::for_creation(input.manager_id, input.qa_manager_id);
    ensure_team_in_org(&state, actor.organization_id, &team).await?;

    let engagement = EngagementRepo::create(&state.pool, actor.organization_id, &input, team).await?;

    let siblings = EngagementRepo::sibling_ids(&state.pool, &engagement).await?;
    if !siblings.is_empty() {
        let copied = DocumentRepo::copy_agreements(&state.pool, engagement.id, &siblings).await?;
        tracing::info!(engagement_id = engagement.id, copied, "Copied sibling agreements");
    }

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: EngagementResponse::from(engagement),
        }),
    ))
}

/// GET /api/v1/engagements
///
/// Open engagements visible to the caller, newest first.
pub async fn list(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(filter): Query<DashboardFilter>,
) -> AppResult<Json<DataResponse<Vec<EngagementResponse>>>> {
    let actor = &auth_user.actor;
    let engagements =
        EngagementRepo::list_dashboard(&state.pool, actor.organization_id, visible_to(actor), &filter)
            .await?;
    Ok(Json(DataResponse {
        data: engagements.into_iter().map(EngagementResponse::from).collect(),
    }))
}

/// GET /api/v1/engagements/archive
pub async fn archive(
    State(state): State<AppState>,
    RequireManager(user): RequireManager,
) -> AppResult<Json<DataResponse<Vec<EngagementResponse>>>> {
    let engagements = EngagementRepo::list_archive(&state.pool, user.organization_id()).await?;
    Ok(Json(DataResponse {
        data: engagements.into_iter().map(EngagementResponse::from).collect(),
    }))
}

/// GET /api/v1/engagements/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<EngagementResponse>>> {
    let engagement = engagement_in_org(&state, &auth_user.actor, id).await?;
    require_view(&auth_user.actor, &engagement.team())?;
    Ok(Json(DataResponse {
        data: EngagementResponse::from(engagement),
    }))
}

/// PUT /api/v1/engagements/{id}
///
/// Full-form update. The leads come from the form; the other seven slots
/// keep their stored values.
pub async fn update(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<EngagementInput>,
) -> AppResult<Json<DataResponse<EngagementResponse>>> {
    let actor = &auth_user.actor;
    let stored = engagement_in_org(&state, actor, id).await?;
    let stored_team = stored.team();
    require_edit(actor, &stored_team)?;

    let input = input.normalized();
    validate(&input)?;
    validate_engagement(&input.check(), Some(&stored.choice_codes()))?;

    let team = TeamAssignment::with_leads(&stored_team, input.manager_id, input.qa_manager_id);
    ensure_team_in_org(&state, actor.organization_id, &team).await?;

    let updated = EngagementRepo::update(&state.pool, id, &input, team)
        .await?
        .ok_or_else(|| AppError::not_found("Engagement", id))?;

    Ok(Json(DataResponse {
        data: EngagementResponse::from(updated),
    }))
}

/// DELETE /api/v1/engagements/{id}
///
/// Stored files are removed once nothing else references them.
pub async fn delete(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let actor = &auth_user.actor;
    require(
        can_delete_engagement(actor),
        "Only a manager or superuser can delete engagements",
    )?;
    let engagement = engagement_in_org(&state, actor, id).await?;

    let mut keys: Vec<String> = DocumentRepo::list_for_engagement(&state.pool, id)
        .await?
        .into_iter()
        .map(|d| d.storage_key)
        .collect();
    keys.extend(engagement.audit_report_scan.clone());
    keys.sort();
    keys.dedup();

    if !EngagementRepo::delete(&state.pool, id).await? {
        return Err(AppError::not_found("Engagement", id));
    }

    let mut released = 0usize;
    for key in &keys {
        if release_storage_key(&state, key).await? {
            released += 1;
        }
    }
    tracing::info!(engagement_id = id, user_id = actor.user_id, released, "Engagement deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// POST /api/v1/engagements/{id}/complete
pub async fn complete(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<EngagementResponse>>> {
    let actor = &auth_user.actor;
    require(
        can_complete_engagement(actor),
        "Only a manager or superuser can complete engagements",
    )?;
    let engagement = engagement_in_org(&state, actor, id).await?;
    check_completion(
        engagement.is_completed,
        engagement.cw_controls_done,
        engagement.audit_report_scan.as_deref(),
    )?;

    let completed = EngagementRepo::complete(&state.pool, id, actor.user_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict("Engagement is already completed".into()))
        })?;

    Ok(Json(DataResponse {
        data: EngagementResponse::from(completed),
    }))
}

// ---------------------------------------------------------------------------
// Scans
// ---------------------------------------------------------------------------

/// PUT /api/v1/engagements/{id}/audit-report-scan
///
/// Attach or replace the signed audit report. A replaced file is released.
pub async fn upload_audit_report_scan(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
    multipart: Multipart,
) -> AppResult<Json<DataResponse<EngagementResponse>>> {
    let actor = &auth_user.actor;
    let engagement = engagement_in_org(&state, actor, id).await?;
    require_edit(actor, &engagement.team())?;

    let upload = read_file_field(multipart).await?;
    validate_upload_size(upload.bytes.len(), state.config.max_upload_bytes)?;

    let key = state.storage.save(&upload.file_name, &upload.bytes).await?;
    let previous = match EngagementRepo::set_audit_report_scan(&state.pool, id, &key).await {
        Ok(previous) => previous,
        Err(e) => {
            if let Err(cleanup) = state.storage.delete(&key).await {
                tracing::warn!(key = %key, error = %cleanup, "Failed to remove orphaned scan");
            }
            return Err(e.into());
        }
    };
    if let Some(previous) = previous.filter(|p| *p != key) {
        release_storage_key(&state, &previous).await?;
    }

    tracing::info!(engagement_id = id, user_id = actor.user_id, key = %key, "Audit report scan attached");
    let refreshed = EngagementRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Engagement", id))?;
    Ok(Json(DataResponse {
        data: EngagementResponse::from(refreshed),
    }))
}

/// POST /api/v1/engagements/{id}/contract-scan
///
/// Store the signed contract once and record it as an `agreement` document
/// of the engagement and of every engagement sharing its contract.
pub async fn upload_contract_scan(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<Vec<EngagementDocument>>>)> {
    let actor = &auth_user.actor;
    let engagement = engagement_in_org(&state, actor, id).await?;
    require_edit(actor, &engagement.team())?;

    let upload = read_file_field(multipart).await?;
    validate_contract_scan(&upload.file_name, upload.bytes.len(), state.config.max_upload_bytes)?;

    let mut targets = vec![engagement.id];
    targets.extend(EngagementRepo::sibling_ids(&state.pool, &engagement).await?);

    let key = state.storage.save(&upload.file_name, &upload.bytes).await?;
    let template = CreateDocument {
        organization_id: engagement.organization_id,
        engagement_id: engagement.id,
        storage_key: key.clone(),
        original_name: upload.file_name.clone(),
        doc_type: DOC_TYPE_AGREEMENT.to_string(),
        custom_label: String::new(),
        uploaded_by: Some(actor.user_id),
    };
    let documents = match DocumentRepo::create_shared(&state.pool, &template, &targets).await {
        Ok(documents) => documents,
        Err(e) => {
            if let Err(cleanup) = state.storage.delete(&key).await {
                tracing::warn!(key = %key, error = %cleanup, "Failed to remove orphaned scan");
            }
            return Err(e.into());
        }
    };

    tracing::info!(
        engagement_id = id,
        user_id = actor.user_id,
        engagements = targets.len(),
        "Contract scan attached"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: documents })))
}
