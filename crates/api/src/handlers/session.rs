//! Handlers for `/session/active-engagement`: the engagement the user is
//! currently working in.

use auditdesk_core::error::CoreError;
use auditdesk_core::types::DbId;
use auditdesk_db::models::engagement::EngagementResponse;
use auditdesk_db::repositories::{ActiveEngagementRepo, EngagementRepo};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::context::{visible_to, RequestContext};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SetActiveEngagement {
    pub engagement_id: DbId,
}

/// GET /api/v1/session/active-engagement
///
/// `data` is null when nothing is selected or the selection went stale.
pub async fn get(ctx: RequestContext) -> AppResult<Json<DataResponse<Option<EngagementResponse>>>> {
    Ok(Json(DataResponse {
        data: ctx.active_engagement.map(EngagementResponse::from),
    }))
}

/// PUT /api/v1/session/active-engagement
pub async fn set(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<SetActiveEngagement>,
) -> AppResult<Json<DataResponse<EngagementResponse>>> {
    let actor = &auth_user.actor;
    let engagement = EngagementRepo::find_visible(
        &state.pool,
        actor.organization_id,
        input.engagement_id,
        visible_to(actor),
    )
    .await?
    .ok_or_else(|| AppError::not_found("Engagement", input.engagement_id))?;

    if engagement.is_completed {
        return Err(AppError::Core(CoreError::Conflict(
            "A completed engagement cannot be selected".into(),
        )));
    }

    ActiveEngagementRepo::set(&state.pool, actor.user_id, actor.organization_id, engagement.id)
        .await?;
    tracing::debug!(user_id = actor.user_id, engagement_id = engagement.id, "Active engagement set");

    Ok(Json(DataResponse {
        data: EngagementResponse::from(engagement),
    }))
}

/// DELETE /api/v1/session/active-engagement
pub async fn clear(State(state): State<AppState>, auth_user: AuthUser) -> AppResult<StatusCode> {
    ActiveEngagementRepo::clear(&state.pool, auth_user.user_id(), auth_user.organization_id())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
