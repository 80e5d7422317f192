//! Request-scoped context: the actor plus the engagement they are working in.
//!
//! The active engagement is stored per (user, organization) and re-checked on
//! every request. A stored engagement that is no longer visible to the user,
//! or that has been completed, is dropped and cleared.

use auditdesk_core::access::{can_view_all_engagements, Actor};
use auditdesk_core::error::CoreError;
use auditdesk_core::types::DbId;
use auditdesk_db::models::engagement::Engagement;
use auditdesk_db::repositories::{ActiveEngagementRepo, EngagementRepo};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub actor: Actor,
    pub active_engagement: Option<Engagement>,
}

impl RequestContext {
    /// The active engagement, or a 400 asking the user to pick one.
    pub fn require_engagement(&self) -> AppResult<&Engagement> {
        self.active_engagement.as_ref().ok_or_else(|| {
            AppError::Core(CoreError::Validation(
                "Select an active engagement first".into(),
            ))
        })
    }
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        let active_engagement = resolve_active_engagement(state, &user.actor).await?;
        Ok(RequestContext {
            actor: user.actor,
            active_engagement,
        })
    }
}

/// `None` when the actor sees every engagement of the organization, else
/// the user id whose team membership limits visibility.
pub fn visible_to(actor: &Actor) -> Option<DbId> {
    if can_view_all_engagements(actor) {
        None
    } else {
        Some(actor.user_id)
    }
}

/// Load and revalidate the stored active engagement.
pub async fn resolve_active_engagement(
    state: &AppState,
    actor: &Actor,
) -> AppResult<Option<Engagement>> {
    let Some(stored) =
        ActiveEngagementRepo::get(&state.pool, actor.user_id, actor.organization_id).await?
    else {
        return Ok(None);
    };

    let engagement = EngagementRepo::find_visible(
        &state.pool,
        actor.organization_id,
        stored.engagement_id,
        visible_to(actor),
    )
    .await?
    .filter(|e| !e.is_completed);

    if engagement.is_none() {
        ActiveEngagementRepo::clear(&state.pool, actor.user_id, actor.organization_id).await?;
        tracing::info!(
            user_id = actor.user_id,
            engagement_id = stored.engagement_id,
            "Cleared stale active engagement"
        );
    }
    Ok(engagement)
}

/// An engagement of the actor's organization. Rows of other organizations
/// are reported as missing.
pub async fn engagement_in_org(state: &AppState, actor: &Actor, id: DbId) -> AppResult<Engagement> {
    EngagementRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|e| e.organization_id == actor.organization_id)
        .ok_or_else(|| AppError::not_found("Engagement", id))
}
