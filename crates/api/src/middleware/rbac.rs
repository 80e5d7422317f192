//! Capability extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects requests whose actor lacks
//! the capability. Checks that depend on an engagement's team stay in the
//! handlers, next to the row they inspect.

use auditdesk_core::access::{can_view_all_engagements, can_view_metrics};
use auditdesk_core::error::CoreError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires a superuser. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn admin_only(RequireSuperuser(user): RequireSuperuser) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireSuperuser(pub AuthUser);

impl FromRequestParts<AppState> for RequireSuperuser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.actor.is_superuser {
            return Err(AppError::Core(CoreError::Forbidden(
                "Superuser required".into(),
            )));
        }
        Ok(RequireSuperuser(user))
    }
}

/// Requires a superuser or a member of the `manager` group.
pub struct RequireManager(pub AuthUser);

impl FromRequestParts<AppState> for RequireManager {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !can_view_all_engagements(&user.actor) {
            return Err(AppError::Core(CoreError::Forbidden(
                "Manager or superuser required".into(),
            )));
        }
        Ok(RequireManager(user))
    }
}

/// Requires membership of the `manager` group; superuser status alone does
/// not qualify.
pub struct RequireManagerGroup(pub AuthUser);

impl FromRequestParts<AppState> for RequireManagerGroup {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !can_view_metrics(&user.actor) {
            return Err(AppError::Core(CoreError::Forbidden(
                "Only the manager group can view team metrics".into(),
            )));
        }
        Ok(RequireManagerGroup(user))
    }
}
