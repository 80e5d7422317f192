//! Handlers for `/users` (team pickers) and `/admin/users`.

use std::collections::HashMap;

use auditdesk_core::types::DbId;
use auditdesk_db::models::user::{CreateUser, UserResponse, UserSummary};
use auditdesk_db::repositories::UserRepo;
use auditdesk_db::DbPool;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::password::{hash_password, validate_password_strength};
use crate::error::{validate, AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireSuperuser;
use crate::response::DataResponse;
use crate::state::AppState;

/// A user reference as shown in lists and filter choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRef {
    pub id: DbId,
    pub username: String,
    pub display_name: String,
}

impl From<&UserSummary> for UserRef {
    fn from(user: &UserSummary) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name(),
        }
    }
}

/// References for the given ids, keyed by id. Unknown ids are absent.
pub(crate) async fn user_refs(pool: &DbPool, ids: &[DbId]) -> AppResult<HashMap<DbId, UserRef>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let summaries = UserRepo::summaries(pool, ids).await?;
    Ok(summaries.iter().map(|u| (u.id, UserRef::from(u))).collect())
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub password: String,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub groups: Vec<String>,
}

/// GET /api/v1/users
///
/// Users of the caller's organization, for team pickers.
pub async fn list(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<UserRef>>>> {
    let users = UserRepo::list_by_organization(&state.pool, auth_user.organization_id()).await?;
    Ok(Json(DataResponse {
        data: users.iter().map(UserRef::from).collect(),
    }))
}

/// POST /api/v1/admin/users
///
/// Create a user in the caller's organization and add it to `groups`.
pub async fn create(
    State(state): State<AppState>,
    RequireSuperuser(admin): RequireSuperuser,
    Json(input): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<UserResponse>>)> {
    validate(&input)?;
    validate_password_strength(&input.password).map_err(AppError::BadRequest)?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            organization_id: admin.organization_id(),
            username: input.username.trim().to_string(),
            email: input.email.trim().to_string(),
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            password_hash,
            is_superuser: input.is_superuser,
        },
    )
    .await?;

    for group in input.groups.iter().map(|g| g.trim()).filter(|g| !g.is_empty()) {
        UserRepo::add_to_group(&state.pool, user.id, group).await?;
    }
    let groups = UserRepo::group_names(&state.pool, user.id).await?;

    tracing::info!(user_id = user.id, created_by = admin.user_id(), "User created");
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: UserResponse::from_user(&user, groups),
        }),
    ))
}
