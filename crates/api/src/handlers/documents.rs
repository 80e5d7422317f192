//! Handlers for the `/documents` resource: listing, editing, downloads and
//! the ZIP export.

use auditdesk_core::access::{
    can_modify_documents, require, require_view, user_in_engagement_team,
};
use auditdesk_core::documents::{
    archive_base_name, archive_entry_name, content_disposition, validate_doc_type,
};
use auditdesk_core::error::CoreError;
use auditdesk_core::types::DbId;
use auditdesk_db::models::document::{EngagementDocument, UpdateDocument};
use auditdesk_db::models::engagement::Engagement;
use auditdesk_db::repositories::DocumentRepo;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::context::engagement_in_org;
use crate::documents::archive::{build_zip, ArchiveEntry};
use crate::error::{validate, AppError, AppResult};
use crate::handlers::uploads::release_storage_key;
use crate::middleware::auth::AuthUser;
use crate::query::EngagementParam;
use crate::response::{content_type_for, Attachment, DataResponse, ZIP_CONTENT_TYPE};
use crate::state::AppState;
use crate::storage::StorageError;

async fn document_in_org(
    state: &AppState,
    auth_user: &AuthUser,
    id: DbId,
) -> AppResult<(EngagementDocument, Engagement)> {
    let document = DocumentRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|d| d.organization_id == auth_user.organization_id())
        .ok_or_else(|| AppError::not_found("EngagementDocument", id))?;
    let engagement = engagement_in_org(state, &auth_user.actor, document.engagement_id).await?;
    Ok((document, engagement))
}

/// GET /api/v1/documents?engagement_id=
pub async fn list(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<EngagementParam>,
) -> AppResult<Json<DataResponse<Vec<EngagementDocument>>>> {
    let engagement = engagement_in_org(&state, &auth_user.actor, params.engagement_id).await?;
    require_view(&auth_user.actor, &engagement.team())?;
    let documents = DocumentRepo::list_for_engagement(&state.pool, engagement.id).await?;
    Ok(Json(DataResponse { data: documents }))
}

/// PATCH /api/v1/documents/{id}
pub async fn update(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateDocument>,
) -> AppResult<Json<DataResponse<EngagementDocument>>> {
    let (_, engagement) = document_in_org(&state, &auth_user, id).await?;
    let actor = &auth_user.actor;
    require(
        actor.is_superuser || user_in_engagement_team(actor, &engagement.team()),
        "Only the engagement team can edit documents",
    )?;

    validate(&input)?;
    if let Some(doc_type) = input.doc_type.as_deref() {
        validate_doc_type(doc_type)?;
    }

    let updated = DocumentRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("EngagementDocument", id))?;
    Ok(Json(DataResponse { data: updated }))
}

/// DELETE /api/v1/documents/{id}
pub async fn delete(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let (document, engagement) = document_in_org(&state, &auth_user, id).await?;
    require(
        can_modify_documents(&auth_user.actor, &engagement.team()),
        "Only the engagement team or a manager can delete documents",
    )?;

    if !DocumentRepo::delete(&state.pool, id).await? {
        return Err(AppError::not_found("EngagementDocument", id));
    }
    let released = release_storage_key(&state, &document.storage_key).await?;
    tracing::info!(document_id = id, user_id = auth_user.user_id(), released, "Document deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/documents/{id}/download
pub async fn download(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Attachment> {
    let (document, engagement) = document_in_org(&state, &auth_user, id).await?;
    require_view(&auth_user.actor, &engagement.team())?;

    let bytes = match state.storage.read(&document.storage_key).await {
        Ok(bytes) => bytes,
        Err(StorageError::NotFound(_)) => {
            tracing::warn!(document_id = id, key = %document.storage_key, "Stored file missing");
            return Err(AppError::Core(CoreError::NotFound {
                entity: "Document file",
                id,
            }));
        }
        Err(e) => return Err(e.into()),
    };

    let file_name = archive_entry_name(&document.original_name, document.id);
    Ok(Attachment {
        content_type: content_type_for(&file_name),
        disposition: content_disposition(&file_name),
        bytes,
    })
}

#[derive(Debug, Deserialize)]
pub struct ZipRequest {
    pub engagement_id: DbId,
    /// Empty selects every document of the engagement.
    #[serde(default)]
    pub doc_ids: Vec<DbId>,
}

/// POST /api/v1/documents/zip
///
/// Files that cannot be read are left out. An archive with nothing readable
/// carries a README instead.
pub async fn zip(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<ZipRequest>,
) -> AppResult<Attachment> {
    let engagement = engagement_in_org(&state, &auth_user.actor, input.engagement_id).await?;
    require_view(&auth_user.actor, &engagement.team())?;

    let documents = if input.doc_ids.is_empty() {
        DocumentRepo::list_for_engagement(&state.pool, engagement.id).await?
    } else {
        DocumentRepo::find_many_for_engagement(&state.pool, engagement.id, &input.doc_ids).await?
    };

    let mut entries = Vec::with_capacity(documents.len());
    for document in &documents {
        match state.storage.read(&document.storage_key).await {
            Ok(bytes) => entries.push(ArchiveEntry {
                name: archive_entry_name(&document.original_name, document.id),
                bytes,
            }),
            Err(e) => tracing::warn!(
                document_id = document.id,
                key = %document.storage_key,
                error = %e,
                "Skipping unreadable document in archive"
            ),
        }
    }
    let added = entries.len();

    let bytes = tokio::task::spawn_blocking(move || build_zip(entries))
        .await
        .map_err(|e| AppError::InternalError(format!("Archive task failed: {e}")))?
        .map_err(|e| AppError::InternalError(format!("Archive error: {e}")))?;

    tracing::info!(
        engagement_id = engagement.id,
        requested = documents.len(),
        added,
        "Document archive built"
    );
    Ok(Attachment {
        content_type: ZIP_CONTENT_TYPE,
        disposition: content_disposition(&format!("{}.zip", archive_base_name(&engagement.name))),
        bytes,
    })
}
