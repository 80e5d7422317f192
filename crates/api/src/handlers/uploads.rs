//! Handlers for substep file uploads (`/audit/substeps/{id}/files`) and
//! procedure-file removal, plus the multipart and storage helpers shared
//! with the other upload endpoints.

use auditdesk_core::access::{can_modify_documents, require};
use auditdesk_core::documents::{step_label, DOC_TYPE_OTHER};
use auditdesk_core::hashing::upload_lock_key;
use auditdesk_core::progress::procedure_code;
use auditdesk_core::types::{DbId, Timestamp};
use auditdesk_core::uploads::{client_file_name, validate_upload_size};
use auditdesk_db::models::document::CreateDocument;
use auditdesk_db::models::procedure_file::{CreateProcedureFile, ProcedureFile};
use auditdesk_db::repositories::{AuditSubstepRepo, DocumentRepo, ProcedureFileRepo};
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::context::{engagement_in_org, RequestContext};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// The `file` field of a multipart form.
pub(crate) struct UploadedFile {
    /// Final path component of the client-supplied name.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Read the `file` field; other fields are ignored.
pub(crate) async fn read_file_field(mut multipart: Multipart) -> AppResult<UploadedFile> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = client_file_name(field.file_name().unwrap_or_default());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        return Ok(UploadedFile {
            file_name,
            bytes: bytes.to_vec(),
        });
    }
    Err(AppError::BadRequest("Missing required 'file' field".into()))
}

/// Delete a stored file once no record references its key. Returns whether
/// the file was deleted.
pub(crate) async fn release_storage_key(state: &AppState, key: &str) -> AppResult<bool> {
    if ProcedureFileRepo::storage_key_in_use(&state.pool, key).await? {
        return Ok(false);
    }
    state.storage.delete(key).await?;
    tracing::debug!(key = %key, "Released unreferenced stored file");
    Ok(true)
}

// ---------------------------------------------------------------------------
// Substep uploads
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct UploadedFileInfo {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub file: UploadedFileInfo,
    pub substep_id: DbId,
    pub step_order: i32,
    pub doc_label: String,
    /// `true` when an identical upload was already recorded moments ago and
    /// this request returned that record instead.
    pub duplicate: bool,
}

/// POST /api/v1/audit/substeps/{id}/files
///
/// Store a file against a substep of the active engagement. The file is
/// recorded twice under one storage key: as a procedure file (drives the
/// progress status) and as an `other` engagement document.
///
/// Concurrent or repeated submits of the same file by the same user are
/// serialized by a transaction-scoped advisory lock; an identical upload
/// inside the duplicate window returns the existing record with
/// `duplicate: true`.
pub async fn upload_procedure_file(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(substep_id): Path<DbId>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<UploadResponse>)> {
    let engagement = ctx.require_engagement()?;
    require(
        can_modify_documents(&ctx.actor, &engagement.team()),
        "Only the engagement team or a manager can upload files",
    )?;

    let substep = AuditSubstepRepo::find_active_with_step(&state.pool, substep_id)
        .await?
        .ok_or_else(|| AppError::not_found("AuditSubstep", substep_id))?;

    let upload = read_file_field(multipart).await?;
    validate_upload_size(upload.bytes.len(), state.config.max_upload_bytes)?;

    let user_id = ctx.actor.user_id;
    let code = procedure_code(substep.id);
    let doc_label = step_label(substep.step_order, substep.sort_order);

    let mut tx = state.pool.begin().await?;
    ProcedureFileRepo::lock_upload(
        &mut tx,
        upload_lock_key(engagement.id, substep.id, user_id, &upload.file_name),
    )
    .await?;

    if let Some(existing) = ProcedureFileRepo::find_recent_duplicate(
        &mut tx,
        engagement.id,
        &code,
        user_id,
        &upload.file_name,
        state.config.duplicate_window_secs,
    )
    .await?
    {
        tx.commit().await?;
        tracing::info!(
            engagement_id = engagement.id,
            substep_id = substep.id,
            user_id,
            file_id = existing.id,
            "Duplicate upload suppressed"
        );
        return Ok((
            StatusCode::OK,
            Json(upload_response(existing, substep.step_order, substep.id, doc_label, true)),
        ));
    }

    let key = state.storage.save(&upload.file_name, &upload.bytes).await?;

    let recorded = async {
        let file = ProcedureFileRepo::create(
            &mut tx,
            &CreateProcedureFile {
                engagement_id: engagement.id,
                procedure_code: code.clone(),
                title: upload.file_name.clone(),
                storage_key: key.clone(),
                uploaded_by: Some(user_id),
            },
        )
        .await?;
        DocumentRepo::create_in_tx(
            &mut tx,
            &CreateDocument {
                organization_id: engagement.organization_id,
                engagement_id: engagement.id,
                storage_key: key.clone(),
                original_name: upload.file_name.clone(),
                doc_type: DOC_TYPE_OTHER.to_string(),
                custom_label: doc_label.clone(),
                uploaded_by: Some(user_id),
            },
        )
        .await?;
        tx.commit().await?;
        Ok::<_, sqlx::Error>(file)
    }
    .await;

    let file = match recorded {
        Ok(file) => file,
        Err(e) => {
            if let Err(cleanup) = state.storage.delete(&key).await {
                tracing::warn!(key = %key, error = %cleanup, "Failed to remove orphaned upload");
            }
            return Err(e.into());
        }
    };

    tracing::info!(
        engagement_id = engagement.id,
        substep_id = substep.id,
        user_id,
        file_id = file.id,
        size = upload.bytes.len(),
        "Procedure file uploaded"
    );
    Ok((
        StatusCode::CREATED,
        Json(upload_response(file, substep.step_order, substep.id, doc_label, false)),
    ))
}

fn upload_response(
    file: ProcedureFile,
    step_order: i32,
    substep_id: DbId,
    doc_label: String,
    duplicate: bool,
) -> UploadResponse {
    UploadResponse {
        file: UploadedFileInfo {
            id: file.id,
            name: file.title,
            created_at: file.created_at,
        },
        substep_id,
        step_order,
        doc_label,
        duplicate,
    }
}

/// DELETE /api/v1/procedure-files/{id}
///
/// Remove the record; the stored file goes too unless a document still
/// references it.
pub async fn delete_procedure_file(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let file = ProcedureFileRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("ProcedureFile", id))?;
    let engagement = engagement_in_org(&state, &auth_user.actor, file.engagement_id).await?;
    require(
        can_modify_documents(&auth_user.actor, &engagement.team()),
        "Only the engagement team or a manager can delete files",
    )?;

    if !ProcedureFileRepo::delete(&state.pool, id).await? {
        return Err(AppError::not_found("ProcedureFile", id));
    }
    let released = release_storage_key(&state, &file.storage_key).await?;
    tracing::info!(
        file_id = id,
        engagement_id = engagement.id,
        user_id = auth_user.user_id(),
        released,
        "Procedure file deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}
