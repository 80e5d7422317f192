//! Document generation from `.docx` templates (`/documents/generate`).

use std::sync::Arc;

use auditdesk_core::access::{can_generate, require, Actor};
use auditdesk_core::documents::{
    build_field_map, content_disposition, step_label, DocumentTemplate, DOC_TYPE_REQUEST,
};
use auditdesk_core::progress::procedure_code;
use auditdesk_core::types::DbId;
use auditdesk_db::models::audit_catalog::SubstepWithStep;
use auditdesk_db::models::document::CreateDocument;
use auditdesk_db::models::engagement::Engagement;
use auditdesk_db::models::procedure_file::CreateProcedureFile;
use auditdesk_db::repositories::{AuditSubstepRepo, DocumentRepo, ProcedureFileRepo, UserRepo};
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::context::RequestContext;
use crate::error::{AppError, AppResult};
use crate::handlers::users::user_refs;
use crate::response::{Attachment, DOCX_CONTENT_TYPE};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub template: String,
    /// Substep the document belongs to; it is then also listed as a file of
    /// that substep.
    pub substep_id: Option<DbId>,
}

/// POST /api/v1/documents/generate
///
/// Render a template for the active engagement and return it as a download.
pub async fn generate(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(input): Json<GenerateRequest>,
) -> AppResult<Attachment> {
    let engagement = ctx.require_engagement()?;
    let template = DocumentTemplate::parse(input.template.trim())?;
    require(
        can_generate(&ctx.actor, template, &engagement.team()),
        "You are not allowed to generate this document",
    )?;

    let substep = match input.substep_id {
        Some(id) => Some(
            AuditSubstepRepo::find_active_with_step(&state.pool, id)
                .await?
                .ok_or_else(|| AppError::not_found("AuditSubstep", id))?,
        ),
        None => None,
    };

    generate_document(&state, &ctx.actor, engagement, template, substep.as_ref()).await
}

/// Render `template` for `engagement`, store it once and record it as a
/// `request` document (plus a procedure file of `substep`, when given).
pub(crate) async fn generate_document(
    state: &AppState,
    actor: &Actor,
    engagement: &Engagement,
    template: DocumentTemplate,
    substep: Option<&SubstepWithStep>,
) -> AppResult<Attachment> {
    let team = engagement.team();
    let mut ids = team.distinct_members();
    ids.push(actor.user_id);
    let refs = user_refs(&state.pool, &ids).await?;
    let names = refs
        .iter()
        .map(|(id, user)| (*id, user.display_name.clone()))
        .collect();

    let current = UserRepo::find_by_id(&state.pool, actor.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User", actor.user_id))?;

    let fields = build_field_map(
        &engagement.name,
        engagement.reporting_period.as_deref(),
        &team,
        &names,
        Utc::now().date_naive(),
        &current.display_name(),
    );

    let renderer = Arc::clone(&state.renderer);
    let bytes = tokio::task::spawn_blocking(move || renderer.render(template, &fields))
        .await
        .map_err(|e| AppError::InternalError(format!("Render task failed: {e}")))??;

    let file_name = template.output_name(engagement.id, &current.username, Utc::now());
    let key = state.storage.save(&file_name, &bytes).await?;

    let recorded = async {
        let mut tx = state.pool.begin().await?;
        if let Some(substep) = substep {
            ProcedureFileRepo::create(
                &mut tx,
                &CreateProcedureFile {
                    engagement_id: engagement.id,
                    procedure_code: procedure_code(substep.id),
                    title: file_name.clone(),
                    storage_key: key.clone(),
                    uploaded_by: Some(actor.user_id),
                },
            )
            .await?;
        }
        DocumentRepo::create_in_tx(
            &mut tx,
            &CreateDocument {
                organization_id: engagement.organization_id,
                engagement_id: engagement.id,
                storage_key: key.clone(),
                original_name: file_name.clone(),
                doc_type: DOC_TYPE_REQUEST.to_string(),
                custom_label: substep
                    .map(|s| step_label(s.step_order, s.sort_order))
                    .unwrap_or_default(),
                uploaded_by: Some(actor.user_id),
            },
        )
        .await?;
        tx.commit().await?;
        Ok::<_, sqlx::Error>(())
    }
    .await;

    if let Err(e) = recorded {
        if let Err(cleanup) = state.storage.delete(&key).await {
            tracing::warn!(key = %key, error = %cleanup, "Failed to remove orphaned document");
        }
        return Err(e.into());
    }

    tracing::info!(
        engagement_id = engagement.id,
        user_id = actor.user_id,
        template = template.as_str(),
        key = %key,
        "Document generated"
    );

    Ok(Attachment {
        content_type: DOCX_CONTENT_TYPE,
        disposition: content_disposition(&file_name),
        bytes,
    })
}
