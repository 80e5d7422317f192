//! Repository for `engagement_documents`.

use auditdesk_core::documents::DOC_TYPE_AGREEMENT;
use auditdesk_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::document::{CreateDocument, EngagementDocument, UpdateDocument};

const COLUMNS: &str = "id, organization_id, engagement_id, storage_key, original_name, \
                        doc_type, custom_label, uploaded_by, created_at";

pub struct DocumentRepo;

impl DocumentRepo {
    pub async fn create(pool: &PgPool, input: &CreateDocument) -> Result<EngagementDocument, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let doc = Self::create_in_tx(&mut tx, input).await?;
        tx.commit().await?;
        Ok(doc)
    }

    pub async fn create_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        input: &CreateDocument,
    ) -> Result<EngagementDocument, sqlx::Error> {
        let query = format!(
            "INSERT INTO engagement_documents
                (organization_id, engagement_id, storage_key, original_name,
                 doc_type, custom_label, uploaded_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EngagementDocument>(&query)
            .bind(input.organization_id)
            .bind(input.engagement_id)
            .bind(&input.storage_key)
            .bind(&input.original_name)
            .bind(&input.doc_type)
            .bind(&input.custom_label)
            .bind(input.uploaded_by)
            .fetch_one(&mut **tx)
            .await
    }

    /// Record one stored file as a document of every listed engagement.
    pub async fn create_shared(
        pool: &PgPool,
        template: &CreateDocument,
        engagement_ids: &[DbId],
    ) -> Result<Vec<EngagementDocument>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut created = Vec::with_capacity(engagement_ids.len());
        for &engagement_id in engagement_ids {
            let input = CreateDocument {
                engagement_id,
                organization_id: template.organization_id,
                storage_key: template.storage_key.clone(),
                original_name: template.original_name.clone(),
                doc_type: template.doc_type.clone(),
                custom_label: template.custom_label.clone(),
                uploaded_by: template.uploaded_by,
            };
            created.push(Self::create_in_tx(&mut tx, &input).await?);
        }
        tx.commit().await?;
        Ok(created)
    }

    /// Give a new engagement the agreement documents of its siblings,
    /// sharing their stored files. Returns the number of rows copied.
    pub async fn copy_agreements(
        pool: &PgPool,
        target_engagement_id: DbId,
        sibling_ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        if sibling_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "INSERT INTO engagement_documents
                (organization_id, engagement_id, storage_key, original_name,
                 doc_type, custom_label, uploaded_by)
             SELECT DISTINCT ON (storage_key)
                    organization_id, $1, storage_key, original_name,
                    doc_type, custom_label, uploaded_by
             FROM engagement_documents
             WHERE engagement_id = ANY($2) AND doc_type = $3
             ORDER BY storage_key, id",
        )
        .bind(target_engagement_id)
        .bind(sibling_ids)
        .bind(DOC_TYPE_AGREEMENT)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<EngagementDocument>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM engagement_documents WHERE id = $1");
        sqlx::query_as::<_, EngagementDocument>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Documents of one engagement, newest first.
    pub async fn list_for_engagement(
        pool: &PgPool,
        engagement_id: DbId,
    ) -> Result<Vec<EngagementDocument>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM engagement_documents
             WHERE engagement_id = $1
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, EngagementDocument>(&query)
            .bind(engagement_id)
            .fetch_all(pool)
            .await
    }

    /// The listed documents that belong to `engagement_id`, in id order.
    pub async fn find_many_for_engagement(
        pool: &PgPool,
        engagement_id: DbId,
        ids: &[DbId],
    ) -> Result<Vec<EngagementDocument>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT {COLUMNS} FROM engagement_documents
             WHERE engagement_id = $1 AND id = ANY($2)
             ORDER BY id"
        );
        sqlx::query_as::<_, EngagementDocument>(&query)
            .bind(engagement_id)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// Update the type and label. Absent fields keep their value.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateDocument,
    ) -> Result<Option<EngagementDocument>, sqlx::Error> {
        let query = format!(
            "UPDATE engagement_documents SET
                doc_type = COALESCE($2, doc_type),
                custom_label = COALESCE($3, custom_label)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EngagementDocument>(&query)
            .bind(id)
            .bind(&input.doc_type)
            .bind(&input.custom_label)
            .fetch_optional(pool)
            .await
    }

    /// Delete a document row. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM engagement_documents WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
