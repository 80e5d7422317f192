//! Repository for `procedure_files`.

use auditdesk_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::procedure_file::{CreateProcedureFile, ProcedureFile, ProcedureFileCount};

const COLUMNS: &str = "id, engagement_id, procedure_code, title, storage_key, uploaded_by, created_at";

pub struct ProcedureFileRepo;

impl ProcedureFileRepo {
    /// Take the transaction-scoped advisory lock for an upload key.
    pub async fn lock_upload(
        tx: &mut Transaction<'_, Postgres>,
        key: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(key)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// A file with the same title uploaded by the same user into the same
    /// substep within the last `window_secs` seconds.
    pub async fn find_recent_duplicate(
        tx: &mut Transaction<'_, Postgres>,
        engagement_id: DbId,
        procedure_code: &str,
        uploaded_by: DbId,
        title: &str,
        window_secs: i64,
    ) -> Result<Option<ProcedureFile>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM procedure_files
             WHERE engagement_id = $1 AND procedure_code = $2
               AND uploaded_by = $3 AND title = $4
               AND created_at >= NOW() - make_interval(secs => $5)
             ORDER BY created_at DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, ProcedureFile>(&query)
            .bind(engagement_id)
            .bind(procedure_code)
            .bind(uploaded_by)
            .bind(title)
            .bind(window_secs as f64)
            .fetch_optional(&mut **tx)
            .await
    }

    pub async fn create(
        tx: &mut Transaction<'_, Postgres>,
        input: &CreateProcedureFile,
    ) -> Result<ProcedureFile, sqlx::Error> {
        let query = format!(
            "INSERT INTO procedure_files
                (engagement_id, procedure_code, title, storage_key, uploaded_by)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProcedureFile>(&query)
            .bind(input.engagement_id)
            .bind(&input.procedure_code)
            .bind(&input.title)
            .bind(&input.storage_key)
            .bind(input.uploaded_by)
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ProcedureFile>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM procedure_files WHERE id = $1");
        sqlx::query_as::<_, ProcedureFile>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Files of one substep, newest first.
    pub async fn list_for_substep(
        pool: &PgPool,
        engagement_id: DbId,
        procedure_code: &str,
    ) -> Result<Vec<ProcedureFile>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM procedure_files
             WHERE engagement_id = $1 AND procedure_code = $2
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, ProcedureFile>(&query)
            .bind(engagement_id)
            .bind(procedure_code)
            .fetch_all(pool)
            .await
    }

    /// File counts per (engagement, code) for the given engagements.
    pub async fn counts(
        pool: &PgPool,
        engagement_ids: &[DbId],
    ) -> Result<Vec<ProcedureFileCount>, sqlx::Error> {
        if engagement_ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, ProcedureFileCount>(
            "SELECT engagement_id, procedure_code, COUNT(*) AS file_count
             FROM procedure_files
             WHERE engagement_id = ANY($1)
             GROUP BY engagement_id, procedure_code",
        )
        .bind(engagement_ids)
        .fetch_all(pool)
        .await
    }

    /// Delete a file row. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM procedure_files WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Whether any row still points at a stored file, so it must not be
    /// removed from storage.
    pub async fn storage_key_in_use(pool: &PgPool, storage_key: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM procedure_files WHERE storage_key = $1)
                 OR EXISTS (SELECT 1 FROM engagement_documents WHERE storage_key = $1)
                 OR EXISTS (SELECT 1 FROM engagements WHERE audit_report_scan = $1)",
        )
        .bind(storage_key)
        .fetch_one(pool)
        .await
    }
}
