//! Repository for `engagement_substep_statuses`.

use auditdesk_core::types::DbId;
use sqlx::PgPool;

use crate::models::status::{StatusId, SubstepCompletionStatus};
use crate::models::substep_status::EngagementSubstepStatus;

const COLUMNS: &str = "id, engagement_id, substep_id, status_id, completed_by, completed_at, \
                        created_at, updated_at";

pub struct SubstepStatusRepo;

impl SubstepStatusRepo {
    /// Flip the completion flag of one cell in a single statement.
    ///
    /// A missing row is created as completed. Completing stamps the actor
    /// and time; reverting clears both.
    pub async fn toggle(
        pool: &PgPool,
        engagement_id: DbId,
        substep_id: DbId,
        actor_id: DbId,
    ) -> Result<EngagementSubstepStatus, sqlx::Error> {
        let query = format!(
            "INSERT INTO engagement_substep_statuses
                (engagement_id, substep_id, status_id, completed_by, completed_at)
             VALUES ($1, $2, $3, $4, NOW())
             ON CONFLICT (engagement_id, substep_id) DO UPDATE SET
                status_id = CASE WHEN engagement_substep_statuses.status_id = $3
                                 THEN $5 ELSE $3 END,
                completed_by = CASE WHEN engagement_substep_statuses.status_id = $3
                                    THEN NULL ELSE $4 END,
                completed_at = CASE WHEN engagement_substep_statuses.status_id = $3
                                    THEN NULL ELSE NOW() END
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, EngagementSubstepStatus>(&query)
            .bind(engagement_id)
            .bind(substep_id)
            .bind(StatusId::from(SubstepCompletionStatus::Completed))
            .bind(actor_id)
            .bind(StatusId::from(SubstepCompletionStatus::NotStarted))
            .fetch_one(pool)
            .await?;

        tracing::info!(
            engagement_id,
            substep_id,
            actor_id,
            status = ?row.completion(),
            "Substep completion toggled",
        );
        Ok(row)
    }

    pub async fn find(
        pool: &PgPool,
        engagement_id: DbId,
        substep_id: DbId,
    ) -> Result<Option<EngagementSubstepStatus>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM engagement_substep_statuses
             WHERE engagement_id = $1 AND substep_id = $2"
        );
        sqlx::query_as::<_, EngagementSubstepStatus>(&query)
            .bind(engagement_id)
            .bind(substep_id)
            .fetch_optional(pool)
            .await
    }

    /// (engagement, substep) pairs marked completed among the given
    /// engagements.
    pub async fn completed_pairs(
        pool: &PgPool,
        engagement_ids: &[DbId],
    ) -> Result<Vec<(DbId, DbId)>, sqlx::Error> {
        if engagement_ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, (DbId, DbId)>(
            "SELECT engagement_id, substep_id FROM engagement_substep_statuses
             WHERE engagement_id = ANY($1) AND status_id = $2",
        )
        .bind(engagement_ids)
        .bind(StatusId::from(SubstepCompletionStatus::Completed))
        .fetch_all(pool)
        .await
    }
}
