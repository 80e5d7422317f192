//! Repository for `active_engagements`.

use auditdesk_core::types::DbId;
use sqlx::PgPool;

use crate::models::active_engagement::ActiveEngagement;

const COLUMNS: &str = "user_id, organization_id, engagement_id, updated_at";

pub struct ActiveEngagementRepo;

impl ActiveEngagementRepo {
    pub async fn get(
        pool: &PgPool,
        user_id: DbId,
        organization_id: DbId,
    ) -> Result<Option<ActiveEngagement>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM active_engagements
             WHERE user_id = $1 AND organization_id = $2"
        );
        sqlx::query_as::<_, ActiveEngagement>(&query)
            .bind(user_id)
            .bind(organization_id)
            .fetch_optional(pool)
            .await
    }

    /// Select an engagement, replacing any previous selection.
    pub async fn set(
        pool: &PgPool,
        user_id: DbId,
        organization_id: DbId,
        engagement_id: DbId,
    ) -> Result<ActiveEngagement, sqlx::Error> {
        let query = format!(
            "INSERT INTO active_engagements (user_id, organization_id, engagement_id)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id, organization_id) DO UPDATE SET
                engagement_id = EXCLUDED.engagement_id,
                updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ActiveEngagement>(&query)
            .bind(user_id)
            .bind(organization_id)
            .bind(engagement_id)
            .fetch_one(pool)
            .await
    }

    /// Clear the selection. Returns `true` if one existed.
    pub async fn clear(pool: &PgPool, user_id: DbId, organization_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM active_engagements WHERE user_id = $1 AND organization_id = $2",
        )
        .bind(user_id)
        .bind(organization_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
