//! Repositories for the audit catalog: `audit_steps`, `audit_substeps`,
//! `step_actions` and `step_action_groups`.

use auditdesk_core::types::DbId;
use sqlx::PgPool;

use crate::models::audit_catalog::{
    AuditStep, AuditSubstep, CreateAuditStep, CreateAuditSubstep, CreateStepAction, StepAction,
    StepWithSubsteps, SubstepWithStep, PLACEMENT_INLINE, SCOPE_STEP,
};

const STEP_COLUMNS: &str = "id, sort_order, title, purpose, documentation, \
                             procedure_description, expected_result, is_active, \
                             created_at, updated_at";

const SUBSTEP_COLUMNS: &str = "id, step_id, sort_order, title, purpose, documentation, \
                                procedure_description, expected_result, is_active, \
                                created_at, updated_at";

/// Joined substep/step projection for [`SubstepWithStep`].
const SUBSTEP_WITH_STEP: &str = "SELECT ss.id, ss.step_id, s.sort_order AS step_order, \
                                  ss.sort_order, ss.title, ss.is_active, \
                                  s.is_active AS step_is_active \
                                  FROM audit_substeps ss \
                                  JOIN audit_steps s ON s.id = ss.step_id";

/// Action columns with the aggregated allowed group names.
const ACTION_SELECT: &str = "SELECT a.id, a.key, a.label, a.description, a.enabled, \
                              a.sort_order, a.scope, a.placement, a.step_id, a.substep_id, \
                              COALESCE(array_agg(g.name ORDER BY g.name) \
                                       FILTER (WHERE g.name IS NOT NULL), '{}') AS allowed_groups \
                              FROM step_actions a \
                              LEFT JOIN step_action_groups ag ON ag.action_id = a.id \
                              LEFT JOIN groups g ON g.id = ag.group_id";

/// Order of the step holding the team-assignment substep.
pub const TEAM_ASSIGNMENT_STEP_ORDER: i32 = 1;
/// Order of the team-assignment substep inside its step.
pub const TEAM_ASSIGNMENT_SUBSTEP_ORDER: i32 = 5;

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

pub struct AuditStepRepo;

impl AuditStepRepo {
    pub async fn create(pool: &PgPool, input: &CreateAuditStep) -> Result<AuditStep, sqlx::Error> {
        let query = format!(
            "INSERT INTO audit_steps
                (sort_order, title, purpose, documentation, procedure_description,
                 expected_result, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, true))
             RETURNING {STEP_COLUMNS}"
        );
        sqlx::query_as::<_, AuditStep>(&query)
            .bind(input.sort_order)
            .bind(&input.title)
            .bind(&input.purpose)
            .bind(&input.documentation)
            .bind(&input.procedure_description)
            .bind(&input.expected_result)
            .bind(input.is_active)
            .fetch_one(pool)
            .await
    }

    /// The active step with the given order.
    pub async fn find_active_by_order(
        pool: &PgPool,
        sort_order: i32,
    ) -> Result<Option<AuditStep>, sqlx::Error> {
        let query = format!(
            "SELECT {STEP_COLUMNS} FROM audit_steps WHERE sort_order = $1 AND is_active = true"
        );
        sqlx::query_as::<_, AuditStep>(&query)
            .bind(sort_order)
            .fetch_optional(pool)
            .await
    }

    /// Active steps, each with its active substeps, in catalog order.
    pub async fn list_active_with_substeps(pool: &PgPool) -> Result<Vec<StepWithSubsteps>, sqlx::Error> {
        let query = format!(
            "SELECT {STEP_COLUMNS} FROM audit_steps WHERE is_active = true ORDER BY sort_order"
        );
        let steps = sqlx::query_as::<_, AuditStep>(&query)
            .fetch_all(pool)
            .await?;
        let mut substeps = AuditSubstepRepo::list_active(pool).await?;

        Ok(steps
            .into_iter()
            .map(|step| {
                let (own, rest): (Vec<_>, Vec<_>) =
                    substeps.drain(..).partition(|s| s.step_id == step.id);
                substeps = rest;
                StepWithSubsteps { step, substeps: own }
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Substeps
// ---------------------------------------------------------------------------

pub struct AuditSubstepRepo;

impl AuditSubstepRepo {
    pub async fn create(pool: &PgPool, input: &CreateAuditSubstep) -> Result<AuditSubstep, sqlx::Error> {
        let query = format!(
            "INSERT INTO audit_substeps
                (step_id, sort_order, title, purpose, documentation, procedure_description,
                 expected_result, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, true))
             RETURNING {SUBSTEP_COLUMNS}"
        );
        sqlx::query_as::<_, AuditSubstep>(&query)
            .bind(input.step_id)
            .bind(input.sort_order)
            .bind(&input.title)
            .bind(&input.purpose)
            .bind(&input.documentation)
            .bind(&input.procedure_description)
            .bind(&input.expected_result)
            .bind(input.is_active)
            .fetch_one(pool)
            .await
    }

    /// Active substeps of active steps, ordered by step then substep.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<AuditSubstep>, sqlx::Error> {
        let columns = SUBSTEP_COLUMNS
            .split(',')
            .map(|c| format!("ss.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");
        let query = format!(
            "SELECT {columns} FROM audit_substeps ss
             JOIN audit_steps s ON s.id = ss.step_id
             WHERE ss.is_active = true AND s.is_active = true
             ORDER BY s.sort_order, ss.sort_order"
        );
        sqlx::query_as::<_, AuditSubstep>(&query)
            .fetch_all(pool)
            .await
    }

    /// Active substeps of one step in order.
    pub async fn list_for_step(pool: &PgPool, step_id: DbId) -> Result<Vec<AuditSubstep>, sqlx::Error> {
        let query = format!(
            "SELECT {SUBSTEP_COLUMNS} FROM audit_substeps
             WHERE step_id = $1 AND is_active = true
             ORDER BY sort_order"
        );
        sqlx::query_as::<_, AuditSubstep>(&query)
            .bind(step_id)
            .fetch_all(pool)
            .await
    }

    /// A substep with its step, only when both are active.
    pub async fn find_active_with_step(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<SubstepWithStep>, sqlx::Error> {
        let query = format!(
            "{SUBSTEP_WITH_STEP}
             WHERE ss.id = $1 AND ss.is_active = true AND s.is_active = true"
        );
        sqlx::query_as::<_, SubstepWithStep>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The team-assignment substep, when configured and active.
    pub async fn find_team_assignment(pool: &PgPool) -> Result<Option<SubstepWithStep>, sqlx::Error> {
        let query = format!(
            "{SUBSTEP_WITH_STEP}
             WHERE s.sort_order = $1 AND ss.sort_order = $2
               AND s.is_active = true AND ss.is_active = true"
        );
        sqlx::query_as::<_, SubstepWithStep>(&query)
            .bind(TEAM_ASSIGNMENT_STEP_ORDER)
            .bind(TEAM_ASSIGNMENT_SUBSTEP_ORDER)
            .fetch_optional(pool)
            .await
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

pub struct StepActionRepo;

impl StepActionRepo {
    /// Insert an action and its allowed groups in one transaction. Group
    /// names that do not exist yet are created.
    pub async fn create(
        pool: &PgPool,
        input: &CreateStepAction,
        scope: &str,
    ) -> Result<StepAction, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let action_id: DbId = sqlx::query_scalar(
            "INSERT INTO step_actions
                (key, label, description, enabled, sort_order, scope, placement, step_id, substep_id)
             VALUES ($1, $2, $3, COALESCE($4, true), COALESCE($5, 1), $6, COALESCE($7, $8), $9, $10)
             RETURNING id",
        )
        .bind(&input.key)
        .bind(&input.label)
        .bind(&input.description)
        .bind(input.enabled)
        .bind(input.sort_order)
        .bind(scope)
        .bind(&input.placement)
        .bind(PLACEMENT_INLINE)
        .bind(input.step_id)
        .bind(input.substep_id)
        .fetch_one(&mut *tx)
        .await?;

        for group in &input.allowed_groups {
            sqlx::query(
                "WITH g AS (
                    INSERT INTO groups (name) VALUES ($2)
                    ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                    RETURNING id
                 )
                 INSERT INTO step_action_groups (action_id, group_id)
                 SELECT $1, id FROM g
                 ON CONFLICT DO NOTHING",
            )
            .bind(action_id)
            .bind(group)
            .execute(&mut *tx)
            .await?;
        }

        let query = format!("{ACTION_SELECT} WHERE a.id = $1 GROUP BY a.id");
        let action = sqlx::query_as::<_, StepAction>(&query)
            .bind(action_id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(action_id, key = %action.key, scope = %action.scope, "Step action created");
        Ok(action)
    }

    /// Enabled actions bound to a step, in order.
    pub async fn list_for_step(pool: &PgPool, step_id: DbId) -> Result<Vec<StepAction>, sqlx::Error> {
        let query = format!(
            "{ACTION_SELECT}
             WHERE a.step_id = $1 AND a.enabled = true
             GROUP BY a.id
             ORDER BY a.sort_order, a.id"
        );
        sqlx::query_as::<_, StepAction>(&query)
            .bind(step_id)
            .fetch_all(pool)
            .await
    }

    /// Enabled actions bound to any of the substeps, in order.
    pub async fn list_for_substeps(
        pool: &PgPool,
        substep_ids: &[DbId],
    ) -> Result<Vec<StepAction>, sqlx::Error> {
        if substep_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "{ACTION_SELECT}
             WHERE a.substep_id = ANY($1) AND a.enabled = true
             GROUP BY a.id
             ORDER BY a.substep_id, a.sort_order, a.id"
        );
        sqlx::query_as::<_, StepAction>(&query)
            .bind(substep_ids)
            .fetch_all(pool)
            .await
    }

    /// The enabled step-scoped action with `key` on the step.
    pub async fn find_enabled_for_step(
        pool: &PgPool,
        step_id: DbId,
        key: &str,
    ) -> Result<Option<StepAction>, sqlx::Error> {
        let query = format!(
            "{ACTION_SELECT}
             WHERE a.step_id = $1 AND a.key = $2 AND a.scope = $3 AND a.enabled = true
             GROUP BY a.id"
        );
        sqlx::query_as::<_, StepAction>(&query)
            .bind(step_id)
            .bind(key)
            .bind(SCOPE_STEP)
            .fetch_optional(pool)
            .await
    }
}
