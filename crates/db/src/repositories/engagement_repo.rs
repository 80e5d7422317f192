//! Repository for `engagements`.
//!
//! Team saves run in one transaction together with the propagation to
//! sibling engagements (same organization, name, contract number and date).
//! Concurrent saves on one contract are not serialized: the last commit wins.

use auditdesk_core::team::{plan_team_save, ContractIdentity, TeamAssignment, TeamRole};
use auditdesk_core::types::{Date, DbId};
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::engagement::{DashboardFilter, Engagement, EngagementInput, MonitoringFilter};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, organization_id, name, \
    edrpou, address_country, address_city, address_street, address_building, \
    address_office, address_zip, kved, poi, \
    requisites_number, requisites_date, requisites_amount, requisites_vat, \
    supervision_body, legal_form, mandatory_audit, reporting_period, \
    contract_deadline, deadline, engagement_subject, \
    authorized_person_name, authorized_person_email, \
    audit_report_number, audit_report_date, audit_report_type, audit_report_paragraph, \
    supervision_notice_date, cw_controls_done, audit_report_scan, planned_hours, \
    status, is_completed, completed_at, completed_by, \
    manager_id, qa_manager_id, auditor_id, auditor2_id, auditor3_id, \
    assistant_id, assistant2_id, assistant3_id, assistant4_id, \
    created_at, updated_at";

/// Form columns bound at `$2..$31`, in bind order. `status` follows at `$32`.
const FORM_COLUMNS: [&str; 30] = [
    "name",
    "edrpou",
    "address_country",
    "address_city",
    "address_street",
    "address_building",
    "address_office",
    "address_zip",
    "kved",
    "poi",
    "requisites_number",
    "requisites_date",
    "requisites_amount",
    "requisites_vat",
    "supervision_body",
    "legal_form",
    "mandatory_audit",
    "reporting_period",
    "contract_deadline",
    "deadline",
    "engagement_subject",
    "authorized_person_name",
    "authorized_person_email",
    "audit_report_number",
    "audit_report_date",
    "audit_report_type",
    "audit_report_paragraph",
    "supervision_notice_date",
    "cw_controls_done",
    "planned_hours",
];

/// First placeholder of the nine team columns in insert/update statements.
const TEAM_PARAM_START: usize = 33;

/// Matches a user (`$1`) against any of the nine team slots of alias `e`.
const TEAM_MATCH_E: &str = "$1 IN (e.manager_id, e.qa_manager_id, e.auditor_id, e.auditor2_id, \
    e.auditor3_id, e.assistant_id, e.assistant2_id, e.assistant3_id, e.assistant4_id)";

type EngagementQuery<'q> = QueryAs<'q, Postgres, Engagement, PgArguments>;

/// `COLUMNS` qualified with a table alias.
fn qualified_columns(alias: &str) -> String {
    COLUMNS
        .split(',')
        .map(|c| format!("{alias}.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `col = $n` pairs for the team columns, starting at `start`.
fn team_assignments(start: usize) -> String {
    TeamRole::ALL
        .iter()
        .enumerate()
        .map(|(i, role)| format!("{} = ${}", role.column(), start + i))
        .collect::<Vec<_>>()
        .join(", ")
}

fn team_column_list() -> String {
    TeamRole::ALL
        .iter()
        .map(|role| role.column())
        .collect::<Vec<_>>()
        .join(", ")
}

fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|n| format!("${n}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Bind the form fields (`$2..$32`) in `FORM_COLUMNS` order, then status.
fn bind_form<'q>(query: EngagementQuery<'q>, input: &'q EngagementInput) -> EngagementQuery<'q> {
    query
        .bind(&input.name)
        .bind(&input.edrpou)
        .bind(&input.address_country)
        .bind(&input.address_city)
        .bind(&input.address_street)
        .bind(&input.address_building)
        .bind(&input.address_office)
        .bind(&input.address_zip)
        .bind(&input.kved)
        .bind(input.poi)
        .bind(&input.requisites_number)
        .bind(input.requisites_date)
        .bind(input.requisites_amount)
        .bind(input.requisites_vat)
        .bind(&input.supervision_body)
        .bind(&input.legal_form)
        .bind(input.mandatory_audit)
        .bind(&input.reporting_period)
        .bind(input.contract_deadline)
        .bind(input.deadline)
        .bind(&input.engagement_subject)
        .bind(&input.authorized_person_name)
        .bind(&input.authorized_person_email)
        .bind(&input.audit_report_number)
        .bind(input.audit_report_date)
        .bind(&input.audit_report_type)
        .bind(&input.audit_report_paragraph)
        .bind(input.supervision_notice_date)
        .bind(input.cw_controls_done)
        .bind(input.planned_hours)
        .bind(&input.status)
}

/// Bind the nine team slots in `TeamRole::ALL` order.
fn bind_team<'q, O>(
    query: QueryAs<'q, Postgres, O, PgArguments>,
    team: &TeamAssignment,
) -> QueryAs<'q, Postgres, O, PgArguments> {
    TeamRole::ALL
        .iter()
        .fold(query, |q, &role| q.bind(team.get(role)))
}

pub struct EngagementRepo;

impl EngagementRepo {
    // -----------------------------------------------------------------------
    // Team saves
    // -----------------------------------------------------------------------

    /// Insert a new engagement.
    ///
    /// When another engagement of the same contract exists, the new row takes
    /// that engagement's team instead of `submitted_team`.
    pub async fn create(
        pool: &PgPool,
        organization_id: DbId,
        input: &EngagementInput,
        submitted_team: TeamAssignment,
    ) -> Result<Engagement, sqlx::Error> {
        let identity = input.contract_identity(organization_id);
        let mut tx = pool.begin().await?;

        let sibling = if identity.is_complete() {
            find_sibling(&mut tx, &identity, None).await?
        } else {
            None
        };
        let sibling_team = sibling.as_ref().map(Engagement::team);
        let plan = plan_team_save(&identity, submitted_team, sibling_team.as_ref(), None);

        let query = format!(
            "INSERT INTO engagements (organization_id, {form}, status, {team})
             VALUES ($1, {form_params}, COALESCE($32, 'new'), {team_params})
             RETURNING {COLUMNS}",
            form = FORM_COLUMNS.join(", "),
            form_params = placeholders(2, FORM_COLUMNS.len()),
            team = team_column_list(),
            team_params = placeholders(TEAM_PARAM_START, TeamRole::ALL.len()),
        );
        let created = bind_team(
            bind_form(sqlx::query_as::<_, Engagement>(&query).bind(organization_id), input),
            &plan.team,
        )
        .fetch_one(&mut *tx)
        .await?;

        if plan.propagate {
            propagate_team(&mut tx, &created).await?;
        }
        tx.commit().await?;

        tracing::info!(
            engagement_id = created.id,
            organization_id,
            inherited_team = sibling.is_some(),
            "Engagement created",
        );
        Ok(created)
    }

    /// Replace the form fields and team of an engagement.
    ///
    /// Returns `None` when the engagement does not exist.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &EngagementInput,
        team: TeamAssignment,
    ) -> Result<Option<Engagement>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let Some(stored) = find_for_update(&mut tx, id).await? else {
            return Ok(None);
        };

        let identity = input.contract_identity(stored.organization_id);
        let sibling = if identity.is_complete() && identity != stored.contract_identity() {
            find_sibling(&mut tx, &identity, Some(id)).await?
        } else {
            None
        };
        let sibling_team = sibling.as_ref().map(Engagement::team);
        let stored_team = stored.team();
        let plan = plan_team_save(&identity, team, sibling_team.as_ref(), Some(&stored_team));

        let sets = FORM_COLUMNS
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{c} = ${}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let query = format!(
            "UPDATE engagements SET {sets}, status = COALESCE($32, status), {team}
             WHERE id = $1
             RETURNING {COLUMNS}",
            team = team_assignments(TEAM_PARAM_START),
        );
        let updated = bind_team(
            bind_form(sqlx::query_as::<_, Engagement>(&query).bind(id), input),
            &plan.team,
        )
        .fetch_one(&mut *tx)
        .await?;

        let propagated = if plan.propagate {
            propagate_team(&mut tx, &updated).await?
        } else {
            0
        };
        tx.commit().await?;

        tracing::info!(
            engagement_id = id,
            propagated,
            joined_contract = sibling.is_some(),
            "Engagement updated",
        );
        Ok(Some(updated))
    }

    /// Overwrite all nine team slots (the step 1.5 action) and propagate.
    pub async fn assign_team(
        pool: &PgPool,
        id: DbId,
        team: TeamAssignment,
    ) -> Result<Option<Engagement>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let Some(stored) = find_for_update(&mut tx, id).await? else {
            return Ok(None);
        };

        let identity = stored.contract_identity();
        let stored_team = stored.team();
        let plan = plan_team_save(&identity, team, None, Some(&stored_team));

        let query = format!(
            "UPDATE engagements SET {} WHERE id = $1 RETURNING {COLUMNS}",
            team_assignments(2),
        );
        let updated = bind_team(sqlx::query_as::<_, Engagement>(&query).bind(id), &plan.team)
            .fetch_one(&mut *tx)
            .await?;

        let propagated = if plan.propagate {
            propagate_team(&mut tx, &updated).await?
        } else {
            0
        };
        tx.commit().await?;

        tracing::info!(engagement_id = id, propagated, "Engagement team assigned");
        Ok(Some(updated))
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Engagement>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM engagements WHERE id = $1");
        sqlx::query_as::<_, Engagement>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// An engagement of the organization, optionally restricted to the
    /// engagements whose team includes `visible_to`.
    pub async fn find_visible(
        pool: &PgPool,
        organization_id: DbId,
        id: DbId,
        visible_to: Option<DbId>,
    ) -> Result<Option<Engagement>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM engagements e
             WHERE e.organization_id = $2 AND e.id = $3
               AND ($1::BIGINT IS NULL OR {TEAM_MATCH_E})",
            qualified_columns("e"),
        );
        sqlx::query_as::<_, Engagement>(&query)
            .bind(visible_to)
            .bind(organization_id)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Ids of the other engagements sharing the contract of `engagement`.
    pub async fn sibling_ids(pool: &PgPool, engagement: &Engagement) -> Result<Vec<DbId>, sqlx::Error> {
        let identity = engagement.contract_identity();
        if !identity.is_complete() {
            return Ok(Vec::new());
        }
        sqlx::query_scalar::<_, DbId>(
            "SELECT id FROM engagements
             WHERE organization_id = $1 AND name = $2
               AND requisites_number = $3 AND requisites_date = $4
               AND id <> $5
             ORDER BY id",
        )
        .bind(identity.organization_id)
        .bind(&identity.name)
        .bind(&identity.requisites_number)
        .bind(identity.requisites_date)
        .bind(engagement.id)
        .fetch_all(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Listings
    // -----------------------------------------------------------------------

    /// Open engagements, newest first.
    pub async fn list_dashboard(
        pool: &PgPool,
        organization_id: DbId,
        visible_to: Option<DbId>,
        filter: &DashboardFilter,
    ) -> Result<Vec<Engagement>, sqlx::Error> {
        let pattern = filter
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{q}%"));
        let query = format!(
            "SELECT {} FROM engagements e
             WHERE e.organization_id = $2 AND e.is_completed = false
               AND ($1::BIGINT IS NULL OR {TEAM_MATCH_E})
               AND ($3::TEXT IS NULL
                    OR e.name ILIKE $3 OR e.edrpou ILIKE $3 OR e.requisites_number ILIKE $3)
               AND ($4::TEXT IS NULL OR e.reporting_period = $4)
               AND ($5::TEXT IS NULL OR e.status = $5)
               AND ($6::TEXT IS NULL OR e.engagement_subject = $6)
             ORDER BY e.created_at DESC, e.id DESC",
            qualified_columns("e"),
        );
        sqlx::query_as::<_, Engagement>(&query)
            .bind(visible_to)
            .bind(organization_id)
            .bind(pattern)
            .bind(non_blank(&filter.reporting_period))
            .bind(non_blank(&filter.status))
            .bind(non_blank(&filter.subject))
            .fetch_all(pool)
            .await
    }

    /// Completed engagements, most recently completed first.
    pub async fn list_archive(pool: &PgPool, organization_id: DbId) -> Result<Vec<Engagement>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM engagements
             WHERE organization_id = $1 AND is_completed = true
             ORDER BY completed_at DESC NULLS LAST, id DESC"
        );
        sqlx::query_as::<_, Engagement>(&query)
            .bind(organization_id)
            .fetch_all(pool)
            .await
    }

    /// Rows of the progress-monitoring grid.
    pub async fn list_for_monitoring(
        pool: &PgPool,
        organization_id: DbId,
        visible_to: Option<DbId>,
        filter: &MonitoringFilter,
    ) -> Result<Vec<Engagement>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM engagements e
             LEFT JOIN users m ON m.id = e.manager_id
             WHERE e.organization_id = $2
               AND ($1::BIGINT IS NULL OR {TEAM_MATCH_E})
               AND (NOT $3 OR e.is_completed = false)
               AND ($4::TEXT IS NULL OR e.engagement_subject = $4)
               AND ($5::BIGINT IS NULL OR e.manager_id = $5)
               AND ($6::BIGINT IS NULL OR $6 IN (e.manager_id, e.qa_manager_id, e.auditor_id,
                    e.auditor2_id, e.auditor3_id, e.assistant_id, e.assistant2_id,
                    e.assistant3_id, e.assistant4_id))
               AND ($7::DATE IS NULL OR COALESCE(e.contract_deadline, e.deadline) >= $7)
               AND ($8::DATE IS NULL OR COALESCE(e.contract_deadline, e.deadline) <= $8)
             ORDER BY {}",
            qualified_columns("e"),
            filter.sort.order_by(),
        );
        sqlx::query_as::<_, Engagement>(&query)
            .bind(visible_to)
            .bind(organization_id)
            .bind(filter.active_only)
            .bind(non_blank(&filter.subject))
            .bind(filter.manager_id)
            .bind(filter.user_id)
            .bind(filter.date_from)
            .bind(filter.date_to)
            .fetch_all(pool)
            .await
    }

    /// Engagements whose contract deadline falls in the range, for metrics.
    pub async fn list_for_metrics(
        pool: &PgPool,
        organization_id: DbId,
        date_from: Option<Date>,
        date_to: Option<Date>,
    ) -> Result<Vec<Engagement>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM engagements
             WHERE organization_id = $1
               AND ($2::DATE IS NULL OR contract_deadline >= $2)
               AND ($3::DATE IS NULL OR contract_deadline <= $3)
             ORDER BY id"
        );
        sqlx::query_as::<_, Engagement>(&query)
            .bind(organization_id)
            .bind(date_from)
            .bind(date_to)
            .fetch_all(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Mark an open engagement completed. Returns `None` when it is missing
    /// or was completed concurrently.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        completed_by: DbId,
    ) -> Result<Option<Engagement>, sqlx::Error> {
        let query = format!(
            "UPDATE engagements SET
                is_completed = true,
                completed_at = NOW(),
                completed_by = $2
             WHERE id = $1 AND is_completed = false
             RETURNING {COLUMNS}"
        );
        let completed = sqlx::query_as::<_, Engagement>(&query)
            .bind(id)
            .bind(completed_by)
            .fetch_optional(pool)
            .await?;
        if completed.is_some() {
            tracing::info!(engagement_id = id, completed_by, "Engagement completed");
        }
        Ok(completed)
    }

    /// Attach the audit report scan. Returns the previously stored key.
    pub async fn set_audit_report_scan(
        pool: &PgPool,
        id: DbId,
        storage_key: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<String>>(
            "WITH previous AS (
                SELECT audit_report_scan FROM engagements WHERE id = $1 FOR UPDATE
             )
             UPDATE engagements SET audit_report_scan = $2
             WHERE id = $1
             RETURNING (SELECT audit_report_scan FROM previous)",
        )
        .bind(id)
        .bind(storage_key)
        .fetch_one(pool)
        .await
    }

    /// Delete an engagement. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM engagements WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ---------------------------------------------------------------------------
// Transaction helpers
// ---------------------------------------------------------------------------

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

async fn find_for_update(
    tx: &mut Transaction<'_, Postgres>,
    id: DbId,
) -> Result<Option<Engagement>, sqlx::Error> {
    let query = format!("SELECT {COLUMNS} FROM engagements WHERE id = $1 FOR UPDATE");
    sqlx::query_as::<_, Engagement>(&query)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
}

/// The oldest engagement with the given contract identity, other than
/// `excluding`.
async fn find_sibling(
    tx: &mut Transaction<'_, Postgres>,
    identity: &ContractIdentity,
    excluding: Option<DbId>,
) -> Result<Option<Engagement>, sqlx::Error> {
    let query = format!(
        "SELECT {COLUMNS} FROM engagements
         WHERE organization_id = $1 AND name = $2
           AND requisites_number = $3 AND requisites_date = $4
           AND ($5::BIGINT IS NULL OR id <> $5)
         ORDER BY id
         LIMIT 1"
    );
    sqlx::query_as::<_, Engagement>(&query)
        .bind(identity.organization_id)
        .bind(&identity.name)
        .bind(&identity.requisites_number)
        .bind(identity.requisites_date)
        .bind(excluding)
        .fetch_optional(&mut **tx)
        .await
}

/// Copy the team of `source` onto every sibling. Returns the number of rows
/// overwritten.
async fn propagate_team(
    tx: &mut Transaction<'_, Postgres>,
    source: &Engagement,
) -> Result<u64, sqlx::Error> {
    let identity = source.contract_identity();
    if !identity.is_complete() {
        return Ok(0);
    }
    let query = format!(
        "UPDATE engagements SET {}
         WHERE organization_id = $1 AND name = $2
           AND requisites_number = $3 AND requisites_date = $4
           AND id <> $5",
        team_assignments(6),
    );
    let team = source.team();
    let mut statement = sqlx::query(&query)
        .bind(identity.organization_id)
        .bind(&identity.name)
        .bind(&identity.requisites_number)
        .bind(identity.requisites_date)
        .bind(source.id);
    for role in TeamRole::ALL {
        statement = statement.bind(team.get(role));
    }
    let result = statement.execute(&mut **tx).await?;

    let updated = result.rows_affected();
    if updated > 0 {
        tracing::info!(
            engagement_id = source.id,
            siblings = updated,
            "Team propagated to sibling engagements",
        );
    }
    Ok(updated)
}
