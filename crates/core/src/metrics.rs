//! Hours and budget shares per team member.
//!
//! Every engagement's planned hours and contract amount are split across the
//! team by fixed coefficients: the manager takes 10%, the auditors share 47%,
//! the assistants share 40% and the QA manager takes 3%. Shared pools are
//! divided equally among the assigned slots of that pool.

use std::collections::HashMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::error::CoreError;
use crate::team::{TeamAssignment, TeamRole};
use crate::types::{Date, DbId};

// ---------------------------------------------------------------------------
// Coefficients
// ---------------------------------------------------------------------------

pub fn manager_coefficient() -> Decimal {
    Decimal::new(10, 2)
}

pub fn auditors_coefficient() -> Decimal {
    Decimal::new(47, 2)
}

pub fn assistants_coefficient() -> Decimal {
    Decimal::new(40, 2)
}

pub fn qa_manager_coefficient() -> Decimal {
    Decimal::new(3, 2)
}

fn split(total: Decimal, count: usize) -> Decimal {
    if count == 0 {
        Decimal::ZERO
    } else {
        total / Decimal::from(count as u64)
    }
}

/// Coefficient of each filled slot. The lead slots are listed even when
/// empty, since their share exists regardless of assignment.
pub fn role_coefficients(team: &TeamAssignment) -> Vec<(TeamRole, Option<DbId>, Decimal)> {
    let per_auditor = split(auditors_coefficient(), team.auditors().len());
    let per_assistant = split(assistants_coefficient(), team.assistants().len());

    let mut rows = vec![(TeamRole::Manager, team.manager_id, manager_coefficient())];
    for role in TeamRole::AUDITORS {
        rows.push((role, team.get(role), per_auditor));
    }
    for role in TeamRole::ASSISTANTS {
        rows.push((role, team.get(role), per_assistant));
    }
    rows.push((TeamRole::QaManager, team.qa_manager_id, qa_manager_coefficient()));
    rows
}

fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

// ---------------------------------------------------------------------------
// Single engagement
// ---------------------------------------------------------------------------

/// One row of the engagement team view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleShare {
    pub role: TeamRole,
    pub label: &'static str,
    pub user_id: Option<DbId>,
    pub hours: Option<Decimal>,
    pub budget: Option<Decimal>,
}

/// Per-role hours and budget for one engagement, rounded to whole units.
///
/// Auditor and assistant slots without a user get no figures; any figure is
/// omitted when the corresponding total is missing or zero.
pub fn engagement_team_breakdown(
    team: &TeamAssignment,
    planned_hours: Option<Decimal>,
    amount: Option<Decimal>,
) -> Vec<RoleShare> {
    let hours = planned_hours.unwrap_or_default();
    let budget = amount.unwrap_or_default();
    let share = |total: Decimal, coeff: Decimal| {
        (!total.is_zero()).then(|| round_half_up(total * coeff, 0))
    };

    role_coefficients(team)
        .into_iter()
        .map(|(role, user_id, coeff)| {
            let counted = role.is_lead() || user_id.is_some();
            RoleShare {
                role,
                label: role.label(),
                user_id,
                hours: if counted { share(hours, coeff) } else { None },
                budget: if counted { share(budget, coeff) } else { None },
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Aggregation across engagements
// ---------------------------------------------------------------------------

/// The figures of one engagement that feed the aggregate.
#[derive(Debug, Clone)]
pub struct EngagementFigures {
    pub engagement_id: DbId,
    pub team: TeamAssignment,
    pub planned_hours: Option<Decimal>,
    pub requisites_amount: Option<Decimal>,
    pub poi: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserMetrics {
    pub user_id: DbId,
    pub projects_count: usize,
    pub poi_count: usize,
    pub contract_sum: Decimal,
    pub hours_sum: Decimal,
    pub budget_share_sum: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetricsSort {
    #[default]
    Projects,
    Poi,
    Contract,
    Hours,
    Budget,
}

impl MetricsSort {
    /// Unknown values fall back to the project count.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("poi") => MetricsSort::Poi,
            Some("contract") => MetricsSort::Contract,
            Some("hours") => MetricsSort::Hours,
            Some("budget") => MetricsSort::Budget,
            _ => MetricsSort::Projects,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MetricsSort::Projects => "projects",
            MetricsSort::Poi => "poi",
            MetricsSort::Contract => "contract",
            MetricsSort::Hours => "hours",
            MetricsSort::Budget => "budget",
        }
    }
}

#[derive(Default)]
struct Accumulator {
    projects: Vec<DbId>,
    poi_projects: Vec<DbId>,
    contract_sum: Decimal,
    hours_sum: Decimal,
    budget_share_sum: Decimal,
}

/// Aggregate per-user figures over a set of engagements, sorted descending
/// by `sort`. Users keep first-seen order on ties.
///
/// A user counts each engagement once for the project count and contract
/// sum, but collects the hours and budget share of every slot they hold.
pub fn aggregate_team_metrics(engagements: &[EngagementFigures], sort: MetricsSort) -> Vec<UserMetrics> {
    let mut order: Vec<DbId> = Vec::new();
    let mut stats: HashMap<DbId, Accumulator> = HashMap::new();

    for engagement in engagements {
        let hours = engagement.planned_hours.unwrap_or_default();
        let budget = engagement.requisites_amount.unwrap_or_default();

        for (_, user_id, coeff) in role_coefficients(&engagement.team) {
            let Some(user_id) = user_id else { continue };
            if coeff.is_zero() {
                continue;
            }
            let stat = stats.entry(user_id).or_insert_with(|| {
                order.push(user_id);
                Accumulator::default()
            });
            if !stat.projects.contains(&engagement.engagement_id) {
                stat.projects.push(engagement.engagement_id);
                stat.contract_sum += budget;
            }
            if engagement.poi && !stat.poi_projects.contains(&engagement.engagement_id) {
                stat.poi_projects.push(engagement.engagement_id);
            }
            stat.hours_sum += hours * coeff;
            stat.budget_share_sum += budget * coeff;
        }
    }

    let mut rows: Vec<UserMetrics> = order
        .into_iter()
        .filter_map(|user_id| {
            stats.remove(&user_id).map(|s| UserMetrics {
                user_id,
                projects_count: s.projects.len(),
                poi_count: s.poi_projects.len(),
                contract_sum: round_half_up(s.contract_sum, 2),
                hours_sum: round_half_up(s.hours_sum, 2),
                budget_share_sum: round_half_up(s.budget_share_sum, 2),
            })
        })
        .collect();

    rows.sort_by(|a, b| match sort {
        MetricsSort::Projects => b.projects_count.cmp(&a.projects_count),
        MetricsSort::Poi => b.poi_count.cmp(&a.poi_count),
        MetricsSort::Contract => b.contract_sum.cmp(&a.contract_sum),
        MetricsSort::Hours => b.hours_sum.cmp(&a.hours_sum),
        MetricsSort::Budget => b.budget_share_sum.cmp(&a.budget_share_sum),
    });
    rows
}

/// Validate an optional `date_from`/`date_to` pair.
pub fn validate_date_range(
    from: Option<Date>,
    to: Option<Date>,
) -> Result<(), CoreError> {
    match (from, to) {
        (Some(f), Some(t)) if f > t => Err(CoreError::Validation(
            "date_from must not be after date_to".to_string(),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn team() -> TeamAssignment {
        TeamAssignment {
            manager_id: Some(1),
            qa_manager_id: Some(2),
            auditor_id: Some(3),
            auditor3_id: Some(4),
            assistant_id: Some(5),
            ..TeamAssignment::default()
        }
    }

    #[test]
    fn coefficients_sum_to_one_when_pools_are_filled() {
        let total: Decimal = role_coefficients(&team())
            .into_iter()
            .filter(|(_, user, _)| user.is_some())
            .map(|(_, _, c)| c)
            .sum();
        assert_eq!(total, Decimal::ONE);
    }

    #[test]
    fn breakdown_splits_pools_and_rounds_half_up() {
        let rows = engagement_team_breakdown(&team(), Some(dec("100")), Some(dec("1000")));
        let by_role: HashMap<TeamRole, &RoleShare> = rows.iter().map(|r| (r.role, r)).collect();

        assert_eq!(by_role[&TeamRole::Manager].hours, Some(dec("10")));
        // 0.47 / 2 * 100 = 23.5 -> 24
        assert_eq!(by_role[&TeamRole::Auditor].hours, Some(dec("24")));
        assert_eq!(by_role[&TeamRole::Auditor2].hours, None);
        assert_eq!(by_role[&TeamRole::Assistant].budget, Some(dec("400")));
        assert_eq!(by_role[&TeamRole::QaManager].budget, Some(dec("30")));
        assert_eq!(rows.len(), 9);
        assert_eq!(rows[0].role, TeamRole::Manager);
        assert_eq!(rows[8].role, TeamRole::QaManager);
    }

    #[test]
    fn breakdown_without_totals_has_no_figures() {
        let rows = engagement_team_breakdown(&team(), None, Some(Decimal::ZERO));
        assert!(rows.iter().all(|r| r.hours.is_none() && r.budget.is_none()));
    }

    #[test]
    fn aggregate_counts_projects_once_per_user() {
        let mut double_role = team();
        double_role.assistant2_id = Some(1);
        let engagements = vec![
            EngagementFigures {
                engagement_id: 10,
                team: double_role,
                planned_hours: Some(dec("200")),
                requisites_amount: Some(dec("5000")),
                poi: true,
            },
            EngagementFigures {
                engagement_id: 11,
                team: TeamAssignment::for_creation(Some(1), None),
                planned_hours: None,
                requisites_amount: Some(dec("1000")),
                poi: false,
            },
        ];

        let rows = aggregate_team_metrics(&engagements, MetricsSort::Projects);
        let manager = rows.iter().find(|r| r.user_id == 1).unwrap();
        assert_eq!(rows[0].user_id, 1);
        assert_eq!(manager.projects_count, 2);
        assert_eq!(manager.poi_count, 1);
        assert_eq!(manager.contract_sum, dec("6000.00"));
        // 200 * 0.10 + 200 * 0.20 (half of the assistant pool)
        assert_eq!(manager.hours_sum, dec("60.00"));
        // 5000 * 0.30 + 1000 * 0.10
        assert_eq!(manager.budget_share_sum, dec("1600.00"));
    }

    #[test]
    fn aggregate_sorts_descending_by_requested_field() {
        let engagements = vec![EngagementFigures {
            engagement_id: 1,
            team: team(),
            planned_hours: Some(dec("100")),
            requisites_amount: None,
            poi: false,
        }];
        let rows = aggregate_team_metrics(&engagements, MetricsSort::Hours);
        assert_eq!(rows[0].user_id, 5);
        assert_eq!(rows[0].hours_sum, dec("40.00"));
        assert_eq!(rows.last().unwrap().user_id, 2);
    }

    #[test]
    fn sort_parameter_falls_back_to_projects() {
        assert_eq!(MetricsSort::parse(Some("budget")), MetricsSort::Budget);
        assert_eq!(MetricsSort::parse(Some("bogus")), MetricsSort::Projects);
        assert_eq!(MetricsSort::parse(None), MetricsSort::Projects);
    }
}
