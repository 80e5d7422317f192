//! Engagement team slots and the propagation rule that keeps the team
//! identical across every engagement sharing one contract.
//!
//! Engagements belong to the same contract when they match on
//! (organization, name, contract number, contract date). No database access;
//! the repository layer feeds rows in and persists the resulting plan.

use serde::{Deserialize, Serialize};

use crate::types::{Date, DbId};

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// One of the nine team slots on an engagement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamRole {
    Manager,
    QaManager,
    Auditor,
    Auditor2,
    Auditor3,
    Assistant,
    Assistant2,
    Assistant3,
    Assistant4,
}

impl TeamRole {
    /// All slots in display order.
    pub const ALL: [TeamRole; 9] = [
        TeamRole::Manager,
        TeamRole::QaManager,
        TeamRole::Auditor,
        TeamRole::Auditor2,
        TeamRole::Auditor3,
        TeamRole::Assistant,
        TeamRole::Assistant2,
        TeamRole::Assistant3,
        TeamRole::Assistant4,
    ];

    pub const AUDITORS: [TeamRole; 3] = [TeamRole::Auditor, TeamRole::Auditor2, TeamRole::Auditor3];

    pub const ASSISTANTS: [TeamRole; 4] = [
        TeamRole::Assistant,
        TeamRole::Assistant2,
        TeamRole::Assistant3,
        TeamRole::Assistant4,
    ];

    /// Column name on the `engagements` table.
    pub fn column(self) -> &'static str {
        match self {
            TeamRole::Manager => "manager_id",
            TeamRole::QaManager => "qa_manager_id",
            TeamRole::Auditor => "auditor_id",
            TeamRole::Auditor2 => "auditor2_id",
            TeamRole::Auditor3 => "auditor3_id",
            TeamRole::Assistant => "assistant_id",
            TeamRole::Assistant2 => "assistant2_id",
            TeamRole::Assistant3 => "assistant3_id",
            TeamRole::Assistant4 => "assistant4_id",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TeamRole::Manager => "Менеджер",
            TeamRole::QaManager => "Менеджер з контролю якості",
            TeamRole::Auditor => "Аудитор 1",
            TeamRole::Auditor2 => "Аудитор 2",
            TeamRole::Auditor3 => "Аудитор 3",
            TeamRole::Assistant => "Асистент 1",
            TeamRole::Assistant2 => "Асистент 2",
            TeamRole::Assistant3 => "Асистент 3",
            TeamRole::Assistant4 => "Асистент 4",
        }
    }

    /// Leads are the only slots a creator may fill.
    pub fn is_lead(self) -> bool {
        matches!(self, TeamRole::Manager | TeamRole::QaManager)
    }
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

/// The nine team slots of one engagement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamAssignment {
    pub manager_id: Option<DbId>,
    pub qa_manager_id: Option<DbId>,
    pub auditor_id: Option<DbId>,
    pub auditor2_id: Option<DbId>,
    pub auditor3_id: Option<DbId>,
    pub assistant_id: Option<DbId>,
    pub assistant2_id: Option<DbId>,
    pub assistant3_id: Option<DbId>,
    pub assistant4_id: Option<DbId>,
}

impl TeamAssignment {
    /// Team for a newly created engagement: only the leads are kept.
    pub fn for_creation(manager_id: Option<DbId>, qa_manager_id: Option<DbId>) -> Self {
        Self {
            manager_id,
            qa_manager_id,
            ..Self::default()
        }
    }

    /// Team for a general edit: the leads come from the request, the other
    /// seven slots are restored from `stored`.
    pub fn with_leads(
        stored: &TeamAssignment,
        manager_id: Option<DbId>,
        qa_manager_id: Option<DbId>,
    ) -> Self {
        Self {
            manager_id,
            qa_manager_id,
            ..*stored
        }
    }

    pub fn get(&self, role: TeamRole) -> Option<DbId> {
        match role {
            TeamRole::Manager => self.manager_id,
            TeamRole::QaManager => self.qa_manager_id,
            TeamRole::Auditor => self.auditor_id,
            TeamRole::Auditor2 => self.auditor2_id,
            TeamRole::Auditor3 => self.auditor3_id,
            TeamRole::Assistant => self.assistant_id,
            TeamRole::Assistant2 => self.assistant2_id,
            TeamRole::Assistant3 => self.assistant3_id,
            TeamRole::Assistant4 => self.assistant4_id,
        }
    }

    pub fn set(&mut self, role: TeamRole, user_id: Option<DbId>) {
        let slot = match role {
            TeamRole::Manager => &mut self.manager_id,
            TeamRole::QaManager => &mut self.qa_manager_id,
            TeamRole::Auditor => &mut self.auditor_id,
            TeamRole::Auditor2 => &mut self.auditor2_id,
            TeamRole::Auditor3 => &mut self.auditor3_id,
            TeamRole::Assistant => &mut self.assistant_id,
            TeamRole::Assistant2 => &mut self.assistant2_id,
            TeamRole::Assistant3 => &mut self.assistant3_id,
            TeamRole::Assistant4 => &mut self.assistant4_id,
        };
        *slot = user_id;
    }

    /// Filled slots in display order, with repeats when one user holds
    /// several roles.
    pub fn members(&self) -> Vec<(TeamRole, DbId)> {
        TeamRole::ALL
            .iter()
            .filter_map(|&role| self.get(role).map(|id| (role, id)))
            .collect()
    }

    /// Distinct user ids in first-seen order.
    pub fn distinct_members(&self) -> Vec<DbId> {
        let mut seen = Vec::new();
        for (_, id) in self.members() {
            if !seen.contains(&id) {
                seen.push(id);
            }
        }
        seen
    }

    pub fn contains(&self, user_id: DbId) -> bool {
        TeamRole::ALL.iter().any(|&role| self.get(role) == Some(user_id))
    }

    /// Whether any of the nine slots differs.
    pub fn differs_from(&self, other: &TeamAssignment) -> bool {
        self != other
    }

    /// Assigned auditors (slots 1 to 3).
    pub fn auditors(&self) -> Vec<DbId> {
        TeamRole::AUDITORS.iter().filter_map(|&r| self.get(r)).collect()
    }

    /// Assigned assistants (slots 1 to 4).
    pub fn assistants(&self) -> Vec<DbId> {
        TeamRole::ASSISTANTS.iter().filter_map(|&r| self.get(r)).collect()
    }
}

// ---------------------------------------------------------------------------
// Contract identity and propagation
// ---------------------------------------------------------------------------

/// The key under which sibling engagements share a team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractIdentity {
    pub organization_id: DbId,
    pub name: String,
    pub requisites_number: Option<String>,
    pub requisites_date: Option<Date>,
}

impl ContractIdentity {
    /// A number (non-blank) and a date are both needed to find siblings.
    pub fn is_complete(&self) -> bool {
        self.requisites_number
            .as_deref()
            .is_some_and(|n| !n.trim().is_empty())
            && self.requisites_date.is_some()
    }
}

/// Outcome of [`plan_team_save`]: the team to persist on the saved row and
/// whether siblings must be overwritten with it afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamSavePlan {
    pub team: TeamAssignment,
    pub propagate: bool,
}

/// Decide what team an engagement save persists and whether it propagates.
///
/// - `stored` is `None` for a new engagement, else the row's current team.
/// - `existing_sibling` is the team of another engagement with the same
///   contract identity. For updates the caller passes it only when the save
///   moves the engagement onto a different contract.
///
/// Rules:
/// 1. Incomplete identity: save as submitted, never propagate.
/// 2. New engagement joining an existing contract: inherit the sibling's team,
///    no propagation.
/// 3. New engagement starting a contract: keep the submitted team and
///    propagate (a no-op while it has no siblings).
/// 4. Update that changes at least one slot: keep the submitted team and
///    propagate.
/// 5. Update with an unchanged team that moves onto an existing contract:
///    inherit the sibling's team, no propagation.
/// 6. Any other update: save as submitted, no propagation.
pub fn plan_team_save(
    identity: &ContractIdentity,
    submitted: TeamAssignment,
    existing_sibling: Option<&TeamAssignment>,
    stored: Option<&TeamAssignment>,
) -> TeamSavePlan {
    if !identity.is_complete() {
        return TeamSavePlan {
            team: submitted,
            propagate: false,
        };
    }

    match stored {
        None => match existing_sibling {
            Some(base) => TeamSavePlan {
                team: *base,
                propagate: false,
            },
            None => TeamSavePlan {
                team: submitted,
                propagate: true,
            },
        },
        Some(previous) if submitted.differs_from(previous) => TeamSavePlan {
            team: submitted,
            propagate: true,
        },
        Some(_) => TeamSavePlan {
            team: existing_sibling.copied().unwrap_or(submitted),
            propagate: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn identity(number: Option<&str>, date: bool) -> ContractIdentity {
        ContractIdentity {
            organization_id: 1,
            name: "Acme".into(),
            requisites_number: number.map(String::from),
            requisites_date: date.then(|| NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()),
        }
    }

    fn team(manager: DbId, auditor: Option<DbId>) -> TeamAssignment {
        TeamAssignment {
            manager_id: Some(manager),
            auditor_id: auditor,
            ..TeamAssignment::default()
        }
    }

    #[test]
    fn identity_requires_number_and_date() {
        assert!(identity(Some("12/A"), true).is_complete());
        assert!(!identity(Some("  "), true).is_complete());
        assert!(!identity(None, true).is_complete());
        assert!(!identity(Some("12/A"), false).is_complete());
    }

    #[test]
    fn incomplete_identity_never_propagates() {
        let submitted = team(5, Some(6));
        let plan = plan_team_save(&identity(None, true), submitted, Some(&team(9, None)), None);
        assert_eq!(plan.team, submitted);
        assert!(!plan.propagate);
    }

    #[test]
    fn new_engagement_inherits_sibling_team_without_propagating() {
        let base = team(9, Some(10));
        let plan = plan_team_save(&identity(Some("1"), true), team(5, None), Some(&base), None);
        assert_eq!(plan.team, base);
        assert!(!plan.propagate);
    }

    #[test]
    fn first_engagement_of_contract_propagates() {
        let submitted = team(5, None);
        let plan = plan_team_save(&identity(Some("1"), true), submitted, None, None);
        assert_eq!(plan.team, submitted);
        assert!(plan.propagate);
    }

    #[test]
    fn update_propagates_only_on_change() {
        let stored = team(5, Some(6));
        let unchanged = plan_team_save(&identity(Some("1"), true), stored, None, Some(&stored));
        assert!(!unchanged.propagate);

        let changed =
            plan_team_save(&identity(Some("1"), true), team(5, Some(7)), None, Some(&stored));
        assert!(changed.propagate);
        assert_eq!(changed.team.auditor_id, Some(7));
    }

    #[test]
    fn moving_onto_a_contract_adopts_its_team() {
        let stored = team(5, Some(6));
        let base = team(9, Some(10));
        let plan = plan_team_save(&identity(Some("1"), true), stored, Some(&base), Some(&stored));
        assert_eq!(plan.team, base);
        assert!(!plan.propagate);
    }

    #[test]
    fn moving_onto_a_contract_with_a_new_team_overrides_it() {
        let stored = team(5, Some(6));
        let submitted = team(5, Some(7));
        let plan = plan_team_save(
            &identity(Some("1"), true),
            submitted,
            Some(&team(9, None)),
            Some(&stored),
        );
        assert_eq!(plan.team, submitted);
        assert!(plan.propagate);
    }

    #[test]
    fn creation_keeps_only_leads() {
        let t = TeamAssignment::for_creation(Some(1), Some(2));
        assert_eq!(t.members(), vec![(TeamRole::Manager, 1), (TeamRole::QaManager, 2)]);
    }

    #[test]
    fn edit_restores_non_lead_slots() {
        let mut stored = team(1, Some(3));
        stored.assistant4_id = Some(4);
        let t = TeamAssignment::with_leads(&stored, Some(8), None);
        assert_eq!(t.manager_id, Some(8));
        assert_eq!(t.qa_manager_id, None);
        assert_eq!(t.auditor_id, Some(3));
        assert_eq!(t.assistant4_id, Some(4));
    }

    #[test]
    fn distinct_members_collapses_repeated_user() {
        let mut t = team(1, Some(1));
        t.set(TeamRole::Assistant2, Some(2));
        assert_eq!(t.distinct_members(), vec![1, 2]);
        assert!(t.contains(2));
        assert!(!t.contains(3));
        assert_eq!(t.get(TeamRole::Assistant2), Some(2));
    }
}
