//! Authorization predicates over an [`Actor`].
//!
//! The actor's group set is resolved once when the access token is issued,
//! so every check here is a pure function of the actor and the engagement
//! team. Handlers call the `require_*` wrappers, which turn a `false` into
//! `CoreError::Forbidden` carrying the reason shown to the caller.

use serde::{Deserialize, Serialize};

use crate::documents::DocumentTemplate;
use crate::error::CoreError;
use crate::groups::GROUP_MANAGER;
use crate::team::TeamAssignment;
use crate::types::DbId;

/// The authenticated user as seen by authorization checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: DbId,
    pub organization_id: DbId,
    pub is_superuser: bool,
    pub groups: Vec<String>,
}

impl Actor {
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

pub fn is_manager(actor: &Actor) -> bool {
    actor.in_group(GROUP_MANAGER)
}

/// Whether the actor holds any of the nine team slots.
pub fn user_in_engagement_team(actor: &Actor, team: &TeamAssignment) -> bool {
    team.contains(actor.user_id)
}

/// Who may run the team-assignment action (step 1.5): superusers and the
/// manager group. Holding the manager slot on the engagement is not enough.
pub fn can_manage_step15(actor: &Actor) -> bool {
    actor.is_superuser || is_manager(actor)
}

/// Whether the actor may run a catalog action.
///
/// An action with allowed groups admits only members of those groups. An
/// ungated action admits managers and the engagement team.
pub fn action_allowed(actor: &Actor, allowed_groups: &[String], team: Option<&TeamAssignment>) -> bool {
    if actor.is_superuser {
        return true;
    }
    if !allowed_groups.is_empty() {
        return allowed_groups.iter().any(|g| actor.in_group(g));
    }
    is_manager(actor) || team.is_some_and(|t| user_in_engagement_team(actor, t))
}

/// Superusers and managers see every engagement of their organization.
pub fn can_view_all_engagements(actor: &Actor) -> bool {
    actor.is_superuser || is_manager(actor)
}

pub fn can_view_engagement(actor: &Actor, team: &TeamAssignment) -> bool {
    can_view_all_engagements(actor) || user_in_engagement_team(actor, team)
}

pub fn can_edit_engagement(actor: &Actor, team: &TeamAssignment) -> bool {
    can_view_engagement(actor, team)
}

pub fn can_create_engagement(actor: &Actor) -> bool {
    actor.is_superuser
}

pub fn can_delete_engagement(actor: &Actor) -> bool {
    actor.is_superuser || is_manager(actor)
}

pub fn can_complete_engagement(actor: &Actor) -> bool {
    actor.is_superuser || is_manager(actor)
}

/// Archive of completed engagements.
pub fn can_view_archive(actor: &Actor) -> bool {
    actor.is_superuser || is_manager(actor)
}

/// Manual done/not-done toggle on a substep.
pub fn can_toggle_progress(actor: &Actor) -> bool {
    actor.is_superuser || is_manager(actor)
}

pub fn can_view_monitoring(actor: &Actor) -> bool {
    actor.is_superuser || is_manager(actor)
}

/// Team metrics are limited to the manager group.
pub fn can_view_metrics(actor: &Actor) -> bool {
    is_manager(actor)
}

/// Uploading into a substep, editing or removing documents.
pub fn can_modify_documents(actor: &Actor, team: &TeamAssignment) -> bool {
    actor.is_superuser || is_manager(actor) || user_in_engagement_team(actor, team)
}

pub fn can_generate(actor: &Actor, template: DocumentTemplate, team: &TeamAssignment) -> bool {
    match template {
        DocumentTemplate::Order | DocumentTemplate::Reminder => can_manage_step15(actor),
        DocumentTemplate::Independence => {
            actor.is_superuser || user_in_engagement_team(actor, team)
        }
        DocumentTemplate::Acceptance => can_edit_engagement(actor, team),
    }
}

// ---------------------------------------------------------------------------
// Guards
// ---------------------------------------------------------------------------

/// Map a predicate result to `Forbidden(reason)`.
pub fn require(allowed: bool, reason: &str) -> Result<(), CoreError> {
    if allowed {
        Ok(())
    } else {
        Err(CoreError::Forbidden(reason.to_string()))
    }
}

pub fn require_view(actor: &Actor, team: &TeamAssignment) -> Result<(), CoreError> {
    require(
        can_view_engagement(actor, team),
        "You are not assigned to this engagement",
    )
}

pub fn require_edit(actor: &Actor, team: &TeamAssignment) -> Result<(), CoreError> {
    require(
        can_edit_engagement(actor, team),
        "Only the engagement team or a manager can edit this engagement",
    )
}

pub fn require_step15(actor: &Actor) -> Result<(), CoreError> {
    require(
        can_manage_step15(actor),
        "Only a manager or superuser can assign the engagement team",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(user_id: DbId, superuser: bool, groups: &[&str]) -> Actor {
        Actor {
            user_id,
            organization_id: 1,
            is_superuser: superuser,
            groups: groups.iter().map(|g| g.to_string()).collect(),
        }
    }

    fn team_with_auditor(user_id: DbId) -> TeamAssignment {
        TeamAssignment {
            manager_id: Some(100),
            auditor2_id: Some(user_id),
            ..TeamAssignment::default()
        }
    }

    #[test]
    fn outsider_is_denied_every_mutation() {
        let outsider = actor(7, false, &["staff"]);
        let team = team_with_auditor(8);
        assert!(!can_view_engagement(&outsider, &team));
        assert!(!can_edit_engagement(&outsider, &team));
        assert!(!can_manage_step15(&outsider));
        assert!(!can_toggle_progress(&outsider));
        assert!(!can_complete_engagement(&outsider));
        assert!(!can_delete_engagement(&outsider));
        assert!(!can_modify_documents(&outsider, &team));
        assert!(!action_allowed(&outsider, &[], Some(&team)));
        for template in DocumentTemplate::ALL {
            assert!(!can_generate(&outsider, template, &team));
        }
    }

    #[test]
    fn team_member_can_edit_but_not_assign_team() {
        let member = actor(8, false, &[]);
        let team = team_with_auditor(8);
        assert!(can_edit_engagement(&member, &team));
        assert!(!can_manage_step15(&member));
        assert!(can_generate(&member, DocumentTemplate::Independence, &team));
        assert!(!can_generate(&member, DocumentTemplate::Order, &team));
    }

    #[test]
    fn engagement_manager_slot_does_not_grant_step15() {
        let lead = actor(100, false, &[]);
        assert!(!can_manage_step15(&lead));
    }

    #[test]
    fn gated_action_requires_group_intersection() {
        let groups = vec!["qa".to_string()];
        let team = team_with_auditor(8);
        assert!(!action_allowed(&actor(8, false, &[]), &groups, Some(&team)));
        assert!(action_allowed(&actor(9, false, &["qa"]), &groups, None));
        assert!(!action_allowed(&actor(9, false, &["manager"]), &groups, None));
        assert!(action_allowed(&actor(1, true, &[]), &groups, None));
    }

    #[test]
    fn ungated_action_admits_manager_or_team() {
        let team = team_with_auditor(8);
        assert!(action_allowed(&actor(8, false, &[]), &[], Some(&team)));
        assert!(action_allowed(&actor(5, false, &["manager"]), &[], None));
        assert!(!action_allowed(&actor(5, false, &[]), &[], None));
    }

    #[test]
    fn metrics_are_manager_group_only() {
        assert!(can_view_metrics(&actor(1, false, &["manager"])));
        assert!(!can_view_metrics(&actor(1, true, &[])));
    }

    #[test]
    fn guard_carries_reason() {
        let err = require_step15(&actor(1, false, &[])).unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(reason) if reason.contains("manager")));
    }
}
