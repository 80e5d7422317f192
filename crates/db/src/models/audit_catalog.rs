//! Audit catalog: steps, substeps and the action buttons bound to them.

use auditdesk_core::error::CoreError;
use auditdesk_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

// ---------------------------------------------------------------------------
// Action scope and placement
// ---------------------------------------------------------------------------

pub const SCOPE_STEP: &str = "step";
pub const SCOPE_SUBSTEP: &str = "substep";

pub const PLACEMENT_TOP: &str = "top";
pub const PLACEMENT_INLINE: &str = "inline";
pub const PLACEMENT_BOTTOM: &str = "bottom";
pub const VALID_PLACEMENTS: &[&str] = &[PLACEMENT_TOP, PLACEMENT_INLINE, PLACEMENT_BOTTOM];

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditStep {
    pub id: DbId,
    pub sort_order: i32,
    pub title: String,
    pub purpose: String,
    pub documentation: String,
    pub procedure_description: String,
    pub expected_result: String,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditSubstep {
    pub id: DbId,
    pub step_id: DbId,
    pub sort_order: i32,
    pub title: String,
    pub purpose: String,
    pub documentation: String,
    pub procedure_description: String,
    pub expected_result: String,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A substep joined with the order of its step, as needed for labels
/// (`Step 1.5`) and redirects.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SubstepWithStep {
    pub id: DbId,
    pub step_id: DbId,
    pub step_order: i32,
    pub sort_order: i32,
    pub title: String,
    pub is_active: bool,
    pub step_is_active: bool,
}

/// An action row with the names of its allowed groups.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StepAction {
    pub id: DbId,
    pub key: String,
    pub label: String,
    pub description: String,
    pub enabled: bool,
    pub sort_order: i32,
    pub scope: String,
    pub placement: String,
    pub step_id: Option<DbId>,
    pub substep_id: Option<DbId>,
    pub allowed_groups: Vec<String>,
}

/// Step with its active substeps, for the catalog listing.
#[derive(Debug, Clone, Serialize)]
pub struct StepWithSubsteps {
    #[serde(flatten)]
    pub step: AuditStep,
    pub substeps: Vec<AuditSubstep>,
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAuditStep {
    #[validate(range(min = 1))]
    pub sort_order: i32,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub documentation: String,
    #[serde(default)]
    pub procedure_description: String,
    #[serde(default)]
    pub expected_result: String,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAuditSubstep {
    pub step_id: DbId,
    #[validate(range(min = 1))]
    pub sort_order: i32,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub documentation: String,
    #[serde(default)]
    pub procedure_description: String,
    #[serde(default)]
    pub expected_result: String,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateStepAction {
    #[validate(length(min = 1, max = 80))]
    pub key: String,
    #[validate(length(min = 1, max = 120))]
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub enabled: Option<bool>,
    pub sort_order: Option<i32>,
    pub placement: Option<String>,
    /// Exactly one of `step_id` / `substep_id` must be set; it decides the scope.
    pub step_id: Option<DbId>,
    pub substep_id: Option<DbId>,
    #[serde(default)]
    pub allowed_groups: Vec<String>,
}

impl CreateStepAction {
    /// Scope implied by the owner, or an error when the binding is ambiguous.
    pub fn scope(&self) -> Result<&'static str, CoreError> {
        match (self.step_id, self.substep_id) {
            (Some(_), None) => Ok(SCOPE_STEP),
            (None, Some(_)) => Ok(SCOPE_SUBSTEP),
            _ => Err(CoreError::Validation(
                "An action must be bound to exactly one of step_id or substep_id".to_string(),
            )),
        }
    }

    /// Keys are slugs: lowercase ASCII letters, digits, `-` and `_`.
    pub fn validate_key(&self) -> Result<(), CoreError> {
        let ok = self
            .key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
        if ok {
            Ok(())
        } else {
            Err(CoreError::Validation(format!("Invalid action key '{}'", self.key)))
        }
    }

    pub fn validate_placement(&self) -> Result<(), CoreError> {
        match self.placement.as_deref() {
            None => Ok(()),
            Some(p) if VALID_PLACEMENTS.contains(&p) => Ok(()),
            Some(p) => Err(CoreError::Validation(format!(
                "Invalid placement '{p}'. Must be one of: {}",
                VALID_PLACEMENTS.join(", ")
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(step_id: Option<DbId>, substep_id: Option<DbId>) -> CreateStepAction {
        CreateStepAction {
            key: "generate-order".into(),
            label: "Generate".into(),
            description: String::new(),
            enabled: None,
            sort_order: None,
            placement: Some("top".into()),
            step_id,
            substep_id,
            allowed_groups: vec![],
        }
    }

    #[test]
    fn scope_follows_owner() {
        assert_eq!(action(Some(1), None).scope().unwrap(), SCOPE_STEP);
        assert_eq!(action(None, Some(1)).scope().unwrap(), SCOPE_SUBSTEP);
        assert!(action(Some(1), Some(2)).scope().is_err());
        assert!(action(None, None).scope().is_err());
    }

    #[test]
    fn key_must_be_slug() {
        assert!(action(Some(1), None).validate_key().is_ok());
        let mut bad = action(Some(1), None);
        bad.key = "Generate Order".into();
        assert!(bad.validate_key().is_err());
    }
}
