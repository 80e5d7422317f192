//! Engagement record rules: status codes, field validation, the completion
//! gate and display helpers.

use serde::Serialize;

use crate::choices::{
    check_choice, label_for, Choice, EngagementSubject, LegalForm, ReportParagraph, ReportType,
    SupervisoryBody,
};
use crate::error::{CoreError, FieldViolation};
use crate::reporting_period::check_reporting_period;
use crate::types::{Date, DbId};

// ---------------------------------------------------------------------------
// Status codes
// ---------------------------------------------------------------------------

/// Free-text status; these are the codes the application itself writes.
pub const STATUS_NEW: &str = "new";
pub const STATUS_ACTIVE: &str = "active";

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Raw choice codes of an engagement, as submitted or as stored.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChoiceCodes<'a> {
    pub engagement_subject: Option<&'a str>,
    pub legal_form: Option<&'a str>,
    pub supervision_body: Option<&'a str>,
    pub audit_report_type: Option<&'a str>,
    pub audit_report_paragraph: Option<&'a str>,
}

/// The validated view of an engagement after a create or merged update.
#[derive(Debug, Default, Clone, Copy)]
pub struct EngagementCheck<'a> {
    pub name: Option<&'a str>,
    pub requisites_number: Option<&'a str>,
    pub requisites_date: Option<Date>,
    pub reporting_period: Option<&'a str>,
    pub audit_report_date: Option<Date>,
    pub manager_id: Option<DbId>,
    pub qa_manager_id: Option<DbId>,
    pub choices: ChoiceCodes<'a>,
}

fn blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

const REQUIRED: &str = "This field is required";

/// Validate an engagement. `stored` holds the row's current choice codes on
/// update so a retired code already on the row is still accepted.
pub fn validate_engagement(
    check: &EngagementCheck<'_>,
    stored: Option<&ChoiceCodes<'_>>,
) -> Result<(), CoreError> {
    let mut violations = Vec::new();

    let required_text = [
        ("name", check.name),
        ("requisites_number", check.requisites_number),
        ("reporting_period", check.reporting_period),
        ("engagement_subject", check.choices.engagement_subject),
    ];
    for (field, value) in required_text {
        if blank(value) {
            violations.push(FieldViolation::new(field, REQUIRED));
        }
    }
    if check.requisites_date.is_none() {
        violations.push(FieldViolation::new("requisites_date", REQUIRED));
    }
    if check.manager_id.is_none() {
        violations.push(FieldViolation::new("manager_id", REQUIRED));
    }
    if check.qa_manager_id.is_none() {
        violations.push(FieldViolation::new("qa_manager_id", REQUIRED));
    }

    violations.extend(check_reporting_period("reporting_period", check.reporting_period));
    violations.extend(check_report_pairing(
        check.choices.audit_report_type,
        check.audit_report_date,
    ));

    let stored = stored.copied().unwrap_or_default();
    let submitted = check.choices;
    violations.extend(check_choice::<EngagementSubject>(
        "engagement_subject",
        submitted.engagement_subject,
        stored.engagement_subject,
    ));
    violations.extend(check_choice::<LegalForm>(
        "legal_form",
        submitted.legal_form,
        stored.legal_form,
    ));
    violations.extend(check_choice::<SupervisoryBody>(
        "supervision_body",
        submitted.supervision_body,
        stored.supervision_body,
    ));
    violations.extend(check_choice::<ReportType>(
        "audit_report_type",
        submitted.audit_report_type,
        stored.audit_report_type,
    ));
    violations.extend(check_choice::<ReportParagraph>(
        "audit_report_paragraph",
        submitted.audit_report_paragraph,
        stored.audit_report_paragraph,
    ));

    CoreError::from_violations(violations)
}

/// A modified-opinion report type and its date go together.
pub fn check_report_pairing(report_type: Option<&str>, report_date: Option<Date>) -> Vec<FieldViolation> {
    match (blank(report_type), report_date.is_some()) {
        (false, false) => vec![FieldViolation::new(
            "audit_report_date",
            "Report date is required when a report type is set",
        )],
        (true, true) => vec![FieldViolation::new(
            "audit_report_type",
            "Report type is required when a report date is set",
        )],
        _ => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Completion gate
// ---------------------------------------------------------------------------

/// An engagement may be completed once the audit report scan is attached and
/// the working-paper controls are confirmed.
pub fn check_completion(
    is_completed: bool,
    cw_controls_done: bool,
    audit_report_scan: Option<&str>,
) -> Result<(), CoreError> {
    if is_completed {
        return Err(CoreError::Conflict("Engagement is already completed".to_string()));
    }
    let mut missing = Vec::new();
    if blank(audit_report_scan) {
        missing.push("the audit report scan is not uploaded");
    }
    if !cw_controls_done {
        missing.push("working-paper controls are not confirmed");
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Cannot complete engagement: {}",
            missing.join("; ")
        )))
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

/// `name | period | Дог. number | subject label`, skipping empty parts.
pub fn display_label(
    name: &str,
    reporting_period: Option<&str>,
    requisites_number: Option<&str>,
    engagement_subject: Option<&str>,
) -> String {
    let mut parts = vec![name.trim().to_string()];
    if let Some(period) = reporting_period.filter(|p| !p.trim().is_empty()) {
        parts.push(period.trim().to_string());
    }
    if let Some(number) = requisites_number.filter(|n| !n.trim().is_empty()) {
        parts.push(format!("Дог. {}", number.trim()));
    }
    let subject = label_for::<EngagementSubject>(engagement_subject);
    if !subject.is_empty() {
        parts.push(subject);
    }
    parts.retain(|p| !p.is_empty());
    parts.join(" | ")
}

/// Deadline used for filtering and sorting: the contract deadline, else the
/// secondary deadline.
pub fn effective_deadline(contract_deadline: Option<Date>, deadline: Option<Date>) -> Option<Date> {
    contract_deadline.or(deadline)
}

/// A `{ value, label }` pair for filter drop-downs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
}

/// All engagement subjects as filter options.
pub fn subject_options() -> Vec<ChoiceOption> {
    EngagementSubject::KNOWN
        .iter()
        .map(|code| ChoiceOption {
            value: code.to_string(),
            label: EngagementSubject::from_code(code).label().to_string(),
        })
        .collect()
}
