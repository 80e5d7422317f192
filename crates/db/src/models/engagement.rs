//! Engagement entity model and DTOs.

use auditdesk_core::choices::{label_for, EngagementSubject};
use auditdesk_core::engagement::{display_label, effective_deadline, ChoiceCodes, EngagementCheck};
use auditdesk_core::team::{ContractIdentity, TeamAssignment};
use auditdesk_core::types::{Date, DbId, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `engagements` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Engagement {
    pub id: DbId,
    pub organization_id: DbId,
    pub name: String,

    pub edrpou: Option<String>,
    pub address_country: Option<String>,
    pub address_city: Option<String>,
    pub address_street: Option<String>,
    pub address_building: Option<String>,
    pub address_office: Option<String>,
    pub address_zip: Option<String>,
    pub kved: Option<String>,
    pub poi: bool,

    pub requisites_number: Option<String>,
    pub requisites_date: Option<Date>,
    pub requisites_amount: Option<Decimal>,
    pub requisites_vat: Option<Decimal>,

    pub supervision_body: Option<String>,
    pub legal_form: Option<String>,
    pub mandatory_audit: bool,
    pub reporting_period: Option<String>,
    pub contract_deadline: Option<Date>,
    pub deadline: Option<Date>,
    pub engagement_subject: Option<String>,

    pub authorized_person_name: Option<String>,
    pub authorized_person_email: Option<String>,

    pub audit_report_number: Option<String>,
    pub audit_report_date: Option<Date>,
    pub audit_report_type: Option<String>,
    pub audit_report_paragraph: Option<String>,
    pub supervision_notice_date: Option<Date>,
    pub cw_controls_done: bool,
    pub audit_report_scan: Option<String>,
    pub planned_hours: Option<Decimal>,

    pub status: String,
    pub is_completed: bool,
    pub completed_at: Option<Timestamp>,
    pub completed_by: Option<DbId>,

    pub manager_id: Option<DbId>,
    pub qa_manager_id: Option<DbId>,
    pub auditor_id: Option<DbId>,
    pub auditor2_id: Option<DbId>,
    pub auditor3_id: Option<DbId>,
    pub assistant_id: Option<DbId>,
    pub assistant2_id: Option<DbId>,
    pub assistant3_id: Option<DbId>,
    pub assistant4_id: Option<DbId>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Engagement {
    pub fn team(&self) -> TeamAssignment {
        TeamAssignment {
            manager_id: self.manager_id,
            qa_manager_id: self.qa_manager_id,
            auditor_id: self.auditor_id,
            auditor2_id: self.auditor2_id,
            auditor3_id: self.auditor3_id,
            assistant_id: self.assistant_id,
            assistant2_id: self.assistant2_id,
            assistant3_id: self.assistant3_id,
            assistant4_id: self.assistant4_id,
        }
    }

    pub fn contract_identity(&self) -> ContractIdentity {
        ContractIdentity {
            organization_id: self.organization_id,
            name: self.name.clone(),
            requisites_number: self.requisites_number.clone(),
            requisites_date: self.requisites_date,
        }
    }

    pub fn choice_codes(&self) -> ChoiceCodes<'_> {
        ChoiceCodes {
            engagement_subject: self.engagement_subject.as_deref(),
            legal_form: self.legal_form.as_deref(),
            supervision_body: self.supervision_body.as_deref(),
            audit_report_type: self.audit_report_type.as_deref(),
            audit_report_paragraph: self.audit_report_paragraph.as_deref(),
        }
    }

    pub fn display_label(&self) -> String {
        display_label(
            &self.name,
            self.reporting_period.as_deref(),
            self.requisites_number.as_deref(),
            self.engagement_subject.as_deref(),
        )
    }

    pub fn effective_deadline(&self) -> Option<Date> {
        effective_deadline(self.contract_deadline, self.deadline)
    }
}

/// Engagement plus the derived labels shown in lists.
#[derive(Debug, Clone, Serialize)]
pub struct EngagementResponse {
    #[serde(flatten)]
    pub engagement: Engagement,
    pub display_label: String,
    pub subject_label: String,
}

impl From<Engagement> for EngagementResponse {
    fn from(engagement: Engagement) -> Self {
        let display_label = engagement.display_label();
        let subject_label =
            label_for::<EngagementSubject>(engagement.engagement_subject.as_deref());
        Self {
            engagement,
            display_label,
            subject_label,
        }
    }
}

/// Create/replace payload for an engagement.
///
/// A `PUT` carries the full form, like a create. The team here holds only the
/// two leads; the other slots are managed by the team-assignment action.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct EngagementInput {
    #[validate(length(max = 255))]
    pub name: String,

    #[validate(length(max = 20))]
    pub edrpou: Option<String>,
    pub address_country: Option<String>,
    pub address_city: Option<String>,
    pub address_street: Option<String>,
    pub address_building: Option<String>,
    pub address_office: Option<String>,
    pub address_zip: Option<String>,
    pub kved: Option<String>,
    #[serde(default)]
    pub poi: bool,

    #[validate(length(max = 100))]
    pub requisites_number: Option<String>,
    pub requisites_date: Option<Date>,
    pub requisites_amount: Option<Decimal>,
    pub requisites_vat: Option<Decimal>,

    pub supervision_body: Option<String>,
    pub legal_form: Option<String>,
    #[serde(default)]
    pub mandatory_audit: bool,
    pub reporting_period: Option<String>,
    pub contract_deadline: Option<Date>,
    pub deadline: Option<Date>,
    pub engagement_subject: Option<String>,

    pub authorized_person_name: Option<String>,
    #[validate(email)]
    pub authorized_person_email: Option<String>,

    pub audit_report_number: Option<String>,
    pub audit_report_date: Option<Date>,
    pub audit_report_type: Option<String>,
    pub audit_report_paragraph: Option<String>,
    pub supervision_notice_date: Option<Date>,
    #[serde(default)]
    pub cw_controls_done: bool,
    pub planned_hours: Option<Decimal>,
    pub status: Option<String>,

    pub manager_id: Option<DbId>,
    pub qa_manager_id: Option<DbId>,
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl EngagementInput {
    /// Trim text fields and turn blanks into `None`.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            edrpou: clean(self.edrpou),
            address_country: clean(self.address_country),
            address_city: clean(self.address_city),
            address_street: clean(self.address_street),
            address_building: clean(self.address_building),
            address_office: clean(self.address_office),
            address_zip: clean(self.address_zip),
            kved: clean(self.kved),
            requisites_number: clean(self.requisites_number),
            supervision_body: clean(self.supervision_body),
            legal_form: clean(self.legal_form),
            reporting_period: clean(self.reporting_period),
            engagement_subject: clean(self.engagement_subject),
            authorized_person_name: clean(self.authorized_person_name),
            authorized_person_email: clean(self.authorized_person_email),
            audit_report_number: clean(self.audit_report_number),
            audit_report_type: clean(self.audit_report_type),
            audit_report_paragraph: clean(self.audit_report_paragraph),
            status: clean(self.status),
            ..self
        }
    }

    /// View for the domain validators.
    pub fn check(&self) -> EngagementCheck<'_> {
        EngagementCheck {
            name: Some(self.name.as_str()),
            requisites_number: self.requisites_number.as_deref(),
            requisites_date: self.requisites_date,
            reporting_period: self.reporting_period.as_deref(),
            audit_report_date: self.audit_report_date,
            manager_id: self.manager_id,
            qa_manager_id: self.qa_manager_id,
            choices: ChoiceCodes {
                engagement_subject: self.engagement_subject.as_deref(),
                legal_form: self.legal_form.as_deref(),
                supervision_body: self.supervision_body.as_deref(),
                audit_report_type: self.audit_report_type.as_deref(),
                audit_report_paragraph: self.audit_report_paragraph.as_deref(),
            },
        }
    }

    pub fn contract_identity(&self, organization_id: DbId) -> ContractIdentity {
        ContractIdentity {
            organization_id,
            name: self.name.clone(),
            requisites_number: self.requisites_number.clone(),
            requisites_date: self.requisites_date,
        }
    }
}

/// Query parameters of the active dashboard.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardFilter {
    /// Substring match on name, EDRPOU or contract number.
    pub q: Option<String>,
    pub reporting_period: Option<String>,
    pub status: Option<String>,
    pub subject: Option<String>,
}

/// Ordering of the monitoring grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonitoringSort {
    /// Completed last, then by name.
    #[default]
    Default,
    DeadlineAsc,
    DeadlineDesc,
    ManagerAsc,
    ManagerDesc,
}

impl MonitoringSort {
    pub fn parse(sort: Option<&str>, dir: Option<&str>) -> Self {
        let desc = dir == Some("desc");
        match (sort, desc) {
            (Some("deadline"), false) => MonitoringSort::DeadlineAsc,
            (Some("deadline"), true) => MonitoringSort::DeadlineDesc,
            (Some("manager"), false) => MonitoringSort::ManagerAsc,
            (Some("manager"), true) => MonitoringSort::ManagerDesc,
            _ => MonitoringSort::Default,
        }
    }

    /// `ORDER BY` clause over `engagements e` joined with manager `m`.
    pub fn order_by(self) -> &'static str {
        match self {
            MonitoringSort::Default => "e.is_completed, e.name, e.id",
            MonitoringSort::DeadlineAsc => {
                "COALESCE(e.contract_deadline, e.deadline) ASC NULLS LAST, e.name, e.id"
            }
            MonitoringSort::DeadlineDesc => {
                "COALESCE(e.contract_deadline, e.deadline) DESC NULLS LAST, e.name, e.id"
            }
            MonitoringSort::ManagerAsc => {
                "m.last_name ASC NULLS LAST, m.first_name ASC NULLS LAST, m.username ASC NULLS LAST, e.name, e.id"
            }
            MonitoringSort::ManagerDesc => {
                "m.last_name DESC NULLS LAST, m.first_name DESC NULLS LAST, m.username DESC NULLS LAST, e.name, e.id"
            }
        }
    }
}

/// Filters of the monitoring grid.
#[derive(Debug, Clone, Default)]
pub struct MonitoringFilter {
    pub subject: Option<String>,
    pub manager_id: Option<DbId>,
    /// Holds any of the nine team slots.
    pub user_id: Option<DbId>,
    pub date_from: Option<Date>,
    pub date_to: Option<Date>,
    pub active_only: bool,
    pub sort: MonitoringSort,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_turns_blanks_into_none() {
        let input = EngagementInput {
            name: "  Acme ".into(),
            requisites_number: Some("  ".into()),
            engagement_subject: Some(" O_AUDIT ".into()),
            ..EngagementInput::default()
        }
        .normalized();
        assert_eq!(input.name, "Acme");
        assert_eq!(input.requisites_number, None);
        assert_eq!(input.engagement_subject.as_deref(), Some("O_AUDIT"));
    }

    #[test]
    fn monitoring_sort_parses_direction() {
        assert_eq!(MonitoringSort::parse(Some("deadline"), Some("desc")), MonitoringSort::DeadlineDesc);
        assert_eq!(MonitoringSort::parse(Some("manager"), None), MonitoringSort::ManagerAsc);
        assert_eq!(MonitoringSort::parse(Some("bogus"), Some("desc")), MonitoringSort::Default);
    }
}
