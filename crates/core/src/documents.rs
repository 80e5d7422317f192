//! Engagement document rules: document types, generated templates, the
//! placeholder field map and file-name sanitization for downloads and ZIP
//! archives. No I/O.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::team::{TeamAssignment, TeamRole};
use crate::types::{Date, DbId, Timestamp};

// ---------------------------------------------------------------------------
// Document types
// ---------------------------------------------------------------------------

pub const DOC_TYPE_CHARTER: &str = "charter";
pub const DOC_TYPE_REQUEST: &str = "request";
pub const DOC_TYPE_AGREEMENT: &str = "agreement";
pub const DOC_TYPE_OTHER: &str = "other";
pub const VALID_DOC_TYPES: &[&str] = &[
    DOC_TYPE_CHARTER,
    DOC_TYPE_REQUEST,
    DOC_TYPE_AGREEMENT,
    DOC_TYPE_OTHER,
];

/// Validate a document type. An empty string clears the type.
pub fn validate_doc_type(doc_type: &str) -> Result<(), CoreError> {
    if doc_type.is_empty() || VALID_DOC_TYPES.contains(&doc_type) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid document type '{doc_type}'. Must be one of: {}",
            VALID_DOC_TYPES.join(", ")
        )))
    }
}

/// Label attached to documents produced inside a substep, e.g. `Step 1.5`.
pub fn step_label(step_order: i32, substep_order: i32) -> String {
    format!("Step {step_order}.{substep_order}")
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// Documents generated from `.docx` templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentTemplate {
    /// Order appointing the engagement team.
    Order,
    /// Reminder letter to the team.
    Reminder,
    /// Team independence questionnaire.
    Independence,
    /// Engagement acceptance letter.
    Acceptance,
}

impl DocumentTemplate {
    pub const ALL: [DocumentTemplate; 4] = [
        DocumentTemplate::Order,
        DocumentTemplate::Reminder,
        DocumentTemplate::Independence,
        DocumentTemplate::Acceptance,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentTemplate::Order => "order",
            DocumentTemplate::Reminder => "reminder",
            DocumentTemplate::Independence => "independence",
            DocumentTemplate::Acceptance => "acceptance",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == value)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Unknown template '{value}'. Must be one of: order, reminder, independence, acceptance"
                ))
            })
    }

    /// File name of the template inside the templates directory.
    pub fn file_name(self) -> &'static str {
        match self {
            DocumentTemplate::Order => "order.docx",
            DocumentTemplate::Reminder => "remembrance_team.docx",
            DocumentTemplate::Independence => "team_independence.docx",
            DocumentTemplate::Acceptance => "acceptance_letter.docx",
        }
    }

    /// Name of a generated file. The independence questionnaire is per user,
    /// so it carries the username.
    pub fn output_name(self, engagement_id: DbId, username: &str, now: Timestamp) -> String {
        let stem = self.file_name().trim_end_matches(".docx");
        let stamp = now.format("%Y%m%d_%H%M%S");
        match self {
            DocumentTemplate::Independence => {
                format!("{stem}_{engagement_id}_{username}_{stamp}.docx")
            }
            _ => format!("{stem}_{engagement_id}_{stamp}.docx"),
        }
    }
}

// ---------------------------------------------------------------------------
// Field map
// ---------------------------------------------------------------------------

/// Wrap a field key in the placeholder syntax used by templates.
pub fn placeholder(key: &str) -> String {
    format!("{{{{ {key} }}}}")
}

fn field_key(role: TeamRole) -> &'static str {
    match role {
        TeamRole::Manager => "MANAGER",
        TeamRole::QaManager => "QA_MANAGER",
        TeamRole::Auditor => "AUDITOR_1",
        TeamRole::Auditor2 => "AUDITOR_2",
        TeamRole::Auditor3 => "AUDITOR_3",
        TeamRole::Assistant => "ASSISTANT_1",
        TeamRole::Assistant2 => "ASSISTANT_2",
        TeamRole::Assistant3 => "ASSISTANT_3",
        TeamRole::Assistant4 => "ASSISTANT_4",
    }
}

/// Values substituted into a template.
///
/// `names` maps user ids to their display names; unassigned slots and
/// unknown users render as empty strings.
pub fn build_field_map(
    engagement_name: &str,
    reporting_period: Option<&str>,
    team: &TeamAssignment,
    names: &HashMap<DbId, String>,
    today: Date,
    current_user: &str,
) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    fields.insert("CLIENT_NAME".to_string(), engagement_name.to_string());
    fields.insert(
        "REPORTING_PERIOD".to_string(),
        reporting_period.unwrap_or_default().to_string(),
    );
    for role in TeamRole::ALL {
        let value = team
            .get(role)
            .and_then(|id| names.get(&id).cloned())
            .unwrap_or_default();
        fields.insert(field_key(role).to_string(), value);
    }
    fields.insert("TODAY_DATE".to_string(), today.format("%d.%m.%Y").to_string());
    fields.insert("CURRENT_USER".to_string(), current_user.to_string());
    fields
}

/// "First Last" when either part is set, otherwise the username.
pub fn display_name(first_name: &str, last_name: &str, username: &str) -> String {
    let full = format!("{} {}", first_name.trim(), last_name.trim());
    let full = full.trim();
    if full.is_empty() {
        username.to_string()
    } else {
        full.to_string()
    }
}

// ---------------------------------------------------------------------------
// File names
// ---------------------------------------------------------------------------

const DEFAULT_ARCHIVE_NAME: &str = "documents";
const MAX_ARCHIVE_NAME_CHARS: usize = 120;

/// Base name (without `.zip`) for an engagement's document archive.
///
/// Quotes and characters invalid in Windows or Unix file names are removed,
/// whitespace runs collapse to one space and trailing dots are stripped.
pub fn archive_base_name(engagement_name: &str) -> String {
    let cleaned: String = engagement_name
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | '<' | '>' | ':' | '/' | '\\' | '|' | '?' | '*'))
        .filter(|c| !c.is_control())
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_matches(|c| c == '.' || c == ' ');
    if trimmed.is_empty() {
        return DEFAULT_ARCHIVE_NAME.to_string();
    }
    trimmed.chars().take(MAX_ARCHIVE_NAME_CHARS).collect()
}

/// Name of one archive entry: invalid characters become `_`; an empty
/// result falls back to `doc_{id}`.
pub fn archive_entry_name(original_name: &str, document_id: DbId) -> String {
    let replaced: String = original_name
        .chars()
        .map(|c| {
            if c.is_control() || matches!(c, '<' | '>' | ':' | '/' | '\\' | '|' | '?' | '*') {
                '_'
            } else {
                c
            }
        })
        .collect();
    let trimmed = replaced.trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '_' || c == '.') {
        format!("doc_{document_id}")
    } else {
        trimmed.to_string()
    }
}

/// Placeholder entry written when no document could be read.
pub const EMPTY_ARCHIVE_README: (&str, &str) =
    ("README.txt", "No files could be added to the archive.");

/// `Content-Disposition` value for a download, with the UTF-8 name
/// percent-encoded (RFC 5987) and an ASCII fallback.
pub fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        percent_encode(filename)
    )
}

fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;

    #[test]
    fn archive_name_strips_invalid_characters() {
        assert_eq!(archive_base_name("ТОВ \"Ромашка\"  /  2024"), "ТОВ Ромашка 2024");
        assert_eq!(archive_base_name("  \"\" "), "documents");
        assert_eq!(archive_base_name("Acme..."), "Acme");
    }

    #[test]
    fn entry_name_replaces_path_separators() {
        assert_eq!(archive_entry_name("a/b:c.pdf", 3), "a_b_c.pdf");
        assert_eq!(archive_entry_name("   ", 9), "doc_9");
    }

    #[test]
    fn field_map_fills_assigned_roles_only() {
        let team = TeamAssignment {
            manager_id: Some(1),
            assistant3_id: Some(2),
            auditor_id: Some(99),
            ..TeamAssignment::default()
        };
        let names = HashMap::from([(1, "Olena Koval".to_string()), (2, "ivan".to_string())]);
        let today = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let map = build_field_map("Acme", Some("2023"), &team, &names, today, "admin");

        assert_eq!(map["CLIENT_NAME"], "Acme");
        assert_eq!(map["MANAGER"], "Olena Koval");
        assert_eq!(map["ASSISTANT_3"], "ivan");
        assert_eq!(map["AUDITOR_1"], "");
        assert_eq!(map["QA_MANAGER"], "");
        assert_eq!(map["TODAY_DATE"], "07.03.2024");
        assert_eq!(map["CURRENT_USER"], "admin");
        assert_eq!(map.len(), 13);
    }

    #[test]
    fn display_name_falls_back_to_username() {
        assert_eq!(display_name("Olena", "Koval", "okoval"), "Olena Koval");
        assert_eq!(display_name("", " ", "okoval"), "okoval");
        assert_eq!(display_name("Olena", "", "okoval"), "Olena");
    }

    #[test]
    fn output_name_includes_engagement_and_timestamp() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        assert_eq!(
            DocumentTemplate::Order.output_name(12, "okoval", now),
            "order_12_20240501_093000.docx"
        );
        assert_eq!(
            DocumentTemplate::Independence.output_name(12, "okoval", now),
            "team_independence_12_okoval_20240501_093000.docx"
        );
    }

    #[test]
    fn content_disposition_encodes_utf8() {
        let header = content_disposition("Звіт 1.zip");
        assert!(header.starts_with("attachment; filename=\"_____1.zip\""));
        assert!(header.ends_with("filename*=UTF-8''%D0%97%D0%B2%D1%96%D1%82%201.zip"));
    }

    #[test]
    fn placeholder_uses_spaced_braces() {
        assert_eq!(placeholder("CLIENT_NAME"), "{{ CLIENT_NAME }}");
    }

    #[test]
    fn doc_type_validation() {
        assert!(validate_doc_type("agreement").is_ok());
        assert!(validate_doc_type("").is_ok());
        assert!(validate_doc_type("invoice").is_err());
    }
}
