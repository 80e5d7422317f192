//! Reporting period format: a plain year (`2024`) or a quarter of a year
//! (`1 квартал 2024`, `2й квартал 2024`). Only quarters 1 to 3 are valid;
//! the fourth quarter is reported as the full year.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::FieldViolation;

static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}$").expect("valid regex"));

static QUARTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[1-3]\s*й?\s*квартал\s+\d{4}$").expect("valid regex")
});

pub const REPORTING_PERIOD_HINT: &str =
    "Use a year (2024) or a quarter of the year (1 квартал 2024); quarters 1 to 3 only";

/// Whether `value` (already trimmed) is a valid reporting period.
pub fn is_valid_reporting_period(value: &str) -> bool {
    let value = value.trim();
    YEAR.is_match(value) || QUARTER.is_match(value)
}

/// Field-level check used by the engagement validators.
pub fn check_reporting_period(field: &str, value: Option<&str>) -> Option<FieldViolation> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() && !is_valid_reporting_period(v) => {
            Some(FieldViolation::new(field, REPORTING_PERIOD_HINT))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_year_and_first_three_quarters() {
        for value in ["2022", "1 квартал 2022", "3 квартал 2022", "2й квартал 2023", "1  квартал   2024"] {
            assert!(is_valid_reporting_period(value), "{value} should be valid");
        }
    }

    #[test]
    fn rejects_fourth_quarter_and_other_shapes() {
        for value in [
            "4 квартал 2022",
            "2022Q1",
            "22",
            "квартал 2022",
            "1 quarter 2022",
            "1-квартал 2024",
            "1 - квартал 2024",
            "2-й квартал 2024",
            "",
        ] {
            assert!(!is_valid_reporting_period(value), "{value} should be invalid");
        }
    }

    #[test]
    fn empty_value_is_left_to_the_required_check() {
        assert!(check_reporting_period("reporting_period", None).is_none());
        assert!(check_reporting_period("reporting_period", Some("  ")).is_none());
        assert!(check_reporting_period("reporting_period", Some("2022Q1")).is_some());
    }
}
