//! Per-(engagement, substep) progress.
//!
//! Only "completed" is persisted (`engagement_substep_statuses`). Whether a
//! substep is in progress is recomputed on every read from the procedure
//! files that currently exist, so deleting the last file reverts the cell
//! to idle without any bookkeeping.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::types::DbId;

// ---------------------------------------------------------------------------
// Persisted completion status
// ---------------------------------------------------------------------------

/// Status ID for "not_started" (id = 1 in seed data).
pub const COMPLETION_NOT_STARTED_ID: i16 = 1;
/// Status ID for "completed" (id = 2 in seed data).
pub const COMPLETION_COMPLETED_ID: i16 = 2;

/// Manual completion flag stored per (engagement, substep).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    NotStarted,
    Completed,
}

impl CompletionStatus {
    /// The status after a toggle. A missing row counts as `NotStarted`.
    pub fn toggled(self) -> Self {
        match self {
            CompletionStatus::NotStarted => CompletionStatus::Completed,
            CompletionStatus::Completed => CompletionStatus::NotStarted,
        }
    }

    pub fn id(self) -> i16 {
        match self {
            CompletionStatus::NotStarted => COMPLETION_NOT_STARTED_ID,
            CompletionStatus::Completed => COMPLETION_COMPLETED_ID,
        }
    }

    pub fn from_id(id: i16) -> Self {
        if id == COMPLETION_COMPLETED_ID {
            CompletionStatus::Completed
        } else {
            CompletionStatus::NotStarted
        }
    }
}

// ---------------------------------------------------------------------------
// Derived display status
// ---------------------------------------------------------------------------

/// Display status of one cell. `done` wins over `in_progress`, which wins
/// over `idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Idle,
    InProgress,
    Done,
}

impl ProgressStatus {
    pub fn derive(completed: bool, file_count: i64) -> Self {
        if completed {
            ProgressStatus::Done
        } else if file_count > 0 {
            ProgressStatus::InProgress
        } else {
            ProgressStatus::Idle
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProgressStatus::Idle => "idle",
            ProgressStatus::InProgress => "in_progress",
            ProgressStatus::Done => "done",
        }
    }
}

/// Completion rows and file counts for a set of engagements, indexed for
/// cell lookups.
#[derive(Debug, Default)]
pub struct ProgressGrid {
    completed: HashSet<(DbId, DbId)>,
    file_counts: HashMap<(DbId, DbId), i64>,
}

impl ProgressGrid {
    /// `completed` holds (engagement, substep) pairs with a completed row;
    /// `file_counts` holds (engagement, substep, count) for procedure files.
    pub fn build(
        completed: impl IntoIterator<Item = (DbId, DbId)>,
        file_counts: impl IntoIterator<Item = (DbId, DbId, i64)>,
    ) -> Self {
        let mut grid = Self {
            completed: completed.into_iter().collect(),
            file_counts: HashMap::new(),
        };
        for (engagement_id, substep_id, count) in file_counts {
            *grid.file_counts.entry((engagement_id, substep_id)).or_default() += count;
        }
        grid
    }

    pub fn status(&self, engagement_id: DbId, substep_id: DbId) -> ProgressStatus {
        let key = (engagement_id, substep_id);
        ProgressStatus::derive(
            self.completed.contains(&key),
            self.file_counts.get(&key).copied().unwrap_or(0),
        )
    }

    /// Status of every substep for one engagement, keyed by substep id.
    pub fn row(&self, engagement_id: DbId, substep_ids: &[DbId]) -> HashMap<DbId, ProgressStatus> {
        substep_ids
            .iter()
            .map(|&substep_id| (substep_id, self.status(engagement_id, substep_id)))
            .collect()
    }
}

/// Procedure files reference their substep by the id rendered as text.
pub fn procedure_code(substep_id: DbId) -> String {
    substep_id.to_string()
}

/// Inverse of [`procedure_code`]; codes that are not substep ids yield `None`.
pub fn substep_from_procedure_code(code: &str) -> Option<DbId> {
    code.trim().parse().ok()
}

/// Where the client lands after toggling: the step view with the substep open.
pub fn step_redirect(step_order: i32, substep_id: DbId) -> String {
    format!("/audit/steps/{step_order}?open={substep_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn done_overrides_files() {
        assert_eq!(ProgressStatus::derive(true, 0), ProgressStatus::Done);
        assert_eq!(ProgressStatus::derive(true, 3), ProgressStatus::Done);
        assert_eq!(ProgressStatus::derive(false, 1), ProgressStatus::InProgress);
        assert_eq!(ProgressStatus::derive(false, 0), ProgressStatus::Idle);
    }

    #[test]
    fn toggle_flips_both_ways() {
        assert_eq!(CompletionStatus::NotStarted.toggled(), CompletionStatus::Completed);
        assert_eq!(CompletionStatus::Completed.toggled(), CompletionStatus::NotStarted);
        assert_eq!(CompletionStatus::from_id(CompletionStatus::Completed.id()), CompletionStatus::Completed);
    }

    #[test]
    fn grid_resolves_each_cell_independently() {
        let grid = ProgressGrid::build(vec![(1, 10)], vec![(1, 10, 2), (1, 11, 1), (2, 10, 0)]);
        assert_eq!(grid.status(1, 10), ProgressStatus::Done);
        assert_eq!(grid.status(1, 11), ProgressStatus::InProgress);
        assert_eq!(grid.status(2, 10), ProgressStatus::Idle);
        assert_eq!(grid.status(3, 12), ProgressStatus::Idle);

        let row = grid.row(1, &[10, 11, 12]);
        assert_eq!(row[&12], ProgressStatus::Idle);
        assert_eq!(row.len(), 3);
    }

    #[test]
    fn procedure_code_round_trips_substep_id() {
        assert_eq!(procedure_code(42), "42");
        assert_eq!(substep_from_procedure_code("42"), Some(42));
        assert_eq!(substep_from_procedure_code("legacy-code"), None);
    }

    #[test]
    fn redirect_points_at_open_substep() {
        assert_eq!(step_redirect(3, 17), "/audit/steps/3?open=17");
    }
}
