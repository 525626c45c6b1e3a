use crate::db::models::MeasurementRecord;
use crate::error::{AppError, Result};
use serde::Deserialize;
use std::collections::BTreeSet;

/// How much of a session one save replaces.
///
/// Reconciling is filter-then-append: every stored row under the key is
/// dropped, then the new rows are appended. Nothing is merged. No locking
/// happens here; callers ensure a single writer per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileGranularity {
    /// Every stored row of the session is replaced.
    #[default]
    Session,
    /// Only the draws present in the batch are replaced.
    Draw,
}

/// Rows a replace removes before appending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileScope {
    Session(String),
    Draws {
        session_id: String,
        draws: BTreeSet<i32>,
    },
}

impl ReconcileScope {
    /// Scope for a batch under the given granularity.
    pub fn for_batch(
        granularity: ReconcileGranularity,
        session_id: &str,
        rows: &[MeasurementRecord],
    ) -> Self {
        match granularity {
            ReconcileGranularity::Session => ReconcileScope::Session(session_id.to_string()),
            ReconcileGranularity::Draw => ReconcileScope::Draws {
                session_id: session_id.to_string(),
                draws: rows.iter().map(|r| r.draw_number).collect(),
            },
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            ReconcileScope::Session(id) => id,
            ReconcileScope::Draws { session_id, .. } => session_id,
        }
    }

    pub fn contains(&self, record: &MeasurementRecord) -> bool {
        match self {
            ReconcileScope::Session(id) => record.session_id == *id,
            ReconcileScope::Draws { session_id, draws } => {
                record.session_id == *session_id && draws.contains(&record.draw_number)
            }
        }
    }

    /// Reject rows that would land outside the scope.
    pub fn check_rows(&self, rows: &[MeasurementRecord]) -> Result<()> {
        if self.session_id().is_empty() {
            return Err(AppError::InvalidData(
                "Session id cannot be empty".to_string(),
            ));
        }

        if let Some(stray) = rows.iter().find(|r| !self.contains(r)) {
            return Err(AppError::InvalidData(format!(
                "Row for session '{}' draw {} does not belong to the batch for session '{}'",
                stray.session_id,
                stray.draw_number,
                self.session_id()
            )));
        }

        Ok(())
    }
}

/// Replace every row of `session_id` in `existing` with `new_rows`.
///
/// Rows of other sessions keep their relative order; the new rows are
/// appended after them.
pub fn reconcile(
    existing: Vec<MeasurementRecord>,
    session_id: &str,
    new_rows: Vec<MeasurementRecord>,
) -> Result<Vec<MeasurementRecord>> {
    reconcile_scope(
        existing,
        &ReconcileScope::Session(session_id.to_string()),
        new_rows,
    )
}

/// Replace every row under `scope` in `existing` with `new_rows`.
pub fn reconcile_scope(
    existing: Vec<MeasurementRecord>,
    scope: &ReconcileScope,
    new_rows: Vec<MeasurementRecord>,
) -> Result<Vec<MeasurementRecord>> {
    scope.check_rows(&new_rows)?;

    let mut table: Vec<MeasurementRecord> =
        existing.into_iter().filter(|r| !scope.contains(r)).collect();
    table.extend(new_rows);

    Ok(table)
}

/// Distinct session ids, most recent naming first (descending order).
pub fn session_ids(records: &[MeasurementRecord]) -> Vec<String> {
    let ids: BTreeSet<&str> = records
        .iter()
        .map(|r| r.session_id.as_str())
        .filter(|id| !id.is_empty())
        .collect();

    ids.into_iter().rev().map(str::to_string).collect()
}

/// Stored rows of one session in storage order.
pub fn session_rows(records: &[MeasurementRecord], session_id: &str) -> Vec<MeasurementRecord> {
    records
        .iter()
        .filter(|r| r.session_id == session_id)
        .cloned()
        .collect()
}

/// Stored rows of one draw of a session in storage order.
pub fn draw_rows(
    records: &[MeasurementRecord],
    session_id: &str,
    draw_number: i32,
) -> Vec<MeasurementRecord> {
    records
        .iter()
        .filter(|r| r.session_id == session_id && r.draw_number == draw_number)
        .cloned()
        .collect()
}
