use crate::db::models::{MeasurementRecord, ReplaceResult};
use crate::db::RecordStore;
use crate::error::{AppError, Result};
use crate::reconcile::{reconcile_scope, ReconcileScope};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Process-local record table.
///
/// A replace swaps the whole table under one lock, so readers never observe
/// a session with its old rows deleted and the new ones not yet appended.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<MeasurementRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<MeasurementRecord>) -> Self {
        Self {
            rows: Mutex::new(rows),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<MeasurementRecord>>> {
        self.rows
            .lock()
            .map_err(|e| AppError::Storage(format!("Record table lock poisoned: {}", e)))
    }
}

impl RecordStore for MemoryStore {
    async fn read_all(&self) -> Result<Vec<MeasurementRecord>> {
        Ok(self.lock()?.clone())
    }

    async fn replace(
        &self,
        scope: &ReconcileScope,
        rows: &[MeasurementRecord],
    ) -> Result<ReplaceResult> {
        let mut table = self.lock()?;

        scope.check_rows(rows)?;
        let removed = table.iter().filter(|r| scope.contains(r)).count();
        let existing = std::mem::take(&mut *table);
        *table = reconcile_scope(existing, scope, rows.to_vec())?;

        let result = ReplaceResult {
            removed,
            inserted: rows.len(),
        };
        debug!(
            "Replaced rows for session {}: {} removed, {} inserted",
            scope.session_id(),
            result.removed,
            result.inserted
        );
        Ok(result)
    }
}
