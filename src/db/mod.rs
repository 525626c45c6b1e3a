pub mod memory;
pub mod models;
pub mod repository;

pub use memory::MemoryStore;
pub use repository::Repository;

use crate::error::Result;
use crate::reconcile::ReconcileScope;
use models::{MeasurementRecord, ReplaceResult};
use std::future::Future;

/// Table of measurement records, as seen by the sampling core.
pub trait RecordStore: Send + Sync {
    /// Every stored record in storage order.
    fn read_all(&self) -> impl Future<Output = Result<Vec<MeasurementRecord>>> + Send;

    /// Delete every row under `scope` and insert `rows`, as one unit where
    /// the backend allows it.
    ///
    /// `rows` must all fall inside `scope`.
    fn replace(
        &self,
        scope: &ReconcileScope,
        rows: &[MeasurementRecord],
    ) -> impl Future<Output = Result<ReplaceResult>> + Send;

    fn replace_session(
        &self,
        session_id: &str,
        rows: &[MeasurementRecord],
    ) -> impl Future<Output = Result<ReplaceResult>> + Send {
        let scope = ReconcileScope::Session(session_id.to_string());
        async move { self.replace(&scope, rows).await }
    }
}
