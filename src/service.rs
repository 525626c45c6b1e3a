use crate::calculator::{CondensateReadings, HumidityResult, VolumeReadings};
use crate::config::Config;
use crate::db::models::{MeasurementRecord, ReplaceResult};
use crate::db::RecordStore;
use crate::error::Result;
use crate::reconcile::{self, ReconcileGranularity, ReconcileScope};
use crate::retry::RetryPolicy;
use crate::submission::{recompute_derived, SessionInput, VolumeSelection};
use chrono::Utc;
use tracing::{error, info};

/// Entry point for the data-entry form.
///
/// Computations are pure and never fail. Saves go through the injected
/// store, wrapped in one retry policy; failures are returned to the caller
/// after the policy gives up. The service holds no per-session state and
/// assumes at most one save in flight per session.
pub struct SamplingService<S> {
    store: S,
    retry: RetryPolicy,
    granularity: ReconcileGranularity,
    volume_selection: VolumeSelection,
}

impl<S: RecordStore> SamplingService<S> {
    pub fn new(
        store: S,
        retry: RetryPolicy,
        granularity: ReconcileGranularity,
        volume_selection: VolumeSelection,
    ) -> Self {
        Self {
            store,
            retry,
            granularity,
            volume_selection,
        }
    }

    pub fn from_config(store: S, config: &Config) -> Self {
        Self::new(
            store,
            config.retry,
            config.reconcile.granularity,
            config.humidity.volume_selection,
        )
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn compute_normalized_volume(&self, readings: &VolumeReadings) -> f64 {
        readings.normalized_volume()
    }

    pub fn compute_flue_gas_humidity(
        &self,
        condensate: &CondensateReadings,
        chosen_volume: f64,
    ) -> HumidityResult {
        condensate.flue_gas_humidity(chosen_volume)
    }

    /// Rows for a submission, derived fields filled in.
    pub fn build_rows(&self, input: &SessionInput) -> Vec<MeasurementRecord> {
        input.build_rows(self.volume_selection, Utc::now())
    }

    /// Save the complete current state of a session.
    ///
    /// Derived fields are recomputed before the write. Each draw keeps the
    /// volume selection stored on its rows, so a loaded session saves back
    /// unchanged; the configured selection only fills in draws without one.
    /// Every row is stamped with the save time.
    pub async fn save_session(
        &self,
        session_id: &str,
        mut rows: Vec<MeasurementRecord>,
    ) -> Result<ReplaceResult> {
        recompute_derived(&mut rows, self.volume_selection);
        self.persist(session_id, rows).await
    }

    /// Build and save a submission, honoring per-draw volume selections.
    pub async fn save_submission(&self, input: &SessionInput) -> Result<ReplaceResult> {
        let rows = self.build_rows(input);
        self.persist(&input.session_id, rows).await
    }

    async fn persist(
        &self,
        session_id: &str,
        mut rows: Vec<MeasurementRecord>,
    ) -> Result<ReplaceResult> {
        let now = Utc::now();
        for row in rows.iter_mut() {
            row.last_modified = now;
        }

        let scope = ReconcileScope::for_batch(self.granularity, session_id, &rows);
        scope.check_rows(&rows)?;

        info!(
            "Saving {} rows for session {} ({:?} granularity)",
            rows.len(),
            session_id,
            self.granularity
        );

        let result = self
            .retry
            .run("Replace session rows", || self.store.replace(&scope, &rows))
            .await;

        match &result {
            Ok(outcome) => info!(
                "Saved session {}: {} rows removed, {} rows inserted",
                session_id, outcome.removed, outcome.inserted
            ),
            Err(e) => error!("Failed to save session {}: {}", session_id, e),
        }

        result
    }

    /// Distinct stored session ids, most recent naming first.
    pub async fn list_sessions(&self) -> Result<Vec<String>> {
        let records = self.load_all().await?;
        Ok(reconcile::session_ids(&records))
    }

    /// Stored rows of a session, used to prefill the form.
    pub async fn load_session(&self, session_id: &str) -> Result<Vec<MeasurementRecord>> {
        let records = self.load_all().await?;
        Ok(reconcile::session_rows(&records, session_id))
    }

    /// Stored rows of one draw of a session.
    pub async fn load_draw(
        &self,
        session_id: &str,
        draw_number: i32,
    ) -> Result<Vec<MeasurementRecord>> {
        let records = self.load_all().await?;
        Ok(reconcile::draw_rows(&records, session_id, draw_number))
    }

    /// Fresh snapshot of every stored record.
    pub async fn load_all(&self) -> Result<Vec<MeasurementRecord>> {
        self.retry
            .run("Read records", || self.store.read_all())
            .await
    }
}
