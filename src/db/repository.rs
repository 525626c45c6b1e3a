use crate::db::models::{MeasurementRecord, ReplaceResult};
use crate::db::RecordStore;
use crate::error::Result;
use crate::reconcile::ReconcileScope;
use sqlx::PgPool;
use tracing::{debug, info};

const SELECT_COLUMNS: &str = "session_id, company, plant, stack, campaign_date, \
    operator_1, operator_2, \
    draw_number, nozzle_diameter, sampling_duration, start_time, filter_id, multiple_draw, \
    ambient_temperature, ambient_pressure, ambient_humidity, weather, \
    parameter_name, other_parameter, pump, flow_rate, \
    volume_initial, volume_final, temp_initial, temp_final, normalized_volume, \
    coil_mass_initial, coil_mass_final, gel_mass_initial, gel_mass_final, flue_gas_humidity, \
    isokinetic_ratio, sampling_velocity, differential_pressure, flue_gas_temperature, notes, \
    volume_selection, last_modified";

/// Rows per INSERT statement; 38 binds each keeps us under the
/// PostgreSQL limit of 65535 parameters.
const BATCH_SIZE: usize = 1000;

pub struct Repository {
    pool: PgPool,
}

impl Repository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Rows of one session in insertion order.
    pub async fn read_session(&self, session_id: &str) -> Result<Vec<MeasurementRecord>> {
        let rows = sqlx::query_as::<_, MeasurementRecord>(&format!(
            "SELECT {} FROM measurements WHERE session_id = $1 ORDER BY id",
            SELECT_COLUMNS
        ))
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

impl RecordStore for Repository {
    async fn read_all(&self) -> Result<Vec<MeasurementRecord>> {
        let rows = sqlx::query_as::<_, MeasurementRecord>(&format!(
            "SELECT {} FROM measurements ORDER BY id",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Replace the rows under `scope` in a single transaction.
    ///
    /// The transaction first takes an advisory lock keyed by session id, so
    /// two concurrent saves of the same session run one after the other
    /// instead of interleaving their delete and insert halves. Readers see
    /// either the old rows or the new ones, never an empty session.
    async fn replace(
        &self,
        scope: &ReconcileScope,
        rows: &[MeasurementRecord],
    ) -> Result<ReplaceResult> {
        scope.check_rows(rows)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(scope.session_id())
            .execute(&mut *tx)
            .await?;

        let deleted = match scope {
            ReconcileScope::Session(session_id) => {
                sqlx::query("DELETE FROM measurements WHERE session_id = $1")
                    .bind(session_id)
                    .execute(&mut *tx)
                    .await?
            }
            ReconcileScope::Draws { session_id, draws } => {
                let draws: Vec<i32> = draws.iter().copied().collect();
                sqlx::query(
                    "DELETE FROM measurements WHERE session_id = $1 AND draw_number = ANY($2)",
                )
                .bind(session_id)
                .bind(draws)
                .execute(&mut *tx)
                .await?
            }
        };

        let mut inserted = 0;

        for (batch_idx, chunk) in rows.chunks(BATCH_SIZE).enumerate() {
            debug!(
                "Inserting batch {}/{} ({} rows)",
                batch_idx + 1,
                rows.len().div_ceil(BATCH_SIZE),
                chunk.len()
            );

            let mut query_builder = sqlx::QueryBuilder::new(format!(
                "INSERT INTO measurements ({}) ",
                SELECT_COLUMNS
            ));

            query_builder.push_values(chunk, |mut b, row| {
                b.push_bind(&row.session_id)
                    .push_bind(&row.company)
                    .push_bind(&row.plant)
                    .push_bind(&row.stack)
                    .push_bind(row.campaign_date)
                    .push_bind(&row.operator_1)
                    .push_bind(&row.operator_2)
                    .push_bind(row.draw_number)
                    .push_bind(row.nozzle_diameter)
                    .push_bind(row.sampling_duration)
                    .push_bind(row.start_time)
                    .push_bind(&row.filter_id)
                    .push_bind(row.multiple_draw)
                    .push_bind(row.ambient_temperature)
                    .push_bind(row.ambient_pressure)
                    .push_bind(row.ambient_humidity)
                    .push_bind(&row.weather)
                    .push_bind(&row.parameter_name)
                    .push_bind(&row.other_parameter)
                    .push_bind(&row.pump)
                    .push_bind(row.flow_rate)
                    .push_bind(row.volume_initial)
                    .push_bind(row.volume_final)
                    .push_bind(row.temp_initial)
                    .push_bind(row.temp_final)
                    .push_bind(row.normalized_volume)
                    .push_bind(row.coil_mass_initial)
                    .push_bind(row.coil_mass_final)
                    .push_bind(row.gel_mass_initial)
                    .push_bind(row.gel_mass_final)
                    .push_bind(row.flue_gas_humidity)
                    .push_bind(row.isokinetic_ratio)
                    .push_bind(row.sampling_velocity)
                    .push_bind(row.differential_pressure)
                    .push_bind(row.flue_gas_temperature)
                    .push_bind(&row.notes)
                    .push_bind(&row.volume_selection)
                    .push_bind(row.last_modified);
            });

            let result = query_builder.build().execute(&mut *tx).await?;
            inserted += result.rows_affected() as usize;
        }

        tx.commit().await?;

        Ok(ReplaceResult {
            removed: deleted.rows_affected() as usize,
            inserted,
        })
    }
}
