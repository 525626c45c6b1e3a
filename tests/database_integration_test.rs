use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use sqlx::PgPool;
use stack_sampling::db::models::{MeasurementRecord, ReplaceResult};
use stack_sampling::db::{RecordStore, Repository};
use stack_sampling::error::AppError;
use stack_sampling::reconcile::ReconcileScope;
use std::collections::BTreeSet;

fn record(session_id: &str, draw_number: i32, parameter: &str) -> MeasurementRecord {
    MeasurementRecord {
        session_id: session_id.to_string(),
        company: "Acme".to_string(),
        plant: "North".to_string(),
        stack: "E1".to_string(),
        campaign_date: NaiveDate::from_ymd_opt(2024, 3, 12),
        operator_1: "Rossi".to_string(),
        operator_2: "Bianchi".to_string(),
        draw_number,
        nozzle_diameter: 6.0,
        sampling_duration: 3600.0,
        start_time: NaiveTime::from_hms_opt(9, 30, 0),
        filter_id: "QMA-12".to_string(),
        multiple_draw: true,
        ambient_temperature: 14.5,
        ambient_pressure: 1013.25,
        ambient_humidity: 62.0,
        weather: "Sereno".to_string(),
        parameter_name: parameter.to_string(),
        other_parameter: String::new(),
        pump: "P-3".to_string(),
        flow_rate: 10.5,
        volume_initial: 10.0,
        volume_final: 30.0,
        temp_initial: 20.0,
        temp_final: 22.0,
        normalized_volume: 18.572157062723,
        coil_mass_initial: 100.0,
        coil_mass_final: 105.0,
        gel_mass_initial: 50.0,
        gel_mass_final: 52.0,
        flue_gas_humidity: 31.94198157122,
        isokinetic_ratio: 101.2,
        sampling_velocity: 12.1,
        differential_pressure: 0.85,
        flue_gas_temperature: 140.0,
        notes: "filter QMA-12".to_string(),
        volume_selection: "explicit:100".to_string(),
        // Whole seconds survive the TIMESTAMPTZ round trip unchanged
        last_modified: Utc.with_ymd_and_hms(2024, 3, 12, 12, 0, 0).unwrap(),
    }
}

async fn setup(pool: &PgPool) -> Repository {
    let repo = Repository::new(pool.clone());
    repo.run_migrations().await.expect("Migrations failed");
    repo
}

/// Rows come back exactly as written, in insertion order
#[sqlx::test]
async fn test_replace_and_read_back(pool: PgPool) {
    let repo = setup(&pool).await;
    let rows = vec![record("A", 1, "Dust"), record("A", 1, "HCl"), record("A", 2, "Dust")];

    let result = repo.replace_session("A", &rows).await.expect("Replace failed");
    assert_eq!(result, ReplaceResult { removed: 0, inserted: 3 });

    let stored = repo.read_all().await.expect("Read failed");
    assert_eq!(stored, rows);
}

/// Re-saving a session replaces its rows and leaves other sessions alone
#[sqlx::test]
async fn test_replace_session_is_isolated(pool: PgPool) {
    let repo = setup(&pool).await;

    repo.replace_session("A", &[record("A", 1, "Dust"), record("A", 2, "Dust")])
        .await
        .unwrap();
    repo.replace_session("B", &[record("B", 1, "HF")]).await.unwrap();

    let result = repo
        .replace_session("A", &[record("A", 1, "SOx")])
        .await
        .unwrap();
    assert_eq!(result, ReplaceResult { removed: 2, inserted: 1 });

    let stored = repo.read_all().await.unwrap();
    assert_eq!(stored, vec![record("B", 1, "HF"), record("A", 1, "SOx")]);

    let session_a = repo.read_session("A").await.unwrap();
    assert_eq!(session_a, vec![record("A", 1, "SOx")]);
}

/// Draw scope deletes only the listed draws
#[sqlx::test]
async fn test_replace_draws(pool: PgPool) {
    let repo = setup(&pool).await;
    repo.replace_session("A", &[record("A", 1, "Dust"), record("A", 2, "Dust")])
        .await
        .unwrap();

    let scope = ReconcileScope::Draws {
        session_id: "A".to_string(),
        draws: BTreeSet::from([2]),
    };
    let result = repo.replace(&scope, &[record("A", 2, "NH3")]).await.unwrap();
    assert_eq!(result, ReplaceResult { removed: 1, inserted: 1 });

    let stored = repo.read_all().await.unwrap();
    assert_eq!(stored, vec![record("A", 1, "Dust"), record("A", 2, "NH3")]);
}

/// A rejected batch never reaches the database
#[sqlx::test]
async fn test_rejects_rows_outside_scope(pool: PgPool) {
    let repo = setup(&pool).await;
    repo.replace_session("A", &[record("A", 1, "Dust")]).await.unwrap();

    let result = repo.replace_session("A", &[record("B", 1, "Dust")]).await;
    assert!(matches!(result, Err(AppError::InvalidData(_))));

    let stored = repo.read_all().await.unwrap();
    assert_eq!(stored, vec![record("A", 1, "Dust")]);
}

/// Batches larger than one INSERT statement are written completely
#[sqlx::test]
async fn test_large_session(pool: PgPool) {
    let repo = setup(&pool).await;
    let rows: Vec<MeasurementRecord> = (1..=2500).map(|i| record("A", i, "Dust")).collect();

    let result = repo.replace_session("A", &rows).await.unwrap();
    assert_eq!(result.inserted, 2500);

    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM measurements")
        .fetch_one(&pool)
        .await
        .expect("Count query failed");
    assert_eq!(count, 2500);
}
