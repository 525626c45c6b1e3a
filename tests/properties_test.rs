use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use stack_sampling::calculator::{flue_gas_humidity, normalized_volume};
use stack_sampling::db::models::MeasurementRecord;
use stack_sampling::reconcile::reconcile;

fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 12, 9, 30, 0).unwrap()
}

fn record(session_id: &str, draw_number: i32, volume_final: f64) -> MeasurementRecord {
    MeasurementRecord {
        session_id: session_id.to_string(),
        company: "Acme".to_string(),
        draw_number,
        ambient_pressure: 1013.25,
        parameter_name: "Dust".to_string(),
        volume_final,
        normalized_volume: volume_final,
        last_modified: fixed_time(),
        ..Default::default()
    }
}

fn table_strategy() -> impl Strategy<Value = Vec<MeasurementRecord>> {
    prop::collection::vec(
        (prop::sample::select(vec!["A", "B", "C"]), 1..5i32, 0.0..500.0f64),
        0..20,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .map(|(session, draw, volume)| record(session, draw, volume))
            .collect()
    })
}

fn batch_strategy(session_id: &'static str) -> impl Strategy<Value = Vec<MeasurementRecord>> {
    prop::collection::vec((1..5i32, 0.0..500.0f64), 0..8).prop_map(move |rows| {
        rows.into_iter()
            .map(|(draw, volume)| record(session_id, draw, volume))
            .collect()
    })
}

fn rows_of(table: &[MeasurementRecord], session_id: &str) -> Vec<MeasurementRecord> {
    table
        .iter()
        .filter(|r| r.session_id == session_id)
        .cloned()
        .collect()
}

proptest! {
    #[test]
    fn no_volume_delta_normalizes_to_zero(
        v in -1.0e6..1.0e6f64,
        t1 in -300.0..1500.0f64,
        t2 in -300.0..1500.0f64,
        p in 0.0..5000.0f64,
    ) {
        prop_assert_eq!(normalized_volume(v, v, t1, t2, p), 0.0);
    }

    #[test]
    fn normalized_volume_is_linear_in_pressure(delta in 0.0..1000.0f64, k in 1u32..8) {
        let base = normalized_volume(0.0, delta, 0.0, 0.0, 1013.25);
        let scaled = normalized_volume(0.0, delta, 0.0, 0.0, 1013.25 * k as f64);
        prop_assert!((scaled - base * k as f64).abs() <= 1e-9 * (1.0 + scaled.abs()));
    }

    #[test]
    fn humidity_stays_within_percentage_bounds(
        coil_initial in 0.0..1000.0f64,
        coil_gain in 0.0..200.0f64,
        gel_initial in 0.0..1000.0f64,
        gel_gain in 0.0..200.0f64,
        volume in 0.0..10_000.0f64,
    ) {
        let result = flue_gas_humidity(
            coil_initial,
            coil_initial + coil_gain,
            gel_initial,
            gel_initial + gel_gain,
            volume,
        );
        prop_assume!(result.total_volume > 0.0);
        prop_assert!(result.humidity_pct >= 0.0);
        prop_assert!(result.humidity_pct <= 100.0);
    }

    #[test]
    fn reconcile_is_idempotent(table in table_strategy(), batch in batch_strategy("A")) {
        let once = reconcile(table, "A", batch.clone()).unwrap();
        let twice = reconcile(once.clone(), "A", batch).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn reconcile_leaves_other_sessions_untouched(
        table in table_strategy(),
        batch in batch_strategy("A"),
    ) {
        let result = reconcile(table.clone(), "A", batch).unwrap();
        prop_assert_eq!(rows_of(&result, "B"), rows_of(&table, "B"));
        prop_assert_eq!(rows_of(&result, "C"), rows_of(&table, "C"));
    }

    #[test]
    fn reconcile_leaves_exactly_the_new_rows(
        table in table_strategy(),
        batch in batch_strategy("A"),
    ) {
        let result = reconcile(table, "A", batch.clone()).unwrap();
        prop_assert_eq!(rows_of(&result, "A"), batch);
    }
}

#[test]
fn reconcile_shrinks_session() {
    let table = vec![
        record("A", 1, 10.0),
        record("B", 1, 20.0),
        record("A", 2, 30.0),
        record("A", 3, 40.0),
    ];

    let result = reconcile(table, "A", vec![record("A", 1, 11.0)]).unwrap();

    assert_eq!(rows_of(&result, "A"), vec![record("A", 1, 11.0)]);
    assert_eq!(rows_of(&result, "B"), vec![record("B", 1, 20.0)]);
    assert_eq!(result.len(), 2);
}
