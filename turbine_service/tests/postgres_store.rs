/// Integration tests for the PostgreSQL reading store
///
/// These tests verify:
/// 1. `ensure_indexes` creates the table and index and can be repeated
/// 2. Snapshot replacement through `ingest::ingest` shrinks and grows a source
/// 3. Range reads come back ordered, bounded and limited
/// 4. Streaming aggregations match the in-memory store
///
/// Prerequisites:
/// - PostgreSQL reachable through DATABASE_URL (set in the environment or .env)
///
/// Run with: cargo test --test postgres_store -- --test-threads=1
///
/// Each test uses its own negative source_id so real turbine data is never
/// touched. Without DATABASE_URL the tests print a notice and pass.

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};

use turbine_service::analysis;
use turbine_service::config;
use turbine_service::ingest;
use turbine_service::model::{Reading, TimeRange};
use turbine_service::store::{MemoryStore, PgStore, ReadingStore};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn test_store() -> Option<PgStore> {
    let url = match config::database_url() {
        Ok(url) => url,
        Err(_) => {
            eprintln!("DATABASE_URL not set, skipping PostgreSQL store test");
            return None;
        }
    };
    let mut store = PgStore::new(&url, Duration::from_secs(10)).expect("DATABASE_URL should parse");
    store.ensure_indexes().unwrap_or_else(|e| {
        eprintln!("\n{}\n", "=".repeat(80));
        eprintln!("POSTGRES STORE TEST SETUP ERROR");
        eprintln!("{}", "=".repeat(80));
        eprintln!("\n{e}\n");
        eprintln!("Check that the server in DATABASE_URL is running and the role can create tables.");
        panic!("database setup failed");
    });
    Some(store)
}

fn at(hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2016, 1, 1).unwrap().and_hms_opt(hour, 0, 0).unwrap()
}

fn readings(source_id: i32, hours: u32) -> Vec<Reading> {
    (0..hours)
        .map(|h| Reading {
            source_id,
            timestamp: at(h),
            wind_speed: 2.0 + h as f64 * 0.5,
            power_output: 50.0 * h as f64,
        })
        .collect()
}

fn cleanup(store: &mut PgStore, source_id: i32) {
    let _ = store.delete_source(source_id);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_ensure_indexes_is_idempotent() {
    let Some(mut store) = test_store() else { return };
    store.ensure_indexes().expect("second call must succeed");
    store.ping().expect("store answers");
}

#[test]
fn test_snapshot_replacement_round_trip() {
    let Some(mut store) = test_store() else { return };
    let source_id = -101;
    cleanup(&mut store, source_id);

    assert_eq!(ingest::ingest(&mut store, source_id, &readings(source_id, 12)).unwrap(), 12);
    assert_eq!(store.source_extent(source_id).unwrap().reading_count, 12);

    assert_eq!(ingest::ingest(&mut store, source_id, &readings(source_id, 5)).unwrap(), 5);
    let extent = store.source_extent(source_id).unwrap();
    assert_eq!(extent.reading_count, 5, "replacement, not merge");
    assert_eq!(extent.oldest, Some(at(0)));
    assert_eq!(extent.newest, Some(at(4)));

    cleanup(&mut store, source_id);
}

#[test]
fn test_range_reads_ordered_bounded_and_limited() {
    let Some(mut store) = test_store() else { return };
    let source_id = -102;
    cleanup(&mut store, source_id);

    let mut shuffled = readings(source_id, 20);
    shuffled.reverse();
    ingest::ingest(&mut store, source_id, &shuffled).unwrap();

    let range = TimeRange::new(Some(at(5)), Some(at(14)));
    let series = analysis::get_range(&mut store, source_id, &range, 4).unwrap();
    assert_eq!(series.reading_count, 4);
    assert_eq!(series.start_time, at(5));
    assert_eq!(series.end_time, at(8));

    let unbounded = store.fetch_readings(source_id, &TimeRange::all(), None).unwrap();
    assert_eq!(unbounded.len(), 20);
    assert!(unbounded.windows(2).all(|w| w[0].timestamp < w[1].timestamp));

    cleanup(&mut store, source_id);
}

#[test]
fn test_aggregations_agree_with_memory_store() {
    let Some(mut store) = test_store() else { return };
    let source_id = -103;
    cleanup(&mut store, source_id);

    let data = readings(source_id, 24);
    ingest::ingest(&mut store, source_id, &data).unwrap();
    let mut memory = MemoryStore::new();
    ingest::ingest(&mut memory, source_id, &data).unwrap();

    let window = TimeRange::new(Some(at(3)), None);
    assert_eq!(
        analysis::compute_power_curve(&mut store, source_id, &window, 1.0).unwrap(),
        analysis::compute_power_curve(&mut memory, source_id, &window, 1.0).unwrap()
    );
    assert_eq!(
        analysis::compute_statistics(&mut store, source_id, &window).unwrap(),
        analysis::compute_statistics(&mut memory, source_id, &window).unwrap()
    );

    cleanup(&mut store, source_id);
    assert!(analysis::compute_statistics(&mut store, source_id, &window).unwrap_err().is_not_found());
}
