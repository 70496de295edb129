/// Read-side analytics over stored turbine readings.
///
/// Every query validates its parameters before touching the store, then
/// either returns a result record or `QueryError::NoData` when nothing in the
/// store matches. Aggregations stream readings through an accumulator instead
/// of collecting them.
///
/// Submodules:
/// - `power_curve`: wind speed binning.
/// - `statistics` : count, extremes, averages and total power.

pub mod power_curve;
pub mod statistics;

use tracing::debug;

use crate::config::SourceConfig;
use crate::error::{QueryError, StoreError};
use crate::model::{
    MAX_LIMIT, MIN_BIN_INTERVAL, PowerCurve, ReadingSeries, SourceOverview, Statistics, TimeRange,
};
use crate::store::ReadingStore;

pub use self::power_curve::PowerCurveBuilder;
pub use self::statistics::StatisticsAccumulator;

// ---------------------------------------------------------------------------
// Parameter validation
// ---------------------------------------------------------------------------

fn check_range(range: &TimeRange) -> Result<(), QueryError> {
    if range.is_inverted() {
        return Err(QueryError::InvalidParameter(
            "start must not be after end".to_string(),
        ));
    }
    Ok(())
}

fn check_limit(limit: usize) -> Result<(), QueryError> {
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(QueryError::InvalidParameter(format!(
            "limit must be between 1 and {MAX_LIMIT}, got {limit}"
        )));
    }
    Ok(())
}

fn check_interval(interval: f64) -> Result<(), QueryError> {
    if !interval.is_finite() || interval <= 0.0 {
        return Err(QueryError::InvalidParameter(format!(
            "interval must be a positive number, got {interval}"
        )));
    }
    if interval < MIN_BIN_INTERVAL {
        return Err(QueryError::InvalidParameter(format!(
            "interval must be at least {MIN_BIN_INTERVAL}, got {interval}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Readings of `source_id` within `range`, ascending, at most `limit` of them.
pub fn get_range<S: ReadingStore + ?Sized>(
    store: &mut S,
    source_id: i32,
    range: &TimeRange,
    limit: usize,
) -> Result<ReadingSeries, QueryError> {
    check_limit(limit)?;
    check_range(range)?;

    let readings = store.fetch_readings(source_id, range, Some(limit))?;
    let (first, last) = match (readings.first(), readings.last()) {
        (Some(first), Some(last)) => (first.timestamp, last.timestamp),
        _ => return Err(QueryError::NoData { source_id }),
    };
    debug!(source_id, count = readings.len(), "range query served");

    Ok(ReadingSeries {
        source_id,
        reading_count: readings.len(),
        start_time: first,
        end_time: last,
        readings,
    })
}

/// Average power per wind speed bin of width `interval`.
pub fn compute_power_curve<S: ReadingStore + ?Sized>(
    store: &mut S,
    source_id: i32,
    range: &TimeRange,
    interval: f64,
) -> Result<PowerCurve, QueryError> {
    check_interval(interval)?;
    check_range(range)?;

    let mut builder = PowerCurveBuilder::new(interval);
    store.scan_readings(source_id, range, &mut |r| builder.push(r))?;

    let Some((start_time, end_time)) = builder.time_span() else {
        return Err(QueryError::NoData { source_id });
    };
    let bins = builder.finish();
    debug!(source_id, interval, bins = bins.len(), "power curve computed");

    Ok(PowerCurve {
        source_id,
        interval,
        start_time,
        end_time,
        bins,
    })
}

pub fn compute_statistics<S: ReadingStore + ?Sized>(
    store: &mut S,
    source_id: i32,
    range: &TimeRange,
) -> Result<Statistics, QueryError> {
    check_range(range)?;

    let mut acc = StatisticsAccumulator::new();
    store.scan_readings(source_id, range, &mut |r| acc.push(r))?;

    let stats = acc.finish(source_id).ok_or(QueryError::NoData { source_id })?;
    debug!(source_id, count = stats.count, "statistics computed");
    Ok(stats)
}

// ---------------------------------------------------------------------------
// Source listing and health
// ---------------------------------------------------------------------------

/// Stored coverage of each configured source, in configuration order. Sources
/// that were never ingested are listed with a zero count.
pub fn source_overview<S: ReadingStore + ?Sized>(
    store: &mut S,
    sources: &[SourceConfig],
) -> Result<Vec<SourceOverview>, StoreError> {
    sources
        .iter()
        .map(|source| {
            let extent = store.source_extent(source.source_id)?;
            Ok(SourceOverview {
                source_id: source.source_id,
                name: source.name.clone(),
                reading_count: extent.reading_count,
                oldest: extent.oldest,
                newest: extent.newest,
            })
        })
        .collect()
}

/// Succeeds when the store answers.
pub fn health<S: ReadingStore + ?Sized>(store: &mut S) -> Result<(), StoreError> {
    store.ping()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Reading;
    use crate::sources::default_sources;
    use crate::store::MemoryStore;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2016, 1, 1).unwrap().and_hms_opt(hour, 0, 0).unwrap()
    }

    fn seeded() -> MemoryStore {
        let mut store = MemoryStore::new();
        let readings: Vec<Reading> = (0..6)
            .map(|h| Reading {
                source_id: 1,
                timestamp: at(h),
                wind_speed: 3.0 + h as f64,
                power_output: 100.0 * h as f64,
            })
            .collect();
        store.insert_readings(&readings).unwrap();
        store
    }

    #[test]
    fn test_get_range_respects_bounds_and_limit() {
        let mut store = seeded();
        let range = TimeRange::new(Some(at(1)), Some(at(4)));

        let series = get_range(&mut store, 1, &range, 10).unwrap();
        assert_eq!(series.reading_count, 4, "both bounds are inclusive");
        assert_eq!(series.start_time, at(1));
        assert_eq!(series.end_time, at(4));

        let capped = get_range(&mut store, 1, &range, 2).unwrap();
        assert_eq!(capped.reading_count, 2);
        assert_eq!(capped.end_time, at(2), "limit keeps the earliest readings");
    }

    #[test]
    fn test_invalid_parameters_rejected_before_store_access() {
        let mut store = MemoryStore::new();
        let all = TimeRange::all();

        assert!(matches!(get_range(&mut store, 1, &all, 0), Err(QueryError::InvalidParameter(_))));
        assert!(matches!(
            get_range(&mut store, 1, &all, MAX_LIMIT + 1),
            Err(QueryError::InvalidParameter(_))
        ));
        assert!(matches!(
            compute_power_curve(&mut store, 1, &all, 0.0),
            Err(QueryError::InvalidParameter(_))
        ));
        assert!(matches!(
            compute_power_curve(&mut store, 1, &all, -0.5),
            Err(QueryError::InvalidParameter(_))
        ));
        assert!(matches!(
            compute_power_curve(&mut store, 1, &all, f64::NAN),
            Err(QueryError::InvalidParameter(_))
        ));

        let inverted = TimeRange::new(Some(at(5)), Some(at(1)));
        assert!(matches!(
            compute_statistics(&mut store, 1, &inverted),
            Err(QueryError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_interval_below_minimum_rejected() {
        let mut store = seeded();
        let all = TimeRange::all();
        for interval in [1e-300, f64::MIN_POSITIVE, 1e-7] {
            assert!(
                matches!(
                    compute_power_curve(&mut store, 1, &all, interval),
                    Err(QueryError::InvalidParameter(_))
                ),
                "interval {interval} should be rejected"
            );
        }
        let curve = compute_power_curve(&mut store, 1, &all, MIN_BIN_INTERVAL).unwrap();
        assert_eq!(curve.bins.len(), 6, "each whole-metre reading keeps its own bin");
        assert_eq!(curve.bins[0].wind_speed, 3.0);
        assert_eq!(curve.bins[5].wind_speed, 8.0);
    }

    #[test]
    fn test_unknown_source_is_no_data() {
        let mut store = seeded();
        let all = TimeRange::all();
        for err in [
            get_range(&mut store, 99, &all, 10).unwrap_err(),
            compute_power_curve(&mut store, 99, &all, 0.5).unwrap_err(),
            compute_statistics(&mut store, 99, &all).unwrap_err(),
        ] {
            assert!(err.is_not_found(), "expected NoData, got {err:?}");
        }
    }

    #[test]
    fn test_power_curve_time_span_spans_all_readings() {
        let mut store = seeded();
        let curve = compute_power_curve(&mut store, 1, &TimeRange::all(), 2.0).unwrap();
        assert_eq!(curve.start_time, at(0));
        assert_eq!(curve.end_time, at(5));
        let total: usize = curve.bins.iter().map(|b| b.reading_count).sum();
        assert_eq!(total, 6);
    }

    #[test]
    fn test_statistics_over_window() {
        let mut store = seeded();
        let stats = compute_statistics(&mut store, 1, &TimeRange::new(Some(at(4)), None)).unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.total_energy, 900.0);
        assert_eq!(stats.min_wind_speed, 7.0);
    }

    #[test]
    fn test_source_overview_lists_every_configured_source() {
        let mut store = seeded();
        let overview = source_overview(&mut store, &default_sources()).unwrap();
        assert_eq!(overview.len(), 2);
        assert_eq!(overview[0].reading_count, 6);
        assert_eq!(overview[0].oldest, Some(at(0)));
        assert_eq!(overview[1].reading_count, 0);
        assert!(overview[1].newest.is_none());
    }

    #[test]
    fn test_health_on_memory_store() {
        assert!(health(&mut MemoryStore::new()).is_ok());
    }
}
