/// Core data types for the turbine telemetry service.
///
/// This module defines the shared domain model imported by all other modules:
/// the normalized `Reading`, the optional time window every query accepts, and
/// the result records handed back to the query boundary. It contains no I/O.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Query limits
// ---------------------------------------------------------------------------

/// Default number of readings returned by a range query.
pub const DEFAULT_LIMIT: usize = 1000;

/// Hard upper bound on a range query's `limit`.
pub const MAX_LIMIT: usize = 10_000;

/// Default wind speed bin width for power curves, in m/s.
pub const DEFAULT_BIN_INTERVAL: f64 = 0.5;

/// Narrowest accepted bin width, in m/s. Bin indices stay far inside `i64`
/// and bin keys stay distinct at nine decimals.
pub const MIN_BIN_INTERVAL: f64 = 1e-6;

/// Decimal digits kept on averaged and summed values at the output boundary.
pub const DISPLAY_PRECISION: i32 = 2;

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// One normalized sample from a turbine export.
///
/// Invariant: `wind_speed >= 0`, `power_output >= 0`, both finite. Readings are
/// only constructed by `ingest::normalize` or read back from a store that was
/// populated by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub source_id: i32,
    /// Timezone-naive, as exported by the vendor.
    pub timestamp: NaiveDateTime,
    /// m/s
    pub wind_speed: f64,
    /// kW
    pub power_output: f64,
}

impl Reading {
    /// Returns `true` when the reading satisfies the persisted invariant.
    pub fn is_valid(&self) -> bool {
        self.wind_speed.is_finite()
            && self.power_output.is_finite()
            && self.wind_speed >= 0.0
            && self.power_output >= 0.0
    }
}

// ---------------------------------------------------------------------------
// Time window
// ---------------------------------------------------------------------------

/// Inclusive time window; either bound may be omitted independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl TimeRange {
    pub fn new(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Self {
        Self { start, end }
    }

    /// The unbounded window.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn contains(&self, ts: &NaiveDateTime) -> bool {
        self.start.is_none_or(|s| *ts >= s) && self.end.is_none_or(|e| *ts <= e)
    }

    /// A window whose start lies after its end can never match anything and
    /// is treated as a caller mistake.
    pub fn is_inverted(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if s > e)
    }
}

// ---------------------------------------------------------------------------
// Query results
// ---------------------------------------------------------------------------

/// Raw readings for one source, ascending by timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingSeries {
    pub source_id: i32,
    pub reading_count: usize,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub readings: Vec<Reading>,
}

/// One wind speed bucket of a power curve.
///
/// `wind_speed` is the bin key, `floor(ws / interval) * interval`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerCurveBin {
    pub wind_speed: f64,
    pub average_power: f64,
    pub reading_count: usize,
}

/// Binned average power against wind speed.
///
/// `start_time`/`end_time` span every contributing reading, not a single bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerCurve {
    pub source_id: i32,
    pub interval: f64,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub bins: Vec<PowerCurveBin>,
}

/// Scalar summary over the readings of one source.
///
/// `total_energy` is the plain sum of `power_output`; it is not integrated over
/// the sampling period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub source_id: i32,
    pub count: usize,
    pub avg_wind_speed: f64,
    pub min_wind_speed: f64,
    pub max_wind_speed: f64,
    pub avg_power: f64,
    pub min_power: f64,
    pub max_power: f64,
    pub total_energy: f64,
}

/// Stored reading count and coverage for one source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceExtent {
    pub reading_count: u64,
    pub oldest: Option<NaiveDateTime>,
    pub newest: Option<NaiveDateTime>,
}

/// Listing entry for a configured source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceOverview {
    pub source_id: i32,
    pub name: String,
    pub reading_count: u64,
    pub oldest: Option<NaiveDateTime>,
    pub newest: Option<NaiveDateTime>,
}

/// Rounds to `DISPLAY_PRECISION` decimal digits. Only applied when building
/// result records.
pub fn round_display(value: f64) -> f64 {
    let factor = 10f64.powi(DISPLAY_PRECISION);
    (value * factor).round() / factor
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
