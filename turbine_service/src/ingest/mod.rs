/// Ingestion pipeline: acquire, parse, normalize, dedupe, replace snapshot.
///
/// Submodules:
/// - `format`   : per-source parsing rules and the column alias table
/// - `acquire`  : cache-first download of raw exports
/// - `parse`    : tolerant delimited-text splitting
/// - `normalize`: raw row to `Reading`
///
/// A run walks the selected sources in configuration order. Acquisition and
/// parse failures skip the source and leave its stored snapshot untouched.
/// Store failures end the run; sources committed before the failure stay.

pub mod acquire;
pub mod format;
pub mod normalize;
pub mod parse;

use std::collections::HashSet;

use reqwest::blocking::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{ServiceConfig, SourceConfig};
use crate::error::{AcquireError, ParseError, StoreError};
use crate::logging;
use crate::model::Reading;
use crate::store::ReadingStore;

use self::format::ColumnSpec;

pub use self::acquire::{acquire, http_client};
pub use self::normalize::normalize;
pub use self::parse::parse;

// ---------------------------------------------------------------------------
// Run options and report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    /// Re-download exports even when a cached copy exists.
    pub refresh: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    Ingested {
        inserted: u64,
        rejected: usize,
        malformed: usize,
        duplicates: usize,
    },
    Skipped {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceReport {
    pub source_id: i32,
    pub name: String,
    #[serde(flatten)]
    pub outcome: SourceOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub sources: Vec<SourceReport>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| matches!(s.outcome, SourceOutcome::Ingested { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.sources.len() - self.succeeded()
    }

    pub fn outcome(&self, source_id: i32) -> Option<&SourceOutcome> {
        self.sources
            .iter()
            .find(|s| s.source_id == source_id)
            .map(|s| &s.outcome)
    }
}

/// Accepted readings of one source plus what was thrown away on the way.
#[derive(Debug, Clone, Default)]
pub struct PreparedSnapshot {
    pub readings: Vec<Reading>,
    pub rejected: usize,
    pub malformed: usize,
    pub duplicates: usize,
}

// ---------------------------------------------------------------------------
// Pipeline steps
// ---------------------------------------------------------------------------

/// Parses and normalizes raw export bytes for `source_id`.
pub fn prepare_snapshot(
    bytes: &[u8],
    source_id: i32,
    spec: &ColumnSpec,
) -> Result<PreparedSnapshot, ParseError> {
    let table = parse(bytes, spec)?;
    for bad in &table.malformed {
        debug!(source_id, line = ?bad.line, error = %bad.message, "malformed line skipped");
    }

    let mut accepted = Vec::with_capacity(table.rows.len());
    let mut rejected = 0;
    for row in &table.rows {
        match normalize(row, source_id, spec) {
            Ok(reading) => accepted.push(reading),
            Err(reason) => {
                rejected += 1;
                debug!(source_id, line = row.line, %reason, "row rejected");
            }
        }
    }

    let (readings, duplicates) = dedupe_by_timestamp(accepted);
    Ok(PreparedSnapshot {
        readings,
        rejected,
        malformed: table.malformed.len(),
        duplicates,
    })
}

/// Keeps the first reading for each timestamp, preserving order.
pub fn dedupe_by_timestamp(readings: Vec<Reading>) -> (Vec<Reading>, usize) {
    let before = readings.len();
    let mut seen = HashSet::with_capacity(before);
    let kept: Vec<Reading> = readings
        .into_iter()
        .filter(|r| seen.insert(r.timestamp))
        .collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

/// Replaces the stored snapshot of `source_id` with `readings`.
///
/// Delete then insert, under the store's per-source lock. Not atomic: if the
/// insert fails the source is left with a partial or empty snapshot until the
/// next successful run, and the error is returned.
pub fn ingest<S: ReadingStore + ?Sized>(
    store: &mut S,
    source_id: i32,
    readings: &[Reading],
) -> Result<u64, StoreError> {
    store.lock_source(source_id)?;
    let result = replace_snapshot(store, source_id, readings);
    let unlocked = store.unlock_source(source_id);
    let inserted = result?;
    unlocked?;
    Ok(inserted)
}

fn replace_snapshot<S: ReadingStore + ?Sized>(
    store: &mut S,
    source_id: i32,
    readings: &[Reading],
) -> Result<u64, StoreError> {
    let deleted = store.delete_source(source_id)?;
    debug!(source_id, deleted, "previous snapshot removed");
    store.insert_readings(readings)
}

// ---------------------------------------------------------------------------
// Multi-source run
// ---------------------------------------------------------------------------

/// (Re)ingests `sources` into `store`.
///
/// Returns `Err` only for store failures; everything else is reported per
/// source in the `RunReport`.
pub fn run_ingestion<S: ReadingStore + ?Sized>(
    store: &mut S,
    http: &Client,
    config: &ServiceConfig,
    sources: &[&SourceConfig],
    options: IngestOptions,
) -> Result<RunReport, StoreError> {
    info!(sources = sources.len(), refresh = options.refresh, "starting ingestion run");
    store.ensure_indexes()?;

    let mut report = RunReport::default();
    for source in sources {
        let outcome = ingest_source(store, http, config, source, options)?;
        report.sources.push(SourceReport {
            source_id: source.source_id,
            name: source.name.clone(),
            outcome,
        });
    }

    logging::log_ingest_summary(report.sources.len(), report.succeeded(), report.failed());
    Ok(report)
}

fn ingest_source<S: ReadingStore + ?Sized>(
    store: &mut S,
    http: &Client,
    config: &ServiceConfig,
    source: &SourceConfig,
    options: IngestOptions,
) -> Result<SourceOutcome, StoreError> {
    let source_id = source.source_id;

    let spec = match ColumnSpec::from_config(&source.format) {
        Ok(spec) => spec,
        Err(reason) => {
            warn!(source_id, %reason, "invalid source format, skipping");
            return Ok(SourceOutcome::Skipped { reason });
        }
    };

    let bytes = match acquire(http, source, &config.settings, options.refresh) {
        Ok(bytes) => bytes,
        Err(e) => {
            logging::log_acquire_failure(source_id, &e);
            return Ok(skipped(&e));
        }
    };

    let prepared = match prepare_snapshot(&bytes, source_id, &spec) {
        Ok(prepared) => prepared,
        Err(e) => {
            warn!(source_id, error = %e, "export could not be parsed, skipping");
            return Ok(SourceOutcome::Skipped { reason: e.to_string() });
        }
    };

    if prepared.rejected > 0 || prepared.malformed > 0 {
        warn!(
            source_id,
            rejected = prepared.rejected,
            malformed = prepared.malformed,
            "rows dropped during normalization"
        );
    }

    let inserted = ingest(store, source_id, &prepared.readings)?;
    info!(
        source_id,
        inserted,
        rejected = prepared.rejected,
        malformed = prepared.malformed,
        duplicates = prepared.duplicates,
        "snapshot replaced"
    );

    Ok(SourceOutcome::Ingested {
        inserted,
        rejected: prepared.rejected,
        malformed: prepared.malformed,
        duplicates: prepared.duplicates,
    })
}

fn skipped(err: &AcquireError) -> SourceOutcome {
    SourceOutcome::Skipped { reason: err.to_string() }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
