/// Persistence for normalized readings.
///
/// The ingestion pipeline is the only writer; analytics only reads. All
/// coordination between the two happens through an implementation of
/// [`ReadingStore`]:
///
/// - [`postgres::PgStore`]: the persisted store, one owned connection
/// - [`memory::MemoryStore`]: in-process store for dry runs and tests

pub mod memory;
pub mod postgres;

use crate::error::StoreError;
use crate::model::{Reading, SourceExtent, TimeRange};

pub use memory::MemoryStore;
pub use self::postgres::PgStore;

/// Storage operations needed by ingestion and analytics.
///
/// Range reads always return readings ascending by timestamp.
pub trait ReadingStore {
    /// Creates the `(source_id, timestamp)` index (and backing table) if
    /// missing. Idempotent.
    fn ensure_indexes(&mut self) -> Result<(), StoreError>;

    fn ping(&mut self) -> Result<(), StoreError>;

    /// Serializes snapshot replacement per source. Stores without concurrent
    /// writers need not do anything.
    fn lock_source(&mut self, _source_id: i32) -> Result<(), StoreError> {
        Ok(())
    }

    fn unlock_source(&mut self, _source_id: i32) -> Result<(), StoreError> {
        Ok(())
    }

    /// Removes every reading of `source_id`, returning how many were removed.
    fn delete_source(&mut self, source_id: i32) -> Result<u64, StoreError>;

    /// Appends readings, returning how many were written.
    fn insert_readings(&mut self, readings: &[Reading]) -> Result<u64, StoreError>;

    /// Up to `limit` readings of `source_id` within `range`.
    fn fetch_readings(
        &mut self,
        source_id: i32,
        range: &TimeRange,
        limit: Option<usize>,
    ) -> Result<Vec<Reading>, StoreError>;

    /// Feeds every reading of `source_id` within `range` to `visit`, without
    /// collecting them.
    fn scan_readings(
        &mut self,
        source_id: i32,
        range: &TimeRange,
        visit: &mut dyn FnMut(&Reading),
    ) -> Result<(), StoreError>;

    fn source_extent(&mut self, source_id: i32) -> Result<SourceExtent, StoreError>;
}
