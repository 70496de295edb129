/// In-process reading store.
///
/// Backs `ingest --dry-run` and the test suites. Readings are kept per source
/// in insertion order and sorted on read, like an indexed table would return
/// them.

use std::collections::{BTreeMap, HashSet};

use crate::error::StoreError;
use crate::model::{Reading, SourceExtent, TimeRange};
use crate::store::ReadingStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    readings: BTreeMap<i32, Vec<Reading>>,
    failing_sources: HashSet<i32>,
    indexed: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes inserts for `source_id` fail, as a store outage between the
    /// delete and the insert would.
    pub fn fail_inserts_for(&mut self, source_id: i32) {
        self.failing_sources.insert(source_id);
    }

    pub fn count(&self, source_id: i32) -> usize {
        self.readings.get(&source_id).map_or(0, Vec::len)
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    fn sorted_in_range(&self, source_id: i32, range: &TimeRange) -> Vec<&Reading> {
        let mut matching: Vec<&Reading> = self
            .readings
            .get(&source_id)
            .map(|rs| rs.iter().filter(|r| range.contains(&r.timestamp)).collect())
            .unwrap_or_default();
        matching.sort_by_key(|r| r.timestamp);
        matching
    }
}

impl ReadingStore for MemoryStore {
    fn ensure_indexes(&mut self) -> Result<(), StoreError> {
        self.indexed = true;
        Ok(())
    }

    fn ping(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    fn delete_source(&mut self, source_id: i32) -> Result<u64, StoreError> {
        Ok(self.readings.remove(&source_id).map_or(0, |rs| rs.len() as u64))
    }

    fn insert_readings(&mut self, readings: &[Reading]) -> Result<u64, StoreError> {
        if let Some(r) = readings.iter().find(|r| self.failing_sources.contains(&r.source_id)) {
            return Err(StoreError::Unavailable(format!(
                "insert rejected for source {}",
                r.source_id
            )));
        }
        for reading in readings {
            self.readings
                .entry(reading.source_id)
                .or_default()
                .push(reading.clone());
        }
        Ok(readings.len() as u64)
    }

    fn fetch_readings(
        &mut self,
        source_id: i32,
        range: &TimeRange,
        limit: Option<usize>,
    ) -> Result<Vec<Reading>, StoreError> {
        let matching = self.sorted_in_range(source_id, range);
        let take = limit.unwrap_or(matching.len());
        Ok(matching.into_iter().take(take).cloned().collect())
    }

    fn scan_readings(
        &mut self,
        source_id: i32,
        range: &TimeRange,
        visit: &mut dyn FnMut(&Reading),
    ) -> Result<(), StoreError> {
        for reading in self.sorted_in_range(source_id, range) {
            visit(reading);
        }
        Ok(())
    }

    fn source_extent(&mut self, source_id: i32) -> Result<SourceExtent, StoreError> {
        let readings = self.readings.get(&source_id);
        let timestamps = || readings.into_iter().flatten().map(|r| r.timestamp);
        Ok(SourceExtent {
            reading_count: readings.map_or(0, |rs| rs.len() as u64),
            oldest: timestamps().min(),
            newest: timestamps().max(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2016, 1, 1).unwrap().and_hms_opt(0, minute, 0).unwrap()
    }

    fn reading(source_id: i32, minute: u32) -> Reading {
        Reading { source_id, timestamp: at(minute), wind_speed: 4.0, power_output: 100.0 }
    }

    #[test]
    fn test_fetch_is_sorted_filtered_and_limited() {
        let mut store = MemoryStore::new();
        store
            .insert_readings(&[reading(1, 30), reading(1, 10), reading(1, 20), reading(2, 15)])
            .unwrap();

        let all = store.fetch_readings(1, &TimeRange::all(), None).unwrap();
        let minutes: Vec<_> = all.iter().map(|r| r.timestamp).collect();
        assert_eq!(minutes, vec![at(10), at(20), at(30)]);

        let limited = store.fetch_readings(1, &TimeRange::all(), Some(2)).unwrap();
        assert_eq!(limited.len(), 2);

        let windowed = store
            .fetch_readings(1, &TimeRange::new(Some(at(15)), Some(at(30))), None)
            .unwrap();
        assert_eq!(windowed.len(), 2);
    }

    #[test]
    fn test_delete_only_touches_one_source() {
        let mut store = MemoryStore::new();
        store.insert_readings(&[reading(1, 0), reading(2, 0)]).unwrap();
        assert_eq!(store.delete_source(1).unwrap(), 1);
        assert_eq!(store.count(1), 0);
        assert_eq!(store.count(2), 1);
        assert_eq!(store.delete_source(1).unwrap(), 0);
    }

    #[test]
    fn test_failing_inserts() {
        let mut store = MemoryStore::new();
        store.fail_inserts_for(3);
        assert!(store.insert_readings(&[reading(3, 0)]).is_err());
        assert!(store.insert_readings(&[reading(1, 0)]).is_ok());
    }

    #[test]
    fn test_source_extent() {
        let mut store = MemoryStore::new();
        let empty = store.source_extent(1).unwrap();
        assert_eq!(empty.reading_count, 0);
        assert_eq!(empty.oldest, None);

        store.insert_readings(&[reading(1, 40), reading(1, 5)]).unwrap();
        let extent = store.source_extent(1).unwrap();
        assert_eq!(extent.reading_count, 2);
        assert_eq!(extent.oldest, Some(at(5)));
        assert_eq!(extent.newest, Some(at(40)));
    }
}
