/// Wind speed binning.
///
/// Each reading lands in bin `floor(wind_speed / interval)`; the bin key is
/// that index times `interval`, snapped to `KEY_SCALE` so that 6 * 0.1 reads
/// back as 0.6. Bin `i` covers `[key(i), key(i + 1))`; the index from the
/// float division is corrected in either direction until the reading sits in
/// that span, so the emitted key always agrees with the bin chosen. The map is
/// keyed on the integer index, which keeps bins distinct and ordered.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::model::{PowerCurveBin, Reading, round_display};

/// Bin keys are rounded to nine decimal places. Intervals are at least
/// `MIN_BIN_INTERVAL`, so neighbouring keys never collapse.
const KEY_SCALE: f64 = 1e9;

#[derive(Debug, Default, Clone, Copy)]
struct BinTotals {
    power_sum: f64,
    count: usize,
}

#[derive(Debug, Clone)]
pub struct PowerCurveBuilder {
    interval: f64,
    bins: BTreeMap<i64, BinTotals>,
    min_time: Option<NaiveDateTime>,
    max_time: Option<NaiveDateTime>,
}

impl PowerCurveBuilder {
    /// `interval` must be finite and positive; callers validate it first.
    pub fn new(interval: f64) -> Self {
        Self {
            interval,
            bins: BTreeMap::new(),
            min_time: None,
            max_time: None,
        }
    }

    /// Lower edge of bin `idx`.
    pub fn key(&self, idx: i64) -> f64 {
        (idx as f64 * self.interval * KEY_SCALE).round() / KEY_SCALE
    }

    pub fn bin_index(&self, wind_speed: f64) -> i64 {
        let mut idx = (wind_speed / self.interval).floor() as i64;
        while idx > i64::MIN && self.key(idx) > wind_speed {
            idx -= 1;
        }
        while idx < i64::MAX && self.key(idx + 1) <= wind_speed {
            idx += 1;
        }
        idx
    }

    pub fn push(&mut self, reading: &Reading) {
        let totals = self.bins.entry(self.bin_index(reading.wind_speed)).or_default();
        totals.power_sum += reading.power_output;
        totals.count += 1;

        let ts = reading.timestamp;
        self.min_time = Some(self.min_time.map_or(ts, |m| m.min(ts)));
        self.max_time = Some(self.max_time.map_or(ts, |m| m.max(ts)));
    }

    /// Earliest and latest timestamp over every reading pushed.
    pub fn time_span(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        self.min_time.zip(self.max_time)
    }

    /// Bins ascending by key, average power rounded for display.
    pub fn finish(&self) -> Vec<PowerCurveBin> {
        self.bins
            .iter()
            .map(|(idx, totals)| PowerCurveBin {
                wind_speed: self.key(*idx),
                average_power: round_display(totals.power_sum / totals.count as f64),
                reading_count: totals.count,
            })
            .collect()
    }
}
