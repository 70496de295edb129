/// Single-pass summary statistics over readings.

use crate::model::{Reading, Statistics, round_display};

#[derive(Debug, Clone)]
pub struct StatisticsAccumulator {
    count: usize,
    wind_sum: f64,
    wind_min: f64,
    wind_max: f64,
    power_sum: f64,
    power_min: f64,
    power_max: f64,
}

impl Default for StatisticsAccumulator {
    fn default() -> Self {
        Self {
            count: 0,
            wind_sum: 0.0,
            wind_min: f64::INFINITY,
            wind_max: f64::NEG_INFINITY,
            power_sum: 0.0,
            power_min: f64::INFINITY,
            power_max: f64::NEG_INFINITY,
        }
    }
}

impl StatisticsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, reading: &Reading) {
        self.count += 1;
        self.wind_sum += reading.wind_speed;
        self.wind_min = self.wind_min.min(reading.wind_speed);
        self.wind_max = self.wind_max.max(reading.wind_speed);
        self.power_sum += reading.power_output;
        self.power_min = self.power_min.min(reading.power_output);
        self.power_max = self.power_max.max(reading.power_output);
    }

    /// `None` when nothing was pushed. Averages and `total_energy` are rounded
    /// for display; minima and maxima are reported as stored.
    pub fn finish(&self, source_id: i32) -> Option<Statistics> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some(Statistics {
            source_id,
            count: self.count,
            avg_wind_speed: round_display(self.wind_sum / n),
            min_wind_speed: self.wind_min,
            max_wind_speed: self.wind_max,
            avg_power: round_display(self.power_sum / n),
            min_power: self.power_min,
            max_power: self.power_max,
            total_energy: round_display(self.power_sum),
        })
    }
}
