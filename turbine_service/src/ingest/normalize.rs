/// Raw row to `Reading` conversion.
///
/// Total over its input: every raw row either becomes a `Reading` that
/// satisfies the model invariant or yields the reason it was rejected.

use chrono::NaiveDateTime;

use crate::error::RejectReason;
use crate::ingest::format::{Column, ColumnSpec, DecimalSeparator};
use crate::ingest::parse::RawRow;
use crate::model::Reading;

pub fn normalize(row: &RawRow, source_id: i32, spec: &ColumnSpec) -> Result<Reading, RejectReason> {
    let timestamp = parse_timestamp(&row.timestamp, &spec.timestamp_formats)
        .ok_or_else(|| RejectReason::Timestamp(row.timestamp.clone()))?;
    let wind_speed = parse_measurement(&row.wind_speed, Column::WindSpeed, spec.decimal_separator)?;
    let power_output = parse_measurement(&row.power_output, Column::PowerOutput, spec.decimal_separator)?;

    Ok(Reading { source_id, timestamp, wind_speed, power_output })
}

/// Tries each format in order and returns the first successful parse.
pub fn parse_timestamp(value: &str, formats: &[String]) -> Option<NaiveDateTime> {
    let value = value.trim();
    formats
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

fn parse_measurement(value: &str, column: Column, sep: DecimalSeparator) -> Result<f64, RejectReason> {
    let trimmed = value.trim();
    let text = match sep {
        DecimalSeparator::Dot => trimmed.to_string(),
        DecimalSeparator::Comma => trimmed.replace(',', "."),
    };
    let parsed: f64 = text.parse().map_err(|_| RejectReason::NotANumber {
        column: column.name(),
        value: trimmed.to_string(),
    })?;
    if !parsed.is_finite() || parsed < 0.0 {
        return Err(RejectReason::OutOfRange { column: column.name(), value: parsed });
    }
    Ok(parsed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
