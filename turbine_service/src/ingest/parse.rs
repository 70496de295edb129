/// Tolerant delimited-text parsing.
///
/// Vendor exports differ in delimiter, preamble lines and header labels, and
/// occasionally contain truncated or garbled lines. The header is resolved
/// once against the alias table; structurally broken lines are recorded and
/// skipped rather than failing the whole file.

use csv::StringRecord;

use crate::error::ParseError;
use crate::ingest::format::{Column, ColumnSpec};

/// One data line, split and mapped to canonical columns but not yet typed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 1-based line number in the original export.
    pub line: usize,
    pub timestamp: String,
    pub wind_speed: String,
    pub power_output: String,
}

/// A line that could not be split into the expected columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: Option<usize>,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ParsedTable {
    pub rows: Vec<RawRow>,
    pub malformed: Vec<RowError>,
}

/// Header positions of the canonical columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnIndex {
    timestamp: usize,
    wind_speed: usize,
    power_output: usize,
}

/// Splits `bytes` into raw rows according to `spec`.
///
/// Fails only when no usable header is found.
pub fn parse(bytes: &[u8], spec: &ColumnSpec) -> Result<ParsedTable, ParseError> {
    let body = skip_lines(bytes, spec.skip_rows);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(spec.delimiter)
        .has_headers(true)
        .flexible(false)
        .trim(csv::Trim::All)
        .from_reader(body);

    let header_record = reader.headers()?.clone();
    if header_record.iter().all(|h| h.is_empty()) {
        return Err(ParseError::Empty);
    }
    let headers: Vec<String> = header_record.iter().map(str::to_string).collect();
    let index = resolve_columns(&header_record, spec, &headers)?;

    let mut rows = Vec::new();
    let mut malformed = Vec::new();

    for result in reader.records() {
        match result {
            Ok(record) => {
                let line = record.position().map(|p| p.line() as usize + spec.skip_rows);
                rows.push(RawRow {
                    line: line.unwrap_or_default(),
                    timestamp: field(&record, index.timestamp),
                    wind_speed: field(&record, index.wind_speed),
                    power_output: field(&record, index.power_output),
                });
            }
            Err(e) => malformed.push(RowError {
                line: e.position().map(|p| p.line() as usize + spec.skip_rows),
                message: e.to_string(),
            }),
        }
    }

    Ok(ParsedTable { rows, malformed })
}

fn resolve_columns(
    record: &StringRecord,
    spec: &ColumnSpec,
    headers: &[String],
) -> Result<ColumnIndex, ParseError> {
    let position = |column: Column| {
        record
            .iter()
            .position(|h| spec.aliases.lookup(h) == Some(column))
            .ok_or_else(|| ParseError::MissingColumn {
                column: column.name(),
                headers: headers.to_vec(),
            })
    };
    Ok(ColumnIndex {
        timestamp: position(Column::Timestamp)?,
        wind_speed: position(Column::WindSpeed)?,
        power_output: position(Column::PowerOutput)?,
    })
}

fn field(record: &StringRecord, idx: usize) -> String {
    record.get(idx).unwrap_or_default().to_string()
}

/// Drops the first `n` lines.
fn skip_lines(bytes: &[u8], n: usize) -> &[u8] {
    let mut rest = bytes;
    for _ in 0..n {
        match rest.iter().position(|b| *b == b'\n') {
            Some(pos) => rest = &rest[pos + 1..],
            None => return &[],
        }
    }
    rest
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
