/// Resolved per-source parsing rules.
///
/// A `ColumnSpec` is built once from a source's `FormatConfig`; header labels
/// are normalized here so that per-row work never touches the alias table.

use std::collections::HashMap;

use crate::config::FormatConfig;

// ---------------------------------------------------------------------------
// Canonical columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Timestamp,
    WindSpeed,
    PowerOutput,
}

impl Column {
    pub const ALL: [Column; 3] = [Column::Timestamp, Column::WindSpeed, Column::PowerOutput];

    pub fn name(self) -> &'static str {
        match self {
            Column::Timestamp => "timestamp",
            Column::WindSpeed => "wind_speed",
            Column::PowerOutput => "power_output",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecimalSeparator {
    Dot,
    Comma,
}

impl DecimalSeparator {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '.' => Some(DecimalSeparator::Dot),
            ',' => Some(DecimalSeparator::Comma),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Alias table
// ---------------------------------------------------------------------------

/// Maps normalized vendor labels to canonical columns.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    labels: HashMap<String, Column>,
}

impl AliasTable {
    /// Builds the table; every canonical name is always accepted as its own
    /// alias.
    pub fn new(entries: &[(Column, &[String])]) -> Result<Self, String> {
        let mut labels = HashMap::new();
        for column in Column::ALL {
            labels.insert(normalize_header(column.name()), column);
        }
        for (column, aliases) in entries {
            if aliases.is_empty() {
                return Err(format!("no aliases configured for `{}`", column.name()));
            }
            for alias in aliases.iter() {
                let key = normalize_header(alias);
                match labels.insert(key, *column) {
                    Some(previous) if previous != *column => {
                        return Err(format!(
                            "alias '{alias}' maps to both `{}` and `{}`",
                            previous.name(),
                            column.name()
                        ));
                    }
                    _ => {}
                }
            }
        }
        Ok(Self { labels })
    }

    pub fn lookup(&self, header: &str) -> Option<Column> {
        self.labels.get(&normalize_header(header)).copied()
    }
}

/// Trims whitespace, strips a UTF-8 BOM and lowercases a header label.
pub fn normalize_header(name: &str) -> String {
    name.trim_start_matches('\u{feff}').trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// Column spec
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub delimiter: u8,
    pub decimal_separator: DecimalSeparator,
    pub skip_rows: usize,
    pub timestamp_formats: Vec<String>,
    pub aliases: AliasTable,
}

impl ColumnSpec {
    pub fn from_config(config: &FormatConfig) -> Result<Self, String> {
        if !config.delimiter.is_ascii() {
            return Err(format!("delimiter '{}' must be a single ASCII character", config.delimiter));
        }
        let decimal_separator = DecimalSeparator::from_char(config.decimal_separator)
            .ok_or_else(|| {
                format!("decimal_separator must be '.' or ',', got '{}'", config.decimal_separator)
            })?;
        if config.delimiter == config.decimal_separator {
            return Err("delimiter and decimal_separator must differ".to_string());
        }
        if config.timestamp_formats.is_empty() {
            return Err("at least one timestamp format is required".to_string());
        }

        let aliases = AliasTable::new(&[
            (Column::Timestamp, config.aliases.timestamp.as_slice()),
            (Column::WindSpeed, config.aliases.wind_speed.as_slice()),
            (Column::PowerOutput, config.aliases.power_output.as_slice()),
        ])?;

        Ok(Self {
            delimiter: config.delimiter as u8,
            decimal_separator,
            skip_rows: config.skip_rows,
            timestamp_formats: config.timestamp_formats.clone(),
            aliases,
        })
    }
}

impl Default for ColumnSpec {
    fn default() -> Self {
        Self::from_config(&FormatConfig::default())
            .unwrap_or_else(|e| unreachable!("built-in format must be valid: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_ignores_whitespace_and_case() {
        let spec = ColumnSpec::default();
        assert_eq!(spec.aliases.lookup("  Wind speed (m/s) "), Some(Column::WindSpeed));
        assert_eq!(spec.aliases.lookup("POWER (KW)"), Some(Column::PowerOutput));
        assert_eq!(spec.aliases.lookup("\u{feff}# Date and time"), Some(Column::Timestamp));
        assert_eq!(spec.aliases.lookup("Rotor speed (rpm)"), None);
    }

    #[test]
    fn test_canonical_names_always_accepted() {
        let spec = ColumnSpec::default();
        assert_eq!(spec.aliases.lookup("timestamp"), Some(Column::Timestamp));
        assert_eq!(spec.aliases.lookup("wind_speed"), Some(Column::WindSpeed));
        assert_eq!(spec.aliases.lookup("power_output"), Some(Column::PowerOutput));
    }

    #[test]
    fn test_conflicting_alias_rejected() {
        let shared = vec!["Value".to_string()];
        let err = AliasTable::new(&[(Column::WindSpeed, shared.as_slice()), (Column::PowerOutput, shared.as_slice())])
            .expect_err("one label cannot name two columns");
        assert!(err.contains("Value"));
    }

    #[test]
    fn test_comma_decimal_with_semicolon_delimiter() {
        let config = FormatConfig { decimal_separator: ',', ..FormatConfig::default() };
        let spec = ColumnSpec::from_config(&config).expect("valid format");
        assert_eq!(spec.decimal_separator, DecimalSeparator::Comma);
        assert_eq!(spec.delimiter, b';');
    }

    #[test]
    fn test_invalid_formats_rejected() {
        let bad_sep = FormatConfig { decimal_separator: ' ', ..FormatConfig::default() };
        assert!(ColumnSpec::from_config(&bad_sep).is_err());

        let no_formats = FormatConfig { timestamp_formats: Vec::new(), ..FormatConfig::default() };
        assert!(ColumnSpec::from_config(&no_formats).is_err());

        let unicode_delim = FormatConfig { delimiter: '¦', ..FormatConfig::default() };
        assert!(ColumnSpec::from_config(&unicode_delim).is_err());
    }
}
