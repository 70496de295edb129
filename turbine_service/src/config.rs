/// Service configuration.
///
/// Loaded from a TOML file (`turbines.toml` by default) with a `[settings]`
/// table and a `[[sources]]` array. When no file exists the built-in registry
/// in `sources` is used. The database URL is never stored in the file; it is
/// read from `DATABASE_URL`, with `.env` support through `dotenv`.
///
/// ```toml
/// [settings]
/// data_dir = "data"
/// fetch_timeout_secs = 60
///
/// [[sources]]
/// source_id = 1
/// name = "Turbine 1"
/// url = "https://example.com/Turbine_1.csv"
///
/// [sources.format]
/// delimiter = ";"
/// decimal_separator = ","
/// ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::ingest::format::ColumnSpec;
use crate::model::{DEFAULT_LIMIT, MAX_LIMIT};
use crate::sources;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_PATH: &str = "turbines.toml";

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding cached source downloads.
    pub data_dir: PathBuf,
    pub fetch_timeout_secs: u64,
    /// Applied both as the connect timeout and the server statement timeout.
    pub store_timeout_secs: u64,
    /// `limit` used by range queries that do not pass one.
    pub default_limit: usize,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            fetch_timeout_secs: 60,
            store_timeout_secs: 30,
            default_limit: DEFAULT_LIMIT,
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl Settings {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// One vendor export feeding a single `source_id`.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub source_id: i32,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    /// Explicit local file; also used as the download cache path.
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default)]
    pub format: FormatConfig,
}

impl SourceConfig {
    /// Where the raw export is cached on disk.
    pub fn cache_path(&self, settings: &Settings) -> PathBuf {
        match &self.file {
            Some(path) => path.clone(),
            None => settings.data_dir.join(format!("turbine_{}.csv", self.source_id)),
        }
    }
}

/// How a vendor lays out its export.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    pub delimiter: char,
    pub decimal_separator: char,
    /// Lines dropped before the header row.
    pub skip_rows: usize,
    /// Tried in order; the first format that parses wins.
    pub timestamp_formats: Vec<String>,
    pub aliases: AliasConfig,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            delimiter: ';',
            decimal_separator: '.',
            skip_rows: 0,
            timestamp_formats: sources::DEFAULT_TIMESTAMP_FORMATS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            aliases: AliasConfig::default(),
        }
    }
}

/// Vendor column labels accepted for each canonical column.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AliasConfig {
    pub timestamp: Vec<String>,
    pub wind_speed: Vec<String>,
    pub power_output: Vec<String>,
}

impl Default for AliasConfig {
    fn default() -> Self {
        let owned = |labels: &[&str]| labels.iter().map(|s| s.to_string()).collect();
        Self {
            timestamp: owned(sources::TIMESTAMP_ALIASES),
            wind_speed: owned(sources::WIND_SPEED_ALIASES),
            power_output: owned(sources::POWER_OUTPUT_ALIASES),
        }
    }
}

// ---------------------------------------------------------------------------
// Service configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default = "sources::default_sources")]
    pub sources: Vec<SourceConfig>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            sources: sources::default_sources(),
        }
    }
}

impl ServiceConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: ServiceConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Loads `path` when given; otherwise `turbines.toml` if it exists, else
    /// the built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_PATH);
                if fallback.exists() {
                    Self::load(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.settings;
        if !(1..=MAX_LIMIT).contains(&s.default_limit) {
            return Err(ConfigError::Invalid(format!(
                "default_limit must be between 1 and {MAX_LIMIT}, got {}",
                s.default_limit
            )));
        }
        if s.fetch_timeout_secs == 0 || s.store_timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeouts must be positive".to_string()));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if !seen.insert(source.source_id) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate source_id {}",
                    source.source_id
                )));
            }
            ColumnSpec::from_config(&source.format).map_err(|e| {
                ConfigError::Invalid(format!("source {}: {e}", source.source_id))
            })?;
        }
        Ok(())
    }

    pub fn find_source(&self, source_id: i32) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.source_id == source_id)
    }

    /// Sources to process, in configuration order. An empty selection means
    /// all of them; unknown ids are an error.
    pub fn select_sources(&self, ids: &[i32]) -> Result<Vec<&SourceConfig>, ConfigError> {
        if ids.is_empty() {
            return Ok(self.sources.iter().collect());
        }
        if let Some(unknown) = ids.iter().find(|id| self.find_source(**id).is_none()) {
            return Err(ConfigError::Invalid(format!("unknown source_id {unknown}")));
        }
        Ok(self
            .sources
            .iter()
            .filter(|s| ids.contains(&s.source_id))
            .collect())
    }
}

/// Reads `DATABASE_URL`, loading `.env` first.
pub fn database_url() -> Result<String, ConfigError> {
    dotenv::dotenv().ok();
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
