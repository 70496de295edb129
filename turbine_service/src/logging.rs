/// Structured logging for the turbine telemetry service.
///
/// Installs a `tracing` subscriber writing to the console or, for scheduled
/// runs, appending to a log file. Also classifies acquisition failures so an
/// export that has simply been withdrawn is not reported like an outage.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::AcquireError;

// ---------------------------------------------------------------------------
// Subscriber setup
// ---------------------------------------------------------------------------

/// Initializes the global subscriber.
///
/// `RUST_LOG` overrides `level` when set. Calling this twice is harmless; the
/// second call keeps the first subscriber.
pub fn init_logging(level: &str, log_file: Option<&Path>) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// The export is gone or was never published; nothing is wrong locally.
    Expected,
    /// Timeouts, refused connections, server errors, local I/O problems.
    Unexpected,
    /// Cannot tell.
    Unknown,
}

impl std::fmt::Display for FailureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

pub fn classify_acquire_failure(err: &AcquireError) -> FailureType {
    match err {
        AcquireError::Status(404 | 410) => FailureType::Expected,
        AcquireError::Status(code) if *code >= 500 => FailureType::Unexpected,
        AcquireError::Http(e) if e.is_timeout() || e.is_connect() => FailureType::Unexpected,
        AcquireError::Io { .. } => FailureType::Unexpected,
        AcquireError::NoLocation(_) => FailureType::Expected,
        _ => FailureType::Unknown,
    }
}

/// Logs a failed acquisition at a level matching its classification.
pub fn log_acquire_failure(source_id: i32, err: &AcquireError) {
    let class = classify_acquire_failure(err);
    match class {
        FailureType::Expected => debug!(source_id, class = %class, error = %err, "acquire failed, skipping source"),
        FailureType::Unexpected => error!(source_id, class = %class, error = %err, "acquire failed, skipping source"),
        FailureType::Unknown => warn!(source_id, class = %class, error = %err, "acquire failed, skipping source"),
    }
}

// ---------------------------------------------------------------------------
// Run Summary Logging
// ---------------------------------------------------------------------------

pub fn log_ingest_summary(total: usize, successful: usize, failed: usize) {
    if failed == 0 {
        info!(total, successful, failed, "ingestion complete");
    } else if successful == 0 {
        error!(total, successful, failed, "ingestion complete, every source failed");
    } else {
        warn!(total, successful, failed, "ingestion complete with skipped sources");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_failure_classification() {
        assert_eq!(classify_acquire_failure(&AcquireError::Status(404)), FailureType::Expected);
        assert_eq!(classify_acquire_failure(&AcquireError::Status(503)), FailureType::Unexpected);
        assert_eq!(classify_acquire_failure(&AcquireError::Status(403)), FailureType::Unknown);
        assert_eq!(classify_acquire_failure(&AcquireError::NoLocation(1)), FailureType::Expected);

        let io = AcquireError::Io {
            path: PathBuf::from("data/turbine_1.csv"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(classify_acquire_failure(&io), FailureType::Unexpected);
    }

    #[test]
    fn test_init_logging_to_file_twice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ingest.log");
        init_logging("debug", Some(&path)).expect("log file should open");
        init_logging("info", None).expect("second init is a no-op");
        assert!(path.exists());
    }
}
