/// Raw export acquisition.
///
/// A source is read from its local cache file when one exists; otherwise it is
/// downloaded and the body written to the cache so the next run can reuse it.
/// The cache file only ever appears complete: the body goes to a `.part`
/// sibling first and is renamed into place. Any failure here is local to the
/// source.

use std::fs;
use std::path::{Path, PathBuf};

use reqwest::blocking::Client;
use tracing::{debug, info};

use crate::config::{Settings, SourceConfig};
use crate::error::AcquireError;

/// Builds the blocking HTTP client used for downloads.
pub fn http_client(settings: &Settings) -> Result<Client, AcquireError> {
    Ok(Client::builder().timeout(settings.fetch_timeout()).build()?)
}

/// Returns the raw bytes of `source`.
///
/// With `refresh` set the cache is ignored and the export re-downloaded.
pub fn acquire(
    client: &Client,
    source: &SourceConfig,
    settings: &Settings,
    refresh: bool,
) -> Result<Vec<u8>, AcquireError> {
    let path = source.cache_path(settings);

    if path.exists() && (!refresh || source.url.is_none()) {
        debug!(source_id = source.source_id, path = %path.display(), "reusing cached export");
        return fs::read(&path).map_err(|e| AcquireError::Io { path: path.clone(), source: e });
    }

    let url = source
        .url
        .as_deref()
        .ok_or(AcquireError::NoLocation(source.source_id))?;

    info!(source_id = source.source_id, %url, "downloading export");
    let response = client.get(url).send()?;
    if !response.status().is_success() {
        return Err(AcquireError::Status(response.status().as_u16()));
    }
    let body = response.bytes()?.to_vec();

    write_cache(&path, &body)?;
    info!(source_id = source.source_id, bytes = body.len(), path = %path.display(), "export cached");

    Ok(body)
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Writes `body` to `path` through a temporary sibling and a rename. On
/// failure the temporary file is removed and `path` is left untouched.
fn write_cache(path: &Path, body: &[u8]) -> Result<(), AcquireError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| AcquireError::Io { path: dir.to_path_buf(), source: e })?;
    }

    let tmp = part_path(path);
    let result = fs::write(&tmp, body)
        .map_err(|e| AcquireError::Io { path: tmp.clone(), source: e })
        .and_then(|()| {
            fs::rename(&tmp, path).map_err(|e| AcquireError::Io { path: path.to_path_buf(), source: e })
        });
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}
