//! JSON document persistence
//!
//! Reads and writes a single JSON document at a path. Writes create missing
//! parent directories and go through a temp file plus rename so a crash never
//! leaves a truncated document behind.

use crate::error::{FightgraphError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Read and deserialize the document at `path`
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| FightgraphError::Io {
        source: e,
        context: format!("Failed to read {}", path.display()),
    })?;

    serde_json::from_str(&content).map_err(|e| FightgraphError::Json {
        source: e,
        context: format!("Failed to parse {}", path.display()),
    })
}

/// Serialize `value` and atomically replace the document at `path`
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value).map_err(|e| FightgraphError::Json {
        source: e,
        context: format!("Failed to serialize {}", path.display()),
    })?;

    let store_err = |source: std::io::Error| FightgraphError::StoreWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(store_err)?;
    }

    let temp_path = temp_path(path);
    let mut file = fs::File::create(&temp_path).map_err(store_err)?;
    file.write_all(content.as_bytes()).map_err(store_err)?;
    file.sync_all().map_err(store_err)?;
    drop(file);

    fs::rename(&temp_path, path).map_err(store_err)?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
