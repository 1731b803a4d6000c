//! Flat-file JSON store
//!
//! Makes a path on disk behave like a durable array-valued document. No
//! locking and no partial updates: one logical writer per path at a time.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid JSON in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to serialize document for {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Create the parent directory chain and the file itself if missing, seeding
/// it with `default`. Never touches an existing file, so it is safe to call
/// on every request.
pub async fn ensure<T: Serialize>(path: &Path, default: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::Write {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Ok(());
    }

    write(path, default).await
}

/// Read and parse the whole document.
pub async fn read<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| StoreError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

    serde_json::from_str(&content).map_err(|e| StoreError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Serialize `value` as indented JSON and overwrite the file in full.
pub async fn write<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| StoreError::Serialize {
        path: path.to_path_buf(),
        source: e,
    })?;

    tokio::fs::write(path, json)
        .await
        .map_err(|e| StoreError::Write {
            path: path.to_path_buf(),
            source: e,
        })
}
