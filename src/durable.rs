//! Durable command writer
//!
//! Wraps store writes for the command catalog in a backup/verify/restore
//! sequence so a failed or interrupted write is less likely to leave the
//! collection truncated. Not rename-atomic: a crash between the overwrite
//! and the verification leaves a half-written file that only the next
//! commit's verification will notice.

use crate::models::CommandRecord;
use crate::store::StoreError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Terminal state of a commit attempt. Callers must treat anything other
/// than `Committed` as "write not confirmed", not "state reverted" —
/// restoration can itself fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Written and verified; any backup has been cleaned up.
    Committed,
    /// Verification failed and the previous content was copied back.
    RolledBack,
    /// Verification failed with no backup available, or restoring it failed.
    Corrupted,
}

#[derive(Debug, Clone)]
pub struct DurableWriter {
    path: PathBuf,
}

impl DurableWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".backup");
        PathBuf::from(name)
    }

    /// Full replace of the command collection.
    ///
    /// Backs up the current file, overwrites it, re-reads and verifies the
    /// result (array shape, element count, and content digest), then either
    /// removes the backup or restores from it. `Err` means the overwrite
    /// itself failed; a non-`Committed` outcome means the write could not be
    /// confirmed.
    pub async fn commit(&self, commands: &[CommandRecord]) -> Result<CommitOutcome, StoreError> {
        println!(
            "💾 Writing {} commands to {}",
            commands.len(),
            self.path.display()
        );

        // Backup failure is non-fatal: the commit proceeds without a safety
        // net for this attempt.
        let backup = self.backup_path();
        let mut backup_created = false;
        if tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            match tokio::fs::copy(&self.path, &backup).await {
                Ok(_) => {
                    backup_created = true;
                    println!("💾 Backup created: {}", backup.display());
                }
                Err(e) => {
                    eprintln!("⚠️  Could not back up {}: {}", self.path.display(), e);
                }
            }
        }

        let json =
            serde_json::to_string_pretty(commands).map_err(|e| StoreError::Serialize {
                path: self.path.clone(),
                source: e,
            })?;
        let digest = Sha256::digest(json.as_bytes());

        tokio::fs::write(&self.path, &json)
            .await
            .map_err(|e| StoreError::Write {
                path: self.path.clone(),
                source: e,
            })?;

        if self.verify(commands.len(), digest.as_slice()).await {
            if backup_created {
                if let Err(e) = tokio::fs::remove_file(&backup).await {
                    println!("ℹ️  Could not remove backup {}: {}", backup.display(), e);
                }
            }
            println!("✅ Commit verified: {} commands on disk", commands.len());
            return Ok(CommitOutcome::Committed);
        }

        eprintln!(
            "❌ Write verification failed for {}",
            self.path.display()
        );

        if backup_created {
            match tokio::fs::copy(&backup, &self.path).await {
                Ok(_) => {
                    println!("🔄 Restored {} from backup", self.path.display());
                    Ok(CommitOutcome::RolledBack)
                }
                Err(e) => {
                    eprintln!("❌ Failed to restore from backup: {}", e);
                    Ok(CommitOutcome::Corrupted)
                }
            }
        } else {
            Ok(CommitOutcome::Corrupted)
        }
    }

    /// Re-read the just-written file. The content must parse as a JSON
    /// array of the expected length and hash to the expected digest.
    async fn verify(&self, expected_len: usize, expected_digest: &[u8]) -> bool {
        let content = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) => {
                eprintln!("❌ Verification read failed: {}", e);
                return false;
            }
        };

        match serde_json::from_slice::<Vec<serde_json::Value>>(&content) {
            Ok(items) if items.len() == expected_len => {
                Sha256::digest(&content).as_slice() == expected_digest
            }
            Ok(items) => {
                eprintln!(
                    "❌ Verification length mismatch: {} on disk, {} expected",
                    items.len(),
                    expected_len
                );
                false
            }
            Err(e) => {
                eprintln!("❌ Verification parse failed: {}", e);
                false
            }
        }
    }
}
