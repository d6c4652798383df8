//! Read and delete access to archived artifacts for the admin surface.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use chrono::{DateTime, FixedOffset, Utc};
use codegate_core::{artifact::to_display_time, validate_bare_filename};
use serde::{Serialize, Serializer};

use crate::ArchiveError;

/// One entry of an archive listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct ArtifactEntry {
    /// File name inside the archive directory.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time in the display offset.
    #[serde(serialize_with = "rfc3339_seconds")]
    pub mod_time: DateTime<FixedOffset>,
}

fn rfc3339_seconds<S: Serializer>(at: &DateTime<FixedOffset>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&at.format("%Y-%m-%dT%H:%M:%S%:z").to_string())
}

/// Admin view over the archive directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Open the store rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The archive directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// List every regular file in the archive, sorted by name.
    ///
    /// Entries whose metadata cannot be read are skipped.
    ///
    /// # Errors
    /// Returns [`ArchiveError::ReadDir`] if the directory cannot be listed.
    pub async fn list(&self) -> Result<Vec<ArtifactEntry>, ArchiveError> {
        let read_err = |source| ArchiveError::ReadDir { path: self.dir.clone(), source };
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(read_err)?;

        let mut listing = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            let Ok(modified) = meta.modified() else {
                continue;
            };
            listing.push(ArtifactEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                size: meta.len(),
                mod_time: to_display_time(&DateTime::<Utc>::from(modified)),
            });
        }
        listing.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listing)
    }

    /// Read the raw bytes of one artifact.
    ///
    /// # Errors
    /// - [`ArchiveError::InvalidName`] if `name` is not a bare file name.
    /// - [`ArchiveError::NotFound`] if no such file exists.
    pub async fn read(&self, name: &str) -> Result<Vec<u8>, ArchiveError> {
        let path = self.resolve(name)?;
        if !is_file(&path).await {
            return Err(ArchiveError::NotFound { name: name.to_owned() });
        }
        tokio::fs::read(&path).await.map_err(|e| not_found_or(name, e))
    }

    /// Delete one artifact.
    ///
    /// # Errors
    /// - [`ArchiveError::InvalidName`] if `name` is not a bare file name.
    /// - [`ArchiveError::NotFound`] if no such file exists.
    /// - [`ArchiveError::Io`] if removal fails for another reason.
    pub async fn delete(&self, name: &str) -> Result<(), ArchiveError> {
        let path = self.resolve(name)?;
        if !is_file(&path).await {
            return Err(ArchiveError::NotFound { name: name.to_owned() });
        }
        tokio::fs::remove_file(&path).await.map_err(|e| not_found_or(name, e))?;
        tracing::info!(artifact = %name, "deleted artifact");
        Ok(())
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, ArchiveError> {
        let name = validate_bare_filename(name)
            .map_err(|_| ArchiveError::InvalidName { name: name.to_owned() })?;
        Ok(self.dir.join(name))
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok_and(|m| m.is_file())
}

fn not_found_or(name: &str, e: std::io::Error) -> ArchiveError {
    if e.kind() == ErrorKind::NotFound {
        ArchiveError::NotFound { name: name.to_owned() }
    } else {
        ArchiveError::Io(e)
    }
}
