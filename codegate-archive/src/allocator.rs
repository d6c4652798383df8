//! Archival allocator: names and persists one artifact per submission.
//!
//! Allocation scans the archive directory for the highest sequence number
//! already used by the submitter's [`ShortId`], then creates the next one
//! with an exclusive create. The scan and the create run under a
//! per-identifier mutex, so allocations inside one process never race;
//! exclusive create still reports a collision with another process as
//! [`ArchiveError::Collision`] instead of overwriting.

use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use chrono::{DateTime, Utc};
use codegate_core::{
    artifact::to_display_time, ArtifactName, CallerHash, Language, Provenance, Sequence, ShortId,
};
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::Mutex as AsyncMutex};

use crate::ArchiveError;

/// One code submission to be archived.
#[derive(Debug, Clone, Copy)]
pub struct Submission<'a> {
    /// The raw code payload.
    pub code: &'a str,
    /// Client-supplied seed for the short identifier.
    pub client_seed: &'a str,
    /// Salted hash of the caller's address.
    pub caller_hash: CallerHash,
    /// Language, used for the extension and header comments.
    pub language: Language,
}

type IdLock = Arc<AsyncMutex<()>>;

/// Append-only writer of run artifacts into a flat directory.
///
/// # Cancel Safety
/// Cancel safe. Once a name is chosen, the create and write run on their
/// own task that keeps the per-identifier lock until the file is complete,
/// so a dropped future never leaves a truncated artifact behind.
#[derive(Debug)]
pub struct Archive {
    dir: PathBuf,
    locks: Mutex<HashMap<ShortId, IdLock>>,
}

impl Archive {
    /// Create an allocator writing into `dir`. The directory is created on
    /// first use.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), locks: Mutex::new(HashMap::new()) }
    }

    /// The archive directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist `submission` and return the name it was stored under.
    ///
    /// # Errors
    /// - [`ArchiveError::CreateDir`] / [`ArchiveError::ReadDir`] if the
    ///   directory cannot be created or listed.
    /// - [`ArchiveError::SequenceExhausted`] once sequence `ffff` is taken.
    /// - [`ArchiveError::Collision`] if the chosen name already exists.
    /// - [`ArchiveError::Write`] if the file cannot be written; the partial
    ///   file is removed.
    pub async fn archive(&self, submission: &Submission<'_>) -> Result<ArtifactName, ArchiveError> {
        self.archive_at(submission, Utc::now()).await
    }

    async fn archive_at(
        &self,
        submission: &Submission<'_>,
        captured_at: DateTime<Utc>,
    ) -> Result<ArtifactName, ArchiveError> {
        let id = ShortId::derive(submission.client_seed);
        let lock = self.lock_for(&id);
        let result = self.allocate_and_write(&id, Arc::clone(&lock), submission, captured_at).await;
        self.release(&id, &lock);
        result
    }

    async fn allocate_and_write(
        &self,
        id: &ShortId,
        lock: IdLock,
        submission: &Submission<'_>,
        captured_at: DateTime<Utc>,
    ) -> Result<ArtifactName, ArchiveError> {
        let guard = lock.lock_owned().await;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| ArchiveError::CreateDir { path: self.dir.clone(), source })?;

        let sequence = match latest_sequence(&self.dir, id).await? {
            None => Sequence::FIRST,
            Some(last) => last
                .next()
                .ok_or_else(|| ArchiveError::SequenceExhausted { id: id.clone() })?,
        };

        let name = ArtifactName::new(id.clone(), sequence, &captured_at, submission.language.extension());
        let provenance = Provenance::new(
            submission.client_seed,
            submission.caller_hash,
            to_display_time(&captured_at),
        );
        let mut body = provenance.header(submission.language);
        body.push_str(submission.code);

        let path = self.dir.join(name.to_string());
        let bytes = body.len();
        let write = {
            let path = path.clone();
            let name = name.clone();
            tokio::spawn(async move {
                let written = write_exclusive(&path, &name, body.as_bytes()).await;
                drop(guard);
                written
            })
        };
        write
            .await
            .map_err(|e| ArchiveError::Write { path, source: std::io::Error::other(e) })??;

        tracing::info!(artifact = %name, bytes, "archived submission");
        Ok(name)
    }

    fn lock_for(&self, id: &ShortId) -> IdLock {
        // The table only holds `Arc`s, so a poisoned guard is still consistent.
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(id.clone()).or_default())
    }

    /// Drop the table entry for `id` when no other allocation holds it.
    fn release(&self, id: &ShortId, lock: &IdLock) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let unshared = locks
            .get(id)
            .is_some_and(|held| Arc::ptr_eq(held, lock) && Arc::strong_count(lock) == 2);
        if unshared {
            locks.remove(id);
        }
    }
}

/// Highest sequence number already used by `id`, ignoring unrelated or
/// malformed names.
async fn latest_sequence(dir: &Path, id: &ShortId) -> Result<Option<Sequence>, ArchiveError> {
    let read_err = |source| ArchiveError::ReadDir { path: dir.to_path_buf(), source };
    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_err)?;

    let mut latest = None;
    while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str().and_then(ArtifactName::parse) else {
            continue;
        };
        if name.id == *id {
            latest = latest.max(Some(name.sequence));
        }
    }
    Ok(latest)
}

async fn write_exclusive(path: &Path, name: &ArtifactName, bytes: &[u8]) -> Result<(), ArchiveError> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(ArchiveError::Collision { name: name.to_string() });
        }
        Err(source) => return Err(ArchiveError::Write { path: path.to_path_buf(), source }),
    };

    let written: std::io::Result<()> = async {
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await
    }
    .await;

    if let Err(source) = written {
        drop(file);
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove partial artifact");
        }
        return Err(ArchiveError::Write { path: path.to_path_buf(), source });
    }
    Ok(())
}
