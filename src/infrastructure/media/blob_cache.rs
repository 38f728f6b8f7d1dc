//! On-disk blob cache keyed by source URL.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use sha1::{Digest, Sha1};
use tempfile::NamedTempFile;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace};

use crate::domain::entities::EmbedKind;
use crate::domain::errors::MediaError;

/// Blob cache rooted at a directory with one subdirectory per media kind.
#[derive(Debug, Clone)]
pub struct BlobCache {
    root: PathBuf,
}

impl BlobCache {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File name of the cached copy of `url`.
    #[must_use]
    pub fn file_name(url: &str) -> String {
        URL_SAFE.encode(Sha1::digest(url.as_bytes()))
    }

    #[must_use]
    pub fn path_for(&self, kind: EmbedKind, url: &str) -> PathBuf {
        self.root.join(kind.cache_dir()).join(Self::file_name(url))
    }

    /// Returns the cached file for `url`, if one was committed before.
    pub async fn lookup(&self, kind: EmbedKind, url: &str) -> Option<PathBuf> {
        let path = self.path_for(kind, url);
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {
                trace!(path = %path.display(), "blob cache hit");
                Some(path)
            }
            _ => None,
        }
    }

    /// Opens a temporary file next to the final location of `url`.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Io` if the kind directory or the temporary file
    /// cannot be created.
    pub async fn reserve(&self, kind: EmbedKind, url: &str) -> Result<PendingBlob, MediaError> {
        let dest = self.path_for(kind, url);
        let dir = self.root.join(kind.cache_dir());
        fs::create_dir_all(&dir).await?;

        let name = Self::file_name(url);
        let temp = tempfile::Builder::new()
            .prefix(&format!("{name}.tmp."))
            .tempfile_in(&dir)?;
        let file = fs::File::from_std(temp.reopen()?);

        Ok(PendingBlob {
            temp,
            file,
            dest,
            written: 0,
        })
    }
}

/// Blob being written. Dropping it without [`PendingBlob::commit`] removes
/// the temporary file.
#[derive(Debug)]
pub struct PendingBlob {
    temp: NamedTempFile,
    file: fs::File,
    dest: PathBuf,
    written: u64,
}

impl PendingBlob {
    /// Appends a chunk.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Io` on write failure.
    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), MediaError> {
        self.file.write_all(chunk).await?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    #[must_use]
    pub const fn written(&self) -> u64 {
        self.written
    }

    /// Moves the finished blob into place.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Io` if flushing or the final rename fails.
    pub async fn commit(mut self) -> Result<PathBuf, MediaError> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        drop(self.file);

        self.temp
            .persist(&self.dest)
            .map_err(|e| MediaError::Io(e.error))?;
        debug!(path = %self.dest.display(), bytes = self.written, "blob committed");
        Ok(self.dest)
    }
}
