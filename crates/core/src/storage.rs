//! Mount-root file storage
//!
//! [`Storage`] performs every disk operation the server needs, scoped to one mount directory.
//! It knows nothing about the transport; cancellation reaches it either as a stop predicate
//! (listing) or by the caller simply ceasing to drive a [`StagedFile`] or [`ChunkReader`].
//!
//! # Writes
//!
//! Stores never write to the target path directly. Bytes go to a uniquely named staging file in
//! the mount root, and [`StagedFile::commit`] renames it over the target in one step:
//!
//! ```text
//! <mount_root>/
//! ├── report.pdf                  # last committed version, always complete
//! └── .dfs-staging-<uuid>         # in-progress store, hidden from listings
//! ```
//!
//! Concurrent stores to the same name therefore never interleave bytes, a concurrent fetch reads
//! either the old or the new version in full, and a store that fails or is cancelled leaves the
//! previous version untouched. A staging file that is dropped without being committed is removed.

use crate::{CoreConfig, StorageError, StorageResult};
use api_shared::constants::STAGING_PREFIX;
use api_shared::pb::{FileInfo, FileStatus};
use api_shared::{ChunkReader, FileName};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

/// Result of one directory scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Listing {
    pub files: Vec<FileInfo>,
    /// Entries that could not be inspected and were left out.
    pub skipped: u64,
}

/// Disk operations under a single mount root.
#[derive(Debug)]
pub struct Storage {
    config: CoreConfig,
    skipped_entries: AtomicU64,
}

impl Storage {
    pub fn new(config: CoreConfig) -> Self {
        Self {
            config,
            skipped_entries: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Total number of directory entries skipped by [`Storage::list`] since construction.
    pub fn skipped_entries(&self) -> u64 {
        self.skipped_entries.load(Ordering::Relaxed)
    }

    /// Starts a store of `name`.
    ///
    /// # Errors
    ///
    /// Returns `FileCreate` if the staging file cannot be created in the mount root.
    pub async fn begin_store(&self, name: &FileName) -> StorageResult<StagedFile> {
        let staging_path = self
            .config
            .mount_root()
            .join(format!("{STAGING_PREFIX}{}", uuid::Uuid::new_v4().simple()));
        let file = File::create(&staging_path)
            .await
            .map_err(StorageError::FileCreate)?;

        tracing::debug!(
            "staging {} at {}",
            name,
            staging_path.display()
        );

        Ok(StagedFile {
            file: Some(file),
            staging_path,
            target_path: self.config.resolve(name),
            bytes_written: 0,
            committed: false,
        })
    }

    /// Opens `name` for chunked reading.
    ///
    /// Any failure to open is reported as `NotFound`.
    pub async fn open(&self, name: &FileName) -> StorageResult<ChunkReader<File>> {
        let path = self.config.resolve(name);
        match File::open(&path).await {
            Ok(file) => Ok(ChunkReader::new(file)),
            Err(e) => {
                tracing::error!("failed to open {}: {}", path.display(), e);
                Err(StorageError::NotFound(name.to_string()))
            }
        }
    }

    /// Deletes `name`.
    pub async fn remove(&self, name: &FileName) -> StorageResult<()> {
        let path = self.config.resolve(name);
        if fs::metadata(&path).await.is_err() {
            return Err(StorageError::NotFound(name.to_string()));
        }
        fs::remove_file(&path).await.map_err(StorageError::Remove)
    }

    /// Size and timestamps of `name`.
    pub async fn stat(&self, name: &FileName) -> StorageResult<FileStatus> {
        let path = self.config.resolve(name);
        let metadata = fs::metadata(&path)
            .await
            .map_err(|_| StorageError::NotFound(name.to_string()))?;

        let modified = metadata.modified().map_err(StorageError::FileRead)?;
        // Birth time is not recorded by every filesystem.
        let created = metadata.created().unwrap_or(modified);

        Ok(FileStatus {
            size: metadata.len(),
            modified_time: unix_seconds(modified),
            creation_time: unix_seconds(created),
        })
    }

    /// Lists the regular files in the mount root.
    ///
    /// `should_stop` is consulted before each entry; when it returns `true` the scan ends with
    /// `Cancelled`. Staging files and non-regular entries are left out. Entries whose name is
    /// not UTF-8 or whose metadata cannot be read are skipped, logged and counted rather than
    /// failing the listing. Entry order is whatever the filesystem returns.
    pub async fn list(&self, mut should_stop: impl FnMut() -> bool) -> StorageResult<Listing> {
        let root = self.config.mount_root();
        let mut entries = fs::read_dir(root)
            .await
            .map_err(StorageError::DirectoryOpen)?;

        let mut listing = Listing::default();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(StorageError::DirectoryRead)?
        {
            if should_stop() {
                return Err(StorageError::Cancelled);
            }

            let filename = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    self.record_skip(&mut listing, &root.join(&raw), "name is not UTF-8");
                    continue;
                }
            };
            if filename.starts_with(STAGING_PREFIX) {
                continue;
            }

            let path = entry.path();
            let metadata = match fs::metadata(&path).await {
                Ok(m) => m,
                Err(e) => {
                    self.record_skip(&mut listing, &path, &e.to_string());
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }
            let modified = match metadata.modified() {
                Ok(t) => t,
                Err(e) => {
                    self.record_skip(&mut listing, &path, &e.to_string());
                    continue;
                }
            };

            listing.files.push(FileInfo {
                filename,
                modified_time: unix_seconds(modified),
            });
        }

        Ok(listing)
    }

    fn record_skip(&self, listing: &mut Listing, path: &Path, reason: &str) {
        tracing::warn!("skipping {} in listing: {}", path.display(), reason);
        listing.skipped += 1;
        self.skipped_entries.fetch_add(1, Ordering::Relaxed);
    }
}

/// An in-progress store.
///
/// Dropping a `StagedFile` without calling [`StagedFile::commit`] discards what was written.
#[derive(Debug)]
pub struct StagedFile {
    file: Option<File>,
    staging_path: PathBuf,
    target_path: PathBuf,
    bytes_written: u64,
    committed: bool,
}

impl StagedFile {
    pub async fn write_chunk(&mut self, content: &[u8]) -> StorageResult<()> {
        let file = self.file.as_mut().ok_or_else(|| {
            StorageError::FileWrite(std::io::Error::other("staged file already closed"))
        })?;
        file.write_all(content)
            .await
            .map_err(StorageError::FileWrite)?;
        self.bytes_written += content.len() as u64;
        Ok(())
    }

    /// Makes the staged bytes visible under the target name, returning the number of bytes.
    pub async fn commit(mut self) -> StorageResult<u64> {
        if let Some(mut file) = self.file.take() {
            file.flush().await.map_err(StorageError::FileWrite)?;
        }
        fs::rename(&self.staging_path, &self.target_path)
            .await
            .map_err(StorageError::Commit)?;
        self.committed = true;
        Ok(self.bytes_written)
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        self.file.take();
        // Drop cannot await. A single unlink blocks the worker only briefly, and removing the
        // file synchronously means it is gone before the call's reply is sent.
        if let Err(e) = std::fs::remove_file(&self.staging_path) {
            tracing::warn!(
                "failed to discard staging file {}: {}",
                self.staging_path.display(),
                e
            );
        }
    }
}

fn unix_seconds(time: SystemTime) -> i64 {
    DateTime::<Utc>::from(time).timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn storage(temp: &TempDir) -> Storage {
        Storage::new(CoreConfig::new(temp.path()).unwrap())
    }

    fn name(s: &str) -> FileName {
        FileName::new(s).unwrap()
    }

    fn staging_files(root: &Path) -> Vec<String> {
        std::fs::read_dir(root)
            .unwrap()
            .flatten()
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|n| n.starts_with(STAGING_PREFIX))
            .collect()
    }

    async fn read_all(storage: &Storage, file: &str) -> Vec<u8> {
        let mut reader = storage.open(&name(file)).await.unwrap();
        let mut out = Vec::new();
        while let Some(chunk) = reader.next_chunk().await.unwrap() {
            out.extend_from_slice(&chunk.content);
        }
        out
    }

    #[tokio::test]
    async fn test_commit_makes_file_visible() {
        let temp = TempDir::new().unwrap();
        let storage = storage(&temp);

        let mut staged = storage.begin_store(&name("a.txt")).await.unwrap();
        staged.write_chunk(b"hello ").await.unwrap();
        staged.write_chunk(b"world").await.unwrap();
        assert!(!temp.path().join("a.txt").exists());

        let written = staged.commit().await.unwrap();

        assert_eq!(written, 11);
        assert_eq!(std::fs::read(temp.path().join("a.txt")).unwrap(), b"hello world");
        assert!(staging_files(temp.path()).is_empty());
    }

    #[tokio::test]
    async fn test_dropped_store_keeps_previous_version() {
        let temp = TempDir::new().unwrap();
        let storage = storage(&temp);
        std::fs::write(temp.path().join("a.txt"), b"old").unwrap();

        let mut staged = storage.begin_store(&name("a.txt")).await.unwrap();
        staged.write_chunk(b"partial new content").await.unwrap();
        assert_eq!(staging_files(temp.path()).len(), 1);
        drop(staged);

        assert_eq!(std::fs::read(temp.path().join("a.txt")).unwrap(), b"old");
        assert!(staging_files(temp.path()).is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_stores_do_not_interleave() {
        let temp = TempDir::new().unwrap();
        let storage = storage(&temp);

        let mut first = storage.begin_store(&name("a.txt")).await.unwrap();
        let mut second = storage.begin_store(&name("a.txt")).await.unwrap();
        first.write_chunk(b"aaaa").await.unwrap();
        second.write_chunk(b"bb").await.unwrap();
        first.write_chunk(b"aaaa").await.unwrap();
        second.commit().await.unwrap();
        first.commit().await.unwrap();

        assert_eq!(read_all(&storage, "a.txt").await, b"aaaaaaaa");
    }

    #[tokio::test]
    async fn test_open_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let storage = storage(&temp);

        let result = storage.open(&name("missing")).await;

        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_remove() {
        let temp = TempDir::new().unwrap();
        let storage = storage(&temp);
        std::fs::write(temp.path().join("a.txt"), b"x").unwrap();

        storage.remove(&name("a.txt")).await.unwrap();

        assert!(!temp.path().join("a.txt").exists());
        let again = storage.remove(&name("a.txt")).await;
        assert!(matches!(again, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_stat_reports_size_and_times() {
        let temp = TempDir::new().unwrap();
        let storage = storage(&temp);
        std::fs::write(temp.path().join("a.txt"), vec![1u8; 5000]).unwrap();

        let status = storage.stat(&name("a.txt")).await.unwrap();

        let mtime = std::fs::metadata(temp.path().join("a.txt"))
            .unwrap()
            .modified()
            .unwrap();
        assert_eq!(status.size, 5000);
        assert_eq!(status.modified_time, unix_seconds(mtime));
        assert!(status.creation_time > 0);
    }

    #[tokio::test]
    async fn test_stat_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let storage = storage(&temp);

        let result = storage.stat(&name("missing")).await;

        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_returns_regular_files_only() {
        let temp = TempDir::new().unwrap();
        let storage = storage(&temp);
        std::fs::write(temp.path().join("a.txt"), b"a").unwrap();
        std::fs::write(temp.path().join("b.txt"), b"b").unwrap();
        std::fs::create_dir(temp.path().join("subdir")).unwrap();
        let _pending = storage.begin_store(&name("c.txt")).await.unwrap();

        let listing = storage.list(|| false).await.unwrap();

        let mut names: Vec<&str> = listing.files.iter().map(|f| f.filename.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert_eq!(listing.skipped, 0);
        for info in &listing.files {
            let mtime = std::fs::metadata(temp.path().join(&info.filename))
                .unwrap()
                .modified()
                .unwrap();
            assert_eq!(info.modified_time, unix_seconds(mtime));
        }
    }

    #[tokio::test]
    async fn test_list_of_empty_mount_root() {
        let temp = TempDir::new().unwrap();
        let storage = storage(&temp);

        let listing = storage.list(|| false).await.unwrap();

        assert!(listing.files.is_empty());
    }

    #[tokio::test]
    async fn test_list_stops_when_asked() {
        let temp = TempDir::new().unwrap();
        let storage = storage(&temp);
        std::fs::write(temp.path().join("a.txt"), b"a").unwrap();

        let result = storage.list(|| true).await;

        assert!(matches!(result, Err(StorageError::Cancelled)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_list_skips_and_counts_dangling_entries() {
        let temp = TempDir::new().unwrap();
        let storage = storage(&temp);
        std::fs::write(temp.path().join("a.txt"), b"a").unwrap();
        std::os::unix::fs::symlink(
            temp.path().join("does-not-exist"),
            temp.path().join("dangling"),
        )
        .unwrap();

        let listing = storage.list(|| false).await.unwrap();

        assert_eq!(listing.files.len(), 1);
        assert_eq!(listing.files[0].filename, "a.txt");
        assert_eq!(listing.skipped, 1);
        assert_eq!(storage.skipped_entries(), 1);
    }
}
