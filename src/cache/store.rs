//! Directory-backed image cache
//!
//! The directory listing is the index: no state is kept in memory.
//! Eviction is approximate LRU ordered by PNG modification time, and hits
//! refresh that time.

use crate::error::{TracMathError, TracMathResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::{debug, info, warn};

/// Extension of persisted cache entries
pub const IMAGE_EXT: &str = "png";

/// Extension of a rasterized image that has not been moved into place yet
pub const PARTIAL_EXT: &str = "part";

/// Extensions of transient files left by the toolchain
pub const INTERMEDIATE_EXTS: &[&str] = &["tex", "log", "aux", "dvi", "pdf", PARTIAL_EXT];

/// A stored image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntry {
    /// File name (`<key>.png`)
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Last modification, the recency signal for eviction
    pub modified: DateTime<Utc>,
}

/// Outcome of one maintenance cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulateReport {
    /// Intermediate artifacts deleted
    pub garbage_removed: usize,
    /// Images evicted, oldest first
    pub evicted: Vec<String>,
    /// Images left in the cache
    pub remaining: usize,
}

/// Image cache rooted at one directory
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
    max_entries: usize,
}

impl CacheStore {
    /// Create a store; the directory is created by [`CacheStore::ensure_dir`]
    pub fn new(dir: impl Into<PathBuf>, max_entries: usize) -> Self {
        Self {
            dir: dir.into(),
            max_entries,
        }
    }

    /// Cache directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Maximum number of images kept after a populate cycle
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Create the cache directory if absent
    pub async fn ensure_dir(&self) -> TracMathResult<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| TracMathError::CacheDirCreate {
                path: self.dir.clone(),
                source: e,
            })
    }

    /// Path of an entry inside the cache directory
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Check whether an entry exists
    pub async fn contains(&self, name: &str) -> bool {
        fs::try_exists(self.path_for(name)).await.unwrap_or(false)
    }

    /// Set an entry's modification time to now
    pub async fn touch(&self, name: &str) -> TracMathResult<()> {
        let path = self.path_for(name);
        let context = format!("touching {}", path.display());

        tokio::task::spawn_blocking(move || {
            let file = std::fs::File::options().append(true).open(&path)?;
            file.set_modified(SystemTime::now())
        })
        .await
        .map_err(|e| TracMathError::Internal(format!("touch task failed: {e}")))?
        .map_err(|e| TracMathError::io(context, e))
    }

    /// Move a finished artifact to its final name in one step
    ///
    /// Readers see either no entry or the complete file, never a partial one.
    pub async fn promote(&self, from: &str, to: &str) -> TracMathResult<()> {
        let target = self.path_for(to);
        fs::rename(self.path_for(from), &target)
            .await
            .map_err(|e| TracMathError::io(format!("moving {} into place", target.display()), e))
    }

    /// Delete an entry; a missing file counts as removed
    pub async fn remove(&self, name: &str) -> TracMathResult<()> {
        let path = self.path_for(name);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TracMathError::io(format!("removing {}", path.display()), e)),
        }
    }

    /// List stored images, oldest first
    pub async fn entries(&self) -> TracMathResult<Vec<CacheEntry>> {
        let mut entries: Vec<CacheEntry> = self
            .scan()
            .await?
            .into_iter()
            .filter_map(|file| match file.kind {
                FileKind::Image { size, modified } => Some(CacheEntry {
                    name: file.name,
                    size,
                    modified: DateTime::<Utc>::from(modified),
                }),
                _ => None,
            })
            .collect();

        entries.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.name.cmp(&b.name)));
        Ok(entries)
    }

    /// Sweep intermediates and evict the oldest images over the limit
    pub async fn populate(&self) -> TracMathResult<PopulateReport> {
        self.populate_except(&HashSet::new()).await
    }

    /// Like [`CacheStore::populate`], but keep intermediates whose stem is in `busy`
    pub async fn populate_except(&self, busy: &HashSet<String>) -> TracMathResult<PopulateReport> {
        let mut report = PopulateReport::default();
        let mut images = Vec::new();

        for file in self.scan().await? {
            match file.kind {
                FileKind::Intermediate => {
                    let stem = file.name.split('.').next().unwrap_or_default();
                    if busy.contains(stem) {
                        continue;
                    }
                    self.remove_tolerant(&file.name).await;
                    report.garbage_removed += 1;
                }
                FileKind::Image { modified, .. } => images.push((modified, file.name)),
                FileKind::Other => {}
            }
        }

        if images.len() > self.max_entries {
            images.sort();
            let excess = images.len() - self.max_entries;
            for (_, name) in images.drain(..excess) {
                self.remove_tolerant(&name).await;
                report.evicted.push(name);
            }
            info!(
                "Evicted {} image(s), keeping {}",
                report.evicted.len(),
                images.len()
            );
        }

        report.remaining = images.len();
        debug!(
            "Cache maintenance: {} garbage, {} evicted, {} remaining",
            report.garbage_removed,
            report.evicted.len(),
            report.remaining
        );
        Ok(report)
    }

    /// Delete every image and intermediate, returning the number removed
    pub async fn clear(&self) -> TracMathResult<usize> {
        let mut removed = 0;
        for file in self.scan().await? {
            if !matches!(file.kind, FileKind::Other) {
                self.remove_tolerant(&file.name).await;
                removed += 1;
            }
        }
        info!("Cleared {} cache file(s)", removed);
        Ok(removed)
    }

    /// Resolve a requested entry name to a path inside the cache
    ///
    /// Only a bare file name is accepted; separators, `..` and absolute
    /// paths are rejected so a request cannot leave the directory.
    pub fn resolve(&self, name: &str) -> TracMathResult<PathBuf> {
        let mut components = Path::new(name).components();
        let bare = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );

        if !bare || name.contains(['/', '\\', '\0']) {
            return Err(TracMathError::InvalidName(name.to_string()));
        }

        Ok(self.path_for(name))
    }

    /// Read an entry by name
    pub async fn read(&self, name: &str) -> TracMathResult<Vec<u8>> {
        let path = self.resolve(name)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(TracMathError::NotFound(name.to_string()))
            }
            Err(e) => Err(TracMathError::io(format!("reading {}", path.display()), e)),
        }
    }

    async fn remove_tolerant(&self, name: &str) {
        if let Err(e) = self.remove(name).await {
            warn!("Failed to delete cache file: {}", e);
        }
    }

    async fn scan(&self) -> TracMathResult<Vec<ScannedFile>> {
        let mut dir = fs::read_dir(&self.dir).await.map_err(|e| {
            TracMathError::io(format!("listing cache {}", self.dir.display()), e)
        })?;

        let mut files = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| TracMathError::io(format!("listing cache {}", self.dir.display()), e))?
        {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };

            let kind = match Path::new(&name).extension().and_then(|e| e.to_str()) {
                Some(IMAGE_EXT) => match entry.metadata().await {
                    Ok(meta) if meta.is_file() => FileKind::Image {
                        size: meta.len(),
                        modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                    },
                    // Deleted since listing, or not a regular file
                    _ => continue,
                },
                Some(ext) if INTERMEDIATE_EXTS.contains(&ext) => FileKind::Intermediate,
                _ => FileKind::Other,
            };

            files.push(ScannedFile { name, kind });
        }

        Ok(files)
    }
}

struct ScannedFile {
    name: String,
    kind: FileKind,
}

enum FileKind {
    Image { size: u64, modified: SystemTime },
    Intermediate,
    Other,
}
