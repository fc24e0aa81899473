//! Background `.eml` writes.
//!
//! Writes are spawned as they are submitted so the reconstruction loop
//! never waits on the disk. A semaphore bounds how many files are open at
//! once, and [`EmlWriter::finish`] joins every pending write before the
//! run is reported complete.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::{Result, SalvageError};

/// Totals of all writes joined by [`EmlWriter::finish`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub files: usize,
    pub bytes: u64,
    /// Targets that were already taken and got a numeric suffix.
    pub renamed: usize,
}

struct WriteReceipt {
    bytes: u64,
}

/// Fire-and-forget file writer with a join barrier.
///
/// Must be used from within a tokio runtime.
pub struct EmlWriter {
    tasks: JoinSet<Result<WriteReceipt>>,
    permits: Arc<Semaphore>,
    /// Claimed targets, case-folded.
    targets: HashSet<PathBuf>,
    renamed: usize,
    summary: WriteSummary,
}

impl EmlWriter {
    pub fn new(max_open_files: usize) -> Self {
        Self {
            tasks: JoinSet::new(),
            permits: Arc::new(Semaphore::new(max_open_files.max(1))),
            targets: HashSet::new(),
            renamed: 0,
            summary: WriteSummary::default(),
        }
    }

    /// Queue `contents` for `path` and return immediately.
    ///
    /// Returns the path actually used: when two messages of a run map to
    /// the same file, the later one gets `_1`, `_2`, ... appended to its
    /// stem. Names differing only in case count as the same file. The
    /// parent directory must already exist.
    pub fn submit(&mut self, path: PathBuf, contents: Vec<u8>) -> PathBuf {
        let path = if self.targets.contains(&fold_case(&path)) {
            let unique = unique_path(&path, &self.targets);
            warn!(
                path = %path.display(),
                renamed = %unique.display(),
                "Duplicate message file name"
            );
            self.renamed += 1;
            unique
        } else {
            path
        };
        self.targets.insert(fold_case(&path));

        let permits = Arc::clone(&self.permits);
        let target = path.clone();
        self.tasks.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| SalvageError::Write {
                    path: target.clone(),
                    reason: e.to_string(),
                })?;
            tokio::fs::write(&target, &contents)
                .await
                .map_err(|e| SalvageError::io(&target, e))?;
            debug!(path = %target.display(), bytes = contents.len(), "Saved message");
            Ok(WriteReceipt {
                bytes: contents.len() as u64,
            })
        });
        path
    }

    /// Number of writes submitted so far.
    pub fn submitted(&self) -> usize {
        self.targets.len()
    }

    /// Writes submitted but not yet collected.
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Collect writes that have already completed, without waiting.
    ///
    /// Surfaces a failed write before the run reaches [`EmlWriter::finish`].
    pub fn reap(&mut self) -> Result<()> {
        while let Some(joined) = self.tasks.try_join_next() {
            self.collect(joined)?;
        }
        Ok(())
    }

    /// Wait for every pending write. The first failure is returned and the
    /// remaining writes are cancelled.
    pub async fn finish(mut self) -> Result<WriteSummary> {
        while let Some(joined) = self.tasks.join_next().await {
            self.collect(joined)?;
        }
        Ok(WriteSummary {
            renamed: self.renamed,
            ..self.summary
        })
    }

    fn collect(
        &mut self,
        joined: std::result::Result<Result<WriteReceipt>, tokio::task::JoinError>,
    ) -> Result<()> {
        let receipt = joined.map_err(|e| SalvageError::Write {
            path: PathBuf::from("<background task>"),
            reason: e.to_string(),
        })??;
        self.summary.files += 1;
        self.summary.bytes += receipt.bytes;
        Ok(())
    }
}

/// Key under which a target is claimed. `ABC@x.eml` and `abc@x.eml` are
/// one file on case-insensitive filesystems.
fn fold_case(path: &Path) -> PathBuf {
    PathBuf::from(path.to_string_lossy().to_lowercase())
}

/// First `{stem}_{n}.{ext}` not yet claimed in this run.
fn unique_path(path: &Path, taken: &HashSet<PathBuf>) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("message");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parent = path.parent().unwrap_or(Path::new("."));

    (1..)
        .map(|i| {
            if ext.is_empty() {
                parent.join(format!("{stem}_{i}"))
            } else {
                parent.join(format!("{stem}_{i}.{ext}"))
            }
        })
        .find(|candidate| !taken.contains(&fold_case(candidate)))
        .unwrap_or_else(|| path.to_path_buf())
}
