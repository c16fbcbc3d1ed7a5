//! Processed-set store: the durable record of feed items already handled.
//!
//! The file format is plain UTF-8, one identifier per line, append-only.
//! Duplicated lines are harmless because `load` folds them into a set.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("reading processed set {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("appending to processed set {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("identifier {0:?} cannot be stored on a single line")]
    InvalidIdentifier(String),
}

pub trait ProcessedStore: Send + Sync {
    /// All committed identifiers; empty on first run.
    fn load(&self) -> Result<HashSet<String>, StoreError>;
    /// Durably append one identifier. Returns only after the data is synced.
    fn commit(&self, id: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct FileProcessedStore {
    path: PathBuf,
}

impl FileProcessedStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProcessedStore for FileProcessedStore {
    fn load(&self) -> Result<HashSet<String>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn commit(&self, id: &str) -> Result<(), StoreError> {
        let id = id.trim();
        if !is_storable(id) {
            return Err(StoreError::InvalidIdentifier(id.to_string()));
        }
        let write_err = |source: io::Error| StoreError::Write {
            path: self.path.clone(),
            source,
        };
        let mut f = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(write_err)?;
        // A hand-edited file may lack the final newline.
        let line = if ends_without_newline(&mut f).map_err(write_err)? {
            format!("\n{id}\n")
        } else {
            format!("{id}\n")
        };
        f.write_all(line.as_bytes()).map_err(write_err)?;
        f.sync_all().map_err(write_err)?;
        tracing::debug!(item_id = id, path = %self.path.display(), "processed marker committed");
        Ok(())
    }
}

/// Whether `id` fits the one-identifier-per-line format.
pub fn is_storable(id: &str) -> bool {
    let id = id.trim();
    !id.is_empty() && !id.contains(['\n', '\r'])
}

fn ends_without_newline(f: &mut File) -> io::Result<bool> {
    if f.metadata()?.len() == 0 {
        return Ok(false);
    }
    f.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    f.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}
