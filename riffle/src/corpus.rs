//! Corpus providers
//!
//! The catalog store hands the engine a full snapshot of its records on
//! demand. Acquisition happens before a rebuild, never during scoring.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::interface::RiffleError;
use crate::models::Record;

/// Source of full corpus snapshots
pub trait CorpusProvider: Send + Sync {
    fn fetch_corpus(&self) -> Result<Vec<Record>, RiffleError>;
}

impl<F> CorpusProvider for F
where
    F: Fn() -> Result<Vec<Record>, RiffleError> + Send + Sync,
{
    fn fetch_corpus(&self) -> Result<Vec<Record>, RiffleError> {
        self()
    }
}

/// In-memory corpus the owner can replace between rebuilds
#[derive(Debug, Default)]
pub struct StaticCorpus {
    records: RwLock<Vec<Record>>,
}

impl StaticCorpus {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// Swap the contents. Takes effect on the next rebuild.
    pub fn replace(&self, records: Vec<Record>) {
        *self.records.write() = records;
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl CorpusProvider for StaticCorpus {
    fn fetch_corpus(&self) -> Result<Vec<Record>, RiffleError> {
        Ok(self.records.read().clone())
    }
}

/// A JSON array of records on disk, re-read on every fetch
#[derive(Debug, Clone)]
pub struct JsonFileCorpus {
    path: PathBuf,
}

impl JsonFileCorpus {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CorpusProvider for JsonFileCorpus {
    fn fetch_corpus(&self) -> Result<Vec<Record>, RiffleError> {
        let data = std::fs::read_to_string(&self.path)
            .map_err(|e| RiffleError::Corpus(format!("{}: {}", self.path.display(), e)))?;
        serde_json::from_str(&data)
            .map_err(|e| RiffleError::Corpus(format!("{}: {}", self.path.display(), e)))
    }
}
