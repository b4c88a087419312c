use std::collections::HashMap;
use std::sync::RwLock;

use transform::EnrichedRecord;

use crate::StoreError;

/// Append-only destination for enriched records.
///
/// No upsert or merge: every call adds rows after whatever the relation
/// already holds. A failed append leaves the relation untouched.
pub trait LoadSink: Send + Sync {
    /// Appends `records` to `relation` and returns how many were written.
    fn append(&self, relation: &str, records: &[EnrichedRecord]) -> Result<usize, StoreError>;

    /// Reads every record of `relation` in append order. Unknown relations are empty.
    fn scan(&self, relation: &str) -> Result<Vec<EnrichedRecord>, StoreError>;
}

/// Selects and builds a load sink.
///
/// ```
/// use store::LoadBackend;
///
/// let backend = LoadBackend::in_memory();
/// let sink = backend.build().unwrap();
/// assert_eq!(sink.append("sales", &[]).unwrap(), 0);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LoadBackend {
    /// Embedded redb file at `path`.
    Redb { path: String },
    #[default]
    InMemory,
}

impl LoadBackend {
    pub fn in_memory() -> Self {
        LoadBackend::InMemory
    }

    pub fn redb<P: Into<String>>(path: P) -> Self {
        LoadBackend::Redb { path: path.into() }
    }

    pub fn build(&self) -> Result<Box<dyn LoadSink>, StoreError> {
        match self {
            LoadBackend::InMemory => Ok(Box::new(InMemoryLoadSink::new())),
            LoadBackend::Redb { path } => {
                #[cfg(feature = "backend-redb")]
                {
                    Ok(Box::new(RedbLoadSink::open(path)?))
                }
                #[cfg(not(feature = "backend-redb"))]
                {
                    let _ = path;
                    Err(StoreError::backend("redb backend disabled at compile time"))
                }
            }
        }
    }
}

pub(crate) fn check_relation(relation: &str) -> Result<(), StoreError> {
    if relation.trim().is_empty() {
        return Err(StoreError::backend("relation name must not be empty"));
    }
    Ok(())
}

/// Per-relation vectors behind a `RwLock`.
pub struct InMemoryLoadSink {
    relations: RwLock<HashMap<String, Vec<EnrichedRecord>>>,
}

impl InMemoryLoadSink {
    pub fn new() -> Self {
        Self {
            relations: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryLoadSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadSink for InMemoryLoadSink {
    fn append(&self, relation: &str, records: &[EnrichedRecord]) -> Result<usize, StoreError> {
        check_relation(relation)?;
        self.relations
            .write()
            .map_err(|_| StoreError::backend("poisoned lock"))?
            .entry(relation.to_string())
            .or_default()
            .extend_from_slice(records);
        Ok(records.len())
    }

    fn scan(&self, relation: &str) -> Result<Vec<EnrichedRecord>, StoreError> {
        let guard = self
            .relations
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        Ok(guard.get(relation).cloned().unwrap_or_default())
    }
}

#[cfg(feature = "backend-redb")]
pub mod redb;

#[cfg(feature = "backend-redb")]
pub use self::redb::RedbLoadSink;
