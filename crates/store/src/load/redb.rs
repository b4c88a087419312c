//! Redb-backed load sink.
//!
//! One table per relation, keyed by a `u64` sequence number and holding the
//! JSON encoding of each [`EnrichedRecord`]. An append opens a single write
//! transaction, continues the sequence after the table's last key and commits
//! once, so a batch lands completely or not at all.
//!
//! ```yaml
//! load:
//!   backend: "redb"
//!   path: "/data/salesflow.redb"
//!   table: "sales"
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, TableError};
use tracing::info;
use transform::EnrichedRecord;

use super::{check_relation, LoadSink};
use crate::StoreError;

fn table(relation: &str) -> TableDefinition<'_, u64, &'static [u8]> {
    TableDefinition::new(relation)
}

/// JSON has no encoding for `inf` or `NaN`; serde_json writes them as `null`,
/// which would make the stored row unreadable.
fn encode(record: &EnrichedRecord) -> Result<Vec<u8>, StoreError> {
    for (field, value) in [
        ("unit_price", record.unit_price),
        ("total_amount", record.total_amount),
    ] {
        if !value.is_finite() {
            return Err(StoreError::Serialization(format!(
                "order {}: {field} is not finite ({value})",
                record.order_id
            )));
        }
    }
    Ok(serde_json::to_vec(record)?)
}

/// Persistent load sink on an embedded redb file.
///
/// The database handle is shared behind an `Arc`; redb does its own locking.
pub struct RedbLoadSink {
    db: Arc<Database>,
}

impl RedbLoadSink {
    /// Opens the database at `path`, creating it if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let db = Database::create(path).map_err(StoreError::backend)?;
        Ok(Self { db: Arc::new(db) })
    }
}

impl LoadSink for RedbLoadSink {
    fn append(&self, relation: &str, records: &[EnrichedRecord]) -> Result<usize, StoreError> {
        check_relation(relation)?;
        let start = Instant::now();

        // Encode up front so a bad record never opens a transaction.
        let encoded = records
            .iter()
            .map(encode)
            .collect::<Result<Vec<_>, _>>()?;

        let write_txn = self.db.begin_write().map_err(StoreError::backend)?;
        {
            let mut table = write_txn
                .open_table(table(relation))
                .map_err(StoreError::backend)?;

            let mut next = match table.last().map_err(StoreError::backend)? {
                Some((key, _)) => key.value() + 1,
                None => 0,
            };
            for value in &encoded {
                table
                    .insert(next, value.as_slice())
                    .map_err(StoreError::backend)?;
                next += 1;
            }
        }
        write_txn.commit().map_err(StoreError::backend)?;

        info!(
            relation,
            loaded = records.len(),
            elapsed_micros = start.elapsed().as_micros(),
            "load_committed"
        );
        Ok(records.len())
    }

    fn scan(&self, relation: &str) -> Result<Vec<EnrichedRecord>, StoreError> {
        let read_txn = self.db.begin_read().map_err(StoreError::backend)?;
        let table = match read_txn.open_table(table(relation)) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::backend(e)),
        };

        let mut records = Vec::new();
        for item in table.iter().map_err(StoreError::backend)? {
            let (_, value) = item.map_err(StoreError::backend)?;
            records.push(serde_json::from_slice(value.value())?);
        }
        Ok(records)
    }
}
