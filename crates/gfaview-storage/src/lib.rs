use gfaview_core::{GenomeId, NodeId};
use rusqlite::{Connection, OpenFlags, OptionalExtension, Result, Row, Transaction, params};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

mod catalog;
mod row_mapping;
mod schema;

pub use catalog::{CatalogEntry, StoreCatalog, mark_complete, mark_incomplete};

const SCHEMA_VERSION: u32 = 1;
const SEQUENCE_SUFFIX: &str = ".sequence.db";
const ADJACENCY_SUFFIX: &str = ".adjacency.db";
const CATALOG_FILE: &str = "catalog.json";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Catalog error: {0}")]
    Catalog(#[from] serde_json::Error),
    #[error("Other error: {0}")]
    Other(String),
}

/// On-disk locations of a store, derived from the source file's base name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorePaths {
    pub base_name: String,
    pub sequence_db: PathBuf,
    pub adjacency_db: PathBuf,
    pub catalog: PathBuf,
}

impl StorePaths {
    pub fn for_source<P: AsRef<Path>, Q: AsRef<Path>>(
        store_dir: P,
        source: Q,
    ) -> Result<Self, StorageError> {
        let source = source.as_ref();
        let base_name = source
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                StorageError::Other(format!("source path has no file name: {}", source.display()))
            })?
            .to_string();
        let store_dir = store_dir.as_ref();
        Ok(Self {
            sequence_db: store_dir.join(format!("{base_name}{SEQUENCE_SUFFIX}")),
            adjacency_db: store_dir.join(format!("{base_name}{ADJACENCY_SUFFIX}")),
            catalog: store_dir.join(CATALOG_FILE),
            base_name,
        })
    }

    pub fn files_exist(&self) -> bool {
        self.sequence_db.is_file() && self.adjacency_db.is_file()
    }
}

/// Counts gathered while writing a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStats {
    pub node_count: u64,
    pub max_node_id: i64,
    pub genome_count: u32,
}

/// Read access to a finished store.
///
/// Every reader owns its own connections, so readers on different threads
/// never contend for a lock.
pub struct StoreReader {
    sequence: Connection,
    adjacency: Connection,
}

impl StoreReader {
    pub fn open(paths: &StorePaths) -> Result<Self, StorageError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let sequence = Connection::open_with_flags(&paths.sequence_db, flags)?;
        let adjacency = Connection::open_with_flags(&paths.adjacency_db, flags)?;
        let _ = sequence.busy_timeout(Duration::from_millis(2_500));
        let _ = adjacency.busy_timeout(Duration::from_millis(2_500));
        Ok(Self {
            sequence,
            adjacency,
        })
    }

    /// Highest stored node id. Source ids are dense, so this is the node count.
    pub fn store_size(&self) -> Result<i64, StorageError> {
        let size: i64 = self.sequence.query_row(
            "SELECT COALESCE(MAX(node_id), 0) FROM sequence",
            [],
            |row| row.get(0),
        )?;
        Ok(size)
    }

    pub fn node_count(&self) -> Result<u64, StorageError> {
        let count: i64 = self
            .sequence
            .query_row("SELECT COUNT(*) FROM sequence", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Sequence lengths for every stored id in `[low, high]`, ascending.
    pub fn sequence_lengths_between(
        &self,
        low: NodeId,
        high: NodeId,
    ) -> Result<Vec<(NodeId, u32)>, StorageError> {
        let mut stmt = self.sequence.prepare_cached(
            "SELECT node_id, length FROM sequence WHERE node_id BETWEEN ?1 AND ?2 ORDER BY node_id",
        )?;
        let rows = stmt.query_map(params![low.0, high.0], row_mapping::length_from_row)?;
        let mut lengths = Vec::new();
        for row in rows {
            lengths.push(row?);
        }
        Ok(lengths)
    }

    /// Adjacency rows for parents in `[low, high]`, ascending by parent.
    pub fn children_between(
        &self,
        low: NodeId,
        high: NodeId,
    ) -> Result<Vec<(NodeId, Vec<NodeId>)>, StorageError> {
        let mut stmt = self.adjacency.prepare_cached(
            "SELECT node_id, children FROM adjacency WHERE node_id BETWEEN ?1 AND ?2 ORDER BY node_id",
        )?;
        let mut rows = stmt.query(params![low.0, high.0])?;
        let mut adjacency = Vec::new();
        while let Some(row) = rows.next()? {
            adjacency.push(row_mapping::children_from_row(row)?);
        }
        Ok(adjacency)
    }

    pub fn children_of(&self, id: NodeId) -> Result<Vec<NodeId>, StorageError> {
        children_of(&self.adjacency, id)
    }

    /// Full sequence text, fetched on demand and never cached.
    pub fn sequence(&self, id: NodeId) -> Result<Option<String>, StorageError> {
        let sequence = self
            .sequence
            .query_row(
                "SELECT sequence FROM sequence WHERE node_id = ?1",
                params![id.0],
                |row| row.get(0),
            )
            .optional()?;
        Ok(sequence)
    }

    pub fn genomes_of(&self, id: NodeId) -> Result<Vec<GenomeId>, StorageError> {
        let payload: Option<String> = self
            .sequence
            .prepare_cached("SELECT genomes FROM membership WHERE node_id = ?1")?
            .query_row(params![id.0], |row| row.get(0))
            .optional()?;
        match payload {
            Some(payload) => row_mapping::deserialize_genomes(&payload),
            None => Ok(Vec::new()),
        }
    }

    /// Genome names ordered by index.
    pub fn genome_names(&self) -> Result<Vec<String>, StorageError> {
        genome_names(&self.sequence)
    }

    pub fn genome_index(&self, name: &str) -> Result<Option<GenomeId>, StorageError> {
        let idx: Option<i64> = self
            .sequence
            .query_row(
                "SELECT idx FROM genome WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(idx.map(|idx| GenomeId(idx as u32)))
    }
}

/// Writable store used by the ingestion pipeline.
pub struct Storage {
    sequence: Connection,
    adjacency: Connection,
}

impl Storage {
    pub fn open(paths: &StorePaths) -> Result<Self, StorageError> {
        if let Some(parent) = paths.sequence_db.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let sequence = Connection::open(&paths.sequence_db)?;
        let adjacency = Connection::open(&paths.adjacency_db)?;
        for conn in [&sequence, &adjacency] {
            // Rollback journal keeps finished stores openable by read-only readers.
            let _ = conn.busy_timeout(Duration::from_millis(2_500));
            let _ = conn.pragma_update(None, "synchronous", "NORMAL");
        }
        let storage = Self {
            sequence,
            adjacency,
        };
        storage.init()?;
        Ok(storage)
    }

    pub fn new_in_memory() -> Result<Self, StorageError> {
        let storage = Self {
            sequence: Connection::open_in_memory()?,
            adjacency: Connection::open_in_memory()?,
        };
        storage.init()?;
        Ok(storage)
    }

    fn init(&self) -> Result<(), StorageError> {
        schema::create_sequence_tables(&self.sequence)?;
        schema::create_adjacency_tables(&self.adjacency)?;
        schema::apply_schema_version(&self.sequence, "sequence store")?;
        schema::apply_schema_version(&self.adjacency, "adjacency store")
    }

    /// Open one transaction per store file. Nothing is visible until `commit`.
    pub fn begin_ingest(&self) -> Result<IngestTransaction<'_>, StorageError> {
        Ok(IngestTransaction {
            sequence: self.sequence.unchecked_transaction()?,
            adjacency: self.adjacency.unchecked_transaction()?,
        })
    }

    pub fn stats(&self) -> Result<StorageStats, StorageError> {
        let (node_count, max_node_id): (i64, i64) = self.sequence.query_row(
            "SELECT COUNT(*), COALESCE(MAX(node_id), 0) FROM sequence",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let genome_count: i64 =
            self.sequence
                .query_row("SELECT COUNT(*) FROM genome", [], |row| row.get(0))?;
        Ok(StorageStats {
            node_count: node_count.max(0) as u64,
            max_node_id,
            genome_count: genome_count.max(0) as u32,
        })
    }

    pub fn children_of(&self, id: NodeId) -> Result<Vec<NodeId>, StorageError> {
        children_of(&self.adjacency, id)
    }

    pub fn genome_names(&self) -> Result<Vec<String>, StorageError> {
        genome_names(&self.sequence)
    }
}

/// Pending writes of one ingestion run.
pub struct IngestTransaction<'a> {
    sequence: Transaction<'a>,
    adjacency: Transaction<'a>,
}

impl IngestTransaction<'_> {
    /// Drop everything a previous, possibly partial, ingestion left behind.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.sequence.execute("DELETE FROM sequence", [])?;
        self.sequence.execute("DELETE FROM membership", [])?;
        self.sequence.execute("DELETE FROM genome", [])?;
        self.adjacency.execute("DELETE FROM adjacency", [])?;
        Ok(())
    }

    pub fn insert_sequence(&self, id: NodeId, sequence: &str) -> Result<(), StorageError> {
        self.sequence
            .prepare_cached(
                "INSERT INTO sequence (node_id, sequence, length) VALUES (?1, ?2, ?3)
                 ON CONFLICT(node_id) DO UPDATE SET sequence = excluded.sequence, length = excluded.length",
            )?
            .execute(params![id.0, sequence, sequence.len() as i64])?;
        Ok(())
    }

    pub fn insert_membership(&self, id: NodeId, genomes: &[GenomeId]) -> Result<(), StorageError> {
        let payload = row_mapping::serialize_genomes(genomes)?;
        self.sequence
            .prepare_cached(
                "INSERT INTO membership (node_id, genomes) VALUES (?1, ?2)
                 ON CONFLICT(node_id) DO UPDATE SET genomes = excluded.genomes",
            )?
            .execute(params![id.0, payload])?;
        Ok(())
    }

    /// Replace the genome side table with `names`, indexed by position.
    pub fn replace_genomes(&self, names: &[String]) -> Result<(), StorageError> {
        self.sequence.execute("DELETE FROM genome", [])?;
        let mut stmt = self
            .sequence
            .prepare_cached("INSERT INTO genome (idx, name) VALUES (?1, ?2)")?;
        for (idx, name) in names.iter().enumerate() {
            stmt.execute(params![idx as i64, name])?;
        }
        Ok(())
    }

    /// Append `children` to the stored list of `parent`, skipping ids already present.
    ///
    /// Returns the number of edges actually added.
    pub fn merge_children(&self, parent: NodeId, children: &[NodeId]) -> Result<usize, StorageError> {
        let existing = children_of_optional(&self.adjacency, parent)?;
        let had_row = existing.is_some();
        let mut merged = existing.unwrap_or_default();
        let mut added = 0;
        for child in children {
            if !merged.contains(child) {
                merged.push(*child);
                added += 1;
            }
        }
        if added == 0 && had_row {
            return Ok(0);
        }

        let payload = row_mapping::serialize_ids(&merged)?;
        self.adjacency
            .prepare_cached(
                "INSERT INTO adjacency (node_id, children) VALUES (?1, ?2)
                 ON CONFLICT(node_id) DO UPDATE SET children = excluded.children",
            )?
            .execute(params![parent.0, payload])?;
        Ok(added)
    }

    pub fn commit(self) -> Result<(), StorageError> {
        self.adjacency.commit()?;
        self.sequence.commit()?;
        Ok(())
    }
}

/// Cheap, clonable reference to a completed store.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    paths: Arc<StorePaths>,
    entry: Arc<CatalogEntry>,
}

impl StoreHandle {
    pub fn new(paths: StorePaths, entry: CatalogEntry) -> Self {
        Self {
            paths: Arc::new(paths),
            entry: Arc::new(entry),
        }
    }

    /// Handle for `source` if a completed store for it already exists.
    pub fn open_existing<P: AsRef<Path>, Q: AsRef<Path>>(
        store_dir: P,
        source: Q,
    ) -> Result<Option<Self>, StorageError> {
        let paths = StorePaths::for_source(store_dir, source)?;
        let catalog = StoreCatalog::load(&paths.catalog)?;
        match catalog.entry(&paths.base_name) {
            Some(entry) if entry.complete && paths.files_exist() => {
                let entry = entry.clone();
                Ok(Some(Self::new(paths, entry)))
            }
            _ => Ok(None),
        }
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    pub fn entry(&self) -> &CatalogEntry {
        &self.entry
    }

    pub fn base_name(&self) -> &str {
        &self.paths.base_name
    }

    /// Full-graph size used to clamp navigation.
    pub fn size(&self) -> i64 {
        self.entry.max_node_id
    }

    pub fn open_reader(&self) -> Result<StoreReader, StorageError> {
        StoreReader::open(&self.paths)
    }
}

fn children_of_optional(conn: &Connection, id: NodeId) -> Result<Option<Vec<NodeId>>, StorageError> {
    let payload: Option<String> = conn
        .prepare_cached("SELECT children FROM adjacency WHERE node_id = ?1")?
        .query_row(params![id.0], |row| row.get(0))
        .optional()?;
    payload
        .map(|payload| row_mapping::deserialize_ids(&payload))
        .transpose()
}

fn children_of(conn: &Connection, id: NodeId) -> Result<Vec<NodeId>, StorageError> {
    Ok(children_of_optional(conn, id)?.unwrap_or_default())
}

fn genome_names(conn: &Connection) -> Result<Vec<String>, StorageError> {
    let mut stmt = conn.prepare("SELECT name FROM genome ORDER BY idx")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

#[cfg(test)]
mod tests;
