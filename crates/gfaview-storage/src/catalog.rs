use super::*;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};

/// Serializes catalog read-modify-write cycles within the process.
static CATALOG_LOCK: Mutex<()> = Mutex::new(());
static STAGING_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Per-source record kept in `catalog.json` next to the store files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub source: PathBuf,
    pub complete: bool,
    pub node_count: u64,
    pub max_node_id: i64,
    pub edge_count: u64,
    pub genome_count: u32,
    pub pre_indexed: bool,
    pub ingested_at: Option<DateTime<Utc>>,
}

/// Side file recording which base names finished ingestion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreCatalog {
    #[serde(default)]
    entries: BTreeMap<String, CatalogEntry>,
}

impl StoreCatalog {
    /// Missing file means an empty catalog.
    pub fn load(path: &Path) -> Result<Self, StorageError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        let staging = staging_path(path);
        fs::write(&staging, content)?;
        if let Err(err) = fs::rename(&staging, path) {
            let _ = fs::remove_file(&staging);
            return Err(err.into());
        }
        Ok(())
    }

    pub fn entry(&self, base_name: &str) -> Option<&CatalogEntry> {
        self.entries.get(base_name)
    }

    pub fn is_complete(&self, base_name: &str) -> bool {
        self.entry(base_name).is_some_and(|entry| entry.complete)
    }

    pub fn set(&mut self, base_name: &str, entry: CatalogEntry) {
        self.entries.insert(base_name.to_string(), entry);
    }
}

/// Each writer stages into its own file so concurrent saves never share one.
fn staging_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "catalog.json".to_string());
    let sequence = STAGING_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(
        "{file_name}.{}.{sequence}.tmp",
        std::process::id()
    ))
}

fn update_entry(paths: &StorePaths, entry: CatalogEntry) -> Result<(), StorageError> {
    let _guard = CATALOG_LOCK.lock();
    let mut catalog = StoreCatalog::load(&paths.catalog)?;
    catalog.set(&paths.base_name, entry);
    catalog.save(&paths.catalog)
}

/// Flag `base_name` as in progress before any store write happens.
pub fn mark_incomplete(paths: &StorePaths, source: &Path) -> Result<(), StorageError> {
    update_entry(
        paths,
        CatalogEntry {
            source: source.to_path_buf(),
            complete: false,
            ..Default::default()
        },
    )
}

/// Flip `base_name` to complete. Returns the entry as written.
pub fn mark_complete(paths: &StorePaths, entry: CatalogEntry) -> Result<CatalogEntry, StorageError> {
    let entry = CatalogEntry {
        complete: true,
        ingested_at: entry.ingested_at.or_else(|| Some(Utc::now())),
        ..entry
    };
    update_entry(paths, entry.clone())?;
    Ok(entry)
}
