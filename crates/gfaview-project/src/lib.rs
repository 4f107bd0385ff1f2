use anyhow::{Context, Result};
use gfaview_core::{GenomeIndexing, NodeId};
use gfaview_graph::WindowManagerConfig;
use gfaview_index::IngestConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE_NAME: &str = "gfaview.json";

/// Viewer configuration, stored as JSON. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    pub version: u32,
    /// Directory holding the per-source stores and `catalog.json`.
    pub store_dir: PathBuf,
    /// Initial window center. `None` starts at the first node.
    pub default_center: Option<NodeId>,
    pub default_radius: u64,
    pub edge_margin_columns: usize,
    pub ordering_iterations: usize,
    pub genome_indexing: GenomeIndexing,
    pub progress_interval: u64,
    pub flush_batch_size: usize,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        let ingest = IngestConfig::default();
        let window = WindowManagerConfig::default();
        Self {
            version: 1,
            store_dir: PathBuf::from("gfaview-stores"),
            default_center: None,
            default_radius: 5_000,
            edge_margin_columns: window.edge_margin_columns,
            ordering_iterations: window.ordering_iterations,
            genome_indexing: ingest.genome_indexing,
            progress_interval: ingest.progress_interval,
            flush_batch_size: ingest.flush_batch_size,
        }
    }
}

impl ViewerSettings {
    /// Read settings from `path`, or return defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings {}", path.display()))?;
        let settings: ViewerSettings = serde_json::from_str(&content)
            .with_context(|| format!("Invalid settings file {}", path.display()))?;
        Ok(settings.normalized())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Settings from `dir/gfaview.json`, with a relative `store_dir` resolved against `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        let mut settings = Self::load(&dir.join(SETTINGS_FILE_NAME))?;
        if settings.store_dir.is_relative() {
            settings.store_dir = dir.join(&settings.store_dir);
        }
        Ok(settings)
    }

    /// Replace zero counts, which would stall progress reporting or ordering.
    fn normalized(mut self) -> Self {
        if self.ordering_iterations == 0 {
            tracing::warn!("ordering_iterations must be at least 1, using 1");
            self.ordering_iterations = 1;
        }
        if self.progress_interval == 0 {
            tracing::warn!("progress_interval must be at least 1, using the default");
            self.progress_interval = IngestConfig::default().progress_interval;
        }
        if self.flush_batch_size == 0 {
            self.flush_batch_size = 1;
        }
        self
    }

    /// Window center to open on, clamped to `[1, size]`.
    pub fn initial_center(&self, size: i64) -> NodeId {
        let center = self.default_center.map_or(1, |center| center.0);
        NodeId(center.clamp(1, size.max(1)))
    }

    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig {
            store_dir: self.store_dir.clone(),
            genome_indexing: self.genome_indexing,
            progress_interval: self.progress_interval,
            flush_batch_size: self.flush_batch_size,
            force: false,
        }
    }

    pub fn window_config(&self) -> WindowManagerConfig {
        WindowManagerConfig {
            edge_margin_columns: self.edge_margin_columns,
            ordering_iterations: self.ordering_iterations,
        }
    }
}
