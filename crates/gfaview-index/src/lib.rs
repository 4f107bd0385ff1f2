use gfaview_core::GenomeIndexing;
use gfaview_events::{Event, EventBus};
use gfaview_storage::{
    CatalogEntry, IngestTransaction, StorageError, Storage, StoreCatalog, StoreHandle, StorePaths,
};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

pub mod genome_table;
pub mod intermediate_storage;
pub mod records;

use genome_table::GenomeTable;
use intermediate_storage::IntermediateStorage;
use records::Record;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed reading {} at line {line}: {source}", .path.display())]
    Read {
        path: PathBuf,
        line: u64,
        #[source]
        source: io::Error,
    },
    #[error("malformed record at line {line}: {reason}")]
    Malformed { line: u64, reason: String },
    #[error("store error: {0}")]
    Store(#[from] StorageError),
}

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub store_dir: PathBuf,
    pub genome_indexing: GenomeIndexing,
    /// Lines between progress events.
    pub progress_interval: u64,
    /// Edge runs buffered before they are written.
    pub flush_batch_size: usize,
    /// Re-ingest even when the catalog reports the store complete.
    pub force: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("."),
            genome_indexing: GenomeIndexing::Auto,
            progress_interval: 100_000,
            flush_batch_size: 4_096,
            force: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// The store was already complete and nothing was parsed.
    pub cache_hit: bool,
    pub lines_parsed: u64,
    pub nodes: u64,
    pub edges: u64,
    pub genomes: u32,
    pub duration: Duration,
}

pub struct IngestOutcome {
    pub handle: StoreHandle,
    pub report: IngestReport,
}

pub struct Ingestor {
    config: IngestConfig,
}

impl Ingestor {
    pub fn new(store_dir: impl Into<PathBuf>) -> Self {
        Self {
            config: IngestConfig {
                store_dir: store_dir.into(),
                ..Default::default()
            },
        }
    }

    pub fn with_config(config: IngestConfig) -> Self {
        Self { config }
    }

    pub fn with_genome_indexing(mut self, mode: GenomeIndexing) -> Self {
        self.config.genome_indexing = mode;
        self
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Ingest `source` into its store, or reuse the store if it is already complete.
    pub fn ingest(
        &self,
        source: &Path,
        event_bus: Option<&EventBus>,
    ) -> Result<IngestOutcome, IngestError> {
        let paths = StorePaths::for_source(&self.config.store_dir, source)?;

        if !self.config.force {
            let catalog = StoreCatalog::load(&paths.catalog)?;
            if let Some(entry) = catalog.entry(&paths.base_name)
                && entry.complete
                && paths.files_exist()
            {
                tracing::info!("Store for {} is complete, skipping parse", paths.base_name);
                publish(
                    event_bus,
                    Event::IngestionCacheHit {
                        source: source.to_path_buf(),
                    },
                );
                let report = IngestReport {
                    cache_hit: true,
                    nodes: entry.node_count,
                    edges: entry.edge_count,
                    genomes: entry.genome_count,
                    ..Default::default()
                };
                return Ok(IngestOutcome {
                    handle: StoreHandle::new(paths, entry.clone()),
                    report,
                });
            }
        }

        publish(
            event_bus,
            Event::IngestionStarted {
                source: source.to_path_buf(),
            },
        );
        match self.run(source, paths, event_bus) {
            Ok(outcome) => {
                publish(
                    event_bus,
                    Event::IngestionComplete {
                        source: source.to_path_buf(),
                        nodes: outcome.report.nodes,
                        edges: outcome.report.edges,
                        duration_ms: outcome.report.duration.as_millis() as u64,
                    },
                );
                Ok(outcome)
            }
            Err(err) => {
                tracing::warn!("Ingestion of {} failed: {}", source.display(), err);
                publish(
                    event_bus,
                    Event::IngestionFailed {
                        source: source.to_path_buf(),
                        error: err.to_string(),
                    },
                );
                Err(err)
            }
        }
    }

    fn run(
        &self,
        source: &Path,
        paths: StorePaths,
        event_bus: Option<&EventBus>,
    ) -> Result<IngestOutcome, IngestError> {
        let started = Instant::now();
        let file = File::open(source).map_err(|source_err| IngestError::Open {
            path: source.to_path_buf(),
            source: source_err,
        })?;

        // The flag stays unset until both stores have committed.
        gfaview_storage::mark_incomplete(&paths, source)?;
        let storage = Storage::open(&paths)?;
        let tx = storage.begin_ingest()?;
        tx.clear()?;

        let mut parse = ParseState::new(&self.config);
        parse.read_all(source, BufReader::new(file), &tx, event_bus)?;
        tx.commit()?;

        let stats = storage.stats()?;
        let entry = gfaview_storage::mark_complete(
            &paths,
            CatalogEntry {
                source: source.to_path_buf(),
                complete: true,
                node_count: stats.node_count,
                max_node_id: stats.max_node_id,
                edge_count: parse.edges,
                genome_count: stats.genome_count,
                pre_indexed: parse.genomes.saw_pre_indexed_header(),
                ingested_at: None,
            },
        )?;

        let report = IngestReport {
            cache_hit: false,
            lines_parsed: parse.lines,
            nodes: stats.node_count,
            edges: parse.edges,
            genomes: stats.genome_count,
            duration: started.elapsed(),
        };
        tracing::info!(
            "Ingested {}: {} nodes, {} edges, {} genomes in {:?}",
            paths.base_name,
            report.nodes,
            report.edges,
            report.genomes,
            report.duration
        );
        Ok(IngestOutcome {
            handle: StoreHandle::new(paths, entry),
            report,
        })
    }
}

struct ParseState {
    genomes: GenomeTable,
    pending: IntermediateStorage,
    lines: u64,
    nodes: u64,
    edges: u64,
    progress_interval: u64,
    flush_batch_size: usize,
}

impl ParseState {
    fn new(config: &IngestConfig) -> Self {
        Self {
            genomes: GenomeTable::new(config.genome_indexing),
            pending: IntermediateStorage::new(),
            lines: 0,
            nodes: 0,
            edges: 0,
            progress_interval: config.progress_interval.max(1),
            flush_batch_size: config.flush_batch_size.max(1),
        }
    }

    fn read_all<R: BufRead>(
        &mut self,
        source: &Path,
        mut reader: R,
        tx: &IngestTransaction<'_>,
        event_bus: Option<&EventBus>,
    ) -> Result<(), IngestError> {
        let mut line = String::new();
        loop {
            line.clear();
            let read = reader
                .read_line(&mut line)
                .map_err(|source_err| IngestError::Read {
                    path: source.to_path_buf(),
                    line: self.lines + 1,
                    source: source_err,
                })?;
            if read == 0 {
                break;
            }
            self.lines += 1;
            self.apply_line(&line, tx)?;

            if self.lines % self.progress_interval == 0 {
                publish(
                    event_bus,
                    Event::IngestionProgress {
                        lines: self.lines,
                        nodes: self.nodes,
                        edges: self.edges,
                    },
                );
            }
        }

        self.pending.close_run();
        self.flush(tx)
    }

    fn apply_line(&mut self, line: &str, tx: &IngestTransaction<'_>) -> Result<(), IngestError> {
        let record = records::parse_line(line).map_err(|reason| IngestError::Malformed {
            line: self.lines,
            reason,
        })?;

        match record {
            Record::GenomeHeader(names) => {
                self.genomes.set_names(&names);
                tx.replace_genomes(self.genomes.names())?;
                tracing::debug!("Genome header lists {} genomes", self.genomes.len());
            }
            Record::PreIndexedHeader => self.genomes.mark_pre_indexed(),
            Record::OtherHeader | Record::Skipped => {}
            Record::Segment {
                id,
                sequence,
                genomes,
            } => {
                self.pending.close_run();
                tx.insert_sequence(id, sequence)?;
                if let Some(payload) = genomes {
                    let resolved =
                        self.genomes
                            .resolve(payload)
                            .map_err(|reason| IngestError::Malformed {
                                line: self.lines,
                                reason,
                            })?;
                    tx.insert_membership(id, &resolved)?;
                }
                self.nodes += 1;
            }
            Record::Link { parent, child } => self.pending.add_edge(parent, child),
        }

        if self.pending.pending_runs() >= self.flush_batch_size {
            self.flush(tx)?;
        }
        Ok(())
    }

    fn flush(&mut self, tx: &IngestTransaction<'_>) -> Result<(), IngestError> {
        for (parent, children) in self.pending.take_runs() {
            self.edges += tx.merge_children(parent, &children)? as u64;
        }
        Ok(())
    }
}

fn publish(event_bus: Option<&EventBus>, event: Event) {
    if let Some(bus) = event_bus {
        bus.publish(event);
    }
}
