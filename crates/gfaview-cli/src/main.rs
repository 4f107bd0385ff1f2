use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use gfaview_core::{GenomeIndexing, NodeId};
use gfaview_events::{EventBus, EventListener};
use gfaview_graph::{LayeringEngine, WindowRequest, load_window};
use gfaview_index::{IngestOutcome, Ingestor};
use gfaview_project::{SETTINGS_FILE_NAME, ViewerSettings};
use gfaview_storage::StoreHandle;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::thread;
use tracing_subscriber::EnvFilter;

mod output;

use output::ProgressReporter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file (defaults to ./gfaview.json when present)
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    /// Directory for the per-file stores, overrides the settings file
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse GFA files into their stores
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Re-parse even when a complete store exists
        #[arg(long)]
        force: bool,

        /// How genome membership entries are read
        #[arg(long, value_enum)]
        genome_indexing: Option<IndexingArg>,
    },
    /// Build and lay out the window around a node
    Window {
        file: PathBuf,

        #[arg(long)]
        center: Option<i64>,

        #[arg(long)]
        radius: Option<u64>,

        /// Print the column list as JSON
        #[arg(long)]
        json: bool,
    },
    /// Build and lay out an explicit id range
    Range {
        file: PathBuf,

        #[arg(long)]
        low: i64,

        #[arg(long)]
        high: i64,

        #[arg(long)]
        json: bool,
    },
    /// Show what the catalog records for a file
    Info { file: PathBuf },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum IndexingArg {
    Auto,
    Names,
    Indices,
}

impl From<IndexingArg> for GenomeIndexing {
    fn from(arg: IndexingArg) -> Self {
        match arg {
            IndexingArg::Auto => GenomeIndexing::Auto,
            IndexingArg::Names => GenomeIndexing::Names,
            IndexingArg::Indices => GenomeIndexing::Indices,
        }
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut settings = load_settings(args.settings.as_deref())?;
    if let Some(store_dir) = args.store_dir {
        settings.store_dir = store_dir;
    }

    match args.command {
        Command::Ingest {
            files,
            force,
            genome_indexing,
        } => {
            if let Some(mode) = genome_indexing {
                settings.genome_indexing = mode.into();
            }
            ingest_files(&settings, &files, force)
        }
        Command::Window {
            file,
            center,
            radius,
            json,
        } => {
            let handle = open_store(&settings, &file)?;
            let request = WindowRequest::Around {
                center: center.map_or_else(|| settings.initial_center(handle.size()), NodeId),
                radius: radius.unwrap_or(settings.default_radius),
            };
            show_window(&settings, &handle, request, json)
        }
        Command::Range {
            file,
            low,
            high,
            json,
        } => {
            let handle = open_store(&settings, &file)?;
            let request = WindowRequest::Range {
                low: NodeId(low),
                high: NodeId(high),
            };
            show_window(&settings, &handle, request, json)
        }
        Command::Info { file } => show_info(&settings, &file),
    }
}

fn load_settings(path: Option<&Path>) -> Result<ViewerSettings> {
    match path {
        Some(path) => ViewerSettings::load(path),
        None => ViewerSettings::load(Path::new(SETTINGS_FILE_NAME)),
    }
}

fn ingest_files(settings: &ViewerSettings, files: &[PathBuf], force: bool) -> Result<()> {
    let mut config = settings.ingest_config();
    config.force = force;
    let ingestor = Ingestor::with_config(config);

    // Progress is printed from its own thread while files are parsed in parallel.
    let bus = EventBus::new();
    let events = bus.receiver();
    let reporter = thread::spawn(move || {
        let mut reporter = ProgressReporter;
        for event in events {
            reporter.handle_event(&event);
        }
    });

    let results: Vec<(PathBuf, Result<IngestOutcome>)> = files
        .par_iter()
        .map(|file| {
            let outcome = ingestor
                .ingest(file, Some(&bus))
                .with_context(|| format!("Failed to ingest {}", file.display()));
            (file.clone(), outcome)
        })
        .collect();

    // Dropping the bus closes the channel so the reporter thread exits.
    drop(bus);
    if reporter.join().is_err() {
        tracing::warn!("Progress reporter panicked");
    }

    let mut failed = 0usize;
    for (file, result) in &results {
        match result {
            Ok(outcome) => output::print_ingest_report(file, outcome),
            Err(err) => {
                failed += 1;
                eprintln!("{err:#}");
            }
        }
    }

    if failed > 0 {
        return Err(anyhow!("{} of {} files failed to ingest", failed, results.len()));
    }
    Ok(())
}

/// Reuse a complete store for `file`, ingesting it first when needed.
fn open_store(settings: &ViewerSettings, file: &Path) -> Result<StoreHandle> {
    let ingestor = Ingestor::with_config(settings.ingest_config());
    let outcome = ingestor
        .ingest(file, None)
        .with_context(|| format!("Failed to open {}", file.display()))?;
    Ok(outcome.handle)
}

fn show_window(
    settings: &ViewerSettings,
    handle: &StoreHandle,
    request: WindowRequest,
    json: bool,
) -> Result<()> {
    let reader = handle.open_reader()?;
    let engine = LayeringEngine::new(settings.ordering_iterations);
    let graph = load_window(&reader, request, &engine)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&graph.snapshot())?);
    } else {
        output::print_columns(&graph);
    }
    Ok(())
}

fn show_info(settings: &ViewerSettings, file: &Path) -> Result<()> {
    let Some(handle) = StoreHandle::open_existing(&settings.store_dir, file)? else {
        println!("{}: no complete store in {}", file.display(), settings.store_dir.display());
        return Ok(());
    };
    let genomes = handle.open_reader()?.genome_names()?;
    output::print_store_info(&handle, &genomes);
    Ok(())
}
