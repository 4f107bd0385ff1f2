use gfaview_events::{Event, EventListener};
use gfaview_graph::WorkingGraph;
use gfaview_index::IngestOutcome;
use gfaview_storage::StoreHandle;
use std::path::Path;

/// Prints ingestion progress as it arrives.
pub struct ProgressReporter;

impl EventListener for ProgressReporter {
    fn handle_event(&mut self, event: &Event) {
        match event {
            Event::IngestionStarted { source } => {
                eprintln!("Parsing {}", source.display());
            }
            Event::IngestionProgress {
                lines,
                nodes,
                edges,
            } => {
                eprintln!("  {lines} lines, {nodes} nodes, {edges} edges");
            }
            Event::IngestionCacheHit { source } => {
                eprintln!("{} already ingested", source.display());
            }
            Event::IngestionFailed { source, error } => {
                eprintln!("{} failed: {}", source.display(), error);
            }
            _ => {}
        }
    }
}

pub fn print_ingest_report(file: &Path, outcome: &IngestOutcome) {
    let report = &outcome.report;
    let origin = if report.cache_hit { " (cached)" } else { "" };
    println!(
        "{}: {} nodes, {} edges, {} genomes in {:?}{}",
        file.display(),
        report.nodes,
        report.edges,
        report.genomes,
        report.duration,
        origin
    );
    println!("  store: {}", outcome.handle.paths().sequence_db.display());
}

/// One line per column; dummy nodes are shown as `~id`.
pub fn print_columns(graph: &WorkingGraph) {
    println!(
        "Window {} of {}: {} nodes ({} dummies) in {} columns",
        graph.bounds(),
        graph.full_size(),
        graph.node_count(),
        graph.dummy_count(),
        graph.column_count()
    );
    for (index, column) in graph.columns().iter().enumerate() {
        let labels: Vec<String> = column
            .iter()
            .map(|id| {
                if id.is_dummy() {
                    format!("~{}", id.0.abs())
                } else {
                    id.to_string()
                }
            })
            .collect();
        println!("{index:>6}: {}", labels.join(" "));
    }
}

pub fn print_store_info(handle: &StoreHandle, genomes: &[String]) {
    let entry = handle.entry();
    println!("{}", entry.source.display());
    println!("  store:       {}", handle.base_name());
    println!("  nodes:       {}", entry.node_count);
    println!("  max node id: {}", entry.max_node_id);
    println!("  edges:       {}", entry.edge_count);
    println!("  pre-indexed: {}", entry.pre_indexed);
    if let Some(ingested_at) = entry.ingested_at {
        println!("  ingested:    {}", ingested_at.to_rfc3339());
    }
    println!("  genomes:     {}", genomes.len());
    for (index, name) in genomes.iter().enumerate() {
        println!("    {index:>4} {name}");
    }
}
