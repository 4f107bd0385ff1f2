use gfaview_core::{GenomeId, NodeId, RangeError};
use gfaview_events::{Event, EventBus};
use gfaview_graph::{
    BuildError, LayeringEngine, WindowListener, WindowManager, WindowManagerConfig,
    WindowRequest, WorkingGraph, build_range, build_window, load_window,
};
use gfaview_index::Ingestor;
use gfaview_storage::StoreHandle;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const WAIT: Duration = Duration::from_secs(10);

/// Linear chain with a skip edge out of every fifth node. Odd nodes belong to
/// both genomes, even nodes only to the first.
fn chain_gfa(count: i64) -> String {
    let mut gfa = String::from("H\tVN:Z:1.0\nH\tORI:Z:a;b\n");
    for id in 1..=count {
        let genomes = if id % 2 == 1 { "a;b" } else { "a" };
        gfa.push_str(&format!("S\t{id}\tACGT\tORI:Z:{genomes}\n"));
    }
    for id in 1..count {
        gfa.push_str(&format!("L\t{id}\t+\t{}\t+\t0M\n", id + 1));
        if id % 5 == 0 && id + 2 <= count {
            gfa.push_str(&format!("L\t{id}\t+\t{}\t+\t0M\n", id + 2));
        }
    }
    gfa
}

fn ingest_chain(count: i64) -> anyhow::Result<(TempDir, StoreHandle)> {
    let dir = tempfile::tempdir()?;
    let source = dir.path().join("chain.gfa");
    std::fs::write(&source, chain_gfa(count))?;
    let outcome = Ingestor::new(dir.path().join("stores")).ingest(&source, None)?;
    Ok((dir, outcome.handle))
}

#[derive(Default)]
struct Recorder {
    ready: Vec<Arc<WorkingGraph>>,
    failed: Vec<(WindowRequest, bool)>,
}

impl WindowListener for Recorder {
    fn on_window_ready(&mut self, graph: Arc<WorkingGraph>) {
        self.ready.push(graph);
    }

    fn on_window_failed(&mut self, request: WindowRequest, error: &BuildError) {
        self.failed.push((request, error.is_recoverable()));
    }
}

fn manager(handle: &StoreHandle, edge_margin_columns: usize) -> WindowManager {
    WindowManager::new(
        handle.clone(),
        WindowManagerConfig {
            edge_margin_columns,
            ..Default::default()
        },
    )
}

#[test]
fn test_window_is_clamped_and_drops_boundary_edges() -> anyhow::Result<()> {
    let (_dir, handle) = ingest_chain(50)?;
    let reader = handle.open_reader()?;

    let graph = build_window(&reader, NodeId(2), 5)?;
    assert_eq!(graph.bounds().low, NodeId(1));
    assert_eq!(graph.bounds().high, NodeId(7));
    assert_eq!(graph.node_count(), 7);
    assert_eq!(graph.full_size(), 50);
    assert_eq!(graph.center(), NodeId(2));
    assert!(graph.node(NodeId(7)).unwrap().children.is_empty());
    assert_eq!(graph.node(NodeId(5)).unwrap().children, vec![NodeId(6), NodeId(7)]);
    assert!(!graph.is_laid_out());
    assert!(graph.nodes().all(|node| graph.bounds().contains(node.id)));
    Ok(())
}

#[test]
fn test_small_window_keeps_only_inner_edges() -> anyhow::Result<()> {
    let (_dir, handle) = ingest_chain(5)?;
    let reader = handle.open_reader()?;

    let graph = build_window(&reader, NodeId(3), 1)?;
    assert_eq!(graph.sorted_ids(), vec![NodeId(2), NodeId(3), NodeId(4)]);
    assert_eq!(graph.node(NodeId(2)).unwrap().children, vec![NodeId(3)]);
    assert!(graph.node(NodeId(2)).unwrap().parents.is_empty());
    assert!(graph.node(NodeId(4)).unwrap().children.is_empty());

    let single = build_window(&reader, NodeId(3), 0)?;
    assert_eq!(single.sorted_ids(), vec![NodeId(3)]);
    Ok(())
}

#[test]
fn test_invalid_ranges_are_reported() -> anyhow::Result<()> {
    let (_dir, handle) = ingest_chain(20)?;
    let reader = handle.open_reader()?;

    assert!(matches!(
        build_range(&reader, NodeId(10), NodeId(5)),
        Err(BuildError::Range(RangeError::InvertedRange { .. }))
    ));
    assert!(matches!(
        build_range(&reader, NodeId(60), NodeId(70)),
        Err(BuildError::Range(RangeError::OutsideGraph { .. }))
    ));
    assert!(matches!(
        build_window(&reader, NodeId(0), 3),
        Err(BuildError::Range(RangeError::CenterOutOfBounds { .. }))
    ));

    let clamped = build_range(&reader, NodeId(15), NodeId(90))?;
    assert_eq!(clamped.node_count(), 6);
    Ok(())
}

#[test]
fn test_loaded_window_is_laid_out_with_genome_aware_dummies() -> anyhow::Result<()> {
    let (_dir, handle) = ingest_chain(50)?;
    let reader = handle.open_reader()?;

    let graph = load_window(
        &reader,
        WindowRequest::Range {
            low: NodeId(1),
            high: NodeId(7),
        },
        &LayeringEngine::default(),
    )?;

    assert!(graph.is_laid_out());
    assert_eq!(graph.column_count(), 7);
    assert_eq!(graph.dummy_count(), 1);

    let dummy = graph.node(NodeId(-1)).unwrap();
    assert_eq!(dummy.column, 5);
    assert_eq!(
        dummy.kind.known_genomes(),
        Some(&[GenomeId(0), GenomeId(1)][..])
    );
    assert_eq!(
        graph.genomes(NodeId(2), &reader)?,
        Some(&[GenomeId(0)][..])
    );

    let snapshot = serde_json::to_value(graph.snapshot())?;
    assert_eq!(snapshot["columns"].as_array().map(Vec::len), Some(7));
    Ok(())
}

#[test]
fn test_manager_delivers_requested_window() -> anyhow::Result<()> {
    let (_dir, handle) = ingest_chain(50)?;
    let bus = EventBus::new();
    let mut manager = manager(&handle, 2).with_event_bus(bus.clone());
    let mut recorder = Recorder::default();

    assert!(manager.current().is_none());
    let generation = manager.request_window(NodeId(10), 5);
    assert!(manager.is_rebuilding());
    assert!(manager.wait(&mut recorder, WAIT));

    assert_eq!(recorder.ready.len(), 1);
    let current = manager.current().expect("window on display");
    assert!(Arc::ptr_eq(&current, &recorder.ready[0]));
    assert_eq!(current.column_count(), 11);

    let events: Vec<Event> = bus.receiver().try_iter().collect();
    assert!(matches!(
        events.first(),
        Some(Event::WindowRequested { generation: g, center: Some(NodeId(10)) }) if *g == generation
    ));
    assert!(matches!(
        events.last(),
        Some(Event::WindowReady { columns: 11, .. })
    ));
    Ok(())
}

#[test]
fn test_poll_delivers_without_blocking() -> anyhow::Result<()> {
    let (_dir, handle) = ingest_chain(30)?;
    let mut manager = manager(&handle, 2);
    let mut recorder = Recorder::default();

    manager.request_range(NodeId(1), NodeId(10));
    let deadline = std::time::Instant::now() + WAIT;
    let mut applied = 0;
    while applied == 0 && std::time::Instant::now() < deadline {
        applied = manager.poll(&mut recorder);
        std::thread::sleep(Duration::from_millis(5));
    }

    assert_eq!(applied, 1);
    assert_eq!(recorder.ready.len(), 1);
    assert_eq!(recorder.ready[0].bounds().high, NodeId(10));
    assert_eq!(manager.poll(&mut recorder), 0);
    Ok(())
}

#[test]
fn test_only_latest_request_is_displayed() -> anyhow::Result<()> {
    let (_dir, handle) = ingest_chain(50)?;
    let mut manager = manager(&handle, 2);
    let mut recorder = Recorder::default();

    manager.request_window(NodeId(10), 5);
    manager.request_window(NodeId(20), 5);
    let latest = manager.request_window(NodeId(30), 5);
    assert_eq!(manager.latest_generation(), latest);
    assert!(manager.wait(&mut recorder, WAIT));

    assert_eq!(recorder.ready.len(), 1);
    assert_eq!(recorder.ready[0].center(), NodeId(30));
    assert!(!manager.is_rebuilding());
    Ok(())
}

#[test]
fn test_failed_build_keeps_previous_window() -> anyhow::Result<()> {
    let (_dir, handle) = ingest_chain(50)?;
    let mut manager = manager(&handle, 2);
    let mut recorder = Recorder::default();

    manager.request_window(NodeId(10), 5);
    assert!(manager.wait(&mut recorder, WAIT));
    let before = manager.current().expect("first window");

    manager.request_window(NodeId(500), 5);
    assert!(manager.wait(&mut recorder, WAIT));

    assert_eq!(recorder.failed.len(), 1);
    let (request, recoverable) = recorder.failed[0];
    assert_eq!(request.center(), Some(NodeId(500)));
    assert!(recoverable);
    let after = manager.current().expect("window still on display");
    assert!(Arc::ptr_eq(&before, &after));
    Ok(())
}

#[test]
fn test_viewport_near_edges_shifts_window() -> anyhow::Result<()> {
    let (_dir, handle) = ingest_chain(50)?;
    let mut manager = manager(&handle, 2);
    let mut recorder = Recorder::default();

    manager.request_window(NodeId(10), 5);
    assert!(manager.wait(&mut recorder, WAIT));

    // Comfortably inside the 11 columns of [5, 15].
    assert_eq!(manager.update_viewport(4, 6), None);

    assert!(manager.update_viewport(0, 10).is_some());
    // A second shift is not started while the first is outstanding.
    assert_eq!(manager.update_viewport(0, 10), None);
    assert!(manager.wait(&mut recorder, WAIT));
    let shifted = manager.current().expect("shifted window");
    assert_eq!(shifted.center(), NodeId(15));
    assert_eq!(shifted.bounds().low, NodeId(10));
    assert_eq!(shifted.bounds().high, NodeId(20));

    assert!(manager.update_viewport(1, 5).is_some());
    assert!(manager.wait(&mut recorder, WAIT));
    assert_eq!(manager.current().unwrap().center(), NodeId(10));
    Ok(())
}

#[test]
fn test_window_covering_whole_graph_never_shifts() -> anyhow::Result<()> {
    let (_dir, handle) = ingest_chain(8)?;
    let mut manager = manager(&handle, 100);
    let mut recorder = Recorder::default();

    manager.request_window(NodeId(4), 20);
    assert!(manager.wait(&mut recorder, WAIT));
    assert_eq!(manager.update_viewport(0, 7), None);
    Ok(())
}

#[test]
fn test_viewport_reported_during_failed_rebuild_is_rechecked() -> anyhow::Result<()> {
    let (_dir, handle) = ingest_chain(50)?;
    let mut manager = manager(&handle, 2);
    let mut recorder = Recorder::default();

    manager.request_window(NodeId(10), 5);
    assert!(manager.wait(&mut recorder, WAIT));
    let before = manager.current().expect("first window");

    manager.request_window(NodeId(500), 5);
    // Still measured against [5, 15], which stays on display when the build fails.
    assert_eq!(manager.update_viewport(0, 10), None);
    let failing = manager.latest_generation();
    assert!(manager.wait(&mut recorder, WAIT));

    assert_eq!(recorder.failed.len(), 1);
    assert!(manager.latest_generation() > failing);
    assert!(manager.wait(&mut recorder, WAIT));
    let shifted = manager.current().expect("shifted window");
    assert!(!Arc::ptr_eq(&before, &shifted));
    assert_eq!(shifted.center(), NodeId(15));
    Ok(())
}

#[test]
fn test_viewport_from_replaced_window_is_dropped() -> anyhow::Result<()> {
    let (_dir, handle) = ingest_chain(50)?;
    let mut manager = manager(&handle, 2);
    let mut recorder = Recorder::default();

    manager.request_window(NodeId(10), 5);
    assert!(manager.wait(&mut recorder, WAIT));

    manager.request_window(NodeId(30), 5);
    assert_eq!(manager.update_viewport(0, 10), None);
    let latest = manager.latest_generation();
    assert!(manager.wait(&mut recorder, WAIT));

    assert_eq!(manager.latest_generation(), latest);
    assert!(!manager.is_rebuilding());
    assert_eq!(manager.current().expect("window").center(), NodeId(30));
    Ok(())
}
