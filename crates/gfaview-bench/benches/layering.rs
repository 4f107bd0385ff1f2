use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use gfaview_core::NodeId;
use gfaview_graph::{LayeringEngine, NoGenomes, WindowRequest, load_window};
use gfaview_index::Ingestor;

use gfaview_bench::util;

fn bench_layout_10k_nodes(c: &mut Criterion) {
    let graph = util::synthetic_working_graph(10_000);
    let engine = LayeringEngine::default();

    c.bench_function("layout_10k_nodes", |b| {
        b.iter_batched(
            || graph.clone(),
            |mut graph| {
                let stats = engine.layout(&mut graph, &NoGenomes).unwrap();
                black_box(stats);
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_load_window_radius_2000(c: &mut Criterion) {
    let (temp_dir, source) = util::write_synthetic_gfa(50_000).unwrap();
    let outcome = Ingestor::new(temp_dir.path().join("stores"))
        .ingest(&source, None)
        .unwrap();
    let reader = outcome.handle.open_reader().unwrap();
    let engine = LayeringEngine::default();
    let request = WindowRequest::Around {
        center: NodeId(25_000),
        radius: 2_000,
    };

    c.bench_function("load_window_radius_2000", |b| {
        b.iter(|| {
            let graph = load_window(&reader, black_box(request), &engine).unwrap();
            black_box(graph.column_count());
        })
    });
}

criterion_group!(benches, bench_layout_10k_nodes, bench_load_window_radius_2000);
criterion_main!(benches);
