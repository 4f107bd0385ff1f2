use gfaview_core::{GenomeId, NodeId, NodeKind, WindowBounds};
use gfaview_graph::WorkingGraph;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const GENOMES: [&str; 4] = ["ref", "hap1", "hap2", "hap3"];

/// Edges out of `id`: the backbone, a bubble every third node and a long
/// skip every seventh.
fn successors(id: i64, node_count: i64) -> impl Iterator<Item = i64> {
    let mut targets = vec![id + 1];
    if id % 3 == 0 {
        targets.push(id + 2);
    }
    if id % 7 == 0 {
        targets.push(id + 5);
    }
    targets.into_iter().filter(move |target| *target <= node_count)
}

fn member_genomes(id: i64) -> Vec<usize> {
    (0..GENOMES.len())
        .filter(|genome| *genome == 0 || (id + *genome as i64) % 3 != 0)
        .collect()
}

/// A GFA with `node_count` segments spread over four genomes.
pub fn generate_synthetic_gfa(node_count: i64) -> String {
    let mut gfa = String::new();
    let _ = writeln!(gfa, "H\tVN:Z:1.0");
    let _ = writeln!(gfa, "H\tORI:Z:{}", GENOMES.join(";"));

    for id in 1..=node_count {
        let names: Vec<&str> = member_genomes(id)
            .into_iter()
            .map(|genome| GENOMES[genome])
            .collect();
        let sequence = "ACGT".repeat((id % 5 + 1) as usize);
        let _ = writeln!(gfa, "S\t{id}\t{sequence}\tORI:Z:{}", names.join(";"));
    }
    for id in 1..=node_count {
        for target in successors(id, node_count) {
            let _ = writeln!(gfa, "L\t{id}\t+\t{target}\t+\t0M");
        }
    }
    gfa
}

pub fn write_synthetic_gfa(node_count: i64) -> anyhow::Result<(TempDir, PathBuf)> {
    let temp_dir = tempfile::tempdir()?;
    let path = temp_dir.path().join(format!("synthetic_{node_count}.gfa"));
    fs::write(&path, generate_synthetic_gfa(node_count))?;
    Ok((temp_dir, path))
}

/// The same topology as [`generate_synthetic_gfa`], built directly in memory
/// with membership already loaded.
pub fn synthetic_working_graph(node_count: i64) -> WorkingGraph {
    let bounds = WindowBounds {
        low: NodeId(1),
        high: NodeId(node_count),
    };
    let mut graph = WorkingGraph::new(bounds, node_count);
    for id in 1..=node_count {
        let genomes = member_genomes(id)
            .into_iter()
            .map(|genome| GenomeId(genome as u32))
            .collect();
        graph.add_node(
            NodeId(id),
            NodeKind::real_with_genomes((id % 5 + 1) as u32 * 4, genomes),
        );
    }
    for id in 1..=node_count {
        for target in successors(id, node_count) {
            graph.add_edge(NodeId(id), NodeId(target));
        }
    }
    graph
}
