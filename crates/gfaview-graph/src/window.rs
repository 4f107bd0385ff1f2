use crate::error::BuildError;
use crate::graph::WorkingGraph;
use crate::layout::LayeringEngine;
use gfaview_core::{NodeId, NodeKind, WindowBounds};
use gfaview_storage::StoreReader;

/// Materialize the nodes within `radius` ids of `center`.
///
/// The window is clamped to `[1, store_size]`. Edges leaving the window are
/// dropped so the result is self-contained.
pub fn build_window(
    reader: &StoreReader,
    center: NodeId,
    radius: u64,
) -> Result<WorkingGraph, BuildError> {
    let size = reader.store_size()?;
    let bounds = WindowBounds::around(center, radius, size)?;
    let graph = WorkingGraph::new(bounds, size).with_center(center, radius);
    populate(reader, graph)
}

/// Materialize every stored node with an id in `[low, high]`.
pub fn build_range(
    reader: &StoreReader,
    low: NodeId,
    high: NodeId,
) -> Result<WorkingGraph, BuildError> {
    let size = reader.store_size()?;
    let bounds = WindowBounds::between(low, high, size)?;
    populate(reader, WorkingGraph::new(bounds, size))
}

/// Which part of the store a window covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowRequest {
    Around { center: NodeId, radius: u64 },
    Range { low: NodeId, high: NodeId },
}

impl WindowRequest {
    pub fn center(&self) -> Option<NodeId> {
        match self {
            WindowRequest::Around { center, .. } => Some(*center),
            WindowRequest::Range { .. } => None,
        }
    }
}

/// Build the window for `request` and lay it out.
pub fn load_window(
    reader: &StoreReader,
    request: WindowRequest,
    engine: &LayeringEngine,
) -> Result<WorkingGraph, BuildError> {
    let mut graph = match request {
        WindowRequest::Around { center, radius } => build_window(reader, center, radius)?,
        WindowRequest::Range { low, high } => build_range(reader, low, high)?,
    };
    engine.layout(&mut graph, reader)?;
    Ok(graph)
}

fn populate(reader: &StoreReader, mut graph: WorkingGraph) -> Result<WorkingGraph, BuildError> {
    let bounds = graph.bounds();

    for (id, length) in reader.sequence_lengths_between(bounds.low, bounds.high)? {
        graph.add_node(id, NodeKind::real(length));
    }

    let mut dropped = 0usize;
    for (parent, children) in reader.children_between(bounds.low, bounds.high)? {
        if !graph.contains(parent) {
            dropped += children.len();
            continue;
        }
        for child in children {
            if graph.contains(child) {
                graph.add_edge(parent, child);
            } else {
                dropped += 1;
            }
        }
    }

    tracing::debug!(
        "Built window {}: {} nodes, {} edges, {} boundary edges dropped",
        bounds,
        graph.node_count(),
        graph.edge_count(),
        dropped
    );
    Ok(graph)
}
