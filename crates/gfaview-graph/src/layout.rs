use crate::error::LayoutError;
use crate::graph::{GenomeSource, WorkingGraph};
use gfaview_core::{CyclicGraphError, GenomeId, NodeId};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutStats {
    pub columns: usize,
    pub dummies: usize,
    pub ordering_sweeps: usize,
}

/// Scratch space for the ordering pass, valid for one layering run.
#[derive(Default)]
struct LayeringScratch {
    bary_accumulator: HashMap<NodeId, f64>,
    in_degree: HashMap<NodeId, u32>,
}

impl LayeringScratch {
    fn reset(&mut self) {
        self.bary_accumulator.clear();
        self.in_degree.clear();
    }

    fn accumulate(&mut self, id: NodeId, parent_position: usize) {
        *self.bary_accumulator.entry(id).or_default() += parent_position as f64;
        *self.in_degree.entry(id).or_default() += 1;
    }

    fn barycenter(&self, id: NodeId) -> Option<f64> {
        let count = *self.in_degree.get(&id)?;
        if count == 0 {
            return None;
        }
        let sum = self.bary_accumulator.get(&id).copied().unwrap_or(0.0);
        Some(sum / count as f64)
    }
}

/// Assigns columns, normalizes long edges with dummy nodes and orders each
/// column to reduce crossings.
#[derive(Debug, Clone)]
pub struct LayeringEngine {
    /// Upper bound on left-to-right ordering sweeps.
    pub max_iterations: usize,
}

impl Default for LayeringEngine {
    fn default() -> Self {
        Self {
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl LayeringEngine {
    pub const DEFAULT_MAX_ITERATIONS: usize = 4;

    pub fn new(max_iterations: usize) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
        }
    }

    /// Lay out `graph` in place.
    ///
    /// Genome membership of edge endpoints is pulled from `genomes` only for
    /// edges long enough to need dummy nodes.
    pub fn layout(
        &self,
        graph: &mut WorkingGraph,
        genomes: &dyn GenomeSource,
    ) -> Result<LayoutStats, LayoutError> {
        graph.set_laid_out(false);
        validate_references(graph)?;
        assign_columns(graph)?;
        let dummies = insert_dummies(graph, genomes)?;
        build_columns(graph);
        let ordering_sweeps = self.order_columns(graph);
        graph.set_laid_out(true);

        let stats = LayoutStats {
            columns: graph.column_count(),
            dummies,
            ordering_sweeps,
        };
        tracing::debug!(
            "Laid out {} nodes in {} columns ({} dummies, {} ordering sweeps)",
            graph.node_count(),
            stats.columns,
            stats.dummies,
            stats.ordering_sweeps
        );
        Ok(stats)
    }

    /// Reorder every column after the first by the mean position of each
    /// node's parents. Returns the number of sweeps run.
    ///
    /// Sweeps stop early once a full pass leaves every column unchanged.
    pub fn order_columns(&self, graph: &mut WorkingGraph) -> usize {
        let mut columns = std::mem::take(&mut graph.columns);
        let mut positions: HashMap<NodeId, usize> = HashMap::with_capacity(graph.node_count());
        for column in &columns {
            for (index, id) in column.iter().enumerate() {
                positions.insert(*id, index);
            }
        }

        let mut scratch = LayeringScratch::default();
        let mut sweeps = 0;
        for _ in 0..self.max_iterations.max(1) {
            sweeps += 1;
            let mut changed = false;

            for column in columns.iter_mut().skip(1) {
                scratch.reset();
                for &id in column.iter() {
                    let Some(node) = graph.node(id) else {
                        continue;
                    };
                    for parent in &node.parents {
                        if let Some(&position) = positions.get(parent) {
                            scratch.accumulate(id, position);
                        }
                    }
                }

                if order_column_by_barycenter(column, &scratch) {
                    changed = true;
                    for (index, id) in column.iter().enumerate() {
                        positions.insert(*id, index);
                    }
                }
            }

            if !changed {
                break;
            }
        }

        graph.columns = columns;
        graph.refresh_indices();
        sweeps
    }
}

/// Every neighbor named by an adjacency list must be present, in both directions.
fn validate_references(graph: &WorkingGraph) -> Result<(), LayoutError> {
    for id in graph.sorted_ids() {
        let Some(node) = graph.node(id) else {
            continue;
        };
        for child in &node.children {
            let linked = graph
                .node(*child)
                .is_some_and(|child_node| child_node.parents.contains(&id));
            if !linked {
                return Err(LayoutError::DanglingReference {
                    from: id,
                    missing: *child,
                });
            }
        }
        for parent in &node.parents {
            let linked = graph
                .node(*parent)
                .is_some_and(|parent_node| parent_node.children.contains(&id));
            if !linked {
                return Err(LayoutError::DanglingReference {
                    from: id,
                    missing: *parent,
                });
            }
        }
    }
    Ok(())
}

fn order_key(id: NodeId) -> (bool, i64) {
    (id.is_dummy(), id.0.abs())
}

/// Longest-path column assignment. Sources sit in column 0 and every other
/// node one column past its furthest parent.
///
/// Nodes are released in ascending id order among those whose parents are
/// all placed, so the result is deterministic.
pub fn assign_columns(graph: &mut WorkingGraph) -> Result<(), LayoutError> {
    let ids = graph.sorted_ids();
    let mut pending_parents: HashMap<NodeId, usize> = HashMap::with_capacity(ids.len());
    let mut ready: BTreeSet<((bool, i64), NodeId)> = BTreeSet::new();

    for &id in &ids {
        let Some(node) = graph.node_mut(id) else {
            continue;
        };
        node.column = 0;
        let degree = node.in_degree();
        pending_parents.insert(id, degree);
        if degree == 0 {
            ready.insert((order_key(id), id));
        }
    }

    let mut placed = 0usize;
    while let Some((_, id)) = ready.pop_first() {
        placed += 1;
        let Some(node) = graph.node(id) else {
            continue;
        };
        let column = node.column;
        let children = node.children.clone();

        for child in children {
            let child_node = graph
                .node_mut(child)
                .ok_or(LayoutError::DanglingReference {
                    from: id,
                    missing: child,
                })?;
            child_node.column = child_node.column.max(column + 1);

            if let Some(remaining) = pending_parents.get_mut(&child) {
                *remaining = remaining.saturating_sub(1);
                if *remaining == 0 {
                    ready.insert((order_key(child), child));
                }
            }
        }
    }

    if placed < ids.len() {
        let mut unresolved: Vec<NodeId> = pending_parents
            .into_iter()
            .filter(|(_, remaining)| *remaining > 0)
            .map(|(id, _)| id)
            .collect();
        unresolved.sort_by_key(|id| order_key(*id));
        graph.columns.clear();
        tracing::warn!("Window contains a cycle through {} nodes", unresolved.len());
        return Err(CyclicGraphError { unresolved }.into());
    }
    Ok(())
}

/// Replace every edge spanning more than one column with a chain of dummy
/// nodes, one per intermediate column. Returns the number of dummies created.
pub fn insert_dummies(
    graph: &mut WorkingGraph,
    genomes: &dyn GenomeSource,
) -> Result<usize, LayoutError> {
    let mut inserted = 0;
    for (parent, child) in graph.edges() {
        let (Some(from), Some(to)) = (graph.node(parent), graph.node(child)) else {
            return Err(LayoutError::DanglingReference {
                from: parent,
                missing: child,
            });
        };
        let (from_column, to_column) = (from.column, to.column);
        if to_column <= from_column + 1 {
            continue;
        }

        let carried = shared_genomes(graph, parent, child, genomes)?;
        let chain: Vec<NodeId> = (from_column + 1..to_column)
            .map(|column| graph.allocate_dummy(column, carried.clone()))
            .collect();
        splice_chain(graph, parent, child, &chain);
        inserted += chain.len();
    }
    Ok(inserted)
}

/// Genomes traversing `parent -> child`: those present on both endpoints.
fn shared_genomes(
    graph: &WorkingGraph,
    parent: NodeId,
    child: NodeId,
    source: &dyn GenomeSource,
) -> Result<Vec<GenomeId>, LayoutError> {
    let from = graph
        .genomes(parent, source)?
        .map(<[GenomeId]>::to_vec)
        .unwrap_or_default();
    let to = graph.genomes(child, source)?.unwrap_or(&[]);
    Ok(from.into_iter().filter(|genome| to.contains(genome)).collect())
}

fn splice_chain(graph: &mut WorkingGraph, parent: NodeId, child: NodeId, chain: &[NodeId]) {
    let (Some(&first), Some(&last)) = (chain.first(), chain.last()) else {
        return;
    };
    if let Some(node) = graph.node_mut(parent) {
        replace_id(&mut node.children, child, first);
    }
    if let Some(node) = graph.node_mut(child) {
        replace_id(&mut node.parents, parent, last);
    }

    let mut previous = parent;
    for (offset, &dummy) in chain.iter().enumerate() {
        let next = chain.get(offset + 1).copied().unwrap_or(child);
        if let Some(node) = graph.node_mut(dummy) {
            node.parents = vec![previous];
            node.children = vec![next];
        }
        previous = dummy;
    }
}

fn replace_id(ids: &mut [NodeId], from: NodeId, to: NodeId) {
    if let Some(slot) = ids.iter_mut().find(|id| **id == from) {
        *slot = to;
    }
}

fn build_columns(graph: &mut WorkingGraph) {
    let mut columns: Vec<Vec<NodeId>> = Vec::new();
    for id in graph.sorted_ids() {
        let Some(node) = graph.node(id) else {
            continue;
        };
        let column = node.column as usize;
        if columns.len() <= column {
            columns.resize_with(column + 1, Vec::new);
        }
        columns[column].push(id);
    }
    graph.columns = columns;
    graph.refresh_indices();
}

/// Stable sort by barycenter. Nodes without placed parents keep their index
/// as key. Returns whether the order changed.
fn order_column_by_barycenter(column: &mut [NodeId], scratch: &LayeringScratch) -> bool {
    let mut keyed: Vec<(f64, NodeId)> = column
        .iter()
        .enumerate()
        .map(|(index, id)| (scratch.barycenter(*id).unwrap_or(index as f64), *id))
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));

    let reordered = keyed.iter().zip(column.iter()).any(|((_, a), b)| a != b);
    if reordered {
        for (slot, (_, id)) in column.iter_mut().zip(keyed) {
            *slot = id;
        }
    }
    reordered
}
