use gfaview_core::{GenomeId, NodeId, NodeKind, WindowBounds};
use gfaview_storage::{StorageError, StoreReader};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Where lazily loaded genome membership comes from.
pub trait GenomeSource {
    fn genomes_of(&self, id: NodeId) -> Result<Vec<GenomeId>, StorageError>;
}

impl GenomeSource for StoreReader {
    fn genomes_of(&self, id: NodeId) -> Result<Vec<GenomeId>, StorageError> {
        StoreReader::genomes_of(self, id)
    }
}

impl GenomeSource for HashMap<NodeId, Vec<GenomeId>> {
    fn genomes_of(&self, id: NodeId) -> Result<Vec<GenomeId>, StorageError> {
        Ok(self.get(&id).cloned().unwrap_or_default())
    }
}

/// Source for graphs without membership data.
pub struct NoGenomes;

impl GenomeSource for NoGenomes {
    fn genomes_of(&self, _id: NodeId) -> Result<Vec<GenomeId>, StorageError> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub id: NodeId,
    pub kind: NodeKind,

    // Neighbors, insertion ordered, no duplicates
    pub children: Vec<NodeId>,
    pub parents: Vec<NodeId>,

    // Layout
    pub column: u32,
    pub index_in_column: u32,
}

impl GraphNode {
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            children: Vec::new(),
            parents: Vec::new(),
            column: 0,
            index_in_column: 0,
        }
    }

    pub fn is_dummy(&self) -> bool {
        self.kind.is_dummy()
    }

    pub fn sequence_length(&self) -> u32 {
        self.kind.sequence_length()
    }

    pub fn add_child(&mut self, id: NodeId) -> bool {
        if self.children.contains(&id) {
            return false;
        }
        self.children.push(id);
        true
    }

    pub fn add_parent(&mut self, id: NodeId) -> bool {
        if self.parents.contains(&id) {
            return false;
        }
        self.parents.push(id);
        true
    }

    pub fn in_degree(&self) -> usize {
        self.parents.len()
    }
}

/// The bounded, in-memory part of the graph currently materialized.
///
/// Cloning is the copy used to build a new window while the old one is shown.
#[derive(Debug, Clone)]
pub struct WorkingGraph {
    nodes: HashMap<NodeId, GraphNode>,
    pub(crate) columns: Vec<Vec<NodeId>>,
    bounds: WindowBounds,
    center: NodeId,
    radius: u64,
    full_size: i64,
    next_dummy: i64,
    laid_out: bool,
}

impl WorkingGraph {
    pub fn new(bounds: WindowBounds, full_size: i64) -> Self {
        Self {
            nodes: HashMap::new(),
            columns: Vec::new(),
            bounds,
            center: bounds.center(),
            radius: bounds.len() / 2,
            full_size,
            next_dummy: -1,
            laid_out: false,
        }
    }

    pub fn with_center(mut self, center: NodeId, radius: u64) -> Self {
        self.center = center;
        self.radius = radius;
        self
    }

    /// Insert a node, or return the existing one with the same id.
    pub fn add_node(&mut self, id: NodeId, kind: NodeKind) -> &mut GraphNode {
        self.nodes
            .entry(id)
            .or_insert_with(|| GraphNode::new(id, kind))
    }

    /// Link `parent -> child`. Both nodes must already exist.
    pub fn add_edge(&mut self, parent: NodeId, child: NodeId) -> bool {
        if !self.nodes.contains_key(&parent) || !self.nodes.contains_key(&child) {
            return false;
        }
        let added = self
            .nodes
            .get_mut(&parent)
            .is_some_and(|node| node.add_child(child));
        if let Some(node) = self.nodes.get_mut(&child) {
            node.add_parent(parent);
        }
        added
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(&id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut GraphNode> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn dummy_count(&self) -> usize {
        self.nodes.values().filter(|node| node.is_dummy()).count()
    }

    /// Ids in a stable order: stored ids ascending, then dummies by creation.
    pub fn sorted_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        ids.sort_by_key(|id| (id.is_dummy(), id.0.abs()));
        ids
    }

    /// Every edge, parents in `sorted_ids` order, children in list order.
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        let mut edges = Vec::new();
        for id in self.sorted_ids() {
            if let Some(node) = self.nodes.get(&id) {
                edges.extend(node.children.iter().map(|child| (id, *child)));
            }
        }
        edges
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|node| node.children.len()).sum()
    }

    pub(crate) fn allocate_dummy(&mut self, column: u32, carried_genomes: Vec<GenomeId>) -> NodeId {
        let id = NodeId(self.next_dummy);
        self.next_dummy -= 1;
        let node = self.add_node(id, NodeKind::dummy(carried_genomes));
        node.column = column;
        id
    }

    /// Genome membership of `id`, loaded from `source` on first request.
    pub fn genomes(
        &self,
        id: NodeId,
        source: &dyn GenomeSource,
    ) -> Result<Option<&[GenomeId]>, StorageError> {
        let Some(node) = self.nodes.get(&id) else {
            return Ok(None);
        };
        match &node.kind {
            NodeKind::Real { genomes, .. } => {
                if let Some(loaded) = genomes.get() {
                    return Ok(Some(loaded));
                }
                let loaded = source.genomes_of(id)?;
                Ok(Some(genomes.get_or_init(|| loaded)))
            }
            NodeKind::Dummy { carried_genomes } => Ok(Some(carried_genomes)),
        }
    }

    pub fn columns(&self) -> &[Vec<NodeId>] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Number of nodes stacked in `column`, zero past the last column.
    pub fn column_width(&self, column: usize) -> usize {
        self.columns.get(column).map_or(0, Vec::len)
    }

    pub(crate) fn refresh_indices(&mut self) {
        for column in &self.columns {
            for (index, id) in column.iter().enumerate() {
                if let Some(node) = self.nodes.get_mut(id) {
                    node.index_in_column = index as u32;
                }
            }
        }
    }

    pub fn bounds(&self) -> WindowBounds {
        self.bounds
    }

    pub fn center(&self) -> NodeId {
        self.center
    }

    pub fn radius(&self) -> u64 {
        self.radius
    }

    /// Highest id in the whole store, used to clamp navigation.
    pub fn full_size(&self) -> i64 {
        self.full_size
    }

    pub fn is_laid_out(&self) -> bool {
        self.laid_out
    }

    pub(crate) fn set_laid_out(&mut self, laid_out: bool) {
        self.laid_out = laid_out;
    }

    /// Serializable view of the column list for external renderers.
    pub fn snapshot(&self) -> GraphSnapshot {
        let columns = self
            .columns
            .iter()
            .map(|column| {
                column
                    .iter()
                    .filter_map(|id| self.nodes.get(id))
                    .map(|node| SnapshotNode {
                        id: node.id,
                        dummy: node.is_dummy(),
                        sequence_length: node.sequence_length(),
                        children: node.children.clone(),
                        genomes: node.kind.known_genomes().map(<[GenomeId]>::to_vec),
                    })
                    .collect()
            })
            .collect();
        GraphSnapshot {
            bounds: self.bounds,
            full_size: self.full_size,
            columns,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub id: NodeId,
    pub dummy: bool,
    pub sequence_length: u32,
    pub children: Vec<NodeId>,
    /// Present only when membership was already loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genomes: Option<Vec<GenomeId>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub bounds: WindowBounds,
    pub full_size: i64,
    pub columns: Vec<Vec<SnapshotNode>>,
}
