use crate::NodeId;
use thiserror::Error;

/// A window request that does not fit the stored graph.
///
/// Recoverable: the caller can clamp the request and retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("center node {center} is outside the graph bounds [1, {size}]")]
    CenterOutOfBounds { center: i64, size: i64 },
    #[error("range [{low}, {high}] is inverted")]
    InvertedRange { low: i64, high: i64 },
    #[error("range [{low}, {high}] lies outside the graph bounds [1, {size}]")]
    OutsideGraph { low: i64, high: i64, size: i64 },
    #[error("the store contains no nodes")]
    EmptyStore,
}

/// The forward-edge assumption was violated: some nodes sit on a cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "graph contains a cycle: {} node(s) could not be ordered (first: {})",
    .unresolved.len(),
    first_unresolved(.unresolved)
)]
pub struct CyclicGraphError {
    /// Nodes left without a topological position, ascending.
    pub unresolved: Vec<NodeId>,
}

fn first_unresolved(unresolved: &[NodeId]) -> i64 {
    unresolved.first().map(|id| id.0).unwrap_or_default()
}
