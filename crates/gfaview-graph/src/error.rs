use gfaview_core::{CyclicGraphError, NodeId, RangeError};
use gfaview_storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error(transparent)]
    Cyclic(#[from] CyclicGraphError),
    /// An adjacency list names a node the working graph does not hold.
    #[error("node {from} references node {missing}, which is not in the working graph")]
    DanglingReference { from: NodeId, missing: NodeId },
    #[error("failed to load genome membership: {0}")]
    Genomes(#[from] StorageError),
}

/// Anything that can stop a window from being built and laid out.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error("store error: {0}")]
    Store(#[from] StorageError),
    #[error("layout failed: {0}")]
    Layout(#[from] LayoutError),
}

impl BuildError {
    /// Range errors can be fixed by clamping the request; the rest cannot.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BuildError::Range(_))
    }
}
