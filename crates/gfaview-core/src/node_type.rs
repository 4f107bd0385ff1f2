use crate::GenomeId;
use std::sync::OnceLock;

/// What a working-graph node stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// A node backed by an `S` record in the store.
    ///
    /// Genome membership is filled on first request so wide windows do not
    /// load it for every node.
    Real {
        sequence_length: u32,
        genomes: OnceLock<Vec<GenomeId>>,
    },
    /// Placeholder splitting an edge that spans more than one column.
    Dummy { carried_genomes: Vec<GenomeId> },
}

impl NodeKind {
    pub fn real(sequence_length: u32) -> Self {
        NodeKind::Real {
            sequence_length,
            genomes: OnceLock::new(),
        }
    }

    pub fn real_with_genomes(sequence_length: u32, genomes: Vec<GenomeId>) -> Self {
        NodeKind::Real {
            sequence_length,
            genomes: OnceLock::from(genomes),
        }
    }

    pub fn dummy(carried_genomes: Vec<GenomeId>) -> Self {
        NodeKind::Dummy { carried_genomes }
    }

    pub fn is_dummy(&self) -> bool {
        matches!(self, NodeKind::Dummy { .. })
    }

    /// Sequence length, zero for dummies.
    pub fn sequence_length(&self) -> u32 {
        match self {
            NodeKind::Real {
                sequence_length, ..
            } => *sequence_length,
            NodeKind::Dummy { .. } => 0,
        }
    }

    /// Genome set if already known without touching the store.
    pub fn known_genomes(&self) -> Option<&[GenomeId]> {
        match self {
            NodeKind::Real { genomes, .. } => genomes.get().map(Vec::as_slice),
            NodeKind::Dummy { carried_genomes } => Some(carried_genomes),
        }
    }
}
