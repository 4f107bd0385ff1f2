use serde::{Deserialize, Serialize};
use std::fmt;

pub mod error;
pub mod node_type;

pub use error::{CyclicGraphError, RangeError};
pub use node_type::NodeKind;

/// Identifier of a graph node.
///
/// Source ids from the GFA file are positive. Dummy nodes created during
/// layering use negative ids so they can never collide with a stored node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub i64);

impl NodeId {
    pub fn is_dummy(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of a genome path, as assigned by the `ORI:Z:` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GenomeId(pub u32);

impl fmt::Display for GenomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How genome membership fields on `S` records are interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenomeIndexing {
    /// Names until a `BUILD:Z:VCF2GRAPH` header is seen, indices after it.
    #[default]
    Auto,
    /// Entries are always genome names resolved through the header table.
    Names,
    /// Entries are always numeric genome indices.
    Indices,
}

/// Inclusive range of source ids materialized in a working graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowBounds {
    pub low: NodeId,
    pub high: NodeId,
}

impl WindowBounds {
    /// Window of `radius` ids on both sides of `center`, clamped to `[1, size]`.
    pub fn around(center: NodeId, radius: u64, size: i64) -> Result<Self, RangeError> {
        if size < 1 {
            return Err(RangeError::EmptyStore);
        }
        if center.0 < 1 || center.0 > size {
            return Err(RangeError::CenterOutOfBounds {
                center: center.0,
                size,
            });
        }
        let radius = i64::try_from(radius).unwrap_or(i64::MAX);
        Ok(Self {
            low: NodeId(center.0.saturating_sub(radius).max(1)),
            high: NodeId(center.0.saturating_add(radius).min(size)),
        })
    }

    /// Explicit `[low, high]` range clamped to `[1, size]`.
    pub fn between(low: NodeId, high: NodeId, size: i64) -> Result<Self, RangeError> {
        if size < 1 {
            return Err(RangeError::EmptyStore);
        }
        if low.0 > high.0 {
            return Err(RangeError::InvertedRange {
                low: low.0,
                high: high.0,
            });
        }
        let clamped_low = low.0.max(1);
        let clamped_high = high.0.min(size);
        if clamped_low > clamped_high {
            return Err(RangeError::OutsideGraph {
                low: low.0,
                high: high.0,
                size,
            });
        }
        Ok(Self {
            low: NodeId(clamped_low),
            high: NodeId(clamped_high),
        })
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 >= self.low.0 && id.0 <= self.high.0
    }

    pub fn len(&self) -> u64 {
        (self.high.0 - self.low.0 + 1).max(0) as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn center(&self) -> NodeId {
        NodeId(self.low.0 + (self.high.0 - self.low.0) / 2)
    }
}

impl fmt::Display for WindowBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.low, self.high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_around_clamps_to_graph() {
        let bounds = WindowBounds::around(NodeId(3), 10, 5).unwrap();
        assert_eq!(bounds.low, NodeId(1));
        assert_eq!(bounds.high, NodeId(5));
        assert_eq!(bounds.len(), 5);
    }

    #[test]
    fn test_window_radius_zero_is_single_node() {
        let bounds = WindowBounds::around(NodeId(4), 0, 9).unwrap();
        assert_eq!(bounds.low, NodeId(4));
        assert_eq!(bounds.high, NodeId(4));
        assert!(bounds.contains(NodeId(4)));
        assert!(!bounds.contains(NodeId(5)));
    }

    #[test]
    fn test_window_rejects_center_outside_graph() {
        assert_eq!(
            WindowBounds::around(NodeId(0), 2, 9),
            Err(RangeError::CenterOutOfBounds { center: 0, size: 9 })
        );
        assert_eq!(
            WindowBounds::around(NodeId(10), 2, 9),
            Err(RangeError::CenterOutOfBounds {
                center: 10,
                size: 9
            })
        );
        assert_eq!(
            WindowBounds::around(NodeId(1), 2, 0),
            Err(RangeError::EmptyStore)
        );
    }

    #[test]
    fn test_window_between_validates_range() {
        let bounds = WindowBounds::between(NodeId(-4), NodeId(3), 10).unwrap();
        assert_eq!((bounds.low, bounds.high), (NodeId(1), NodeId(3)));

        assert!(matches!(
            WindowBounds::between(NodeId(5), NodeId(2), 10),
            Err(RangeError::InvertedRange { .. })
        ));
        assert!(matches!(
            WindowBounds::between(NodeId(11), NodeId(20), 10),
            Err(RangeError::OutsideGraph { .. })
        ));
    }

    #[test]
    fn test_genome_indexing_serializes_snake_case() {
        let json = serde_json::to_string(&GenomeIndexing::Indices).unwrap();
        assert_eq!(json, "\"indices\"");
        let parsed: GenomeIndexing = serde_json::from_str("\"auto\"").unwrap();
        assert_eq!(parsed, GenomeIndexing::Auto);
    }
}
