pub mod error;
pub mod graph;
pub mod layout;
pub mod window;
pub mod window_manager;

pub use error::{BuildError, LayoutError};
pub use graph::{GenomeSource, GraphNode, GraphSnapshot, NoGenomes, SnapshotNode, WorkingGraph};
pub use layout::{LayeringEngine, LayoutStats, assign_columns, insert_dummies};
pub use window::{WindowRequest, build_range, build_window, load_window};
pub use window_manager::{WindowListener, WindowManager, WindowManagerConfig};
