use gfaview_core::NodeId;

/// Edge runs collected from consecutive `L` records, waiting to be written.
///
/// Links arrive in parent-major order, so children accumulate for one parent
/// until a record for another parent (or a segment) closes the run.
#[derive(Default)]
pub struct IntermediateStorage {
    current_parent: Option<NodeId>,
    current_children: Vec<NodeId>,
    pub runs: Vec<(NodeId, Vec<NodeId>)>,
}

impl IntermediateStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `parent -> child`, closing the open run if `parent` changed.
    pub fn add_edge(&mut self, parent: NodeId, child: NodeId) {
        if self.current_parent != Some(parent) {
            self.close_run();
            self.current_parent = Some(parent);
        }
        if !self.current_children.contains(&child) {
            self.current_children.push(child);
        }
    }

    /// Move the open run, if any, into `runs`.
    pub fn close_run(&mut self) {
        if let Some(parent) = self.current_parent.take() {
            let children = std::mem::take(&mut self.current_children);
            if !children.is_empty() {
                self.runs.push((parent, children));
            }
        }
    }

    pub fn pending_runs(&self) -> usize {
        self.runs.len()
    }

    pub fn take_runs(&mut self) -> Vec<(NodeId, Vec<NodeId>)> {
        std::mem::take(&mut self.runs)
    }

    pub fn is_empty(&self) -> bool {
        self.current_parent.is_none() && self.runs.is_empty()
    }
}
