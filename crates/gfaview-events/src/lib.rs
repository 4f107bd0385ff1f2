use crossbeam_channel::{unbounded, Receiver, Sender};
use gfaview_core::{NodeId, WindowBounds};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // ========================================================================
    // Ingestion Events
    // ========================================================================
    IngestionStarted {
        source: PathBuf,
    },
    IngestionProgress {
        lines: u64,
        nodes: u64,
        edges: u64,
    },
    /// The store was already complete; nothing was parsed.
    IngestionCacheHit {
        source: PathBuf,
    },
    IngestionComplete {
        source: PathBuf,
        nodes: u64,
        edges: u64,
        duration_ms: u64,
    },
    IngestionFailed {
        source: PathBuf,
        error: String,
    },

    // ========================================================================
    // Window Events
    // ========================================================================
    /// A rebuild was handed to the background worker.
    WindowRequested {
        generation: u64,
        center: Option<NodeId>,
    },
    WindowReady {
        generation: u64,
        bounds: WindowBounds,
        columns: usize,
    },
    WindowFailed {
        generation: u64,
        error: String,
    },
    /// A finished build was dropped because a newer request superseded it.
    WindowDiscarded {
        generation: u64,
    },
}

#[derive(Clone)]
pub struct EventBus {
    tx: Sender<Event>,
    rx: Receiver<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<Event> {
        self.tx.clone()
    }

    pub fn receiver(&self) -> Receiver<Event> {
        self.rx.clone()
    }

    pub fn publish(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    /// Dispatch all pending events to a listener.
    /// This is useful for processing events in the UI loop.
    pub fn dispatch_to<L: EventListener>(&self, listener: &mut L) {
        while let Ok(event) = self.rx.try_recv() {
            listener.handle_event(&event);
        }
    }
}

/// Trait for components that respond to events.
/// Implement this to receive events from the EventBus.
pub trait EventListener {
    fn handle_event(&mut self, event: &Event);
}
