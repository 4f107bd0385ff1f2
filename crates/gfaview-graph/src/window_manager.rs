use crate::error::BuildError;
use crate::graph::WorkingGraph;
use crate::layout::LayeringEngine;
use crate::window::{WindowRequest, load_window};
use crossbeam_channel::{Receiver, Sender, unbounded};
use gfaview_core::NodeId;
use gfaview_events::{Event, EventBus};
use gfaview_storage::{StoreHandle, StoreReader};
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Receives finished rebuilds on the thread that calls [`WindowManager::poll`].
pub trait WindowListener {
    fn on_window_ready(&mut self, graph: Arc<WorkingGraph>);
    fn on_window_failed(&mut self, request: WindowRequest, error: &BuildError);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowManagerConfig {
    /// Columns from either edge of the window that trigger a shift.
    pub edge_margin_columns: usize,
    pub ordering_iterations: usize,
}

impl Default for WindowManagerConfig {
    fn default() -> Self {
        Self {
            edge_margin_columns: 100,
            ordering_iterations: LayeringEngine::DEFAULT_MAX_ITERATIONS,
        }
    }
}

struct BuildTask {
    generation: u64,
    request: WindowRequest,
}

/// Viewport reported while a rebuild was outstanding, in the columns of
/// `window`.
struct DeferredViewport {
    first_visible: usize,
    last_visible: usize,
    window: Arc<WorkingGraph>,
}

struct BuildResult {
    generation: u64,
    request: WindowRequest,
    outcome: Result<WorkingGraph, BuildError>,
}

/// Owns the displayed window and rebuilds it off the caller's thread.
///
/// Requests are numbered. The worker skips straight to the newest queued
/// request, and results older than the newest submission are discarded, so
/// the displayed graph only ever moves forward.
pub struct WindowManager {
    config: WindowManagerConfig,
    tasks: Option<Sender<BuildTask>>,
    results: Receiver<BuildResult>,
    worker: Option<JoinHandle<()>>,
    building: Arc<AtomicBool>,
    displayed: RwLock<Option<Arc<WorkingGraph>>>,
    submitted: u64,
    settled: u64,
    deferred_viewport: Option<DeferredViewport>,
    event_bus: Option<EventBus>,
}

impl WindowManager {
    pub fn new(store: StoreHandle, config: WindowManagerConfig) -> Self {
        let (task_tx, task_rx) = unbounded::<BuildTask>();
        let (result_tx, result_rx) = unbounded::<BuildResult>();
        let building = Arc::new(AtomicBool::new(false));
        let engine = LayeringEngine::new(config.ordering_iterations);

        let worker = spawn_worker(store, engine, task_rx, result_tx, Arc::clone(&building));

        Self {
            config,
            tasks: Some(task_tx),
            results: result_rx,
            worker: Some(worker),
            building,
            displayed: RwLock::new(None),
            submitted: 0,
            settled: 0,
            deferred_viewport: None,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn config(&self) -> &WindowManagerConfig {
        &self.config
    }

    /// Queue a rebuild and return its generation.
    pub fn request(&mut self, request: WindowRequest) -> u64 {
        self.submitted += 1;
        let generation = self.submitted;
        self.publish(Event::WindowRequested {
            generation,
            center: request.center(),
        });

        let sent = self
            .tasks
            .as_ref()
            .is_some_and(|tasks| tasks.send(BuildTask { generation, request }).is_ok());
        if !sent {
            tracing::warn!("Window worker is gone, request {} dropped", generation);
        }
        generation
    }

    pub fn request_window(&mut self, center: NodeId, radius: u64) -> u64 {
        self.request(WindowRequest::Around { center, radius })
    }

    pub fn request_range(&mut self, low: NodeId, high: NodeId) -> u64 {
        self.request(WindowRequest::Range { low, high })
    }

    /// A submitted request has not produced its result yet.
    pub fn is_rebuilding(&self) -> bool {
        self.settled < self.submitted || self.building.load(Ordering::Relaxed)
    }

    pub fn latest_generation(&self) -> u64 {
        self.submitted
    }

    /// The graph currently on display.
    pub fn current(&self) -> Option<Arc<WorkingGraph>> {
        self.displayed.read().clone()
    }

    /// Shift the window by one radius when the visible columns come within
    /// the edge margin of either end. Returns the generation of the rebuild
    /// this triggered, if any.
    ///
    /// While a rebuild is outstanding the latest viewport is kept instead. It
    /// is checked again once the rebuild settles, as long as the window it was
    /// measured against is still on display.
    pub fn update_viewport(&mut self, first_visible: usize, last_visible: usize) -> Option<u64> {
        if self.is_rebuilding() {
            self.deferred_viewport = self.current().map(|window| DeferredViewport {
                first_visible,
                last_visible,
                window,
            });
            return None;
        }
        self.deferred_viewport = None;
        let graph = self.current()?;
        let margin = self.config.edge_margin_columns;
        let bounds = graph.bounds();
        let radius = graph.radius();
        let step = i64::try_from(radius.max(1)).unwrap_or(i64::MAX);

        if last_visible.saturating_add(margin) >= graph.column_count()
            && bounds.high.0 < graph.full_size()
        {
            let center = NodeId(graph.center().0.saturating_add(step).min(graph.full_size()));
            tracing::debug!("Viewport near right edge of {}, moving to {}", bounds, center);
            return Some(self.request_window(center, radius));
        }
        if first_visible <= margin && bounds.low.0 > 1 {
            let center = NodeId(graph.center().0.saturating_sub(step).max(1));
            tracing::debug!("Viewport near left edge of {}, moving to {}", bounds, center);
            return Some(self.request_window(center, radius));
        }
        None
    }

    /// Deliver every finished rebuild. Returns how many were applied.
    pub fn poll(&mut self, listener: &mut dyn WindowListener) -> usize {
        let mut applied = 0;
        while let Ok(result) = self.results.try_recv() {
            if self.apply(result, listener) {
                applied += 1;
            }
        }
        self.recheck_deferred_viewport();
        applied
    }

    /// Block until the newest request has been delivered or `timeout` passes.
    /// A deferred viewport may queue a follow-up shift before this returns.
    pub fn wait(&mut self, listener: &mut dyn WindowListener, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.settled < self.submitted {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.results.recv_timeout(remaining) {
                Ok(result) => {
                    self.apply(result, listener);
                }
                Err(_) => return false,
            }
        }
        self.recheck_deferred_viewport();
        true
    }

    fn recheck_deferred_viewport(&mut self) {
        if self.is_rebuilding() {
            return;
        }
        let Some(deferred) = self.deferred_viewport.take() else {
            return;
        };
        let still_displayed = self
            .current()
            .is_some_and(|current| Arc::ptr_eq(&current, &deferred.window));
        if still_displayed {
            self.update_viewport(deferred.first_visible, deferred.last_visible);
        }
    }

    fn apply(&mut self, result: BuildResult, listener: &mut dyn WindowListener) -> bool {
        let generation = result.generation;
        self.settled = self.settled.max(generation);

        if generation < self.submitted {
            tracing::debug!(
                "Discarding window build {} (latest is {})",
                generation,
                self.submitted
            );
            self.publish(Event::WindowDiscarded { generation });
            return false;
        }

        match result.outcome {
            Ok(graph) => {
                let graph = Arc::new(graph);
                *self.displayed.write() = Some(Arc::clone(&graph));
                self.publish(Event::WindowReady {
                    generation,
                    bounds: graph.bounds(),
                    columns: graph.column_count(),
                });
                listener.on_window_ready(graph);
            }
            Err(error) => {
                tracing::warn!("Window build {} failed: {}", generation, error);
                self.publish(Event::WindowFailed {
                    generation,
                    error: error.to_string(),
                });
                listener.on_window_failed(result.request, &error);
            }
        }
        true
    }

    fn publish(&self, event: Event) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}

impl Drop for WindowManager {
    fn drop(&mut self) {
        // Closing the queue lets the worker finish its loop.
        self.tasks.take();
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            tracing::error!("Window worker panicked");
        }
    }
}

fn spawn_worker(
    store: StoreHandle,
    engine: LayeringEngine,
    tasks: Receiver<BuildTask>,
    results: Sender<BuildResult>,
    building: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut reader: Option<StoreReader> = None;
        while let Ok(mut task) = tasks.recv() {
            while let Ok(newer) = tasks.try_recv() {
                task = newer;
            }

            building.store(true, Ordering::Relaxed);
            let outcome = run_task(&store, &mut reader, &engine, task.request);
            building.store(false, Ordering::Relaxed);

            let result = BuildResult {
                generation: task.generation,
                request: task.request,
                outcome,
            };
            if results.send(result).is_err() {
                break;
            }
        }
    })
}

fn run_task(
    store: &StoreHandle,
    slot: &mut Option<StoreReader>,
    engine: &LayeringEngine,
    request: WindowRequest,
) -> Result<WorkingGraph, BuildError> {
    let reader = match slot.take() {
        Some(reader) => reader,
        None => store.open_reader()?,
    };
    let outcome = load_window(&reader, request, engine);
    *slot = Some(reader);
    outcome
}
