use crate::field::Point;
use crate::genome::Step;
use tracing::trace;

/// Opaque token handed out by an observer when an agent is spawned.
/// The engine stores it and passes it back; it never looks inside.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ViewHandle(pub u64);

/// Presentation layer hooks invoked by the population as agents live and die.
pub trait PopulationObserver: Send {
    /// Called once per agent when it is created.
    fn on_spawn(&mut self, start: Point) -> ViewHandle;
    /// Called after a successful move by `delta`.
    fn on_move(&mut self, handle: ViewHandle, delta: Step);
    /// Called exactly once when an agent leaves the field.
    fn on_death(&mut self, handle: ViewHandle);
    /// Called once per agent when its generation is discarded.
    fn on_cleanup(&mut self, handle: ViewHandle);
}

/// No-op observer.
#[derive(Debug, Default)]
pub struct NullObserver;

impl PopulationObserver for NullObserver {
    fn on_spawn(&mut self, _start: Point) -> ViewHandle {
        ViewHandle(0)
    }
    fn on_move(&mut self, _handle: ViewHandle, _delta: Step) {}
    fn on_death(&mut self, _handle: ViewHandle) {}
    fn on_cleanup(&mut self, _handle: ViewHandle) {}
}

/// Headless observer that hands out sequential handles and traces every hook.
#[derive(Debug, Default)]
pub struct TraceObserver {
    next: u64,
    live: usize,
}

impl TraceObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of handles spawned and not yet cleaned up
    pub fn live(&self) -> usize {
        self.live
    }
}

impl PopulationObserver for TraceObserver {
    fn on_spawn(&mut self, start: Point) -> ViewHandle {
        let handle = ViewHandle(self.next);
        self.next += 1;
        self.live += 1;
        trace!(handle = handle.0, x = start.x, y = start.y, "spawn");
        handle
    }

    fn on_move(&mut self, handle: ViewHandle, delta: Step) {
        trace!(handle = handle.0, dx = delta.dx, dy = delta.dy, "move");
    }

    fn on_death(&mut self, handle: ViewHandle) {
        trace!(handle = handle.0, "death");
    }

    fn on_cleanup(&mut self, handle: ViewHandle) {
        self.live = self.live.saturating_sub(1);
        trace!(handle = handle.0, "cleanup");
    }
}
