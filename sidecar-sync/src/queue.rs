//! Unbounded FIFO between the event producers and the dispatcher.
//!
//! There is no bound and no coalescing: a slow converter lets the queue grow
//! without limit. The queue tracks its depth and logs a warning each time the
//! backlog reaches a multiple of the configured warning depth.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::mpsc;
use tracing::warn;

use crate::event::Event;

/// Create a connected queue and receiver.
pub fn channel(warn_depth: usize) -> (EventQueue, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let depth = Arc::new(AtomicUsize::new(0));

    let queue = EventQueue {
        tx,
        depth: depth.clone(),
        warn_depth,
    };
    (queue, EventReceiver { rx, depth })
}

/// Producer handle. Cheap to clone; every producer holds its own.
#[derive(Debug, Clone)]
pub struct EventQueue {
    tx: mpsc::UnboundedSender<Event>,
    depth: Arc<AtomicUsize>,
    warn_depth: usize,
}

impl EventQueue {
    /// Enqueue an event. Returns `false` if the dispatcher has gone away.
    pub fn push(&self, event: Event) -> bool {
        let depth = self.depth.fetch_add(1, Ordering::AcqRel) + 1;
        if self.tx.send(event).is_err() {
            self.depth.fetch_sub(1, Ordering::AcqRel);
            return false;
        }

        if self.warn_depth > 0 && depth % self.warn_depth == 0 {
            warn!("Sync backlog at {depth} queued events");
        }
        true
    }

    /// Number of events waiting to be handled.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }
}

/// Consumer end, owned by the dispatcher.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<Event>,
    depth: Arc<AtomicUsize>,
}

impl EventReceiver {
    /// Block until the next event arrives.
    ///
    /// Returns `None` once every producer handle is dropped and the queue is
    /// drained. Must not be called from inside an async runtime.
    pub fn recv(&mut self) -> Option<Event> {
        let event = self.rx.blocking_recv()?;
        self.depth.fetch_sub(1, Ordering::AcqRel);
        Some(event)
    }

    /// Take the next event if one is ready.
    pub fn try_recv(&mut self) -> Option<Event> {
        let event = self.rx.try_recv().ok()?;
        self.depth.fetch_sub(1, Ordering::AcqRel);
        Some(event)
    }
}
