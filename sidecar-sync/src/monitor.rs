//! Filesystem monitor adapter.
//!
//! Wraps `notify`'s recursive watcher. Raw notifications are handed to a
//! dedicated thread which translates them into [`Event`]s and pushes them
//! through the *feed*, a guarded handle to the event queue. The adapter knows
//! nothing about sidecars.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};
use crate::event::Event;
use crate::queue::EventQueue;

/// Messages for the adapter thread.
enum MonitorMsg {
    Notify(notify::Result<notify::Event>),
    Shutdown,
}

/// Handle to a running monitor adapter.
pub struct MonitorAdapter {
    /// Queue handle, `None` once stopped.
    feed: Arc<Mutex<Option<EventQueue>>>,

    /// Control channel to the adapter thread.
    control: mpsc::Sender<MonitorMsg>,

    /// Adapter thread.
    thread: Option<JoinHandle<()>>,
}

impl MonitorAdapter {
    /// Start watching `root` recursively, feeding translated events to `queue`.
    pub fn start(root: &Path, queue: EventQueue, rename_grace: Duration) -> Result<Self> {
        let (control, raw_rx) = mpsc::channel();

        let notify_tx = control.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            // The adapter thread may already be gone during shutdown.
            let _ = notify_tx.send(MonitorMsg::Notify(res));
        })?;
        watcher.watch(root, RecursiveMode::Recursive)?;

        let feed = Arc::new(Mutex::new(Some(queue)));
        let thread_feed = feed.clone();
        let thread = thread::Builder::new()
            .name("texbinet-monitor".to_string())
            .spawn(move || run(watcher, raw_rx, thread_feed, rename_grace))?;

        info!("Watching {}", root.display());

        Ok(Self {
            feed,
            control,
            thread: Some(thread),
        })
    }

    /// Stop producing events.
    ///
    /// Once this returns, no further event from this adapter reaches the
    /// queue. Returns `true` if this call did the stopping, `false` if the
    /// adapter was already stopped.
    pub fn stop(&self) -> bool {
        let was_open = lock(&self.feed).take().is_some();
        if was_open {
            // The thread exits on its own if it already hung up.
            let _ = self.control.send(MonitorMsg::Shutdown);
        }
        was_open
    }

    /// Wait for the adapter thread to exit.
    pub fn join(&mut self) -> Result<()> {
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| SyncError::ThreadPanicked("monitor")),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for MonitorAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorAdapter")
            .field("running", &lock(&self.feed).is_some())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Adapter thread body. Owns the watcher so it is dropped on exit.
fn run(
    watcher: RecommendedWatcher,
    raw_rx: mpsc::Receiver<MonitorMsg>,
    feed: Arc<Mutex<Option<EventQueue>>>,
    rename_grace: Duration,
) {
    let mut translator = Translator::new(rename_grace);

    loop {
        let mut events = match raw_rx.recv_timeout(rename_grace) {
            Ok(MonitorMsg::Notify(Ok(raw))) => translator.translate(raw, Instant::now()),
            Ok(MonitorMsg::Notify(Err(e))) => {
                warn!("Watch error: {e}");
                continue;
            }
            Ok(MonitorMsg::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => Vec::new(),
        };

        events.extend(translator.expire(Instant::now()));
        if events.is_empty() {
            continue;
        }

        let guard = lock(&feed);
        let Some(queue) = guard.as_ref() else {
            break;
        };
        for event in events {
            debug!("Observed {event}");
            queue.push(event);
        }
    }

    if translator.pending() > 0 {
        debug!(
            "Discarding {} unpaired rename sources at shutdown",
            translator.pending()
        );
    }
    drop(watcher);
    debug!("Monitor adapter stopped");
}

/// Translates raw notify events into queue events.
///
/// Renames arrive from some backends as a `From` half and a `To` half
/// linked by a tracker id, sometimes followed by a combined `Both` event.
/// A `From` half is held until its partner shows up; if none does within
/// the grace period the file left the watched tree and is reported as
/// deleted. A held source is reported as deleted early when a later event
/// touches its path, so the deletion never trails what happened after it.
#[derive(Debug)]
pub struct Translator {
    grace: Duration,
    pending: HashMap<usize, (PathBuf, Instant)>,
    /// Renames already reported from their halves, by tracker id.
    paired: HashMap<usize, Instant>,
}

impl Translator {
    /// Create a translator with the given rename grace period.
    pub fn new(grace: Duration) -> Self {
        Self {
            grace,
            pending: HashMap::new(),
            paired: HashMap::new(),
        }
    }

    /// Number of rename sources waiting for a destination.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Translate one raw notification observed at `now`.
    pub fn translate(&mut self, raw: notify::Event, now: Instant) -> Vec<Event> {
        let events = self.translate_raw(raw, now);
        if self.pending.is_empty() {
            return events;
        }

        let mut ordered = Vec::with_capacity(events.len());
        for event in events {
            self.release_held(&event, &mut ordered);
            ordered.push(event);
        }
        ordered
    }

    /// Report held sources at or above the paths of `event` as deleted.
    fn release_held(&mut self, event: &Event, out: &mut Vec<Event>) {
        let touched: Vec<&Path> = match event {
            Event::Moved { from, to } => vec![from.as_path(), to.as_path()],
            other => other.path().into_iter().collect(),
        };

        let mut held: Vec<(usize, Instant)> = self
            .pending
            .iter()
            .filter(|(_, (source, _))| touched.iter().any(|path| path.starts_with(source)))
            .map(|(id, (_, seen))| (*id, *seen))
            .collect();
        held.sort_by_key(|(_, seen)| *seen);

        for (id, _) in held {
            if let Some((source, _)) = self.pending.remove(&id) {
                out.push(Event::Deleted(source));
            }
        }
    }

    fn translate_raw(&mut self, raw: notify::Event, now: Instant) -> Vec<Event> {
        let tracker = raw.tracker();
        let mut paths = raw.paths;

        match raw.kind {
            EventKind::Create(_) => paths.into_iter().map(Event::Created).collect(),
            EventKind::Remove(_) => paths.into_iter().map(Event::Deleted).collect(),
            EventKind::Modify(ModifyKind::Name(mode)) => match mode {
                RenameMode::Both if paths.len() == 2 => {
                    if let Some(id) = tracker {
                        self.pending.remove(&id);
                        if self.paired.remove(&id).is_some() {
                            return Vec::new();
                        }
                    }
                    let to = paths.pop();
                    let from = paths.pop();
                    match (from, to) {
                        (Some(from), Some(to)) => vec![Event::Moved { from, to }],
                        _ => Vec::new(),
                    }
                }
                RenameMode::From => match tracker {
                    Some(id) => {
                        for path in paths {
                            self.pending.insert(id, (path, now));
                        }
                        Vec::new()
                    }
                    None => paths.into_iter().map(Event::Deleted).collect(),
                },
                RenameMode::To => {
                    let source = tracker.and_then(|id| {
                        let (from, _) = self.pending.remove(&id)?;
                        self.paired.insert(id, now);
                        Some(from)
                    });
                    match (source, paths.pop()) {
                        (Some(from), Some(to)) => vec![Event::Moved { from, to }],
                        (None, Some(to)) => vec![Event::Created(to)],
                        (_, None) => Vec::new(),
                    }
                }
                _ => paths.into_iter().map(presence_event).collect(),
            },
            EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
            EventKind::Modify(_) => paths.into_iter().map(Event::Modified).collect(),
            EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
        }
    }

    /// Report rename sources whose grace period ran out as deletions.
    pub fn expire(&mut self, now: Instant) -> Vec<Event> {
        let grace = self.grace;
        self.paired
            .retain(|_, seen| now.duration_since(*seen) < grace);

        let expired: Vec<usize> = self
            .pending
            .iter()
            .filter(|(_, (_, seen))| now.duration_since(*seen) >= self.grace)
            .map(|(id, _)| *id)
            .collect();

        expired
            .into_iter()
            .filter_map(|id| self.pending.remove(&id))
            .map(|(path, _)| Event::Deleted(path))
            .collect()
    }
}

/// A rename half without pairing information: decide by what is on disk.
fn presence_event(path: PathBuf) -> Event {
    if path.exists() {
        Event::Created(path)
    } else {
        Event::Deleted(path)
    }
}
