//! The sync engine for one watched root.

use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use texbinet_converters::ConverterRegistry;
use tracing::{debug, info};

use crate::config::SyncConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{Result, SyncError};
use crate::event::Event;
use crate::monitor::MonitorAdapter;
use crate::queue::{self, EventQueue};
use crate::scanner;

/// Keeps the sidecars of one directory tree in sync.
///
/// Starting the engine validates the target, starts the monitor adapter,
/// queues the initial scan and spawns the dispatcher. [`SidecarSync::stop`]
/// asks it to finish; [`SidecarSync::join`] waits until it has.
#[derive(Debug)]
pub struct SidecarSync {
    /// Canonical watched root.
    target: PathBuf,

    /// Producer handle for the stop event.
    queue: EventQueue,

    /// Monitor adapter.
    monitor: MonitorAdapter,

    /// Dispatcher thread.
    dispatcher: Option<JoinHandle<()>>,
}

impl SidecarSync {
    /// Watch `target` with the default config and the built-in converters.
    pub fn watch(target: impl Into<PathBuf>) -> Result<Self> {
        let config = SyncConfig::new(target);
        let registry = ConverterRegistry::standard(&config.ocr);
        Self::start(config, registry)
    }

    /// Start syncing `config.target` using `registry`.
    pub fn start(config: SyncConfig, registry: ConverterRegistry) -> Result<Self> {
        config.validate()?;
        let target = validate_target(&config.target)?;
        info!(
            "Starting sidecar sync for {} (converters: {})",
            target.display(),
            registry.extensions().join(" ")
        );

        let (queue, events) = queue::channel(config.queue_warn_depth);
        let monitor = MonitorAdapter::start(&target, queue.clone(), config.rename_grace())?;

        if config.initial_scan {
            scanner::scan(&target, &queue);
        }

        let dispatcher = Dispatcher::new(registry);
        let spawned = thread::Builder::new()
            .name("texbinet-dispatcher".to_string())
            .spawn(move || dispatcher.run(events));
        let dispatcher = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                monitor.stop();
                return Err(e.into());
            }
        };

        Ok(Self {
            target,
            queue,
            monitor,
            dispatcher: Some(dispatcher),
        })
    }

    /// The watched root.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Number of events waiting for the dispatcher.
    pub fn queue_depth(&self) -> usize {
        self.queue.depth()
    }

    /// Ask the engine to stop.
    ///
    /// The monitor stops producing first, then a stop event is queued behind
    /// everything already pending. Calling this more than once is harmless.
    pub fn stop(&self) {
        if self.monitor.stop() {
            debug!("Queueing stop for {}", self.target.display());
            self.queue.push(Event::Stop);
        }
    }

    /// Block until the monitor and dispatcher threads have exited.
    ///
    /// Does not stop the engine by itself; without a prior [`stop`](Self::stop)
    /// this blocks forever.
    pub fn join(mut self) -> Result<()> {
        let monitor = self.monitor.join();
        let dispatcher = match self.dispatcher.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| SyncError::ThreadPanicked("dispatcher")),
            None => Ok(()),
        };
        info!("Sidecar sync for {} stopped", self.target.display());
        monitor.and(dispatcher)
    }
}

impl Drop for SidecarSync {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Check that the target exists and is a directory, and canonicalize it.
fn validate_target(target: &Path) -> Result<PathBuf> {
    if !target.exists() {
        return Err(SyncError::DirectoryNotFound(target.display().to_string()));
    }
    if !target.is_dir() {
        return Err(SyncError::NotADirectory(target.display().to_string()));
    }
    Ok(dunce::canonicalize(target)?)
}
