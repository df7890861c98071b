//! The dispatcher: the single consumer of the event queue and the only
//! writer of sidecar files.
//!
//! Each event is routed to a handler enforcing the sidecar lifecycle:
//!
//! ```text
//! {no sidecar} --Created/Modified/Sync--> {fresh sidecar} --Deleted--> {no sidecar}
//! {fresh sidecar} --Modified--> {fresh sidecar}   (regenerated)
//! {fresh sidecar} --Moved-->    {fresh sidecar at the new path}
//! ```
//!
//! A failing handler never stops the loop: errors and panics are logged and
//! the event is dropped.

use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::time::SystemTime;

use texbinet_converters::ConverterRegistry;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::event::Event;
use crate::queue::EventReceiver;
use crate::sidecar::{is_sidecar, sidecar_path};

/// What handling an event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The converter ran and the sidecar was written.
    Converted,
    /// The sidecar is newer than its source; nothing was done.
    Fresh,
    /// No converter for the source's extension.
    Unsupported,
    /// The sidecar was deleted.
    Removed,
    /// The sidecar was moved along with its source.
    Relocated,
    /// Nothing to do: a sidecar path, a non-file, or no sidecar to touch.
    Skipped,
    /// A stop event.
    Stopped,
}

/// Routes events to sidecar lifecycle handlers.
#[derive(Debug)]
pub struct Dispatcher {
    registry: ConverterRegistry,
}

impl Dispatcher {
    /// Create a dispatcher using the given converters.
    pub fn new(registry: ConverterRegistry) -> Self {
        Self { registry }
    }

    /// Consume events until a stop event arrives or the queue closes.
    pub fn run(&self, mut events: EventReceiver) {
        let mut running = true;
        while running {
            let Some(event) = events.recv() else {
                debug!("Event queue closed");
                break;
            };

            match panic::catch_unwind(AssertUnwindSafe(|| self.handle(&event))) {
                Ok(Ok(Outcome::Stopped)) => running = false,
                Ok(Ok(_)) => {}
                Ok(Err(e)) => error!("Failed to handle {event}: {e}"),
                Err(_) => error!("Handler panicked on {event}"),
            }
        }
        info!("Dispatcher stopped");
    }

    /// Handle a single event.
    pub fn handle(&self, event: &Event) -> Result<Outcome> {
        match event {
            Event::Stop => Ok(Outcome::Stopped),
            Event::Sync(path) => self.on_sync(path),
            Event::Created(path) | Event::Modified(path) => self.on_changed(path),
            Event::Deleted(path) => self.on_deleted(path),
            Event::Moved { from, to } => self.on_moved(from, to),
        }
    }

    fn on_sync(&self, path: &Path) -> Result<Outcome> {
        if is_sidecar(path) || !path.is_file() {
            return Ok(Outcome::Skipped);
        }

        let sidecar = sidecar_path(path);
        let fresh = match (modified(&sidecar), modified(path)) {
            (Some(sidecar_time), Some(source_time)) => sidecar_time > source_time,
            _ => false,
        };
        if fresh {
            debug!("Sidecar already fresh for {}", path.display());
            return Ok(Outcome::Fresh);
        }

        self.convert(path, &sidecar)
    }

    fn on_changed(&self, path: &Path) -> Result<Outcome> {
        if is_sidecar(path) || !path.is_file() {
            return Ok(Outcome::Skipped);
        }
        self.convert(path, &sidecar_path(path))
    }

    fn on_deleted(&self, path: &Path) -> Result<Outcome> {
        if is_sidecar(path) {
            return Ok(Outcome::Skipped);
        }

        let sidecar = sidecar_path(path);
        if !sidecar.exists() {
            return Ok(Outcome::Skipped);
        }

        fs::remove_file(&sidecar)?;
        info!("Removed sidecar {}", sidecar.display());
        Ok(Outcome::Removed)
    }

    fn on_moved(&self, from: &Path, to: &Path) -> Result<Outcome> {
        if is_sidecar(from) || is_sidecar(to) {
            return Ok(Outcome::Skipped);
        }

        let old = sidecar_path(from);
        if !old.exists() {
            return Ok(Outcome::Skipped);
        }

        let new = sidecar_path(to);
        fs::rename(&old, &new)?;
        info!("Moved sidecar {} -> {}", old.display(), new.display());
        Ok(Outcome::Relocated)
    }

    fn convert(&self, path: &Path, sidecar: &Path) -> Result<Outcome> {
        let Some(converter) = self.registry.lookup_path(path) else {
            debug!("No converter for {}", path.display());
            return Ok(Outcome::Unsupported);
        };

        let text = converter.convert(path)?;
        fs::write(sidecar, text)?;
        info!("Converted {} -> {}", path.display(), sidecar.display());
        Ok(Outcome::Converted)
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::queue;
    use filetime::FileTime;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use texbinet_converters::{ConversionError, Converter};

    /// Upper-cases the source and counts calls.
    #[derive(Clone, Default)]
    struct Counting {
        calls: Arc<AtomicUsize>,
    }

    impl Converter for Counting {
        fn convert(&self, path: &Path) -> texbinet_converters::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(fs::read_to_string(path)?.to_uppercase())
        }
    }

    impl Counting {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn setup() -> (TempDir, Dispatcher, Counting) {
        let temp_dir = TempDir::new().unwrap();
        let counting = Counting::default();
        let mut registry = ConverterRegistry::new();
        registry.register(".pdf", counting.clone());
        registry.register(
            ".bad",
            |_: &Path| -> texbinet_converters::Result<String> {
                Err(ConversionError::Pdf("corrupt".to_string()))
            },
        );
        registry.register(".boom", |_: &Path| -> texbinet_converters::Result<String> {
            panic!("converter blew up")
        });
        (temp_dir, Dispatcher::new(registry), counting)
    }

    fn write(path: &Path, content: &str) {
        fs::write(path, content).unwrap();
    }

    fn set_mtime(path: &Path, unix_secs: i64) {
        filetime::set_file_mtime(path, FileTime::from_unix_time(unix_secs, 0)).unwrap();
    }

    #[test]
    fn test_created_writes_sidecar() {
        let (dir, dispatcher, counting) = setup();
        let source = dir.path().join("a.pdf");
        write(&source, "hello");

        let outcome = dispatcher.handle(&Event::Created(source.clone())).unwrap();

        assert_eq!(outcome, Outcome::Converted);
        assert_eq!(fs::read_to_string(sidecar_path(&source)).unwrap(), "HELLO");
        assert_eq!(counting.calls(), 1);
    }

    #[test]
    fn test_modified_overwrites_unconditionally() {
        let (dir, dispatcher, counting) = setup();
        let source = dir.path().join("a.pdf");
        write(&source, "v2");
        let sidecar = sidecar_path(&source);
        write(&sidecar, "V1");
        set_mtime(&source, 1_000_000);
        set_mtime(&sidecar, 2_000_000);

        let outcome = dispatcher.handle(&Event::Modified(source)).unwrap();

        assert_eq!(outcome, Outcome::Converted);
        assert_eq!(fs::read_to_string(sidecar).unwrap(), "V2");
        assert_eq!(counting.calls(), 1);
    }

    #[test]
    fn test_extension_match_ignores_case() {
        let (dir, dispatcher, _) = setup();
        let source = dir.path().join("SCAN.PDF");
        write(&source, "x");

        let outcome = dispatcher.handle(&Event::Created(source)).unwrap();
        assert_eq!(outcome, Outcome::Converted);
    }

    #[test]
    fn test_unsupported_type_is_skipped_silently() {
        let (dir, dispatcher, counting) = setup();
        let source = dir.path().join("d.txt");
        write(&source, "plain");

        let outcome = dispatcher.handle(&Event::Created(source.clone())).unwrap();

        assert_eq!(outcome, Outcome::Unsupported);
        assert!(!sidecar_path(&source).exists());
        assert_eq!(counting.calls(), 0);
    }

    #[test]
    fn test_sync_skips_fresh_sidecar() {
        let (dir, dispatcher, counting) = setup();
        let source = dir.path().join("a.pdf");
        let sidecar = sidecar_path(&source);
        write(&source, "new content");
        write(&sidecar, "old text");
        set_mtime(&source, 1_000_000);
        set_mtime(&sidecar, 1_000_010);

        let outcome = dispatcher.handle(&Event::Sync(source)).unwrap();

        assert_eq!(outcome, Outcome::Fresh);
        assert_eq!(fs::read_to_string(sidecar).unwrap(), "old text");
        assert_eq!(counting.calls(), 0);
    }

    #[test]
    fn test_sync_regenerates_stale_sidecar() {
        let (dir, dispatcher, counting) = setup();
        let source = dir.path().join("a.pdf");
        let sidecar = sidecar_path(&source);
        write(&source, "new content");
        write(&sidecar, "old text");
        set_mtime(&source, 1_000_010);
        set_mtime(&sidecar, 1_000_000);

        assert_eq!(dispatcher.handle(&Event::Sync(source)).unwrap(), Outcome::Converted);
        assert_eq!(fs::read_to_string(sidecar).unwrap(), "NEW CONTENT");
        assert_eq!(counting.calls(), 1);
    }

    #[test]
    fn test_sync_equal_mtime_is_stale() {
        let (dir, dispatcher, counting) = setup();
        let source = dir.path().join("a.pdf");
        let sidecar = sidecar_path(&source);
        write(&source, "x");
        write(&sidecar, "old");
        set_mtime(&source, 1_000_000);
        set_mtime(&sidecar, 1_000_000);

        assert_eq!(dispatcher.handle(&Event::Sync(source)).unwrap(), Outcome::Converted);
        assert_eq!(counting.calls(), 1);
    }

    #[test]
    fn test_sync_without_sidecar_converts() {
        let (dir, dispatcher, _) = setup();
        let source = dir.path().join("a.pdf");
        write(&source, "x");

        assert_eq!(dispatcher.handle(&Event::Sync(source.clone())).unwrap(), Outcome::Converted);
        assert!(sidecar_path(&source).exists());
    }

    #[test]
    fn test_sidecar_paths_are_never_sources() {
        let (dir, _, _) = setup();
        // Sidecars end in `.txt`; with a `.txt` converter registered only
        // the sidecar check keeps them from being converted.
        let counting = Counting::default();
        let mut registry = ConverterRegistry::new();
        registry.register(".txt", counting.clone());
        let dispatcher = Dispatcher::new(registry);

        let sidecar = sidecar_path(&dir.path().join("a.pdf"));
        write(&sidecar, "text");

        for event in [
            Event::Sync(sidecar.clone()),
            Event::Created(sidecar.clone()),
            Event::Modified(sidecar.clone()),
            Event::Deleted(sidecar.clone()),
            Event::moved(sidecar.clone(), dir.path().join("b.pdf")),
            Event::moved(dir.path().join("b.pdf"), sidecar.clone()),
        ] {
            assert_eq!(dispatcher.handle(&event).unwrap(), Outcome::Skipped, "{event}");
        }
        assert_eq!(counting.calls(), 0);
        assert!(sidecar.exists());
        assert!(!sidecar_path(&sidecar).exists());
    }

    #[test]
    fn test_directories_are_skipped() {
        let (dir, dispatcher, counting) = setup();
        let folder = dir.path().join("archive.pdf");
        fs::create_dir(&folder).unwrap();

        assert_eq!(dispatcher.handle(&Event::Created(folder)).unwrap(), Outcome::Skipped);
        assert_eq!(counting.calls(), 0);
    }

    #[test]
    fn test_deleted_removes_sidecar() {
        let (dir, dispatcher, _) = setup();
        let source = dir.path().join("a.pdf");
        let sidecar = sidecar_path(&source);
        write(&sidecar, "text");

        assert_eq!(dispatcher.handle(&Event::Deleted(source)).unwrap(), Outcome::Removed);
        assert!(!sidecar.exists());
    }

    #[test]
    fn test_deleted_without_sidecar_is_noop() {
        let (dir, dispatcher, _) = setup();
        let outcome = dispatcher
            .handle(&Event::Deleted(dir.path().join("never.pdf")))
            .unwrap();
        assert_eq!(outcome, Outcome::Skipped);
    }

    #[test]
    fn test_moved_relocates_without_conversion() {
        let (dir, dispatcher, counting) = setup();
        let from = dir.path().join("a.pdf");
        let to = dir.path().join("c.pdf");
        write(&to, "body");
        write(&sidecar_path(&from), "BODY");

        let outcome = dispatcher.handle(&Event::moved(from.clone(), to.clone())).unwrap();

        assert_eq!(outcome, Outcome::Relocated);
        assert!(!sidecar_path(&from).exists());
        assert_eq!(fs::read_to_string(sidecar_path(&to)).unwrap(), "BODY");
        assert_eq!(counting.calls(), 0);
    }

    #[test]
    fn test_moved_into_subdirectory() {
        let (dir, dispatcher, _) = setup();
        let from = dir.path().join("a.pdf");
        fs::create_dir(dir.path().join("sub")).unwrap();
        let to = dir.path().join("sub/a.pdf");
        write(&sidecar_path(&from), "BODY");

        assert_eq!(dispatcher.handle(&Event::moved(from, to.clone())).unwrap(), Outcome::Relocated);
        assert!(sidecar_path(&to).exists());
    }

    #[test]
    fn test_moved_without_sidecar_is_noop() {
        let (dir, dispatcher, counting) = setup();
        let outcome = dispatcher
            .handle(&Event::moved(dir.path().join("a.pdf"), dir.path().join("c.pdf")))
            .unwrap();

        assert_eq!(outcome, Outcome::Skipped);
        assert!(!sidecar_path(&dir.path().join("c.pdf")).exists());
        assert_eq!(counting.calls(), 0);
    }

    #[test]
    fn test_conversion_error_keeps_previous_sidecar() {
        let (dir, dispatcher, _) = setup();
        let source = dir.path().join("x.bad");
        write(&source, "x");
        write(&sidecar_path(&source), "previous");

        let err = dispatcher.handle(&Event::Modified(source.clone())).unwrap_err();

        assert!(matches!(err, SyncError::Conversion(_)));
        assert_eq!(fs::read_to_string(sidecar_path(&source)).unwrap(), "previous");
    }

    #[test]
    fn test_stop_outcome() {
        let (_dir, dispatcher, _) = setup();
        assert_eq!(dispatcher.handle(&Event::Stop).unwrap(), Outcome::Stopped);
    }

    #[test]
    fn test_run_isolates_failures_and_drains_before_stop() {
        let (dir, dispatcher, counting) = setup();
        let bad = dir.path().join("x.bad");
        let boom = dir.path().join("y.boom");
        let good = dir.path().join("z.pdf");
        let after = dir.path().join("after.pdf");
        for path in [&bad, &boom, &good, &after] {
            write(path, "data");
        }

        let (queue, rx) = queue::channel(0);
        queue.push(Event::Created(bad));
        queue.push(Event::Created(boom));
        queue.push(Event::Created(PathBuf::from("/nonexistent/path/12345.pdf")));
        queue.push(Event::Created(good.clone()));
        queue.push(Event::Stop);
        queue.push(Event::Created(after.clone()));

        dispatcher.run(rx);

        assert_eq!(fs::read_to_string(sidecar_path(&good)).unwrap(), "DATA");
        assert!(!sidecar_path(&after).exists());
        assert_eq!(counting.calls(), 1);
    }
}
