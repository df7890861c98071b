//! Initial tree scan.
//!
//! Files that predate the watch session never produce live events, so the
//! engine walks the root once at startup and queues a [`Event::Sync`] for
//! every regular file. Sidecars are queued too; the dispatcher skips them.

use std::path::Path;
use std::time::Instant;

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::event::Event;
use crate::queue::EventQueue;

/// Walk `root` and queue a sync event per regular file.
///
/// Returns the number of events queued. Unreadable entries are logged and
/// skipped.
pub fn scan(root: &Path, queue: &EventQueue) -> usize {
    let start = Instant::now();
    let mut queued = 0;

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry during scan: {e}");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        if !queue.push(Event::Sync(entry.into_path())) {
            warn!("Dispatcher gone, abandoning scan of {}", root.display());
            break;
        }
        queued += 1;
    }

    info!(
        "Queued {queued} files from {} in {:?}",
        root.display(),
        start.elapsed()
    );
    queued
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn drain(rx: &mut queue::EventReceiver) -> Vec<Event> {
        std::iter::from_fn(|| rx.try_recv()).collect()
    }

    #[test]
    fn test_scan_queues_regular_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("nested/deeper")).unwrap();
        fs::write(root.join("a.pdf"), "a").unwrap();
        fs::write(root.join("a.pdf.cabi.txt"), "text").unwrap();
        fs::write(root.join("nested/deeper/b.jpg"), "b").unwrap();

        let (queue, mut rx) = queue::channel(0);
        let queued = scan(root, &queue);

        let mut events = drain(&mut rx);
        events.sort_by_key(|e| e.path().map(PathBuf::from));

        assert_eq!(queued, 3);
        assert_eq!(
            events,
            vec![
                Event::Sync(root.join("a.pdf")),
                Event::Sync(root.join("a.pdf.cabi.txt")),
                Event::Sync(root.join("nested/deeper/b.jpg")),
            ]
        );
    }

    #[test]
    fn test_scan_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("empty")).unwrap();

        let (queue, mut rx) = queue::channel(0);
        assert_eq!(scan(temp_dir.path(), &queue), 0);
        assert!(drain(&mut rx).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_does_not_follow_symlinks() {
        let temp_dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("secret.pdf"), "x").unwrap();
        std::os::unix::fs::symlink(outside.path(), temp_dir.path().join("link")).unwrap();

        let (queue, mut rx) = queue::channel(0);
        assert_eq!(scan(temp_dir.path(), &queue), 0);
        assert!(drain(&mut rx).is_empty());
    }
}
