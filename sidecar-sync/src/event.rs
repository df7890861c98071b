//! Events flowing through the sync queue.

use std::fmt;
use std::path::{Path, PathBuf};

/// A unit of work for the dispatcher.
///
/// Events are produced by the monitor adapter, the initial tree scanner and
/// the shutdown path, and consumed in FIFO order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Stop the dispatcher once everything queued before this is handled.
    Stop,

    /// Bring a pre-existing file's sidecar up to date.
    Sync(PathBuf),

    /// A file was created.
    Created(PathBuf),

    /// A file's content changed.
    Modified(PathBuf),

    /// A file was deleted.
    Deleted(PathBuf),

    /// A file was moved or renamed.
    Moved {
        /// Old path.
        from: PathBuf,
        /// New path.
        to: PathBuf,
    },
}

impl Event {
    /// Create a move event.
    pub fn moved(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self::Moved {
            from: from.into(),
            to: to.into(),
        }
    }

    /// The primary path of the event, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Stop => None,
            Self::Sync(path) | Self::Created(path) | Self::Modified(path) | Self::Deleted(path) => {
                Some(path.as_path())
            }
            Self::Moved { from, .. } => Some(from.as_path()),
        }
    }

    /// Short name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Sync(_) => "sync",
            Self::Created(_) => "created",
            Self::Modified(_) => "modified",
            Self::Deleted(_) => "deleted",
            Self::Moved { .. } => "moved",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stop => f.write_str("stop"),
            Self::Moved { from, to } => {
                write!(f, "moved {} -> {}", from.display(), to.display())
            }
            other => match other.path() {
                Some(path) => write!(f, "{} {}", other.kind(), path.display()),
                None => f.write_str(other.kind()),
            },
        }
    }
}
