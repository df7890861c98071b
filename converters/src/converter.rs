//! The converter capability.

use std::path::Path;

use crate::error::Result;

/// Turns one source file into plain text.
///
/// Implementations must be safe to call from the dispatcher thread and
/// should not retain state between calls; the same converter instance is
/// shared by every file with a matching extension.
pub trait Converter: Send + Sync {
    /// Extract the text of the file at `path`.
    fn convert(&self, path: &Path) -> Result<String>;
}

impl<F> Converter for F
where
    F: Fn(&Path) -> Result<String> + Send + Sync,
{
    fn convert(&self, path: &Path) -> Result<String> {
        self(path)
    }
}
