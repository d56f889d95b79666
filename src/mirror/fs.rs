//! Filesystem seam for the mirror writer
//!
//! The writer only needs a handful of primitives, so they sit behind a small
//! trait. [`LocalFs`] is the real implementation; tests and embedders can
//! supply their own.

use std::io;
use std::path::Path;

/// Filesystem operations the mirror writer relies on
pub trait MirrorFs: Send + Sync {
    /// Creates a directory and all of its parents; succeeds if it exists
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Writes `contents` to `path`, replacing any existing file
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;

    /// Removes a directory tree
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;
}

/// [`MirrorFs`] backed by `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl MirrorFs for LocalFs {
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        std::fs::write(path, contents)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_dir_all(path)
    }
}
