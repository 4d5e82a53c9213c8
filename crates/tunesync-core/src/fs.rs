//! File system abstraction for the asset replacement protocol.
//!
//! Cover replacement is a sequence of delete, rename and copy calls whose
//! individual failures matter. Routing them through the [`FileSystem`] trait
//! lets tests inject a failing rename without staging real permission errors.
//!
//! # Example
//!
//! ```rust,ignore
//! use tunesync_core::fs::{FileSystem, RealFileSystem};
//!
//! fn swap_in<F: FileSystem>(fs: &F, tmp: &Path, live: &Path) -> Result<()> {
//!     fs.remove_if_exists(live)?;
//!     fs.rename(tmp, live)
//! }
//! ```

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{Error, FileSystemError, Result};

/// Converts an I/O error for delete operations.
fn delete_error(path: &Path, e: io::Error) -> Error {
    Error::FileSystem(FileSystemError::DeleteFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Converts an I/O error for copy operations.
fn copy_error(src: &Path, dst: &Path, e: io::Error) -> Error {
    Error::FileSystem(FileSystemError::CopyFailed {
        source_path: src.to_path_buf(),
        destination: dst.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Converts an I/O error for rename operations.
fn rename_error(from: &Path, to: &Path, e: io::Error) -> Error {
    Error::FileSystem(FileSystemError::RenameFailed {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Abstraction over the file operations used for asset replacement.
#[cfg_attr(test, mockall::automock)]
pub trait FileSystem: Send + Sync {
    /// Remove a file. Returns `false` if there was nothing to remove.
    fn remove_if_exists(&self, path: &Path) -> Result<bool>;

    /// Rename/move a file, replacing the destination.
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Copy a file from src to dst.
    fn copy(&self, src: &Path, dst: &Path) -> Result<u64>;
}

/// Real file system implementation using std::fs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFileSystem;

impl RealFileSystem {
    /// Create a new real file system instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFileSystem {
    fn remove_if_exists(&self, path: &Path) -> Result<bool> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(delete_error(path, e)),
        }
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to).map_err(|e| rename_error(from, to, e))
    }

    fn copy(&self, src: &Path, dst: &Path) -> Result<u64> {
        fs::copy(src, dst).map_err(|e| copy_error(src, dst, e))
    }
}
