//! Error types for Tunesync core operations.
//!
//! Errors are grouped by domain so callers can classify a failure without
//! matching every variant:
//!
//! - [`TransferError`]: network transfers (request, status, body stream)
//! - [`FileSystemError`]: open, rename, copy and delete failures
//! - [`ModuleError`]: the native module load sequence
//!
//! The operations that sit at the host boundary (cover and lyrics sync, output
//! writing, the compatibility gate) log these errors and report a plain
//! success flag; everything underneath propagates them with `?`.

use std::path::PathBuf;

use thiserror::Error;

use crate::compat::LoadStage;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Tunesync core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// File system operation failed.
    #[error(transparent)]
    FileSystem(#[from] FileSystemError),

    /// Remote transfer failed.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// Native module operation failed.
    #[error(transparent)]
    Module(#[from] ModuleError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// File system failures, each carrying the path involved.
#[derive(Debug, Error)]
pub enum FileSystemError {
    /// Reading a file failed.
    #[error("Failed to read {path}: {reason}")]
    ReadFailed {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// Opening or writing a file failed.
    #[error("Failed to write {path}: {reason}")]
    WriteFailed {
        /// Path that could not be written.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// Creating a directory failed.
    #[error("Failed to create directory {path}: {reason}")]
    CreateDirFailed {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// Deleting a file failed.
    #[error("Failed to delete {path}: {reason}")]
    DeleteFailed {
        /// Path that could not be deleted.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// Copying a file failed.
    #[error("Failed to copy {source_path} to {destination}: {reason}")]
    CopyFailed {
        /// Source file.
        source_path: PathBuf,
        /// Destination file.
        destination: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// Renaming a file failed.
    #[error("Failed to rename {from} to {to}: {reason}")]
    RenameFailed {
        /// Original path.
        from: PathBuf,
        /// Target path.
        to: PathBuf,
        /// Underlying reason.
        reason: String,
    },
}

/// Network transfer failures.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The destination file could not be opened for writing.
    #[error("Cannot open destination {path}: {reason}")]
    DestinationUnavailable {
        /// Destination path.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// The request could not be sent or the connection failed.
    #[error("Request to {url} failed: {reason}")]
    RequestFailed {
        /// Requested URL.
        url: String,
        /// Underlying reason.
        reason: String,
    },

    /// The server answered with a non-success status.
    #[error("Request to {url} returned HTTP {status}")]
    HttpStatus {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The body stream broke off while it was being written.
    #[error("Transfer from {url} interrupted: {reason}")]
    Interrupted {
        /// Requested URL.
        url: String,
        /// Underlying reason.
        reason: String,
    },
}

/// Native module failures.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// Native module support is not compiled in or disabled.
    #[error("Native module support is not available")]
    Unsupported,

    /// One of the load stages failed.
    #[error("Native module {stage} stage failed: {reason}")]
    StageFailed {
        /// Stage that failed.
        stage: LoadStage,
        /// Underlying reason.
        reason: String,
    },
}

impl Error {
    /// Check if this error is a "file not found" error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }

    /// Shorthand for a failed load stage.
    pub fn stage_failed(stage: LoadStage, reason: impl Into<String>) -> Self {
        Self::Module(ModuleError::StageFailed {
            stage,
            reason: reason.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::Io(io_err);
        assert!(err.is_not_found());

        let other_io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err2 = Error::Io(other_io_err);
        assert!(!err2.is_not_found());
    }

    #[test]
    fn test_file_system_error_display() {
        let err: Error = FileSystemError::RenameFailed {
            from: PathBuf::from("/covers/cover.png.tmp"),
            to: PathBuf::from("/covers/cover.png"),
            reason: "permission denied".to_string(),
        }
        .into();
        let msg = err.to_string();
        assert!(msg.contains("cover.png.tmp"));
        assert!(msg.contains("permission denied"));
        assert!(matches!(err, Error::FileSystem(_)));
    }

    #[test]
    fn test_http_status_display() {
        let err: Error = TransferError::HttpStatus {
            url: "http://example.com/cover.jpg".to_string(),
            status: 404,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Request to http://example.com/cover.jpg returned HTTP 404"
        );
    }

    #[test]
    fn test_module_error_display() {
        let err = Error::stage_failed(LoadStage::ResolveFunctions, "missing libvlc_new");
        assert!(matches!(
            err,
            Error::Module(ModuleError::StageFailed {
                stage: LoadStage::ResolveFunctions,
                ..
            })
        ));
        assert!(err.to_string().contains("resolve-functions"));

        let unsupported = Error::Module(ModuleError::Unsupported);
        assert_eq!(
            unsupported.to_string(),
            "Native module support is not available"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
