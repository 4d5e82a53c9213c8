//! Rendering the current song into user-configured text files.
//!
//! Each [`OutputTarget`] remembers the last text it wrote. Identical
//! consecutive renders never touch the file, so a host that refreshes every
//! second only causes disk writes when the visible text actually changes.
//!
//! When nothing is playing, the configured placeholder is written instead of
//! the rendered text. Log-mode targets keep an append-only history and skip
//! inactive songs entirely.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{Error, FileSystemError, Result};
use crate::song::Song;

/// Marker decoded to a single space in the placeholder.
///
/// The host's config loader trims leading and trailing whitespace, so users
/// who want padded placeholders type this marker instead.
pub const PLACEHOLDER_SPACE_MARKER: &str = "%s";

/// Renders a format template against a song.
#[cfg_attr(test, mockall::automock)]
pub trait Renderer {
    /// Produce the text for `template`.
    fn render(&self, template: &str, song: &Song) -> String;
}

/// A configured text output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputTarget {
    /// File the text is written to.
    pub path: PathBuf,
    /// Format template handed to the renderer.
    pub format: String,
    /// Append one line per change instead of overwriting.
    #[serde(default)]
    pub log_mode: bool,
    /// Last text successfully written to `path`.
    #[serde(skip)]
    pub last_output: Option<String>,
}

impl OutputTarget {
    /// Create an overwrite-mode target.
    pub fn new(path: impl Into<PathBuf>, format: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            format: format.into(),
            log_mode: false,
            last_output: None,
        }
    }

    /// Create an append-mode (log) target.
    pub fn log(path: impl Into<PathBuf>, format: impl Into<String>) -> Self {
        Self {
            log_mode: true,
            ..Self::new(path, format)
        }
    }
}

/// Replace every placeholder space marker with a single space.
#[must_use]
pub fn decode_placeholder(text: &str) -> String {
    text.replace(PLACEHOLDER_SPACE_MARKER, " ")
}

fn write_error(path: &Path, e: &std::io::Error) -> Error {
    Error::FileSystem(FileSystemError::WriteFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Write `text` to a single target unless it equals the last written text.
///
/// Returns `Ok(true)` if the file was written. On failure the target's cache
/// is left untouched so the same text is attempted again next time.
pub fn write_song(target: &mut OutputTarget, text: &str) -> Result<bool> {
    if target.last_output.as_deref() == Some(text) {
        return Ok(false);
    }

    let (mut file, content) = if target.log_mode {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&target.path)
            .map_err(|e| write_error(&target.path, &e))?;
        (file, format!("{text}\n"))
    } else {
        let file = File::create(&target.path).map_err(|e| write_error(&target.path, &e))?;
        (file, text.to_string())
    };

    file.write_all(content.as_bytes())
        .and_then(|()| file.flush())
        .map_err(|e| write_error(&target.path, &e))?;

    target.last_output = Some(text.to_string());
    Ok(true)
}

/// Writes the current song to every configured output.
#[derive(Debug, Clone, Default)]
pub struct OutputWriter {
    placeholder: String,
    targets: Vec<OutputTarget>,
}

impl OutputWriter {
    /// Create a writer for the given targets.
    pub fn new(placeholder: impl Into<String>, targets: Vec<OutputTarget>) -> Self {
        Self {
            placeholder: placeholder.into(),
            targets,
        }
    }

    /// Configured targets, in write order.
    pub fn targets(&self) -> &[OutputTarget] {
        &self.targets
    }

    /// Raw placeholder as configured (markers not decoded).
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Render and write the song to every target.
    ///
    /// Targets are processed in configured order and independently: a
    /// failure on one is logged and does not affect the others. Returns the
    /// number of files written.
    pub fn handle_outputs<R: Renderer + ?Sized>(&mut self, renderer: &R, song: &Song) -> usize {
        let mut written = 0;

        for target in &mut self.targets {
            let mut text = renderer.render(&target.format, song);

            if text.is_empty() || !song.is_active() {
                text = decode_placeholder(&self.placeholder);
            }

            // An inactive song has no business in an append log.
            if target.log_mode && !song.is_active() {
                continue;
            }

            match write_song(target, &text) {
                Ok(true) => {
                    debug!("Wrote song output to {}", target.path.display());
                    written += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    error!(
                        "Couldn't open song output file {}: {}",
                        target.path.display(),
                        e
                    );
                }
            }
        }

        written
    }
}
