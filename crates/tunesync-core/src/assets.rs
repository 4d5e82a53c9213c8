//! Cover art and lyrics synchronization.
//!
//! The cover is downloaded into a `.tmp` sibling of the live path and only
//! renamed over the live file once the transfer has completed, so readers
//! never see a half-written image. The live cover is deleted before the
//! rename: a failed download leaves no cover rather than a stale one, and the
//! caller is expected to follow up with [`AssetSync::reset_cover`].
//!
//! Lyrics are best-effort text and are fetched straight into the live path.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::fetch::Fetcher;
use crate::fs::{FileSystem, RealFileSystem};
use crate::song::Song;

/// Suffix of the temporary cover download.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Locations of the synced asset files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssetPaths {
    /// Live cover image read by the host.
    pub cover: PathBuf,
    /// Image copied over the live cover when no cover is available.
    pub cover_placeholder: PathBuf,
    /// Live lyrics file.
    pub lyrics: PathBuf,
}

impl Default for AssetPaths {
    fn default() -> Self {
        let dir = default_asset_directory();
        Self {
            cover: dir.join("cover.png"),
            cover_placeholder: dir.join("placeholder.png"),
            lyrics: dir.join("lyrics.txt"),
        }
    }
}

impl AssetPaths {
    /// Paths for `cover.png`, `placeholder.png` and `lyrics.txt` inside `dir`.
    #[must_use]
    pub fn in_directory(dir: &Path) -> Self {
        Self {
            cover: dir.join("cover.png"),
            cover_placeholder: dir.join("placeholder.png"),
            lyrics: dir.join("lyrics.txt"),
        }
    }

    /// The `.tmp` sibling used while a cover is downloading.
    #[must_use]
    pub fn temp_cover_path(&self) -> PathBuf {
        let mut name = OsString::from(self.cover.as_os_str());
        name.push(TEMP_SUFFIX);
        PathBuf::from(name)
    }
}

/// Get the default directory for synced assets.
#[must_use]
pub fn default_asset_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tunesync")
}

/// What the live cover currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CoverSource {
    /// Nothing synced yet.
    #[default]
    Unknown,
    /// Last sync attempt was for this URL.
    Remote(String),
    /// The placeholder was copied in.
    Placeholder,
}

/// Keeps the live cover and lyrics files in step with the current song.
pub struct AssetSync<F, S = RealFileSystem> {
    paths: AssetPaths,
    fetcher: F,
    fs: S,
    last_lyrics: Option<String>,
    cover: CoverSource,
}

impl<F: Fetcher> AssetSync<F, RealFileSystem> {
    /// Create an asset sync working on the real file system.
    pub const fn new(paths: AssetPaths, fetcher: F) -> Self {
        Self::with_file_system(paths, fetcher, RealFileSystem)
    }
}

impl<F: Fetcher, S: FileSystem> AssetSync<F, S> {
    /// Create an asset sync with a custom file system.
    pub const fn with_file_system(paths: AssetPaths, fetcher: F, fs: S) -> Self {
        Self {
            paths,
            fetcher,
            fs,
            last_lyrics: None,
            cover: CoverSource::Unknown,
        }
    }

    /// Configured asset paths.
    pub const fn paths(&self) -> &AssetPaths {
        &self.paths
    }

    /// Lyrics URL of the last lyrics sync, if any.
    pub fn last_lyrics(&self) -> Option<&str> {
        self.last_lyrics.as_deref()
    }

    /// What the live cover was last set from.
    pub const fn cover_source(&self) -> &CoverSource {
        &self.cover
    }

    /// Drop the change-detection state so the next update syncs everything.
    pub fn forget(&mut self) {
        self.last_lyrics = None;
        self.cover = CoverSource::Unknown;
    }

    /// Download the song's cover and swap it in for the live cover.
    ///
    /// Returns `false` if the download or the rename failed. In both cases the
    /// live cover file no longer exists.
    pub fn sync_cover(&self, song: &Song) -> bool {
        let tmp = self.paths.temp_cover_path();
        let fetched = self.fetcher.fetch(&song.cover_url, &tmp).is_ok();

        // Replace cover only after the download is done
        if let Err(e) = self.fs.remove_if_exists(&self.paths.cover) {
            warn!("Couldn't remove current cover: {}", e);
        }

        if !fetched {
            if let Err(e) = self.fs.remove_if_exists(&tmp) {
                debug!("Couldn't remove partial cover download: {}", e);
            }
            return false;
        }

        if let Err(e) = self.fs.rename(&tmp, &self.paths.cover) {
            error!("Couldn't rename temporary cover file: {}", e);
            return false;
        }

        debug!("Updated cover at {}", self.paths.cover.display());
        true
    }

    /// Replace the live cover with a copy of the placeholder image.
    pub fn reset_cover(&self) -> bool {
        if let Err(e) = self.fs.remove_if_exists(&self.paths.cover) {
            warn!("Couldn't remove current cover: {}", e);
        }

        match self
            .fs
            .copy(&self.paths.cover_placeholder, &self.paths.cover)
        {
            Ok(_) => true,
            Err(e) => {
                error!("Couldn't copy placeholder cover: {}", e);
                false
            }
        }
    }

    /// Download the song's lyrics if they changed since the last sync.
    ///
    /// Returns `false` only when a download was attempted and failed. The
    /// remembered value is updated before the download and is not rolled
    /// back on failure.
    pub fn sync_lyrics(&mut self, song: &Song) -> bool {
        if !song.has_lyrics() || self.last_lyrics.as_deref() == Some(song.lyrics_url.as_str()) {
            return true;
        }

        self.last_lyrics = Some(song.lyrics_url.clone());
        match self.fetcher.fetch(&song.lyrics_url, &self.paths.lyrics) {
            Ok(_) => true,
            Err(e) => {
                error!(
                    "Couldn't download lyrics from '{}' to '{}': {}",
                    song.lyrics_url,
                    self.paths.lyrics.display(),
                    e
                );
                false
            }
        }
    }

    /// Per-cycle entry point: sync lyrics, then the cover.
    ///
    /// The cover is only fetched when its URL changed. A failed fetch, or a
    /// song without a cover, falls back to the placeholder once per change.
    pub fn update(&mut self, song: &Song) {
        self.sync_lyrics(song);

        if song.has_cover() {
            if matches!(&self.cover, CoverSource::Remote(url) if *url == song.cover_url) {
                return;
            }
            self.cover = CoverSource::Remote(song.cover_url.clone());
            if self.sync_cover(song) {
                info!("Cover updated from {}", song.cover_url);
            } else {
                warn!("Cover download failed, using placeholder");
                self.reset_cover();
            }
        } else if self.cover != CoverSource::Placeholder {
            self.cover = CoverSource::Placeholder;
            self.reset_cover();
        }
    }
}
