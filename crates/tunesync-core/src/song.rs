//! The "currently playing" snapshot handed to the core each refresh cycle.
//!
//! A [`Song`] is built by an external poller and is read-only here. Which
//! optional fields are populated is described by its [`Capabilities`].

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, FileSystemError, Result};

/// Bitmask of the optional song fields that are populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capabilities(u32);

impl Capabilities {
    /// Song title is set.
    pub const TITLE: Self = Self(1 << 0);
    /// Artist list is set.
    pub const ARTISTS: Self = Self(1 << 1);
    /// Album name is set.
    pub const ALBUM: Self = Self(1 << 2);
    /// Cover URL is set.
    pub const COVER: Self = Self(1 << 3);
    /// Lyrics URL is set.
    pub const LYRICS: Self = Self(1 << 4);
    /// Playback progress is set.
    pub const PROGRESS: Self = Self(1 << 5);

    /// No fields populated.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Build from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether every flag in `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Combine two sets of flags.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Set the flags in `other`.
    pub const fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl std::ops::BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Playback state of the song.
///
/// The variants are ordered: everything from [`PlaybackState::Paused`] on
/// counts as "not active".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// Actively playing.
    Playing,
    /// Paused.
    Paused,
    /// Stopped.
    Stopped,
    /// No player or unknown state.
    #[default]
    Unknown,
}

impl PlaybackState {
    /// Only `Playing` is active.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Playing)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Playing => write!(f, "playing"),
            Self::Paused => write!(f, "paused"),
            Self::Stopped => write!(f, "stopped"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Snapshot of the currently playing song.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Song {
    /// Which optional fields are populated.
    #[serde(default)]
    pub capabilities: Capabilities,
    /// Playback state.
    #[serde(default)]
    pub state: PlaybackState,
    /// Song title.
    #[serde(default)]
    pub title: String,
    /// Artists, in credit order.
    #[serde(default)]
    pub artists: Vec<String>,
    /// Album name.
    #[serde(default)]
    pub album: String,
    /// Remote cover image URL.
    #[serde(default)]
    pub cover_url: String,
    /// Remote lyrics URL.
    #[serde(default)]
    pub lyrics_url: String,
}

impl Song {
    /// Create an empty song in the given state.
    #[must_use]
    pub fn new(state: PlaybackState) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }

    /// Set the title and its capability flag.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self.capabilities.insert(Capabilities::TITLE);
        self
    }

    /// Set the artists and their capability flag.
    #[must_use]
    pub fn with_artists<I, S>(mut self, artists: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.artists = artists.into_iter().map(Into::into).collect();
        self.capabilities.insert(Capabilities::ARTISTS);
        self
    }

    /// Set the album and its capability flag.
    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = album.into();
        self.capabilities.insert(Capabilities::ALBUM);
        self
    }

    /// Set the cover URL and its capability flag.
    #[must_use]
    pub fn with_cover(mut self, url: impl Into<String>) -> Self {
        self.cover_url = url.into();
        self.capabilities.insert(Capabilities::COVER);
        self
    }

    /// Set the lyrics URL and its capability flag.
    #[must_use]
    pub fn with_lyrics(mut self, url: impl Into<String>) -> Self {
        self.lyrics_url = url.into();
        self.capabilities.insert(Capabilities::LYRICS);
        self
    }

    /// Whether the song is actively playing.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Cover flag set and a URL present.
    #[must_use]
    pub fn has_cover(&self) -> bool {
        self.capabilities.contains(Capabilities::COVER) && !self.cover_url.is_empty()
    }

    /// Lyrics flag set and a URL present.
    #[must_use]
    pub fn has_lyrics(&self) -> bool {
        self.capabilities.contains(Capabilities::LYRICS) && !self.lyrics_url.is_empty()
    }

    /// Read a JSON snapshot written by an external poller.
    pub fn load_snapshot(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Io(e)
            } else {
                Error::FileSystem(FileSystemError::ReadFailed {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })
            }
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}
