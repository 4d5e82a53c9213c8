//! `Tunesync` Core Library
//!
//! This crate keeps the files a streaming host reads in sync with the song
//! that is currently playing:
//! - Cover art downloaded atomically next to a placeholder fallback
//! - Lyrics downloaded once per song
//! - Text outputs rendered from templates, written only when they change
//! - A version gate for the optional native module
//! - Application configuration management
//!
//! The core is synchronous. Callers feed it a [`Song`] snapshot on every
//! refresh and get booleans or counts back; failures are logged, never
//! propagated as panics.
//!
//! # Error Handling
//!
//! Fallible building blocks return [`Result`] with the typed [`Error`] from
//! the [`error`] module.
//!
//! ```rust,ignore
//! use tunesync_core::{AssetPaths, AssetSync, HttpFetcher, Result, Song};
//!
//! fn refresh(sync: &mut AssetSync<HttpFetcher>, song: &Song) -> Result<()> {
//!     sync.update(song);
//!     Ok(())
//! }
//! ```

pub mod assets;
pub mod compat;
pub mod config;
pub mod error;
pub mod fetch;
pub mod format;
pub mod fs;
pub mod output;
pub mod song;

pub use assets::{AssetPaths, AssetSync, CoverSource, TEMP_SUFFIX, default_asset_directory};
pub use compat::{
    ApiVersion, CompatibilityDecision, CompatibilityGate, CompatibilityPrompt,
    DECISION_SCHEMA_VERSION, DecisionStore, GateOutcome, LoadStage, ModuleState, NativeModule,
    NativeModuleConfig, NoopModule, native_module,
};
pub use config::{
    AppConfig, ConfigManager, DEFAULT_REFRESH_INTERVAL_MS, DEFAULT_TARGET_API_VERSION,
};
pub use error::{Error, FileSystemError, ModuleError, Result, TransferError};
pub use fetch::{Fetcher, HttpFetcher, fetch_to};
pub use format::{ARTIST_SEPARATOR, TemplateRenderer};
pub use fs::{FileSystem, RealFileSystem};
pub use output::{
    OutputTarget, OutputWriter, PLACEHOLDER_SPACE_MARKER, Renderer, decode_placeholder,
    write_song,
};
pub use song::{Capabilities, PlaybackState, Song};
