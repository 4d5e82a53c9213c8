//! The optional native module behind the compatibility gate.
//!
//! [`NativeModule`] is the capability interface: the gate drives its three
//! load stages and its teardown without knowing whether a real library sits
//! behind it. [`native_module`] picks the implementation from the build
//! features and the configuration.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, ModuleError, Result};

/// Stages of the native module load sequence, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadStage {
    /// Open the shared library.
    LoadLibrary,
    /// Resolve the required symbols.
    ResolveFunctions,
    /// Create the module's runtime instance.
    Initialize,
}

impl LoadStage {
    /// All stages in execution order.
    pub const ALL: [Self; 3] = [Self::LoadLibrary, Self::ResolveFunctions, Self::Initialize];
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadLibrary => write!(f, "load-library"),
            Self::ResolveFunctions => write!(f, "resolve-functions"),
            Self::Initialize => write!(f, "initialize"),
        }
    }
}

/// A dynamically loaded native add-on.
///
/// The stages are called in [`LoadStage::ALL`] order and stop at the first
/// failure. `unload` must release whatever the completed stages acquired and
/// must be safe to call in any state.
#[cfg_attr(test, mockall::automock)]
pub trait NativeModule: Send {
    /// Whether this build can load the module at all.
    fn is_available(&self) -> bool {
        true
    }

    /// Open the shared library.
    fn load_library(&mut self) -> Result<()>;

    /// Resolve the functions the module needs.
    fn resolve_functions(&mut self) -> Result<()>;

    /// Initialize the module.
    fn initialize(&mut self) -> Result<()>;

    /// Release everything acquired by the load stages.
    fn unload(&mut self);
}

/// Stand-in used when native module support is not available.
///
/// Every load stage fails with [`ModuleError::Unsupported`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopModule;

impl NativeModule for NoopModule {
    fn is_available(&self) -> bool {
        false
    }

    fn load_library(&mut self) -> Result<()> {
        Err(Error::Module(ModuleError::Unsupported))
    }

    fn resolve_functions(&mut self) -> Result<()> {
        Err(Error::Module(ModuleError::Unsupported))
    }

    fn initialize(&mut self) -> Result<()> {
        Err(Error::Module(ModuleError::Unsupported))
    }

    fn unload(&mut self) {}
}

/// Native module settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NativeModuleConfig {
    /// Whether to try loading the native module at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Explicit library path. Uses the platform library name when unset.
    #[serde(default)]
    pub library_path: Option<PathBuf>,
}

const fn default_true() -> bool {
    true
}

impl Default for NativeModuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            library_path: None,
        }
    }
}

/// Pick the native module implementation for this build and configuration.
#[must_use]
pub fn native_module(config: &NativeModuleConfig) -> Box<dyn NativeModule> {
    if !config.enabled {
        return Box::new(NoopModule);
    }

    #[cfg(feature = "vlc")]
    {
        Box::new(super::vlc::VlcModule::new(config.library_path.clone()))
    }

    #[cfg(not(feature = "vlc"))]
    {
        tracing::warn!("Native module support was not compiled in (enable the `vlc` feature)");
        Box::new(NoopModule)
    }
}
