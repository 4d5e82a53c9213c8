//! libVLC loader.
//!
//! Opens the libVLC shared library at runtime, resolves the entry points
//! needed to create and release an instance, and owns that instance until
//! [`NativeModule::unload`].
#![allow(unsafe_code)]

use std::ffi::{CStr, OsString, c_char, c_int, c_void};
use std::path::PathBuf;
use std::ptr::NonNull;

use libloading::{Library, Symbol};
use tracing::{debug, info, warn};

use super::module::{LoadStage, NativeModule};
use crate::error::{Error, Result};

type LibvlcNew = unsafe extern "C" fn(c_int, *const *const c_char) -> *mut c_void;
type LibvlcRelease = unsafe extern "C" fn(*mut c_void);
type LibvlcGetVersion = unsafe extern "C" fn() -> *const c_char;

#[derive(Clone, Copy)]
struct VlcFunctions {
    new: LibvlcNew,
    release: LibvlcRelease,
    get_version: LibvlcGetVersion,
}

/// [`NativeModule`] backed by a dynamically loaded libVLC.
pub struct VlcModule {
    library_path: OsString,
    library: Option<Library>,
    functions: Option<VlcFunctions>,
    instance: Option<NonNull<c_void>>,
}

// SAFETY: the instance pointer is only touched through `&mut self`, and
// libVLC instances may be released from any thread.
unsafe impl Send for VlcModule {}

impl VlcModule {
    /// Create a loader for `library_path`, or the platform libVLC name.
    #[must_use]
    pub fn new(library_path: Option<PathBuf>) -> Self {
        let library_path = library_path
            .map_or_else(|| libloading::library_filename("vlc"), PathBuf::into_os_string);
        Self {
            library_path,
            library: None,
            functions: None,
            instance: None,
        }
    }

    /// Whether an instance is currently alive.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.instance.is_some()
    }

    fn symbol<T: Copy>(library: &Library, name: &[u8]) -> Result<T> {
        // SAFETY: the requested type matches the libVLC C prototype of `name`.
        let symbol: Symbol<'_, T> = unsafe { library.get(name) }.map_err(|e| {
            Error::stage_failed(LoadStage::ResolveFunctions, e.to_string())
        })?;
        Ok(*symbol)
    }
}

impl NativeModule for VlcModule {
    fn load_library(&mut self) -> Result<()> {
        if self.library.is_some() {
            return Ok(());
        }
        // SAFETY: loading libVLC runs its initializers, which have no
        // preconditions on the caller.
        let library = unsafe { Library::new(&self.library_path) }
            .map_err(|e| Error::stage_failed(LoadStage::LoadLibrary, e.to_string()))?;
        debug!("Opened {}", self.library_path.to_string_lossy());
        self.library = Some(library);
        Ok(())
    }

    fn resolve_functions(&mut self) -> Result<()> {
        let library = self.library.as_ref().ok_or_else(|| {
            Error::stage_failed(LoadStage::ResolveFunctions, "library is not loaded")
        })?;
        self.functions = Some(VlcFunctions {
            new: Self::symbol(library, b"libvlc_new\0")?,
            release: Self::symbol(library, b"libvlc_release\0")?,
            get_version: Self::symbol(library, b"libvlc_get_version\0")?,
        });
        Ok(())
    }

    fn initialize(&mut self) -> Result<()> {
        let functions = self.functions.ok_or_else(|| {
            Error::stage_failed(LoadStage::Initialize, "functions are not resolved")
        })?;
        if self.instance.is_some() {
            return Ok(());
        }

        // SAFETY: zero arguments with a null argv is a valid libvlc_new call.
        let raw = unsafe { (functions.new)(0, std::ptr::null()) };
        let instance = NonNull::new(raw).ok_or_else(|| {
            Error::stage_failed(LoadStage::Initialize, "libvlc_new returned no instance")
        })?;
        self.instance = Some(instance);

        // SAFETY: libvlc_get_version returns a static NUL-terminated string.
        let version = unsafe { CStr::from_ptr((functions.get_version)()) };
        info!("libVLC {} initialized", version.to_string_lossy());
        Ok(())
    }

    fn unload(&mut self) {
        if let (Some(instance), Some(functions)) = (self.instance.take(), self.functions) {
            // SAFETY: the instance came from libvlc_new of the still-loaded library.
            unsafe { (functions.release)(instance.as_ptr()) };
        }
        self.functions = None;
        if let Some(library) = self.library.take()
            && let Err(e) = library.close()
        {
            warn!("Couldn't close libVLC: {}", e);
        }
    }
}

impl Drop for VlcModule {
    fn drop(&mut self) {
        self.unload();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::ModuleError;

    #[test]
    fn test_missing_library_fails_first_stage() {
        let mut module = VlcModule::new(Some(PathBuf::from("/nonexistent/libvlc.so")));
        let err = module.load_library().unwrap_err();
        assert!(matches!(
            err,
            Error::Module(ModuleError::StageFailed {
                stage: LoadStage::LoadLibrary,
                ..
            })
        ));
        module.unload();
        assert!(!module.is_initialized());
    }

    #[test]
    fn test_stages_out_of_order_fail() {
        let mut module = VlcModule::new(None);
        assert!(module.resolve_functions().is_err());
        assert!(module.initialize().is_err());
    }
}
