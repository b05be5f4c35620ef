//! Shared-module loader.
//!
//! Thin wrapper over `libloading` that opens a module with immediate symbol
//! binding and resolves exports into typed [`EntryPoint`]s. The signature type
//! of an entry point is chosen by the consumer (see `backend::ffi`), so the
//! loader itself never needs to know what a symbol is.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use libloading::Library;
use log::{debug, warn};

use crate::error::BindingError;

/// Platform file name for a module stem: `libbass.so`, `bass.dll`, `libbass.dylib`.
pub fn module_file_name(stem: &str) -> OsString {
    libloading::library_filename(stem)
}

/// A loaded shared module.
///
/// Dropping or [`unload`](Module::unload)ing the module invalidates every
/// [`EntryPoint`] resolved from it. Owners keep the module next to the
/// entry points they resolved and release both together.
pub struct Module {
    path: PathBuf,
    library: Library,
}

impl Module {
    /// Open the module at `path`, binding all of its symbols immediately.
    ///
    /// Either a usable module is returned or nothing is retained.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BindingError> {
        let path = path.as_ref();
        let library = open_immediate(path).map_err(|err| BindingError::ModuleNotFound {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;

        debug!("[Loader] Loaded module {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            library,
        })
    }

    /// Path the module was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve an exported symbol into a typed entry point.
    ///
    /// # Safety
    ///
    /// `F` must be a function pointer type matching the export's real
    /// signature and calling convention. The returned entry point must not be
    /// called after this module is unloaded.
    pub unsafe fn resolve<F: Copy>(&self, symbol: &'static str) -> Result<EntryPoint<F>, BindingError> {
        let resolved = self
            .library
            .get::<F>(symbol.as_bytes())
            .map_err(|_| BindingError::SymbolNotFound {
                symbol: symbol.to_string(),
                path: self.path.clone(),
            })?;

        Ok(EntryPoint {
            symbol,
            func: *resolved,
        })
    }

    /// Release the module.
    pub fn unload(self) {
        let path = self.path;
        match self.library.close() {
            Ok(()) => debug!("[Loader] Unloaded module {}", path.display()),
            Err(err) => warn!("[Loader] Failed to unload {}: {}", path.display(), err),
        }
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module").field("path", &self.path).finish()
    }
}

#[cfg(unix)]
fn open_immediate(path: &Path) -> Result<Library, libloading::Error> {
    use libloading::os::unix::{Library as UnixLibrary, RTLD_LOCAL, RTLD_NOW};

    // SAFETY: running a module's initializers is the point of loading it; the
    // backend and its plugins are trusted native code.
    unsafe { UnixLibrary::open(Some(path), RTLD_NOW | RTLD_LOCAL) }.map(Library::from)
}

#[cfg(not(unix))]
fn open_immediate(path: &Path) -> Result<Library, libloading::Error> {
    // SAFETY: see the unix variant. Windows always binds imports at load time.
    unsafe { Library::new(path) }
}

/// A typed callable reference to one exported function.
///
/// `F` is a plain function pointer type, so invoking `get()` costs nothing
/// beyond the indirect call.
#[derive(Clone, Copy)]
pub struct EntryPoint<F: Copy> {
    symbol: &'static str,
    func: F,
}

impl<F: Copy> EntryPoint<F> {
    /// Wrap a function that is already linked into the binary.
    pub fn linked(symbol: &'static str, func: F) -> Self {
        Self { symbol, func }
    }

    pub fn symbol(&self) -> &'static str {
        self.symbol
    }

    pub fn get(&self) -> F {
        self.func
    }
}

impl<F: Copy> fmt::Debug for EntryPoint<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntryPoint").field(&self.symbol).finish()
    }
}
