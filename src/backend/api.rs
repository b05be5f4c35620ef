//! Table of backend entry points.
//!
//! Built once per binding, either by resolving symbols out of a loaded
//! [`Module`] or from link-time symbols. After construction nothing here
//! touches the loader again.

use std::path::Path;
use std::ptr;

use crate::error::BindingError;
use crate::loader::{EntryPoint, Module};

use super::ffi::{self, *};
use super::{ChannelState, DeviceParams, PluginHandle, StreamHandle};

/// Symbols every binding must provide, in resolution order.
pub const REQUIRED_SYMBOLS: [&str; 13] = [
    "BASS_Init",
    "BASS_Free",
    "BASS_PluginLoad",
    "BASS_PluginFree",
    "BASS_StreamCreateFile",
    "BASS_StreamFree",
    "BASS_ChannelPlay",
    "BASS_ChannelPause",
    "BASS_ChannelStop",
    "BASS_ChannelIsActive",
    "BASS_ChannelFlags",
    "BASS_SetVolume",
    "BASS_ErrorGetCode",
];

/// Resolved backend entry points.
///
/// Invariant: when built by [`BackendApi::resolve`], the module the table was
/// resolved from outlives the table. `DynamicBackend` stores both in one
/// struct and drops them together.
pub(crate) struct BackendApi {
    init: EntryPoint<InitFn>,
    free: EntryPoint<FreeFn>,
    plugin_load: EntryPoint<PluginLoadFn>,
    plugin_free: EntryPoint<PluginFreeFn>,
    stream_create_file: EntryPoint<StreamCreateFileFn>,
    stream_free: EntryPoint<StreamFreeFn>,
    channel_play: EntryPoint<ChannelPlayFn>,
    channel_pause: EntryPoint<ChannelPauseFn>,
    channel_stop: EntryPoint<ChannelStopFn>,
    channel_is_active: EntryPoint<ChannelIsActiveFn>,
    channel_flags: EntryPoint<ChannelFlagsFn>,
    set_volume: EntryPoint<SetVolumeFn>,
    error_get_code: EntryPoint<ErrorGetCodeFn>,
}

impl BackendApi {
    /// Resolve every required entry point, failing on the first missing one.
    ///
    /// # Safety
    ///
    /// `module` must be a BASS 2.4 compatible library and must outlive the
    /// returned table.
    pub(crate) unsafe fn resolve(module: &Module) -> Result<Self, BindingError> {
        Ok(Self {
            init: module.resolve("BASS_Init")?,
            free: module.resolve("BASS_Free")?,
            plugin_load: module.resolve("BASS_PluginLoad")?,
            plugin_free: module.resolve("BASS_PluginFree")?,
            stream_create_file: module.resolve("BASS_StreamCreateFile")?,
            stream_free: module.resolve("BASS_StreamFree")?,
            channel_play: module.resolve("BASS_ChannelPlay")?,
            channel_pause: module.resolve("BASS_ChannelPause")?,
            channel_stop: module.resolve("BASS_ChannelStop")?,
            channel_is_active: module.resolve("BASS_ChannelIsActive")?,
            channel_flags: module.resolve("BASS_ChannelFlags")?,
            set_volume: module.resolve("BASS_SetVolume")?,
            error_get_code: module.resolve("BASS_ErrorGetCode")?,
        })
    }

    /// Table over the symbols linked into this binary.
    #[cfg(feature = "static-backend")]
    pub(crate) fn linked() -> Self {
        Self {
            init: EntryPoint::linked("BASS_Init", ffi::BASS_Init),
            free: EntryPoint::linked("BASS_Free", ffi::BASS_Free),
            plugin_load: EntryPoint::linked("BASS_PluginLoad", ffi::BASS_PluginLoad),
            plugin_free: EntryPoint::linked("BASS_PluginFree", ffi::BASS_PluginFree),
            stream_create_file: EntryPoint::linked(
                "BASS_StreamCreateFile",
                ffi::BASS_StreamCreateFile,
            ),
            stream_free: EntryPoint::linked("BASS_StreamFree", ffi::BASS_StreamFree),
            channel_play: EntryPoint::linked("BASS_ChannelPlay", ffi::BASS_ChannelPlay),
            channel_pause: EntryPoint::linked("BASS_ChannelPause", ffi::BASS_ChannelPause),
            channel_stop: EntryPoint::linked("BASS_ChannelStop", ffi::BASS_ChannelStop),
            channel_is_active: EntryPoint::linked(
                "BASS_ChannelIsActive",
                ffi::BASS_ChannelIsActive,
            ),
            channel_flags: EntryPoint::linked("BASS_ChannelFlags", ffi::BASS_ChannelFlags),
            set_volume: EntryPoint::linked("BASS_SetVolume", ffi::BASS_SetVolume),
            error_get_code: EntryPoint::linked("BASS_ErrorGetCode", ffi::BASS_ErrorGetCode),
        }
    }

    // SAFETY (all wrappers below): the table invariant keeps every pointer
    // valid, and each call passes arguments matching the BASS 2.4 ABI.

    pub(crate) fn init(&self, params: &DeviceParams) -> bool {
        let window = params
            .window
            .map_or(ptr::null_mut(), |window| window.as_ptr());
        let ok = unsafe {
            (self.init.get())(
                params.device,
                params.sample_rate,
                params.flags,
                window,
                ptr::null(),
            )
        };
        ffi::to_bool(ok)
    }

    pub(crate) fn free(&self) -> bool {
        ffi::to_bool(unsafe { (self.free.get())() })
    }

    pub(crate) fn plugin_load(&self, path: &Path) -> Result<PluginHandle, BindingError> {
        let arg = PathArg::new(path)?;
        let raw = unsafe { (self.plugin_load.get())(arg.as_ptr(), arg.flags()) };
        PluginHandle::from_raw(raw).ok_or_else(|| BindingError::PluginLoadFailed {
            path: path.to_path_buf(),
            backend_code: self.error_get_code(),
        })
    }

    pub(crate) fn plugin_free(&self, plugin: PluginHandle) -> bool {
        ffi::to_bool(unsafe { (self.plugin_free.get())(plugin.raw()) })
    }

    pub(crate) fn stream_create_file(
        &self,
        path: &Path,
        flags: DWORD,
    ) -> Result<StreamHandle, BindingError> {
        let arg = PathArg::new(path)?;
        let raw = unsafe {
            (self.stream_create_file.get())(FALSE, arg.as_ptr(), 0, 0, flags | arg.flags())
        };
        StreamHandle::from_raw(raw).ok_or_else(|| BindingError::StreamCreateFailed {
            path: path.to_path_buf(),
            backend_code: self.error_get_code(),
        })
    }

    pub(crate) fn stream_free(&self, stream: StreamHandle) -> bool {
        ffi::to_bool(unsafe { (self.stream_free.get())(stream.raw()) })
    }

    pub(crate) fn channel_play(&self, stream: StreamHandle, restart: bool) -> bool {
        let restart = if restart { TRUE } else { FALSE };
        ffi::to_bool(unsafe { (self.channel_play.get())(stream.raw(), restart) })
    }

    pub(crate) fn channel_pause(&self, stream: StreamHandle) -> bool {
        ffi::to_bool(unsafe { (self.channel_pause.get())(stream.raw()) })
    }

    pub(crate) fn channel_stop(&self, stream: StreamHandle) -> bool {
        ffi::to_bool(unsafe { (self.channel_stop.get())(stream.raw()) })
    }

    pub(crate) fn channel_is_active(&self, stream: StreamHandle) -> ChannelState {
        ChannelState::from_raw(unsafe { (self.channel_is_active.get())(stream.raw()) })
    }

    pub(crate) fn channel_flags(
        &self,
        stream: StreamHandle,
        flags: DWORD,
        mask: DWORD,
    ) -> Option<DWORD> {
        let result = unsafe { (self.channel_flags.get())(stream.raw(), flags, mask) };
        (result != BASS_FLAGS_ERROR).then_some(result)
    }

    pub(crate) fn set_volume(&self, level: f32) -> bool {
        ffi::to_bool(unsafe { (self.set_volume.get())(level) })
    }

    pub(crate) fn error_get_code(&self) -> i32 {
        unsafe { (self.error_get_code.get())() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_symbols_are_unique() {
        let mut names = REQUIRED_SYMBOLS.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), REQUIRED_SYMBOLS.len());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_resolve_against_non_bass_module_fails() {
        let module = Module::load("libc.so.6").expect("system libc should load");
        match unsafe { BackendApi::resolve(&module) } {
            Err(BindingError::SymbolNotFound { symbol, .. }) => {
                assert_eq!(symbol, "BASS_Init");
            }
            Err(other) => panic!("Expected SymbolNotFound, got {:?}", other),
            Ok(_) => panic!("libc should not export BASS entry points"),
        }
        module.unload();
    }
}
