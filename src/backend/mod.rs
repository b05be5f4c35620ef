//! Backend bindings.
//!
//! [`AudioBackend`] is the uniform surface the rest of the crate drives. It is
//! implemented by a dynamic binding (module loaded and resolved at runtime), a
//! static binding (link-time symbols, `static-backend` feature) and an
//! in-memory stub used by tests and the CLI dry-run mode.

use std::ffi::c_void;
use std::fmt;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use crate::config::{BackendConfig, BindingMode};
use crate::error::BindingError;

mod api;
pub mod ffi;

mod dynamic;
pub use dynamic::DynamicBackend;

#[cfg(feature = "static-backend")]
mod linked;
#[cfg(feature = "static-backend")]
pub use linked::LinkedBackend;

mod desktop_stub;
pub use desktop_stub::{BackendCall, DesktopStubBackend};

pub use api::REQUIRED_SYMBOLS;

/// Handle of an open stream (`HSTREAM`). Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamHandle(u32);

impl StreamHandle {
    pub fn from_raw(raw: u32) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Handle of a loaded codec plugin (`HPLUGIN`). Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PluginHandle(u32);

impl PluginHandle {
    pub fn from_raw(raw: u32) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Channel activity as reported by `BASS_ChannelIsActive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Stopped,
    Playing,
    Stalled,
    Paused,
    PausedDevice,
}

impl ChannelState {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            ffi::BASS_ACTIVE_PLAYING => ChannelState::Playing,
            ffi::BASS_ACTIVE_STALLED => ChannelState::Stalled,
            ffi::BASS_ACTIVE_PAUSED => ChannelState::Paused,
            ffi::BASS_ACTIVE_PAUSED_DEVICE => ChannelState::PausedDevice,
            _ => ChannelState::Stopped,
        }
    }

    /// Playing, or playing but starved of data.
    pub fn is_active(self) -> bool {
        matches!(self, ChannelState::Playing | ChannelState::Stalled)
    }
}

/// Opaque native window handle (`HWND` on Windows).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct NativeWindow(NonNull<c_void>);

// SAFETY: the handle is an identifier handed to the backend and never
// dereferenced by this crate.
unsafe impl Send for NativeWindow {}

impl NativeWindow {
    pub fn from_raw(raw: *mut c_void) -> Option<Self> {
        NonNull::new(raw).map(Self)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }
}

impl fmt::Debug for NativeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeWindow({:p})", self.0)
    }
}

/// Supplies the host's native window handle, when there is one.
pub trait WindowSource: Send {
    fn native_window(&self) -> Option<NativeWindow>;
}

impl<F> WindowSource for F
where
    F: Fn() -> Option<NativeWindow> + Send,
{
    fn native_window(&self) -> Option<NativeWindow> {
        self()
    }
}

/// A window source that always returns the same handle (or none).
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedWindow(pub Option<NativeWindow>);

impl WindowSource for FixedWindow {
    fn native_window(&self) -> Option<NativeWindow> {
        self.0
    }
}

/// Parameters for `BASS_Init`.
#[derive(Debug, Clone, Copy)]
pub struct DeviceParams {
    /// Output device, -1 for the system default
    pub device: i32,
    pub sample_rate: u32,
    pub flags: u32,
    pub window: Option<NativeWindow>,
}

impl DeviceParams {
    /// Build device parameters from configuration, asking `window` for a
    /// handle. Fails when the configuration requires a window and none exists.
    pub fn from_config(
        config: &BackendConfig,
        window: &dyn WindowSource,
    ) -> Result<Self, BindingError> {
        let window = if config.require_window_handle {
            Some(
                window
                    .native_window()
                    .ok_or(BindingError::WindowHandleUnavailable)?,
            )
        } else {
            None
        };

        Ok(Self {
            device: config.device,
            sample_rate: config.sample_rate,
            flags: config.device_flags,
            window,
        })
    }
}

/// Uniform backend surface, independent of how the entry points are bound.
///
/// Every method other than `init_device` expects a successfully initialized
/// device; before that they fail with `NotInitialized` or return a neutral
/// value (`false`, `Stopped`, `None`).
pub trait AudioBackend: Send {
    /// Short name used in logs ("dynamic", "static", "stub")
    fn name(&self) -> &'static str;

    /// Bind the backend (if needed) and initialize the output device.
    fn init_device(&mut self, params: &DeviceParams) -> Result<(), BindingError>;

    fn free_device(&mut self);

    fn load_plugin(&mut self, path: &Path) -> Result<PluginHandle, BindingError>;

    fn free_plugin(&mut self, plugin: PluginHandle) -> bool;

    fn create_stream_from_file(
        &mut self,
        path: &Path,
        flags: u32,
    ) -> Result<StreamHandle, BindingError>;

    fn free_stream(&mut self, stream: StreamHandle) -> bool;

    fn play(&mut self, stream: StreamHandle, restart: bool) -> bool;

    fn pause(&mut self, stream: StreamHandle) -> bool;

    fn stop(&mut self, stream: StreamHandle) -> bool;

    fn query_state(&self, stream: StreamHandle) -> ChannelState;

    /// Modify the channel flags selected by `mask` and return the updated
    /// flags. `mask == 0` only queries. `None` when the backend rejects it.
    fn channel_flags(&mut self, stream: StreamHandle, flags: u32, mask: u32) -> Option<u32>;

    fn set_volume(&mut self, level: f32) -> bool;

    fn last_error_code(&self) -> i32;

    /// Release the backend module, if this binding owns one. Idempotent.
    fn release_module(&mut self);
}

/// Create the binding selected by `config.binding`.
///
/// `module_path` is only used by the dynamic binding.
pub fn create_backend(
    config: &BackendConfig,
    module_path: PathBuf,
) -> Result<Box<dyn AudioBackend>, BindingError> {
    match config.binding {
        BindingMode::Dynamic => Ok(Box::new(DynamicBackend::new(module_path))),
        BindingMode::Static => {
            #[cfg(feature = "static-backend")]
            {
                Ok(Box::new(LinkedBackend::new()))
            }

            #[cfg(not(feature = "static-backend"))]
            {
                Err(BindingError::BindingUnavailable {
                    mode: "static".to_string(),
                })
            }
        }
        BindingMode::Stub => Ok(Box::new(DesktopStubBackend::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_reject_zero() {
        assert!(StreamHandle::from_raw(0).is_none());
        assert!(PluginHandle::from_raw(0).is_none());
        assert_eq!(StreamHandle::from_raw(7).map(StreamHandle::raw), Some(7));
    }

    #[test]
    fn test_channel_state_decoding() {
        assert_eq!(ChannelState::from_raw(0), ChannelState::Stopped);
        assert_eq!(ChannelState::from_raw(1), ChannelState::Playing);
        assert_eq!(ChannelState::from_raw(2), ChannelState::Stalled);
        assert_eq!(ChannelState::from_raw(3), ChannelState::Paused);
        assert_eq!(ChannelState::from_raw(4), ChannelState::PausedDevice);
        assert_eq!(ChannelState::from_raw(99), ChannelState::Stopped);
        assert!(ChannelState::Stalled.is_active());
        assert!(!ChannelState::Paused.is_active());
    }

    #[test]
    fn test_device_params_require_window() {
        let config = BackendConfig {
            require_window_handle: true,
            ..BackendConfig::default()
        };
        let err = DeviceParams::from_config(&config, &FixedWindow(None)).unwrap_err();
        assert_eq!(err, BindingError::WindowHandleUnavailable);

        let mut raw = 0u8;
        let window = NativeWindow::from_raw((&mut raw as *mut u8).cast());
        let params = DeviceParams::from_config(&config, &FixedWindow(window)).unwrap();
        assert_eq!(params.window, window);
    }

    #[test]
    fn test_device_params_without_window_requirement() {
        let config = BackendConfig {
            require_window_handle: false,
            ..BackendConfig::default()
        };
        let lookups = std::sync::atomic::AtomicUsize::new(0);
        let source = || -> Option<NativeWindow> {
            lookups.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            None
        };
        let params = DeviceParams::from_config(&config, &source).unwrap();
        assert!(params.window.is_none());
        assert_eq!(params.device, -1);
        assert_eq!(params.sample_rate, 44100);
        assert_eq!(lookups.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[cfg(not(feature = "static-backend"))]
    #[test]
    fn test_static_binding_unavailable_without_feature() {
        let config = BackendConfig {
            binding: BindingMode::Static,
            ..BackendConfig::default()
        };
        match create_backend(&config, PathBuf::from("unused")) {
            Err(BindingError::BindingUnavailable { mode }) => assert_eq!(mode, "static"),
            Err(other) => panic!("Expected BindingUnavailable, got {:?}", other),
            Ok(backend) => panic!("Unexpected backend {}", backend.name()),
        }
    }
}
