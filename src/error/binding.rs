// Binding error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;
use std::path::{Path, PathBuf};

/// Backend error code used when a failure carries no code of its own
/// (the backend was never reached, or its module is not loaded).
pub const BASS_ERROR_UNKNOWN: i32 = -1;

/// Binding error code constants
///
/// Single source of truth for the numeric codes returned by
/// [`BindingError::code`].
///
/// Error code range: 3001-3010
pub struct BindingErrorCodes {}

impl BindingErrorCodes {
    /// Backend or plugin module could not be loaded from its path
    pub const MODULE_NOT_FOUND: i32 = 3001;

    /// A required entry point is missing from the loaded module
    pub const SYMBOL_NOT_FOUND: i32 = 3002;

    /// The backend rejected the device parameters
    pub const DEVICE_INIT_FAILED: i32 = 3003;

    /// An optional codec plugin failed to load
    pub const PLUGIN_LOAD_FAILED: i32 = 3004;

    /// The backend could not open or decode a stream
    pub const STREAM_CREATE_FAILED: i32 = 3005;

    /// A native window handle was required but not available
    pub const WINDOW_HANDLE_UNAVAILABLE: i32 = 3006;

    /// Operation attempted before the backend was initialized
    pub const NOT_INITIALIZED: i32 = 3007;

    /// A channel play/pause/stop command was rejected by the backend
    pub const CHANNEL_COMMAND_FAILED: i32 = 3008;

    /// A path could not be passed to the backend
    pub const INVALID_PATH: i32 = 3009;

    /// The configured binding mode is not compiled into this build
    pub const BINDING_UNAVAILABLE: i32 = 3010;
}

/// Log a binding error with structured context
///
/// Logs the numeric code, the backend code carried by the error and the
/// human-readable message. Never panics.
pub fn log_binding_error(err: &BindingError, context: &str) {
    error!(
        "Binding error in {}: code={}, backend_code={}, message={}",
        context,
        err.code(),
        err.backend_code(),
        err.message()
    );
}

/// Errors raised while binding to and driving the audio backend
///
/// Fatal at initialize: `ModuleNotFound`, `SymbolNotFound`, `DeviceInitFailed`,
/// `WindowHandleUnavailable`, `BindingUnavailable`. The rest are absorbed by
/// the caller and only surfaced for visibility.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingError {
    /// Module absent from the expected path or rejected by the OS loader
    ModuleNotFound { path: PathBuf, reason: String },

    /// Dynamic resolution of a required entry point failed
    SymbolNotFound { symbol: String, path: PathBuf },

    /// `BASS_Init` returned false
    DeviceInitFailed { backend_code: i32 },

    /// `BASS_PluginLoad` returned a null handle
    PluginLoadFailed { path: PathBuf, backend_code: i32 },

    /// `BASS_StreamCreateFile` returned a null handle
    StreamCreateFailed { path: PathBuf, backend_code: i32 },

    /// The platform requires a window handle and none was supplied
    WindowHandleUnavailable,

    /// The backend binding has not been initialized
    NotInitialized,

    /// A channel command returned false
    ChannelCommandFailed {
        command: &'static str,
        backend_code: i32,
    },

    /// Path contains an interior NUL and cannot cross the C boundary
    InvalidPath { path: PathBuf },

    /// Binding mode not available in this build
    BindingUnavailable { mode: String },
}

impl BindingError {
    /// Backend error code carried by this error, or [`BASS_ERROR_UNKNOWN`].
    pub fn backend_code(&self) -> i32 {
        match self {
            BindingError::DeviceInitFailed { backend_code }
            | BindingError::PluginLoadFailed { backend_code, .. }
            | BindingError::StreamCreateFailed { backend_code, .. }
            | BindingError::ChannelCommandFailed { backend_code, .. } => *backend_code,
            _ => BASS_ERROR_UNKNOWN,
        }
    }

    /// Path the failure relates to, if any.
    pub fn context_path(&self) -> Option<&Path> {
        match self {
            BindingError::ModuleNotFound { path, .. }
            | BindingError::SymbolNotFound { path, .. }
            | BindingError::PluginLoadFailed { path, .. }
            | BindingError::StreamCreateFailed { path, .. }
            | BindingError::InvalidPath { path } => Some(path.as_path()),
            _ => None,
        }
    }

    /// Whether this error leaves the audio subsystem unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BindingError::ModuleNotFound { .. }
                | BindingError::SymbolNotFound { .. }
                | BindingError::DeviceInitFailed { .. }
                | BindingError::WindowHandleUnavailable
                | BindingError::BindingUnavailable { .. }
        )
    }
}

impl ErrorCode for BindingError {
    fn code(&self) -> i32 {
        match self {
            BindingError::ModuleNotFound { .. } => BindingErrorCodes::MODULE_NOT_FOUND,
            BindingError::SymbolNotFound { .. } => BindingErrorCodes::SYMBOL_NOT_FOUND,
            BindingError::DeviceInitFailed { .. } => BindingErrorCodes::DEVICE_INIT_FAILED,
            BindingError::PluginLoadFailed { .. } => BindingErrorCodes::PLUGIN_LOAD_FAILED,
            BindingError::StreamCreateFailed { .. } => BindingErrorCodes::STREAM_CREATE_FAILED,
            BindingError::WindowHandleUnavailable => BindingErrorCodes::WINDOW_HANDLE_UNAVAILABLE,
            BindingError::NotInitialized => BindingErrorCodes::NOT_INITIALIZED,
            BindingError::ChannelCommandFailed { .. } => BindingErrorCodes::CHANNEL_COMMAND_FAILED,
            BindingError::InvalidPath { .. } => BindingErrorCodes::INVALID_PATH,
            BindingError::BindingUnavailable { .. } => BindingErrorCodes::BINDING_UNAVAILABLE,
        }
    }

    fn message(&self) -> String {
        match self {
            BindingError::ModuleNotFound { path, reason } => {
                format!("Failed to load module {}: {}", path.display(), reason)
            }
            BindingError::SymbolNotFound { symbol, path } => {
                format!("Entry point {} not found in {}", symbol, path.display())
            }
            BindingError::DeviceInitFailed { backend_code } => {
                format!("BASS device initialization failed (BASS error {})", backend_code)
            }
            BindingError::PluginLoadFailed { path, backend_code } => {
                format!(
                    "Failed to load BASS plugin {} (BASS error {})",
                    path.display(),
                    backend_code
                )
            }
            BindingError::StreamCreateFailed { path, backend_code } => {
                format!(
                    "Failed to create stream from {} (BASS error {})",
                    path.display(),
                    backend_code
                )
            }
            BindingError::WindowHandleUnavailable => "Failed to obtain window handle.".to_string(),
            BindingError::NotInitialized => {
                "Audio backend not initialized. Call initialize() first.".to_string()
            }
            BindingError::ChannelCommandFailed {
                command,
                backend_code,
            } => {
                format!("Channel {} failed (BASS error {})", command, backend_code)
            }
            BindingError::InvalidPath { path } => {
                format!("Path cannot be passed to the backend: {}", path.display())
            }
            BindingError::BindingUnavailable { mode } => {
                format!("Binding mode {} is not available in this build", mode)
            }
        }
    }
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BindingError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for BindingError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_error_codes() {
        assert_eq!(
            BindingError::ModuleNotFound {
                path: PathBuf::from("libbass.so"),
                reason: "test".to_string()
            }
            .code(),
            BindingErrorCodes::MODULE_NOT_FOUND
        );
        assert_eq!(
            BindingError::SymbolNotFound {
                symbol: "BASS_Init".to_string(),
                path: PathBuf::from("libbass.so")
            }
            .code(),
            BindingErrorCodes::SYMBOL_NOT_FOUND
        );
        assert_eq!(
            BindingError::DeviceInitFailed { backend_code: 23 }.code(),
            BindingErrorCodes::DEVICE_INIT_FAILED
        );
        assert_eq!(
            BindingError::WindowHandleUnavailable.code(),
            BindingErrorCodes::WINDOW_HANDLE_UNAVAILABLE
        );
        assert_eq!(
            BindingError::NotInitialized.code(),
            BindingErrorCodes::NOT_INITIALIZED
        );
        assert_eq!(
            BindingError::BindingUnavailable {
                mode: "static".to_string()
            }
            .code(),
            3010
        );
    }

    #[test]
    fn test_backend_code_and_context() {
        let err = BindingError::PluginLoadFailed {
            path: PathBuf::from("cl_dlls/libbasszxtune.so"),
            backend_code: 2,
        };
        assert_eq!(err.backend_code(), 2);
        assert_eq!(
            err.context_path(),
            Some(Path::new("cl_dlls/libbasszxtune.so"))
        );

        let err = BindingError::WindowHandleUnavailable;
        assert_eq!(err.backend_code(), BASS_ERROR_UNKNOWN);
        assert!(err.context_path().is_none());
    }

    #[test]
    fn test_fatal_classification() {
        assert!(BindingError::DeviceInitFailed { backend_code: 3 }.is_fatal());
        assert!(BindingError::WindowHandleUnavailable.is_fatal());
        assert!(!BindingError::PluginLoadFailed {
            path: PathBuf::new(),
            backend_code: 2
        }
        .is_fatal());
        assert!(!BindingError::StreamCreateFailed {
            path: PathBuf::new(),
            backend_code: 2
        }
        .is_fatal());
    }

    #[test]
    fn test_binding_error_display() {
        let err = BindingError::DeviceInitFailed { backend_code: 23 };
        let display = format!("{}", err);
        assert!(display.contains("BindingError"));
        assert!(display.contains("3003"));
        assert!(err.message().contains("BASS error 23"));

        let err = BindingError::WindowHandleUnavailable;
        assert_eq!(err.message(), "Failed to obtain window handle.");
    }
}
