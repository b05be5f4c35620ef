// Error types for the BASS bridge
//
// This module defines the binding error type shared by the module loader,
// the backend bindings, the plugin registry and the playback controller,
// with numeric codes suitable for reporting across the C ABI.

mod binding;

pub use binding::{log_binding_error, BindingError, BindingErrorCodes, BASS_ERROR_UNKNOWN};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the FFI boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
