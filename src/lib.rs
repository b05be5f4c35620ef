// BASS Bridge - audio backend binding for a game client module
// Loads the BASS library, registers codec plugins and drives one song stream

// Module declarations
pub mod api;
pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod loader;
pub mod playback;
pub mod plugins;
pub mod reporter;

// Re-exports for convenience
pub use backend::{AudioBackend, DesktopStubBackend, DynamicBackend, StreamHandle};
pub use config::{AppConfig, BindingMode};
pub use context::{AudioManager, AudioSubsystem};
pub use error::{BindingError, ErrorCode};
pub use playback::{PlaybackState, PlayOutcome, ToggleOutcome};
pub use plugins::{PluginOutcome, PluginStatus};
pub use reporter::{ErrorReporter, LogReporter, RecordingReporter};
