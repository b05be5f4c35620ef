// AudioSubsystem: owned backend binding, plugins and playback state
// AudioManager: host-facing bool/void facade over an optional AudioSubsystem

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};

use crate::backend::{create_backend, AudioBackend, DeviceParams, StreamHandle, WindowSource};
use crate::config::AppConfig;
use crate::error::{log_binding_error, BindingError};
use crate::playback::{PlayOutcome, PlaybackController, PlaybackState, ToggleOutcome};
use crate::plugins::{PluginOutcome, PluginRegistry};
use crate::reporter::{report_binding_error, ErrorReporter};

/// One initialized audio device with its plugins and current stream.
///
/// Created by [`AudioSubsystem::initialize`], destroyed by
/// [`AudioSubsystem::shutdown`]. Nothing is process-wide: independent
/// instances can be created and torn down, although a real backend only
/// supports one device per process.
///
/// Not reentrant. All calls are expected from the host's main thread.
pub struct AudioSubsystem {
    backend: Box<dyn AudioBackend>,
    plugins: PluginRegistry,
    playback: PlaybackController,
    reporter: Arc<dyn ErrorReporter>,
    module_path: PathBuf,
}

impl AudioSubsystem {
    /// Bind the backend selected by `config`, initialize the device and
    /// register plugins found under `<host_dir>/<module_subdir>`.
    ///
    /// Fatal failures are reported through `reporter` before returning.
    pub fn initialize(
        host_dir: &Path,
        config: &AppConfig,
        window: &dyn WindowSource,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Result<Self, BindingError> {
        let module_path = config.backend.module_path(host_dir);
        let backend = create_backend(&config.backend, module_path.clone()).map_err(|err| {
            log_binding_error(&err, "initialize");
            report_binding_error(reporter.as_ref(), &err, &module_path);
            err
        })?;

        Self::initialize_with_backend(backend, host_dir, config, window, reporter)
    }

    /// Same as [`initialize`](Self::initialize) with an already constructed
    /// backend binding.
    pub fn initialize_with_backend(
        mut backend: Box<dyn AudioBackend>,
        host_dir: &Path,
        config: &AppConfig,
        window: &dyn WindowSource,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Result<Self, BindingError> {
        let module_path = config.backend.module_path(host_dir);
        let fail = |err: BindingError| {
            log_binding_error(&err, "initialize");
            report_binding_error(reporter.as_ref(), &err, &module_path);
            err
        };

        let params = DeviceParams::from_config(&config.backend, window).map_err(fail)?;

        if let Err(err) = backend.init_device(&params) {
            backend.release_module();
            return Err(fail(err));
        }
        info!(
            "[Audio] {} backend initialized from {}",
            backend.name(),
            module_path.display()
        );

        let mut plugins = PluginRegistry::new();
        let candidates = config
            .plugins
            .candidate_paths(&config.backend.module_dir(host_dir));
        plugins.register(backend.as_mut(), &candidates, reporter.as_ref());

        let mut subsystem = Self {
            backend,
            plugins,
            playback: PlaybackController::new(),
            reporter,
            module_path,
        };

        if let Some(volume) = config.playback.initial_volume {
            subsystem.set_volume(volume);
        }

        Ok(subsystem)
    }

    /// Release the stream, the device, every plugin and finally the backend
    /// module, in that order.
    pub fn shutdown(mut self) {
        self.playback.release(self.backend.as_mut());
        self.backend.free_device();
        let freed = self.plugins.release(self.backend.as_mut());
        self.backend.release_module();
        info!(
            "[Audio] Shut down {} backend ({} plugins freed)",
            self.backend.name(),
            freed
        );
    }

    // ========================================================================
    // PLAYBACK
    // ========================================================================

    /// Play `path`. A no-op while another stream is playing.
    ///
    /// Stream creation failures are reported and leave no current stream.
    pub fn play(&mut self, path: &Path, looping: bool) -> Result<PlayOutcome, BindingError> {
        self.playback
            .play(self.backend.as_mut(), path, looping)
            .map_err(|err| {
                log_binding_error(&err, "play");
                if matches!(err, BindingError::StreamCreateFailed { .. }) {
                    report_binding_error(self.reporter.as_ref(), &err, path);
                }
                err
            })
    }

    pub fn pause_or_resume(&mut self) -> Result<ToggleOutcome, BindingError> {
        self.playback
            .pause_or_resume(self.backend.as_mut())
            .map_err(|err| {
                log_binding_error(&err, "pause_or_resume");
                err
            })
    }

    pub fn stop(&mut self) -> Result<bool, BindingError> {
        self.playback.stop(self.backend.as_mut()).map_err(|err| {
            log_binding_error(&err, "stop");
            err
        })
    }

    /// Set the output volume; returns the clamped value actually forwarded.
    pub fn set_volume(&mut self, level: f32) -> f32 {
        self.playback.set_volume(self.backend.as_mut(), level)
    }

    pub fn state(&self) -> PlaybackState {
        self.playback.state(self.backend.as_ref())
    }

    pub fn current_stream(&self) -> Option<StreamHandle> {
        self.playback.current_stream()
    }

    pub fn plugins(&self) -> &[PluginOutcome] {
        self.plugins.outcomes()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn module_path(&self) -> &Path {
        &self.module_path
    }
}

/// Host-facing facade with the Initialize/Shutdown/Play/... contract.
///
/// Holds at most one [`AudioSubsystem`]. Playback calls made while not
/// initialized are ignored with a warning. Not reentrant: call from one
/// controlling thread.
pub struct AudioManager {
    config: AppConfig,
    window: Box<dyn WindowSource>,
    reporter: Arc<dyn ErrorReporter>,
    subsystem: Option<AudioSubsystem>,
}

impl AudioManager {
    pub fn new(
        config: AppConfig,
        window: Box<dyn WindowSource>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            config,
            window,
            reporter,
            subsystem: None,
        }
    }

    /// Initialize the audio subsystem. Returns `false` after reporting a
    /// fatal failure; the manager then stays uninitialized.
    pub fn initialize(&mut self, host_dir: &Path) -> bool {
        if self.subsystem.is_some() {
            warn!("[Audio] Already initialized");
            return true;
        }

        let result = AudioSubsystem::initialize(
            host_dir,
            &self.config,
            self.window.as_ref(),
            Arc::clone(&self.reporter),
        );
        self.store(result)
    }

    /// Initialize with an explicit backend binding instead of the one the
    /// configuration selects.
    pub fn initialize_with_backend(
        &mut self,
        host_dir: &Path,
        backend: Box<dyn AudioBackend>,
    ) -> bool {
        if self.subsystem.is_some() {
            warn!("[Audio] Already initialized");
            return true;
        }

        let result = AudioSubsystem::initialize_with_backend(
            backend,
            host_dir,
            &self.config,
            self.window.as_ref(),
            Arc::clone(&self.reporter),
        );
        self.store(result)
    }

    fn store(&mut self, result: Result<AudioSubsystem, BindingError>) -> bool {
        match result {
            Ok(subsystem) => {
                self.subsystem = Some(subsystem);
                true
            }
            Err(_) => false,
        }
    }

    /// Release everything. Safe after a failed initialize and safe to repeat.
    pub fn shutdown(&mut self) {
        if let Some(subsystem) = self.subsystem.take() {
            subsystem.shutdown();
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.subsystem.is_some()
    }

    pub fn state(&self) -> PlaybackState {
        self.subsystem
            .as_ref()
            .map_or(PlaybackState::Uninitialized, AudioSubsystem::state)
    }

    pub fn subsystem(&self) -> Option<&AudioSubsystem> {
        self.subsystem.as_ref()
    }

    pub fn play(&mut self, path: &Path, looping: bool) {
        if let Some(subsystem) = self.active("play") {
            let _ = subsystem.play(path, looping);
        }
    }

    pub fn pause_or_resume(&mut self) {
        if let Some(subsystem) = self.active("pause_or_resume") {
            let _ = subsystem.pause_or_resume();
        }
    }

    pub fn stop(&mut self) {
        if let Some(subsystem) = self.active("stop") {
            let _ = subsystem.stop();
        }
    }

    pub fn set_volume(&mut self, level: f32) {
        if let Some(subsystem) = self.active("set_volume") {
            subsystem.set_volume(level);
        }
    }

    fn active(&mut self, context: &str) -> Option<&mut AudioSubsystem> {
        if self.subsystem.is_none() {
            log_binding_error(&BindingError::NotInitialized, context);
        }
        self.subsystem.as_mut()
    }
}

impl Drop for AudioManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, DesktopStubBackend, FixedWindow};
    use crate::config::BindingMode;
    use crate::reporter::RecordingReporter;

    fn stub_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.backend.binding = BindingMode::Stub;
        config.backend.require_window_handle = false;
        config.plugins.candidates.clear();
        config
    }

    #[test]
    fn test_shutdown_order() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = dir.path().join("cl_dlls").join("libbassopus.so");
        std::fs::create_dir_all(plugin.parent().unwrap()).unwrap();
        std::fs::write(&plugin, b"plugin").unwrap();

        let mut config = stub_config();
        config.plugins.candidates = vec!["libbassopus.so".to_string()];

        let stub = DesktopStubBackend::new();
        let mut subsystem = AudioSubsystem::initialize_with_backend(
            Box::new(stub.clone()),
            dir.path(),
            &config,
            &FixedWindow(None),
            Arc::new(RecordingReporter::new()),
        )
        .unwrap();
        subsystem.play(Path::new("theme.mp3"), false).unwrap();
        subsystem.shutdown();

        let tail: Vec<BackendCall> = stub
            .calls()
            .into_iter()
            .filter(|call| {
                matches!(
                    call,
                    BackendCall::FreeStream(_)
                        | BackendCall::FreeDevice
                        | BackendCall::FreePlugin(_)
                        | BackendCall::ReleaseModule
                )
            })
            .collect();
        assert!(matches!(tail[0], BackendCall::FreeStream(_)));
        assert_eq!(tail[1], BackendCall::FreeDevice);
        assert!(matches!(tail[2], BackendCall::FreePlugin(_)));
        assert_eq!(tail[3], BackendCall::ReleaseModule);
        assert_eq!(tail.len(), 4);
    }

    #[test]
    fn test_missing_window_is_fatal_before_backend_init() {
        let mut config = stub_config();
        config.backend.require_window_handle = true;
        let reporter = RecordingReporter::new();
        let stub = DesktopStubBackend::new();

        let result = AudioSubsystem::initialize_with_backend(
            Box::new(stub.clone()),
            Path::new("/games/hl/mymod"),
            &config,
            &FixedWindow(None),
            Arc::new(reporter.clone()),
        );

        assert!(matches!(result, Err(BindingError::WindowHandleUnavailable)));
        assert_eq!(
            stub.count_calls(|call| *call == BackendCall::InitDevice),
            0
        );
        let reports = reporter.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].context, config.backend.module_path(Path::new("/games/hl/mymod")));
    }

    #[test]
    fn test_initial_volume_applied() {
        let mut config = stub_config();
        config.playback.initial_volume = Some(1.5);
        let stub = DesktopStubBackend::new();

        AudioSubsystem::initialize_with_backend(
            Box::new(stub.clone()),
            Path::new("/tmp"),
            &config,
            &FixedWindow(None),
            Arc::new(RecordingReporter::new()),
        )
        .unwrap();

        assert_eq!(stub.volume_log(), vec![1.0]);
    }

    #[test]
    fn test_manager_ignores_playback_before_initialize() {
        let mut manager = AudioManager::new(
            stub_config(),
            Box::new(FixedWindow(None)),
            Arc::new(RecordingReporter::new()),
        );
        manager.play(Path::new("theme.mp3"), true);
        manager.pause_or_resume();
        manager.stop();
        manager.set_volume(0.5);
        assert_eq!(manager.state(), PlaybackState::Uninitialized);
        assert!(!manager.is_initialized());
    }

    #[test]
    fn test_manager_stub_binding_from_config() {
        let mut manager = AudioManager::new(
            stub_config(),
            Box::new(FixedWindow(None)),
            Arc::new(RecordingReporter::new()),
        );
        assert!(manager.initialize(Path::new("/games/hl/mymod")));
        assert_eq!(manager.state(), PlaybackState::Ready);
        assert_eq!(manager.subsystem().map(AudioSubsystem::backend_name), Some("stub"));

        manager.play(Path::new("theme.mp3"), false);
        assert_eq!(manager.state(), PlaybackState::Playing);

        manager.shutdown();
        manager.shutdown();
        assert_eq!(manager.state(), PlaybackState::Uninitialized);
    }
}
