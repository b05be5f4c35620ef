//! Integration tests for AudioSubsystem and AudioManager
//!
//! These tests drive the full lifecycle (initialize, play, pause/resume,
//! stop, volume, shutdown) against the in-memory stub backend, plus the
//! failure paths of the dynamic binding when no library is installed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bass_bridge::backend::ffi::{BASS_ERROR_ALREADY, BASS_ERROR_FILEOPEN, BASS_SAMPLE_LOOP};
use bass_bridge::backend::{BackendCall, ChannelState, FixedWindow};
use bass_bridge::error::BindingError;
use bass_bridge::{
    AppConfig, AudioManager, AudioSubsystem, BindingMode, DesktopStubBackend, PlayOutcome,
    PlaybackState, RecordingReporter, ToggleOutcome,
};

const HOST_DIR: &str = "/games/hl/mymod";

fn stub_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.backend.binding = BindingMode::Stub;
    config.backend.require_window_handle = false;
    config.plugins.candidates.clear();
    config
}

fn start(stub: &DesktopStubBackend, reporter: &RecordingReporter) -> AudioSubsystem {
    AudioSubsystem::initialize_with_backend(
        Box::new(stub.clone()),
        Path::new(HOST_DIR),
        &stub_config(),
        &FixedWindow(None),
        Arc::new(reporter.clone()),
    )
    .expect("stub backend should initialize")
}

fn count(stub: &DesktopStubBackend, wanted: fn(&BackendCall) -> bool) -> usize {
    stub.count_calls(wanted)
}

#[test]
fn test_volume_is_clamped_before_forwarding() {
    let stub = DesktopStubBackend::new();
    let mut subsystem = start(&stub, &RecordingReporter::new());

    for level in [-1.0, 0.0, 0.5, 1.0, 2.0] {
        subsystem.set_volume(level);
    }

    assert_eq!(stub.volume_log(), vec![0.0, 0.0, 0.5, 1.0, 1.0]);
    assert_eq!(subsystem.set_volume(f32::NAN), 0.0);
}

#[test]
fn test_second_play_is_ignored_while_playing() {
    let stub = DesktopStubBackend::new();
    let mut subsystem = start(&stub, &RecordingReporter::new());

    let first = subsystem.play(Path::new("media/a.mp3"), false).unwrap();
    let again = subsystem.play(Path::new("media/a.mp3"), false).unwrap();
    let other = subsystem.play(Path::new("media/b.mp3"), true).unwrap();

    let PlayOutcome::Started(stream) = first else {
        panic!("first play should start a stream, got {first:?}");
    };
    assert_eq!(again, PlayOutcome::AlreadyPlaying(stream));
    assert_eq!(other, PlayOutcome::AlreadyPlaying(stream));
    assert_eq!(subsystem.current_stream(), Some(stream));
    assert_eq!(
        count(&stub, |call| matches!(call, BackendCall::CreateStream { .. })),
        1
    );
}

#[test]
fn test_pause_then_resume_keeps_loop_and_handle() {
    let stub = DesktopStubBackend::new();
    let mut subsystem = start(&stub, &RecordingReporter::new());

    subsystem.play(Path::new("media/theme.mp3"), true).unwrap();
    let stream = subsystem.current_stream().unwrap();

    assert_eq!(subsystem.pause_or_resume().unwrap(), ToggleOutcome::Paused);
    assert_eq!(subsystem.state(), PlaybackState::Paused);

    assert_eq!(
        subsystem.pause_or_resume().unwrap(),
        ToggleOutcome::Resumed { looping: true }
    );
    assert_eq!(subsystem.state(), PlaybackState::Playing);
    assert_eq!(subsystem.current_stream(), Some(stream));
    assert_eq!(
        stub.stream_flags(stream).map(|flags| flags & BASS_SAMPLE_LOOP),
        Some(BASS_SAMPLE_LOOP)
    );
    assert!(stub
        .calls()
        .contains(&BackendCall::Play { stream, restart: false }));
}

#[test]
fn test_pause_without_stream_is_idle() {
    let stub = DesktopStubBackend::new();
    let mut subsystem = start(&stub, &RecordingReporter::new());

    assert_eq!(subsystem.pause_or_resume().unwrap(), ToggleOutcome::Idle);
    assert_eq!(count(&stub, |call| matches!(call, BackendCall::Pause(_))), 0);
}

#[test]
fn test_stop_without_stream_does_not_call_backend() {
    let stub = DesktopStubBackend::new();
    let mut subsystem = start(&stub, &RecordingReporter::new());

    assert!(!subsystem.stop().unwrap());
    assert_eq!(count(&stub, |call| matches!(call, BackendCall::Stop(_))), 0);
}

#[test]
fn test_stop_frees_stream_and_allows_new_play() {
    let stub = DesktopStubBackend::new();
    let mut subsystem = start(&stub, &RecordingReporter::new());

    subsystem.play(Path::new("media/a.mp3"), false).unwrap();
    assert!(subsystem.stop().unwrap());
    assert_eq!(subsystem.state(), PlaybackState::Ready);
    assert!(stub.live_streams().is_empty());

    let outcome = subsystem.play(Path::new("media/b.mp3"), false).unwrap();
    assert!(matches!(outcome, PlayOutcome::Started(_)));
}

#[test]
fn test_play_after_end_of_stream_starts_new_stream() {
    let stub = DesktopStubBackend::new();
    let mut subsystem = start(&stub, &RecordingReporter::new());

    subsystem.play(Path::new("media/short.mp3"), false).unwrap();
    let finished = subsystem.current_stream().unwrap();
    stub.set_channel_state(finished, ChannelState::Stopped);
    assert_eq!(subsystem.state(), PlaybackState::Stopped);

    let outcome = subsystem.play(Path::new("media/next.mp3"), false).unwrap();
    let PlayOutcome::Started(next) = outcome else {
        panic!("expected a new stream, got {outcome:?}");
    };
    assert_ne!(next, finished);
    assert!(stub.calls().contains(&BackendCall::FreeStream(finished)));
    assert_eq!(stub.live_streams(), vec![next]);
}

#[test]
fn test_stream_create_failure_is_reported_with_file_path() {
    let stub = DesktopStubBackend::new().with_failing_stream("media/missing.mp3");
    let reporter = RecordingReporter::new();
    let mut subsystem = start(&stub, &reporter);

    let err = subsystem
        .play(Path::new("media/missing.mp3"), false)
        .unwrap_err();

    assert!(matches!(err, BindingError::StreamCreateFailed { .. }));
    assert_eq!(subsystem.current_stream(), None);
    let reports = reporter.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].backend_code, BASS_ERROR_FILEOPEN);
    assert_eq!(reports[0].context, PathBuf::from("media/missing.mp3"));
}

#[test]
fn test_shutdown_releases_in_order() {
    let stub = DesktopStubBackend::new();
    let subsystem = {
        let mut subsystem = start(&stub, &RecordingReporter::new());
        subsystem.play(Path::new("media/theme.mp3"), true).unwrap();
        subsystem
    };
    subsystem.shutdown();

    let calls = stub.calls();
    let position = |wanted: fn(&BackendCall) -> bool| calls.iter().position(wanted).unwrap();
    let free_stream = position(|call| matches!(call, BackendCall::FreeStream(_)));
    let free_device = position(|call| *call == BackendCall::FreeDevice);
    let release = position(|call| *call == BackendCall::ReleaseModule);

    assert!(free_stream < free_device);
    assert!(free_device < release);
    assert!(!stub.is_device_initialized());
    assert!(stub.is_module_released());
}

#[test]
fn test_failed_device_init_is_reported_and_shutdown_is_safe() {
    let stub = DesktopStubBackend::new().failing_init(BASS_ERROR_ALREADY);
    let reporter = RecordingReporter::new();
    let mut manager = AudioManager::new(
        stub_config(),
        Box::new(FixedWindow(None)),
        Arc::new(reporter.clone()),
    );

    assert!(!manager.initialize_with_backend(Path::new(HOST_DIR), Box::new(stub.clone())));
    assert!(!manager.is_initialized());

    manager.play(Path::new("media/theme.mp3"), false);
    manager.shutdown();
    manager.shutdown();

    assert_eq!(reporter.reports().len(), 1);
    assert_eq!(reporter.reports()[0].backend_code, BASS_ERROR_ALREADY);
    assert_eq!(count(&stub, |call| *call == BackendCall::ReleaseModule), 1);
    assert_eq!(count(&stub, |call| *call == BackendCall::FreeDevice), 0);
    assert_eq!(
        count(&stub, |call| matches!(call, BackendCall::CreateStream { .. })),
        0
    );
}

#[test]
fn test_missing_dynamic_module_is_reported_with_module_path() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.backend.binding = BindingMode::Dynamic;
    config.backend.require_window_handle = false;
    let reporter = RecordingReporter::new();

    let mut manager = AudioManager::new(
        config.clone(),
        Box::new(FixedWindow(None)),
        Arc::new(reporter.clone()),
    );

    assert!(!manager.initialize(dir.path()));
    assert_eq!(manager.state(), PlaybackState::Uninitialized);
    manager.shutdown();
    manager.shutdown();

    let reports = reporter.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].context, config.backend.module_path(dir.path()));
}

#[test]
fn test_required_window_missing_fails_before_device_init() {
    let mut config = stub_config();
    config.backend.require_window_handle = true;
    let stub = DesktopStubBackend::new();
    let reporter = RecordingReporter::new();
    let mut manager = AudioManager::new(
        config,
        Box::new(|| -> Option<bass_bridge::backend::NativeWindow> { None }),
        Arc::new(reporter.clone()),
    );

    assert!(!manager.initialize_with_backend(Path::new(HOST_DIR), Box::new(stub.clone())));
    assert_eq!(count(&stub, |call| *call == BackendCall::InitDevice), 0);
    assert_eq!(reporter.reports().len(), 1);
}

#[test]
fn test_manager_full_lifecycle() {
    let stub = DesktopStubBackend::new();
    let mut manager = AudioManager::new(
        stub_config(),
        Box::new(FixedWindow(None)),
        Arc::new(RecordingReporter::new()),
    );
    assert!(manager.initialize_with_backend(Path::new(HOST_DIR), Box::new(stub.clone())));

    manager.set_volume(0.75);
    manager.play(Path::new("media/theme.mp3"), true);
    assert_eq!(manager.state(), PlaybackState::Playing);
    manager.pause_or_resume();
    assert_eq!(manager.state(), PlaybackState::Paused);
    manager.pause_or_resume();
    assert_eq!(manager.state(), PlaybackState::Playing);
    manager.stop();
    assert_eq!(manager.state(), PlaybackState::Ready);

    drop(manager);
    assert!(stub.is_module_released());
    assert_eq!(stub.volume_log(), vec![0.75]);
}
