//! Playback controller.
//!
//! Owns the single "current song" stream. Every decision (already playing?
//! paused? looping?) is made by asking the backend, never from a mirrored
//! flag, so a stream the backend stopped on its own (end of file) is seen as
//! stopped on the next call.

use std::path::Path;

use log::{debug, info, warn};

use crate::backend::ffi::BASS_SAMPLE_LOOP;
use crate::backend::{AudioBackend, ChannelState, StreamHandle};
use crate::error::BindingError;

/// Playback state derived from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No backend bound
    Uninitialized,
    /// Backend ready, no stream
    Ready,
    Playing,
    Paused,
    /// A stream exists but the backend reports it stopped
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Started(StreamHandle),
    /// A stream was already playing; nothing changed
    AlreadyPlaying(StreamHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Paused,
    Resumed { looping: bool },
    /// No stream, or the stream is neither playing nor paused
    Idle,
}

/// Clamp a requested volume into `[0.0, 1.0]`. NaN becomes silence.
pub fn clamp_volume(level: f32) -> f32 {
    if level.is_nan() {
        0.0
    } else {
        level.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Default)]
pub struct PlaybackController {
    current: Option<StreamHandle>,
}

impl PlaybackController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_stream(&self) -> Option<StreamHandle> {
        self.current
    }

    pub fn state(&self, backend: &dyn AudioBackend) -> PlaybackState {
        let Some(stream) = self.current else {
            return PlaybackState::Ready;
        };

        match backend.query_state(stream) {
            ChannelState::Playing | ChannelState::Stalled => PlaybackState::Playing,
            ChannelState::Paused | ChannelState::PausedDevice => PlaybackState::Paused,
            ChannelState::Stopped => PlaybackState::Stopped,
        }
    }

    /// Start `path`, unless something is already playing.
    ///
    /// Any previous, inactive stream is freed first. On failure the
    /// controller is left without a stream.
    pub fn play(
        &mut self,
        backend: &mut dyn AudioBackend,
        path: &Path,
        looping: bool,
    ) -> Result<PlayOutcome, BindingError> {
        if let Some(stream) = self.current {
            if backend.query_state(stream).is_active() {
                debug!(
                    "[Playback] Stream {} already playing, ignoring {}",
                    stream.raw(),
                    path.display()
                );
                return Ok(PlayOutcome::AlreadyPlaying(stream));
            }
        }

        self.discard(backend);

        let flags = if looping { BASS_SAMPLE_LOOP } else { 0 };
        let stream = backend.create_stream_from_file(path, flags)?;

        if !backend.play(stream, true) {
            let backend_code = backend.last_error_code();
            backend.free_stream(stream);
            return Err(BindingError::ChannelCommandFailed {
                command: "play",
                backend_code,
            });
        }

        info!(
            "[Playback] Playing {} (stream {}, loop={})",
            path.display(),
            stream.raw(),
            looping
        );
        self.current = Some(stream);
        Ok(PlayOutcome::Started(stream))
    }

    /// Pause a playing stream, or resume a paused one on the same handle.
    ///
    /// On resume the loop flag is read back from the channel flags and
    /// re-applied as read. A rejected flag change aborts the resume.
    pub fn pause_or_resume(
        &mut self,
        backend: &mut dyn AudioBackend,
    ) -> Result<ToggleOutcome, BindingError> {
        let Some(stream) = self.current else {
            return Ok(ToggleOutcome::Idle);
        };

        match backend.query_state(stream) {
            ChannelState::Playing | ChannelState::Stalled => {
                Self::command(backend, "pause", |backend| backend.pause(stream))?;
                info!("[Playback] Paused stream {}", stream.raw());
                Ok(ToggleOutcome::Paused)
            }
            ChannelState::Paused => {
                let flags = backend
                    .channel_flags(stream, 0, 0)
                    .ok_or_else(|| BindingError::ChannelCommandFailed {
                        command: "flags",
                        backend_code: backend.last_error_code(),
                    })?;
                let looping = flags & BASS_SAMPLE_LOOP != 0;
                let loop_bits = if looping { BASS_SAMPLE_LOOP } else { 0 };
                backend
                    .channel_flags(stream, loop_bits, BASS_SAMPLE_LOOP)
                    .ok_or_else(|| BindingError::ChannelCommandFailed {
                        command: "flags",
                        backend_code: backend.last_error_code(),
                    })?;

                Self::command(backend, "play", |backend| backend.play(stream, false))?;
                info!(
                    "[Playback] Resumed stream {} (loop={})",
                    stream.raw(),
                    looping
                );
                Ok(ToggleOutcome::Resumed { looping })
            }
            ChannelState::Stopped | ChannelState::PausedDevice => Ok(ToggleOutcome::Idle),
        }
    }

    /// Stop the current stream and drop back to no stream.
    ///
    /// Returns `false` without touching the backend's stop entry point when
    /// there is nothing to stop.
    pub fn stop(&mut self, backend: &mut dyn AudioBackend) -> Result<bool, BindingError> {
        let Some(stream) = self.current else {
            return Ok(false);
        };

        if backend.query_state(stream) == ChannelState::Stopped {
            debug!("[Playback] Stream {} already stopped", stream.raw());
            self.discard(backend);
            return Ok(false);
        }

        Self::command(backend, "stop", |backend| backend.stop(stream))?;
        info!("[Playback] Stopped stream {}", stream.raw());
        self.discard(backend);
        Ok(true)
    }

    /// Forward the clamped volume. Legal in every state.
    pub fn set_volume(&self, backend: &mut dyn AudioBackend, level: f32) -> f32 {
        let clamped = clamp_volume(level);
        if !backend.set_volume(clamped) {
            warn!(
                "[Playback] BASS_SetVolume({}) failed with error {}",
                clamped,
                backend.last_error_code()
            );
        }
        clamped
    }

    /// Free the current stream, if any. Used at shutdown.
    pub fn release(&mut self, backend: &mut dyn AudioBackend) {
        self.discard(backend);
    }

    fn discard(&mut self, backend: &mut dyn AudioBackend) {
        if let Some(stream) = self.current.take() {
            backend.free_stream(stream);
        }
    }

    fn command(
        backend: &mut dyn AudioBackend,
        command: &'static str,
        call: impl FnOnce(&mut dyn AudioBackend) -> bool,
    ) -> Result<(), BindingError> {
        if call(&mut *backend) {
            Ok(())
        } else {
            Err(BindingError::ChannelCommandFailed {
                command,
                backend_code: backend.last_error_code(),
            })
        }
    }
}
