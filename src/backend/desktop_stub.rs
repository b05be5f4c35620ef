use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::BindingError;

use super::ffi::{
    BASS_ERROR_ALREADY, BASS_ERROR_FILEFORM, BASS_ERROR_FILEOPEN, BASS_ERROR_HANDLE,
    BASS_ERROR_INIT, BASS_ERROR_NOPLAY, BASS_OK,
};
use super::{AudioBackend, ChannelState, DeviceParams, PluginHandle, StreamHandle};

/// One call made against the stub, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    InitDevice,
    FreeDevice,
    LoadPlugin(PathBuf),
    FreePlugin(PluginHandle),
    CreateStream { path: PathBuf, flags: u32 },
    FreeStream(StreamHandle),
    Play { stream: StreamHandle, restart: bool },
    Pause(StreamHandle),
    Stop(StreamHandle),
    ChannelFlags { stream: StreamHandle, flags: u32, mask: u32 },
    SetVolume(f32),
    ReleaseModule,
}

struct StubStream {
    flags: u32,
    state: ChannelState,
}

#[derive(Default)]
struct StubState {
    device_initialized: bool,
    module_released: bool,
    init_error: Option<i32>,
    failing_plugins: HashSet<PathBuf>,
    failing_streams: HashSet<PathBuf>,
    reject_flag_changes: bool,
    next_handle: u32,
    plugins: BTreeMap<PluginHandle, PathBuf>,
    streams: BTreeMap<u32, StubStream>,
    calls: Vec<BackendCall>,
    last_error: i32,
}

impl StubState {
    fn allocate_handle(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }
}

/// Desktop stub backend used for deterministic testing and CLI dry runs.
///
/// Simulates the BASS device, plugin and channel lifecycle in memory and
/// records every call. Clones share state, so a test can keep one clone for
/// inspection while the subsystem owns another.
#[derive(Clone, Default)]
pub struct DesktopStubBackend {
    state: Arc<Mutex<StubState>>,
}

impl DesktopStubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `init_device` call fail with `backend_code`.
    pub fn failing_init(self, backend_code: i32) -> Self {
        self.lock().init_error = Some(backend_code);
        self
    }

    /// Make `load_plugin` reject `path`, as if the file were not a BASS plugin.
    pub fn with_failing_plugin(self, path: impl Into<PathBuf>) -> Self {
        self.lock().failing_plugins.insert(path.into());
        self
    }

    /// Make `create_stream_from_file` reject `path`.
    pub fn with_failing_stream(self, path: impl Into<PathBuf>) -> Self {
        self.lock().failing_streams.insert(path.into());
        self
    }

    /// Make `channel_flags` fail whenever it would modify flags. Queries
    /// (`mask == 0`) still succeed.
    pub fn rejecting_flag_changes(self) -> Self {
        self.lock().reject_flag_changes = true;
        self
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    /// Number of recorded calls matching `predicate`.
    pub fn count_calls(&self, predicate: impl Fn(&BackendCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|call| predicate(call)).count()
    }

    /// Volumes forwarded through `set_volume`, in order.
    pub fn volume_log(&self) -> Vec<f32> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::SetVolume(level) => Some(*level),
                _ => None,
            })
            .collect()
    }

    pub fn is_device_initialized(&self) -> bool {
        self.lock().device_initialized
    }

    pub fn is_module_released(&self) -> bool {
        self.lock().module_released
    }

    pub fn loaded_plugins(&self) -> Vec<PathBuf> {
        self.lock().plugins.values().cloned().collect()
    }

    pub fn live_streams(&self) -> Vec<StreamHandle> {
        self.lock()
            .streams
            .keys()
            .filter_map(|raw| StreamHandle::from_raw(*raw))
            .collect()
    }

    pub fn stream_flags(&self, stream: StreamHandle) -> Option<u32> {
        self.lock().streams.get(&stream.raw()).map(|s| s.flags)
    }

    /// Simulate the backend changing a channel on its own, e.g. reaching the
    /// end of the file.
    pub fn set_channel_state(&self, stream: StreamHandle, state: ChannelState) {
        if let Some(entry) = self.lock().streams.get_mut(&stream.raw()) {
            entry.state = state;
        }
    }

    /// Simulate the backend changing channel flags behind the caller's back.
    pub fn set_stream_flags(&self, stream: StreamHandle, flags: u32) {
        if let Some(entry) = self.lock().streams.get_mut(&stream.raw()) {
            entry.flags = flags;
        }
    }

    fn lock(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` on an existing stream, recording `BASS_ERROR_HANDLE` otherwise.
    fn with_stream<T>(
        state: &mut StubState,
        stream: StreamHandle,
        f: impl FnOnce(&mut StubStream) -> Result<T, i32>,
    ) -> Option<T> {
        let result = match state.streams.get_mut(&stream.raw()) {
            Some(entry) => f(entry),
            None => Err(BASS_ERROR_HANDLE),
        };
        match result {
            Ok(value) => {
                state.last_error = BASS_OK;
                Some(value)
            }
            Err(code) => {
                state.last_error = code;
                None
            }
        }
    }
}

impl AudioBackend for DesktopStubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn init_device(&mut self, _params: &DeviceParams) -> Result<(), BindingError> {
        let mut state = self.lock();
        state.calls.push(BackendCall::InitDevice);

        let failure = match state.init_error {
            Some(code) => Some(code),
            None if state.device_initialized => Some(BASS_ERROR_ALREADY),
            None => None,
        };
        if let Some(backend_code) = failure {
            state.last_error = backend_code;
            return Err(BindingError::DeviceInitFailed { backend_code });
        }

        state.device_initialized = true;
        state.module_released = false;
        state.last_error = BASS_OK;
        Ok(())
    }

    fn free_device(&mut self) {
        let mut state = self.lock();
        state.calls.push(BackendCall::FreeDevice);
        state.device_initialized = false;
        state.streams.clear();
    }

    fn load_plugin(&mut self, path: &Path) -> Result<PluginHandle, BindingError> {
        let mut state = self.lock();
        state.calls.push(BackendCall::LoadPlugin(path.to_path_buf()));

        let backend_code = if !state.device_initialized {
            BASS_ERROR_INIT
        } else if state.failing_plugins.contains(path) {
            BASS_ERROR_FILEFORM
        } else {
            let raw = state.allocate_handle();
            let handle = PluginHandle::from_raw(raw).ok_or(BindingError::NotInitialized)?;
            state.plugins.insert(handle, path.to_path_buf());
            state.last_error = BASS_OK;
            return Ok(handle);
        };

        state.last_error = backend_code;
        Err(BindingError::PluginLoadFailed {
            path: path.to_path_buf(),
            backend_code,
        })
    }

    fn free_plugin(&mut self, plugin: PluginHandle) -> bool {
        let mut state = self.lock();
        state.calls.push(BackendCall::FreePlugin(plugin));
        state.plugins.remove(&plugin).is_some()
    }

    fn create_stream_from_file(
        &mut self,
        path: &Path,
        flags: u32,
    ) -> Result<StreamHandle, BindingError> {
        let mut state = self.lock();
        state.calls.push(BackendCall::CreateStream {
            path: path.to_path_buf(),
            flags,
        });

        let backend_code = if !state.device_initialized {
            BASS_ERROR_INIT
        } else if state.failing_streams.contains(path) {
            BASS_ERROR_FILEOPEN
        } else {
            let raw = state.allocate_handle();
            state.streams.insert(
                raw,
                StubStream {
                    flags,
                    state: ChannelState::Stopped,
                },
            );
            state.last_error = BASS_OK;
            return StreamHandle::from_raw(raw).ok_or(BindingError::NotInitialized);
        };

        state.last_error = backend_code;
        Err(BindingError::StreamCreateFailed {
            path: path.to_path_buf(),
            backend_code,
        })
    }

    fn free_stream(&mut self, stream: StreamHandle) -> bool {
        let mut state = self.lock();
        state.calls.push(BackendCall::FreeStream(stream));
        state.streams.remove(&stream.raw()).is_some()
    }

    fn play(&mut self, stream: StreamHandle, restart: bool) -> bool {
        let mut state = self.lock();
        state.calls.push(BackendCall::Play { stream, restart });
        Self::with_stream(&mut state, stream, |entry| {
            entry.state = ChannelState::Playing;
            Ok(())
        })
        .is_some()
    }

    fn pause(&mut self, stream: StreamHandle) -> bool {
        let mut state = self.lock();
        state.calls.push(BackendCall::Pause(stream));
        Self::with_stream(&mut state, stream, |entry| {
            if entry.state.is_active() {
                entry.state = ChannelState::Paused;
                Ok(())
            } else {
                Err(BASS_ERROR_NOPLAY)
            }
        })
        .is_some()
    }

    fn stop(&mut self, stream: StreamHandle) -> bool {
        let mut state = self.lock();
        state.calls.push(BackendCall::Stop(stream));
        Self::with_stream(&mut state, stream, |entry| {
            entry.state = ChannelState::Stopped;
            Ok(())
        })
        .is_some()
    }

    fn query_state(&self, stream: StreamHandle) -> ChannelState {
        self.lock()
            .streams
            .get(&stream.raw())
            .map_or(ChannelState::Stopped, |entry| entry.state)
    }

    fn channel_flags(&mut self, stream: StreamHandle, flags: u32, mask: u32) -> Option<u32> {
        let mut state = self.lock();
        state
            .calls
            .push(BackendCall::ChannelFlags { stream, flags, mask });
        let reject = state.reject_flag_changes && mask != 0;
        Self::with_stream(&mut state, stream, |entry| {
            if reject {
                return Err(BASS_ERROR_HANDLE);
            }
            entry.flags = (entry.flags & !mask) | (flags & mask);
            Ok(entry.flags)
        })
    }

    fn set_volume(&mut self, level: f32) -> bool {
        let mut state = self.lock();
        state.calls.push(BackendCall::SetVolume(level));
        if state.device_initialized {
            state.last_error = BASS_OK;
            true
        } else {
            state.last_error = BASS_ERROR_INIT;
            false
        }
    }

    fn last_error_code(&self) -> i32 {
        self.lock().last_error
    }

    fn release_module(&mut self) {
        let mut state = self.lock();
        state.calls.push(BackendCall::ReleaseModule);
        state.module_released = true;
    }
}
