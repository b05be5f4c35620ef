//! Static binding: BASS is linked at build time.
//!
//! The entry-point table points straight at the link-time symbols, so this
//! binding is a pass-through with no module to own or release.

use std::path::Path;

use crate::error::BindingError;

use super::api::BackendApi;
use super::{AudioBackend, ChannelState, DeviceParams, PluginHandle, StreamHandle};

pub struct LinkedBackend {
    api: BackendApi,
}

impl LinkedBackend {
    pub fn new() -> Self {
        Self {
            api: BackendApi::linked(),
        }
    }
}

impl Default for LinkedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for LinkedBackend {
    fn name(&self) -> &'static str {
        "static"
    }

    fn init_device(&mut self, params: &DeviceParams) -> Result<(), BindingError> {
        if self.api.init(params) {
            log::info!(
                "[Backend] Device {} initialized at {} Hz",
                params.device,
                params.sample_rate
            );
            Ok(())
        } else {
            Err(BindingError::DeviceInitFailed {
                backend_code: self.api.error_get_code(),
            })
        }
    }

    fn free_device(&mut self) {
        if !self.api.free() {
            log::warn!("[Backend] BASS_Free failed with error {}", self.api.error_get_code());
        }
    }

    fn load_plugin(&mut self, path: &Path) -> Result<PluginHandle, BindingError> {
        self.api.plugin_load(path)
    }

    fn free_plugin(&mut self, plugin: PluginHandle) -> bool {
        self.api.plugin_free(plugin)
    }

    fn create_stream_from_file(
        &mut self,
        path: &Path,
        flags: u32,
    ) -> Result<StreamHandle, BindingError> {
        self.api.stream_create_file(path, flags)
    }

    fn free_stream(&mut self, stream: StreamHandle) -> bool {
        self.api.stream_free(stream)
    }

    fn play(&mut self, stream: StreamHandle, restart: bool) -> bool {
        self.api.channel_play(stream, restart)
    }

    fn pause(&mut self, stream: StreamHandle) -> bool {
        self.api.channel_pause(stream)
    }

    fn stop(&mut self, stream: StreamHandle) -> bool {
        self.api.channel_stop(stream)
    }

    fn query_state(&self, stream: StreamHandle) -> ChannelState {
        self.api.channel_is_active(stream)
    }

    fn channel_flags(&mut self, stream: StreamHandle, flags: u32, mask: u32) -> Option<u32> {
        self.api.channel_flags(stream, flags, mask)
    }

    fn set_volume(&mut self, level: f32) -> bool {
        self.api.set_volume(level)
    }

    fn last_error_code(&self) -> i32 {
        self.api.error_get_code()
    }

    fn release_module(&mut self) {}
}
