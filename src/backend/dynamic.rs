//! Dynamic binding: the backend module is loaded at runtime.
//!
//! `init_device` loads the module, resolves the whole entry-point table and
//! only then calls `BASS_Init`. A failed device init releases the module
//! again so repeated attempts never accumulate loaded-but-unusable modules.

use std::path::{Path, PathBuf};

use crate::error::BindingError;
use crate::loader::Module;

use super::api::{BackendApi, REQUIRED_SYMBOLS};
use super::ffi::BASS_ERROR_INIT;
use super::{AudioBackend, ChannelState, DeviceParams, PluginHandle, StreamHandle};

/// Module and the table resolved from it, released together.
struct BoundModule {
    api: BackendApi,
    module: Module,
}

/// Backend bound by loading its shared module at runtime.
pub struct DynamicBackend {
    module_path: PathBuf,
    bound: Option<BoundModule>,
}

impl DynamicBackend {
    pub fn new(module_path: impl Into<PathBuf>) -> Self {
        Self {
            module_path: module_path.into(),
            bound: None,
        }
    }

    pub fn module_path(&self) -> &Path {
        &self.module_path
    }

    /// Whether the module is currently loaded and resolved.
    pub fn is_bound(&self) -> bool {
        self.bound.is_some()
    }

    /// Load `module_path`, resolve every required entry point and unload it
    /// again. Used by diagnostics to check a backend build without touching
    /// the audio device.
    pub fn probe(module_path: &Path) -> Result<&'static [&'static str], BindingError> {
        let module = Module::load(module_path)?;
        // SAFETY: the table is dropped before the module is unloaded.
        let resolved = unsafe { BackendApi::resolve(&module) }.map(drop);
        module.unload();
        resolved.map(|()| &REQUIRED_SYMBOLS[..])
    }

    fn bind(&mut self) -> Result<(), BindingError> {
        if self.bound.is_some() {
            return Ok(());
        }

        let module = Module::load(&self.module_path)?;
        // SAFETY: the table is stored next to the module in `BoundModule` and
        // never outlives it.
        let api = match unsafe { BackendApi::resolve(&module) } {
            Ok(api) => api,
            Err(err) => {
                module.unload();
                return Err(err);
            }
        };

        tracing::info!(
            "[Backend] Bound {} ({} entry points)",
            self.module_path.display(),
            REQUIRED_SYMBOLS.len()
        );
        self.bound = Some(BoundModule { api, module });
        Ok(())
    }

    fn api(&self) -> Option<&BackendApi> {
        self.bound.as_ref().map(|bound| &bound.api)
    }
}

impl AudioBackend for DynamicBackend {
    fn name(&self) -> &'static str {
        "dynamic"
    }

    fn init_device(&mut self, params: &DeviceParams) -> Result<(), BindingError> {
        self.bind()?;
        let api = self.api().ok_or(BindingError::NotInitialized)?;

        if api.init(params) {
            tracing::info!(
                "[Backend] Device {} initialized at {} Hz",
                params.device,
                params.sample_rate
            );
            return Ok(());
        }

        let backend_code = api.error_get_code();
        tracing::error!(
            "[Backend] BASS_Init failed with error {}, releasing {}",
            backend_code,
            self.module_path.display()
        );
        self.release_module();
        Err(BindingError::DeviceInitFailed { backend_code })
    }

    fn free_device(&mut self) {
        if let Some(api) = self.api() {
            if !api.free() {
                tracing::warn!("[Backend] BASS_Free failed with error {}", api.error_get_code());
            }
        }
    }

    fn load_plugin(&mut self, path: &Path) -> Result<PluginHandle, BindingError> {
        self.api()
            .ok_or(BindingError::NotInitialized)?
            .plugin_load(path)
    }

    fn free_plugin(&mut self, plugin: PluginHandle) -> bool {
        self.api().is_some_and(|api| api.plugin_free(plugin))
    }

    fn create_stream_from_file(
        &mut self,
        path: &Path,
        flags: u32,
    ) -> Result<StreamHandle, BindingError> {
        self.api()
            .ok_or(BindingError::NotInitialized)?
            .stream_create_file(path, flags)
    }

    fn free_stream(&mut self, stream: StreamHandle) -> bool {
        self.api().is_some_and(|api| api.stream_free(stream))
    }

    fn play(&mut self, stream: StreamHandle, restart: bool) -> bool {
        self.api()
            .is_some_and(|api| api.channel_play(stream, restart))
    }

    fn pause(&mut self, stream: StreamHandle) -> bool {
        self.api().is_some_and(|api| api.channel_pause(stream))
    }

    fn stop(&mut self, stream: StreamHandle) -> bool {
        self.api().is_some_and(|api| api.channel_stop(stream))
    }

    fn query_state(&self, stream: StreamHandle) -> ChannelState {
        self.api()
            .map_or(ChannelState::Stopped, |api| api.channel_is_active(stream))
    }

    fn channel_flags(&mut self, stream: StreamHandle, flags: u32, mask: u32) -> Option<u32> {
        self.api()
            .and_then(|api| api.channel_flags(stream, flags, mask))
    }

    fn set_volume(&mut self, level: f32) -> bool {
        self.api().is_some_and(|api| api.set_volume(level))
    }

    fn last_error_code(&self) -> i32 {
        self.api()
            .map_or(BASS_ERROR_INIT, |api| api.error_get_code())
    }

    fn release_module(&mut self) {
        if let Some(BoundModule { api, module }) = self.bound.take() {
            drop(api);
            module.unload();
            tracing::info!("[Backend] Released {}", self.module_path.display());
        }
    }
}
