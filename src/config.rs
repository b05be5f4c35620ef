//! Configuration for the audio backend binding
//!
//! Runtime configuration loaded from JSON, so module locations, device
//! parameters and the plugin list can be changed without recompiling.
//! Every field has a platform default, and a missing or broken file falls
//! back to those defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::backend::ffi::{BASS_DEVICE_16BITS, BASS_DEVICE_STEREO};
use crate::loader::module_file_name;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub plugins: PluginConfig,
    pub playback: PlaybackConfig,
}

/// How the backend entry points are bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingMode {
    /// Load the backend module at runtime and resolve its symbols
    Dynamic,
    /// Call symbols linked at build time (`static-backend` feature)
    Static,
    /// In-memory simulation, for tests and dry runs
    Stub,
}

impl Default for BindingMode {
    fn default() -> Self {
        cfg_if::cfg_if! {
            if #[cfg(all(windows, feature = "static-backend"))] {
                BindingMode::Static
            } else {
                BindingMode::Dynamic
            }
        }
    }
}

/// Backend module location and device parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub binding: BindingMode,
    /// Directory under the host module directory holding the backend and plugins
    pub module_subdir: String,
    /// Module stem; the platform prefix/suffix is added (`libbass.so`, `bass.dll`)
    pub module_stem: String,
    /// Output device, -1 for the system default
    pub device: i32,
    pub sample_rate: u32,
    pub device_flags: u32,
    /// Fail initialization when the host cannot supply a native window
    pub require_window_handle: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            binding: BindingMode::default(),
            module_subdir: "cl_dlls".to_string(),
            module_stem: "bass".to_string(),
            device: -1,
            sample_rate: 44100,
            device_flags: BASS_DEVICE_16BITS | BASS_DEVICE_STEREO,
            // DirectSound output needs a window; the Linux and macOS builds accept null
            require_window_handle: cfg!(windows),
        }
    }
}

impl BackendConfig {
    /// `<host_dir>/<module_subdir>`
    pub fn module_dir(&self, host_dir: &Path) -> PathBuf {
        host_dir.join(&self.module_subdir)
    }

    /// `<host_dir>/<module_subdir>/<platform module file name>`
    pub fn module_path(&self, host_dir: &Path) -> PathBuf {
        self.module_dir(host_dir)
            .join(module_file_name(&self.module_stem))
    }
}

/// Optional codec plugins
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// Plugin stems (`basszxtune`) or file names/paths (`libbassopus.so`),
    /// tried in order
    pub candidates: Vec<String>,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            candidates: vec!["basszxtune".to_string()],
        }
    }
}

impl PluginConfig {
    /// Resolve candidates against `module_dir`.
    ///
    /// A bare stem gets the platform file name; anything with an extension
    /// or a directory component is joined as given (absolute paths stay as
    /// they are).
    pub fn candidate_paths(&self, module_dir: &Path) -> Vec<PathBuf> {
        self.candidates
            .iter()
            .map(|candidate| {
                let as_path = Path::new(candidate);
                if as_path.extension().is_some() || as_path.components().count() > 1 {
                    module_dir.join(as_path)
                } else {
                    module_dir.join(module_file_name(candidate))
                }
            })
            .collect()
    }
}

/// Playback defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Volume applied right after initialization, if set
    pub initial_volume: Option<f32>,
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The loaded configuration, or the defaults if the file is missing or
    /// its JSON is invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        Self::load_from_file("assets/bass_config.json")
    }

    /// Load the configuration shipped next to the backend module,
    /// `<host_dir>/cl_dlls/bass_config.json`.
    ///
    /// The host's working directory is usually the game root, not the
    /// module directory, so this is what the C ABI uses. Falls back to
    /// [`load`](Self::load) when no such file exists.
    pub fn load_for_host(host_dir: &Path) -> Self {
        let path = host_config_path(host_dir);
        if path.is_file() {
            Self::load_from_file(path)
        } else {
            log::debug!("[Config] No {:?}, trying default location", path);
            Self::load()
        }
    }
}

/// `<host_dir>/<default module_subdir>/bass_config.json`
pub fn host_config_path(host_dir: &Path) -> PathBuf {
    BackendConfig::default()
        .module_dir(host_dir)
        .join(HOST_CONFIG_FILE)
}

const HOST_CONFIG_FILE: &str = "bass_config.json";
