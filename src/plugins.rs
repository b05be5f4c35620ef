//! Codec plugin registry.
//!
//! Plugins are optional: a missing file is skipped quietly, a file the
//! backend rejects is reported and skipped, and neither stops the audio
//! subsystem from starting.

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::backend::{AudioBackend, PluginHandle};
use crate::error::log_binding_error;
use crate::reporter::{report_binding_error, ErrorReporter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginStatus {
    Loaded(PluginHandle),
    /// File not present; not an error
    Skipped,
    /// Present but rejected by the backend (reported)
    Failed { backend_code: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginOutcome {
    pub path: PathBuf,
    pub status: PluginStatus,
}

/// Plugins registered with one backend instance.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    outcomes: Vec<PluginOutcome>,
    registered: bool,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try each candidate in order. Must run after the device is initialized.
    ///
    /// Registration happens once; a second call returns the first result.
    pub fn register(
        &mut self,
        backend: &mut dyn AudioBackend,
        candidates: &[PathBuf],
        reporter: &dyn ErrorReporter,
    ) -> &[PluginOutcome] {
        if self.registered {
            warn!("[Plugins] Plugins already registered, ignoring second registration");
            return &self.outcomes;
        }

        self.registered = true;
        for path in candidates {
            let status = Self::register_one(backend, path, reporter);
            self.outcomes.push(PluginOutcome {
                path: path.clone(),
                status,
            });
        }

        &self.outcomes
    }

    fn register_one(
        backend: &mut dyn AudioBackend,
        path: &Path,
        reporter: &dyn ErrorReporter,
    ) -> PluginStatus {
        if !path.exists() {
            info!("[Plugins] {} not present, skipping", path.display());
            return PluginStatus::Skipped;
        }

        match backend.load_plugin(path) {
            Ok(handle) => {
                info!("[Plugins] Loaded {}", path.display());
                PluginStatus::Loaded(handle)
            }
            Err(err) => {
                log_binding_error(&err, "register_plugins");
                report_binding_error(reporter, &err, path);
                PluginStatus::Failed {
                    backend_code: err.backend_code(),
                }
            }
        }
    }

    pub fn outcomes(&self) -> &[PluginOutcome] {
        &self.outcomes
    }

    pub fn loaded(&self) -> impl Iterator<Item = PluginHandle> + '_ {
        self.outcomes.iter().filter_map(|outcome| match outcome.status {
            PluginStatus::Loaded(handle) => Some(handle),
            _ => None,
        })
    }

    /// Free every loaded plugin. Returns how many were freed.
    pub fn release(&mut self, backend: &mut dyn AudioBackend) -> usize {
        let mut freed = 0;
        for outcome in self.outcomes.drain(..) {
            if let PluginStatus::Loaded(handle) = outcome.status {
                if backend.free_plugin(handle) {
                    freed += 1;
                } else {
                    warn!("[Plugins] Failed to free {}", outcome.path.display());
                }
            }
        }
        freed
    }
}
