// C ABI for the host client module
// Exposes the Initialize/Shutdown/Play/Pause/Stop/SetVolume contract as plain
// C functions over one process-wide AudioManager.

use std::ffi::{c_char, c_void, CStr};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use once_cell::sync::Lazy;

use crate::backend::{FixedWindow, NativeWindow};
use crate::config::AppConfig;
use crate::context::AudioManager;
use crate::reporter::LogReporter;

/// Global manager instance
///
/// C callers cannot hold a Rust value, so the single manager lives here.
/// The core types stay instance-based; only this module is process-wide.
static MANAGER: Lazy<Mutex<Option<AudioManager>>> = Lazy::new(|| Mutex::new(None));

fn manager() -> MutexGuard<'static, Option<AudioManager>> {
    MANAGER.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Install a `tracing` subscriber for the C ABI entry points.
///
/// The host is not Rust, so nothing else would install one. Library code
/// below this module only emits through `log`/`tracing`. A subscriber that
/// is already installed wins.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Borrow a NUL-terminated path from the host.
///
/// On unix the bytes are taken as-is, since paths need not be UTF-8.
/// Elsewhere the string must be UTF-8.
///
/// # Safety
/// `raw` must be null or point to a valid NUL-terminated string.
unsafe fn path_arg<'a>(raw: *const c_char, context: &str) -> Option<&'a Path> {
    if raw.is_null() {
        log::warn!("[Api] {}: null path", context);
        return None;
    }
    let raw = CStr::from_ptr(raw);

    cfg_if::cfg_if! {
        if #[cfg(unix)] {
            use std::os::unix::ffi::OsStrExt;

            Some(Path::new(std::ffi::OsStr::from_bytes(raw.to_bytes())))
        } else {
            match raw.to_str() {
                Ok(path) => Some(Path::new(path)),
                Err(_) => {
                    log::warn!("[Api] {}: path is not valid UTF-8", context);
                    None
                }
            }
        }
    }
}

/// Initialize the audio subsystem.
///
/// `host_dir` is the host module directory (the backend and
/// `bass_config.json` are looked up in its `cl_dlls` subdirectory). `window`
/// is the native window handle, or null.
/// Returns `false` on a fatal failure, which has already been reported.
///
/// # Safety
/// `host_dir` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn bass_bridge_initialize(host_dir: *const c_char, window: *mut c_void) -> bool {
    init_logging();

    let Some(host_dir) = path_arg(host_dir, "initialize") else {
        return false;
    };

    let mut guard = manager();
    if guard.as_ref().is_some_and(AudioManager::is_initialized) {
        log::warn!("[Api] initialize called twice");
        return true;
    }

    let manager = guard.insert(AudioManager::new(
        AppConfig::load_for_host(host_dir),
        Box::new(FixedWindow(NativeWindow::from_raw(window))),
        Arc::new(LogReporter),
    ));
    manager.initialize(host_dir)
}

/// Release everything. Safe to call without a successful initialize.
#[no_mangle]
pub extern "C" fn bass_bridge_shutdown() {
    if let Some(mut manager) = manager().take() {
        manager.shutdown();
    }
}

/// Play the file at `path`. Ignored while a song is already playing.
///
/// # Safety
/// `path` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn bass_bridge_play(path: *const c_char, looping: bool) {
    let Some(path) = path_arg(path, "play") else {
        return;
    };
    if let Some(manager) = manager().as_mut() {
        manager.play(path, looping);
    }
}

#[no_mangle]
pub extern "C" fn bass_bridge_pause_or_resume() {
    if let Some(manager) = manager().as_mut() {
        manager.pause_or_resume();
    }
}

#[no_mangle]
pub extern "C" fn bass_bridge_stop() {
    if let Some(manager) = manager().as_mut() {
        manager.stop();
    }
}

/// Set the output volume, clamped to `[0, 1]`.
#[no_mangle]
pub extern "C" fn bass_bridge_set_volume(level: f32) {
    if let Some(manager) = manager().as_mut() {
        manager.set_volume(level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[cfg(unix)]
    #[test]
    fn test_path_arg_keeps_non_utf8_bytes() {
        use std::os::unix::ffi::OsStrExt;

        let raw = CString::new(b"/games/hl/mymod/media/m\xfcsic.mp3".to_vec()).unwrap();
        let path = unsafe { path_arg(raw.as_ptr(), "play") }.unwrap();
        assert_eq!(
            path.as_os_str().as_bytes(),
            b"/games/hl/mymod/media/m\xfcsic.mp3"
        );
    }

    #[test]
    fn test_path_arg_rejects_null() {
        assert!(unsafe { path_arg(std::ptr::null(), "play") }.is_none());
    }

    #[test]
    fn test_init_logging_tolerates_existing_subscriber() {
        init_logging();
        init_logging();
        tracing::info!("[Api] logging initialized twice");
    }

    // One test touches the global so there is no ordering between tests
    #[test]
    fn test_c_abi_without_backend() {
        unsafe {
            assert!(!bass_bridge_initialize(std::ptr::null(), std::ptr::null_mut()));

            let missing = CString::new("/nonexistent/bass_bridge/host").unwrap();
            assert!(!bass_bridge_initialize(missing.as_ptr(), std::ptr::null_mut()));

            let song = CString::new("theme.mp3").unwrap();
            bass_bridge_play(song.as_ptr(), true);
            bass_bridge_play(std::ptr::null(), false);
        }
        bass_bridge_pause_or_resume();
        bass_bridge_stop();
        bass_bridge_set_volume(0.5);
        bass_bridge_shutdown();
        bass_bridge_shutdown();
    }
}
