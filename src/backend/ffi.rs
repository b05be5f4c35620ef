//! Raw BASS types, constants and entry-point signatures.
//!
//! Signatures live here, next to their consumer, so a mismatch between the
//! table in `api.rs` and the linked declarations is a compile error.

#![allow(non_snake_case, clippy::upper_case_acronyms)]

use std::ffi::{c_int, c_void};
use std::path::Path;

use crate::error::BindingError;

pub type BOOL = c_int;
pub type DWORD = u32;
pub type QWORD = u64;
pub type HSTREAM = DWORD;
pub type HPLUGIN = DWORD;

pub const FALSE: BOOL = 0;
pub const TRUE: BOOL = 1;

// BASS_Init flags
pub const BASS_DEVICE_8BITS: DWORD = 1;
pub const BASS_DEVICE_MONO: DWORD = 2;
pub const BASS_DEVICE_16BITS: DWORD = 8;
pub const BASS_DEVICE_STEREO: DWORD = 0x8000;

// Sample/stream flags
pub const BASS_SAMPLE_LOOP: DWORD = 4;
pub const BASS_UNICODE: DWORD = 0x8000_0000;

// BASS_ChannelIsActive return values
pub const BASS_ACTIVE_STOPPED: DWORD = 0;
pub const BASS_ACTIVE_PLAYING: DWORD = 1;
pub const BASS_ACTIVE_STALLED: DWORD = 2;
pub const BASS_ACTIVE_PAUSED: DWORD = 3;
pub const BASS_ACTIVE_PAUSED_DEVICE: DWORD = 4;

// Error codes from BASS_ErrorGetCode
pub const BASS_OK: c_int = 0;
pub const BASS_ERROR_FILEOPEN: c_int = 2;
pub const BASS_ERROR_HANDLE: c_int = 5;
pub const BASS_ERROR_INIT: c_int = 8;
pub const BASS_ERROR_ALREADY: c_int = 14;
pub const BASS_ERROR_NOPLAY: c_int = 24;
pub const BASS_ERROR_FILEFORM: c_int = 41;

/// `BASS_ChannelFlags` returns -1 on failure.
pub const BASS_FLAGS_ERROR: DWORD = DWORD::MAX;

pub type InitFn = unsafe extern "system" fn(c_int, DWORD, DWORD, *mut c_void, *const c_void) -> BOOL;
pub type FreeFn = unsafe extern "system" fn() -> BOOL;
pub type PluginLoadFn = unsafe extern "system" fn(*const c_void, DWORD) -> HPLUGIN;
pub type PluginFreeFn = unsafe extern "system" fn(HPLUGIN) -> BOOL;
pub type StreamCreateFileFn =
    unsafe extern "system" fn(BOOL, *const c_void, QWORD, QWORD, DWORD) -> HSTREAM;
pub type StreamFreeFn = unsafe extern "system" fn(HSTREAM) -> BOOL;
pub type ChannelPlayFn = unsafe extern "system" fn(DWORD, BOOL) -> BOOL;
pub type ChannelPauseFn = unsafe extern "system" fn(DWORD) -> BOOL;
pub type ChannelStopFn = unsafe extern "system" fn(DWORD) -> BOOL;
pub type ChannelIsActiveFn = unsafe extern "system" fn(DWORD) -> DWORD;
pub type ChannelFlagsFn = unsafe extern "system" fn(DWORD, DWORD, DWORD) -> DWORD;
pub type SetVolumeFn = unsafe extern "system" fn(f32) -> BOOL;
pub type ErrorGetCodeFn = unsafe extern "system" fn() -> c_int;

#[cfg(feature = "static-backend")]
#[link(name = "bass")]
extern "system" {
    pub fn BASS_Init(
        device: c_int,
        freq: DWORD,
        flags: DWORD,
        win: *mut c_void,
        dsguid: *const c_void,
    ) -> BOOL;
    pub fn BASS_Free() -> BOOL;
    pub fn BASS_PluginLoad(file: *const c_void, flags: DWORD) -> HPLUGIN;
    pub fn BASS_PluginFree(handle: HPLUGIN) -> BOOL;
    pub fn BASS_StreamCreateFile(
        mem: BOOL,
        file: *const c_void,
        offset: QWORD,
        length: QWORD,
        flags: DWORD,
    ) -> HSTREAM;
    pub fn BASS_StreamFree(handle: HSTREAM) -> BOOL;
    pub fn BASS_ChannelPlay(handle: DWORD, restart: BOOL) -> BOOL;
    pub fn BASS_ChannelPause(handle: DWORD) -> BOOL;
    pub fn BASS_ChannelStop(handle: DWORD) -> BOOL;
    pub fn BASS_ChannelIsActive(handle: DWORD) -> DWORD;
    pub fn BASS_ChannelFlags(handle: DWORD, flags: DWORD, mask: DWORD) -> DWORD;
    pub fn BASS_SetVolume(volume: f32) -> BOOL;
    pub fn BASS_ErrorGetCode() -> c_int;
}

/// A file path encoded the way BASS expects it on this platform.
///
/// Windows takes UTF-16 together with `BASS_UNICODE`; everywhere else the
/// raw NUL-terminated bytes are passed through.
pub struct PathArg {
    #[cfg(windows)]
    wide: Vec<u16>,
    #[cfg(not(windows))]
    bytes: std::ffi::CString,
}

impl PathArg {
    pub fn new(path: &Path) -> Result<Self, BindingError> {
        let invalid = || BindingError::InvalidPath {
            path: path.to_path_buf(),
        };

        cfg_if::cfg_if! {
            if #[cfg(windows)] {
                use std::os::windows::ffi::OsStrExt;

                let mut wide: Vec<u16> = path.as_os_str().encode_wide().collect();
                if wide.contains(&0) {
                    return Err(invalid());
                }
                wide.push(0);
                Ok(Self { wide })
            } else if #[cfg(unix)] {
                use std::os::unix::ffi::OsStrExt;

                let bytes = std::ffi::CString::new(path.as_os_str().as_bytes())
                    .map_err(|_| invalid())?;
                Ok(Self { bytes })
            } else {
                let text = path.to_str().ok_or_else(invalid)?;
                let bytes = std::ffi::CString::new(text).map_err(|_| invalid())?;
                Ok(Self { bytes })
            }
        }
    }

    pub fn as_ptr(&self) -> *const c_void {
        #[cfg(windows)]
        {
            self.wide.as_ptr().cast()
        }
        #[cfg(not(windows))]
        {
            self.bytes.as_ptr().cast()
        }
    }

    /// Extra flags BASS needs to interpret [`as_ptr`](Self::as_ptr).
    pub fn flags(&self) -> DWORD {
        if cfg!(windows) {
            BASS_UNICODE
        } else {
            0
        }
    }
}

pub fn to_bool(value: BOOL) -> bool {
    value != FALSE
}
