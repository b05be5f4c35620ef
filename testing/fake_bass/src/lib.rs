//! Stand-in for the BASS 2.4 shared library.
//!
//! Exports the entry points `bass_bridge` resolves at runtime, with just
//! enough channel bookkeeping to drive play/pause/resume/stop. Nothing is
//! decoded and no audio device is opened.
//!
//! `BASS_Init` fails with [`BASS_ERROR_DEVICE`] when asked for
//! [`FAIL_DEVICE`], so tests can exercise the device-init failure path.
//!
//! State is per loaded instance. Copy the shared object to a separate file
//! per test to get independent instances.

#![allow(non_snake_case)]

use std::cell::Cell;
use std::collections::BTreeMap;
use std::ffi::{c_int, c_void};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub const FAIL_DEVICE: c_int = 7;

pub const BASS_ERROR_FILEOPEN: c_int = 2;
pub const BASS_ERROR_HANDLE: c_int = 5;
pub const BASS_ERROR_INIT: c_int = 8;
pub const BASS_ERROR_ALREADY: c_int = 14;
pub const BASS_ERROR_ILLPARAM: c_int = 20;
pub const BASS_ERROR_DEVICE: c_int = 23;
pub const BASS_ERROR_NOPLAY: c_int = 24;

const FALSE: c_int = 0;
const TRUE: c_int = 1;

const ACTIVE_STOPPED: u32 = 0;
const ACTIVE_PLAYING: u32 = 1;
const ACTIVE_PAUSED: u32 = 3;

// Real handles are large, opaque values
const HANDLE_BASE: u32 = 0x8000_0000;

struct Channel {
    flags: u32,
    active: u32,
}

struct State {
    initialized: bool,
    next_handle: u32,
    plugins: Vec<u32>,
    channels: BTreeMap<u32, Channel>,
}

static STATE: Mutex<State> = Mutex::new(State {
    initialized: false,
    next_handle: HANDLE_BASE,
    plugins: Vec::new(),
    channels: BTreeMap::new(),
});

thread_local! {
    static LAST_ERROR: Cell<c_int> = const { Cell::new(0) };
}

fn state() -> MutexGuard<'static, State> {
    STATE.lock().unwrap_or_else(PoisonError::into_inner)
}

fn fail<T>(code: c_int, value: T) -> T {
    LAST_ERROR.with(|last| last.set(code));
    value
}

fn ok<T>(value: T) -> T {
    fail(0, value)
}

impl State {
    fn allocate(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }
}

#[no_mangle]
pub extern "system" fn BASS_Init(
    device: c_int,
    _freq: u32,
    _flags: u32,
    _win: *mut c_void,
    _dsguid: *const c_void,
) -> c_int {
    let mut state = state();
    if device == FAIL_DEVICE {
        return fail(BASS_ERROR_DEVICE, FALSE);
    }
    if state.initialized {
        return fail(BASS_ERROR_ALREADY, FALSE);
    }
    state.initialized = true;
    ok(TRUE)
}

#[no_mangle]
pub extern "system" fn BASS_Free() -> c_int {
    let mut state = state();
    if !state.initialized {
        return fail(BASS_ERROR_INIT, FALSE);
    }
    state.initialized = false;
    state.channels.clear();
    ok(TRUE)
}

#[no_mangle]
pub extern "system" fn BASS_PluginLoad(file: *const c_void, _flags: u32) -> u32 {
    let mut state = state();
    if !state.initialized {
        return fail(BASS_ERROR_INIT, 0);
    }
    if file.is_null() {
        return fail(BASS_ERROR_FILEOPEN, 0);
    }
    let handle = state.allocate();
    state.plugins.push(handle);
    ok(handle)
}

#[no_mangle]
pub extern "system" fn BASS_PluginFree(handle: u32) -> c_int {
    let mut state = state();
    match state.plugins.iter().position(|plugin| *plugin == handle) {
        Some(index) => {
            state.plugins.remove(index);
            ok(TRUE)
        }
        None => fail(BASS_ERROR_HANDLE, FALSE),
    }
}

#[no_mangle]
pub extern "system" fn BASS_StreamCreateFile(
    _mem: c_int,
    file: *const c_void,
    _offset: u64,
    _length: u64,
    flags: u32,
) -> u32 {
    let mut state = state();
    if !state.initialized {
        return fail(BASS_ERROR_INIT, 0);
    }
    if file.is_null() {
        return fail(BASS_ERROR_FILEOPEN, 0);
    }
    let handle = state.allocate();
    state.channels.insert(
        handle,
        Channel {
            flags,
            active: ACTIVE_STOPPED,
        },
    );
    ok(handle)
}

#[no_mangle]
pub extern "system" fn BASS_StreamFree(handle: u32) -> c_int {
    match state().channels.remove(&handle) {
        Some(_) => ok(TRUE),
        None => fail(BASS_ERROR_HANDLE, FALSE),
    }
}

fn with_channel<T>(handle: u32, error: T, f: impl FnOnce(&mut Channel) -> Result<T, c_int>) -> T {
    let mut state = state();
    match state.channels.get_mut(&handle) {
        Some(channel) => match f(channel) {
            Ok(value) => ok(value),
            Err(code) => fail(code, error),
        },
        None => fail(BASS_ERROR_HANDLE, error),
    }
}

#[no_mangle]
pub extern "system" fn BASS_ChannelPlay(handle: u32, _restart: c_int) -> c_int {
    with_channel(handle, FALSE, |channel| {
        channel.active = ACTIVE_PLAYING;
        Ok(TRUE)
    })
}

#[no_mangle]
pub extern "system" fn BASS_ChannelPause(handle: u32) -> c_int {
    with_channel(handle, FALSE, |channel| {
        if channel.active != ACTIVE_PLAYING {
            return Err(BASS_ERROR_NOPLAY);
        }
        channel.active = ACTIVE_PAUSED;
        Ok(TRUE)
    })
}

#[no_mangle]
pub extern "system" fn BASS_ChannelStop(handle: u32) -> c_int {
    with_channel(handle, FALSE, |channel| {
        channel.active = ACTIVE_STOPPED;
        Ok(TRUE)
    })
}

#[no_mangle]
pub extern "system" fn BASS_ChannelIsActive(handle: u32) -> u32 {
    with_channel(handle, ACTIVE_STOPPED, |channel| Ok(channel.active))
}

#[no_mangle]
pub extern "system" fn BASS_ChannelFlags(handle: u32, flags: u32, mask: u32) -> u32 {
    with_channel(handle, u32::MAX, |channel| {
        channel.flags = (channel.flags & !mask) | (flags & mask);
        Ok(channel.flags)
    })
}

#[no_mangle]
pub extern "system" fn BASS_SetVolume(volume: f32) -> c_int {
    if !state().initialized {
        return fail(BASS_ERROR_INIT, FALSE);
    }
    if !(0.0..=1.0).contains(&volume) {
        return fail(BASS_ERROR_ILLPARAM, FALSE);
    }
    ok(TRUE)
}

#[no_mangle]
pub extern "system" fn BASS_ErrorGetCode() -> c_int {
    LAST_ERROR.with(Cell::get)
}
