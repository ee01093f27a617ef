//! Raw PICL declarations, matching `<picl.h>`.

use std::ffi::{c_char, c_int, c_uint, c_void};

pub type PiclNodeHdl = u64;
pub type PiclPropHdl = u64;

pub const PICL_SUCCESS: c_int = 0;

pub const PICL_WALK_CONTINUE: c_int = 0;
pub const PICL_WALK_TERMINATE: c_int = 1;

pub const PICL_PTYPE_INT: c_int = 2;
pub const PICL_PTYPE_UNSIGNED_INT: c_int = 3;

pub const PICL_PROPNAMELEN_MAX: usize = 256;

/// `picl_propinfo_t`.
#[repr(C)]
pub struct PiclPropInfo {
    pub prop_type: c_int,
    pub access_mode: c_uint,
    pub size: usize,
    pub name: [c_char; PICL_PROPNAMELEN_MAX],
}

impl Default for PiclPropInfo {
    fn default() -> Self {
        Self {
            prop_type: 0,
            access_mode: 0,
            size: 0,
            name: [0; PICL_PROPNAMELEN_MAX],
        }
    }
}

pub type WalkCallback = extern "C" fn(PiclNodeHdl, *mut c_void) -> c_int;

pub type InitializeFn = unsafe extern "C" fn() -> c_int;
pub type ShutdownFn = unsafe extern "C" fn() -> c_int;
pub type GetRootFn = unsafe extern "C" fn(*mut PiclNodeHdl) -> c_int;
pub type WalkTreeByClassFn =
    unsafe extern "C" fn(PiclNodeHdl, *const c_char, *mut c_void, WalkCallback) -> c_int;
pub type GetPropByNameFn =
    unsafe extern "C" fn(PiclNodeHdl, *const c_char, *mut PiclPropHdl) -> c_int;
pub type GetPropvalFn = unsafe extern "C" fn(PiclPropHdl, *mut c_void, usize) -> c_int;
pub type GetPropinfoFn = unsafe extern "C" fn(PiclPropHdl, *mut PiclPropInfo) -> c_int;
