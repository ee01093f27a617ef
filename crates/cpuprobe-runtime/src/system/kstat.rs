//! kstat `cpu_info` reader.
//!
//! `libkstat.so.1` is bound at runtime like PICL, so hosts without it simply
//! report the implementation as unsupported.
#![allow(unsafe_code)]

use std::ffi::{CStr, CString, c_char, c_int, c_uchar, c_uint, c_void};
use std::ptr;

use cpuprobe_core::{HostQueryError, HostQueryResult};
use libloading::Library;

use crate::ffi::{self, BindError, bind_symbols, c_chars_to_string};

const KSTAT_STRLEN: usize = 31;

const KSTAT_DATA_CHAR: c_uchar = 0;
const KSTAT_DATA_STRING: c_uchar = 9;

/// `kstat_t`, as far as user code may read it.
#[repr(C)]
#[allow(dead_code)]
struct Kstat {
    ks_crtime: i64,
    ks_next: *mut Kstat,
    ks_kid: c_int,
    ks_module: [c_char; KSTAT_STRLEN],
    ks_resv: c_uchar,
    ks_instance: c_int,
    ks_name: [c_char; KSTAT_STRLEN],
    ks_type: c_uchar,
    ks_class: [c_char; KSTAT_STRLEN],
    ks_flags: c_uchar,
    ks_data: *mut c_void,
    ks_ndata: c_uint,
    ks_data_size: usize,
    ks_snaptime: i64,
    ks_update: *mut c_void,
    ks_private: *mut c_void,
    ks_snapshot: *mut c_void,
    ks_lock: *mut c_void,
}

#[repr(C)]
#[derive(Clone, Copy)]
#[allow(dead_code)]
union KstatStrAddr {
    ptr: *mut c_char,
    pad: [c_char; 8],
}

#[repr(C)]
#[derive(Clone, Copy)]
#[allow(dead_code)]
struct KstatStr {
    addr: KstatStrAddr,
    len: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
#[allow(dead_code)]
union KstatValue {
    c: [c_char; 16],
    str: KstatStr,
    ui64: u64,
}

/// `kstat_named_t`.
#[repr(C)]
struct KstatNamed {
    name: [c_char; KSTAT_STRLEN],
    data_type: c_uchar,
    value: KstatValue,
}

type KstatOpenFn = unsafe extern "C" fn() -> *mut c_void;
type KstatLookupFn =
    unsafe extern "C" fn(*mut c_void, *const c_char, c_int, *const c_char) -> *mut Kstat;
type KstatReadFn = unsafe extern "C" fn(*mut c_void, *mut Kstat, *mut c_void) -> c_int;
type KstatCloseFn = unsafe extern "C" fn(*mut c_void) -> c_int;

/// A fully bound kstat library.
pub struct KstatLibrary {
    open: KstatOpenFn,
    lookup: KstatLookupFn,
    read: KstatReadFn,
    close: KstatCloseFn,
    _lib: Library,
}

/// Closes the kstat chain when dropped.
struct Chain<'a> {
    library: &'a KstatLibrary,
    ctl: *mut c_void,
}

impl Drop for Chain<'_> {
    fn drop(&mut self) {
        // SAFETY: `ctl` came from `kstat_open` and is closed exactly once.
        unsafe { (self.library.close)(self.ctl) };
    }
}

fn failed(query: &'static str, reason: impl Into<String>) -> HostQueryError {
    HostQueryError::Failed {
        query,
        reason: reason.into(),
    }
}

impl KstatLibrary {
    /// Open `library` and resolve every entry point.
    pub fn open(library: &str) -> Result<Self, BindError> {
        let lib = ffi::open(library)?;
        bind_symbols!(lib, library,
            kstat_open: KstatOpenFn,
            kstat_lookup: KstatLookupFn,
            kstat_read: KstatReadFn,
            kstat_close: KstatCloseFn,
        );
        Ok(Self {
            open: kstat_open,
            lookup: kstat_lookup,
            read: kstat_read,
            close: kstat_close,
            _lib: lib,
        })
    }

    /// Read the string field `field` of the first record of `module`.
    pub fn named_string(&self, module: &str, field: &str) -> HostQueryResult<String> {
        let module_name =
            CString::new(module).map_err(|_| failed("kstat_lookup", "interior NUL"))?;

        // SAFETY: no arguments; a null result is handled below.
        let ctl = unsafe { (self.open)() };
        if ctl.is_null() {
            return Err(failed("kstat_open", "returned NULL"));
        }
        let chain = Chain { library: self, ctl };

        // SAFETY: `ctl` is open and `module_name` is NUL-terminated. Instance
        // -1 and a NULL name match any record of the module.
        let ksp = unsafe { (self.lookup)(chain.ctl, module_name.as_ptr(), -1, ptr::null()) };
        if ksp.is_null() {
            return Err(failed("kstat_lookup", format!("no {module} record")));
        }

        // SAFETY: `ksp` belongs to the open chain; NULL asks kstat to fill
        // its own data buffer.
        if unsafe { (self.read)(chain.ctl, ksp, ptr::null_mut()) } == -1 {
            return Err(failed("kstat_read", format!("{module} unreadable")));
        }

        // SAFETY: `ksp` stays valid until the chain is closed.
        let record = unsafe { &*ksp };
        if record.ks_data.is_null() {
            return Err(failed("kstat_read", format!("{module} has no data")));
        }
        // SAFETY: after a successful read of a named kstat, `ks_data` points
        // at `ks_ndata` consecutive `kstat_named_t` entries.
        let entries = unsafe {
            std::slice::from_raw_parts(record.ks_data.cast::<KstatNamed>(), record.ks_ndata as usize)
        };

        entries
            .iter()
            .find(|entry| c_chars_to_string(&entry.name) == field)
            .ok_or_else(|| failed("kstat_read", format!("{module} has no {field}")))
            .and_then(named_value)
    }
}

fn named_value(entry: &KstatNamed) -> HostQueryResult<String> {
    match entry.data_type {
        // Older releases store short strings inline.
        // SAFETY: the data type says `c` is the active member.
        KSTAT_DATA_CHAR => Ok(c_chars_to_string(unsafe { &entry.value.c })),
        KSTAT_DATA_STRING => {
            // SAFETY: the data type says `str` is the active member.
            let ptr = unsafe { entry.value.str.addr.ptr };
            if ptr.is_null() {
                return Err(failed("kstat_read", "NULL string value"));
            }
            // SAFETY: kstat strings are NUL-terminated and live as long as
            // the chain.
            Ok(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
        }
        other => Err(failed("kstat_read", format!("unexpected data type {other}"))),
    }
}

/// The `implementation` field of kstat `cpu_info`.
pub fn cpu_implementation(library: &str) -> HostQueryResult<String> {
    KstatLibrary::open(library)?.named_string("cpu_info", "implementation")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::cast_possible_wrap)]
    fn chars<const N: usize>(text: &str) -> [c_char; N] {
        let mut out = [0; N];
        for (slot, byte) in out.iter_mut().zip(text.bytes()) {
            *slot = byte as c_char;
        }
        out
    }

    #[test]
    fn test_named_layout() {
        assert_eq!(std::mem::size_of::<KstatValue>(), 16);
        assert_eq!(std::mem::offset_of!(KstatNamed, value), 32);
    }

    #[test]
    fn test_inline_char_value() {
        let entry = KstatNamed {
            name: chars("implementation"),
            data_type: KSTAT_DATA_CHAR,
            value: KstatValue {
                c: chars("SPARC-T1"),
            },
        };
        assert_eq!(named_value(&entry).unwrap(), "SPARC-T1");
    }

    #[test]
    fn test_string_pointer_value() {
        let text = CString::new("SPARC-T5 (chipid 0)").unwrap();
        let entry = KstatNamed {
            name: chars("implementation"),
            data_type: KSTAT_DATA_STRING,
            value: KstatValue {
                str: KstatStr {
                    addr: KstatStrAddr {
                        ptr: text.as_ptr().cast_mut(),
                    },
                    len: 20,
                },
            },
        };
        assert_eq!(named_value(&entry).unwrap(), "SPARC-T5 (chipid 0)");
    }

    #[test]
    fn test_other_data_types_rejected() {
        let entry = KstatNamed {
            name: chars("implementation"),
            data_type: 4,
            value: KstatValue { ui64: 7 },
        };
        assert!(named_value(&entry).is_err());
    }

    #[test]
    fn test_missing_library_is_unsupported() {
        let err = cpu_implementation("libkstat-missing-for-tests.so.1").unwrap_err();
        assert!(matches!(err, HostQueryError::Unsupported(_)));
    }
}
