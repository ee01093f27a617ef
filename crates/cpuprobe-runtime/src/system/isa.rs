//! `getisax(2)` and `sysinfo(2)`.
//!
//! Both are resolved from the running process instead of being linked, so
//! the crate builds on every Unix and simply reports the calls as
//! unsupported where libc lacks them.
#![allow(unsafe_code)]

use std::ffi::{c_char, c_int, c_long};

use cpuprobe_core::{HostQueryError, HostQueryResult, IsaWords, SysInfoQuery};

/// Words requested from `getisax`. Releases with one word fill only the first.
const ISA_WORDS: usize = 2;

/// Query the instruction-set extension words.
#[cfg(unix)]
pub fn isa_words() -> HostQueryResult<IsaWords> {
    use std::ffi::c_uint;

    use libloading::os::unix::Library;

    type GetisaxFn = unsafe extern "C" fn(*mut u32, c_uint) -> c_uint;

    let this = Library::this();
    // SAFETY: `GetisaxFn` matches the libc prototype of `getisax`.
    let getisax = unsafe { this.get::<GetisaxFn>(b"getisax") }
        .map_err(|_| HostQueryError::Unsupported("getisax"))?;

    let mut words = [0u32; ISA_WORDS];
    #[allow(clippy::cast_possible_truncation)]
    // SAFETY: `words` holds exactly `ISA_WORDS` writable elements.
    let filled = unsafe { getisax(words.as_mut_ptr(), ISA_WORDS as c_uint) };
    words_from_getisax(words, filled as usize)
}

#[cfg(not(unix))]
pub fn isa_words() -> HostQueryResult<IsaWords> {
    Err(HostQueryError::Unsupported("getisax"))
}

fn words_from_getisax(words: [u32; ISA_WORDS], filled: usize) -> HostQueryResult<IsaWords> {
    match filled {
        0 => Err(HostQueryError::Failed {
            query: "getisax",
            reason: "no words returned".to_string(),
        }),
        1 => Ok(IsaWords {
            primary: words[0],
            secondary: None,
        }),
        _ => Ok(IsaWords {
            primary: words[0],
            secondary: Some(words[1]),
        }),
    }
}

/// `long sysinfo(int command, char *buf, long count)`.
type SysinfoFn = unsafe extern "C" fn(c_int, *mut c_char, c_long) -> c_long;

/// Buffer length for a `sysinfo` size report, NUL included.
fn sysinfo_buffer_len(needed: c_long) -> Result<usize, String> {
    match usize::try_from(needed) {
        Ok(0) => Err("empty value".to_string()),
        Ok(len) => Ok(len),
        Err(_) => Err(format!("returned {needed}")),
    }
}

/// Size the buffer with a first call, then read the value with a second.
#[cfg_attr(
    not(any(target_os = "solaris", target_os = "illumos")),
    allow(dead_code)
)]
fn read_sysinfo(sysinfo: SysinfoFn, query: SysInfoQuery) -> HostQueryResult<String> {
    let failed = |reason: String| HostQueryError::Failed {
        query: query.name(),
        reason,
    };

    let mut probe: c_char = 0;
    // SAFETY: a one-byte buffer is passed with a count of one.
    let needed = unsafe { sysinfo(query.command(), &raw mut probe, 1) };
    let size = sysinfo_buffer_len(needed).map_err(failed)?;

    let mut buffer: Vec<c_char> = vec![0; size];
    // SAFETY: `buffer` holds `size` writable bytes, which is what `needed`
    // reported.
    let written = unsafe { sysinfo(query.command(), buffer.as_mut_ptr(), needed) };
    if written != needed {
        return Err(failed(format!("size changed from {needed} to {written}")));
    }
    Ok(crate::ffi::c_chars_to_string(&buffer))
}

/// Read one `sysinfo` string.
#[cfg(any(target_os = "solaris", target_os = "illumos"))]
pub fn sysinfo_string(query: SysInfoQuery) -> HostQueryResult<String> {
    use libloading::os::unix::Library;

    let this = Library::this();
    // SAFETY: `SysinfoFn` matches the Solaris prototype of `sysinfo`.
    let sysinfo = unsafe { this.get::<SysinfoFn>(b"sysinfo") }
        .map_err(|_| HostQueryError::Unsupported("sysinfo"))?;
    read_sysinfo(*sysinfo, query)
}

#[cfg(not(any(target_os = "solaris", target_os = "illumos")))]
pub fn sysinfo_string(_query: SysInfoQuery) -> HostQueryResult<String> {
    Err(HostQueryError::Unsupported("sysinfo"))
}
