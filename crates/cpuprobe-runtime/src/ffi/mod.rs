//! Dynamic library binding.
//!
//! Optional host libraries are opened by name and every entry point is
//! resolved up front. A library is either fully bound or not used at all:
//! one missing symbol discards the whole binding.
#![allow(unsafe_code)]

use std::ffi::c_char;

use cpuprobe_core::{HostQueryError, InventoryError};
use libloading::Library;
use thiserror::Error;

/// Failure to open a library or resolve one of its symbols.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("{library} is missing: {reason}")]
    Unavailable { library: String, reason: String },

    #[error("{library} does not export {symbol}")]
    SymbolMissing {
        library: String,
        symbol: &'static str,
    },
}

impl From<BindError> for InventoryError {
    fn from(err: BindError) -> Self {
        match err {
            BindError::Unavailable { library, reason } => {
                Self::LibraryUnavailable { library, reason }
            }
            BindError::SymbolMissing { library, symbol } => Self::SymbolMissing {
                library,
                symbol: symbol.to_string(),
            },
        }
    }
}

impl From<BindError> for HostQueryError {
    fn from(err: BindError) -> Self {
        match err {
            BindError::Unavailable { .. } => Self::Unsupported("kstat"),
            BindError::SymbolMissing { symbol, .. } => Self::Failed {
                query: "kstat",
                reason: format!("symbol {symbol} missing"),
            },
        }
    }
}

/// Open a shared library by name.
pub fn open(library: &str) -> Result<Library, BindError> {
    // SAFETY: the libraries opened here are system libraries whose
    // initializers have no preconditions on the caller.
    unsafe { Library::new(library) }.map_err(|e| BindError::Unavailable {
        library: library.to_string(),
        reason: e.to_string(),
    })
}

/// Resolve `symbol` from `lib` as a value of type `T`.
///
/// # Safety
///
/// `T` must be a function pointer type matching the C signature of `symbol`.
/// The returned pointer must not be called after `lib` is dropped.
pub unsafe fn bind<T: Copy>(
    lib: &Library,
    library: &str,
    symbol: &'static str,
) -> Result<T, BindError> {
    // SAFETY: forwarded to the caller.
    unsafe { lib.get::<T>(symbol.as_bytes()) }
        .map(|resolved| *resolved)
        .map_err(|_| BindError::SymbolMissing {
            library: library.to_string(),
            symbol,
        })
}

// e.g.
// bind_symbols!(lib, "libpicl.so.1", picl_initialize: InitializeFn);
// =>
// let picl_initialize: InitializeFn = unsafe { bind(&lib, "libpicl.so.1", "picl_initialize")? };
macro_rules! bind_symbols {
    ($lib:expr, $library:expr, $($name:ident : $ty:ty),* $(,)?) => {
        $(
            // SAFETY: `$ty` mirrors the C prototype of `$name`.
            let $name: $ty = unsafe {
                $crate::ffi::bind::<$ty>(&$lib, $library, stringify!($name))?
            };
        )*
    };
}

pub(crate) use bind_symbols;

/// Text of a NUL-terminated C character array; stops at the array end if no
/// NUL is present.
pub fn c_chars_to_string(chars: &[c_char]) -> String {
    #[allow(clippy::cast_sign_loss)]
    let bytes: Vec<u8> = chars
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}
