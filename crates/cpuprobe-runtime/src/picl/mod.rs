//! PICL hardware-inventory adapter.
//!
//! `libpicl.so.1` is optional on Solaris, so it is opened with `dlopen`
//! instead of being linked. [`PiclLoader`] implements the core's
//! `InventoryLoader` port and hands out a [`PiclLibrary`] only when all
//! seven entry points resolve. Dropping the [`PiclLibrary`] closes the
//! library.
#![allow(unsafe_code)]

mod sys;

use std::ffi::{CString, c_int, c_void};
use std::mem::size_of;
use std::panic::{self, AssertUnwindSafe};

use cpuprobe_core::{
    DeviceInventory, InventoryError, InventoryLoader, InventoryResult, NodeHandle, WalkControl,
};
use libloading::Library;
use tracing::debug;

use crate::ffi::{self, BindError, bind_symbols};
use sys::{
    GetPropByNameFn, GetPropinfoFn, GetPropvalFn, GetRootFn, InitializeFn, PICL_PTYPE_INT,
    PICL_PTYPE_UNSIGNED_INT, PICL_SUCCESS, PICL_WALK_CONTINUE, PICL_WALK_TERMINATE,
    PiclNodeHdl, PiclPropHdl, PiclPropInfo, ShutdownFn, WalkTreeByClassFn,
};

/// Opens PICL libraries by name.
#[derive(Debug, Clone, Copy, Default)]
pub struct PiclLoader;

impl PiclLoader {
    pub const fn new() -> Self {
        Self
    }
}

impl InventoryLoader for PiclLoader {
    fn open(&self, library: &str) -> InventoryResult<Box<dyn DeviceInventory>> {
        let bound = PiclLibrary::open(library)?;
        debug!(library, "PICL bound");
        Ok(Box::new(bound))
    }
}

/// A fully bound PICL library.
pub struct PiclLibrary {
    initialize: InitializeFn,
    shutdown: ShutdownFn,
    get_root: GetRootFn,
    walk_tree_by_class: WalkTreeByClassFn,
    get_prop_by_name: GetPropByNameFn,
    get_propval: GetPropvalFn,
    get_propinfo: GetPropinfoFn,
    // Declared last so the pointers above never outlive the mapping.
    _lib: Library,
}

impl PiclLibrary {
    /// Open `library` and resolve every entry point.
    pub fn open(library: &str) -> Result<Self, BindError> {
        let lib = ffi::open(library)?;
        bind_symbols!(lib, library,
            picl_initialize: InitializeFn,
            picl_shutdown: ShutdownFn,
            picl_get_root: GetRootFn,
            picl_walk_tree_by_class: WalkTreeByClassFn,
            picl_get_prop_by_name: GetPropByNameFn,
            picl_get_propval: GetPropvalFn,
            picl_get_propinfo: GetPropinfoFn,
        );
        Ok(Self {
            initialize: picl_initialize,
            shutdown: picl_shutdown,
            get_root: picl_get_root,
            walk_tree_by_class: picl_walk_tree_by_class,
            get_prop_by_name: picl_get_prop_by_name,
            get_propval: picl_get_propval,
            get_propinfo: picl_get_propinfo,
            _lib: lib,
        })
    }

    fn prop_value<T: Default>(&self, proph: PiclPropHdl, name: &str) -> InventoryResult<T> {
        let mut value = T::default();
        // SAFETY: `value` is a live, writable buffer of exactly `size_of::<T>()` bytes.
        let status = unsafe {
            (self.get_propval)(proph, (&raw mut value).cast::<c_void>(), size_of::<T>())
        };
        if status != PICL_SUCCESS {
            return Err(property_error(name, format!("picl_get_propval status {status}")));
        }
        Ok(value)
    }
}

fn session_status(operation: &'static str, status: c_int) -> InventoryResult<()> {
    if status == PICL_SUCCESS {
        Ok(())
    } else {
        Err(InventoryError::Session { operation, status })
    }
}

fn property_error(name: &str, reason: impl Into<String>) -> InventoryError {
    InventoryError::PropertyRead {
        name: name.to_string(),
        reason: reason.into(),
    }
}

fn c_string(value: &str) -> InventoryResult<CString> {
    CString::new(value).map_err(|_| property_error(value, "interior NUL"))
}

type Visitor<'a> = &'a mut dyn FnMut(NodeHandle) -> WalkControl;

extern "C" fn visit_node(node: PiclNodeHdl, arg: *mut c_void) -> c_int {
    // SAFETY: `arg` is the `Visitor` that `walk_by_class` passed in; it lives
    // on that frame until `picl_walk_tree_by_class` returns.
    let visitor = unsafe { &mut *arg.cast::<Visitor<'_>>() };
    // Unwinding into C is undefined; a panicking visitor ends the walk.
    let verdict = panic::catch_unwind(AssertUnwindSafe(|| (*visitor)(NodeHandle(node))))
        .unwrap_or(WalkControl::Terminate);
    match verdict {
        WalkControl::Continue => PICL_WALK_CONTINUE,
        WalkControl::Terminate => PICL_WALK_TERMINATE,
    }
}

impl DeviceInventory for PiclLibrary {
    fn initialize(&self) -> InventoryResult<()> {
        // SAFETY: bound from `picl_initialize`, no arguments.
        session_status("picl_initialize", unsafe { (self.initialize)() })
    }

    fn shutdown(&self) -> InventoryResult<()> {
        // SAFETY: bound from `picl_shutdown`, no arguments.
        session_status("picl_shutdown", unsafe { (self.shutdown)() })
    }

    fn root(&self) -> InventoryResult<NodeHandle> {
        let mut root: PiclNodeHdl = 0;
        // SAFETY: `root` is a valid out-pointer for the call.
        session_status("picl_get_root", unsafe { (self.get_root)(&raw mut root) })?;
        Ok(NodeHandle(root))
    }

    fn walk_by_class(
        &self,
        root: NodeHandle,
        class: &str,
        visitor: &mut dyn FnMut(NodeHandle) -> WalkControl,
    ) -> InventoryResult<()> {
        let class = CString::new(class).map_err(|_| InventoryError::Session {
            operation: "picl_walk_tree_by_class",
            status: -1,
        })?;
        let mut visitor: Visitor<'_> = visitor;
        let arg = (&raw mut visitor).cast::<c_void>();
        // SAFETY: `class` and `visitor` outlive the call, and `visit_node`
        // only casts `arg` back to the `Visitor` it points at.
        let status =
            unsafe { (self.walk_tree_by_class)(root.0, class.as_ptr(), arg, visit_node) };
        session_status("picl_walk_tree_by_class", status)
    }

    fn int_property(&self, node: NodeHandle, name: &str) -> InventoryResult<i32> {
        let c_name = c_string(name)?;
        let mut proph: PiclPropHdl = 0;
        let mut info = PiclPropInfo::default();

        // SAFETY: `c_name` is NUL-terminated; `proph` and `info` are valid
        // out-pointers.
        let found = unsafe {
            (self.get_prop_by_name)(node.0, c_name.as_ptr(), &raw mut proph) == PICL_SUCCESS
                && (self.get_propinfo)(proph, &raw mut info) == PICL_SUCCESS
        };
        if !found {
            return Err(property_error(name, "not present"));
        }

        match int_width(&info, name)? {
            8 => self.prop_value::<i64>(proph, name).map(narrow),
            _ => self.prop_value::<i32>(proph, name),
        }
    }
}

/// Byte width of an integer property.
///
/// The tree stores 32- or 64-bit integers depending on the platform; any
/// other type or size is unreadable.
fn int_width(info: &PiclPropInfo, name: &str) -> InventoryResult<usize> {
    if info.prop_type != PICL_PTYPE_INT && info.prop_type != PICL_PTYPE_UNSIGNED_INT {
        debug!(property = name, prop_type = info.prop_type, "Invalid property type");
        return Err(property_error(name, format!("type {}", info.prop_type)));
    }
    match info.size {
        4 | 8 => Ok(info.size),
        size => {
            debug!(property = name, size, "Unexpected integer property size");
            Err(property_error(name, format!("size {size}")))
        }
    }
}

/// Keep the low 32 bits of a 64-bit property value.
#[allow(clippy::cast_possible_truncation)]
const fn narrow(value: i64) -> i32 {
    value as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_library_is_unavailable() {
        let err = PiclLoader::new()
            .open("libpicl-missing-for-tests.so.1")
            .err()
            .unwrap();
        assert!(matches!(err, InventoryError::LibraryUnavailable { .. }));
    }

    #[test]
    fn test_session_status_mapping() {
        assert!(session_status("picl_initialize", PICL_SUCCESS).is_ok());
        let err = session_status("picl_initialize", 1).unwrap_err();
        assert_eq!(err.to_string(), "picl_initialize failed with status 1");
    }

    const PICL_PTYPE_CHARSTRING: c_int = 9;

    fn info(prop_type: c_int, size: usize) -> PiclPropInfo {
        PiclPropInfo {
            prop_type,
            size,
            ..PiclPropInfo::default()
        }
    }

    #[test]
    fn test_int_width_accepts_32_and_64_bit_integers() {
        let width = int_width(&info(PICL_PTYPE_INT, 4), "l1-dcache-line-size").unwrap();
        assert_eq!(width, 4);
        let width = int_width(&info(PICL_PTYPE_UNSIGNED_INT, 8), "l2-cache-line-size").unwrap();
        assert_eq!(width, 8);
    }

    #[test]
    fn test_int_width_rejects_other_types_and_sizes() {
        let err = int_width(&info(PICL_PTYPE_CHARSTRING, 4), "l2-cache-line-size").unwrap_err();
        assert!(matches!(err, InventoryError::PropertyRead { ref reason, .. } if reason == "type 9"));

        let err = int_width(&info(PICL_PTYPE_INT, 2), "l2-cache-line-size").unwrap_err();
        assert!(matches!(err, InventoryError::PropertyRead { ref reason, .. } if reason == "size 2"));
    }

    #[test]
    fn test_narrow_keeps_low_word() {
        assert_eq!(narrow(64), 64);
        assert_eq!(narrow(0x1_0000_0040), 0x40);
        assert_eq!(narrow(i64::from(i32::MAX) + 1), i32::MIN);
        assert_eq!(narrow(-1), -1);
    }

    #[test]
    fn test_trampoline_translates_verdicts() {
        let mut seen = Vec::new();
        let mut closure = |node: NodeHandle| {
            seen.push(node.0);
            if node.0 == 2 {
                WalkControl::Terminate
            } else {
                WalkControl::Continue
            }
        };
        let mut visitor: Visitor<'_> = &mut closure;
        let arg = (&raw mut visitor).cast::<c_void>();
        assert_eq!(visit_node(1, arg), PICL_WALK_CONTINUE);
        assert_eq!(visit_node(2, arg), PICL_WALK_TERMINATE);
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn test_trampoline_contains_panics() {
        let mut closure = |_: NodeHandle| -> WalkControl { panic!("visitor failed") };
        let mut visitor: Visitor<'_> = &mut closure;
        let arg = (&raw mut visitor).cast::<c_void>();
        assert_eq!(visit_node(7, arg), PICL_WALK_TERMINATE);
    }
}
