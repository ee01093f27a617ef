//! Hardware-inventory port for the device-tree walk.
//!
//! Abstracts an optionally installed inventory library (PICL on Solaris)
//! from the cache geometry probe. Implementations live in adapters (e.g.,
//! cpuprobe-runtime).
//!
//! # Design Notes
//!
//! - Core owns the trait and types (pure)
//! - Runtime owns the implementation (`dlopen` + symbol binding)
//! - A loader hands out either a fully bound library or a typed error;
//!   callers never see a partially bound library or a null pointer
//! - Dropping the bound library closes it

use thiserror::Error;

/// Opaque handle to one node of the device tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(pub u64);

/// Visitor verdict after each node of a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkControl {
    Continue,
    Terminate,
}

/// Errors raised by the inventory library or its loader.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// The library could not be loaded at all.
    #[error("{library} is missing: {reason}")]
    LibraryUnavailable { library: String, reason: String },

    /// The library loaded but lacks an entry point we need (version skew).
    #[error("{library} does not export {symbol}")]
    SymbolMissing { library: String, symbol: String },

    /// A session-level call returned a failure status.
    #[error("{operation} failed with status {status}")]
    Session {
        operation: &'static str,
        status: i32,
    },

    /// The node lacks the property, or it is not a 32/64-bit integer.
    #[error("Property {name} unreadable: {reason}")]
    PropertyRead { name: String, reason: String },
}

impl InventoryError {
    /// True when the library itself is unusable, as opposed to a failed call.
    pub const fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::LibraryUnavailable { .. } | Self::SymbolMissing { .. }
        )
    }
}

/// Result type for inventory operations.
pub type InventoryResult<T> = Result<T, InventoryError>;

/// A bound hardware-inventory library.
///
/// Calls are only valid between a successful [`initialize`] and the matching
/// [`shutdown`].
///
/// [`initialize`]: DeviceInventory::initialize
/// [`shutdown`]: DeviceInventory::shutdown
pub trait DeviceInventory {
    /// Open an inventory session.
    fn initialize(&self) -> InventoryResult<()>;

    /// Close the session opened by [`DeviceInventory::initialize`].
    fn shutdown(&self) -> InventoryResult<()>;

    /// Root node of the device tree.
    fn root(&self) -> InventoryResult<NodeHandle>;

    /// Visit every node of `class` below `root` until the visitor terminates.
    fn walk_by_class(
        &self,
        root: NodeHandle,
        class: &str,
        visitor: &mut dyn FnMut(NodeHandle) -> WalkControl,
    ) -> InventoryResult<()>;

    /// Read an integer property of `node`, narrowed to `i32`.
    fn int_property(&self, node: NodeHandle, name: &str) -> InventoryResult<i32>;
}

/// Loads and binds an inventory library by name.
pub trait InventoryLoader: Send + Sync {
    /// Open `library` and resolve every entry point.
    ///
    /// Fails with [`InventoryError::LibraryUnavailable`] or
    /// [`InventoryError::SymbolMissing`]; never returns a partial binding.
    fn open(&self, library: &str) -> InventoryResult<Box<dyn DeviceInventory>>;
}
