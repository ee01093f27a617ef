//! Port definitions (trait abstractions) for host facilities.
//!
//! Ports define the interfaces that the probe services expect from the OS.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No `libloading` or raw pointer types in any signature
//! - Absence of a facility is an error value, never a panic
//! - Intent-based methods (read a property, walk a class), not raw calls

pub mod device_inventory;
pub mod host_info;

pub use device_inventory::{
    DeviceInventory, InventoryError, InventoryLoader, InventoryResult, NodeHandle, WalkControl,
};
pub use host_info::{HostInfoPort, HostQueryError, HostQueryResult, IsaWords, SysInfoQuery};

#[cfg(test)]
pub use host_info::MockHostInfoPort;
