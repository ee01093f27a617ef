//! Cache geometry probe.
//!
//! Walks the processor nodes of the hardware inventory and looks for a line
//! size that every node agrees on, separately for L1 and L2. Any failure
//! (library missing, session refused, property absent, nodes disagreeing)
//! degrades that level to 0 rather than surfacing an error.

use tracing::{debug, error, trace, warn};

use crate::domain::cache::{CORE_CLASS, CPU_CLASS, L1_DCACHE_LINE_SIZE};
use crate::domain::{CacheLineSizes, CacheObservation, FeatureFlags, L2PropertyName};
use crate::ports::{DeviceInventory, InventoryError, InventoryLoader, NodeHandle, WalkControl};

/// Number of device nodes a walk may still visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkBudget(usize);

impl WalkBudget {
    /// Budget of `nodes`, at least one.
    pub fn new(nodes: usize) -> Self {
        Self(nodes.max(1))
    }

    /// Budget for a host with the given family flags.
    ///
    /// sun4v processors other than SPARC64 are uniform by construction, so a
    /// single node is enough. Everything else samples one node per logical
    /// processor, optionally capped by `cap`.
    pub fn for_host(flags: FeatureFlags, processor_count: usize, cap: Option<usize>) -> Self {
        let nodes = if flags.is_sun4v() && !flags.is_sparc64_family() {
            1
        } else {
            processor_count
        };
        Self::new(cap.map_or(nodes, |cap| nodes.min(cap)))
    }

    pub const fn remaining(self) -> usize {
        self.0
    }

    /// Spend one visit. Returns true once nothing is left.
    fn spend(&mut self) -> bool {
        self.0 = self.0.saturating_sub(1);
        self.0 == 0
    }
}

/// Device class to walk for a host with the given family flags.
pub const fn device_class(flags: FeatureFlags) -> &'static str {
    if flags.is_sparc64_family() {
        CORE_CLASS
    } else {
        CPU_CLASS
    }
}

/// Tracks one integer property across the nodes of a walk.
#[derive(Debug, Default)]
pub struct UniqueValueTracker {
    state: CacheObservation,
}

impl UniqueValueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn state(&self) -> CacheObservation {
        self.state
    }

    /// Read `name` from `node` and feed it to the state machine.
    ///
    /// Returns whether the read succeeded. A failed read leaves the state
    /// untouched.
    pub fn visit(&mut self, inventory: &dyn DeviceInventory, node: NodeHandle, name: &str) -> bool {
        debug_assert!(!self.state.is_inconsistent(), "visit after inconsistency");
        match inventory.int_property(node, name) {
            Ok(value) => {
                self.state = self.state.observe(value);
                true
            }
            Err(e) => {
                trace!(node = node.0, property = name, error = %e, "Property not readable");
                false
            }
        }
    }
}

/// Composite visitor driving the L1 and L2 trackers over one walk.
pub struct CpuVisitor<'a> {
    inventory: &'a dyn DeviceInventory,
    l1: UniqueValueTracker,
    l2: UniqueValueTracker,
    l2_name: L2PropertyName,
    budget: WalkBudget,
    visited: usize,
}

impl<'a> CpuVisitor<'a> {
    pub fn new(inventory: &'a dyn DeviceInventory, budget: WalkBudget) -> Self {
        Self {
            inventory,
            l1: UniqueValueTracker::new(),
            l2: UniqueValueTracker::new(),
            l2_name: L2PropertyName::Undecided,
            budget,
            visited: 0,
        }
    }

    /// Handle one node and tell the walk whether to go on.
    pub fn visit(&mut self, node: NodeHandle) -> WalkControl {
        self.visited += 1;

        if !self.l1.state().is_inconsistent() {
            self.l1.visit(self.inventory, node, L1_DCACHE_LINE_SIZE);
        }

        match self.l2_name.property() {
            None => {
                debug_assert!(!self.l2.state().is_inconsistent());
                self.l2_name = L2PropertyName::Primary;
                if !self.visit_l2(node) {
                    self.l2_name = L2PropertyName::Fallback;
                    self.visit_l2(node);
                }
            }
            Some(_) => {
                if !self.l2.state().is_inconsistent() {
                    self.visit_l2(node);
                }
            }
        }

        if self.l1.state().is_inconsistent() && self.l2.state().is_inconsistent() {
            return WalkControl::Terminate;
        }
        if self.budget.spend() {
            return WalkControl::Terminate;
        }
        WalkControl::Continue
    }

    fn visit_l2(&mut self, node: NodeHandle) -> bool {
        match self.l2_name.property() {
            Some(name) => self.l2.visit(self.inventory, node, name),
            None => false,
        }
    }

    pub const fn l1(&self) -> CacheObservation {
        self.l1.state()
    }

    pub const fn l2(&self) -> CacheObservation {
        self.l2.state()
    }

    /// L2 property name the walk settled on.
    pub const fn l2_property(&self) -> L2PropertyName {
        self.l2_name
    }

    /// Nodes handed to [`CpuVisitor::visit`] so far.
    pub const fn visited(&self) -> usize {
        self.visited
    }

    /// Agreed line sizes; 0 for levels that are not `Assigned`.
    pub fn line_sizes(&self) -> CacheLineSizes {
        CacheLineSizes {
            l1_data: self.l1().line_size(),
            l2_data: self.l2().line_size(),
        }
    }
}

/// Shuts the inventory session down when dropped.
struct SessionGuard<'a> {
    inventory: &'a dyn DeviceInventory,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.inventory.shutdown() {
            debug!(error = %e, "Inventory shutdown failed");
        }
    }
}

/// Opens the inventory library, walks it and always cleans up.
pub struct CacheGeometryProbe<'a> {
    loader: &'a dyn InventoryLoader,
    library: &'a str,
}

impl<'a> CacheGeometryProbe<'a> {
    pub fn new(loader: &'a dyn InventoryLoader, library: &'a str) -> Self {
        Self { loader, library }
    }

    /// Determine the L1/L2 data cache line sizes.
    ///
    /// `flags` selects the device class; `budget` bounds the walk.
    pub fn probe(&self, flags: FeatureFlags, budget: WalkBudget) -> CacheLineSizes {
        let inventory = match self.loader.open(self.library) {
            Ok(inventory) => inventory,
            Err(e) => {
                report_open_failure(&e);
                return CacheLineSizes::unknown();
            }
        };

        let sizes = walk(inventory.as_ref(), device_class(flags), budget);
        // The library is closed when `inventory` drops here, after the
        // session guard inside `walk` has already run.
        drop(inventory);
        sizes
    }
}

fn walk(inventory: &dyn DeviceInventory, class: &str, budget: WalkBudget) -> CacheLineSizes {
    if let Err(e) = inventory.initialize() {
        debug!(error = %e, "Inventory session not available");
        return CacheLineSizes::unknown();
    }
    let _session = SessionGuard { inventory };

    let root = match inventory.root() {
        Ok(root) => root,
        Err(e) => {
            debug!(error = %e, "Inventory root not available");
            return CacheLineSizes::unknown();
        }
    };

    let mut visitor = CpuVisitor::new(inventory, budget);
    if let Err(e) = inventory.walk_by_class(root, class, &mut |node| visitor.visit(node)) {
        debug!(class, error = %e, "Device tree walk ended with an error");
    }

    let sizes = visitor.line_sizes();
    debug!(
        class,
        visited = visitor.visited(),
        l1 = ?visitor.l1(),
        l2 = ?visitor.l2(),
        l2_property = ?visitor.l2_property(),
        "Cache geometry walk finished"
    );
    sizes
}

fn report_open_failure(e: &InventoryError) {
    match e {
        InventoryError::LibraryUnavailable { library, .. } => {
            warn!(
                library = %library,
                "{library} is missing. Performance will not be optimal."
            );
        }
        InventoryError::SymbolMissing { .. } => {
            error!(error = %e, "Unexpected inventory API change");
        }
        _ => debug!(error = %e, "Inventory library could not be opened"),
    }
}
