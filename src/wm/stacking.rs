//! Stacking Module
//!
//! Keeps the raw bottom-to-top order of managed windows and turns it into
//! the layered order handed to the server.

use tracing::{debug, warn};

use crate::wm::client_flags::WindowLayer;
use crate::wm::registry::ClientRegistry;

/// Walk the transient-for chain above `window`, nearest owner first.
///
/// At most `bound` links are followed. A link to a window that is not
/// managed, or back into the chain, ends the walk there.
pub fn transient_chain(clients: &ClientRegistry, window: u32, bound: usize) -> Vec<u32> {
    let mut chain = Vec::new();
    let mut current = window;

    for _ in 0..bound {
        let Some(owner) = clients.lookup(current).and_then(|c| c.transient_for) else {
            break;
        };
        if owner == window || chain.contains(&owner) {
            warn!("Transient cycle through window 0x{:x}, chain cut at 0x{:x}", window, current);
            break;
        }
        if !clients.contains(owner) {
            break;
        }
        chain.push(owner);
        current = owner;
    }

    chain
}

/// Stacking manager
#[derive(Debug, Default)]
pub struct StackingManager {
    /// Stacking order (bottom to top)
    stacking_order: Vec<u32>,
}

impl StackingManager {
    /// Create a new stacking manager
    pub fn new() -> Self {
        Self {
            stacking_order: Vec::new(),
        }
    }

    /// Put `window` on top of the raw order, removing any earlier entry.
    pub fn append(&mut self, window: u32) {
        self.stacking_order.retain(|&w| w != window);
        self.stacking_order.push(window);
    }

    /// Add window to stacking order
    pub fn add_window(&mut self, window: u32) {
        self.append(window);
    }

    /// Remove window from stacking order
    pub fn remove_window(&mut self, window: u32) {
        self.stacking_order.retain(|&w| w != window);
    }

    /// Raise a window together with its owners.
    ///
    /// Owners are pushed furthest first, then the window itself, so the whole
    /// chain ends up contiguous at the top with `window` topmost. The walk is
    /// bounded by the stack length.
    pub fn raise(&mut self, window: u32, clients: &ClientRegistry) {
        let chain = transient_chain(clients, window, self.stacking_order.len());
        debug!("Raising window 0x{:x} with {} owner(s)", window, chain.len());

        for &owner in chain.iter().rev() {
            self.append(owner);
        }
        self.append(window);
    }

    /// Lower a window to the bottom of the raw order
    pub fn lower(&mut self, window: u32) {
        debug!("Lowering window 0x{:x}", window);
        self.stacking_order.retain(|&w| w != window);
        self.stacking_order.insert(0, window);
    }

    /// Effective layer of a window. A client without a layer of its own
    /// takes the first one found up its transient chain.
    pub fn layer_of(&self, window: u32, clients: &ClientRegistry) -> WindowLayer {
        std::iter::once(window)
            .chain(transient_chain(clients, window, self.stacking_order.len()))
            .find_map(|w| clients.lookup(w).and_then(|c| c.own_layer()))
            .unwrap_or(WindowLayer::Normal)
    }

    /// Layered bottom-to-top order of every window still managed.
    ///
    /// Layers are applied as a stable sort, so the raw order decides
    /// placement within a layer.
    pub fn materialize(&self, clients: &ClientRegistry) -> Vec<u32> {
        let mut layered: Vec<(WindowLayer, u32)> = self
            .stacking_order
            .iter()
            .filter(|&&w| clients.contains(w))
            .map(|&w| (self.layer_of(w, clients), w))
            .collect();
        layered.sort_by_key(|&(layer, _)| layer);
        layered.into_iter().map(|(_, w)| w).collect()
    }

    /// Get stacking order (bottom to top)
    pub fn get_stacking_order(&self) -> &[u32] {
        &self.stacking_order
    }

    pub fn len(&self) -> usize {
        self.stacking_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacking_order.is_empty()
    }
}
