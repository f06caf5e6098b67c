//! Fault-injection hook surface for the medium abstraction.
//!
//! Four advisory hook points sit in the read/write path. The core calls them
//! unconditionally; an empty [`HookStack`] is a zero-cost no-op, so absence
//! of an injector costs nothing. Hooks are layered the same way the wider
//! workspace layers debug interceptors: added/removed by concrete type,
//! invoked in registration order.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::Debug;

/// A single fault-injection layer. All methods default to a no-op so an
/// implementor only needs to override the hook it actually cares about.
pub trait MediumHook: Any + Debug {
    /// Runs before a read is serviced. Cannot affect the outcome.
    fn before_read(&mut self, _address: u32, _length: usize) {}

    /// Runs after a read completes; may mutate the bytes in place to
    /// simulate a bit flip or other on-media corruption.
    fn after_read(&mut self, _address: u32, _bytes: &mut [u8]) {}

    /// Runs before a write is applied. Returning `false` blocks the write
    /// (as if the bus stalled); the medium reports a failure and nothing is
    /// committed.
    fn before_write(&mut self, _address: u32, _bytes: &[u8]) -> bool {
        true
    }

    /// Runs after a write has already been committed to the backing store.
    /// Returning `false` simulates power loss: the hook signals failure to
    /// the caller even though the bytes are already on the medium, which is
    /// the scenario this hook exists to model.
    fn after_write(&mut self, _address: u32, _bytes: &[u8]) -> bool {
        true
    }
}

/// An ordered stack of [`MediumHook`] layers, addressed by concrete type.
#[derive(Debug, Default)]
pub struct HookStack {
    order: Vec<TypeId>,
    layers: HashMap<TypeId, Box<dyn MediumHook>>,
}

impl HookStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hook layer, returning the previous layer of the same type (if
    /// any) so callers can detect accidental replacement.
    pub fn add<H: MediumHook>(&mut self, hook: H) -> Option<Box<dyn MediumHook>> {
        let id = TypeId::of::<H>();
        if !self.layers.contains_key(&id) {
            self.order.push(id);
        }
        self.layers.insert(id, Box::new(hook))
    }

    pub fn remove<H: MediumHook>(&mut self) -> Option<Box<dyn MediumHook>> {
        let id = TypeId::of::<H>();
        self.order.retain(|existing| *existing != id);
        self.layers.remove(&id)
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.layers.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub(crate) fn before_read(&mut self, address: u32, length: usize) {
        for id in &self.order {
            if let Some(layer) = self.layers.get_mut(id) {
                layer.before_read(address, length);
            }
        }
    }

    pub(crate) fn after_read(&mut self, address: u32, bytes: &mut [u8]) {
        for id in &self.order {
            if let Some(layer) = self.layers.get_mut(id) {
                layer.after_read(address, bytes);
            }
        }
    }

    pub(crate) fn before_write(&mut self, address: u32, bytes: &[u8]) -> bool {
        let mut allowed = true;
        for id in &self.order {
            if let Some(layer) = self.layers.get_mut(id) {
                allowed &= layer.before_write(address, bytes);
            }
        }
        allowed
    }

    pub(crate) fn after_write(&mut self, address: u32, bytes: &[u8]) -> bool {
        let mut allowed = true;
        for id in &self.order {
            if let Some(layer) = self.layers.get_mut(id) {
                allowed &= layer.after_write(address, bytes);
            }
        }
        allowed
    }
}
