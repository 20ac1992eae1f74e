//! Arena: fixed-capacity, generation-checked slots for one resource kind.
//!
//! Slots are taken (`take`), populated, and later released (`release`).
//! Releasing bumps the slot's generation, so a `Handle` kept past its
//! release no longer resolves and reports `StaleHandle` rather than
//! aliasing whatever occupies the slot next. Capacity is fixed at
//! construction; `take` on a full arena is fatal, `try_take` reports it.

use crate::resource::{Resource, ResourceKind};
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use slotmap::SlotMap;

slotmap::new_key_type! {
    struct SlotKey;
}

/// Opaque, copyable reference to a slot of an `Arena<T>`.
///
/// Two handles are equal iff they name the same slot in the same
/// generation. Handles carry no ownership: holding one does not keep the
/// resource alive.
pub struct Handle<T> {
    key: SlotKey,
    _pd: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(key: SlotKey) -> Self {
        Self {
            key,
            _pd: PhantomData,
        }
    }
}

impl<T> Copy for Handle<T> {}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = std::any::type_name::<T>();
        let short = name.rsplit("::").next().unwrap_or(name);
        write!(f, "Handle<{}>({:?})", short, self.key)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
pub enum ArenaError {
    #[error("{kind} arena exhausted (capacity {capacity})")]
    Exhausted { kind: ResourceKind, capacity: usize },
    #[error("stale {kind} handle: slot was released")]
    StaleHandle { kind: ResourceKind },
}

pub struct Arena<T> {
    slots: SlotMap<SlotKey, T>,
    capacity: usize,
}

impl<T: Resource> Arena<T> {
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "{} arena capacity must be non-zero", T::KIND);
        Self {
            slots: SlotMap::with_capacity_and_key(capacity),
            capacity,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        T::KIND
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.capacity
    }

    /// Store `value` in a free slot.
    pub fn try_take(&mut self, value: T) -> Result<Handle<T>, ArenaError> {
        if self.is_full() {
            return Err(ArenaError::Exhausted {
                kind: T::KIND,
                capacity: self.capacity,
            });
        }
        Ok(Handle::new(self.slots.insert(value)))
    }

    /// Store `value` in a free slot; exhaustion is a fatal configuration error.
    pub fn take(&mut self, value: T) -> Handle<T> {
        match self.try_take(value) {
            Ok(h) => h,
            Err(e) => {
                log::error!("{}", e);
                panic!("{}", e);
            }
        }
    }

    /// Free the slot and hand back its value. The caller owns any cleanup
    /// of what the value refers to.
    pub fn release(&mut self, handle: Handle<T>) -> Result<T, ArenaError> {
        self.slots.remove(handle.key).ok_or(ArenaError::StaleHandle { kind: T::KIND })
    }

    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.slots.contains_key(handle.key)
    }

    pub fn get(&self, handle: Handle<T>) -> Result<&T, ArenaError> {
        self.slots
            .get(handle.key)
            .ok_or(ArenaError::StaleHandle { kind: T::KIND })
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Result<&mut T, ArenaError> {
        self.slots
            .get_mut(handle.key)
            .ok_or(ArenaError::StaleHandle { kind: T::KIND })
    }

    /// Every live resource of this kind with its handle.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.slots.iter().map(|(k, v)| (Handle::new(k), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle<T>, &mut T)> {
        self.slots.iter_mut().map(|(k, v)| (Handle::new(k), v))
    }

    pub fn handles(&self) -> Vec<Handle<T>> {
        self.slots.keys().map(Handle::new).collect()
    }

    /// Release every slot, yielding the stored values.
    pub fn drain(&mut self) -> impl Iterator<Item = (Handle<T>, T)> + '_ {
        self.slots.drain().map(|(k, v)| (Handle::new(k), v))
    }
}
