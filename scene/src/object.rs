//! Reference-counted object storage addressed by generation-stamped handles.
//!
//! Shared scene objects (attributes in particular) live in an [`Arena`]. Each slot
//! carries a usage count that callers bump with [`Arena::add_ref`] and drop with
//! [`Arena::unref`]; [`Arena::unref_delete`] destroys the object once nothing
//! references it any longer. Destroyed slots are recycled, and the generation
//! counter stored in every [`Handle`] guarantees that a handle to a destroyed
//! object never resolves to whatever later reuses the slot.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use thiserror::Error;

/// Errors reported by arena reference-count operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ObjectError {
    /// The handle refers to a destroyed object (or was never valid).
    #[error("handle {0} does not refer to a live object")]
    Stale(RawHandle),

    /// `unref` was called on an object whose count was already zero.
    #[error("object {0} has no outstanding references")]
    NotReferenced(RawHandle),
}

/// Untyped handle contents, used for diagnostics and lock keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawHandle {
    pub index: u32,
    pub generation: u32,
}

impl fmt::Display for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@gen{}", self.index, self.generation)
    }
}

/// A typed handle into an [`Arena<T>`].
pub struct Handle<T> {
    idx: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(idx: u32, generation: u32) -> Self {
        Self {
            idx,
            generation,
            _marker: PhantomData,
        }
    }

    /// Returns the raw slot index (for diagnostics only).
    pub fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    pub fn generation(self) -> u32 {
        self.generation
    }

    /// Returns the untyped handle contents.
    pub fn raw(self) -> RawHandle {
        RawHandle {
            index: self.idx,
            generation: self.generation,
        }
    }
}

// Manual impls so that `T` itself needs none of these traits.
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.idx == other.idx && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.idx.hash(state);
        self.generation.hash(state);
    }
}

impl<T> PartialOrd for Handle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Handle<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.raw().cmp(&other.raw())
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}@gen{})", self.idx, self.generation)
    }
}

struct Slot<T> {
    generation: u32,
    ref_count: u32,
    value: Option<T>,
}

/// Slot storage for reference-counted objects.
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
    len: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stores a new object with a reference count of zero.
    pub fn insert(&mut self, value: T) -> Handle<T> {
        self.len += 1;
        if let Some(idx) = self.free_list.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.ref_count = 0;
            slot.value = Some(value);
            return Handle::new(idx, slot.generation);
        }

        let idx = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            ref_count: 0,
            value: Some(value),
        });
        Handle::new(idx, 0)
    }

    fn slot(&self, handle: Handle<T>) -> Option<&Slot<T>> {
        self.slots
            .get(handle.idx as usize)
            .filter(|slot| slot.generation == handle.generation && slot.value.is_some())
    }

    fn slot_mut(&mut self, handle: Handle<T>) -> Option<&mut Slot<T>> {
        self.slots
            .get_mut(handle.idx as usize)
            .filter(|slot| slot.generation == handle.generation && slot.value.is_some())
    }

    /// Returns true if the handle refers to a live object.
    pub fn is_valid(&self, handle: Handle<T>) -> bool {
        self.slot(handle).is_some()
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.slot(handle).and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.slot_mut(handle).and_then(|slot| slot.value.as_mut())
    }

    /// Current reference count, or None for a stale handle.
    pub fn ref_count(&self, handle: Handle<T>) -> Option<u32> {
        self.slot(handle).map(|slot| slot.ref_count)
    }

    /// Increments the reference count and returns the new value.
    pub fn add_ref(&mut self, handle: Handle<T>) -> Result<u32, ObjectError> {
        let slot = self
            .slot_mut(handle)
            .ok_or(ObjectError::Stale(handle.raw()))?;
        slot.ref_count += 1;
        Ok(slot.ref_count)
    }

    /// Decrements the reference count and returns the new value.
    ///
    /// Unreferencing an object whose count is already zero is reported and leaves
    /// the count at zero.
    pub fn unref(&mut self, handle: Handle<T>) -> Result<u32, ObjectError> {
        let slot = self
            .slot_mut(handle)
            .ok_or(ObjectError::Stale(handle.raw()))?;
        if slot.ref_count == 0 {
            log::warn!("unref on object {} with zero references", handle.raw());
            return Err(ObjectError::NotReferenced(handle.raw()));
        }
        slot.ref_count -= 1;
        Ok(slot.ref_count)
    }

    /// Unreferences the object and destroys it if no references remain.
    ///
    /// Returns the destroyed value, or None if the object is still referenced.
    pub fn unref_delete(&mut self, handle: Handle<T>) -> Result<Option<T>, ObjectError> {
        if self.unref(handle)? > 0 {
            return Ok(None);
        }
        Ok(self.take(handle))
    }

    /// Destroys the object regardless of its reference count.
    ///
    /// Destroying a still-referenced object is a programming error; it is logged
    /// and the object is destroyed anyway.
    pub fn remove(&mut self, handle: Handle<T>) -> Option<T> {
        let ref_count = self.ref_count(handle)?;
        if ref_count > 0 {
            log::error!(
                "destroying object {} with {} outstanding reference(s)",
                handle.raw(),
                ref_count
            );
        }
        self.take(handle)
    }

    fn take(&mut self, handle: Handle<T>) -> Option<T> {
        let slot = self.slot_mut(handle)?;
        let value = slot.value.take();
        slot.ref_count = 0;
        self.free_list.push(handle.idx);
        self.len -= 1;
        value
    }

    /// Iterates live objects with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            slot.value
                .as_ref()
                .map(|value| (Handle::new(idx as u32, slot.generation), value))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_starts_unreferenced() {
        let mut arena = Arena::new();
        let h = arena.insert("fog");
        assert_eq!(arena.ref_count(h), Some(0));
        assert!(arena.is_valid(h));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_object_survives_until_last_unref() {
        let mut arena = Arena::new();
        let h = arena.insert(7);

        for _ in 0..3 {
            arena.add_ref(h).unwrap();
        }
        assert_eq!(arena.unref_delete(h), Ok(None));
        assert_eq!(arena.unref_delete(h), Ok(None));
        assert!(arena.is_valid(h));
        assert_eq!(arena.unref_delete(h), Ok(Some(7)));
        assert!(!arena.is_valid(h));
    }

    #[test]
    fn test_extra_unref_is_reported_and_does_not_underflow() {
        let mut arena = Arena::new();
        let h = arena.insert(());
        arena.add_ref(h).unwrap();
        assert_eq!(arena.unref(h), Ok(0));
        assert_eq!(arena.unref(h), Err(ObjectError::NotReferenced(h.raw())));
        assert_eq!(arena.ref_count(h), Some(0));
    }

    #[test]
    fn test_stale_handle_does_not_alias_reused_slot() {
        let mut arena = Arena::new();
        let old = arena.insert("old");
        arena.remove(old);
        let new = arena.insert("new");

        assert_eq!(old.index(), new.index());
        assert_ne!(old, new);
        assert!(!arena.is_valid(old));
        assert_eq!(arena.get(old), None);
        assert_eq!(arena.get(new), Some(&"new"));
        assert_eq!(arena.add_ref(old), Err(ObjectError::Stale(old.raw())));
    }

    #[test]
    fn test_remove_referenced_object_proceeds() {
        let mut arena = Arena::new();
        let h = arena.insert(1.5_f32);
        arena.add_ref(h).unwrap();
        assert_eq!(arena.remove(h), Some(1.5));
        assert!(arena.is_empty());
    }

    #[test]
    fn test_iter_skips_destroyed() {
        let mut arena = Arena::new();
        let a = arena.insert('a');
        let b = arena.insert('b');
        arena.remove(a);

        let live: Vec<_> = arena.iter().collect();
        assert_eq!(live, vec![(b, &'b')]);
    }
}
