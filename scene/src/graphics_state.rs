//! Per-traversal accumulator of the winning State attribute values.
//!
//! A [`GraphicsState`] is owned by whoever drives the render traversal and passed
//! down explicitly. Each [`StateKind`] has one slot holding the current value and
//! an optional lock. A locked slot ignores writes from every key but the locker's,
//! which is how an override attribute high in the tree wins over the same kind of
//! attribute further down.

use crate::attribute::{AttributeId, StateKind, StateValue};
use crate::node::NodeId;
use crate::object::RawHandle;

/// Opaque token identifying who wrote or locked a slot.
///
/// Keys derive from generation-stamped attribute handles, so a key outliving its
/// attribute can never match an attribute that later reuses the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockKey(RawHandle);

impl From<AttributeId> for LockKey {
    fn from(id: AttributeId) -> Self {
        LockKey(id.raw())
    }
}

/// The value currently held by a slot and the key that wrote it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateEntry {
    pub source: LockKey,
    pub value: StateValue,
}

/// A slot's value captured by [`GraphicsState::save`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SavedSlot(Option<StateEntry>);

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    current: Option<StateEntry>,
    lock: Option<LockKey>,
}

impl Slot {
    fn writable_by(&self, key: LockKey) -> bool {
        !matches!(self.lock, Some(holder) if holder != key)
    }
}

/// Snapshot of the accumulated state, handed to the render sink with each draw.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedState {
    values: [Option<StateValue>; StateKind::COUNT],
    pub local_lights: Vec<AttributeId>,
}

impl ResolvedState {
    pub fn get(&self, kind: StateKind) -> Option<StateValue> {
        self.values[kind.index()]
    }
}

#[derive(Debug, Clone, Default)]
pub struct GraphicsState {
    slots: [Slot; StateKind::COUNT],
    local_lights: Vec<AttributeId>,
    current_scene: Option<NodeId>,
}

impl GraphicsState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets every slot and lock and forgets the local lights and current scene.
    ///
    /// Called once at the start of each traversal, before any node is visited.
    pub fn clear_state(&mut self) {
        self.slots = [Slot::default(); StateKind::COUNT];
        self.local_lights.clear();
        self.current_scene = None;
    }

    /// Writes a value into its kind's slot.
    ///
    /// Returns false and leaves the slot untouched if another key holds the lock.
    pub fn set(&mut self, key: LockKey, value: StateValue) -> bool {
        let slot = &mut self.slots[value.kind().index()];
        if !slot.writable_by(key) {
            return false;
        }
        slot.current = Some(StateEntry { source: key, value });
        true
    }

    /// Locks a slot for `key`. The first locker wins; relocking by the holder succeeds.
    pub fn lock(&mut self, kind: StateKind, key: LockKey) -> bool {
        let slot = &mut self.slots[kind.index()];
        match slot.lock {
            None => {
                slot.lock = Some(key);
                true
            }
            Some(holder) => holder == key,
        }
    }

    /// Releases a lock. Unlocking with any key but the holder's does nothing.
    pub fn unlock(&mut self, kind: StateKind, key: LockKey) -> bool {
        let slot = &mut self.slots[kind.index()];
        if slot.lock == Some(key) {
            slot.lock = None;
            true
        } else {
            false
        }
    }

    pub fn lock_holder(&self, kind: StateKind) -> Option<LockKey> {
        self.slots[kind.index()].lock
    }

    pub fn current(&self, kind: StateKind) -> Option<StateValue> {
        self.slots[kind.index()].current.map(|entry| entry.value)
    }

    pub fn current_entry(&self, kind: StateKind) -> Option<StateEntry> {
        self.slots[kind.index()].current
    }

    pub fn save(&self, kind: StateKind) -> SavedSlot {
        SavedSlot(self.slots[kind.index()].current)
    }

    /// Puts back a value captured by [`save`](Self::save), subject to the same lock
    /// rule as [`set`](Self::set).
    pub fn restore(&mut self, key: LockKey, kind: StateKind, saved: SavedSlot) -> bool {
        let slot = &mut self.slots[kind.index()];
        if !slot.writable_by(key) {
            return false;
        }
        slot.current = saved.0;
        true
    }

    pub fn add_local_light(&mut self, light: AttributeId) {
        self.local_lights.push(light);
    }

    /// Removes one occurrence of `light`. Order of the remaining lights is not kept.
    pub fn remove_local_light(&mut self, light: AttributeId) -> bool {
        match self.local_lights.iter().position(|&id| id == light) {
            Some(index) => {
                self.local_lights.swap_remove(index);
                true
            }
            None => {
                log::warn!("local light {:?} is not active", light);
                false
            }
        }
    }

    pub fn local_lights(&self) -> &[AttributeId] {
        &self.local_lights
    }

    /// The root of the scene currently being traversed.
    pub fn current_scene(&self) -> Option<NodeId> {
        self.current_scene
    }

    pub fn set_current_scene(&mut self, root: Option<NodeId>) {
        self.current_scene = root;
    }

    pub fn resolved(&self) -> ResolvedState {
        let mut values = [None; StateKind::COUNT];
        for (value, slot) in values.iter_mut().zip(self.slots.iter()) {
            *value = slot.current.map(|entry| entry.value);
        }
        ResolvedState {
            values,
            local_lights: self.local_lights.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{Attribute, ShadingMode};
    use crate::object::Arena;
    use proptest::prelude::*;

    fn keys(count: usize) -> (Arena<Attribute>, Vec<AttributeId>) {
        let mut arena = Arena::new();
        let ids = (0..count)
            .map(|_| arena.insert(Attribute::state(StateValue::Wireframe(false))))
            .collect();
        (arena, ids)
    }

    #[test]
    fn test_lock_blocks_other_writers() {
        let (_arena, ids) = keys(2);
        let (a, b) = (LockKey::from(ids[0]), LockKey::from(ids[1]));
        let mut state = GraphicsState::new();

        assert!(state.set(a, StateValue::Wireframe(true)));
        assert!(state.lock(StateKind::Wireframe, a));
        assert!(!state.set(b, StateValue::Wireframe(false)));
        assert_eq!(state.current(StateKind::Wireframe), Some(StateValue::Wireframe(true)));

        // Wrong key cannot unlock
        assert!(!state.unlock(StateKind::Wireframe, b));
        assert!(state.unlock(StateKind::Wireframe, a));
        assert!(state.set(b, StateValue::Wireframe(false)));
        assert_eq!(state.current(StateKind::Wireframe), Some(StateValue::Wireframe(false)));
    }

    #[test]
    fn test_first_locker_wins() {
        let (_arena, ids) = keys(2);
        let (a, b) = (LockKey::from(ids[0]), LockKey::from(ids[1]));
        let mut state = GraphicsState::new();

        assert!(state.lock(StateKind::Shading, a));
        assert!(!state.lock(StateKind::Shading, b));
        assert!(state.lock(StateKind::Shading, a));
        assert_eq!(state.lock_holder(StateKind::Shading), Some(a));
    }

    #[test]
    fn test_locks_are_per_kind() {
        let (_arena, ids) = keys(2);
        let (a, b) = (LockKey::from(ids[0]), LockKey::from(ids[1]));
        let mut state = GraphicsState::new();

        state.lock(StateKind::Fog, a);
        assert!(state.set(b, StateValue::Shading(ShadingMode::Flat)));
    }

    #[test]
    fn test_save_and_restore() {
        let (_arena, ids) = keys(2);
        let (a, b) = (LockKey::from(ids[0]), LockKey::from(ids[1]));
        let mut state = GraphicsState::new();

        state.set(a, StateValue::LineWidth(1.0));
        let saved = state.save(StateKind::LineWidth);
        state.set(b, StateValue::LineWidth(4.0));
        assert!(state.restore(b, StateKind::LineWidth, saved));
        assert_eq!(state.current(StateKind::LineWidth), Some(StateValue::LineWidth(1.0)));
        assert_eq!(state.current_entry(StateKind::LineWidth).unwrap().source, a);
    }

    #[test]
    fn test_clear_state_resets_everything() {
        let (_arena, ids) = keys(1);
        let a = LockKey::from(ids[0]);
        let mut state = GraphicsState::new();

        state.set(a, StateValue::Backface(true));
        state.lock(StateKind::Backface, a);
        state.add_local_light(ids[0]);
        state.set_current_scene(Some(3));

        state.clear_state();
        assert_eq!(state.current(StateKind::Backface), None);
        assert_eq!(state.lock_holder(StateKind::Backface), None);
        assert!(state.local_lights().is_empty());
        assert_eq!(state.current_scene(), None);
    }

    #[test]
    fn test_local_lights_swap_remove() {
        let (_arena, ids) = keys(3);
        let mut state = GraphicsState::new();
        for &id in &ids {
            state.add_local_light(id);
        }

        assert!(state.remove_local_light(ids[0]));
        assert_eq!(state.local_lights(), &[ids[2], ids[1]]);
        assert!(!state.remove_local_light(ids[0]));
    }

    #[test]
    fn test_stale_key_does_not_match_reused_slot() {
        let mut arena = Arena::new();
        let old = arena.insert(Attribute::state(StateValue::Wireframe(true)));
        arena.remove(old);
        let new = arena.insert(Attribute::state(StateValue::Wireframe(false)));

        let mut state = GraphicsState::new();
        state.lock(StateKind::Wireframe, LockKey::from(old));
        assert!(!state.set(LockKey::from(new), StateValue::Wireframe(false)));
    }

    proptest! {
        #[test]
        fn prop_locked_value_survives_later_writes(
            locked_width in 0.5f32..10.0,
            later in proptest::collection::vec(0.5f32..10.0, 0..8),
        ) {
            let (_arena, ids) = keys(later.len() + 1);
            let owner = LockKey::from(ids[0]);
            let mut state = GraphicsState::new();

            state.set(owner, StateValue::LineWidth(locked_width));
            state.lock(StateKind::LineWidth, owner);
            for (i, width) in later.iter().enumerate() {
                let key = LockKey::from(ids[i + 1]);
                prop_assert!(!state.set(key, StateValue::LineWidth(*width)));
            }
            prop_assert_eq!(
                state.current(StateKind::LineWidth),
                Some(StateValue::LineWidth(locked_width))
            );
        }
    }
}
