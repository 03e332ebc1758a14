//! Motion tracker sample sources.
//!
//! Trackers are owned by whatever drives them (a device driver, a network
//! receiver, a scripted test). Motion models only hold shared references and read
//! the latest sample each frame; there is no freshness guarantee.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use cgmath::{Quaternion, Vector3, Zero};

/// A read-only position and orientation source.
pub trait MotionTracker {
    fn position_vec(&self) -> Vector3<f32>;
    fn orientation_quat(&self) -> Quaternion<f32>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerSample {
    pub position: Vector3<f32>,
    pub orientation: Quaternion<f32>,
}

impl Default for TrackerSample {
    fn default() -> Self {
        Self {
            position: Vector3::zero(),
            orientation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
        }
    }
}

/// A tracker whose sample is written through any clone of the handle.
#[derive(Debug, Clone, Default)]
pub struct SharedTracker(Rc<Cell<TrackerSample>>);

impl SharedTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sample(sample: TrackerSample) -> Self {
        Self(Rc::new(Cell::new(sample)))
    }

    pub fn sample(&self) -> TrackerSample {
        self.0.get()
    }

    pub fn set_sample(&self, sample: TrackerSample) {
        self.0.set(sample);
    }

    pub fn set_position(&self, position: Vector3<f32>) {
        let mut sample = self.0.get();
        sample.position = position;
        self.0.set(sample);
    }

    pub fn set_orientation(&self, orientation: Quaternion<f32>) {
        let mut sample = self.0.get();
        sample.orientation = orientation;
        self.0.set(sample);
    }
}

impl MotionTracker for SharedTracker {
    fn position_vec(&self) -> Vector3<f32> {
        self.0.get().position
    }

    fn orientation_quat(&self) -> Quaternion<f32> {
        self.0.get().orientation
    }
}

/// Trackers by name, for wiring configured avatars.
#[derive(Default)]
pub struct TrackerRegistry {
    trackers: HashMap<String, Rc<dyn MotionTracker>>,
}

impl TrackerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tracker, returning the one previously registered under `name`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        tracker: Rc<dyn MotionTracker>,
    ) -> Option<Rc<dyn MotionTracker>> {
        self.trackers.insert(name.into(), tracker)
    }

    /// Creates and registers a [`SharedTracker`], returning the writer handle.
    pub fn register_shared(&mut self, name: impl Into<String>) -> SharedTracker {
        let tracker = SharedTracker::new();
        self.register(name, Rc::new(tracker.clone()));
        tracker
    }

    pub fn get(&self, name: &str) -> Option<Rc<dyn MotionTracker>> {
        self.trackers.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.trackers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_tracker_writes_are_visible_to_readers() {
        let writer = SharedTracker::new();
        let reader: Rc<dyn MotionTracker> = Rc::new(writer.clone());

        writer.set_position(Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(reader.position_vec(), Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(reader.orientation_quat(), Quaternion::new(1.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = TrackerRegistry::new();
        let hand = registry.register_shared("hand");
        registry.register_shared("back");

        hand.set_position(Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(registry.get("hand").unwrap().position_vec().z, 1.0);
        assert!(registry.get("head").is_none());
        assert_eq!(registry.names(), vec!["back", "hand"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = TrackerRegistry::new();
        registry.register_shared("hand");
        let previous = registry.register("hand", Rc::new(SharedTracker::new()));
        assert!(previous.is_some());
        assert_eq!(registry.len(), 1);
    }
}
