//! Container-category attributes.
//!
//! A container attribute binds one external resource (a view, an audio listener
//! or source, a scent detector) to one node. The resource itself lives outside the
//! scene graph; the attribute only keeps a [`SharedPose`] that the render
//! traversal refreshes with the node's global transform every frame.

use std::cell::Cell;
use std::rc::Rc;

use cgmath::{Matrix4, SquareMatrix};

/// A world-space pose shared between a container attribute and the resource it drives.
///
/// Cloning yields another handle to the same pose.
#[derive(Debug, Clone)]
pub struct SharedPose(Rc<Cell<Matrix4<f32>>>);

impl Default for SharedPose {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedPose {
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(Matrix4::identity())))
    }

    pub fn get(&self) -> Matrix4<f32> {
        self.0.get()
    }

    pub fn set(&self, pose: Matrix4<f32>) {
        self.0.set(pose);
    }

    /// True if both handles drive the same external resource.
    pub fn ptr_eq(&self, other: &SharedPose) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Link between a node and an external resource, with a fixed offset from the node.
#[derive(Debug, Clone)]
pub struct ContainerBinding {
    pub target: SharedPose,
    /// Applied after the node's global transform
    pub offset: Matrix4<f32>,
}

impl ContainerBinding {
    pub fn new(target: SharedPose) -> Self {
        Self {
            target,
            offset: Matrix4::identity(),
        }
    }

    pub fn with_offset(mut self, offset: Matrix4<f32>) -> Self {
        self.offset = offset;
        self
    }

    /// Pushes the owning node's global transform to the bound resource.
    pub fn update(&self, node_world: &Matrix4<f32>) {
        self.target.set(node_world * self.offset);
    }
}

impl PartialEq for ContainerBinding {
    fn eq(&self, other: &Self) -> bool {
        self.target.ptr_eq(&other.target) && self.offset == other.offset
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SoundSourceAttribute {
    pub binding: ContainerBinding,
    pub gain: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScentDetectorAttribute {
    pub binding: ContainerBinding,
    pub sensitivity: f32,
}
