use std::cell::Cell;
use std::collections::BTreeMap;

use bitflags::bitflags;
use cgmath::Matrix4;

use crate::attribute::{AttributeId, AttributeType, StateKind, StateSetting};
use crate::common::Aabb;
use crate::geometry::Geometry;

/// Unique identifier for a Node in the scene tree.
pub type NodeId = u32;

/// Whether a node is an interior node or a geometry leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Interior node; may have children and carries grouping/transform attributes
    Component,
    /// Leaf node carrying a triangle list
    Geometry,
}

bitflags! {
    /// Bits compared against an intersection query's mask.
    ///
    /// A subtree is only tested if its mask shares at least one bit with the query.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct IntersectMask: u32 {
        const NONE = 0;
        /// Ground that terrain following may stand on
        const TERRAIN = 1 << 0;
        /// Walls and props that collision should stop at
        const OBSTACLE = 1 << 1;
        const ALL = u32::MAX;
    }
}

impl Default for IntersectMask {
    fn default() -> Self {
        IntersectMask::ALL
    }
}

/// An attribute reference held by a node, with its type cached for rule checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachedAttribute {
    pub id: AttributeId,
    pub attr_type: AttributeType,
}

/// One slot of a node's backend state set.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NodeStateSlot {
    pub setting: StateSetting,
    /// The value overrides same-kind values further down the tree
    pub override_flag: bool,
}

/// A node in the scene tree hierarchy.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub name: Option<String>,
    kind: NodeKind,

    // Hierarchy
    parent: Option<NodeId>,
    children: Vec<NodeId>,

    // Content
    attributes: Vec<AttachedAttribute>,
    geometry: Option<Geometry>,
    intersect_mask: IntersectMask,

    // Per-node state pushed at attach time. Slots absent from the map inherit.
    state_set: BTreeMap<StateKind, NodeStateSlot>,

    // Cached computed values, stamped with the scene revision they were computed at
    cached_world_transform: Cell<Option<(u64, Matrix4<f32>)>>,
    cached_bounds: Cell<Option<(u64, Option<Aabb>)>>,
}

impl Node {
    pub fn new(id: NodeId, name: Option<String>, kind: NodeKind, geometry: Option<Geometry>) -> Self {
        Self {
            id,
            name,
            kind,
            parent: None,
            children: Vec::new(),
            attributes: Vec::new(),
            geometry,
            intersect_mask: IntersectMask::default(),
            state_set: BTreeMap::new(),
            cached_world_transform: Cell::new(None),
            cached_bounds: Cell::new(None),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_geometry(&self) -> bool {
        self.kind == NodeKind::Geometry
    }

    // Hierarchy management

    /// Gets the parent node ID.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Sets the parent node ID (internal use only - use Scene methods to maintain consistency).
    pub(crate) fn set_parent(&mut self, parent: Option<NodeId>) {
        self.parent = parent;
    }

    /// Gets the list of child node IDs.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub(crate) fn add_child(&mut self, child: NodeId) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }

    pub(crate) fn remove_child(&mut self, child: NodeId) {
        self.children.retain(|&id| id != child);
    }

    // Attributes

    /// Attached attributes in attach order.
    pub fn attributes(&self) -> &[AttachedAttribute] {
        &self.attributes
    }

    pub fn has_attribute(&self, id: AttributeId) -> bool {
        self.attributes.iter().any(|attached| attached.id == id)
    }

    /// First attached attribute of the given type.
    pub fn attribute_of_type(&self, attr_type: AttributeType) -> Option<AttributeId> {
        self.attributes
            .iter()
            .find(|attached| attached.attr_type == attr_type)
            .map(|attached| attached.id)
    }

    pub(crate) fn push_attribute(&mut self, id: AttributeId, attr_type: AttributeType) {
        self.attributes.push(AttachedAttribute { id, attr_type });
    }

    pub(crate) fn remove_attribute(&mut self, id: AttributeId) -> bool {
        let before = self.attributes.len();
        self.attributes.retain(|attached| attached.id != id);
        self.attributes.len() != before
    }

    // Content

    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    pub fn intersect_mask(&self) -> IntersectMask {
        self.intersect_mask
    }

    pub(crate) fn set_intersect_mask(&mut self, mask: IntersectMask) {
        self.intersect_mask = mask;
    }

    // Backend state set

    pub fn state_slot(&self, kind: StateKind) -> NodeStateSlot {
        self.state_set.get(&kind).copied().unwrap_or_default()
    }

    pub(crate) fn set_state_slot(&mut self, kind: StateKind, slot: NodeStateSlot) {
        if slot.setting == StateSetting::Inherit {
            self.state_set.remove(&kind);
        } else {
            self.state_set.insert(kind, slot);
        }
    }

    // Caches

    /// Gets the cached world transform if it was computed at `revision`.
    /// You probably want [crate::Scene::global_transform]
    pub(crate) fn cached_world_transform(&self, revision: u64) -> Option<Matrix4<f32>> {
        match self.cached_world_transform.get() {
            Some((stamp, transform)) if stamp == revision => Some(transform),
            _ => None,
        }
    }

    pub(crate) fn set_cached_world_transform(&self, revision: u64, transform: Matrix4<f32>) {
        self.cached_world_transform.set(Some((revision, transform)));
    }

    /// Gets the cached subtree bounds if they were computed at `revision`.
    ///
    /// The outer Option is the cache state; the inner one is None for subtrees
    /// without geometry.
    pub(crate) fn cached_bounds(&self, revision: u64) -> Option<Option<Aabb>> {
        match self.cached_bounds.get() {
            Some((stamp, bounds)) if stamp == revision => Some(bounds),
            _ => None,
        }
    }

    pub(crate) fn set_cached_bounds(&self, revision: u64, bounds: Option<Aabb>) {
        self.cached_bounds.set(Some((revision, bounds)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{Attribute, StateValue};
    use crate::object::Arena;
    use cgmath::Vector3;

    #[test]
    fn test_node_new() {
        let node = Node::new(5, Some("torso".to_string()), NodeKind::Component, None);

        assert_eq!(node.id, 5);
        assert_eq!(node.name.as_deref(), Some("torso"));
        assert_eq!(node.parent(), None);
        assert!(node.children().is_empty());
        assert!(node.attributes().is_empty());
        assert_eq!(node.intersect_mask(), IntersectMask::ALL);
        assert!(!node.is_geometry());
    }

    #[test]
    fn test_add_child_duplicate_ignored() {
        let mut node = Node::new(0, None, NodeKind::Component, None);
        node.add_child(1);
        node.add_child(1);
        node.add_child(2);
        assert_eq!(node.children(), &[1, 2]);

        node.remove_child(1);
        assert_eq!(node.children(), &[2]);
    }

    #[test]
    fn test_attribute_list() {
        let mut arena = Arena::new();
        let wire = arena.insert(Attribute::state(StateValue::Wireframe(true)));
        let mut node = Node::new(0, None, NodeKind::Component, None);

        node.push_attribute(wire, AttributeType::Wireframe);
        assert!(node.has_attribute(wire));
        assert_eq!(node.attribute_of_type(AttributeType::Wireframe), Some(wire));
        assert_eq!(node.attribute_of_type(AttributeType::Fog), None);

        assert!(node.remove_attribute(wire));
        assert!(!node.remove_attribute(wire));
    }

    #[test]
    fn test_state_slot_inherit_clears_entry() {
        let mut node = Node::new(0, None, NodeKind::Component, None);
        let slot = NodeStateSlot {
            setting: StateSetting::Value(StateValue::LineWidth(3.0)),
            override_flag: true,
        };

        node.set_state_slot(StateKind::LineWidth, slot);
        assert_eq!(node.state_slot(StateKind::LineWidth), slot);

        node.set_state_slot(StateKind::LineWidth, NodeStateSlot::default());
        assert_eq!(node.state_slot(StateKind::LineWidth).setting, StateSetting::Inherit);
    }

    #[test]
    fn test_cached_world_transform_is_revision_stamped() {
        let node = Node::new(0, None, NodeKind::Component, None);
        assert_eq!(node.cached_world_transform(0), None);

        let transform = Matrix4::from_translation(Vector3::new(1.0, 2.0, 3.0));
        node.set_cached_world_transform(4, transform);
        assert_eq!(node.cached_world_transform(4), Some(transform));
        assert_eq!(node.cached_world_transform(5), None);
    }

    #[test]
    fn test_cached_bounds_distinguishes_empty_from_stale() {
        let node = Node::new(0, None, NodeKind::Component, None);
        assert_eq!(node.cached_bounds(1), None);

        node.set_cached_bounds(1, None);
        assert_eq!(node.cached_bounds(1), Some(None));
    }
}
