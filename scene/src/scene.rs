use std::cell::RefCell;
use std::collections::HashMap;

use cgmath::{Matrix4, SquareMatrix};

use crate::attribute::{
    AttachError, Attribute, AttributeCategory, AttributeData, AttributeId, AttributeType,
    LightAttribute, StateKind, StateSetting, StateValue, TransformAttribute,
};
use crate::backend::{NullSink, PushStrategy, RenderSink};
use crate::common::Aabb;
use crate::geometry::Geometry;
use crate::node::{IntersectMask, Node, NodeId, NodeKind, NodeStateSlot};
use crate::object::{Arena, ObjectError};

/// The scene container: a forest of nodes plus the attributes attached to them.
///
/// Attributes are reference counted. Each attachment holds one reference, and
/// callers that keep an attribute around between attachments take their own with
/// [`Scene::ref_attribute`]. Every mutation that can move geometry bumps an
/// internal revision, which invalidates the cached world transforms and bounds.
///
/// # Examples
///
/// ```
/// use vess_scene::{Attribute, Geometry, Scene, StateValue};
///
/// let mut scene = Scene::new();
/// let root = scene.add_component(None, Some("world")).unwrap();
/// scene.add_geometry(Some(root), Some("ground"), Geometry::ground_plane(50.0, 0.0)).unwrap();
///
/// let wireframe = scene.add_attribute(Attribute::state(StateValue::Wireframe(true)));
/// scene.attach_attribute(wireframe, root).unwrap();
/// assert_eq!(scene.attribute_ref_count(wireframe), Some(1));
/// ```
pub struct Scene {
    pub(crate) nodes: HashMap<NodeId, Node>,
    pub(crate) root_nodes: Vec<NodeId>,
    pub(crate) attributes: Arena<Attribute>,
    pub(crate) sink: RefCell<Box<dyn RenderSink>>,

    next_node_id: NodeId,
    revision: u64,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Creates an empty scene that draws to a [`NullSink`].
    pub fn new() -> Self {
        Self::with_sink(Box::new(NullSink))
    }

    pub fn with_sink(sink: Box<dyn RenderSink>) -> Self {
        Self {
            nodes: HashMap::new(),
            root_nodes: Vec::new(),
            attributes: Arena::new(),
            sink: RefCell::new(sink),
            next_node_id: 0,
            revision: 0,
        }
    }

    /// Replaces the render sink.
    ///
    /// A sink that wants state at attach time is first brought up to date with
    /// every node's current state set.
    pub fn set_sink(&mut self, mut sink: Box<dyn RenderSink>) {
        if sink.strategy() == PushStrategy::Attach {
            let mut ids: Vec<NodeId> = self.nodes.keys().copied().collect();
            ids.sort_unstable();
            for id in ids {
                let Some(node) = self.nodes.get(&id) else {
                    continue;
                };
                for kind in StateKind::ALL {
                    let slot = node.state_slot(kind);
                    if slot.setting != StateSetting::Inherit {
                        sink.node_state_changed(id, kind, &slot);
                    }
                }
            }
        }
        self.sink = RefCell::new(sink);
    }

    pub fn sink_strategy(&self) -> PushStrategy {
        self.sink.borrow().strategy()
    }

    /// Counter bumped by every change that can affect transforms or bounds.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn bump_revision(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    // ========== Nodes ==========

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn root_nodes(&self) -> &[NodeId] {
        &self.root_nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Finds a node by name. If several share the name, the oldest one wins.
    pub fn find_node_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .values()
            .filter(|node| node.name.as_deref() == Some(name))
            .map(|node| node.id)
            .min()
    }

    fn add_node(
        &mut self,
        parent: Option<NodeId>,
        name: Option<String>,
        kind: NodeKind,
        geometry: Option<Geometry>,
    ) -> anyhow::Result<NodeId> {
        // Validate parent exists if specified
        if let Some(parent_id) = parent {
            match self.nodes.get(&parent_id) {
                None => anyhow::bail!("Parent node with ID {} not found in scene", parent_id),
                Some(parent_node) if parent_node.is_geometry() => {
                    anyhow::bail!("Parent node {} is a geometry leaf", parent_id)
                }
                Some(_) => {}
            }
        }

        let id = self.next_node_id;
        self.next_node_id += 1;

        let mut node = Node::new(id, name, kind, geometry);

        // Set up parent-child relationship
        match parent.and_then(|parent_id| self.nodes.get_mut(&parent_id)) {
            Some(parent_node) => {
                parent_node.add_child(id);
                node.set_parent(Some(parent_node.id));
            }
            None => self.root_nodes.push(id),
        }

        self.nodes.insert(id, node);
        self.bump_revision();
        Ok(id)
    }

    /// Adds an interior node.
    ///
    /// # Errors
    /// Returns an error if `parent` does not exist or is a geometry leaf.
    pub fn add_component(
        &mut self,
        parent: Option<NodeId>,
        name: Option<&str>,
    ) -> anyhow::Result<NodeId> {
        self.add_node(parent, name.map(str::to_string), NodeKind::Component, None)
    }

    /// Adds a geometry leaf.
    ///
    /// # Errors
    /// Returns an error if `parent` does not exist or is a geometry leaf.
    pub fn add_geometry(
        &mut self,
        parent: Option<NodeId>,
        name: Option<&str>,
        geometry: Geometry,
    ) -> anyhow::Result<NodeId> {
        self.add_node(
            parent,
            name.map(str::to_string),
            NodeKind::Geometry,
            Some(geometry),
        )
    }

    /// True if `ancestor` lies on the path from `node` to its root (excluding `node`).
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.nodes.get(&node).and_then(|n| n.parent());
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(&id).and_then(|n| n.parent());
        }
        false
    }

    /// Moves a node under a new parent, or makes it a root with `None`.
    ///
    /// # Errors
    /// Returns an error if either node is missing, the new parent is a geometry
    /// leaf, or the move would make the node its own ancestor.
    pub fn set_parent(&mut self, node_id: NodeId, parent: Option<NodeId>) -> anyhow::Result<()> {
        let Some(old_parent) = self.nodes.get(&node_id).map(|node| node.parent()) else {
            anyhow::bail!("Node with ID {} not found in scene", node_id);
        };

        if let Some(parent_id) = parent {
            let Some(parent_node) = self.nodes.get(&parent_id) else {
                anyhow::bail!("Parent node with ID {} not found in scene", parent_id);
            };
            if parent_node.is_geometry() {
                anyhow::bail!("Parent node {} is a geometry leaf", parent_id);
            }
            if parent_id == node_id || self.is_ancestor(node_id, parent_id) {
                anyhow::bail!(
                    "Moving node {} under {} would create a cycle",
                    node_id,
                    parent_id
                );
            }
        }

        match old_parent.and_then(|id| self.nodes.get_mut(&id)) {
            Some(old) => old.remove_child(node_id),
            None => self.root_nodes.retain(|&id| id != node_id),
        }
        match parent.and_then(|id| self.nodes.get_mut(&id)) {
            Some(new_parent) => new_parent.add_child(node_id),
            None => self.root_nodes.push(node_id),
        }
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.set_parent(parent);
        }

        self.bump_revision();
        Ok(())
    }

    /// Removes a node and all its descendants.
    ///
    /// Each removed node releases its attributes; attributes left without any
    /// reference are destroyed. Returns false if the node does not exist.
    pub fn remove_node(&mut self, node_id: NodeId) -> bool {
        let Some(parent) = self.nodes.get(&node_id).map(|node| node.parent()) else {
            return false;
        };

        self.remove_node_recursive(node_id);

        match parent.and_then(|id| self.nodes.get_mut(&id)) {
            Some(parent_node) => parent_node.remove_child(node_id),
            None => self.root_nodes.retain(|&id| id != node_id),
        }

        self.bump_revision();
        true
    }

    fn remove_node_recursive(&mut self, node_id: NodeId) {
        let Some(node) = self.nodes.remove(&node_id) else {
            return;
        };

        for &child_id in node.children() {
            self.remove_node_recursive(child_id);
        }

        for attached in node.attributes() {
            if let Some(attr) = self.attributes.get_mut(attached.id) {
                attr.remove_owner(node_id);
            }
            match self.attributes.unref_delete(attached.id) {
                Ok(Some(_)) => log::debug!(
                    "destroyed {:?} attribute released by node {}",
                    attached.attr_type,
                    node_id
                ),
                Ok(None) => {}
                Err(e) => log::warn!("releasing attribute of node {}: {}", node_id, e),
            }
        }
    }

    pub fn set_intersect_mask(&mut self, node_id: NodeId, mask: IntersectMask) -> bool {
        match self.nodes.get_mut(&node_id) {
            Some(node) => {
                node.set_intersect_mask(mask);
                true
            }
            None => false,
        }
    }

    /// Deep-copies a subtree under `parent`.
    ///
    /// Attributes are copied with [`Scene::attach_duplicate`], so Container
    /// attributes are left behind.
    ///
    /// # Errors
    /// Returns an error if the source node or `parent` is missing, or if `parent`
    /// lies inside the subtree being copied.
    pub fn clone_subtree(
        &mut self,
        node_id: NodeId,
        parent: Option<NodeId>,
    ) -> anyhow::Result<NodeId> {
        if let Some(parent_id) = parent {
            if parent_id == node_id || self.is_ancestor(node_id, parent_id) {
                anyhow::bail!(
                    "Cannot copy node {} into its own subtree (under {})",
                    node_id,
                    parent_id
                );
            }
        }
        self.clone_subtree_recursive(node_id, parent)
    }

    fn clone_subtree_recursive(
        &mut self,
        node_id: NodeId,
        parent: Option<NodeId>,
    ) -> anyhow::Result<NodeId> {
        let Some(source) = self.nodes.get(&node_id) else {
            anyhow::bail!("Node with ID {} not found in scene", node_id);
        };
        let name = source.name.clone();
        let kind = source.kind();
        let geometry = source.geometry().cloned();
        let mask = source.intersect_mask();
        let attributes: Vec<AttributeId> = source.attributes().iter().map(|a| a.id).collect();
        let children = source.children().to_vec();

        let copy = self.add_node(parent, name, kind, geometry)?;
        self.set_intersect_mask(copy, mask);

        for attr in attributes {
            self.attach_duplicate(attr, copy)?;
        }
        for child in children {
            self.clone_subtree_recursive(child, Some(copy))?;
        }
        Ok(copy)
    }

    // ========== Attribute Storage & Reference Counting ==========

    /// Stores a new, unattached attribute with a reference count of zero.
    pub fn add_attribute(&mut self, attribute: Attribute) -> AttributeId {
        self.attributes.insert(attribute)
    }

    pub fn attribute(&self, id: AttributeId) -> Option<&Attribute> {
        self.attributes.get(id)
    }

    pub fn is_attribute_valid(&self, id: AttributeId) -> bool {
        self.attributes.is_valid(id)
    }

    pub fn attribute_ref_count(&self, id: AttributeId) -> Option<u32> {
        self.attributes.ref_count(id)
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    pub fn ref_attribute(&mut self, id: AttributeId) -> Result<u32, ObjectError> {
        self.attributes.add_ref(id)
    }

    pub fn unref_attribute(&mut self, id: AttributeId) -> Result<u32, ObjectError> {
        self.attributes.unref(id)
    }

    /// Unreferences the attribute and destroys it if nothing references it any more.
    ///
    /// Returns true if the attribute was destroyed.
    pub fn unref_delete_attribute(&mut self, id: AttributeId) -> Result<bool, ObjectError> {
        match self.attributes.unref_delete(id)? {
            Some(attribute) => {
                self.purge_owners(id, &attribute);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Destroys the attribute regardless of its reference count.
    ///
    /// Destroying a referenced attribute is reported as an error and proceeds; the
    /// attribute is detached from every node first.
    pub fn delete_attribute(&mut self, id: AttributeId) -> bool {
        match self.attributes.remove(id) {
            Some(attribute) => {
                self.purge_owners(id, &attribute);
                true
            }
            None => false,
        }
    }

    /// Drops every node's reference to a destroyed attribute.
    fn purge_owners(&mut self, id: AttributeId, attribute: &Attribute) {
        if !attribute.is_attached() {
            return;
        }
        log::error!(
            "destroyed {:?} attribute {} while attached to {} node(s)",
            attribute.attribute_type(),
            id.raw(),
            attribute.attached_count()
        );
        let state_kind = attribute.attribute_type().state_kind();
        for &owner in attribute.owners() {
            if let Some(node) = self.nodes.get_mut(&owner) {
                node.remove_attribute(id);
            }
            if let Some(kind) = state_kind {
                self.push_state(owner, kind, NodeStateSlot::default());
            }
        }
        self.bump_revision();
    }

    // ========== Attach / Detach ==========

    fn push_state(&mut self, node_id: NodeId, kind: StateKind, slot: NodeStateSlot) {
        let Some(node) = self.nodes.get_mut(&node_id) else {
            return;
        };
        node.set_state_slot(kind, slot);

        let sink = self.sink.get_mut();
        if sink.strategy() == PushStrategy::Attach {
            sink.node_state_changed(node_id, kind, &slot);
        }
    }

    fn state_slot_for(attribute: &Attribute) -> Option<(StateKind, NodeStateSlot)> {
        let value = attribute.state_value()?;
        Some((
            value.kind(),
            NodeStateSlot {
                setting: StateSetting::Value(value),
                override_flag: attribute.is_override(),
            },
        ))
    }

    /// Attaches an attribute to a node.
    ///
    /// On success the node holds one reference to the attribute, and a State
    /// attribute's value is written into the node's state set.
    ///
    /// # Errors
    /// Fails without changing anything if either handle is invalid or the
    /// attachment rules reject the pair (see [`Attribute::check_attach`]).
    pub fn attach_attribute(&mut self, id: AttributeId, node_id: NodeId) -> Result<(), AttachError> {
        let Some(attribute) = self.attributes.get(id) else {
            log::warn!("attach: attribute {} does not exist", id.raw());
            return Err(AttachError::InvalidAttribute(id.raw()));
        };
        let Some(node) = self.nodes.get(&node_id) else {
            log::warn!("attach: node {} does not exist", node_id);
            return Err(AttachError::InvalidNode(node_id));
        };
        if let Err(e) = attribute.check_attach(node) {
            log::warn!("attach to node {}: {}", node_id, e);
            return Err(e);
        }

        let attr_type = attribute.attribute_type();
        let state = Self::state_slot_for(attribute);

        self.attributes
            .add_ref(id)
            .map_err(|_| AttachError::InvalidAttribute(id.raw()))?;
        if let Some(attribute) = self.attributes.get_mut(id) {
            attribute.add_owner(node_id);
        }
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.push_attribute(id, attr_type);
        }
        if let Some((kind, slot)) = state {
            self.push_state(node_id, kind, slot);
        }

        log::debug!("attached {:?} attribute {} to node {}", attr_type, id.raw(), node_id);
        self.bump_revision();
        Ok(())
    }

    /// Detaches an attribute from a node, releasing the node's reference.
    ///
    /// The attribute itself survives even if this was its last reference. A State
    /// attribute's slot in the node's state set is reset to inherit.
    ///
    /// # Errors
    /// Fails without changing anything if either handle is invalid or the
    /// attribute is not attached to the node.
    pub fn detach_attribute(&mut self, id: AttributeId, node_id: NodeId) -> Result<(), AttachError> {
        let Some(attribute) = self.attributes.get_mut(id) else {
            log::warn!("detach: attribute {} does not exist", id.raw());
            return Err(AttachError::InvalidAttribute(id.raw()));
        };
        if !self.nodes.contains_key(&node_id) {
            log::warn!("detach: node {} does not exist", node_id);
            return Err(AttachError::InvalidNode(node_id));
        }
        if !attribute.remove_owner(node_id) {
            log::warn!(
                "detach: {:?} attribute {} is not attached to node {}",
                attribute.attribute_type(),
                id.raw(),
                node_id
            );
            return Err(AttachError::NotAttached(node_id));
        }
        let state_kind = attribute.attribute_type().state_kind();

        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.remove_attribute(id);
        }
        if let Err(e) = self.attributes.unref(id) {
            log::error!("detach: {}", e);
        }
        if let Some(kind) = state_kind {
            self.push_state(node_id, kind, NodeStateSlot::default());
        }

        self.bump_revision();
        Ok(())
    }

    /// Attaches a copy of `id` to `node_id`.
    ///
    /// Container attributes bind a unique external resource and are not copied;
    /// for them this returns `Ok(None)` and changes nothing.
    pub fn attach_duplicate(
        &mut self,
        id: AttributeId,
        node_id: NodeId,
    ) -> Result<Option<AttributeId>, AttachError> {
        let Some(attribute) = self.attributes.get(id) else {
            return Err(AttachError::InvalidAttribute(id.raw()));
        };
        let Some(copy) = attribute.duplicate() else {
            log::debug!(
                "{:?} attribute {} is not duplicated",
                attribute.attribute_type(),
                id.raw()
            );
            return Ok(None);
        };

        let copy_id = self.attributes.insert(copy);
        if let Err(e) = self.attach_attribute(copy_id, node_id) {
            self.attributes.remove(copy_id);
            return Err(e);
        }
        Ok(Some(copy_id))
    }

    /// Changes an attribute's value in place.
    ///
    /// Cached transforms are invalidated and State values are pushed again to
    /// every owner. The closure may not change the attribute's type; if it does,
    /// the old value is put back.
    pub fn modify_attribute<F>(&mut self, id: AttributeId, f: F) -> Result<(), AttachError>
    where
        F: FnOnce(&mut AttributeData),
    {
        let Some(attribute) = self.attributes.get_mut(id) else {
            return Err(AttachError::InvalidAttribute(id.raw()));
        };

        let previous = attribute.data().clone();
        f(attribute.data_mut());

        let from = previous.attribute_type();
        let to = attribute.attribute_type();
        if from != to {
            *attribute.data_mut() = previous;
            log::error!("modify: attribute {} cannot change type", id.raw());
            return Err(AttachError::TypeChanged { from, to });
        }

        self.refresh_owners(id);
        self.bump_revision();
        Ok(())
    }

    /// Sets whether a State attribute overrides the same kind further down the tree.
    pub fn set_attribute_override(
        &mut self,
        id: AttributeId,
        override_flag: bool,
    ) -> Result<(), AttachError> {
        let Some(attribute) = self.attributes.get_mut(id) else {
            return Err(AttachError::InvalidAttribute(id.raw()));
        };
        attribute.set_override(override_flag);
        self.refresh_owners(id);
        Ok(())
    }

    fn refresh_owners(&mut self, id: AttributeId) {
        let Some(attribute) = self.attributes.get(id) else {
            return;
        };
        let Some((kind, slot)) = Self::state_slot_for(attribute) else {
            return;
        };
        let owners = attribute.owners().to_vec();
        for owner in owners {
            self.push_state(owner, kind, slot);
        }
    }

    // ========== Queries ==========

    /// The first attached attribute of the given category, if any.
    pub fn node_attribute_of_category(
        &self,
        node_id: NodeId,
        category: AttributeCategory,
    ) -> Option<(AttributeId, &Attribute)> {
        let node = self.nodes.get(&node_id)?;
        node.attributes()
            .iter()
            .filter(|attached| attached.attr_type.category() == category)
            .find_map(|attached| {
                self.attributes
                    .get(attached.id)
                    .map(|attribute| (attached.id, attribute))
            })
    }

    /// The node's Transform attribute, if it has one.
    pub fn transform_attribute(&self, node_id: NodeId) -> Option<AttributeId> {
        self.nodes
            .get(&node_id)?
            .attribute_of_type(AttributeType::Transform)
    }

    /// The node's local transform: its Transform attribute's combined matrix, or identity.
    pub fn local_transform(&self, node_id: NodeId) -> Option<Matrix4<f32>> {
        let node = self.nodes.get(&node_id)?;
        let local = node
            .attribute_of_type(AttributeType::Transform)
            .and_then(|id| self.attributes.get(id))
            .and_then(|attribute| match attribute.data() {
                AttributeData::Transform(transform) => Some(transform.combined()),
                _ => None,
            })
            .unwrap_or_else(Matrix4::identity);
        Some(local)
    }

    /// Gets the world transform of a node.
    ///
    /// This returns the cached transform if valid, otherwise computes it by
    /// walking from the root to the node, computing and caching transforms
    /// along the way.
    pub fn global_transform(&self, node_id: NodeId) -> Option<Matrix4<f32>> {
        let node = self.nodes.get(&node_id)?;

        if let Some(cached) = node.cached_world_transform(self.revision) {
            return Some(cached);
        }

        // Walk up to root
        let mut path = vec![node_id];
        let mut current = node.parent();
        while let Some(parent_id) = current {
            path.push(parent_id);
            current = self.nodes.get(&parent_id).and_then(|n| n.parent());
        }

        // Walk down the path, computing transforms
        let mut world_transform = Matrix4::identity();
        for &id in path.iter().rev() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            if let Some(cached) = node.cached_world_transform(self.revision) {
                world_transform = cached;
            } else {
                world_transform = world_transform * self.local_transform(id)?;
                node.set_cached_world_transform(self.revision, world_transform);
            }
        }

        Some(world_transform)
    }

    /// World transform of the node's parent, identity for roots.
    pub fn parent_transform(&self, node_id: NodeId) -> Option<Matrix4<f32>> {
        match self.nodes.get(&node_id)?.parent() {
            Some(parent) => self.global_transform(parent),
            None => Some(Matrix4::identity()),
        }
    }

    /// Gets the world-space bounding box of the entire scene.
    pub fn bounding(&self) -> Option<Aabb> {
        self.root_nodes
            .iter()
            .filter_map(|&root| self.nodes_bounding(root))
            .reduce(|a, b| a.merge(&b))
    }

    /// Gets the world-space bounding box of a node and its subtree.
    ///
    /// The bounds cover every descendant, including children a grouping
    /// attribute currently hides.
    pub fn nodes_bounding(&self, node_id: NodeId) -> Option<Aabb> {
        let node = self.nodes.get(&node_id)?;

        if let Some(cached) = node.cached_bounds(self.revision) {
            return cached;
        }

        let children_bounds = node
            .children()
            .iter()
            .filter_map(|&child| self.nodes_bounding(child))
            .reduce(|a, b| a.merge(&b));

        let own_bounds = node.geometry().and_then(|geometry| {
            let world_transform = self.global_transform(node_id)?;
            geometry
                .bounding()
                .map(|bounds| bounds.transform(&world_transform))
        });

        let bounds = match (own_bounds, children_bounds) {
            (Some(own), Some(children)) => Some(own.merge(&children)),
            (own, children) => own.or(children),
        };

        node.set_cached_bounds(self.revision, bounds);
        bounds
    }

    /// The state value a node's geometry would be drawn with, computed from the
    /// per-node state sets along the path from the root.
    ///
    /// The first overriding value on the path wins; otherwise the deepest value does.
    pub fn effective_state(&self, node_id: NodeId, kind: StateKind) -> Option<StateValue> {
        let mut path = Vec::new();
        let mut current = Some(node_id);
        while let Some(id) = current {
            let node = self.nodes.get(&id)?;
            path.push(node);
            current = node.parent();
        }

        let mut value = None;
        for node in path.iter().rev() {
            let slot = node.state_slot(kind);
            if let StateSetting::Value(v) = slot.setting {
                value = Some(v);
                if slot.override_flag {
                    break;
                }
            }
        }
        value
    }

    /// Enabled Global-scope light attributes that are attached to some node.
    pub fn global_lights(&self) -> Vec<(AttributeId, &LightAttribute)> {
        self.attributes
            .iter()
            .filter(|(_, attribute)| attribute.is_attached())
            .filter_map(|(id, attribute)| match attribute.data() {
                AttributeData::Light(light) if light.enabled && !light.is_local() => {
                    Some((id, light))
                }
                _ => None,
            })
            .collect()
    }

    /// Convenience for creating and attaching a fresh Transform attribute.
    pub fn attach_new_transform(
        &mut self,
        node_id: NodeId,
        transform: TransformAttribute,
    ) -> Result<AttributeId, AttachError> {
        let id = self.add_attribute(Attribute::transform(transform));
        if let Err(e) = self.attach_attribute(id, node_id) {
            self.attributes.remove(id);
            return Err(e);
        }
        Ok(id)
    }
}
