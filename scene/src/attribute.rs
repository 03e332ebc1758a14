//! Attributes: the capabilities attached to scene nodes.
//!
//! Every attribute is one [`AttributeData`] variant stored in the scene's
//! reference-counted arena and addressed by an [`AttributeId`]. The variant decides
//! the attribute's [`AttributeCategory`], which in turn decides how many nodes may
//! own it and how many of its kind a single node may carry.

mod container;
mod grouping;
mod light;
mod state;
mod transform;

use thiserror::Error;

pub use container::{ContainerBinding, ScentDetectorAttribute, SharedPose, SoundSourceAttribute};
pub use grouping::{DecalAttribute, LodAttribute, SwitchAttribute};
pub use light::{Light, LightAttribute, LightScope};
pub use state::{
    FogMode, FogState, ShadingMode, StateKind, StateSetting, StateValue, TransparencyQuality,
    TransparencyState,
};
pub use transform::TransformAttribute;

use crate::node::{IntersectMask, Node, NodeId, NodeKind};
use crate::object::{Handle, RawHandle};

/// Handle to an attribute stored in a [`Scene`](crate::Scene).
pub type AttributeId = Handle<Attribute>;

/// Broad classes of attributes, each with its own attachment rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeCategory {
    /// Rendering state; may be shared between any number of nodes
    State,
    /// Alters which children are traversed; one per node
    Grouping,
    /// Binds one external resource to one node
    Container,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributeType {
    Transform,
    Switch,
    Lod,
    Decal,
    Fog,
    Transparency,
    Backface,
    Wireframe,
    Shading,
    LineWidth,
    Light,
    Viewpoint,
    SoundListener,
    SoundSource,
    ScentDetector,
    Collision,
}

impl AttributeType {
    pub fn category(self) -> AttributeCategory {
        match self {
            AttributeType::Fog
            | AttributeType::Transparency
            | AttributeType::Backface
            | AttributeType::Wireframe
            | AttributeType::Shading
            | AttributeType::LineWidth => AttributeCategory::State,
            AttributeType::Switch | AttributeType::Lod | AttributeType::Decal => {
                AttributeCategory::Grouping
            }
            AttributeType::Viewpoint
            | AttributeType::SoundListener
            | AttributeType::SoundSource
            | AttributeType::ScentDetector => AttributeCategory::Container,
            AttributeType::Transform | AttributeType::Light | AttributeType::Collision => {
                AttributeCategory::Other
            }
        }
    }

    /// Graphics-state slot written by attributes of this type.
    pub fn state_kind(self) -> Option<StateKind> {
        match self {
            AttributeType::Fog => Some(StateKind::Fog),
            AttributeType::Transparency => Some(StateKind::Transparency),
            AttributeType::Backface => Some(StateKind::Backface),
            AttributeType::Wireframe => Some(StateKind::Wireframe),
            AttributeType::Shading => Some(StateKind::Shading),
            AttributeType::LineWidth => Some(StateKind::LineWidth),
            _ => None,
        }
    }

    /// True for types that only make sense on nodes that can have children.
    pub fn requires_component(self) -> bool {
        matches!(
            self,
            AttributeType::Transform
                | AttributeType::Switch
                | AttributeType::Lod
                | AttributeType::Decal
                | AttributeType::Viewpoint
        )
    }

    /// True if a node carrying `self` may not also carry `other`.
    pub fn conflicts_with(self, other: AttributeType) -> bool {
        if self == other {
            // Containers, lights and collision attributes stack
            return self.category() != AttributeCategory::Container
                && !matches!(self, AttributeType::Light | AttributeType::Collision);
        }
        self.category() == AttributeCategory::Grouping
            && other.category() == AttributeCategory::Grouping
    }
}

/// Restricts which intersection queries see the owning subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionAttribute {
    pub mask: IntersectMask,
    pub enabled: bool,
}

impl Default for CollisionAttribute {
    fn default() -> Self {
        Self {
            mask: IntersectMask::ALL,
            enabled: true,
        }
    }
}

/// The value carried by an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeData {
    Transform(TransformAttribute),
    Switch(SwitchAttribute),
    Lod(LodAttribute),
    Decal(DecalAttribute),
    State(StateValue),
    Light(LightAttribute),
    Viewpoint(ContainerBinding),
    SoundListener(ContainerBinding),
    SoundSource(SoundSourceAttribute),
    ScentDetector(ScentDetectorAttribute),
    Collision(CollisionAttribute),
}

impl AttributeData {
    pub fn attribute_type(&self) -> AttributeType {
        match self {
            AttributeData::Transform(_) => AttributeType::Transform,
            AttributeData::Switch(_) => AttributeType::Switch,
            AttributeData::Lod(_) => AttributeType::Lod,
            AttributeData::Decal(_) => AttributeType::Decal,
            AttributeData::State(value) => match value.kind() {
                StateKind::Fog => AttributeType::Fog,
                StateKind::Transparency => AttributeType::Transparency,
                StateKind::Backface => AttributeType::Backface,
                StateKind::Wireframe => AttributeType::Wireframe,
                StateKind::Shading => AttributeType::Shading,
                StateKind::LineWidth => AttributeType::LineWidth,
            },
            AttributeData::Light(_) => AttributeType::Light,
            AttributeData::Viewpoint(_) => AttributeType::Viewpoint,
            AttributeData::SoundListener(_) => AttributeType::SoundListener,
            AttributeData::SoundSource(_) => AttributeType::SoundSource,
            AttributeData::ScentDetector(_) => AttributeType::ScentDetector,
            AttributeData::Collision(_) => AttributeType::Collision,
        }
    }

    /// The external-resource binding of a container attribute.
    pub fn binding(&self) -> Option<&ContainerBinding> {
        match self {
            AttributeData::Viewpoint(binding) | AttributeData::SoundListener(binding) => {
                Some(binding)
            }
            AttributeData::SoundSource(source) => Some(&source.binding),
            AttributeData::ScentDetector(detector) => Some(&detector.binding),
            _ => None,
        }
    }
}

/// Failures of the attach/detach protocol.
///
/// Every failure leaves the scene unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachError {
    #[error("attribute {0} does not exist")]
    InvalidAttribute(RawHandle),

    #[error("node {0} does not exist")]
    InvalidNode(NodeId),

    #[error("{attr_type:?} attribute is already attached to node {owner}")]
    AlreadyAttached {
        attr_type: AttributeType,
        owner: NodeId,
    },

    #[error("{attr_type:?} attribute cannot be attached to a {kind:?} node")]
    IncompatibleNode {
        attr_type: AttributeType,
        kind: NodeKind,
    },

    #[error("node {node} already holds a {existing:?} attribute")]
    Conflict {
        node: NodeId,
        existing: AttributeType,
    },

    #[error("attribute is not attached to node {0}")]
    NotAttached(NodeId),

    #[error("attribute type cannot change from {from:?} to {to:?}")]
    TypeChanged {
        from: AttributeType,
        to: AttributeType,
    },
}

/// An attribute instance: its value plus the bookkeeping of the attach protocol.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: Option<String>,
    data: AttributeData,
    owners: Vec<NodeId>,
    override_flag: bool,
}

impl Attribute {
    pub fn new(data: AttributeData) -> Self {
        Self {
            name: None,
            data,
            owners: Vec::new(),
            override_flag: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Marks a State attribute as overriding same-type attributes further down the tree.
    pub fn with_override(mut self, override_flag: bool) -> Self {
        self.override_flag = override_flag;
        self
    }

    pub fn transform(transform: TransformAttribute) -> Self {
        Self::new(AttributeData::Transform(transform))
    }

    pub fn state(value: StateValue) -> Self {
        Self::new(AttributeData::State(value))
    }

    pub fn data(&self) -> &AttributeData {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut AttributeData {
        &mut self.data
    }

    pub fn attribute_type(&self) -> AttributeType {
        self.data.attribute_type()
    }

    pub fn category(&self) -> AttributeCategory {
        self.attribute_type().category()
    }

    pub fn state_value(&self) -> Option<StateValue> {
        match self.data {
            AttributeData::State(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_override(&self) -> bool {
        self.override_flag
    }

    pub(crate) fn set_override(&mut self, override_flag: bool) {
        self.override_flag = override_flag;
    }

    /// Nodes this attribute is attached to, in attach order.
    pub fn owners(&self) -> &[NodeId] {
        &self.owners
    }

    pub fn attached_count(&self) -> usize {
        self.owners.len()
    }

    pub fn is_attached(&self) -> bool {
        !self.owners.is_empty()
    }

    pub fn is_attached_to(&self, node: NodeId) -> bool {
        self.owners.contains(&node)
    }

    pub(crate) fn add_owner(&mut self, node: NodeId) {
        self.owners.push(node);
    }

    pub(crate) fn remove_owner(&mut self, node: NodeId) -> bool {
        match self.owners.iter().position(|&owner| owner == node) {
            Some(index) => {
                self.owners.remove(index);
                true
            }
            None => false,
        }
    }

    /// Checks every attachment rule against `node` without changing anything.
    pub fn check_attach(&self, node: &Node) -> Result<(), AttachError> {
        let attr_type = self.attribute_type();

        if self.category() != AttributeCategory::State {
            if let Some(&owner) = self.owners.first() {
                return Err(AttachError::AlreadyAttached { attr_type, owner });
            }
        } else if self.is_attached_to(node.id) {
            return Err(AttachError::AlreadyAttached {
                attr_type,
                owner: node.id,
            });
        }

        if attr_type.requires_component() && node.kind() == NodeKind::Geometry {
            return Err(AttachError::IncompatibleNode {
                attr_type,
                kind: node.kind(),
            });
        }

        if let Some(existing) = node
            .attributes()
            .iter()
            .map(|attached| attached.attr_type)
            .find(|&existing| attr_type.conflicts_with(existing))
        {
            return Err(AttachError::Conflict {
                node: node.id,
                existing,
            });
        }

        Ok(())
    }

    /// True if this attribute may be attached to `node`.
    pub fn can_attach(&self, node: &Node) -> bool {
        self.check_attach(node).is_ok()
    }

    /// Type-checked value equality.
    ///
    /// Two attributes are equivalent when they are the same instance, or when they
    /// have the same type and carry equal values. Container attributes are only
    /// equivalent when they drive the same external resource. Comparing against
    /// `None` is always false.
    pub fn is_equivalent(&self, other: Option<&Attribute>) -> bool {
        let Some(other) = other else {
            return false;
        };
        if std::ptr::eq(self, other) {
            return true;
        }
        if self.attribute_type() != other.attribute_type() {
            return false;
        }
        self.data == other.data
    }

    /// An unattached copy carrying the same value, or None for Container attributes.
    pub fn duplicate(&self) -> Option<Attribute> {
        if self.category() == AttributeCategory::Container {
            return None;
        }
        Some(Attribute {
            name: self.name.clone(),
            data: self.data.clone(),
            owners: Vec::new(),
            override_flag: self.override_flag,
        })
    }
}
