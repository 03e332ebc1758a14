//! Scene graph core: reference-counted attributes attached to a tree of nodes,
//! the graphics state they accumulate into during a render traversal, and ray
//! intersection against the tree.

pub use vess_common as common;

pub mod attribute;
pub mod backend;
pub mod geom_query;
mod geometry;
mod graphics_state;
mod node;
pub mod object;
mod scene;
mod traversal;


pub use attribute::{
    AttachError, Attribute, AttributeCategory, AttributeData, AttributeId, AttributeType,
    CollisionAttribute, ContainerBinding, DecalAttribute, FogMode, FogState, Light,
    LightAttribute, LightScope, LodAttribute, ScentDetectorAttribute, ShadingMode, SharedPose,
    SoundSourceAttribute, StateKind, StateSetting, StateValue, SwitchAttribute,
    TransformAttribute, TransparencyQuality, TransparencyState,
};
pub use backend::{DrawCall, NullSink, PushStrategy, RecordingSink, RenderSink, SinkEvent, SinkLog};
pub use geom_query::{IntersectHit, IntersectQuery, IntersectionService};
pub use geometry::{Geometry, GeometryHit};
pub use graphics_state::{GraphicsState, LockKey, ResolvedState, SavedSlot, StateEntry};
pub use node::{AttachedAttribute, IntersectMask, Node, NodeId, NodeKind, NodeStateSlot};
pub use object::{Arena, Handle, ObjectError, RawHandle};
pub use scene::Scene;
