//! Motion models: components that turn an input source into kinematics updates.
//!
//! Models write poses directly into the [`Kinematics`] joints they are bound to.
//! They run before kinematics integration, so their writes are committed to the
//! scene in the same frame.

mod arm;
mod collision;
mod head;
mod terrain_follow;
mod tracked;

pub use arm::{ArmCalibration, ArmJoints, ArmTrackers, Correction, ThreeTrackerArm};
pub use collision::{CollisionMode, CollisionMotion, DEFAULT_COLLISION_MARGIN};
pub use head::HeadMotion;
pub use terrain_follow::{
    TerrainFollow, DEFAULT_FLOAT_HEIGHT, DEFAULT_SEARCH_DEPTH, DEFAULT_STEP_HEIGHT,
};
pub use tracked::TrackedMotion;

use cgmath::Matrix4;
use thiserror::Error;

use crate::kinematics::Kinematics;
use crate::scene::{IntersectionService, NodeId, Scene};

/// Index of a joint in the slice handed to motion models.
pub type JointIndex = usize;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MotionError {
    #[error("joint index {0} is out of range")]
    MissingJoint(JointIndex),

    #[error("node {0} is no longer in the scene")]
    MissingNode(NodeId),
}

/// The parts of the world a motion model may query.
pub trait MotionWorld: IntersectionService {
    /// World transform of the node's parent, identity for a root.
    /// None if the node is gone.
    fn parent_transform(&self, node: NodeId) -> Option<Matrix4<f32>>;
}

impl MotionWorld for Scene {
    fn parent_transform(&self, node: NodeId) -> Option<Matrix4<f32>> {
        Scene::parent_transform(self, node)
    }
}

/// What a motion model may touch during an update.
pub struct MotionContext<'a> {
    pub joints: &'a mut [Kinematics],
    pub world: &'a dyn MotionWorld,
}

impl MotionContext<'_> {
    pub fn joint(&self, index: JointIndex) -> Result<&Kinematics, MotionError> {
        self.joints.get(index).ok_or(MotionError::MissingJoint(index))
    }

    pub fn joint_mut(&mut self, index: JointIndex) -> Result<&mut Kinematics, MotionError> {
        self.joints
            .get_mut(index)
            .ok_or(MotionError::MissingJoint(index))
    }
}

pub trait MotionModel {
    /// A human-readable name, used in diagnostics.
    fn name(&self) -> &str;

    /// Joints this model reads or writes.
    fn joints(&self) -> Vec<JointIndex>;

    /// Applies this frame's input to the bound joints.
    fn update(&mut self, ctx: &mut MotionContext<'_>, dt: f64) -> Result<(), MotionError>;

    /// Re-captures the model's reference pose from its current input.
    fn reset(&mut self);
}
