//! VESS: a scene graph with an avatar layer on top.
//!
//! The scene graph itself lives in [`scene`]. This crate adds kinematics joints
//! that drive transform attributes, motion models that feed them from trackers
//! and the environment, and [`Avatar`], which runs them in a fixed order each frame.

pub use vess_scene as scene;
pub use vess_scene::common;

pub mod avatar;
pub mod config;
mod frame_clock;
pub mod kinematics;
pub mod motion;
pub mod tracker;

#[cfg(test)]
mod test_support;

pub use avatar::{Avatar, AvatarError};
pub use config::{
    ArmCalibrationConfig, ArmConfig, AvatarConfig, CollisionConfig, HeadConfig, JointConfig,
    MotionModelConfig, RotationConfig, TerrainFollowConfig, TrackedConfig,
};
pub use frame_clock::FrameClock;
pub use kinematics::{Kinematics, KinematicsError};
pub use motion::{
    ArmCalibration, ArmJoints, ArmTrackers, CollisionMode, CollisionMotion, Correction,
    HeadMotion, JointIndex, MotionContext, MotionError, MotionModel, MotionWorld,
    TerrainFollow, ThreeTrackerArm, TrackedMotion,
};
pub use scene::Scene;
pub use tracker::{MotionTracker, SharedTracker, TrackerRegistry, TrackerSample};
