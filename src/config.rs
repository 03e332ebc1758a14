//! Serializable avatar descriptions.
//!
//! Joints refer to scene nodes by name and models refer to joints and trackers
//! by name; [`Avatar::from_config`](crate::Avatar::from_config) resolves them.
//! Vectors are `[x, y, z]` arrays in the Z-up frame.

use std::path::Path;

use anyhow::Context;
use cgmath::{Quaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::common::axis_angle_deg;
use crate::motion::{
    ArmCalibration, CollisionMode, Correction, DEFAULT_COLLISION_MARGIN, DEFAULT_FLOAT_HEIGHT,
    DEFAULT_SEARCH_DEPTH, DEFAULT_STEP_HEIGHT,
};
use crate::scene::IntersectMask;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarConfig {
    pub name: String,
    #[serde(default)]
    pub joints: Vec<JointConfig>,
    #[serde(default)]
    pub models: Vec<MotionModelConfig>,
    #[serde(default)]
    pub terrain_follow: Option<TerrainFollowConfig>,
    #[serde(default)]
    pub collision: Option<CollisionConfig>,
}

impl AvatarConfig {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Failed to parse avatar config")
    }

    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read avatar config {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("In {}", path.display()))
    }

    pub fn to_json_string(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize avatar config")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointConfig {
    pub name: String,
    /// Name of the scene node the joint drives
    pub node: String,
    /// Keep velocity between frames; false clears it after every update
    #[serde(default = "enabled")]
    pub inertia: bool,
    #[serde(default)]
    pub center_of_mass: [f32; 3],
}

/// A rotation given as an axis and an angle in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationConfig {
    pub axis: [f32; 3],
    pub degrees: f32,
}

impl RotationConfig {
    pub fn to_quaternion(&self) -> Quaternion<f32> {
        axis_angle_deg(Vector3::from(self.axis), self.degrees)
    }
}

impl From<RotationConfig> for Correction {
    fn from(config: RotationConfig) -> Self {
        Correction {
            axis: Vector3::from(config.axis),
            degrees: config.degrees,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MotionModelConfig {
    Tracked(TrackedConfig),
    Head(HeadConfig),
    ThreeTrackerArm(ArmConfig),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedConfig {
    pub joint: String,
    pub tracker: String,
    #[serde(default = "enabled")]
    pub position: bool,
    #[serde(default = "enabled")]
    pub orientation: bool,
    #[serde(default)]
    pub position_offset: [f32; 3],
    #[serde(default)]
    pub orientation_offset: Option<RotationConfig>,
    #[serde(default = "unit_scale")]
    pub scale: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadConfig {
    pub joint: String,
    pub back_tracker: String,
    pub head_tracker: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmConfig {
    pub shoulder: String,
    pub elbow: String,
    pub wrist: String,
    pub back_tracker: String,
    pub elbow_tracker: String,
    pub hand_tracker: String,
    #[serde(default)]
    pub calibration: ArmCalibrationConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmCalibrationConfig {
    pub shoulder_offset: [f32; 3],
    pub elbow_offset: [f32; 3],
    pub wrist_offset: [f32; 3],
    pub elbow_axis: [f32; 3],
    pub shoulder_correction: RotationConfig,
    pub wrist_correction: RotationConfig,
}

impl Default for ArmCalibrationConfig {
    fn default() -> Self {
        ArmCalibration::default().into()
    }
}

impl From<ArmCalibration> for ArmCalibrationConfig {
    fn from(calibration: ArmCalibration) -> Self {
        let rotation = |c: Correction| RotationConfig {
            axis: c.axis.into(),
            degrees: c.degrees,
        };
        Self {
            shoulder_offset: calibration.shoulder_offset.into(),
            elbow_offset: calibration.elbow_offset.into(),
            wrist_offset: calibration.wrist_offset.into(),
            elbow_axis: calibration.elbow_axis.into(),
            shoulder_correction: rotation(calibration.shoulder_correction),
            wrist_correction: rotation(calibration.wrist_correction),
        }
    }
}

impl From<ArmCalibrationConfig> for ArmCalibration {
    fn from(config: ArmCalibrationConfig) -> Self {
        Self {
            shoulder_offset: config.shoulder_offset.into(),
            elbow_offset: config.elbow_offset.into(),
            wrist_offset: config.wrist_offset.into(),
            elbow_axis: config.elbow_axis.into(),
            shoulder_correction: config.shoulder_correction.into(),
            wrist_correction: config.wrist_correction.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainFollowConfig {
    pub joint: String,
    #[serde(default)]
    pub base_offset: [f32; 3],
    #[serde(default = "default_step_height")]
    pub step_height: f32,
    #[serde(default = "default_float_height")]
    pub float_height: f32,
    #[serde(default = "default_search_depth")]
    pub search_depth: f32,
    /// Intersection mask bits; defaults to the terrain bit
    #[serde(default = "terrain_mask")]
    pub mask: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionConfig {
    pub joint: String,
    #[serde(default = "origin_offsets")]
    pub offsets: Vec<[f32; 3]>,
    #[serde(default = "default_margin")]
    pub margin: f32,
    #[serde(default)]
    pub mode: CollisionMode,
    /// Intersection mask bits; defaults to the obstacle bit
    #[serde(default = "obstacle_mask")]
    pub mask: u32,
}

fn enabled() -> bool {
    true
}

fn unit_scale() -> f32 {
    1.0
}

fn default_step_height() -> f32 {
    DEFAULT_STEP_HEIGHT
}

fn default_float_height() -> f32 {
    DEFAULT_FLOAT_HEIGHT
}

fn default_search_depth() -> f32 {
    DEFAULT_SEARCH_DEPTH
}

fn default_margin() -> f32 {
    DEFAULT_COLLISION_MARGIN
}

fn terrain_mask() -> u32 {
    IntersectMask::TERRAIN.bits()
}

fn obstacle_mask() -> u32 {
    IntersectMask::OBSTACLE.bits()
}

fn origin_offsets() -> Vec<[f32; 3]> {
    vec![[0.0; 3]]
}
