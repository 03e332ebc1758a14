//! Avatar composition: a skeleton of kinematics joints driven by motion models.
//!
//! Every update runs in a fixed order: input motion models, then terrain follow,
//! then collision, then kinematics integration. Terrain follow and collision
//! correct the pose the input models produced, and integration commits the
//! corrected pose to the scene, so all of a frame's corrections land in that frame.

use std::collections::HashMap;
use std::rc::Rc;

use cgmath::Vector3;
use thiserror::Error;

use crate::config::{AvatarConfig, CollisionConfig, MotionModelConfig, TerrainFollowConfig};
use crate::frame_clock::FrameClock;
use crate::kinematics::{Kinematics, KinematicsError};
use crate::motion::{
    ArmJoints, ArmTrackers, CollisionMotion, HeadMotion, JointIndex, MotionContext, MotionError,
    MotionModel, TerrainFollow, ThreeTrackerArm, TrackedMotion,
};
use crate::scene::{IntersectMask, NodeId, Scene};
use crate::tracker::{MotionTracker, TrackerRegistry};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AvatarError {
    #[error("avatar {0} is not initialised")]
    NotInitialized(String),

    #[error("motion model {model} failed: {source}")]
    Motion {
        model: String,
        #[source]
        source: MotionError,
    },

    #[error("joint {joint} failed to update: {source}")]
    Kinematics {
        joint: String,
        #[source]
        source: KinematicsError,
    },
}

pub struct Avatar {
    name: String,
    joints: Vec<Kinematics>,
    joint_names: Vec<String>,
    joint_lookup: HashMap<String, JointIndex>,

    models: Vec<Box<dyn MotionModel>>,
    terrain_follow: Option<TerrainFollow>,
    collision: Option<CollisionMotion>,

    clock: FrameClock,
    setup_errors: Vec<String>,
    is_initted: bool,
}

impl Avatar {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            joints: Vec::new(),
            joint_names: Vec::new(),
            joint_lookup: HashMap::new(),
            models: Vec::new(),
            terrain_follow: None,
            collision: None,
            clock: FrameClock::new(),
            setup_errors: Vec::new(),
            is_initted: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ========== Setup ==========

    /// Adds a joint driving `node`, returning its index.
    ///
    /// A failure is also recorded as a setup error.
    pub fn add_joint(
        &mut self,
        name: impl Into<String>,
        scene: &mut Scene,
        node: NodeId,
    ) -> Result<JointIndex, KinematicsError> {
        let name = name.into();
        if self.joint_lookup.contains_key(&name) {
            self.record_setup_error(format!("joint {} is defined twice", name));
        }
        let kinematics = match Kinematics::new(scene, node) {
            Ok(kinematics) => kinematics,
            Err(e) => {
                self.record_setup_error(format!("joint {}: {}", name, e));
                return Err(e);
            }
        };

        let index = self.joints.len();
        self.joints.push(kinematics);
        self.joint_lookup.insert(name.clone(), index);
        self.joint_names.push(name);
        Ok(index)
    }

    pub fn add_motion_model(&mut self, model: Box<dyn MotionModel>) {
        self.models.push(model);
    }

    pub fn set_terrain_follow(&mut self, terrain_follow: Option<TerrainFollow>) {
        self.terrain_follow = terrain_follow;
    }

    pub fn set_collision(&mut self, collision: Option<CollisionMotion>) {
        self.collision = collision;
    }

    fn record_setup_error(&mut self, message: String) {
        log::warn!("avatar {}: {}", self.name, message);
        self.setup_errors.push(message);
    }

    /// Checks the assembled avatar and marks it ready for updates.
    ///
    /// Returns false, leaving the avatar uninitialised, if any setup step failed
    /// or a model is bound to a joint that does not exist.
    pub fn finish_setup(&mut self) -> bool {
        let joint_count = self.joints.len();
        let dangling: Vec<String> = self
            .models
            .iter()
            .map(|model| (model.name().to_string(), model.joints()))
            .chain(
                self.terrain_follow
                    .iter()
                    .map(|model| (model.name().to_string(), model.joints())),
            )
            .chain(
                self.collision
                    .iter()
                    .map(|model| (model.name().to_string(), model.joints())),
            )
            .flat_map(|(name, joints)| {
                joints
                    .into_iter()
                    .filter(|&index| index >= joint_count)
                    .map(move |index| format!("{} model is bound to missing joint {}", name, index))
            })
            .collect();
        for message in dangling {
            self.record_setup_error(message);
        }

        self.is_initted = self.setup_errors.is_empty();
        if self.is_initted {
            log::info!(
                "avatar {} ready: {} joints, {} motion models",
                self.name,
                self.joints.len(),
                self.models.len()
            );
        } else {
            log::error!(
                "avatar {} failed setup with {} error(s)",
                self.name,
                self.setup_errors.len()
            );
        }
        self.is_initted
    }

    pub fn is_initted(&self) -> bool {
        self.is_initted
    }

    /// Everything that went wrong while assembling the avatar.
    pub fn setup_errors(&self) -> &[String] {
        &self.setup_errors
    }

    // ========== Joints ==========

    pub fn joints(&self) -> &[Kinematics] {
        &self.joints
    }

    pub fn joint_index(&self, name: &str) -> Option<JointIndex> {
        self.joint_lookup.get(name).copied()
    }

    pub fn joint(&self, name: &str) -> Option<&Kinematics> {
        self.joints.get(self.joint_index(name)?)
    }

    pub fn joint_mut(&mut self, name: &str) -> Option<&mut Kinematics> {
        let index = self.joint_index(name)?;
        self.joints.get_mut(index)
    }

    pub fn joint_name(&self, index: JointIndex) -> Option<&str> {
        self.joint_names.get(index).map(String::as_str)
    }

    // ========== Frame ==========

    /// Steps the avatar by `dt` seconds, or by the measured frame interval if None.
    ///
    /// Every stage runs even if an earlier one failed; the first failure is
    /// returned. An uninitialised avatar does nothing.
    pub fn update(&mut self, scene: &mut Scene, dt: Option<f64>) -> Result<(), AvatarError> {
        if !self.is_initted {
            log::warn!("avatar {}: update skipped, setup is incomplete", self.name);
            return Err(AvatarError::NotInitialized(self.name.clone()));
        }

        let measured = self.clock.tick();
        let dt = dt.unwrap_or(measured);
        let mut first_error = None;

        {
            let mut ctx = MotionContext {
                joints: &mut self.joints,
                world: &*scene,
            };
            for model in &mut self.models {
                run_stage(&self.name, model.as_mut(), &mut ctx, dt, &mut first_error);
            }
            if let Some(terrain_follow) = &mut self.terrain_follow {
                run_stage(&self.name, terrain_follow, &mut ctx, dt, &mut first_error);
            }
            if let Some(collision) = &mut self.collision {
                run_stage(&self.name, collision, &mut ctx, dt, &mut first_error);
            }
        }

        for (index, joint) in self.joints.iter_mut().enumerate() {
            if let Err(source) = joint.update(scene, dt) {
                let name = self.joint_names.get(index).cloned().unwrap_or_default();
                log::error!("avatar {}: joint {}: {}", self.name, name, source);
                first_error.get_or_insert(AvatarError::Kinematics { joint: name, source });
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Re-captures every model's reference pose.
    pub fn reset(&mut self) {
        for model in &mut self.models {
            model.reset();
        }
        if let Some(terrain_follow) = &mut self.terrain_follow {
            terrain_follow.reset();
        }
        if let Some(collision) = &mut self.collision {
            collision.reset();
        }
    }

    // ========== Configuration ==========

    /// Builds an avatar from a configuration.
    ///
    /// Lookups that fail (scene nodes, joints, trackers) are recorded in
    /// [`Avatar::setup_errors`] and leave the avatar uninitialised; the rest of
    /// the configuration is still applied.
    pub fn from_config(
        config: &AvatarConfig,
        scene: &mut Scene,
        trackers: &TrackerRegistry,
    ) -> Self {
        let mut avatar = Avatar::new(config.name.clone());

        for joint in &config.joints {
            let Some(node) = scene.find_node_by_name(&joint.node) else {
                avatar.record_setup_error(format!(
                    "joint {}: scene node {} not found",
                    joint.name, joint.node
                ));
                continue;
            };
            if let Ok(index) = avatar.add_joint(joint.name.clone(), scene, node) {
                let kinematics = &mut avatar.joints[index];
                if !joint.inertia {
                    kinematics.disable_inertia();
                }
                kinematics.set_center_of_mass(Vector3::from(joint.center_of_mass));
            }
        }

        for model in &config.models {
            if let Some(model) = avatar.build_model(model, trackers) {
                avatar.add_motion_model(model);
            }
        }
        if let Some(terrain) = &config.terrain_follow {
            let model = avatar.build_terrain_follow(terrain);
            avatar.set_terrain_follow(model);
        }
        if let Some(collision) = &config.collision {
            let model = avatar.build_collision(collision);
            avatar.set_collision(model);
        }

        avatar.finish_setup();
        avatar
    }

    fn lookup_joint(&mut self, name: &str) -> Option<JointIndex> {
        let index = self.joint_index(name);
        if index.is_none() {
            self.record_setup_error(format!("joint {} not found", name));
        }
        index
    }

    fn lookup_tracker(
        &mut self,
        trackers: &TrackerRegistry,
        name: &str,
    ) -> Option<Rc<dyn MotionTracker>> {
        let tracker = trackers.get(name);
        if tracker.is_none() {
            self.record_setup_error(format!("tracker {} not found", name));
        }
        tracker
    }

    fn build_model(
        &mut self,
        config: &MotionModelConfig,
        trackers: &TrackerRegistry,
    ) -> Option<Box<dyn MotionModel>> {
        match config {
            MotionModelConfig::Tracked(c) => {
                let joint = self.lookup_joint(&c.joint);
                let tracker = self.lookup_tracker(trackers, &c.tracker);
                let mut model = TrackedMotion::new(tracker?, joint?);
                model.enable_position(c.position);
                model.enable_orientation(c.orientation);
                model.set_position_offset(Vector3::from(c.position_offset));
                if let Some(offset) = c.orientation_offset {
                    model.set_orientation_offset(offset.to_quaternion());
                }
                model.set_position_scale(c.scale);
                Some(Box::new(model))
            }
            MotionModelConfig::Head(c) => {
                let joint = self.lookup_joint(&c.joint);
                let back = self.lookup_tracker(trackers, &c.back_tracker);
                let head = self.lookup_tracker(trackers, &c.head_tracker);
                Some(Box::new(HeadMotion::new(back?, head?, joint?)))
            }
            MotionModelConfig::ThreeTrackerArm(c) => {
                let shoulder = self.lookup_joint(&c.shoulder);
                let elbow = self.lookup_joint(&c.elbow);
                let wrist = self.lookup_joint(&c.wrist);
                let back = self.lookup_tracker(trackers, &c.back_tracker);
                let elbow_tracker = self.lookup_tracker(trackers, &c.elbow_tracker);
                let hand = self.lookup_tracker(trackers, &c.hand_tracker);
                Some(Box::new(ThreeTrackerArm::new(
                    ArmTrackers {
                        back: back?,
                        elbow: elbow_tracker?,
                        hand: hand?,
                    },
                    ArmJoints {
                        shoulder: shoulder?,
                        elbow: elbow?,
                        wrist: wrist?,
                    },
                    c.calibration.into(),
                )))
            }
        }
    }

    fn build_terrain_follow(&mut self, config: &TerrainFollowConfig) -> Option<TerrainFollow> {
        let joint = self.lookup_joint(&config.joint)?;
        Some(
            TerrainFollow::new(joint)
                .with_base_offset(Vector3::from(config.base_offset))
                .with_step_height(config.step_height)
                .with_float_height(config.float_height)
                .with_search_depth(config.search_depth)
                .with_mask(IntersectMask::from_bits_retain(config.mask)),
        )
    }

    fn build_collision(&mut self, config: &CollisionConfig) -> Option<CollisionMotion> {
        let joint = self.lookup_joint(&config.joint)?;
        Some(
            CollisionMotion::new(joint)
                .with_offsets(config.offsets.iter().copied().map(Vector3::from).collect())
                .with_margin(config.margin)
                .with_mode(config.mode)
                .with_mask(IntersectMask::from_bits_retain(config.mask)),
        )
    }
}

/// Runs one motion model, logging a failure and keeping the first one.
fn run_stage(
    avatar: &str,
    model: &mut dyn MotionModel,
    ctx: &mut MotionContext<'_>,
    dt: f64,
    first_error: &mut Option<AvatarError>,
) {
    if let Err(source) = model.update(ctx, dt) {
        log::error!("avatar {}: {} model: {}", avatar, model.name(), source);
        first_error.get_or_insert(AvatarError::Motion {
            model: model.name().to_string(),
            source,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::EPSILON;
    use crate::scene::Geometry;
    use crate::tracker::SharedTracker;
    use cgmath::InnerSpace;

    fn scene_with_body() -> (Scene, NodeId) {
        let mut scene = Scene::new();
        let world = scene.add_component(None, Some("world")).unwrap();
        scene
            .add_geometry(Some(world), Some("ground"), Geometry::ground_plane(100.0, 0.0))
            .unwrap();
        let body = scene.add_component(None, Some("body")).unwrap();
        (scene, body)
    }

    #[test]
    fn test_tracked_avatar_moves_relative_to_reset() {
        let (mut scene, body) = scene_with_body();
        let tracker = SharedTracker::new();
        let mut avatar = Avatar::new("user");
        let joint = avatar.add_joint("body", &mut scene, body).unwrap();
        avatar.add_motion_model(Box::new(TrackedMotion::new(Rc::new(tracker.clone()), joint)));
        assert!(avatar.finish_setup());

        tracker.set_position(Vector3::new(1.0, 2.0, 3.0));
        avatar.reset();
        tracker.set_position(Vector3::new(1.0, 2.0, 4.0));
        avatar.update(&mut scene, Some(0.016)).unwrap();

        let position = avatar.joint("body").unwrap().position();
        assert!((position - Vector3::new(0.0, 0.0, 1.0)).magnitude() < EPSILON);
        // Committed to the scene in the same frame
        let world = scene.global_transform(body).unwrap();
        assert!((world.w.z - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_terrain_corrects_tracked_pose_before_commit() {
        let (mut scene, body) = scene_with_body();
        let tracker = SharedTracker::new();
        let mut avatar = Avatar::new("user");
        let joint = avatar.add_joint("body", &mut scene, body).unwrap();
        avatar.add_motion_model(Box::new(TrackedMotion::new(Rc::new(tracker.clone()), joint)));
        avatar.set_terrain_follow(Some(TerrainFollow::new(joint).with_step_height(10.0)));
        assert!(avatar.finish_setup());

        tracker.set_position(Vector3::new(0.5, -0.25, 5.0));
        avatar.update(&mut scene, Some(0.016)).unwrap();

        let world = scene.global_transform(body).unwrap();
        assert!((world.w.z - crate::motion::DEFAULT_FLOAT_HEIGHT).abs() < EPSILON);
        assert!((world.w.x - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_walk_off_ledge_with_terrain_and_collision() {
        let (mut scene, body) = scene_with_body();
        scene
            .add_geometry(
                None,
                Some("ledge"),
                Geometry::axis_box(
                    cgmath::Point3::new(-4.0, -3.0, -1.0),
                    cgmath::Point3::new(0.0, 3.0, 1.0),
                ),
            )
            .unwrap();
        let tracker = SharedTracker::new();
        let mut avatar = Avatar::new("user");
        let joint = avatar.add_joint("body", &mut scene, body).unwrap();
        avatar.add_motion_model(Box::new(TrackedMotion::new(Rc::new(tracker.clone()), joint)));
        avatar.set_terrain_follow(Some(TerrainFollow::new(joint)));
        avatar.set_collision(Some(CollisionMotion::new(joint)));
        assert!(avatar.finish_setup());

        for x in [-1.0, -0.6, -0.2, 0.2, 0.6, 1.0] {
            tracker.set_position(Vector3::new(x, 0.3, 1.0));
            avatar.update(&mut scene, Some(0.1)).unwrap();

            let world = scene.global_transform(body).unwrap();
            let ground = if x <= 0.0 { 1.0 } else { 0.0 };
            assert!((world.w.x - x).abs() < EPSILON, "stalled at x = {}", world.w.x);
            assert!((world.w.z - ground - crate::motion::DEFAULT_FLOAT_HEIGHT).abs() < EPSILON);
        }
    }

    #[test]
    fn test_update_requires_setup() {
        let (mut scene, body) = scene_with_body();
        let mut avatar = Avatar::new("user");
        avatar.add_joint("body", &mut scene, body).unwrap();

        assert_eq!(
            avatar.update(&mut scene, Some(0.1)),
            Err(AvatarError::NotInitialized("user".to_string()))
        );
    }

    #[test]
    fn test_dangling_model_fails_setup() {
        let (mut scene, body) = scene_with_body();
        let mut avatar = Avatar::new("user");
        avatar.add_joint("body", &mut scene, body).unwrap();
        avatar.add_motion_model(Box::new(TrackedMotion::new(Rc::new(SharedTracker::new()), 3)));

        assert!(!avatar.finish_setup());
        assert_eq!(avatar.setup_errors().len(), 1);
        assert!(avatar.update(&mut scene, Some(0.1)).is_err());
    }

    #[test]
    fn test_from_config_reports_missing_pieces() {
        let (mut scene, _) = scene_with_body();
        let mut trackers = TrackerRegistry::new();
        trackers.register_shared("hmd");
        let config = AvatarConfig::from_json_str(
            r#"{
                "name": "broken",
                "joints": [
                    { "name": "body", "node": "body" },
                    { "name": "head", "node": "no-such-node" }
                ],
                "models": [
                    { "type": "tracked", "joint": "body", "tracker": "hmd" },
                    { "type": "head", "joint": "head", "back_tracker": "hmd", "head_tracker": "wand" }
                ]
            }"#,
        )
        .unwrap();

        let avatar = Avatar::from_config(&config, &mut scene, &trackers);

        assert!(!avatar.is_initted());
        let errors = avatar.setup_errors().join("\n");
        assert!(errors.contains("no-such-node"));
        assert!(errors.contains("joint head not found"));
        assert!(errors.contains("tracker wand not found"));
        assert!(avatar.joint("body").is_some());
    }

    #[test]
    fn test_from_config_end_to_end() {
        let (mut scene, body) = scene_with_body();
        let mut trackers = TrackerRegistry::new();
        let hmd = trackers.register_shared("hmd");
        let config = AvatarConfig::from_json_str(
            r#"{
                "name": "walker",
                "joints": [{ "name": "body", "node": "body" }],
                "models": [{ "type": "tracked", "joint": "body", "tracker": "hmd", "orientation": false }],
                "terrain_follow": { "joint": "body", "step_height": 10.0, "float_height": 0.5 },
                "collision": { "joint": "body" }
            }"#,
        )
        .unwrap();

        let mut avatar = Avatar::from_config(&config, &mut scene, &trackers);
        assert!(avatar.is_initted(), "{:?}", avatar.setup_errors());

        hmd.set_position(Vector3::new(2.0, 3.0, 4.0));
        avatar.update(&mut scene, Some(0.02)).unwrap();

        let world = scene.global_transform(body).unwrap();
        assert!((world.w.truncate() - Vector3::new(2.0, 3.0, 0.5)).magnitude() < EPSILON);
    }
}
