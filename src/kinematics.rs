//! Per-node position, orientation and velocity state.
//!
//! A [`Kinematics`] drives the dynamic matrix of one node's Transform attribute.
//! Motion models write the pose directly during a frame; [`Kinematics::update`]
//! then integrates velocity and commits the result to the scene. Anything that
//! writes the pose after `update` in the same frame only shows up a frame later.

use cgmath::{InnerSpace, Matrix4, Quaternion, Vector3, Zero};
use thiserror::Error;

use crate::common::{axis_angle_deg, compose_rotation, decompose_rigid, rigid_transform};
use crate::frame_clock::FrameClock;
use crate::scene::{AttachError, AttributeData, AttributeId, NodeId, Scene, TransformAttribute};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KinematicsError {
    #[error("node {0} does not exist")]
    MissingNode(NodeId),

    #[error("cannot bind a transform to node {node}: {source}")]
    Bind {
        node: NodeId,
        #[source]
        source: AttachError,
    },

    #[error("transform attribute of node {0} no longer exists")]
    TransformLost(NodeId),
}

#[derive(Debug, Clone)]
pub struct Kinematics {
    node: NodeId,
    transform: AttributeId,

    position: Vector3<f32>,
    orientation: Quaternion<f32>,
    velocity: Vector3<f32>,
    angular_axis: Vector3<f32>,
    /// Degrees per second about `angular_axis`
    angular_speed: f32,

    center_of_mass: Vector3<f32>,
    inertia: bool,
}

impl Kinematics {
    /// Binds to `node`'s Transform attribute, creating and attaching one if needed.
    ///
    /// The initial pose is read from the attribute's dynamic matrix.
    pub fn new(scene: &mut Scene, node: NodeId) -> Result<Self, KinematicsError> {
        if scene.get_node(node).is_none() {
            log::warn!("kinematics: node {} does not exist", node);
            return Err(KinematicsError::MissingNode(node));
        }

        let transform = match scene.transform_attribute(node) {
            Some(id) => id,
            None => scene
                .attach_new_transform(node, TransformAttribute::new())
                .map_err(|source| KinematicsError::Bind { node, source })?,
        };

        let dynamic = match scene.attribute(transform).map(|attribute| attribute.data()) {
            Some(AttributeData::Transform(t)) => t.dynamic(),
            _ => return Err(KinematicsError::TransformLost(node)),
        };
        let (position, orientation) = decompose_rigid(&dynamic);

        Ok(Self {
            node,
            transform,
            position,
            orientation,
            velocity: Vector3::zero(),
            angular_axis: Vector3::unit_z(),
            angular_speed: 0.0,
            center_of_mass: Vector3::zero(),
            inertia: true,
        })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn transform_attribute(&self) -> AttributeId {
        self.transform
    }

    // ========== Pose ==========

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn set_position(&mut self, position: Vector3<f32>) {
        self.position = position;
    }

    /// Adds a correction to the current position.
    pub fn modify_position(&mut self, delta: Vector3<f32>) {
        self.position += delta;
    }

    pub fn orientation(&self) -> Quaternion<f32> {
        self.orientation
    }

    pub fn set_orientation(&mut self, orientation: Quaternion<f32>) {
        self.orientation = orientation.normalize();
    }

    /// Applies `rotation` in the object's own frame (orientation * rotation).
    pub fn pre_modify_orientation(&mut self, rotation: Quaternion<f32>) {
        self.orientation = (self.orientation * rotation).normalize();
    }

    /// Applies `rotation` in the parent frame (rotation * orientation).
    pub fn post_modify_orientation(&mut self, rotation: Quaternion<f32>) {
        self.orientation = compose_rotation(self.orientation, rotation).normalize();
    }

    // ========== Velocity ==========

    pub fn velocity(&self) -> Vector3<f32> {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: Vector3<f32>) {
        self.velocity = velocity;
    }

    pub fn modify_velocity(&mut self, delta: Vector3<f32>) {
        self.velocity += delta;
    }

    /// Rotation axis and rate in degrees per second.
    pub fn angular_velocity(&self) -> (Vector3<f32>, f32) {
        (self.angular_axis, self.angular_speed)
    }

    pub fn set_angular_velocity(&mut self, axis: Vector3<f32>, degrees_per_second: f32) {
        if axis.magnitude2() == 0.0 {
            self.angular_speed = 0.0;
            return;
        }
        self.angular_axis = axis.normalize();
        self.angular_speed = degrees_per_second;
    }

    pub fn center_of_mass(&self) -> Vector3<f32> {
        self.center_of_mass
    }

    /// Sets the point, in the node's local frame, that the object rotates about.
    pub fn set_center_of_mass(&mut self, center: Vector3<f32>) {
        self.center_of_mass = center;
    }

    pub fn has_inertia(&self) -> bool {
        self.inertia
    }

    /// Velocities persist across updates. This is the default.
    pub fn enable_inertia(&mut self) {
        self.inertia = true;
    }

    /// Velocities are cleared after every update, for joints whose pose is
    /// written directly each frame.
    pub fn disable_inertia(&mut self) {
        self.inertia = false;
    }

    // ========== Integration ==========

    /// The dynamic matrix committed to the Transform attribute.
    pub fn pose_matrix(&self) -> Matrix4<f32> {
        rigid_transform(self.position, self.orientation)
            * Matrix4::from_translation(-self.center_of_mass)
    }

    /// Integrates velocity over `dt` seconds and commits the pose to the scene.
    pub fn update(&mut self, scene: &mut Scene, dt: f64) -> Result<(), KinematicsError> {
        let dt = dt as f32;

        self.position += self.velocity * dt;
        if self.angular_speed != 0.0 {
            let spin = axis_angle_deg(self.angular_axis, self.angular_speed * dt);
            self.orientation = compose_rotation(self.orientation, spin).normalize();
        }

        if !self.inertia {
            self.velocity = Vector3::zero();
            self.angular_speed = 0.0;
        }

        self.commit(scene)
    }

    /// [`Kinematics::update`] with the clock's last measured frame interval.
    pub fn update_with_clock(
        &mut self,
        scene: &mut Scene,
        clock: &FrameClock,
    ) -> Result<(), KinematicsError> {
        self.update(scene, clock.interval())
    }

    /// Writes the current pose to the Transform attribute without integrating.
    pub fn commit(&self, scene: &mut Scene) -> Result<(), KinematicsError> {
        let matrix = self.pose_matrix();
        scene
            .modify_attribute(self.transform, |data| {
                if let AttributeData::Transform(transform) = data {
                    transform.set_dynamic(matrix);
                }
            })
            .map_err(|e| {
                log::error!("kinematics of node {}: {}", self.node, e);
                KinematicsError::TransformLost(self.node)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::EPSILON;
    use crate::test_support::quat_approx_eq;
    use cgmath::{Rotation, SquareMatrix};
    use proptest::prelude::*;

    fn scene_with_node() -> (Scene, NodeId) {
        let mut scene = Scene::new();
        let node = scene.add_component(None, Some("body")).unwrap();
        (scene, node)
    }

    #[test]
    fn test_new_attaches_transform() {
        let (mut scene, node) = scene_with_node();
        let kin = Kinematics::new(&mut scene, node).unwrap();

        assert_eq!(scene.transform_attribute(node), Some(kin.transform_attribute()));
        assert_eq!(kin.position(), Vector3::zero());
    }

    #[test]
    fn test_new_reads_existing_pose() {
        let (mut scene, node) = scene_with_node();
        let pose = rigid_transform(
            Vector3::new(1.0, 2.0, 3.0),
            axis_angle_deg(Vector3::unit_z(), 90.0),
        );
        let existing = scene
            .attach_new_transform(node, TransformAttribute::from_dynamic(pose))
            .unwrap();

        let kin = Kinematics::new(&mut scene, node).unwrap();
        assert_eq!(kin.transform_attribute(), existing);
        assert!((kin.position() - Vector3::new(1.0, 2.0, 3.0)).magnitude() < EPSILON);
        assert!(quat_approx_eq(
            kin.orientation(),
            axis_angle_deg(Vector3::unit_z(), 90.0),
            1e-4
        ));
    }

    #[test]
    fn test_new_on_missing_node() {
        let mut scene = Scene::new();
        assert_eq!(
            Kinematics::new(&mut scene, 3).unwrap_err(),
            KinematicsError::MissingNode(3)
        );
    }

    #[test]
    fn test_update_commits_to_scene() {
        let (mut scene, node) = scene_with_node();
        let mut kin = Kinematics::new(&mut scene, node).unwrap();
        kin.set_position(Vector3::new(0.0, 0.0, 2.0));
        kin.update(&mut scene, 0.0).unwrap();

        let world = scene.global_transform(node).unwrap();
        assert!((world.w.z - 2.0).abs() < EPSILON);
    }

    #[test]
    fn test_velocity_persists_by_default() {
        let (mut scene, node) = scene_with_node();
        let mut kin = Kinematics::new(&mut scene, node).unwrap();
        assert!(kin.has_inertia());

        kin.set_velocity(Vector3::new(2.0, 0.0, 0.0));
        kin.update(&mut scene, 0.5).unwrap();
        kin.update(&mut scene, 0.5).unwrap();

        assert!((kin.position().x - 2.0).abs() < EPSILON);
        assert_eq!(kin.velocity(), Vector3::new(2.0, 0.0, 0.0));
        let world = scene.global_transform(node).unwrap();
        assert!((world.w.x - 2.0).abs() < EPSILON);
    }

    #[test]
    fn test_disabled_inertia_clears_velocity() {
        let (mut scene, node) = scene_with_node();
        let mut kin = Kinematics::new(&mut scene, node).unwrap();
        kin.disable_inertia();

        kin.set_velocity(Vector3::new(1.0, 0.0, 0.0));
        kin.set_angular_velocity(Vector3::unit_z(), 30.0);
        kin.update(&mut scene, 1.0).unwrap();
        kin.update(&mut scene, 1.0).unwrap();

        assert!((kin.position().x - 1.0).abs() < EPSILON);
        assert_eq!(kin.velocity(), Vector3::zero());
        assert_eq!(kin.angular_velocity().1, 0.0);
    }

    #[test]
    fn test_angular_velocity_rotates() {
        let (mut scene, node) = scene_with_node();
        let mut kin = Kinematics::new(&mut scene, node).unwrap();
        kin.set_angular_velocity(Vector3::unit_z(), 45.0);

        kin.update(&mut scene, 1.0).unwrap();
        kin.update(&mut scene, 1.0).unwrap();

        let forward = kin.orientation().rotate_vector(Vector3::unit_x());
        assert!((forward - Vector3::unit_y()).magnitude() < 1e-4);
    }

    #[test]
    fn test_orientation_modifiers() {
        let (mut scene, node) = scene_with_node();
        let mut kin = Kinematics::new(&mut scene, node).unwrap();
        let yaw = axis_angle_deg(Vector3::unit_z(), 90.0);
        let roll = axis_angle_deg(Vector3::unit_x(), 90.0);

        kin.set_orientation(yaw);
        kin.pre_modify_orientation(roll);
        assert!(quat_approx_eq(kin.orientation(), yaw * roll, 1e-5));

        kin.set_orientation(yaw);
        kin.post_modify_orientation(roll);
        assert!(quat_approx_eq(kin.orientation(), roll * yaw, 1e-5));
    }

    #[test]
    fn test_center_of_mass_rotation() {
        let (mut scene, node) = scene_with_node();
        let mut kin = Kinematics::new(&mut scene, node).unwrap();
        kin.set_center_of_mass(Vector3::new(1.0, 0.0, 0.0));
        kin.set_position(Vector3::new(1.0, 0.0, 0.0));
        kin.set_orientation(axis_angle_deg(Vector3::unit_z(), 180.0));
        kin.commit(&mut scene).unwrap();

        // The centre of mass stays put; the local origin swings around it
        let world = scene.global_transform(node).unwrap();
        let origin = world * Vector3::zero().extend(1.0);
        assert!((origin.truncate() - Vector3::new(2.0, 0.0, 0.0)).magnitude() < 1e-4);
    }

    #[test]
    fn test_commit_after_transform_deleted() {
        let (mut scene, node) = scene_with_node();
        let kin = Kinematics::new(&mut scene, node).unwrap();
        scene.delete_attribute(kin.transform_attribute());

        assert_eq!(kin.commit(&mut scene), Err(KinematicsError::TransformLost(node)));
        assert_eq!(scene.global_transform(node), Some(Matrix4::identity()));
    }

    proptest! {
        #[test]
        fn prop_integration_is_linear(
            vx in -10.0f32..10.0,
            vy in -10.0f32..10.0,
            vz in -10.0f32..10.0,
            dt1 in 0.0f64..2.0,
            dt2 in 0.0f64..2.0,
        ) {
            let velocity = Vector3::new(vx, vy, vz);
            let (mut scene, node) = scene_with_node();
            let mut split = Kinematics::new(&mut scene, node).unwrap();
            let mut whole = split.clone();
            split.set_velocity(velocity);
            whole.set_velocity(velocity);

            split.update(&mut scene, dt1).unwrap();
            split.update(&mut scene, dt2).unwrap();
            whole.update(&mut scene, dt1 + dt2).unwrap();

            prop_assert!((split.position() - whole.position()).magnitude() < 1e-3);
        }
    }
}
