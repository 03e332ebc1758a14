use std::rc::Rc;

use cgmath::{InnerSpace, Quaternion, Vector3, Zero};

use super::{JointIndex, MotionContext, MotionError, MotionModel};
use crate::tracker::MotionTracker;

/// Copies one tracker's pose onto a joint, relative to the pose captured at reset.
///
/// Position: `(sample + reset_offset + position_offset) * scale`.
/// Orientation: `reset_offset * sample * orientation_offset`.
pub struct TrackedMotion {
    tracker: Rc<dyn MotionTracker>,
    joint: JointIndex,

    position_enabled: bool,
    orientation_enabled: bool,

    reset_position: Vector3<f32>,
    reset_orientation: Quaternion<f32>,

    position_offset: Vector3<f32>,
    orientation_offset: Quaternion<f32>,
    position_scale: f32,
}

impl TrackedMotion {
    pub fn new(tracker: Rc<dyn MotionTracker>, joint: JointIndex) -> Self {
        Self {
            tracker,
            joint,
            position_enabled: true,
            orientation_enabled: true,
            reset_position: Vector3::zero(),
            reset_orientation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
            position_offset: Vector3::zero(),
            orientation_offset: Quaternion::new(1.0, 0.0, 0.0, 0.0),
            position_scale: 1.0,
        }
    }

    pub fn enable_position(&mut self, enabled: bool) {
        self.position_enabled = enabled;
    }

    pub fn enable_orientation(&mut self, enabled: bool) {
        self.orientation_enabled = enabled;
    }

    pub fn set_position_offset(&mut self, offset: Vector3<f32>) {
        self.position_offset = offset;
    }

    pub fn set_orientation_offset(&mut self, offset: Quaternion<f32>) {
        self.orientation_offset = offset.normalize();
    }

    pub fn set_position_scale(&mut self, scale: f32) {
        self.position_scale = scale;
    }
}

impl MotionModel for TrackedMotion {
    fn name(&self) -> &str {
        "tracked"
    }

    fn joints(&self) -> Vec<JointIndex> {
        vec![self.joint]
    }

    fn update(&mut self, ctx: &mut MotionContext<'_>, _dt: f64) -> Result<(), MotionError> {
        let joint = ctx.joint_mut(self.joint)?;

        if self.position_enabled {
            let raw = self.tracker.position_vec();
            let relative = raw + self.reset_position + self.position_offset;
            joint.set_position(relative * self.position_scale);
        }
        if self.orientation_enabled {
            let raw = self.tracker.orientation_quat();
            joint.set_orientation(self.reset_orientation * raw * self.orientation_offset);
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.reset_position = -self.tracker.position_vec();
        self.reset_orientation = self.tracker.orientation_quat().normalize().conjugate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{axis_angle_deg, EPSILON};
    use crate::test_support::quat_approx_eq;
    use crate::kinematics::Kinematics;
    use crate::scene::Scene;
    use crate::tracker::SharedTracker;

    fn setup() -> (Scene, Vec<Kinematics>, SharedTracker) {
        let mut scene = Scene::new();
        let node = scene.add_component(None, Some("hand")).unwrap();
        let joints = vec![Kinematics::new(&mut scene, node).unwrap()];
        (scene, joints, SharedTracker::new())
    }

    #[test]
    fn test_motion_is_relative_to_reset() {
        let (scene, mut joints, tracker) = setup();
        let mut model = TrackedMotion::new(Rc::new(tracker.clone()), 0);

        tracker.set_position(Vector3::new(1.0, 2.0, 3.0));
        model.reset();
        tracker.set_position(Vector3::new(1.0, 2.0, 4.0));

        let mut ctx = MotionContext {
            joints: &mut joints,
            world: &scene,
        };
        model.update(&mut ctx, 0.0).unwrap();
        assert!((joints[0].position() - Vector3::new(0.0, 0.0, 1.0)).magnitude() < EPSILON);
    }

    #[test]
    fn test_offset_scale_and_orientation() {
        let (scene, mut joints, tracker) = setup();
        let mut model = TrackedMotion::new(Rc::new(tracker.clone()), 0);
        model.set_position_offset(Vector3::new(1.0, 0.0, 0.0));
        model.set_position_scale(2.0);
        model.set_orientation_offset(axis_angle_deg(Vector3::unit_x(), 90.0));

        let yaw = axis_angle_deg(Vector3::unit_z(), 30.0);
        tracker.set_position(Vector3::new(0.0, 1.0, 0.0));
        tracker.set_orientation(yaw);

        let mut ctx = MotionContext {
            joints: &mut joints,
            world: &scene,
        };
        model.update(&mut ctx, 0.0).unwrap();

        assert!((joints[0].position() - Vector3::new(2.0, 2.0, 0.0)).magnitude() < EPSILON);
        assert!(quat_approx_eq(
            joints[0].orientation(),
            yaw * axis_angle_deg(Vector3::unit_x(), 90.0),
            1e-5
        ));
    }

    #[test]
    fn test_disabled_channels_are_untouched() {
        let (scene, mut joints, tracker) = setup();
        let mut model = TrackedMotion::new(Rc::new(tracker.clone()), 0);
        model.enable_position(false);
        tracker.set_position(Vector3::new(5.0, 5.0, 5.0));
        tracker.set_orientation(axis_angle_deg(Vector3::unit_z(), 45.0));

        let mut ctx = MotionContext {
            joints: &mut joints,
            world: &scene,
        };
        model.update(&mut ctx, 0.0).unwrap();

        assert_eq!(joints[0].position(), Vector3::zero());
        assert!(quat_approx_eq(
            joints[0].orientation(),
            axis_angle_deg(Vector3::unit_z(), 45.0),
            1e-5
        ));
    }

    #[test]
    fn test_missing_joint() {
        let (scene, mut joints, tracker) = setup();
        let mut model = TrackedMotion::new(Rc::new(tracker), 4);
        let mut ctx = MotionContext {
            joints: &mut joints,
            world: &scene,
        };
        assert_eq!(model.update(&mut ctx, 0.0), Err(MotionError::MissingJoint(4)));
    }
}
