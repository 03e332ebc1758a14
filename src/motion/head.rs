use std::rc::Rc;

use cgmath::{InnerSpace, Quaternion};

use super::{JointIndex, MotionContext, MotionError, MotionModel};
use crate::tracker::MotionTracker;

/// Orients a head joint from a head tracker, relative to a back tracker.
///
/// Only orientation is written; the head's position follows the skeleton.
pub struct HeadMotion {
    back: Rc<dyn MotionTracker>,
    head: Rc<dyn MotionTracker>,
    joint: JointIndex,
    reset_orientation: Quaternion<f32>,
}

impl HeadMotion {
    pub fn new(
        back: Rc<dyn MotionTracker>,
        head: Rc<dyn MotionTracker>,
        joint: JointIndex,
    ) -> Self {
        Self {
            back,
            head,
            joint,
            reset_orientation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
        }
    }

    fn relative_orientation(&self) -> Quaternion<f32> {
        let back = self.back.orientation_quat().normalize();
        let head = self.head.orientation_quat().normalize();
        back.conjugate() * head
    }
}

impl MotionModel for HeadMotion {
    fn name(&self) -> &str {
        "head"
    }

    fn joints(&self) -> Vec<JointIndex> {
        vec![self.joint]
    }

    fn update(&mut self, ctx: &mut MotionContext<'_>, _dt: f64) -> Result<(), MotionError> {
        let orientation = self.reset_orientation * self.relative_orientation();
        ctx.joint_mut(self.joint)?.set_orientation(orientation);
        Ok(())
    }

    fn reset(&mut self) {
        self.reset_orientation = self.relative_orientation().conjugate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::axis_angle_deg;
    use crate::test_support::quat_approx_eq;
    use crate::kinematics::Kinematics;
    use crate::scene::Scene;
    use crate::tracker::SharedTracker;
    use cgmath::Vector3;

    #[test]
    fn test_head_turn_relative_to_body() {
        let mut scene = Scene::new();
        let node = scene.add_component(None, Some("head")).unwrap();
        let mut joints = vec![Kinematics::new(&mut scene, node).unwrap()];
        let back = SharedTracker::new();
        let head = SharedTracker::new();
        let mut model = HeadMotion::new(Rc::new(back.clone()), Rc::new(head.clone()), 0);

        // Whole body turned: the head is still facing forward
        let body_turn = axis_angle_deg(Vector3::unit_z(), 60.0);
        back.set_orientation(body_turn);
        head.set_orientation(body_turn);
        let mut ctx = MotionContext {
            joints: &mut joints,
            world: &scene,
        };
        model.update(&mut ctx, 0.0).unwrap();
        assert!(quat_approx_eq(
            joints[0].orientation(),
            Quaternion::new(1.0, 0.0, 0.0, 0.0),
            1e-5
        ));

        // Head turned a further 20 degrees
        head.set_orientation(axis_angle_deg(Vector3::unit_z(), 80.0));
        let mut ctx = MotionContext {
            joints: &mut joints,
            world: &scene,
        };
        model.update(&mut ctx, 0.0).unwrap();
        assert!(quat_approx_eq(
            joints[0].orientation(),
            axis_angle_deg(Vector3::unit_z(), 20.0),
            1e-5
        ));
    }

    #[test]
    fn test_reset_captures_current_offset() {
        let mut scene = Scene::new();
        let node = scene.add_component(None, None).unwrap();
        let mut joints = vec![Kinematics::new(&mut scene, node).unwrap()];
        let back = SharedTracker::new();
        let head = SharedTracker::new();
        let mut model = HeadMotion::new(Rc::new(back.clone()), Rc::new(head.clone()), 0);

        // Tracker mounted crooked
        head.set_orientation(axis_angle_deg(Vector3::unit_x(), 15.0));
        model.reset();

        let mut ctx = MotionContext {
            joints: &mut joints,
            world: &scene,
        };
        model.update(&mut ctx, 0.0).unwrap();
        assert!(quat_approx_eq(
            joints[0].orientation(),
            Quaternion::new(1.0, 0.0, 0.0, 0.0),
            1e-5
        ));
    }
}
