//! Three-tracker arm: shoulder, elbow and wrist orientations from trackers on
//! the back, the elbow and the hand.
//!
//! This is a two-vector heuristic rather than a general IK solver. It is exact
//! for a fixed upper-arm/forearm/hand chain and stays continuous (but not
//! anatomically bounded) outside the normal range of motion.

use std::rc::Rc;

use cgmath::{InnerSpace, Quaternion, Rotation, Vector3, Zero};

use super::{JointIndex, MotionContext, MotionError, MotionModel};
use crate::common::{angle_between_deg, axis_angle_deg, vecs_rotation};
use crate::tracker::MotionTracker;

/// Direction of the hanging upper arm in the shoulder's rest frame.
const REST_ARM_DIRECTION: Vector3<f32> = Vector3::new(0.0, 0.0, -1.0);

/// Direction the forearm swings toward when the elbow flexes from rest.
const REST_FLEX_DIRECTION: Vector3<f32> = Vector3::new(0.0, 1.0, 0.0);

/// A fixed corrective rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correction {
    pub axis: Vector3<f32>,
    pub degrees: f32,
}

impl Correction {
    pub fn none() -> Self {
        Self {
            axis: Vector3::unit_x(),
            degrees: 0.0,
        }
    }

    pub fn rotation(&self) -> Quaternion<f32> {
        axis_angle_deg(self.axis, self.degrees)
    }
}

/// Rig-specific constants for [`ThreeTrackerArm`].
///
/// Offsets run from each tracker to its joint and are expressed in the tracker's
/// own frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmCalibration {
    pub shoulder_offset: Vector3<f32>,
    pub elbow_offset: Vector3<f32>,
    pub wrist_offset: Vector3<f32>,
    /// Elbow flexion axis in the upper arm's frame
    pub elbow_axis: Vector3<f32>,
    /// Adjusts the solved shoulder to the avatar's rest pose
    pub shoulder_correction: Correction,
    /// Compensates for how the hand tracker is mounted
    pub wrist_correction: Correction,
}

impl Default for ArmCalibration {
    fn default() -> Self {
        Self {
            shoulder_offset: Vector3::zero(),
            elbow_offset: Vector3::zero(),
            wrist_offset: Vector3::zero(),
            elbow_axis: Vector3::unit_x(),
            shoulder_correction: Correction {
                axis: Vector3::unit_y(),
                degrees: 10.0,
            },
            wrist_correction: Correction {
                axis: Vector3::unit_x(),
                degrees: 10.0,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmJoints {
    pub shoulder: JointIndex,
    pub elbow: JointIndex,
    pub wrist: JointIndex,
}

pub struct ArmTrackers {
    pub back: Rc<dyn MotionTracker>,
    pub elbow: Rc<dyn MotionTracker>,
    pub hand: Rc<dyn MotionTracker>,
}

/// Joint orientations produced by one solve.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ArmPose {
    shoulder: Quaternion<f32>,
    elbow: Quaternion<f32>,
    wrist: Quaternion<f32>,
}

pub struct ThreeTrackerArm {
    trackers: ArmTrackers,
    joints: ArmJoints,
    calibration: ArmCalibration,
}

impl ThreeTrackerArm {
    pub fn new(trackers: ArmTrackers, joints: ArmJoints, calibration: ArmCalibration) -> Self {
        Self {
            trackers,
            joints,
            calibration,
        }
    }

    pub fn calibration(&self) -> &ArmCalibration {
        &self.calibration
    }

    pub fn set_calibration(&mut self, calibration: ArmCalibration) {
        self.calibration = calibration;
    }

    /// Joint location implied by a tracker and its calibration offset.
    fn joint_point(tracker: &dyn MotionTracker, offset: Vector3<f32>) -> Vector3<f32> {
        let orientation = tracker.orientation_quat().normalize();
        tracker.position_vec() + orientation.rotate_vector(offset)
    }

    fn solve(&self) -> ArmPose {
        let cal = &self.calibration;
        let back_orientation = self.trackers.back.orientation_quat().normalize();
        let hand_orientation = self.trackers.hand.orientation_quat().normalize();

        let shoulder_point = Self::joint_point(&*self.trackers.back, cal.shoulder_offset);
        let elbow_point = Self::joint_point(&*self.trackers.elbow, cal.elbow_offset);
        let wrist_point = Self::joint_point(&*self.trackers.hand, cal.wrist_offset);

        // Segment directions in the torso frame. The elbow tracker's orientation
        // is unreliable, so the forearm direction stands in for the arm's "up".
        let to_torso = back_orientation.conjugate();
        let upper_arm = to_torso.rotate_vector(elbow_point - shoulder_point);
        let forearm = to_torso.rotate_vector(wrist_point - elbow_point);

        let shoulder = vecs_rotation(REST_ARM_DIRECTION, REST_FLEX_DIRECTION, upper_arm, forearm)
            * cal.shoulder_correction.rotation();

        let flexion = angle_between_deg(upper_arm, forearm);
        let elbow = axis_angle_deg(cal.elbow_axis, flexion);

        // The hand's rest pair carried into the forearm's frame
        let to_forearm = (back_orientation * shoulder * elbow).conjugate();
        let hand_pointing =
            to_forearm.rotate_vector(hand_orientation.rotate_vector(REST_ARM_DIRECTION));
        let hand_flex =
            to_forearm.rotate_vector(hand_orientation.rotate_vector(REST_FLEX_DIRECTION));
        let wrist = vecs_rotation(REST_ARM_DIRECTION, REST_FLEX_DIRECTION, hand_pointing, hand_flex)
            * cal.wrist_correction.rotation();

        ArmPose {
            shoulder: shoulder.normalize(),
            elbow: elbow.normalize(),
            wrist: wrist.normalize(),
        }
    }
}

impl MotionModel for ThreeTrackerArm {
    fn name(&self) -> &str {
        "three_tracker_arm"
    }

    fn joints(&self) -> Vec<JointIndex> {
        vec![self.joints.shoulder, self.joints.elbow, self.joints.wrist]
    }

    fn update(&mut self, ctx: &mut MotionContext<'_>, _dt: f64) -> Result<(), MotionError> {
        for index in self.joints() {
            ctx.joint(index)?;
        }

        let pose = self.solve();
        ctx.joint_mut(self.joints.shoulder)?.set_orientation(pose.shoulder);
        ctx.joint_mut(self.joints.elbow)?.set_orientation(pose.elbow);
        ctx.joint_mut(self.joints.wrist)?.set_orientation(pose.wrist);
        Ok(())
    }

    /// Calibration is explicit; there is no reference pose to capture.
    fn reset(&mut self) {}
}
