use cgmath::{EuclideanSpace, InnerSpace, Point3, Rotation, SquareMatrix, Transform, Vector3};
use serde::{Deserialize, Serialize};

use super::{JointIndex, MotionContext, MotionError, MotionModel};
use crate::common::{transform_vector, Ray, EPSILON};
use crate::scene::{IntersectMask, IntersectQuery, IntersectionService};

/// Distance kept between a collision point and the surface it ran into.
pub const DEFAULT_COLLISION_MARGIN: f32 = 0.2;

/// What happens to a joint that would move into an obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionMode {
    /// Stop short of the obstacle.
    #[default]
    Stop,
    /// Keep the part of the movement that runs along the obstacle.
    Slide,
    /// Stop short and reflect the velocity off the obstacle.
    Bounce,
}

/// Normals at least this close to straight up are ground, not obstacles.
const WALKABLE_NORMAL_Z: f32 = 0.7;

/// Keeps a joint from passing through obstacles.
///
/// The horizontal part of the movement since the previous update is swept from
/// a set of points fixed to the joint. If any sweep hits something steeper than
/// walkable ground, the joint's position is pulled back according to the
/// [`CollisionMode`]. Vertical movement is left to terrain following.
#[derive(Debug, Clone)]
pub struct CollisionMotion {
    joint: JointIndex,
    /// Swept points in the joint's frame
    offsets: Vec<Vector3<f32>>,
    margin: f32,
    mode: CollisionMode,
    mask: IntersectMask,
    /// Joint position after the previous update, in the parent frame
    previous: Option<Vector3<f32>>,
}

/// Nearest obstacle found by a sweep.
struct Contact {
    distance: f32,
    normal: Vector3<f32>,
}

impl CollisionMotion {
    pub fn new(joint: JointIndex) -> Self {
        Self {
            joint,
            offsets: vec![Vector3::new(0.0, 0.0, 0.0)],
            margin: DEFAULT_COLLISION_MARGIN,
            mode: CollisionMode::default(),
            mask: IntersectMask::OBSTACLE,
            previous: None,
        }
    }

    pub fn with_offsets(mut self, offsets: Vec<Vector3<f32>>) -> Self {
        self.offsets = offsets;
        self
    }

    pub fn with_margin(mut self, margin: f32) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_mode(mut self, mode: CollisionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_mask(mut self, mask: IntersectMask) -> Self {
        self.mask = mask;
        self
    }

    pub fn joint(&self) -> JointIndex {
        self.joint
    }

    pub fn mode(&self) -> CollisionMode {
        self.mode
    }

    fn sweep(
        &self,
        ctx: &MotionContext<'_>,
        points: &[Point3<f32>],
        movement: Vector3<f32>,
    ) -> Option<Contact> {
        points
            .iter()
            .filter_map(|&from| {
                let (ray, length) = Ray::between(from, from + movement)?;
                let query = IntersectQuery::new(ray, length + self.margin).with_mask(self.mask);
                ctx.world.intersect(&query)
            })
            .filter(|hit| hit.normal.z < WALKABLE_NORMAL_Z)
            .map(|hit| Contact {
                distance: hit.distance,
                normal: hit.normal,
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

impl MotionModel for CollisionMotion {
    fn name(&self) -> &str {
        "collision"
    }

    fn joints(&self) -> Vec<JointIndex> {
        vec![self.joint]
    }

    fn update(&mut self, ctx: &mut MotionContext<'_>, _dt: f64) -> Result<(), MotionError> {
        let joint = ctx.joint(self.joint)?;
        let node = joint.node();
        let current = joint.position();
        let orientation = joint.orientation();

        let Some(previous) = self.previous.replace(current) else {
            return Ok(());
        };
        let parent_world = ctx
            .world
            .parent_transform(node)
            .ok_or(MotionError::MissingNode(node))?;
        let Some(world_to_parent) = parent_world.invert() else {
            log::warn!("collision: node {} has a singular parent transform", node);
            return Ok(());
        };

        let to_world = |local: Vector3<f32>| parent_world.transform_point(Point3::from_vec(local));
        let movement = to_world(current) - to_world(previous);
        let horizontal = Vector3::new(movement.x, movement.y, 0.0);
        if horizontal.magnitude2() < EPSILON * EPSILON {
            return Ok(());
        }

        // Sweep at the higher of the two heights so a step up or down is not
        // taken for the side of the step.
        let lift = Vector3::unit_z() * movement.z.max(0.0);
        let points: Vec<Point3<f32>> = self
            .offsets
            .iter()
            .map(|&offset| to_world(previous + orientation.rotate_vector(offset)) + lift)
            .collect();
        let Some(contact) = self.sweep(ctx, &points, horizontal) else {
            return Ok(());
        };

        let direction = horizontal.normalize();
        let allowed = direction * (contact.distance - self.margin).max(0.0);
        let corrected = match self.mode {
            CollisionMode::Stop | CollisionMode::Bounce => allowed,
            CollisionMode::Slide => {
                let remaining = horizontal - allowed;
                let along = remaining - contact.normal * remaining.dot(contact.normal);
                allowed + Vector3::new(along.x, along.y, 0.0)
            }
        };
        log::debug!(
            "collision: node {} hit an obstacle, {:?} after {:.3}",
            node,
            self.mode,
            contact.distance
        );

        let correction = transform_vector(&world_to_parent, corrected - horizontal);
        let bounce_normal = transform_vector(&world_to_parent, contact.normal);
        let mode = self.mode;

        let joint = ctx.joint_mut(self.joint)?;
        joint.modify_position(correction);
        if mode == CollisionMode::Bounce && bounce_normal.magnitude2() > 0.0 {
            let n = bounce_normal.normalize();
            let velocity = joint.velocity();
            joint.set_velocity(velocity - n * (2.0 * velocity.dot(n)));
        }
        self.previous = Some(joint.position());
        Ok(())
    }

    fn reset(&mut self) {
        self.previous = None;
    }
}
