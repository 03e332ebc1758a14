use cgmath::{EuclideanSpace, Point3, Rotation, SquareMatrix, Transform, Vector3};

use super::{JointIndex, MotionContext, MotionError, MotionModel};
use crate::common::{transform_vector, Ray};
use crate::scene::{IntersectMask, IntersectQuery, IntersectionService};

/// Gap kept between the ground and the followed point.
pub const DEFAULT_FLOAT_HEIGHT: f32 = 0.01;

/// How far above the followed point the downward ray starts.
pub const DEFAULT_STEP_HEIGHT: f32 = 1.0;

/// Longest downward ray.
pub const DEFAULT_SEARCH_DEPTH: f32 = 10_000.0;

/// Keeps a joint standing on the ground below it.
///
/// Each update casts a ray straight down (world -Z) from `step_height` above the
/// base point. On a hit the joint is moved vertically so the base point floats
/// `float_height` above the ground, which lets it climb steps up to
/// `step_height`. On a miss the position is left alone. Either way the vertical
/// velocity is cleared.
#[derive(Debug, Clone)]
pub struct TerrainFollow {
    joint: JointIndex,
    /// Followed point relative to the joint, in the joint's frame
    base_offset: Vector3<f32>,
    step_height: f32,
    float_height: f32,
    search_depth: f32,
    mask: IntersectMask,
    on_ground: bool,
}

impl TerrainFollow {
    pub fn new(joint: JointIndex) -> Self {
        Self {
            joint,
            base_offset: Vector3::new(0.0, 0.0, 0.0),
            step_height: DEFAULT_STEP_HEIGHT,
            float_height: DEFAULT_FLOAT_HEIGHT,
            search_depth: DEFAULT_SEARCH_DEPTH,
            mask: IntersectMask::TERRAIN,
            on_ground: false,
        }
    }

    pub fn with_base_offset(mut self, offset: Vector3<f32>) -> Self {
        self.base_offset = offset;
        self
    }

    pub fn with_step_height(mut self, height: f32) -> Self {
        self.step_height = height;
        self
    }

    pub fn with_float_height(mut self, height: f32) -> Self {
        self.float_height = height;
        self
    }

    pub fn with_search_depth(mut self, depth: f32) -> Self {
        self.search_depth = depth;
        self
    }

    pub fn with_mask(mut self, mask: IntersectMask) -> Self {
        self.mask = mask;
        self
    }

    pub fn joint(&self) -> JointIndex {
        self.joint
    }

    /// Whether the last update found ground.
    pub fn on_ground(&self) -> bool {
        self.on_ground
    }
}

impl MotionModel for TerrainFollow {
    fn name(&self) -> &str {
        "terrain_follow"
    }

    fn joints(&self) -> Vec<JointIndex> {
        vec![self.joint]
    }

    fn update(&mut self, ctx: &mut MotionContext<'_>, _dt: f64) -> Result<(), MotionError> {
        let world = ctx.world;
        let joint = ctx.joint_mut(self.joint)?;
        let node = joint.node();
        let parent_world = world
            .parent_transform(node)
            .ok_or(MotionError::MissingNode(node))?;

        let local_base = joint.position() + joint.orientation().rotate_vector(self.base_offset);
        let base = parent_world.transform_point(Point3::from_vec(local_base));
        let start = base + Vector3::unit_z() * self.step_height;

        let query = IntersectQuery::new(
            Ray::new(start, -Vector3::unit_z()),
            self.search_depth,
        )
        .with_mask(self.mask);

        self.on_ground = false;
        match world.intersect(&query) {
            Some(hit) => match parent_world.invert() {
                Some(world_to_parent) => {
                    let rise = hit.point.z + self.float_height - base.z;
                    let delta = transform_vector(&world_to_parent, Vector3::unit_z() * rise);
                    joint.modify_position(delta);
                    self.on_ground = true;
                }
                None => log::warn!("terrain follow: node {} has a singular parent transform", node),
            },
            None => log::trace!("terrain follow: no ground below node {}", node),
        }

        let mut velocity = joint.velocity();
        velocity.z = 0.0;
        joint.set_velocity(velocity);
        Ok(())
    }

    fn reset(&mut self) {
        self.on_ground = false;
    }
}
