use cgmath::{InnerSpace, Matrix4, Point3, Vector3};

use crate::common::{compute_normal_matrix, Aabb, Ray};
use crate::geometry::Geometry;
use crate::node::{IntersectMask, NodeId};
use crate::Scene;

use super::pick_query::{pick_all, PickQuery};

/// A world-space ray segment to test against the scene.
#[derive(Debug, Clone, Copy)]
pub struct IntersectQuery {
    pub ray: Ray,
    /// Hits further than this along the ray are ignored
    pub max_length: f32,
    pub mask: IntersectMask,
}

impl IntersectQuery {
    pub fn new(ray: Ray, max_length: f32) -> Self {
        Self {
            ray,
            max_length,
            mask: IntersectMask::ALL,
        }
    }

    pub fn with_mask(mut self, mask: IntersectMask) -> Self {
        self.mask = mask;
        self
    }
}

/// Result of an intersection query.
#[derive(Debug, Clone)]
pub struct IntersectHit {
    /// The geometry node that was hit
    pub node: NodeId,
    /// Distance along the world-space ray to the hit point
    pub distance: f32,
    /// World-space hit location
    pub point: Point3<f32>,
    /// World-space unit normal of the hit triangle, facing the ray origin
    pub normal: Vector3<f32>,
    /// World transform of the hit node
    pub world_transform: Matrix4<f32>,
    /// Index of the triangle that was hit
    pub primitive_index: usize,
}

/// A scene the motion models can cast rays into.
pub trait IntersectionService {
    /// The nearest hit along the query ray, None on a miss.
    fn intersect(&self, query: &IntersectQuery) -> Option<IntersectHit>;
}

/// Ray query in the current coordinate space, remembering the world-space ray.
struct RayPickQuery {
    ray: Ray,
    world: IntersectQuery,
}

impl PickQuery for RayPickQuery {
    type Result = IntersectHit;

    fn mask(&self) -> IntersectMask {
        self.world.mask
    }

    fn might_intersect_bounds(&self, bounds: &Aabb) -> bool {
        // Bounds are tested in world space, before any transform
        bounds
            .intersects_ray(&self.ray)
            .is_some_and(|t| t <= self.world.max_length)
    }

    fn transform(&self, matrix: &Matrix4<f32>) -> Self {
        Self {
            ray: self.ray.transform(matrix),
            world: self.world,
        }
    }

    fn collect_geometry_hits(
        &self,
        geometry: &Geometry,
        node_id: NodeId,
        world_transform: &Matrix4<f32>,
        results: &mut Vec<Self::Result>,
    ) {
        let normal_matrix = compute_normal_matrix(world_transform);

        for hit in geometry.intersect_ray(&self.ray) {
            let point = Point3::from_homogeneous(world_transform * hit.hit_point.to_homogeneous());

            // Compute distance in world space from original ray origin
            let distance = (point - self.world.ray.origin).magnitude();
            if distance > self.world.max_length {
                continue;
            }

            let normal = normal_matrix * hit.normal;
            let normal = if normal.magnitude2() > 0.0 {
                normal.normalize()
            } else {
                hit.normal
            };

            results.push(IntersectHit {
                node: node_id,
                distance,
                point,
                normal,
                world_transform: *world_transform,
                primitive_index: hit.triangle_index,
            });
        }
    }
}

/// Every hit along the query ray, sorted by distance (closest first).
pub fn intersect_all(query: &IntersectQuery, scene: &Scene) -> Vec<IntersectHit> {
    let pick = RayPickQuery {
        ray: query.ray,
        world: *query,
    };
    let mut results = pick_all(&pick, scene);
    results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    results
}

pub fn intersect_nearest(query: &IntersectQuery, scene: &Scene) -> Option<IntersectHit> {
    let pick = RayPickQuery {
        ray: query.ray,
        world: *query,
    };
    pick_all(&pick, scene)
        .into_iter()
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

impl IntersectionService for Scene {
    fn intersect(&self, query: &IntersectQuery) -> Option<IntersectHit> {
        intersect_nearest(query, self)
    }
}
