use std::cell::Cell;

use cgmath::{InnerSpace, Point3, Vector3};

use crate::common::{Aabb, Ray};

/// Result of a ray-geometry intersection test in local geometry space.
#[derive(Debug, Clone)]
pub struct GeometryHit {
    /// Distance along the ray to the hit point (in local space)
    pub distance: f32,
    /// Hit location in local geometry space
    pub hit_point: Point3<f32>,
    /// Unit face normal of the hit triangle in local space
    pub normal: Vector3<f32>,
    /// Index of the triangle that was hit (index into the index buffer / 3)
    pub triangle_index: usize,
    /// Barycentric coordinates of the hit point on the triangle (u, v, w) where w = 1 - u - v
    pub barycentric: (f32, f32, f32),
}

/// Indexed triangle list carried by a geometry leaf node.
///
/// Only positions are stored; the core needs geometry for bounds and
/// intersection, while vertex attributes belong to the render backend.
#[derive(Debug, Clone)]
pub struct Geometry {
    positions: Vec<Point3<f32>>,
    indices: Vec<u32>,
    cached_bounding: Cell<Option<Aabb>>,
}

impl Geometry {
    /// Creates geometry from positions and a triangle index list.
    ///
    /// # Errors
    /// Returns an error if the index count is not a multiple of 3 or an index is
    /// out of range.
    pub fn new(positions: Vec<Point3<f32>>, indices: Vec<u32>) -> anyhow::Result<Self> {
        if indices.len() % 3 != 0 {
            anyhow::bail!("Index count {} is not a multiple of 3", indices.len());
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
            anyhow::bail!(
                "Index {} out of range for {} positions",
                bad,
                positions.len()
            );
        }

        Ok(Self {
            positions,
            indices,
            cached_bounding: Cell::new(None),
        })
    }

    /// A flat square on the plane z = `height`, centered at the origin.
    pub fn ground_plane(half_extent: f32, height: f32) -> Self {
        let positions = vec![
            Point3::new(-half_extent, -half_extent, height),
            Point3::new(half_extent, -half_extent, height),
            Point3::new(half_extent, half_extent, height),
            Point3::new(-half_extent, half_extent, height),
        ];
        Self {
            positions,
            indices: vec![0, 1, 2, 0, 2, 3],
            cached_bounding: Cell::new(None),
        }
    }

    /// An axis-aligned box spanning `min` to `max`.
    pub fn axis_box(min: Point3<f32>, max: Point3<f32>) -> Self {
        let bounds = Aabb::new(min, max);
        // Corner order follows Aabb::corners: bit 0 = x, bit 1 = y, bit 2 = z
        let positions = bounds.corners().to_vec();
        let indices = vec![
            0, 2, 1, 1, 2, 3, // z = min
            4, 5, 6, 5, 7, 6, // z = max
            0, 1, 4, 1, 5, 4, // y = min
            2, 6, 3, 3, 6, 7, // y = max
            0, 4, 2, 2, 4, 6, // x = min
            1, 3, 5, 3, 7, 5, // x = max
        ];
        Self {
            positions,
            indices,
            cached_bounding: Cell::new(None),
        }
    }

    pub fn positions(&self) -> &[Point3<f32>] {
        &self.positions
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Local-space bounding box, None if there are no positions.
    pub fn bounding(&self) -> Option<Aabb> {
        if let Some(cached) = self.cached_bounding.get() {
            return Some(cached);
        }
        let bounding = Aabb::from_points(&self.positions);
        self.cached_bounding.set(bounding);
        bounding
    }

    fn triangle(&self, triangle_index: usize) -> [Point3<f32>; 3] {
        let base = triangle_index * 3;
        [
            self.positions[self.indices[base] as usize],
            self.positions[self.indices[base + 1] as usize],
            self.positions[self.indices[base + 2] as usize],
        ]
    }

    /// Tests a ray against all triangles.
    ///
    /// The ray should be in local geometry space. Returns all intersections found,
    /// unsorted.
    pub fn intersect_ray(&self, ray: &Ray) -> Vec<GeometryHit> {
        let mut hits = Vec::new();

        for triangle_index in 0..self.triangle_count() {
            let [v0, v1, v2] = self.triangle(triangle_index);

            if let Some((t, u, v)) = ray.intersect_triangle(v0, v1, v2) {
                let face_normal = (v1 - v0).cross(v2 - v0);
                // Report the side facing the ray
                let normal = if face_normal.dot(ray.direction) > 0.0 {
                    -face_normal
                } else {
                    face_normal
                };

                hits.push(GeometryHit {
                    distance: t,
                    hit_point: ray.point_at(t),
                    normal: normal.normalize(),
                    triangle_index,
                    barycentric: (u, v, 1.0 - u - v),
                });
            }
        }

        hits
    }
}
