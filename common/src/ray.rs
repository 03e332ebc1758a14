use cgmath::{InnerSpace, Matrix4, Point3, Vector3};

use crate::EPSILON;

/// A ray in 3D space, defined by an origin point and a direction vector.
#[derive(Debug, Copy, Clone)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Vector3<f32>, // Should be normalized
}

impl Ray {
    /// Creates a new ray with the given origin and direction.
    /// The direction will be normalized automatically.
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Creates a ray pointing from `from` toward `to`, along with the distance between them.
    ///
    /// Returns None if the two points coincide (no usable direction).
    pub fn between(from: Point3<f32>, to: Point3<f32>) -> Option<(Self, f32)> {
        let delta = to - from;
        let length = delta.magnitude();
        if length < EPSILON {
            return None;
        }
        Some((
            Self {
                origin: from,
                direction: delta / length,
            },
            length,
        ))
    }

    /// Returns a point along the ray at parameter t.
    pub fn point_at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction * t
    }

    /// Transforms the ray by the given 4x4 transformation matrix.
    ///
    /// The transformed direction is re-normalized, so parameters along the new ray
    /// are not comparable to parameters along the old one under scaling.
    pub fn transform(&self, matrix: &Matrix4<f32>) -> Self {
        let origin_homogeneous = matrix * self.origin.to_homogeneous();
        let new_origin = Point3::from_homogeneous(origin_homogeneous);

        let direction_vec4 = matrix * self.direction.extend(0.0);
        let new_direction = Vector3::new(direction_vec4.x, direction_vec4.y, direction_vec4.z);

        Self {
            origin: new_origin,
            direction: new_direction.normalize(),
        }
    }

    /// Tests if a ray intersects a triangle using the Möller-Trumbore algorithm.
    ///
    /// Returns Some((t, u, v)) if the ray hits the triangle, where:
    /// - t: distance along the ray
    /// - u, v: barycentric coordinates (w = 1 - u - v)
    ///
    /// Both faces are tested. Hits behind the ray origin are rejected.
    pub fn intersect_triangle(
        &self,
        v0: Point3<f32>,
        v1: Point3<f32>,
        v2: Point3<f32>,
    ) -> Option<(f32, f32, f32)> {
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        let h = self.direction.cross(edge2);
        let det = edge1.dot(h);

        // Ray lies in the triangle's plane or is parallel to it
        if det > -EPSILON && det < EPSILON {
            return None;
        }

        let inv_det = 1.0 / det;
        let s = self.origin - v0;

        let u = inv_det * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = inv_det * self.direction.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = inv_det * edge2.dot(q);
        if t > EPSILON {
            Some((t, u, v))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Matrix4, Point3, Rad, Vector3};

    #[test]
    fn test_ray_creation_normalizes_direction() {
        let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), Vector3::new(3.0, 4.0, 0.0));
        assert!((ray.direction.magnitude() - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_ray_between_points() {
        let (ray, length) =
            Ray::between(Point3::new(0.0, 0.0, 10.0), Point3::new(0.0, 0.0, 4.0)).unwrap();
        assert!((length - 6.0).abs() < EPSILON);
        assert!((ray.direction.z + 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_ray_between_coincident_points() {
        let p = Point3::new(1.0, 1.0, 1.0);
        assert!(Ray::between(p, p).is_none());
    }

    #[test]
    fn test_ray_point_at() {
        let ray = Ray::new(Point3::new(1.0, 2.0, 3.0), Vector3::new(0.0, 0.0, -1.0));
        let point = ray.point_at(5.0);
        assert!((point.x - 1.0).abs() < EPSILON);
        assert!((point.y - 2.0).abs() < EPSILON);
        assert!((point.z + 2.0).abs() < EPSILON);
    }

    #[test]
    fn test_ray_transform_translation() {
        let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
        let translation = Matrix4::from_translation(Vector3::new(5.0, 0.0, 0.0));
        let transformed = ray.transform(&translation);

        assert!((transformed.origin.x - 5.0).abs() < EPSILON);
        assert!((transformed.direction.x - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_ray_transform_with_rotation() {
        let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
        let rotation = Matrix4::from_angle_z(Rad(std::f32::consts::FRAC_PI_2));
        let transformed = ray.transform(&rotation);

        assert!(transformed.direction.x.abs() < 0.001);
        assert!((transformed.direction.y - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_downward_ray_hits_ground_triangle() {
        let ray = Ray::new(Point3::new(0.2, 0.2, 10.0), Vector3::new(0.0, 0.0, -1.0));
        let hit = ray.intersect_triangle(
            Point3::new(-1.0, -1.0, 0.0),
            Point3::new(1.0, -1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );

        let (t, _, _) = hit.expect("ray should hit the triangle");
        assert!((t - 10.0).abs() < EPSILON);
    }

    #[test]
    fn test_triangle_behind_origin_is_missed() {
        let ray = Ray::new(Point3::new(0.0, 0.0, -1.0), Vector3::new(0.0, 0.0, -1.0));
        let hit = ray.intersect_triangle(
            Point3::new(-1.0, -1.0, 0.0),
            Point3::new(1.0, -1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        assert!(hit.is_none());
    }

    #[test]
    fn test_parallel_ray_misses_triangle() {
        let ray = Ray::new(Point3::new(-5.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
        let hit = ray.intersect_triangle(
            Point3::new(-1.0, -1.0, 0.0),
            Point3::new(1.0, -1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        assert!(hit.is_none());
    }
}
