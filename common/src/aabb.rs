use cgmath::{Matrix4, Point3};

use crate::{EPSILON, Ray};

/// An axis-aligned bounding box (AABB) in 3D space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    /// Creates a new AABB from min and max points.
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    /// Creates an AABB that encompasses all the given points.
    /// Returns None if the points slice is empty.
    pub fn from_points(points: &[Point3<f32>]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let start = Self::new(*first, *first);
        Some(rest.iter().fold(start, |bounds, point| bounds.expand(*point)))
    }

    /// Returns the 8 corner points of the AABB.
    pub fn corners(&self) -> [Point3<f32>; 8] {
        [
            Point3::new(self.min.x, self.min.y, self.min.z),
            Point3::new(self.max.x, self.min.y, self.min.z),
            Point3::new(self.min.x, self.max.y, self.min.z),
            Point3::new(self.max.x, self.max.y, self.min.z),
            Point3::new(self.min.x, self.min.y, self.max.z),
            Point3::new(self.max.x, self.min.y, self.max.z),
            Point3::new(self.min.x, self.max.y, self.max.z),
            Point3::new(self.max.x, self.max.y, self.max.z),
        ]
    }

    /// Transforms the AABB by the given matrix.
    ///
    /// All 8 corners are transformed and re-bounded, so rotation grows the box.
    pub fn transform(&self, matrix: &Matrix4<f32>) -> Self {
        let corners = self.corners().map(|corner| {
            let homogeneous = matrix * corner.to_homogeneous();
            Point3::from_homogeneous(homogeneous)
        });

        let start = Self::new(corners[0], corners[0]);
        corners[1..]
            .iter()
            .fold(start, |bounds, corner| bounds.expand(*corner))
    }

    /// Tests if a ray intersects this AABB using the slab method.
    /// Returns the t parameter of the entry point, or Some(0.0) if the ray starts inside.
    pub fn intersects_ray(&self, ray: &Ray) -> Option<f32> {
        let mut tmin = f32::NEG_INFINITY;
        let mut tmax = f32::INFINITY;

        let slabs = [
            (ray.origin.x, ray.direction.x, self.min.x, self.max.x),
            (ray.origin.y, ray.direction.y, self.min.y, self.max.y),
            (ray.origin.z, ray.direction.z, self.min.z, self.max.z),
        ];

        for (origin, dir, min, max) in slabs {
            if dir.abs() < EPSILON {
                // Parallel to the slab
                if origin < min || origin > max {
                    return None;
                }
                continue;
            }

            let inv_dir = 1.0 / dir;
            let mut t1 = (min - origin) * inv_dir;
            let mut t2 = (max - origin) * inv_dir;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }

            tmin = tmin.max(t1);
            tmax = tmax.min(t2);
            if tmin > tmax {
                return None;
            }
        }

        if tmin >= 0.0 {
            Some(tmin)
        } else if tmax >= 0.0 {
            Some(0.0)
        } else {
            None
        }
    }

    /// Expands the AABB to include the given point.
    pub fn expand(&self, point: Point3<f32>) -> Self {
        Self {
            min: Point3::new(
                self.min.x.min(point.x),
                self.min.y.min(point.y),
                self.min.z.min(point.z),
            ),
            max: Point3::new(
                self.max.x.max(point.x),
                self.max.y.max(point.y),
                self.max.z.max(point.z),
            ),
        }
    }

    /// Merges this AABB with another.
    pub fn merge(&self, other: &Aabb) -> Self {
        self.expand(other.min).expand(other.max)
    }

    /// Returns the center point of the AABB.
    pub fn center(&self) -> Point3<f32> {
        Point3::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
            (self.min.z + self.max.z) / 2.0,
        )
    }

    /// Tests if a point is inside the AABB (inclusive of boundaries).
    pub fn contains_point(&self, point: Point3<f32>) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Matrix4, Rad, Vector3};

    #[test]
    fn test_from_points_empty() {
        assert!(Aabb::from_points(&[]).is_none());
    }

    #[test]
    fn test_from_points() {
        let bounds = Aabb::from_points(&[
            Point3::new(1.0, -2.0, 0.0),
            Point3::new(-1.0, 3.0, 5.0),
            Point3::new(0.0, 0.0, -4.0),
        ])
        .unwrap();

        assert_eq!(bounds.min, Point3::new(-1.0, -2.0, -4.0));
        assert_eq!(bounds.max, Point3::new(1.0, 3.0, 5.0));
    }

    #[test]
    fn test_merge() {
        let a = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let b = Aabb::new(Point3::new(-1.0, 0.5, 0.5), Point3::new(0.5, 2.0, 0.5));
        let merged = a.merge(&b);

        assert_eq!(merged.min, Point3::new(-1.0, 0.0, 0.0));
        assert_eq!(merged.max, Point3::new(1.0, 2.0, 1.0));
    }

    #[test]
    fn test_transform_rotation_grows_box() {
        let bounds = Aabb::new(Point3::new(-1.0, -1.0, 0.0), Point3::new(1.0, 1.0, 0.0));
        let rotated = bounds.transform(&Matrix4::from_angle_z(Rad(std::f32::consts::FRAC_PI_4)));

        let half_diagonal = 2.0_f32.sqrt();
        assert!((rotated.max.x - half_diagonal).abs() < 0.001);
        assert!((rotated.min.y + half_diagonal).abs() < 0.001);
    }

    #[test]
    fn test_ray_hits_box() {
        let bounds = Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        let ray = Ray::new(Point3::new(0.0, 0.0, 10.0), Vector3::new(0.0, 0.0, -1.0));
        let t = bounds.intersects_ray(&ray).unwrap();
        assert!((t - 9.0).abs() < EPSILON);
    }

    #[test]
    fn test_ray_inside_box() {
        let bounds = Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(bounds.intersects_ray(&ray), Some(0.0));
    }

    #[test]
    fn test_ray_misses_box() {
        let bounds = Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        let ray = Ray::new(Point3::new(5.0, 0.0, 10.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(bounds.intersects_ray(&ray).is_none());
    }

    #[test]
    fn test_flat_box_hit_by_vertical_ray() {
        // Ground planes have zero thickness along Z
        let bounds = Aabb::new(Point3::new(-10.0, -10.0, 0.0), Point3::new(10.0, 10.0, 0.0));
        let ray = Ray::new(Point3::new(1.0, 1.0, 15.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(bounds.intersects_ray(&ray).is_some());
    }
}
