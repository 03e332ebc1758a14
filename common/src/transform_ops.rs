//! Transform operations for composing rotations and rigid poses.
//!
//! Pure functions shared by the scene graph (transform attributes, intersection
//! normals) and the motion models (tracker offsets, arm solving).

use cgmath::{
    Deg, InnerSpace, Matrix, Matrix3, Matrix4, Quaternion, Rad, Rotation3, SquareMatrix, Vector3,
};

use super::EPSILON;

// =============================================================================
// Rotations
// =============================================================================

/// Applies a world-space rotation to an existing orientation (rotation * current).
pub fn compose_rotation(
    current_rotation: Quaternion<f32>,
    rotation: Quaternion<f32>,
) -> Quaternion<f32> {
    rotation * current_rotation
}

/// Builds a rotation of `degrees` about `axis`.
///
/// A zero-length axis yields the identity rotation.
pub fn axis_angle_deg(axis: Vector3<f32>, degrees: f32) -> Quaternion<f32> {
    if axis.magnitude2() < EPSILON * EPSILON {
        return Quaternion::new(1.0, 0.0, 0.0, 0.0);
    }
    Quaternion::from_axis_angle(axis.normalize(), Deg(degrees))
}

/// Computes the rotation that carries one (forward, up) vector pair onto another.
///
/// The up vectors only need to be roughly perpendicular to their forward vectors;
/// they are re-orthogonalized against them. If either up vector is parallel to its
/// forward vector, the result degrades to the shortest arc between the forwards.
///
/// # Arguments
/// * `origin_forward` / `origin_up` - The reference frame
/// * `target_forward` / `target_up` - The frame to rotate onto
pub fn vecs_rotation(
    origin_forward: Vector3<f32>,
    origin_up: Vector3<f32>,
    target_forward: Vector3<f32>,
    target_up: Vector3<f32>,
) -> Quaternion<f32> {
    match (
        orthonormal_basis(origin_forward, origin_up),
        orthonormal_basis(target_forward, target_up),
    ) {
        (Some(origin), Some(target)) => Quaternion::from(target * origin.transpose()).normalize(),
        _ => shortest_arc(origin_forward, target_forward),
    }
}

/// Shortest rotation carrying direction `from` onto direction `to`.
pub fn shortest_arc(from: Vector3<f32>, to: Vector3<f32>) -> Quaternion<f32> {
    if from.magnitude2() < EPSILON || to.magnitude2() < EPSILON {
        return Quaternion::new(1.0, 0.0, 0.0, 0.0);
    }
    Quaternion::from_arc(from.normalize(), to.normalize(), None)
}

/// Returns a (right, forward, up) basis as matrix columns, or None if degenerate.
fn orthonormal_basis(forward: Vector3<f32>, up: Vector3<f32>) -> Option<Matrix3<f32>> {
    if forward.magnitude2() < EPSILON {
        return None;
    }
    let forward = forward.normalize();
    let right = forward.cross(up);
    if right.magnitude2() < EPSILON {
        return None;
    }
    let right = right.normalize();
    let up = right.cross(forward);
    Some(Matrix3::from_cols(right, forward, up))
}

/// Angle between two vectors in degrees, 0 if either is degenerate.
pub fn angle_between_deg(a: Vector3<f32>, b: Vector3<f32>) -> f32 {
    if a.magnitude2() < EPSILON || b.magnitude2() < EPSILON {
        return 0.0;
    }
    let Deg(degrees) = Deg::from(a.angle(b));
    degrees
}

// =============================================================================
// Rigid Poses
// =============================================================================

/// Builds `T(position) * R(orientation)`.
pub fn rigid_transform(position: Vector3<f32>, orientation: Quaternion<f32>) -> Matrix4<f32> {
    Matrix4::from_translation(position) * Matrix4::from(orientation)
}

/// Splits a matrix into translation and rotation, discarding scale and shear.
///
/// The rotation is recovered from the normalized upper-left 3x3 columns; a matrix
/// with a collapsed axis yields the identity rotation.
pub fn decompose_rigid(matrix: &Matrix4<f32>) -> (Vector3<f32>, Quaternion<f32>) {
    let translation = matrix.w.truncate();

    let columns = [matrix.x.truncate(), matrix.y.truncate(), matrix.z.truncate()];
    if columns.iter().any(|c| c.magnitude2() < EPSILON) {
        return (translation, Quaternion::new(1.0, 0.0, 0.0, 0.0));
    }
    let rotation = Matrix3::from_cols(
        columns[0].normalize(),
        columns[1].normalize(),
        columns[2].normalize(),
    );
    (translation, Quaternion::from(rotation).normalize())
}

/// Transforms a direction vector (w = 0) by a matrix.
pub fn transform_vector(matrix: &Matrix4<f32>, vector: Vector3<f32>) -> Vector3<f32> {
    (matrix * vector.extend(0.0)).truncate()
}

/// Computes the normal matrix (inverse-transpose of the upper-left 3x3).
///
/// Falls back to identity if the matrix is not invertible.
pub fn compute_normal_matrix(world_transform: &Matrix4<f32>) -> Matrix3<f32> {
    let mat3 = Matrix3::from_cols(
        world_transform.x.truncate(),
        world_transform.y.truncate(),
        world_transform.z.truncate(),
    );

    match mat3.invert() {
        Some(inv) => inv.transpose(),
        None => Matrix3::identity(),
    }
}

/// Converts a rate in degrees to radians as `Rad`.
pub fn deg_to_rad(degrees: f32) -> Rad<f32> {
    Rad::from(Deg(degrees))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Rotation, Vector3};

    fn vec_close(a: Vector3<f32>, b: Vector3<f32>) -> bool {
        (a - b).magnitude() < 1e-4
    }

    fn quat_approx_eq(a: Quaternion<f32>, b: Quaternion<f32>, tolerance: f32) -> bool {
        (a.normalize().dot(b.normalize()).abs() - 1.0).abs() < tolerance
    }

    #[test]
    fn test_axis_angle_zero_axis_is_identity() {
        let q = axis_angle_deg(Vector3::new(0.0, 0.0, 0.0), 45.0);
        assert_eq!(q, Quaternion::new(1.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn test_axis_angle_rotates_x_to_y() {
        let q = axis_angle_deg(Vector3::unit_z(), 90.0);
        let rotated = q.rotate_vector(Vector3::unit_x());
        assert!(vec_close(rotated, Vector3::unit_y()));
    }

    #[test]
    fn test_vecs_rotation_maps_both_vectors() {
        let q = vecs_rotation(
            Vector3::unit_y(),
            Vector3::unit_z(),
            Vector3::unit_x(),
            Vector3::unit_z(),
        );

        assert!(vec_close(q.rotate_vector(Vector3::unit_y()), Vector3::unit_x()));
        assert!(vec_close(q.rotate_vector(Vector3::unit_z()), Vector3::unit_z()));
    }

    #[test]
    fn test_vecs_rotation_reorthogonalizes_up() {
        // A sloppy up vector still produces a proper rotation of the forward vector
        let q = vecs_rotation(
            Vector3::unit_y(),
            Vector3::unit_z(),
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::new(0.0, 0.3, 1.0),
        );
        assert!(vec_close(q.rotate_vector(Vector3::unit_y()), Vector3::new(0.0, 0.0, -1.0)));
    }

    #[test]
    fn test_vecs_rotation_degenerate_up_falls_back_to_arc() {
        let q = vecs_rotation(
            Vector3::unit_y(),
            Vector3::unit_y(),
            Vector3::unit_x(),
            Vector3::unit_z(),
        );
        assert!(vec_close(q.rotate_vector(Vector3::unit_y()), Vector3::unit_x()));
    }

    #[test]
    fn test_angle_between() {
        let angle = angle_between_deg(Vector3::unit_x(), Vector3::unit_y());
        assert!((angle - 90.0).abs() < 1e-3);
        assert_eq!(angle_between_deg(Vector3::unit_x(), Vector3::new(0.0, 0.0, 0.0)), 0.0);
    }

    #[test]
    fn test_decompose_rigid_round_trip() {
        let position = Vector3::new(1.0, -2.0, 3.0);
        let orientation = axis_angle_deg(Vector3::new(1.0, 1.0, 0.0), 30.0);
        let (t, r) = decompose_rigid(&rigid_transform(position, orientation));

        assert!(vec_close(t, position));
        assert!(quat_approx_eq(r, orientation, 1e-4));
    }

    #[test]
    fn test_decompose_discards_scale() {
        let matrix = Matrix4::from_translation(Vector3::new(0.0, 0.0, 2.0)) * Matrix4::from_scale(3.0);
        let (t, r) = decompose_rigid(&matrix);
        assert!(vec_close(t, Vector3::new(0.0, 0.0, 2.0)));
        assert!(quat_approx_eq(r, Quaternion::new(1.0, 0.0, 0.0, 0.0), 1e-4));
    }

    #[test]
    fn test_normal_matrix_non_uniform_scale() {
        let world = Matrix4::from_nonuniform_scale(2.0, 1.0, 1.0);
        let normal = compute_normal_matrix(&world);
        assert!((normal.x.x - 0.5).abs() < EPSILON);
        assert!((normal.y.y - 1.0).abs() < EPSILON);
    }
}
