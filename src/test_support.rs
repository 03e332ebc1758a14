use cgmath::{InnerSpace, Quaternion};

/// True if `a` and `b` are the same rotation; q and -q compare equal.
pub(crate) fn quat_approx_eq(a: Quaternion<f32>, b: Quaternion<f32>, tolerance: f32) -> bool {
    let dot = a.normalize().dot(b.normalize());
    (dot.abs() - 1.0).abs() < tolerance
}

#[test]
fn test_quat_approx_eq_handles_sign() {
    let q = crate::common::axis_angle_deg(cgmath::Vector3::unit_z(), 40.0);
    assert!(quat_approx_eq(q, -q, 1e-5));
    assert!(!quat_approx_eq(q, Quaternion::new(1.0, 0.0, 0.0, 0.0), 1e-5));
}
