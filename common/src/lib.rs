//! Geometric primitives shared across the VESS crates.
//!
//! Everything here is plain math on `cgmath` types: rays, bounding boxes and a
//! handful of transform helpers used by the scene graph and the motion models.

mod aabb;
mod color;
mod ray;
pub mod transform_ops;

pub use aabb::Aabb;
pub use color::RgbaColor;
pub use ray::Ray;
pub use transform_ops::*;

/// Tolerance used for floating-point comparisons throughout the workspace.
pub const EPSILON: f32 = 1e-5;
