use cgmath::{Matrix4, SquareMatrix};

/// Local transform of a component, split into three stages.
///
/// `pre` and `post` are static adjustments set up with the model; `dynamic` is
/// the stage rewritten every frame by kinematics. The node's local transform is
/// `pre * dynamic * post`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformAttribute {
    pre: Matrix4<f32>,
    dynamic: Matrix4<f32>,
    post: Matrix4<f32>,
}

impl Default for TransformAttribute {
    fn default() -> Self {
        Self {
            pre: Matrix4::identity(),
            dynamic: Matrix4::identity(),
            post: Matrix4::identity(),
        }
    }
}

impl TransformAttribute {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transform whose dynamic stage starts at `dynamic`.
    pub fn from_dynamic(dynamic: Matrix4<f32>) -> Self {
        Self {
            dynamic,
            ..Self::default()
        }
    }

    pub fn pre(&self) -> Matrix4<f32> {
        self.pre
    }

    pub fn set_pre(&mut self, pre: Matrix4<f32>) {
        self.pre = pre;
    }

    pub fn dynamic(&self) -> Matrix4<f32> {
        self.dynamic
    }

    pub fn set_dynamic(&mut self, dynamic: Matrix4<f32>) {
        self.dynamic = dynamic;
    }

    pub fn post(&self) -> Matrix4<f32> {
        self.post
    }

    pub fn set_post(&mut self, post: Matrix4<f32>) {
        self.post = post;
    }

    /// The matrix applied to the owning node: `pre * dynamic * post`.
    pub fn combined(&self) -> Matrix4<f32> {
        self.pre * self.dynamic * self.post
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Point3, Transform, Vector3};

    #[test]
    fn test_default_is_identity() {
        assert_eq!(TransformAttribute::new().combined(), Matrix4::identity());
    }

    #[test]
    fn test_combined_order() {
        let mut transform = TransformAttribute::new();
        transform.set_pre(Matrix4::from_translation(Vector3::new(1.0, 0.0, 0.0)));
        transform.set_dynamic(Matrix4::from_scale(2.0));
        transform.set_post(Matrix4::from_translation(Vector3::new(0.0, 0.0, 1.0)));

        // post applies first, then dynamic, then pre
        let p = transform.combined().transform_point(Point3::new(0.0, 0.0, 0.0));
        assert_eq!(p, Point3::new(1.0, 0.0, 2.0));
    }
}
