//! Math types
//!
//! Thin aliases over nalgebra plus the TRS composition used by transforms.

pub use nalgebra::{Matrix4, Quaternion, Unit, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Compose translation, rotation and scale into one matrix (scale applied first)
#[must_use]
pub fn compose_trs(translation: &Vec3, rotation: &Quat, scale: &Vec3) -> Mat4 {
    Mat4::new_translation(translation) * rotation.to_homogeneous() * Mat4::new_nonuniform_scaling(scale)
}

/// Translation column of an affine matrix
#[must_use]
pub fn translation_of(matrix: &Mat4) -> Vec3 {
    Vec3::new(matrix.m14, matrix.m24, matrix.m34)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_compose_identity() {
        let matrix = compose_trs(&Vec3::zeros(), &Quat::identity(), &Vec3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(matrix, Mat4::identity(), epsilon = 1e-6);
    }

    #[test]
    fn test_compose_order_scales_before_translating() {
        let matrix = compose_trs(
            &Vec3::new(1.0, 0.0, 0.0),
            &Quat::from_axis_angle(&Vector3::z_axis(), std::f32::consts::FRAC_PI_2),
            &Vec3::new(2.0, 2.0, 2.0),
        );

        // (1,0,0) scaled to (2,0,0), rotated to (0,2,0), translated to (1,2,0)
        let point = matrix.transform_point(&nalgebra::Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(point.coords, Vec3::new(1.0, 2.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(translation_of(&matrix), Vec3::new(1.0, 0.0, 0.0));
    }
}
