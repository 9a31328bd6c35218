//! # Transform Utilities
//!
//! Pure math helpers shared by the camera, the scene and the shader uniforms.
//!
//! ## Conventions
//!
//! - Matrices are `nalgebra_glm::Mat4`, column-major in memory, indexed as `m[(row, col)]`.
//! - Projections follow the OpenGL convention: a right-handed view space looking down `-Z`
//!   and clip-space depth in `[-1, 1]`. Before a projection reaches the GPU it is
//!   pre-multiplied by [`opengl_to_wgpu_matrix`], which remaps depth into wgpu's `[0, 1]`.

use std::f32::consts::PI;

use nalgebra_glm as glm;

/// Reasons a perspective projection cannot be built.
///
/// Every variant is produced deterministically from the inputs; no partially
/// built matrix ever escapes [`compute_perspective_projection_matrix`].
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ProjectionError {
    #[error("near plane must be positive, got {0}")]
    NonPositiveNear(f32),

    #[error("far plane ({far}) must lie beyond the near plane ({near})")]
    FarNotBeyondNear { near: f32, far: f32 },

    #[error("aspect ratio must be positive, got {0}")]
    NonPositiveAspect(f32),

    #[error("vertical field of view must be in (0, pi) radians, got {0}")]
    FieldOfViewOutOfRange(f32),
}

/// Converts an angle in degrees into radians.
pub fn convert_degrees_to_radians(degrees: f32) -> f32 {
    degrees * PI / 180.0
}

/// Builds the standard OpenGL perspective projection matrix.
///
/// The matrix maps the view frustum described by the vertical field of view, the aspect
/// ratio (width / height) and the near/far clip planes into clip space. A point on the
/// near plane centerline lands on clip depth `-1`, one on the far plane on `+1`.
///
/// # Errors
///
/// Returns a [`ProjectionError`] when `near <= 0`, `far <= near`, `aspect_ratio <= 0`, the
/// field of view is outside `(0, pi)`, or any input is NaN.
pub fn compute_perspective_projection_matrix(
    field_of_view: f32,
    aspect_ratio: f32,
    near: f32,
    far: f32,
) -> Result<glm::Mat4, ProjectionError> {
    if near.is_nan() || near <= 0.0 {
        return Err(ProjectionError::NonPositiveNear(near));
    }
    if far.is_nan() || far <= near {
        return Err(ProjectionError::FarNotBeyondNear { near, far });
    }
    if aspect_ratio.is_nan() || aspect_ratio <= 0.0 {
        return Err(ProjectionError::NonPositiveAspect(aspect_ratio));
    }
    if field_of_view.is_nan() || field_of_view <= 0.0 || field_of_view >= PI {
        return Err(ProjectionError::FieldOfViewOutOfRange(field_of_view));
    }

    let focal_length = 1.0 / (field_of_view / 2.0).tan();
    let depth = far - near;

    // `Mat4::new` takes its arguments in row-major order.
    #[rustfmt::skip]
    let projection = glm::Mat4::new(
        focal_length / aspect_ratio, 0.0,          0.0,                   0.0,
        0.0,                         focal_length, 0.0,                   0.0,
        0.0,                         0.0,          -(far + near) / depth, -2.0 * far * near / depth,
        0.0,                         0.0,          -1.0,                  0.0,
    );
    Ok(projection)
}

/// Remaps OpenGL clip-space depth (`[-1, 1]`) to the `[0, 1]` range wgpu rasterizes.
///
/// `x`, `y` and `w` pass through unchanged; `z' = 0.5 * z + 0.5 * w`.
pub fn opengl_to_wgpu_matrix() -> glm::Mat4 {
    #[rustfmt::skip]
    let correction = glm::Mat4::new(
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 0.5, 0.5,
        0.0, 0.0, 0.0, 1.0,
    );
    correction
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn clip_depth(projection: &glm::Mat4, view_z: f32) -> f32 {
        let clip = projection * glm::vec4(0.0, 0.0, view_z, 1.0);
        clip.z / clip.w
    }

    #[test]
    fn degrees_to_radians() {
        assert!((convert_degrees_to_radians(180.0) - PI).abs() < EPSILON);
        assert!((convert_degrees_to_radians(90.0) - PI / 2.0).abs() < EPSILON);
        assert_eq!(convert_degrees_to_radians(0.0), 0.0);
    }

    #[test]
    fn perspective_matches_opengl_formula() {
        let (near, far) = (0.1_f32, 20.0_f32);
        let projection =
            compute_perspective_projection_matrix(PI / 4.0, 640.0 / 480.0, near, far).unwrap();

        let expected_depth_scale = -(far + near) / (far - near);
        let expected_depth_offset = -2.0 * far * near / (far - near);
        assert!((projection[(2, 2)] - expected_depth_scale).abs() < EPSILON);
        assert!((projection[(2, 3)] - expected_depth_offset).abs() < EPSILON);
        assert_eq!(projection[(3, 2)], -1.0);
        assert_eq!(projection[(3, 3)], 0.0);

        let focal_length = 1.0 / (PI / 8.0).tan();
        assert!((projection[(1, 1)] - focal_length).abs() < EPSILON);
        assert!((projection[(0, 0)] - focal_length * 480.0 / 640.0).abs() < EPSILON);
    }

    #[test]
    fn near_and_far_planes_map_to_clip_bounds() {
        for &(fov, aspect, near, far) in &[
            (PI / 4.0, 640.0 / 480.0, 0.1, 20.0),
            (PI / 2.0, 1.0, 1.0, 100.0),
            (0.3, 2.5, 0.01, 0.5),
        ] {
            let projection = compute_perspective_projection_matrix(fov, aspect, near, far).unwrap();
            assert!((clip_depth(&projection, -near) + 1.0).abs() < 1e-4);
            assert!((clip_depth(&projection, -far) - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn degenerate_inputs_are_rejected() {
        assert_eq!(
            compute_perspective_projection_matrix(1.0, 1.0, 0.0, 10.0),
            Err(ProjectionError::NonPositiveNear(0.0))
        );
        assert_eq!(
            compute_perspective_projection_matrix(1.0, 1.0, 5.0, 5.0),
            Err(ProjectionError::FarNotBeyondNear { near: 5.0, far: 5.0 })
        );
        assert!(compute_perspective_projection_matrix(1.0, 0.0, 0.1, 10.0).is_err());
        assert!(compute_perspective_projection_matrix(PI, 1.0, 0.1, 10.0).is_err());
        assert!(compute_perspective_projection_matrix(f32::NAN, 1.0, 0.1, 10.0).is_err());
    }

    #[test]
    fn wgpu_correction_remaps_depth_range() {
        let projection =
            compute_perspective_projection_matrix(PI / 4.0, 1.0, 0.1, 20.0).unwrap();
        let corrected = opengl_to_wgpu_matrix() * projection;
        assert!(clip_depth(&corrected, -0.1).abs() < 1e-4);
        assert!((clip_depth(&corrected, -20.0) - 1.0).abs() < 1e-4);
    }
}
