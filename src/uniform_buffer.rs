//! # Uniform Buffer
//!
//! This module defines the `Transforms` struct, the uniform block every model uploads
//! before it is drawn. It carries the three matrices the vertex stage combines as
//! `projection * view * model * position`.
//!
//! ## Overview
//!
//! - **Model**: scale, then translate the mesh into world space.
//! - **View**: world space into the camera's frame, derived from the camera pose.
//! - **Projection**: camera frame into clip space.
//!
//! ### Memory Layout and Traits
//!
//! - `#[repr(C)]`: matches the WGSL struct declaration field by field.
//! - `bytemuck::Pod` and `bytemuck::Zeroable`: allow the struct to be written into a
//!   `wgpu::Buffer` as raw bytes.
//!
//! Three `mat4x4<f32>` occupy 192 bytes, a multiple of WGSL's 16-byte uniform alignment, so
//! no padding is needed.

/// The per-draw transformation uniforms read by the vertex stage.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Transforms {
    /// World matrix of the model being drawn (translation * scale).
    pub model: nalgebra_glm::Mat4,

    /// View matrix of the active camera.
    pub view: nalgebra_glm::Mat4,

    /// Projection matrix, already converted to wgpu's clip-space depth range.
    pub projection: nalgebra_glm::Mat4,
}

impl Default for Transforms {
    fn default() -> Self {
        Self {
            model: nalgebra_glm::Mat4::identity(),
            view: nalgebra_glm::Mat4::identity(),
            projection: nalgebra_glm::Mat4::identity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_wgsl_block_size() {
        assert_eq!(std::mem::size_of::<Transforms>(), 3 * 64);
    }

    #[test]
    fn matrices_are_column_major_in_memory() {
        let transforms = Transforms {
            model: nalgebra_glm::translation(&nalgebra_glm::vec3(1.0, 2.0, 3.0)),
            ..Default::default()
        };
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&transforms));
        // The translation lives in the fourth column of the model matrix.
        assert_eq!(&floats[12..15], &[1.0, 2.0, 3.0]);
    }
}
