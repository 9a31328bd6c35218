//! # Scene Module
//!
//! The scene is the fixed content of the viewer: a square pyramid and a cube, each paired
//! with its own texture, viewed through a single perspective projection.
//!
//! ## Meshes
//!
//! Both meshes are declared as tables of vertex records and index triples. Triangles are
//! wound counter-clockwise when seen from outside. Models and textures are paired by
//! position: the first texture of the configuration dresses the pyramid, the second the
//! cube.
//!
//! ## Projection
//!
//! The projection is built with the OpenGL depth convention and converted to wgpu's depth
//! range once, when it is computed. It is rebuilt only when its inputs change, which in a
//! non-resizable window means when the camera zoom changes.

use nalgebra_glm as glm;

use crate::config::SceneConfig;
use crate::gpu::Gpu;
use crate::model::{Model, ModelError};
use crate::shader_program::{ShaderError, ShaderProgram};
use crate::texture::Texture;
use crate::transform::{
    compute_perspective_projection_matrix, opengl_to_wgpu_matrix, ProjectionError,
};
use crate::vertex::Vertex;

/// Distance to the near clipping plane.
pub const NEAR_PLANE: f32 = 0.1;

/// Distance to the far clipping plane.
pub const FAR_PLANE: f32 = 20.0;

const RED: [f32; 3] = [1.0, 0.0, 0.0];
const GREEN: [f32; 3] = [0.0, 1.0, 0.0];
const BLUE: [f32; 3] = [0.0, 0.0, 1.0];

const PYRAMID_VERTICES: [Vertex; 5] = [
    Vertex::new([0.0, 0.0, 0.0], RED, [0.0, 0.0]),
    Vertex::new([2.0, 0.0, 0.0], GREEN, [0.0, 1.0]),
    Vertex::new([2.0, 0.0, 2.0], BLUE, [1.0, 0.0]),
    Vertex::new([0.0, 0.0, 2.0], RED, [1.0, 1.0]),
    // apex
    Vertex::new([1.0, 2.0, 1.0], GREEN, [0.0, 0.0]),
];

#[rustfmt::skip]
const PYRAMID_INDICES: [u32; 18] = [
    0, 3, 2,
    0, 2, 1,
    0, 4, 1,
    0, 3, 4,
    3, 2, 4,
    2, 1, 4,
];

const CUBE_VERTICES: [Vertex; 8] = [
    Vertex::new([0.0, 0.0, 0.0], RED, [0.0, 0.0]),
    Vertex::new([2.0, 0.0, 0.0], GREEN, [0.0, 1.0]),
    Vertex::new([2.0, 0.0, 2.0], BLUE, [1.0, 0.0]),
    Vertex::new([0.0, 0.0, 2.0], RED, [1.0, 1.0]),
    Vertex::new([0.0, 2.0, 0.0], RED, [0.0, 0.0]),
    Vertex::new([2.0, 2.0, 0.0], GREEN, [0.0, 1.0]),
    Vertex::new([2.0, 2.0, 2.0], BLUE, [1.0, 0.0]),
    Vertex::new([0.0, 2.0, 2.0], RED, [1.0, 1.0]),
];

#[rustfmt::skip]
const CUBE_INDICES: [u32; 36] = [
    0, 3, 2,
    0, 2, 1,
    0, 4, 1,
    1, 5, 2,
    2, 6, 3,
    3, 7, 0,
    4, 5, 1,
    5, 6, 2,
    6, 7, 3,
    7, 4, 0,
    4, 7, 5,
    5, 7, 6,
];

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Shader(#[from] ShaderError),

    #[error("invalid projection: {0}")]
    Projection(#[from] ProjectionError),
}

/// The square pyramid, standing on the `y = 0` plane left of the view axis.
pub fn pyramid() -> Result<Model, ModelError> {
    Model::new(
        "pyramid",
        glm::vec3(1.0, 1.0, 1.0),
        glm::vec3(-3.0, -1.0, -15.0),
        PYRAMID_VERTICES.to_vec(),
        PYRAMID_INDICES.to_vec(),
    )
}

/// The cube, an edge length of 2, right of the view axis.
pub fn cube() -> Result<Model, ModelError> {
    Model::new(
        "cube",
        glm::vec3(1.0, 1.0, 1.0),
        glm::vec3(1.0, -1.0, -15.0),
        CUBE_VERTICES.to_vec(),
        CUBE_INDICES.to_vec(),
    )
}

/// Perspective projection of the scene in wgpu clip space.
pub fn scene_projection(
    field_of_view: f32,
    aspect_ratio: f32,
) -> Result<glm::Mat4, ProjectionError> {
    let projection =
        compute_perspective_projection_matrix(field_of_view, aspect_ratio, NEAR_PLANE, FAR_PLANE)?;
    Ok(opengl_to_wgpu_matrix() * projection)
}

pub struct Scene {
    models: Vec<Model>,
    textures: Vec<Texture>,
    projection: glm::Mat4,
    projection_inputs: (f32, f32),
}

impl Scene {
    /// Builds both models, uploads them once and loads their textures.
    pub fn new(
        gpu: &Gpu,
        shader_program: &ShaderProgram,
        config: &SceneConfig,
        field_of_view: f32,
        aspect_ratio: f32,
    ) -> Result<Self, SceneError> {
        let projection = scene_projection(field_of_view, aspect_ratio)?;

        let mut models = vec![pyramid()?, cube()?];
        for model in &mut models {
            model.set_vertices_into_gpu(&gpu.device, shader_program)?;
        }

        let texture_layout = shader_program.texture_layout()?;
        let textures = [&config.texture1_filepath, &config.texture2_filepath]
            .into_iter()
            .map(|path| Texture::load(&gpu.device, &gpu.queue, texture_layout, path))
            .collect();

        log::info!("Scene ready with {} models", models.len());

        Ok(Self {
            models,
            textures,
            projection,
            projection_inputs: (field_of_view, aspect_ratio),
        })
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn projection(&self) -> &glm::Mat4 {
        &self.projection
    }

    /// Rebuilds the projection if either input differs from the last build.
    ///
    /// Returns whether the projection changed. On error the previous projection is kept.
    pub fn update_projection(
        &mut self,
        field_of_view: f32,
        aspect_ratio: f32,
    ) -> Result<bool, ProjectionError> {
        if self.projection_inputs == (field_of_view, aspect_ratio) {
            return Ok(false);
        }
        self.projection = scene_projection(field_of_view, aspect_ratio)?;
        self.projection_inputs = (field_of_view, aspect_ratio);
        log::debug!(
            "Rebuilt projection: fov {:.1} deg, aspect {aspect_ratio:.3}",
            field_of_view.to_degrees()
        );
        Ok(true)
    }

    /// Draws every model with its texture. `shader_program` must be in use on the pass.
    pub fn render(
        &self,
        render_pass: &mut wgpu::RenderPass<'_>,
        queue: &wgpu::Queue,
        shader_program: &ShaderProgram,
        view: &glm::Mat4,
    ) {
        for (model, texture) in self.models.iter().zip(&self.textures) {
            if let Err(error) = model.draw(
                render_pass,
                queue,
                shader_program,
                &self.projection,
                view,
                texture,
            ) {
                log::warn!("Skipped drawing `{}`: {error}", model.name());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::convert_degrees_to_radians;

    #[test]
    fn pyramid_has_five_vertices_and_six_faces() {
        let pyramid = pyramid().unwrap();
        assert_eq!(pyramid.vertex_count(), 5);
        assert_eq!(pyramid.triangle_count(), 6);
        assert_eq!(pyramid.draw_call().indices, 0..18);
    }

    #[test]
    fn cube_populates_all_eight_corners() {
        let cube = cube().unwrap();
        assert_eq!(cube.vertex_count(), 8);
        assert_eq!(cube.triangle_count(), 12);

        let mut corners: Vec<[f32; 3]> = cube.vertices().iter().map(|v| v.position).collect();
        corners.sort_by(|a, b| a.partial_cmp(b).unwrap());
        corners.dedup();
        assert_eq!(corners.len(), 8);
        assert!(corners
            .iter()
            .all(|corner| corner.iter().all(|&c| c == 0.0 || c == 2.0)));
    }

    #[test]
    fn every_cube_corner_is_referenced() {
        let cube = cube().unwrap();
        for corner in 0..8u32 {
            assert!(cube.indices().contains(&corner), "corner {corner} unused");
        }
    }

    #[test]
    fn models_sit_in_front_of_the_initial_camera() {
        for model in [pyramid().unwrap(), cube().unwrap()] {
            let origin = model.world_matrix() * glm::vec4(0.0, 0.0, 0.0, 1.0);
            assert!(-origin.z > NEAR_PLANE && -origin.z < FAR_PLANE);
        }
    }

    #[test]
    fn projection_maps_clip_planes_to_wgpu_depth_range() {
        let projection =
            scene_projection(convert_degrees_to_radians(45.0), 640.0 / 480.0).unwrap();

        let near = projection * glm::vec4(0.0, 0.0, -NEAR_PLANE, 1.0);
        let far = projection * glm::vec4(0.0, 0.0, -FAR_PLANE, 1.0);
        assert!((near.z / near.w).abs() < 1e-5);
        assert!((far.z / far.w - 1.0).abs() < 1e-5);
    }

    #[test]
    fn projection_rejects_zero_aspect() {
        assert!(scene_projection(convert_degrees_to_radians(45.0), 0.0).is_err());
    }
}
