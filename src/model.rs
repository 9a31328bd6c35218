//! # Model Module
//!
//! A `Model` is one mesh of the scene: its vertex table, its triangle list, where it sits in
//! the world, and (once uploaded) the GPU buffers that hold it.
//!
//! ## Lifecycle
//!
//! 1. [`Model::new`] stores the literal data and checks that it describes whole triangles
//!    over existing vertices. The device is not touched.
//! 2. [`Model::set_vertices_into_gpu`] creates the vertex, index and uniform buffers. It
//!    succeeds exactly once per model; a second call is refused instead of leaking or
//!    replacing live buffers.
//! 3. [`Model::draw`] runs every frame. It uploads the model/view/projection uniforms,
//!    binds the texture and buffers, and issues a single indexed draw over every index.
//! 4. Dropping the model destroys whatever buffers were uploaded.
//!
//! ## World transform
//!
//! The world matrix is `translation * scale`: vertices are scaled about the model origin
//! first, then moved into place.

use nalgebra_glm as glm;

use crate::shader_program::{ShaderError, ShaderProgram};
use crate::texture::Texture;
use crate::uniform_binding::UniformBinding;
use crate::uniform_buffer::Transforms;
use crate::vertex::Vertex;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("index {index} at position {position} is out of bounds for {vertex_count} vertices")]
    IndexOutOfBounds {
        position: usize,
        index: u32,
        vertex_count: usize,
    },

    #[error("{0} indices do not form whole triangles")]
    IncompleteTriangle(usize),

    #[error("model `{0}` has already been uploaded to the GPU")]
    AlreadyUploaded(String),

    #[error("model `{0}` has not been uploaded to the GPU")]
    NotUploaded(String),

    #[error(transparent)]
    Shader(#[from] ShaderError),
}

/// Parameters of the single indexed draw a model issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawCall {
    pub indices: std::ops::Range<u32>,
    pub base_vertex: i32,
    pub instances: std::ops::Range<u32>,
}

/// GPU resources owned by an uploaded model.
struct ModelBuffers {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    uniform: UniformBinding,
}

impl ModelBuffers {
    fn destroy(&self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
        self.uniform.buffer.destroy();
    }
}

pub struct Model {
    name: String,
    scale: glm::Vec3,
    translation: glm::Vec3,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    buffers: Option<ModelBuffers>,
}

impl Model {
    /// Creates a model from literal mesh data.
    ///
    /// # Errors
    ///
    /// [`ModelError::IncompleteTriangle`] when the index count is not a multiple of three,
    /// [`ModelError::IndexOutOfBounds`] when an index names a vertex that does not exist.
    pub fn new(
        name: impl Into<String>,
        scale: glm::Vec3,
        translation: glm::Vec3,
        vertices: Vec<Vertex>,
        indices: Vec<u32>,
    ) -> Result<Self, ModelError> {
        if indices.len() % 3 != 0 {
            return Err(ModelError::IncompleteTriangle(indices.len()));
        }
        if let Some((position, &index)) = indices
            .iter()
            .enumerate()
            .find(|(_, index)| **index as usize >= vertices.len())
        {
            return Err(ModelError::IndexOutOfBounds {
                position,
                index,
                vertex_count: vertices.len(),
            });
        }

        Ok(Self {
            name: name.into(),
            scale,
            translation,
            vertices,
            indices,
            buffers: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_uploaded(&self) -> bool {
        self.buffers.is_some()
    }

    /// `translation * scale`.
    pub fn world_matrix(&self) -> glm::Mat4 {
        glm::translation(&self.translation) * glm::scaling(&self.scale)
    }

    /// The indexed draw that covers every stored index once.
    pub fn draw_call(&self) -> DrawCall {
        DrawCall {
            indices: 0..self.indices.len() as u32,
            base_vertex: 0,
            instances: 0..1,
        }
    }

    /// Uploads the vertex and index data and allocates this model's uniform buffer.
    ///
    /// # Errors
    ///
    /// [`ModelError::AlreadyUploaded`] on a second call (until [`Model::release`]), and
    /// [`ModelError::Shader`] when `shader_program` is not linked.
    pub fn set_vertices_into_gpu(
        &mut self,
        device: &wgpu::Device,
        shader_program: &ShaderProgram,
    ) -> Result<(), ModelError> {
        self.ensure_not_uploaded()?;
        let uniform_layout = shader_program.uniform_layout()?;
        self.upload(device, uniform_layout)
    }

    /// Creates the buffers against an explicit uniform bind group layout.
    fn upload(
        &mut self,
        device: &wgpu::Device,
        uniform_layout: &wgpu::BindGroupLayout,
    ) -> Result<(), ModelError> {
        self.ensure_not_uploaded()?;

        let vertex_buffer = wgpu::util::DeviceExt::create_buffer_init(
            device,
            &wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Vertex Buffer", self.name)),
                contents: bytemuck::cast_slice(&self.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            },
        );

        let index_buffer = wgpu::util::DeviceExt::create_buffer_init(
            device,
            &wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Index Buffer", self.name)),
                contents: bytemuck::cast_slice(&self.indices),
                usage: wgpu::BufferUsages::INDEX,
            },
        );

        let uniform = UniformBinding::new(
            device,
            uniform_layout,
            &format!("{} Uniform Buffer", self.name),
        );

        log::debug!(
            "Uploaded model `{}`: {} vertices, {} triangles",
            self.name,
            self.vertex_count(),
            self.triangle_count()
        );

        self.buffers = Some(ModelBuffers {
            vertex_buffer,
            index_buffer,
            uniform,
        });
        Ok(())
    }

    /// Draws the model with `shader_program`, which must already be in use on `render_pass`.
    ///
    /// Leaves this model's buffers and bind groups bound on the pass.
    pub fn draw(
        &self,
        render_pass: &mut wgpu::RenderPass<'_>,
        queue: &wgpu::Queue,
        shader_program: &ShaderProgram,
        projection: &glm::Mat4,
        view: &glm::Mat4,
        texture: &Texture,
    ) -> Result<(), ModelError> {
        let buffers = self.uploaded_buffers()?;

        let transforms = Transforms {
            model: self.world_matrix(),
            view: *view,
            projection: *projection,
        };
        shader_program.set_transforms(render_pass, queue, &buffers.uniform, transforms)?;
        shader_program.set_texture(render_pass, texture)?;

        render_pass.set_vertex_buffer(0, buffers.vertex_buffer.slice(..));
        render_pass.set_index_buffer(buffers.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

        let DrawCall {
            indices,
            base_vertex,
            instances,
        } = self.draw_call();
        render_pass.draw_indexed(indices, base_vertex, instances);
        Ok(())
    }

    fn ensure_not_uploaded(&self) -> Result<(), ModelError> {
        match self.buffers {
            Some(_) => Err(ModelError::AlreadyUploaded(self.name.clone())),
            None => Ok(()),
        }
    }

    fn uploaded_buffers(&self) -> Result<&ModelBuffers, ModelError> {
        self.buffers
            .as_ref()
            .ok_or_else(|| ModelError::NotUploaded(self.name.clone()))
    }

    /// Destroys the GPU buffers, if any. The model can be uploaded again afterwards.
    pub fn release(&mut self) {
        if let Some(buffers) = self.buffers.take() {
            buffers.destroy();
            log::debug!("Released GPU buffers of model `{}`", self.name);
        }
    }
}

impl Drop for Model {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Vec<Vertex> {
        vec![
            Vertex::new([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0]),
            Vertex::new([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0]),
            Vertex::new([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
        ]
    }

    #[test]
    fn draw_call_covers_every_index() {
        let model = Model::new(
            "quad",
            glm::vec3(1.0, 1.0, 1.0),
            glm::Vec3::zeros(),
            vec![triangle(), vec![Vertex::new([1.0, 1.0, 0.0], [1.0; 3], [1.0, 1.0])]].concat(),
            vec![0, 1, 2, 2, 1, 3],
        )
        .unwrap();

        assert_eq!(
            model.draw_call(),
            DrawCall {
                indices: 0..6,
                base_vertex: 0,
                instances: 0..1,
            }
        );
        assert!(model
            .indices()
            .iter()
            .all(|&index| (index as usize) < model.vertex_count()));
    }

    #[test]
    fn out_of_bounds_index_is_rejected() {
        let error = Model::new(
            "broken",
            glm::vec3(1.0, 1.0, 1.0),
            glm::Vec3::zeros(),
            triangle(),
            vec![0, 1, 3],
        )
        .err();
        assert_eq!(
            error,
            Some(ModelError::IndexOutOfBounds {
                position: 2,
                index: 3,
                vertex_count: 3,
            })
        );
    }

    #[test]
    fn partial_triangle_is_rejected() {
        let error = Model::new(
            "broken",
            glm::vec3(1.0, 1.0, 1.0),
            glm::Vec3::zeros(),
            triangle(),
            vec![0, 1],
        )
        .err();
        assert_eq!(error, Some(ModelError::IncompleteTriangle(2)));
    }

    #[test]
    fn world_matrix_scales_before_translating() {
        let model = Model::new(
            "scaled",
            glm::vec3(2.0, 3.0, 4.0),
            glm::vec3(-3.0, -1.0, -15.0),
            triangle(),
            vec![0, 1, 2],
        )
        .unwrap();

        let corner = model.world_matrix() * glm::vec4(1.0, 1.0, 1.0, 1.0);
        // Scale first: (2, 3, 4); then translate.
        assert_eq!(corner, glm::vec4(-1.0, 2.0, -11.0, 1.0));
    }

    fn triangle_model(name: &str) -> Model {
        Model::new(
            name,
            glm::vec3(1.0, 1.0, 1.0),
            glm::Vec3::zeros(),
            triangle(),
            vec![0, 1, 2],
        )
        .unwrap()
    }

    /// A device on whatever adapter is available, or `None` on machines without one.
    fn headless_device() -> Option<(wgpu::Device, wgpu::Queue)> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter =
            pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))?;
        pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default(), None)).ok()
    }

    #[test]
    fn fresh_model_refuses_to_draw() {
        let model = triangle_model("fresh");
        assert!(model.ensure_not_uploaded().is_ok());
        assert_eq!(
            model.uploaded_buffers().err(),
            Some(ModelError::NotUploaded("fresh".to_string()))
        );
    }

    #[test]
    fn second_upload_is_refused_until_released() {
        let Some((device, _queue)) = headless_device() else {
            eprintln!("no graphics adapter available; skipping");
            return;
        };
        let layout = UniformBinding::create_layout(&device);
        let mut model = triangle_model("twice");

        model.upload(&device, &layout).unwrap();
        assert!(model.is_uploaded());
        assert!(model.uploaded_buffers().is_ok());
        assert_eq!(
            model.upload(&device, &layout).err(),
            Some(ModelError::AlreadyUploaded("twice".to_string()))
        );
        assert_eq!(
            model.set_vertices_into_gpu(&device, &ShaderProgram::new()).err(),
            Some(ModelError::AlreadyUploaded("twice".to_string()))
        );

        model.release();
        assert!(!model.is_uploaded());
        model.upload(&device, &layout).unwrap();
    }

    #[test]
    fn upload_needs_a_linked_program() {
        let Some((device, _queue)) = headless_device() else {
            eprintln!("no graphics adapter available; skipping");
            return;
        };
        let mut model = triangle_model("unlinked");
        assert_eq!(
            model.set_vertices_into_gpu(&device, &ShaderProgram::new()).err(),
            Some(ModelError::Shader(ShaderError::NotLinked))
        );
        assert!(!model.is_uploaded());
    }

    #[test]
    fn new_model_is_not_uploaded() {
        let model = Model::new(
            "fresh",
            glm::vec3(1.0, 1.0, 1.0),
            glm::Vec3::zeros(),
            triangle(),
            vec![0, 1, 2],
        )
        .unwrap();
        assert!(!model.is_uploaded());
        assert_eq!(model.triangle_count(), 1);
    }
}
