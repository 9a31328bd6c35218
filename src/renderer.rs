//! # Renderer Module
//!
//! The renderer owns everything that lives on the device: the [`Gpu`] context, the depth
//! target, the linked [`ShaderProgram`], the [`Scene`] and the egui renderer used for the
//! HUD. Each frame is encoded into a single render pass that clears to black, draws the
//! scene and then draws the HUD on top.
//!
//! ## Surface errors
//!
//! A lost or outdated swapchain is reconfigured and the frame is skipped; a timeout only
//! skips the frame. Running out of memory is returned to the caller, which treats it as
//! fatal.

// The view matrix arrives from the camera controller as a glm matrix.
use nalgebra_glm as glm;

use crate::config::SceneConfig;
use crate::gpu::{Gpu, GpuError};
use crate::scene::{Scene, SceneError};
use crate::shader_program::{ShaderError, ShaderProgram};
use crate::transform::ProjectionError;
use crate::{FRAGMENT_SHADER_SOURCE, VERTEX_SHADER_SOURCE};

/// Failures while building the renderer. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    /// No surface, adapter or device.
    #[error(transparent)]
    Gpu(#[from] GpuError),

    #[error("failed to create the shader program: {0}")]
    Shader(#[from] ShaderError),

    #[error("failed to build the scene: {0}")]
    Scene(#[from] SceneError),
}

/// Owns the device context and everything drawn with it.
pub struct Renderer {
    /// Surface, device and queue.
    gpu: Gpu,

    /// Depth attachment matching the surface size, cleared to 1.0 every frame.
    depth_texture_view: wgpu::TextureView,

    /// Draws the HUD after the scene, in the same render pass.
    egui_renderer: egui_wgpu::Renderer,

    /// The linked scene program with its fill and (if supported) wireframe pipelines.
    shader_program: ShaderProgram,

    /// Models, textures and the projection.
    scene: Scene,
}

impl Renderer {
    /// Format of the depth attachment, shared by the scene pipelines and the HUD.
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Brings up the device, links the scene shaders and builds the scene.
    ///
    /// `field_of_view` (radians) seeds the initial projection.
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        config: &SceneConfig,
        field_of_view: f32,
    ) -> Result<Self, RendererError> {
        let gpu = Gpu::new_async(window, width, height).await?;
        let depth_texture_view = gpu.create_depth_texture(width, height);

        let egui_renderer = egui_wgpu::Renderer::new(
            &gpu.device,
            gpu.surface_config.format,
            Some(Self::DEPTH_FORMAT),
            1,
            false,
        );

        let mut shader_program = ShaderProgram::new();
        shader_program.load_vertex_shader_from_source(VERTEX_SHADER_SOURCE);
        shader_program.load_fragment_shader_from_source(FRAGMENT_SHADER_SOURCE);
        shader_program.create(&gpu)?;

        let scene = Scene::new(
            &gpu,
            &shader_program,
            config,
            field_of_view,
            gpu.aspect_ratio(),
        )?;

        Ok(Self {
            gpu,
            depth_texture_view,
            egui_renderer,
            shader_program,
            scene,
        })
    }

    /// Resizes the surface and recreates the depth attachment; zero sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.gpu.resize(width, height);
        self.depth_texture_view = self.gpu.create_depth_texture(width, height);
    }

    /// Whether wireframe requests are honoured rather than falling back to fill.
    pub fn supports_wireframe(&self) -> bool {
        self.shader_program.supports_wireframe()
    }

    /// Rebuilds the projection for `field_of_view` (radians) if it changed.
    pub fn update_projection(&mut self, field_of_view: f32) -> Result<bool, ProjectionError> {
        let aspect_ratio = self.gpu.aspect_ratio();
        self.scene.update_projection(field_of_view, aspect_ratio)
    }

    /// Encodes, submits and presents one frame.
    ///
    /// # Errors
    ///
    /// Only [`wgpu::SurfaceError::OutOfMemory`] is returned; every other surface error is
    /// handled here by skipping the frame.
    pub fn render_frame(
        &mut self,
        view: &glm::Mat4,
        wireframe: bool,
        screen_descriptor: egui_wgpu::ScreenDescriptor,
        paint_jobs: Vec<egui::epaint::ClippedPrimitive>,
        textures_delta: egui::TexturesDelta,
    ) -> Result<(), wgpu::SurfaceError> {
        for (id, image_delta) in &textures_delta.set {
            self.egui_renderer
                .update_texture(&self.gpu.device, &self.gpu.queue, *id, image_delta);
        }

        for id in &textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        self.egui_renderer.update_buffers(
            &self.gpu.device,
            &self.gpu.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        let surface_texture = match self.gpu.surface.get_current_texture() {
            Ok(surface_texture) => surface_texture,
            Err(error @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                log::warn!("Surface {error}; reconfiguring");
                self.gpu.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                return Err(wgpu::SurfaceError::OutOfMemory);
            }
            Err(error) => {
                log::warn!("Skipping frame: {error}");
                return Ok(());
            }
        };

        let surface_texture_view =
            surface_texture
                .texture
                .create_view(&wgpu::TextureViewDescriptor {
                    label: Some("Surface Texture View"),
                    format: Some(self.gpu.surface_format),
                    ..Default::default()
                });

        encoder.insert_debug_marker("Render scene");

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            match self.shader_program.use_program(&mut render_pass, wireframe) {
                Ok(()) => self.scene.render(
                    &mut render_pass,
                    &self.gpu.queue,
                    &self.shader_program,
                    view,
                ),
                Err(error) => log::warn!("Skipping scene: {error}"),
            }

            self.egui_renderer.render(
                &mut render_pass.forget_lifetime(),
                &paint_jobs,
                &screen_descriptor,
            );
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        Ok(())
    }
}
