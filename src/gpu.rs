//! # GPU Management Module
//!
//! The `gpu` module owns the device-side context of the viewer: the window surface, the
//! logical device and its queue, and the surface configuration.
//!
//! ## Overview
//!
//! [`Gpu::new_async`] walks the usual wgpu bring-up: create an instance, a surface for the
//! window, pick an adapter that can present to it, then request a device. The device
//! negotiates one optional feature, line polygon mode, which the wireframe pipeline needs;
//! adapters without it still work and simply render filled polygons.
//!
//! Device errors that happen outside an error scope are routed to
//! [`crate::input::on_device_error`], which logs them and terminates the process.
//!
//! ## Example Usage
//!
//! ```ignore
//! let gpu = Gpu::new_async(window.clone(), width, height).await?;
//! let depth = gpu.create_depth_texture(width, height);
//! ```

use wgpu::InstanceDescriptor;

use crate::input::on_device_error;
use crate::renderer::Renderer;

/// Failures while bringing up the device context.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("failed to create a window surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("no graphics adapter can present to the window surface")]
    NoAdapter,

    #[error("failed to request a graphics device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("the window surface reports no supported texture formats")]
    NoSurfaceFormat,
}

/// A struct representing the GPU-related resources and configurations required for rendering.
///
/// # Fields
/// - `surface`: the presentation target tied to the window.
/// - `device`: creates every buffer, texture and pipeline of the viewer.
/// - `queue`: receives uniform/texture writes and the per-frame command buffer.
/// - `surface_config`: size, format and present mode of the surface.
/// - `surface_format`: the color format the scene and HUD pipelines render into.
/// - `supports_wireframe`: whether `POLYGON_MODE_LINE` was granted.
pub struct Gpu {
    /// The surface associated with the window.
    ///
    /// Reconfigured whenever the swapchain is reported lost or outdated.
    pub surface: wgpu::Surface<'static>,

    /// The logical device.
    pub device: wgpu::Device,

    /// The command queue of [`Gpu::device`].
    pub queue: wgpu::Queue,

    /// The configuration the surface was last configured with.
    pub surface_config: wgpu::SurfaceConfiguration,

    /// The texture format used by the surface, obtained from the surface's capabilities.
    ///
    /// A non-sRGB format is preferred because egui writes gamma-encoded colors.
    pub surface_format: wgpu::TextureFormat,

    /// Whether the device was created with `POLYGON_MODE_LINE`.
    pub supports_wireframe: bool,
}

impl Gpu {
    /// Aspect ratio of the surface, computed in floating point.
    ///
    /// The height is clamped to 1 so a minimised window never divides by zero.
    pub fn aspect_ratio(&self) -> f32 {
        self.surface_config.width as f32 / self.surface_config.height.max(1) as f32
    }

    /// Resizes the surface. Zero-sized requests are ignored; wgpu rejects them.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.reconfigure();
    }

    /// Configures the surface again with the current configuration.
    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Creates a depth attachment of the given size in [`Renderer::DEPTH_FORMAT`].
    pub fn create_depth_texture(&self, width: u32, height: u32) -> wgpu::TextureView {
        let texture = self.device.create_texture(
            &(wgpu::TextureDescriptor {
                label: Some("Depth Texture"),
                size: wgpu::Extent3d {
                    width: width.max(1),
                    height: height.max(1),
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: Renderer::DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            }),
        );
        texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Depth Texture View"),
            format: Some(Renderer::DEPTH_FORMAT),
            dimension: Some(wgpu::TextureViewDimension::D2),
            aspect: wgpu::TextureAspect::All,
            ..Default::default()
        })
    }

    /// Creates the device context for `window`, sized to its framebuffer.
    ///
    /// # Errors
    ///
    /// Returns a [`GpuError`] when the surface, adapter or device cannot be created.
    pub async fn new_async(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&InstanceDescriptor::default());
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let info = adapter.get_info();
        log::info!("Using adapter {} ({:?})", info.name, info.backend);
        log::debug!("Adapter features: {:#?}", adapter.features());

        let optional_features = wgpu::Features::POLYGON_MODE_LINE;
        let required_features = adapter.features() & optional_features;
        let supports_wireframe = required_features.contains(wgpu::Features::POLYGON_MODE_LINE);
        if !supports_wireframe {
            log::warn!("Adapter lacks line polygon mode; wireframe rendering falls back to fill");
        }

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Scene Device"),
                    memory_hints: wgpu::MemoryHints::default(),
                    required_features,
                    required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                },
                None,
            )
            .await?;

        device.on_uncaptured_error(Box::new(on_device_error));

        let surface_capabilities = surface.get_capabilities(&adapter);
        let surface_format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or(GpuError::NoSurfaceFormat)?;
        let alpha_mode = surface_capabilities
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);
        log::info!(
            "Configured {}x{} surface with format {surface_format:?}",
            surface_config.width,
            surface_config.height
        );

        Ok(Self {
            surface,
            device,
            queue,
            surface_config,
            surface_format,
            supports_wireframe,
        })
    }
}
