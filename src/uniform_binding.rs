//! # Uniform Binding Module
//!
//! This module defines the `UniformBinding` struct, which owns one model's uniform buffer
//! and the bind group that exposes it to the vertex stage at `@group(0) @binding(0)`.
//!
//! ## Overview
//!
//! Every model owns its own binding. wgpu applies `Queue::write_buffer` calls at the next
//! submit, before any recorded command runs, so two models sharing one buffer within a frame
//! would both see the last write.
//!
//! The bind group layout is shared: the shader program creates it once with
//! [`UniformBinding::create_layout`] and every binding is built against that layout.
//!
//! ## Example
//!
//! ```ignore
//! let layout = UniformBinding::create_layout(&device);
//! let binding = UniformBinding::new(&device, &layout, "Pyramid Uniforms");
//! binding.update_buffer(&queue, Transforms::default());
//! render_pass.set_bind_group(0, &binding.bind_group, &[]);
//! ```

use crate::uniform_buffer::Transforms;

/// Represents the binding of one model's uniform buffer to the GPU pipeline.
pub struct UniformBinding {
    /// The GPU buffer holding a [`Transforms`] block.
    ///
    /// Created with `UNIFORM | COPY_DST` usage so the CPU can rewrite it every frame.
    pub buffer: wgpu::Buffer,

    /// The bind group that exposes `buffer` at binding `0`.
    pub bind_group: wgpu::BindGroup,
}

impl UniformBinding {
    /// Creates the bind group layout every `UniformBinding` is built against.
    ///
    /// A single uniform buffer at binding `0`, visible to the vertex stage only, with a
    /// minimum size of one [`Transforms`] block.
    pub fn create_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<Transforms>() as wgpu::BufferAddress,
                    ),
                },
                count: None,
            }],
            label: Some("transforms_bind_group_layout"),
        })
    }

    /// Allocates a uniform buffer initialised with identity matrices and binds it.
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, label: &str) -> Self {
        let buffer = wgpu::util::DeviceExt::create_buffer_init(
            device,
            &wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(&[Transforms::default()]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            },
        );

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some(label),
        });

        Self { buffer, bind_group }
    }

    /// Writes a new [`Transforms`] block into the buffer.
    ///
    /// The write is staged on the queue and lands before the next submitted command buffer
    /// executes.
    pub fn update_buffer(&self, queue: &wgpu::Queue, transforms: Transforms) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[transforms]))
    }
}
