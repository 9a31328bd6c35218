//! # Vertex Module
//!
//! This module provides the `Vertex` record shared by every model in the scene and the
//! methods that describe its memory layout to the GPU.
//!
//! Each vertex carries eight floats, always in the same order:
//!
//! | rows  | attribute  | shader location |
//! |-------|------------|-----------------|
//! | 0..3  | position   | 0               |
//! | 3..6  | color      | 1               |
//! | 6..8  | texel (uv) | 2               |
//!
//! A model's vertex table is a slice of these records, one record per vertex, so the
//! table can be uploaded with `bytemuck::cast_slice` without any repacking.
//!
//! ## Usage
//!
//! ```ignore
//! use wgpu::util::DeviceExt;
//!
//! let vertices = [
//!     Vertex::new([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0]),
//!     Vertex::new([2.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 1.0]),
//!     Vertex::new([1.0, 2.0, 1.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
//! ];
//!
//! let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
//!     label: Some("Vertex Buffer"),
//!     contents: bytemuck::cast_slice(&vertices),
//!     usage: wgpu::BufferUsages::VERTEX,
//! });
//! ```

/// Number of `f32` values in one vertex record (3 position + 3 color + 2 texel).
pub const VERTEX_ROWS: usize = 8;

/// Shader locations of the fixed vertex attributes, in record order.
pub const VERTEX_LOCATIONS: [u32; 3] = [0, 1, 2];

/// Represents a single vertex of a mesh: its position, color and texture coordinate.
///
/// The struct is `#[repr(C)]` and `Pod`, so a slice of vertices is directly uploadable
/// into a vertex buffer.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Model-space position.
    pub position: [f32; 3],

    /// RGB color, each channel in `[0, 1]`.
    pub color: [f32; 3],

    /// Texture coordinate.
    pub texel: [f32; 2],
}

impl Vertex {
    pub const fn new(position: [f32; 3], color: [f32; 3], texel: [f32; 2]) -> Self {
        Self {
            position,
            color,
            texel,
        }
    }

    /// Returns the vertex attributes in shader-location order.
    ///
    /// - location `0`: position (`Float32x3`)
    /// - location `1`: color (`Float32x3`)
    /// - location `2`: texel (`Float32x2`)
    pub fn vertex_attributes() -> Vec<wgpu::VertexAttribute> {
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2].to_vec()
    }

    /// Describes how a buffer of `Vertex` records is laid out in GPU memory.
    ///
    /// `attributes` is usually the result of [`Vertex::vertex_attributes`]; it is taken as a
    /// parameter so the returned layout can borrow it for as long as the pipeline descriptor
    /// needs it.
    pub fn description(attributes: &[wgpu::VertexAttribute]) -> wgpu::VertexBufferLayout {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_is_eight_floats() {
        assert_eq!(
            std::mem::size_of::<Vertex>(),
            VERTEX_ROWS * std::mem::size_of::<f32>()
        );
    }

    #[test]
    fn attributes_follow_record_order() {
        let attributes = Vertex::vertex_attributes();
        let locations: Vec<u32> = attributes.iter().map(|a| a.shader_location).collect();
        assert_eq!(locations, VERTEX_LOCATIONS);

        let offsets: Vec<u64> = attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24]);
    }

    #[test]
    fn cast_keeps_column_layout() {
        let vertex = Vertex::new([1.0, 2.0, 3.0], [0.1, 0.2, 0.3], [0.5, 0.75]);
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&vertex));
        assert_eq!(floats, &[1.0, 2.0, 3.0, 0.1, 0.2, 0.3, 0.5, 0.75]);
    }
}
