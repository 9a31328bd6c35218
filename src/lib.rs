//! # Scene Viewer Library
//!
//! A minimal real-time 3D scene viewer built on wgpu and winit. It opens a fixed-size
//! window, links a vertex/fragment shader pair, uploads two hard-coded meshes (a square
//! pyramid and a cube) with their textures, and renders them every frame while a
//! free-flying camera is driven from the keyboard, the mouse and the scroll wheel.
//!
//! ## Modules
//!
//! - [`app`]: the winit application handler, lifecycle state machine and HUD.
//! - [`renderer`]: per-frame encoding, surface error recovery and presentation.
//! - [`gpu`]: adapter, device, queue and surface setup.
//! - [`scene`]: the pyramid and cube tables, their textures and the projection.
//! - [`shader_program`]: WGSL validation, stage linking and render pipelines.
//! - [`model`]: a mesh with its world transform and device buffers.
//! - [`texture`]: image decoding, placeholder fallback and mip chains.
//! - [`camera`]: the camera pose and the controller that mutates it.
//! - [`input`]: held-key state and the key, cursor and scroll callbacks.
//! - [`transform`]: angle conversion and perspective projection.
//! - [`config`]: command-line options.
//! - [`vertex`], [`uniform_buffer`], [`uniform_binding`]: vertex and uniform layouts.
//!
//! ## Controls
//!
//! | Input        | Effect                      |
//! |--------------|-----------------------------|
//! | W / S        | move forward / back         |
//! | A / D        | strafe left / right         |
//! | mouse        | yaw and pitch               |
//! | scroll wheel | zoom (field of view 1°–90°) |
//! | Escape       | quit                        |
//!
//! ## Example
//!
//! ```ignore
//! use clap::Parser;
//! use scene_viewer::{run, SceneConfig};
//!
//! run(SceneConfig::parse())?;
//! ```

pub mod app;
pub mod camera;
pub mod config;
pub mod gpu;
pub mod input;
pub mod model;
pub mod renderer;
pub mod scene;
pub mod shader_program;
pub mod texture;
pub mod transform;
pub mod uniform_binding;
pub mod uniform_buffer;
pub mod vertex;

pub use crate::app::{run, App, AppError, SceneState};
pub use crate::camera::{Camera, CameraController};
pub use crate::config::SceneConfig;
pub use crate::gpu::Gpu;
pub use crate::model::Model;
pub use crate::renderer::Renderer;
pub use crate::scene::Scene;
pub use crate::shader_program::ShaderProgram;
pub use crate::texture::Texture;
pub use crate::uniform_binding::UniformBinding;
pub use crate::uniform_buffer::Transforms;
pub use crate::vertex::Vertex;

/// WGSL source of the vertex stage.
///
/// Reads `position`, `passed_color` and `passed_texel` at locations `0`, `1` and `2`,
/// transforms the position by `projection * view * model` from the uniform at group `0`,
/// and passes the color and texel on at locations `0` and `1`.
pub const VERTEX_SHADER_SOURCE: &str = include_str!("shaders/scene_vertex.wgsl");

/// WGSL source of the fragment stage.
///
/// Samples the texture bound at group `1` with the interpolated texel. The vertex color
/// is received but not used.
pub const FRAGMENT_SHADER_SOURCE: &str = include_str!("shaders/scene_fragment.wgsl");
