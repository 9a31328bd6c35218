//! # Shader Program
//!
//! Owns the scene's vertex and fragment shader sources and the render pipeline(s) they are
//! linked into.
//!
//! ## Lifecycle
//!
//! A program moves through three states, reported by [`ShaderProgram::status`]:
//!
//! 1. **Empty**: at least one stage has no source.
//! 2. **SourcesLoaded**: both WGSL sources are stored; nothing has touched the device.
//! 3. **Linked**: [`ShaderProgram::create`] compiled both stages, checked that they fit
//!    together and built the pipelines. The program now has a non-zero id.
//!
//! ## Compile and link
//!
//! Each stage is parsed and validated with `naga` on the CPU, so a broken shader produces a
//! readable diagnostic (file position, caret, message) before any device call. Linking then
//! checks the stage interface: the vertex inputs must use the fixed vertex attribute
//! locations and every fragment input must be written by the vertex stage. Finally the
//! wgpu pipelines are created inside a validation error scope, so whatever the device still
//! rejects is reported as a link error instead of reaching the uncaptured-error handler.
//!
//! ## Drawing
//!
//! [`ShaderProgram::use_program`] binds a pipeline to a render pass; the uniform and texture
//! setters must follow it. All of them return [`ShaderError::NotLinked`] on a program that
//! was never linked rather than touching an invalid handle.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::gpu::Gpu;
use crate::renderer::Renderer;
use crate::texture::Texture;
use crate::uniform_binding::UniformBinding;
use crate::uniform_buffer::Transforms;
use crate::vertex::{Vertex, VERTEX_LOCATIONS};

/// Name of the vertex stage entry point.
pub const VERTEX_ENTRY_POINT: &str = "vertex_main";

/// Name of the fragment stage entry point.
pub const FRAGMENT_ENTRY_POINT: &str = "fragment_main";

/// Bind group index of the [`Transforms`] uniform block.
pub const TRANSFORMS_GROUP: u32 = 0;

/// Bind group index of the sampled texture.
pub const TEXTURE_GROUP: u32 = 1;

static NEXT_PROGRAM_ID: AtomicU32 = AtomicU32::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramStatus {
    Empty,
    SourcesLoaded,
    Linked,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShaderError {
    #[error("no {0} shader source has been loaded")]
    MissingSource(ShaderStage),

    #[error("failed to compile the {stage} shader:\n{log}")]
    Compile { stage: ShaderStage, log: String },

    #[error("failed to link the shader program: {0}")]
    Link(String),

    #[error("the shader program has not been linked")]
    NotLinked,
}

/// Device objects that exist only once the program is linked.
struct LinkedProgram {
    id: NonZeroU32,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    fill_pipeline: wgpu::RenderPipeline,
    wireframe_pipeline: Option<wgpu::RenderPipeline>,
}

/// A vertex + fragment shader pair and the pipelines built from it.
#[derive(Default)]
pub struct ShaderProgram {
    vertex_source: Option<String>,
    fragment_source: Option<String>,
    linked: Option<LinkedProgram>,
}

impl ShaderProgram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the WGSL source of the vertex stage.
    ///
    /// Replacing a source of a linked program drops the linked pipelines; the program has
    /// to be created again.
    pub fn load_vertex_shader_from_source(&mut self, source: impl Into<String>) {
        self.vertex_source = Some(source.into());
        self.linked = None;
    }

    /// Stores the WGSL source of the fragment stage. See
    /// [`ShaderProgram::load_vertex_shader_from_source`].
    pub fn load_fragment_shader_from_source(&mut self, source: impl Into<String>) {
        self.fragment_source = Some(source.into());
        self.linked = None;
    }

    pub fn status(&self) -> ProgramStatus {
        if self.linked.is_some() {
            ProgramStatus::Linked
        } else if self.vertex_source.is_some() && self.fragment_source.is_some() {
            ProgramStatus::SourcesLoaded
        } else {
            ProgramStatus::Empty
        }
    }

    /// The program id, assigned when linking succeeds.
    pub fn program_id(&self) -> Option<NonZeroU32> {
        self.linked.as_ref().map(|linked| linked.id)
    }

    /// Whether [`ShaderProgram::use_program`] can honour a wireframe request.
    pub fn supports_wireframe(&self) -> bool {
        self.linked
            .as_ref()
            .is_some_and(|linked| linked.wireframe_pipeline.is_some())
    }

    /// Compiles both stages, links them and builds the render pipelines.
    ///
    /// On failure the program stays in its previous state and the returned error carries
    /// the diagnostic log.
    pub fn create(&mut self, gpu: &Gpu) -> Result<(), ShaderError> {
        let vertex_source = self
            .vertex_source
            .as_deref()
            .ok_or(ShaderError::MissingSource(ShaderStage::Vertex))?;
        let fragment_source = self
            .fragment_source
            .as_deref()
            .ok_or(ShaderError::MissingSource(ShaderStage::Fragment))?;

        let vertex_module = compile_stage(ShaderStage::Vertex, vertex_source)?;
        let fragment_module = compile_stage(ShaderStage::Fragment, fragment_source)?;
        link_stages(&vertex_module, &fragment_module)?;

        let device = &gpu.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let uniform_layout = UniformBinding::create_layout(device);
        let texture_layout = Texture::create_layout(device);

        let vertex_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Vertex Shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(vertex_source)),
        });
        let fragment_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Fragment Shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(fragment_source)),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let stages = PipelineStages {
            layout: &pipeline_layout,
            vertex: &vertex_shader,
            fragment: &fragment_shader,
            surface_format: gpu.surface_format,
        };
        let fill_pipeline = stages.build(device, wgpu::PolygonMode::Fill);
        let wireframe_pipeline = gpu
            .supports_wireframe
            .then(|| stages.build(device, wgpu::PolygonMode::Line));

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(ShaderError::Link(error.to_string()));
        }

        let id = NonZeroU32::new(NEXT_PROGRAM_ID.fetch_add(1, Ordering::Relaxed))
            .unwrap_or(NonZeroU32::MIN);
        log::info!(
            "Linked shader program {id} (wireframe pipeline: {})",
            wireframe_pipeline.is_some()
        );

        self.linked = Some(LinkedProgram {
            id,
            uniform_layout,
            texture_layout,
            fill_pipeline,
            wireframe_pipeline,
        });
        Ok(())
    }

    /// Makes this program the active pipeline of `render_pass`.
    ///
    /// A wireframe request on a device without line polygon mode falls back to filled
    /// polygons.
    pub fn use_program(
        &self,
        render_pass: &mut wgpu::RenderPass<'_>,
        wireframe: bool,
    ) -> Result<(), ShaderError> {
        let linked = self.linked()?;
        let pipeline = match (&linked.wireframe_pipeline, wireframe) {
            (Some(wireframe_pipeline), true) => wireframe_pipeline,
            _ => &linked.fill_pipeline,
        };
        render_pass.set_pipeline(pipeline);
        Ok(())
    }

    /// Uploads the model, view and projection uniforms and binds them for the next draw.
    pub fn set_transforms(
        &self,
        render_pass: &mut wgpu::RenderPass<'_>,
        queue: &wgpu::Queue,
        binding: &UniformBinding,
        transforms: Transforms,
    ) -> Result<(), ShaderError> {
        self.linked()?;
        binding.update_buffer(queue, transforms);
        render_pass.set_bind_group(TRANSFORMS_GROUP, &binding.bind_group, &[]);
        Ok(())
    }

    /// Binds `texture` to the sampler slot read by the fragment stage.
    pub fn set_texture(
        &self,
        render_pass: &mut wgpu::RenderPass<'_>,
        texture: &Texture,
    ) -> Result<(), ShaderError> {
        self.linked()?;
        render_pass.set_bind_group(TEXTURE_GROUP, &texture.bind_group, &[]);
        Ok(())
    }

    /// Layout that per-model [`UniformBinding`]s must be created against.
    pub fn uniform_layout(&self) -> Result<&wgpu::BindGroupLayout, ShaderError> {
        Ok(&self.linked()?.uniform_layout)
    }

    /// Layout that [`Texture`] bind groups must be created against.
    pub fn texture_layout(&self) -> Result<&wgpu::BindGroupLayout, ShaderError> {
        Ok(&self.linked()?.texture_layout)
    }

    fn linked(&self) -> Result<&LinkedProgram, ShaderError> {
        self.linked.as_ref().ok_or(ShaderError::NotLinked)
    }
}

/// Parses and validates one stage, rendering any failure as a source-annotated log.
pub fn compile_stage(stage: ShaderStage, source: &str) -> Result<naga::Module, ShaderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|error| ShaderError::Compile {
        stage,
        log: error.emit_to_string(source),
    })?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::default(),
    )
    .validate(&module)
    .map_err(|error| ShaderError::Compile {
        stage,
        log: error.emit_to_string(source),
    })?;

    Ok(module)
}

/// Checks that a compiled vertex and fragment module form a usable program.
pub fn link_stages(vertex: &naga::Module, fragment: &naga::Module) -> Result<(), ShaderError> {
    let vertex_entry = find_entry_point(vertex, naga::ShaderStage::Vertex, VERTEX_ENTRY_POINT)?;
    let fragment_entry =
        find_entry_point(fragment, naga::ShaderStage::Fragment, FRAGMENT_ENTRY_POINT)?;

    let mut attribute_locations = BTreeSet::new();
    for argument in &vertex_entry.function.arguments {
        collect_locations(vertex, argument.ty, argument.binding.as_ref(), &mut attribute_locations);
    }
    if let Some(location) = attribute_locations
        .iter()
        .find(|location| !VERTEX_LOCATIONS.contains(location))
    {
        return Err(ShaderError::Link(format!(
            "vertex input at location {location} has no matching vertex attribute"
        )));
    }

    let mut written = BTreeSet::new();
    if let Some(result) = &vertex_entry.function.result {
        collect_locations(vertex, result.ty, result.binding.as_ref(), &mut written);
    }

    let mut read = BTreeSet::new();
    for argument in &fragment_entry.function.arguments {
        collect_locations(fragment, argument.ty, argument.binding.as_ref(), &mut read);
    }

    let missing: Vec<String> = read
        .difference(&written)
        .map(|location| location.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ShaderError::Link(format!(
            "fragment input location(s) {} are not written by the vertex stage",
            missing.join(", ")
        )));
    }

    Ok(())
}

fn find_entry_point<'m>(
    module: &'m naga::Module,
    stage: naga::ShaderStage,
    name: &str,
) -> Result<&'m naga::EntryPoint, ShaderError> {
    module
        .entry_points
        .iter()
        .find(|entry| entry.stage == stage && entry.name == name)
        .ok_or_else(|| ShaderError::Link(format!("missing {stage:?} entry point `{name}`")))
}

/// Gathers the `@location` indices of an entry point argument or result, looking through
/// one level of struct members.
fn collect_locations(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    locations: &mut BTreeSet<u32>,
) {
    match binding {
        Some(naga::Binding::Location { location, .. }) => {
            locations.insert(*location);
        }
        Some(naga::Binding::BuiltIn(_)) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    if let Some(naga::Binding::Location { location, .. }) = &member.binding {
                        locations.insert(*location);
                    }
                }
            }
        }
    }
}

/// Everything the scene pipelines share; only the polygon mode differs between them.
struct PipelineStages<'a> {
    layout: &'a wgpu::PipelineLayout,
    vertex: &'a wgpu::ShaderModule,
    fragment: &'a wgpu::ShaderModule,
    surface_format: wgpu::TextureFormat,
}

impl PipelineStages<'_> {
    fn build(&self, device: &wgpu::Device, polygon_mode: wgpu::PolygonMode) -> wgpu::RenderPipeline {
        let attributes = Vertex::vertex_attributes();
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(match polygon_mode {
                wgpu::PolygonMode::Line => "Scene Wireframe Pipeline",
                _ => "Scene Fill Pipeline",
            }),
            layout: Some(self.layout),
            vertex: wgpu::VertexState {
                module: self.vertex,
                entry_point: Some(VERTEX_ENTRY_POINT),
                buffers: &[Vertex::description(&attributes)],
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None, // Both faces are visible, as in the wireframe view.
                polygon_mode,
                conservative: false,
                unclipped_depth: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: Renderer::DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: self.fragment,
                entry_point: Some(FRAGMENT_ENTRY_POINT),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            multiview: None,
            cache: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FRAGMENT_SHADER_SOURCE, VERTEX_SHADER_SOURCE};

    #[test]
    fn status_follows_loaded_sources() {
        let mut program = ShaderProgram::new();
        assert_eq!(program.status(), ProgramStatus::Empty);

        program.load_vertex_shader_from_source(VERTEX_SHADER_SOURCE);
        assert_eq!(program.status(), ProgramStatus::Empty);

        program.load_fragment_shader_from_source(FRAGMENT_SHADER_SOURCE);
        assert_eq!(program.status(), ProgramStatus::SourcesLoaded);
        assert_eq!(program.program_id(), None);
    }

    #[test]
    fn unlinked_program_refuses_layouts() {
        let mut program = ShaderProgram::new();
        program.load_vertex_shader_from_source(VERTEX_SHADER_SOURCE);
        program.load_fragment_shader_from_source(FRAGMENT_SHADER_SOURCE);
        assert_eq!(program.uniform_layout().err(), Some(ShaderError::NotLinked));
        assert_eq!(program.texture_layout().err(), Some(ShaderError::NotLinked));
        assert!(!program.supports_wireframe());
    }

    #[test]
    fn embedded_sources_compile_and_link() {
        let vertex = compile_stage(ShaderStage::Vertex, VERTEX_SHADER_SOURCE).unwrap();
        let fragment = compile_stage(ShaderStage::Fragment, FRAGMENT_SHADER_SOURCE).unwrap();
        link_stages(&vertex, &fragment).unwrap();
    }

    #[test]
    fn syntax_error_reports_stage_and_log() {
        let error = compile_stage(ShaderStage::Fragment, "fn broken( {").unwrap_err();
        match error {
            ShaderError::Compile { stage, log } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(!log.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn fragment_input_without_vertex_output_fails_to_link() {
        let fragment_source = r#"
            struct FragmentInput {
                @location(3) extra: vec4<f32>,
            };

            @fragment
            fn fragment_main(input: FragmentInput) -> @location(0) vec4<f32> {
                return input.extra;
            }
        "#;
        let vertex = compile_stage(ShaderStage::Vertex, VERTEX_SHADER_SOURCE).unwrap();
        let fragment = compile_stage(ShaderStage::Fragment, fragment_source).unwrap();

        let error = link_stages(&vertex, &fragment).unwrap_err();
        assert!(matches!(&error, ShaderError::Link(log) if log.contains('3')));
    }

    #[test]
    fn vertex_input_outside_attribute_layout_fails_to_link() {
        let vertex_source = r#"
            @vertex
            fn vertex_main(@location(5) position: vec3<f32>) -> @builtin(position) vec4<f32> {
                return vec4<f32>(position, 1.0);
            }
        "#;
        let vertex = compile_stage(ShaderStage::Vertex, vertex_source).unwrap();
        let fragment = compile_stage(ShaderStage::Fragment, FRAGMENT_SHADER_SOURCE).unwrap();

        let error = link_stages(&vertex, &fragment).unwrap_err();
        assert!(matches!(&error, ShaderError::Link(log) if log.contains("location 5")));
    }

    #[test]
    fn missing_entry_point_fails_to_link() {
        let vertex = compile_stage(ShaderStage::Vertex, VERTEX_SHADER_SOURCE).unwrap();
        let error = link_stages(&vertex, &vertex).unwrap_err();
        assert!(matches!(error, ShaderError::Link(_)));
    }
}
