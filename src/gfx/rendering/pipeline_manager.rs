//! Render pipeline management for wgpu
//!
//! Shaders and pipelines are built once at startup. Device validation errors
//! are captured with error scopes and surfaced as [`ViewerError`] values, and
//! the finished pipelines are handed out as an immutable [`ProgramSet`].

use std::{collections::HashMap, sync::Arc};
use wgpu::*;

use crate::{
    error::{Result, ViewerError},
    gfx::{rendering::pass_orchestrator::PassKind, scene::vertex::Vertex3D},
};

/// Standard alpha blending for the colour passes
pub const ALPHA_BLENDING: BlendState = BlendState::ALPHA_BLENDING;

/// Configuration for creating a render pipeline
///
/// Defines all parameters needed to create a wgpu render pipeline,
/// including shaders, bind group layouts, and render state.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub label: String,
    pub shader: String,
    pub bind_group_layouts: Vec<BindGroupLayout>,
    pub cull_mode: Option<Face>,
    pub front_face: FrontFace,
    pub depth_format: Option<TextureFormat>,
    pub depth_compare: CompareFunction,
    pub color_targets: Vec<Option<ColorTargetState>>,
    pub vertex_only: bool, // shadow pass
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            label: "Default Pipeline".to_string(),
            shader: "scene".to_string(),
            bind_group_layouts: Vec::new(),
            cull_mode: Some(Face::Back),
            front_face: FrontFace::Ccw,
            depth_format: None,
            depth_compare: CompareFunction::LessEqual,
            color_targets: vec![Some(ColorTargetState {
                format: TextureFormat::Bgra8Unorm,
                blend: Some(ALPHA_BLENDING),
                write_mask: ColorWrites::ALL,
            })],
            vertex_only: false,
        }
    }
}

impl PipelineConfig {
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_owned();
        self
    }

    pub fn with_cull_mode(mut self, face: Option<Face>) -> Self {
        self.cull_mode = face;
        self
    }

    /// Culls the faces `kind` culls
    pub fn with_pass_culling(mut self, kind: PassKind) -> Self {
        self.cull_mode = Some(kind.cull().into());
        self
    }

    /// Winding that counts as front facing. Cube faces are rendered through
    /// a Y flip, which reverses the apparent winding.
    pub fn with_front_face(mut self, front_face: FrontFace) -> Self {
        self.front_face = front_face;
        self
    }

    pub fn with_vertex_only(mut self) -> Self {
        self.vertex_only = true;
        self.color_targets.clear();
        self
    }

    pub fn with_shader(mut self, shader: &str) -> Self {
        self.shader = shader.to_string();
        self
    }

    pub fn with_bind_group_layouts(mut self, layouts: Vec<BindGroupLayout>) -> Self {
        self.bind_group_layouts = layouts;
        self
    }

    pub fn with_depth_format(mut self, format: TextureFormat) -> Self {
        self.depth_format = Some(format);
        self
    }

    /// Single alpha-blended colour target
    pub fn with_color_format(mut self, format: TextureFormat) -> Self {
        self.color_targets = vec![Some(ColorTargetState {
            format,
            blend: Some(ALPHA_BLENDING),
            write_mask: ColorWrites::ALL,
        })];
        self
    }
}

/// Compiled pipelines, one per pass kind
///
/// Built once and never mutated; passes look their pipeline up by kind.
#[derive(Debug)]
pub struct ProgramSet {
    pub shadow: RenderPipeline,
    pub environment: RenderPipeline,
    pub camera: RenderPipeline,
}

impl ProgramSet {
    pub const SHADOW: &'static str = "Shadow";
    pub const ENVIRONMENT: &'static str = "Environment";
    pub const CAMERA: &'static str = "Camera";

    pub fn pipeline(&self, kind: PassKind) -> &RenderPipeline {
        match kind {
            PassKind::Shadow => &self.shadow,
            PassKind::EnvironmentCapture => &self.environment,
            PassKind::Final => &self.camera,
        }
    }
}

/// Compiles shader modules and creates registered pipelines
pub struct PipelineManager {
    device: Arc<Device>,
    pipelines: HashMap<String, RenderPipeline>,
    pipeline_configs: HashMap<String, PipelineConfig>,
    shader_modules: HashMap<String, ShaderModule>,
    pending_pipelines: Vec<String>,
}

impl PipelineManager {
    pub fn new(device: Arc<Device>) -> Self {
        Self {
            device,
            pipelines: HashMap::new(),
            pipeline_configs: HashMap::new(),
            shader_modules: HashMap::new(),
            pending_pipelines: Vec::new(),
        }
    }

    /// Registers a pipeline configuration without creating it
    ///
    /// # Arguments
    /// * `name` - Unique identifier for this pipeline
    /// * `config` - Pipeline configuration
    pub fn register_pipeline(&mut self, name: &str, config: PipelineConfig) {
        self.pipeline_configs.insert(name.to_string(), config);
        self.pending_pipelines.push(name.to_string());
    }

    /// Loads and compiles a shader module
    ///
    /// # Arguments
    /// * `name` - Shader identifier
    /// * `source` - WGSL shader source code
    ///
    /// # Errors
    /// [`ViewerError::ShaderCompile`] carrying the device's diagnostic text
    pub fn load_shader(&mut self, name: &str, source: &str) -> Result<()> {
        self.device.push_error_scope(ErrorFilter::Validation);
        let shader_module = self.device.create_shader_module(ShaderModuleDescriptor {
            label: Some(name),
            source: ShaderSource::Wgsl(source.into()),
        });

        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(ViewerError::ShaderCompile {
                shader: name.to_string(),
                log: error.to_string(),
            });
        }

        log::debug!("Compiled shader '{}'", name);
        self.shader_modules.insert(name.to_string(), shader_module);
        Ok(())
    }

    /// Creates all pending pipelines immediately
    ///
    /// Stops at the first pipeline the device rejects.
    pub fn create_all_pipelines(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.pending_pipelines);

        for name in pending {
            if let Some(config) = self.pipeline_configs.get(&name) {
                let pipeline = self.create_pipeline_from_config(&name, config)?;
                self.pipelines.insert(name, pipeline);
            }
        }

        Ok(())
    }

    /// Removes a created pipeline from the manager
    pub fn take_pipeline(&mut self, name: &str) -> Result<RenderPipeline> {
        self.pipelines
            .remove(name)
            .ok_or_else(|| ViewerError::ProgramLink {
                program: name.to_string(),
                log: "pipeline was never created".to_string(),
            })
    }

    /// Moves the three pass pipelines into a [`ProgramSet`]
    pub fn into_program_set(mut self) -> Result<ProgramSet> {
        Ok(ProgramSet {
            shadow: self.take_pipeline(ProgramSet::SHADOW)?,
            environment: self.take_pipeline(ProgramSet::ENVIRONMENT)?,
            camera: self.take_pipeline(ProgramSet::CAMERA)?,
        })
    }

    /// Creates a render pipeline from configuration
    fn create_pipeline_from_config(
        &self,
        name: &str,
        config: &PipelineConfig,
    ) -> Result<RenderPipeline> {
        let shader = self
            .shader_modules
            .get(&config.shader)
            .ok_or_else(|| ViewerError::ProgramLink {
                program: name.to_string(),
                log: format!("shader '{}' not found", config.shader),
            })?;

        self.device.push_error_scope(ErrorFilter::Validation);

        let bind_group_layout_refs: Vec<&BindGroupLayout> =
            config.bind_group_layouts.iter().collect();
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&PipelineLayoutDescriptor {
                label: Some(&format!("{} Layout", name)),
                bind_group_layouts: &bind_group_layout_refs,
                push_constant_ranges: &[],
            });

        // Vertex-only pipelines (shadow pass) have no fragment stage
        let fragment_state = if config.vertex_only {
            None
        } else {
            Some(FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                targets: &config.color_targets,
                compilation_options: PipelineCompilationOptions::default(),
            })
        };

        let depth_stencil = config.depth_format.map(|format| DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: config.depth_compare,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        });

        let pipeline = self
            .device
            .create_render_pipeline(&RenderPipelineDescriptor {
                label: Some(&config.label),
                layout: Some(&pipeline_layout),
                vertex: VertexState {
                    module: shader,
                    entry_point: Some("vs_main"),
                    buffers: &[Vertex3D::desc()],
                    compilation_options: PipelineCompilationOptions::default(),
                },
                fragment: fragment_state,
                primitive: PrimitiveState {
                    topology: PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: config.front_face,
                    cull_mode: config.cull_mode,
                    polygon_mode: PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil,
                multisample: MultisampleState::default(),
                multiview: None,
                cache: None,
            });

        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(ViewerError::ProgramLink {
                program: name.to_string(),
                log: error.to_string(),
            });
        }

        log::debug!("Created pipeline '{}'", name);
        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_blends_and_tests_less_equal() {
        let config = PipelineConfig::default();
        assert_eq!(config.depth_compare, CompareFunction::LessEqual);
        assert_eq!(config.front_face, FrontFace::Ccw);
        let target = config.color_targets[0].as_ref().unwrap();
        assert_eq!(target.blend, Some(BlendState::ALPHA_BLENDING));
    }

    #[test]
    fn test_vertex_only_drops_color_targets() {
        let config = PipelineConfig::default()
            .with_color_format(TextureFormat::Rgba8Unorm)
            .with_vertex_only();
        assert!(config.vertex_only);
        assert!(config.color_targets.is_empty());
    }

    #[test]
    fn test_pass_culling_follows_pass_kind() {
        let shadow = PipelineConfig::default().with_pass_culling(PassKind::Shadow);
        let environment = PipelineConfig::default().with_pass_culling(PassKind::EnvironmentCapture);
        let camera = PipelineConfig::default().with_pass_culling(PassKind::Final);

        assert_eq!(shadow.cull_mode, Some(Face::Front));
        assert_eq!(environment.cull_mode, Some(Face::Back));
        assert_eq!(camera.cull_mode, Some(Face::Back));
    }

    #[test]
    fn test_builder_sets_cube_winding() {
        let config = PipelineConfig::default()
            .with_label("Environment")
            .with_front_face(FrontFace::Cw)
            .with_cull_mode(Some(Face::Back))
            .with_depth_format(TextureFormat::Depth32Float);
        assert_eq!(config.label, "Environment");
        assert_eq!(config.front_face, FrontFace::Cw);
        assert_eq!(config.depth_format, Some(TextureFormat::Depth32Float));
    }
}
