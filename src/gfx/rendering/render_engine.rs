//! WGPU-based rendering engine for the atrium viewer
//!
//! Owns the device, the surface and every render target, builds the three
//! pass pipelines at startup and executes a [`FramePlan`] each frame.

use std::sync::Arc;
use wgpu::TextureFormat;

use crate::{
    config::ViewerConfig,
    error::{Result, ViewerError},
    gfx::{
        resources::{
            global_bindings::{GlobalBindings, LightRig},
            material::MaterialBindings,
            pass_bindings::PassBindings,
            texture_resource::{CubemapTarget, TextureResource},
        },
        scene::{ModelBindings, SceneGraph, SceneRole},
    },
};

use super::{
    pass_orchestrator::{
        ClearOps, FramePlan, PassKind, PassStep, RenderTarget, Viewport, VIEW_SLOT_COUNT,
    },
    pipeline_manager::{PipelineConfig, PipelineManager, ProgramSet},
};

/// Pass resources bound at group 3
const PASS_GROUP: u32 = 3;

/// Core rendering engine managing GPU resources and draw calls
///
/// The RenderEngine handles all low-level graphics operations including:
/// - Surface and device management
/// - Pipeline creation
/// - Depth buffer handling
/// - The shadow map and the environment cubemap targets
/// - Per-view uniform updates
pub struct RenderEngine {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    depth_texture: TextureResource,
    programs: ProgramSet,
    global_bindings: GlobalBindings,
    material_bindings: MaterialBindings,
    model_bindings: ModelBindings,

    // Render targets
    shadow_map: TextureResource,
    cubemap: CubemapTarget,
    _placeholder_cube: TextureResource,

    // Group 3 per pass kind
    capture_bind_group: wgpu::BindGroup, // shadow map + placeholder cube
    final_bind_group: wgpu::BindGroup,   // shadow map + environment cube
}

impl RenderEngine {
    /// Creates a new render engine for the given window
    ///
    /// # Arguments
    /// * `window` - Window surface target for rendering
    /// * `viewer` - Resolutions, window size and vsync preference
    /// * `lights` - Light rig, uploaded once
    ///
    /// # Errors
    /// [`ViewerError::DeviceInit`] when no adapter or device satisfies the
    /// required limits, [`ViewerError::FramebufferIncomplete`] when a render
    /// target is rejected, and the shader and pipeline errors of
    /// [`PipelineManager`].
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        viewer: &ViewerConfig,
        lights: &LightRig,
    ) -> Result<RenderEngine> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .map_err(|e| ViewerError::DeviceInit(format!("cannot create surface: {}", e)))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| ViewerError::DeviceInit(format!("no suitable adapter: {}", e)))?;

        let max_texture_size = viewer
            .shadow_map_resolution
            .max(viewer.cubemap_resolution)
            .max(4096);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: max_texture_size,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| ViewerError::DeviceInit(format!("cannot open device: {}", e)))?;

        let info = adapter.get_info();
        log::info!("Using adapter '{}' ({:?})", info.name, info.backend);

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or_else(|| ViewerError::Surface("surface reports no formats".to_string()))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: viewer.window_width.max(1),
            height: viewer.window_height.max(1),
            present_mode: if viewer.vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode: surface_capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        // Render targets
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let depth_texture =
            TextureResource::create_depth_texture(&device, &config, "depth_texture");
        let shadow_map = TextureResource::create_shadow_map(&device, viewer.shadow_map_resolution);
        let cubemap = CubemapTarget::new(&device, viewer.cubemap_resolution);
        let placeholder_cube = TextureResource::create_placeholder_cube(&device, &queue);
        if let Some(error) = device.pop_error_scope().await {
            return Err(ViewerError::FramebufferIncomplete {
                target: "shadow map / environment cubemap".to_string(),
                log: error.to_string(),
            });
        }

        let global_bindings = GlobalBindings::new(&device, lights, VIEW_SLOT_COUNT);
        let material_bindings = MaterialBindings::new(&device);
        let model_bindings = ModelBindings::new(&device);
        let pass_bindings = PassBindings::new(&device);

        let capture_bind_group = pass_bindings.create_bind_group(
            &device,
            &shadow_map,
            &placeholder_cube,
            "Capture Pass Bind Group",
        );
        let final_bind_group = pass_bindings.create_bind_group(
            &device,
            &shadow_map,
            &cubemap.cube,
            "Final Pass Bind Group",
        );

        let device_handle: Arc<wgpu::Device> = device.into();
        let queue_handle: Arc<wgpu::Queue> = queue.into();
        let mut pipeline_manager = PipelineManager::new(device_handle.clone());

        pipeline_manager.load_shader("scene", include_str!("scene.wgsl"))?;
        pipeline_manager.load_shader("shadow", include_str!("shadow.wgsl"))?;

        let shaded_layouts = vec![
            global_bindings.bind_group_layout().clone(),
            model_bindings.bind_group_layout().clone(),
            material_bindings.bind_group_layout().clone(),
            pass_bindings.bind_group_layout().clone(),
        ];

        pipeline_manager.register_pipeline(
            ProgramSet::SHADOW,
            PipelineConfig::default()
                .with_label("SHADOW")
                .with_shader("shadow")
                .with_depth_format(TextureResource::DEPTH_FORMAT)
                .with_pass_culling(PassKind::Shadow)
                .with_bind_group_layouts(shaded_layouts[..2].to_vec())
                .with_vertex_only(),
        );

        pipeline_manager.register_pipeline(
            ProgramSet::ENVIRONMENT,
            PipelineConfig::default()
                .with_label("ENVIRONMENT")
                .with_shader("scene")
                .with_depth_format(TextureResource::DEPTH_FORMAT)
                .with_pass_culling(PassKind::EnvironmentCapture)
                .with_front_face(wgpu::FrontFace::Cw)
                .with_color_format(TextureResource::CUBEMAP_FORMAT)
                .with_bind_group_layouts(shaded_layouts.clone()),
        );

        pipeline_manager.register_pipeline(
            ProgramSet::CAMERA,
            PipelineConfig::default()
                .with_label("CAMERA")
                .with_shader("scene")
                .with_depth_format(TextureResource::DEPTH_FORMAT)
                .with_pass_culling(PassKind::Final)
                .with_color_format(format)
                .with_bind_group_layouts(shaded_layouts),
        );

        pipeline_manager.create_all_pipelines()?;
        let programs = pipeline_manager.into_program_set()?;

        Ok(RenderEngine {
            surface,
            device: device_handle,
            queue: queue_handle,
            config,
            depth_texture,
            programs,
            global_bindings,
            material_bindings,
            model_bindings,
            shadow_map,
            cubemap,
            _placeholder_cube: placeholder_cube,
            capture_bind_group,
            final_bind_group,
        })
    }

    /// Creates the GPU resources of a loaded scene graph
    pub fn upload_scene(&self, scene: &mut SceneGraph) {
        scene.upload(
            &self.device,
            &self.queue,
            &self.material_bindings,
            &self.model_bindings,
        );
    }

    /// Pushes a scene graph's current model transform
    pub fn sync_scene(&self, scene: &mut SceneGraph) {
        scene.sync_transform(&self.queue);
    }

    /// Records every step of `plan` into one command encoder and presents
    ///
    /// A lost or outdated surface is reconfigured and the frame skipped; an
    /// out-of-memory surface is fatal, and so is a scene graph that was never
    /// uploaded.
    pub fn render_frame(
        &mut self,
        plan: &FramePlan,
        static_scene: &SceneGraph,
        reflective: &SceneGraph,
    ) -> Result<()> {
        static_scene.ensure_uploaded()?;
        reflective.ensure_uploaded()?;

        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                return Err(ViewerError::Surface("out of memory".to_string()));
            }
            Err(e) => {
                log::warn!("Skipping frame: {}", e);
                return Ok(());
            }
        };

        let surface_texture_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        for step in &plan.steps {
            self.global_bindings
                .update_view(&self.queue, step.view_slot, step.view);
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        for step in &plan.steps {
            // Culling is baked into the pass pipeline
            debug_assert_eq!(step.cull, step.kind.cull());

            let color_view = match step.target {
                RenderTarget::ShadowMap => None,
                RenderTarget::CubeFace(face) => self.cubemap.face_views.get(face as usize),
                RenderTarget::Surface => Some(&surface_texture_view),
            };
            let depth_view = match step.target {
                RenderTarget::ShadowMap => &self.shadow_map.view,
                RenderTarget::CubeFace(_) => &self.cubemap.depth.view,
                RenderTarget::Surface => &self.depth_texture.view,
            };

            // Depth-only passes attach no colour target at all
            let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = color_view
                .map(|view| wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load_op(&step.clear),
                        store: wgpu::StoreOp::Store,
                    },
                })
                .into_iter()
                .map(Some)
                .collect();

            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(pass_label(step)),
                color_attachments: &color_attachments,
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: depth_load_op(&step.clear),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            let viewport = self.clamp_viewport(step);
            render_pass.set_viewport(
                0.0,
                0.0,
                viewport.width as f32,
                viewport.height as f32,
                0.0,
                1.0,
            );
            render_pass.set_pipeline(self.programs.pipeline(step.kind));
            render_pass.set_bind_group(0, self.global_bindings.bind_group(step.view_slot), &[]);

            match step.kind {
                PassKind::Shadow => {}
                PassKind::EnvironmentCapture => {
                    render_pass.set_bind_group(PASS_GROUP, &self.capture_bind_group, &[])
                }
                PassKind::Final => {
                    render_pass.set_bind_group(PASS_GROUP, &self.final_bind_group, &[])
                }
            }

            for draw in &step.draws {
                let scene = match draw.scene {
                    SceneRole::Static => static_scene,
                    SceneRole::AnimatedReflective => reflective,
                };
                scene.draw(&mut render_pass, draw.mode);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        Ok(())
    }

    /// Keeps the viewport inside the attachment it targets
    fn clamp_viewport(&self, step: &PassStep) -> Viewport {
        let (width, height) = match step.target {
            RenderTarget::ShadowMap => {
                let size = self.shadow_map.texture.size();
                (size.width, size.height)
            }
            RenderTarget::CubeFace(_) => (self.cubemap.resolution, self.cubemap.resolution),
            RenderTarget::Surface => (self.config.width, self.config.height),
        };
        Viewport {
            width: step.viewport.width.min(width),
            height: step.viewport.height.min(height),
        }
    }

    /// Resizes the render engine surface and recreates depth buffer
    ///
    /// Zero sizes (minimised window) are ignored. The shadow map and the
    /// cubemap keep their fixed resolution.
    ///
    /// # Arguments
    /// * `width` - New surface width in pixels
    /// * `height` - New surface height in pixels
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);

        self.depth_texture =
            TextureResource::create_depth_texture(&self.device, &self.config, "depth_texture");
    }

    /// Returns current surface dimensions
    pub fn surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn surface_format(&self) -> TextureFormat {
        self.config.format
    }
}

fn color_load_op(clear: &ClearOps) -> wgpu::LoadOp<wgpu::Color> {
    match clear.color {
        Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
        None => wgpu::LoadOp::Load,
    }
}

fn depth_load_op(clear: &ClearOps) -> wgpu::LoadOp<f32> {
    match clear.depth {
        Some(depth) => wgpu::LoadOp::Clear(depth),
        None => wgpu::LoadOp::Load,
    }
}

fn pass_label(step: &PassStep) -> &'static str {
    match step.target {
        RenderTarget::ShadowMap => "Shadow Depth Pass",
        RenderTarget::CubeFace(_) => "Environment Capture Pass",
        RenderTarget::Surface => "Main Render Pass",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_ops_follow_clear_ops() {
        let clear = ClearOps {
            color: Some([0.8, 0.8, 0.9, 0.0]),
            depth: Some(1.0),
        };
        assert_eq!(
            color_load_op(&clear),
            wgpu::LoadOp::Clear(wgpu::Color {
                r: 0.8,
                g: 0.8,
                b: 0.9,
                a: 0.0
            })
        );
        assert_eq!(depth_load_op(&clear), wgpu::LoadOp::Clear(1.0));

        let keep = ClearOps {
            color: None,
            depth: None,
        };
        assert_eq!(color_load_op(&keep), wgpu::LoadOp::Load);
        assert_eq!(depth_load_op(&keep), wgpu::LoadOp::Load);
    }
}
