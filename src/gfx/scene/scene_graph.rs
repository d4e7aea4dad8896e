//! Scene graphs: ordered drawables plus a model transform
//!
//! Two roles exist. The static scene keeps an identity transform and is
//! drawn by every pass; the animated reflective object moves every frame,
//! takes the reflective shading path and is left out of the environment
//! capture so it never reflects itself.

use cgmath::{Matrix4, SquareMatrix, Vector3};

use crate::{
    error::{Result, ViewerError},
    gfx::{
        assets::{AssetSource, MeshAsset},
        camera::camera_utils::convert_matrix4_to_array,
        resources::material::{MaterialBindings, MaterialLibrary},
    },
    config::AssetSpec,
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
        uniform_buffer::UniformBuffer,
    },
};

use super::drawable::{DrawObject, Drawable};

/// Bind group index of the model transform
pub const MODEL_GROUP: u32 = 1;
/// Bind group index of the per-drawable material
pub const MATERIAL_GROUP: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneRole {
    Static,
    AnimatedReflective,
}

impl SceneRole {
    pub fn is_reflective(self) -> bool {
        matches!(self, SceneRole::AnimatedReflective)
    }
}

/// Which attributes and bindings a pass consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawMode {
    /// Positions only, no material bind group
    DepthOnly,
    /// Full material binding per drawable
    Shaded,
}

/// MUST match `ModelUniform` in the shaders.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelUniform {
    pub model: [[f32; 4]; 4],
}

pub type ModelUBO = UniformBuffer<ModelUniform>;

/// Group 1 layout: the model transform
pub struct ModelBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
}

impl ModelBindings {
    pub fn new(device: &wgpu::Device) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform())
            .create(device, "Model Bind Group Layout");
        Self { bind_group_layout }
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }
}

struct ModelGpu {
    ubo: ModelUBO,
    bind_group: wgpu::BindGroup,
}

/// Translation of the reflective object at animation time `time` (seconds)
pub fn reflective_translation(time: f32) -> Vector3<f32> {
    Vector3::new(
        time.sin() * 0.05,
        0.1 + (time + 2.0).cos() * 0.02,
        (time + 4.0).cos() * 0.03,
    )
}

pub struct SceneGraph {
    role: SceneRole,
    drawables: Vec<Drawable>,
    library: MaterialLibrary,
    transform: Matrix4<f32>,
    gpu: Option<ModelGpu>,
}

impl SceneGraph {
    /// Loads an asset and builds its scene graph
    pub fn load(source: &dyn AssetSource, spec: &AssetSpec, role: SceneRole) -> Result<Self> {
        let asset = MeshAsset::load(source, spec)?;
        Ok(Self::from_asset(asset, role))
    }

    pub fn from_asset(asset: MeshAsset, role: SceneRole) -> Self {
        let (library, parts) = asset.into_parts();
        let drawables = parts
            .into_iter()
            .map(|(partition, material)| Drawable::from_partition(partition, material, &library))
            .collect();
        Self::from_drawables(drawables, library, role)
    }

    /// Orders `drawables` opaque first, alpha-using last, keeping the
    /// relative order inside each group
    pub fn from_drawables(drawables: Vec<Drawable>, library: MaterialLibrary, role: SceneRole) -> Self {
        let (opaque, alpha): (Vec<Drawable>, Vec<Drawable>) =
            drawables.into_iter().partition(|d| !d.uses_alpha());

        log::debug!(
            "{:?} scene graph: {} opaque, {} alpha drawables",
            role,
            opaque.len(),
            alpha.len()
        );

        let mut drawables = opaque;
        drawables.extend(alpha);

        Self {
            role,
            drawables,
            library,
            transform: Matrix4::identity(),
            gpu: None,
        }
    }

    pub fn role(&self) -> SceneRole {
        self.role
    }

    pub fn drawables(&self) -> &[Drawable] {
        &self.drawables
    }

    pub fn library(&self) -> &MaterialLibrary {
        &self.library
    }

    pub fn transform(&self) -> Matrix4<f32> {
        self.transform
    }

    pub fn set_transform(&mut self, transform: Matrix4<f32>) {
        self.transform = transform;
    }

    pub fn set_translation(&mut self, translation: Vector3<f32>) {
        self.transform = Matrix4::from_translation(translation);
    }

    pub fn triangle_count(&self) -> usize {
        self.drawables.iter().map(Drawable::triangle_count).sum()
    }

    /// True once [`SceneGraph::upload`] has created the model uniform and
    /// every drawable's buffers
    pub fn is_uploaded(&self) -> bool {
        self.gpu.is_some() && self.drawables.iter().all(Drawable::is_uploaded)
    }

    /// Fails with [`ViewerError::SceneNotUploaded`] unless the graph can be drawn
    pub fn ensure_uploaded(&self) -> Result<()> {
        if self.is_uploaded() {
            Ok(())
        } else {
            Err(ViewerError::SceneNotUploaded {
                scene: format!("{:?}", self.role),
            })
        }
    }

    /// Creates every GPU resource: buffers, material bind groups and the
    /// model uniform. Call once after loading.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        material_bindings: &MaterialBindings,
        model_bindings: &ModelBindings,
    ) {
        let reflective = self.role.is_reflective();
        for drawable in &mut self.drawables {
            drawable.upload(device);
            drawable.bind_textures(device, queue, &mut self.library, material_bindings, reflective);
        }

        let ubo = ModelUBO::new_with_data(
            device,
            &ModelUniform {
                model: convert_matrix4_to_array(self.transform),
            },
        );
        let bind_group = BindGroupBuilder::new(&model_bindings.bind_group_layout)
            .resource(ubo.binding_resource())
            .create(device, &format!("Model Bind Group: {:?}", self.role));

        self.gpu = Some(ModelGpu { ubo, bind_group });

        log::info!(
            "Uploaded {:?} scene graph: {} drawables, {} triangles",
            self.role,
            self.drawables.len(),
            self.triangle_count()
        );
    }

    /// Pushes the current transform to the GPU
    pub fn sync_transform(&mut self, queue: &wgpu::Queue) {
        let model = convert_matrix4_to_array(self.transform);
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.ubo.update_content(queue, ModelUniform { model });
        }
    }

    /// Issues every drawable in stored order
    pub fn draw<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>, mode: DrawMode) {
        let Some(gpu) = &self.gpu else {
            log::warn!("{:?} scene graph drawn before upload, skipping", self.role);
            return;
        };
        pass.set_bind_group(MODEL_GROUP, &gpu.bind_group, &[]);

        for drawable in &self.drawables {
            match mode {
                DrawMode::DepthOnly => pass.draw_mesh(drawable),
                DrawMode::Shaded => pass.draw_object(drawable, MATERIAL_GROUP),
            }
        }
    }
}
