use crate::gfx::{
    assets::MeshPartition,
    resources::{
        material::{Material, MaterialBindings, MaterialLibrary, MaterialUBO, MaterialUniform, TextureRole},
        texture_resource::TextureResource,
    },
};

use super::vertex::Vertex3D;

struct DrawableBuffers {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
}

struct DrawableBindings {
    _material_ubo: MaterialUBO,
    bind_group: wgpu::BindGroup,
}

/// One mesh partition bound to exactly one material
///
/// Indices are dense over this drawable's own vertex list. GPU buffers are
/// created once by [`Drawable::upload`] and live as long as the drawable.
pub struct Drawable {
    vertices: Vec<Vertex3D>,
    indices: Vec<u32>,
    material: Material,
    uses_alpha: bool,
    buffers: Option<DrawableBuffers>,
    bindings: Option<DrawableBindings>,
}

impl Drawable {
    pub fn new(vertices: Vec<Vertex3D>, indices: Vec<u32>, material: Material) -> Self {
        Self {
            vertices,
            indices,
            material,
            uses_alpha: false,
            buffers: None,
            bindings: None,
        }
    }

    /// Builds a drawable from loaded geometry. Alpha use is decided by the
    /// channel count of the material's albedo texture in `library`.
    pub fn from_partition(partition: MeshPartition, material: Material, library: &MaterialLibrary) -> Self {
        let uses_alpha = library.uses_alpha(&material);
        let mut drawable = Self::new(partition.vertices, partition.indices, material);
        drawable.uses_alpha = uses_alpha;
        drawable
    }

    pub fn vertices(&self) -> &[Vertex3D] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    /// True when the albedo texture has 4 channels
    pub fn uses_alpha(&self) -> bool {
        self.uses_alpha
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_uploaded(&self) -> bool {
        self.buffers.is_some()
    }

    /// Creates the vertex and index buffers. Call once.
    pub fn upload(&mut self, device: &wgpu::Device) {
        let vertex_buffer = wgpu::util::DeviceExt::create_buffer_init(
            device,
            &wgpu::util::BufferInitDescriptor {
                label: Some(&format!("Vertex Buffer: {}", self.material.name)),
                contents: bytemuck::cast_slice(&self.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            },
        );

        let index_buffer = wgpu::util::DeviceExt::create_buffer_init(
            device,
            &wgpu::util::BufferInitDescriptor {
                label: Some(&format!("Index Buffer: {}", self.material.name)),
                contents: bytemuck::cast_slice(&self.indices),
                usage: wgpu::BufferUsages::INDEX,
            },
        );

        self.buffers = Some(DrawableBuffers {
            vertex_buffer,
            index_buffer,
        });
    }

    /// Resolves every texture role through `library` and builds the material
    /// bind group. Absent roles get the library's fallback texture and are
    /// flagged off in the material uniform.
    pub fn bind_textures(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        library: &mut MaterialLibrary,
        material_bindings: &MaterialBindings,
        reflective: bool,
    ) {
        let fallback = library.fallback_texture(device, queue);
        let mut resolve = |role: TextureRole| -> TextureResource {
            library
                .gpu_texture(device, queue, &self.material, role)
                .unwrap_or_else(|| fallback.clone())
        };

        let albedo = resolve(TextureRole::Albedo);
        let diffuse = resolve(TextureRole::DiffuseOverlay);
        let specular = resolve(TextureRole::SpecularMask);
        let normal = resolve(TextureRole::NormalMap);

        let uniform = MaterialUniform::new(&self.material, &library.bound_roles(&self.material), reflective);
        let material_ubo = MaterialUBO::new_with_data(device, &uniform);
        let bind_group = material_bindings.create_bind_group(
            device,
            &material_ubo,
            [&albedo, &diffuse, &specular, &normal],
            &format!("Material Bind Group: {}", self.material.name),
        );

        self.bindings = Some(DrawableBindings {
            _material_ubo: material_ubo,
            bind_group,
        });
    }

    pub fn material_bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.bindings.as_ref().map(|b| &b.bind_group)
    }
}

/// Draw calls for drawables on a render pass
pub trait DrawObject<'a> {
    /// Binds the vertex and index buffers and issues the indexed draw
    fn draw_mesh(&mut self, drawable: &'a Drawable);
    /// Binds the material at `group`, then draws
    fn draw_object(&mut self, drawable: &'a Drawable, group: u32);
}

impl<'a, 'b> DrawObject<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_mesh(&mut self, drawable: &'b Drawable) {
        let Some(buffers) = &drawable.buffers else {
            log::warn!("Skipping '{}': buffers were never uploaded", drawable.material.name);
            return;
        };

        self.set_vertex_buffer(0, buffers.vertex_buffer.slice(..));
        self.set_index_buffer(buffers.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..drawable.index_count(), 0, 0..1);
    }

    fn draw_object(&mut self, drawable: &'b Drawable, group: u32) {
        let Some(bind_group) = drawable.material_bind_group() else {
            log::warn!("Skipping '{}': material is not bound", drawable.material.name);
            return;
        };

        self.set_bind_group(group, bind_group, &[]);
        self.draw_mesh(drawable);
    }
}
