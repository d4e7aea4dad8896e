//! Material records and the per-asset material library
//!
//! A [`Material`] is the immutable parameter record read from a material
//! description. The [`MaterialLibrary`] owns the materials of one mesh asset,
//! the decoded texture images they reference, and the GPU copies of those
//! images, uploaded on first use and shared between drawables.

use std::collections::{BTreeMap, HashMap};

use crate::{
    gfx::{assets::texture_image::TextureImage, resources::texture_resource::TextureResource},
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
        uniform_buffer::UniformBuffer,
    },
};

/// Texture slots a material can fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureRole {
    /// `map_Ka`, sampled unconditionally
    Albedo,
    /// `map_Ks`
    SpecularMask,
    /// `map_Kd`
    DiffuseOverlay,
    /// `norm`
    NormalMap,
}

impl TextureRole {
    pub const ALL: [TextureRole; 4] = [
        TextureRole::Albedo,
        TextureRole::SpecularMask,
        TextureRole::DiffuseOverlay,
        TextureRole::NormalMap,
    ];
}

/// Texture path per role. `None` means the role is absent, which is a
/// normal state rather than an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextureRefs {
    pub albedo: Option<String>,
    pub specular_mask: Option<String>,
    pub diffuse_overlay: Option<String>,
    pub normal_map: Option<String>,
}

impl TextureRefs {
    pub fn get(&self, role: TextureRole) -> Option<&str> {
        match role {
            TextureRole::Albedo => self.albedo.as_deref(),
            TextureRole::SpecularMask => self.specular_mask.as_deref(),
            TextureRole::DiffuseOverlay => self.diffuse_overlay.as_deref(),
            TextureRole::NormalMap => self.normal_map.as_deref(),
        }
    }

    pub fn set(&mut self, role: TextureRole, path: Option<String>) {
        let slot = match role {
            TextureRole::Albedo => &mut self.albedo,
            TextureRole::SpecularMask => &mut self.specular_mask,
            TextureRole::DiffuseOverlay => &mut self.diffuse_overlay,
            TextureRole::NormalMap => &mut self.normal_map,
        };
        *slot = path.filter(|p| !p.is_empty());
    }

    pub fn is_empty(&self) -> bool {
        TextureRole::ALL.iter().all(|role| self.get(*role).is_none())
    }
}

/// Material parameter record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Material {
    pub name: String,
    /// `Ns`
    pub specular_exponent: f32,
    /// `Ni`
    pub optical_density: f32,
    /// `d`
    pub dissolve: f32,
    /// `Tr`
    pub transparency: f32,
    pub illum: i32,
    /// `Ka`
    pub ambient: [f32; 3],
    /// `Kd`
    pub diffuse: [f32; 3],
    /// `Ks`
    pub specular: [f32; 3],
    /// `Ke`
    pub emissive: [f32; 3],
    /// `Tf`
    pub transmission_filter: [f32; 3],
    pub textures: TextureRefs,
}

impl Material {
    /// All-zero material with no textures
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

/// GPU uniform data for materials
///
/// MUST match `MaterialUniform` in scene.wgsl.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub ambient_color: [f32; 3],
    pub has_diffuse_map: u32,
    pub diffuse_color: [f32; 3],
    pub has_specular_map: u32,
    pub has_normal_map: u32,
    pub is_reflective: u32,
    _padding: [u32; 2],
}

impl MaterialUniform {
    pub fn new(material: &Material, bound: &BoundRoles, reflective: bool) -> Self {
        Self {
            ambient_color: material.ambient,
            has_diffuse_map: bound.diffuse_overlay as u32,
            diffuse_color: material.diffuse,
            has_specular_map: bound.specular_mask as u32,
            has_normal_map: bound.normal_map as u32,
            is_reflective: reflective as u32,
            _padding: [0; 2],
        }
    }
}

pub type MaterialUBO = UniformBuffer<MaterialUniform>;

/// Group 2 layout: material uniform, the four role textures in unit order
/// (albedo, diffuse overlay, specular mask, normal map) and one sampler
pub struct MaterialBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
}

impl MaterialBindings {
    pub fn new(device: &wgpu::Device) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::uniform())
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Filtering))
            .create(device, "Material Bind Group Layout");

        Self { bind_group_layout }
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }

    /// `textures` are in unit order: albedo, diffuse overlay, specular mask, normal map
    pub fn create_bind_group(
        &self,
        device: &wgpu::Device,
        ubo: &MaterialUBO,
        textures: [&TextureResource; 4],
        label: &str,
    ) -> wgpu::BindGroup {
        let [albedo, diffuse, specular, normal] = textures;
        BindGroupBuilder::new(&self.bind_group_layout)
            .resource(ubo.binding_resource())
            .texture(&albedo.view)
            .texture(&diffuse.view)
            .texture(&specular.view)
            .texture(&normal.view)
            .sampler(&albedo.sampler)
            .create(device, label)
    }
}

/// Which optional roles actually resolved to a texture
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundRoles {
    pub albedo: bool,
    pub specular_mask: bool,
    pub diffuse_overlay: bool,
    pub normal_map: bool,
}

/// Materials, texture images and their GPU uploads for one mesh asset
///
/// Default-texture policy: a role that is absent (or whose path did not
/// resolve) is bound to a 1x1 opaque white texture. The albedo sampler is
/// read unconditionally by the shader, so it always gets *some* texture;
/// the other roles are additionally flagged off in the material uniform.
pub struct MaterialLibrary {
    materials: HashMap<String, Material>,
    images: BTreeMap<String, TextureImage>,
    uploaded: HashMap<String, TextureResource>,
    fallback: Option<TextureResource>,
}

impl MaterialLibrary {
    pub fn new(materials: HashMap<String, Material>, images: BTreeMap<String, TextureImage>) -> Self {
        Self {
            materials,
            images,
            uploaded: HashMap::new(),
            fallback: None,
        }
    }

    pub fn material(&self, name: &str) -> Option<&Material> {
        self.materials.get(name)
    }

    pub fn materials(&self) -> &HashMap<String, Material> {
        &self.materials
    }

    pub fn image(&self, path: &str) -> Option<&TextureImage> {
        self.images.get(path)
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Resolves a role of `material` to its decoded image, if present
    pub fn resolve(&self, material: &Material, role: TextureRole) -> Option<&TextureImage> {
        material.textures.get(role).and_then(|path| self.images.get(path))
    }

    /// True when the material's albedo texture carries an alpha channel
    pub fn uses_alpha(&self, material: &Material) -> bool {
        self.resolve(material, TextureRole::Albedo)
            .map(TextureImage::has_alpha)
            .unwrap_or(false)
    }

    /// Which roles resolve for `material`
    pub fn bound_roles(&self, material: &Material) -> BoundRoles {
        BoundRoles {
            albedo: self.resolve(material, TextureRole::Albedo).is_some(),
            specular_mask: self.resolve(material, TextureRole::SpecularMask).is_some(),
            diffuse_overlay: self.resolve(material, TextureRole::DiffuseOverlay).is_some(),
            normal_map: self.resolve(material, TextureRole::NormalMap).is_some(),
        }
    }

    /// GPU texture for a role, uploading the image the first time a path is
    /// requested. Returns `None` when the role is absent.
    pub fn gpu_texture(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        material: &Material,
        role: TextureRole,
    ) -> Option<TextureResource> {
        let path = material.textures.get(role)?;

        if let Some(resource) = self.uploaded.get(path) {
            return Some(resource.clone());
        }

        let Some(image) = self.images.get(path) else {
            log::warn!(
                "Material '{}' references texture '{}' that was never loaded",
                material.name,
                path
            );
            return None;
        };

        let resource = TextureResource::create_from_image(device, queue, image, path);
        self.uploaded.insert(path.to_string(), resource.clone());
        Some(resource)
    }

    /// The explicit default texture bound for absent roles
    pub fn fallback_texture(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> TextureResource {
        self.fallback
            .get_or_insert_with(|| {
                TextureResource::create_from_image(device, queue, &TextureImage::white(), "Fallback White")
            })
            .clone()
    }
}
