//! Per-pass texture bindings
//!
//! Group 3: texture unit 0 (shadow map with its comparison sampler) and
//! texture unit 5 (environment cubemap). Bound once per pass, never per
//! drawable.

use crate::{
    gfx::resources::texture_resource::TextureResource,
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
    },
};

pub struct PassBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
}

impl PassBindings {
    pub fn new(device: &wgpu::Device) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::depth_texture_2d())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Comparison))
            .next_binding_fragment(binding_types::texture_cube())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Filtering))
            .create(device, "Pass Bind Group Layout");

        Self { bind_group_layout }
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }

    pub fn create_bind_group(
        &self,
        device: &wgpu::Device,
        shadow_map: &TextureResource,
        environment: &TextureResource,
        label: &str,
    ) -> wgpu::BindGroup {
        BindGroupBuilder::new(&self.bind_group_layout)
            .texture(&shadow_map.view)
            .sampler(&shadow_map.sampler)
            .texture(&environment.view)
            .sampler(&environment.sampler)
            .create(device, label)
    }
}
