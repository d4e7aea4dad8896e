//! Global uniform bindings for view and lighting data
//!
//! Group 0 of every pipeline. Binding 0 holds per-view data and differs per
//! view slot (shadow, cube faces, camera); binding 1 holds the light rig and
//! is shared by all slots.

use cgmath::{Matrix4, SquareMatrix, Vector3};

use crate::{
    gfx::camera::camera_utils::{convert_matrix4_to_array, OPENGL_TO_WGPU_MATRIX},
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
        uniform_buffer::UniformBuffer,
    },
};

/// Per-view uniform content
///
/// MUST match `ViewUniform` in the shaders.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ViewUniform {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    /// Light-space transform used both to render and to sample the shadow map
    pub shadow_transform: [[f32; 4]; 4],
    /// Eye position in homogeneous coordinates for 16 byte alignment
    pub camera_position: [f32; 4],
}

impl ViewUniform {
    pub fn new(
        view: Matrix4<f32>,
        projection: Matrix4<f32>,
        shadow_transform: Matrix4<f32>,
        camera_position: Vector3<f32>,
    ) -> Self {
        Self {
            view: convert_matrix4_to_array(view),
            projection: convert_matrix4_to_array(projection),
            shadow_transform: convert_matrix4_to_array(shadow_transform),
            camera_position: [camera_position.x, camera_position.y, camera_position.z, 1.0],
        }
    }
}

impl Default for ViewUniform {
    fn default() -> Self {
        let identity = convert_matrix4_to_array(Matrix4::identity());
        Self {
            view: identity,
            projection: identity,
            shadow_transform: identity,
            camera_position: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Point light with `1 / (c + l·d + q·d²)` attenuation
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PointLight {
    pub position: [f32; 3],
    pub color: [f32; 3],
    /// Constant, linear and quadratic terms
    pub attenuation: [f32; 3],
}

/// Fixed lighting: one directional light casting shadows, three point lights
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LightRig {
    /// Points towards the light, not normalized
    pub direction: [f32; 3],
    pub color: [f32; 3],
    /// Scales the ambient term
    pub albedo: [f32; 3],
    pub point_lights: [PointLight; 3],
}

impl Default for LightRig {
    fn default() -> Self {
        let attenuation = [1.0, 13.0, 5.0];
        Self {
            direction: [0.05, 0.7, 0.05],
            color: [0.8, 0.8, 0.8],
            albedo: [0.3, 0.3, 0.3],
            point_lights: [
                PointLight {
                    position: [-0.65, 0.2, 0.3],
                    color: [0.3, 0.3, 1.0],
                    attenuation,
                },
                PointLight {
                    position: [0.65, 0.2, 0.3],
                    color: [1.0, 0.3, 0.3],
                    attenuation,
                },
                PointLight {
                    position: [0.65, 0.2, -0.3],
                    color: [0.3, 1.0, 0.3],
                    attenuation,
                },
            ],
        }
    }
}

impl LightRig {
    /// Orthographic light-space transform for the shadow pass
    ///
    /// Rows are the light basis: `Z = -direction`, `X = (Z.y, -Z.x, 0)`,
    /// `Y = X × Z`. Scene coordinates already fit the unit cube, so no
    /// extra scaling is applied.
    pub fn shadow_transform(&self) -> Matrix4<f32> {
        let z = -Vector3::from(self.direction);
        let x = Vector3::new(z.y, -z.x, 0.0);
        let y = x.cross(z);

        // cgmath takes columns, so the basis vectors end up as rows
        #[rustfmt::skip]
        let basis = Matrix4::new(
            x.x, y.x, z.x, 0.0,
            x.y, y.y, z.y, 0.0,
            x.z, y.z, z.z, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );

        OPENGL_TO_WGPU_MATRIX * basis
    }
}

/// Light rig uniform content
///
/// MUST match `LightsUniform` in scene.wgsl.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightsUniform {
    pub direction: [f32; 4],
    pub color: [f32; 4],
    pub albedo: [f32; 4],
    pub point_positions: [[f32; 4]; 3],
    pub point_colors: [[f32; 4]; 3],
    pub point_attenuations: [[f32; 4]; 3],
}

impl From<&LightRig> for LightsUniform {
    fn from(rig: &LightRig) -> Self {
        let pad = |v: [f32; 3]| [v[0], v[1], v[2], 0.0];
        Self {
            direction: pad(rig.direction),
            color: pad(rig.color),
            albedo: pad(rig.albedo),
            point_positions: rig.point_lights.map(|l| pad(l.position)),
            point_colors: rig.point_lights.map(|l| pad(l.color)),
            point_attenuations: rig.point_lights.map(|l| pad(l.attenuation)),
        }
    }
}

pub type ViewUBO = UniformBuffer<ViewUniform>;
pub type LightsUBO = UniformBuffer<LightsUniform>;

/// One uniform buffer and bind group per view slot
struct ViewBinding {
    ubo: ViewUBO,
    bind_group: wgpu::BindGroup,
}

/// Manages the group 0 layout and one bind group per view slot
pub struct GlobalBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
    // Shared by every view bind group
    _lights: LightsUBO,
    views: Vec<ViewBinding>,
}

impl GlobalBindings {
    /// # Arguments
    /// * `device` - WGPU device for creating resources
    /// * `rig` - Light rig, uploaded once
    /// * `view_count` - Number of view slots that need their own uniforms
    pub fn new(device: &wgpu::Device, rig: &LightRig, view_count: usize) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform())
            .next_binding_fragment(binding_types::uniform())
            .create(device, "Globals Bind Group Layout");

        let lights = LightsUBO::new_with_data(device, &LightsUniform::from(rig));

        let views = (0..view_count)
            .map(|slot| {
                let ubo = ViewUBO::new_with_data(device, &ViewUniform::default());
                let bind_group = BindGroupBuilder::new(&bind_group_layout)
                    .resource(ubo.binding_resource())
                    .resource(lights.binding_resource())
                    .create(device, &format!("Global Bind Group {}", slot));
                ViewBinding { ubo, bind_group }
            })
            .collect();

        GlobalBindings {
            bind_group_layout,
            _lights: lights,
            views,
        }
    }

    pub fn update_view(&mut self, queue: &wgpu::Queue, slot: usize, uniform: ViewUniform) {
        if let Some(view) = self.views.get_mut(slot) {
            view.ubo.update_content(queue, uniform);
        }
    }

    /// Returns the bind group layout
    ///
    /// Used when creating render pipelines that need access to global uniforms.
    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }

    pub fn bind_group(&self, slot: usize) -> Option<&wgpu::BindGroup> {
        self.views.get(slot).map(|view| &view.bind_group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Vector4};

    #[test]
    fn test_uniform_sizes_are_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<ViewUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<LightsUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<LightsUniform>(), 3 * 16 + 9 * 16);
    }

    #[test]
    fn test_shadow_transform_looks_along_light() {
        let rig = LightRig::default();
        let transform = rig.shadow_transform();

        // Moving towards the light decreases depth
        let low = transform * Vector4::new(0.0, 0.0, 0.0, 1.0);
        let high = transform * Vector3::from(rig.direction).extend(1.0);
        assert!(high.z < low.z);

        // Origin maps to the middle of the depth range
        assert!((low.z - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_shadow_basis_is_orthogonal() {
        let z = -Vector3::from(LightRig::default().direction);
        let x = Vector3::new(z.y, -z.x, 0.0);
        let y = x.cross(z);
        assert!(x.dot(z).abs() < 1e-6);
        assert!(y.dot(z).abs() < 1e-6);
        assert!(x.dot(y).abs() < 1e-6);
    }

    #[test]
    fn test_lights_uniform_carries_rig() {
        let uniform = LightsUniform::from(&LightRig::default());
        assert_eq!(uniform.point_colors[1], [1.0, 0.3, 0.3, 0.0]);
        assert_eq!(uniform.point_attenuations[2], [1.0, 13.0, 5.0, 0.0]);
        assert_eq!(uniform.albedo[0], 0.3);
    }
}
