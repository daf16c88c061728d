//! GPU side of the shared textured material
//!
//! Every mesh node renders with one material, so there is exactly one uniform buffer and one
//! bind group. The bind group is rebuilt when the color map changes (placeholder until the
//! texture loader finishes).

use crate::{
    gfx::{
        rendering::backend::TextureHandle, resources::texture_resource::TextureResource,
        scene::TexturedMaterial,
    },
    wgpu_utils::{
        binding_types, BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc,
        UniformBuffer,
    },
};

/// GPU uniform data for the material, matches `Material` in `shaders/mesh.wgsl`
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub base_color: [f32; 4],
    pub roughness: f32,
    pub metalness: f32,
    pub normal_scale: f32,
    /// 1 when a color map is bound
    pub has_map: f32,
}

impl From<&TexturedMaterial> for MaterialUniform {
    fn from(material: &TexturedMaterial) -> Self {
        let [r, g, b] = material.base_color.to_array();
        Self {
            base_color: [r, g, b, 1.0],
            roughness: material.roughness.clamp(0.0, 1.0),
            metalness: material.metalness.clamp(0.0, 1.0),
            normal_scale: material.normal_scale,
            has_map: if material.map.is_some() { 1.0 } else { 0.0 },
        }
    }
}

pub type MaterialUBO = UniformBuffer<MaterialUniform>;

/// Material bind group management, bound to slot 1
pub struct MaterialBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
    bind_group: Option<wgpu::BindGroup>,
    /// Color map the current bind group samples (`None` = placeholder)
    bound_map: Option<TextureHandle>,
}

impl MaterialBindings {
    pub fn new(device: &wgpu::Device) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::uniform())
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Filtering))
            .create(device, "Material Bind Group Layout");

        MaterialBindings {
            bind_group_layout,
            bind_group: None,
            bound_map: None,
        }
    }

    /// Whether the bind group must be rebuilt to sample `map`
    pub fn is_stale(&self, map: Option<TextureHandle>) -> bool {
        self.bind_group.is_none() || self.bound_map != map
    }

    pub fn create_bind_group(
        &mut self,
        device: &wgpu::Device,
        ubo: &MaterialUBO,
        map: Option<TextureHandle>,
        texture: &TextureResource,
    ) {
        self.bind_group = Some(
            BindGroupBuilder::new(&self.bind_group_layout)
                .resource(ubo.binding_resource())
                .texture(&texture.view)
                .sampler(&texture.sampler)
                .create(device, "Material Bind Group"),
        );
        self.bound_map = map;
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }

    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.bind_group.as_ref()
    }
}
