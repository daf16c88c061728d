//! Global uniform bindings for camera, lights and environment
//!
//! Group 0 carries the per-frame uniform shared by every pipeline. Group 2 carries the
//! environment panorama and the shadow map, which the mesh and background passes sample.
//!
//! `GlobalUBOContent` MUST match the `Globals` struct in `shaders/common.wgsl` exactly.

use cgmath::{Matrix4, SquareMatrix, Vector3, Zero};

use crate::{
    config::{RendererSettings, ToneMapping},
    gfx::{
        camera::camera_rig::CameraRig,
        resources::texture_resource::TextureResource,
        scene::{lights::MAX_DIRECTIONAL_LIGHTS, Background, SceneGraph},
    },
    wgpu_utils::{
        binding_types, BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc,
        UniformBuffer,
    },
};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalUBOContent {
    pub view_proj: [[f32; 4]; 4],
    pub inv_view_proj: [[f32; 4]; 4],
    /// Model root transform
    pub model: [[f32; 4]; 4],
    pub light_view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    /// Ambient color premultiplied by intensity
    pub ambient: [f32; 4],
    /// xyz: direction towards the light, w: 1 when the slot is in use
    pub light_directions: [[f32; 4]; MAX_DIRECTIONAL_LIGHTS],
    /// rgb: color premultiplied by intensity
    pub light_colors: [[f32; 4]; MAX_DIRECTIONAL_LIGHTS],
    /// rgb: flat background color, w: 1 when an environment map is bound
    pub background: [f32; 4],
    /// exposure, tone mapping mode, shadows enabled, environment intensity
    pub params: [f32; 4],
}
// 4 * 64 + 2 * 16 + 2 * 3 * 16 + 2 * 16 = 416 bytes

pub type GlobalUBO = UniformBuffer<GlobalUBOContent>;

impl GlobalUBOContent {
    /// Gathers the per-frame uniform from the scene and the camera rig
    pub fn from_scene(scene: &SceneGraph, rig: &CameraRig, settings: &RendererSettings) -> Self {
        let view_proj = rig.build_view_projection_matrix();
        let inv_view_proj = view_proj.invert().unwrap_or_else(Matrix4::identity);

        let model = scene
            .model()
            .map(|model| model.transform())
            .unwrap_or_else(Matrix4::identity);

        let (focus, radius) = scene
            .model()
            .and_then(|model| model.bounds())
            .map(|bounds| (bounds.center(), bounds.size() * 0.5))
            .unwrap_or((Vector3::zero(), 1.0));

        let primary = scene.primary_light();
        let light_view_proj = primary
            .map(|light| light.shadow_view_projection(focus, radius))
            .unwrap_or_else(Matrix4::identity);
        let receives_shadow = scene
            .model()
            .map(|model| model.nodes.iter().any(|node| node.receive_shadow))
            .unwrap_or(false);
        let shadows_enabled =
            receives_shadow && primary.map(|light| light.casts_shadow()).unwrap_or(false);

        let mut light_directions = [[0.0; 4]; MAX_DIRECTIONAL_LIGHTS];
        let mut light_colors = [[0.0; 4]; MAX_DIRECTIONAL_LIGHTS];
        for (slot, light) in scene
            .directional_lights()
            .iter()
            .take(MAX_DIRECTIONAL_LIGHTS)
            .enumerate()
        {
            let direction = light.direction_to_light();
            light_directions[slot] = [direction.x, direction.y, direction.z, 1.0];
            let [r, g, b] = light.color.scaled(light.intensity);
            light_colors[slot] = [r, g, b, 0.0];
        }

        let ambient = scene.ambient();
        let [ar, ag, ab] = ambient.color.scaled(ambient.intensity);

        let background = match scene.background() {
            Background::Color(color) => {
                let [r, g, b] = color.to_array();
                [r, g, b, 0.0]
            }
            Background::Environment(_) => [0.0, 0.0, 0.0, 1.0],
        };
        let tone_mapping = match settings.tone_mapping {
            ToneMapping::None => 0.0,
            ToneMapping::AcesFilmic => 1.0,
        };
        let environment_intensity = if scene.environment().is_some() { 1.0 } else { 0.0 };

        let eye = rig.position();
        Self {
            view_proj: view_proj.into(),
            inv_view_proj: inv_view_proj.into(),
            model: model.into(),
            light_view_proj: light_view_proj.into(),
            camera_position: [eye.x, eye.y, eye.z, 1.0],
            ambient: [ar, ag, ab, 0.0],
            light_directions,
            light_colors,
            background,
            params: [
                settings.exposure,
                tone_mapping,
                if shadows_enabled { 1.0 } else { 0.0 },
                environment_intensity,
            ],
        }
    }
}

/// Bind group layout and bind group for the global uniform, bound to slot 0
pub struct GlobalBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
    bind_group: wgpu::BindGroup,
}

impl GlobalBindings {
    pub fn new(device: &wgpu::Device, ubo: &GlobalUBO) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform())
            .create(device, "Globals Bind Group Layout");
        let bind_group = BindGroupBuilder::new(&bind_group_layout)
            .resource(ubo.binding_resource())
            .create(device, "Globals Bind Group");

        GlobalBindings {
            bind_group_layout,
            bind_group,
        }
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

/// Environment panorama plus the shadow map, bound to slot 2.
///
/// The bind group is rebuilt whenever a different panorama is bound.
pub struct EnvironmentBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
    bind_group: Option<wgpu::BindGroup>,
}

impl EnvironmentBindings {
    pub fn new(device: &wgpu::Device) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Filtering))
            .next_binding_fragment(binding_types::texture_depth_2d())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Comparison))
            .create(device, "Environment Bind Group Layout");

        EnvironmentBindings {
            bind_group_layout,
            bind_group: None,
        }
    }

    pub fn create_bind_group(
        &mut self,
        device: &wgpu::Device,
        environment: &TextureResource,
        shadow_map: &TextureResource,
    ) {
        self.bind_group = Some(
            BindGroupBuilder::new(&self.bind_group_layout)
                .texture(&environment.view)
                .sampler(&environment.sampler)
                .texture(&shadow_map.view)
                .sampler(&shadow_map.sampler)
                .create(device, "Environment Bind Group"),
        );
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }

    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.bind_group.as_ref()
    }
}
