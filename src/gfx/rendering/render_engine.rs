//! wgpu renderer bound to a winit window
//!
//! Each frame runs three stages: a depth-only shadow pass from the primary light, the
//! background (flat color or environment panorama) and the textured model. Color is written
//! to a multisampled target when anti-aliasing is on and resolved into the sRGB surface.

use std::{collections::HashMap, sync::Arc};

use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    config::{PowerPreference, RendererSettings},
    error::{RenderError, RenderResult},
    gfx::{
        camera::camera_rig::CameraRig,
        resources::{
            EnvironmentBindings, GlobalBindings, GlobalUBO, GlobalUBOContent, MaterialBindings,
            MaterialUBO, MaterialUniform, TextureResource,
        },
        scene::{object::MeshData, Background, SceneGraph},
    },
    loading::{EnvironmentImage, TextureImage},
};

use super::{
    backend::{HandleAllocator, MeshHandle, RenderBackend, TextureHandle},
    pipeline_manager::{DepthConfig, PipelineConfig, PipelineManager},
    render_pass_ext::{GpuMesh, RenderPassExt},
};

const DEFAULT_SHADOW_MAP_SIZE: u32 = 1024;

/// Renderer drawing into a window surface
pub struct WgpuBackend {
    /// `None` once disposed
    gpu: Option<GpuContext>,
    size: (u32, u32),
    max_anisotropy: u16,
    handles: HandleAllocator,
}

struct GpuContext {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    settings: RendererSettings,
    sample_count: u32,
    depth_texture: TextureResource,
    msaa_target: Option<TextureResource>,
    shadow_map: TextureResource,
    pipeline_manager: PipelineManager,
    global_ubo: GlobalUBO,
    global_bindings: GlobalBindings,
    material_ubo: MaterialUBO,
    material_bindings: MaterialBindings,
    environment_bindings: EnvironmentBindings,
    bound_environment: Option<TextureHandle>,
    placeholder_color: TextureResource,
    placeholder_environment: TextureResource,
    meshes: HashMap<MeshHandle, GpuMesh>,
    textures: HashMap<TextureHandle, TextureResource>,
}

/// Prefers an sRGB format so the shaders can output linear color
fn preferred_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|format| format.is_srgb())
        .or_else(|| formats.first().copied())
}

fn present_mode(vsync: bool) -> wgpu::PresentMode {
    if vsync {
        wgpu::PresentMode::Fifo
    } else {
        wgpu::PresentMode::AutoNoVsync
    }
}

fn shadow_map_size(scene: &SceneGraph) -> u32 {
    scene
        .primary_light()
        .and_then(|light| light.shadow)
        .map(|shadow| shadow.map_size)
        .unwrap_or(DEFAULT_SHADOW_MAP_SIZE)
        .max(1)
}

impl GpuContext {
    async fn new(
        window: Arc<Window>,
        (width, height): (u32, u32),
        settings: &RendererSettings,
    ) -> RenderResult<(Self, u16)> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .map_err(|e| RenderError::Surface(e.to_string()))?;

        let power_preference = match settings.power_preference {
            PowerPreference::LowPower => wgpu::PowerPreference::LowPower,
            PowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
        };
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| RenderError::Adapter(e.to_string()))?;
        log::info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Viewer Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| RenderError::Device(e.to_string()))?;

        let capabilities = surface.get_capabilities(&adapter);
        let format = preferred_format(&capabilities.formats)
            .ok_or_else(|| RenderError::Surface("surface reports no formats".to_string()))?;

        let requested_samples = settings.sample_count();
        let sample_count = if requested_samples > 1
            && !adapter
                .get_texture_format_features(format)
                .flags
                .sample_count_supported(requested_samples)
        {
            log::warn!(
                "{}x MSAA unsupported for {:?}, rendering without anti-aliasing",
                requested_samples,
                format
            );
            1
        } else {
            requested_samples
        };

        let max_anisotropy = if adapter
            .get_downlevel_capabilities()
            .flags
            .contains(wgpu::DownlevelFlags::ANISOTROPIC_FILTERING)
        {
            16
        } else {
            1
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: present_mode(settings.vsync),
            alpha_mode: capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture = TextureResource::create_depth_texture(
            &device,
            config.width,
            config.height,
            sample_count,
            "Depth Texture",
        );
        let msaa_target = (sample_count > 1).then(|| {
            TextureResource::create_msaa_target(
                &device,
                format,
                config.width,
                config.height,
                sample_count,
            )
        });
        let shadow_map = TextureResource::create_shadow_map(&device, DEFAULT_SHADOW_MAP_SIZE);

        let global_ubo = GlobalUBO::new(&device, "Globals Uniform");
        let global_bindings = GlobalBindings::new(&device, &global_ubo);
        let material_ubo = MaterialUBO::new(&device, "Material Uniform");
        let material_bindings = MaterialBindings::new(&device);
        let environment_bindings = EnvironmentBindings::new(&device);
        let placeholder_color = TextureResource::create_placeholder_color(&device, &queue);
        let placeholder_environment =
            TextureResource::create_placeholder_environment(&device, &queue);

        let device: Arc<wgpu::Device> = Arc::new(device);
        let queue: Arc<wgpu::Queue> = Arc::new(queue);

        let mut pipeline_manager = PipelineManager::new(device.clone());
        pipeline_manager.load_shader(
            "shadow",
            concat!(include_str!("shaders/common.wgsl"), include_str!("shaders/shadow.wgsl")),
        );
        pipeline_manager.load_shader(
            "background",
            concat!(
                include_str!("shaders/common.wgsl"),
                include_str!("shaders/background.wgsl")
            ),
        );
        pipeline_manager.load_shader(
            "mesh",
            concat!(include_str!("shaders/common.wgsl"), include_str!("shaders/mesh.wgsl")),
        );

        let scene_layouts = vec![
            global_bindings.bind_group_layout().clone(),
            material_bindings.bind_group_layout().clone(),
            environment_bindings.bind_group_layout().clone(),
        ];

        pipeline_manager.register_pipeline(
            "Shadow",
            PipelineConfig::default_with_shader("shadow")
                .with_label("Shadow Pass")
                .with_vertex_only()
                .with_cull_mode(None)
                .with_depth(DepthConfig::opaque(TextureResource::DEPTH_FORMAT).with_bias(2, 2.0))
                .with_bind_group_layouts(vec![global_bindings.bind_group_layout().clone()]),
        );
        pipeline_manager.register_pipeline(
            "Background",
            PipelineConfig::default_with_shader("background")
                .with_label("Background")
                .with_cull_mode(None)
                .with_no_vertex_buffers()
                .with_depth(DepthConfig::read_only_always(TextureResource::DEPTH_FORMAT))
                .with_color_format(format)
                .with_sample_count(sample_count)
                .with_bind_group_layouts(scene_layouts.clone()),
        );
        pipeline_manager.register_pipeline(
            "Mesh",
            PipelineConfig::default_with_shader("mesh")
                .with_label("Mesh")
                .with_depth(DepthConfig::opaque(TextureResource::DEPTH_FORMAT))
                .with_color_format(format)
                .with_sample_count(sample_count)
                .with_bind_group_layouts(scene_layouts),
        );
        pipeline_manager
            .create_all_pipelines()
            .map_err(|errors| RenderError::Device(errors.join("; ")))?;

        let context = GpuContext {
            surface,
            device,
            queue,
            config,
            settings: *settings,
            sample_count,
            depth_texture,
            msaa_target,
            shadow_map,
            pipeline_manager,
            global_ubo,
            global_bindings,
            material_ubo,
            material_bindings,
            environment_bindings,
            bound_environment: None,
            placeholder_color,
            placeholder_environment,
            meshes: HashMap::new(),
            textures: HashMap::new(),
        };
        Ok((context, max_anisotropy))
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);

        self.depth_texture = TextureResource::create_depth_texture(
            &self.device,
            width,
            height,
            self.sample_count,
            "Depth Texture",
        );
        if self.msaa_target.is_some() {
            self.msaa_target = Some(TextureResource::create_msaa_target(
                &self.device,
                self.config.format,
                width,
                height,
                self.sample_count,
            ));
        }
    }

    fn upload_mesh(&self, mesh: &MeshData) -> GpuMesh {
        let vertices = mesh.vertices();
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Vertex Buffer"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = mesh.indices.as_ref().map(|indices| {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Mesh Index Buffer"),
                    contents: bytemuck::cast_slice(indices),
                    usage: wgpu::BufferUsages::INDEX,
                })
        });

        GpuMesh {
            vertex_buffer,
            index_buffer,
            vertex_count: vertices.len() as u32,
            index_count: mesh.indices.as_ref().map_or(0, |indices| indices.len() as u32),
        }
    }

    /// Recreates the shadow map when the primary light asks for another resolution
    fn sync_shadow_map(&mut self, scene: &SceneGraph) -> bool {
        let size = shadow_map_size(scene).min(self.device.limits().max_texture_dimension_2d);
        if self.shadow_map.texture.width() == size {
            return false;
        }
        log::debug!("Shadow map resized to {}x{}", size, size);
        self.shadow_map = TextureResource::create_shadow_map(&self.device, size);
        true
    }

    fn sync_material(&mut self, scene: &SceneGraph) {
        let map = scene.material().map;
        if !self.material_bindings.is_stale(map) {
            return;
        }
        let texture = map
            .and_then(|handle| self.textures.get(&handle))
            .unwrap_or(&self.placeholder_color);
        self.material_bindings
            .create_bind_group(&self.device, &self.material_ubo, map, texture);
    }

    fn sync_environment(&mut self, scene: &SceneGraph, force: bool) {
        let environment = scene.environment().map(|environment| environment.gpu);
        if !force
            && self.environment_bindings.bind_group().is_some()
            && self.bound_environment == environment
        {
            return;
        }
        let texture = environment
            .and_then(|handle| self.textures.get(&handle))
            .unwrap_or(&self.placeholder_environment);
        self.environment_bindings
            .create_bind_group(&self.device, texture, &self.shadow_map);
        self.bound_environment = environment;
    }

    fn render(&mut self, scene: &SceneGraph, rig: &CameraRig) -> RenderResult<()> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return Err(RenderError::Frame(
                    "surface lost, reconfigured for the next frame".to_string(),
                ));
            }
            Err(e) => return Err(RenderError::Frame(e.to_string())),
        };

        self.global_ubo.update_content(
            &self.queue,
            GlobalUBOContent::from_scene(scene, rig, &self.settings),
        );
        self.material_ubo
            .update_content(&self.queue, MaterialUniform::from(scene.material()));
        let shadow_map_recreated = self.sync_shadow_map(scene);
        self.sync_material(scene);
        self.sync_environment(scene, shadow_map_recreated);

        let surface_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let model = scene.model();
        let casts_shadow = scene
            .primary_light()
            .is_some_and(|light| light.casts_shadow());

        {
            let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadow_map.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if let (true, Some(pipeline), Some(model)) = (
                casts_shadow,
                self.pipeline_manager.pipeline("Shadow"),
                model,
            ) {
                shadow_pass.set_pipeline(pipeline);
                shadow_pass.set_bind_group(0, self.global_bindings.bind_group(), &[]);
                for node in model.nodes.iter().filter(|node| node.cast_shadow) {
                    if let Some(mesh) = node.gpu.and_then(|handle| self.meshes.get(&handle)) {
                        shadow_pass.draw_gpu_mesh(mesh);
                    }
                }
            }
        }

        {
            let (color_view, resolve_target) = match &self.msaa_target {
                Some(msaa) => (&msaa.view, Some(&surface_view)),
                None => (&surface_view, None),
            };
            let clear = match scene.background() {
                Background::Color(color) => wgpu::Color {
                    r: color.r as f64,
                    g: color.g as f64,
                    b: color.b as f64,
                    a: 1.0,
                },
                Background::Environment(_) => wgpu::Color::BLACK,
            };

            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if let (Some(material), Some(environment)) = (
                self.material_bindings.bind_group(),
                self.environment_bindings.bind_group(),
            ) {
                render_pass.set_bind_group(0, self.global_bindings.bind_group(), &[]);
                render_pass.set_bind_group(1, material, &[]);
                render_pass.set_bind_group(2, environment, &[]);

                if let Some(pipeline) = self.pipeline_manager.pipeline("Background") {
                    render_pass.set_pipeline(pipeline);
                    render_pass.draw(0..3, 0..1);
                }

                if let (Some(pipeline), Some(model)) =
                    (self.pipeline_manager.pipeline("Mesh"), model)
                {
                    render_pass.set_pipeline(pipeline);
                    for node in &model.nodes {
                        if let Some(mesh) = node.gpu.and_then(|handle| self.meshes.get(&handle)) {
                            render_pass.draw_gpu_mesh(mesh);
                        }
                    }
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

impl WgpuBackend {
    /// Logs a renderer call made after disposal; returns the live context otherwise
    fn live(&mut self, operation: &str) -> Option<&mut GpuContext> {
        if self.gpu.is_none() {
            log::warn!("Renderer call '{}' after dispose ignored", operation);
        }
        self.gpu.as_mut()
    }
}

impl RenderBackend for WgpuBackend {
    type Surface = Arc<Window>;

    fn create(
        window: Arc<Window>,
        physical_size: (u32, u32),
        settings: &RendererSettings,
    ) -> RenderResult<Self> {
        let (gpu, max_anisotropy) =
            pollster::block_on(GpuContext::new(window, physical_size, settings))?;
        log::info!(
            "Renderer ready: {}x{}, {:?}, {}x MSAA, anisotropy up to {}",
            gpu.config.width,
            gpu.config.height,
            gpu.config.format,
            gpu.sample_count,
            max_anisotropy
        );
        Ok(Self {
            size: (gpu.config.width, gpu.config.height),
            gpu: Some(gpu),
            max_anisotropy,
            handles: HandleAllocator::default(),
        })
    }

    fn max_anisotropy(&self) -> u16 {
        self.max_anisotropy
    }

    fn surface_size(&self) -> (u32, u32) {
        self.size
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let Some(gpu) = self.live("resize") else {
            return;
        };
        gpu.resize(width, height);
        self.size = (width, height);
    }

    fn create_mesh(&mut self, mesh: &MeshData) -> MeshHandle {
        let handle = self.handles.mesh();
        if let Some(gpu) = self.live("create_mesh") {
            let uploaded = gpu.upload_mesh(mesh);
            gpu.meshes.insert(handle, uploaded);
        }
        handle
    }

    fn create_texture(&mut self, image: &TextureImage, anisotropy: u16) -> TextureHandle {
        let handle = self.handles.texture();
        let anisotropy = anisotropy.min(self.max_anisotropy);
        if let Some(gpu) = self.live("create_texture") {
            let texture = TextureResource::create_color_map(
                &gpu.device,
                &gpu.queue,
                image,
                anisotropy,
                "Color Map",
            );
            gpu.textures.insert(handle, texture);
        }
        handle
    }

    fn create_environment(&mut self, image: &EnvironmentImage) -> TextureHandle {
        let handle = self.handles.texture();
        if let Some(gpu) = self.live("create_environment") {
            let texture = TextureResource::create_environment(
                &gpu.device,
                &gpu.queue,
                image,
                "Environment Map",
            );
            gpu.textures.insert(handle, texture);
        }
        handle
    }

    fn release_mesh(&mut self, handle: MeshHandle) {
        if let Some(gpu) = self.live("release_mesh") {
            gpu.meshes.remove(&handle);
        }
    }

    fn release_texture(&mut self, handle: TextureHandle) {
        if let Some(gpu) = self.live("release_texture") {
            gpu.textures.remove(&handle);
        }
    }

    fn render(&mut self, scene: &SceneGraph, rig: &CameraRig) -> RenderResult<()> {
        match self.gpu.as_mut() {
            Some(gpu) => gpu.render(scene, rig),
            None => Err(RenderError::Disposed),
        }
    }

    fn dispose(&mut self) {
        let Some(gpu) = self.gpu.take() else {
            log::warn!("Renderer call 'dispose' after dispose ignored");
            return;
        };
        if !gpu.meshes.is_empty() || !gpu.textures.is_empty() {
            log::warn!(
                "Disposing renderer with {} meshes and {} textures still resident",
                gpu.meshes.len(),
                gpu.textures.len()
            );
        }
        log::debug!("Renderer disposed");
    }

    fn is_disposed(&self) -> bool {
        self.gpu.is_none()
    }
}
