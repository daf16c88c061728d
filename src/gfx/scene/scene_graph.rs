use std::rc::Rc;

use crate::{
    config::{LightingConfig, MaterialConfig},
    gfx::{
        rendering::backend::{RenderBackend, TextureHandle},
        scene::{
            lights::{AmbientLight, Color, DirectionalLight},
            object::{MaterialSlot, ModelRoot},
        },
    },
};

/// How a texture is projected when sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureMapping {
    /// Regular UV mapping
    Uv,
    /// 360° panorama sampled by reflection/view direction
    EquirectangularReflection,
}

/// A decoded environment map resident on the GPU.
///
/// One instance backs both the background and the ambient environment lighting.
#[derive(Debug, PartialEq)]
pub struct EnvironmentMap {
    pub uri: String,
    pub width: u32,
    pub height: u32,
    pub mapping: TextureMapping,
    pub gpu: TextureHandle,
}

/// What the renderer draws behind the model
#[derive(Debug, Clone, PartialEq)]
pub enum Background {
    Color(Color),
    Environment(Rc<EnvironmentMap>),
}

/// The single textured material every mesh node renders with
#[derive(Debug, Clone, PartialEq)]
pub struct TexturedMaterial {
    pub base_color: Color,
    pub roughness: f32,
    pub metalness: f32,
    pub normal_scale: f32,
    /// Color map, `None` until the texture loader finishes
    pub map: Option<TextureHandle>,
    /// Anisotropic filtering level the map was created with
    pub anisotropy: u16,
}

impl From<&MaterialConfig> for TexturedMaterial {
    fn from(config: &MaterialConfig) -> Self {
        Self {
            base_color: config.base_color,
            roughness: config.roughness,
            metalness: config.metalness,
            normal_scale: config.normal_scale,
            map: None,
            anisotropy: 1,
        }
    }
}

/// Owner of lights, environment state, the shared material and the loaded model root.
///
/// Holds at most one model root: adding a model replaces the previous one.
#[derive(Debug)]
pub struct SceneGraph {
    default_background: Color,
    background: Background,
    environment: Option<Rc<EnvironmentMap>>,
    ambient: AmbientLight,
    directional: Vec<DirectionalLight>,
    material: TexturedMaterial,
    model: Option<ModelRoot>,
}

impl SceneGraph {
    /// Creates a scene populated with the static lights and the flat background
    pub fn new(lighting: &LightingConfig, material: &MaterialConfig) -> Self {
        Self {
            default_background: lighting.background,
            background: Background::Color(lighting.background),
            environment: None,
            ambient: lighting.ambient,
            directional: lighting.directional.clone(),
            material: TexturedMaterial::from(material),
            model: None,
        }
    }

    pub fn background(&self) -> &Background {
        &self.background
    }

    pub fn environment(&self) -> Option<&Rc<EnvironmentMap>> {
        self.environment.as_ref()
    }

    pub fn ambient(&self) -> &AmbientLight {
        &self.ambient
    }

    pub fn directional_lights(&self) -> &[DirectionalLight] {
        &self.directional
    }

    /// The first directional light, which owns the shadow map
    pub fn primary_light(&self) -> Option<&DirectionalLight> {
        self.directional.first()
    }

    pub fn material(&self) -> &TexturedMaterial {
        &self.material
    }

    pub fn model(&self) -> Option<&ModelRoot> {
        self.model.as_ref()
    }

    /// Adds the model root, replacing and releasing any previous one.
    ///
    /// The root transform is final at this point, so world bounds are cached here.
    pub fn set_model<B: RenderBackend + ?Sized>(&mut self, mut model: ModelRoot, renderer: &mut B) {
        if let Some(previous) = self.model.take() {
            log::debug!("Replacing model '{}' with '{}'", previous.name, model.name);
            release_model(previous, renderer);
        }

        for node in model.nodes.iter_mut() {
            if node.gpu.is_none() {
                node.gpu = Some(renderer.create_mesh(&node.mesh));
            }
        }
        model.refresh_bounds();
        self.model = Some(model);
    }

    /// Installs the color map of the shared material, releasing a previous map
    pub fn set_material_map<B: RenderBackend + ?Sized>(
        &mut self,
        map: TextureHandle,
        anisotropy: u16,
        renderer: &mut B,
    ) {
        if let Some(previous) = self.material.map.replace(map) {
            renderer.release_texture(previous);
        }
        self.material.anisotropy = anisotropy;
    }

    /// Uses one environment map as both background and ambient lighting source
    pub fn set_environment<B: RenderBackend + ?Sized>(
        &mut self,
        environment: EnvironmentMap,
        renderer: &mut B,
    ) {
        if let Some(previous) = self.environment.take() {
            renderer.release_texture(previous.gpu);
        }
        let environment = Rc::new(environment);
        self.background = Background::Environment(Rc::clone(&environment));
        self.environment = Some(environment);
    }

    /// Releases every GPU-backed resource: mesh buffers, the material map and the environment.
    ///
    /// The scene falls back to its flat background and keeps only CPU-side light data.
    pub fn release_gpu<B: RenderBackend + ?Sized>(&mut self, renderer: &mut B) {
        if let Some(model) = self.model.take() {
            release_model(model, renderer);
        }
        if let Some(map) = self.material.map.take() {
            renderer.release_texture(map);
        }
        self.background = Background::Color(self.default_background);
        if let Some(environment) = self.environment.take() {
            renderer.release_texture(environment.gpu);
        }
    }

    /// Mesh nodes that render with the shared material
    pub fn shared_material_nodes(&self) -> usize {
        self.model
            .iter()
            .flat_map(|model| model.nodes.iter())
            .filter(|node| node.material == MaterialSlot::Shared)
            .count()
    }
}

fn release_model<B: RenderBackend + ?Sized>(mut model: ModelRoot, renderer: &mut B) {
    for node in model.nodes.iter_mut() {
        if let Some(handle) = node.gpu.take() {
            renderer.release_mesh(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::{
        rendering::headless::{HeadlessBackend, HeadlessCall, HeadlessSurface},
        scene::object::{MeshData, MeshNode},
    };
    use crate::config::RendererSettings;

    fn backend() -> (HeadlessBackend, HeadlessSurface) {
        let surface = HeadlessSurface::new(16);
        let backend = HeadlessBackend::create(surface.clone(), (800, 600), &RendererSettings::default())
            .unwrap();
        (backend, surface)
    }

    fn model(name: &str) -> ModelRoot {
        let mesh = MeshData::new(vec![0.0; 9], Vec::new(), Vec::new(), Some(vec![0, 1, 2]));
        ModelRoot::new(name, vec![MeshNode::new("mesh", mesh, None)], 0)
    }

    #[test]
    fn test_second_model_replaces_first() {
        let (mut renderer, surface) = backend();
        let mut scene = SceneGraph::new(&LightingConfig::default(), &MaterialConfig::default());

        scene.set_model(model("first"), &mut renderer);
        scene.set_model(model("second"), &mut renderer);

        assert_eq!(scene.model().unwrap().name, "second");
        assert_eq!(surface.journal().live_meshes(), 1);
    }

    #[test]
    fn test_set_model_caches_placed_bounds() {
        let (mut renderer, _surface) = backend();
        let mut scene = SceneGraph::new(&LightingConfig::default(), &MaterialConfig::default());
        let mesh = MeshData::new(
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            Vec::new(),
            Vec::new(),
            None,
        );
        let mut placed = ModelRoot::new("tri", vec![MeshNode::new("tri", mesh, None)], 0);
        placed.position.y = -0.5;

        scene.set_model(placed, &mut renderer);

        let model = scene.model().unwrap();
        let bounds = model.bounds().unwrap();
        assert_eq!(Some(bounds), model.compute_bounds());
        assert!((bounds.min.y + 0.5).abs() < 1e-6);
        assert!((bounds.max.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_environment_backs_background_and_lighting() {
        let (mut renderer, _surface) = backend();
        let mut scene = SceneGraph::new(&LightingConfig::default(), &MaterialConfig::default());
        let gpu = renderer.create_environment(&crate::loading::EnvironmentImage {
            width: 2,
            height: 1,
            rgba: vec![0.0; 8],
        });

        scene.set_environment(
            EnvironmentMap {
                uri: "environment.hdr".to_string(),
                width: 2,
                height: 1,
                mapping: TextureMapping::EquirectangularReflection,
                gpu,
            },
            &mut renderer,
        );

        let Background::Environment(background) = scene.background() else {
            panic!("background should be the environment map");
        };
        assert!(Rc::ptr_eq(background, scene.environment().unwrap()));
    }

    #[test]
    fn test_release_gpu_frees_everything() {
        let (mut renderer, surface) = backend();
        let mut scene = SceneGraph::new(&LightingConfig::default(), &MaterialConfig::default());

        scene.set_model(model("cat"), &mut renderer);
        let map = renderer.create_texture(
            &crate::loading::TextureImage {
                width: 1,
                height: 1,
                rgba: vec![255; 4],
            },
            16,
        );
        scene.set_material_map(map, 16, &mut renderer);

        scene.release_gpu(&mut renderer);

        let journal = surface.journal();
        assert_eq!(journal.live_meshes(), 0);
        assert_eq!(journal.live_textures(), 0);
        assert!(scene.model().is_none());
        assert_eq!(
            scene.background(),
            &Background::Color(LightingConfig::default().background)
        );
        assert!(journal
            .calls()
            .iter()
            .any(|call| matches!(call, HeadlessCall::ReleaseTexture(handle) if *handle == map)));
    }
}
