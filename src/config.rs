//! Viewer configuration
//!
//! Every setting has a default that reproduces the stock cat-model viewer. Configs are plain
//! structs with consuming `with_*` builders:
//!
//! ```no_run
//! use orbitview::config::{AssetConfig, ViewerConfig};
//!
//! let config = ViewerConfig::default()
//!     .with_title("Teapot")
//!     .with_assets(AssetConfig::default().with_geometry("teapot.obj"));
//! ```

use std::f32::consts::PI;

use cgmath::Vector3;

use crate::gfx::scene::lights::{AmbientLight, Color, DirectionalLight, ShadowSettings};

/// Top-level configuration handed to [`Viewer::new`](crate::viewer::Viewer::new)
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub title: String,
    /// Initial logical window size used by the winit host
    pub initial_size: (u32, u32),
    pub assets: AssetConfig,
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub lighting: LightingConfig,
    pub material: MaterialConfig,
    pub renderer: RendererSettings,
    pub placement: ModelPlacement,
    pub framing: FramingConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "3D Cat Model Viewer".to_string(),
            initial_size: (1200, 800),
            assets: AssetConfig::default(),
            camera: CameraConfig::default(),
            controls: ControlsConfig::default(),
            lighting: LightingConfig::default(),
            material: MaterialConfig::default(),
            renderer: RendererSettings::default(),
            placement: ModelPlacement::default(),
            framing: FramingConfig::default(),
        }
    }
}

impl ViewerConfig {
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_owned();
        self
    }

    pub fn with_initial_size(mut self, width: u32, height: u32) -> Self {
        self.initial_size = (width, height);
        self
    }

    pub fn with_assets(mut self, assets: AssetConfig) -> Self {
        self.assets = assets;
        self
    }

    pub fn with_camera(mut self, camera: CameraConfig) -> Self {
        self.camera = camera;
        self
    }

    pub fn with_controls(mut self, controls: ControlsConfig) -> Self {
        self.controls = controls;
        self
    }

    pub fn with_lighting(mut self, lighting: LightingConfig) -> Self {
        self.lighting = lighting;
        self
    }

    pub fn with_renderer(mut self, renderer: RendererSettings) -> Self {
        self.renderer = renderer;
        self
    }
}

/// Asset references resolved through the viewer's [`AssetSource`](crate::loading::AssetSource)
#[derive(Debug, Clone)]
pub struct AssetConfig {
    pub geometry: String,
    pub texture: String,
    pub environment: String,
    /// Display name reported in [`ModelStats`](crate::gfx::scene::ModelStats)
    pub model_name: String,
    /// Count the environment map in the aggregate loading percentage.
    ///
    /// Off by default: the environment map is a non-blocking background enhancement and
    /// only texture and geometry drive the percentage.
    pub track_environment_progress: bool,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            geometry: "model.obj".to_string(),
            texture: "texture.jpg".to_string(),
            environment: "environment.hdr".to_string(),
            model_name: "Cat Model".to_string(),
            track_environment_progress: false,
        }
    }
}

impl AssetConfig {
    pub fn with_geometry(mut self, uri: &str) -> Self {
        self.geometry = uri.to_owned();
        self
    }

    pub fn with_texture(mut self, uri: &str) -> Self {
        self.texture = uri.to_owned();
        self
    }

    pub fn with_environment(mut self, uri: &str) -> Self {
        self.environment = uri.to_owned();
        self
    }

    pub fn with_model_name(mut self, name: &str) -> Self {
        self.model_name = name.to_owned();
        self
    }

    pub fn with_environment_progress(mut self, track: bool) -> Self {
        self.track_environment_progress = track;
        self
    }
}

/// Perspective projection and default pose of the camera rig
#[derive(Debug, Clone, Copy)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vector3<f32>,
    pub target: Vector3<f32>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            near: 0.1,
            far: 1000.0,
            position: Vector3::new(0.0, 0.5, 5.0),
            target: Vector3::new(0.0, 0.5, 0.0),
        }
    }
}

/// Orbit controller constraints and feel
#[derive(Debug, Clone, Copy)]
pub struct ControlsConfig {
    /// Share of the remaining delta applied per tick, in (0, 1]
    pub damping_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Polar bounds in radians; sanitized to lie strictly inside (0, π)
    pub min_polar: f32,
    pub max_polar: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub enable_pan: bool,
    pub auto_rotate: bool,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            damping_factor: 0.05,
            min_distance: 1.0,
            max_distance: 20.0,
            min_polar: PI * 0.2,
            max_polar: PI - 1e-3,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            enable_pan: false,
            auto_rotate: false,
        }
    }
}

impl ControlsConfig {
    pub fn with_damping(mut self, factor: f32) -> Self {
        self.damping_factor = factor;
        self
    }

    pub fn with_distance_bounds(mut self, min: f32, max: f32) -> Self {
        self.min_distance = min;
        self.max_distance = max;
        self
    }

    pub fn with_polar_bounds(mut self, min: f32, max: f32) -> Self {
        self.min_polar = min;
        self.max_polar = max;
        self
    }
}

/// Static lights and the flat background shown until an environment map arrives
#[derive(Debug, Clone)]
pub struct LightingConfig {
    pub background: Color,
    pub ambient: AmbientLight,
    /// Directional lights; the first one is the primary (shadow-casting) light.
    /// The renderer uses at most [`MAX_DIRECTIONAL_LIGHTS`](crate::gfx::scene::lights::MAX_DIRECTIONAL_LIGHTS).
    pub directional: Vec<DirectionalLight>,
}

impl Default for LightingConfig {
    fn default() -> Self {
        let white = Color::from_hex(0xffffff);
        Self {
            background: Color::from_hex(0x1a1a1a),
            ambient: AmbientLight {
                color: white,
                intensity: 0.5,
            },
            directional: vec![
                DirectionalLight {
                    name: "key".to_string(),
                    color: white,
                    intensity: 2.0,
                    position: Vector3::new(3.0, 5.0, 4.0),
                    shadow: Some(ShadowSettings {
                        map_size: 1024,
                        near: 0.5,
                        far: 20.0,
                    }),
                },
                DirectionalLight {
                    name: "fill".to_string(),
                    color: white,
                    intensity: 0.75,
                    position: Vector3::new(-3.0, 2.0, 2.0),
                    shadow: None,
                },
                DirectionalLight {
                    name: "rim".to_string(),
                    color: white,
                    intensity: 1.0,
                    position: Vector3::new(-2.0, 3.0, -3.0),
                    shadow: None,
                },
            ],
        }
    }
}

/// Parameters of the single textured material shared by every mesh of the model
#[derive(Debug, Clone, Copy)]
pub struct MaterialConfig {
    pub base_color: Color,
    pub roughness: f32,
    pub metalness: f32,
    pub normal_scale: f32,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self {
            base_color: Color::from_hex(0xffffff),
            roughness: 0.3,
            metalness: 0.2,
            normal_scale: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneMapping {
    None,
    AcesFilmic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerPreference {
    LowPower,
    HighPerformance,
}

/// Output settings owned by the renderer
#[derive(Debug, Clone, Copy)]
pub struct RendererSettings {
    /// Multisample anti-aliasing
    pub antialias: bool,
    pub power_preference: PowerPreference,
    pub tone_mapping: ToneMapping,
    pub exposure: f32,
    pub vsync: bool,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            antialias: true,
            power_preference: PowerPreference::HighPerformance,
            tone_mapping: ToneMapping::AcesFilmic,
            exposure: 1.25,
            vsync: true,
        }
    }
}

impl RendererSettings {
    pub fn with_exposure(mut self, exposure: f32) -> Self {
        self.exposure = exposure;
        self
    }

    pub fn with_tone_mapping(mut self, tone_mapping: ToneMapping) -> Self {
        self.tone_mapping = tone_mapping;
        self
    }

    pub fn with_antialias(mut self, antialias: bool) -> Self {
        self.antialias = antialias;
        self
    }

    /// MSAA sample count used for every scene pass
    pub fn sample_count(&self) -> u32 {
        if self.antialias {
            4
        } else {
            1
        }
    }
}

/// Fixed transform applied to the loaded model root to match its authored orientation
#[derive(Debug, Clone, Copy)]
pub struct ModelPlacement {
    pub y_offset: f32,
    pub yaw: f32,
}

impl Default for ModelPlacement {
    fn default() -> Self {
        Self {
            y_offset: -0.5,
            yaw: PI,
        }
    }
}

/// Camera auto-framing applied once when geometry loads
#[derive(Debug, Clone, Copy)]
pub struct FramingConfig {
    /// Camera distance as a multiple of the model's bounding size
    pub distance_factor: f32,
    /// Controller max distance as a multiple of the model's bounding size
    pub max_distance_factor: f32,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            distance_factor: 1.5,
            max_distance_factor: 3.0,
        }
    }
}
