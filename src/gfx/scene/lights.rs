//! Light descriptors owned by the scene graph

use cgmath::{InnerSpace, Matrix4, Point3, Vector3};

use crate::gfx::camera::camera_rig::OPENGL_TO_WGPU_MATRIX;

/// Number of directional lights the renderer uploads
pub const MAX_DIRECTIONAL_LIGHTS: usize = 3;

/// Linear RGB color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Converts a `0xRRGGBB` sRGB color to linear space
    pub fn from_hex(hex: u32) -> Self {
        let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xff) as f32 / 255.0);
        Self {
            r: channel(16),
            g: channel(8),
            b: channel(0),
        }
    }

    pub fn scaled(self, intensity: f32) -> [f32; 3] {
        [self.r * intensity, self.g * intensity, self.b * intensity]
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: Color,
    pub intensity: f32,
}

/// Shadow map parameters of a shadow-casting light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowSettings {
    /// Square shadow map resolution in texels
    pub map_size: u32,
    pub near: f32,
    pub far: f32,
}

/// A directional light shining from `position` towards the origin
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    pub name: String,
    pub color: Color,
    pub intensity: f32,
    pub position: Vector3<f32>,
    /// `Some` when the light casts shadows
    pub shadow: Option<ShadowSettings>,
}

impl DirectionalLight {
    pub fn casts_shadow(&self) -> bool {
        self.shadow.is_some()
    }

    /// Unit vector pointing from the lit surface towards the light
    pub fn direction_to_light(&self) -> Vector3<f32> {
        if self.position.magnitude2() == 0.0 {
            Vector3::unit_y()
        } else {
            self.position.normalize()
        }
    }

    /// Orthographic view-projection used to render this light's shadow map.
    ///
    /// The light looks at `focus`; the frustum half-extent is `radius` and depth covers the
    /// configured near/far range.
    pub fn shadow_view_projection(&self, focus: Vector3<f32>, radius: f32) -> Matrix4<f32> {
        let settings = self.shadow.unwrap_or(ShadowSettings {
            map_size: 1024,
            near: 0.5,
            far: 20.0,
        });
        let eye = Point3::new(
            focus.x + self.position.x,
            focus.y + self.position.y,
            focus.z + self.position.z,
        );
        let up = if self.direction_to_light().y.abs() > 0.99 {
            Vector3::unit_z()
        } else {
            Vector3::unit_y()
        };
        let view = Matrix4::look_at_rh(eye, Point3::new(focus.x, focus.y, focus.z), up);
        let extent = radius.max(1.0);
        let proj = cgmath::ortho(
            -extent,
            extent,
            -extent,
            extent,
            settings.near,
            settings.far,
        );
        OPENGL_TO_WGPU_MATRIX * proj * view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_conversion_is_linear() {
        let white = Color::from_hex(0xffffff);
        assert!((white.r - 1.0).abs() < 1e-6);
        assert!((white.g - 1.0).abs() < 1e-6);

        let dark = Color::from_hex(0x1a1a1a);
        // 0x1a = 26 -> ~0.0103 in linear space
        assert!(dark.r > 0.009 && dark.r < 0.011);
        assert_eq!(dark.r, dark.b);
    }

    #[test]
    fn test_direction_to_light_is_normalized() {
        let light = DirectionalLight {
            name: "key".to_string(),
            color: Color::from_hex(0xffffff),
            intensity: 2.0,
            position: Vector3::new(3.0, 5.0, 4.0),
            shadow: None,
        };
        let dir = light.direction_to_light();
        assert!((dir.magnitude() - 1.0).abs() < 1e-5);
        assert!(dir.y > 0.0);
    }
}
