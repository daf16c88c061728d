use cgmath::*;

use crate::config::CameraConfig;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

/// Perspective camera: projection parameters plus world pose.
///
/// The orbit controller writes the pose; the resize coordinator writes the aspect ratio.
/// The projection matrix is cached and recomputed lazily after it is marked dirty.
#[derive(Debug, Clone)]
pub struct CameraRig {
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
    aspect: f32,
    position: Vector3<f32>,
    target: Vector3<f32>,
    up: Vector3<f32>,
    projection: Matrix4<f32>,
    projection_dirty: bool,
}

impl CameraRig {
    pub fn new(config: &CameraConfig, aspect: f32) -> Self {
        let mut rig = Self {
            fovy: Deg(config.fov_degrees).into(),
            znear: config.near,
            zfar: config.far,
            aspect,
            position: config.position,
            target: config.target,
            up: Vector3::unit_y(),
            projection: Matrix4::identity(),
            projection_dirty: true,
        };
        rig.update_projection_matrix();
        rig
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Sets the aspect ratio and marks the projection dirty
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.projection_dirty = true;
    }

    pub fn is_projection_dirty(&self) -> bool {
        self.projection_dirty
    }

    /// Recomputes the cached projection if anything changed since the last call
    pub fn update_projection_matrix(&mut self) {
        if !self.projection_dirty {
            return;
        }
        self.projection =
            OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar);
        self.projection_dirty = false;
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn target(&self) -> Vector3<f32> {
        self.target
    }

    pub fn set_pose(&mut self, position: Vector3<f32>, target: Vector3<f32>) {
        self.position = position;
        self.target = target;
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(
            Point3::from_vec(self.position),
            Point3::from_vec(self.target),
            self.up,
        )
    }

    pub fn build_view_projection_matrix(&self) -> Matrix4<f32> {
        self.projection * self.view_matrix()
    }
}
