//! Renderer abstraction
//!
//! [`RenderBackend`] owns the GPU context and the output surface. The scene graph only keeps
//! opaque handles to the buffers and textures a backend creates, and gives them back through
//! the `release_*` calls before the backend itself is disposed.

use crate::{
    config::RendererSettings,
    error::RenderResult,
    gfx::{camera::camera_rig::CameraRig, scene::object::MeshData, scene::SceneGraph},
    loading::{EnvironmentImage, TextureImage},
};

/// Handle to GPU vertex/index buffers of one mesh node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub(crate) u32);

/// Handle to a GPU texture (color map or environment map)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub(crate) u32);

/// Monotonic handle source shared by backends
#[derive(Debug, Default)]
pub struct HandleAllocator {
    next: u32,
}

impl HandleAllocator {
    fn bump(&mut self) -> u32 {
        self.next += 1;
        self.next
    }

    pub fn mesh(&mut self) -> MeshHandle {
        MeshHandle(self.bump())
    }

    pub fn texture(&mut self) -> TextureHandle {
        TextureHandle(self.bump())
    }
}

/// The renderer: GPU context, output surface, tone mapping and exposure.
///
/// After [`dispose`](RenderBackend::dispose) the backend owns no GPU context. Resource calls
/// become no-ops and [`render`](RenderBackend::render) returns
/// [`RenderError::Disposed`](crate::error::RenderError::Disposed).
pub trait RenderBackend {
    /// Output target the backend binds to (a window, a headless journal, ...)
    type Surface;

    /// Creates the GPU context bound to `surface`, sized in physical pixels
    fn create(
        surface: Self::Surface,
        physical_size: (u32, u32),
        settings: &RendererSettings,
    ) -> RenderResult<Self>
    where
        Self: Sized;

    /// Highest anisotropic filtering level textures may use
    fn max_anisotropy(&self) -> u16;

    /// Current output surface size in physical pixels
    fn surface_size(&self) -> (u32, u32);

    /// Resizes the output surface to `width` x `height` physical pixels
    fn resize(&mut self, width: u32, height: u32);

    fn create_mesh(&mut self, mesh: &MeshData) -> MeshHandle;

    /// Uploads an sRGB color texture sampled with the given anisotropy
    fn create_texture(&mut self, image: &TextureImage, anisotropy: u16) -> TextureHandle;

    /// Uploads a linear HDR equirectangular environment map
    fn create_environment(&mut self, image: &EnvironmentImage) -> TextureHandle;

    fn release_mesh(&mut self, handle: MeshHandle);

    fn release_texture(&mut self, handle: TextureHandle);

    /// Composites the scene through the camera rig into the output surface
    fn render(&mut self, scene: &SceneGraph, rig: &CameraRig) -> RenderResult<()>;

    /// Drops the GPU context; must be the last call made by the viewer
    fn dispose(&mut self);

    fn is_disposed(&self) -> bool;
}
