//! GPU-less renderer that records every call it receives
//!
//! Used by tests and by hosts without a display. The journal is shared through
//! [`HeadlessSurface`], so the caller can inspect it after the backend has been moved into a
//! viewer.

use std::{cell::RefCell, collections::HashSet, rc::Rc};

use cgmath::Vector3;

use crate::{
    config::RendererSettings,
    error::{RenderError, RenderResult},
    gfx::{
        camera::camera_rig::CameraRig,
        rendering::backend::{HandleAllocator, MeshHandle, RenderBackend, TextureHandle},
        scene::{object::MeshData, Background, SceneGraph},
    },
    loading::{EnvironmentImage, TextureImage},
};

/// One recorded renderer call
#[derive(Debug, Clone, PartialEq)]
pub enum HeadlessCall {
    Create { width: u32, height: u32 },
    Resize { width: u32, height: u32 },
    CreateMesh(MeshHandle),
    CreateTexture { handle: TextureHandle, anisotropy: u16 },
    CreateEnvironment(TextureHandle),
    ReleaseMesh(MeshHandle),
    ReleaseTexture(TextureHandle),
    Render(FrameRecord),
    Dispose,
    /// A call that arrived after [`Dispose`](HeadlessCall::Dispose); it had no effect
    UseAfterDispose(&'static str),
}

/// What one composited frame looked like
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    pub surface_size: (u32, u32),
    pub aspect: f32,
    /// The rig's cached projection was stale when the frame was drawn
    pub stale_projection: bool,
    pub camera_position: Vector3<f32>,
    pub camera_target: Vector3<f32>,
    pub environment_background: bool,
    pub mesh_count: usize,
    pub material_map: Option<TextureHandle>,
}

/// Everything a [`HeadlessBackend`] has been asked to do
#[derive(Debug, Clone, Default)]
pub struct HeadlessJournal {
    calls: Vec<HeadlessCall>,
    live_meshes: HashSet<MeshHandle>,
    live_textures: HashSet<TextureHandle>,
    pending_frame_failures: u32,
    disposed: bool,
}

impl HeadlessJournal {
    pub fn calls(&self) -> &[HeadlessCall] {
        &self.calls
    }

    pub fn live_meshes(&self) -> usize {
        self.live_meshes.len()
    }

    pub fn live_textures(&self) -> usize {
        self.live_textures.len()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn frames(&self) -> impl Iterator<Item = &FrameRecord> {
        self.calls.iter().filter_map(|call| match call {
            HeadlessCall::Render(frame) => Some(frame),
            _ => None,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.frames().count()
    }

    pub fn last_frame(&self) -> Option<&FrameRecord> {
        self.frames().last()
    }

    /// Calls received after disposal
    pub fn use_after_dispose(&self) -> Vec<&'static str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                HeadlessCall::UseAfterDispose(name) => Some(*name),
                _ => None,
            })
            .collect()
    }

    /// Resize calls in the order received
    pub fn resizes(&self) -> Vec<(u32, u32)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                HeadlessCall::Resize { width, height } => Some((*width, *height)),
                _ => None,
            })
            .collect()
    }
}

/// Output target of a [`HeadlessBackend`]: a shared, inspectable journal
#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    journal: Rc<RefCell<HeadlessJournal>>,
    max_anisotropy: u16,
}

impl HeadlessSurface {
    /// Creates a surface whose backend reports `max_anisotropy` as its filtering limit
    pub fn new(max_anisotropy: u16) -> Self {
        Self {
            journal: Rc::new(RefCell::new(HeadlessJournal::default())),
            max_anisotropy: max_anisotropy.max(1),
        }
    }

    /// Snapshot of the journal
    pub fn journal(&self) -> HeadlessJournal {
        self.journal.borrow().clone()
    }

    /// Makes the next `count` renders fail as if the surface had no frame available
    pub fn fail_next_frames(&self, count: u32) {
        self.journal.borrow_mut().pending_frame_failures = count;
    }
}

/// Renderer that keeps no GPU state, only the journal
#[derive(Debug)]
pub struct HeadlessBackend {
    surface: HeadlessSurface,
    size: (u32, u32),
    handles: HandleAllocator,
    disposed: bool,
}

impl HeadlessBackend {
    fn record(&self, call: HeadlessCall) {
        self.surface.journal.borrow_mut().calls.push(call);
    }

    /// Records a use-after-dispose and reports whether the call should be skipped
    fn disposed_guard(&self, operation: &'static str) -> bool {
        if self.disposed {
            log::warn!("Renderer call '{}' after dispose ignored", operation);
            self.record(HeadlessCall::UseAfterDispose(operation));
        }
        self.disposed
    }
}

impl RenderBackend for HeadlessBackend {
    type Surface = HeadlessSurface;

    fn create(
        surface: HeadlessSurface,
        physical_size: (u32, u32),
        settings: &RendererSettings,
    ) -> RenderResult<Self> {
        log::debug!(
            "Headless renderer {}x{} (exposure {}, {:?})",
            physical_size.0,
            physical_size.1,
            settings.exposure,
            settings.tone_mapping
        );
        let backend = Self {
            surface,
            size: physical_size,
            handles: HandleAllocator::default(),
            disposed: false,
        };
        backend.record(HeadlessCall::Create {
            width: physical_size.0,
            height: physical_size.1,
        });
        Ok(backend)
    }

    fn max_anisotropy(&self) -> u16 {
        self.surface.max_anisotropy
    }

    fn surface_size(&self) -> (u32, u32) {
        self.size
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.disposed_guard("resize") {
            return;
        }
        self.size = (width, height);
        self.record(HeadlessCall::Resize { width, height });
    }

    fn create_mesh(&mut self, _mesh: &MeshData) -> MeshHandle {
        let handle = self.handles.mesh();
        if self.disposed_guard("create_mesh") {
            return handle;
        }
        self.surface.journal.borrow_mut().live_meshes.insert(handle);
        self.record(HeadlessCall::CreateMesh(handle));
        handle
    }

    fn create_texture(&mut self, _image: &TextureImage, anisotropy: u16) -> TextureHandle {
        let handle = self.handles.texture();
        if self.disposed_guard("create_texture") {
            return handle;
        }
        self.surface.journal.borrow_mut().live_textures.insert(handle);
        self.record(HeadlessCall::CreateTexture { handle, anisotropy });
        handle
    }

    fn create_environment(&mut self, _image: &EnvironmentImage) -> TextureHandle {
        let handle = self.handles.texture();
        if self.disposed_guard("create_environment") {
            return handle;
        }
        self.surface.journal.borrow_mut().live_textures.insert(handle);
        self.record(HeadlessCall::CreateEnvironment(handle));
        handle
    }

    fn release_mesh(&mut self, handle: MeshHandle) {
        if self.disposed_guard("release_mesh") {
            return;
        }
        self.surface.journal.borrow_mut().live_meshes.remove(&handle);
        self.record(HeadlessCall::ReleaseMesh(handle));
    }

    fn release_texture(&mut self, handle: TextureHandle) {
        if self.disposed_guard("release_texture") {
            return;
        }
        self.surface.journal.borrow_mut().live_textures.remove(&handle);
        self.record(HeadlessCall::ReleaseTexture(handle));
    }

    fn render(&mut self, scene: &SceneGraph, rig: &CameraRig) -> RenderResult<()> {
        if self.disposed_guard("render") {
            return Err(RenderError::Disposed);
        }

        {
            let mut journal = self.surface.journal.borrow_mut();
            if journal.pending_frame_failures > 0 {
                journal.pending_frame_failures -= 1;
                return Err(RenderError::Frame("headless frame dropped".to_string()));
            }
        }

        let frame = FrameRecord {
            surface_size: self.size,
            aspect: rig.aspect(),
            stale_projection: rig.is_projection_dirty(),
            camera_position: rig.position(),
            camera_target: rig.target(),
            environment_background: matches!(scene.background(), Background::Environment(_)),
            mesh_count: scene.model().map(|model| model.nodes.len()).unwrap_or(0),
            material_map: scene.material().map,
        };
        self.record(HeadlessCall::Render(frame));
        Ok(())
    }

    fn dispose(&mut self) {
        if self.disposed_guard("dispose") {
            return;
        }
        self.disposed = true;
        let mut journal = self.surface.journal.borrow_mut();
        journal.disposed = true;
        journal.calls.push(HeadlessCall::Dispose);
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}
