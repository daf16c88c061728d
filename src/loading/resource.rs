//! Resource states, decoded payloads and the completion messages loaders emit

use futures::channel::mpsc::UnboundedSender;

use crate::{error::ResourceError, gfx::scene::ModelRoot};

/// The three assets the viewer streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Geometry,
    Texture,
    Environment,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Geometry,
        ResourceKind::Texture,
        ResourceKind::Environment,
    ];
}

/// Lifecycle of one resource load; `Loaded` and `Failed` are terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceStatus {
    Pending,
    Loaded,
    Failed(ResourceError),
}

impl ResourceStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ResourceStatus::Pending)
    }
}

/// Decoded 8-bit sRGB color texture
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 rows
    pub rgba: Vec<u8>,
}

/// Decoded linear HDR equirectangular panorama
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentImage {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA32F rows
    pub rgba: Vec<f32>,
}

/// Generation of one mount; completions carrying an older token are stale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MountToken(pub(crate) u64);

impl MountToken {
    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// What a loader reports back to the viewer
#[derive(Debug)]
pub enum LoadEvent {
    /// Bytes fetched so far; `total` is 0 when the size is unknown
    Progress {
        kind: ResourceKind,
        loaded: u64,
        total: u64,
    },
    GeometryLoaded(ModelRoot),
    TextureLoaded(TextureImage),
    EnvironmentLoaded {
        uri: String,
        image: EnvironmentImage,
    },
    Failed {
        kind: ResourceKind,
        error: ResourceError,
    },
}

impl LoadEvent {
    pub fn kind(&self) -> ResourceKind {
        match self {
            LoadEvent::Progress { kind, .. } | LoadEvent::Failed { kind, .. } => *kind,
            LoadEvent::GeometryLoaded(_) => ResourceKind::Geometry,
            LoadEvent::TextureLoaded(_) => ResourceKind::Texture,
            LoadEvent::EnvironmentLoaded { .. } => ResourceKind::Environment,
        }
    }
}

/// A load event tagged with the mount it belongs to
#[derive(Debug)]
pub struct Completion {
    pub token: MountToken,
    pub event: LoadEvent,
}

/// Sending half handed to loaders, stamped with the mount token at spawn time
#[derive(Debug, Clone)]
pub struct CompletionSender {
    token: MountToken,
    tx: UnboundedSender<Completion>,
}

impl CompletionSender {
    pub fn new(token: MountToken, tx: UnboundedSender<Completion>) -> Self {
        Self { token, tx }
    }

    pub fn token(&self) -> MountToken {
        self.token
    }

    /// Queues an event. A closed channel means the viewer is gone; the event is dropped.
    pub fn send(&self, event: LoadEvent) {
        if self
            .tx
            .unbounded_send(Completion {
                token: self.token,
                event,
            })
            .is_err()
        {
            log::debug!("Viewer dropped, discarding load event");
        }
    }
}
