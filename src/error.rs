//! Error types for the viewer core
//!
//! Resource errors are terminal per resource: a loader that fails moves its resource
//! to [`ResourceStatus::Failed`](crate::loading::ResourceStatus) and never retries.
//! Render errors are reported per frame and never stop the render loop.

use thiserror::Error;

/// Failure while fetching or decoding one asset
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// The asset could not be retrieved (missing file, I/O failure, unknown URI)
    #[error("failed to fetch '{uri}': {reason}")]
    Fetch { uri: String, reason: String },

    /// The asset bytes were retrieved but are not valid geometry, image or HDR data
    #[error("failed to decode '{uri}': {reason}")]
    Decode { uri: String, reason: String },

    /// The loader task could not be handed to the executor
    #[error("failed to start loader for '{uri}': {reason}")]
    Spawn { uri: String, reason: String },
}

impl ResourceError {
    pub fn fetch(uri: &str, reason: impl ToString) -> Self {
        Self::Fetch {
            uri: uri.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn decode(uri: &str, reason: impl ToString) -> Self {
        Self::Decode {
            uri: uri.to_string(),
            reason: reason.to_string(),
        }
    }

    /// URI of the asset this error refers to
    pub fn uri(&self) -> &str {
        match self {
            Self::Fetch { uri, .. } | Self::Decode { uri, .. } | Self::Spawn { uri, .. } => uri,
        }
    }
}

/// Failure inside the renderer
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    Surface(String),

    #[error("no suitable GPU adapter: {0}")]
    Adapter(String),

    #[error("failed to create GPU device: {0}")]
    Device(String),

    /// The output surface could not provide a frame; the frame is skipped
    #[error("surface frame unavailable: {0}")]
    Frame(String),

    /// The renderer has been disposed and owns no GPU context anymore
    #[error("renderer has been disposed")]
    Disposed,
}

pub type RenderResult<T> = Result<T, RenderError>;
