//! # Loading Module
//!
//! Asynchronous fetch-and-decode of the three viewer assets plus progress aggregation.
//!
//! Loaders are plain `async` functions. They never touch the scene: each one sends a
//! [`LoadEvent`] tagged with the [`MountToken`] it was spawned under, and the viewer applies
//! the event only while that mount is still live.
//!
//! - [`LoadingManager`] - `(items_loaded, items_total)` to a monotonic percentage
//! - [`AssetSource`] - opaque async retrieval ([`FileSource`], [`MemorySource`])
//! - [`load_geometry`], [`load_texture`], [`load_environment`] - the resource loaders

pub mod environment;
pub mod geometry;
pub mod loading_manager;
pub mod resource;
pub mod source;
pub mod texture;

pub use environment::{decode_environment, load_environment};
pub use geometry::{decode_obj, load_geometry};
pub use loading_manager::{LoadingManager, ProgressListener};
pub use resource::{
    Completion, CompletionSender, EnvironmentImage, LoadEvent, MountToken, ResourceKind,
    ResourceStatus, TextureImage,
};
pub use source::{AssetSource, FetchProgress, FetchResult, FileSource, MemorySource};
pub use texture::{decode_texture, load_texture};
