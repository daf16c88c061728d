//! orbitview
//!
//! An orbit-navigable 3D model viewer built on wgpu and winit. Geometry, color texture and HDR
//! environment load asynchronously while the render loop keeps drawing; a damped orbit
//! controller frames the model once its geometry arrives.
//!
//! The core ([`viewer::Viewer`]) is generic over [`gfx::rendering::RenderBackend`], so the
//! same lifecycle runs against the GPU ([`gfx::rendering::WgpuBackend`]) or the recording
//! [`gfx::rendering::HeadlessBackend`].

pub mod app;
pub mod config;
pub mod error;
pub mod gfx;
pub mod loading;
pub mod prelude;
pub mod viewer;
pub mod wgpu_utils;

pub use app::ViewerApp;
pub use config::ViewerConfig;
pub use error::{RenderError, ResourceError};
pub use viewer::Viewer;
