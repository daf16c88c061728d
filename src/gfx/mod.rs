//! # Graphics Module
//!
//! - **Camera** ([`camera`]) - perspective rig and the damped orbit controller
//! - **Rendering** ([`rendering`]) - renderer seam, wgpu and headless backends, frame scheduling
//! - **Scene** ([`scene`]) - model root, lights, shared material and environment
//! - **Resources** ([`resources`]) - GPU textures, uniforms and bind groups

pub mod camera;
pub mod rendering;
pub mod resources;
pub mod scene;

pub use camera::{CameraRig, OrbitController};
pub use rendering::{HeadlessBackend, RenderBackend, WgpuBackend};
pub use scene::SceneGraph;
