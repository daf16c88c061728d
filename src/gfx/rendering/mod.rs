//! Rendering: the renderer seam, its wgpu and headless implementations, and the frame and
//! resize plumbing around them.

pub mod backend;
pub mod frame_scheduler;
pub mod headless;
pub mod pipeline_manager;
pub mod render_engine;
pub mod render_pass_ext;
pub mod resize;

pub use backend::{MeshHandle, RenderBackend, TextureHandle};
pub use frame_scheduler::{FrameScheduler, SchedulerState};
pub use headless::{HeadlessBackend, HeadlessJournal, HeadlessSurface};
pub use render_engine::WgpuBackend;
pub use resize::{ResizeCoordinator, ViewportSize};
