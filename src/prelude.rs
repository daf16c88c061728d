//! # Prelude
//!
//! ```no_run
//! use orbitview::prelude::*;
//! use std::rc::Rc;
//!
//! fn main() -> anyhow::Result<()> {
//!     let app = ViewerApp::new(ViewerConfig::default(), Rc::new(FileSource::new("public")))?;
//!     app.run()
//! }
//! ```

pub use crate::{
    app::ViewerApp,
    config::{
        AssetConfig, CameraConfig, ControlsConfig, FramingConfig, LightingConfig,
        MaterialConfig, ModelPlacement, RendererSettings, ToneMapping, ViewerConfig,
    },
    error::{RenderError, RenderResult, ResourceError},
    gfx::{
        camera::{CameraRig, InputEvent, OrbitController, PointerButton},
        rendering::{
            HeadlessBackend, HeadlessSurface, RenderBackend, ViewportSize, WgpuBackend,
        },
        scene::{Color, ModelStats, SceneGraph},
    },
    loading::{AssetSource, FileSource, MemorySource, MountToken, ResourceKind, ResourceStatus},
    viewer::Viewer,
};
