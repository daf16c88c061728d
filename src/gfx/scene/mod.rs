//! # Scene Module
//!
//! The scene graph owns everything the renderer draws: the static lights, the flat or
//! environment-mapped background, the shared textured material and the loaded model root.
//!
//! ## Key Components
//!
//! - [`SceneGraph`] - lights, environment, material and model ownership
//! - [`ModelRoot`] / [`MeshNode`] - the loaded geometry hierarchy
//! - [`ModelStats`] - read-only statistics exposed to the presentation layer
//! - [`Aabb`] - world bounds used to frame the camera
//! - [`Vertex3D`] - interleaved GPU vertex layout

pub mod bounds;
pub mod lights;
pub mod object;
pub mod scene_graph;
pub mod vertex;

pub use bounds::Aabb;
pub use lights::{AmbientLight, Color, DirectionalLight, ShadowSettings};
pub use object::{MaterialSlot, MeshData, MeshNode, ModelRoot, ModelStats};
pub use scene_graph::{Background, EnvironmentMap, SceneGraph, TexturedMaterial, TextureMapping};
pub use vertex::Vertex3D;
