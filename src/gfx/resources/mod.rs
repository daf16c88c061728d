//! GPU resource management
//!
//! Handles textures, uniform buffers and bind groups for rendering.

pub mod global_bindings;
pub mod material;
pub mod texture_resource;

pub use global_bindings::{EnvironmentBindings, GlobalBindings, GlobalUBO, GlobalUBOContent};
pub use material::{MaterialBindings, MaterialUBO, MaterialUniform};
pub use texture_resource::TextureResource;
