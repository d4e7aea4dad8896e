// src/gfx/resources/mod.rs
//! GPU resource management
//!
//! Handles materials, textures, uniform buffers and bind groups for rendering.

pub mod global_bindings;
pub mod material;
pub mod pass_bindings;
pub mod texture_resource;

// Re-export main types
pub use global_bindings::{GlobalBindings, LightRig, ViewUniform};
pub use material::{Material, MaterialBindings, MaterialLibrary, TextureRefs, TextureRole};
pub use pass_bindings::PassBindings;
pub use texture_resource::{CubemapTarget, TextureResource};
