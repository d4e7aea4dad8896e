//! # Graphics Module
//!
//! Everything between the asset files on disk and the pixels in the window.
//!
//! ## Architecture Overview
//!
//! - **Assets** ([`assets`]) - Geometry and material parsers, texture decoding
//! - **Camera** ([`camera`]) - Held-key camera integration and projections
//! - **Resources** ([`resources`]) - Materials, textures and uniform bindings
//! - **Scene** ([`scene`]) - Drawables and scene graphs
//! - **Rendering** ([`rendering`]) - Frame planning, pipelines and the engine
//!
//! Every frame runs three passes in a fixed order: the shadow map from the
//! directional light, the six faces of the environment cubemap around the
//! reflective object, then the camera view into the window.

pub mod assets;
pub mod camera;
pub mod rendering;
pub mod resources;
pub mod scene;

// Re-export commonly used types
pub use rendering::{PassOrchestrator, RenderEngine};
pub use scene::{SceneGraph, SceneRole};
