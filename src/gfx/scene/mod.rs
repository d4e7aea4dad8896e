//! # Scene Module
//!
//! Drawables, the scene graphs that own them, and the shared vertex format.
//!
//! ## Key Components
//!
//! - [`Drawable`] - One mesh partition bound to exactly one material
//! - [`SceneGraph`] - Ordered drawables plus a model transform, in one of two
//!   [`SceneRole`]s (static atrium or animated reflective object)
//! - [`Vertex3D`] - Position, normal and texture coordinate
//!
//! Draw order inside a graph is fixed at load time: opaque drawables first,
//! drawables whose albedo carries alpha last.

pub mod drawable;
pub mod scene_graph;
pub mod vertex;

// Re-export main types
pub use drawable::{DrawObject, Drawable};
pub use scene_graph::{
    reflective_translation, DrawMode, ModelBindings, SceneGraph, SceneRole, MATERIAL_GROUP,
    MODEL_GROUP,
};
pub use vertex::Vertex3D;
