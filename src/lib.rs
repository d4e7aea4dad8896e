// src/lib.rs
//! Atrium scene viewer
//!
//! Renders a static OBJ scene lit by a shadow-casting directional light and
//! three point lights, with an animated object that reflects its
//! surroundings through an environment cubemap captured every frame.
//! Built on wgpu and winit.

pub mod app;
pub mod config;
pub mod error;
pub mod gfx;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use app::AtriumApp;
pub use config::{AssetSpec, ViewerConfig};
pub use error::{Result, ViewerError};

/// Loads the configured assets and runs the viewer until its window closes
pub fn run(config: ViewerConfig) -> Result<()> {
    AtriumApp::new(config)?.run()
}
