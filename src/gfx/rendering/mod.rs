//! Core rendering functionality
//!
//! Frame planning, render pipelines, GPU resource ownership and frame
//! execution.

pub mod pass_orchestrator;
pub mod pipeline_manager;
pub mod render_engine;

// Re-export main types
pub use pass_orchestrator::{FrameInputs, FramePlan, PassKind, PassOrchestrator, PassStep};
pub use pipeline_manager::{PipelineConfig, PipelineManager, ProgramSet};
pub use render_engine::RenderEngine;
