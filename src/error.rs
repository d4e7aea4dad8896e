//! Error taxonomy for the viewer
//!
//! Every error here is fatal at the point it is raised: loading, program
//! building and device setup either succeed completely or the session ends.

use thiserror::Error;

/// Errors produced while loading assets or talking to the graphics device
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("malformed material record at line {line}: {reason}")]
    MalformedMaterialRecord { line: usize, reason: String },

    #[error("unknown line type '{token}' at line {line}")]
    UnknownLineType { line: usize, token: String },

    #[error("malformed geometry record at line {line}: {reason}")]
    MalformedGeometryRecord { line: usize, reason: String },

    #[error("failed to read asset '{path}': {source}")]
    AssetRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode texture '{path}': {source}")]
    TextureDecode {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("shader compilation failed for '{shader}': {log}")]
    ShaderCompile { shader: String, log: String },

    #[error("program linkage failed for '{program}': {log}")]
    ProgramLink { program: String, log: String },

    #[error("device initialization failed: {0}")]
    DeviceInit(String),

    #[error("render target '{target}' is incomplete: {log}")]
    FramebufferIncomplete { target: String, log: String },

    #[error("scene graph '{scene}' was drawn before its GPU resources were uploaded")]
    SceneNotUploaded { scene: String },

    #[error("surface error: {0}")]
    Surface(String),
}

pub type Result<T> = std::result::Result<T, ViewerError>;
