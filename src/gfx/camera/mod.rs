pub mod camera_controller;
pub mod camera_utils;

// Re-export main types
pub use camera_controller::{CameraController, CameraParams, HeldKeys, KeyAction};
