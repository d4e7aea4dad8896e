//! Viewer configuration
//!
//! Plain settings struct with builder-style setters. Defaults describe the
//! atrium scene with the animated reflective object hovering in its centre.

use std::path::PathBuf;

/// One mesh asset: geometry file, material file and the divisor applied to
/// every position while parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetSpec {
    pub obj_path: String,
    pub mtl_path: String,
    pub scale_divisor: f32,
}

impl AssetSpec {
    pub fn new(obj_path: &str, mtl_path: &str, scale_divisor: f32) -> Self {
        Self {
            obj_path: obj_path.to_string(),
            mtl_path: mtl_path.to_string(),
            scale_divisor,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Directory every asset path is resolved against
    pub asset_root: PathBuf,
    pub scene: AssetSpec,
    pub reflective_object: AssetSpec,
    pub shadow_map_resolution: u32,
    pub cubemap_resolution: u32,
    pub near: f32,
    pub far: f32,
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub window_width: u32,
    pub window_height: u32,
    pub title: String,
    pub clear_color: [f64; 4],
    pub vsync: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("assets"),
            scene: AssetSpec::new("sponza/sponza.obj", "sponza/sponza.mtl", 1500.0),
            reflective_object: AssetSpec::new("shrek/shrek.obj", "shrek/shrek.mtl", 100.0),
            shadow_map_resolution: 4096,
            cubemap_resolution: 1024,
            near: 0.01,
            far: 10.0,
            fov_y: std::f32::consts::FRAC_PI_2,
            window_width: 800,
            window_height: 600,
            title: "Atrium".to_string(),
            clear_color: [0.8, 0.8, 0.9, 0.0],
            vsync: true,
        }
    }
}

impl ViewerConfig {
    /// Default configuration overlaid with `ATRIUM_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(root) = std::env::var("ATRIUM_ASSET_ROOT") {
            config.asset_root = PathBuf::from(root);
        }
        if let Some(res) = env_u32("ATRIUM_SHADOW_RES") {
            config.shadow_map_resolution = res;
        }
        if let Some(res) = env_u32("ATRIUM_CUBEMAP_RES") {
            config.cubemap_resolution = res;
        }

        config
    }

    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = root.into();
        self
    }

    pub fn with_scene(mut self, scene: AssetSpec) -> Self {
        self.scene = scene;
        self
    }

    pub fn with_reflective_object(mut self, object: AssetSpec) -> Self {
        self.reflective_object = object;
        self
    }

    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_width = width.max(1);
        self.window_height = height.max(1);
        self
    }

    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    pub fn with_shadow_map_resolution(mut self, resolution: u32) -> Self {
        self.shadow_map_resolution = resolution.max(1);
        self
    }

    pub fn with_cubemap_resolution(mut self, resolution: u32) -> Self {
        self.cubemap_resolution = resolution.max(1);
        self
    }
}

fn env_u32(name: &str) -> Option<u32> {
    let value = std::env::var(name).ok()?;
    match value.parse::<u32>() {
        Ok(parsed) if parsed > 0 => Some(parsed),
        _ => {
            log::warn!("Ignoring {}={:?}: expected a positive integer", name, value);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_scene_setup() {
        let config = ViewerConfig::default();
        assert_eq!(config.shadow_map_resolution, 4096);
        assert_eq!(config.cubemap_resolution, 1024);
        assert_eq!(config.scene.scale_divisor, 1500.0);
        assert_eq!(config.reflective_object.scale_divisor, 100.0);
        assert!(config.near < config.far);
    }

    #[test]
    fn test_builder_clamps_zero_sizes() {
        let config = ViewerConfig::default()
            .with_window_size(0, 0)
            .with_cubemap_resolution(0);
        assert_eq!(config.window_width, 1);
        assert_eq!(config.window_height, 1);
        assert_eq!(config.cubemap_resolution, 1);
    }
}
