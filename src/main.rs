use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use atrium::{AssetSpec, AtriumApp, ViewerConfig};

#[derive(Parser, Debug)]
#[command(
    name = "atrium",
    about = "Interactive OBJ scene viewer with shadows and cubemap reflections",
    long_about = "Renders a static OBJ scene and an animated reflective object.\n\n\
                  Controls: W/A/S/D and Up/Down move, Left/Right turn, \
                  PageUp/PageDown tilt, Space pauses the animation, Q or Escape quits."
)]
struct Args {
    /// Directory every asset path is resolved against
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Static scene geometry; the material file is expected next to it with an .mtl extension
    #[arg(long)]
    scene: Option<String>,

    /// Reflective object geometry; the material file is expected next to it with an .mtl extension
    #[arg(long)]
    object: Option<String>,

    /// Initial window width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Initial window height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Disable vertical sync
    #[arg(long)]
    no_vsync: bool,
}

/// Same asset with a new geometry path and its sibling material file
fn with_obj_path(spec: &AssetSpec, obj_path: &str) -> AssetSpec {
    let mtl_path = match obj_path.rsplit_once('.') {
        Some((stem, _)) => format!("{}.mtl", stem),
        None => format!("{}.mtl", obj_path),
    };
    AssetSpec::new(obj_path, &mtl_path, spec.scale_divisor)
}

fn build_config(args: Args) -> ViewerConfig {
    let mut config = ViewerConfig::from_env();

    if let Some(root) = args.assets {
        config = config.with_asset_root(root);
    }
    if let Some(scene) = args.scene.as_deref() {
        let spec = with_obj_path(&config.scene, scene);
        config = config.with_scene(spec);
    }
    if let Some(object) = args.object.as_deref() {
        let spec = with_obj_path(&config.reflective_object, object);
        config = config.with_reflective_object(spec);
    }

    let width = args.width.unwrap_or(config.window_width);
    let height = args.height.unwrap_or(config.window_height);
    config.with_window_size(width, height).with_vsync(!args.no_vsync)
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = build_config(args);
    log::info!(
        "Loading '{}' and '{}' from {}",
        config.scene.obj_path,
        config.reflective_object.obj_path,
        config.asset_root.display()
    );

    let app = AtriumApp::new(config).context("failed to load scene assets")?;
    app.run().context("viewer terminated with an error")?;
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(error) = run(Args::parse()) {
        eprintln!("error: {:#}", error);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obj_override_keeps_scale_and_finds_material() {
        let base = AssetSpec::new("sponza/sponza.obj", "sponza/sponza.mtl", 1500.0);
        let spec = with_obj_path(&base, "hall/hall.v2.obj");
        assert_eq!(spec.mtl_path, "hall/hall.v2.mtl");
        assert_eq!(spec.scale_divisor, 1500.0);
    }

    #[test]
    fn test_cli_overrides_window_and_vsync() {
        let args = Args::parse_from(["atrium", "--width", "1024", "--no-vsync"]);
        let config = build_config(args);
        assert_eq!(config.window_width, 1024);
        assert!(!config.vsync);
    }
}
