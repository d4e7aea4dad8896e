//! Mesh asset loading
//!
//! A mesh asset is a geometry description, its material description and the
//! texture images the materials reference. Everything is loaded once, up
//! front, and is immutable afterwards. Any failure aborts the whole load.

pub mod mtl_parser;
pub mod obj_parser;
pub mod source;
pub mod texture_image;

use std::{
    collections::{BTreeMap, HashMap},
    io::BufRead,
};

use crate::{
    config::AssetSpec,
    error::Result,
    gfx::resources::material::{Material, MaterialLibrary},
};

pub use mtl_parser::{parse_materials, MaterialSet};
pub use obj_parser::{parse_geometry, FaceVertex, GeometrySet, MeshPartition};
pub use source::{normalize_path, AssetSource, FsAssetSource, MemoryAssetSource};
pub use texture_image::{MipLevel, PixelFormat, TextureImage};

/// Loaded materials, decoded textures keyed by their normalized path, and
/// one partition per material group
#[derive(Debug, Clone)]
pub struct MeshAsset {
    pub materials: HashMap<String, Material>,
    pub textures: BTreeMap<String, TextureImage>,
    pub partitions: Vec<MeshPartition>,
}

impl MeshAsset {
    /// Loads `spec` from `source`. Texture paths are resolved relative to
    /// the directory of the material file.
    pub fn load(source: &dyn AssetSource, spec: &AssetSpec) -> Result<Self> {
        let mtl_bytes = source.read(&spec.mtl_path)?;
        let obj_bytes = source.read(&spec.obj_path)?;
        let texture_dir = parent_dir(&normalize_path(&spec.mtl_path));

        let asset = Self::from_readers(
            mtl_bytes.as_slice(),
            obj_bytes.as_slice(),
            spec.scale_divisor,
            source,
            &texture_dir,
        )?;

        log::info!(
            "Loaded '{}': {} materials, {} textures, {} drawables, {} triangles",
            spec.obj_path,
            asset.materials.len(),
            asset.textures.len(),
            asset.partitions.len(),
            asset.triangle_count()
        );

        Ok(asset)
    }

    /// Parses already opened streams. Textures are read from `source` at
    /// `texture_dir` joined with each registered path.
    pub fn from_readers(
        mtl: impl BufRead,
        obj: impl BufRead,
        scale_divisor: f32,
        source: &dyn AssetSource,
        texture_dir: &str,
    ) -> Result<Self> {
        let MaterialSet {
            materials,
            texture_paths,
        } = parse_materials(mtl)?;

        let geometry = parse_geometry(obj, scale_divisor)?;

        let mut textures = BTreeMap::new();
        for path in texture_paths {
            let bytes = source.read(&join(texture_dir, &path))?;
            let image = TextureImage::decode(&path, &bytes)?;
            log::debug!(
                "Texture '{}': {}x{}, {} channels",
                path,
                image.width,
                image.height,
                image.channels()
            );
            textures.insert(path, image);
        }

        Ok(Self {
            materials,
            textures,
            partitions: geometry.partitions,
        })
    }

    pub fn triangle_count(&self) -> usize {
        self.partitions.iter().map(MeshPartition::triangle_count).sum()
    }

    /// Splits the asset into its material library and the per-material
    /// geometry paired with a snapshot of its material
    pub fn into_parts(self) -> (MaterialLibrary, Vec<(MeshPartition, Material)>) {
        let parts = self
            .partitions
            .into_iter()
            .map(|partition| {
                let material = match self.materials.get(&partition.material) {
                    Some(material) => material.clone(),
                    None => {
                        log::warn!(
                            "usemtl references unknown material '{}', using defaults",
                            partition.material
                        );
                        Material::named(&partition.material)
                    }
                };
                (partition, material)
            })
            .collect();

        (MaterialLibrary::new(self.materials, self.textures), parts)
    }
}

fn parent_dir(path: &str) -> String {
    match path.rfind('/') {
        Some(pos) => path[..pos].to_string(),
        None => String::new(),
    }
}

fn join(dir: &str, path: &str) -> String {
    if dir.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", dir, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_paths_resolve_next_to_material_file() {
        assert_eq!(parent_dir("sponza/sponza.mtl"), "sponza");
        assert_eq!(parent_dir("scene.mtl"), "");
        assert_eq!(join("sponza", "textures/a.png"), "sponza/textures/a.png");
        assert_eq!(join("", "a.png"), "a.png");
    }

    #[test]
    fn test_unknown_material_falls_back_to_defaults() {
        let source = MemoryAssetSource::new()
            .with_file("m.mtl", "newmtl known\nKd 1 1 1\n")
            .with_file("g.obj", "v 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl missing\nf 1 2 3\n");
        let asset = MeshAsset::load(&source, &AssetSpec::new("g.obj", "m.mtl", 1.0)).unwrap();

        let (library, parts) = asset.into_parts();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].1, Material::named("missing"));
        assert!(library.material("known").is_some());
    }
}
