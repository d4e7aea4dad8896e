//! Material description parser
//!
//! Line-oriented, whitespace-tokenized. `newmtl` starts a record; scalar,
//! colour and texture directives fill the current record. Unrecognized
//! directives are skipped so newer exporters keep loading.
//!
//! Numeric operands must parse exactly: a record with the wrong operand
//! count or a non-numeric literal aborts the whole load with
//! [`ViewerError::MalformedMaterialRecord`].

use std::{
    collections::{BTreeSet, HashMap},
    io::BufRead,
};

use crate::{
    error::{Result, ViewerError},
    gfx::{
        assets::source::normalize_path,
        resources::material::{Material, TextureRole},
    },
};

/// Parsed materials plus every texture path they reference
#[derive(Debug, Default, Clone)]
pub struct MaterialSet {
    pub materials: HashMap<String, Material>,
    /// Normalized texture paths to load, in sorted order
    pub texture_paths: BTreeSet<String>,
}

pub fn parse_materials(input: impl BufRead) -> Result<MaterialSet> {
    let mut set = MaterialSet::default();
    let mut current: Option<Material> = None;

    for (index, line) in input.lines().enumerate() {
        let line_number = index + 1;
        let line = line.map_err(|e| malformed(line_number, format!("unreadable line: {}", e)))?;
        let mut tokens = line.split_whitespace();

        let Some(directive) = tokens.next() else {
            continue;
        };
        if directive.starts_with('#') {
            continue;
        }
        let operands: Vec<&str> = tokens.collect();

        if directive == "newmtl" {
            let name = operands
                .first()
                .ok_or_else(|| malformed(line_number, "newmtl without a name".to_string()))?;
            if let Some(finished) = current.take() {
                set.materials.insert(finished.name.clone(), finished);
            }
            current = Some(Material::named(name));
            continue;
        }

        let Some(material) = current.as_mut() else {
            log::warn!(
                "Ignoring material directive '{}' at line {} before any newmtl",
                directive,
                line_number
            );
            continue;
        };

        match directive {
            "Ns" => material.specular_exponent = scalar(&operands, line_number, directive)?,
            "Ni" => material.optical_density = scalar(&operands, line_number, directive)?,
            "d" => material.dissolve = scalar(&operands, line_number, directive)?,
            "Tr" => material.transparency = scalar(&operands, line_number, directive)?,
            "illum" => material.illum = integer(&operands, line_number, directive)?,
            "Ka" => material.ambient = triple(&operands, line_number, directive)?,
            "Kd" => material.diffuse = triple(&operands, line_number, directive)?,
            "Ks" => material.specular = triple(&operands, line_number, directive)?,
            "Ke" => material.emissive = triple(&operands, line_number, directive)?,
            "Tf" => material.transmission_filter = triple(&operands, line_number, directive)?,
            "map_Ka" | "map_Kd" | "map_Ks" | "norm" => {
                let role = match directive {
                    "map_Ka" => TextureRole::Albedo,
                    "map_Kd" => TextureRole::DiffuseOverlay,
                    "map_Ks" => TextureRole::SpecularMask,
                    _ => TextureRole::NormalMap,
                };
                // Options such as `-bm 0.5` precede the file name
                let path = operands.last().ok_or_else(|| {
                    malformed(line_number, format!("{} without a texture path", directive))
                })?;
                let path = normalize_path(path);
                set.texture_paths.insert(path.clone());
                material.textures.set(role, Some(path));
            }
            _ => {}
        }
    }

    if let Some(finished) = current.take() {
        set.materials.insert(finished.name.clone(), finished);
    }

    Ok(set)
}

fn malformed(line: usize, reason: String) -> ViewerError {
    ViewerError::MalformedMaterialRecord { line, reason }
}

fn numbers<T: std::str::FromStr>(
    operands: &[&str],
    expected: usize,
    line: usize,
    directive: &str,
) -> Result<Vec<T>> {
    if operands.len() != expected {
        return Err(malformed(
            line,
            format!(
                "{} expects {} operand(s), found {}",
                directive,
                expected,
                operands.len()
            ),
        ));
    }
    operands
        .iter()
        .map(|op| {
            op.parse::<T>()
                .map_err(|_| malformed(line, format!("{} operand '{}' is not a number", directive, op)))
        })
        .collect()
}

fn scalar(operands: &[&str], line: usize, directive: &str) -> Result<f32> {
    Ok(numbers::<f32>(operands, 1, line, directive)?[0])
}

fn integer(operands: &[&str], line: usize, directive: &str) -> Result<i32> {
    Ok(numbers::<i32>(operands, 1, line, directive)?[0])
}

fn triple(operands: &[&str], line: usize, directive: &str) -> Result<[f32; 3]> {
    let values = numbers::<f32>(operands, 3, line, directive)?;
    Ok([values[0], values[1], values[2]])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<MaterialSet> {
        parse_materials(text.as_bytes())
    }

    #[test]
    fn test_bare_newmtl_yields_zeroed_material() {
        let set = parse("newmtl foo\n").unwrap();
        assert_eq!(set.materials.len(), 1);

        let foo = &set.materials["foo"];
        assert_eq!(foo.name, "foo");
        assert_eq!(foo.specular_exponent, 0.0);
        assert_eq!(foo.optical_density, 0.0);
        assert_eq!(foo.dissolve, 0.0);
        assert_eq!(foo.transparency, 0.0);
        assert_eq!(foo.illum, 0);
        assert_eq!(foo.ambient, [0.0; 3]);
        assert_eq!(foo.diffuse, [0.0; 3]);
        assert_eq!(foo.specular, [0.0; 3]);
        assert_eq!(foo.emissive, [0.0; 3]);
        assert_eq!(foo.transmission_filter, [0.0; 3]);
        assert!(foo.textures.is_empty());
        assert!(set.texture_paths.is_empty());
    }

    #[test]
    fn test_full_record_is_parsed() {
        let text = "\
# exported
newmtl stone
\tNs 10.0000
\tNi 1.5000
\td 1.0000
\tTr 0.0000
\tTf 1.0000 1.0000 1.0000
\tillum 2
\tKa 0.5880 0.5880 0.5880
\tKd 0.5 0.4 0.3
\tKs 0.0000 0.0000 0.0000
\tKe 0.1 0.2 0.3
\tmap_Ka textures\\stone.tga
\tmap_Kd textures\\stone.tga
\tmap_bump textures\\stone_bump.tga
\tbump textures\\stone_bump.tga
";
        let set = parse(text).unwrap();
        let stone = &set.materials["stone"];
        assert_eq!(stone.specular_exponent, 10.0);
        assert_eq!(stone.optical_density, 1.5);
        assert_eq!(stone.dissolve, 1.0);
        assert_eq!(stone.illum, 2);
        assert_eq!(stone.diffuse, [0.5, 0.4, 0.3]);
        assert_eq!(stone.emissive, [0.1, 0.2, 0.3]);
        assert_eq!(stone.transmission_filter, [1.0, 1.0, 1.0]);
        assert_eq!(stone.textures.albedo.as_deref(), Some("textures/stone.tga"));
        assert_eq!(
            stone.textures.diffuse_overlay.as_deref(),
            Some("textures/stone.tga")
        );
        assert_eq!(stone.textures.specular_mask, None);
        assert_eq!(stone.textures.normal_map, None);
        // map_bump and bump are ignored
        assert_eq!(set.texture_paths.len(), 1);
    }

    #[test]
    fn test_map_kd_registers_normalized_path() {
        let set = parse("newmtl wall\nmap_Kd textures\\wall.png\n").unwrap();
        assert!(set.texture_paths.contains("textures/wall.png"));
        assert_eq!(
            set.materials["wall"].textures.get(TextureRole::DiffuseOverlay),
            Some("textures/wall.png")
        );
        assert!(set.materials["wall"].textures.albedo.is_none());
    }

    #[test]
    fn test_records_are_separated_by_newmtl() {
        let set = parse("newmtl a\nKd 1 0 0\nnewmtl b\nKd 0 1 0\nnorm n.png\n").unwrap();
        assert_eq!(set.materials["a"].diffuse, [1.0, 0.0, 0.0]);
        assert_eq!(set.materials["b"].diffuse, [0.0, 1.0, 0.0]);
        assert!(set.materials["a"].textures.normal_map.is_none());
        assert_eq!(set.materials["b"].textures.normal_map.as_deref(), Some("n.png"));
    }

    #[test]
    fn test_non_numeric_scalar_aborts_load() {
        let result = parse("newmtl a\nNs shiny\n");
        match result {
            Err(ViewerError::MalformedMaterialRecord { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected MalformedMaterialRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_short_colour_aborts_load() {
        let result = parse("newmtl a\nKa 0.1 0.2\n");
        assert!(matches!(
            result,
            Err(ViewerError::MalformedMaterialRecord { line: 2, .. })
        ));
    }

    #[test]
    fn test_unknown_directives_are_ignored() {
        let set = parse("newmtl a\nPr 0.5\nmap_d alpha.png\nKd 1 1 1\n").unwrap();
        assert_eq!(set.materials["a"].diffuse, [1.0, 1.0, 1.0]);
        assert!(set.texture_paths.is_empty());
    }

    #[test]
    fn test_fields_before_first_record_are_skipped() {
        let set = parse("Kd 1 1 1\nnewmtl a\n").unwrap();
        assert_eq!(set.materials["a"].diffuse, [0.0; 3]);
    }

    #[test]
    fn test_texture_options_precede_path() {
        let set = parse("newmtl a\nmap_Ks -bm 0.5 spec.png\n").unwrap();
        assert_eq!(
            set.materials["a"].textures.specular_mask.as_deref(),
            Some("spec.png")
        );
    }
}
