//! Wavefront MTL reader
//!
//! Turns `.mtl` statements into [`MaterialParams`] plus the texture paths the
//! model manager resolves against the model file.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use crate::assets::MaterialDescriptor;
use crate::foundation::math::{Vec3, Vec4};
use crate::render::MaterialParams;

/// One `newmtl` block
#[derive(Debug, Clone, PartialEq)]
pub struct MtlData {
    /// Name after `newmtl`
    pub name: String,
    /// `Ka`
    pub ambient_color: Vec3,
    /// `Kd`
    pub diffuse_color: Vec3,
    /// `Ks`
    pub specular_color: Vec3,
    /// `Ke`
    pub emissive_color: Vec3,
    /// `Ns`
    pub shininess: f32,
    /// `d`, or `1 - Tr`; 1 is opaque
    pub opacity: f32,
    /// `illum`, kept for callers that care
    pub illum: u32,
    /// `map_Kd`, unresolved
    pub color_map: Option<String>,
    /// `map_Bump`, `bump` or `norm`, unresolved
    pub bump_map: Option<String>,
}

impl Default for MtlData {
    fn default() -> Self {
        Self {
            name: String::new(),
            ambient_color: Vec3::repeat(0.1),
            diffuse_color: Vec3::repeat(0.8),
            specular_color: Vec3::repeat(0.5),
            emissive_color: Vec3::zeros(),
            shininess: 32.0,
            opacity: 1.0,
            illum: 2,
            color_map: None,
            bump_map: None,
        }
    }
}

impl MtlData {
    /// Convert to the renderer's material description
    ///
    /// Shininess strength is not part of MTL and defaults to 1. Materials
    /// that are not fully opaque are drawn two-sided.
    pub fn to_descriptor(&self) -> MaterialDescriptor {
        let params = MaterialParams {
            name: self.name.clone(),
            ambient_color: rgba(self.ambient_color, 1.0),
            diffuse_color: rgba(self.diffuse_color, self.opacity),
            specular_color: rgba(self.specular_color, 1.0),
            emissive_color: rgba(self.emissive_color, 1.0),
            shininess: self.shininess,
            shininess_strength: 1.0,
            has_texture: self.color_map.is_some(),
            two_sided: self.opacity < 1.0,
        };

        MaterialDescriptor {
            params,
            color_texture: self.color_map.as_ref().map(PathBuf::from),
            normal_texture: self.bump_map.as_ref().map(PathBuf::from),
        }
    }
}

fn rgba(color: Vec3, alpha: f32) -> Vec4 {
    Vec4::new(color.x, color.y, color.z, alpha)
}

/// Line-oriented MTL parser
pub struct MtlParser;

impl MtlParser {
    /// Parse a whole file, keyed by material name
    ///
    /// Errors carry the 1-based line number. Unknown statements are skipped.
    pub fn parse(contents: &str) -> Result<HashMap<String, MtlData>, String> {
        let mut materials = HashMap::new();
        let mut current: Option<MtlData> = None;

        for (index, raw) in contents.lines().enumerate() {
            let line_no = index + 1;
            let mut tokens = raw.split_whitespace();
            let Some(keyword) = tokens.next() else {
                continue;
            };
            if keyword.starts_with('#') {
                continue;
            }

            if keyword == "newmtl" {
                let name = tokens
                    .next()
                    .ok_or_else(|| format!("Line {line_no}: newmtl without a name"))?;
                if let Some(done) = current.replace(MtlData {
                    name: name.to_string(),
                    ..MtlData::default()
                }) {
                    materials.insert(done.name.clone(), done);
                }
                continue;
            }

            // Statements before the first newmtl have nothing to apply to
            let Some(material) = current.as_mut() else {
                continue;
            };
            match keyword {
                "Ka" => material.ambient_color = Self::color(&mut tokens, line_no, keyword)?,
                "Kd" => material.diffuse_color = Self::color(&mut tokens, line_no, keyword)?,
                "Ks" => material.specular_color = Self::color(&mut tokens, line_no, keyword)?,
                "Ke" => material.emissive_color = Self::color(&mut tokens, line_no, keyword)?,
                "Ns" => material.shininess = Self::number(&mut tokens, line_no, keyword)?,
                "d" => material.opacity = Self::number(&mut tokens, line_no, keyword)?,
                "Tr" => material.opacity = 1.0 - Self::number::<f32>(&mut tokens, line_no, keyword)?,
                "illum" => material.illum = Self::number(&mut tokens, line_no, keyword)?,
                "map_Kd" => material.color_map = Some(Self::map_path(tokens, line_no, keyword)?),
                "map_Bump" | "map_bump" | "bump" | "norm" => {
                    material.bump_map = Some(Self::map_path(tokens, line_no, keyword)?);
                }
                _ => {}
            }
        }

        if let Some(done) = current {
            materials.insert(done.name.clone(), done);
        }
        Ok(materials)
    }

    fn number<'a, T: FromStr>(
        tokens: &mut impl Iterator<Item = &'a str>,
        line_no: usize,
        keyword: &str,
    ) -> Result<T, String> {
        let token = tokens
            .next()
            .ok_or_else(|| format!("Line {line_no}: {keyword} is missing a value"))?;
        token
            .parse()
            .map_err(|_| format!("Line {line_no}: {keyword} has invalid value '{token}'"))
    }

    fn color<'a>(tokens: &mut impl Iterator<Item = &'a str>, line_no: usize, keyword: &str) -> Result<Vec3, String> {
        let r = Self::number(tokens, line_no, keyword)?;
        let g = Self::number(tokens, line_no, keyword)?;
        let b = Self::number(tokens, line_no, keyword)?;
        Ok(Vec3::new(r, g, b))
    }

    /// Texture options such as `-bm 1.0` come first; the path is last
    fn map_path<'a>(tokens: impl Iterator<Item = &'a str>, line_no: usize, keyword: &str) -> Result<String, String> {
        tokens
            .last()
            .map(str::to_string)
            .ok_or_else(|| format!("Line {line_no}: {keyword} is missing its texture path"))
    }
}
