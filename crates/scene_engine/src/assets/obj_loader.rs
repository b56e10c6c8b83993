//! OBJ file loader for 3D models
//!
//! Reads positions, texture coordinates, normals and polygonal faces, splits
//! the geometry into one mesh per `usemtl` group and pulls material
//! definitions from the referenced `mtllib` files.

use std::collections::HashMap;
use std::path::Path;

use crate::assets::{AssetError, ModelAsset, ModelLoader, MtlParser};
use crate::render::{MeshData, Vertex};

/// Name given to geometry that appears before any `usemtl`
const DEFAULT_GROUP: &str = "default";

/// Parsed OBJ file before its material libraries are resolved
#[derive(Debug, Default)]
pub struct ObjData {
    /// `mtllib` references in file order
    pub material_libraries: Vec<String>,
    /// One mesh per material group
    pub meshes: Vec<MeshData>,
}

/// Loads Wavefront OBJ + MTL models
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjModelLoader;

impl ObjModelLoader {
    /// Create a loader
    pub fn new() -> Self {
        Self
    }

    /// Parse OBJ text
    pub fn parse(contents: &str) -> Result<ObjData, String> {
        let mut positions: Vec<[f32; 3]> = Vec::new();
        let mut normals: Vec<[f32; 3]> = Vec::new();
        let mut tex_coords: Vec<[f32; 2]> = Vec::new();

        let mut data = ObjData::default();
        let mut groups: Vec<GroupBuilder> = Vec::new();
        let mut group_by_material: HashMap<Option<String>, usize> = HashMap::new();
        let mut current: Option<usize> = None;
        let mut current_material: Option<String> = None;

        for (line_num, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            let err = |what: &str| format!("Line {}: {}", line_num + 1, what);

            match parts[0] {
                "v" => positions.push(parse_floats::<3>(&parts[1..]).ok_or_else(|| err("invalid vertex position"))?),
                "vn" => normals.push(parse_floats::<3>(&parts[1..]).ok_or_else(|| err("invalid vertex normal"))?),
                "vt" => tex_coords.push(parse_floats::<2>(&parts[1..]).ok_or_else(|| err("invalid texture coordinate"))?),
                "mtllib" => data
                    .material_libraries
                    .extend(parts[1..].iter().map(|s| (*s).to_string())),
                "usemtl" => {
                    let name = parts.get(1).ok_or_else(|| err("usemtl missing material name"))?;
                    current_material = Some((*name).to_string());
                    current = None;
                }
                "f" => {
                    if parts.len() < 4 {
                        return Err(err("face needs at least three vertices"));
                    }

                    let index = *current.get_or_insert_with(|| {
                        *group_by_material.entry(current_material.clone()).or_insert_with(|| {
                            groups.push(GroupBuilder::new(current_material.clone()));
                            groups.len() - 1
                        })
                    });
                    let group = &mut groups[index];

                    let mut corners = Vec::with_capacity(parts.len() - 1);
                    for corner in &parts[1..] {
                        let key = parse_corner(corner, positions.len(), tex_coords.len(), normals.len())
                            .ok_or_else(|| err(&format!("invalid face vertex '{corner}'")))?;
                        corners.push(group.vertex(key, &positions, &tex_coords, &normals));
                    }

                    // Fan triangulation
                    for i in 1..corners.len() - 1 {
                        group.indices.extend([corners[0], corners[i], corners[i + 1]]);
                    }
                }
                _ => {}
            }
        }

        data.meshes = groups.into_iter().map(GroupBuilder::finish).collect();
        if data.meshes.is_empty() {
            return Err("no faces found".to_string());
        }
        Ok(data)
    }
}

impl ModelLoader for ObjModelLoader {
    fn load(&self, path: &Path) -> Result<ModelAsset, AssetError> {
        if !path.is_file() {
            return Err(AssetError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let obj = Self::parse(&contents).map_err(|reason| AssetError::Parse {
            path: path.to_path_buf(),
            reason,
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let mut materials = Vec::new();
        for library in &obj.material_libraries {
            let library_path = base.join(library);
            if !library_path.is_file() {
                return Err(AssetError::NotFound(library_path));
            }
            let text = std::fs::read_to_string(&library_path)?;
            let parsed = MtlParser::parse(&text).map_err(|reason| AssetError::Parse {
                path: library_path.clone(),
                reason,
            })?;

            let mut parsed: Vec<_> = parsed.into_values().collect();
            parsed.sort_by(|a, b| a.name.cmp(&b.name));
            materials.extend(parsed.iter().map(|mtl| mtl.to_descriptor()));
        }

        log::info!(
            "Loaded OBJ {:?}: {} meshes, {} materials",
            path,
            obj.meshes.len(),
            materials.len()
        );

        Ok(ModelAsset {
            meshes: obj.meshes,
            materials,
        })
    }
}

/// Zero-based (position, texture coordinate, normal) indices of one face corner
type CornerKey = (usize, Option<usize>, Option<usize>);

struct GroupBuilder {
    material: Option<String>,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    lookup: HashMap<CornerKey, u32>,
    /// Per vertex: the face corner carried no normal
    missing_normal: Vec<bool>,
}

impl GroupBuilder {
    fn new(material: Option<String>) -> Self {
        Self {
            material,
            vertices: Vec::new(),
            indices: Vec::new(),
            lookup: HashMap::new(),
            missing_normal: Vec::new(),
        }
    }

    /// Index of the vertex for `key`, appending it on first use
    #[allow(clippy::cast_possible_truncation)]
    fn vertex(&mut self, key: CornerKey, positions: &[[f32; 3]], tex_coords: &[[f32; 2]], normals: &[[f32; 3]]) -> u32 {
        if let Some(&index) = self.lookup.get(&key) {
            return index;
        }

        let (position, tex, normal) = key;
        let vertex = Vertex::new(
            positions[position],
            normal.map_or([0.0, 1.0, 0.0], |n| normals[n]),
            tex.map_or([0.0, 0.0], |t| tex_coords[t]),
        );

        let index = self.vertices.len() as u32;
        self.vertices.push(vertex);
        self.missing_normal.push(normal.is_none());
        self.lookup.insert(key, index);
        index
    }

    fn finish(self) -> MeshData {
        let name = self.material.clone().unwrap_or_else(|| DEFAULT_GROUP.to_string());
        let mut mesh = MeshData::new(name, self.vertices, self.indices);
        mesh.material = self.material;
        if self.missing_normal.contains(&true) {
            compute_face_normals(&mut mesh, &self.missing_normal);
        }
        mesh.compute_tangents();
        mesh
    }
}

/// Average face normals into the vertices flagged in `missing`
///
/// Normals read from the file are kept as they are.
fn compute_face_normals(mesh: &mut MeshData, missing: &[bool]) {
    use crate::foundation::math::Vec3;

    let mut accumulated = vec![Vec3::zeros(); mesh.vertices.len()];
    for triangle in mesh.indices.chunks_exact(3) {
        let [a, b, c] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
        let pa = Vec3::from(mesh.vertices[a].position);
        let pb = Vec3::from(mesh.vertices[b].position);
        let pc = Vec3::from(mesh.vertices[c].position);
        let normal = (pb - pa).cross(&(pc - pa));
        for index in [a, b, c] {
            accumulated[index] += normal;
        }
    }
    for ((vertex, normal), &fill) in mesh.vertices.iter_mut().zip(accumulated).zip(missing) {
        if fill && normal.norm_squared() > f32::EPSILON {
            vertex.normal = normal.normalize().into();
        }
    }
}

fn parse_floats<const N: usize>(tokens: &[&str]) -> Option<[f32; N]> {
    let mut values = [0.0; N];
    for (value, token) in values.iter_mut().zip(tokens) {
        *value = token.parse().ok()?;
    }
    (tokens.len() >= N).then_some(values)
}

/// Parse `p`, `p/t`, `p//n` or `p/t/n` with 1-based or negative indices
fn parse_corner(corner: &str, positions: usize, tex_coords: usize, normals: usize) -> Option<CornerKey> {
    let mut fields = corner.split('/');
    let position = resolve_index(fields.next()?, positions)?;
    let tex = match fields.next() {
        Some(field) if !field.is_empty() => Some(resolve_index(field, tex_coords)?),
        _ => None,
    };
    let normal = match fields.next() {
        Some(field) if !field.is_empty() => Some(resolve_index(field, normals)?),
        _ => None,
    };
    Some((position, tex, normal))
}

/// OBJ indices are 1-based; negative values count back from the end
fn resolve_index(field: &str, len: usize) -> Option<usize> {
    let raw: i64 = field.parse().ok()?;
    let index = if raw > 0 {
        usize::try_from(raw - 1).ok()?
    } else {
        len.checked_sub(usize::try_from(raw.checked_neg()?).ok()?)?
    };
    (index < len).then_some(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::fs;

    const QUAD_OBJ: &str = "
mtllib quad.mtl
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
usemtl red
f 1/1/1 2/2/1 3/3/1 4/4/1
usemtl blue
f 1/1/1 3/3/1 4/4/1
usemtl red
f 1/1/1 2/2/1 3/3/1
";

    #[test]
    fn test_groups_by_material_and_triangulates() {
        let obj = ObjModelLoader::parse(QUAD_OBJ).unwrap();
        assert_eq!(obj.material_libraries, vec!["quad.mtl".to_string()]);
        assert_eq!(obj.meshes.len(), 2);

        let red = &obj.meshes[0];
        assert_eq!(red.material.as_deref(), Some("red"));
        // quad fan (2 triangles) plus one more triangle, corners shared
        assert_eq!(red.indices.len(), 9);
        assert_eq!(red.vertices.len(), 4);
        assert!(red.validate().is_ok());

        let blue = &obj.meshes[1];
        assert_eq!(blue.material.as_deref(), Some("blue"));
        assert_eq!(blue.indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_negative_indices_and_missing_normals() {
        let obj = ObjModelLoader::parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n").unwrap();
        let mesh = &obj.meshes[0];
        assert_eq!(mesh.name, "default");
        assert!(mesh.material.is_none());
        for vertex in &mesh.vertices {
            assert_relative_eq!(vertex.normal[2], 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_file_normals_survive_next_to_computed_ones() {
        let obj = ObjModelLoader::parse(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\nvn 1 0 0\n\
             f 1//1 2//1 3//1\n\
             f 2 4 3\n",
        )
        .unwrap();
        let mesh = &obj.meshes[0];
        assert_eq!(mesh.vertices.len(), 6);

        for vertex in &mesh.vertices[..3] {
            assert_relative_eq!(vertex.normal[0], 1.0, epsilon = 1e-6);
        }
        for vertex in &mesh.vertices[3..] {
            assert_relative_eq!(vertex.normal[2], 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_out_of_range_index_is_an_error() {
        let err = ObjModelLoader::parse("v 0 0 0\nf 1 2 3\n").unwrap_err();
        assert!(err.starts_with("Line 2"), "{}", err);
    }

    #[test]
    fn test_empty_file_is_an_error() {
        assert!(ObjModelLoader::parse("# nothing\n").is_err());
    }

    #[test]
    fn test_load_resolves_material_library() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("quad.obj"), QUAD_OBJ).unwrap();
        fs::write(
            dir.path().join("quad.mtl"),
            "newmtl red\nKd 1 0 0\nmap_Kd red.png\nnewmtl blue\nKd 0 0 1\nd 0.5\n",
        )
        .unwrap();

        let asset = ObjModelLoader.load(&dir.path().join("quad.obj")).unwrap();
        assert_eq!(asset.meshes.len(), 2);
        assert_eq!(asset.materials.len(), 2);

        let red = asset.material("red").unwrap();
        assert!(red.params.has_texture);
        assert_eq!(red.color_texture.as_deref(), Some(Path::new("red.png")));
        assert!(asset.material("blue").unwrap().params.two_sided);
    }

    #[test]
    fn test_missing_files_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = ObjModelLoader.load(&dir.path().join("absent.obj"));
        assert!(matches!(missing, Err(AssetError::NotFound(_))));

        fs::write(dir.path().join("quad.obj"), QUAD_OBJ).unwrap();
        let no_library = ObjModelLoader.load(&dir.path().join("quad.obj"));
        assert!(matches!(no_library, Err(AssetError::NotFound(p)) if p.ends_with("quad.mtl")));
    }
}
