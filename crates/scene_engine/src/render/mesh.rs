//! Mesh representation for 3D models
//!
//! `MeshData` is CPU-side geometry as produced by a loader; `Mesh` is the
//! GPU-resident result of uploading it through a [`GpuContext`].

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::{Vec2, Vec3};
use crate::render::gpu::{GpuContext, GpuResult, MeshHandle};

/// Vertex data structure with position, normal, texture coordinates and tangent
///
/// `#[repr(C)]` keeps the layout stable for buffer uploads. 48 bytes, no
/// implicit padding.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    /// Position in 3D space
    pub position: [f32; 3],

    /// Normal vector
    pub normal: [f32; 3],

    /// Texture coordinates
    pub tex_coord: [f32; 2],

    /// Tangent vector for normal mapping
    pub tangent: [f32; 3],

    /// Padding to a 16-byte multiple
    pub _padding: f32,
}

impl Vertex {
    /// Create a vertex with a zero tangent
    pub fn new(position: [f32; 3], normal: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tex_coord,
            tangent: [0.0; 3],
            _padding: 0.0,
        }
    }
}

/// CPU-side geometry for one mesh
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    /// Mesh name, unique within its model
    pub name: String,
    /// Vertex data
    pub vertices: Vec<Vertex>,
    /// Triangle list indices
    pub indices: Vec<u32>,
    /// Name of the material this mesh is drawn with
    pub material: Option<String>,
}

impl MeshData {
    /// Create mesh data
    pub fn new(name: impl Into<String>, vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            vertices,
            indices,
            material: None,
        }
    }

    /// Attach a material name
    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }

    /// Check that the data forms a drawable triangle list
    pub fn validate(&self) -> Result<(), String> {
        if self.vertices.is_empty() {
            return Err(format!("mesh '{}' has no vertices", self.name));
        }
        if self.indices.len() % 3 != 0 {
            return Err(format!(
                "mesh '{}' has {} indices, not a multiple of 3",
                self.name,
                self.indices.len()
            ));
        }
        let vertex_count = self.vertices.len();
        if let Some(bad) = self.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(format!(
                "mesh '{}' index {} out of range ({} vertices)",
                self.name, bad, vertex_count
            ));
        }
        Ok(())
    }

    /// Compute per-vertex tangents from positions and texture coordinates
    ///
    /// Accumulates per-triangle tangents and orthogonalises them against the
    /// normal. Triangles with degenerate UVs contribute nothing.
    pub fn compute_tangents(&mut self) {
        let mut accumulated = vec![Vec3::zeros(); self.vertices.len()];

        for triangle in self.indices.chunks_exact(3) {
            let [a, b, c] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
            let (Some(va), Some(vb), Some(vc)) = (self.vertices.get(a), self.vertices.get(b), self.vertices.get(c)) else {
                continue;
            };

            let edge1 = Vec3::from(vb.position) - Vec3::from(va.position);
            let edge2 = Vec3::from(vc.position) - Vec3::from(va.position);
            let duv1 = Vec2::from(vb.tex_coord) - Vec2::from(va.tex_coord);
            let duv2 = Vec2::from(vc.tex_coord) - Vec2::from(va.tex_coord);

            let det = duv1.x * duv2.y - duv2.x * duv1.y;
            if det.abs() < f32::EPSILON {
                continue;
            }
            let tangent = (edge1 * duv2.y - edge2 * duv1.y) / det;
            for index in [a, b, c] {
                accumulated[index] += tangent;
            }
        }

        for (vertex, tangent) in self.vertices.iter_mut().zip(accumulated) {
            let normal = Vec3::from(vertex.normal);
            let orthogonal = tangent - normal * normal.dot(&tangent);
            if orthogonal.norm_squared() > f32::EPSILON {
                vertex.tangent = orthogonal.normalize().into();
            }
        }
    }
}

/// GPU-resident mesh
#[derive(Debug)]
pub struct Mesh {
    name: String,
    handle: MeshHandle,
    vertex_count: usize,
    index_count: u32,
    material: Option<String>,
}

impl Mesh {
    /// Upload mesh data to the context
    pub fn upload<C: GpuContext + ?Sized>(context: &mut C, data: &MeshData) -> GpuResult<Self> {
        let handle = context.create_mesh(&data.vertices, &data.indices)?;
        log::debug!(
            "Uploaded mesh '{}' ({} vertices, {} indices)",
            data.name,
            data.vertices.len(),
            data.indices.len()
        );
        Ok(Self {
            name: data.name.clone(),
            handle,
            vertex_count: data.vertices.len(),
            index_count: u32::try_from(data.indices.len())
                .map_err(|_| crate::render::gpu::GpuError::ResourceCreation(format!("mesh '{}' has too many indices", data.name)))?,
            material: data.material.clone(),
        })
    }

    /// Issue the draw call
    pub fn render<C: GpuContext + ?Sized>(&self, context: &mut C) -> GpuResult<()> {
        context.draw_indexed(self.handle, self.index_count)
    }

    /// Mesh name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// GPU handle
    pub fn handle(&self) -> MeshHandle {
        self.handle
    }

    /// Number of vertices uploaded
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Number of indices drawn
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Material name the mesh was authored with
    pub fn material(&self) -> Option<&str> {
        self.material.as_deref()
    }
}
