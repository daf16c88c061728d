use cgmath::{Matrix4, Rad, Vector3};

use crate::gfx::rendering::backend::MeshHandle;

use super::bounds::Aabb;
use super::vertex::Vertex3D;

/// CPU-side geometry of one mesh node
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    /// Flat `[x, y, z, ...]` position attribute
    pub positions: Vec<f32>,
    /// Flat `[nx, ny, nz, ...]`, same length as `positions`
    pub normals: Vec<f32>,
    /// Flat `[u, v, ...]`, two entries per vertex
    pub uvs: Vec<f32>,
    /// Triangle list indices; `None` for non-indexed geometry
    pub indices: Option<Vec<u32>>,
}

impl MeshData {
    /// Builds mesh data, filling in normals and texture coordinates when the source lacks them
    pub fn new(
        positions: Vec<f32>,
        normals: Vec<f32>,
        uvs: Vec<f32>,
        indices: Option<Vec<u32>>,
    ) -> Self {
        let vertex_count = positions.len() / 3;

        let normals = if normals.len() == positions.len() {
            normals
        } else {
            calculate_vertex_normals(&positions, indices.as_deref())
        };

        let uvs = if uvs.len() == vertex_count * 2 {
            uvs
        } else {
            vec![0.0; vertex_count * 2]
        };

        Self {
            positions,
            normals,
            uvs,
            indices,
        }
    }

    /// Number of elements in the position attribute
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn index_count(&self) -> Option<usize> {
        self.indices.as_ref().map(Vec::len)
    }

    /// Triangles described by the index buffer, or 0 when the mesh is not indexed
    pub fn face_count(&self) -> usize {
        self.index_count().map(|count| count / 3).unwrap_or(0)
    }

    /// Interleaves the attributes into the GPU vertex format
    pub fn vertices(&self) -> Vec<Vertex3D> {
        (0..self.vertex_count())
            .map(|i| Vertex3D {
                position: [
                    self.positions[i * 3],
                    self.positions[i * 3 + 1],
                    self.positions[i * 3 + 2],
                ],
                normal: [
                    self.normals[i * 3],
                    self.normals[i * 3 + 1],
                    self.normals[i * 3 + 2],
                ],
                // OBJ texture space has v pointing up
                uv: [self.uvs[i * 2], 1.0 - self.uvs[i * 2 + 1]],
            })
            .collect()
    }
}

/// Averaged face normals for geometry that ships without them
pub fn calculate_vertex_normals(positions: &[f32], indices: Option<&[u32]>) -> Vec<f32> {
    let vertex_count = positions.len() / 3;
    let mut normals = vec![0.0; vertex_count * 3];

    let sequential: Vec<u32>;
    let indices = match indices {
        Some(indices) => indices,
        None => {
            sequential = (0..vertex_count as u32).collect();
            &sequential
        }
    };

    let vertex = |i: usize| -> Vector3<f32> {
        Vector3::new(positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2])
    };

    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        ];
        if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
            continue;
        }

        let face_normal = (vertex(i1) - vertex(i0)).cross(vertex(i2) - vertex(i0));
        for index in [i0, i1, i2] {
            normals[index * 3] += face_normal.x;
            normals[index * 3 + 1] += face_normal.y;
            normals[index * 3 + 2] += face_normal.z;
        }
    }

    for normal in normals.chunks_exact_mut(3) {
        let length = (normal[0].powi(2) + normal[1].powi(2) + normal[2].powi(2)).sqrt();
        if length > 0.0 {
            normal.iter_mut().for_each(|c| *c /= length);
        } else {
            normal.copy_from_slice(&[0.0, 1.0, 0.0]);
        }
    }

    normals
}

/// Which material a mesh node renders with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialSlot {
    /// Material index as declared by the source file
    Source(Option<usize>),
    /// The scene's single shared textured material
    Shared,
}

/// One renderable mesh in the loaded hierarchy
#[derive(Debug, Clone, PartialEq)]
pub struct MeshNode {
    pub name: String,
    pub mesh: MeshData,
    pub material: MaterialSlot,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    /// GPU buffers, present once uploaded to the renderer
    pub gpu: Option<MeshHandle>,
}

impl MeshNode {
    pub fn new(name: &str, mesh: MeshData, source_material: Option<usize>) -> Self {
        Self {
            name: name.to_string(),
            mesh,
            material: MaterialSlot::Source(source_material),
            cast_shadow: false,
            receive_shadow: false,
            gpu: None,
        }
    }
}

/// Root of a loaded model: its mesh nodes and the root transform
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRoot {
    pub name: String,
    pub nodes: Vec<MeshNode>,
    /// Number of materials the source file declared
    pub source_material_count: usize,
    pub position: Vector3<f32>,
    /// Rotation about the Y axis in radians
    pub yaw: f32,
    /// World-space bounds cached when the model is placed in a scene
    bounds: Option<Aabb>,
}

impl ModelRoot {
    pub fn new(name: &str, nodes: Vec<MeshNode>, source_material_count: usize) -> Self {
        Self {
            name: name.to_string(),
            nodes,
            source_material_count,
            position: Vector3::new(0.0, 0.0, 0.0),
            yaw: 0.0,
            bounds: None,
        }
    }

    /// Translation times yaw rotation
    pub fn transform(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position) * Matrix4::from_angle_y(Rad(self.yaw))
    }

    /// World-space box enclosing every mesh node, `None` when the model has no vertices.
    ///
    /// Walks every vertex; [`bounds`](Self::bounds) returns the cached result.
    pub fn compute_bounds(&self) -> Option<Aabb> {
        let transform = self.transform();
        self.nodes
            .iter()
            .filter_map(|node| Aabb::from_positions(&node.mesh.positions, &transform))
            .reduce(|acc, aabb| acc.union(&aabb))
    }

    /// Recomputes the cached bounds after the root transform changed
    pub fn refresh_bounds(&mut self) -> Option<Aabb> {
        self.bounds = self.compute_bounds();
        self.bounds
    }

    /// Bounds as of the last [`refresh_bounds`](Self::refresh_bounds)
    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    pub fn first_mesh(&self) -> Option<&MeshNode> {
        self.nodes.first()
    }
}

/// Read-only statistics about the loaded model for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelStats {
    pub name: String,
    pub vertices: usize,
    pub faces: usize,
    pub materials: usize,
    pub loaded: bool,
}

impl ModelStats {
    /// Snapshot before (or without) a successful geometry load
    pub fn pending(name: &str) -> Self {
        Self {
            name: name.to_string(),
            vertices: 0,
            faces: 0,
            materials: 0,
            loaded: false,
        }
    }

    /// Statistics of a freshly loaded model, taken from its first mesh node.
    ///
    /// `materials` is always 1: every node renders with the single shared material.
    pub fn from_model(name: &str, model: &ModelRoot) -> Self {
        let (vertices, faces) = model
            .first_mesh()
            .map(|node| (node.mesh.vertex_count(), node.mesh.face_count()))
            .unwrap_or((0, 0));

        Self {
            name: name.to_string(),
            vertices,
            faces,
            materials: 1,
            loaded: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn triangle() -> MeshData {
        MeshData::new(
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            Vec::new(),
            Vec::new(),
            Some(vec![0, 1, 2]),
        )
    }

    #[test]
    fn test_missing_normals_are_generated() {
        let mesh = triangle();
        assert_eq!(mesh.normals.len(), 9);
        // Counter-clockwise in the XY plane faces +Z
        assert!((mesh.normals[2] - 1.0).abs() < 1e-6);
        assert_eq!(mesh.uvs.len(), 6);
    }

    #[test]
    fn test_face_count_for_indexed_and_plain_meshes() {
        assert_eq!(triangle().face_count(), 1);

        let plain = MeshData::new(vec![0.0; 9], Vec::new(), Vec::new(), None);
        assert_eq!(plain.vertex_count(), 3);
        assert_eq!(plain.face_count(), 0);
    }

    #[test]
    fn test_vertices_flip_v() {
        let mesh = MeshData::new(
            vec![0.0; 3],
            vec![0.0, 1.0, 0.0],
            vec![0.25, 0.25],
            None,
        );
        assert_eq!(mesh.vertices()[0].uv, [0.25, 0.75]);
    }

    #[test]
    fn test_bounds_follow_root_transform() {
        let mut model = ModelRoot::new("tri", vec![MeshNode::new("tri", triangle(), None)], 0);
        model.position = Vector3::new(0.0, -0.5, 0.0);
        model.yaw = PI;

        assert_eq!(model.bounds(), None);
        let bounds = model.refresh_bounds().unwrap();
        assert_eq!(model.bounds(), Some(bounds));
        assert!((bounds.min.x + 1.0).abs() < 1e-5);
        assert!(bounds.max.x.abs() < 1e-5);
        assert!((bounds.min.y + 0.5).abs() < 1e-6);
        assert!((bounds.max.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_stats_use_first_mesh_and_one_material() {
        let first = MeshData::new(vec![0.0; 3000], Vec::new(), Vec::new(), Some(vec![0; 1500]));
        let second = MeshData::new(vec![0.0; 30], Vec::new(), Vec::new(), None);
        let model = ModelRoot::new(
            "cat",
            vec![
                MeshNode::new("body", first, Some(0)),
                MeshNode::new("eyes", second, Some(1)),
            ],
            2,
        );

        let stats = ModelStats::from_model("Cat Model", &model);
        assert_eq!(
            stats,
            ModelStats {
                name: "Cat Model".to_string(),
                vertices: 1000,
                faces: 500,
                materials: 1,
                loaded: true,
            }
        );
    }
}
