/// Decoded geometry, as produced by a mesh importer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshData {
    vertex_count: u32,
    vertices: Vec<u8>,
    indices: Vec<u32>,
}

impl MeshData {
    pub fn new(vertex_count: u32, vertices: Vec<u8>, indices: Vec<u32>) -> Self {
        Self {
            vertex_count,
            vertices,
            indices,
        }
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn vertices(&self) -> &[u8] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }
}
