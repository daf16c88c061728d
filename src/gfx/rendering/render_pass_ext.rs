//! Render pass extensions for drawing uploaded meshes

use wgpu::*;

/// Vertex and index buffers of one uploaded mesh node
pub struct GpuMesh {
    pub vertex_buffer: Buffer,
    pub index_buffer: Option<Buffer>,
    pub vertex_count: u32,
    pub index_count: u32,
}

/// Extension trait for RenderPass to draw [`GpuMesh`]es
pub trait RenderPassExt {
    fn draw_gpu_mesh(&mut self, mesh: &GpuMesh);
}

impl RenderPassExt for RenderPass<'_> {
    fn draw_gpu_mesh(&mut self, mesh: &GpuMesh) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        match &mesh.index_buffer {
            Some(index_buffer) => {
                self.set_index_buffer(index_buffer.slice(..), IndexFormat::Uint32);
                self.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
            None => self.draw(0..mesh.vertex_count, 0..1),
        }
    }
}
