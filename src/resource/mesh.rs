//! Meshes: indexed triangle geometry resident in two device buffers.

use crate::gpu::GpuBuffer;
use crate::resource::{Resource, ResourceKind};
use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

#[derive(Debug)]
pub struct Mesh {
    pub(crate) vertex_buffer: GpuBuffer,
    pub(crate) index_buffer: GpuBuffer,
    pub vertex_count: u32,
    pub index_count: u32,
}

impl Mesh {
    pub fn vertex_buffer(&self) -> GpuBuffer {
        self.vertex_buffer
    }

    pub fn index_buffer(&self) -> GpuBuffer {
        self.index_buffer
    }
}

impl Resource for Mesh {
    const KIND: ResourceKind = ResourceKind::Mesh;
}
