//! Buffers: linear device memory.

use crate::gpu::GpuBuffer;
use crate::resource::{Resource, ResourceKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferUsage {
    Vertex,
    Index,
    Uniform,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDesc {
    pub size: u64,
    pub usage: BufferUsage,
}

#[derive(Debug)]
pub struct Buffer {
    pub desc: BufferDesc,
    pub(crate) gpu: GpuBuffer,
}

impl Buffer {
    pub fn gpu(&self) -> GpuBuffer {
        self.gpu
    }
}

impl Resource for Buffer {
    const KIND: ResourceKind = ResourceKind::Buffer;
}
