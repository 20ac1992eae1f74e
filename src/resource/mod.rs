//! Resource kinds and the errors shared by their facades.
//!
//! Each kind is a plain struct stored in an `Arena` of its own; callers only
//! ever see `Handle<T>`. The create/destroy operations live on
//! `ResourceSystem`, which pairs the arenas with a `GpuBackend`.

pub mod buffer;
pub mod command;
pub mod image;
pub mod material;
pub mod mesh;
pub mod shader;

use crate::arena::ArenaError;
use crate::gpu::GpuError;
use crate::shader_source::ShaderSourceError;
use core::fmt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Image,
    Buffer,
    Shader,
    Material,
    Mesh,
    Renderer,
    RenderCommand,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::Image,
        ResourceKind::Buffer,
        ResourceKind::Shader,
        ResourceKind::Material,
        ResourceKind::Mesh,
        ResourceKind::Renderer,
        ResourceKind::RenderCommand,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Image => "image",
            ResourceKind::Buffer => "buffer",
            ResourceKind::Shader => "shader",
            ResourceKind::Material => "material",
            ResourceKind::Mesh => "mesh",
            ResourceKind::Renderer => "renderer",
            ResourceKind::RenderCommand => "render command",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A type stored in an `Arena`, tagged with its kind.
pub trait Resource {
    const KIND: ResourceKind;
}

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error(transparent)]
    Arena(#[from] ArenaError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error(transparent)]
    Source(#[from] ShaderSourceError),
    #[error("invalid {kind}: {reason}")]
    InvalidArgument { kind: ResourceKind, reason: String },
    #[error("write of {len} bytes at offset {offset} exceeds {size}-byte buffer")]
    OutOfBounds { offset: u64, len: u64, size: u64 },
}

impl ResourceError {
    pub(crate) fn invalid(kind: ResourceKind, reason: impl Into<String>) -> Self {
        ResourceError::InvalidArgument {
            kind,
            reason: reason.into(),
        }
    }

    /// True when the error comes from using a released handle.
    pub fn is_stale_handle(&self) -> bool {
        matches!(self, ResourceError::Arena(ArenaError::StaleHandle { .. }))
    }
}
