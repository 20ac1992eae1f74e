//! Shaders: compiled stage modules, registered by name.

use crate::gpu::GpuShaderModule;
use crate::resource::{Resource, ResourceKind};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
    Geometry,
    TessControl,
    TessEvaluation,
}

impl ShaderStage {
    pub fn from_extension(ext: &str) -> Option<ShaderStage> {
        match ext {
            "vert" => Some(ShaderStage::Vertex),
            "frag" => Some(ShaderStage::Fragment),
            "comp" => Some(ShaderStage::Compute),
            "geom" => Some(ShaderStage::Geometry),
            "tesc" => Some(ShaderStage::TessControl),
            "tese" => Some(ShaderStage::TessEvaluation),
            _ => None,
        }
    }

    /// Stage of a shader file, judged by extension. A trailing `.spv` is
    /// ignored, so `lit.frag.spv` is a fragment shader.
    pub fn from_path(path: &Path) -> Option<ShaderStage> {
        let mut ext = path.extension()?.to_str()?;
        if ext == "spv" {
            ext = Path::new(path.file_stem()?).extension()?.to_str()?;
        }
        ShaderStage::from_extension(ext)
    }
}

#[derive(Debug)]
pub struct Shader {
    pub name: String,
    pub stage: ShaderStage,
    pub(crate) module: GpuShaderModule,
    pub(crate) code_len: usize,
}

impl Shader {
    pub fn module(&self) -> GpuShaderModule {
        self.module
    }

    pub fn code_len(&self) -> usize {
        self.code_len
    }
}

impl Resource for Shader {
    const KIND: ResourceKind = ResourceKind::Shader;
}
