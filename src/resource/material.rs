//! Materials: a shader pair plus surface parameters.

use crate::arena::Handle;
use crate::resource::image::Image;
use crate::resource::shader::Shader;
use crate::resource::{Resource, ResourceKind};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialDesc {
    pub vertex_shader: Handle<Shader>,
    pub fragment_shader: Handle<Shader>,
    pub texture: Option<Handle<Image>>,
    pub color: [f32; 4],
}

/// Material state. Shader and texture handles are non-owning: destroying a
/// shader or image a material refers to leaves the material in place, and
/// draws using it are skipped from then on.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub vertex_shader: Handle<Shader>,
    pub fragment_shader: Handle<Shader>,
    pub texture: Option<Handle<Image>>,
    pub color: [f32; 4],
}

impl From<MaterialDesc> for Material {
    fn from(desc: MaterialDesc) -> Self {
        Self {
            vertex_shader: desc.vertex_shader,
            fragment_shader: desc.fragment_shader,
            texture: desc.texture,
            color: desc.color,
        }
    }
}

impl Resource for Material {
    const KIND: ResourceKind = ResourceKind::Material;
}
