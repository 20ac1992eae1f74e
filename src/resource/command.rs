//! Renderers and the render commands registered with them.

use crate::arena::Handle;
use crate::list::List;
use crate::resource::material::Material;
use crate::resource::mesh::Mesh;
use crate::resource::{Resource, ResourceKind};

pub const IDENTITY: [[f32; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// A draw of one mesh with one material. Both handles are non-owning.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderCommand {
    pub mesh: Handle<Mesh>,
    pub material: Handle<Material>,
    pub transform: [[f32; 4]; 4],
}

impl Resource for RenderCommand {
    const KIND: ResourceKind = ResourceKind::RenderCommand;
}

/// A consumer of render commands. Every live renderer sees every live command.
#[derive(Debug)]
pub struct Renderer {
    pub name: String,
    pub(crate) commands: List<Handle<RenderCommand>>,
}

impl Renderer {
    pub(crate) fn new(name: String, initial_capacity: usize) -> Self {
        Self {
            name,
            commands: List::with_capacity(initial_capacity),
        }
    }

    /// Commands in registration order.
    pub fn commands(&self) -> &[Handle<RenderCommand>] {
        self.commands.as_slice()
    }

    pub(crate) fn register(&mut self, command: Handle<RenderCommand>) {
        self.commands.push(command);
    }

    /// Drop `command` from the list; returns whether it was registered.
    pub(crate) fn unregister(&mut self, command: Handle<RenderCommand>) -> bool {
        match self.commands.iter().position(|c| *c == command) {
            Some(i) => self.commands.remove_at(i).is_ok(),
            None => false,
        }
    }
}

impl Resource for Renderer {
    const KIND: ResourceKind = ResourceKind::Renderer;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;

    #[test]
    fn register_and_unregister_keep_order() {
        let mut meshes: Arena<Mesh> = Arena::with_capacity(1);
        let mut materials: Arena<Material> = Arena::with_capacity(1);
        let mut commands: Arena<RenderCommand> = Arena::with_capacity(4);
        let mesh = meshes.take(Mesh {
            vertex_buffer: crate::gpu::GpuBuffer(1),
            index_buffer: crate::gpu::GpuBuffer(2),
            vertex_count: 3,
            index_count: 3,
        });
        let shader = {
            let mut shaders: Arena<crate::resource::shader::Shader> = Arena::with_capacity(1);
            shaders.take(crate::resource::shader::Shader {
                name: "s".to_string(),
                stage: crate::resource::shader::ShaderStage::Vertex,
                module: crate::gpu::GpuShaderModule(3),
                code_len: 4,
            })
        };
        let material = materials.take(Material {
            vertex_shader: shader,
            fragment_shader: shader,
            texture: None,
            color: [1.0; 4],
        });
        let cmds: Vec<_> = (0..3)
            .map(|_| {
                commands.take(RenderCommand {
                    mesh,
                    material,
                    transform: IDENTITY,
                })
            })
            .collect();

        let mut r = Renderer::new("main".to_string(), 1);
        for c in &cmds {
            r.register(*c);
        }
        assert_eq!(r.commands(), cmds.as_slice());
        assert!(r.unregister(cmds[1]));
        assert!(!r.unregister(cmds[1]));
        assert_eq!(r.commands(), &[cmds[0], cmds[2]]);
    }
}
