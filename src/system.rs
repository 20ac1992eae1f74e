//! ResourceSystem: create/use/destroy for every resource kind.
//!
//! Each operation follows the same shape: validate the request, make sure
//! the target arena has room (exhaustion is fatal), do the device work
//! through the `GpuBackend`, then store the populated struct and hand out
//! its handle. Destroy runs the other way: device objects are released
//! first, then the slot.
//!
//! Cross-references between resources (material → shader/image, command →
//! mesh/material) are plain handles. They are checked when created and
//! again at submit time; a reference that went stale in between makes the
//! draw get skipped, not fail the frame.

use crate::arena::{Arena, Handle};
use crate::config::{ConfigError, ResourceConfig};
use crate::gpu::{
    DrawCall, GpuBackend, GpuBuffer, GpuCommand, GpuError, GpuImage, ImageLayout, UploadTarget,
};
use crate::resource::buffer::{Buffer, BufferDesc, BufferUsage};
use crate::resource::command::{RenderCommand, Renderer};
use crate::resource::image::{Image, ImageDesc};
use crate::resource::material::{Material, MaterialDesc};
use crate::resource::mesh::{Mesh, Vertex};
use crate::resource::shader::{Shader, ShaderStage};
use crate::resource::{Resource, ResourceError, ResourceKind};

pub struct ResourceSystem<B: GpuBackend> {
    gpu: B,
    config: ResourceConfig,
    images: Arena<Image>,
    buffers: Arena<Buffer>,
    shaders: Arena<Shader>,
    materials: Arena<Material>,
    meshes: Arena<Mesh>,
    renderers: Arena<Renderer>,
    commands: Arena<RenderCommand>,
}

/// Panic with a logged diagnostic if `arena` has no free slot.
fn ensure_room<T: Resource>(arena: &Arena<T>) {
    if arena.is_full() {
        log::error!(
            "{} arena exhausted (capacity {}); raise capacities in the resource config",
            T::KIND,
            arena.capacity()
        );
        panic!("{} arena exhausted (capacity {})", T::KIND, arena.capacity());
    }
}

impl<B: GpuBackend> ResourceSystem<B> {
    pub fn new(gpu: B, config: ResourceConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let caps = config.capacities;
        Ok(Self {
            gpu,
            images: Arena::with_capacity(caps.images),
            buffers: Arena::with_capacity(caps.buffers),
            shaders: Arena::with_capacity(caps.shaders),
            materials: Arena::with_capacity(caps.materials),
            meshes: Arena::with_capacity(caps.meshes),
            renderers: Arena::with_capacity(caps.renderers),
            commands: Arena::with_capacity(caps.render_commands),
            config,
        })
    }

    pub fn backend(&self) -> &B {
        &self.gpu
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.gpu
    }

    pub fn config(&self) -> &ResourceConfig {
        &self.config
    }

    /// Number of live resources of `kind`.
    pub fn live(&self, kind: ResourceKind) -> usize {
        match kind {
            ResourceKind::Image => self.images.len(),
            ResourceKind::Buffer => self.buffers.len(),
            ResourceKind::Shader => self.shaders.len(),
            ResourceKind::Material => self.materials.len(),
            ResourceKind::Mesh => self.meshes.len(),
            ResourceKind::Renderer => self.renderers.len(),
            ResourceKind::RenderCommand => self.commands.len(),
        }
    }

    /// Live count of every kind, in `ResourceKind::ALL` order.
    pub fn live_counts(&self) -> Vec<(ResourceKind, usize)> {
        ResourceKind::ALL.iter().map(|&k| (k, self.live(k))).collect()
    }

    pub fn images(&self) -> &Arena<Image> {
        &self.images
    }

    pub fn buffers(&self) -> &Arena<Buffer> {
        &self.buffers
    }

    pub fn shaders(&self) -> &Arena<Shader> {
        &self.shaders
    }

    pub fn materials(&self) -> &Arena<Material> {
        &self.materials
    }

    pub fn meshes(&self) -> &Arena<Mesh> {
        &self.meshes
    }

    pub fn renderers(&self) -> &Arena<Renderer> {
        &self.renderers
    }

    pub fn render_commands(&self) -> &Arena<RenderCommand> {
        &self.commands
    }

    // Images

    /// Create an image, optionally filled with tightly packed `pixels`.
    ///
    /// The image ends up in `ShaderRead` layout either way.
    pub fn create_image(
        &mut self,
        desc: ImageDesc,
        pixels: Option<&[u8]>,
    ) -> Result<Handle<Image>, ResourceError> {
        if desc.width == 0 || desc.height == 0 {
            return Err(ResourceError::invalid(
                ResourceKind::Image,
                format!("zero extent {}x{}", desc.width, desc.height),
            ));
        }
        if let Some(bytes) = pixels {
            if bytes.len() != desc.byte_len() {
                return Err(ResourceError::invalid(
                    ResourceKind::Image,
                    format!(
                        "{} pixel bytes for a {}x{} {:?} image of {} bytes",
                        bytes.len(),
                        desc.width,
                        desc.height,
                        desc.format,
                        desc.byte_len()
                    ),
                ));
            }
        }
        ensure_room(&self.images);

        let gpu = self.gpu.create_image(&desc)?;
        if let Err(e) = self.fill_image(gpu, pixels) {
            self.discard_image(gpu);
            return Err(e.into());
        }
        let handle = self.images.take(Image {
            desc,
            gpu,
            layout: ImageLayout::ShaderRead,
        });
        log::debug!(
            "created image {:?} ({}x{} {:?})",
            handle,
            desc.width,
            desc.height,
            desc.format
        );
        Ok(handle)
    }

    fn fill_image(&mut self, gpu: GpuImage, pixels: Option<&[u8]>) -> Result<(), GpuError> {
        match pixels {
            Some(bytes) => {
                self.gpu
                    .transition(gpu, ImageLayout::Undefined, ImageLayout::TransferDst)?;
                self.gpu.upload(bytes, UploadTarget::Image(gpu))?;
                self.gpu
                    .transition(gpu, ImageLayout::TransferDst, ImageLayout::ShaderRead)?;
                self.gpu.submit_and_wait(&[])
            }
            None => self
                .gpu
                .transition(gpu, ImageLayout::Undefined, ImageLayout::ShaderRead),
        }
    }

    fn discard_image(&mut self, gpu: GpuImage) {
        if let Err(e) = self.gpu.destroy_image(gpu) {
            log::warn!("failed to destroy image {:?} after a failed create: {}", gpu, e);
        }
    }

    pub fn image(&self, handle: Handle<Image>) -> Result<&Image, ResourceError> {
        Ok(self.images.get(handle)?)
    }

    pub fn destroy_image(&mut self, handle: Handle<Image>) -> Result<(), ResourceError> {
        let gpu = self.images.get(handle)?.gpu;
        self.gpu.destroy_image(gpu)?;
        self.images.release(handle)?;
        log::debug!("destroyed image {:?}", handle);
        Ok(())
    }

    // Buffers

    /// Create a buffer, optionally initialized with `data` at offset 0.
    pub fn create_buffer(
        &mut self,
        desc: BufferDesc,
        data: Option<&[u8]>,
    ) -> Result<Handle<Buffer>, ResourceError> {
        if desc.size == 0 {
            return Err(ResourceError::invalid(ResourceKind::Buffer, "zero size"));
        }
        if let Some(bytes) = data {
            if bytes.len() as u64 > desc.size {
                return Err(ResourceError::OutOfBounds {
                    offset: 0,
                    len: bytes.len() as u64,
                    size: desc.size,
                });
            }
        }
        ensure_room(&self.buffers);

        let gpu = self.gpu.create_buffer(desc.size, desc.usage)?;
        if let Some(bytes) = data {
            if let Err(e) = self.fill_buffer(gpu, 0, bytes) {
                self.discard_buffer(gpu);
                return Err(e.into());
            }
        }
        let handle = self.buffers.take(Buffer { desc, gpu });
        log::debug!("created buffer {:?} ({} bytes, {:?})", handle, desc.size, desc.usage);
        Ok(handle)
    }

    fn fill_buffer(&mut self, gpu: GpuBuffer, offset: u64, bytes: &[u8]) -> Result<(), GpuError> {
        self.gpu
            .upload(bytes, UploadTarget::Buffer { buffer: gpu, offset })?;
        self.gpu.submit_and_wait(&[])
    }

    fn discard_buffer(&mut self, gpu: GpuBuffer) {
        if let Err(e) = self.gpu.destroy_buffer(gpu) {
            log::warn!("failed to destroy buffer {:?} after a failed create: {}", gpu, e);
        }
    }

    pub fn buffer(&self, handle: Handle<Buffer>) -> Result<&Buffer, ResourceError> {
        Ok(self.buffers.get(handle)?)
    }

    /// Overwrite `bytes.len()` bytes of the buffer starting at `offset`.
    pub fn write_buffer(
        &mut self,
        handle: Handle<Buffer>,
        offset: u64,
        bytes: &[u8],
    ) -> Result<(), ResourceError> {
        let buffer = self.buffers.get(handle)?;
        let len = bytes.len() as u64;
        let size = buffer.desc.size;
        if offset.checked_add(len).map_or(true, |end| end > size) {
            return Err(ResourceError::OutOfBounds { offset, len, size });
        }
        let gpu = buffer.gpu;
        self.fill_buffer(gpu, offset, bytes)?;
        Ok(())
    }

    pub fn destroy_buffer(&mut self, handle: Handle<Buffer>) -> Result<(), ResourceError> {
        let gpu = self.buffers.get(handle)?.gpu;
        self.gpu.destroy_buffer(gpu)?;
        self.buffers.release(handle)?;
        log::debug!("destroyed buffer {:?}", handle);
        Ok(())
    }

    // Shaders

    pub fn create_shader(
        &mut self,
        name: &str,
        stage: ShaderStage,
        code: &[u8],
    ) -> Result<Handle<Shader>, ResourceError> {
        if name.is_empty() {
            return Err(ResourceError::invalid(ResourceKind::Shader, "empty name"));
        }
        if code.is_empty() {
            return Err(ResourceError::invalid(
                ResourceKind::Shader,
                format!("{} has no code", name),
            ));
        }
        ensure_room(&self.shaders);

        let module = self.gpu.create_shader_module(stage, code)?;
        let handle = self.shaders.take(Shader {
            name: name.to_string(),
            stage,
            module,
            code_len: code.len(),
        });
        log::debug!("created {:?} shader {} as {:?}", stage, name, handle);
        Ok(handle)
    }

    pub fn shader(&self, handle: Handle<Shader>) -> Result<&Shader, ResourceError> {
        Ok(self.shaders.get(handle)?)
    }

    pub fn destroy_shader(&mut self, handle: Handle<Shader>) -> Result<(), ResourceError> {
        let module = self.shaders.get(handle)?.module;
        self.gpu.destroy_shader_module(module)?;
        let shader = self.shaders.release(handle)?;
        log::debug!("destroyed shader {} ({:?})", shader.name, handle);
        Ok(())
    }

    // Materials

    fn check_shader(
        &self,
        handle: Handle<Shader>,
        expected: ShaderStage,
    ) -> Result<(), ResourceError> {
        let shader = self.shaders.get(handle)?;
        if shader.stage != expected {
            return Err(ResourceError::invalid(
                ResourceKind::Material,
                format!(
                    "shader {} is a {:?} shader, expected {:?}",
                    shader.name, shader.stage, expected
                ),
            ));
        }
        Ok(())
    }

    pub fn create_material(&mut self, desc: MaterialDesc) -> Result<Handle<Material>, ResourceError> {
        self.check_shader(desc.vertex_shader, ShaderStage::Vertex)?;
        self.check_shader(desc.fragment_shader, ShaderStage::Fragment)?;
        if let Some(texture) = desc.texture {
            self.images.get(texture)?;
        }
        ensure_room(&self.materials);

        let handle = self.materials.take(Material::from(desc));
        log::debug!("created material {:?}", handle);
        Ok(handle)
    }

    pub fn material(&self, handle: Handle<Material>) -> Result<&Material, ResourceError> {
        Ok(self.materials.get(handle)?)
    }

    pub fn set_material_color(
        &mut self,
        handle: Handle<Material>,
        color: [f32; 4],
    ) -> Result<(), ResourceError> {
        self.materials.get_mut(handle)?.color = color;
        Ok(())
    }

    pub fn set_material_texture(
        &mut self,
        handle: Handle<Material>,
        texture: Option<Handle<Image>>,
    ) -> Result<(), ResourceError> {
        if let Some(t) = texture {
            self.images.get(t)?;
        }
        self.materials.get_mut(handle)?.texture = texture;
        Ok(())
    }

    pub fn destroy_material(&mut self, handle: Handle<Material>) -> Result<(), ResourceError> {
        self.materials.release(handle)?;
        log::debug!("destroyed material {:?}", handle);
        Ok(())
    }

    // Meshes

    /// Upload an indexed triangle list.
    pub fn create_mesh(
        &mut self,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> Result<Handle<Mesh>, ResourceError> {
        if vertices.is_empty() || indices.is_empty() {
            return Err(ResourceError::invalid(ResourceKind::Mesh, "no geometry"));
        }
        if indices.len() % 3 != 0 {
            return Err(ResourceError::invalid(
                ResourceKind::Mesh,
                format!("{} indices do not form triangles", indices.len()),
            ));
        }
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(ResourceError::invalid(
                ResourceKind::Mesh,
                format!("index {} out of range for {} vertices", bad, vertices.len()),
            ));
        }
        ensure_room(&self.meshes);

        let vertex_bytes: &[u8] = bytemuck::cast_slice(vertices);
        let index_bytes: &[u8] = bytemuck::cast_slice(indices);

        let vertex_buffer = self
            .gpu
            .create_buffer(vertex_bytes.len() as u64, BufferUsage::Vertex)?;
        let index_buffer = match self
            .gpu
            .create_buffer(index_bytes.len() as u64, BufferUsage::Index)
        {
            Ok(b) => b,
            Err(e) => {
                self.discard_buffer(vertex_buffer);
                return Err(e.into());
            }
        };
        let uploaded = self
            .gpu
            .upload(
                vertex_bytes,
                UploadTarget::Buffer {
                    buffer: vertex_buffer,
                    offset: 0,
                },
            )
            .and_then(|()| self.fill_buffer(index_buffer, 0, index_bytes));
        if let Err(e) = uploaded {
            self.discard_buffer(vertex_buffer);
            self.discard_buffer(index_buffer);
            return Err(e.into());
        }

        let handle = self.meshes.take(Mesh {
            vertex_buffer,
            index_buffer,
            vertex_count: vertices.len() as u32,
            index_count: indices.len() as u32,
        });
        log::debug!(
            "created mesh {:?} ({} vertices, {} indices)",
            handle,
            vertices.len(),
            indices.len()
        );
        Ok(handle)
    }

    pub fn mesh(&self, handle: Handle<Mesh>) -> Result<&Mesh, ResourceError> {
        Ok(self.meshes.get(handle)?)
    }

    pub fn destroy_mesh(&mut self, handle: Handle<Mesh>) -> Result<(), ResourceError> {
        let mesh = self.meshes.get(handle)?;
        let (vertex_buffer, index_buffer) = (mesh.vertex_buffer, mesh.index_buffer);
        self.gpu.destroy_buffer(vertex_buffer)?;
        self.gpu.destroy_buffer(index_buffer)?;
        self.meshes.release(handle)?;
        log::debug!("destroyed mesh {:?}", handle);
        Ok(())
    }

    // Renderers and render commands

    /// Create a renderer. It starts out with every live render command.
    pub fn create_renderer(&mut self, name: &str) -> Handle<Renderer> {
        ensure_room(&self.renderers);
        let mut renderer = Renderer::new(name.to_string(), self.config.bucket_initial_capacity);
        for (command, _) in self.commands.iter() {
            renderer.register(command);
        }
        let handle = self.renderers.take(renderer);
        log::debug!("created renderer {} as {:?}", name, handle);
        handle
    }

    pub fn renderer(&self, handle: Handle<Renderer>) -> Result<&Renderer, ResourceError> {
        Ok(self.renderers.get(handle)?)
    }

    /// Commands registered with `renderer`, in registration order.
    pub fn renderer_commands(
        &self,
        renderer: Handle<Renderer>,
    ) -> Result<&[Handle<RenderCommand>], ResourceError> {
        Ok(self.renderers.get(renderer)?.commands())
    }

    pub fn destroy_renderer(&mut self, handle: Handle<Renderer>) -> Result<(), ResourceError> {
        let renderer = self.renderers.release(handle)?;
        log::debug!("destroyed renderer {} ({:?})", renderer.name, handle);
        Ok(())
    }

    /// Create a draw of `mesh` with `material` and register it with every
    /// live renderer.
    pub fn create_render_command(
        &mut self,
        mesh: Handle<Mesh>,
        material: Handle<Material>,
        transform: [[f32; 4]; 4],
    ) -> Result<Handle<RenderCommand>, ResourceError> {
        self.meshes.get(mesh)?;
        self.materials.get(material)?;
        ensure_room(&self.commands);

        let handle = self.commands.take(RenderCommand {
            mesh,
            material,
            transform,
        });
        for (_, renderer) in self.renderers.iter_mut() {
            renderer.register(handle);
        }
        log::debug!(
            "created render command {:?} for {} renderer(s)",
            handle,
            self.renderers.len()
        );
        Ok(handle)
    }

    pub fn render_command(
        &self,
        handle: Handle<RenderCommand>,
    ) -> Result<&RenderCommand, ResourceError> {
        Ok(self.commands.get(handle)?)
    }

    pub fn set_command_transform(
        &mut self,
        handle: Handle<RenderCommand>,
        transform: [[f32; 4]; 4],
    ) -> Result<(), ResourceError> {
        self.commands.get_mut(handle)?.transform = transform;
        Ok(())
    }

    pub fn destroy_render_command(
        &mut self,
        handle: Handle<RenderCommand>,
    ) -> Result<(), ResourceError> {
        self.commands.get(handle)?;
        for (_, renderer) in self.renderers.iter_mut() {
            renderer.unregister(handle);
        }
        self.commands.release(handle)?;
        log::debug!("destroyed render command {:?}", handle);
        Ok(())
    }

    fn resolve_draw(&self, handle: Handle<RenderCommand>) -> Result<DrawCall, ResourceError> {
        let command = self.commands.get(handle)?;
        let mesh = self.meshes.get(command.mesh)?;
        let material = self.materials.get(command.material)?;
        let vertex_shader = self.shaders.get(material.vertex_shader)?.module;
        let fragment_shader = self.shaders.get(material.fragment_shader)?.module;
        let texture = match material.texture {
            Some(t) => Some(self.images.get(t)?.gpu),
            None => None,
        };
        Ok(DrawCall {
            vertex_buffer: mesh.vertex_buffer,
            index_buffer: mesh.index_buffer,
            index_count: mesh.index_count,
            vertex_shader,
            fragment_shader,
            texture,
            color: material.color,
            transform: command.transform,
        })
    }

    /// Draw every command registered with `renderer` and wait for the
    /// device. Commands whose mesh, material, shaders or texture have been
    /// destroyed are skipped. Returns the number of draws submitted.
    pub fn submit_renderer(&mut self, renderer: Handle<Renderer>) -> Result<usize, ResourceError> {
        let r = self.renderers.get(renderer)?;
        let mut draws = Vec::with_capacity(r.commands().len());
        for &command in r.commands() {
            match self.resolve_draw(command) {
                Ok(draw) => draws.push(GpuCommand::Draw(draw)),
                Err(e) if e.is_stale_handle() => {
                    log::warn!("renderer {}: skipping {:?}: {}", r.name, command, e);
                }
                Err(e) => return Err(e),
            }
        }
        self.gpu.submit_and_wait(&draws)?;
        Ok(draws.len())
    }

    /// Destroy every remaining resource, dependents first. Keeps going past
    /// failures and returns the first one.
    pub fn shutdown(&mut self) -> Result<(), ResourceError> {
        let mut first: Option<ResourceError> = None;
        let mut note = |e: ResourceError| {
            log::error!("shutdown: {}", e);
            if first.is_none() {
                first = Some(e);
            }
        };

        self.commands.drain().for_each(drop);
        self.materials.drain().for_each(drop);
        for (_, mesh) in self.meshes.drain() {
            for buffer in [mesh.vertex_buffer, mesh.index_buffer] {
                if let Err(e) = self.gpu.destroy_buffer(buffer) {
                    note(e.into());
                }
            }
        }
        for (_, shader) in self.shaders.drain() {
            if let Err(e) = self.gpu.destroy_shader_module(shader.module) {
                note(e.into());
            }
        }
        for (_, image) in self.images.drain() {
            if let Err(e) = self.gpu.destroy_image(image.gpu) {
                note(e.into());
            }
        }
        for (_, buffer) in self.buffers.drain() {
            if let Err(e) = self.gpu.destroy_buffer(buffer.gpu) {
                note(e.into());
            }
        }
        self.renderers.drain().for_each(drop);
        log::debug!("resource system shut down");

        match first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl<B: GpuBackend> Drop for ResourceSystem<B> {
    fn drop(&mut self) {
        let live: usize = ResourceKind::ALL.iter().map(|&k| self.live(k)).sum();
        if live > 0 {
            log::warn!(
                "resource system dropped with {} live resource(s); call shutdown() to release device objects",
                live
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaError;
    use crate::config::ArenaCapacities;
    use crate::gpu::HeadlessBackend;
    use crate::resource::command::IDENTITY;
    use crate::resource::image::ImageFormat;

    fn system() -> ResourceSystem<HeadlessBackend> {
        ResourceSystem::new(HeadlessBackend::new(), ResourceConfig::default()).unwrap()
    }

    fn rgba(width: u32, height: u32) -> ImageDesc {
        ImageDesc {
            width,
            height,
            format: ImageFormat::Rgba8Unorm,
        }
    }

    fn triangle() -> (Vec<Vertex>, Vec<u32>) {
        let v = |x: f32, y: f32| Vertex {
            position: [x, y, 0.0],
            normal: [0.0, 0.0, 1.0],
            uv: [x, y],
        };
        (vec![v(0.0, 0.0), v(1.0, 0.0), v(0.0, 1.0)], vec![0, 1, 2])
    }

    fn material(sys: &mut ResourceSystem<HeadlessBackend>) -> Handle<Material> {
        let vs = sys.create_shader("basic.vert", ShaderStage::Vertex, b"vs").unwrap();
        let fs = sys.create_shader("basic.frag", ShaderStage::Fragment, b"fs").unwrap();
        sys.create_material(MaterialDesc {
            vertex_shader: vs,
            fragment_shader: fs,
            texture: None,
            color: [1.0; 4],
        })
        .unwrap()
    }

    #[test]
    fn image_upload_transitions_to_shader_read() {
        let mut sys = system();
        let pixels = vec![0xffu8; 2 * 2 * 4];
        let h = sys.create_image(rgba(2, 2), Some(pixels.as_slice())).unwrap();
        let gpu = sys.image(h).unwrap().gpu();
        assert_eq!(sys.backend().image_layout(gpu), Some(ImageLayout::ShaderRead));
        let stats = sys.backend().stats();
        assert_eq!(stats.transitions, 2);
        assert_eq!(stats.uploaded_bytes, 16);
        assert_eq!(stats.submissions, 1);

        sys.destroy_image(h).unwrap();
        assert_eq!(sys.backend().live_objects(), 0);
        assert!(sys.image(h).unwrap_err().is_stale_handle());
    }

    #[test]
    fn image_without_pixels_skips_upload() {
        let mut sys = system();
        let h = sys.create_image(rgba(4, 4), None).unwrap();
        assert_eq!(sys.image(h).unwrap().layout(), ImageLayout::ShaderRead);
        assert_eq!(sys.backend().stats().uploads, 0);
    }

    #[test]
    fn image_rejects_wrong_pixel_length() {
        let mut sys = system();
        let err = sys.create_image(rgba(2, 2), Some(&[0u8; 3][..])).unwrap_err();
        assert!(matches!(err, ResourceError::InvalidArgument { .. }));
        assert_eq!(sys.live(ResourceKind::Image), 0);
        assert_eq!(sys.backend().live_objects(), 0);
    }

    #[test]
    fn failed_device_work_leaves_nothing_behind() {
        let mut sys =
            ResourceSystem::new(HeadlessBackend::with_memory_budget(8), ResourceConfig::default())
                .unwrap();
        let err = sys.create_image(rgba(4, 4), None).unwrap_err();
        assert!(matches!(err, ResourceError::Gpu(GpuError::OutOfMemory { .. })));
        assert_eq!(sys.live(ResourceKind::Image), 0);

        // The vertex buffer fits, the index buffer does not.
        let (vertices, indices) = triangle();
        let mut sys = ResourceSystem::new(
            HeadlessBackend::with_memory_budget(std::mem::size_of::<Vertex>() as u64 * 3),
            ResourceConfig::default(),
        )
        .unwrap();
        assert!(sys.create_mesh(&vertices, &indices).is_err());
        assert_eq!(sys.backend().live_objects(), 0);
        assert_eq!(sys.live(ResourceKind::Mesh), 0);
    }

    #[test]
    fn buffer_writes_are_bounds_checked() {
        let mut sys = system();
        let desc = BufferDesc {
            size: 16,
            usage: BufferUsage::Uniform,
        };
        let h = sys.create_buffer(desc, Some(&[1u8, 2, 3, 4][..])).unwrap();
        sys.write_buffer(h, 12, &[0; 4]).unwrap();
        assert_eq!(
            sys.write_buffer(h, 13, &[0; 4]).unwrap_err().to_string(),
            "write of 4 bytes at offset 13 exceeds 16-byte buffer"
        );
        assert!(matches!(
            sys.write_buffer(h, u64::MAX, &[0]),
            Err(ResourceError::OutOfBounds { .. })
        ));
        assert!(matches!(
            sys.create_buffer(desc, Some(&[0u8; 17][..])),
            Err(ResourceError::OutOfBounds { .. })
        ));
        sys.destroy_buffer(h).unwrap();
        assert!(sys.destroy_buffer(h).unwrap_err().is_stale_handle());
    }

    #[test]
    fn shader_requires_code() {
        let mut sys = system();
        assert!(matches!(
            sys.create_shader("empty.frag", ShaderStage::Fragment, &[]),
            Err(ResourceError::InvalidArgument {
                kind: ResourceKind::Shader,
                ..
            })
        ));
        let h = sys.create_shader("a.comp", ShaderStage::Compute, &[3, 2, 0x23, 7]).unwrap();
        let shader = sys.shader(h).unwrap();
        assert_eq!(shader.name, "a.comp");
        assert_eq!(shader.code_len(), 4);
        sys.destroy_shader(h).unwrap();
        assert_eq!(sys.backend().live_objects(), 0);
    }

    #[test]
    fn material_checks_shader_stages_and_texture() {
        let mut sys = system();
        let vs = sys.create_shader("a.vert", ShaderStage::Vertex, b"v").unwrap();
        let fs = sys.create_shader("a.frag", ShaderStage::Fragment, b"f").unwrap();
        let swapped = MaterialDesc {
            vertex_shader: fs,
            fragment_shader: vs,
            texture: None,
            color: [0.0; 4],
        };
        assert!(matches!(
            sys.create_material(swapped),
            Err(ResourceError::InvalidArgument { .. })
        ));

        let tex = sys.create_image(rgba(1, 1), None).unwrap();
        sys.destroy_image(tex).unwrap();
        let stale_texture = MaterialDesc {
            vertex_shader: vs,
            fragment_shader: fs,
            texture: Some(tex),
            color: [0.0; 4],
        };
        assert!(sys.create_material(stale_texture).unwrap_err().is_stale_handle());

        let m = sys
            .create_material(MaterialDesc {
                texture: None,
                ..stale_texture
            })
            .unwrap();
        sys.set_material_color(m, [0.5, 0.5, 0.5, 1.0]).unwrap();
        let tex = sys.create_image(rgba(1, 1), None).unwrap();
        sys.set_material_texture(m, Some(tex)).unwrap();
        let mat = sys.material(m).unwrap();
        assert_eq!(mat.color, [0.5, 0.5, 0.5, 1.0]);
        assert_eq!(mat.texture, Some(tex));
    }

    #[test]
    fn mesh_validates_indices() {
        let mut sys = system();
        let (vertices, _) = triangle();
        assert!(sys.create_mesh(&vertices, &[0, 1]).is_err());
        assert!(sys.create_mesh(&vertices, &[0, 1, 3]).is_err());
        assert!(sys.create_mesh(&[], &[0, 1, 2]).is_err());
        let m = sys.create_mesh(&vertices, &[0, 1, 2, 2, 1, 0]).unwrap();
        let mesh = sys.mesh(m).unwrap();
        assert_eq!((mesh.vertex_count, mesh.index_count), (3, 6));
        assert_eq!(
            sys.backend().buffer_usage(mesh.vertex_buffer()),
            Some(BufferUsage::Vertex)
        );
        sys.destroy_mesh(m).unwrap();
        assert_eq!(sys.backend().live_objects(), 0);
    }

    /// Invariant: every live renderer lists every live render command, and a
    /// destroyed command disappears from all of them.
    #[test]
    fn commands_are_registered_with_every_renderer() {
        let mut sys = system();
        let (vertices, indices) = triangle();
        let mesh = sys.create_mesh(&vertices, &indices).unwrap();
        let mat = material(&mut sys);

        let main = sys.create_renderer("main");
        let shadow = sys.create_renderer("shadow");
        let c1 = sys.create_render_command(mesh, mat, IDENTITY).unwrap();
        let c2 = sys.create_render_command(mesh, mat, IDENTITY).unwrap();
        let late = sys.create_renderer("late");

        for r in [main, shadow, late] {
            let mut cmds = sys.renderer(r).unwrap().commands().to_vec();
            cmds.sort_by_key(|h| format!("{:?}", h));
            let mut expected = vec![c1, c2];
            expected.sort_by_key(|h| format!("{:?}", h));
            assert_eq!(cmds, expected);
        }

        sys.destroy_render_command(c1).unwrap();
        for r in [main, shadow, late] {
            assert_eq!(sys.renderer_commands(r).unwrap(), &[c2]);
        }
        assert!(sys.render_command(c1).unwrap_err().is_stale_handle());
    }

    #[test]
    fn render_command_rejects_stale_inputs() {
        let mut sys = system();
        let (vertices, indices) = triangle();
        let mesh = sys.create_mesh(&vertices, &indices).unwrap();
        let mat = material(&mut sys);
        sys.destroy_mesh(mesh).unwrap();
        assert!(sys
            .create_render_command(mesh, mat, IDENTITY)
            .unwrap_err()
            .is_stale_handle());
    }

    #[test]
    fn submit_skips_commands_with_destroyed_dependencies() {
        let mut sys = system();
        let (vertices, indices) = triangle();
        let keep = sys.create_mesh(&vertices, &indices).unwrap();
        let doomed = sys.create_mesh(&vertices, &indices).unwrap();
        let mat = material(&mut sys);
        let r = sys.create_renderer("main");
        sys.create_render_command(keep, mat, IDENTITY).unwrap();
        sys.create_render_command(doomed, mat, IDENTITY).unwrap();

        assert_eq!(sys.submit_renderer(r).unwrap(), 2);
        sys.destroy_mesh(doomed).unwrap();
        assert_eq!(sys.submit_renderer(r).unwrap(), 1);
        assert_eq!(sys.backend().stats().draws, 3);
    }

    #[test]
    fn shutdown_releases_everything() {
        let mut sys = system();
        let (vertices, indices) = triangle();
        let mesh = sys.create_mesh(&vertices, &indices).unwrap();
        let mat = material(&mut sys);
        sys.create_image(rgba(8, 8), None).unwrap();
        sys.create_buffer(
            BufferDesc {
                size: 64,
                usage: BufferUsage::Storage,
            },
            None,
        )
        .unwrap();
        sys.create_renderer("main");
        sys.create_render_command(mesh, mat, IDENTITY).unwrap();

        assert!(sys.live_counts().iter().all(|&(_, n)| n >= 1));
        sys.shutdown().unwrap();
        for (kind, n) in sys.live_counts() {
            assert_eq!(n, 0, "{} still live", kind);
        }
        assert_eq!(sys.backend().live_objects(), 0);
        assert_eq!(sys.backend().allocated_bytes(), 0);
    }

    #[test]
    #[should_panic(expected = "arena exhausted")]
    fn exhaustion_is_fatal() {
        let config = ResourceConfig {
            capacities: ArenaCapacities {
                renderers: 1,
                ..ArenaCapacities::default()
            },
            ..ResourceConfig::default()
        };
        let mut sys = ResourceSystem::new(HeadlessBackend::new(), config).unwrap();
        sys.create_renderer("a");
        sys.create_renderer("b");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ResourceConfig {
            shader_buckets: 0,
            ..ResourceConfig::default()
        };
        assert!(ResourceSystem::new(HeadlessBackend::new(), config).is_err());
    }

    #[test]
    fn stale_errors_name_the_kind() {
        let mut sys = system();
        let r = sys.create_renderer("main");
        sys.destroy_renderer(r).unwrap();
        match sys.destroy_renderer(r) {
            Err(ResourceError::Arena(ArenaError::StaleHandle { kind })) => {
                assert_eq!(kind, ResourceKind::Renderer)
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
