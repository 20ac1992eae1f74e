//! The graphics-device seam.
//!
//! `GpuBackend` is everything the resource layer needs from a native
//! graphics API: object creation/destruction, byte uploads, image layout
//! transitions and a synchronous submit. All calls block until the device
//! work they describe is done from the caller's point of view.
//!
//! `HeadlessBackend` implements the trait without a device. It tracks every
//! live object and validates uploads, transitions and draws against them.

use crate::resource::buffer::BufferUsage;
use crate::resource::image::ImageDesc;
use crate::resource::shader::ShaderStage;
use hashbrown::HashMap;

/// Device image id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpuImage(pub u64);

/// Device buffer id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpuBuffer(pub u64);

/// Device shader module id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpuShaderModule(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    Undefined,
    TransferDst,
    ShaderRead,
    ColorAttachment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadTarget {
    Image(GpuImage),
    Buffer { buffer: GpuBuffer, offset: u64 },
}

/// One indexed draw, fully resolved to device objects.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub vertex_buffer: GpuBuffer,
    pub index_buffer: GpuBuffer,
    pub index_count: u32,
    pub vertex_shader: GpuShaderModule,
    pub fragment_shader: GpuShaderModule,
    pub texture: Option<GpuImage>,
    pub color: [f32; 4],
    pub transform: [[f32; 4]; 4],
}

#[derive(Debug, Clone, PartialEq)]
pub enum GpuCommand {
    Draw(DrawCall),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GpuError {
    #[error("unknown device object {0}")]
    UnknownObject(u64),
    #[error("image layout mismatch: expected {expected:?}, found {actual:?}")]
    LayoutMismatch {
        expected: ImageLayout,
        actual: ImageLayout,
    },
    #[error("upload of {len} bytes at offset {offset} exceeds {capacity}-byte destination")]
    UploadOutOfBounds { offset: u64, len: u64, capacity: u64 },
    #[error("device out of memory: requested {requested} bytes, {available} available")]
    OutOfMemory { requested: u64, available: u64 },
}

pub trait GpuBackend {
    fn create_image(&mut self, desc: &ImageDesc) -> Result<GpuImage, GpuError>;
    fn destroy_image(&mut self, image: GpuImage) -> Result<(), GpuError>;

    fn create_buffer(&mut self, size: u64, usage: BufferUsage) -> Result<GpuBuffer, GpuError>;
    fn destroy_buffer(&mut self, buffer: GpuBuffer) -> Result<(), GpuError>;

    fn create_shader_module(
        &mut self,
        stage: ShaderStage,
        code: &[u8],
    ) -> Result<GpuShaderModule, GpuError>;
    fn destroy_shader_module(&mut self, module: GpuShaderModule) -> Result<(), GpuError>;

    /// Copy `bytes` into `destination`.
    fn upload(&mut self, bytes: &[u8], destination: UploadTarget) -> Result<(), GpuError>;

    /// Move an image from layout `old` to layout `new`.
    fn transition(
        &mut self,
        image: GpuImage,
        old: ImageLayout,
        new: ImageLayout,
    ) -> Result<(), GpuError>;

    /// Execute `commands` and return once the device has finished them.
    fn submit_and_wait(&mut self, commands: &[GpuCommand]) -> Result<(), GpuError>;
}

#[derive(Debug, Clone, PartialEq)]
enum DeviceObject {
    Image { size: u64, layout: ImageLayout },
    Buffer { size: u64, usage: BufferUsage },
    ShaderModule { stage: ShaderStage },
}

impl DeviceObject {
    fn bytes(&self) -> u64 {
        match self {
            DeviceObject::Image { size, .. } | DeviceObject::Buffer { size, .. } => *size,
            DeviceObject::ShaderModule { .. } => 0,
        }
    }
}

/// Counters kept by `HeadlessBackend`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    pub uploads: u64,
    pub uploaded_bytes: u64,
    pub transitions: u64,
    pub submissions: u64,
    pub draws: u64,
}

/// In-memory device. Object ids are never reused.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    objects: HashMap<u64, DeviceObject>,
    next_id: u64,
    memory_budget: Option<u64>,
    stats: DeviceStats,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail allocations once image and buffer memory would exceed `bytes`.
    pub fn with_memory_budget(bytes: u64) -> Self {
        Self {
            memory_budget: Some(bytes),
            ..Self::default()
        }
    }

    /// Number of device objects not yet destroyed.
    pub fn live_objects(&self) -> usize {
        self.objects.len()
    }

    pub fn allocated_bytes(&self) -> u64 {
        self.objects.values().map(DeviceObject::bytes).sum()
    }

    pub fn stats(&self) -> DeviceStats {
        self.stats
    }

    pub fn image_layout(&self, image: GpuImage) -> Option<ImageLayout> {
        match self.objects.get(&image.0) {
            Some(DeviceObject::Image { layout, .. }) => Some(*layout),
            _ => None,
        }
    }

    pub fn buffer_usage(&self, buffer: GpuBuffer) -> Option<BufferUsage> {
        match self.objects.get(&buffer.0) {
            Some(DeviceObject::Buffer { usage, .. }) => Some(*usage),
            _ => None,
        }
    }

    pub fn shader_stage(&self, module: GpuShaderModule) -> Option<ShaderStage> {
        match self.objects.get(&module.0) {
            Some(DeviceObject::ShaderModule { stage }) => Some(*stage),
            _ => None,
        }
    }

    fn allocate(&mut self, object: DeviceObject) -> Result<u64, GpuError> {
        if let Some(budget) = self.memory_budget {
            let used = self.allocated_bytes();
            let requested = object.bytes();
            if used + requested > budget {
                return Err(GpuError::OutOfMemory {
                    requested,
                    available: budget - used,
                });
            }
        }
        self.next_id += 1;
        let id = self.next_id;
        self.objects.insert(id, object);
        Ok(id)
    }

    fn free(&mut self, id: u64) -> Result<(), GpuError> {
        self.objects
            .remove(&id)
            .map(|_| ())
            .ok_or(GpuError::UnknownObject(id))
    }

    fn expect_buffer(&self, buffer: GpuBuffer) -> Result<u64, GpuError> {
        match self.objects.get(&buffer.0) {
            Some(DeviceObject::Buffer { size, .. }) => Ok(*size),
            _ => Err(GpuError::UnknownObject(buffer.0)),
        }
    }

    fn expect_module(&self, module: GpuShaderModule) -> Result<(), GpuError> {
        match self.objects.get(&module.0) {
            Some(DeviceObject::ShaderModule { .. }) => Ok(()),
            _ => Err(GpuError::UnknownObject(module.0)),
        }
    }
}

impl GpuBackend for HeadlessBackend {
    fn create_image(&mut self, desc: &ImageDesc) -> Result<GpuImage, GpuError> {
        self.allocate(DeviceObject::Image {
            size: desc.byte_len() as u64,
            layout: ImageLayout::Undefined,
        })
        .map(GpuImage)
    }

    fn destroy_image(&mut self, image: GpuImage) -> Result<(), GpuError> {
        self.free(image.0)
    }

    fn create_buffer(&mut self, size: u64, usage: BufferUsage) -> Result<GpuBuffer, GpuError> {
        self.allocate(DeviceObject::Buffer { size, usage })
            .map(GpuBuffer)
    }

    fn destroy_buffer(&mut self, buffer: GpuBuffer) -> Result<(), GpuError> {
        self.free(buffer.0)
    }

    fn create_shader_module(
        &mut self,
        stage: ShaderStage,
        _code: &[u8],
    ) -> Result<GpuShaderModule, GpuError> {
        self.allocate(DeviceObject::ShaderModule { stage })
            .map(GpuShaderModule)
    }

    fn destroy_shader_module(&mut self, module: GpuShaderModule) -> Result<(), GpuError> {
        self.free(module.0)
    }

    fn upload(&mut self, bytes: &[u8], destination: UploadTarget) -> Result<(), GpuError> {
        let len = bytes.len() as u64;
        let (offset, capacity) = match destination {
            UploadTarget::Image(image) => match self.objects.get(&image.0) {
                Some(DeviceObject::Image { size, layout }) => {
                    if *layout != ImageLayout::TransferDst {
                        return Err(GpuError::LayoutMismatch {
                            expected: ImageLayout::TransferDst,
                            actual: *layout,
                        });
                    }
                    (0, *size)
                }
                _ => return Err(GpuError::UnknownObject(image.0)),
            },
            UploadTarget::Buffer { buffer, offset } => (offset, self.expect_buffer(buffer)?),
        };
        if offset + len > capacity {
            return Err(GpuError::UploadOutOfBounds {
                offset,
                len,
                capacity,
            });
        }
        self.stats.uploads += 1;
        self.stats.uploaded_bytes += len;
        Ok(())
    }

    fn transition(
        &mut self,
        image: GpuImage,
        old: ImageLayout,
        new: ImageLayout,
    ) -> Result<(), GpuError> {
        match self.objects.get_mut(&image.0) {
            Some(DeviceObject::Image { layout, .. }) => {
                if *layout != old {
                    return Err(GpuError::LayoutMismatch {
                        expected: old,
                        actual: *layout,
                    });
                }
                *layout = new;
                self.stats.transitions += 1;
                Ok(())
            }
            _ => Err(GpuError::UnknownObject(image.0)),
        }
    }

    fn submit_and_wait(&mut self, commands: &[GpuCommand]) -> Result<(), GpuError> {
        for command in commands {
            match command {
                GpuCommand::Draw(draw) => {
                    self.expect_buffer(draw.vertex_buffer)?;
                    self.expect_buffer(draw.index_buffer)?;
                    self.expect_module(draw.vertex_shader)?;
                    self.expect_module(draw.fragment_shader)?;
                    if let Some(texture) = draw.texture {
                        match self.image_layout(texture) {
                            Some(ImageLayout::ShaderRead) => {}
                            Some(actual) => {
                                return Err(GpuError::LayoutMismatch {
                                    expected: ImageLayout::ShaderRead,
                                    actual,
                                })
                            }
                            None => return Err(GpuError::UnknownObject(texture.0)),
                        }
                    }
                }
            }
        }
        self.stats.submissions += 1;
        self.stats.draws += commands.len() as u64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::image::ImageFormat;

    fn desc() -> ImageDesc {
        ImageDesc {
            width: 2,
            height: 2,
            format: ImageFormat::Rgba8Unorm,
        }
    }

    #[test]
    fn objects_are_tracked_until_destroyed() {
        let mut gpu = HeadlessBackend::new();
        let img = gpu.create_image(&desc()).unwrap();
        let buf = gpu.create_buffer(64, BufferUsage::Vertex).unwrap();
        assert_eq!(gpu.live_objects(), 2);
        assert_eq!(gpu.allocated_bytes(), 16 + 64);
        gpu.destroy_image(img).unwrap();
        gpu.destroy_buffer(buf).unwrap();
        assert_eq!(gpu.live_objects(), 0);
        assert_eq!(gpu.destroy_buffer(buf), Err(GpuError::UnknownObject(buf.0)));
    }

    #[test]
    fn transition_checks_current_layout() {
        let mut gpu = HeadlessBackend::new();
        let img = gpu.create_image(&desc()).unwrap();
        assert_eq!(
            gpu.transition(img, ImageLayout::TransferDst, ImageLayout::ShaderRead),
            Err(GpuError::LayoutMismatch {
                expected: ImageLayout::TransferDst,
                actual: ImageLayout::Undefined,
            })
        );
        gpu.transition(img, ImageLayout::Undefined, ImageLayout::TransferDst)
            .unwrap();
        assert_eq!(gpu.image_layout(img), Some(ImageLayout::TransferDst));
    }

    #[test]
    fn upload_is_bounds_checked() {
        let mut gpu = HeadlessBackend::new();
        let buf = gpu.create_buffer(8, BufferUsage::Uniform).unwrap();
        gpu.upload(&[0; 4], UploadTarget::Buffer { buffer: buf, offset: 4 })
            .unwrap();
        assert_eq!(
            gpu.upload(&[0; 4], UploadTarget::Buffer { buffer: buf, offset: 6 }),
            Err(GpuError::UploadOutOfBounds {
                offset: 6,
                len: 4,
                capacity: 8
            })
        );

        let img = gpu.create_image(&desc()).unwrap();
        assert!(matches!(
            gpu.upload(&[0; 16], UploadTarget::Image(img)),
            Err(GpuError::LayoutMismatch { .. })
        ));
        assert_eq!(gpu.stats().uploads, 1);
    }

    #[test]
    fn memory_budget_limits_allocations() {
        let mut gpu = HeadlessBackend::with_memory_budget(100);
        let a = gpu.create_buffer(60, BufferUsage::Storage).unwrap();
        assert_eq!(
            gpu.create_buffer(60, BufferUsage::Storage),
            Err(GpuError::OutOfMemory {
                requested: 60,
                available: 40
            })
        );
        gpu.destroy_buffer(a).unwrap();
        assert!(gpu.create_buffer(60, BufferUsage::Storage).is_ok());
    }
}
