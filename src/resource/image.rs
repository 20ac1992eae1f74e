//! Images: device textures with a tracked layout.

use crate::gpu::{GpuImage, ImageLayout};
use crate::resource::{Resource, ResourceKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    R8Unorm,
    Rgba8Unorm,
    Bgra8Unorm,
    Rgba16Float,
    Rgba32Float,
    Depth32Float,
}

impl ImageFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            ImageFormat::R8Unorm => 1,
            ImageFormat::Rgba8Unorm | ImageFormat::Bgra8Unorm | ImageFormat::Depth32Float => 4,
            ImageFormat::Rgba16Float => 8,
            ImageFormat::Rgba32Float => 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDesc {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

impl ImageDesc {
    /// Size of one tightly packed level of pixel data.
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

#[derive(Debug)]
pub struct Image {
    pub desc: ImageDesc,
    pub(crate) gpu: GpuImage,
    pub(crate) layout: ImageLayout,
}

impl Image {
    pub fn gpu(&self) -> GpuImage {
        self.gpu
    }

    pub fn layout(&self) -> ImageLayout {
        self.layout
    }
}

impl Resource for Image {
    const KIND: ResourceKind = ResourceKind::Image;
}
