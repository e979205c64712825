//! GPU texture resource.

use std::sync::Arc;

use crate::backend::GpuTexture;
use crate::device::GraphicsDevice;
use crate::types::{SampleDescription, TextureDescriptor, TextureFormat};

/// A GPU texture resource.
///
/// Textures are created by [`GraphicsDevice::create_texture`] and are reference-counted.
/// They hold a strong reference to their parent device, keeping it alive.
///
/// # Example
///
/// ```ignore
/// let texture = device.create_texture(&TextureDescriptor::new_2d(
///     1920, 1080,
///     TextureFormat::Rgba8Unorm,
///     TextureUsage::TARGET,
/// ))?;
/// println!("Texture size: {}x{}", texture.width(), texture.height());
/// ```
pub struct Texture {
    device: Arc<GraphicsDevice>,
    descriptor: TextureDescriptor,
    gpu: GpuTexture,
}

impl Texture {
    /// Create a new texture (called by GraphicsDevice).
    pub(crate) fn new(
        device: Arc<GraphicsDevice>,
        descriptor: TextureDescriptor,
        gpu: GpuTexture,
    ) -> Self {
        Self {
            device,
            descriptor,
            gpu,
        }
    }

    /// Get the parent device.
    pub fn device(&self) -> &Arc<GraphicsDevice> {
        &self.device
    }

    /// Get the texture descriptor.
    pub fn descriptor(&self) -> &TextureDescriptor {
        &self.descriptor
    }

    /// Get the backend handle (internal use only).
    pub(crate) fn gpu_handle(&self) -> &GpuTexture {
        &self.gpu
    }

    /// Get the texture width.
    pub fn width(&self) -> u32 {
        self.descriptor.width
    }

    /// Get the texture height.
    pub fn height(&self) -> u32 {
        self.descriptor.height
    }

    /// Get the texture size as `(width, height)`.
    pub fn size(&self) -> (u32, u32) {
        (self.descriptor.width, self.descriptor.height)
    }

    /// Get the texture format.
    pub fn format(&self) -> TextureFormat {
        self.descriptor.format
    }

    /// Get the sample count.
    pub fn sample_count(&self) -> u32 {
        self.descriptor.sample_count
    }

    /// Whether the texture is multisampled.
    pub fn is_multisampled(&self) -> bool {
        self.descriptor.sample_count > 1
    }

    /// Whether the texture matches the given size, format and samples.
    pub fn matches(
        &self,
        width: u32,
        height: u32,
        format: TextureFormat,
        sample: SampleDescription,
    ) -> bool {
        self.descriptor.width == width
            && self.descriptor.height == height
            && self.descriptor.format == format
            && self.descriptor.sample_count == sample.count
    }

    /// Get the texture label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("width", &self.descriptor.width)
            .field("height", &self.descriptor.height)
            .field("format", &self.descriptor.format)
            .field("samples", &self.descriptor.sample_count)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

// Ensure Texture is Send + Sync
static_assertions::assert_impl_all!(Texture: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceParameters;
    use crate::types::TextureUsage;

    fn create_test_device() -> Arc<GraphicsDevice> {
        GraphicsDevice::new(&DeviceParameters::dummy()).unwrap()
    }

    #[test]
    fn test_texture_debug() {
        let device = create_test_device();
        let texture = device
            .create_texture(
                &TextureDescriptor::new_2d(
                    1920,
                    1080,
                    TextureFormat::Rgba8Unorm,
                    TextureUsage::RENDER_ATTACHMENT,
                )
                .with_label("scene"),
            )
            .unwrap();
        let debug = format!("{:?}", texture);
        assert!(debug.contains("Texture"));
        assert!(debug.contains("1920"));
        assert_eq!(texture.label(), Some("scene"));
    }

    #[test]
    fn test_texture_matches() {
        let device = create_test_device();
        let texture = device
            .create_texture(
                &TextureDescriptor::new_2d(
                    800,
                    600,
                    TextureFormat::Rgba8Unorm,
                    TextureUsage::RENDER_ATTACHMENT,
                )
                .with_sample_count(4),
            )
            .unwrap();
        assert!(texture.is_multisampled());
        assert!(texture.matches(
            800,
            600,
            TextureFormat::Rgba8Unorm,
            SampleDescription::new(4, 0)
        ));
        assert!(!texture.matches(
            800,
            600,
            TextureFormat::Rgba32Float,
            SampleDescription::new(4, 0)
        ));
        assert_eq!(texture.size(), (800, 600));
    }
}
