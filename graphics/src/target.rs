//! Resizable render targets.

use std::sync::Arc;

use crate::device::GraphicsDevice;
use crate::error::RenderResult;
use crate::resources::Texture;
use crate::types::{SampleDescription, TextureDescriptor, TextureFormat, TextureUsage};

/// A render target of fixed format that is reallocated only when its size
/// or sample description changes.
#[derive(Debug)]
pub struct TargetTexture {
    format: TextureFormat,
    label: &'static str,
    texture: Option<Arc<Texture>>,
}

impl TargetTexture {
    pub fn new(format: TextureFormat, label: &'static str) -> Self {
        Self {
            format,
            label,
            texture: None,
        }
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// The current texture, if allocated.
    pub fn texture(&self) -> Option<&Arc<Texture>> {
        self.texture.as_ref()
    }

    /// Make sure the texture has the given size and samples.
    pub fn resize(
        &mut self,
        device: &Arc<GraphicsDevice>,
        width: u32,
        height: u32,
        sample: SampleDescription,
    ) -> RenderResult<Arc<Texture>> {
        if let Some(texture) = &self.texture
            && texture.matches(width, height, self.format, sample)
        {
            return Ok(texture.clone());
        }

        self.texture = None;
        let texture = device.create_texture(
            &TextureDescriptor::new_2d(width, height, self.format, TextureUsage::TARGET)
                .with_sample_count(sample.count)
                .with_label(self.label),
        )?;
        log::debug!(
            "Allocated {} {}x{} {:?} (x{})",
            self.label,
            width,
            height,
            self.format,
            sample.count
        );
        self.texture = Some(texture.clone());
        Ok(texture)
    }

    /// Release the texture.
    pub fn release(&mut self) {
        self.texture = None;
    }
}

/// Keep `slot` in `format`, replacing it when the format differs.
pub(crate) fn ensure_format<'a>(
    slot: &'a mut Option<TargetTexture>,
    format: TextureFormat,
    label: &'static str,
) -> &'a mut TargetTexture {
    if slot.as_ref().is_some_and(|target| target.format() != format) {
        *slot = None;
    }
    slot.get_or_insert_with(|| TargetTexture::new(format, label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceParameters;

    fn create_test_device() -> Arc<GraphicsDevice> {
        GraphicsDevice::new(&DeviceParameters::dummy()).unwrap()
    }

    #[test]
    fn test_resize_reuses_matching_texture() {
        let device = create_test_device();
        let mut target = TargetTexture::new(TextureFormat::Rgba8Unorm, "test");
        let a = target.resize(&device, 32, 32, SampleDescription::SINGLE).unwrap();
        let b = target.resize(&device, 32, 32, SampleDescription::SINGLE).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        let c = target.resize(&device, 64, 32, SampleDescription::SINGLE).unwrap();
        assert_eq!(c.size(), (64, 32));
        assert_eq!(device.textures_created(), 2);
    }

    #[test]
    fn test_ensure_format_replaces_on_change() {
        let mut slot = None;
        ensure_format(&mut slot, TextureFormat::Rgba8Unorm, "shot");
        assert_eq!(slot.as_ref().map(TargetTexture::format), Some(TextureFormat::Rgba8Unorm));
        ensure_format(&mut slot, TextureFormat::Rgba32Float, "shot");
        assert_eq!(slot.as_ref().map(TargetTexture::format), Some(TextureFormat::Rgba32Float));
    }
}
