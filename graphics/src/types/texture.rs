//! Texture types and descriptors.

use bitflags::bitflags;

/// Texture format enumeration.
///
/// Only the formats the renderer core actually allocates are listed: color
/// targets for the live surface and for captures, and the two depth formats
/// selected by feature level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    /// 8-bit RGBA channels, unsigned normalized.
    #[default]
    Rgba8Unorm,
    /// 8-bit BGRA channels, unsigned normalized. Used for host compositing.
    Bgra8Unorm,
    /// 32-bit RGBA channels, float. Used for HDR captures.
    Rgba32Float,
    /// 16-bit depth.
    Depth16Unorm,
    /// 32-bit depth, float.
    Depth32Float,
}

impl TextureFormat {
    /// Returns true if this is a depth format.
    pub fn is_depth(&self) -> bool {
        matches!(self, Self::Depth16Unorm | Self::Depth32Float)
    }

    /// Returns true if this format stores color values above 1.0.
    pub fn is_hdr(&self) -> bool {
        matches!(self, Self::Rgba32Float)
    }

    /// Returns the size in bytes per pixel.
    pub fn block_size(&self) -> u32 {
        match self {
            Self::Depth16Unorm => 2,
            Self::Rgba8Unorm | Self::Bgra8Unorm | Self::Depth32Float => 4,
            Self::Rgba32Float => 16,
        }
    }
}

bitflags! {
    /// Usage flags for textures.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Texture can be copied from.
        const COPY_SRC = 1 << 0;
        /// Texture can be copied to.
        const COPY_DST = 1 << 1;
        /// Texture can be sampled in a shader.
        const TEXTURE_BINDING = 1 << 2;
        /// Texture can be used as a render attachment.
        const RENDER_ATTACHMENT = 1 << 3;
    }
}

impl TextureUsage {
    /// Usage of every color target the renderer draws into and reads back.
    pub const TARGET: Self = Self::COPY_SRC
        .union(Self::COPY_DST)
        .union(Self::TEXTURE_BINDING)
        .union(Self::RENDER_ATTACHMENT);
}

impl Default for TextureUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Descriptor for creating a 2D texture.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    /// Debug label for the texture.
    pub label: Option<String>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Sample count for multisampling.
    pub sample_count: u32,
    /// Texture format.
    pub format: TextureFormat,
    /// Usage flags.
    pub usage: TextureUsage,
}

impl TextureDescriptor {
    /// Create a new 2D texture descriptor.
    pub fn new_2d(width: u32, height: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        Self {
            label: None,
            width,
            height,
            sample_count: 1,
            format,
            usage,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the sample count for multisampling.
    pub fn with_sample_count(mut self, count: u32) -> Self {
        self.sample_count = count;
        self
    }

    /// Size in bytes of a tightly packed copy of the texture.
    pub fn packed_size(&self) -> usize {
        self.width as usize * self.height as usize * self.format.block_size() as usize
    }
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            width: 0,
            height: 0,
            sample_count: 1,
            format: TextureFormat::default(),
            usage: TextureUsage::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_sizes() {
        assert_eq!(TextureFormat::Rgba8Unorm.block_size(), 4);
        assert_eq!(TextureFormat::Rgba32Float.block_size(), 16);
        assert_eq!(TextureFormat::Depth16Unorm.block_size(), 2);
    }

    #[test]
    fn test_packed_size() {
        let desc = TextureDescriptor::new_2d(3, 2, TextureFormat::Rgba32Float, TextureUsage::TARGET);
        assert_eq!(desc.packed_size(), 96);
    }

    #[test]
    fn test_format_classes() {
        assert!(TextureFormat::Depth32Float.is_depth());
        assert!(!TextureFormat::Bgra8Unorm.is_depth());
        assert!(TextureFormat::Rgba32Float.is_hdr());
        assert!(!TextureFormat::Rgba8Unorm.is_hdr());
    }
}
