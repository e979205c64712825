//! Buffer descriptors.
//!
//! The renderer only creates small static buffers (the shared quad and
//! per-effect constants), so usage is limited to what those need.

use bitflags::bitflags;

bitflags! {
    /// How a buffer is bound.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BufferUsage: u32 {
        const VERTEX = 1 << 0;
        const INDEX = 1 << 1;
        /// Effect constants.
        const UNIFORM = 1 << 2;
        /// Contents are uploaded after creation.
        const COPY_DST = 1 << 3;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BufferDescriptor {
    pub label: Option<String>,
    /// Size in bytes.
    pub size: u64,
    pub usage: BufferUsage,
}

impl BufferDescriptor {
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self {
            label: None,
            size,
            usage,
        }
    }

    /// A buffer sized for `contents` that accepts uploads.
    pub fn for_contents(contents: &[u8], usage: BufferUsage) -> Self {
        Self::new(contents.len() as u64, usage | BufferUsage::COPY_DST)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_contents_allows_upload() {
        let descriptor = BufferDescriptor::for_contents(&[0u8; 12], BufferUsage::INDEX);
        assert_eq!(descriptor.size, 12);
        assert!(descriptor.usage.contains(BufferUsage::INDEX | BufferUsage::COPY_DST));
        assert!(descriptor.label.is_none());
    }
}
