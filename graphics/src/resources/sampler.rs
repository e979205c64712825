use std::sync::{Arc, Weak};

use crate::backend::GpuSampler;
use crate::device::GraphicsDevice;
use crate::types::{AddressMode, FilterMode, SamplerDescriptor};

/// Sampler state shared through [`CommonStates`](crate::CommonStates).
pub struct Sampler {
    device: Weak<GraphicsDevice>,
    descriptor: SamplerDescriptor,
    // Backend object, released with the sampler.
    _gpu: GpuSampler,
}

impl Sampler {
    pub(crate) fn new(
        device: Weak<GraphicsDevice>,
        descriptor: SamplerDescriptor,
        gpu: GpuSampler,
    ) -> Self {
        Self {
            device,
            descriptor,
            _gpu: gpu,
        }
    }

    pub fn device(&self) -> Option<Arc<GraphicsDevice>> {
        self.device.upgrade()
    }

    pub fn filter(&self) -> FilterMode {
        self.descriptor.filter
    }

    pub fn address_mode(&self) -> AddressMode {
        self.descriptor.address_mode
    }

    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Sampler")
            .field(&self.descriptor.label.as_deref().unwrap_or("unnamed"))
            .field(&self.descriptor.filter)
            .field(&self.descriptor.address_mode)
            .finish()
    }
}

static_assertions::assert_impl_all!(Sampler: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_sampler() {
        let sampler = Sampler::new(
            Weak::new(),
            SamplerDescriptor::nearest().with_label("point clamp"),
            GpuSampler::Dummy,
        );
        assert!(sampler.device().is_none());
        assert_eq!(sampler.filter(), FilterMode::Nearest);
        assert_eq!(format!("{sampler:?}"), "Sampler(\"point clamp\", Nearest, ClampToEdge)");
    }
}
