//! GPU backend abstraction layer.
//!
//! The renderer core talks to the GPU exclusively through [`GpuBackend`],
//! an enum with one variant per compiled-in backend. Resource handles follow
//! the same shape: one variant per backend, each cheap to clone.
//!
//! # Available Backends
//!
//! - `dummy` (always available): performs every operation on CPU memory, so
//!   tests can read back exact texel values without a GPU
//! - `wgpu-backend`: cross-platform backend using wgpu

pub mod dummy;

#[cfg(feature = "wgpu-backend")]
pub mod wgpu_impl;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::device::{AdapterInfo, BackendType, DeviceParameters, FeatureLevel};
use crate::error::{RenderError, RenderResult};
use crate::swapchain::{OutputHandle, SwapChainDescriptor};
use crate::types::{
    BufferDescriptor, Color, Rect, Region, SamplerDescriptor, TextureDescriptor, TextureFormat,
};

pub use dummy::DummyBackend;
#[cfg(feature = "wgpu-backend")]
pub use wgpu_impl::WgpuBackend;

/// Handle to a GPU texture resource.
#[derive(Debug, Clone)]
pub enum GpuTexture {
    /// Dummy backend texel store.
    Dummy(Arc<dummy::DummyTexture>),
    /// wgpu backend texture
    #[cfg(feature = "wgpu-backend")]
    Wgpu {
        texture: Arc<wgpu::Texture>,
        view: Arc<wgpu::TextureView>,
    },
}

/// Handle to a GPU buffer resource.
#[derive(Debug, Clone)]
pub enum GpuBuffer {
    /// Dummy backend byte store.
    Dummy(Arc<Mutex<Vec<u8>>>),
    /// wgpu backend buffer
    #[cfg(feature = "wgpu-backend")]
    Wgpu(Arc<wgpu::Buffer>),
}

/// Handle to a GPU sampler resource.
#[derive(Debug, Clone)]
pub enum GpuSampler {
    /// Dummy backend (no GPU allocation)
    Dummy,
    /// wgpu backend sampler
    #[cfg(feature = "wgpu-backend")]
    Wgpu(Arc<wgpu::Sampler>),
}

/// Handle to a presentation chain bound to an output window.
#[derive(Debug, Clone)]
pub enum GpuSwapChain {
    /// Dummy backend presentation counter.
    Dummy(Arc<dummy::DummySwapChain>),
    /// wgpu backend surface
    #[cfg(feature = "wgpu-backend")]
    Wgpu(Arc<wgpu_impl::WgpuSwapChain>),
}

impl GpuSwapChain {
    /// Format of the presentable images.
    pub fn format(&self) -> TextureFormat {
        match self {
            Self::Dummy(swap_chain) => swap_chain.format(),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(swap_chain) => swap_chain.format(),
        }
    }
}

/// The GPU backend a device was created on.
#[derive(Debug)]
pub enum GpuBackend {
    /// CPU emulation.
    Dummy(DummyBackend),
    /// wgpu backend
    #[cfg(feature = "wgpu-backend")]
    Wgpu(WgpuBackend),
}

#[cfg_attr(not(feature = "wgpu-backend"), allow(unused_variables))]
impl GpuBackend {
    /// Create the backend requested by `params`.
    ///
    /// [`BackendType::Auto`] tries wgpu first and falls back to the dummy
    /// backend when no adapter is available.
    pub fn create(params: &DeviceParameters) -> RenderResult<Self> {
        match params.backend {
            BackendType::Dummy => {
                log::info!("Using dummy backend");
                Ok(Self::Dummy(DummyBackend::new(params)))
            }
            #[cfg(feature = "wgpu-backend")]
            BackendType::Wgpu => Ok(Self::Wgpu(WgpuBackend::new(params)?)),
            #[cfg(not(feature = "wgpu-backend"))]
            BackendType::Wgpu => Err(RenderError::DeviceCreationFailed(
                "wgpu backend is not compiled in".to_string(),
            )),
            BackendType::Auto => {
                #[cfg(feature = "wgpu-backend")]
                {
                    match WgpuBackend::new(params) {
                        Ok(backend) => {
                            log::info!("Using wgpu backend");
                            return Ok(Self::Wgpu(backend));
                        }
                        Err(e) => {
                            log::warn!("Failed to create wgpu backend: {}", e);
                        }
                    }
                }

                log::info!("Using dummy backend");
                Ok(Self::Dummy(DummyBackend::new(params)))
            }
        }
    }

    /// Get the backend name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dummy(backend) => backend.name(),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(backend) => backend.name(),
        }
    }

    /// Information about the adapter behind this backend.
    pub fn adapter_info(&self) -> AdapterInfo {
        match self {
            Self::Dummy(backend) => backend.adapter_info(),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(backend) => backend.adapter_info(),
        }
    }

    /// Capability tier of the device.
    pub fn feature_level(&self) -> FeatureLevel {
        match self {
            Self::Dummy(backend) => backend.feature_level(),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(backend) => backend.feature_level(),
        }
    }

    /// Whether render targets of `format` can use `count` samples per pixel.
    pub fn supports_sample_count(&self, format: TextureFormat, count: u32) -> bool {
        match self {
            Self::Dummy(backend) => backend.supports_sample_count(format, count),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(backend) => backend.supports_sample_count(format, count),
        }
    }

    pub fn create_texture(&self, descriptor: &TextureDescriptor) -> RenderResult<GpuTexture> {
        match self {
            Self::Dummy(backend) => backend.create_texture(descriptor),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(backend) => backend.create_texture(descriptor),
        }
    }

    pub fn create_buffer(&self, descriptor: &BufferDescriptor) -> RenderResult<GpuBuffer> {
        match self {
            Self::Dummy(backend) => backend.create_buffer(descriptor),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(backend) => backend.create_buffer(descriptor),
        }
    }

    pub fn create_sampler(&self, descriptor: &SamplerDescriptor) -> RenderResult<GpuSampler> {
        match self {
            Self::Dummy(backend) => backend.create_sampler(descriptor),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(backend) => backend.create_sampler(descriptor),
        }
    }

    /// Upload data to a buffer at `offset`.
    pub fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) -> RenderResult<()> {
        match self {
            Self::Dummy(backend) => backend.write_buffer(buffer, offset, data),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(backend) => backend.write_buffer(buffer, offset, data),
        }
    }

    /// Upload tightly packed texel data covering the whole texture.
    pub fn write_texture(
        &self,
        texture: &GpuTexture,
        descriptor: &TextureDescriptor,
        data: &[u8],
    ) -> RenderResult<()> {
        if data.len() != descriptor.packed_size() {
            return Err(RenderError::InvalidParameter(format!(
                "texture upload of {} bytes, expected {}",
                data.len(),
                descriptor.packed_size()
            )));
        }
        match self {
            Self::Dummy(backend) => backend.write_texture(texture, data),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(backend) => backend.write_texture(texture, descriptor, data),
        }
    }

    /// Read the whole texture back as tightly packed texel data.
    ///
    /// This is a blocking operation that waits for the GPU to finish.
    pub fn read_texture(
        &self,
        texture: &GpuTexture,
        descriptor: &TextureDescriptor,
    ) -> RenderResult<Vec<u8>> {
        if descriptor.sample_count > 1 {
            return Err(RenderError::Readback(
                "multisampled textures must be resolved before readback".to_string(),
            ));
        }
        match self {
            Self::Dummy(backend) => backend.read_texture(texture),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(backend) => backend.read_texture(texture, descriptor),
        }
    }

    pub fn clear_color(
        &self,
        target: &GpuTexture,
        descriptor: &TextureDescriptor,
        color: Color,
    ) -> RenderResult<()> {
        match self {
            Self::Dummy(backend) => backend.clear(target, color.to_array()),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(backend) => backend.clear_color(target, descriptor, color),
        }
    }

    pub fn clear_depth(
        &self,
        target: &GpuTexture,
        descriptor: &TextureDescriptor,
        depth: f32,
    ) -> RenderResult<()> {
        match self {
            Self::Dummy(backend) => backend.clear(target, [depth, 0.0, 0.0, 0.0]),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(backend) => backend.clear_depth(target, descriptor, depth),
        }
    }

    /// Fill `rect` of a color target with a solid color.
    pub fn fill_rect(
        &self,
        target: &GpuTexture,
        descriptor: &TextureDescriptor,
        rect: Rect,
        color: Color,
    ) -> RenderResult<()> {
        let Some(rect) = rect.clipped(descriptor.width, descriptor.height) else {
            return Ok(());
        };
        match self {
            Self::Dummy(backend) => backend.fill_rect(target, rect, color),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(backend) => backend.fill_rect(target, descriptor, rect, color),
        }
    }

    /// Resolve a multisampled texture into a single-sampled one of the same
    /// size and format.
    pub fn resolve(
        &self,
        source: &GpuTexture,
        source_desc: &TextureDescriptor,
        destination: &GpuTexture,
        destination_desc: &TextureDescriptor,
    ) -> RenderResult<()> {
        if source_desc.width != destination_desc.width
            || source_desc.height != destination_desc.height
            || source_desc.format != destination_desc.format
            || destination_desc.sample_count != 1
        {
            return Err(RenderError::InvalidParameter(format!(
                "cannot resolve {}x{} {:?} into {}x{} {:?} (x{})",
                source_desc.width,
                source_desc.height,
                source_desc.format,
                destination_desc.width,
                destination_desc.height,
                destination_desc.format,
                destination_desc.sample_count
            )));
        }
        match self {
            Self::Dummy(backend) => backend.copy(source, destination),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(backend) => backend.resolve(source, destination, destination_desc),
        }
    }

    /// Box-filter `region` of `source` into the whole of `destination`.
    pub fn blit(
        &self,
        source: &GpuTexture,
        source_desc: &TextureDescriptor,
        region: Region,
        destination: &GpuTexture,
        destination_desc: &TextureDescriptor,
    ) -> RenderResult<()> {
        if source_desc.sample_count != 1 {
            return Err(RenderError::InvalidParameter(
                "blit source must be single-sampled".to_string(),
            ));
        }
        match self {
            Self::Dummy(backend) => backend.blit(source, region, destination),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(backend) => {
                backend.blit(source, source_desc, region, destination, destination_desc)
            }
        }
    }

    /// Submit outstanding work and wait for it.
    pub fn flush(&self) {
        match self {
            Self::Dummy(_) => {}
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(backend) => backend.flush(),
        }
    }

    pub fn create_swap_chain(
        &self,
        output: &OutputHandle,
        descriptor: &SwapChainDescriptor,
        width: u32,
        height: u32,
    ) -> RenderResult<GpuSwapChain> {
        match self {
            Self::Dummy(backend) => backend.create_swap_chain(descriptor, width, height),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(backend) => backend.create_swap_chain(output, descriptor, width, height),
        }
    }

    pub fn resize_swap_chain(
        &self,
        swap_chain: &GpuSwapChain,
        width: u32,
        height: u32,
    ) -> RenderResult<()> {
        match self {
            Self::Dummy(backend) => backend.resize_swap_chain(swap_chain, width, height),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(backend) => backend.resize_swap_chain(swap_chain, width, height),
        }
    }

    /// Show `back_buffer` on the swap chain's output.
    pub fn present(
        &self,
        swap_chain: &GpuSwapChain,
        back_buffer: &GpuTexture,
        back_buffer_desc: &TextureDescriptor,
        vsync: bool,
    ) -> RenderResult<()> {
        match self {
            Self::Dummy(backend) => backend.present(swap_chain),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(backend) => backend.present(swap_chain, back_buffer, back_buffer_desc, vsync),
        }
    }
}

/// Check if a real GPU backend is compiled in.
pub fn has_gpu_backend() -> bool {
    cfg!(feature = "wgpu-backend")
}
