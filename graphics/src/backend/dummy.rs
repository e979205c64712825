//! Dummy GPU backend for testing and development.
//!
//! This backend keeps every texture as a CPU texel array and performs clears,
//! fills, resolves and blits on it directly. It needs no GPU hardware, yet the
//! output of the renderer can be read back and checked texel by texel.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::device::{AdapterInfo, DeviceParameters, FeatureLevel};
use crate::error::{RenderError, RenderResult};
use crate::swapchain::SwapChainDescriptor;
use crate::types::{
    BufferDescriptor, Color, Rect, Region, SamplerDescriptor, TextureDescriptor, TextureFormat,
};

use super::{GpuBuffer, GpuSampler, GpuSwapChain, GpuTexture};

/// Maximum source texels read per axis for one destination texel of a blit.
pub(crate) const MAX_TAPS: u32 = 8;

/// A texture living in CPU memory.
///
/// Multisampled textures keep one value per pixel: every sample of a pixel
/// always holds the same color, so resolving is a plain copy.
#[derive(Debug)]
pub struct DummyTexture {
    width: u32,
    height: u32,
    format: TextureFormat,
    texels: Mutex<Vec<[f32; 4]>>,
}

impl DummyTexture {
    fn new(descriptor: &TextureDescriptor) -> Self {
        let count = descriptor.width as usize * descriptor.height as usize;
        Self {
            width: descriptor.width,
            height: descriptor.height,
            format: descriptor.format,
            texels: Mutex::new(vec![[0.0; 4]; count]),
        }
    }

    /// Copy of the texel values as linear floats.
    pub fn texels(&self) -> Vec<[f32; 4]> {
        self.texels.lock().clone()
    }
}

/// A swap chain that only counts presentations.
#[derive(Debug)]
pub struct DummySwapChain {
    format: TextureFormat,
    width: AtomicU32,
    height: AtomicU32,
    presents: AtomicU64,
}

impl DummySwapChain {
    /// Format of the presentable images.
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Current buffer size.
    pub fn size(&self) -> (u32, u32) {
        (
            self.width.load(Ordering::Relaxed),
            self.height.load(Ordering::Relaxed),
        )
    }

    /// Number of frames presented so far.
    pub fn present_count(&self) -> u64 {
        self.presents.load(Ordering::Relaxed)
    }
}

/// Dummy GPU backend.
#[derive(Debug)]
pub struct DummyBackend {
    feature_level: FeatureLevel,
    max_sample_count: u32,
}

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new(params: &DeviceParameters) -> Self {
        Self {
            feature_level: params.dummy_feature_level,
            max_sample_count: params.dummy_max_sample_count,
        }
    }

    /// Get the backend name.
    pub fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    pub fn adapter_info(&self) -> AdapterInfo {
        AdapterInfo {
            name: "Dummy Adapter".to_string(),
            backend: "dummy".to_string(),
            dedicated_video_memory: None,
        }
    }

    pub fn feature_level(&self) -> FeatureLevel {
        self.feature_level
    }

    pub fn supports_sample_count(&self, format: TextureFormat, count: u32) -> bool {
        if count == 1 {
            return true;
        }
        count.is_power_of_two()
            && count <= self.max_sample_count
            && (format != TextureFormat::Rgba32Float || count <= 4)
    }

    pub fn create_texture(&self, descriptor: &TextureDescriptor) -> RenderResult<GpuTexture> {
        log::trace!(
            "DummyBackend: creating texture {:?} ({}x{}, x{})",
            descriptor.label,
            descriptor.width,
            descriptor.height,
            descriptor.sample_count
        );
        Ok(GpuTexture::Dummy(Arc::new(DummyTexture::new(descriptor))))
    }

    pub fn create_buffer(&self, descriptor: &BufferDescriptor) -> RenderResult<GpuBuffer> {
        log::trace!(
            "DummyBackend: creating buffer {:?} (size: {})",
            descriptor.label,
            descriptor.size
        );
        Ok(GpuBuffer::Dummy(Arc::new(Mutex::new(vec![
            0;
            descriptor.size as usize
        ]))))
    }

    pub fn create_sampler(&self, descriptor: &SamplerDescriptor) -> RenderResult<GpuSampler> {
        log::trace!("DummyBackend: creating sampler {:?}", descriptor.label);
        Ok(GpuSampler::Dummy)
    }

    pub fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) -> RenderResult<()> {
        let GpuBuffer::Dummy(bytes) = buffer else {
            return Err(mismatch("buffer"));
        };
        let mut bytes = bytes.lock();
        let start = offset as usize;
        let end = start + data.len();
        if end > bytes.len() {
            return Err(RenderError::InvalidParameter(format!(
                "write of {} bytes at {offset} overflows buffer of {}",
                data.len(),
                bytes.len()
            )));
        }
        bytes[start..end].copy_from_slice(data);
        Ok(())
    }

    pub fn write_texture(&self, texture: &GpuTexture, data: &[u8]) -> RenderResult<()> {
        let texture = dummy_texture(texture)?;
        *texture.texels.lock() = decode_texels(texture.format, data);
        Ok(())
    }

    pub fn read_texture(&self, texture: &GpuTexture) -> RenderResult<Vec<u8>> {
        let texture = dummy_texture(texture)?;
        let texels = texture.texels.lock();
        Ok(encode_texels(texture.format, &texels))
    }

    /// Set every texel to `value`.
    pub fn clear(&self, target: &GpuTexture, value: [f32; 4]) -> RenderResult<()> {
        let target = dummy_texture(target)?;
        target.texels.lock().fill(value);
        Ok(())
    }

    /// `rect` must already be clipped to the target.
    pub fn fill_rect(&self, target: &GpuTexture, rect: Rect, color: Color) -> RenderResult<()> {
        let target = dummy_texture(target)?;
        let mut texels = target.texels.lock();
        let value = color.to_array();
        for y in rect.y..rect.y + rect.height {
            let row = (y * target.width) as usize;
            texels[row + rect.x as usize..row + (rect.x + rect.width) as usize].fill(value);
        }
        Ok(())
    }

    /// Copy texels between textures of identical size.
    pub fn copy(&self, source: &GpuTexture, destination: &GpuTexture) -> RenderResult<()> {
        let source = dummy_texture(source)?;
        let destination = dummy_texture(destination)?;
        if Arc::ptr_eq(source, destination) {
            return Ok(());
        }
        let texels = source.texels.lock().clone();
        *destination.texels.lock() = texels;
        Ok(())
    }

    pub fn blit(
        &self,
        source: &GpuTexture,
        region: Region,
        destination: &GpuTexture,
    ) -> RenderResult<()> {
        let source = dummy_texture(source)?;
        let destination = dummy_texture(destination)?;
        let texels = source.texels.lock().clone();
        let filtered = box_filter(
            &texels,
            source.width,
            source.height,
            region,
            destination.width,
            destination.height,
        );
        *destination.texels.lock() = filtered;
        Ok(())
    }

    pub fn create_swap_chain(
        &self,
        descriptor: &SwapChainDescriptor,
        width: u32,
        height: u32,
    ) -> RenderResult<GpuSwapChain> {
        log::debug!(
            "DummyBackend: creating swap chain {}x{} ({} buffers, {:?})",
            width,
            height,
            descriptor.buffer_count,
            descriptor.format
        );
        Ok(GpuSwapChain::Dummy(Arc::new(DummySwapChain {
            format: descriptor.format,
            width: AtomicU32::new(width),
            height: AtomicU32::new(height),
            presents: AtomicU64::new(0),
        })))
    }

    pub fn resize_swap_chain(
        &self,
        swap_chain: &GpuSwapChain,
        width: u32,
        height: u32,
    ) -> RenderResult<()> {
        let swap_chain = dummy_swap_chain(swap_chain)?;
        swap_chain.width.store(width, Ordering::Relaxed);
        swap_chain.height.store(height, Ordering::Relaxed);
        Ok(())
    }

    pub fn present(&self, swap_chain: &GpuSwapChain) -> RenderResult<()> {
        let swap_chain = dummy_swap_chain(swap_chain)?;
        swap_chain.presents.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

fn mismatch(kind: &str) -> RenderError {
    RenderError::Backend(format!("dummy backend called with a foreign {kind} handle"))
}

fn dummy_texture(texture: &GpuTexture) -> RenderResult<&Arc<DummyTexture>> {
    match texture {
        GpuTexture::Dummy(texture) => Ok(texture),
        #[cfg(feature = "wgpu-backend")]
        _ => Err(mismatch("texture")),
    }
}

fn dummy_swap_chain(swap_chain: &GpuSwapChain) -> RenderResult<&Arc<DummySwapChain>> {
    match swap_chain {
        GpuSwapChain::Dummy(swap_chain) => Ok(swap_chain),
        #[cfg(feature = "wgpu-backend")]
        _ => Err(mismatch("swap chain")),
    }
}

/// Range of source texels `[first, last)` covered by one destination texel.
fn footprint(start: f32, scale: f32, limit: u32) -> (u32, u32) {
    let first = (start.floor().max(0.0) as u32).min(limit.saturating_sub(1));
    let end = (start + scale).ceil().max(0.0) as u32;
    let last = end.max(first + 1).min(limit).min(first + MAX_TAPS);
    (first, last.max(first + 1))
}

/// Average the source texels under each destination texel.
///
/// `region` selects the part of the source that maps onto the destination;
/// this is the same filter the wgpu blit shader evaluates.
pub(crate) fn box_filter(
    source: &[[f32; 4]],
    source_width: u32,
    source_height: u32,
    region: Region,
    width: u32,
    height: u32,
) -> Vec<[f32; 4]> {
    let scale_x = region.width / width as f32;
    let scale_y = region.height / height as f32;
    let mut output = Vec::with_capacity(width as usize * height as usize);

    for y in 0..height {
        let (y0, y1) = footprint(region.y + y as f32 * scale_y, scale_y, source_height);
        for x in 0..width {
            let (x0, x1) = footprint(region.x + x as f32 * scale_x, scale_x, source_width);
            let mut sum = [0.0f32; 4];
            for sy in y0..y1 {
                for sx in x0..x1 {
                    let texel = source[(sy * source_width + sx) as usize];
                    for (acc, value) in sum.iter_mut().zip(texel) {
                        *acc += value;
                    }
                }
            }
            let count = ((y1 - y0) * (x1 - x0)) as f32;
            output.push(sum.map(|channel| channel / count));
        }
    }

    output
}

fn unorm8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Pack linear texels into the byte layout of `format`.
pub(crate) fn encode_texels(format: TextureFormat, texels: &[[f32; 4]]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(texels.len() * format.block_size() as usize);
    for [r, g, b, a] in texels.iter().copied() {
        match format {
            TextureFormat::Rgba8Unorm => {
                bytes.extend_from_slice(&[unorm8(r), unorm8(g), unorm8(b), unorm8(a)])
            }
            TextureFormat::Bgra8Unorm => {
                bytes.extend_from_slice(&[unorm8(b), unorm8(g), unorm8(r), unorm8(a)])
            }
            TextureFormat::Rgba32Float => {
                bytes.extend_from_slice(bytemuck::cast_slice(&[r, g, b, a]))
            }
            TextureFormat::Depth16Unorm => {
                let depth = (r.clamp(0.0, 1.0) * 65535.0).round() as u16;
                bytes.extend_from_slice(&depth.to_le_bytes())
            }
            TextureFormat::Depth32Float => bytes.extend_from_slice(&r.to_le_bytes()),
        }
    }
    bytes
}

/// Unpack texels stored in the byte layout of `format`.
pub(crate) fn decode_texels(format: TextureFormat, data: &[u8]) -> Vec<[f32; 4]> {
    let channel = |byte: u8| byte as f32 / 255.0;
    data.chunks_exact(format.block_size() as usize)
        .map(|texel| match format {
            TextureFormat::Rgba8Unorm => texel_array(texel).map(channel),
            TextureFormat::Bgra8Unorm => {
                let [b, g, r, a] = texel_array(texel).map(channel);
                [r, g, b, a]
            }
            TextureFormat::Rgba32Float => {
                let mut value = [0.0f32; 4];
                for (out, chunk) in value.iter_mut().zip(texel.chunks_exact(4)) {
                    *out = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                }
                value
            }
            TextureFormat::Depth16Unorm => {
                let depth = u16::from_le_bytes([texel[0], texel[1]]) as f32 / 65535.0;
                [depth, 0.0, 0.0, 0.0]
            }
            TextureFormat::Depth32Float => {
                let depth = f32::from_le_bytes([texel[0], texel[1], texel[2], texel[3]]);
                [depth, 0.0, 0.0, 0.0]
            }
        })
        .collect()
}

fn texel_array(texel: &[u8]) -> [u8; 4] {
    [texel[0], texel[1], texel[2], texel[3]]
}
