//! wgpu resource creation, upload and readback.

use std::sync::Arc;

use super::WgpuBackend;
use super::conversion::{
    aligned_bytes_per_row, convert_address_mode, convert_buffer_usage, convert_filter_mode,
    convert_texture_format, convert_texture_usage,
};
use crate::backend::{GpuBuffer, GpuSampler, GpuTexture};
use crate::error::{RenderError, RenderResult};
use crate::types::{BufferDescriptor, SamplerDescriptor, TextureDescriptor};

impl WgpuBackend {
    pub fn create_texture(&self, descriptor: &TextureDescriptor) -> RenderResult<GpuTexture> {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: descriptor.label.as_deref(),
            size: wgpu::Extent3d {
                width: descriptor.width,
                height: descriptor.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: descriptor.sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: convert_texture_format(descriptor.format),
            usage: convert_texture_usage(descriptor.usage, descriptor.sample_count),
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(GpuTexture::Wgpu {
            texture: Arc::new(texture),
            view: Arc::new(view),
        })
    }

    pub fn create_buffer(&self, descriptor: &BufferDescriptor) -> RenderResult<GpuBuffer> {
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: descriptor.label.as_deref(),
            size: descriptor.size,
            usage: convert_buffer_usage(descriptor.usage),
            mapped_at_creation: false,
        });

        Ok(GpuBuffer::Wgpu(Arc::new(buffer)))
    }

    pub fn create_sampler(&self, descriptor: &SamplerDescriptor) -> RenderResult<GpuSampler> {
        let address_mode = convert_address_mode(descriptor.address_mode);
        let filter = convert_filter_mode(descriptor.filter);
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: descriptor.label.as_deref(),
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter: filter,
            min_filter: filter,
            ..Default::default()
        });

        Ok(GpuSampler::Wgpu(Arc::new(sampler)))
    }

    pub fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) -> RenderResult<()> {
        let GpuBuffer::Wgpu(buffer) = buffer else {
            return Err(RenderError::Backend(
                "write_buffer called with non-Wgpu buffer".to_string(),
            ));
        };
        self.queue.write_buffer(buffer, offset, data);
        Ok(())
    }

    pub fn write_texture(
        &self,
        texture: &GpuTexture,
        descriptor: &TextureDescriptor,
        data: &[u8],
    ) -> RenderResult<()> {
        let GpuTexture::Wgpu { texture, .. } = texture else {
            return Err(RenderError::Backend(
                "write_texture called with non-Wgpu texture".to_string(),
            ));
        };

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(descriptor.width * descriptor.format.block_size()),
                rows_per_image: Some(descriptor.height),
            },
            wgpu::Extent3d {
                width: descriptor.width,
                height: descriptor.height,
                depth_or_array_layers: 1,
            },
        );

        Ok(())
    }

    /// Copy the texture into a staging buffer and strip the row padding.
    pub fn read_texture(
        &self,
        texture: &GpuTexture,
        descriptor: &TextureDescriptor,
    ) -> RenderResult<Vec<u8>> {
        let GpuTexture::Wgpu { texture, .. } = texture else {
            return Err(RenderError::Backend(
                "read_texture called with non-Wgpu texture".to_string(),
            ));
        };

        let bytes_per_pixel = descriptor.format.block_size();
        let unpadded_row = (descriptor.width * bytes_per_pixel) as usize;
        let padded_row = aligned_bytes_per_row(descriptor.width, bytes_per_pixel);
        let size = padded_row as u64 * descriptor.height as u64;

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Staging Buffer"),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(descriptor.height),
                },
            },
            wgpu::Extent3d {
                width: descriptor.width,
                height: descriptor.height,
                depth_or_array_layers: 1,
            },
        );
        let index = self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        let _ = self.device.poll(wgpu::PollType::Wait {
            submission_index: Some(index),
            timeout: Some(std::time::Duration::from_secs(10)),
        });

        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(RenderError::Readback(format!("buffer mapping failed: {e}"))),
            Err(_) => return Err(RenderError::Readback("mapping callback dropped".to_string())),
        }

        let mut data = Vec::with_capacity(unpadded_row * descriptor.height as usize);
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks_exact(padded_row as usize) {
                data.extend_from_slice(&row[..unpadded_row]);
            }
        }
        staging.unmap();

        Ok(data)
    }
}
