//! Procedural textures.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::device::GraphicsDevice;
use crate::error::RenderResult;
use crate::resources::Texture;
use crate::types::{TextureDescriptor, TextureFormat, TextureUsage};

/// Seed of the noise texture for a given size.
pub fn noise_seed(width: u32, height: u32) -> u64 {
    u64::from(width.wrapping_mul(397) ^ height)
}

/// Texels of the noise texture for a given size, RGBA8.
///
/// The same size always yields the same texels.
pub fn noise_texels(width: u32, height: u32) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(noise_seed(width, height));
    let mut texels = Vec::with_capacity(width as usize * height as usize * 4);
    for _ in 0..width as usize * height as usize {
        let argb = rng.next_u32();
        texels.extend_from_slice(&[
            (argb >> 16) as u8,
            (argb >> 8) as u8,
            argb as u8,
            (argb >> 24) as u8,
        ]);
    }
    texels
}

/// Build an RGBA8 texture from a per-texel closure.
pub(crate) fn texture_rgba8(
    device: &Arc<GraphicsDevice>,
    width: u32,
    height: u32,
    label: &str,
    mut fill: impl FnMut(u32, u32) -> [u8; 4],
) -> RenderResult<Arc<Texture>> {
    let mut data = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&fill(x, y));
        }
    }
    upload(device, width, height, TextureFormat::Rgba8Unorm, label, &data)
}

/// Build an RGBA32F texture from a per-texel closure.
pub(crate) fn texture_rgba32f(
    device: &Arc<GraphicsDevice>,
    width: u32,
    height: u32,
    label: &str,
    mut fill: impl FnMut(u32, u32) -> [f32; 4],
) -> RenderResult<Arc<Texture>> {
    let mut texels: Vec<[f32; 4]> = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        for x in 0..width {
            texels.push(fill(x, y));
        }
    }
    upload(
        device,
        width,
        height,
        TextureFormat::Rgba32Float,
        label,
        bytemuck::cast_slice(&texels),
    )
}

fn upload(
    device: &Arc<GraphicsDevice>,
    width: u32,
    height: u32,
    format: TextureFormat,
    label: &str,
    data: &[u8],
) -> RenderResult<Arc<Texture>> {
    let texture = device.create_texture(
        &TextureDescriptor::new_2d(
            width,
            height,
            format,
            TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST | TextureUsage::COPY_SRC,
        )
        .with_label(label),
    )?;
    device.write_texture(&texture, data)?;
    Ok(texture)
}
