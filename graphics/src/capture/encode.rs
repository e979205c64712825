use std::io::{Seek, Write};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgba32FImage, RgbaImage};

use super::ShotFormat;
use crate::device::GraphicsDevice;
use crate::error::{RenderError, RenderResult};
use crate::resources::Texture;
use crate::types::TextureFormat;

/// Read `texture` back and write it to `writer` as `format`.
///
/// 8-bit targets encoded as EXR are widened to float; float targets encoded
/// as an 8-bit format are clamped.
pub fn encode_texture<W: Write + Seek>(
    device: &GraphicsDevice,
    texture: &Texture,
    format: ShotFormat,
    writer: &mut W,
) -> RenderResult<()> {
    let (width, height) = texture.size();
    let data = device.read_texture(texture)?;
    let image = to_image(texture.format(), width, height, data)?;

    match format {
        ShotFormat::Png => {
            DynamicImage::ImageRgba8(image.to_rgba8()).write_to(writer, ImageFormat::Png)?
        }
        ShotFormat::Bmp => {
            DynamicImage::ImageRgba8(image.to_rgba8()).write_to(writer, ImageFormat::Bmp)?
        }
        ShotFormat::Jpeg { quality } => JpegEncoder::new_with_quality(writer, quality.clamp(1, 100))
            .encode_image(&image.to_rgb8())?,
        ShotFormat::Exr => DynamicImage::ImageRgba32F(image.to_rgba32f())
            .write_to(writer, ImageFormat::OpenExr)?,
    }
    Ok(())
}

fn to_image(
    format: TextureFormat,
    width: u32,
    height: u32,
    mut data: Vec<u8>,
) -> RenderResult<DynamicImage> {
    let mismatch = || {
        RenderError::Readback(format!(
            "texel data does not match a {width}x{height} {format:?} image"
        ))
    };
    match format {
        TextureFormat::Rgba8Unorm => RgbaImage::from_raw(width, height, data)
            .map(DynamicImage::ImageRgba8)
            .ok_or_else(mismatch),
        TextureFormat::Bgra8Unorm => {
            for texel in data.chunks_exact_mut(4) {
                texel.swap(0, 2);
            }
            RgbaImage::from_raw(width, height, data)
                .map(DynamicImage::ImageRgba8)
                .ok_or_else(mismatch)
        }
        TextureFormat::Rgba32Float => {
            let texels: Vec<f32> = bytemuck::pod_collect_to_vec(&data);
            Rgba32FImage::from_raw(width, height, texels)
                .map(DynamicImage::ImageRgba32F)
                .ok_or_else(mismatch)
        }
        other => Err(RenderError::InvalidParameter(format!(
            "{other:?} textures cannot be encoded"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::device::DeviceParameters;
    use crate::types::{Color, TextureDescriptor, TextureUsage};
    use std::sync::Arc;

    fn create_test_device() -> Arc<GraphicsDevice> {
        GraphicsDevice::new(&DeviceParameters::dummy()).unwrap()
    }

    fn target(device: &Arc<GraphicsDevice>, format: TextureFormat) -> Arc<Texture> {
        device
            .create_texture(&TextureDescriptor::new_2d(8, 4, format, TextureUsage::TARGET))
            .unwrap()
    }

    fn decode(bytes: Vec<u8>) -> DynamicImage {
        image::load_from_memory(&bytes).unwrap()
    }

    #[test]
    fn test_png_roundtrip_of_bgra_target() {
        let device = create_test_device();
        let texture = target(&device, TextureFormat::Bgra8Unorm);
        device
            .clear_color(&texture, Color::new(1.0, 0.0, 0.0, 1.0))
            .unwrap();

        let mut out = Cursor::new(Vec::new());
        encode_texture(&device, &texture, ShotFormat::Png, &mut out).unwrap();

        let image = decode(out.into_inner()).to_rgba8();
        assert_eq!(image.dimensions(), (8, 4));
        assert_eq!(image.get_pixel(3, 2).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_exr_keeps_float_values() {
        let device = create_test_device();
        let texture = target(&device, TextureFormat::Rgba32Float);
        device
            .clear_color(&texture, Color::new(4.0, 0.5, 0.0, 1.0))
            .unwrap();

        let mut out = Cursor::new(Vec::new());
        encode_texture(&device, &texture, ShotFormat::Exr, &mut out).unwrap();

        let image = decode(out.into_inner()).to_rgba32f();
        assert_eq!(image.dimensions(), (8, 4));
        let pixel = image.get_pixel(0, 0).0;
        assert!((pixel[0] - 4.0).abs() < 1e-3);
        assert!((pixel[1] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_jpeg_and_bmp_encode() {
        let device = create_test_device();
        let texture = target(&device, TextureFormat::Rgba8Unorm);
        for format in [ShotFormat::Jpeg { quality: 80 }, ShotFormat::Bmp] {
            let mut out = Cursor::new(Vec::new());
            encode_texture(&device, &texture, format, &mut out).unwrap();
            assert_eq!(decode(out.into_inner()).width(), 8);
        }
    }

    #[test]
    fn test_depth_cannot_be_encoded() {
        let device = create_test_device();
        let texture = device
            .create_texture(&TextureDescriptor::new_2d(
                4,
                4,
                TextureFormat::Depth32Float,
                TextureUsage::RENDER_ATTACHMENT,
            ))
            .unwrap();
        let mut out = Cursor::new(Vec::new());
        assert!(encode_texture(&device, &texture, ShotFormat::Png, &mut out).is_err());
    }
}
