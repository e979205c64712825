//! Sprite overlay.
//!
//! [`SpriteLayer`] queues solid rectangles in logical (output) coordinates
//! and draws them on top of the frame when flushed. Rectangles are scaled by
//! the resolution multiplier at flush time, so overlays keep their on-screen
//! size when supersampling is toggled.

use crate::error::RenderResult;
use crate::resources::Texture;
use crate::types::{Color, Rect, Region};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Sprite {
    region: Region,
    color: Color,
}

/// Queue of overlay rectangles drawn after the frame.
#[derive(Debug, Default)]
pub struct SpriteLayer {
    queue: Vec<Sprite>,
    flushed: u64,
}

impl SpriteLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a rectangle in logical pixels.
    pub fn draw_rect(&mut self, region: Region, color: Color) {
        if region.width > 0.0 && region.height > 0.0 {
            self.queue.push(Sprite { region, color });
        }
    }

    /// Number of queued rectangles.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Total number of rectangles drawn so far.
    pub fn flushed(&self) -> u64 {
        self.flushed
    }

    /// Draw and clear the queue. `scale` maps logical to physical pixels.
    pub fn flush(&mut self, target: &Texture, scale: f32) -> RenderResult<()> {
        let device = target.device();
        for sprite in self.queue.drain(..) {
            let Region {
                x,
                y,
                width,
                height,
            } = sprite.region;
            let left = (x * scale).round().max(0.0) as u32;
            let top = (y * scale).round().max(0.0) as u32;
            let right = ((x + width) * scale).round().max(0.0) as u32;
            let bottom = ((y + height) * scale).round().max(0.0) as u32;
            if right > left && bottom > top {
                device.fill_rect(
                    target,
                    Rect::new(left, top, right - left, bottom - top),
                    sprite.color,
                )?;
            }
            self.flushed += 1;
        }
        Ok(())
    }

    /// Drop queued rectangles without drawing them.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::device::{DeviceParameters, GraphicsDevice};
    use crate::types::{TextureDescriptor, TextureFormat, TextureUsage};

    fn create_test_device() -> Arc<GraphicsDevice> {
        GraphicsDevice::new(&DeviceParameters::dummy()).unwrap()
    }

    #[test]
    fn test_flush_scales_rects() {
        let device = create_test_device();
        let target = device
            .create_texture(&TextureDescriptor::new_2d(
                4,
                2,
                TextureFormat::Rgba8Unorm,
                TextureUsage::TARGET,
            ))
            .unwrap();
        device.clear_color(&target, Color::BLACK).unwrap();

        let mut layer = SpriteLayer::new();
        layer.draw_rect(Region::new(0.0, 0.0, 1.0, 1.0), Color::WHITE);
        layer.draw_rect(Region::new(0.0, 0.0, 0.0, 1.0), Color::WHITE);
        assert_eq!(layer.pending(), 1);

        layer.flush(&target, 2.0).unwrap();
        assert_eq!(layer.pending(), 0);
        assert_eq!(layer.flushed(), 1);

        let texels = device.read_texture(&target).unwrap();
        let white: Vec<bool> = texels.chunks(4).map(|t| t[0] == 255).collect();
        assert_eq!(
            white,
            vec![true, true, false, false, true, true, false, false]
        );
    }
}
