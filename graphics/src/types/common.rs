//! Common types shared across the graphics system.

// ============================================================================
// Viewport
// ============================================================================

/// Viewport configuration for rendering.
///
/// Defines the rectangular region of the framebuffer that will be rendered to,
/// along with the depth range mapping. Depth range is `[0, 1]` and the origin
/// is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// X coordinate of the viewport's top-left corner.
    pub x: f32,
    /// Y coordinate of the viewport's top-left corner.
    pub y: f32,
    /// Width of the viewport.
    pub width: f32,
    /// Height of the viewport.
    pub height: f32,
    /// Minimum depth value (default: 0.0).
    pub min_depth: f32,
    /// Maximum depth value (default: 1.0).
    pub max_depth: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

impl Viewport {
    /// Create a new viewport with standard `[0, 1]` depth range.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }

    /// Create a viewport from dimensions with origin at (0, 0).
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f32, height as f32)
    }

    /// Width divided by height, or 1.0 for an empty viewport.
    pub fn aspect_ratio(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }
}

// ============================================================================
// Rectangles
// ============================================================================

/// Integer pixel rectangle, used for solid fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// X coordinate of the top-left corner.
    pub x: u32,
    /// Y coordinate of the top-left corner.
    pub y: u32,
    /// Width of the rectangle.
    pub width: u32,
    /// Height of the rectangle.
    pub height: u32,
}

impl Rect {
    /// Create a new rectangle.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Clip the rectangle to a `width × height` surface.
    pub fn clipped(&self, width: u32, height: u32) -> Option<Self> {
        let x0 = self.x.min(width);
        let y0 = self.y.min(height);
        let x1 = self.x.saturating_add(self.width).min(width);
        let y1 = self.y.saturating_add(self.height).min(height);
        (x1 > x0 && y1 > y0).then(|| Self::new(x0, y0, x1 - x0, y1 - y0))
    }
}

/// Fractional source region in pixels, used by blits.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Region {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl Region {
    /// Create a new region.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole of a `width × height` texture.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f32, height as f32)
    }

    /// The centered fraction `keep` of a `width × height` texture.
    pub fn centered(width: u32, height: u32, keep: f32) -> Self {
        let w = width as f32 * keep;
        let h = height as f32 * keep;
        Self::new((width as f32 - w) * 0.5, (height as f32 - h) * 0.5, w, h)
    }
}

// ============================================================================
// Color
// ============================================================================

/// Linear RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    /// Background of a frame nobody has drawn into yet.
    pub const DARK_CYAN: Self = Self::new(0.0, 139.0 / 255.0, 139.0 / 255.0, 1.0);

    /// Create a new color.
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create a color from 8-bit channels.
    pub fn from_rgba8(rgba: [u8; 4]) -> Self {
        Self::new(
            rgba[0] as f32 / 255.0,
            rgba[1] as f32 / 255.0,
            rgba[2] as f32 / 255.0,
            rgba[3] as f32 / 255.0,
        )
    }

    /// Channels as an array.
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

// ============================================================================
// Multisampling
// ============================================================================

/// Multisample description: sample count plus quality level.
///
/// Quality is carried for parity with APIs that expose it; backends without
/// quality levels ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleDescription {
    /// Samples per pixel.
    pub count: u32,
    /// Quality level.
    pub quality: u32,
}

impl SampleDescription {
    /// One sample per pixel.
    pub const SINGLE: Self = Self::new(1, 0);

    /// Create a sample description.
    pub const fn new(count: u32, quality: u32) -> Self {
        Self { count, quality }
    }

    /// Returns true if more than one sample per pixel is used.
    pub fn is_multisampled(&self) -> bool {
        self.count > 1
    }
}

impl Default for SampleDescription {
    fn default() -> Self {
        Self::SINGLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_clipping() {
        let rect = Rect::new(6, 6, 10, 10);
        assert_eq!(rect.clipped(8, 8), Some(Rect::new(6, 6, 2, 2)));
        assert_eq!(Rect::new(9, 0, 4, 4).clipped(8, 8), None);
    }

    #[test]
    fn test_centered_region() {
        let region = Region::centered(100, 50, 0.5);
        assert_eq!(region, Region::new(25.0, 12.5, 50.0, 25.0));
    }

    #[test]
    fn test_viewport_aspect() {
        assert_eq!(Viewport::from_dimensions(200, 100).aspect_ratio(), 2.0);
        assert_eq!(Viewport::default().aspect_ratio(), 1.0);
    }
}
