//! Frame capture: request types, progress, cancellation and encoding.
//!
//! The pipeline itself lives on [`RenderLoop::shot`](crate::RenderLoop::shot);
//! this module holds everything it is parameterized with.

mod encode;
mod progress;

pub use encode::encode_texture;
pub use progress::{CancellationToken, ProgressSink, Subrange};

use crate::error::{RenderError, RenderResult};
use crate::target::{TargetTexture, ensure_format};
use crate::types::TextureFormat;

/// Output image encoding of a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShotFormat {
    #[default]
    Png,
    Jpeg {
        quality: u8,
    },
    Bmp,
    /// OpenEXR, 32-bit float.
    Exr,
}

impl ShotFormat {
    /// Whether the format keeps values outside 0..1.
    pub fn is_hdr(&self) -> bool {
        matches!(self, Self::Exr)
    }

    /// Pixel format the frame is rendered in before encoding.
    pub fn texture_format(&self) -> TextureFormat {
        if self.is_hdr() {
            TextureFormat::Rgba32Float
        } else {
            TextureFormat::Rgba8Unorm
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg { .. } => "jpg",
            Self::Bmp => "bmp",
            Self::Exr => "exr",
        }
    }

    /// Guess the format from a file extension. JPEG uses quality 90.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg { quality: 90 }),
            "bmp" => Some(Self::Bmp),
            "exr" => Some(Self::Exr),
            _ => None,
        }
    }
}

/// Parameters of a single capture.
///
/// # Example
///
/// ```
/// use showroom_graphics::{ShotFormat, ShotRequest};
///
/// let request = ShotRequest::new(1920, 1080)
///     .with_downscale(0.5)
///     .with_format(ShotFormat::Exr);
/// assert!(request.validate().is_ok());
/// assert_eq!(request.output_size(), (960, 540));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotRequest {
    /// Logical width the frame is rendered at.
    pub width: u32,
    /// Logical height the frame is rendered at.
    pub height: u32,
    /// Output scale, in `(0, 1]`.
    pub downscale: f64,
    /// Centered fraction of the frame that is kept, in `(0, 1]`.
    pub crop: f64,
    pub format: ShotFormat,
}

impl ShotRequest {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            downscale: 1.0,
            crop: 1.0,
            format: ShotFormat::Png,
        }
    }

    pub fn with_downscale(mut self, downscale: f64) -> Self {
        self.downscale = downscale;
        self
    }

    pub fn with_crop(mut self, crop: f64) -> Self {
        self.crop = crop;
        self
    }

    pub fn with_format(mut self, format: ShotFormat) -> Self {
        self.format = format;
        self
    }

    pub fn validate(&self) -> RenderResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidParameter(format!(
                "shot size {}x{} is empty",
                self.width, self.height
            )));
        }
        for (name, value) in [("downscale", self.downscale), ("crop", self.crop)] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(RenderError::InvalidParameter(format!(
                    "{name} must be in (0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Whether the live render target can be encoded as is.
    pub fn is_direct(&self) -> bool {
        self.downscale == 1.0 && self.crop == 1.0 && !self.format.is_hdr()
    }

    /// Size after downscaling.
    pub fn output_size(&self) -> (u32, u32) {
        (
            scale(self.width, self.downscale),
            scale(self.height, self.downscale),
        )
    }

    /// Size of the encoded image.
    ///
    /// The kept center is scaled back up by `1 / crop`.
    pub fn final_size(&self) -> (u32, u32) {
        let (width, height) = self.output_size();
        (scale(width, 1.0 / self.crop), scale(height, 1.0 / self.crop))
    }
}

fn scale(value: u32, factor: f64) -> u32 {
    ((value as f64 * factor).round() as u32).max(1)
}

/// Result of a successful capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShotOutcome {
    /// Width of the encoded image.
    pub width: u32,
    /// Height of the encoded image.
    pub height: u32,
    /// Whether the live render target was encoded directly.
    pub fast_path: bool,
}

/// Auxiliary textures retained between captures.
#[derive(Debug, Default)]
pub(crate) struct CaptureBuffers {
    pub(crate) render: Option<TargetTexture>,
    pub(crate) resolve: Option<TargetTexture>,
    pub(crate) downscale: Option<TargetTexture>,
    pub(crate) crop: Option<TargetTexture>,
}

impl CaptureBuffers {
    pub(crate) fn render(&mut self, format: TextureFormat) -> &mut TargetTexture {
        ensure_format(&mut self.render, format, "shot render buffer")
    }

    pub(crate) fn resolve(&mut self, format: TextureFormat) -> &mut TargetTexture {
        ensure_format(&mut self.resolve, format, "shot resolve buffer")
    }

    pub(crate) fn downscale(&mut self, format: TextureFormat) -> &mut TargetTexture {
        ensure_format(&mut self.downscale, format, "shot downscale buffer")
    }

    pub(crate) fn crop(&mut self, format: TextureFormat) -> &mut TargetTexture {
        ensure_format(&mut self.crop, format, "shot crop buffer")
    }

    pub(crate) fn release(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn allocated(&self) -> usize {
        [&self.render, &self.resolve, &self.downscale, &self.crop]
            .into_iter()
            .filter(|target| target.as_ref().is_some_and(|t| t.texture().is_some()))
            .count()
    }
}
