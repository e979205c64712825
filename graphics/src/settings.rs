//! Initial renderer configuration.

/// Settings a [`RenderLoop`](crate::RenderLoop) starts with.
///
/// All of them can be changed later through the renderer's setters.
///
/// # Example
///
/// ```
/// use showroom_graphics::RendererSettings;
///
/// let settings = RendererSettings::new()
///     .with_size(1280, 720)
///     .with_msaa(true)
///     .with_resolution_multiplier(2.0);
/// assert_eq!(settings.msaa_sample_count, 4);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RendererSettings {
    /// Logical width in pixels.
    pub width: u32,
    /// Logical height in pixels.
    pub height: u32,
    /// Enable multisampling.
    pub use_msaa: bool,
    /// Requested samples per pixel when multisampling.
    pub msaa_sample_count: u32,
    /// Physical pixels per logical pixel.
    pub resolution_multiplier: f64,
    /// Wait for vertical blank when presenting.
    pub vsync: bool,
    /// Allow the sprite overlay.
    pub use_sprite: bool,
    /// Scale applied to frame deltas.
    pub time_factor: f32,
    /// Render off-screen into BGRA targets a host compositor can share.
    pub host_compositing: bool,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            use_msaa: false,
            msaa_sample_count: 4,
            resolution_multiplier: 1.0,
            vsync: true,
            use_sprite: true,
            time_factor: 1.0,
            host_compositing: false,
        }
    }
}

impl RendererSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_msaa(mut self, enabled: bool) -> Self {
        self.use_msaa = enabled;
        self
    }

    pub fn with_msaa_sample_count(mut self, count: u32) -> Self {
        self.msaa_sample_count = count;
        self
    }

    pub fn with_resolution_multiplier(mut self, multiplier: f64) -> Self {
        self.resolution_multiplier = multiplier;
        self
    }

    pub fn with_vsync(mut self, enabled: bool) -> Self {
        self.vsync = enabled;
        self
    }

    pub fn with_sprite(mut self, enabled: bool) -> Self {
        self.use_sprite = enabled;
        self
    }

    pub fn with_time_factor(mut self, time_factor: f32) -> Self {
        self.time_factor = time_factor;
        self
    }

    pub fn with_host_compositing(mut self, enabled: bool) -> Self {
        self.host_compositing = enabled;
        self
    }
}
