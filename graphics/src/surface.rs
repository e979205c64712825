//! Render surface management.
//!
//! [`RenderSurfaceManager`] keeps a render target and depth target that
//! match the current size, resolution multiplier and sample description,
//! plus the swap chain when rendering on-screen.
//!
//! Logical size is what the host sees; physical size is the logical size
//! scaled by the resolution multiplier and rounded. Both targets always have
//! the physical size and are replaced together.

use std::sync::Arc;

use crate::device::{FeatureLevel, GraphicsDevice};
use crate::error::{RenderError, RenderResult};
use crate::resources::Texture;
use crate::settings::RendererSettings;
use crate::swapchain::{OutputHandle, SwapChain, SwapChainDescriptor};
use crate::types::{SampleDescription, TextureDescriptor, TextureFormat, TextureUsage, Viewport};

/// Multiplier restored by enabling supersampling if none was set before.
const DEFAULT_PREVIOUS_MULTIPLIER: f64 = 2.0;

/// Proof of a render-view substitution, consumed when restoring it.
#[must_use = "the substituted render view must be restored"]
#[derive(Debug)]
pub struct RenderViewToken {
    previous: Option<Arc<Texture>>,
    replaced: bool,
}

/// Owner of the render target, depth target and optional swap chain.
#[derive(Debug)]
pub struct RenderSurfaceManager {
    device: Option<Arc<GraphicsDevice>>,
    required_level: FeatureLevel,
    width: u32,
    height: u32,
    resolution_multiplier: f64,
    previous_multiplier: f64,
    use_msaa: bool,
    msaa_sample_count: u32,
    sample: SampleDescription,
    host_compositing: bool,
    resized: bool,
    dirty: bool,
    output: Option<OutputHandle>,
    swap_chain_descriptor: SwapChainDescriptor,
    swap_chain: Option<SwapChain>,
    render_target: Option<Arc<Texture>>,
    depth_target: Option<Arc<Texture>>,
    render_view: Option<Arc<Texture>>,
    active_viewport: Viewport,
    initially_resized: bool,
}

impl RenderSurfaceManager {
    /// Create a manager with no device bound yet.
    pub fn new(settings: &RendererSettings) -> Self {
        let resolution_multiplier = settings.resolution_multiplier.max(0.0);
        let previous_multiplier = if resolution_multiplier != 1.0 && resolution_multiplier > 0.0 {
            resolution_multiplier
        } else {
            DEFAULT_PREVIOUS_MULTIPLIER
        };
        Self {
            device: None,
            required_level: FeatureLevel::Level9_3,
            width: settings.width,
            height: settings.height,
            resolution_multiplier,
            previous_multiplier,
            use_msaa: settings.use_msaa,
            msaa_sample_count: settings.msaa_sample_count,
            sample: SampleDescription::SINGLE,
            host_compositing: settings.host_compositing,
            resized: true,
            dirty: false,
            output: None,
            swap_chain_descriptor: SwapChainDescriptor::default(),
            swap_chain: None,
            render_target: None,
            depth_target: None,
            render_view: None,
            active_viewport: Viewport::default(),
            initially_resized: false,
        }
    }

    /// Bind the device targets are created on and apply pending sampling.
    pub fn bind_device(
        &mut self,
        device: Arc<GraphicsDevice>,
        required_level: FeatureLevel,
    ) -> RenderResult<()> {
        self.device = Some(device);
        self.required_level = required_level;
        self.update_sample_description()
    }

    /// The bound device.
    pub fn device(&self) -> RenderResult<&Arc<GraphicsDevice>> {
        self.device.as_ref().ok_or(RenderError::NotInitialized)
    }

    // ---- size ----

    /// Logical width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Logical height.
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn set_width(&mut self, width: u32) {
        if self.width != width {
            self.width = width;
            self.resized = true;
            self.dirty = true;
        }
    }

    pub fn set_height(&mut self, height: u32) {
        if self.height != height {
            self.height = height;
            self.resized = true;
            self.dirty = true;
        }
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.set_width(width);
        self.set_height(height);
    }

    /// Physical width: logical width times the resolution multiplier.
    pub fn actual_width(&self) -> u32 {
        (self.width as f64 * self.resolution_multiplier).round() as u32
    }

    /// Physical height: logical height times the resolution multiplier.
    pub fn actual_height(&self) -> u32 {
        (self.height as f64 * self.resolution_multiplier).round() as u32
    }

    /// Viewport covering the physical targets.
    pub fn viewport(&self) -> Viewport {
        Viewport::from_dimensions(self.actual_width(), self.actual_height())
    }

    /// Viewport in logical pixels, for the final pass.
    pub fn output_viewport(&self) -> Viewport {
        Viewport::from_dimensions(self.width, self.height)
    }

    /// Viewport most recently applied to the device.
    pub fn active_viewport(&self) -> Viewport {
        self.active_viewport
    }

    pub fn set_active_viewport(&mut self, viewport: Viewport) {
        self.active_viewport = viewport;
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.viewport().aspect_ratio()
    }

    /// Factor from physical back to logical pixels.
    pub fn output_downscale_multiplier(&self) -> f64 {
        1.0 / self.resolution_multiplier
    }

    // ---- supersampling ----

    pub fn resolution_multiplier(&self) -> f64 {
        self.resolution_multiplier
    }

    /// Multiplier restored when supersampling is turned back on.
    pub fn previous_resolution_multiplier(&self) -> f64 {
        self.previous_multiplier
    }

    /// Set the resolution multiplier.
    ///
    /// A negative value `-x` only records `x` as the multiplier to restore
    /// when supersampling is enabled; nothing else changes.
    pub fn set_resolution_multiplier(&mut self, value: f64) -> RenderResult<()> {
        if value < 0.0 {
            self.previous_multiplier = -value;
            return Ok(());
        }
        if value == self.resolution_multiplier {
            return Ok(());
        }

        self.resolution_multiplier = value;
        if value != 1.0 {
            self.previous_multiplier = value;
        }

        self.update_sample_description()?;
        self.resized = true;
        self.dirty = true;
        Ok(())
    }

    /// Whether rendering happens above the logical resolution.
    pub fn use_ssaa(&self) -> bool {
        self.resolution_multiplier != 1.0
    }

    pub fn set_use_ssaa(&mut self, enabled: bool) -> RenderResult<()> {
        let value = if enabled { self.previous_multiplier } else { 1.0 };
        self.set_resolution_multiplier(value)
    }

    // ---- multisampling ----

    pub fn use_msaa(&self) -> bool {
        self.use_msaa
    }

    pub fn set_use_msaa(&mut self, enabled: bool) -> RenderResult<()> {
        if self.use_msaa == enabled {
            return Ok(());
        }
        self.use_msaa = enabled;
        self.update_sample_description()?;
        self.dirty = true;
        Ok(())
    }

    pub fn msaa_sample_count(&self) -> u32 {
        self.msaa_sample_count
    }

    pub fn set_msaa_sample_count(&mut self, count: u32) -> RenderResult<()> {
        if self.msaa_sample_count == count {
            return Ok(());
        }
        self.msaa_sample_count = count;
        self.update_sample_description()?;
        self.dirty = true;
        Ok(())
    }

    /// Current sample description of the targets.
    pub fn sample_description(&self) -> SampleDescription {
        self.sample
    }

    fn update_sample_description(&mut self) -> RenderResult<()> {
        let Some(device) = &self.device else {
            return Ok(());
        };

        let sample = if self.use_msaa {
            device.supported_sample_description(
                self.render_format(),
                SampleDescription::new(self.msaa_sample_count, 0),
            )
        } else {
            SampleDescription::SINGLE
        };

        if sample != self.sample {
            log::debug!(
                "Sample description {:?} -> {:?}",
                self.sample,
                sample
            );
            self.sample = sample;
            if self.swap_chain.is_some() {
                self.recreate_swap_chain()?;
            } else {
                self.resized = true;
            }
        }
        Ok(())
    }

    // ---- formats ----

    /// Format of off-screen render targets.
    pub fn render_format(&self) -> TextureFormat {
        if self.host_compositing {
            TextureFormat::Bgra8Unorm
        } else {
            TextureFormat::Rgba8Unorm
        }
    }

    /// Depth format for the required feature level.
    pub fn depth_format(&self) -> TextureFormat {
        if self.required_level < FeatureLevel::Level10_0 {
            TextureFormat::Depth16Unorm
        } else {
            TextureFormat::Depth32Float
        }
    }

    pub fn host_compositing(&self) -> bool {
        self.host_compositing
    }

    pub fn set_host_compositing(&mut self, enabled: bool) {
        if self.host_compositing != enabled {
            self.host_compositing = enabled;
            self.resized = true;
            self.dirty = true;
        }
    }

    // ---- dirty state ----

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Whether the targets must be recreated before the next draw.
    pub fn needs_resize(&self) -> bool {
        self.resized
    }

    /// Whether the targets were created at least once.
    pub fn initially_resized(&self) -> bool {
        self.initially_resized
    }

    // ---- targets ----

    /// Recreate the render and depth targets for the current configuration.
    ///
    /// Returns `false` without touching anything when either dimension is
    /// zero.
    pub fn resize(&mut self) -> RenderResult<bool> {
        self.resized = false;
        let width = self.actual_width();
        let height = self.actual_height();
        if width == 0 || height == 0 {
            log::debug!("Skipping resize to {}x{}", width, height);
            return Ok(false);
        }

        let device = self.device()?.clone();
        let _lock = device.lock();

        self.render_target = None;
        self.depth_target = None;

        let render_target = match &mut self.swap_chain {
            Some(swap_chain) => {
                swap_chain.resize_buffers(width, height)?;
                swap_chain.back_buffer()?
            }
            None => device.create_texture(
                &TextureDescriptor::new_2d(width, height, self.render_format(), TextureUsage::TARGET)
                    .with_sample_count(self.sample.count)
                    .with_label("render target"),
            )?,
        };
        let depth_target = device.create_texture(
            &TextureDescriptor::new_2d(
                width,
                height,
                self.depth_format(),
                TextureUsage::RENDER_ATTACHMENT,
            )
            .with_sample_count(self.sample.count)
            .with_label("depth target"),
        )?;

        self.render_target = Some(render_target);
        self.depth_target = Some(depth_target);
        self.active_viewport = self.viewport();
        self.initially_resized = true;

        log::debug!(
            "Resized targets to {}x{} (logical {}x{}, x{} samples)",
            width,
            height,
            self.width,
            self.height,
            self.sample.count
        );
        Ok(true)
    }

    /// The live render target.
    pub fn render_target(&self) -> Option<&Arc<Texture>> {
        self.render_target.as_ref()
    }

    /// The live depth target.
    pub fn depth_target(&self) -> Option<&Arc<Texture>> {
        self.depth_target.as_ref()
    }

    /// The target frames are drawn into: a substituted view if one is
    /// active, otherwise the live render target.
    pub fn render_view(&self) -> Option<&Arc<Texture>> {
        self.render_view.as_ref().or(self.render_target.as_ref())
    }

    /// Draw into `view` instead of the live target until the token is
    /// passed to [`RenderSurfaceManager::restore_render_view`].
    ///
    /// `None` or the view already in use leaves everything unchanged.
    pub fn replace_render_view(&mut self, view: Option<Arc<Texture>>) -> RenderViewToken {
        let unchanged = match (&view, self.render_view()) {
            (None, _) => true,
            (Some(view), Some(current)) => Arc::ptr_eq(view, current),
            (Some(_), None) => false,
        };
        if unchanged {
            return RenderViewToken {
                previous: None,
                replaced: false,
            };
        }
        RenderViewToken {
            previous: std::mem::replace(&mut self.render_view, view),
            replaced: true,
        }
    }

    /// Undo a substitution.
    pub fn restore_render_view(&mut self, token: RenderViewToken) {
        if token.replaced {
            self.render_view = token.previous;
        }
    }

    /// Whether a substituted view is active.
    pub fn is_render_view_replaced(&self) -> bool {
        self.render_view.is_some()
    }

    // ---- swap chain ----

    /// Create a swap chain presenting to `output`.
    pub fn attach_output(&mut self, output: OutputHandle) -> RenderResult<()> {
        let device = self.device()?.clone();
        self.output = Some(output);
        self.swap_chain_descriptor = SwapChainDescriptor::default().with_sample(self.sample);
        self.swap_chain = Some(SwapChain::new(
            device,
            output,
            self.swap_chain_descriptor,
            self.actual_width().max(1),
            self.actual_height().max(1),
        )?);
        self.resized = true;
        Ok(())
    }

    pub fn has_swap_chain(&self) -> bool {
        self.swap_chain.is_some()
    }

    /// Whether the surface presents to a window, even while its swap chain
    /// is torn down.
    pub fn is_on_screen(&self) -> bool {
        self.output.is_some()
    }

    pub fn swap_chain(&self) -> Option<&SwapChain> {
        self.swap_chain.as_ref()
    }

    pub(crate) fn swap_chain_mut(&mut self) -> Option<&mut SwapChain> {
        self.swap_chain.as_mut()
    }

    /// Replace the swap chain with one using the current sample description.
    ///
    /// Buffer count, format, windowing and output are kept.
    pub fn recreate_swap_chain(&mut self) -> RenderResult<()> {
        let Some(output) = self.output else {
            return Ok(());
        };
        let device = self.device()?.clone();
        let fullscreen = self
            .swap_chain
            .as_ref()
            .is_some_and(SwapChain::is_fullscreen);

        self.render_target = None;
        self.dispose_swap_chain();

        self.swap_chain_descriptor = self.swap_chain_descriptor.with_sample(self.sample);
        let mut swap_chain = SwapChain::new(
            device,
            output,
            self.swap_chain_descriptor,
            self.actual_width().max(1),
            self.actual_height().max(1),
        )?;
        if fullscreen {
            swap_chain.set_fullscreen(true)?;
        }
        self.swap_chain = Some(swap_chain);
        self.resized = true;
        log::debug!("Recreated swap chain ({} samples)", self.sample.count);
        Ok(())
    }

    /// Release the swap chain. Teardown failures are logged, not returned.
    pub fn dispose_swap_chain(&mut self) {
        let Some(mut swap_chain) = self.swap_chain.take() else {
            return;
        };
        if self
            .render_target
            .as_ref()
            .zip(swap_chain.back_buffer().ok())
            .is_some_and(|(target, back_buffer)| Arc::ptr_eq(target, &back_buffer))
        {
            self.render_target = None;
        }
        match swap_chain.dispose() {
            Ok(()) => log::debug!("Swap chain disposed"),
            Err(RenderError::Disposed) => log::debug!("Swap chain already disposed"),
            Err(e) => log::warn!("Swap chain disposal failed: {e}"),
        }
    }

    /// Present the frame, or flush the device when off-screen.
    pub fn present(&self, vsync: bool) -> RenderResult<()> {
        match &self.swap_chain {
            Some(swap_chain) => swap_chain.present(vsync),
            None => {
                self.device()?.flush();
                Ok(())
            }
        }
    }

    // ---- fullscreen ----

    pub fn is_fullscreen(&self) -> bool {
        self.swap_chain
            .as_ref()
            .is_some_and(SwapChain::is_fullscreen)
    }

    pub fn enter_fullscreen(&mut self) -> RenderResult<()> {
        match &mut self.swap_chain {
            Some(swap_chain) => swap_chain.set_fullscreen(true),
            None => Ok(()),
        }
    }

    pub fn exit_fullscreen(&mut self) -> RenderResult<()> {
        match &mut self.swap_chain {
            Some(swap_chain) => swap_chain.set_fullscreen(false),
            None => Ok(()),
        }
    }

    pub fn toggle_fullscreen(&mut self) -> RenderResult<()> {
        match &mut self.swap_chain {
            Some(swap_chain) => {
                let fullscreen = swap_chain.is_fullscreen();
                swap_chain.set_fullscreen(!fullscreen)
            }
            None => Ok(()),
        }
    }

    // ---- teardown ----

    /// Drop the render, depth and substituted targets.
    pub fn release_targets(&mut self) {
        self.render_view = None;
        self.render_target = None;
        self.depth_target = None;
    }

    /// Hand the swap chain over for disposal elsewhere.
    pub(crate) fn take_swap_chain(&mut self) -> Option<SwapChain> {
        self.swap_chain.take()
    }

    /// Release the device reference.
    pub(crate) fn unbind_device(&mut self) {
        self.release_targets();
        self.device = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceParameters;

    fn create_test_device() -> Arc<GraphicsDevice> {
        GraphicsDevice::new(&DeviceParameters::dummy()).unwrap()
    }

    fn surface(width: u32, height: u32) -> RenderSurfaceManager {
        let mut surface =
            RenderSurfaceManager::new(&RendererSettings::new().with_size(width, height));
        surface
            .bind_device(create_test_device(), FeatureLevel::Level10_0)
            .unwrap();
        surface
    }

    #[test]
    fn test_targets_follow_multiplier() {
        let mut surface = surface(101, 50);
        surface.set_resolution_multiplier(1.5).unwrap();
        assert!(surface.resize().unwrap());

        let color = surface.render_target().unwrap();
        let depth = surface.depth_target().unwrap();
        assert_eq!(color.size(), (152, 75));
        assert_eq!(depth.size(), (152, 75));
        assert_eq!(depth.format(), TextureFormat::Depth32Float);
        assert_eq!(surface.output_viewport().width, 101.0);
        assert_eq!(surface.viewport().width, 152.0);
    }

    #[test]
    fn test_zero_size_resize_is_skipped() {
        let mut surface = surface(0, 50);
        assert!(!surface.resize().unwrap());
        assert!(surface.render_target().is_none());
        assert!(!surface.needs_resize());
    }

    #[test]
    fn test_negative_multiplier_sets_previous_only() {
        let mut surface = surface(10, 10);
        surface.resize().unwrap();
        surface.clear_dirty();

        surface.set_resolution_multiplier(-3.0).unwrap();
        assert_eq!(surface.resolution_multiplier(), 1.0);
        assert_eq!(surface.previous_resolution_multiplier(), 3.0);
        assert!(!surface.is_dirty());
        assert!(!surface.needs_resize());

        surface.set_use_ssaa(true).unwrap();
        assert_eq!(surface.resolution_multiplier(), 3.0);
        assert!(surface.is_dirty());
    }

    #[test]
    fn test_ssaa_toggle_restores_multiplier() {
        let mut surface = surface(10, 10);
        assert_eq!(surface.previous_resolution_multiplier(), 2.0);
        surface.set_resolution_multiplier(1.25).unwrap();
        surface.set_use_ssaa(false).unwrap();
        assert!(!surface.use_ssaa());
        surface.set_use_ssaa(true).unwrap();
        assert_eq!(surface.resolution_multiplier(), 1.25);
    }

    #[test]
    fn test_depth_format_for_low_feature_level() {
        let mut surface =
            RenderSurfaceManager::new(&RendererSettings::new().with_size(4, 4));
        surface
            .bind_device(create_test_device(), FeatureLevel::Level9_3)
            .unwrap();
        assert_eq!(surface.depth_format(), TextureFormat::Depth16Unorm);
    }

    #[test]
    fn test_host_compositing_format() {
        let settings = RendererSettings::new()
            .with_size(4, 4)
            .with_host_compositing(true);
        let mut surface = RenderSurfaceManager::new(&settings);
        surface
            .bind_device(create_test_device(), FeatureLevel::Level10_0)
            .unwrap();
        surface.resize().unwrap();
        assert_eq!(
            surface.render_target().unwrap().format(),
            TextureFormat::Bgra8Unorm
        );
    }

    #[test]
    fn test_msaa_change_marks_resize() {
        let mut surface = surface(8, 8);
        surface.resize().unwrap();
        surface.set_use_msaa(true).unwrap();
        assert!(surface.needs_resize());
        assert!(surface.is_dirty());
        assert_eq!(surface.sample_description().count, 4);
        surface.resize().unwrap();
        assert_eq!(surface.render_target().unwrap().sample_count(), 4);
        assert_eq!(surface.depth_target().unwrap().sample_count(), 4);
    }

    #[test]
    fn test_render_view_substitution() {
        let mut surface = surface(8, 8);
        surface.resize().unwrap();
        let live = surface.render_target().unwrap().clone();
        let device = surface.device().unwrap().clone();
        let other = device
            .create_texture(&TextureDescriptor::new_2d(
                8,
                8,
                TextureFormat::Rgba8Unorm,
                TextureUsage::TARGET,
            ))
            .unwrap();

        let token = surface.replace_render_view(Some(other.clone()));
        assert!(Arc::ptr_eq(surface.render_view().unwrap(), &other));
        surface.restore_render_view(token);
        assert!(Arc::ptr_eq(surface.render_view().unwrap(), &live));

        let noop = surface.replace_render_view(None);
        assert!(!surface.is_render_view_replaced());
        surface.restore_render_view(noop);
    }

    #[test]
    fn test_fullscreen_without_swap_chain_is_noop() {
        let mut surface = surface(8, 8);
        surface.enter_fullscreen().unwrap();
        surface.toggle_fullscreen().unwrap();
        assert!(!surface.is_fullscreen());
    }

    #[test]
    fn test_swap_chain_recreated_on_sample_change() {
        let mut surface = surface(8, 8);
        surface.attach_output(OutputHandle::detached(7)).unwrap();
        surface.resize().unwrap();
        let device = surface.device().unwrap().clone();
        assert_eq!(device.swap_chains_created(), 1);

        surface.set_use_msaa(true).unwrap();
        assert_eq!(device.swap_chains_created(), 2);
        assert_eq!(device.swap_chain_count(), 1);

        let swap_chain = surface.swap_chain().unwrap();
        assert_eq!(swap_chain.descriptor().buffer_count, 2);
        assert_eq!(swap_chain.descriptor().sample.count, 4);
        assert_eq!(swap_chain.output(), &OutputHandle::detached(7));
        assert!(surface.needs_resize());
    }
}
