//! Integration points for renderer implementations.

use std::sync::Arc;

use crate::capture::ProgressSink;
use crate::device::{FeatureLevel, GraphicsDevice};
use crate::error::{RenderError, RenderResult};
use crate::registry::ResourceRegistry;
use crate::resources::Texture;
use crate::sprite::SpriteLayer;
use crate::surface::RenderSurfaceManager;
use crate::types::{Color, SampleDescription, Viewport};

/// Scene-specific behavior plugged into a [`RenderLoop`](super::RenderLoop).
///
/// The loop never inspects scene contents; everything domain-specific
/// happens in these hooks. Only [`RenderHooks::draw_frame`] has a visible
/// default: it clears the frame to dark cyan.
pub trait RenderHooks: Send {
    /// Lowest device capability tier the hooks work with.
    fn feature_level(&self) -> FeatureLevel {
        FeatureLevel::Level10_0
    }

    /// Create scene resources. Called once after the device is ready.
    fn initialize_resources(&mut self, _ctx: &mut FrameContext<'_>) -> RenderResult<()> {
        Ok(())
    }

    /// Adapt size-dependent resources after the targets were recreated.
    fn resize_resources(&mut self, _ctx: &mut FrameContext<'_>) -> RenderResult<()> {
        Ok(())
    }

    /// Advance the scene by `dt` scaled seconds. Never called with `dt == 0`.
    fn on_tick(&mut self, _dt: f32) {}

    /// Draw one frame into [`FrameContext::render_target`].
    fn draw_frame(&mut self, ctx: &mut FrameContext<'_>) -> RenderResult<()> {
        ctx.clear_depth(1.0)?;
        ctx.clear(Color::DARK_CYAN)
    }

    /// Release scene resources. Called once when the renderer is disposed.
    fn dispose_resources(&mut self) {}
}

/// Per-call view of the renderer handed to [`RenderHooks`].
pub struct FrameContext<'a> {
    pub(super) registry: &'a ResourceRegistry,
    pub(super) surface: &'a RenderSurfaceManager,
    pub(super) sprite: &'a mut Option<SpriteLayer>,
    pub(super) sprite_allowed: bool,
    pub(super) progress: Option<&'a dyn ProgressSink>,
    pub(super) capturing: bool,
}

impl<'a> FrameContext<'a> {
    pub fn device(&self) -> &'a Arc<GraphicsDevice> {
        self.registry.device()
    }

    pub fn registry(&self) -> &'a ResourceRegistry {
        self.registry
    }

    /// The texture to draw into.
    ///
    /// During a capture this is the capture buffer, not the live target.
    pub fn render_target(&self) -> RenderResult<&'a Arc<Texture>> {
        self.surface.render_view().ok_or(RenderError::NotInitialized)
    }

    pub fn depth_target(&self) -> Option<&'a Arc<Texture>> {
        self.surface.depth_target()
    }

    /// Viewport in physical pixels.
    pub fn viewport(&self) -> Viewport {
        self.surface.active_viewport()
    }

    /// Viewport in logical pixels, for the final pass.
    pub fn output_viewport(&self) -> Viewport {
        self.surface.output_viewport()
    }

    pub fn resolution_multiplier(&self) -> f64 {
        self.surface.resolution_multiplier()
    }

    pub fn sample_description(&self) -> SampleDescription {
        self.surface.sample_description()
    }

    /// Whether this frame is drawn for a capture.
    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    /// Report progress of a long draw, from 0 to 1.
    pub fn report_progress(&self, progress: f64) {
        if let Some(sink) = self.progress {
            sink.report(progress);
        }
    }

    /// The sprite overlay, created on first use.
    ///
    /// `None` when sprites are disabled or the renderer targets a feature
    /// level below 10.0.
    pub fn sprite(&mut self) -> Option<&mut SpriteLayer> {
        if self.sprite_allowed && self.sprite.is_none() {
            log::debug!("Creating sprite layer");
            *self.sprite = Some(SpriteLayer::new());
        }
        self.sprite.as_mut()
    }

    /// Clear the render target.
    pub fn clear(&self, color: Color) -> RenderResult<()> {
        self.device().clear_color(self.render_target()?, color)
    }

    /// Clear the depth target, if there is one.
    pub fn clear_depth(&self, depth: f32) -> RenderResult<()> {
        match self.depth_target() {
            Some(target) => self.device().clear_depth(target, depth),
            None => Ok(()),
        }
    }
}

/// Window the renderer is associated with.
pub trait HostWindow: Send + Sync {
    /// Whether the window still exists.
    fn is_alive(&self) -> bool;

    /// Put the window in or out of fullscreen after the swap chain switched.
    fn set_fullscreen(&self, _fullscreen: bool) {}
}
