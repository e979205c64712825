//! The render loop.
//!
//! [`RenderLoop`] ties a [`GraphicsDevice`], a [`ResourceRegistry`] and a
//! [`RenderSurfaceManager`] together and drives [`RenderHooks`] through
//! initialization, per-frame drawing, resizing and disposal.
//!
//! # Frame flow
//!
//! ```text
//! draw()
//!   ├── clear dirty flags
//!   ├── resize targets (if pending) ── hooks.resize_resources, registry.on_resize
//!   ├── lock device
//!   ├── tick clock ── hooks.on_tick, registry.on_tick, listeners   (dt > 0 only)
//!   ├── hooks.draw_frame
//!   ├── flush sprite layer
//!   └── present (or flush when off-screen)
//! ```
//!
//! # Example
//!
//! ```
//! use showroom_graphics::{DeviceParameters, RenderHooks, RenderLoop, RendererSettings};
//!
//! struct Empty;
//! impl RenderHooks for Empty {}
//!
//! let mut renderer = RenderLoop::new(Empty, RendererSettings::new().with_size(64, 64))
//!     .with_device_parameters(DeviceParameters::dummy());
//! renderer.initialize().unwrap();
//! renderer.draw().unwrap();
//! assert_eq!(renderer.frames(), 1);
//! renderer.dispose();
//! ```

mod hooks;
mod shot;

pub use hooks::{FrameContext, HostWindow, RenderHooks};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::capture::{CaptureBuffers, ProgressSink};
use crate::clock::FrameClock;
use crate::device::{DeviceParameters, FeatureLevel, GraphicsDevice};
use crate::error::{RenderError, RenderResult};
use crate::registry::{RegistryEvent, ResourceRegistry, SubscriptionId};
use crate::resources::Texture;
use crate::settings::RendererSettings;
use crate::sprite::SpriteLayer;
use crate::surface::RenderSurfaceManager;
use crate::swapchain::OutputHandle;

type TickListener = Box<dyn FnMut(f32) + Send>;

/// Capture flags and retained buffers.
#[derive(Debug, Default)]
struct CaptureState {
    in_process: u32,
    draw_in_process: bool,
    resolution_multiplier: f64,
    keep_hdr: bool,
    last_width: u32,
    last_height: u32,
    buffers: CaptureBuffers,
}

/// Drives a renderer implementation frame by frame.
pub struct RenderLoop<H: RenderHooks> {
    hooks: H,
    surface: RenderSurfaceManager,
    registry: Option<Arc<ResourceRegistry>>,
    subscription: Option<SubscriptionId>,
    shared_registry: bool,
    device_params: DeviceParameters,
    required_level: FeatureLevel,

    update_required: Arc<AtomicBool>,
    clock: FrameClock,
    /// Time of the last [`draw_at`](Self::draw_at), `None` on the wall clock.
    injected_elapsed: Option<f32>,
    paused: bool,
    time_factor: f32,
    vsync: bool,
    use_sprite: bool,
    sprite: Option<SpriteLayer>,
    tick_listeners: Vec<TickListener>,
    host_window: Option<Arc<dyn HostWindow>>,

    capture: CaptureState,
    initialized: bool,
    disposed: bool,
}

impl<H: RenderHooks> RenderLoop<H> {
    pub fn new(hooks: H, settings: RendererSettings) -> Self {
        let required_level = hooks.feature_level();
        Self {
            hooks,
            surface: RenderSurfaceManager::new(&settings),
            registry: None,
            subscription: None,
            shared_registry: false,
            device_params: DeviceParameters::new(),
            required_level,
            update_required: Arc::new(AtomicBool::new(false)),
            clock: FrameClock::default(),
            injected_elapsed: None,
            paused: false,
            time_factor: settings.time_factor,
            vsync: settings.vsync,
            use_sprite: settings.use_sprite,
            sprite: None,
            tick_listeners: Vec::new(),
            host_window: None,
            capture: CaptureState {
                resolution_multiplier: 1.0,
                ..Default::default()
            },
            initialized: false,
            disposed: false,
        }
    }

    /// Parameters used when the renderer creates its own device.
    pub fn with_device_parameters(mut self, params: DeviceParameters) -> Self {
        self.device_params = params;
        self
    }

    // ---- initialization ----

    /// Create a device and render off-screen.
    pub fn initialize(&mut self) -> RenderResult<()> {
        self.check_uninitialized()?;
        let registry = self.create_registry()?;
        self.attach(registry, false, None)
    }

    /// Create a device and present to `output`.
    pub fn initialize_on_screen(&mut self, output: OutputHandle) -> RenderResult<()> {
        self.check_uninitialized()?;
        let registry = self.create_registry()?;
        self.attach(registry, false, Some(output))
    }

    /// Render off-screen with a registry owned by someone else.
    ///
    /// The registry and its device are not disposed with this renderer.
    pub fn initialize_shared(&mut self, registry: Arc<ResourceRegistry>) -> RenderResult<()> {
        self.check_uninitialized()?;
        if registry.is_disposed() {
            return Err(RenderError::Disposed);
        }
        self.check_feature_level(registry.device())?;
        self.attach(registry, true, None)
    }

    fn check_uninitialized(&self) -> RenderResult<()> {
        if self.disposed {
            Err(RenderError::Disposed)
        } else if self.initialized {
            Err(RenderError::AlreadyInitialized)
        } else {
            Ok(())
        }
    }

    fn check_feature_level(&self, device: &GraphicsDevice) -> RenderResult<()> {
        let actual = device.feature_level();
        if actual < self.required_level {
            return Err(RenderError::FeatureLevelUnsupported {
                required: self.required_level,
                actual,
            });
        }
        Ok(())
    }

    fn create_registry(&self) -> RenderResult<Arc<ResourceRegistry>> {
        let device = GraphicsDevice::new(&self.device_params)?;
        self.check_feature_level(&device)?;
        Ok(Arc::new(ResourceRegistry::new(device)))
    }

    fn attach(
        &mut self,
        registry: Arc<ResourceRegistry>,
        shared: bool,
        output: Option<OutputHandle>,
    ) -> RenderResult<()> {
        let device = Arc::clone(registry.device());
        self.surface.bind_device(device, self.required_level)?;
        if let Some(output) = output {
            self.surface.attach_output(output)?;
        }

        registry.set_time_factor(self.time_factor);
        let update_required = Arc::clone(&self.update_required);
        self.subscription = Some(registry.subscribe(move |event| {
            if event == RegistryEvent::UpdateRequired {
                update_required.store(true, Ordering::Release);
            }
        }));

        self.registry = Some(registry);
        self.shared_registry = shared;

        if let Err(e) = self.with_context(false, None, |hooks, ctx| hooks.initialize_resources(ctx))
        {
            log::error!("Renderer initialization failed: {e}");
            self.detach();
            return Err(e);
        }

        self.initialized = true;
        self.surface.set_dirty();
        log::info!(
            "Renderer initialized ({}, {}x{}, required level {:?})",
            match (shared, self.surface.has_swap_chain()) {
                (true, _) => "shared",
                (false, true) => "on-screen",
                (false, false) => "off-screen",
            },
            self.surface.width(),
            self.surface.height(),
            self.required_level
        );
        Ok(())
    }

    /// Undo a partial [`attach`](Self::attach).
    fn detach(&mut self) {
        self.surface.release_targets();
        if let Some(registry) = self.registry.take() {
            if let Some(id) = self.subscription.take() {
                registry.unsubscribe(id);
            }
            if self.shared_registry {
                self.surface.dispose_swap_chain();
            } else {
                let mut swap_chain = self.surface.take_swap_chain();
                registry.dispose(swap_chain.as_mut());
            }
        }
        self.surface.unbind_device();
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn ensure_active(&self) -> RenderResult<()> {
        if self.disposed {
            Err(RenderError::Disposed)
        } else if !self.initialized {
            Err(RenderError::NotInitialized)
        } else {
            Ok(())
        }
    }

    // ---- accessors ----

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    pub fn device(&self) -> RenderResult<&Arc<GraphicsDevice>> {
        self.surface.device()
    }

    pub fn registry(&self) -> RenderResult<&Arc<ResourceRegistry>> {
        self.registry.as_ref().ok_or(RenderError::NotInitialized)
    }

    /// Whether the registry belongs to another renderer.
    pub fn is_shared(&self) -> bool {
        self.shared_registry
    }

    pub fn surface(&self) -> &RenderSurfaceManager {
        &self.surface
    }

    pub fn render_target(&self) -> Option<&Arc<Texture>> {
        self.surface.render_target()
    }

    pub fn depth_target(&self) -> Option<&Arc<Texture>> {
        self.surface.depth_target()
    }

    pub fn sprite(&self) -> Option<&SpriteLayer> {
        self.sprite.as_ref()
    }

    // ---- drawing ----

    /// Draw a frame timed by the wall clock. Does nothing while paused.
    pub fn draw(&mut self) -> RenderResult<()> {
        if self.paused {
            return Ok(());
        }
        self.draw_inner(None, None, false)
    }

    /// Draw a frame at an explicit elapsed time in seconds.
    pub fn draw_at(&mut self, elapsed: f32) -> RenderResult<()> {
        if self.paused {
            return Ok(());
        }
        self.draw_inner(Some(elapsed), None, false)
    }

    fn draw_inner(
        &mut self,
        elapsed: Option<f32>,
        progress: Option<&dyn ProgressSink>,
        capturing: bool,
    ) -> RenderResult<()> {
        self.ensure_active()?;
        self.surface.clear_dirty();
        self.update_required.store(false, Ordering::Release);

        if self.surface.needs_resize() {
            self.apply_resize()?;
        }

        let device = Arc::clone(self.surface.device()?);
        let _lock = device.lock();

        if !capturing {
            self.injected_elapsed = elapsed;
        }
        let elapsed = elapsed.unwrap_or_else(|| {
            self.clock.start();
            self.clock.elapsed()
        });
        let dt = self.clock.tick_at(elapsed) * self.time_factor;
        if dt > 0.0 {
            self.on_tick(dt);
        }

        let viewport = self.surface.viewport();
        self.surface.set_active_viewport(viewport);
        self.with_context(capturing, progress, |hooks, ctx| hooks.draw_frame(ctx))?;

        if let Some(sprite) = &mut self.sprite
            && let Some(target) = self.surface.render_view()
        {
            sprite.flush(target, self.surface.resolution_multiplier() as f32)?;
        }

        self.surface.present(self.vsync)
    }

    fn on_tick(&mut self, dt: f32) {
        log::trace!("Tick dt={dt:.4}");
        self.hooks.on_tick(dt);
        if let Some(registry) = &self.registry {
            registry.on_tick(dt);
        }
        for listener in &mut self.tick_listeners {
            listener(dt);
        }
    }

    fn with_context<R>(
        &mut self,
        capturing: bool,
        progress: Option<&dyn ProgressSink>,
        f: impl FnOnce(&mut H, &mut FrameContext<'_>) -> RenderResult<R>,
    ) -> RenderResult<R> {
        let Self {
            hooks,
            surface,
            registry,
            sprite,
            use_sprite,
            required_level,
            ..
        } = self;
        let registry = registry.as_deref().ok_or(RenderError::NotInitialized)?;
        let mut ctx = FrameContext {
            registry,
            surface,
            sprite,
            sprite_allowed: *use_sprite && *required_level >= FeatureLevel::Level10_0,
            progress,
            capturing,
        };
        f(hooks, &mut ctx)
    }

    // ---- resizing ----

    /// Change the logical size and recreate the targets right away.
    pub fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        self.surface.set_size(width, height);
        if self.initialized && self.surface.needs_resize() {
            let device = Arc::clone(self.surface.device()?);
            let _lock = device.lock();
            self.apply_resize()?;
        }
        Ok(())
    }

    fn apply_resize(&mut self) -> RenderResult<()> {
        if !self.surface.resize()? {
            return Ok(());
        }
        self.with_context(false, None, |hooks, ctx| hooks.resize_resources(ctx))?;
        let width = self.surface.actual_width();
        let height = self.surface.actual_height();
        let sample = self.surface.sample_description();
        self.registry()?.on_resize(width, height, sample)
    }

    pub fn width(&self) -> u32 {
        self.surface.width()
    }

    pub fn height(&self) -> u32 {
        self.surface.height()
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.surface.set_size(width, height);
    }

    pub fn actual_width(&self) -> u32 {
        self.surface.actual_width()
    }

    pub fn actual_height(&self) -> u32 {
        self.surface.actual_height()
    }

    // ---- settings ----

    /// Whether a frame should be drawn: a setting changed or a collaborator
    /// asked for an update.
    pub fn is_dirty(&self) -> bool {
        self.surface.is_dirty() || self.update_required.load(Ordering::Acquire)
    }

    pub fn set_dirty(&mut self) {
        self.surface.set_dirty();
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Pausing stops [`draw`](Self::draw); the time spent paused is not
    /// counted as a frame delta.
    pub fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            self.paused = paused;
            if !paused {
                self.clock.reset_delta();
            }
        }
    }

    pub fn time_factor(&self) -> f32 {
        self.time_factor
    }

    pub fn set_time_factor(&mut self, time_factor: f32) {
        self.time_factor = time_factor;
        if let Some(registry) = &self.registry {
            registry.set_time_factor(time_factor);
        }
    }

    pub fn vsync(&self) -> bool {
        self.vsync
    }

    pub fn set_vsync(&mut self, vsync: bool) {
        self.vsync = vsync;
    }

    pub fn use_msaa(&self) -> bool {
        self.surface.use_msaa()
    }

    pub fn set_use_msaa(&mut self, enabled: bool) -> RenderResult<()> {
        self.surface.set_use_msaa(enabled)
    }

    pub fn msaa_sample_count(&self) -> u32 {
        self.surface.msaa_sample_count()
    }

    pub fn set_msaa_sample_count(&mut self, count: u32) -> RenderResult<()> {
        self.surface.set_msaa_sample_count(count)
    }

    pub fn resolution_multiplier(&self) -> f64 {
        self.surface.resolution_multiplier()
    }

    /// See [`RenderSurfaceManager::set_resolution_multiplier`].
    pub fn set_resolution_multiplier(&mut self, value: f64) -> RenderResult<()> {
        self.surface.set_resolution_multiplier(value)
    }

    pub fn use_ssaa(&self) -> bool {
        self.surface.use_ssaa()
    }

    pub fn set_use_ssaa(&mut self, enabled: bool) -> RenderResult<()> {
        self.surface.set_use_ssaa(enabled)
    }

    pub fn use_sprite(&self) -> bool {
        self.use_sprite
    }

    /// Disabling sprites drops the sprite layer.
    pub fn set_use_sprite(&mut self, enabled: bool) {
        self.use_sprite = enabled;
        if !enabled {
            self.sprite = None;
        }
    }

    pub fn is_fullscreen(&self) -> bool {
        self.surface.is_fullscreen()
    }

    /// Toggle the swap chain and then the host window. Off-screen renderers
    /// ignore this.
    pub fn toggle_fullscreen(&mut self) -> RenderResult<()> {
        if !self.surface.has_swap_chain() {
            return Ok(());
        }
        self.surface.toggle_fullscreen()?;
        let fullscreen = self.surface.is_fullscreen();
        log::debug!("Fullscreen {fullscreen}");
        if let Some(window) = self.host_window() {
            window.set_fullscreen(fullscreen);
        }
        Ok(())
    }

    // ---- timing ----

    /// Register a callback receiving the scaled delta of every tick.
    pub fn add_tick_listener(&mut self, listener: impl FnMut(f32) + Send + 'static) {
        self.tick_listeners.push(Box::new(listener));
    }

    pub fn frames(&self) -> u64 {
        self.clock.frame_count()
    }

    pub fn fps(&self) -> f32 {
        self.clock.fps()
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Forget time accumulated since the last frame.
    pub fn reset_delta(&mut self) {
        self.clock.reset_delta();
    }

    // ---- host window ----

    pub fn set_host_window(&mut self, window: Option<Arc<dyn HostWindow>>) {
        self.host_window = window;
    }

    /// The associated window, dropped once it reports itself dead.
    pub fn host_window(&mut self) -> Option<Arc<dyn HostWindow>> {
        if self.host_window.as_ref().is_some_and(|window| !window.is_alive()) {
            log::debug!("Host window is gone");
            self.host_window = None;
        }
        self.host_window.clone()
    }

    // ---- teardown ----

    /// Release everything the renderer owns. Safe to call more than once.
    pub fn dispose(&mut self) {
        if self.disposed {
            log::info!("Renderer already disposed");
            return;
        }
        self.disposed = true;
        if !self.initialized {
            return;
        }
        log::info!("Disposing renderer");

        self.hooks.dispose_resources();
        self.surface.release_targets();
        self.sprite = None;
        self.capture.buffers.release();
        self.tick_listeners.clear();

        let device = self.surface.device().ok().cloned();
        self.detach();
        self.initialized = false;

        if let Some(device) = device {
            let live = device.report_live_objects();
            if live > 0 {
                log::debug!("{live} device objects still alive after dispose");
            }
        }
    }
}

impl<H: RenderHooks> Drop for RenderLoop<H> {
    fn drop(&mut self) {
        if !self.disposed {
            self.dispose();
        }
    }
}
