//! Common utilities for integration tests.
//!
//! Tests are parameterized over [`Backend`] with `rstest`. The dummy backend
//! is always available; the wgpu backend needs a GPU and only runs when
//! `SHOWROOM_GPU_TESTS` is set.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use showroom_graphics::{
    BackendType, Color, DeviceParameters, Effect, FrameContext, GraphicsDevice, Rect,
    RenderHooks, RenderLoop, RenderResult, RendererSettings,
};

// ============================================================================
// Backend Enumeration
// ============================================================================

/// Available GPU backends for testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Dummy backend (CPU texel store).
    Dummy,
    /// WebGPU backend (via wgpu).
    WebGpu,
}

impl Backend {
    /// Check if this backend is currently available.
    pub fn is_available(&self) -> bool {
        match self {
            Backend::Dummy => true,
            #[cfg(feature = "wgpu-backend")]
            Backend::WebGpu => std::env::var_os("SHOWROOM_GPU_TESTS").is_some(),
            #[cfg(not(feature = "wgpu-backend"))]
            Backend::WebGpu => false,
        }
    }

    pub fn device_parameters(&self) -> DeviceParameters {
        match self {
            Backend::Dummy => DeviceParameters::dummy(),
            Backend::WebGpu => DeviceParameters::new()
                .with_backend(BackendType::Wgpu)
                .with_label("integration tests"),
        }
    }
}

/// Create a device, or `None` if the backend cannot run here.
pub fn create_device(backend: Backend) -> Option<Arc<GraphicsDevice>> {
    if !backend.is_available() {
        return None;
    }
    match GraphicsDevice::new(&backend.device_parameters()) {
        Ok(device) => Some(device),
        Err(e) => {
            eprintln!("Failed to create {:?} device: {}", backend, e);
            None
        }
    }
}

// ============================================================================
// Test Scene
// ============================================================================

/// Scene that paints the left half of the frame red and the right half blue.
///
/// Counts hook invocations so tests can assert on the frame flow.
#[derive(Default)]
pub struct SplitScene {
    pub resizes: usize,
    pub ticks: Vec<f32>,
    pub frames: usize,
    pub fail_draw: bool,
}

pub const LEFT: [u8; 4] = [255, 0, 0, 255];
pub const RIGHT: [u8; 4] = [0, 0, 255, 255];

impl RenderHooks for SplitScene {
    fn resize_resources(&mut self, _ctx: &mut FrameContext<'_>) -> RenderResult<()> {
        self.resizes += 1;
        Ok(())
    }

    fn on_tick(&mut self, dt: f32) {
        self.ticks.push(dt);
    }

    fn draw_frame(&mut self, ctx: &mut FrameContext<'_>) -> RenderResult<()> {
        if self.fail_draw {
            return Err(showroom_graphics::RenderError::Backend(
                "scene failed to draw".to_string(),
            ));
        }
        let target = ctx.render_target()?;
        let (width, height) = target.size();
        ctx.clear_depth(1.0)?;
        ctx.clear(Color::new(0.0, 0.0, 1.0, 1.0))?;
        ctx.device().fill_rect(
            target,
            Rect::new(0, 0, width / 2, height),
            Color::new(1.0, 0.0, 0.0, 1.0),
        )?;
        self.frames += 1;
        Ok(())
    }
}

/// An initialized off-screen renderer, or `None` if the backend cannot run.
pub fn create_renderer(
    backend: Backend,
    settings: RendererSettings,
) -> Option<RenderLoop<SplitScene>> {
    if !backend.is_available() {
        return None;
    }
    let mut renderer = RenderLoop::new(SplitScene::default(), settings)
        .with_device_parameters(backend.device_parameters());
    match renderer.initialize() {
        Ok(()) => Some(renderer),
        Err(e) => {
            eprintln!("Failed to initialize {:?} renderer: {}", backend, e);
            None
        }
    }
}

/// Decode an encoded capture.
pub fn decode(out: Cursor<Vec<u8>>) -> image::DynamicImage {
    image::load_from_memory(&out.into_inner()).expect("capture should decode")
}

// ============================================================================
// Counting Effect
// ============================================================================

/// Effect counting how often it was initialized and disposed.
#[derive(Default)]
pub struct CountingEffect {
    pub initialized: usize,
    pub disposed: Arc<AtomicUsize>,
}

impl Effect for CountingEffect {
    fn initialize(&mut self, _device: &Arc<GraphicsDevice>) -> RenderResult<()> {
        self.initialized += 1;
        Ok(())
    }

    fn dispose(&self) {
        self.disposed.fetch_add(1, Ordering::SeqCst);
    }
}
