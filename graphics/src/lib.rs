//! # Showroom Graphics
//!
//! Renderer core for the showroom: device and swap-chain lifecycle, a
//! dirty-driven render loop and an off-screen frame capture pipeline.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`GraphicsDevice`] - GPU device with resource creation and tracking
//! - [`ResourceRegistry`] - Effects, helpers, named slots and shared resources
//! - [`RenderSurfaceManager`] - Render/depth targets, resolution multiplier, MSAA
//! - [`RenderLoop`] - Initialization, frame ticking, drawing and disposal
//! - [`RenderLoop::shot`] - Capture at any size, downscale, crop and format
//! - [`FrameClock`] - Frame deltas and FPS over a rolling window
//! - Multiple backend support: wgpu and Dummy (for testing)
//!
//! Scene content is supplied through [`RenderHooks`].
//!
//! ## Example
//!
//! ```
//! use std::io::Cursor;
//! use showroom_graphics::{
//!     Color, DeviceParameters, FrameContext, RenderHooks, RenderLoop, RenderResult,
//!     RendererSettings, ShotRequest,
//! };
//!
//! struct Scene;
//!
//! impl RenderHooks for Scene {
//!     fn draw_frame(&mut self, ctx: &mut FrameContext<'_>) -> RenderResult<()> {
//!         ctx.clear(Color::WHITE)
//!     }
//! }
//!
//! let mut renderer = RenderLoop::new(Scene, RendererSettings::new().with_size(640, 360))
//!     .with_device_parameters(DeviceParameters::dummy());
//! renderer.initialize()?;
//! renderer.draw()?;
//!
//! let mut png = Cursor::new(Vec::new());
//! renderer.shot(&ShotRequest::new(1280, 720), &mut png, None, None)?;
//! renderer.dispose();
//! # Ok::<(), showroom_graphics::RenderError>(())
//! ```

pub mod backend;
pub mod capture;
pub mod clock;
pub mod device;
pub mod error;
pub mod helpers;
pub mod registry;
pub mod renderer;
pub mod resources;
pub mod settings;
pub mod sprite;
pub mod surface;
pub mod swapchain;
pub mod target;
pub mod types;

// Re-export main types for convenience
pub use backend::{GpuBackend, GpuTexture};
pub use capture::{
    CancellationToken, ProgressSink, ShotFormat, ShotOutcome, ShotRequest, Subrange,
    encode_texture,
};
pub use clock::FrameClock;
pub use device::{AdapterInfo, BackendType, DeviceParameters, FeatureLevel, GraphicsDevice};
pub use error::{RenderError, RenderResult};
pub use helpers::{CopyHelper, DownsampleHelper};
pub use registry::{
    CommonStates, Disposable, Effect, QuadBuffers, RegistryEvent, RenderHelper,
    ResourceRegistry, ScreenSizeEffect, SubscriptionId,
};
pub use renderer::{FrameContext, HostWindow, RenderHooks, RenderLoop};
pub use resources::{Buffer, Sampler, Texture};
pub use settings::RendererSettings;
pub use sprite::SpriteLayer;
pub use surface::{RenderSurfaceManager, RenderViewToken};
pub use swapchain::{OutputHandle, SwapChain, SwapChainDescriptor, SwapEffect};
pub use target::TargetTexture;
pub use types::{
    BufferDescriptor, BufferUsage, Color, Rect, Region, SampleDescription, SamplerDescriptor,
    TextureDescriptor, TextureFormat, TextureUsage, Viewport,
};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
///
/// This should be called before using any graphics functionality.
pub fn init() {
    log::info!("Showroom Graphics v{} initialized", VERSION);
}
