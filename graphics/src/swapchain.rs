//! Swap chain management.
//!
//! A [`SwapChain`] binds a [`GraphicsDevice`] to an output window. It owns the
//! back buffer the renderer draws into and presents it on request. The back
//! buffer carries the swap chain's sample description, so a sampling change
//! means a new swap chain: buffers cannot be resampled in place.
//!
//! # Example
//!
//! ```ignore
//! let output = unsafe { OutputHandle::from_window(&window)? };
//! let mut swap_chain = SwapChain::new(
//!     device.clone(),
//!     output,
//!     SwapChainDescriptor::default(),
//!     1280,
//!     720,
//! )?;
//!
//! // In render loop:
//! device.clear_color(&swap_chain.back_buffer()?, Color::DARK_CYAN)?;
//! swap_chain.present(true)?;
//! ```

use std::sync::Arc;

use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, RawDisplayHandle,
    RawWindowHandle, WebDisplayHandle, WebWindowHandle, WindowHandle,
};

use crate::backend::GpuSwapChain;
use crate::device::GraphicsDevice;
use crate::error::{RenderError, RenderResult};
use crate::resources::Texture;
use crate::types::{SampleDescription, TextureDescriptor, TextureFormat, TextureUsage};

/// Opaque platform handle of the window a swap chain presents to.
///
/// This is the only coupling between the renderer and the host window system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputHandle {
    window: RawWindowHandle,
    display: RawDisplayHandle,
}

impl OutputHandle {
    /// Wrap raw platform handles.
    ///
    /// # Safety
    ///
    /// The window behind the handles must stay alive for as long as any swap
    /// chain created from this handle.
    pub unsafe fn from_raw(window: RawWindowHandle, display: RawDisplayHandle) -> Self {
        Self { window, display }
    }

    /// Capture the raw handles of a window.
    ///
    /// # Safety
    ///
    /// Same contract as [`OutputHandle::from_raw`].
    pub unsafe fn from_window<W>(window: &W) -> RenderResult<Self>
    where
        W: HasWindowHandle + HasDisplayHandle + ?Sized,
    {
        let window_handle = window
            .window_handle()
            .map_err(|e| RenderError::SwapChain(format!("window handle unavailable: {e}")))?;
        let display_handle = window
            .display_handle()
            .map_err(|e| RenderError::SwapChain(format!("display handle unavailable: {e}")))?;
        Ok(Self {
            window: window_handle.as_raw(),
            display: display_handle.as_raw(),
        })
    }

    /// A handle that refers to no real window.
    ///
    /// Only backends that do not touch the platform window (the dummy
    /// backend) can create swap chains from it.
    pub fn detached(id: u32) -> Self {
        Self {
            window: RawWindowHandle::Web(WebWindowHandle::new(id)),
            display: RawDisplayHandle::Web(WebDisplayHandle::new()),
        }
    }

    /// The raw window handle.
    pub fn raw_window(&self) -> RawWindowHandle {
        self.window
    }
}

impl HasWindowHandle for OutputHandle {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        // SAFETY: validity is guaranteed by the constructor contract
        Ok(unsafe { WindowHandle::borrow_raw(self.window) })
    }
}

impl HasDisplayHandle for OutputHandle {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        // SAFETY: validity is guaranteed by the constructor contract
        Ok(unsafe { DisplayHandle::borrow_raw(self.display) })
    }
}

// SAFETY: raw handles are plain identifiers; the constructor contract keeps
// the window alive while they are in use.
unsafe impl Send for OutputHandle {}
unsafe impl Sync for OutputHandle {}

/// How presented buffers are treated after display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SwapEffect {
    /// Contents are discarded after presentation.
    #[default]
    Discard,
    /// Contents are preserved in presentation order.
    Sequential,
}

/// Description of a swap chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapChainDescriptor {
    /// Number of buffers in the chain.
    pub buffer_count: u32,
    /// Format of the presentable buffers.
    pub format: TextureFormat,
    /// Sample description of the back buffer.
    pub sample: SampleDescription,
    /// Buffer treatment after presentation.
    pub swap_effect: SwapEffect,
    /// Whether the chain starts windowed.
    pub windowed: bool,
}

impl Default for SwapChainDescriptor {
    fn default() -> Self {
        Self {
            buffer_count: 2,
            format: TextureFormat::Bgra8Unorm,
            sample: SampleDescription::SINGLE,
            swap_effect: SwapEffect::Discard,
            windowed: true,
        }
    }
}

impl SwapChainDescriptor {
    /// Set the sample description.
    pub fn with_sample(mut self, sample: SampleDescription) -> Self {
        self.sample = sample;
        self
    }
}

/// A chain of presentable buffers bound to one output window.
pub struct SwapChain {
    device: Arc<GraphicsDevice>,
    output: OutputHandle,
    descriptor: SwapChainDescriptor,
    handle: Option<GpuSwapChain>,
    back_buffer: Option<Arc<Texture>>,
    width: u32,
    height: u32,
    fullscreen: bool,
}

impl SwapChain {
    /// Create a swap chain presenting to `output`.
    pub fn new(
        device: Arc<GraphicsDevice>,
        output: OutputHandle,
        descriptor: SwapChainDescriptor,
        width: u32,
        height: u32,
    ) -> RenderResult<Self> {
        let width = width.max(1);
        let height = height.max(1);
        let handle = device
            .backend()
            .create_swap_chain(&output, &descriptor, width, height)?;
        device.on_swap_chain_created();
        log::debug!(
            "Created swap chain {}x{} ({} buffers, {:?}, {}x MSAA)",
            width,
            height,
            descriptor.buffer_count,
            handle.format(),
            descriptor.sample.count
        );

        let mut swap_chain = Self {
            device,
            output,
            descriptor,
            handle: Some(handle),
            back_buffer: None,
            width,
            height,
            fullscreen: !descriptor.windowed,
        };
        swap_chain.back_buffer = Some(swap_chain.create_back_buffer()?);
        Ok(swap_chain)
    }

    fn create_back_buffer(&self) -> RenderResult<Arc<Texture>> {
        let format = self
            .handle
            .as_ref()
            .map(GpuSwapChain::format)
            .unwrap_or(self.descriptor.format);
        self.device.create_texture(
            &TextureDescriptor::new_2d(self.width, self.height, format, TextureUsage::TARGET)
                .with_sample_count(self.descriptor.sample.count)
                .with_label("swap chain back buffer"),
        )
    }

    fn handle(&self) -> RenderResult<&GpuSwapChain> {
        self.handle.as_ref().ok_or(RenderError::Disposed)
    }

    /// The descriptor this swap chain was created with.
    pub fn descriptor(&self) -> &SwapChainDescriptor {
        &self.descriptor
    }

    /// The output window.
    pub fn output(&self) -> &OutputHandle {
        &self.output
    }

    /// Format of the back buffer.
    pub fn format(&self) -> TextureFormat {
        self.handle
            .as_ref()
            .map(GpuSwapChain::format)
            .unwrap_or(self.descriptor.format)
    }

    /// Current buffer size.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Buffer 0, the texture frames are drawn into.
    pub fn back_buffer(&self) -> RenderResult<Arc<Texture>> {
        self.back_buffer.clone().ok_or(RenderError::Disposed)
    }

    /// Whether the swap chain has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.handle.is_none()
    }

    /// Resize every buffer in the chain.
    pub fn resize_buffers(&mut self, width: u32, height: u32) -> RenderResult<()> {
        let handle = self.handle()?.clone();
        // Release the old back buffer before the chain reallocates
        self.back_buffer = None;
        self.device
            .backend()
            .resize_swap_chain(&handle, width, height)?;
        self.width = width;
        self.height = height;
        self.back_buffer = Some(self.create_back_buffer()?);
        log::debug!("Resized swap chain buffers to {}x{}", width, height);
        Ok(())
    }

    /// Show the back buffer on the output window.
    pub fn present(&self, vsync: bool) -> RenderResult<()> {
        let handle = self.handle()?;
        let back_buffer = self.back_buffer.as_ref().ok_or(RenderError::Disposed)?;
        self.device.backend().present(
            handle,
            back_buffer.gpu_handle(),
            back_buffer.descriptor(),
            vsync,
        )?;
        self.device.on_frame_presented();
        Ok(())
    }

    /// Whether the chain is in fullscreen state.
    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Enter or leave fullscreen state.
    ///
    /// Only the chain's state changes; the window itself is switched by the
    /// host through [`HostWindow::set_fullscreen`](crate::HostWindow::set_fullscreen).
    pub fn set_fullscreen(&mut self, fullscreen: bool) -> RenderResult<()> {
        self.handle()?;
        if self.fullscreen != fullscreen {
            log::debug!("Swap chain fullscreen: {}", fullscreen);
            self.fullscreen = fullscreen;
        }
        Ok(())
    }

    /// Release the chain and its back buffer.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Disposed`] if the chain was already released.
    pub fn dispose(&mut self) -> RenderResult<()> {
        if self.handle.take().is_none() {
            return Err(RenderError::Disposed);
        }
        self.back_buffer = None;
        self.device.on_swap_chain_released();
        log::debug!("Disposed swap chain");
        Ok(())
    }
}

impl Drop for SwapChain {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.dispose();
        }
    }
}

impl std::fmt::Debug for SwapChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwapChain")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("descriptor", &self.descriptor)
            .field("fullscreen", &self.fullscreen)
            .finish()
    }
}

static_assertions::assert_impl_all!(SwapChain: Send, Sync);
