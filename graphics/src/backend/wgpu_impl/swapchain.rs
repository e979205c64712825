//! wgpu surface implementation of the swap chain.
//!
//! The renderer draws into its own back buffer texture; presenting resolves
//! or blits that texture into the acquired surface image.

use parking_lot::Mutex;

use super::WgpuBackend;
use super::conversion::{convert_texture_format, texture_format_from_wgpu};
use crate::backend::{GpuSwapChain, GpuTexture};
use crate::error::{RenderError, RenderResult};
use crate::swapchain::{OutputHandle, SwapChainDescriptor};
use crate::types::{Region, TextureDescriptor, TextureFormat};

/// A configured wgpu surface.
pub struct WgpuSwapChain {
    surface: wgpu::Surface<'static>,
    config: Mutex<wgpu::SurfaceConfiguration>,
    format: TextureFormat,
}

impl std::fmt::Debug for WgpuSwapChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let config = self.config.lock();
        f.debug_struct("WgpuSwapChain")
            .field("format", &self.format)
            .field("width", &config.width)
            .field("height", &config.height)
            .field("present_mode", &config.present_mode)
            .finish()
    }
}

impl WgpuSwapChain {
    /// Format of the presentable images.
    pub fn format(&self) -> TextureFormat {
        self.format
    }
}

fn present_mode(vsync: bool) -> wgpu::PresentMode {
    if vsync {
        wgpu::PresentMode::Fifo
    } else {
        wgpu::PresentMode::AutoNoVsync
    }
}

fn wgpu_swap_chain(swap_chain: &GpuSwapChain) -> RenderResult<&WgpuSwapChain> {
    match swap_chain {
        GpuSwapChain::Wgpu(swap_chain) => Ok(swap_chain),
        _ => Err(RenderError::Backend(
            "wgpu backend called with non-Wgpu swap chain".to_string(),
        )),
    }
}

impl WgpuBackend {
    pub fn create_swap_chain(
        &self,
        output: &OutputHandle,
        descriptor: &SwapChainDescriptor,
        width: u32,
        height: u32,
    ) -> RenderResult<GpuSwapChain> {
        // SAFETY: OutputHandle::from_raw requires the window to outlive every
        // swap chain created from the handle.
        let target = unsafe { wgpu::SurfaceTargetUnsafe::from_window(output) }
            .map_err(|e| RenderError::SwapChain(format!("invalid output handle: {e}")))?;
        let surface = unsafe { self.instance.create_surface_unsafe(target) }
            .map_err(|e| RenderError::SwapChain(format!("failed to create surface: {e}")))?;

        let capabilities = surface.get_capabilities(&self.adapter);
        let preferred = convert_texture_format(descriptor.format);
        let format = if capabilities.formats.contains(&preferred) {
            preferred
        } else {
            capabilities
                .formats
                .iter()
                .copied()
                .find(|format| texture_format_from_wgpu(*format).is_some())
                .ok_or_else(|| {
                    RenderError::SwapChain(format!(
                        "surface supports none of the renderer formats: {:?}",
                        capabilities.formats
                    ))
                })?
        };
        let renderer_format = texture_format_from_wgpu(format).unwrap_or(descriptor.format);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: descriptor.buffer_count.max(1),
        };
        surface.configure(&self.device, &config);
        log::info!(
            "Configured wgpu surface {}x{} ({:?})",
            config.width,
            config.height,
            format
        );

        Ok(GpuSwapChain::Wgpu(std::sync::Arc::new(WgpuSwapChain {
            surface,
            config: Mutex::new(config),
            format: renderer_format,
        })))
    }

    pub fn resize_swap_chain(
        &self,
        swap_chain: &GpuSwapChain,
        width: u32,
        height: u32,
    ) -> RenderResult<()> {
        let swap_chain = wgpu_swap_chain(swap_chain)?;
        let mut config = swap_chain.config.lock();
        config.width = width.max(1);
        config.height = height.max(1);
        swap_chain.surface.configure(&self.device, &config);
        Ok(())
    }

    pub fn present(
        &self,
        swap_chain: &GpuSwapChain,
        back_buffer: &GpuTexture,
        back_buffer_desc: &TextureDescriptor,
        vsync: bool,
    ) -> RenderResult<()> {
        let swap_chain = wgpu_swap_chain(swap_chain)?;
        let GpuTexture::Wgpu {
            view: back_view, ..
        } = back_buffer
        else {
            return Err(RenderError::Backend(
                "present called with non-Wgpu back buffer".to_string(),
            ));
        };

        let format = {
            let mut config = swap_chain.config.lock();
            let mode = present_mode(vsync);
            if config.present_mode != mode {
                config.present_mode = mode;
                swap_chain.surface.configure(&self.device, &config);
            }
            config.format
        };

        let frame = match swap_chain.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(e) => {
                // Outdated or lost surfaces recover after a reconfigure
                log::debug!("Reconfiguring surface after acquire failure: {e}");
                swap_chain
                    .surface
                    .configure(&self.device, &swap_chain.config.lock());
                swap_chain.surface.get_current_texture().map_err(|e| {
                    RenderError::SwapChain(format!("Failed to acquire surface texture: {e}"))
                })?
            }
        };
        let frame_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.encoder_for_present();
        if back_buffer_desc.sample_count > 1 {
            self.encode_resolve(&mut encoder, back_view, &frame_view);
        } else {
            self.encode_blit(
                &mut encoder,
                back_view,
                Region::full(back_buffer_desc.width, back_buffer_desc.height),
                &frame_view,
                format,
                (frame.texture.width(), frame.texture.height()),
            );
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn encoder_for_present(&self) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Present Encoder"),
            })
    }
}
