//! Frame capture on top of the render loop.

use std::io::{Seek, Write};
use std::sync::Arc;

use super::{RenderHooks, RenderLoop};
use crate::capture::{
    CancellationToken, ProgressSink, ShotOutcome, ShotRequest, Subrange, encode_texture,
};
use crate::device::GraphicsDevice;
use crate::error::{RenderError, RenderResult};
use crate::helpers::{CopyHelper, DownsampleHelper};
use crate::resources::Texture;
use crate::types::{SampleDescription, Viewport};

fn check(cancel: Option<&CancellationToken>) -> RenderResult<()> {
    cancel.map_or(Ok(()), CancellationToken::check)
}

fn report(progress: Option<&dyn ProgressSink>, value: f64) {
    if let Some(progress) = progress {
        progress.report(value);
    }
}

impl<H: RenderHooks> RenderLoop<H> {
    /// Render one frame at the requested size and encode it to `writer`.
    ///
    /// The live size and resolution multiplier are restored afterwards,
    /// whether the capture succeeds, fails or is cancelled. When nothing
    /// but the size differs from the live frame, the live render target is
    /// reused and encoded directly.
    ///
    /// # Example
    ///
    /// ```
    /// use std::io::Cursor;
    /// use showroom_graphics::{DeviceParameters, RenderHooks, RenderLoop, RendererSettings, ShotRequest};
    ///
    /// struct Empty;
    /// impl RenderHooks for Empty {}
    ///
    /// let mut renderer = RenderLoop::new(Empty, RendererSettings::new().with_size(320, 240))
    ///     .with_device_parameters(DeviceParameters::dummy());
    /// renderer.initialize().unwrap();
    ///
    /// let mut png = Cursor::new(Vec::new());
    /// let outcome = renderer
    ///     .shot(&ShotRequest::new(64, 48).with_downscale(0.5), &mut png, None, None)
    ///     .unwrap();
    /// assert_eq!((outcome.width, outcome.height), (32, 24));
    /// assert_eq!(renderer.width(), 320);
    /// ```
    pub fn shot<W: Write + Seek>(
        &mut self,
        request: &ShotRequest,
        writer: &mut W,
        progress: Option<&dyn ProgressSink>,
        cancel: Option<&CancellationToken>,
    ) -> RenderResult<ShotOutcome> {
        request.validate()?;
        self.ensure_active()?;

        let device = Arc::clone(self.surface.device()?);
        let _lock = device.lock();

        self.capture.in_process += 1;
        let width = self.surface.width();
        let height = self.surface.height();
        let multiplier = self.surface.resolution_multiplier();
        let viewport = self.surface.active_viewport();
        log::debug!(
            "Shot {}x{} (downscale {}, crop {}, {:?})",
            request.width,
            request.height,
            request.downscale,
            request.crop,
            request.format
        );

        let result = self.shot_inner(&device, request, width, writer, progress, cancel);
        match &result {
            Ok(_) => report(progress, 1.0),
            Err(RenderError::Cancelled) => log::debug!("Shot cancelled"),
            Err(e) => log::error!("Shot failed: {e}"),
        }

        self.surface.set_size(width, height);
        self.surface.set_active_viewport(viewport);
        let restored = self.surface.set_resolution_multiplier(multiplier);
        self.capture.keep_hdr = false;
        self.capture.draw_in_process = false;
        self.capture.resolution_multiplier = 1.0;
        let resized = if self.surface.needs_resize() {
            self.apply_resize()
        } else {
            Ok(())
        };
        self.capture.in_process -= 1;

        let outcome = result?;
        restored?;
        resized?;
        Ok(outcome)
    }

    fn shot_inner<W: Write + Seek>(
        &mut self,
        device: &Arc<GraphicsDevice>,
        request: &ShotRequest,
        live_width: u32,
        writer: &mut W,
        progress: Option<&dyn ProgressSink>,
        cancel: Option<&CancellationToken>,
    ) -> RenderResult<ShotOutcome> {
        report(progress, 0.0);
        self.surface.set_size(request.width, request.height);
        self.surface.set_resolution_multiplier(1.0)?;
        self.capture.resolution_multiplier = if live_width > 0 {
            request.width as f64 / live_width as f64
        } else {
            1.0
        };
        self.capture.keep_hdr = request.format.is_hdr();
        check(cancel)?;

        let draw_progress = progress.map(|sink| Subrange::new(sink, 0.05, 0.9));
        let draw_progress = draw_progress.as_ref().map(|sink| sink as &dyn ProgressSink);

        if request.is_direct() && !self.surface.use_msaa() {
            if self.surface.needs_resize() {
                self.apply_resize()?;
            }
            self.draw_shot(None, draw_progress)?;
            check(cancel)?;

            let target = self
                .surface
                .render_target()
                .cloned()
                .ok_or(RenderError::NotInitialized)?;
            let (width, height) = target.size();
            self.capture.last_width = width;
            self.capture.last_height = height;
            encode_texture(device, &target, request.format, writer)?;
            return Ok(ShotOutcome {
                width,
                height,
                fast_path: true,
            });
        }

        let format = request.format.texture_format();
        let sample = self.surface.sample_description();
        let render_buffer = self.capture.buffers.render(format).resize(
            device,
            request.width,
            request.height,
            sample,
        )?;
        if self.surface.needs_resize() {
            self.apply_resize()?;
        }

        let had_swap_chain = self.surface.has_swap_chain();
        if had_swap_chain {
            self.surface.dispose_swap_chain();
        }

        let result = self.capture_offscreen(
            device,
            request,
            render_buffer,
            writer,
            draw_progress,
            cancel,
        );

        if had_swap_chain {
            let recreated = self.surface.recreate_swap_chain();
            match (&result, recreated) {
                (Ok(_), Err(e)) => return Err(e),
                (Err(_), Err(e)) => log::warn!("Swap chain recreation after failed shot: {e}"),
                _ => {}
            }
        }
        result
    }

    fn capture_offscreen<W: Write + Seek>(
        &mut self,
        device: &Arc<GraphicsDevice>,
        request: &ShotRequest,
        render_buffer: Arc<Texture>,
        writer: &mut W,
        progress: Option<&dyn ProgressSink>,
        cancel: Option<&CancellationToken>,
    ) -> RenderResult<ShotOutcome> {
        let format = render_buffer.format();
        let registry = Arc::clone(self.registry()?);

        self.draw_shot(Some(Arc::clone(&render_buffer)), progress)?;
        check(cancel)?;

        let mut current = render_buffer;
        if current.is_multisampled() {
            check(cancel)?;
            let (width, height) = current.size();
            let resolved = self.capture.buffers.resolve(format).resize(
                device,
                width,
                height,
                SampleDescription::SINGLE,
            )?;
            registry.get_helper::<CopyHelper>()?.draw(&current, &resolved)?;
            log::debug!("Shot resolved from {} samples", current.sample_count());
            current = resolved;
        }

        if request.downscale != 1.0 {
            check(cancel)?;
            let (width, height) = request.output_size();
            let downscaled = self.capture.buffers.downscale(format).resize(
                device,
                width,
                height,
                SampleDescription::SINGLE,
            )?;
            registry
                .get_helper::<DownsampleHelper>()?
                .draw(&current, &downscaled)?;
            log::debug!("Shot downscaled to {}x{}", width, height);
            current = downscaled;
        }

        if request.crop != 1.0 {
            check(cancel)?;
            let (width, height) = request.final_size();
            let cropped = self.capture.buffers.crop(format).resize(
                device,
                width,
                height,
                SampleDescription::SINGLE,
            )?;
            self.surface
                .set_active_viewport(Viewport::from_dimensions(width, height));
            registry
                .get_helper::<CopyHelper>()?
                .cut(&current, &cropped, request.crop as f32)?;
            log::debug!("Shot cropped to {}x{}", width, height);
            current = cropped;
        }

        check(cancel)?;
        let (width, height) = current.size();
        self.capture.last_width = width;
        self.capture.last_height = height;
        encode_texture(device, &current, request.format, writer)?;
        Ok(ShotOutcome {
            width,
            height,
            fast_path: false,
        })
    }

    /// Draw one frame, optionally into `view` instead of the render target.
    ///
    /// A renderer driven by [`draw_at`](Self::draw_at) draws the capture at
    /// its last injected time, so no scene time passes.
    fn draw_shot(
        &mut self,
        view: Option<Arc<Texture>>,
        progress: Option<&dyn ProgressSink>,
    ) -> RenderResult<()> {
        self.capture.draw_in_process = true;
        let token = self.surface.replace_render_view(view);
        let result = self.draw_inner(self.injected_elapsed, progress, true);
        self.surface.restore_render_view(token);
        self.capture.draw_in_process = false;
        result
    }

    /// Whether a capture is running.
    pub fn shot_in_process(&self) -> bool {
        self.capture.in_process > 0
    }

    /// Whether the running capture is drawing its frame.
    pub fn shot_draw_in_process(&self) -> bool {
        self.capture.draw_in_process
    }

    /// Capture width relative to the live width, 1 outside captures.
    pub fn shot_resolution_multiplier(&self) -> f64 {
        self.capture.resolution_multiplier
    }

    /// Whether the running capture keeps values outside 0..1.
    pub fn shot_keep_hdr(&self) -> bool {
        self.capture.keep_hdr
    }

    /// Width of the last encoded capture.
    pub fn last_shot_width(&self) -> u32 {
        self.capture.last_width
    }

    /// Height of the last encoded capture.
    pub fn last_shot_height(&self) -> u32 {
        self.capture.last_height
    }

    /// Number of capture buffers currently allocated.
    pub fn capture_buffer_count(&self) -> usize {
        self.capture.buffers.allocated()
    }
}
