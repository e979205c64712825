//! Render helpers used by the capture pipeline.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{RenderError, RenderResult};
use crate::registry::{RenderHelper, ResourceRegistry};
use crate::resources::Texture;
use crate::target::TargetTexture;
use crate::types::{Region, SampleDescription};

/// Copies between targets: plain copy, MSAA resolve and centered cut.
#[derive(Debug, Default)]
pub struct CopyHelper;

impl RenderHelper for CopyHelper {
    fn on_initialize(&mut self, _registry: &ResourceRegistry) -> RenderResult<()> {
        Ok(())
    }

    fn on_resize(&self, _registry: &ResourceRegistry) -> RenderResult<()> {
        Ok(())
    }
}

impl CopyHelper {
    /// Copy `source` into `destination`, resolving samples if needed.
    pub fn draw(&self, source: &Texture, destination: &Texture) -> RenderResult<()> {
        let device = source.device();
        if source.is_multisampled() && source.size() == destination.size() {
            device.resolve(source, destination)
        } else if source.is_multisampled() {
            Err(RenderError::InvalidParameter(
                "multisampled copies must keep the size".to_string(),
            ))
        } else {
            let (width, height) = source.size();
            device.blit(source, Region::full(width, height), destination)
        }
    }

    /// Stretch the centered fraction `keep` of `source` over `destination`.
    pub fn cut(&self, source: &Texture, destination: &Texture, keep: f32) -> RenderResult<()> {
        if !(keep > 0.0 && keep <= 1.0) {
            return Err(RenderError::InvalidParameter(format!(
                "crop factor {keep} out of (0, 1]"
            )));
        }
        let (width, height) = source.size();
        source
            .device()
            .blit(source, Region::centered(width, height, keep), destination)
    }
}

/// Box-filter downsampler that halves in steps for large ratios.
#[derive(Debug, Default)]
pub struct DownsampleHelper {
    steps: Mutex<Vec<TargetTexture>>,
}

impl RenderHelper for DownsampleHelper {
    fn on_initialize(&mut self, _registry: &ResourceRegistry) -> RenderResult<()> {
        Ok(())
    }

    fn on_resize(&self, _registry: &ResourceRegistry) -> RenderResult<()> {
        self.steps.lock().clear();
        Ok(())
    }

    fn dispose(&self) {
        self.steps.lock().clear();
    }
}

impl DownsampleHelper {
    /// Downsample all of `source` into `destination`.
    pub fn draw(&self, source: &Arc<Texture>, destination: &Texture) -> RenderResult<()> {
        let device = source.device();
        let (target_width, target_height) = destination.size();
        let mut current = source.clone();
        let mut steps = self.steps.lock();

        let mut index = 0;
        while current.width() >= target_width * 4 || current.height() >= target_height * 4 {
            let width = current.width().div_ceil(2).max(target_width);
            let height = current.height().div_ceil(2).max(target_height);
            if steps.len() == index || steps[index].format() != source.format() {
                steps.truncate(index);
                steps.push(TargetTexture::new(source.format(), "downsample step"));
            }
            let step = steps[index].resize(device, width, height, SampleDescription::SINGLE)?;
            device.blit(&current, Region::full(current.width(), current.height()), &step)?;
            current = step;
            index += 1;
        }

        device.blit(
            &current,
            Region::full(current.width(), current.height()),
            destination,
        )
    }

    /// Number of cached intermediate targets.
    pub fn step_count(&self) -> usize {
        self.steps.lock().len()
    }
}
