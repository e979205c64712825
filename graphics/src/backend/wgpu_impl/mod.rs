//! wgpu GPU backend implementation.
//!
//! This backend uses wgpu for cross-platform GPU access, supporting
//! Vulkan, Metal, DX12 and GL.

pub(crate) mod conversion;
mod passes;
mod resources;
mod swapchain;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

pub use swapchain::WgpuSwapChain;

use crate::device::{AdapterInfo, DeviceParameters, FeatureLevel};
use crate::error::{RenderError, RenderResult};
use crate::types::TextureFormat;

use self::conversion::convert_texture_format;
use self::passes::PipelineKind;

/// wgpu-based GPU backend.
pub struct WgpuBackend {
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    feature_level: FeatureLevel,
    adapter_specific_formats: bool,
    blit_shader: wgpu::ShaderModule,
    fill_shader: wgpu::ShaderModule,
    blit_layout: wgpu::BindGroupLayout,
    fill_layout: wgpu::BindGroupLayout,
    pipelines: Mutex<HashMap<(PipelineKind, wgpu::TextureFormat, u32), Arc<wgpu::RenderPipeline>>>,
}

impl std::fmt::Debug for WgpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuBackend")
            .field("adapter", &self.adapter.get_info().name)
            .field("feature_level", &self.feature_level)
            .finish()
    }
}

impl WgpuBackend {
    /// Create a new wgpu backend with the given parameters.
    pub fn new(params: &DeviceParameters) -> RenderResult<Self> {
        // Configure instance flags based on debug settings
        let mut flags = wgpu::InstanceFlags::default();
        if params.debug_resources {
            flags |= wgpu::InstanceFlags::DEBUG;
            flags |= wgpu::InstanceFlags::VALIDATION;
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags,
            backend_options: wgpu::BackendOptions::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
        });

        // Request adapter
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| RenderError::DeviceCreationFailed(format!("No compatible GPU adapter: {e}")))?;

        log::info!("wgpu adapter: {:?}", adapter.get_info());

        // Per-format sample counts beyond the WebGPU baseline need this feature
        let required_features =
            adapter.features() & wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some(params.label.as_str()),
            required_features,
            required_limits: adapter.limits(),
            memory_hints: wgpu::MemoryHints::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| RenderError::DeviceCreationFailed(format!("Device creation failed: {e}")))?;

        let feature_level = feature_level_of(&adapter);
        let (blit_shader, blit_layout) = passes::create_blit_resources(&device);
        let (fill_shader, fill_layout) = passes::create_fill_resources(&device);

        Ok(Self {
            instance,
            adapter,
            device: Arc::new(device),
            queue: Arc::new(queue),
            feature_level,
            adapter_specific_formats: !required_features.is_empty(),
            blit_shader,
            fill_shader,
            blit_layout,
            fill_layout,
            pipelines: Mutex::new(HashMap::new()),
        })
    }

    /// Get the wgpu device.
    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    /// Get the wgpu queue.
    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    /// Get the backend name.
    pub fn name(&self) -> &'static str {
        "wgpu Backend"
    }

    pub fn adapter_info(&self) -> AdapterInfo {
        let info = self.adapter.get_info();
        AdapterInfo {
            name: info.name,
            backend: format!("{:?}", info.backend),
            dedicated_video_memory: None,
        }
    }

    pub fn feature_level(&self) -> FeatureLevel {
        self.feature_level
    }

    pub fn supports_sample_count(&self, format: TextureFormat, count: u32) -> bool {
        if count == 1 {
            return true;
        }
        let format = convert_texture_format(format);
        if self.adapter_specific_formats {
            self.adapter
                .get_texture_format_features(format)
                .flags
                .sample_count_supported(count)
        } else {
            // WebGPU guarantees 4x for renderable formats except 32-bit float
            count == 4 && format != wgpu::TextureFormat::Rgba32Float
        }
    }

    /// Wait for all submitted work.
    pub fn flush(&self) {
        let _ = self.device.poll(wgpu::PollType::wait_indefinitely());
    }

    fn submit(&self, encoder: wgpu::CommandEncoder) {
        self.queue.submit(std::iter::once(encoder.finish()));
    }
}

/// Map the adapter's downlevel capabilities onto the renderer's tiers.
fn feature_level_of(adapter: &wgpu::Adapter) -> FeatureLevel {
    let capabilities = adapter.get_downlevel_capabilities();
    if capabilities.is_webgpu_compliant() {
        FeatureLevel::Level11_0
    } else if capabilities
        .flags
        .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
    {
        FeatureLevel::Level10_1
    } else if capabilities
        .flags
        .contains(wgpu::DownlevelFlags::INDEPENDENT_BLEND)
    {
        FeatureLevel::Level10_0
    } else {
        FeatureLevel::Level9_3
    }
}
