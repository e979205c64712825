//! Graphics device.
//!
//! The [`GraphicsDevice`] owns the GPU backend and is the main interface for
//! creating resources and issuing the handful of operations the renderer core
//! needs: clears, fills, resolves, blits, readback and presentation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};

use crate::backend::GpuBackend;
use crate::error::{RenderError, RenderResult};
use crate::resources::{Buffer, Sampler, Texture};
use crate::types::{
    BufferDescriptor, Color, Rect, Region, SampleDescription, SamplerDescriptor,
    TextureDescriptor, TextureFormat,
};

/// Largest texture dimension the renderer will allocate.
pub const MAX_TEXTURE_DIMENSION: u32 = 16384;

/// Sample counts tried, highest first, when a multisample request is clamped.
const SAMPLE_COUNT_FALLBACK: [u32; 4] = [8, 4, 2, 1];

/// GPU capability tier, ordered from least to most capable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum FeatureLevel {
    Level9_3,
    Level10_0,
    Level10_1,
    #[default]
    Level11_0,
    Level11_1,
}

/// Backend selection for device creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackendType {
    /// Use wgpu when an adapter is available, otherwise the dummy backend.
    #[default]
    Auto,
    /// wgpu only; fail if no adapter is available.
    Wgpu,
    /// CPU emulation.
    Dummy,
}

/// Parameters for creating a [`GraphicsDevice`].
///
/// # Example
///
/// ```
/// use showroom_graphics::{BackendType, DeviceParameters, FeatureLevel};
///
/// let params = DeviceParameters::new()
///     .with_backend(BackendType::Dummy)
///     .with_debug_resources(true)
///     .with_dummy_feature_level(FeatureLevel::Level10_0);
/// assert_eq!(params.backend, BackendType::Dummy);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceParameters {
    /// Which backend to create.
    pub backend: BackendType,
    /// Track live resources and report leaks on teardown.
    pub debug_resources: bool,
    /// Feature level reported by the dummy backend.
    pub dummy_feature_level: FeatureLevel,
    /// Highest sample count the dummy backend accepts.
    pub dummy_max_sample_count: u32,
    /// Debug label for the device.
    pub label: String,
}

impl Default for DeviceParameters {
    fn default() -> Self {
        Self {
            backend: BackendType::Auto,
            debug_resources: cfg!(debug_assertions),
            dummy_feature_level: FeatureLevel::default(),
            dummy_max_sample_count: 8,
            label: "Showroom Device".to_string(),
        }
    }
}

impl DeviceParameters {
    /// Create parameters with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters for a dummy device, as used by tests.
    pub fn dummy() -> Self {
        Self::new().with_backend(BackendType::Dummy)
    }

    /// Set the backend type.
    pub fn with_backend(mut self, backend: BackendType) -> Self {
        self.backend = backend;
        self
    }

    /// Enable or disable live resource tracking.
    pub fn with_debug_resources(mut self, enabled: bool) -> Self {
        self.debug_resources = enabled;
        self
    }

    /// Set the feature level the dummy backend reports.
    pub fn with_dummy_feature_level(mut self, level: FeatureLevel) -> Self {
        self.dummy_feature_level = level;
        self
    }

    /// Set the highest sample count the dummy backend accepts.
    pub fn with_dummy_max_sample_count(mut self, count: u32) -> Self {
        self.dummy_max_sample_count = count;
        self
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Information about a graphics adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterInfo {
    /// Adapter name.
    pub name: String,
    /// Underlying API.
    pub backend: String,
    /// Dedicated video memory in bytes, when the API reports it.
    pub dedicated_video_memory: Option<u64>,
}

/// A graphics device for creating GPU resources.
///
/// # Thread Safety
///
/// `GraphicsDevice` is `Send + Sync`. Sequences that touch render targets or
/// issue a frame should hold [`GraphicsDevice::lock`]; the lock is re-entrant
/// so nested resize/draw/capture calls on the render thread do not deadlock.
pub struct GraphicsDevice {
    name: String,
    params: DeviceParameters,
    backend: GpuBackend,
    adapter: AdapterInfo,
    lock: ReentrantMutex<()>,
    // Track allocated resources (weak references for cleanup/debugging)
    buffers: RwLock<Vec<Weak<Buffer>>>,
    textures: RwLock<Vec<Weak<Texture>>>,
    samplers: RwLock<Vec<Weak<Sampler>>>,
    textures_created: AtomicU64,
    swap_chains_created: AtomicU64,
    swap_chains_live: AtomicU64,
    frames_presented: AtomicU64,
}

impl GraphicsDevice {
    /// Create a device on the backend selected by `params`.
    ///
    /// # Errors
    ///
    /// Returns an error if no backend could be created.
    pub fn new(params: &DeviceParameters) -> RenderResult<Arc<Self>> {
        let backend = GpuBackend::create(params)?;
        let adapter = backend.adapter_info();
        log::info!(
            "Created device '{}' on {} ({}), feature level {:?}",
            params.label,
            adapter.name,
            backend.name(),
            backend.feature_level()
        );
        if let Some(memory) = adapter.dedicated_video_memory {
            log::info!("Dedicated video memory: {} MB", memory / (1024 * 1024));
        }

        Ok(Arc::new(Self {
            name: adapter.name.clone(),
            params: params.clone(),
            backend,
            adapter,
            lock: ReentrantMutex::new(()),
            buffers: RwLock::new(Vec::new()),
            textures: RwLock::new(Vec::new()),
            samplers: RwLock::new(Vec::new()),
            textures_created: AtomicU64::new(0),
            swap_chains_created: AtomicU64::new(0),
            swap_chains_live: AtomicU64::new(0),
            frames_presented: AtomicU64::new(0),
        }))
    }

    /// Get the adapter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the adapter information.
    pub fn adapter_info(&self) -> &AdapterInfo {
        &self.adapter
    }

    /// Get the parameters the device was created with.
    pub fn parameters(&self) -> &DeviceParameters {
        &self.params
    }

    /// Get the GPU backend (internal use only).
    pub(crate) fn backend(&self) -> &GpuBackend {
        &self.backend
    }

    /// Capability tier of the device.
    pub fn feature_level(&self) -> FeatureLevel {
        self.backend.feature_level()
    }

    /// Acquire the device-wide lock.
    pub fn lock(&self) -> ReentrantMutexGuard<'_, ()> {
        self.lock.lock()
    }

    /// Largest supported sample description not exceeding `desired`.
    ///
    /// Unsupported counts fall back through 8, 4, 2 and finally 1, which is
    /// always available.
    pub fn supported_sample_description(
        &self,
        format: TextureFormat,
        desired: SampleDescription,
    ) -> SampleDescription {
        SAMPLE_COUNT_FALLBACK
            .iter()
            .copied()
            .filter(|count| *count <= desired.count.max(1))
            .find(|count| self.backend.supports_sample_count(format, *count))
            .map(|count| {
                if count == desired.count {
                    desired
                } else {
                    SampleDescription::new(count, 0)
                }
            })
            .unwrap_or(SampleDescription::SINGLE)
    }

    /// Create a GPU texture.
    ///
    /// # Errors
    ///
    /// Returns an error if the texture dimensions are zero or exceed
    /// [`MAX_TEXTURE_DIMENSION`], or if allocation fails.
    pub fn create_texture(
        self: &Arc<Self>,
        descriptor: &TextureDescriptor,
    ) -> RenderResult<Arc<Texture>> {
        if descriptor.width > MAX_TEXTURE_DIMENSION || descriptor.height > MAX_TEXTURE_DIMENSION {
            return Err(RenderError::InvalidParameter(format!(
                "texture dimension exceeds maximum {MAX_TEXTURE_DIMENSION}"
            )));
        }
        if descriptor.width == 0 || descriptor.height == 0 {
            return Err(RenderError::InvalidParameter(
                "texture dimensions cannot be zero".to_string(),
            ));
        }
        if descriptor.sample_count == 0 {
            return Err(RenderError::InvalidParameter(
                "sample count cannot be zero".to_string(),
            ));
        }

        let gpu = self.backend.create_texture(descriptor)?;
        let texture = Arc::new(Texture::new(Arc::clone(self), descriptor.clone(), gpu));
        self.textures.write().push(Arc::downgrade(&texture));
        self.textures_created.fetch_add(1, Ordering::Relaxed);

        log::trace!(
            "GraphicsDevice: created texture {:?}, size={}x{}, samples={}",
            descriptor.label,
            descriptor.width,
            descriptor.height,
            descriptor.sample_count
        );

        Ok(texture)
    }

    /// Create a GPU buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer size is zero or allocation fails.
    pub fn create_buffer(
        self: &Arc<Self>,
        descriptor: &BufferDescriptor,
    ) -> RenderResult<Arc<Buffer>> {
        if descriptor.size == 0 {
            return Err(RenderError::InvalidParameter(
                "buffer size cannot be zero".to_string(),
            ));
        }

        let gpu = self.backend.create_buffer(descriptor)?;
        let buffer = Arc::new(Buffer::new(Arc::downgrade(self), descriptor.clone(), gpu));
        self.buffers.write().push(Arc::downgrade(&buffer));

        log::trace!(
            "GraphicsDevice: created buffer {:?}, size={}",
            descriptor.label,
            descriptor.size
        );

        Ok(buffer)
    }

    /// Create a buffer and upload `data` into it.
    pub fn create_buffer_init(
        self: &Arc<Self>,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> RenderResult<Arc<Buffer>> {
        let buffer = self.create_buffer(descriptor)?;
        self.backend.write_buffer(buffer.gpu_handle(), 0, data)?;
        Ok(buffer)
    }

    /// Create a texture sampler.
    pub fn create_sampler(
        self: &Arc<Self>,
        descriptor: &SamplerDescriptor,
    ) -> RenderResult<Arc<Sampler>> {
        let gpu = self.backend.create_sampler(descriptor)?;
        let sampler = Arc::new(Sampler::new(Arc::downgrade(self), descriptor.clone(), gpu));
        self.samplers.write().push(Arc::downgrade(&sampler));

        log::trace!("GraphicsDevice: created sampler {:?}", descriptor.label);

        Ok(sampler)
    }

    /// Upload tightly packed texel data covering the whole texture.
    pub fn write_texture(&self, texture: &Texture, data: &[u8]) -> RenderResult<()> {
        self.backend
            .write_texture(texture.gpu_handle(), texture.descriptor(), data)
    }

    /// Read a single-sampled texture back as tightly packed texel data.
    pub fn read_texture(&self, texture: &Texture) -> RenderResult<Vec<u8>> {
        self.backend
            .read_texture(texture.gpu_handle(), texture.descriptor())
    }

    /// Clear a color target.
    pub fn clear_color(&self, target: &Texture, color: Color) -> RenderResult<()> {
        self.backend
            .clear_color(target.gpu_handle(), target.descriptor(), color)
    }

    /// Clear a depth target.
    pub fn clear_depth(&self, target: &Texture, depth: f32) -> RenderResult<()> {
        self.backend
            .clear_depth(target.gpu_handle(), target.descriptor(), depth)
    }

    /// Fill a rectangle of a color target with a solid color.
    pub fn fill_rect(&self, target: &Texture, rect: Rect, color: Color) -> RenderResult<()> {
        self.backend
            .fill_rect(target.gpu_handle(), target.descriptor(), rect, color)
    }

    /// Resolve a multisampled texture into a single-sampled one.
    pub fn resolve(&self, source: &Texture, destination: &Texture) -> RenderResult<()> {
        self.backend.resolve(
            source.gpu_handle(),
            source.descriptor(),
            destination.gpu_handle(),
            destination.descriptor(),
        )
    }

    /// Box-filter `region` of `source` into the whole of `destination`.
    pub fn blit(&self, source: &Texture, region: Region, destination: &Texture) -> RenderResult<()> {
        self.backend.blit(
            source.gpu_handle(),
            source.descriptor(),
            region,
            destination.gpu_handle(),
            destination.descriptor(),
        )
    }

    /// Submit outstanding work and wait for the GPU.
    pub fn flush(&self) {
        self.backend.flush();
    }

    pub(crate) fn on_swap_chain_created(&self) {
        self.swap_chains_created.fetch_add(1, Ordering::Relaxed);
        self.swap_chains_live.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_swap_chain_released(&self) {
        self.swap_chains_live.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn on_frame_presented(&self) {
        self.frames_presented.fetch_add(1, Ordering::Relaxed);
    }

    /// Total number of textures created by this device.
    pub fn textures_created(&self) -> u64 {
        self.textures_created.load(Ordering::Relaxed)
    }

    /// Total number of swap chains created by this device.
    pub fn swap_chains_created(&self) -> u64 {
        self.swap_chains_created.load(Ordering::Relaxed)
    }

    /// Number of swap chains currently alive.
    pub fn swap_chain_count(&self) -> u64 {
        self.swap_chains_live.load(Ordering::Relaxed)
    }

    /// Total number of frames presented through any swap chain.
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented.load(Ordering::Relaxed)
    }

    /// Get the number of live buffers created by this device.
    pub fn buffer_count(&self) -> usize {
        self.buffers
            .read()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Get the number of live textures created by this device.
    pub fn texture_count(&self) -> usize {
        self.textures
            .read()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Get the number of live samplers created by this device.
    pub fn sampler_count(&self) -> usize {
        self.samplers
            .read()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Clean up dead weak references to released resources.
    pub fn cleanup_dead_resources(&self) {
        self.buffers.write().retain(|w| w.strong_count() > 0);
        self.textures.write().retain(|w| w.strong_count() > 0);
        self.samplers.write().retain(|w| w.strong_count() > 0);
    }

    /// Log every resource that is still alive and return how many there are.
    ///
    /// Only reports when debug resource tracking is enabled; returns 0
    /// otherwise.
    pub fn report_live_objects(&self) -> usize {
        if !self.params.debug_resources {
            return 0;
        }
        self.cleanup_dead_resources();

        let mut live = 0;
        for texture in self.textures.read().iter().filter_map(Weak::upgrade) {
            log::warn!(
                "Live texture {:?} ({}x{} {:?})",
                texture.label(),
                texture.width(),
                texture.height(),
                texture.format()
            );
            live += 1;
        }
        for buffer in self.buffers.read().iter().filter_map(Weak::upgrade) {
            log::warn!("Live buffer {:?} ({} bytes)", buffer.label(), buffer.size());
            live += 1;
        }
        for sampler in self.samplers.read().iter().filter_map(Weak::upgrade) {
            log::warn!("Live sampler {:?}", sampler.label());
            live += 1;
        }
        let swap_chains = self.swap_chain_count();
        if swap_chains > 0 {
            log::warn!("{swap_chains} live swap chain(s)");
            live += swap_chains as usize;
        }

        if live == 0 {
            log::debug!("No live objects on device '{}'", self.name);
        }
        live
    }
}

impl std::fmt::Debug for GraphicsDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsDevice")
            .field("name", &self.name)
            .field("backend", &self.backend.name())
            .field("feature_level", &self.feature_level())
            .finish()
    }
}

// Ensure GraphicsDevice is Send + Sync
static_assertions::assert_impl_all!(GraphicsDevice: Send, Sync);
