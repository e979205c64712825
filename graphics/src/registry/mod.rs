//! Device-scoped resource registry.
//!
//! [`ResourceRegistry`] is the single owner of the GPU-side objects the
//! renderer and its collaborators derive from the device:
//!
//! - effects, created once per type and initialized against the device
//! - render helpers, notified on every surface resize
//! - a named-slot store for cross-component lookup by static type
//! - shared states, quad buffers and procedural textures
//!
//! Everything obtained from the registry is owned by it. Callers keep `Arc`
//! clones but must not dispose them; [`ResourceRegistry::dispose`] does that
//! exactly once.
//!
//! # Example
//!
//! ```ignore
//! let registry = ResourceRegistry::new(device);
//! let blur = registry.get_effect::<BlurEffect>()?;
//! assert!(Arc::ptr_eq(&blur, &registry.get_effect::<BlurEffect>()?));
//! ```

mod procedural;
mod slots;
mod states;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::clock::FrameClock;
use crate::device::GraphicsDevice;
use crate::error::{RenderError, RenderResult};
use crate::resources::Texture;
use crate::swapchain::SwapChain;
use crate::types::SampleDescription;

pub use procedural::{noise_seed, noise_texels};
pub use slots::Disposable;
pub use states::{CommonStates, QUAD_INDICES, QUAD_VERTICES, QuadBuffers, QuadVertex};

use slots::SlotStore;

/// Frames averaged by the registry's clock.
const CLOCK_WINDOW: usize = 32;

/// A GPU effect created and owned by the registry.
pub trait Effect: Any + Send + Sync {
    /// Create device objects. Called once, right after construction.
    fn initialize(&mut self, device: &Arc<GraphicsDevice>) -> RenderResult<()>;

    /// Screen-size capability, for effects that sample in screen space.
    fn screen_size(&self) -> Option<&dyn ScreenSizeEffect> {
        None
    }

    /// Release device objects.
    fn dispose(&self) {}
}

/// Effects that need the surface size and its reciprocal.
pub trait ScreenSizeEffect: Send + Sync {
    fn on_screen_resize(&self, width: f32, height: f32, inv_width: f32, inv_height: f32);
}

/// A helper created and owned by the registry.
pub trait RenderHelper: Any + Send + Sync {
    /// Called once, right after construction.
    fn on_initialize(&mut self, registry: &ResourceRegistry) -> RenderResult<()>;

    /// Called whenever the surface is resized.
    fn on_resize(&self, registry: &ResourceRegistry) -> RenderResult<()>;

    /// Release device objects.
    fn dispose(&self) {}
}

/// Notifications raised through the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryEvent {
    /// Something affecting the output changed; the next frame must be drawn.
    UpdateRequired,
    /// Scene contents changed.
    SceneUpdated,
    /// Textures were reloaded.
    TexturesUpdated,
}

type Subscriber = Arc<dyn Fn(RegistryEvent) + Send + Sync>;

/// Handle returned by [`ResourceRegistry::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct EffectEntry {
    value: Arc<dyn Any + Send + Sync>,
    effect: Arc<dyn Effect>,
}

struct HelperEntry {
    value: Arc<dyn Any + Send + Sync>,
    helper: Arc<dyn RenderHelper>,
}

#[derive(Debug, Clone, Copy)]
struct SurfaceState {
    width: u32,
    height: u32,
    sample: SampleDescription,
    time_factor: f32,
}

#[derive(Default)]
struct Cached {
    states: Option<Arc<CommonStates>>,
    quad_buffers: Option<Arc<QuadBuffers>>,
    random_textures: HashMap<(u32, u32), Arc<Texture>>,
    flat_normal_map: Option<Arc<Texture>>,
    transparent: Option<Arc<Texture>>,
}

/// Owner of device-scoped derived resources.
pub struct ResourceRegistry {
    device: Arc<GraphicsDevice>,
    surface: RwLock<SurfaceState>,
    effects: RwLock<HashMap<TypeId, EffectEntry>>,
    helpers: RwLock<HashMap<TypeId, HelperEntry>>,
    slots: Mutex<SlotStore>,
    cached: Mutex<Cached>,
    subscribers: RwLock<Vec<(SubscriptionId, Subscriber)>>,
    next_subscription: AtomicU64,
    clock: Mutex<FrameClock>,
    disposed: AtomicBool,
}

impl ResourceRegistry {
    /// Create an empty registry for `device`.
    pub fn new(device: Arc<GraphicsDevice>) -> Self {
        Self {
            device,
            surface: RwLock::new(SurfaceState {
                width: 0,
                height: 0,
                sample: SampleDescription::SINGLE,
                time_factor: 1.0,
            }),
            effects: RwLock::new(HashMap::new()),
            helpers: RwLock::new(HashMap::new()),
            slots: Mutex::new(SlotStore::default()),
            cached: Mutex::new(Cached::default()),
            subscribers: RwLock::new(Vec::new()),
            next_subscription: AtomicU64::new(0),
            clock: Mutex::new(FrameClock::new(CLOCK_WINDOW)),
            disposed: AtomicBool::new(false),
        }
    }

    /// The device everything is created on.
    pub fn device(&self) -> &Arc<GraphicsDevice> {
        &self.device
    }

    fn ensure_alive(&self) -> RenderResult<()> {
        if self.disposed.load(Ordering::Acquire) {
            Err(RenderError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Whether [`ResourceRegistry::dispose`] has run.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    // ---- surface ----

    /// Current surface width in physical pixels.
    pub fn width(&self) -> u32 {
        self.surface.read().width
    }

    /// Current surface height in physical pixels.
    pub fn height(&self) -> u32 {
        self.surface.read().height
    }

    /// Current surface sample description.
    pub fn sample_description(&self) -> SampleDescription {
        self.surface.read().sample
    }

    /// Time scale applied to frame deltas.
    pub fn time_factor(&self) -> f32 {
        self.surface.read().time_factor
    }

    pub fn set_time_factor(&self, time_factor: f32) {
        self.surface.write().time_factor = time_factor;
    }

    /// Record the new surface size and notify helpers and screen-size effects.
    pub fn on_resize(
        &self,
        width: u32,
        height: u32,
        sample: SampleDescription,
    ) -> RenderResult<()> {
        {
            let mut surface = self.surface.write();
            surface.width = width;
            surface.height = height;
            surface.sample = sample;
        }

        let helpers: Vec<Arc<dyn RenderHelper>> = self
            .helpers
            .read()
            .values()
            .map(|entry| Arc::clone(&entry.helper))
            .collect();
        for helper in helpers {
            helper.on_resize(self)?;
        }

        let effects: Vec<Arc<dyn Effect>> = self
            .effects
            .read()
            .values()
            .map(|entry| Arc::clone(&entry.effect))
            .collect();
        let (w, h) = (width as f32, height as f32);
        for effect in &effects {
            if let Some(screen_size) = effect.screen_size() {
                screen_size.on_screen_resize(w, h, 1.0 / w, 1.0 / h);
            }
        }
        Ok(())
    }

    // ---- effects ----

    /// Get the effect of type `T`, creating and initializing it on first use.
    pub fn get_effect<T: Effect + Default>(&self) -> RenderResult<Arc<T>> {
        self.get_effect_with::<T>(|_| {})
    }

    /// Like [`ResourceRegistry::get_effect`], running `pre_init` on a newly
    /// constructed effect before it is initialized.
    pub fn get_effect_with<T: Effect + Default>(
        &self,
        pre_init: impl FnOnce(&mut T),
    ) -> RenderResult<Arc<T>> {
        self.ensure_alive()?;
        if let Some(existing) = self.get_existing_effect::<T>() {
            return Ok(existing);
        }

        let mut created = T::default();
        pre_init(&mut created);
        created.initialize(&self.device)?;
        let created = Arc::new(created);
        log::debug!("Created effect {}", std::any::type_name::<T>());

        let mut effects = self.effects.write();
        let entry = effects.entry(TypeId::of::<T>()).or_insert_with(|| EffectEntry {
            value: created.clone(),
            effect: created.clone(),
        });
        Arc::clone(&entry.value)
            .downcast::<T>()
            .map_err(|_| RenderError::Backend("effect registry type mismatch".to_string()))
    }

    /// Get the effect of type `T` if it was already created.
    pub fn get_existing_effect<T: Effect>(&self) -> Option<Arc<T>> {
        self.effects
            .read()
            .get(&TypeId::of::<T>())
            .and_then(|entry| Arc::clone(&entry.value).downcast::<T>().ok())
    }

    /// Number of effects created so far.
    pub fn effect_count(&self) -> usize {
        self.effects.read().len()
    }

    // ---- helpers ----

    /// Get the helper of type `T`, creating it on first use.
    ///
    /// A new helper is initialized, then resized right away if the surface
    /// already has a size.
    pub fn get_helper<T: RenderHelper + Default>(&self) -> RenderResult<Arc<T>> {
        self.ensure_alive()?;
        if let Some(existing) = self
            .helpers
            .read()
            .get(&TypeId::of::<T>())
            .and_then(|entry| Arc::clone(&entry.value).downcast::<T>().ok())
        {
            return Ok(existing);
        }

        let mut created = T::default();
        created.on_initialize(self)?;
        let created = Arc::new(created);
        self.helpers.write().insert(
            TypeId::of::<T>(),
            HelperEntry {
                value: created.clone(),
                helper: created.clone(),
            },
        );
        log::debug!("Created helper {}", std::any::type_name::<T>());

        if self.width() != 0 || self.height() != 0 {
            created.on_resize(self)?;
        }
        Ok(created)
    }

    /// Number of helpers created so far.
    pub fn helper_count(&self) -> usize {
        self.helpers.read().len()
    }

    // ---- named slots ----

    /// Store `value` under its static type, replacing any previous value.
    pub fn set<T: ?Sized + Send + Sync + 'static>(&self, value: Arc<T>) {
        self.slots.lock().set(value, None);
    }

    /// Store a value that is disposed along with the registry.
    pub fn set_disposable<T: Disposable + 'static>(&self, value: Arc<T>) {
        let disposer: Arc<dyn Disposable> = value.clone();
        self.slots.lock().set(value, Some(disposer));
    }

    /// Register `view` as a capability of the value stored under `T`.
    ///
    /// Lookups for `V` that find no slot of their own fall back to these
    /// views. When several slots provide `V`, the one stored first wins and
    /// is cached for later lookups.
    pub fn set_view<T: ?Sized + 'static, V: ?Sized + Send + Sync + 'static>(
        &self,
        view: Arc<V>,
    ) -> RenderResult<()> {
        if self.slots.lock().set_view::<T, V>(view) {
            Ok(())
        } else {
            Err(RenderError::MissingSlot(std::any::type_name::<T>()))
        }
    }

    /// Remove the value stored under `T`.
    pub fn remove<T: ?Sized + 'static>(&self) -> bool {
        self.slots.lock().remove::<T>()
    }

    /// Look up the value stored under `T`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::MissingSlot`] if neither a slot nor a view of
    /// `T` exists.
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> RenderResult<Arc<T>> {
        self.try_get::<T>()
            .ok_or(RenderError::MissingSlot(std::any::type_name::<T>()))
    }

    /// Look up the value stored under `T`, or `None`.
    pub fn try_get<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.slots.lock().get::<T>()
    }

    // ---- events ----

    /// Register a closure receiving every [`RegistryEvent`].
    pub fn subscribe(
        &self,
        subscriber: impl Fn(RegistryEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push((id, Arc::new(subscriber)));
        id
    }

    /// Remove a subscriber. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    fn raise(&self, event: RegistryEvent) {
        let subscribers: Vec<Subscriber> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, subscriber)| Arc::clone(subscriber))
            .collect();
        for subscriber in subscribers {
            subscriber(event);
        }
    }

    /// Ask every renderer on this registry to draw the next frame.
    pub fn raise_update_required(&self) {
        self.raise(RegistryEvent::UpdateRequired);
    }

    pub fn raise_scene_updated(&self) {
        self.raise(RegistryEvent::UpdateRequired);
        self.raise(RegistryEvent::SceneUpdated);
    }

    pub fn raise_textures_updated(&self) {
        self.raise(RegistryEvent::UpdateRequired);
        self.raise(RegistryEvent::TexturesUpdated);
    }

    // ---- cached resources ----

    /// Shared sampler states.
    pub fn states(&self) -> RenderResult<Arc<CommonStates>> {
        self.ensure_alive()?;
        let mut cached = self.cached.lock();
        if let Some(states) = &cached.states {
            return Ok(states.clone());
        }
        let states = Arc::new(CommonStates::new(&self.device)?);
        cached.states = Some(states.clone());
        Ok(states)
    }

    /// Shared full-screen quad buffers.
    pub fn quad_buffers(&self) -> RenderResult<Arc<QuadBuffers>> {
        self.ensure_alive()?;
        let mut cached = self.cached.lock();
        if let Some(quad) = &cached.quad_buffers {
            return Ok(quad.clone());
        }
        let quad = Arc::new(QuadBuffers::new(&self.device)?);
        cached.quad_buffers = Some(quad.clone());
        Ok(quad)
    }

    /// Deterministic noise texture of the given size, cached per size.
    pub fn random_texture(&self, width: u32, height: u32) -> RenderResult<Arc<Texture>> {
        self.ensure_alive()?;
        let mut cached = self.cached.lock();
        if let Some(texture) = cached.random_textures.get(&(width, height)) {
            return Ok(texture.clone());
        }

        let started = std::time::Instant::now();
        let texture = procedural::texture_rgba8(&self.device, width, height, "noise", {
            let texels = noise_texels(width, height);
            move |x, y| {
                let i = (y as usize * width as usize + x as usize) * 4;
                [texels[i], texels[i + 1], texels[i + 2], texels[i + 3]]
            }
        })?;
        log::debug!(
            "{}x{} noise texture: {:.1} ms",
            width,
            height,
            started.elapsed().as_secs_f64() * 1000.0
        );
        cached.random_textures.insert((width, height), texture.clone());
        Ok(texture)
    }

    /// 4x4 flat normal map.
    pub fn flat_normal_map(&self) -> RenderResult<Arc<Texture>> {
        self.ensure_alive()?;
        let mut cached = self.cached.lock();
        if let Some(texture) = &cached.flat_normal_map {
            return Ok(texture.clone());
        }
        let texture =
            procedural::texture_rgba8(&self.device, 4, 4, "flat normal map", |_, _| {
                [127, 127, 255, 255]
            })?;
        cached.flat_normal_map = Some(texture.clone());
        Ok(texture)
    }

    /// 4x4 fully transparent texture.
    pub fn transparent_texture(&self) -> RenderResult<Arc<Texture>> {
        self.ensure_alive()?;
        let mut cached = self.cached.lock();
        if let Some(texture) = &cached.transparent {
            return Ok(texture.clone());
        }
        let texture =
            procedural::texture_rgba8(&self.device, 4, 4, "transparent", |_, _| [0, 0, 0, 0])?;
        cached.transparent = Some(texture.clone());
        Ok(texture)
    }

    /// Create an RGBA8 texture filled texel by texel.
    pub fn create_texture(
        &self,
        width: u32,
        height: u32,
        fill: impl FnMut(u32, u32) -> [u8; 4],
    ) -> RenderResult<Arc<Texture>> {
        procedural::texture_rgba8(&self.device, width, height, "procedural", fill)
    }

    /// Create an RGBA32F texture filled texel by texel.
    pub fn create_texture_hdr(
        &self,
        width: u32,
        height: u32,
        fill: impl FnMut(u32, u32) -> [f32; 4],
    ) -> RenderResult<Arc<Texture>> {
        procedural::texture_rgba32f(&self.device, width, height, "procedural hdr", fill)
    }

    // ---- timing ----

    /// Register a frame that advanced scene time by `dt` seconds.
    pub fn on_tick(&self, dt: f32) {
        self.clock.lock().register_frame(dt);
    }

    /// Scene time of the most recent frame.
    pub fn last_frame_time(&self) -> f32 {
        self.clock.lock().last_frame_time()
    }

    // ---- teardown ----

    /// Release everything the registry owns, then the swap chain if given.
    ///
    /// Runs once; later calls do nothing.
    pub fn dispose(&self, swap_chain: Option<&mut SwapChain>) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            log::debug!("ResourceRegistry already disposed");
            return;
        }
        log::debug!("ResourceRegistry::dispose()");

        let cached = std::mem::take(&mut *self.cached.lock());
        drop(cached.states);
        log::debug!("States disposed");
        drop(cached.quad_buffers);
        log::debug!("Quad buffers disposed");

        let effects = std::mem::take(&mut *self.effects.write());
        for entry in effects.into_values() {
            entry.effect.dispose();
        }
        log::debug!("Effects disposed");

        let helpers = std::mem::take(&mut *self.helpers.write());
        for entry in helpers.into_values() {
            entry.helper.dispose();
        }
        log::debug!("Helpers disposed");

        drop(cached.random_textures);
        log::debug!("Random textures disposed");
        drop(cached.flat_normal_map);
        log::debug!("Flat normal map disposed");
        drop(cached.transparent);
        log::debug!("Transparent texture disposed");

        self.slots.lock().dispose_all();
        log::debug!("Slots disposed");

        self.subscribers.write().clear();
        self.device.flush();

        if let Some(swap_chain) = swap_chain {
            match swap_chain.dispose() {
                Ok(()) => log::debug!("Swap chain disposed"),
                Err(RenderError::Disposed) => log::debug!("Swap chain already disposed"),
                Err(e) => log::warn!("Swap chain disposal failed: {e}"),
            }
        }
    }
}

impl Drop for ResourceRegistry {
    fn drop(&mut self) {
        self.dispose(None);
        log::debug!("Device reference released");
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("device", &self.device.name())
            .field("effects", &self.effect_count())
            .field("helpers", &self.helper_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

static_assertions::assert_impl_all!(ResourceRegistry: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceParameters;
    use std::sync::atomic::AtomicUsize;

    fn create_test_device() -> Arc<GraphicsDevice> {
        GraphicsDevice::new(&DeviceParameters::dummy()).unwrap()
    }

    #[derive(Default)]
    struct CountingEffect {
        initialized: usize,
        tag: u32,
        disposed: Arc<AtomicUsize>,
        screen: Mutex<Option<[f32; 4]>>,
    }

    impl Effect for CountingEffect {
        fn initialize(&mut self, _device: &Arc<GraphicsDevice>) -> RenderResult<()> {
            self.initialized += 1;
            Ok(())
        }

        fn screen_size(&self) -> Option<&dyn ScreenSizeEffect> {
            Some(self)
        }

        fn dispose(&self) {
            self.disposed.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl ScreenSizeEffect for CountingEffect {
        fn on_screen_resize(&self, width: f32, height: f32, inv_width: f32, inv_height: f32) {
            *self.screen.lock() = Some([width, height, inv_width, inv_height]);
        }
    }

    #[derive(Default)]
    struct SizeHelper {
        resizes: AtomicUsize,
    }

    impl RenderHelper for SizeHelper {
        fn on_initialize(&mut self, _registry: &ResourceRegistry) -> RenderResult<()> {
            Ok(())
        }

        fn on_resize(&self, _registry: &ResourceRegistry) -> RenderResult<()> {
            self.resizes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_effect_is_memoized() {
        let registry = ResourceRegistry::new(create_test_device());
        let first = registry.get_effect::<CountingEffect>().unwrap();
        let second = registry.get_effect::<CountingEffect>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.initialized, 1);
        assert_eq!(registry.effect_count(), 1);
    }

    #[test]
    fn test_pre_init_runs_before_initialize() {
        let registry = ResourceRegistry::new(create_test_device());
        assert!(registry.get_existing_effect::<CountingEffect>().is_none());
        let effect = registry
            .get_effect_with::<CountingEffect>(|effect| effect.tag = 7)
            .unwrap();
        assert_eq!(effect.tag, 7);
        // Pre-init only applies on creation
        let again = registry
            .get_effect_with::<CountingEffect>(|effect| effect.tag = 9)
            .unwrap();
        assert_eq!(again.tag, 7);
    }

    #[test]
    fn test_dispose_runs_once() {
        let registry = ResourceRegistry::new(create_test_device());
        let effect = registry.get_effect::<CountingEffect>().unwrap();
        registry.dispose(None);
        registry.dispose(None);
        assert_eq!(effect.disposed.load(Ordering::SeqCst), 1);
        assert!(matches!(
            registry.get_effect::<CountingEffect>(),
            Err(RenderError::Disposed)
        ));
    }

    #[test]
    fn test_resize_notifies_helpers_and_effects() {
        let registry = ResourceRegistry::new(create_test_device());
        let effect = registry.get_effect::<CountingEffect>().unwrap();

        // Zero-size surface: helper is not resized on creation
        let helper = registry.get_helper::<SizeHelper>().unwrap();
        assert_eq!(helper.resizes.load(Ordering::SeqCst), 0);

        registry
            .on_resize(200, 100, SampleDescription::SINGLE)
            .unwrap();
        assert_eq!(helper.resizes.load(Ordering::SeqCst), 1);
        assert_eq!(*effect.screen.lock(), Some([200.0, 100.0, 0.005, 0.01]));
        assert_eq!(registry.width(), 200);
        assert_eq!(registry.height(), 100);
    }

    #[test]
    fn test_helper_resized_on_creation_when_sized() {
        let registry = ResourceRegistry::new(create_test_device());
        registry.on_resize(64, 64, SampleDescription::SINGLE).unwrap();
        let helper = registry.get_helper::<SizeHelper>().unwrap();
        assert_eq!(helper.resizes.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&helper, &registry.get_helper::<SizeHelper>().unwrap()));
    }

    #[test]
    fn test_random_texture_cached_and_deterministic() {
        let device = create_test_device();
        let registry = ResourceRegistry::new(device.clone());
        let a = registry.random_texture(8, 4).unwrap();
        let b = registry.random_texture(8, 4).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(device.read_texture(&a).unwrap(), noise_texels(8, 4));

        let other = ResourceRegistry::new(device.clone());
        let c = other.random_texture(8, 4).unwrap();
        assert_eq!(device.read_texture(&a).unwrap(), device.read_texture(&c).unwrap());
    }

    #[test]
    fn test_flat_normal_map() {
        let device = create_test_device();
        let registry = ResourceRegistry::new(device.clone());
        let texture = registry.flat_normal_map().unwrap();
        assert_eq!(texture.size(), (4, 4));
        let texels = device.read_texture(&texture).unwrap();
        assert!(texels.chunks(4).all(|t| t == [127, 127, 255, 255]));
    }

    #[test]
    fn test_events() {
        let registry = ResourceRegistry::new(create_test_device());
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        registry.subscribe(move |event| sink.lock().push(event));

        registry.raise_textures_updated();
        assert_eq!(
            *events.lock(),
            vec![RegistryEvent::UpdateRequired, RegistryEvent::TexturesUpdated]
        );
    }

    #[test]
    fn test_unsubscribe() {
        let registry = ResourceRegistry::new(create_test_device());
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let id = registry.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(registry.subscriber_count(), 1);

        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));
        registry.raise_update_required();
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(registry.subscriber_count(), 0);
    }

    #[test]
    fn test_view_lookup_after_remove() {
        let registry = ResourceRegistry::new(create_test_device());
        let value = Arc::new(7u32);
        registry.set(value.clone());
        registry.set_view::<u32, dyn std::fmt::Debug + Send + Sync>(value).unwrap();
        assert!(registry.try_get::<dyn std::fmt::Debug + Send + Sync>().is_some());

        assert!(registry.remove::<u32>());
        assert!(registry.try_get::<dyn std::fmt::Debug + Send + Sync>().is_none());
    }

    #[test]
    fn test_missing_slot() {
        let registry = ResourceRegistry::new(create_test_device());
        assert!(matches!(
            registry.get::<String>(),
            Err(RenderError::MissingSlot(_))
        ));
        registry.set(Arc::new("value".to_string()));
        assert_eq!(registry.get::<String>().unwrap().as_str(), "value");
    }

    #[test]
    fn test_last_frame_time() {
        let registry = ResourceRegistry::new(create_test_device());
        registry.on_tick(0.25);
        assert_eq!(registry.last_frame_time(), 0.25);
    }
}
