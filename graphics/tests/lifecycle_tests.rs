//! Render loop lifecycle integration tests.
//!
//! These cover target sizing under the resolution multiplier, sampling
//! changes, the registry's memoization and disposal, and the three
//! initialization modes.

mod common;

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use rstest::rstest;

use common::{Backend, CountingEffect, SplitScene, create_device, create_renderer};
use showroom_graphics::{
    DeviceParameters, FeatureLevel, OutputHandle, RenderError, RenderHooks, RenderLoop,
    RendererSettings, ResourceRegistry, ShotRequest, SwapEffect, TextureFormat,
};

// ============================================================================
// Surface Tests
// ============================================================================

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::webgpu(Backend::WebGpu)]
fn test_targets_follow_size_and_multiplier(#[case] backend: Backend) {
    let Some(mut renderer) = create_renderer(backend, RendererSettings::new().with_size(64, 48))
    else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let steps = [
        (64, 48, 1.0),
        (101, 50, 1.5),
        (33, 17, 0.5),
        (200, 100, 2.0),
        (7, 3, 1.25),
    ];
    for (width, height, multiplier) in steps {
        renderer.set_size(width, height);
        renderer.set_resolution_multiplier(multiplier).unwrap();
        renderer.draw().unwrap();

        let expected = (
            (width as f64 * multiplier).round() as u32,
            (height as f64 * multiplier).round() as u32,
        );
        assert_eq!(renderer.render_target().unwrap().size(), expected);
        assert_eq!(renderer.depth_target().unwrap().size(), expected);
        assert_eq!(
            (renderer.actual_width(), renderer.actual_height()),
            expected
        );
    }
}

#[rstest]
#[case::dummy(Backend::Dummy)]
fn test_zero_size_keeps_previous_targets(#[case] backend: Backend) {
    let Some(mut renderer) = create_renderer(backend, RendererSettings::new().with_size(16, 16))
    else {
        return;
    };
    renderer.draw().unwrap();
    let before = Arc::clone(renderer.render_target().unwrap());

    renderer.resize(0, 16).unwrap();
    renderer.draw().unwrap();
    assert!(Arc::ptr_eq(&before, renderer.render_target().unwrap()));
}

#[rstest]
#[case::dummy(Backend::Dummy)]
fn test_negative_multiplier_only_sets_previous(#[case] backend: Backend) {
    let Some(mut renderer) = create_renderer(backend, RendererSettings::new().with_size(16, 16))
    else {
        return;
    };
    renderer.draw().unwrap();
    assert!(!renderer.is_dirty());

    renderer.set_resolution_multiplier(-3.0).unwrap();
    assert_eq!(renderer.resolution_multiplier(), 1.0);
    assert_eq!(renderer.surface().previous_resolution_multiplier(), 3.0);
    assert!(!renderer.is_dirty());
}

#[rstest]
#[case::dummy(Backend::Dummy)]
fn test_ssaa_toggle_restores_previous_multiplier(#[case] backend: Backend) {
    let Some(mut renderer) = create_renderer(
        backend,
        RendererSettings::new()
            .with_size(20, 20)
            .with_resolution_multiplier(1.75),
    ) else {
        return;
    };
    assert!(renderer.use_ssaa());

    renderer.set_use_ssaa(false).unwrap();
    assert_eq!(renderer.resolution_multiplier(), 1.0);
    renderer.set_use_ssaa(true).unwrap();
    assert_eq!(renderer.resolution_multiplier(), 1.75);

    renderer.draw().unwrap();
    assert_eq!(renderer.render_target().unwrap().size(), (35, 35));
}

#[rstest]
#[case::dummy(Backend::Dummy)]
fn test_msaa_change_recreates_swap_chain(#[case] backend: Backend) {
    let Some(device) = create_device(backend) else {
        return;
    };
    drop(device);

    let mut renderer = RenderLoop::new(
        SplitScene::default(),
        RendererSettings::new().with_size(32, 32),
    )
    .with_device_parameters(backend.device_parameters());
    let output = OutputHandle::detached(3);
    renderer.initialize_on_screen(output).unwrap();
    renderer.draw().unwrap();

    let device = Arc::clone(renderer.device().unwrap());
    let before = *renderer.surface().swap_chain().unwrap().descriptor();
    assert_eq!(before.buffer_count, 2);
    assert_eq!(before.swap_effect, SwapEffect::Discard);
    assert!(before.windowed);

    renderer.set_use_msaa(true).unwrap();
    assert!(renderer.is_dirty());

    let swap_chain = renderer.surface().swap_chain().unwrap();
    let after = *swap_chain.descriptor();
    assert_eq!(device.swap_chains_created(), 2);
    assert_eq!(device.swap_chain_count(), 1);
    assert_eq!(after.buffer_count, before.buffer_count);
    assert_eq!(after.format, before.format);
    assert_eq!(after.windowed, before.windowed);
    assert_eq!(after.sample.count, 4);
    assert_eq!(*swap_chain.output(), output);

    renderer.draw().unwrap();
    assert_eq!(renderer.render_target().unwrap().sample_count(), 4);
}

#[rstest]
#[case::dummy(Backend::Dummy)]
fn test_fullscreen_ignored_off_screen(#[case] backend: Backend) {
    let Some(mut renderer) = create_renderer(backend, RendererSettings::new().with_size(8, 8))
    else {
        return;
    };
    renderer.toggle_fullscreen().unwrap();
    assert!(!renderer.is_fullscreen());
}

// ============================================================================
// Frame Flow Tests
// ============================================================================

#[rstest]
#[case::dummy(Backend::Dummy)]
fn test_tick_scaled_by_time_factor(#[case] backend: Backend) {
    let Some(mut renderer) = create_renderer(
        backend,
        RendererSettings::new().with_size(8, 8).with_time_factor(0.5),
    ) else {
        return;
    };

    renderer.draw_at(1.0).unwrap();
    renderer.draw_at(1.0).unwrap();
    renderer.draw_at(2.0).unwrap();

    // The first frame advances from 0, the second has no delta.
    assert_eq!(renderer.hooks().ticks, vec![0.5, 0.5]);
    assert_eq!(renderer.hooks().frames, 3);
    assert_eq!(renderer.hooks().resizes, 1);
}

#[rstest]
#[case::fast_path(Backend::Dummy, ShotRequest::new(8, 8))]
#[case::general_path(Backend::Dummy, ShotRequest::new(32, 16).with_downscale(0.5))]
fn test_shot_between_injected_frames(#[case] backend: Backend, #[case] request: ShotRequest) {
    let Some(mut renderer) = create_renderer(backend, RendererSettings::new().with_size(8, 8))
    else {
        return;
    };

    renderer.draw_at(10.0).unwrap();
    renderer.draw_at(10.5).unwrap();
    renderer
        .shot(&request, &mut Cursor::new(Vec::new()), None, None)
        .unwrap();
    renderer.draw_at(11.0).unwrap();

    // The capture frame adds no scene time.
    assert_eq!(renderer.hooks().ticks, vec![10.0, 0.5, 0.5]);
    assert_eq!(renderer.hooks().frames, 4);
}

#[rstest]
#[case::dummy(Backend::Dummy)]
fn test_pause_suppresses_frames(#[case] backend: Backend) {
    let Some(mut renderer) = create_renderer(backend, RendererSettings::new().with_size(8, 8))
    else {
        return;
    };
    renderer.set_paused(true);
    renderer.draw().unwrap();
    renderer.draw_at(5.0).unwrap();
    assert_eq!(renderer.hooks().frames, 0);
    assert_eq!(renderer.frames(), 0);
}

#[rstest]
#[case::dummy(Backend::Dummy)]
fn test_draw_error_propagates(#[case] backend: Backend) {
    let Some(mut renderer) = create_renderer(backend, RendererSettings::new().with_size(8, 8))
    else {
        return;
    };
    renderer.hooks_mut().fail_draw = true;
    assert!(matches!(renderer.draw(), Err(RenderError::Backend(_))));

    renderer.hooks_mut().fail_draw = false;
    renderer.draw().unwrap();
}

// ============================================================================
// Registry Tests
// ============================================================================

#[rstest]
#[case::dummy(Backend::Dummy)]
fn test_effect_memoized_and_disposed_once(#[case] backend: Backend) {
    let Some(mut renderer) = create_renderer(backend, RendererSettings::new().with_size(8, 8))
    else {
        return;
    };
    let registry = Arc::clone(renderer.registry().unwrap());

    let first = registry.get_effect::<CountingEffect>().unwrap();
    let second = registry.get_effect::<CountingEffect>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.initialized, 1);
    assert_eq!(registry.effect_count(), 1);

    let disposed = Arc::clone(&first.disposed);
    renderer.dispose();
    renderer.dispose();
    drop(renderer);
    assert_eq!(disposed.load(Ordering::SeqCst), 1);
}

#[rstest]
#[case::dummy(Backend::Dummy)]
fn test_random_texture_deterministic(#[case] backend: Backend) {
    let (Some(a), Some(b)) = (create_device(backend), create_device(backend)) else {
        return;
    };
    let first = ResourceRegistry::new(Arc::clone(&a));
    let second = ResourceRegistry::new(Arc::clone(&b));

    let texture = first.random_texture(16, 8).unwrap();
    assert!(Arc::ptr_eq(&texture, &first.random_texture(16, 8).unwrap()));

    let other = second.random_texture(16, 8).unwrap();
    assert_eq!(
        a.read_texture(&texture).unwrap(),
        b.read_texture(&other).unwrap()
    );

    let different = first.random_texture(8, 16).unwrap();
    assert_ne!(
        a.read_texture(&texture).unwrap(),
        a.read_texture(&different).unwrap()
    );
}

trait Provider: Send + Sync {
    fn id(&self) -> u32;
}

struct Dealer(u32);

impl Provider for Dealer {
    fn id(&self) -> u32 {
        self.0
    }
}

#[rstest]
#[case::dummy(Backend::Dummy)]
fn test_view_lookup_tracks_registry_contents(#[case] backend: Backend) {
    let Some(device) = create_device(backend) else {
        return;
    };
    let registry = ResourceRegistry::new(device);

    let dealer = Arc::new(Dealer(1));
    registry.set(Arc::clone(&dealer));
    registry.set_view::<Dealer, dyn Provider>(dealer).unwrap();
    assert_eq!(registry.get::<dyn Provider>().unwrap().id(), 1);

    registry
        .set_view::<Dealer, dyn Provider>(Arc::new(Dealer(2)))
        .unwrap();
    assert_eq!(registry.get::<dyn Provider>().unwrap().id(), 2);

    assert!(registry.remove::<Dealer>());
    assert!(matches!(
        registry.get::<dyn Provider>(),
        Err(RenderError::MissingSlot(_))
    ));
}

#[rstest]
#[case::dummy(Backend::Dummy)]
fn test_guests_leave_no_subscribers(#[case] backend: Backend) {
    let Some(owner) = create_renderer(backend, RendererSettings::new().with_size(8, 8)) else {
        return;
    };
    let registry = Arc::clone(owner.registry().unwrap());
    let baseline = registry.subscriber_count();

    for _ in 0..5 {
        let mut guest = RenderLoop::new(
            SplitScene::default(),
            RendererSettings::new().with_size(4, 4),
        );
        guest.initialize_shared(Arc::clone(&registry)).unwrap();
        guest.draw().unwrap();
        guest.dispose();
    }
    assert_eq!(registry.subscriber_count(), baseline);
}

// ============================================================================
// Initialization Mode Tests
// ============================================================================

#[rstest]
#[case::dummy(Backend::Dummy)]
fn test_shared_context_outlives_guest(#[case] backend: Backend) {
    let Some(owner) = create_renderer(backend, RendererSettings::new().with_size(8, 8)) else {
        return;
    };
    let registry = Arc::clone(owner.registry().unwrap());
    let effect = registry.get_effect::<CountingEffect>().unwrap();

    let mut guest = RenderLoop::new(
        SplitScene::default(),
        RendererSettings::new().with_size(4, 4),
    );
    guest.initialize_shared(Arc::clone(&registry)).unwrap();
    assert!(matches!(
        guest.initialize_shared(Arc::clone(&registry)),
        Err(RenderError::AlreadyInitialized)
    ));
    guest.draw().unwrap();
    guest.dispose();

    assert!(!registry.is_disposed());
    assert_eq!(effect.disposed.load(Ordering::SeqCst), 0);

    drop(owner);
    assert!(registry.is_disposed());
    assert_eq!(effect.disposed.load(Ordering::SeqCst), 1);
}

struct DemandingScene;

impl RenderHooks for DemandingScene {
    fn feature_level(&self) -> FeatureLevel {
        FeatureLevel::Level11_1
    }
}

#[test]
fn test_insufficient_feature_level_is_fatal() {
    let mut renderer = RenderLoop::new(DemandingScene, RendererSettings::new())
        .with_device_parameters(
            DeviceParameters::dummy().with_dummy_feature_level(FeatureLevel::Level10_1),
        );
    match renderer.initialize() {
        Err(RenderError::FeatureLevelUnsupported { required, actual }) => {
            assert_eq!(required, FeatureLevel::Level11_1);
            assert_eq!(actual, FeatureLevel::Level10_1);
        }
        other => panic!("unexpected result: {:?}", other.err()),
    }
    assert!(!renderer.is_initialized());
}

#[test]
fn test_low_feature_level_uses_16_bit_depth() {
    struct Legacy;
    impl RenderHooks for Legacy {
        fn feature_level(&self) -> FeatureLevel {
            FeatureLevel::Level9_3
        }
    }

    let mut renderer = RenderLoop::new(Legacy, RendererSettings::new().with_size(4, 4))
        .with_device_parameters(DeviceParameters::dummy());
    renderer.initialize().unwrap();
    renderer.draw().unwrap();
    assert_eq!(
        renderer.depth_target().unwrap().format(),
        TextureFormat::Depth16Unorm
    );
}
