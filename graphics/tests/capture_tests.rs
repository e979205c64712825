//! Frame capture integration tests.
//!
//! Captures are decoded again and checked for size and content, so every
//! stage of the pipeline (resolve, downscale, crop, encode) is observable.

mod common;

use std::io::Cursor;
use std::sync::Arc;

use rstest::rstest;

use common::{Backend, LEFT, RIGHT, create_renderer, decode};
use showroom_graphics::{
    CancellationToken, RenderError, RendererSettings, ShotFormat, ShotRequest,
};

// ============================================================================
// Fast Path Tests
// ============================================================================

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::webgpu(Backend::WebGpu)]
fn test_fast_path_allocates_nothing(#[case] backend: Backend) {
    let Some(mut renderer) = create_renderer(backend, RendererSettings::new().with_size(48, 32))
    else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    renderer.draw().unwrap();
    let device = Arc::clone(renderer.device().unwrap());
    let live = Arc::clone(renderer.render_target().unwrap());
    let created = device.textures_created();

    let mut out = Cursor::new(Vec::new());
    let outcome = renderer
        .shot(&ShotRequest::new(48, 32), &mut out, None, None)
        .unwrap();

    assert!(outcome.fast_path);
    assert_eq!(device.textures_created(), created);
    assert!(Arc::ptr_eq(&live, renderer.render_target().unwrap()));
    assert_eq!((renderer.width(), renderer.height()), (48, 32));
    assert_eq!(renderer.capture_buffer_count(), 0);
    assert_eq!(decode(out).to_rgba8().dimensions(), (48, 32));
}

#[rstest]
#[case::dummy(Backend::Dummy)]
fn test_fast_path_content(#[case] backend: Backend) {
    let Some(mut renderer) = create_renderer(backend, RendererSettings::new().with_size(40, 20))
    else {
        return;
    };

    let mut out = Cursor::new(Vec::new());
    renderer
        .shot(&ShotRequest::new(40, 20), &mut out, None, None)
        .unwrap();

    let image = decode(out).to_rgba8();
    assert_eq!(image.get_pixel(0, 0).0, LEFT);
    assert_eq!(image.get_pixel(19, 19).0, LEFT);
    assert_eq!(image.get_pixel(20, 0).0, RIGHT);
    assert_eq!(image.get_pixel(39, 19).0, RIGHT);
}

#[rstest]
#[case::dummy(Backend::Dummy)]
fn test_host_compositing_target_encodes_as_rgba(#[case] backend: Backend) {
    let Some(mut renderer) = create_renderer(
        backend,
        RendererSettings::new()
            .with_size(16, 8)
            .with_host_compositing(true),
    ) else {
        return;
    };
    renderer.draw().unwrap();
    assert_eq!(
        renderer.render_target().unwrap().format(),
        showroom_graphics::TextureFormat::Bgra8Unorm
    );

    let mut out = Cursor::new(Vec::new());
    renderer
        .shot(&ShotRequest::new(16, 8), &mut out, None, None)
        .unwrap();
    let image = decode(out).to_rgba8();
    assert_eq!(image.get_pixel(2, 2).0, LEFT);
    assert_eq!(image.get_pixel(14, 2).0, RIGHT);
}

// ============================================================================
// General Path Tests
// ============================================================================

#[rstest]
#[case::even(Backend::Dummy, 200, 100, 0.5, (100, 50))]
#[case::odd(Backend::Dummy, 101, 51, 0.5, (51, 26))]
#[case::quarter(Backend::Dummy, 400, 300, 0.25, (100, 75))]
#[case::third(Backend::Dummy, 90, 45, 1.0 / 3.0, (30, 15))]
fn test_downscaled_size(
    #[case] backend: Backend,
    #[case] width: u32,
    #[case] height: u32,
    #[case] downscale: f64,
    #[case] expected: (u32, u32),
) {
    let Some(mut renderer) = create_renderer(backend, RendererSettings::new().with_size(64, 64))
    else {
        return;
    };

    let mut out = Cursor::new(Vec::new());
    let outcome = renderer
        .shot(
            &ShotRequest::new(width, height).with_downscale(downscale),
            &mut out,
            None,
            None,
        )
        .unwrap();

    assert!(!outcome.fast_path);
    assert_eq!((outcome.width, outcome.height), expected);
    let image = decode(out).to_rgba8();
    assert_eq!(image.dimensions(), expected);
    assert_eq!(image.get_pixel(1, 1).0, LEFT);
    assert_eq!(image.get_pixel(expected.0 - 2, 1).0, RIGHT);
}

#[rstest]
#[case::half(Backend::Dummy, 0.5, (160, 80))]
#[case::quarter(Backend::Dummy, 0.25, (320, 160))]
fn test_cropped_size_and_center(
    #[case] backend: Backend,
    #[case] crop: f64,
    #[case] expected: (u32, u32),
) {
    let Some(mut renderer) = create_renderer(backend, RendererSettings::new().with_size(32, 32))
    else {
        return;
    };

    let mut out = Cursor::new(Vec::new());
    let outcome = renderer
        .shot(
            &ShotRequest::new(80, 40).with_crop(crop),
            &mut out,
            None,
            None,
        )
        .unwrap();

    assert_eq!((outcome.width, outcome.height), expected);
    let image = decode(out).to_rgba8();
    assert_eq!(image.dimensions(), expected);
    // The center crop still straddles the split.
    let row = expected.1 / 2;
    assert_eq!(image.get_pixel(2, row).0, LEFT);
    assert_eq!(image.get_pixel(expected.0 - 3, row).0, RIGHT);
}

#[rstest]
#[case::dummy(Backend::Dummy)]
fn test_downscale_then_crop(#[case] backend: Backend) {
    let Some(mut renderer) = create_renderer(backend, RendererSettings::new().with_size(32, 32))
    else {
        return;
    };
    let request = ShotRequest::new(200, 120)
        .with_downscale(0.5)
        .with_crop(0.5);

    let outcome = renderer
        .shot(&request, &mut Cursor::new(Vec::new()), None, None)
        .unwrap();
    assert_eq!((outcome.width, outcome.height), (200, 120));
    assert_eq!(
        (renderer.last_shot_width(), renderer.last_shot_height()),
        (200, 120)
    );
}

#[rstest]
#[case::dummy(Backend::Dummy)]
fn test_supersampled_msaa_shot_restores_live_state(#[case] backend: Backend) {
    let Some(mut renderer) = create_renderer(
        backend,
        RendererSettings::new()
            .with_size(30, 20)
            .with_msaa(true)
            .with_resolution_multiplier(2.0),
    ) else {
        return;
    };
    renderer.draw().unwrap();

    let mut out = Cursor::new(Vec::new());
    let outcome = renderer
        .shot(&ShotRequest::new(60, 40), &mut out, None, None)
        .unwrap();
    assert!(!outcome.fast_path);
    assert_eq!((outcome.width, outcome.height), (60, 40));
    let image = decode(out).to_rgba8();
    assert_eq!(image.get_pixel(5, 5).0, LEFT);

    assert_eq!((renderer.width(), renderer.height()), (30, 20));
    assert_eq!(renderer.resolution_multiplier(), 2.0);
    let target = renderer.render_target().unwrap();
    assert_eq!(target.size(), (60, 40));
    assert_eq!(target.sample_count(), 4);
}

#[rstest]
#[case::dummy(Backend::Dummy)]
fn test_hdr_formats_render_in_float(#[case] backend: Backend) {
    let Some(mut renderer) = create_renderer(backend, RendererSettings::new().with_size(16, 16))
    else {
        return;
    };

    let mut out = Cursor::new(Vec::new());
    let outcome = renderer
        .shot(
            &ShotRequest::new(16, 16)
                .with_format(ShotFormat::Exr)
                .with_downscale(0.5),
            &mut out,
            None,
            None,
        )
        .unwrap();
    assert_eq!((outcome.width, outcome.height), (8, 8));
    let image = decode(out).to_rgba32f();
    let [r, g, b, a] = image.get_pixel(0, 0).0;
    assert!((r - 1.0).abs() < 1e-3 && g.abs() < 1e-3 && b.abs() < 1e-3);
    assert!((a - 1.0).abs() < 1e-3);
}

#[rstest]
#[case::dummy(Backend::Dummy)]
fn test_burst_reuses_capture_buffers(#[case] backend: Backend) {
    let Some(mut renderer) = create_renderer(backend, RendererSettings::new().with_size(16, 16))
    else {
        return;
    };
    let device = Arc::clone(renderer.device().unwrap());
    let request = ShotRequest::new(64, 64).with_downscale(0.5);

    renderer
        .shot(&request, &mut Cursor::new(Vec::new()), None, None)
        .unwrap();
    assert_eq!(renderer.capture_buffer_count(), 2);

    let mut per_shot = Vec::new();
    for _ in 0..3 {
        let before = device.textures_created();
        renderer
            .shot(&request, &mut Cursor::new(Vec::new()), None, None)
            .unwrap();
        per_shot.push(device.textures_created() - before);
    }
    // Only the live targets are recreated around each shot.
    assert!(per_shot.iter().all(|&count| count == per_shot[0]));
    assert_eq!(renderer.capture_buffer_count(), 2);
}

// ============================================================================
// Failure Tests
// ============================================================================

#[rstest]
#[case::dummy(Backend::Dummy)]
fn test_failed_draw_restores_state(#[case] backend: Backend) {
    let Some(mut renderer) = create_renderer(
        backend,
        RendererSettings::new()
            .with_size(24, 12)
            .with_resolution_multiplier(1.5),
    ) else {
        return;
    };
    renderer.draw().unwrap();
    renderer.hooks_mut().fail_draw = true;

    for request in [
        ShotRequest::new(100, 100),
        ShotRequest::new(100, 100).with_downscale(0.5).with_crop(0.5),
    ] {
        let result = renderer.shot(&request, &mut Cursor::new(Vec::new()), None, None);
        assert!(matches!(result, Err(RenderError::Backend(_))));
        assert!(!renderer.shot_in_process());
        assert!(!renderer.shot_draw_in_process());
        assert!(!renderer.surface().is_render_view_replaced());
        assert_eq!((renderer.width(), renderer.height()), (24, 12));
        assert_eq!(renderer.resolution_multiplier(), 1.5);
        assert_eq!(renderer.render_target().unwrap().size(), (36, 18));
    }
}

#[rstest]
#[case::dummy(Backend::Dummy)]
fn test_cancel_before_start(#[case] backend: Backend) {
    let Some(mut renderer) = create_renderer(backend, RendererSettings::new().with_size(8, 8))
    else {
        return;
    };
    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut out = Cursor::new(Vec::new());
    let result = renderer.shot(&ShotRequest::new(8, 8), &mut out, None, Some(&cancel));
    assert!(matches!(result, Err(RenderError::Cancelled)));
    assert!(out.into_inner().is_empty());
    assert_eq!(renderer.hooks().frames, 0);
}
