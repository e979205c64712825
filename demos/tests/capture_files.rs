//! Captures of the demo scene written to disk and read back.

use std::fs::File;
use std::io::BufWriter;

use showroom_demos::{CliFormat, ShowroomScene};
use showroom_graphics::{DeviceParameters, RenderLoop, RendererSettings, ShotRequest};

fn create_renderer(settings: RendererSettings) -> RenderLoop<ShowroomScene> {
    let mut renderer = RenderLoop::new(ShowroomScene::new(), settings)
        .with_device_parameters(DeviceParameters::dummy());
    renderer.initialize().unwrap();
    renderer.draw_at(0.0).unwrap();
    renderer
}

#[test]
fn test_downscaled_jpeg_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("car.jpg");
    let mut renderer = create_renderer(RendererSettings::new().with_size(160, 90));

    let request = ShotRequest::new(640, 360)
        .with_downscale(0.5)
        .with_format(CliFormat::Jpeg.to_shot_format(85));
    let mut writer = BufWriter::new(File::create(&path).unwrap());
    let outcome = renderer.shot(&request, &mut writer, None, None).unwrap();
    drop(writer);

    assert!(!outcome.fast_path);
    let image = image::open(&path).unwrap();
    assert_eq!((image.width(), image.height()), (320, 180));
    assert_eq!((renderer.width(), renderer.height()), (160, 90));
}

#[test]
fn test_msaa_exr_burst_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let mut renderer =
        create_renderer(RendererSettings::new().with_size(64, 64).with_msaa(true));
    let request = ShotRequest::new(128, 128).with_format(CliFormat::Exr.to_shot_format(0));

    for index in 0..3 {
        renderer.draw_at(index as f32 * 0.25).unwrap();
        let path = dir.path().join(format!("frame_{index}.exr"));
        let mut writer = BufWriter::new(File::create(&path).unwrap());
        renderer.shot(&request, &mut writer, None, None).unwrap();
        drop(writer);

        let image = image::open(&path).unwrap();
        assert_eq!((image.width(), image.height()), (128, 128));
    }
    assert!(!renderer.shot_in_process());
    assert!(renderer.use_msaa());
}
