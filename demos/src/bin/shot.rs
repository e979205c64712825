//! # Shot
//!
//! Render the demo scene off-screen and capture it to image files.
//!
//! ```bash
//! # 4K PNG
//! cargo run -p showroom-demos --bin shot -- --width 3840 --height 2160 -o car.png
//!
//! # Half-size, zoomed 2x into the center, as EXR
//! cargo run -p showroom-demos --bin shot -- --downscale 0.5 --crop 0.5 --format exr -o car.exr
//!
//! # Burst of 10 frames 1/30 s apart on the CPU backend
//! cargo run -p showroom-demos --bin shot -- --backend dummy --count 10 --step 0.0333
//! ```

use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use clap::Parser;

use showroom_demos::{CliBackend, CliFormat, ShowroomScene};
use showroom_graphics::{
    DeviceParameters, RenderLoop, RendererSettings, ShotFormat, ShotRequest,
};

/// Showroom capture tool.
#[derive(Parser, Debug)]
#[command(name = "shot", about = "Render the showroom scene to image files")]
struct Args {
    /// Capture width in pixels.
    #[arg(long, default_value_t = 1920)]
    width: u32,

    /// Capture height in pixels.
    #[arg(long, default_value_t = 1080)]
    height: u32,

    /// Output scale in (0, 1].
    #[arg(long, default_value_t = 1.0)]
    downscale: f64,

    /// Centered fraction of the frame to keep, in (0, 1].
    #[arg(long, default_value_t = 1.0)]
    crop: f64,

    /// Output format. Guessed from the output extension when omitted.
    #[arg(long, value_enum)]
    format: Option<CliFormat>,

    /// JPEG quality.
    #[arg(long, default_value_t = 90)]
    quality: u8,

    /// Render with multisampling.
    #[arg(long)]
    msaa: bool,

    /// Samples per pixel when multisampling.
    #[arg(long, default_value_t = 4)]
    samples: u32,

    /// Live resolution multiplier.
    #[arg(long, default_value_t = 1.0)]
    multiplier: f64,

    /// Graphics backend.
    #[arg(long, value_enum, default_value_t = CliBackend::Auto)]
    backend: CliBackend,

    /// Number of frames to capture.
    #[arg(long, default_value_t = 1)]
    count: u32,

    /// Scene time between captured frames, in seconds.
    #[arg(long, default_value_t = 0.5)]
    step: f32,

    /// Output file. Bursts append the frame index to the file stem.
    #[arg(short, long, default_value = "shot.png")]
    output: PathBuf,
}

impl Args {
    fn shot_format(&self) -> ShotFormat {
        match self.format {
            Some(format) => format.to_shot_format(self.quality),
            None => self
                .output
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(ShotFormat::from_extension)
                .unwrap_or_default(),
        }
    }

    fn frame_path(&self, index: u32, format: ShotFormat) -> PathBuf {
        let stem = self
            .output
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("shot");
        let name = if self.count > 1 {
            format!("{stem}_{index:04}.{}", format.extension())
        } else {
            format!("{stem}.{}", format.extension())
        };
        self.output
            .parent()
            .map(|parent| parent.join(&name))
            .unwrap_or_else(|| Path::new(&name).to_path_buf())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    showroom_demos::init_logging();
    let args = Args::parse();

    log::info!("Starting showroom shot tool");
    log::info!("Graphics version: {}", showroom_graphics::VERSION);
    showroom_graphics::init();

    let format = args.shot_format();
    let request = ShotRequest::new(args.width, args.height)
        .with_downscale(args.downscale)
        .with_crop(args.crop)
        .with_format(format);
    request.validate()?;

    let settings = RendererSettings::new()
        .with_size(args.width, args.height)
        .with_msaa(args.msaa)
        .with_msaa_sample_count(args.samples)
        .with_resolution_multiplier(args.multiplier);
    let mut renderer = RenderLoop::new(ShowroomScene::new(), settings).with_device_parameters(
        DeviceParameters::new()
            .with_backend(args.backend.into())
            .with_label("shot"),
    );
    renderer.initialize()?;

    let device = renderer.device()?;
    let adapter = device.adapter_info();
    log::info!("Rendering on {} ({})", adapter.name, adapter.backend);

    for index in 0..args.count {
        renderer.draw_at(index as f32 * args.step)?;

        let path = args.frame_path(index, format);
        let mut writer = BufWriter::new(File::create(&path)?);
        let progress = |p: f64| log::debug!("{}: {:.0}%", path.display(), p * 100.0);
        let outcome = renderer.shot(&request, &mut writer, Some(&progress), None)?;

        log::info!(
            "Wrote {} ({}x{}{})",
            path.display(),
            outcome.width,
            outcome.height,
            if outcome.fast_path { ", direct" } else { "" }
        );
    }

    renderer.dispose();
    Ok(())
}
