//! # Preview
//!
//! Windowed viewer for the showroom scene.
//!
//! Keys:
//! - `M` toggle multisampling
//! - `S` toggle supersampling
//! - `V` toggle vsync
//! - `Space` pause
//! - `F` toggle fullscreen
//! - `P` capture the current frame at twice the window size

use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::{Arc, Weak};

use clap::Parser;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Fullscreen, Window, WindowId};

use showroom_demos::{CliBackend, ShowroomScene};
use showroom_graphics::{
    DeviceParameters, HostWindow, OutputHandle, RenderLoop, RenderResult, RendererSettings,
    ShotRequest,
};

#[derive(Parser, Debug)]
#[command(name = "preview", about = "Interactive showroom viewer")]
struct Args {
    /// Graphics backend.
    #[arg(long, value_enum, default_value_t = CliBackend::Wgpu)]
    backend: CliBackend,

    /// Start with multisampling enabled.
    #[arg(long)]
    msaa: bool,

    /// Directory captures are written to.
    #[arg(long, default_value = ".")]
    captures: PathBuf,
}

/// The preview window as seen by the renderer.
struct PreviewWindow(Weak<Window>);

impl HostWindow for PreviewWindow {
    fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    fn set_fullscreen(&self, fullscreen: bool) {
        if let Some(window) = self.0.upgrade() {
            window.set_fullscreen(fullscreen.then_some(Fullscreen::Borderless(None)));
        }
    }
}

struct App {
    args: Args,
    // Dropped before the window it presents to.
    renderer: Option<RenderLoop<ShowroomScene>>,
    window: Option<Arc<Window>>,
    captures: u32,
}

impl App {
    fn new(args: Args) -> Self {
        Self {
            args,
            renderer: None,
            window: None,
            captures: 0,
        }
    }

    fn create_renderer(&self, window: &Arc<Window>) -> RenderResult<RenderLoop<ShowroomScene>> {
        let size = window.inner_size();
        let settings = RendererSettings::new()
            .with_size(size.width, size.height)
            .with_msaa(self.args.msaa);
        let mut renderer = RenderLoop::new(ShowroomScene::new(), settings).with_device_parameters(
            DeviceParameters::new()
                .with_backend(self.args.backend.into())
                .with_label("preview"),
        );

        // SAFETY: the renderer field is declared before the window and is
        // disposed on close, so the swap chain never outlives the window.
        let output = unsafe { OutputHandle::from_window(&**window)? };
        renderer.initialize_on_screen(output)?;
        renderer.set_host_window(Some(
            Arc::new(PreviewWindow(Arc::downgrade(window))) as Arc<dyn HostWindow>
        ));
        Ok(renderer)
    }

    fn handle_key(&mut self, key: KeyCode) -> RenderResult<()> {
        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(());
        };
        match key {
            KeyCode::KeyM => {
                let enabled = !renderer.use_msaa();
                renderer.set_use_msaa(enabled)?;
                log::info!("MSAA {}", if enabled { "on" } else { "off" });
            }
            KeyCode::KeyS => {
                let enabled = !renderer.use_ssaa();
                renderer.set_use_ssaa(enabled)?;
                log::info!("SSAA {}", if enabled { "on" } else { "off" });
            }
            KeyCode::KeyV => {
                let enabled = !renderer.vsync();
                renderer.set_vsync(enabled);
                log::info!("VSync {}", if enabled { "on" } else { "off" });
            }
            KeyCode::Space => {
                let paused = !renderer.is_paused();
                renderer.set_paused(paused);
                log::info!("{}", if paused { "Paused" } else { "Resumed" });
            }
            KeyCode::KeyF => {
                renderer.toggle_fullscreen()?;
            }
            KeyCode::KeyP => self.capture()?,
            _ => {}
        }
        Ok(())
    }

    fn capture(&mut self) -> RenderResult<()> {
        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(());
        };
        let request = ShotRequest::new(renderer.width() * 2, renderer.height() * 2);
        let path = self
            .args
            .captures
            .join(format!("showroom_{:03}.png", self.captures));
        let mut writer = BufWriter::new(File::create(&path)?);

        let outcome = renderer.shot(&request, &mut writer, None, None)?;
        self.captures += 1;
        log::info!(
            "Captured {} ({}x{})",
            path.display(),
            outcome.width,
            outcome.height
        );
        Ok(())
    }

    fn render_frame(&mut self) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        if renderer.host_window().is_none() {
            return;
        }
        if let Err(e) = renderer.draw() {
            log::error!("Frame failed: {}", e);
            return;
        }
        if renderer.frames() % 60 == 0
            && let Some(window) = &self.window
        {
            window.set_title(&format!("Showroom - {:.0} fps", renderer.fps()));
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let window_attributes = Window::default_attributes()
            .with_title("Showroom")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };
        log::info!("Window created successfully");

        match self.create_renderer(&window) {
            Ok(renderer) => {
                let adapter = renderer.device().map(|device| device.adapter_info().clone());
                if let Ok(adapter) = adapter {
                    log::info!("Rendering on {} ({})", adapter.name, adapter.backend);
                }
                self.renderer = Some(renderer);
                window.request_redraw();
                self.window = Some(window);
            }
            Err(e) => {
                log::error!("Failed to initialize renderer: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting...");
                if let Some(mut renderer) = self.renderer.take() {
                    renderer.dispose();
                }
                self.window = None;
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut()
                    && let Err(e) = renderer.resize(size.width, size.height)
                {
                    log::error!("Resize failed: {}", e);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if let Err(e) = self.handle_key(key) {
                    log::error!("{:?} failed: {}", key, e);
                }
            }
            WindowEvent::RedrawRequested => {
                self.render_frame();
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    showroom_demos::init_logging();
    let args = Args::parse();

    log::info!("Starting showroom preview");
    log::info!("Graphics version: {}", showroom_graphics::VERSION);
    showroom_graphics::init();

    let event_loop = EventLoop::new()?;
    let mut app = App::new(args);
    event_loop.run_app(&mut app)?;
    Ok(())
}
