//! Procedural demo scene.
//!
//! A noise backdrop, a floor band and a car-shaped block sliding back and
//! forth, with a progress bar drawn through the sprite overlay.

use std::sync::Arc;

use showroom_graphics::{
    Color, FrameContext, Rect, Region, RenderHooks, RenderResult, Texture,
};

const NOISE_SIZE: u32 = 64;
const FLOOR: Color = Color::new(0.18, 0.18, 0.2, 1.0);
const BODY: Color = Color::new(0.75, 0.08, 0.1, 1.0);
const GLASS: Color = Color::new(0.1, 0.12, 0.16, 1.0);

#[derive(Default)]
pub struct ShowroomScene {
    time: f32,
    noise: Option<Arc<Texture>>,
}

impl ShowroomScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds of scene time simulated so far.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Horizontal position of the car in `0..=1`.
    fn car_position(&self) -> f32 {
        (self.time * 0.5).sin() * 0.5 + 0.5
    }
}

impl RenderHooks for ShowroomScene {
    fn initialize_resources(&mut self, ctx: &mut FrameContext<'_>) -> RenderResult<()> {
        self.noise = Some(ctx.registry().random_texture(NOISE_SIZE, NOISE_SIZE)?);
        Ok(())
    }

    fn on_tick(&mut self, dt: f32) {
        self.time += dt;
    }

    fn draw_frame(&mut self, ctx: &mut FrameContext<'_>) -> RenderResult<()> {
        let target = Arc::clone(ctx.render_target()?);
        let device = Arc::clone(ctx.device());
        let (width, height) = target.size();

        ctx.clear_depth(1.0)?;
        match &self.noise {
            // Blits only target single-sampled textures
            Some(noise) if !target.is_multisampled() => device.blit(
                noise,
                Region::full(NOISE_SIZE, NOISE_SIZE),
                &target,
            )?,
            _ => ctx.clear(Color::DARK_CYAN)?,
        }

        let horizon = height * 2 / 3;
        device.fill_rect(&target, Rect::new(0, horizon, width, height - horizon), FLOOR)?;

        let car_width = (width / 4).max(1);
        let car_height = (height / 8).max(1);
        let x = ((width - car_width) as f32 * self.car_position()) as u32;
        let y = horizon.saturating_sub(car_height);
        device.fill_rect(&target, Rect::new(x, y, car_width, car_height), BODY)?;
        device.fill_rect(
            &target,
            Rect::new(
                x + car_width / 4,
                y.saturating_sub(car_height / 2),
                car_width / 2,
                car_height / 2,
            ),
            GLASS,
        )?;

        let output = ctx.output_viewport();
        let progress = self.car_position();
        if let Some(sprite) = ctx.sprite() {
            sprite.draw_rect(
                Region::new(8.0, 8.0, (output.width - 16.0).max(0.0) * progress, 4.0),
                Color::WHITE,
            );
        }
        ctx.report_progress(1.0);
        Ok(())
    }

    fn dispose_resources(&mut self) {
        self.noise = None;
    }
}
