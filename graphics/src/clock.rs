//! Frame timing.
//!
//! [`FrameClock`] tracks elapsed time, per-frame deltas and frames per
//! second over a fixed-size rolling window of recent frame durations.
//!
//! Time can come from the wall clock ([`FrameClock::tick`]) or be injected
//! ([`FrameClock::tick_at`]), which keeps tests deterministic.
//!
//! # Example
//!
//! ```
//! use showroom_graphics::FrameClock;
//!
//! let mut clock = FrameClock::new(32);
//! clock.tick_at(0.0);
//! let dt = clock.tick_at(0.5);
//! assert_eq!(dt, 0.5);
//! assert_eq!(clock.frame_count(), 2);
//! ```

use std::collections::VecDeque;
use std::time::Instant;

/// Rolling-window frame clock.
#[derive(Debug, Clone)]
pub struct FrameClock {
    started: Option<Instant>,
    previous_elapsed: f32,
    durations: VecDeque<f32>,
    window: usize,
    frame_count: u64,
    last_frame_time: f32,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(32)
    }
}

impl FrameClock {
    /// Create a clock averaging over the last `window` frames.
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            started: None,
            previous_elapsed: 0.0,
            durations: VecDeque::with_capacity(window),
            window,
            frame_count: 0,
            last_frame_time: 0.0,
        }
    }

    /// Start the wall clock if it is not running yet.
    pub fn start(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    /// Whether the wall clock is running.
    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    /// Seconds since the wall clock started, or 0 if it has not.
    pub fn elapsed(&self) -> f32 {
        self.started
            .map(|started| started.elapsed().as_secs_f32())
            .unwrap_or(0.0)
    }

    /// Advance to the wall-clock time and return the unscaled delta.
    pub fn tick(&mut self) -> f32 {
        self.start();
        self.tick_at(self.elapsed())
    }

    /// Advance to an explicit elapsed time and return the delta since the
    /// previous tick.
    ///
    /// The delta is never negative; a clock moving backwards yields 0.
    pub fn tick_at(&mut self, elapsed: f32) -> f32 {
        let delta = (elapsed - self.previous_elapsed).max(0.0);
        self.previous_elapsed = elapsed;
        self.register_frame(delta);
        delta
    }

    /// Discard time accumulated since the last tick, e.g. after a pause.
    pub fn reset_delta(&mut self) {
        self.previous_elapsed = self.elapsed();
    }

    /// Discard accumulated time up to an explicit elapsed value.
    pub fn reset_delta_at(&mut self, elapsed: f32) {
        self.previous_elapsed = elapsed;
    }

    /// Record one frame that took `duration` seconds.
    pub fn register_frame(&mut self, duration: f32) {
        if self.durations.len() == self.window {
            self.durations.pop_front();
        }
        self.durations.push_back(duration);
        self.frame_count += 1;
        self.last_frame_time = duration;
    }

    /// Total number of frames registered.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Duration of the most recent frame in seconds.
    pub fn last_frame_time(&self) -> f32 {
        self.last_frame_time
    }

    /// Average frame duration over the window.
    pub fn average_frame_time(&self) -> f32 {
        if self.durations.is_empty() {
            return 0.0;
        }
        self.durations.iter().sum::<f32>() / self.durations.len() as f32
    }

    /// Frames per second over the window, 0 until time has passed.
    pub fn fps(&self) -> f32 {
        let average = self.average_frame_time();
        if average > 0.0 { 1.0 / average } else { 0.0 }
    }
}
