use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{RenderError, RenderResult};

/// Receives progress of a long operation as a fraction from 0 to 1.
pub trait ProgressSink {
    fn report(&self, progress: f64);
}

impl<F: Fn(f64)> ProgressSink for F {
    fn report(&self, progress: f64) {
        self(progress)
    }
}

/// Maps the full 0..1 range of an inner step onto part of an outer sink.
pub struct Subrange<'a> {
    inner: &'a dyn ProgressSink,
    from: f64,
    range: f64,
}

impl<'a> Subrange<'a> {
    pub fn new(inner: &'a dyn ProgressSink, from: f64, range: f64) -> Self {
        Self { inner, from, range }
    }
}

impl ProgressSink for Subrange<'_> {
    fn report(&self, progress: f64) {
        self.inner
            .report(self.from + progress.clamp(0.0, 1.0) * self.range);
    }
}

/// Cooperative cancellation flag shared between a caller and a capture.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// `Err(Cancelled)` once [`cancel`](Self::cancel) was called.
    pub fn check(&self) -> RenderResult<()> {
        if self.is_cancelled() {
            Err(RenderError::Cancelled)
        } else {
            Ok(())
        }
    }
}
