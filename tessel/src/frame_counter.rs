use std::collections::VecDeque;
use web_time::Duration;

const FRAME_WINDOW: usize = 60;

/// Timing of the most recently rendered frames, kept by the render role.
#[derive(Debug, Clone)]
pub struct FrameCounter {
    window: usize,
    recent: VecDeque<Duration>,
    total: u64,
}

impl Default for FrameCounter {
    fn default() -> Self {
        Self::with_window(FRAME_WINDOW)
    }
}

impl FrameCounter {
    pub fn with_window(window: usize) -> Self {
        let window = window.max(1);
        FrameCounter {
            window,
            recent: VecDeque::with_capacity(window),
            total: 0,
        }
    }

    pub(crate) fn record(&mut self, delta: Duration) {
        if self.recent.len() == self.window {
            self.recent.pop_front();
        }
        self.recent.push_back(delta);
        self.total += 1;
    }

    /// Frames rendered since the counter was created.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn frames(&self) -> usize {
        self.recent.len()
    }

    /// Mean frame time over the window, zero before the first frame.
    pub fn delta_mean(&self) -> Duration {
        match u32::try_from(self.recent.len()) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.recent.iter().sum::<Duration>() / n,
        }
    }

    /// Slowest frame in the window.
    pub fn delta_high(&self) -> Duration {
        self.recent.iter().copied().max().unwrap_or_default()
    }

    pub fn fps_mean(&self) -> u32 {
        per_second(self.delta_mean())
    }

    pub fn fps_low(&self) -> u32 {
        per_second(self.delta_high())
    }
}

fn per_second(delta: Duration) -> u32 {
    if delta.is_zero() {
        0
    } else {
        (1.0 / delta.as_secs_f64()).round() as u32
    }
}
