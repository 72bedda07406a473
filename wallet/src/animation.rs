//! Count-up animation for the balance display.
//!
//! Presentation only. The animated value is never read back by validation;
//! the authoritative balance stays in the session.

use std::time::Duration;

use crate::format::format_xlm;

/// Interpolates from `start` to `end` over `duration` with ease-out-expo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CountUp {
    pub start: f64,
    pub end: f64,
    pub duration: Duration,
}

impl CountUp {
    pub const DEFAULT_DURATION: Duration = Duration::from_millis(1000);

    pub fn new(start: f64, end: f64, duration: Duration) -> Self {
        Self {
            start,
            end,
            duration,
        }
    }

    /// Animate from the previously displayed value to a new one.
    pub fn from_previous(previous: f64, end: f64) -> Self {
        Self::new(previous, end, Self::DEFAULT_DURATION)
    }

    /// Value to display `elapsed` after the animation began.
    pub fn value_at(&self, elapsed: Duration) -> f64 {
        if self.is_complete(elapsed) {
            return self.end;
        }
        let progress = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        self.start + (self.end - self.start) * ease_out_expo(progress)
    }

    /// Formatted the way the balance card shows it.
    pub fn display_at(&self, elapsed: Duration) -> String {
        format_xlm(&format!("{:.7}", self.value_at(elapsed)))
    }

    pub fn is_complete(&self, elapsed: Duration) -> bool {
        self.duration.is_zero() || elapsed >= self.duration
    }

    /// Values sampled every `step`, always ending with exactly `end`.
    pub fn frames(&self, step: Duration) -> Frames {
        Frames {
            animation: *self,
            step,
            elapsed: Duration::ZERO,
            done: false,
        }
    }
}

fn ease_out_expo(progress: f64) -> f64 {
    if progress >= 1.0 {
        1.0
    } else {
        1.0 - 2f64.powf(-10.0 * progress)
    }
}

/// Iterator returned by [`CountUp::frames`]
#[derive(Debug, Clone)]
pub struct Frames {
    animation: CountUp,
    step: Duration,
    elapsed: Duration,
    done: bool,
}

impl Iterator for Frames {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.done {
            return None;
        }
        // A zero step would never reach the end.
        if self.step.is_zero() || self.animation.is_complete(self.elapsed) {
            self.done = true;
            return Some(self.animation.end);
        }
        let value = self.animation.value_at(self.elapsed);
        self.elapsed = self.elapsed.saturating_add(self.step);
        Some(value)
    }
}
