//! Game timer for frame timing.
//!
//! Tracks total running time (excluding paused spans) and the delta between
//! consecutive ticks. Both feed the per-pass constants every frame.

use std::time::{Duration, Instant};

/// Frame timer with pause support.
#[derive(Debug)]
pub struct GameTimer {
    base: Instant,
    last_tick: Instant,
    paused_total: Duration,
    stopped_at: Option<Instant>,
    delta: Duration,
}

impl GameTimer {
    /// Create a new timer, starting from now.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            base: now,
            last_tick: now,
            paused_total: Duration::ZERO,
            stopped_at: None,
            delta: Duration::ZERO,
        }
    }

    /// Advance the timer. Call once per frame.
    pub fn tick(&mut self) {
        self.advance_to(Instant::now());
    }

    fn advance_to(&mut self, now: Instant) {
        if self.stopped_at.is_some() {
            self.delta = Duration::ZERO;
            return;
        }
        self.delta = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;
    }

    /// Seconds elapsed between the two most recent ticks. Zero while stopped.
    pub fn delta_time(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Seconds since the timer was created or reset, excluding time spent stopped.
    pub fn total_time(&self) -> f32 {
        let end = self.stopped_at.unwrap_or(self.last_tick);
        end.saturating_duration_since(self.base)
            .saturating_sub(self.paused_total)
            .as_secs_f32()
    }

    /// Pause the timer (e.g. while the window is minimized).
    pub fn stop(&mut self) {
        if self.stopped_at.is_none() {
            self.stopped_at = Some(Instant::now());
        }
    }

    /// Resume a stopped timer.
    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    fn start_at(&mut self, now: Instant) {
        if let Some(stopped) = self.stopped_at.take() {
            self.paused_total += now.saturating_duration_since(stopped);
            self.last_tick = now;
        }
    }

    /// Whether the timer is currently stopped.
    pub fn is_stopped(&self) -> bool {
        self.stopped_at.is_some()
    }

    /// Reset the timer to the current time.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for GameTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_timer_is_zero() {
        let timer = GameTimer::new();
        assert_eq!(timer.delta_time(), 0.0);
        assert_eq!(timer.total_time(), 0.0);
        assert!(!timer.is_stopped());
    }

    #[test]
    fn test_delta_and_total() {
        let mut timer = GameTimer::new();
        let base = timer.base;
        timer.advance_to(base + Duration::from_millis(16));
        assert!((timer.delta_time() - 0.016).abs() < 1e-6);
        timer.advance_to(base + Duration::from_millis(48));
        assert!((timer.delta_time() - 0.032).abs() < 1e-6);
        assert!((timer.total_time() - 0.048).abs() < 1e-6);
    }

    #[test]
    fn test_stopped_time_is_excluded() {
        let mut timer = GameTimer::new();
        let base = timer.base;
        timer.advance_to(base + Duration::from_millis(100));
        timer.stopped_at = Some(base + Duration::from_millis(100));
        timer.advance_to(base + Duration::from_millis(150));
        assert_eq!(timer.delta_time(), 0.0);

        timer.start_at(base + Duration::from_millis(600));
        timer.advance_to(base + Duration::from_millis(700));
        assert!((timer.delta_time() - 0.1).abs() < 1e-6);
        assert!((timer.total_time() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut timer = GameTimer::new();
        timer.stop();
        let first = timer.stopped_at;
        timer.stop();
        assert_eq!(first, timer.stopped_at);
        timer.start();
        assert!(!timer.is_stopped());
    }
}
