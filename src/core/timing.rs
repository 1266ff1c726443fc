use std::time::Instant;

/// Converts wall-clock time into chart time.
///
/// `game_time = elapsed + additional_offset - pause_at_start`, so a chart starts
/// `pause_at_start` seconds "before" zero.
#[derive(Clone, Copy, Debug)]
pub struct GameClock {
    started_at: Option<Instant>,
    pub additional_offset_sec: f64,
    pub pause_at_start_sec: f64,
}

impl GameClock {
    pub fn new(additional_offset_sec: f64, pause_at_start_sec: f64) -> Self {
        Self {
            started_at: None,
            additional_offset_sec,
            pause_at_start_sec,
        }
    }

    pub fn start(&mut self, now: Instant) {
        self.started_at = Some(now);
    }

    #[inline(always)]
    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    #[inline(always)]
    pub fn game_time_from_elapsed(&self, elapsed_sec: f64) -> f64 {
        elapsed_sec + self.additional_offset_sec - self.pause_at_start_sec
    }

    /// Game time at `now`, or the time at start if the clock has not been started.
    pub fn game_time_at(&self, now: Instant) -> f64 {
        let elapsed = self
            .started_at
            .map_or(0.0, |t| now.saturating_duration_since(t).as_secs_f64());
        self.game_time_from_elapsed(elapsed)
    }

    /// Game time when no wall time has elapsed yet.
    pub fn initial_game_time(&self) -> f64 {
        self.game_time_from_elapsed(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn applies_offset_and_pause() {
        let clock = GameClock::new(0.05, 2.0);
        assert!((clock.game_time_from_elapsed(3.0) - 1.05).abs() < 1e-12);
        assert!((clock.initial_game_time() + 1.95).abs() < 1e-12);
    }

    #[test]
    fn measures_from_start_instant() {
        let t0 = Instant::now();
        let mut clock = GameClock::new(0.0, 1.0);
        assert!(!clock.is_running());
        clock.start(t0);
        let t = clock.game_time_at(t0 + Duration::from_millis(1500));
        assert!((t - 0.5).abs() < 1e-9);
        assert_eq!(clock.game_time_at(t0), -1.0);
    }
}
