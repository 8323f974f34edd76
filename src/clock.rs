use serde::{Deserialize, Serialize};

/// Cooperative game time shared by every system.
///
/// The engine advances the clock once per tick with the real frame delta;
/// job durations are expressed in simulated minutes so a paused clock
/// freezes job progress while the host keeps rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameClock {
    paused: bool,
    /// Simulated seconds per real second.
    time_scale: f32,
    sim_seconds: f64,
}

impl GameClock {
    pub fn new(time_scale: f32) -> Self {
        Self {
            paused: false,
            time_scale: time_scale.max(0.0),
            sim_seconds: 0.0,
        }
    }

    pub fn advance(&mut self, dt_seconds: f32) {
        if !self.paused {
            self.sim_seconds += f64::from(dt_seconds * self.time_scale);
        }
    }

    /// Frame delta converted to simulated seconds; zero while paused.
    pub fn scaled(&self, dt_seconds: f32) -> f32 {
        if self.paused {
            0.0
        } else {
            dt_seconds * self.time_scale
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn current_minutes(&self) -> f64 {
        self.sim_seconds / 60.0
    }
}

impl Default for GameClock {
    fn default() -> Self {
        Self::new(60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_scales_by_time_scale() {
        let mut clock = GameClock::new(60.0);
        clock.advance(2.0);
        assert!((clock.current_minutes() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn paused_clock_does_not_advance() {
        let mut clock = GameClock::new(60.0);
        clock.pause();
        clock.advance(10.0);
        assert_eq!(clock.current_minutes(), 0.0);
        assert_eq!(clock.scaled(1.0), 0.0);
        clock.resume();
        clock.advance(1.0);
        assert!(clock.current_minutes() > 0.0);
    }
}
