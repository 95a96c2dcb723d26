// src/playback.rs

use std::time::Duration;

/// Delay between playback ticks at 1x
pub const BASE_INTERVAL: Duration = Duration::from_millis(800);

const PRESETS: [f64; 5] = [0.25, 0.5, 1.0, 2.0, 4.0];
const DEFAULT_PRESET: usize = 2;

/// Direction of a speed change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedStep {
    Faster,
    Slower,
}

/// Playback speed, one of a fixed set of multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Speed {
    index: usize,
}

impl Default for Speed {
    fn default() -> Self {
        Speed { index: DEFAULT_PRESET }
    }
}

impl Speed {
    pub fn multiplier(self) -> f64 {
        PRESETS[self.index]
    }

    /// Moves one preset in `step`'s direction, clamped at both ends.
    pub fn step(self, step: SpeedStep) -> Speed {
        let index = match step {
            SpeedStep::Faster => (self.index + 1).min(PRESETS.len() - 1),
            SpeedStep::Slower => self.index.saturating_sub(1),
        };
        Speed { index }
    }

    pub fn interval(self, base: Duration) -> Duration {
        Duration::from_nanos((base.as_nanos() as f64 / self.multiplier()).round() as u64)
    }

    /// Short label such as `0.25x` or `2x`.
    pub fn label(self) -> String {
        format!("{}x", self.multiplier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_real_time() {
        let speed = Speed::default();
        assert_eq!(speed.multiplier(), 1.0);
        assert_eq!(speed.interval(BASE_INTERVAL), Duration::from_millis(800));
    }

    #[test]
    fn steps_clamp_at_both_ends() {
        let mut speed = Speed::default();
        for _ in 0..10 {
            speed = speed.step(SpeedStep::Faster);
        }
        assert_eq!(speed.multiplier(), 4.0);
        assert_eq!(speed.interval(BASE_INTERVAL), Duration::from_millis(200));

        for _ in 0..10 {
            speed = speed.step(SpeedStep::Slower);
        }
        assert_eq!(speed.multiplier(), 0.25);
        assert_eq!(speed.interval(BASE_INTERVAL), Duration::from_millis(3200));
    }

    #[test]
    fn labels() {
        assert_eq!(Speed::default().label(), "1x");
        let slowest = Speed::default().step(SpeedStep::Slower).step(SpeedStep::Slower);
        assert_eq!(slowest.label(), "0.25x");
    }
}
