//! Synthetic progress gradient used when the tool never reports a `Duration:`.

/// Amount added to the synthetic gradient on every tick.
const STEP_PERCENT: i8 = 5;

/// Ceiling the synthetic gradient will not cross, leaving room for the
/// pipeline's own upload/finalise phases to take the progress bar to 100.
const CAP_PERCENT: i8 = 85;

/// Interval between synthetic ticks.
pub const TICK_INTERVAL: std::time::Duration = std::time::Duration::from_millis(500);

/// Drives a `+5% every 500ms, capped at 85%` gradient for jobs whose
/// transcoder never printed a `Duration:` header, so the progress channel is
/// never frozen while streaming is known to be underway.
#[derive(Debug, Default)]
pub struct SyntheticProgress {
    current: i8,
}

impl SyntheticProgress {
    /// Start a fresh gradient at 0%.
    #[must_use]
    pub const fn new() -> Self {
        Self { current: 0 }
    }

    /// Advance the gradient by one tick, returning the new percentage.
    pub const fn tick(&mut self) -> i8 {
        let next = self.current.saturating_add(STEP_PERCENT);
        self.current = if next > CAP_PERCENT { CAP_PERCENT } else { next };
        self.current
    }

    /// Current percentage without advancing.
    #[must_use]
    pub const fn current(&self) -> i8 {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_caps_at_85_percent() {
        let mut synthetic = SyntheticProgress::new();
        for _ in 0..30 {
            synthetic.tick();
        }
        assert_eq!(synthetic.current(), CAP_PERCENT);
    }

    #[test]
    fn gradient_steps_by_five() {
        let mut synthetic = SyntheticProgress::new();
        assert_eq!(synthetic.tick(), 5);
        assert_eq!(synthetic.tick(), 10);
    }
}
