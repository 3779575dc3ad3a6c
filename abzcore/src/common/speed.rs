//! Count rate estimation over periodic position samples, standing in for
//! the peripheral's speed timer.

/// Samples of history kept (min 2).
const WINDOW: usize = 8;

pub struct SpeedEstimator {
    sample_hz: u32,
    speed: i64,
    history: [i64; WINDOW],
    idx: usize,
}

impl SpeedEstimator {
    pub fn new(init_position: i64, sample_hz: u32) -> Self {
        Self {
            sample_hz,
            speed: 0,
            history: [init_position; WINDOW],
            idx: 0,
        }
    }

    /// Push one position sample taken at the configured rate.
    pub fn tick(&mut self, position: i64) {
        // difference over the last WINDOW samples
        let difference = position - self.history[self.idx];
        self.speed = difference * self.sample_hz as i64 / WINDOW as i64;

        self.history[self.idx] = position;
        self.idx = (self.idx + 1) % WINDOW;
    }

    /// Counts per second, negative when moving backward.
    pub fn speed(&self) -> i64 {
        self.speed
    }
}

#[cfg(all(feature = "std", test))]
mod tests {
    extern crate std;

    use super::*;

    #[test]
    fn test_constant_rate() {
        let mut estimator = SpeedEstimator::new(0, 1000);
        for i in 1..=20 {
            estimator.tick(i * 10);
        }
        // 10 counts per sample at 1 kHz
        assert_eq!(estimator.speed(), 10_000);
    }

    #[test]
    fn test_standstill_and_reverse() {
        let mut estimator = SpeedEstimator::new(500, 100);
        for _ in 0..10 {
            estimator.tick(500);
        }
        assert_eq!(estimator.speed(), 0);
        for i in 1..=10 {
            estimator.tick(500 - i * 4);
        }
        assert_eq!(estimator.speed(), -400);
    }
}
