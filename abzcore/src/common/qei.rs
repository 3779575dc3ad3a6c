//! ABZ to phase/revolution counting, the decode side of the loop.

use serde::{Deserialize, Serialize};

use super::abz::{AbzSample, ConfigError, POSITION_SPAN};
use crate::PositionSource;

/// What advances the Z counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZCountMode {
    /// Count when the phase counter wraps, direction aware.
    OnPhaseMax,
    /// Count on the rising edge of the Z input.
    OnZPulse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QeiConfig {
    /// Phase counts per revolution, 4x the resolution lines.
    pub phase_max: u32,
    pub z_count_mode: ZCountMode,
    /// Seed of the Z counter.
    pub z_init: i32,
    /// Seed of the phase counter.
    pub phase_init: u32,
}

impl Default for QeiConfig {
    fn default() -> Self {
        Self {
            phase_max: 4096,
            z_count_mode: ZCountMode::OnPhaseMax,
            z_init: 0,
            phase_init: 0,
        }
    }
}

/// Tracks phase and revolution counts from sampled ABZ levels.
///
/// A one-step change of the A/B pair moves the phase counter; a two-step
/// jump carries no direction and is ignored, only counted as a glitch.
pub struct QeiCounter {
    phase_max: u32,
    z_count_mode: ZCountMode,
    phase: u32,
    z: i32,
    last_state: Option<u8>,
    last_z: bool,
    direction: i8,
    glitches: u32,
}

impl QeiCounter {
    pub fn new(config: QeiConfig) -> Result<Self, ConfigError> {
        if config.phase_max == 0 {
            return Err(ConfigError::ZeroPhaseRange);
        }
        if config.phase_init >= config.phase_max {
            return Err(ConfigError::PhaseInitOutOfRange);
        }
        Ok(Self {
            phase_max: config.phase_max,
            z_count_mode: config.z_count_mode,
            phase: config.phase_init,
            z: config.z_init,
            last_state: None,
            last_z: false,
            direction: 0,
            glitches: 0,
        })
    }

    /// Consume one sampled set of levels.
    pub fn tick(&mut self, a: bool, b: bool, z: bool) {
        let state: u8 = match (a, b) {
            (false, false) => 0,
            (true, false) => 1,
            (true, true) => 2,
            (false, true) => 3,
        };

        if let Some(prev) = self.last_state {
            if state == (prev + 1) % 4 {
                self.step_forward();
            } else if prev == (state + 1) % 4 {
                self.step_backward();
            } else if state != prev {
                // both channels flipped between samples, direction unknown
                self.glitches += 1;
            }
        }
        self.last_state = Some(state);

        if z && !self.last_z && self.z_count_mode == ZCountMode::OnZPulse {
            self.z += if self.direction < 0 { -1 } else { 1 };
        }
        self.last_z = z;
    }

    /// [`tick`](Self::tick) from a generated sample.
    pub fn tick_sample(&mut self, sample: &AbzSample) {
        self.tick(sample.a, sample.b, sample.z);
    }

    fn step_forward(&mut self) {
        self.phase += 1;
        if self.phase == self.phase_max {
            self.phase = 0;
            if self.z_count_mode == ZCountMode::OnPhaseMax {
                self.z += 1;
            }
        }
        self.direction = 1;
    }

    fn step_backward(&mut self) {
        if self.phase == 0 {
            self.phase = self.phase_max - 1;
            if self.z_count_mode == ZCountMode::OnPhaseMax {
                self.z -= 1;
            }
        } else {
            self.phase -= 1;
        }
        self.direction = -1;
    }

    pub fn phase_cnt(&self) -> u32 {
        self.phase
    }

    pub fn z_cnt(&self) -> i32 {
        self.z
    }

    /// Sign of the last accepted step, 0 before any movement.
    pub fn direction(&self) -> i8 {
        self.direction
    }

    /// Samples whose A/B jump carried no direction.
    pub fn glitches(&self) -> u32 {
        self.glitches
    }

    /// Phase count rescaled to span units, so a decoded position can feed
    /// another generator.
    pub fn position(&self) -> u32 {
        (self.phase as u64 * POSITION_SPAN / self.phase_max as u64) as u32
    }

    /// Multi turn count, Z revolutions plus phase. Meaningful with
    /// [`ZCountMode::OnPhaseMax`], where Z tracks every wrap.
    pub fn absolute_position(&self) -> i64 {
        self.z as i64 * self.phase_max as i64 + self.phase as i64
    }
}

impl PositionSource for QeiCounter {
    fn read(&mut self) -> u32 {
        self.position()
    }
}

#[cfg(all(feature = "std", test))]
mod tests {
    extern crate std;

    use super::*;
    use crate::common::abz::{AbzConfig, AbzGenerator};

    fn counter(config: QeiConfig) -> QeiCounter {
        QeiCounter::new(config).unwrap()
    }

    /// Feed `steps + 1` line-aligned samples of a 64 line generator, one
    /// sub-state apart, first sample only arms the decoder.
    fn feed_revolutions(qei: &mut QeiCounter, steps: u64, forward: bool) {
        let mut generator = AbzGenerator::new(AbzConfig {
            resolution_lines: 64,
            ..Default::default()
        })
        .unwrap();
        let sub = generator.params().line_width() / 4;
        for i in 0..=steps {
            let i = if forward { i } else { steps - i };
            let sample = generator.advance(i * sub % POSITION_SPAN).unwrap();
            qei.tick_sample(&sample);
        }
    }

    #[test]
    fn test_seeded_counters() {
        let qei = counter(QeiConfig {
            phase_max: 4096,
            z_init: 100,
            phase_init: 500,
            ..Default::default()
        });
        assert_eq!(qei.z_cnt(), 100);
        assert_eq!(qei.phase_cnt(), 500);
        assert_eq!(qei.direction(), 0);
    }

    #[test]
    fn test_config_errors() {
        assert_eq!(
            QeiCounter::new(QeiConfig {
                phase_max: 0,
                ..Default::default()
            })
            .err(),
            Some(ConfigError::ZeroPhaseRange)
        );
        assert_eq!(
            QeiCounter::new(QeiConfig {
                phase_max: 256,
                phase_init: 256,
                ..Default::default()
            })
            .err(),
            Some(ConfigError::PhaseInitOutOfRange)
        );
    }

    #[test]
    fn test_full_revolution_wraps_phase_and_counts_z() {
        let mut qei = counter(QeiConfig {
            phase_max: 256,
            ..Default::default()
        });
        feed_revolutions(&mut qei, 256, true);
        assert_eq!(qei.phase_cnt(), 0);
        assert_eq!(qei.z_cnt(), 1);
        assert_eq!(qei.direction(), 1);
        assert_eq!(qei.glitches(), 0);
    }

    #[test]
    fn test_backward_revolution_decrements_z() {
        let mut qei = counter(QeiConfig {
            phase_max: 256,
            ..Default::default()
        });
        feed_revolutions(&mut qei, 256, false);
        assert_eq!(qei.phase_cnt(), 0);
        assert_eq!(qei.z_cnt(), -1);
        assert_eq!(qei.direction(), -1);
    }

    #[test]
    fn test_two_step_jump_is_a_glitch() {
        let mut qei = counter(QeiConfig::default());
        qei.tick(false, false, false);
        qei.tick(true, true, false);
        assert_eq!(qei.phase_cnt(), 0);
        assert_eq!(qei.glitches(), 1);
        // recovers on the next clean step
        qei.tick(false, true, false);
        assert_eq!(qei.phase_cnt(), 1);
        assert_eq!(qei.glitches(), 1);
    }

    #[test]
    fn test_z_pulse_mode_counts_rising_edges() {
        let mut qei = counter(QeiConfig {
            phase_max: 256,
            z_count_mode: ZCountMode::OnZPulse,
            ..Default::default()
        });
        qei.tick(false, false, false);
        qei.tick(true, false, true);
        assert_eq!(qei.z_cnt(), 1);
        // held high, no second count
        qei.tick(true, true, true);
        assert_eq!(qei.z_cnt(), 1);
        qei.tick(false, true, false);
        qei.tick(false, false, true);
        assert_eq!(qei.z_cnt(), 2);
        // phase wrap does not count in this mode
        assert_eq!(qei.phase_cnt(), 4);
    }

    #[test]
    fn test_position_rescaling() {
        let mut qei = counter(QeiConfig {
            phase_max: 256,
            ..Default::default()
        });
        feed_revolutions(&mut qei, 64, true);
        assert_eq!(qei.phase_cnt(), 64);
        assert_eq!(qei.read(), (POSITION_SPAN / 4) as u32);
        assert_eq!(qei.absolute_position(), 64);
    }
}
