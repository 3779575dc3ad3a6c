//! Position to ABZ quadrature mapping.
//!
//! The position range `[0, 2^32)` is divided by the configured resolution
//! lines; each line produces 4 A/B sub-states and Z pulses once per
//! revolution. Positions come from software injection or from any
//! [`PositionSource`](crate::PositionSource).

use defmt_or_log::warn;
use serde::{Deserialize, Serialize};

/// Full range of the absolute position counter.
pub const POSITION_SPAN: u64 = 1 << 32;

/// A/B levels per sub-state, forward Gray sequence.
const AB_STATES: [(bool, bool); 4] = [(false, false), (true, false), (true, true), (false, true)];

/// A/B levels of one quadrature sub-state.
pub fn ab_levels(sub_state: u8) -> (bool, bool) {
    AB_STATES[(sub_state & 0x3) as usize]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbzConfig {
    /// Encoder lines per revolution.
    pub resolution_lines: u32,
    /// Highest allowed A/B edge rate in Hz.
    pub max_frequency_hz: u32,
    /// Clock the edge limiter divisor is derived from, in Hz.
    pub source_clock_hz: u32,
    /// Position at which the Z window starts.
    pub z_offset: u32,
}

impl Default for AbzConfig {
    fn default() -> Self {
        Self {
            resolution_lines: 1024,
            max_frequency_hz: 250_000,
            source_clock_hz: 200_000_000,
            z_offset: 0,
        }
    }
}

/// Rejected configuration, reported once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    ZeroResolution,
    /// So many lines that one sub-state truncates to zero position units.
    ResolutionTooHigh,
    ZeroFrequency,
    /// Source clock too slow to pace edges below the frequency cap.
    NoTransitionMargin,
    /// Decoder phase range is empty.
    ZeroPhaseRange,
    /// Decoder initial phase count outside the phase range.
    PhaseInitOutOfRange,
}

/// Position outside `[0, 2^32)`. The offending call has no side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeError {
    pub position: u64,
}

/// Parameters compiled from an [`AbzConfig`], validated once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbzParams {
    line_width: u64,
    sub_width: u64,
    divisor: u32,
    source_clock_hz: u32,
    z_offset: u32,
    lossy: bool,
}

impl AbzParams {
    pub fn new(config: AbzConfig) -> Result<Self, ConfigError> {
        if config.resolution_lines == 0 {
            return Err(ConfigError::ZeroResolution);
        }
        let line_width = POSITION_SPAN / config.resolution_lines as u64;
        let sub_width = line_width / 4;
        if sub_width == 0 {
            return Err(ConfigError::ResolutionTooHigh);
        }
        if config.max_frequency_hz == 0 {
            return Err(ConfigError::ZeroFrequency);
        }
        let divisor = config.source_clock_hz as u64 / (config.max_frequency_hz as u64 * 4);
        if divisor == 0 {
            return Err(ConfigError::NoTransitionMargin);
        }
        let lossy = POSITION_SPAN % config.resolution_lines as u64 != 0;
        if lossy {
            // truncated line width, the last line of the revolution runs short
            warn!(
                "{} lines do not divide the position span evenly",
                config.resolution_lines
            );
        }
        Ok(Self {
            line_width,
            sub_width,
            divisor: divisor as u32,
            source_clock_hz: config.source_clock_hz,
            z_offset: config.z_offset,
            lossy,
        })
    }

    /// Position units covered by one full quadrature cycle.
    pub fn line_width(&self) -> u64 {
        self.line_width
    }

    /// Source clock ticks between two A/B edges at the frequency cap.
    pub fn divisor(&self) -> u32 {
        self.divisor
    }

    /// True when the resolution does not divide the span evenly and the
    /// line width was truncated.
    pub fn is_lossy(&self) -> bool {
        self.lossy
    }

    /// Shortest time between two A/B edges under the frequency cap, in us.
    pub fn transition_period_us(&self) -> u64 {
        self.divisor as u64 * 1_000_000 / self.source_clock_hz as u64
    }

    /// Quadrature sub-state of this position, a pure function of
    /// `position` modulo one line width.
    pub fn sub_state(&self, position: u32) -> u8 {
        ((position as u64 / self.sub_width) % 4) as u8
    }

    /// Z level of this position: asserted for one sub-state width starting
    /// at the configured offset within the revolution.
    pub fn z_level(&self, position: u32) -> bool {
        (position.wrapping_sub(self.z_offset) as u64) < self.sub_width
    }
}

/// One output sample of the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbzSample {
    pub a: bool,
    pub b: bool,
    pub z: bool,
    pub sub_state: u8,
    pub revolution: i32,
}

/// Generates ABZ samples from injected or sourced positions.
///
/// The level mapping is a pure function of the position; the revolution
/// index is the only state, accumulated from wrap crossings by shortest
/// wrapped delta.
pub struct AbzGenerator {
    params: AbzParams,
    last_position: u32,
    travel: i64,
}

impl AbzGenerator {
    pub fn new(config: AbzConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            params: AbzParams::new(config)?,
            last_position: 0,
            travel: 0,
        })
    }

    pub fn params(&self) -> &AbzParams {
        &self.params
    }

    /// Signed count of full revolutions traversed since construction.
    pub fn revolution(&self) -> i32 {
        (self.travel >> 32) as i32
    }

    /// Map a new absolute position to output levels.
    ///
    /// Positions at or past the span are rejected; the generator state is
    /// untouched on error.
    pub fn advance(&mut self, position: u64) -> Result<AbzSample, RangeError> {
        if position >= POSITION_SPAN {
            return Err(RangeError { position });
        }
        Ok(self.step(position as u32))
    }

    /// [`advance`](Self::advance) with a position already known in range.
    pub fn step(&mut self, position: u32) -> AbzSample {
        let delta = position.wrapping_sub(self.last_position) as i32;
        self.travel = self.travel.wrapping_add(delta as i64);
        self.last_position = position;

        let sub_state = self.params.sub_state(position);
        let (a, b) = ab_levels(sub_state);
        AbzSample {
            a,
            b,
            z: self.params.z_level(position),
            sub_state,
            revolution: self.revolution(),
        }
    }

    /// Forget the traversal history, as if freshly constructed at position 0.
    pub fn reset(&mut self) {
        self.last_position = 0;
        self.travel = 0;
    }

    /// Deterministically replays a position sequence, yielding each output
    /// sample with a delay hint.
    ///
    /// The hint is `step_delay_us` or, when the step crosses more sub-states
    /// than the frequency cap allows in that time, the paced duration of the
    /// crossed transitions. The library never sleeps; honoring the hint is
    /// the caller's business.
    pub fn inject_sequence<I>(
        &mut self,
        positions: I,
        step_delay_us: u64,
    ) -> InjectSequence<'_, I::IntoIter>
    where
        I: IntoIterator<Item = u64>,
    {
        InjectSequence {
            generator: self,
            positions: positions.into_iter(),
            step_delay_us,
        }
    }
}

/// Iterator returned by [`AbzGenerator::inject_sequence`].
pub struct InjectSequence<'a, I> {
    generator: &'a mut AbzGenerator,
    positions: I,
    step_delay_us: u64,
}

impl<I: Iterator<Item = u64>> Iterator for InjectSequence<'_, I> {
    type Item = Result<(AbzSample, u64), RangeError>;

    fn next(&mut self) -> Option<Self::Item> {
        let position = self.positions.next()?;
        let prev = self.generator.last_position;
        match self.generator.advance(position) {
            Ok(sample) => {
                let delta = (position as u32).wrapping_sub(prev) as i32;
                let transitions = delta.unsigned_abs() as u64 / self.generator.params.sub_width;
                let paced = transitions * self.generator.params.transition_period_us();
                Some(Ok((sample, self.step_delay_us.max(paced))))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(all(feature = "std", test))]
mod tests {
    extern crate std;
    use std::vec::Vec;

    use super::*;

    fn default_generator() -> AbzGenerator {
        AbzGenerator::new(AbzConfig::default()).unwrap()
    }

    #[test]
    fn test_line_width_1024() {
        let params = AbzParams::new(AbzConfig::default()).unwrap();
        assert_eq!(params.line_width(), 4194304);
        assert!(!params.is_lossy());
        // 200 MHz / (250 kHz * 4)
        assert_eq!(params.divisor(), 200);
        assert_eq!(params.transition_period_us(), 1);
    }

    #[test]
    fn test_documented_positions() {
        let mut generator = default_generator();
        let s = generator.advance(0).unwrap();
        assert_eq!(s.sub_state, 0);
        assert!(s.z);
        assert_eq!(s.revolution, 0);

        let s = generator.advance(1048576).unwrap();
        assert_eq!(s.sub_state, 1);
        assert!(!s.z);

        let s = generator.advance(4194304).unwrap();
        assert_eq!(s.sub_state, 0);
        assert!(!s.z);
    }

    #[test]
    fn test_z_at_wrap() {
        let mut generator = default_generator();
        let s = generator.advance((1 << 32) - 1).unwrap();
        assert!(!s.z);
        let s = generator.advance(0).unwrap();
        assert!(s.z);
    }

    #[test]
    fn test_forward_cycle_over_one_line() {
        let mut generator = default_generator();
        let quarter = generator.params().line_width() / 4;
        let states: Vec<u8> = (0..=4)
            .map(|i| generator.advance(i * quarter).unwrap().sub_state)
            .collect();
        assert_eq!(states, [0, 1, 2, 3, 0]);
    }

    #[test]
    fn test_backward_cycle_reverses() {
        let mut generator = default_generator();
        let quarter = generator.params().line_width() / 4;
        let states: Vec<u8> = (0..=4)
            .rev()
            .map(|i| generator.advance(i * quarter).unwrap().sub_state)
            .collect();
        assert_eq!(states, [0, 3, 2, 1, 0]);
    }

    #[test]
    fn test_sub_state_periodicity() {
        let params = AbzParams::new(AbzConfig::default()).unwrap();
        let line = params.line_width();
        for p in [0u64, 1, 12345, line / 4, line - 1] {
            assert_eq!(
                params.sub_state(p as u32),
                params.sub_state((p + line) as u32)
            );
            assert_eq!(
                params.sub_state(p as u32),
                params.sub_state((p + 17 * line) as u32)
            );
        }
    }

    #[test]
    fn test_z_once_per_revolution() {
        let config = AbzConfig {
            resolution_lines: 16,
            ..Default::default()
        };
        let mut generator = AbzGenerator::new(config).unwrap();
        let sub = generator.params().line_width() / 4;
        let mut pulses = 0;
        for i in 0..(16 * 4) {
            if generator.advance(i * sub).unwrap().z {
                pulses += 1;
            }
        }
        assert_eq!(pulses, 1);
    }

    #[test]
    fn test_z_offset_moves_the_window() {
        let config = AbzConfig {
            z_offset: 4194304,
            ..Default::default()
        };
        let mut generator = AbzGenerator::new(config).unwrap();
        assert!(!generator.advance(0).unwrap().z);
        assert!(generator.advance(4194304).unwrap().z);
    }

    #[test]
    fn test_revolution_counter() {
        let mut generator = default_generator();
        let line = generator.params().line_width();
        // two full forward revolutions, one line per step
        let mut last = generator.step(0);
        for i in 1..=2048u64 {
            last = generator.advance(i * line % POSITION_SPAN).unwrap();
        }
        assert_eq!(last.revolution, 2);
        assert_eq!(generator.revolution(), 2);

        // one line backwards across the wrap
        let s = generator.advance(POSITION_SPAN - line).unwrap();
        assert_eq!(s.revolution, 1);
    }

    #[test]
    fn test_reverse_through_zero_goes_negative() {
        let mut generator = default_generator();
        generator.step(0);
        let line = generator.params().line_width();
        let s = generator.advance(POSITION_SPAN - line).unwrap();
        assert_eq!(s.revolution, -1);
    }

    #[test]
    fn test_config_errors() {
        let base = AbzConfig::default();
        assert_eq!(
            AbzParams::new(AbzConfig {
                resolution_lines: 0,
                ..base
            }),
            Err(ConfigError::ZeroResolution)
        );
        assert_eq!(
            AbzParams::new(AbzConfig {
                resolution_lines: 1 << 31,
                ..base
            }),
            Err(ConfigError::ResolutionTooHigh)
        );
        assert_eq!(
            AbzParams::new(AbzConfig {
                max_frequency_hz: 0,
                ..base
            }),
            Err(ConfigError::ZeroFrequency)
        );
        assert_eq!(
            AbzParams::new(AbzConfig {
                source_clock_hz: 100,
                max_frequency_hz: 250_000,
                ..base
            }),
            Err(ConfigError::NoTransitionMargin)
        );
    }

    #[test]
    fn test_uneven_resolution_is_flagged_not_fatal() {
        let params = AbzParams::new(AbzConfig {
            resolution_lines: 1000,
            ..Default::default()
        })
        .unwrap();
        assert!(params.is_lossy());
        assert_eq!(params.line_width(), POSITION_SPAN / 1000);
    }

    #[test]
    fn test_range_error_has_no_side_effects() {
        let mut generator = default_generator();
        generator.step(0);
        assert_eq!(
            generator.advance(1 << 32),
            Err(RangeError { position: 1 << 32 })
        );
        assert_eq!(generator.advance(u64::MAX).unwrap_err().position, u64::MAX);
        assert_eq!(generator.revolution(), 0);
        assert_eq!(generator.advance(0).unwrap().sub_state, 0);
    }

    #[test]
    fn test_inject_sequence_paces_fast_steps() {
        let mut generator = default_generator();
        let line = generator.params().line_width();
        // one line per step crosses 4 sub-states, 1 us each at the cap
        let hints: Vec<u64> = generator
            .inject_sequence((0..8).map(|i| i * line), 0)
            .map(|r| r.unwrap().1)
            .collect();
        assert_eq!(hints[0], 0); // no movement on the first sample
        assert!(hints[1..].iter().all(|&d| d == 4));
    }

    #[test]
    fn test_inject_sequence_keeps_slow_step_delay() {
        let mut generator = default_generator();
        let line = generator.params().line_width();
        let hints: Vec<u64> = generator
            .inject_sequence((0..4).map(|i| i * line), 100)
            .map(|r| r.unwrap().1)
            .collect();
        assert!(hints.iter().all(|&d| d == 100));
    }

    #[test]
    fn test_inject_sequence_reports_range_errors() {
        let mut generator = default_generator();
        let out: Vec<_> = generator
            .inject_sequence([0, POSITION_SPAN, 42], 10)
            .collect();
        assert!(out[0].is_ok());
        assert_eq!(
            out[1],
            Err(RangeError {
                position: POSITION_SPAN
            })
        );
        // the bad sample left no trace, the replay continues
        assert_eq!(out[2].unwrap().0.sub_state, 0);
    }
}
