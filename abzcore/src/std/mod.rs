/*!
Std only implementations
*/
extern crate std;

use defmt_or_log::info;
use embassy_time::{Instant, Timer};

use crate::PositionSource;
use crate::common::abz::{AbzGenerator, AbzSample, POSITION_SPAN, RangeError};

/// Simulated rotation at a constant velocity, driven by the wall clock.
pub struct ConstantVelocitySource {
    start: Instant,
    origin: u32,
    /// position units per second, negative runs backward
    velocity: i64,
}

impl ConstantVelocitySource {
    pub fn new(origin: u32, rev_per_sec: f32) -> Self {
        Self {
            start: Instant::now(),
            origin,
            velocity: (rev_per_sec as f64 * POSITION_SPAN as f64) as i64,
        }
    }
}

/// A rotation starting from a random angle, like a shaft powered up mid-turn.
pub fn get_sim_source(rev_per_sec: f32) -> ConstantVelocitySource {
    let origin = rand::random::<u32>();
    info!("simulated rotation starts at {}", origin);
    ConstantVelocitySource::new(origin, rev_per_sec)
}

impl PositionSource for ConstantVelocitySource {
    fn read(&mut self) -> u32 {
        let elapsed_us = self.start.elapsed().as_micros() as i64;
        let travel = (self.velocity as i128 * elapsed_us as i128 / 1_000_000) as i64;
        self.origin.wrapping_add(travel as u32)
    }
}

/// Drives a generator through a position sequence, actually sleeping the
/// delay hints that [`AbzGenerator::inject_sequence`] only reports.
pub async fn replay<I: IntoIterator<Item = u64>>(
    generator: &mut AbzGenerator,
    positions: I,
    step_delay_us: u64,
    mut sink: impl FnMut(AbzSample),
) -> Result<(), RangeError> {
    let mut sequence = generator.inject_sequence(positions, step_delay_us);
    while let Some(item) = sequence.next() {
        let (sample, delay_us) = item?;
        sink(sample);
        Timer::after_micros(delay_us).await;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    extern crate std;

    use embassy_time::{Instant, Timer};
    use test_log::test;

    use super::*;
    use crate::common::abz::AbzConfig;
    use crate::common::qei::{QeiConfig, QeiCounter};
    use crate::common::qeo::Qeo;

    #[test(tokio::test)]
    async fn test_sim_source_moves_forward() {
        let mut source = get_sim_source(5.0);
        let first = source.read();
        Timer::after_millis(20).await;
        let delta = source.read().wrapping_sub(first) as i32;
        assert!(delta > 0, "delta {}", delta);
    }

    #[test(tokio::test)]
    async fn test_sim_source_runs_backward() {
        let mut source = ConstantVelocitySource::new(0, -5.0);
        Timer::after_millis(20).await;
        let delta = source.read() as i32;
        assert!(delta < 0, "delta {}", delta);
    }

    #[test(tokio::test)]
    async fn test_sim_loopback() {
        let config = AbzConfig {
            resolution_lines: 64,
            ..Default::default()
        };
        let mut qeo = Qeo::new(ConstantVelocitySource::new(0, 2.0), config).unwrap();
        let mut qei = QeiCounter::new(QeiConfig {
            phase_max: 64 * 4,
            ..Default::default()
        })
        .unwrap();

        let start = Instant::now();
        while start.elapsed().as_millis() < 500 {
            let sample = qeo.tick();
            qei.tick_sample(&sample);
        }

        // 2 rev/s for 0.5 s at 256 counts per revolution
        let travelled = qei.absolute_position();
        assert!(
            (200..=320).contains(&travelled),
            "travelled {}",
            travelled
        );
        assert_eq!(qei.direction(), 1);
        assert_eq!(qei.glitches(), 0);
    }

    #[test(tokio::test)]
    async fn test_replay_two_revolutions() {
        let mut generator = AbzGenerator::new(AbzConfig::default()).unwrap();
        let line = generator.params().line_width();
        let positions = (0..2048u64).map(move |i| i * line % POSITION_SPAN);

        let mut samples = 0;
        let mut z_pulses = 0;
        replay(&mut generator, positions, 50, |sample| {
            samples += 1;
            if sample.z {
                z_pulses += 1;
            }
        })
        .await
        .unwrap();
        generator.advance(0).unwrap();

        assert_eq!(samples, 2048);
        // line aligned steps land in the Z window once per revolution
        assert_eq!(z_pulses, 2);
        assert_eq!(generator.revolution(), 2);
    }
}
