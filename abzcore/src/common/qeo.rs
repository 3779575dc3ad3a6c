//! Hardware position mode: a source wired straight into a generator.

use super::abz::{AbzConfig, AbzGenerator, AbzSample, ConfigError};
use crate::PositionSource;

/// Couples a position source to an ABZ generator. Each [`tick`](Self::tick)
/// reads the source and regenerates the output levels, the way the
/// peripheral follows a routed hardware position.
pub struct Qeo<P: PositionSource> {
    pub source: P,
    generator: AbzGenerator,
}

impl<P: PositionSource> Qeo<P> {
    pub fn new(source: P, config: AbzConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            source,
            generator: AbzGenerator::new(config)?,
        })
    }

    pub fn tick(&mut self) -> AbzSample {
        let position = self.source.read();
        self.generator.step(position)
    }

    pub fn generator(&self) -> &AbzGenerator {
        &self.generator
    }
}

impl<P: PositionSource> PositionSource for Qeo<P> {
    fn read(&mut self) -> u32 {
        self.source.read()
    }
}

#[cfg(all(feature = "std", test))]
mod tests {
    extern crate std;

    use super::*;
    use crate::common::abz::POSITION_SPAN;

    struct Ramp {
        position: u32,
        step: u32,
    }

    impl PositionSource for Ramp {
        fn read(&mut self) -> u32 {
            let ret = self.position;
            self.position = self.position.wrapping_add(self.step);
            ret
        }
    }

    #[test]
    fn test_follows_the_source() {
        let sub = (POSITION_SPAN / 1024 / 4) as u32;
        let ramp = Ramp {
            position: 0,
            step: sub,
        };
        let mut qeo = Qeo::new(ramp, AbzConfig::default()).unwrap();
        let states: std::vec::Vec<u8> = (0..5).map(|_| qeo.tick().sub_state).collect();
        assert_eq!(states, [0, 1, 2, 3, 0]);
    }
}
