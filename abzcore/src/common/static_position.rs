//! A process wide position slot, the stand-in for routing one position
//! producer to several consumers.

use core::sync::atomic::Ordering;

use embassy_time::{Duration, Timer};
use portable_atomic::AtomicU32;

use crate::PositionSource;

pub static POSITION_VALUE: AtomicU32 = AtomicU32::new(0);

/// Reads the shared slot. Cheap to construct in as many places as needed;
/// `invert` mirrors the rotation direction, `offset` shifts the zero.
pub struct StaticPosition {
    pub invert: bool,
    pub offset: u32,
}

impl PositionSource for StaticPosition {
    fn read(&mut self) -> u32 {
        let ret = POSITION_VALUE.load(Ordering::Relaxed).wrapping_add(self.offset);
        if self.invert { ret.wrapping_neg() } else { ret }
    }
}

/// Publishes a source into the shared slot at a fixed rate.
#[allow(async_fn_in_trait)]
pub trait PublishStaticPosition: Sized + PositionSource {
    fn static_position(&self) -> StaticPosition {
        StaticPosition {
            invert: false,
            offset: 0,
        }
    }

    #[inline(always)]
    async fn publish_position(mut self, freq_hertz: u64) {
        loop {
            POSITION_VALUE.store(self.read(), Ordering::Relaxed);
            Timer::after(Duration::from_hz(freq_hertz)).await;
        }
    }
}

impl<P: PositionSource> PublishStaticPosition for P {}

#[cfg(all(feature = "std", test))]
mod tests {
    extern crate std;

    use super::*;

    #[test]
    fn test_invert_and_offset() {
        POSITION_VALUE.store(1000, Ordering::Relaxed);
        let mut plain = StaticPosition {
            invert: false,
            offset: 0,
        };
        assert_eq!(plain.read(), 1000);

        let mut shifted = StaticPosition {
            invert: false,
            offset: 24,
        };
        assert_eq!(shifted.read(), 1024);

        let mut mirrored = StaticPosition {
            invert: true,
            offset: 0,
        };
        assert_eq!(mirrored.read(), 0u32.wrapping_sub(1000));
    }
}
