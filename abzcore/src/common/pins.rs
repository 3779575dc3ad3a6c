//! Pin level frontend for the decoder.

use embedded_hal::digital::InputPin;

use super::qei::QeiCounter;
use crate::PositionSource;

/// Samples A, B and Z input pins into a [`QeiCounter`]. A pin that fails to
/// read counts as low.
pub struct AbzPins<Input: InputPin> {
    pins: (Input, Input, Input),
    counter: QeiCounter,
}

impl<Input: InputPin> AbzPins<Input> {
    pub fn new(a: Input, b: Input, z: Input, counter: QeiCounter) -> Self {
        Self {
            pins: (a, b, z),
            counter,
        }
    }

    pub fn update(&mut self) {
        let (a, b, z) = &mut self.pins;
        let levels = (
            a.is_high().unwrap_or(false),
            b.is_high().unwrap_or(false),
            z.is_high().unwrap_or(false),
        );
        self.counter.tick(levels.0, levels.1, levels.2);
    }

    pub fn counter(&self) -> &QeiCounter {
        &self.counter
    }
}

impl<Input: InputPin> PositionSource for AbzPins<Input> {
    fn read(&mut self) -> u32 {
        self.update();
        self.counter.position()
    }
}

#[cfg(all(feature = "std", test))]
mod tests {
    extern crate std;
    use core::convert::Infallible;
    use std::rc::Rc;

    use core::cell::Cell;
    use embedded_hal::digital::{ErrorType, InputPin};

    use super::*;
    use crate::common::qei::QeiConfig;

    #[derive(Clone)]
    struct FakePin(Rc<Cell<bool>>);

    impl ErrorType for FakePin {
        type Error = Infallible;
    }

    impl InputPin for FakePin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Ok(self.0.get())
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.0.get())
        }
    }

    #[test]
    fn test_counts_from_pins() {
        let a = FakePin(Rc::new(Cell::new(false)));
        let b = FakePin(Rc::new(Cell::new(false)));
        let z = FakePin(Rc::new(Cell::new(false)));
        let counter = QeiCounter::new(QeiConfig {
            phase_max: 256,
            ..Default::default()
        })
        .unwrap();
        let mut pins = AbzPins::new(a.clone(), b.clone(), z.clone(), counter);

        // forward gray sequence on the wires
        for (la, lb) in [(false, false), (true, false), (true, true), (false, true)] {
            a.0.set(la);
            b.0.set(lb);
            pins.update();
        }
        assert_eq!(pins.counter().phase_cnt(), 3);
        assert_eq!(pins.counter().direction(), 1);
    }
}
