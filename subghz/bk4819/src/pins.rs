//! Adapter from `embedded-hal` digital pins to the driver's pin seams.

use embedded_hal::digital::{InputPin, OutputPin};

use crate::traits::BusPins;

/// A GPIO line used for both directions (the chip's SDA/SDIO pin).
///
/// The chip multiplexes host-to-chip and chip-to-host data on one pin;
/// during reads the host enables its input buffer and switches the pin to
/// input, restoring output mode afterwards.
pub trait BidiPin: OutputPin + InputPin {
    fn set_to_input(&mut self);
    fn set_to_output(&mut self);
}

/// [`BusPins`] over plain HAL pins. Pin errors are not representable on
/// this bus and are discarded; boards with fallible GPIO should implement
/// [`BusPins`] directly.
pub struct HalPins<Scn, Scl, Sda> {
    scn: Scn,
    scl: Scl,
    sda: Sda,
}

impl<Scn, Scl, Sda> HalPins<Scn, Scl, Sda>
where
    Scn: OutputPin,
    Scl: OutputPin,
    Sda: BidiPin,
{
    pub fn new(scn: Scn, scl: Scl, sda: Sda) -> Self {
        Self { scn, scl, sda }
    }

    pub fn free(self) -> (Scn, Scl, Sda) {
        (self.scn, self.scl, self.sda)
    }
}

impl<Scn, Scl, Sda> BusPins for HalPins<Scn, Scl, Sda>
where
    Scn: OutputPin,
    Scl: OutputPin,
    Sda: BidiPin,
{
    fn set_scn(&mut self) {
        self.scn.set_high().ok();
    }

    fn clear_scn(&mut self) {
        self.scn.set_low().ok();
    }

    fn set_scl(&mut self) {
        self.scl.set_high().ok();
    }

    fn clear_scl(&mut self) {
        self.scl.set_low().ok();
    }

    fn set_sda(&mut self) {
        self.sda.set_high().ok();
    }

    fn clear_sda(&mut self) {
        self.sda.set_low().ok();
    }

    fn sda_to_input(&mut self) {
        self.sda.set_to_input();
    }

    fn sda_to_output(&mut self) {
        self.sda.set_to_output();
    }

    fn read_sda(&mut self) -> bool {
        self.sda.is_high().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
    use embedded_hal_mocks::digital::{MockOutputPin, PinError};
    use mockall::mock;

    mock! {
        Sda {}

        impl ErrorType for Sda {
            type Error = PinError;
        }

        impl OutputPin for Sda {
            fn set_low(&mut self) -> Result<(), PinError>;
            fn set_high(&mut self) -> Result<(), PinError>;
        }

        impl InputPin for Sda {
            fn is_high(&mut self) -> Result<bool, PinError>;
            fn is_low(&mut self) -> Result<bool, PinError>;
        }

        impl BidiPin for Sda {
            fn set_to_input(&mut self);
            fn set_to_output(&mut self);
        }
    }

    #[test]
    fn forwards_line_operations() {
        let mut scn = MockOutputPin::new();
        scn.expect_set_high().times(1).returning(|| Ok(()));
        scn.expect_set_low().times(1).returning(|| Ok(()));
        let mut scl = MockOutputPin::new();
        scl.expect_set_low().times(1).returning(|| Ok(()));
        let mut sda = MockSda::new();
        sda.expect_set_to_input().times(1).return_const(());
        sda.expect_is_high().times(1).returning(|| Ok(true));
        sda.expect_set_to_output().times(1).return_const(());

        let mut pins = HalPins::new(scn, scl, sda);
        pins.set_scn();
        pins.clear_scn();
        pins.clear_scl();
        pins.sda_to_input();
        assert!(pins.read_sda());
        pins.sda_to_output();
    }
}
