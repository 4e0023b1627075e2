//! Bit-banged 3-wire register transport.
//!
//! Write: select (SCN low), shift the 8-bit address MSB-first, shift the
//! 16-bit value, deselect. Read: same with bit 7 of the address set and the
//! data line turned around to input for the data phase. Every documented
//! edge carries a 1 microsecond setup/hold delay; the waveform is fixed and
//! the transaction duration deterministic.

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;

use crate::regs::RegisterAddress;
use crate::traits::{Bk4819Bus, BusPins};

/// Read transactions set the top bit of the address byte.
const READ_COMMAND: u8 = 0x80;

pub struct BitBangBus<P, D> {
    pins: P,
    delay: D,
}

impl<P, D> BitBangBus<P, D>
where
    P: BusPins,
    D: DelayNs,
{
    /// Take ownership of the bus lines and leave them in the idle state
    /// (SCN, SCL and SDA all high, SDA driven).
    pub fn new(pins: P, delay: D) -> Self {
        let mut bus = Self { pins, delay };
        bus.pins.set_scn();
        bus.pins.set_scl();
        bus.pins.sda_to_output();
        bus.pins.set_sda();
        bus
    }

    pub fn free(self) -> (P, D) {
        (self.pins, self.delay)
    }

    fn settle(&mut self) {
        self.delay.delay_us(1);
    }

    fn select(&mut self) {
        self.pins.set_scn();
        self.pins.clear_scl();
        self.settle();
        self.pins.clear_scn();
    }

    /// Deselect and return the lines to idle.
    fn deselect(&mut self) {
        self.pins.set_scn();
        self.settle();
        self.pins.set_scl();
        self.pins.sda_to_output();
        self.pins.set_sda();
    }

    fn shift_out_u8(&mut self, mut data: u8) {
        self.pins.sda_to_output();
        self.pins.clear_scl();
        for _ in 0..8 {
            if data & 0x80 == 0 {
                self.pins.clear_sda();
            } else {
                self.pins.set_sda();
            }
            self.settle();
            self.pins.set_scl();
            self.settle();
            data <<= 1;
            self.pins.clear_scl();
            self.settle();
        }
    }

    fn shift_out_u16(&mut self, mut data: u16) {
        self.pins.sda_to_output();
        self.pins.clear_scl();
        for _ in 0..16 {
            if data & 0x8000 == 0 {
                self.pins.clear_sda();
            } else {
                self.pins.set_sda();
            }
            self.settle();
            self.pins.set_scl();
            data <<= 1;
            self.settle();
            self.pins.clear_scl();
            self.settle();
        }
    }

    fn shift_in_u16(&mut self) -> u16 {
        self.pins.sda_to_input();
        self.settle();

        let mut value = 0;
        for _ in 0..16 {
            value <<= 1;
            if self.pins.read_sda() {
                value |= 1;
            }
            self.pins.set_scl();
            self.settle();
            self.pins.clear_scl();
            self.settle();
        }

        self.pins.sda_to_output();
        value
    }
}

impl<P, D> Bk4819Bus for BitBangBus<P, D>
where
    P: BusPins,
    D: DelayNs,
{
    type Error = Infallible;

    fn read_register(&mut self, address: RegisterAddress) -> Result<u16, Self::Error> {
        self.select();
        self.shift_out_u8(address.0 | READ_COMMAND);
        let value = self.shift_in_u16();
        self.deselect();
        Ok(value)
    }

    fn write_register(&mut self, address: RegisterAddress, value: u16) -> Result<(), Self::Error> {
        self.select();
        self.shift_out_u8(address.0);
        self.settle();
        self.shift_out_u16(value);
        self.settle();
        self.deselect();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use embedded_hal_mocks::delay::NoopDelay;

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Event {
        Scn(bool),
        Scl(bool),
        Sda(bool),
        SdaInput,
        SdaOutput,
    }

    /// Records every pin operation and replays a scripted bit sequence on
    /// SDA reads.
    struct RecordingPins {
        events: Rc<RefCell<Vec<Event>>>,
        read_bits: Rc<RefCell<Vec<bool>>>,
    }

    impl BusPins for RecordingPins {
        fn set_scn(&mut self) {
            self.events.borrow_mut().push(Event::Scn(true));
        }
        fn clear_scn(&mut self) {
            self.events.borrow_mut().push(Event::Scn(false));
        }
        fn set_scl(&mut self) {
            self.events.borrow_mut().push(Event::Scl(true));
        }
        fn clear_scl(&mut self) {
            self.events.borrow_mut().push(Event::Scl(false));
        }
        fn set_sda(&mut self) {
            self.events.borrow_mut().push(Event::Sda(true));
        }
        fn clear_sda(&mut self) {
            self.events.borrow_mut().push(Event::Sda(false));
        }
        fn sda_to_input(&mut self) {
            self.events.borrow_mut().push(Event::SdaInput);
        }
        fn sda_to_output(&mut self) {
            self.events.borrow_mut().push(Event::SdaOutput);
        }
        fn read_sda(&mut self) -> bool {
            self.read_bits.borrow_mut().remove(0)
        }
    }

    fn recording_bus(
        read_bits: Vec<bool>,
    ) -> (BitBangBus<RecordingPins, NoopDelay>, Rc<RefCell<Vec<Event>>>) {
        let events = Rc::new(RefCell::new(Vec::new()));
        let pins = RecordingPins {
            events: events.clone(),
            read_bits: Rc::new(RefCell::new(read_bits)),
        };
        (BitBangBus::new(pins, NoopDelay), events)
    }

    /// Extract the data bits clocked out: the SDA level in force at each
    /// rising SCL edge while the chip is selected and SDA is an output.
    fn clocked_out_bits(events: &[Event]) -> Vec<bool> {
        let mut sda = true;
        let mut output = true;
        let mut selected = false;
        let mut bits = Vec::new();
        for event in events {
            match event {
                Event::Sda(level) => sda = *level,
                Event::SdaInput => output = false,
                Event::SdaOutput => output = true,
                Event::Scn(level) => selected = !level,
                Event::Scl(true) if output && selected => bits.push(sda),
                _ => {}
            }
        }
        bits
    }

    #[test]
    fn write_shifts_address_then_value_msb_first() {
        let (mut bus, events) = recording_bus(Vec::new());
        events.borrow_mut().clear();

        bus.write_register(RegisterAddress(0x33), 0x9000).unwrap();

        let events = events.borrow();
        // Select sequence: SCN high, SCL low, then SCN low.
        assert_eq!(
            &[Event::Scn(true), Event::Scl(false), Event::Scn(false)],
            &events[..3]
        );
        let bits = clocked_out_bits(&events);
        let mut expected = Vec::new();
        for i in (0..8).rev() {
            expected.push(0x33u8 & (1 << i) != 0);
        }
        for i in (0..16).rev() {
            expected.push(0x9000u16 & (1 << i) != 0);
        }
        assert_eq!(expected, bits);
        // Line returns to idle: last events restore SDA high as output.
        assert_eq!(&[Event::SdaOutput, Event::Sda(true)], &events[events.len() - 2..]);
    }

    #[test]
    fn read_sets_command_bit_and_turns_sda_around() {
        // Scripted response: 0xA5C3, MSB first.
        let word = 0xA5C3u16;
        let script = (0..16).rev().map(|i| word & (1 << i) != 0).collect();
        let (mut bus, events) = recording_bus(script);
        events.borrow_mut().clear();

        let value = bus.read_register(RegisterAddress(0x0C)).unwrap();
        assert_eq!(word, value);

        let events = events.borrow();
        let bits = clocked_out_bits(&events);
        // Only the command byte is clocked out, with bit 7 set.
        let mut expected = Vec::new();
        for i in (0..8).rev() {
            expected.push((0x0Cu8 | 0x80) & (1 << i) != 0);
        }
        assert_eq!(expected, bits);
        assert!(events.contains(&Event::SdaInput));
    }
}
