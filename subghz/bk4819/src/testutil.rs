//! Shared test doubles: a scripted register bus and inert side pins.

use core::convert::Infallible;

use embedded_hal_mocks::delay::NoopDelay;

use crate::driver::Bk4819;
use crate::regs::RegisterAddress;
use crate::traits::{Bk4819Bus, SidePins};

const INT_FLAGS: u8 = 0x02;
const INT_REQUEST: u8 = 0x0C;
const FSK_CTL: u8 = 0x59;
const FSK_DATA_LENGTH: u8 = 0x5D;
const FSK_FIFO: u8 = 0x5F;

const FLAG_TX_FINISHED: u16 = 1 << 15;
const FLAG_FIFO_ALMOST_EMPTY: u16 = 1 << 14;

/// In-memory register file that logs writes.
///
/// With `fsk_sim` enabled it also models the TX-side interrupt handshake:
/// the FIFO drains instantly, REG_0C always reports a pending interrupt
/// while polled, and latching REG_02 yields "almost empty" until every
/// expected word has been loaded, then "TX finished".
pub struct FakeBus {
    pub regs: [u16; 128],
    /// Every `(address, value)` written, in order.
    pub writes: Vec<(u8, u16)>,
    /// Words pushed through the FIFO port.
    pub fifo_word_writes: usize,
    /// How many almost-empty causes the simulator has handed out.
    pub almost_empty_delivered: usize,
    pub fsk_sim: bool,
    expected_words: usize,
    latched_flags: u16,
}

impl FakeBus {
    pub fn new() -> Self {
        Self {
            regs: [0; 128],
            writes: Vec::new(),
            fifo_word_writes: 0,
            almost_empty_delivered: 0,
            fsk_sim: false,
            expected_words: 0,
            latched_flags: 0,
        }
    }

    /// All values written to one address, in order.
    pub fn writes_to(&self, address: u8) -> Vec<u16> {
        self.writes
            .iter()
            .filter(|(a, _)| *a == address)
            .map(|(_, v)| *v)
            .collect()
    }

    fn tx_running(&self) -> bool {
        self.regs[FSK_CTL as usize] & (1 << 11) != 0
    }
}

impl Default for FakeBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bk4819Bus for FakeBus {
    type Error = Infallible;

    fn read_register(&mut self, address: RegisterAddress) -> Result<u16, Self::Error> {
        let value = match address.0 {
            INT_REQUEST if self.fsk_sim && self.tx_running() => 1,
            INT_FLAGS if self.fsk_sim => self.latched_flags,
            other => self.regs[other as usize],
        };
        Ok(value)
    }

    fn write_register(&mut self, address: RegisterAddress, value: u16) -> Result<(), Self::Error> {
        self.writes.push((address.0, value));
        match address.0 {
            // Writing the flags register latches the current cause; the
            // stored flag bits are not clobbered by the write.
            INT_FLAGS => {
                if self.fsk_sim {
                    self.latched_flags = if self.fifo_word_writes >= self.expected_words {
                        FLAG_TX_FINISHED
                    } else {
                        self.almost_empty_delivered += 1;
                        FLAG_FIFO_ALMOST_EMPTY
                    };
                }
                return Ok(());
            }
            FSK_DATA_LENGTH => {
                self.expected_words =
                    usize::from(((value & 0x7) << 8) | (value >> 8)) + 1;
            }
            FSK_FIFO => {
                self.fifo_word_writes += 1;
            }
            _ => {}
        }
        self.regs[address.0 as usize] = value;
        Ok(())
    }
}

/// Side pins that go nowhere.
pub struct NullPins;

impl SidePins for NullPins {
    fn set_speaker(&mut self) {}
    fn clear_speaker(&mut self) {}
    fn set_lamp(&mut self) {}
    fn clear_lamp(&mut self) {}
}

pub fn driver_with_fake() -> Bk4819<FakeBus, NullPins, NoopDelay> {
    Bk4819::new(FakeBus::new(), NullPins, NoopDelay)
}

pub fn driver_with_fake_delay<D: embedded_hal::delay::DelayNs>(
    delay: D,
) -> Bk4819<FakeBus, NullPins, D> {
    Bk4819::new(FakeBus::new(), NullPins, delay)
}

pub fn driver_with_parts<P: SidePins, D: embedded_hal::delay::DelayNs>(
    bus: FakeBus,
    pins: P,
    delay: D,
) -> Bk4819<FakeBus, P, D> {
    Bk4819::new(bus, pins, delay)
}
