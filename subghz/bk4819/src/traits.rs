//! Collaborator seams between the driver and the board.

use crate::regs::RegisterAddress;

/// Register-level access to the chip. One complete synchronous bus
/// transaction per call; implementations are not reentrant and the driver
/// never overlaps transactions.
///
/// There is no notion of a device-side failure: an absent or stuck chip
/// yields undefined read data, which callers cross-check where it matters
/// (for example the frequency-scan busy bit).
pub trait Bk4819Bus {
    type Error;

    fn read_register(&mut self, address: RegisterAddress) -> Result<u16, Self::Error>;
    fn write_register(&mut self, address: RegisterAddress, value: u16) -> Result<(), Self::Error>;
}

/// Pin control for the chip's 3-wire serial link (SCN select, SCL clock,
/// bidirectional SDA data).
pub trait BusPins {
    fn set_scn(&mut self);
    fn clear_scn(&mut self);
    fn set_scl(&mut self);
    fn clear_scl(&mut self);
    fn set_sda(&mut self);
    fn clear_sda(&mut self);
    /// Switch SDA to input (enabling the input buffer where applicable).
    fn sda_to_input(&mut self);
    /// Switch SDA back to output.
    fn sda_to_output(&mut self);
    fn read_sda(&mut self) -> bool;
}

/// Board-level side signals the driver toggles: the audio amplifier enable
/// and the indicator lamp lit while the FSK FIFO is being loaded.
#[cfg_attr(test, mockall::automock)]
pub trait SidePins {
    fn set_speaker(&mut self);
    fn clear_speaker(&mut self);
    fn set_lamp(&mut self);
    fn clear_lamp(&mut self);
}

/// External builder for the fixed-format keep-alive (post-ID) packet. The
/// driver treats the produced bytes as opaque payload.
pub trait PostIdEncoder {
    /// Encode a packet for `op`/`arg`/`unit_id` into `buffer`, returning
    /// the number of bytes produced.
    fn encode(&self, op: u8, arg: u8, unit_id: u16, buffer: &mut [u8]) -> usize;
}
