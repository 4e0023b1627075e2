//! Control-plane driver for the Beken BK4819 single-chip FM transceiver.
//!
//! The chip sits behind a bit-serial 3-wire link and exposes everything
//! (modulation, squelch, tone signalling, frequency, PA bias and an FSK
//! packet modem) as ~128 16-bit registers. This crate provides the
//! register transport, a typed register catalog, the configuration surface
//! and the timing-sensitive tone and packet engines, generic over the
//! board's pin and delay providers.
//!
//! Everything is synchronous and single-context: waits are bounded busy
//! loops, and the one piece of driver-side state (the write-only GPIO
//! register mirror) lives in the [`Bk4819`] value, one per physical chip.

#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate num_derive;

mod agc;
mod audio;
mod bus;
mod driver;
mod fsk;
mod pins;
mod poll;
pub mod regs;
mod rf;
mod scan;
mod squelch;
mod subaudible;
#[cfg(test)]
mod testutil;
mod tone;
pub mod traits;

pub use self::{
    agc::AgcProfile,
    audio::{AfType, CompanderMode},
    bus::BitBangBus,
    driver::{Bk4819, GpioPin, RF_PATH_OFF},
    fsk::{
        FskDirection, FskError, FskIrq, FskMode, FskModulation, SyncLength, MAX_PACKET_BYTES,
        MAX_PACKET_WORDS, RX_FIFO_WORDS, TX_FIFO_WORDS,
    },
    pins::{BidiPin, HalPins},
    poll::{poll, Poll},
    rf::FilterBandwidth,
    scan::CssScanResult,
    squelch::{SquelchDelayProfile, SquelchThresholds},
    subaudible::Tail,
    tone::{dtmf_tone_pair, tone_frequency_word, DtmfTiming},
};
