//! AF routing, microphone gain, compander and scrambler.

use embedded_hal::delay::DelayNs;
use num_traits::FromPrimitive;

use crate::driver::Bk4819;
use crate::regs::{AfCtl, Compressor, Expander, MicGain, ModeCtl, Tone1Freq};
use crate::tone::tone_frequency_word;
use crate::traits::{Bk4819Bus, SidePins};

/// AF output selection (REG_47 <11:8>).
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AfType {
    Mute = 0,
    Fm = 1,
    Alarm = 2,
    Beep = 3,
    Baseband1 = 4,
    Baseband2 = 5,
    Ctco = 6,
    Am = 7,
    FskOut = 8,
    Unknown9 = 9,
    Unknown10 = 10,
    Unknown11 = 11,
    Unknown12 = 12,
    Unknown13 = 13,
    Unknown14 = 14,
    Unknown15 = 15,
}

/// Compander operating mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CompanderMode {
    Off,
    Tx,
    Rx,
    TxRx,
}

impl<B, P, D> Bk4819<B, P, D>
where
    B: Bk4819Bus,
    P: SidePins,
    D: DelayNs,
{
    /// Route the AF output. The companion bits (inverse mode plus two
    /// undocumented ones) are fixed.
    pub fn set_af(&mut self, af: AfType) -> Result<(), B::Error> {
        let mut ctl = AfCtl(0);
        ctl.set_undocumented_hi(6);
        ctl.set_af_output(u16::from(af as u8));
        ctl.set_undocumented_6(true);
        self.write_reg(ctl)
    }

    /// Read back the current AF routing.
    pub fn af_type(&mut self) -> Result<AfType, B::Error> {
        let ctl = self.read_reg::<AfCtl>()?;
        // The 4-bit field covers the full enum range.
        Ok(AfType::from_u16(ctl.af_output()).unwrap_or(AfType::Mute))
    }

    /// Microphone sensitivity, 0.5 dB/step, `0..=31`.
    pub fn set_mic_gain(&mut self, gain: u8) -> Result<(), B::Error> {
        self.write_reg(MicGain::with_gain(gain))
    }

    pub fn compander_enabled(&mut self) -> Result<bool, B::Error> {
        Ok(self.read_reg::<ModeCtl>()?.compander_enable())
    }

    /// Configure and gate the compander. `Off` only clears the enable bit;
    /// the ratio words keep their last values.
    pub fn set_compander(&mut self, mode: CompanderMode) -> Result<(), B::Error> {
        let mode_ctl = self.read_reg::<ModeCtl>()?;

        if mode == CompanderMode::Off {
            let mut off = mode_ctl;
            off.set_compander_enable(false);
            return self.write_reg(off);
        }

        // AF TX compression, 2:1 when transmitting is compressed.
        let mut compressor = Compressor(0);
        compressor.set_ratio(match mode {
            CompanderMode::Tx | CompanderMode::TxRx => 2,
            _ => 0,
        });
        compressor.set_zero_db_point(86);
        compressor.set_noise_point(64);
        self.write_reg(compressor)?;

        // AF RX expansion, 1:2 when receiving is expanded.
        let mut expander = Expander(0);
        expander.set_ratio(match mode {
            CompanderMode::Rx | CompanderMode::TxRx => 1,
            _ => 0,
        });
        expander.set_zero_db_point(86);
        expander.set_noise_point(56);
        self.write_reg(expander)?;

        let mut on = mode_ctl;
        on.set_compander_enable(true);
        self.write_reg(on)
    }

    pub fn disable_scramble(&mut self) -> Result<(), B::Error> {
        self.modify_reg(|mut ctl: ModeCtl| {
            ctl.set_scramble_enable(false);
            ctl
        })
    }

    /// Enable the voice scrambler. `kind` selects the carrier in fixed
    /// steps above the 2.6 kHz base tone.
    pub fn enable_scramble(&mut self, kind: u8) -> Result<(), B::Error> {
        self.modify_reg(|mut ctl: ModeCtl| {
            ctl.set_scramble_enable(true);
            ctl
        })?;
        let word = 0x68DCu16.wrapping_add(u16::from(kind) * 1032);
        self.write_reg(Tone1Freq(word))
    }

    /// Program the scrambler carrier directly from a frequency in Hz.
    pub fn set_scramble_frequency(&mut self, frequency_hz: u16) -> Result<(), B::Error> {
        self.write_reg(Tone1Freq(tone_frequency_word(frequency_hz)))
    }
}
