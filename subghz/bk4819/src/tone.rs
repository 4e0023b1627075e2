//! Tone and DTMF playback.
//!
//! Every play operation walks the same gate sequence: assert the TX mute,
//! enable the tone generator, hold for the caller's duration, re-assert the
//! mute and disable the generator. Dual-tone output (DTMF, roger beep)
//! chains two single-tone phases.

use embedded_hal::delay::DelayNs;

use crate::audio::AfType;
use crate::driver::Bk4819;
use crate::regs::{AfCtl, DtmfAux, DtmfCtl, RfBlocks, Tone1Freq, Tone2Freq, ToneCfg};
use crate::traits::{Bk4819Bus, SidePins};

/// Tone frequency to REG_71/REG_72 control word: `freq(Hz) * 10.32444`
/// for the 13M/26M crystal, rounded.
pub fn tone_frequency_word(freq_hz: u16) -> u16 {
    ((u32::from(freq_hz) * 1_353_245 + (1 << 16)) >> 17) as u16
}

/// DTMF control word scaling; same nominal scale as
/// [`tone_frequency_word`] with decimal rounding.
fn dtmf_frequency_word(freq_hz: u16) -> u16 {
    ((u32::from(freq_hz) * 103_244 + 5_000) / 10_000) as u16
}

/// The dual-tone pair for a DTMF symbol, or `None` for characters outside
/// the 16-symbol alphabet (callers skip those silently).
pub fn dtmf_tone_pair(symbol: char) -> Option<(u16, u16)> {
    // Values as shipped in the reference firmware, including its 679 Hz
    // low tone for 1/3/A (nominal DTMF would be 697 Hz).
    let pair = match symbol {
        '0' => (941, 1336),
        '1' => (679, 1209),
        '2' => (697, 1336),
        '3' => (679, 1477),
        '4' => (770, 1209),
        '5' => (770, 1336),
        '6' => (770, 1477),
        '7' => (852, 1209),
        '8' => (852, 1336),
        '9' => (852, 1477),
        'A' => (679, 1633),
        'B' => (770, 1633),
        'C' => (852, 1633),
        'D' => (941, 1633),
        '*' => (941, 1209),
        '#' => (941, 1477),
        _ => return None,
    };
    Some(pair)
}

/// Hold durations for DTMF string playback, all caller-supplied.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DtmfTiming {
    /// Hold the first symbol longer when set.
    pub stretch_first: bool,
    /// Hold for the first symbol when stretched, in ms.
    pub first_hold_ms: u16,
    /// Hold for `*` and `#`, in ms.
    pub hash_hold_ms: u16,
    /// Hold for every other symbol, in ms.
    pub hold_ms: u16,
    /// Muted gap between symbols, in ms.
    pub gap_ms: u16,
}

impl<B, P, D> Bk4819<B, P, D>
where
    B: Bk4819Bus,
    P: SidePins,
    D: DelayNs,
{
    /// Start tone 1 at `frequency_hz` with the given amplitude and open
    /// the speaker path. With `power_dac` the TX chain is cycled first.
    pub fn start_tone(
        &mut self,
        frequency_hz: u16,
        level: u8,
        power_dac: bool,
    ) -> Result<(), B::Error> {
        self.set_af(AfType::Beep)?;
        self.enter_tx_mute()?;

        let mut tones = ToneCfg(0);
        tones.set_tone1_enable(true);
        tones.set_tone1_gain(u16::from(level & 0x7F));
        self.write_reg(tones)?;

        if power_dac {
            self.write_reg(RfBlocks(0))?;
            self.enable_tx_link()?;
        }

        self.write_reg(Tone1Freq(tone_frequency_word(frequency_hz)))?;
        self.exit_tx_mute()?;

        self.pins.set_speaker();
        self.delay.delay_ms(2);
        Ok(())
    }

    /// Close the speaker path and shut the tone generator down.
    pub fn stop_tones(&mut self) -> Result<(), B::Error> {
        self.pins.clear_speaker();

        self.enter_tx_mute()?;
        self.write_reg(ToneCfg(0))?;
        self.write_reg(RfBlocks::TX_ON)?;
        self.exit_tx_mute()
    }

    /// Play a single tone for `hold_ms`, preserving the AF routing across
    /// the call.
    pub fn play_tone(&mut self, frequency_hz: u16, hold_ms: u32, level: u8) -> Result<(), B::Error> {
        let saved_af = self.read_reg::<AfCtl>()?;
        self.start_tone(frequency_hz, level, true)?;
        self.delay.delay_ms(hold_ms.saturating_sub(2));
        self.stop_tones()?;
        self.write_reg(saved_af)
    }

    /// The two-phase end-of-transmission confirmation beep.
    pub fn play_roger(&mut self) -> Result<(), B::Error> {
        const TONE1_HZ: u16 = 1540;
        const TONE2_HZ: u16 = 1310;

        let saved_af = self.read_reg::<AfCtl>()?;
        self.start_tone(TONE1_HZ, 96, true)?;
        self.delay.delay_ms(80 - 2);
        self.start_tone(TONE2_HZ, 96, false)?;
        self.delay.delay_ms(80);
        self.stop_tones()?;
        self.write_reg(saved_af)
    }

    /// Play a tone without touching the RF chain, for local side tones.
    pub fn transmit_tone(&mut self, local_loopback: bool, frequency_hz: u16) -> Result<(), B::Error> {
        self.enter_tx_mute()?;

        let mut tones = ToneCfg(0);
        tones.set_tone1_enable(true);
        tones.set_tone1_gain(28);
        self.write_reg(tones)?;
        self.write_reg(Tone1Freq(tone_frequency_word(frequency_hz)))?;

        self.set_af(if local_loopback {
            AfType::Beep
        } else {
            AfType::Mute
        })?;
        self.enable_tx_link()?;
        self.delay.delay_ms(50);
        self.exit_tx_mute()
    }

    pub fn enable_dtmf(&mut self) -> Result<(), B::Error> {
        self.write_reg(DtmfAux(0x06D8))?;

        let mut ctl = DtmfCtl(0);
        ctl.set_undocumented_15(true);
        // 24 is the vendor default but only decodes Quansheng radios.
        ctl.set_threshold(130);
        ctl.set_undocumented_6(true);
        ctl.set_detect_enable(true);
        ctl.set_mode_dtmf(true);
        ctl.set_max_symbols(15);
        self.write_reg(ctl)
    }

    pub fn disable_dtmf(&mut self) -> Result<(), B::Error> {
        self.write_reg(DtmfCtl(0))
    }

    /// Load the tone pair for one DTMF symbol. Unmapped characters write
    /// nothing.
    pub fn play_dtmf(&mut self, symbol: char) -> Result<(), B::Error> {
        if let Some((tone1, tone2)) = dtmf_tone_pair(symbol) {
            self.write_reg(Tone1Freq(dtmf_frequency_word(tone1)))?;
            self.write_reg(Tone2Freq(dtmf_frequency_word(tone2)))?;
        }
        Ok(())
    }

    /// Configure the dual-tone generator for DTMF transmission.
    pub fn enter_dtmf_tx(&mut self, local_loopback: bool) -> Result<(), B::Error> {
        self.enable_dtmf()?;
        self.enter_tx_mute()?;
        self.set_af(if local_loopback {
            AfType::Beep
        } else {
            AfType::Mute
        })?;

        let mut tones = ToneCfg(0);
        tones.set_tone1_enable(true);
        tones.set_tone1_gain(83);
        tones.set_tone2_enable(true);
        tones.set_tone2_gain(83);
        self.write_reg(tones)?;

        self.enable_tx_link()
    }

    pub fn exit_dtmf_tx(&mut self, keep_muted: bool) -> Result<(), B::Error> {
        self.enter_tx_mute()?;
        self.set_af(AfType::Mute)?;
        self.write_reg(ToneCfg(0))?;
        self.disable_dtmf()?;
        self.write_reg(RfBlocks::TX_ON)?;
        if !keep_muted {
            self.exit_tx_mute()?;
        }
        Ok(())
    }

    /// Play a DTMF string. Symbols outside the alphabet produce no tone
    /// change but still consume their hold slot.
    pub fn play_dtmf_string(&mut self, symbols: &str, timing: &DtmfTiming) -> Result<(), B::Error> {
        for (i, symbol) in symbols.chars().enumerate() {
            self.play_dtmf(symbol)?;
            self.exit_tx_mute()?;

            let hold = if timing.stretch_first && i == 0 {
                timing.first_hold_ms
            } else if symbol == '*' || symbol == '#' {
                timing.hash_hold_ms
            } else {
                timing.hold_ms
            };
            self.delay.delay_ms(u32::from(hold));

            self.enter_tx_mute()?;
            self.delay.delay_ms(u32::from(timing.gap_ms));
        }
        Ok(())
    }

    /// One-shot DTMF symbol: configure, settle, sound.
    pub fn play_dtmf_symbol(&mut self, local_loopback: bool, symbol: char) -> Result<(), B::Error> {
        self.enable_dtmf()?;
        self.enter_tx_mute()?;
        self.set_af(if local_loopback {
            AfType::Beep
        } else {
            AfType::Mute
        })?;
        self.write_reg(ToneCfg(0xD3D3))?;
        self.enable_tx_link()?;
        self.delay.delay_ms(50);
        self.play_dtmf(symbol)?;
        self.exit_tx_mute()
    }
}
