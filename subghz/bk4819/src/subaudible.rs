//! CTCSS/CDCSS sub-audible signalling.

use embedded_hal::delay::DelayNs;

use crate::driver::Bk4819;
use crate::regs::{CdcssWord, SubAudioCfg, TailCfg, ToneCtl};
use crate::traits::{Bk4819Bus, SidePins};

/// Tail signature sent at the end of a transmission so the far receiver
/// can close its squelch without a noise burst.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Tail {
    /// 134.4 Hz tone (used with CDCSS).
    Tone134,
    Shift120,
    Shift180,
    Shift240,
    /// 55 Hz low tone via the CTC2 word.
    Tone55,
}

/// Scale a CTCSS frequency in 0.1 Hz units to the CTC1 control word
/// (x 20.64888 for the 13M/26M crystal), rounding at the half-unit.
fn ctc1_word(freq_0p1hz: u32) -> u16 {
    ((freq_0p1hz * 206_488 + 50_000) / 100_000) as u16
}

impl<B, P, D> Bk4819<B, P, D>
where
    B: Bk4819Bus,
    P: SidePins,
    D: DelayNs,
{
    /// Program a CTCSS tone for TX and detection. `freq_0p1hz` is the tone
    /// frequency in 0.1 Hz units; the special value 2625 selects the
    /// 1050/4 Hz detection mode used for alarm reception.
    pub fn set_ctcss_frequency(&mut self, freq_0p1hz: u32) -> Result<(), B::Error> {
        let mut cfg = SubAudioCfg(0);
        cfg.set_enable_cxcss(true);
        cfg.set_mode_ctcss(true);
        cfg.set_detect_1050hz(freq_0p1hz == 2625);
        cfg.set_tx_gain1(74);
        self.write_reg(cfg)?;

        let mut ctl = ToneCtl(0);
        ctl.set_mode(ToneCtl::MODE_CTC1);
        ctl.set_frequency_word(ctc1_word(freq_0p1hz));
        self.write_reg(ctl)
    }

    /// Program a 23-bit CDCSS codeword, split into two tagged 12-bit
    /// halves.
    pub fn set_cdcss_code_word(&mut self, code_word: u32) -> Result<(), B::Error> {
        let mut cfg = SubAudioCfg(0);
        cfg.set_enable_cxcss(true);
        cfg.set_tx_gain1(51);
        self.write_reg(cfg)?;

        // CDCSS bit clock, 134.4Hz scaled through the CTC1 word.
        let mut ctl = ToneCtl(0);
        ctl.set_mode(ToneCtl::MODE_CTC1);
        ctl.set_frequency_word(2775);
        self.write_reg(ctl)?;

        let mut low = CdcssWord(0);
        low.set_high_half(false);
        low.set_code((code_word & 0x0FFF) as u16);
        self.write_reg(low)?;

        let mut high = CdcssWord(0);
        high.set_high_half(true);
        high.set_code(((code_word >> 12) & 0x0FFF) as u16);
        self.write_reg(high)
    }

    /// Arm tail detection for a CTCSS tone (`freq_10hz` in 0.1 Hz units)
    /// through the CTC2 divider word.
    pub fn set_tail_detection(&mut self, freq_10hz: u32) -> Result<(), B::Error> {
        let mut ctl = ToneCtl(0);
        ctl.set_mode(ToneCtl::MODE_CTC2);
        ctl.set_frequency_word(((253_910 + freq_10hz / 2) / freq_10hz) as u16);
        self.write_reg(ctl)
    }

    /// Configure the end-of-transmission tail signature.
    pub fn gen_tail(&mut self, tail: Tail) -> Result<(), B::Error> {
        match tail {
            Tail::Tone134 | Tail::Shift120 | Tail::Shift180 | Tail::Shift240 => {
                let mut cfg = TailCfg(0);
                cfg.set_shift_enable(true);
                cfg.set_tail_mode(match tail {
                    Tail::Tone134 => 0,
                    Tail::Shift120 => 1,
                    Tail::Shift180 => 2,
                    _ => 3,
                });
                cfg.set_found_threshold(0x0A);
                cfg.set_lost_threshold(0x0F);
                self.write_reg(cfg)
            }
            Tail::Tone55 => {
                let mut ctl = ToneCtl(0);
                ctl.set_mode(ToneCtl::MODE_CTC1);
                ctl.set_frequency_word(0x046F);
                self.write_reg(ctl)
            }
        }
    }

    /// Enable CTCSS with the given tail signature.
    pub fn enable_ctcss(&mut self, tail: Tail) -> Result<(), B::Error> {
        self.gen_tail(tail)?;
        let mut cfg = SubAudioCfg(0);
        cfg.set_enable_cxcss(true);
        cfg.set_mode_ctcss(true);
        cfg.set_tx_gain1(74);
        self.write_reg(cfg)
    }

    /// Enable CDCSS with the 134.4 Hz tail.
    pub fn enable_cdcss(&mut self) -> Result<(), B::Error> {
        self.gen_tail(Tail::Tone134)?;
        let mut cfg = SubAudioCfg(0);
        cfg.set_enable_cxcss(true);
        cfg.set_tx_gain1(74);
        self.write_reg(cfg)
    }

    /// Turn sub-audible signalling off entirely.
    pub fn exit_sub_audible(&mut self) -> Result<(), B::Error> {
        self.write_reg(SubAudioCfg(0))
    }
}

#[cfg(test)]
mod tests {
    use crate::regs::Register;
    use crate::testutil::driver_with_fake;

    use super::*;

    #[test]
    fn ctcss_configuration_words() {
        let mut radio = driver_with_fake();

        // 67.0 Hz
        radio.set_ctcss_frequency(670).unwrap();
        assert_eq!(0x904A, radio.bus.regs[SubAudioCfg::ADDRESS.0 as usize]);
        assert_eq!(
            (670 * 206_488 + 50_000) / 100_000,
            u32::from(radio.bus.regs[ToneCtl::ADDRESS.0 as usize])
        );

        // 262.5 Hz selects 1050/4 detection
        radio.set_ctcss_frequency(2625).unwrap();
        assert_eq!(0x944A, radio.bus.regs[SubAudioCfg::ADDRESS.0 as usize]);
    }

    #[test]
    fn ctcss_word_is_monotonic_and_tracks_the_scale() {
        let mut previous = 0u16;
        for freq in (250u32..=2541).step_by(7) {
            let word = ctc1_word(freq);
            assert!(word >= previous, "word must not decrease at {freq}");
            previous = word;

            let exact = f64::from(freq) * 2.064_88;
            assert!(
                (f64::from(word) - exact).abs() <= 1.0,
                "word {word} deviates from {exact} at {freq}"
            );
        }
    }

    #[test]
    fn cdcss_codeword_round_trips_through_the_two_halves() {
        let reconstruct = |low: u16, high: u16| -> u32 {
            (u32::from(high & 0x0FFF) << 12) | u32::from(low & 0x0FFF)
        };

        let check = |code: u32| {
            let mut radio = driver_with_fake();
            radio.set_cdcss_code_word(code).unwrap();
            let writes = radio.bus.writes_to(CdcssWord::ADDRESS.0);
            assert_eq!(2, writes.len());
            assert_eq!(0, writes[0] & 0x8000, "low half first");
            assert_eq!(0x8000, writes[1] & 0x8000, "high half tagged");
            assert_eq!(code, reconstruct(writes[0], writes[1]));
        };

        check(0);
        check(0x7F_FFFF);
        check(0x0456_21);
        // stride across the full 23-bit space
        let mut code = 0u32;
        while code < (1 << 23) {
            check(code);
            code += 0x1_86A3;
        }
    }

    #[test]
    fn tail_detection_uses_the_ctc2_divider() {
        let mut radio = driver_with_fake();
        radio.set_tail_detection(550).unwrap(); // 55.0 Hz
        let expected = (1 << 13) | ((253_910 + 275) / 550);
        assert_eq!(expected, u32::from(radio.bus.regs[ToneCtl::ADDRESS.0 as usize]));
    }

    #[test]
    fn tails_and_enables() {
        let mut radio = driver_with_fake();
        radio.gen_tail(Tail::Shift180).unwrap();
        assert_eq!(0xC28F, radio.bus.regs[TailCfg::ADDRESS.0 as usize]);

        radio.enable_ctcss(Tail::Tone55).unwrap();
        assert_eq!(0x046F, radio.bus.regs[ToneCtl::ADDRESS.0 as usize]);
        assert_eq!(0x904A, radio.bus.regs[SubAudioCfg::ADDRESS.0 as usize]);

        radio.enable_cdcss().unwrap();
        assert_eq!(0x828F, radio.bus.regs[TailCfg::ADDRESS.0 as usize]);
        assert_eq!(0x804A, radio.bus.regs[SubAudioCfg::ADDRESS.0 as usize]);

        radio.exit_sub_audible().unwrap();
        assert_eq!(0, radio.bus.regs[SubAudioCfg::ADDRESS.0 as usize]);
    }
}
