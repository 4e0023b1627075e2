//! Frequency and CTCSS/CDCSS scanning.

use embedded_hal::delay::DelayNs;

use crate::driver::Bk4819;
use crate::regs::{
    CdcssScanHigh, CdcssScanLow, CtcssScan, DtmfDecode, IntRequest, ScanCtl, ScanFreqHigh,
    ScanFreqLow, SubAudioCfg,
};
use crate::traits::{Bk4819Bus, SidePins};

/// Outcome of a CTCSS/CDCSS scan poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CssScanResult {
    NotFound,
    /// Detected CTCSS tone frequency in 0.1 Hz units.
    Ctcss { freq_0p1hz: u16 },
    /// Detected 23/24-bit CDCSS codeword.
    Cdcss { code_word: u32 },
}

const SCAN_UNDOCUMENTED: u16 = 290;

impl<B, P, D> Bk4819<B, P, D>
where
    B: Bk4819Bus,
    P: SidePins,
    D: DelayNs,
{
    pub fn enable_frequency_scan(&mut self) -> Result<(), B::Error> {
        let mut ctl = ScanCtl(0);
        ctl.set_undocumented(SCAN_UNDOCUMENTED);
        ctl.set_scan_enable(true);
        self.write_reg(ctl)
    }

    pub fn disable_frequency_scan(&mut self) -> Result<(), B::Error> {
        let mut ctl = ScanCtl(0);
        ctl.set_undocumented(SCAN_UNDOCUMENTED);
        self.write_reg(ctl)
    }

    /// Result of the running frequency scan in 10 Hz units, or `None`
    /// while the scan-busy bit is still set. The busy bit doubles as the
    /// liveness cross-check on the unchecked transport.
    pub fn frequency_scan_result(&mut self) -> Result<Option<u32>, B::Error> {
        let high = self.read_reg::<ScanFreqHigh>()?;
        if high.busy() {
            return Ok(None);
        }
        let low = self.read_reg::<ScanFreqLow>()?;
        Ok(Some(
            (u32::from(high.frequency_high()) << 16) | u32::from(low.frequency_low()),
        ))
    }

    /// Tune for scanning: program the frequency, strip the sub-audible
    /// configuration down to scan mode and power RX up.
    pub fn set_scan_frequency(&mut self, frequency: u32) -> Result<(), B::Error> {
        self.set_frequency(frequency, false)?;

        let mut cfg = SubAudioCfg(0);
        cfg.set_auto_cdcss_bw_disable(true);
        cfg.set_auto_ctcss_bw_disable(true);
        self.write_reg(cfg)?;

        self.rx_turn_on()
    }

    pub fn stop_scan(&mut self) -> Result<(), B::Error> {
        self.disable_frequency_scan()?;
        self.disable()
    }

    /// Poll the CTCSS/CDCSS scanner. CDCSS takes precedence, as its busy
    /// bit clears first on a digital code.
    pub fn css_scan_result(&mut self) -> Result<CssScanResult, B::Error> {
        let cdcss = self.read_reg::<CdcssScanHigh>()?;
        if !cdcss.busy() {
            let low = self.read_reg::<CdcssScanLow>()?;
            return Ok(CssScanResult::Cdcss {
                code_word: (u32::from(cdcss.code_high()) << 12) | u32::from(low.code_low()),
            });
        }

        let ctcss = self.read_reg::<CtcssScan>()?;
        if !ctcss.busy() {
            // Scale the control word back to 0.1 Hz units.
            let freq = (u32::from(ctcss.frequency_word()) * 4843) / 10_000;
            return Ok(CssScanResult::Ctcss {
                freq_0p1hz: freq as u16,
            });
        }

        Ok(CssScanResult::NotFound)
    }

    /// Last decoded DTMF/5-tone symbol index.
    pub fn dtmf_code(&mut self) -> Result<u8, B::Error> {
        Ok(self.read_reg::<DtmfDecode>()?.code() as u8)
    }

    /// Detected CDCSS code type (REG_0C <15:14>).
    pub fn cdcss_code_type(&mut self) -> Result<u8, B::Error> {
        Ok(self.read_reg::<IntRequest>()?.cdcss_code_type() as u8)
    }

    /// Detected CTCSS phase shift (REG_0C <13:12>).
    pub fn ctc_shift(&mut self) -> Result<u8, B::Error> {
        Ok(self.read_reg::<IntRequest>()?.ctc_shift() as u8)
    }

    /// Detected CTC word type (REG_0C <11:10>).
    pub fn ctc_type(&mut self) -> Result<u8, B::Error> {
        Ok(self.read_reg::<IntRequest>()?.ctc_type() as u8)
    }
}

#[cfg(test)]
mod tests {
    use crate::regs::Register;
    use crate::testutil::driver_with_fake;

    use super::*;

    #[test]
    fn scan_enable_toggles_only_the_enable_bit() {
        let mut radio = driver_with_fake();
        radio.enable_frequency_scan().unwrap();
        assert_eq!((290 << 1) | 1, radio.bus.regs[ScanCtl::ADDRESS.0 as usize]);
        radio.disable_frequency_scan().unwrap();
        assert_eq!(290 << 1, radio.bus.regs[ScanCtl::ADDRESS.0 as usize]);
    }

    #[test]
    fn busy_scan_yields_none() {
        let mut radio = driver_with_fake();
        radio.bus.regs[ScanFreqHigh::ADDRESS.0 as usize] = 0x8000;
        assert_eq!(None, radio.frequency_scan_result().unwrap());

        radio.bus.regs[ScanFreqHigh::ADDRESS.0 as usize] = 0x0002; // high bits
        radio.bus.regs[ScanFreqLow::ADDRESS.0 as usize] = 0x3456;
        assert_eq!(
            Some(0x0002_3456),
            radio.frequency_scan_result().unwrap()
        );
    }

    #[test]
    fn css_scan_prefers_cdcss() {
        let mut radio = driver_with_fake();
        radio.bus.regs[CdcssScanHigh::ADDRESS.0 as usize] = 0x0123;
        radio.bus.regs[CdcssScanLow::ADDRESS.0 as usize] = 0x0456;
        assert_eq!(
            CssScanResult::Cdcss {
                code_word: 0x123456
            },
            radio.css_scan_result().unwrap()
        );
    }

    #[test]
    fn css_scan_decodes_ctcss_frequency() {
        let mut radio = driver_with_fake();
        radio.bus.regs[CdcssScanHigh::ADDRESS.0 as usize] = 0x8000; // CDCSS busy
        radio.bus.regs[CtcssScan::ADDRESS.0 as usize] = 1384; // ~67.0 Hz word
        let result = radio.css_scan_result().unwrap();
        assert_eq!(
            CssScanResult::Ctcss {
                freq_0p1hz: (1384 * 4843 / 10_000) as u16
            },
            result
        );

        radio.bus.regs[CtcssScan::ADDRESS.0 as usize] = 0x8000; // CTCSS busy too
        assert_eq!(CssScanResult::NotFound, radio.css_scan_result().unwrap());
    }
}
