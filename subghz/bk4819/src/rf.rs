//! Frequency, filter bandwidth and power amplifier programming.

use embedded_hal::delay::DelayNs;

use crate::driver::Bk4819;
use crate::regs::{FilterCtl, FreqHigh, FreqLow, PaCtl, RfBlocks};
use crate::traits::{Bk4819Bus, SidePins};

/// RX/TX filter bandwidth preset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FilterBandwidth {
    /// 25 kHz channel spacing.
    Wide,
    /// 12.5 kHz channel spacing.
    Narrow,
    /// 6.25 kHz channel spacing.
    Narrower,
}

impl<B, P, D> Bk4819<B, P, D>
where
    B: Bk4819Bus,
    P: SidePins,
    D: DelayNs,
{
    /// Program the RF frequency (10 Hz units).
    ///
    /// The PLL does not resynchronize on the frequency registers alone;
    /// pass `trigger_update` to run the force-update handshake (save the
    /// block-enable register, pulse the update value, restore).
    pub fn set_frequency(&mut self, frequency: u32, trigger_update: bool) -> Result<(), B::Error> {
        self.write_reg(FreqLow(frequency as u16))?;
        self.write_reg(FreqHigh((frequency >> 16) as u16))?;

        if trigger_update {
            let blocks = self.read_reg::<RfBlocks>()?;
            self.write_reg(RfBlocks::PLL_UPDATE)?;
            self.write_reg(blocks)?;
        }
        Ok(())
    }

    /// Select the RX/TX filter bandwidth.
    ///
    /// With `weak_signal_same_bandwidth` the RX bandwidth stays at the
    /// nominal value when the signal is weak; otherwise it narrows.
    pub fn set_filter_bandwidth(
        &mut self,
        bandwidth: FilterBandwidth,
        weak_signal_same_bandwidth: bool,
    ) -> Result<(), B::Error> {
        let mut ctl = FilterCtl(0);
        ctl.set_undocumented_3(true);

        match bandwidth {
            FilterBandwidth::Wide => {
                ctl.set_rf_bandwidth(4);
                ctl.set_weak_rf_bandwidth(if weak_signal_same_bandwidth { 4 } else { 2 });
                ctl.set_af_tx_lpf(6);
                ctl.set_bandwidth_mode(2);
            }
            FilterBandwidth::Narrow => {
                ctl.set_rf_bandwidth(4);
                ctl.set_weak_rf_bandwidth(if weak_signal_same_bandwidth { 4 } else { 2 });
                ctl.set_af_tx_lpf(0);
                ctl.set_bandwidth_mode(0);
            }
            FilterBandwidth::Narrower => {
                ctl.set_rf_bandwidth(3);
                ctl.set_weak_rf_bandwidth(if weak_signal_same_bandwidth { 3 } else { 0 });
                ctl.set_af_tx_lpf(1);
                ctl.set_bandwidth_mode(1);
            }
        }

        self.write_reg(ctl)
    }

    /// Set the PA bias (0..=255 for 0..3.2 V) and the gain pair for the
    /// band of `frequency` (10 Hz units). A zero frequency selects zero
    /// gain for a silent carrier.
    pub fn setup_power_amplifier(&mut self, bias: u8, frequency: u32) -> Result<(), B::Error> {
        let (gain1, gain2) = if frequency == 0 {
            (0, 0)
        } else if frequency < 28_000_000 {
            (1, 0)
        } else {
            (4, 2)
        };

        let mut pa = PaCtl(0);
        pa.set_bias(u16::from(bias));
        pa.set_enable(true);
        pa.set_gain1(gain1);
        pa.set_gain2(gain2);
        self.write_reg(pa)
    }
}
