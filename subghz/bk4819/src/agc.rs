//! AGC profiles and gain readback.

use embedded_hal::delay::DelayNs;

use crate::driver::Bk4819;
use crate::regs::{
    agc_gain_table_address, AgcAux, AgcAux2, AgcAux3, AgcCtl, AgcGainEntry, AgcRfLevel, AgcStep,
    RegisterAddress,
};
use crate::traits::{Bk4819Bus, SidePins};

/// The two calibrated AGC register sets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AgcProfile {
    Default,
    Alternate,
}

// Gain table entries for both profiles, REG_13 down to REG_10 plus the
// REG_14 (-1) slot. Empirically reverse-engineered, do not derive.
const GAIN_TABLE_DEFAULT: [u16; 5] = [0x03BE, 0x037B, 0x027B, 0x007A, 0x0019];
const GAIN_TABLE_ALTERNATE: [u16; 5] = [0x03BE, 0x037C, 0x027B, 0x007A, 0x0018];

impl<B, P, D> Bk4819<B, P, D>
where
    B: Bk4819Bus,
    P: SidePins,
    D: DelayNs,
{
    /// Load one of the two calibrated AGC profiles.
    pub fn init_agc(&mut self, profile: AgcProfile) -> Result<(), B::Error> {
        let table = match profile {
            AgcProfile::Default => &GAIN_TABLE_DEFAULT,
            AgcProfile::Alternate => &GAIN_TABLE_ALTERNATE,
        };
        for (index, &entry) in table.iter().enumerate() {
            // REG_13, REG_12, REG_11, REG_10, REG_14
            let address = if index < 4 {
                RegisterAddress(0x13 - index as u8)
            } else {
                RegisterAddress(0x14)
            };
            self.write_register(address, entry)?;
        }

        self.write_reg(AgcRfLevel(0x2A38))?;

        match profile {
            AgcProfile::Default => {
                self.write_reg(AgcAux(0x8420))?;
            }
            AgcProfile::Alternate => {
                self.write_reg(AgcAux(0x318C))?;
                self.write_reg(AgcAux2(0x595E))?;
                self.write_reg(AgcAux3(0x8DEF))?;
                // Per-step gain table; the encoding is only empirically
                // understood. Reverse-engineered, do not derive.
                for step in 0..8u16 {
                    self.write_reg(AgcStep(((step << 13) | 0x2500) + 0x036))?;
                }
            }
        }
        Ok(())
    }

    /// Switch the AGC between automatic and fixed-index mode. A no-op when
    /// the requested state is already in force; other REG_7E bits are
    /// preserved.
    pub fn set_agc_enabled(&mut self, enable: bool) -> Result<(), B::Error> {
        let ctl = self.read_reg::<AgcCtl>()?;
        let currently_enabled = !ctl.fix_mode();
        if currently_enabled == enable {
            return Ok(());
        }

        let mut next = ctl;
        next.set_fix_mode(!enable);
        next.set_fix_index(3);
        self.write_reg(next)
    }

    /// Current front-end gain in dB, resolved through the AGC gain table.
    pub fn rx_gain_db(&mut self) -> Result<i8, B::Error> {
        const LNA_SHORT_DB: [i8; 4] = [-28, -24, -19, 0];
        const LNA_DB: [i8; 8] = [-24, -19, -14, -9, -6, -4, -2, 0];
        const MIXER_DB: [i8; 4] = [-8, -6, -3, 0];
        const PGA_DB: [i8; 8] = [-33, -27, -21, -15, -9, -6, -3, 0];

        let ctl = self.read_reg::<AgcCtl>()?;
        let raw_index = ctl.fix_index() as i8;
        // 3..0 then 7..4 wrap to -1..-4.
        let index = if raw_index >= 4 { raw_index - 8 } else { raw_index };

        let entry = AgcGainEntry(self.read_register(agc_gain_table_address(index))?);
        Ok(LNA_SHORT_DB[entry.lna_short() as usize]
            + LNA_DB[entry.lna() as usize]
            + MIXER_DB[entry.mixer() as usize]
            + PGA_DB[entry.pga() as usize])
    }
}

#[cfg(test)]
mod tests {
    use crate::regs::Register;
    use crate::testutil::driver_with_fake;

    use super::*;

    #[test]
    fn default_profile_writes_the_calibrated_set() {
        let mut radio = driver_with_fake();
        radio.init_agc(AgcProfile::Default).unwrap();

        assert_eq!(0x03BE, radio.bus.regs[0x13]);
        assert_eq!(0x037B, radio.bus.regs[0x12]);
        assert_eq!(0x027B, radio.bus.regs[0x11]);
        assert_eq!(0x007A, radio.bus.regs[0x10]);
        assert_eq!(0x0019, radio.bus.regs[0x14]);
        assert_eq!(0x2A38, radio.bus.regs[0x49]);
        assert_eq!(0x8420, radio.bus.regs[0x7B]);
        assert!(radio.bus.writes_to(AgcStep::ADDRESS.0).is_empty());
    }

    #[test]
    fn alternate_profile_walks_the_step_table() {
        let mut radio = driver_with_fake();
        radio.init_agc(AgcProfile::Alternate).unwrap();

        assert_eq!(0x0018, radio.bus.regs[0x14]);
        assert_eq!(0x318C, radio.bus.regs[0x7B]);
        assert_eq!(0x595E, radio.bus.regs[0x7C]);
        assert_eq!(0x8DEF, radio.bus.regs[0x20]);

        let steps = radio.bus.writes_to(AgcStep::ADDRESS.0);
        assert_eq!(8, steps.len());
        assert_eq!(0x2536, steps[0]);
        assert_eq!((7 << 13) | 0x2536, steps[7]);
    }

    #[test]
    fn agc_toggle_is_a_read_modify_write_noop_when_unchanged() {
        let mut radio = driver_with_fake();
        // fix_mode clear -> AGC already on.
        radio.bus.regs[AgcCtl::ADDRESS.0 as usize] = 0x0000;
        radio.set_agc_enabled(true).unwrap();
        assert!(radio.bus.writes_to(AgcCtl::ADDRESS.0).is_empty());

        radio.set_agc_enabled(false).unwrap();
        assert_eq!(vec![0xB000], radio.bus.writes_to(AgcCtl::ADDRESS.0));
    }

    #[test]
    fn rx_gain_resolves_through_the_gain_table() {
        let mut radio = driver_with_fake();
        // Fix index 0 -> REG_10; everything at maximum gain.
        radio.bus.regs[AgcCtl::ADDRESS.0 as usize] = 0;
        radio.bus.regs[0x10] = (3 << 8) | (7 << 5) | (3 << 3) | 7;
        assert_eq!(0, radio.rx_gain_db().unwrap());

        // Index -1 -> REG_14.
        radio.bus.regs[AgcCtl::ADDRESS.0 as usize] = 7 << 12;
        radio.bus.regs[0x14] = 0x0019; // lna_short 0, lna 0, mixer 3, pga 1
        assert_eq!(-28 + -24 + 0 + -27, radio.rx_gain_db().unwrap());
    }
}
