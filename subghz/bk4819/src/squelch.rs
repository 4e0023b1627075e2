//! Squelch thresholds, VOX and the RX signal-quality indicators.

use embedded_hal::delay::DelayNs;

use crate::audio::AfType;
use crate::driver::Bk4819;
use crate::regs::{
    AfTxRx, ExNoiseIndicator, GlitchCloseThreshold, GlitchIndicator, ModeCtl, NoiseThresholds,
    Register, RssiIndicator, RssiThresholds, SquelchCtl, ToneCfg, VoiceAmplitude, VoxDelay,
    VoxDisableThreshold, VoxEnableThreshold,
};
use crate::traits::{Bk4819Bus, SidePins};

/// The six independent squelch thresholds.
///
/// RSSI is in 0.5 dB steps; noise and glitch are raw indicator counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SquelchThresholds {
    pub open_rssi: u8,
    pub close_rssi: u8,
    pub open_noise: u8,
    pub close_noise: u8,
    pub open_glitch: u8,
    pub close_glitch: u8,
}

/// Squelch open/close delay pairing. `Fast` opens quicker at the cost of
/// twitchier behaviour while scanning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SquelchDelayProfile {
    Standard,
    Fast,
}

impl SquelchDelayProfile {
    /// (open delay, close delay) as written into REG_4E. The reference
    /// values overlap the documented field split, so the word is computed
    /// arithmetically rather than through field setters.
    fn delays(self) -> (u16, u16) {
        match self {
            SquelchDelayProfile::Standard => (5, 6),
            SquelchDelayProfile::Fast => (2, 1),
        }
    }
}

impl<B, P, D> Bk4819<B, P, D>
where
    B: Bk4819Bus,
    P: SidePins,
    D: DelayNs,
{
    /// Program the squelch thresholds.
    ///
    /// This is a full RX-path reset, not an incremental tweak: it disables
    /// the tone generator, mutes the AF output and powers the RX chain
    /// back up.
    pub fn setup_squelch(
        &mut self,
        thresholds: &SquelchThresholds,
        profile: SquelchDelayProfile,
    ) -> Result<(), B::Error> {
        self.write_reg(ToneCfg(0))?;

        let mut glitch_close = GlitchCloseThreshold(0xA000);
        glitch_close.set_threshold(u16::from(thresholds.close_glitch));
        self.write_reg(glitch_close)?;

        let (open_delay, close_delay) = profile.delays();
        self.write_reg(SquelchCtl(
            (1 << 14) | (open_delay << 11) | (close_delay << 9) | u16::from(thresholds.open_glitch),
        ))?;

        let mut noise = NoiseThresholds(0);
        noise.set_close(u16::from(thresholds.close_noise));
        noise.set_open(u16::from(thresholds.open_noise));
        self.write_reg(noise)?;

        let mut rssi = RssiThresholds(0);
        rssi.set_open(u16::from(thresholds.open_rssi));
        rssi.set_close(u16::from(thresholds.close_rssi));
        self.write_reg(rssi)?;

        self.set_af(AfType::Mute)?;
        self.rx_turn_on()
    }

    /// Enable VOX with the given trigger/release amplitudes (11 bits each).
    /// The release delay is the fixed 640 ms calibration.
    pub fn enable_vox(
        &mut self,
        enable_threshold: u16,
        disable_threshold: u16,
    ) -> Result<(), B::Error> {
        let mode_ctl = self.read_reg::<ModeCtl>()?;

        let mut enable = VoxEnableThreshold(0xA000);
        enable.set_threshold(enable_threshold & 0x07FF);
        self.write_reg(enable)?;

        let mut disable = VoxDisableThreshold(0x1800);
        disable.set_threshold(disable_threshold & 0x07FF);
        self.write_reg(disable)?;

        // Disable delay 5 * 128 ms on top of the calibrated low bits.
        self.write_reg(VoxDelay(0x289A))?;

        let mut on = mode_ctl;
        on.set_vox_enable(true);
        self.write_reg(on)
    }

    pub fn disable_vox(&mut self) -> Result<(), B::Error> {
        self.modify_reg(|mut ctl: ModeCtl| {
            ctl.set_vox_enable(false);
            ctl
        })
    }

    /// Raw RSSI, 0.5 dB/step.
    pub fn rssi(&mut self) -> Result<u16, B::Error> {
        Ok(self.read_reg::<RssiIndicator>()?.rssi())
    }

    pub fn rssi_dbm(&mut self) -> Result<i16, B::Error> {
        Ok((self.rssi()? as i16) / 2 - 160)
    }

    pub fn glitch_indicator(&mut self) -> Result<u8, B::Error> {
        Ok(self.read_reg::<GlitchIndicator>()?.glitch() as u8)
    }

    pub fn ex_noise_indicator(&mut self) -> Result<u8, B::Error> {
        Ok(self.read_reg::<ExNoiseIndicator>()?.noise() as u8)
    }

    pub fn voice_amplitude(&mut self) -> Result<u16, B::Error> {
        self.read_register(VoiceAmplitude::ADDRESS)
    }

    /// The amplitude the VOX comparator sees.
    pub fn vox_amplitude(&mut self) -> Result<u16, B::Error> {
        Ok(self.read_reg::<VoiceAmplitude>()?.amplitude())
    }

    pub fn af_tx_rx_level(&mut self) -> Result<u8, B::Error> {
        Ok(self.read_reg::<AfTxRx>()?.level() as u8)
    }
}
