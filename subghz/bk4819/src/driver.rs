//! Device type and the base RX/TX register state.

use embedded_hal::delay::DelayNs;

use crate::audio::AfType;
use crate::regs::{
    AfGain, BandSelThreshold, DtmfCoeff, GpioOut, IntMask, MicAgc, MicGain, PaCtl, PllCp,
    PowerProfile, Register, RegisterAddress, Reset, RfBlocks, TailCfg, TxMute,
};
use crate::traits::{Bk4819Bus, SidePins};

/// BK4819 GPIO output pins. The REG_33 output bit is `0x40 >> pin`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GpioPin {
    /// GPIO0 / pin 28, RX front-end enable.
    Gpio0RxEnable = 0,
    /// GPIO1 / pin 29, PA enable.
    Gpio1PaEnable = 1,
    Gpio2 = 2,
    /// GPIO3 / pin 31, UHF LNA select.
    Gpio3UhfLna = 3,
    /// GPIO4 / pin 32, VHF LNA select.
    Gpio4VhfLna = 4,
    Gpio5 = 5,
    Gpio6 = 6,
}

/// Frequency value meaning "front end off" for [`Bk4819::set_rf_filter_path`].
pub const RF_PATH_OFF: u32 = u32::MAX;

/// BK4819 driver.
///
/// Owns the register bus, the board side signals and the delay provider.
/// The GPIO output mirror and the RX-idle flag are per-device state here
/// (the chip's GPIO control register is write-only, so the last written
/// value must be tracked in software); construct one driver per physical
/// chip.
pub struct Bk4819<B, P, D> {
    pub(crate) bus: B,
    pub(crate) pins: P,
    pub(crate) delay: D,
    gpio_out_state: u16,
    rx_idle: bool,
}

impl<B, P, D> Bk4819<B, P, D>
where
    B: Bk4819Bus,
    P: SidePins,
    D: DelayNs,
{
    pub fn new(bus: B, pins: P, delay: D) -> Self {
        Self {
            bus,
            pins,
            delay,
            gpio_out_state: 0,
            rx_idle: false,
        }
    }

    pub fn free(self) -> (B, P, D) {
        (self.bus, self.pins, self.delay)
    }

    /// Read a register through its catalog type.
    pub fn read_reg<R: Register>(&mut self) -> Result<R, B::Error> {
        Ok(R::from(self.bus.read_register(R::ADDRESS)?))
    }

    /// Write a register through its catalog type.
    pub fn write_reg<R: Register>(&mut self, reg: R) -> Result<(), B::Error> {
        self.bus.write_register(R::ADDRESS, reg.into())
    }

    /// Read, transform, write back.
    pub fn modify_reg<R: Register>(
        &mut self,
        f: impl FnOnce(R) -> R,
    ) -> Result<(), B::Error> {
        let reg = self.read_reg::<R>()?;
        self.write_reg(f(reg))
    }

    /// Raw register read for addresses without a catalog type (the AGC gain
    /// table walk) and for diagnostics.
    pub fn read_register(&mut self, address: RegisterAddress) -> Result<u16, B::Error> {
        self.bus.read_register(address)
    }

    /// Raw register write counterpart of [`Self::read_register`].
    pub fn write_register(&mut self, address: RegisterAddress, value: u16) -> Result<(), B::Error> {
        self.bus.write_register(address, value)
    }

    /// Bring the chip out of reset into the calibrated base state.
    pub fn init(&mut self) -> Result<(), B::Error> {
        let mut reset = Reset(0);
        reset.set_soft_reset(true);
        self.write_reg(reset)?;
        self.write_reg(Reset(0))?;

        self.write_reg(PowerProfile::STANDBY)?;
        self.write_reg(PaCtl(0x0022))?;

        self.init_agc(crate::agc::AgcProfile::Alternate)?;

        // MIC AGC on (bit 15 clear) plus its calibrated companion bits.
        self.write_reg(MicAgc(0x1041))?;
        self.write_reg(MicGain::with_gain(0))?;

        let mut af_gain = AfGain(0);
        af_gain.set_undocumented(11);
        af_gain.set_rx_gain1(0);
        af_gain.set_rx_gain2(58);
        af_gain.set_dac_gain(8);
        self.write_reg(af_gain)?;

        self.load_dtmf_coefficients()?;

        self.write_reg(PllCp(0x5454))?;
        self.write_reg(BandSelThreshold::DEFAULT)?;

        self.gpio_out_state = 0x9000;
        self.write_reg(GpioOut(self.gpio_out_state))?;
        self.write_reg(IntMask(0))?;

        Ok(())
    }

    fn load_dtmf_coefficients(&mut self) -> Result<(), B::Error> {
        const DTMF_COEFFS: [u8; 16] = [
            111, 107, 103, 98, 80, 71, 58, 44, 65, 55, 37, 23, 228, 203, 181, 159,
        ];
        for (i, &coefficient) in DTMF_COEFFS.iter().enumerate() {
            let mut entry = DtmfCoeff(0);
            entry.set_index(i as u16);
            entry.set_coefficient(u16::from(coefficient));
            self.write_reg(entry)?;
        }
        Ok(())
    }

    /// Set or clear one chip GPIO output. The control register is
    /// write-only; all other pins are replayed from the mirror.
    pub fn set_gpio_pin(&mut self, pin: GpioPin, set: bool) -> Result<(), B::Error> {
        let bit = 0x40u16 >> (pin as u8);
        if set {
            self.gpio_out_state |= bit;
        } else {
            self.gpio_out_state &= !bit;
        }
        self.write_reg(GpioOut(self.gpio_out_state))
    }

    /// Select the RX front-end filter path for `frequency` (10 Hz units):
    /// VHF LNA below 280 MHz, UHF LNA above, both off at [`RF_PATH_OFF`].
    pub fn set_rf_filter_path(&mut self, frequency: u32) -> Result<(), B::Error> {
        if frequency < 28_000_000 {
            self.set_gpio_pin(GpioPin::Gpio4VhfLna, true)?;
            self.set_gpio_pin(GpioPin::Gpio3UhfLna, false)
        } else if frequency == RF_PATH_OFF {
            self.set_gpio_pin(GpioPin::Gpio4VhfLna, false)?;
            self.set_gpio_pin(GpioPin::Gpio3UhfLna, false)
        } else {
            self.set_gpio_pin(GpioPin::Gpio4VhfLna, false)?;
            self.set_gpio_pin(GpioPin::Gpio3UhfLna, true)
        }
    }

    /// Power up the RX chain. Also used as the second half of the squelch
    /// setup side effect.
    pub fn rx_turn_on(&mut self) -> Result<(), B::Error> {
        self.write_reg(PowerProfile::RX_ON)?;
        self.write_reg(RfBlocks(0))?;

        let mut blocks = RfBlocks(0);
        blocks.set_vco_calibration(true);
        blocks.set_rx_link(0xF);
        blocks.set_af_dac(true);
        blocks.set_disc_mode(true);
        blocks.set_pll_vco(0xF);
        blocks.set_rx_dsp(true);
        self.write_reg(blocks)
    }

    /// Power up the TX chain with the microphone path off.
    pub fn enable_tx_link(&mut self) -> Result<(), B::Error> {
        let mut blocks = RfBlocks(0);
        blocks.set_vco_calibration(true);
        blocks.set_undocumented_14(true);
        blocks.set_af_dac(true);
        blocks.set_disc_mode(true);
        blocks.set_pll_vco(0xF);
        blocks.set_pa_gain(true);
        blocks.set_tx_dsp(true);
        self.write_reg(blocks)
    }

    pub fn enter_tx_mute(&mut self) -> Result<(), B::Error> {
        self.write_reg(TxMute::muted())
    }

    pub fn exit_tx_mute(&mut self) -> Result<(), B::Error> {
        self.write_reg(TxMute::unmuted())
    }

    /// All RF/DSP blocks off.
    pub fn idle(&mut self) -> Result<(), B::Error> {
        self.write_reg(RfBlocks(0))
    }

    /// Alias of [`Self::idle`] matching the power-down call sites.
    pub fn disable(&mut self) -> Result<(), B::Error> {
        self.idle()
    }

    pub fn sleep(&mut self) -> Result<(), B::Error> {
        self.write_reg(RfBlocks(0))?;
        self.write_reg(PowerProfile::SLEEP)
    }

    /// Tear down the tone generator and return to receiving.
    pub fn turn_off_tones_turn_on_rx(&mut self) -> Result<(), B::Error> {
        self.write_reg(crate::regs::ToneCfg(0))?;
        self.set_af(AfType::Mute)?;
        self.exit_tx_mute()?;

        self.write_reg(RfBlocks(0))?;
        let mut blocks = RfBlocks(0);
        blocks.set_vco_calibration(true);
        blocks.set_rx_link(0xF);
        blocks.set_af_dac(true);
        blocks.set_disc_mode(true);
        blocks.set_pll_vco(0xF);
        blocks.set_rx_dsp(true);
        self.write_reg(blocks)
    }

    /// Leave the audio bypass: mute AF and restore the DC filter/AGC word.
    pub fn exit_bypass(&mut self) -> Result<(), B::Error> {
        self.set_af(AfType::Mute)?;
        let mut agc = crate::regs::AgcCtl(0);
        agc.set_fix_index(3);
        agc.set_dc_filter_tx(5);
        agc.set_dc_filter_rx(6);
        self.write_reg(agc)
    }

    pub fn prepare_transmit(&mut self) -> Result<(), B::Error> {
        self.exit_bypass()?;
        self.exit_tx_mute()?;
        self.tx_on_beep()
    }

    /// Power up TX with the beep-capable chain (includes the MIC ADC).
    pub fn tx_on_beep(&mut self) -> Result<(), B::Error> {
        self.write_reg(PowerProfile::STANDBY)?;
        self.write_reg(TailCfg(0x028F))?;
        self.write_reg(RfBlocks(0))?;
        self.write_reg(RfBlocks::TX_ON)
    }

    /// AF DAC + DISC + TX DSP only; used for tone playback without the RF
    /// chain.
    pub fn enable_af_dac_disc_mode_tx_dsp(&mut self) -> Result<(), B::Error> {
        self.write_reg(RfBlocks(0))?;
        self.write_reg(RfBlocks(0x0302))
    }

    /// Mark the radio as sleeping/not listening. [`Self::conditional_rx_turn_on`]
    /// uses this to decide whether RX must be restored.
    pub fn set_rx_idle(&mut self, idle: bool) {
        self.rx_idle = idle;
    }

    pub fn rx_idle(&self) -> bool {
        self.rx_idle
    }

    /// Restore the RX front end if the radio was left idle.
    pub fn conditional_rx_turn_on(&mut self) -> Result<(), B::Error> {
        if self.rx_idle {
            self.set_gpio_pin(GpioPin::Gpio0RxEnable, true)?;
            self.rx_turn_on()?;
        }
        Ok(())
    }
}
