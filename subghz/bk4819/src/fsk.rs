//! FSK/MSK packet modem.
//!
//! The chip frames `[1-16 B preamble][2|4 B sync][1-1024 words payload]
//! [0|2 B CRC]` through a 128-word TX FIFO and an 8-word RX FIFO, raising
//! level-triggered threshold interrupts. A payload can be eight times the
//! FIFO size, so transmission runs a chunked refill loop against the
//! almost-empty event; reception only arms the hardware and leaves FIFO
//! draining to the caller via [`Bk4819::fsk_check_interrupt`].

use embedded_hal::delay::DelayNs;

use crate::audio::AfType;
use crate::driver::Bk4819;
use crate::poll::{self, Poll};
use crate::regs::{
    FifoThresholds, FskCrc, FskCtl, FskDataLength, FskFifo, FskModeCtl, FskSync01, FskSync23,
    IntFlags, IntMask, IntRequest, Register, Tone2Freq, ToneCfg, FSK_CRC_UNDOCUMENTED,
};
use crate::tone::tone_frequency_word;
use crate::traits::{Bk4819Bus, PostIdEncoder, SidePins};

/// TX FIFO capacity in 16-bit words.
pub const TX_FIFO_WORDS: usize = 128;
/// RX FIFO capacity in 16-bit words.
pub const RX_FIFO_WORDS: usize = 8;
/// Largest payload the chip can frame, in words.
pub const MAX_PACKET_WORDS: usize = 1024;
/// Largest payload in bytes.
pub const MAX_PACKET_BYTES: usize = MAX_PACKET_WORDS * 2;

/// TX FIFO low watermark; the almost-empty event fires when the FIFO
/// drains to this level.
const TX_FIFO_LOW_WATER_WORDS: usize = 64;
/// Words loaded per refill once the FIFO has drained to the watermark.
const TX_REFILL_CHUNK_WORDS: usize = TX_FIFO_WORDS - TX_FIFO_LOW_WATER_WORDS;

const REFILL_POLL_INTERVAL_MS: u32 = 2;
const REFILL_POLL_BUDGET_MS: u32 = 100;
const TX_DONE_POLL_INTERVAL_MS: u32 = 1;
const TX_DONE_POLL_BUDGET_MS: u32 = 300;
const POST_ID_POLL_INTERVAL_MS: u32 = 5;
const POST_ID_POLL_BUDGET_MS: u32 = 350;
/// The fixed-format keep-alive packet never exceeds this size.
const POST_ID_MAX_BYTES: usize = 40;

/// Modulation variant: bit rate plus tone pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FskModulation {
    /// Direct FM FSK at 1200 bit/s.
    Fsk1200,
    /// Direct FM FSK at 2400 bit/s.
    Fsk2400,
    /// FFSK 1200/1800 Hz tones, 1200 bit/s.
    Msk1200_1800,
    /// FFSK 1200/2400 Hz tones, 2400 bit/s.
    Msk1200_2400,
}

impl FskModulation {
    fn baud_tone_hz(self) -> u16 {
        match self {
            FskModulation::Fsk1200 | FskModulation::Msk1200_1800 => 1200,
            FskModulation::Fsk2400 | FskModulation::Msk1200_2400 => 2400,
        }
    }
}

/// Sync word length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncLength {
    TwoBytes,
    FourBytes,
}

/// Transfer direction a mode is applied for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FskDirection {
    Tx,
    Rx,
}

/// Packet modem configuration.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FskMode {
    pub modulation: FskModulation,
    /// FSK waveform amplitude, 0..=127; 127 gives the cleanest waveform.
    pub tone2_gain: u8,
    pub sync_length: SyncLength,
    /// Preamble length in bytes, 1..=16.
    pub preamble_bytes: u8,
    pub scramble: bool,
    pub crc: bool,
    /// Invert the data polarity for the configured direction.
    pub invert_data: bool,
}

/// Classified interrupt cause, in fixed priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FskIrq {
    TxFinished,
    FifoAlmostEmpty,
    RxFinished,
    FifoAlmostFull,
    RxSync,
    /// Nothing pending, or no recognized bit set.
    Other,
}

/// FSK engine error. Everything except the payload-size checks is absorbed
/// by timeouts; the bus error parameter exists for fallible transports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FskError<E> {
    /// Zero-length payloads are rejected before any chip access.
    PacketEmpty,
    /// Payload exceeds [`MAX_PACKET_BYTES`]; rejected before any chip
    /// access.
    PacketTooLong,
    Bus(E),
}

impl<B, P, D> Bk4819<B, P, D>
where
    B: Bk4819Bus,
    P: SidePins,
    D: DelayNs,
{
    /// Configure the packet modem for one direction.
    pub fn fsk_enter_mode(
        &mut self,
        direction: FskDirection,
        mode: &FskMode,
    ) -> Result<(), B::Error> {
        // The FSK waveform rides on tone 2.
        let mut tones = ToneCfg(0);
        tones.set_tone2_enable(true);
        tones.set_tone2_gain(u16::from(mode.tone2_gain & 0x7F));
        self.write_reg(tones)?;

        self.write_reg(Tone2Freq(tone_frequency_word(mode.modulation.baud_tone_hz())))?;

        let mut modem = FskModeCtl(0);
        modem.set_enable(true);
        modem.set_rx_gain(2);
        modem.set_undocumented(3);
        match (mode.modulation, direction) {
            (FskModulation::Fsk1200, FskDirection::Rx) => {
                modem.set_rx_mode(0);
                modem.set_rx_bandwidth(0);
            }
            (FskModulation::Fsk2400, FskDirection::Rx) => {
                modem.set_rx_mode(0);
                modem.set_rx_bandwidth(4);
            }
            (FskModulation::Msk1200_1800, FskDirection::Rx) => {
                modem.set_rx_mode(7);
                modem.set_rx_bandwidth(1);
            }
            (FskModulation::Msk1200_2400, FskDirection::Rx) => {
                modem.set_rx_mode(4);
                modem.set_rx_bandwidth(4);
            }
            (FskModulation::Fsk1200, FskDirection::Tx)
            | (FskModulation::Fsk2400, FskDirection::Tx) => modem.set_tx_mode(0),
            (FskModulation::Msk1200_1800, FskDirection::Tx) => modem.set_tx_mode(1),
            (FskModulation::Msk1200_2400, FskDirection::Tx) => modem.set_tx_mode(3),
        }
        self.write_reg(modem)?;

        let framing = Self::framing(mode, direction);
        let mut flush = framing;
        flush.set_clear_tx_fifo(true);
        self.write_reg(flush)?;
        self.write_reg(framing)?;

        let mut crc = FskCrc(FSK_CRC_UNDOCUMENTED);
        crc.set_crc_enable(mode.crc);
        self.write_reg(crc)
    }

    fn framing(mode: &FskMode, direction: FskDirection) -> FskCtl {
        let mut ctl = FskCtl(0);
        ctl.set_scramble(mode.scramble);
        ctl.set_preamble_length(u16::from(mode.preamble_bytes.clamp(1, 16) - 1));
        ctl.set_sync_length_4(mode.sync_length == SyncLength::FourBytes);
        if mode.invert_data {
            match direction {
                FskDirection::Rx => ctl.set_invert_rx(true),
                FskDirection::Tx => ctl.set_invert_tx(true),
            }
        }
        ctl
    }

    /// Shut the packet modem down.
    pub fn fsk_exit_mode(&mut self) -> Result<(), B::Error> {
        self.write_reg(ToneCfg(0))?;
        self.write_reg(FskModeCtl(0))
    }

    /// Stop any transfer in flight: mask the FSK interrupt sources and
    /// clear the TX/RX enables, leaving the framing configuration intact.
    pub fn fsk_idle(&mut self) -> Result<(), B::Error> {
        self.modify_reg(|mut mask: IntMask| {
            mask.set_fsk_tx_finished(false);
            mask.set_fsk_fifo_almost_empty(false);
            mask.set_fsk_rx_finished(false);
            mask.set_fsk_fifo_almost_full(false);
            mask.set_fsk_rx_sync(false);
            mask
        })?;
        self.modify_reg(|mut ctl: FskCtl| {
            ctl.set_tx_enable(false);
            ctl.set_rx_enable(false);
            ctl.set_clear_tx_fifo(false);
            ctl
        })
    }

    /// Reset the FSK state to the power-on framing and stop the RF blocks.
    pub fn fsk_reset(&mut self) -> Result<(), B::Error> {
        self.write_reg(IntMask(0))?;

        let mut framing = FskCtl(0);
        framing.set_preamble_length(6);
        framing.set_sync_length_4(true);
        self.write_reg(framing)?;

        self.idle()
    }

    /// Read and classify the pending interrupt. Exactly one cause is
    /// reported per call, highest priority first.
    pub fn fsk_check_interrupt(&mut self) -> Result<FskIrq, B::Error> {
        Self::classify_irq(&mut self.bus)
    }

    fn classify_irq(bus: &mut B) -> Result<FskIrq, B::Error> {
        let request = IntRequest::from(bus.read_register(IntRequest::ADDRESS)?);
        if !request.interrupt_request() {
            return Ok(FskIrq::Other);
        }

        // Latch and fetch the cause bits.
        bus.write_register(IntFlags::ADDRESS, 0)?;
        let flags = IntFlags::from(bus.read_register(IntFlags::ADDRESS)?);

        let irq = if flags.fsk_tx_finished() {
            FskIrq::TxFinished
        } else if flags.fsk_fifo_almost_empty() {
            FskIrq::FifoAlmostEmpty
        } else if flags.fsk_rx_finished() {
            FskIrq::RxFinished
        } else if flags.fsk_fifo_almost_full() {
            FskIrq::FifoAlmostFull
        } else if flags.fsk_rx_sync() {
            FskIrq::RxSync
        } else {
            FskIrq::Other
        };

        #[cfg(feature = "defmt")]
        defmt::trace!("fsk irq {}", irq);

        Ok(irq)
    }

    fn payload_words(len: usize) -> Result<usize, FskError<B::Error>> {
        if len == 0 {
            return Err(FskError::PacketEmpty);
        }
        if len > MAX_PACKET_BYTES {
            return Err(FskError::PacketTooLong);
        }
        Ok(len.div_ceil(2))
    }

    /// Transmit one packet through the TX FIFO.
    ///
    /// The modem must already be configured for TX via
    /// [`Self::fsk_enter_mode`] and the RF chain powered. Returns the
    /// number of words loaded. A missing finished event degrades to a
    /// bounded wait followed by a forced TX stop, never an error.
    pub fn fsk_transmit(&mut self, payload: &[u8]) -> Result<usize, FskError<B::Error>> {
        let words = Self::payload_words(payload.len())?;
        self.fsk_transmit_frames(payload, words).map_err(FskError::Bus)
    }

    fn fsk_transmit_frames(&mut self, payload: &[u8], words: usize) -> Result<usize, B::Error> {
        self.write_reg(FskDataLength::for_payload(words))?;

        let mut thresholds = self.read_reg::<FifoThresholds>()?;
        thresholds.set_tx_threshold(TX_FIFO_LOW_WATER_WORDS as u16);
        self.write_reg(thresholds)?;

        // The almost-full event does not fire in TX; finished and
        // almost-empty are the only usable sources.
        let mut mask = IntMask(0);
        mask.set_fsk_tx_finished(true);
        mask.set_fsk_fifo_almost_empty(true);
        self.write_reg(mask)?;

        let framing = self.read_reg::<FskCtl>()?;
        let mut enabled = framing;
        enabled.set_tx_enable(true);
        let mut flush = enabled;
        flush.set_clear_tx_fifo(true);
        self.write_reg(flush)?;
        self.write_reg(enabled)?;

        self.pins.set_lamp();

        let mut refills = 0usize;
        let mut finished = false;
        let mut written = 0usize;

        for (index, pair) in payload.chunks(2).enumerate() {
            if index == TX_FIFO_WORDS + refills * TX_REFILL_CHUNK_WORDS {
                // The FIFO holds everything loaded so far; wait for it to
                // drain to the watermark, or for a short packet to finish
                // before a refill was ever needed. On timeout, proceed
                // best-effort.
                let Self { bus, delay, .. } = self;
                let outcome =
                    poll::poll(delay, REFILL_POLL_INTERVAL_MS, REFILL_POLL_BUDGET_MS, || {
                        Ok(match Self::classify_irq(bus)? {
                            FskIrq::TxFinished => Some(true),
                            FskIrq::FifoAlmostEmpty => Some(false),
                            _ => None,
                        })
                    })?;
                finished = matches!(outcome, Poll::Signaled(true));
                refills += 1;

                #[cfg(feature = "defmt")]
                defmt::trace!("fsk tx refill {} at word {}", refills, index);
            }
            if finished {
                break;
            }

            let word = u16::from_le_bytes([pair[0], pair.get(1).copied().unwrap_or(0)]);
            self.write_reg(FskFifo(word))?;
            self.delay.delay_us(100);
            written = index + 1;
        }

        self.pins.clear_lamp();

        if !finished {
            let Self { bus, delay, .. } = self;
            poll::poll(delay, TX_DONE_POLL_INTERVAL_MS, TX_DONE_POLL_BUDGET_MS, || {
                Ok(matches!(Self::classify_irq(bus)?, FskIrq::TxFinished).then_some(()))
            })?;
        }

        // Force-clear the TX state whether or not the finished interrupt
        // arrived.
        let mut flush = framing;
        flush.set_clear_tx_fifo(true);
        self.write_reg(flush)?;
        self.write_reg(framing)?;

        Ok(written)
    }

    /// Arm packet reception for an expected payload of `packet_len_bytes`.
    ///
    /// Resets the FSK state, programs the length, powers RX up and enables
    /// the sync/finished/almost-full interrupt sources. Draining the RX
    /// FIFO is the caller's job, driven by [`Self::fsk_check_interrupt`].
    pub fn fsk_start_receive(&mut self, packet_len_bytes: usize) -> Result<(), FskError<B::Error>> {
        let words = Self::payload_words(packet_len_bytes)?;
        self.fsk_arm_receive(words).map_err(FskError::Bus)
    }

    fn fsk_arm_receive(&mut self, words: usize) -> Result<(), B::Error> {
        self.fsk_reset()?;
        self.write_register(IntFlags::ADDRESS, 0)?;

        self.write_reg(FskDataLength::for_payload(words))?;
        self.rx_turn_on()?;

        let mut mask = IntMask(0);
        mask.set_fsk_rx_sync(true);
        mask.set_fsk_rx_finished(true);
        mask.set_fsk_fifo_almost_full(true);
        self.write_reg(mask)?;

        // RX preamble requirement slightly shorter than the TX side sends.
        let mut framing = FskCtl(0);
        framing.set_preamble_length(4);
        framing.set_sync_length_4(true);

        let mut flush = framing;
        flush.set_clear_rx_fifo(true);
        self.write_reg(flush)?;

        let mut enabled = framing;
        enabled.set_scramble(true);
        enabled.set_rx_enable(true);
        self.write_reg(enabled)
    }

    /// Drain one word from the RX FIFO.
    pub fn fsk_read_fifo(&mut self) -> Result<u16, B::Error> {
        Ok(self.read_reg::<FskFifo>()?.word())
    }

    /// Build and send the fixed-format keep-alive (post-ID) packet.
    ///
    /// The packet always fits in one FIFO load, so there is no refill
    /// loop; a hard 350 ms budget bounds the wait for the finished event,
    /// after which TX is disabled unconditionally.
    pub fn send_post_id<E: PostIdEncoder>(
        &mut self,
        encoder: &E,
        op: u8,
        arg: u8,
        unit_id: u16,
    ) -> Result<(), B::Error> {
        let mut packet = [0u8; POST_ID_MAX_BYTES];
        let size = encoder
            .encode(op, arg, unit_id, &mut packet)
            .min(POST_ID_MAX_BYTES)
            .max(1);
        let words = size.div_ceil(2);

        self.set_af(AfType::Mute)?;
        self.enable_tx_link()?;
        self.delay.delay_ms(10);

        // FFSK 1200/1800 both ways, 1200 bit/s.
        let mut modem = FskModeCtl(0);
        modem.set_tx_mode(1);
        modem.set_rx_mode(7);
        modem.set_rx_bandwidth(1);
        modem.set_enable(true);
        self.write_reg(modem)?;

        self.write_reg(Tone2Freq(tone_frequency_word(1200)))?;

        let mut tones = ToneCfg(0);
        tones.set_tone2_enable(true);
        tones.set_tone2_gain(127);
        self.write_reg(tones)?;

        // Minimal framing: shortest preamble, 2 sync bytes, no scramble.
        let framing = FskCtl(0);
        self.write_reg(FskDataLength::for_payload(words))?;

        let mut flush = framing;
        flush.set_clear_tx_fifo(true);
        self.write_reg(flush)?;
        self.write_reg(framing)?;

        self.write_reg(FskSync01(0))?;
        self.write_reg(FskSync23(0))?;
        self.write_reg(FskCrc(0))?;

        for pair in packet[..size].chunks(2) {
            let word = u16::from_le_bytes([pair[0], pair.get(1).copied().unwrap_or(0)]);
            self.write_reg(FskFifo(word))?;
        }

        let mut mask = IntMask(0);
        mask.set_fsk_tx_finished(true);
        self.write_reg(mask)?;

        let mut enabled = framing;
        enabled.set_tx_enable(true);
        self.write_reg(enabled)?;

        {
            let Self { bus, delay, .. } = self;
            // Packet time is 173..266 ms depending on content; anything
            // beyond the budget means the TX is wedged and gets stopped.
            poll::poll(delay, POST_ID_POLL_INTERVAL_MS, POST_ID_POLL_BUDGET_MS, || {
                Ok(matches!(Self::classify_irq(bus)?, FskIrq::TxFinished).then_some(()))
            })?;
        }

        self.write_reg(framing)?;
        self.write_reg(IntMask(0))?;
        self.write_reg(ToneCfg(0))?;
        self.write_reg(FskModeCtl(0))
    }

    /// Send the fixed 7-word roger packet through the same FIFO path.
    pub fn play_roger_packet(&mut self) -> Result<(), B::Error> {
        // Calibrated roger frame and modem words. Empirically
        // reverse-engineered, do not derive.
        const ROGER_FRAME: [u16; 7] = [0xF1A2, 0x7446, 0x61A4, 0x6544, 0x4E8A, 0xE044, 0xEA84];

        self.set_af(AfType::Mute)?;
        self.write_reg(FskModeCtl(0x37C3))?;
        self.write_reg(Tone2Freq(0x3065))?;
        self.write_reg(ToneCfg(0x00E0))?;
        self.write_reg(FskDataLength::for_payload(ROGER_FRAME.len()))?;

        let mut framing = FskCtl(0);
        framing.set_preamble_length(6);
        framing.set_sync_length_4(true);

        let mut flush = framing;
        flush.set_clear_tx_fifo(true);
        self.write_reg(flush)?;
        self.write_reg(framing)?;

        self.write_reg(FskSync01(0x5555))?;
        self.write_reg(FskSync23(0x55AA))?;
        self.write_reg(FskCrc(0xAA30))?;

        for word in ROGER_FRAME {
            self.write_reg(FskFifo(word))?;
        }
        self.delay.delay_ms(20);

        let mut enabled = framing;
        enabled.set_tx_enable(true);
        self.write_reg(enabled)?;
        self.delay.delay_ms(180);

        self.write_reg(framing)?;
        self.write_reg(ToneCfg(0))?;
        self.write_reg(FskModeCtl(0))
    }
}
