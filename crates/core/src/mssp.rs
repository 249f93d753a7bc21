//! MSSP1 in SPI master mode: configuration, clock-mode encoding and the
//! blocking byte exchange.

use crate::registers::{Pir3, Ssp1Con1, Ssp1Stat};
use crate::variant::VariantProfile;
use crate::wait::WaitStrategy;
use crate::{clock, Register, RegisterInterface, SpiResult};
use embedded_hal::spi::{Mode, Phase, Polarity, MODE_0, MODE_1, MODE_2, MODE_3};
use fugit::HertzU32;

/// How the end of a transfer is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionPolicy {
    /// Poll SSP1STAT.BF; reading SSP1BUF clears it.
    SelfClearing,
    /// Poll PIR3.SSP1IF; software must clear it before the next transfer.
    ManualClear,
}

impl CompletionPolicy {
    /// Register and mask of the flag that signals completion.
    pub fn flag(self) -> (Register, u8) {
        match self {
            CompletionPolicy::SelfClearing => (Register::Ssp1stat, Ssp1Stat::BF.bits()),
            CompletionPolicy::ManualClear => (Register::Pir3, Pir3::SSP1IF.bits()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exchange {
    pub received: u8,
    pub polls: u64,
}

/// CKP follows CPOL; CKE is set when data is captured on the first edge.
pub fn encode_mode(mode: Mode) -> (Ssp1Con1, Ssp1Stat) {
    let ckp = match mode.polarity {
        Polarity::IdleLow => Ssp1Con1::empty(),
        Polarity::IdleHigh => Ssp1Con1::CKP,
    };
    let cke = match mode.phase {
        Phase::CaptureOnFirstTransition => Ssp1Stat::CKE,
        Phase::CaptureOnSecondTransition => Ssp1Stat::empty(),
    };
    (ckp, cke)
}

pub fn decode_mode(ssp1con1: u8, ssp1stat: u8) -> Mode {
    let polarity = if ssp1con1 & Ssp1Con1::CKP.bits() != 0 {
        Polarity::IdleHigh
    } else {
        Polarity::IdleLow
    };
    let phase = if ssp1stat & Ssp1Stat::CKE.bits() != 0 {
        Phase::CaptureOnFirstTransition
    } else {
        Phase::CaptureOnSecondTransition
    };
    Mode { polarity, phase }
}

pub fn mode_number(mode: Mode) -> u8 {
    match (mode.polarity, mode.phase) {
        (Polarity::IdleLow, Phase::CaptureOnFirstTransition) => 0,
        (Polarity::IdleLow, Phase::CaptureOnSecondTransition) => 1,
        (Polarity::IdleHigh, Phase::CaptureOnFirstTransition) => 2,
        (Polarity::IdleHigh, Phase::CaptureOnSecondTransition) => 3,
    }
}

pub fn mode_from_number(n: u8) -> Option<Mode> {
    match n {
        0 => Some(MODE_0),
        1 => Some(MODE_1),
        2 => Some(MODE_2),
        3 => Some(MODE_3),
        _ => None,
    }
}

/// True if `mode` samples data on the rising SCK edge.
pub fn samples_on_rising_edge(mode: Mode) -> bool {
    matches!(
        (mode.polarity, mode.phase),
        (Polarity::IdleLow, Phase::CaptureOnFirstTransition)
            | (Polarity::IdleHigh, Phase::CaptureOnSecondTransition)
    )
}

/// SCK = FOSC / (4 * (SSP1ADD + 1)).
pub fn sck_frequency(fosc: HertzU32, ssp1add: u8) -> HertzU32 {
    HertzU32::from_raw(fosc.to_Hz() / (4 * (ssp1add as u32 + 1)))
}

/// Serial clock implied by raw register values, if MSSP1 is an enabled
/// master clocked from SSP1ADD.
pub fn decode_sck(fosc: Option<HertzU32>, ssp1con1: u8, ssp1add: u8) -> Option<HertzU32> {
    let con1 = Ssp1Con1::from_bits_retain(ssp1con1);
    if !con1.contains(Ssp1Con1::SSPEN) || con1.sspm() != Ssp1Con1::SSPM_MASTER_ADD {
        return None;
    }
    fosc.map(|f| sck_frequency(f, ssp1add))
}

pub fn configured_sck<R: RegisterInterface + ?Sized>(regs: &mut R) -> SpiResult<Option<HertzU32>> {
    let fosc = clock::frequency(regs)?;
    let con1 = regs.read(Register::Ssp1con1)?;
    let add = regs.read(Register::Ssp1add)?;
    Ok(decode_sck(fosc, con1, add))
}

/// Programs the baud divisor and clock mode, then enables the module as
/// an SPI master. Every register is overwritten.
pub fn init<R: RegisterInterface + ?Sized>(regs: &mut R, profile: &VariantProfile) -> SpiResult<()> {
    let (ckp, cke) = encode_mode(profile.mode);

    regs.write(Register::Ssp1add, profile.baud_divisor)?;
    regs.write(Register::Ssp1stat, cke.bits())?;

    let con1 = Ssp1Con1::SSPEN.bits() | ckp.bits() | Ssp1Con1::SSPM_MASTER_ADD;
    regs.write(Register::Ssp1con1, con1)?;

    tracing::info!(
        "SPI1: master, mode {}, SSP1ADD={}, SSP1STAT={:#04x}, SSP1CON1={:#04x}",
        mode_number(profile.mode),
        profile.baud_divisor,
        cke.bits(),
        con1
    );
    Ok(())
}

pub fn start_transfer<R: RegisterInterface + ?Sized>(regs: &mut R, data: u8) -> SpiResult<()> {
    regs.write(Register::Ssp1buf, data)
}

pub fn is_complete<R: RegisterInterface + ?Sized>(
    regs: &mut R,
    policy: CompletionPolicy,
) -> SpiResult<bool> {
    let (reg, mask) = policy.flag();
    Ok(regs.read(reg)? & mask != 0)
}

pub fn wait_complete<R, W>(regs: &mut R, wait: &mut W, policy: CompletionPolicy) -> SpiResult<u64>
where
    R: RegisterInterface + ?Sized,
    W: WaitStrategy + ?Sized,
{
    wait.wait_for(&mut || is_complete(&mut *regs, policy))
}

/// Clears the completion flag when the hardware does not do it for us.
pub fn acknowledge<R: RegisterInterface + ?Sized>(
    regs: &mut R,
    policy: CompletionPolicy,
) -> SpiResult<()> {
    match policy {
        CompletionPolicy::SelfClearing => Ok(()),
        CompletionPolicy::ManualClear => regs.clear_bits(Register::Pir3, Pir3::SSP1IF.bits()),
    }
}

pub fn read_buffer<R: RegisterInterface + ?Sized>(regs: &mut R) -> SpiResult<u8> {
    regs.read(Register::Ssp1buf)
}

/// Full-duplex exchange of one byte. Blocks for as long as `wait` lets it.
pub fn exchange_byte<R, W>(
    regs: &mut R,
    wait: &mut W,
    policy: CompletionPolicy,
    data: u8,
) -> SpiResult<Exchange>
where
    R: RegisterInterface + ?Sized,
    W: WaitStrategy + ?Sized,
{
    start_transfer(regs, data)?;
    let polls = wait_complete(regs, wait, policy)?;
    acknowledge(regs, policy)?;
    let received = read_buffer(regs)?;
    tracing::debug!(
        "SPI1: tx={:#04x} rx={:#04x} after {} polls",
        data,
        received,
        polls
    );
    Ok(Exchange { received, polls })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_encoding_round_trip() {
        for n in 0..4 {
            let mode = mode_from_number(n).unwrap();
            let (ckp, cke) = encode_mode(mode);
            let decoded = decode_mode(ckp.bits(), cke.bits());
            assert_eq!(decoded, mode);
            assert_eq!(mode_number(decoded), n);
        }
        assert!(mode_from_number(4).is_none());
    }

    #[test]
    fn test_mssp_mode_bits() {
        // CKP=1, CKE=1 is SPI mode 2; CKP=0, CKE=1 is SPI mode 0.
        assert_eq!(
            mode_number(decode_mode(Ssp1Con1::CKP.bits(), Ssp1Stat::CKE.bits())),
            2
        );
        assert_eq!(mode_number(decode_mode(0, Ssp1Stat::CKE.bits())), 0);
    }

    #[test]
    fn test_sampling_edges() {
        assert!(samples_on_rising_edge(MODE_0));
        assert!(!samples_on_rising_edge(MODE_1));
        assert!(!samples_on_rising_edge(MODE_2));
        assert!(samples_on_rising_edge(MODE_3));
    }

    #[test]
    fn test_sck_frequency() {
        assert_eq!(sck_frequency(HertzU32::MHz(4), 1).to_Hz(), 500_000);
        assert_eq!(sck_frequency(HertzU32::MHz(64), 1).to_Hz(), 8_000_000);
        assert_eq!(sck_frequency(HertzU32::MHz(64), 0).to_Hz(), 16_000_000);
    }

    #[test]
    fn test_decode_sck_requires_enabled_master() {
        let fosc = Some(HertzU32::MHz(4));
        assert_eq!(decode_sck(fosc, 0x3A, 1), Some(HertzU32::kHz(500)));
        assert_eq!(decode_sck(fosc, 0x1A, 1), None);
        assert_eq!(decode_sck(fosc, 0x20, 1), None);
        assert_eq!(decode_sck(None, 0x3A, 1), None);
    }
}
