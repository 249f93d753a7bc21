use crate::registers::{HfFrequency, Osccon1};
use crate::{Register, RegisterInterface, SpiResult};
use fugit::HertzU32;

/// Selects HFINTOSC (1:1 divider) as system clock and sets its frequency.
pub fn init<R: RegisterInterface + ?Sized>(regs: &mut R, frequency: HfFrequency) -> SpiResult<()> {
    regs.write(Register::Osccon1, Osccon1::HFINTOSC.bits())?;
    regs.write(Register::Oscfrq, frequency.code())?;
    tracing::info!("CLK: HFINTOSC at {} MHz", frequency.hertz().to_MHz());
    Ok(())
}

/// System clock implied by OSCCON1/OSCFRQ. `None` if HFINTOSC is not the
/// selected source or OSCFRQ holds a reserved code.
pub fn decode(osccon1: u8, oscfrq: u8) -> Option<HertzU32> {
    if osccon1 & Osccon1::NOSC_MASK != Osccon1::HFINTOSC.bits() & Osccon1::NOSC_MASK {
        return None;
    }
    // NDIV: 0 -> 1:1, 1 -> 1:2 ... 9 -> 1:512
    let ndiv = osccon1 & Osccon1::NDIV_MASK;
    if ndiv > 9 {
        return None;
    }
    HfFrequency::from_code(oscfrq & 0x0F)
        .map(|f| HertzU32::from_raw(f.hertz().to_Hz() >> ndiv))
}

pub fn frequency<R: RegisterInterface + ?Sized>(regs: &mut R) -> SpiResult<Option<HertzU32>> {
    let osccon1 = regs.read(Register::Osccon1)?;
    let oscfrq = regs.read(Register::Oscfrq)?;
    Ok(decode(osccon1, oscfrq))
}
