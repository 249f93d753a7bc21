use crate::registers::PortPins;
use crate::{chip_select, Register, RegisterInterface, SpiResult};

/// Sets SCK, SDO and chip-select as outputs and SDI as input, all four
/// digital. Chip-select is latched high before its driver is enabled.
pub fn init<R: RegisterInterface + ?Sized>(regs: &mut R) -> SpiResult<()> {
    chip_select::deselect(regs)?;

    let outputs = PortPins::SCK | PortPins::SDO | PortPins::CHIP_SELECT;
    regs.clear_bits(Register::Trisc, outputs.bits())?;
    regs.set_bits(Register::Trisc, PortPins::SDI.bits())?;

    let digital = outputs | PortPins::SDI;
    regs.write(Register::Anselc, !digital.bits())?;

    tracing::info!("PORT: RC3/RC5/RC6 out, RC4 in, ANSELC={:#04x}", !digital.bits());
    Ok(())
}
