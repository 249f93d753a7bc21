use crate::registers::PortPins;
use crate::{Register, RegisterInterface, SpiResult};

/// Drives RC6 low.
pub fn select<R: RegisterInterface + ?Sized>(regs: &mut R) -> SpiResult<()> {
    regs.clear_bits(Register::Portc, PortPins::CHIP_SELECT.bits())
}

/// Drives RC6 high.
pub fn deselect<R: RegisterInterface + ?Sized>(regs: &mut R) -> SpiResult<()> {
    regs.set_bits(Register::Portc, PortPins::CHIP_SELECT.bits())
}
