pub mod device;
pub mod interrupts;
pub mod mssp;
pub mod oscillator;
pub mod port;
pub mod pps;
pub mod trace;

use crate::{Register, SpiError, SpiResult};

/// Register-level model of one on-chip block.
pub trait Peripheral: std::fmt::Debug + Send {
    /// Registers this block decodes.
    fn registers(&self) -> &'static [Register];

    /// Current value without hardware side effects.
    fn peek(&self, reg: Register) -> SpiResult<u8>;

    fn read(&mut self, reg: Register) -> SpiResult<u8> {
        self.peek(reg)
    }

    fn write(&mut self, reg: Register, value: u8) -> SpiResult<()>;

    fn reset(&mut self);

    fn owns(&self, reg: Register) -> bool {
        self.registers().contains(&reg)
    }
}

pub(crate) fn unmapped(reg: Register) -> SpiError {
    SpiError::UnmappedRegister(reg.address())
}
