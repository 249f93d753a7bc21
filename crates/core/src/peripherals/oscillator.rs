use super::{unmapped, Peripheral};
use crate::{clock, Register, SpiResult};
use fugit::HertzU32;

/// Oscillator control block.
#[derive(Debug)]
pub struct Oscillator {
    osccon1: u8,
    oscfrq: u8,
}

impl Oscillator {
    // HFINTOSC with a 1:4 divider and FRQ=4 MHz, i.e. 1 MHz out of reset.
    const OSCCON1_RESET: u8 = 0x62;
    const OSCFRQ_RESET: u8 = 0x02;

    pub fn new() -> Self {
        Self {
            osccon1: Self::OSCCON1_RESET,
            oscfrq: Self::OSCFRQ_RESET,
        }
    }

    pub fn system_clock(&self) -> Option<HertzU32> {
        clock::decode(self.osccon1, self.oscfrq)
    }
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new()
    }
}

impl Peripheral for Oscillator {
    fn registers(&self) -> &'static [Register] {
        &[Register::Osccon1, Register::Oscfrq]
    }

    fn peek(&self, reg: Register) -> SpiResult<u8> {
        match reg {
            Register::Osccon1 => Ok(self.osccon1),
            Register::Oscfrq => Ok(self.oscfrq),
            _ => Err(unmapped(reg)),
        }
    }

    fn write(&mut self, reg: Register, value: u8) -> SpiResult<()> {
        match reg {
            Register::Osccon1 => self.osccon1 = value & 0x7F,
            Register::Oscfrq => self.oscfrq = value & 0x0F,
            _ => return Err(unmapped(reg)),
        }
        tracing::debug!("OSC: {} <- {:#04x}", reg, value);
        Ok(())
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}
