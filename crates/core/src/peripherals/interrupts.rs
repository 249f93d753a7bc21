use super::{unmapped, Peripheral};
use crate::registers::Pir3;
use crate::{Register, SpiResult};

/// PIR3 request flags. Hardware sets them; only software clears them.
#[derive(Debug)]
pub struct Interrupts {
    pir3: Pir3,
}

impl Interrupts {
    pub fn new() -> Self {
        Self {
            pir3: Pir3::empty(),
        }
    }

    pub fn raise(&mut self, flags: Pir3) {
        self.pir3 |= flags;
        tracing::debug!("PIR3: raised {:?}", flags);
    }

    pub fn pending(&self) -> Pir3 {
        self.pir3
    }
}

impl Default for Interrupts {
    fn default() -> Self {
        Self::new()
    }
}

impl Peripheral for Interrupts {
    fn registers(&self) -> &'static [Register] {
        &[Register::Pir3]
    }

    fn peek(&self, reg: Register) -> SpiResult<u8> {
        match reg {
            Register::Pir3 => Ok(self.pir3.bits()),
            _ => Err(unmapped(reg)),
        }
    }

    fn write(&mut self, reg: Register, value: u8) -> SpiResult<()> {
        match reg {
            Register::Pir3 => {
                self.pir3 = Pir3::from_bits_retain(value);
                Ok(())
            }
            _ => Err(unmapped(reg)),
        }
    }

    fn reset(&mut self) {
        self.pir3 = Pir3::empty();
    }
}
