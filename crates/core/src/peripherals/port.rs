use super::{unmapped, Peripheral};
use crate::registers::PortPins;
use crate::{Register, SpiResult};

/// Port C: direction, analog select and output latch.
#[derive(Debug)]
pub struct PortC {
    tris: u8,
    ansel: u8,
    latch: u8,
    /// Levels driven onto the pins from outside the chip.
    external: u8,
}

impl PortC {
    pub fn new() -> Self {
        Self {
            tris: 0xFF,
            ansel: 0xFF,
            latch: 0x00,
            external: 0x00,
        }
    }

    pub fn is_output(&self, pin: PortPins) -> bool {
        self.tris & pin.bits() == 0
    }

    pub fn is_digital(&self, pin: PortPins) -> bool {
        self.ansel & pin.bits() == 0
    }

    /// Level on each pin as read back through PORTC. Analog pins read 0.
    pub fn pin_levels(&self) -> u8 {
        let levels = (self.latch & !self.tris) | (self.external & self.tris);
        levels & !self.ansel
    }

    /// Pins currently driven by the output latch, with their levels.
    pub fn driven(&self) -> (PortPins, PortPins) {
        let outputs = PortPins::from_bits_retain(!self.tris);
        let levels = PortPins::from_bits_retain(self.latch) & outputs;
        (outputs, levels)
    }

    pub fn drive_external(&mut self, pins: PortPins, high: bool) {
        if high {
            self.external |= pins.bits();
        } else {
            self.external &= !pins.bits();
        }
    }
}

impl Default for PortC {
    fn default() -> Self {
        Self::new()
    }
}

impl Peripheral for PortC {
    fn registers(&self) -> &'static [Register] {
        &[Register::Trisc, Register::Anselc, Register::Portc]
    }

    fn peek(&self, reg: Register) -> SpiResult<u8> {
        match reg {
            Register::Trisc => Ok(self.tris),
            Register::Anselc => Ok(self.ansel),
            Register::Portc => Ok(self.pin_levels()),
            _ => Err(unmapped(reg)),
        }
    }

    fn write(&mut self, reg: Register, value: u8) -> SpiResult<()> {
        match reg {
            Register::Trisc => self.tris = value,
            Register::Anselc => self.ansel = value,
            // Writes to PORTC land in the latch
            Register::Portc => self.latch = value,
            _ => return Err(unmapped(reg)),
        }
        tracing::debug!("PORTC: {} <- {:#04x}", reg, value);
        Ok(())
    }

    fn reset(&mut self) {
        let external = self.external;
        *self = Self::new();
        self.external = external;
    }
}
