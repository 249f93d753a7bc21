use super::{unmapped, Peripheral};
use crate::registers::{pps_in, pps_out, PortPins};
use crate::{Register, SpiResult};

/// Peripheral pin select: the slice of the routing table MSSP1 uses.
#[derive(Debug)]
pub struct Pps {
    rc3pps: u8,
    rc5pps: u8,
    ssp1datpps: u8,
}

impl Pps {
    pub fn new() -> Self {
        Self {
            rc3pps: pps_out::NONE,
            rc5pps: pps_out::NONE,
            // SDI1 defaults to RC3 on this part
            ssp1datpps: pps_in::RC3,
        }
    }

    pub fn sck_routed(&self) -> bool {
        self.rc3pps == pps_out::SCK1
    }

    pub fn sdo_routed(&self) -> bool {
        self.rc5pps == pps_out::SDO1
    }

    pub fn sdi_routed(&self) -> bool {
        self.ssp1datpps == pps_in::RC4
    }

    /// Pins whose output driver is taken over by a peripheral.
    pub fn overridden_pins(&self) -> PortPins {
        let mut pins = PortPins::empty();
        if self.rc3pps != pps_out::NONE {
            pins |= PortPins::RC3;
        }
        if self.rc5pps != pps_out::NONE {
            pins |= PortPins::RC5;
        }
        pins
    }
}

impl Default for Pps {
    fn default() -> Self {
        Self::new()
    }
}

impl Peripheral for Pps {
    fn registers(&self) -> &'static [Register] {
        &[Register::Rc3pps, Register::Rc5pps, Register::Ssp1datpps]
    }

    fn peek(&self, reg: Register) -> SpiResult<u8> {
        match reg {
            Register::Rc3pps => Ok(self.rc3pps),
            Register::Rc5pps => Ok(self.rc5pps),
            Register::Ssp1datpps => Ok(self.ssp1datpps),
            _ => Err(unmapped(reg)),
        }
    }

    fn write(&mut self, reg: Register, value: u8) -> SpiResult<()> {
        match reg {
            Register::Rc3pps => self.rc3pps = value & 0x1F,
            Register::Rc5pps => self.rc5pps = value & 0x1F,
            Register::Ssp1datpps => self.ssp1datpps = value & 0x1F,
            _ => return Err(unmapped(reg)),
        }
        tracing::debug!("PPS: {} <- {:#04x}", reg, value);
        Ok(())
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}
