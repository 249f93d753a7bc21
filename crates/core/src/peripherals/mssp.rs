use super::{unmapped, Peripheral};
use crate::mssp::decode_mode;
use crate::registers::{Ssp1Con1, Ssp1Stat};
use crate::{Register, SpiResult};
use embedded_hal::spi::Mode;

#[derive(Debug, Clone, Copy)]
struct Shift {
    tx: u8,
    rx: u8,
    bits: u8,
}

/// MSSP1 in SPI mode. A transfer moves one bit per [`Mssp::clock_bit`],
/// MSB first.
#[derive(Debug)]
pub struct Mssp {
    ssp1add: u8,
    ssp1stat: Ssp1Stat,
    ssp1con1: Ssp1Con1,
    buffer: u8,
    shift: Option<Shift>,
}

impl Mssp {
    pub fn new() -> Self {
        Self {
            ssp1add: 0,
            ssp1stat: Ssp1Stat::empty(),
            ssp1con1: Ssp1Con1::empty(),
            buffer: 0,
            shift: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.ssp1con1.contains(Ssp1Con1::SSPEN)
    }

    /// SSPM 0000..0011 and 1010 are the SPI master encodings.
    pub fn is_master(&self) -> bool {
        matches!(self.ssp1con1.sspm(), 0b0000..=0b0011 | Ssp1Con1::SSPM_MASTER_ADD)
    }

    pub fn is_busy(&self) -> bool {
        self.shift.is_some()
    }

    pub fn mode(&self) -> Mode {
        decode_mode(self.ssp1con1.bits(), self.ssp1stat.bits())
    }

    /// Bit currently presented on SDO.
    pub fn mosi_bit(&self) -> Option<bool> {
        self.shift.map(|s| s.tx & 0x80 != 0)
    }

    /// Clocks one bit in from SDI. Returns the received byte once the
    /// eighth bit has been shifted.
    pub fn clock_bit(&mut self, miso: bool) -> Option<u8> {
        let shift = self.shift.as_mut()?;
        shift.tx <<= 1;
        shift.rx = (shift.rx << 1) | miso as u8;
        shift.bits += 1;
        if shift.bits < 8 {
            return None;
        }

        let rx = shift.rx;
        self.shift = None;
        self.buffer = rx;
        self.ssp1stat |= Ssp1Stat::BF;
        tracing::debug!("MSSP: transfer complete, SSP1BUF={:#04x}", rx);
        Some(rx)
    }
}

impl Default for Mssp {
    fn default() -> Self {
        Self::new()
    }
}

impl Peripheral for Mssp {
    fn registers(&self) -> &'static [Register] {
        &[
            Register::Ssp1add,
            Register::Ssp1stat,
            Register::Ssp1con1,
            Register::Ssp1buf,
        ]
    }

    fn peek(&self, reg: Register) -> SpiResult<u8> {
        match reg {
            Register::Ssp1add => Ok(self.ssp1add),
            Register::Ssp1stat => Ok(self.ssp1stat.bits()),
            Register::Ssp1con1 => Ok(self.ssp1con1.bits()),
            Register::Ssp1buf => Ok(self.buffer),
            _ => Err(unmapped(reg)),
        }
    }

    fn read(&mut self, reg: Register) -> SpiResult<u8> {
        let value = self.peek(reg)?;
        if reg == Register::Ssp1buf {
            self.ssp1stat.remove(Ssp1Stat::BF);
        }
        Ok(value)
    }

    fn write(&mut self, reg: Register, value: u8) -> SpiResult<()> {
        match reg {
            Register::Ssp1add => self.ssp1add = value,
            Register::Ssp1stat => {
                // BF is read-only
                let writable = Ssp1Stat::SMP | Ssp1Stat::CKE;
                self.ssp1stat = (Ssp1Stat::from_bits_truncate(value) & writable)
                    | (self.ssp1stat & Ssp1Stat::BF);
            }
            Register::Ssp1con1 => {
                self.ssp1con1 = Ssp1Con1::from_bits_retain(value);
                if !self.is_enabled() && self.shift.take().is_some() {
                    tracing::debug!("MSSP: disabled mid-transfer");
                }
            }
            Register::Ssp1buf => {
                if !self.is_enabled() || !self.is_master() {
                    tracing::debug!("MSSP: SSP1BUF write ignored, module not an enabled master");
                } else if self.is_busy() {
                    self.ssp1con1 |= Ssp1Con1::WCOL;
                    tracing::debug!("MSSP: write collision");
                } else {
                    self.shift = Some(Shift {
                        tx: value,
                        rx: 0,
                        bits: 0,
                    });
                }
            }
            _ => return Err(unmapped(reg)),
        }
        Ok(())
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_master() -> Mssp {
        let mut mssp = Mssp::new();
        mssp.write(Register::Ssp1con1, 0x2A).unwrap();
        mssp
    }

    #[test]
    fn test_shift_msb_first() {
        let mut mssp = enabled_master();
        mssp.write(Register::Ssp1buf, 0b1000_0001).unwrap();
        assert_eq!(mssp.mosi_bit(), Some(true));
        assert_eq!(mssp.clock_bit(false), None);
        assert_eq!(mssp.mosi_bit(), Some(false));
        for _ in 0..6 {
            assert_eq!(mssp.clock_bit(true), None);
        }
        assert_eq!(mssp.clock_bit(false), Some(0b0111_1110));
        assert!(!mssp.is_busy());
    }

    #[test]
    fn test_buffer_read_clears_bf() {
        let mut mssp = enabled_master();
        mssp.write(Register::Ssp1buf, 0xA5).unwrap();
        for _ in 0..8 {
            mssp.clock_bit(true);
        }
        assert_eq!(mssp.peek(Register::Ssp1stat).unwrap() & 0x01, 0x01);
        assert_eq!(mssp.read(Register::Ssp1buf).unwrap(), 0xFF);
        assert_eq!(mssp.peek(Register::Ssp1stat).unwrap() & 0x01, 0x00);
    }

    #[test]
    fn test_write_collision() {
        let mut mssp = enabled_master();
        mssp.write(Register::Ssp1buf, 0x01).unwrap();
        mssp.write(Register::Ssp1buf, 0x02).unwrap();
        assert_ne!(mssp.peek(Register::Ssp1con1).unwrap() & Ssp1Con1::WCOL.bits(), 0);
    }

    #[test]
    fn test_disabled_ignores_buffer_write() {
        let mut mssp = Mssp::new();
        mssp.write(Register::Ssp1buf, 0x01).unwrap();
        assert!(!mssp.is_busy());
        assert_eq!(mssp.clock_bit(true), None);
    }

    #[test]
    fn test_bf_not_writable() {
        let mut mssp = Mssp::new();
        mssp.write(Register::Ssp1stat, 0xFF).unwrap();
        assert_eq!(mssp.peek(Register::Ssp1stat).unwrap(), 0xC0);
    }
}
