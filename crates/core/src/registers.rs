//! Register map and bit fields of the PIC18F47Q10 blocks this firmware
//! touches: oscillator, peripheral pin select, port C, MSSP1 and PIR3.

use crate::{RegisterInterface, SpiError, SpiResult};
use bitflags::bitflags;
use fugit::HertzU32;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Register {
    Osccon1,
    Oscfrq,
    Rc3pps,
    Rc5pps,
    Ssp1datpps,
    Trisc,
    Anselc,
    Portc,
    Ssp1add,
    Ssp1stat,
    Ssp1con1,
    Ssp1buf,
    Pir3,
}

impl Register {
    pub const ALL: [Register; 13] = [
        Register::Osccon1,
        Register::Oscfrq,
        Register::Rc3pps,
        Register::Rc5pps,
        Register::Ssp1datpps,
        Register::Trisc,
        Register::Anselc,
        Register::Portc,
        Register::Ssp1add,
        Register::Ssp1stat,
        Register::Ssp1con1,
        Register::Ssp1buf,
        Register::Pir3,
    ];

    /// Data memory address.
    pub const fn address(self) -> u16 {
        match self {
            Register::Pir3 => 0x0ECA,
            Register::Ssp1datpps => 0x0EC6,
            Register::Osccon1 => 0x0ED3,
            Register::Oscfrq => 0x0ED9,
            Register::Rc3pps => 0x0EFB,
            Register::Rc5pps => 0x0EFD,
            Register::Anselc => 0x0F14,
            Register::Trisc => 0x0F88,
            Register::Portc => 0x0F8D,
            Register::Ssp1buf => 0x0F92,
            Register::Ssp1add => 0x0F93,
            Register::Ssp1stat => 0x0F95,
            Register::Ssp1con1 => 0x0F96,
        }
    }

    pub fn from_address(addr: u16) -> SpiResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|r| r.address() == addr)
            .ok_or(SpiError::UnmappedRegister(addr))
    }

    pub const fn name(self) -> &'static str {
        match self {
            Register::Osccon1 => "OSCCON1",
            Register::Oscfrq => "OSCFRQ",
            Register::Rc3pps => "RC3PPS",
            Register::Rc5pps => "RC5PPS",
            Register::Ssp1datpps => "SSP1DATPPS",
            Register::Trisc => "TRISC",
            Register::Anselc => "ANSELC",
            Register::Portc => "PORTC",
            Register::Ssp1add => "SSP1ADD",
            Register::Ssp1stat => "SSP1STAT",
            Register::Ssp1con1 => "SSP1CON1",
            Register::Ssp1buf => "SSP1BUF",
            Register::Pir3 => "PIR3",
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Oscillator control 1: new source (NOSC) and divider (NDIV).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Osccon1: u8 {
        const NOSC2 = 1 << 6;
        const NOSC1 = 1 << 5;
        const NOSC0 = 1 << 4;
        const NDIV3 = 1 << 3;
        const NDIV2 = 1 << 2;
        const NDIV1 = 1 << 1;
        const NDIV0 = 1 << 0;
    }
}

impl Osccon1 {
    pub const NOSC_MASK: u8 = 0x70;
    pub const NDIV_MASK: u8 = 0x0F;
    /// NOSC = 0b110, NDIV = 1:1.
    pub const HFINTOSC: Self = Self::NOSC2.union(Self::NOSC1);
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Ssp1Stat: u8 {
        const SMP = 1 << 7;
        const CKE = 1 << 6;
        const BF = 1 << 0;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Ssp1Con1: u8 {
        const WCOL = 1 << 7;
        const SSPOV = 1 << 6;
        const SSPEN = 1 << 5;
        const CKP = 1 << 4;
        const SSPM3 = 1 << 3;
        const SSPM2 = 1 << 2;
        const SSPM1 = 1 << 1;
        const SSPM0 = 1 << 0;
    }
}

impl Ssp1Con1 {
    pub const SSPM_MASK: u8 = 0x0F;
    /// SPI master, clock = FOSC / (4 * (SSP1ADD + 1)).
    pub const SSPM_MASTER_ADD: u8 = 0b1010;

    pub fn sspm(self) -> u8 {
        self.bits() & Self::SSPM_MASK
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Pir3: u8 {
        const RC2IF = 1 << 7;
        const TX2IF = 1 << 6;
        const RC1IF = 1 << 5;
        const TX1IF = 1 << 4;
        const BCL2IF = 1 << 3;
        const SSP2IF = 1 << 2;
        const BCL1IF = 1 << 1;
        const SSP1IF = 1 << 0;
    }
}

bitflags! {
    /// One bit per port C pin, shared by TRISC, ANSELC and PORTC.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PortPins: u8 {
        const RC0 = 1 << 0;
        const RC1 = 1 << 1;
        const RC2 = 1 << 2;
        const RC3 = 1 << 3;
        const RC4 = 1 << 4;
        const RC5 = 1 << 5;
        const RC6 = 1 << 6;
        const RC7 = 1 << 7;
    }
}

impl PortPins {
    pub const SCK: Self = Self::RC3;
    pub const SDI: Self = Self::RC4;
    pub const SDO: Self = Self::RC5;
    pub const CHIP_SELECT: Self = Self::RC6;
}

/// PPS output source codes (RxyPPS).
pub mod pps_out {
    pub const NONE: u8 = 0x00;
    pub const SCK1: u8 = 0x0F;
    pub const SDO1: u8 = 0x10;
}

/// PPS input pin codes (xxxPPS): port in bits 4:3, pin in bits 2:0.
pub mod pps_in {
    pub const RC3: u8 = 0x13;
    pub const RC4: u8 = 0x14;
}

/// HFINTOSC frequency selection (OSCFRQ.FRQ).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum HfFrequency {
    Mhz1 = 0,
    Mhz2 = 1,
    Mhz4 = 2,
    Mhz8 = 3,
    Mhz12 = 4,
    Mhz16 = 5,
    Mhz32 = 6,
    Mhz48 = 7,
    Mhz64 = 8,
}

impl HfFrequency {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::Mhz1,
            1 => Self::Mhz2,
            2 => Self::Mhz4,
            3 => Self::Mhz8,
            4 => Self::Mhz12,
            5 => Self::Mhz16,
            6 => Self::Mhz32,
            7 => Self::Mhz48,
            8 => Self::Mhz64,
            _ => return None,
        })
    }

    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn hertz(self) -> HertzU32 {
        HertzU32::MHz(match self {
            Self::Mhz1 => 1,
            Self::Mhz2 => 2,
            Self::Mhz4 => 4,
            Self::Mhz8 => 8,
            Self::Mhz12 => 12,
            Self::Mhz16 => 16,
            Self::Mhz32 => 32,
            Self::Mhz48 => 48,
            Self::Mhz64 => 64,
        })
    }
}

/// Volatile memory-mapped register access.
#[derive(Debug)]
pub struct Mmio {
    base: *mut u8,
}

impl Mmio {
    /// # Safety
    ///
    /// `base` must point at a region covering every [`Register::address`]
    /// offset that stays valid and exclusively owned for the lifetime of
    /// the returned value.
    pub unsafe fn new(base: *mut u8) -> Self {
        Self { base }
    }
}

impl RegisterInterface for Mmio {
    fn read(&mut self, reg: Register) -> SpiResult<u8> {
        // safety: the constructor contract covers every register offset
        Ok(unsafe { core::ptr::read_volatile(self.base.add(reg.address() as usize)) })
    }

    fn write(&mut self, reg: Register, value: u8) -> SpiResult<()> {
        // safety: the constructor contract covers every register offset
        unsafe { core::ptr::write_volatile(self.base.add(reg.address() as usize), value) };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addresses_are_unique() {
        for (i, a) in Register::ALL.iter().enumerate() {
            for b in &Register::ALL[i + 1..] {
                assert_ne!(a.address(), b.address(), "{} and {} overlap", a, b);
            }
        }
    }

    #[test]
    fn test_from_address() {
        assert_eq!(Register::from_address(0x0F92).unwrap(), Register::Ssp1buf);
        assert!(matches!(
            Register::from_address(0x0000),
            Err(SpiError::UnmappedRegister(0))
        ));
    }

    #[test]
    fn test_hfintosc_encoding() {
        assert_eq!(Osccon1::HFINTOSC.bits(), 0x60);
        assert_eq!(HfFrequency::Mhz4.code(), 0x02);
        assert_eq!(HfFrequency::Mhz64.code(), 0x08);
        assert_eq!(HfFrequency::from_code(8), Some(HfFrequency::Mhz64));
        assert_eq!(HfFrequency::from_code(9), None);
        assert_eq!(HfFrequency::Mhz64.hertz().to_Hz(), 64_000_000);
    }

    #[test]
    fn test_mmio_volatile_access() {
        let mut backing = vec![0u8; 0x1000];
        let mut mmio = unsafe { Mmio::new(backing.as_mut_ptr()) };

        mmio.write(Register::Ssp1add, 0x01).unwrap();
        mmio.set_bits(Register::Trisc, PortPins::SDI.bits()).unwrap();
        assert_eq!(mmio.read(Register::Ssp1add).unwrap(), 0x01);
        drop(mmio);

        assert_eq!(backing[0x0F93], 0x01);
        assert_eq!(backing[0x0F88], 0x10);
    }
}
