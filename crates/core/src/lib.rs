// SpiMode - MSSP Mode-Change Firmware Core
// Copyright (C) 2026 SpiMode Team
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod bus;
pub mod chip_select;
pub mod clock;
pub mod metrics;
pub mod mssp;
pub mod peripherals;
pub mod port;
pub mod pps;
pub mod registers;
pub mod session;
pub mod snapshot;
pub mod variant;
pub mod wait;

mod hal;

pub use registers::Register;
pub use session::SpiSession;
pub use variant::{Variant, VariantProfile};

#[derive(Debug, thiserror::Error)]
pub enum SpiError {
    #[error("No register mapped at {0:#06x}")]
    UnmappedRegister(u16),
    #[error("Transfer completion not observed after {polls} polls")]
    Timeout { polls: u64 },
    #[error("SPI mode {0} is out of range (0..=3)")]
    InvalidMode(u8),
}

pub type SpiResult<T> = Result<T, SpiError>;

/// Byte-wide access to the special function registers.
///
/// `read` takes `&mut self`: reading SSP1BUF clears SSP1STAT.BF on the real
/// part, so a read is not side-effect free.
pub trait RegisterInterface {
    fn read(&mut self, reg: Register) -> SpiResult<u8>;
    fn write(&mut self, reg: Register, value: u8) -> SpiResult<()>;

    fn set_bits(&mut self, reg: Register, mask: u8) -> SpiResult<()> {
        let value = self.read(reg)?;
        self.write(reg, value | mask)
    }

    fn clear_bits(&mut self, reg: Register, mask: u8) -> SpiResult<()> {
        let value = self.read(reg)?;
        self.write(reg, value & !mask)
    }

    /// Lets `ns` nanoseconds pass. The default sleeps the calling thread.
    fn delay_ns(&mut self, ns: u32) -> SpiResult<()> {
        std::thread::sleep(std::time::Duration::from_nanos(u64::from(ns)));
        Ok(())
    }
}

impl<R: RegisterInterface + ?Sized> RegisterInterface for &mut R {
    fn read(&mut self, reg: Register) -> SpiResult<u8> {
        (**self).read(reg)
    }

    fn write(&mut self, reg: Register, value: u8) -> SpiResult<()> {
        (**self).write(reg, value)
    }

    fn delay_ns(&mut self, ns: u32) -> SpiResult<()> {
        (**self).delay_ns(ns)
    }
}

/// Trait for observing session events in a modular way.
pub trait SessionObserver: std::fmt::Debug + Send + Sync {
    fn on_initialized(&self) {}
    fn on_exchange_start(&self, _tx: u8) {}
    fn on_exchange_end(&self, _rx: u8, _polls: u64) {}
}
